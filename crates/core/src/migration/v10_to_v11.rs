use serde_yaml::Value;
use time::{Date, Month};

use super::MigrationReport;
use crate::document::format_date;
use crate::error::UpdateError;

/// 1.0 → 1.1: `day`/`month`/`year` become one ISO `createdAt`, and a
/// `serverExpression` identical to its `expression` is dropped.
pub(super) fn update(doc: &mut Value, _report: &mut MigrationReport) -> Result<(), UpdateError> {
    collapse_creation_date(doc)?;
    drop_redundant_server_expressions(doc);
    Ok(())
}

fn collapse_creation_date(doc: &mut Value) -> Result<(), UpdateError> {
    let mut errors = Vec::new();
    let mut field = |name: &str| match doc.get(name) {
        None | Some(Value::Null) => {
            errors.push(format!("{name} is mandatory"));
            None
        }
        Some(Value::Number(n)) if n.as_i64().is_some() => n.as_i64(),
        Some(_) => {
            errors.push(format!("{name} must be an integer"));
            None
        }
    };
    let (day, month, year) = (field("day"), field("month"), field("year"));

    let fail = |message: String, doc: &Value| UpdateError {
        message,
        document: doc.clone(),
    };

    let (Some(day), Some(month), Some(year)) = (day, month, year) else {
        return Err(fail(errors.join("\n"), doc));
    };

    let date = calendar_date(year, month, day).ok_or_else(|| {
        fail(
            format!("{year}-{month}-{day} is not a valid calendar date"),
            doc,
        )
    })?;
    let created_at = format_date(date);

    if let Value::Mapping(map) = doc {
        for key in ["day", "month", "year"] {
            map.remove(key);
        }
        map.insert(Value::from("createdAt"), Value::String(created_at));
    }
    Ok(())
}

fn calendar_date(year: i64, month: i64, day: i64) -> Option<Date> {
    let year = i32::try_from(year).ok()?;
    let month = Month::try_from(u8::try_from(month).ok()?).ok()?;
    let day = u8::try_from(day).ok()?;
    Date::from_calendar_date(year, month, day).ok()
}

fn drop_redundant_server_expressions(doc: &mut Value) {
    let Some(Value::Mapping(features)) = doc.get_mut("features") else {
        return;
    };
    for (_, feature) in features.iter_mut() {
        let Value::Mapping(attrs) = feature else {
            continue;
        };
        let redundant = match (attrs.get("expression"), attrs.get("serverExpression")) {
            (Some(Value::String(e)), Some(Value::String(s))) => e == s,
            _ => false,
        };
        if redundant {
            attrs.remove("serverExpression");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn invalid_calendar_date() {
        let mut doc: Value = serde_yaml::from_str("day: 31\nmonth: 2\nyear: 2024\n").unwrap();
        let err = update(&mut doc, &mut MigrationReport::default()).unwrap_err();
        assert_eq!(err.message, "2024-2-31 is not a valid calendar date");
    }

    #[test]
    fn all_three_missing() {
        let mut doc: Value = serde_yaml::from_str("saasName: x\n").unwrap();
        let err = update(&mut doc, &mut MigrationReport::default()).unwrap_err();
        assert_eq!(
            err.message,
            "day is mandatory\nmonth is mandatory\nyear is mandatory"
        );
    }

    #[test]
    fn keeps_distinct_server_expression_and_tolerates_scalar_features() {
        let mut doc: Value = serde_yaml::from_str(
            "day: 1\nmonth: 12\nyear: 2023\nfeatures:\n  a:\n    expression: x\n    serverExpression: y\n  b: nonsense\n",
        )
        .unwrap();
        update(&mut doc, &mut MigrationReport::default()).unwrap();
        assert_eq!(doc["createdAt"], Value::from("2023-12-01"));
        assert_eq!(doc["features"]["a"]["serverExpression"], Value::from("y"));
    }
}
