//! Untyped document access: YAML text in and out, typed field readers with
//! uniform error messages, and number/date conversions.

use rust_decimal::prelude::{FromPrimitive, ToPrimitive};
use rust_decimal::Decimal;
use serde_yaml::{Mapping, Value};
use time::macros::format_description;
use time::{Date, OffsetDateTime};

use crate::error::PricingError;

pub fn from_yaml_str(text: &str) -> Result<Value, PricingError> {
    Ok(serde_yaml::from_str(text)?)
}

pub fn to_yaml_string(doc: &Value) -> Result<String, PricingError> {
    Ok(serde_yaml::to_string(doc)?)
}

// ──────────────────────────────────────────────
// Numbers and dates
// ──────────────────────────────────────────────

/// Integers map to scale-0 decimals; floats keep at least one fractional
/// digit so they are written back as floats.
pub fn decimal_from_yaml(v: &Value) -> Option<Decimal> {
    let Value::Number(n) = v else {
        return None;
    };
    if let Some(i) = n.as_i64() {
        return Some(Decimal::from(i));
    }
    if let Some(u) = n.as_u64() {
        return Some(Decimal::from(u));
    }
    let mut d = Decimal::from_f64(n.as_f64()?)?;
    if d.scale() == 0 {
        d.rescale(1);
    }
    Some(d)
}

pub fn decimal_to_yaml(d: Decimal) -> Value {
    if d.scale() == 0 {
        if let Some(i) = d.to_i64() {
            return Value::from(i);
        }
    }
    d.to_f64().map(Value::from).unwrap_or(Value::Null)
}

pub fn format_date(d: Date) -> String {
    format!("{:04}-{:02}-{:02}", d.year(), u8::from(d.month()), d.day())
}

/// Accepts `YYYY-MM-DD` or a full RFC 3339 timestamp (date part kept).
pub fn parse_date(s: &str) -> Option<Date> {
    let s = s.trim();
    if let Ok(d) = Date::parse(s, format_description!("[year]-[month]-[day]")) {
        return Some(d);
    }
    OffsetDateTime::parse(s, &time::format_description::well_known::Rfc3339)
        .ok()
        .map(|dt| dt.date())
}

// ──────────────────────────────────────────────
// Field readers
// ──────────────────────────────────────────────

/// A mapping node together with a description of what it is, used to phrase
/// errors like "plan BASIC: 'unit' has to be a string".
#[derive(Clone, Copy)]
pub(crate) struct Fields<'a, 'o> {
    map: &'a Mapping,
    owner: &'o str,
}

impl<'a, 'o> Fields<'a, 'o> {
    pub fn of(value: &'a Value, owner: &'o str) -> Result<Self, PricingError> {
        match value {
            Value::Mapping(map) => Ok(Fields { map, owner }),
            _ => Err(PricingError::parsing(format!(
                "{owner} is not defined correctly. It should be a map of attributes"
            ))),
        }
    }

    pub fn mapping(&self) -> &'a Mapping {
        self.map
    }

    fn err(&self, message: String) -> PricingError {
        if self.owner.is_empty() {
            PricingError::parsing(message)
        } else {
            PricingError::parsing(format!("{}: {}", self.owner, message))
        }
    }

    /// The raw value under `key`. Explicit nulls read as absent.
    pub fn get(&self, key: &str) -> Option<&'a Value> {
        self.map.get(key).filter(|v| !v.is_null())
    }

    pub fn has(&self, key: &str) -> bool {
        self.get(key).is_some()
    }

    pub fn str(&self, key: &str) -> Result<Option<&'a str>, PricingError> {
        match self.get(key) {
            None => Ok(None),
            Some(Value::String(s)) => Ok(Some(s.as_str())),
            Some(_) => Err(self.err(format!("'{key}' has to be a string"))),
        }
    }

    pub fn required_str(&self, key: &str) -> Result<&'a str, PricingError> {
        self.str(key)?
            .ok_or_else(|| self.err(format!("'{key}' is mandatory")))
    }

    pub fn bool(&self, key: &str) -> Result<Option<bool>, PricingError> {
        match self.get(key) {
            None => Ok(None),
            Some(Value::Bool(b)) => Ok(Some(*b)),
            Some(_) => Err(self.err(format!("'{key}' has to be a boolean"))),
        }
    }

    pub fn string_list(&self, key: &str) -> Result<Option<Vec<String>>, PricingError> {
        let Some(v) = self.get(key) else {
            return Ok(None);
        };
        let Value::Sequence(items) = v else {
            return Err(self.err(format!("'{key}' has to be a list of strings")));
        };
        items
            .iter()
            .map(|item| match item {
                Value::String(s) => Ok(s.clone()),
                _ => Err(self.err(format!("'{key}' has to be a list of strings"))),
            })
            .collect::<Result<Vec<_>, _>>()
            .map(Some)
    }

    /// A nested map of named entries, e.g. `features` or `plans`.
    pub fn entries(&self, key: &str) -> Result<Option<Vec<(String, &'a Value)>>, PricingError> {
        let Some(v) = self.get(key) else {
            return Ok(None);
        };
        let Value::Mapping(map) = v else {
            return Err(self.err(format!(
                "'{key}' is not defined correctly. It should be a map of names to their attributes"
            )));
        };
        map.iter()
            .map(|(k, v)| match k {
                Value::String(name) => Ok((name.clone(), v)),
                other => Err(self.err(format!(
                    "'{key}' contains a non-string name: {}",
                    describe(other)
                ))),
            })
            .collect::<Result<Vec<_>, _>>()
            .map(Some)
    }

    pub fn date(&self, key: &str) -> Result<Option<Date>, PricingError> {
        match self.str(key)? {
            None => Ok(None),
            Some(s) => parse_date(s).map(Some).ok_or_else(|| {
                self.err(format!(
                    "date {s} in '{key}' is invalid. Use the following format to specify a date yyyy-MM-dd."
                ))
            }),
        }
    }
}

/// Short rendering of a node for error messages.
pub(crate) fn describe(v: &Value) -> String {
    match v {
        Value::Null => "null".to_owned(),
        Value::Bool(b) => b.to_string(),
        Value::Number(n) => n.to_string(),
        Value::String(s) => s.clone(),
        Value::Sequence(_) => "a list".to_owned(),
        Value::Mapping(_) => "a map".to_owned(),
        Value::Tagged(_) => "a tagged value".to_owned(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn floats_keep_a_fraction() {
        let v: Value = serde_yaml::from_str("2.0").unwrap();
        let d = decimal_from_yaml(&v).unwrap();
        assert_eq!(d.scale(), 1);
        assert_eq!(decimal_to_yaml(d), Value::from(2.0));
        let v: Value = serde_yaml::from_str("2").unwrap();
        assert_eq!(decimal_to_yaml(decimal_from_yaml(&v).unwrap()), Value::from(2));
    }

    #[test]
    fn dates() {
        let d = parse_date("2024-01-15").unwrap();
        assert_eq!(format_date(d), "2024-01-15");
        assert_eq!(parse_date("2024-03-01T10:00:00Z").map(format_date).as_deref(), Some("2024-03-01"));
        assert!(parse_date("15/01/2024").is_none());
    }

    #[test]
    fn field_errors_name_the_owner() {
        let v: Value = serde_yaml::from_str("unit: 3\nflag: yes-please\n").unwrap();
        let f = Fields::of(&v, "plan BASIC").unwrap();
        assert_eq!(
            f.str("unit").unwrap_err().to_string(),
            "plan BASIC: 'unit' has to be a string"
        );
        assert!(f.bool("flag").is_err());
        assert_eq!(f.str("missing").unwrap(), None);
    }
}
