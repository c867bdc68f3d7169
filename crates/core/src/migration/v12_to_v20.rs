use serde_yaml::Value;

use super::MigrationReport;
use crate::error::UpdateError;

/// 1.2 → 2.0: every plan's `monthlyPrice`/`annualPrice` pair collapses into a
/// single `price`, preferring the monthly amount.
pub(super) fn update(doc: &mut Value, report: &mut MigrationReport) -> Result<(), UpdateError> {
    let snapshot = doc.clone();
    let fail = |message: String| UpdateError {
        message,
        document: snapshot.clone(),
    };

    let Some(Value::Mapping(plans)) = doc.get_mut("plans") else {
        return Ok(());
    };

    for (name, plan) in plans.iter_mut() {
        let name = match name {
            Value::String(s) => s.clone(),
            other => format!("{:?}", other),
        };
        let attrs = match plan {
            Value::Mapping(attrs) => attrs,
            Value::Null => return Err(fail("plan is null".to_owned())),
            other => return Err(fail(format!("plan {:?} is not a map", other))),
        };

        let monthly = present(attrs.get("monthlyPrice"));
        let annual = present(attrs.get("annualPrice"));
        if monthly.is_none() && annual.is_none() {
            return Err(fail(format!(
                "You have to specify, at least, either a monthlyPrice or an annualPrice for the plan {name}"
            )));
        }
        if !monthly.map_or(true, is_valid_price) || !annual.map_or(true, is_valid_price) {
            return Err(fail(format!(
                "Either the monthlyPrice or annualPrice of the plan {name} is neither a valid number nor String"
            )));
        }

        let price = match (monthly, annual) {
            (Some(m), _) => m.clone(),
            (None, Some(a)) => {
                report.warn(format!(
                    "plan {name} does not have a monthlyPrice but annualPrice instead, its annualPrice is used as price"
                ));
                a.clone()
            }
            (None, None) => continue,
        };
        attrs.remove("monthlyPrice");
        attrs.remove("annualPrice");
        attrs.insert(Value::from("price"), price);
    }
    Ok(())
}

fn present(v: Option<&Value>) -> Option<&Value> {
    v.filter(|v| !v.is_null())
}

fn is_valid_price(v: &Value) -> bool {
    matches!(v, Value::Number(_) | Value::String(_))
}
