use std::collections::BTreeMap;

use pricing_expr::{evaluate, Scopes, Value as ExprValue};
use serde_yaml::Value;

use super::values::{read_payment_methods, read_scalar};
use super::Catalogue;
use crate::document::{decimal_from_yaml, describe, Fields};
use crate::error::PricingError;
use crate::model::{Feature, FeatureValue, Plan, Price, UsageLimit};

pub(super) fn parse_plan(name: &str, v: &Value, catalogue: &Catalogue<'_>) -> Result<Plan, PricingError> {
    let owner = format!("plan {name}");
    let fields = Fields::of(v, &owner)?;

    let raw_price = fields
        .get("price")
        .ok_or_else(|| PricingError::parsing(format!("plan {name}: \"price\" is mandatory")))?;
    let price = parse_price(raw_price, &owner, catalogue.variables)?;

    let features = feature_copies(
        &fields,
        "features",
        &format!("in {name}"),
        catalogue.features,
        true,
    )?;
    let usage_limits = usage_limit_copies(&fields, "usageLimits", name, catalogue.usage_limits, true)?;

    Ok(Plan {
        name: name.to_owned(),
        description: fields.str("description")?.map(str::to_owned),
        price,
        unit: fields.str("unit")?.map(str::to_owned),
        features,
        usage_limits,
    })
}

/// A price is a number, a `#variable` formula, or free text.
pub(crate) fn parse_price(
    raw: &Value,
    owner: &str,
    variables: &BTreeMap<String, ExprValue>,
) -> Result<Price, PricingError> {
    match raw {
        Value::Number(_) => decimal_from_yaml(raw).map(Price::Amount).ok_or_else(|| {
            PricingError::parsing(format!("{owner}: price {} is not representable", describe(raw)))
        }),
        Value::String(s) if s.contains('#') => {
            let amount = evaluate(s, &Scopes::formula(variables))
                .and_then(|v| v.as_number())
                .map_err(|source| PricingError::Expression {
                    context: format!("price of {owner}"),
                    source,
                })?;
            Ok(Price::Formula {
                source: s.clone(),
                amount,
            })
        }
        Value::String(s) => Ok(Price::Text(s.clone())),
        _ => Err(PricingError::parsing(format!(
            "{owner}: \"price\" is expected to be a real number, a expression or a string"
        ))),
    }
}

/// Copies of the global features, optionally with every global entry present,
/// overridden by the `{name: {value: ..}}` map under `key`.
pub(super) fn feature_copies(
    fields: &Fields<'_, '_>,
    key: &str,
    holder: &str,
    globals: &BTreeMap<String, Feature>,
    include_all: bool,
) -> Result<BTreeMap<String, Feature>, PricingError> {
    let overrides = fields.entries(key)?.unwrap_or_default();
    let mut copies: BTreeMap<String, Feature> = if include_all {
        globals
            .iter()
            .map(|(n, f)| (n.clone(), f.copy_with(None)))
            .collect()
    } else {
        BTreeMap::new()
    };

    for (feature_name, entry) in overrides {
        let global = globals.get(&feature_name).ok_or_else(|| {
            PricingError::FeatureNotFound(format!(
                "The feature {feature_name} is not defined in the global features"
            ))
        })?;
        let raw = override_value(entry, &feature_name)?;
        let value = if global.kind.is_payment() {
            read_payment_methods(raw)
                .map_err(|tail| PricingError::InvalidDefaultValue(format!("The feature {feature_name} {tail}")))?
        } else {
            read_scalar(raw, global.value_type).ok_or_else(|| {
                PricingError::InvalidDefaultValue(format!(
                    "The feature {feature_name} does not have a valid value. Current valueType: {}; Current value {holder}: {}",
                    global.value_type,
                    describe(raw)
                ))
            })?
        };
        copies.insert(feature_name, global.copy_with(Some(value)));
    }
    Ok(copies)
}

pub(super) fn usage_limit_copies(
    fields: &Fields<'_, '_>,
    key: &str,
    holder: &str,
    globals: &BTreeMap<String, UsageLimit>,
    include_all: bool,
) -> Result<BTreeMap<String, UsageLimit>, PricingError> {
    let overrides = fields.entries(key)?.unwrap_or_default();
    let mut copies: BTreeMap<String, UsageLimit> = if include_all {
        globals
            .iter()
            .map(|(n, l)| (n.clone(), l.copy_with(None)))
            .collect()
    } else {
        BTreeMap::new()
    };

    for (limit_name, entry) in overrides {
        let global = globals.get(&limit_name).ok_or_else(|| {
            PricingError::FeatureNotFound(format!(
                "The usageLimit {limit_name} is not defined in the global usageLimits"
            ))
        })?;
        let raw = override_value(entry, &limit_name)?;
        let value: FeatureValue = read_scalar(raw, global.value_type).ok_or_else(|| {
            PricingError::InvalidDefaultValue(format!(
                "The usageLimit {limit_name} does not have a valid value in {holder}. Current valueType: {}; Current value: {}",
                global.value_type,
                describe(raw)
            ))
        })?;
        copies.insert(limit_name, global.copy_with(Some(value)));
    }
    Ok(copies)
}

fn override_value<'a>(entry: &'a Value, name: &str) -> Result<&'a Value, PricingError> {
    let owner = format!("override of {name}");
    let fields = Fields::of(entry, &owner)?;
    fields.get("value").ok_or_else(|| {
        PricingError::InvalidDefaultValue(format!(
            "{name} does not have a valid value. The actual value is null"
        ))
    })
}
