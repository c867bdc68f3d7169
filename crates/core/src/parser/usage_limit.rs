use std::collections::BTreeMap;

use serde_yaml::Value;

use super::values::read_scalar;
use crate::document::{describe, Fields};
use crate::error::PricingError;
use crate::model::{Feature, UsageLimit, UsageLimitKind, ValueType};

pub(super) fn parse_usage_limit(
    name: &str,
    v: &Value,
    features: &BTreeMap<String, Feature>,
) -> Result<UsageLimit, PricingError> {
    let owner = format!("usage limit {name}");
    let fields = Fields::of(v, &owner)?;

    let tag = fields.str("type")?;
    let kind = tag.and_then(UsageLimitKind::from_tag).ok_or_else(|| {
        PricingError::parsing(format!(
            "The usage limit {name} does not have a supported type. Current type value: {}",
            tag.unwrap_or("null")
        ))
    })?;

    let value_tag = fields.str("valueType")?;
    let value_type = value_tag.and_then(ValueType::from_tag).ok_or_else(|| {
        PricingError::InvalidValueType(format!(
            "The usageLimit {name} does not have a supported valueType. Current valueType: {}",
            value_tag.unwrap_or("null")
        ))
    })?;

    let raw_default = fields.get("defaultValue");
    let default_value = raw_default
        .and_then(|raw| read_scalar(raw, value_type))
        .ok_or_else(|| {
            PricingError::InvalidDefaultValue(format!(
                "The usageLimit {name} does not have a valid defaultValue. Current valueType: {value_type}; Current defaultValue: {}",
                raw_default.map_or_else(|| "null".to_owned(), describe)
            ))
        })?;

    let linked_features = fields.string_list("linkedFeatures")?;
    if let Some(links) = &linked_features {
        if let Some(missing) = links.iter().find(|l| !features.contains_key(*l)) {
            return Err(PricingError::InvalidLinkedFeature {
                limit: name.to_owned(),
                feature: missing.clone(),
            });
        }
    }

    Ok(UsageLimit {
        name: name.to_owned(),
        description: fields.str("description")?.map(str::to_owned),
        value_type,
        default_value,
        value: None,
        unit: fields.str("unit")?.map(str::to_owned),
        kind,
        linked_features,
        expression: fields.str("expression")?.map(str::to_owned),
        server_expression: fields.str("serverExpression")?.map(str::to_owned),
    })
}
