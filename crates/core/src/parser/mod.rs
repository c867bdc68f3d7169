//! Document → typed graph.
//!
//! Each entity has its own hand-written reader that checks every field it
//! consumes. Unknown keys are ignored. Errors name the entity and the
//! offending value.

mod add_on;
mod feature;
mod plan;
mod usage_limit;
mod values;

use std::collections::BTreeMap;

use pricing_expr::Value as ExprValue;
use serde_yaml::Value;
use tracing::debug;

use crate::document::{decimal_from_yaml, describe, Fields};
use crate::error::PricingError;
use crate::model::{Feature, PricingManager, UsageLimit};
use crate::version::Version;

pub(crate) use plan::parse_price;
pub(crate) use values::{read_payment_methods, read_scalar};

/// Global definitions that plan and add-on readers resolve names against.
pub(crate) struct Catalogue<'a> {
    pub features: &'a BTreeMap<String, Feature>,
    pub usage_limits: &'a BTreeMap<String, UsageLimit>,
    pub variables: &'a BTreeMap<String, ExprValue>,
}

/// Build the typed graph from a document already at [`Version::LATEST`].
pub fn parse(doc: &Value) -> Result<PricingManager, PricingError> {
    let root = Fields::of(doc, "")?;

    let version = Version::of_document(doc)?;
    if version != Version::LATEST {
        return Err(PricingError::parsing(format!(
            "the document declares version {version}; migrate it to {} before parsing",
            Version::LATEST
        )));
    }

    let saas_name = root.required_str("saasName")?.to_owned();
    let currency = root.required_str("currency")?.to_owned();
    let has_annual_payment = root.bool("hasAnnualPayment")?.unwrap_or(false);

    if ["day", "month", "year"].iter().any(|k| root.has(k)) {
        return Err(PricingError::parsing(
            "day, month and year belong to version 1.0 documents; use 'createdAt' instead",
        ));
    }
    let created_at = root
        .date("createdAt")?
        .ok_or_else(|| PricingError::parsing("'createdAt' is mandatory. Check your config file."))?;
    let starts = root.date("starts")?;
    let ends = root.date("ends")?;
    if let (Some(s), Some(e)) = (starts, ends) {
        if s > e {
            return Err(PricingError::parsing(
                "'starts' must not be later than 'ends'",
            ));
        }
    }

    let variables = parse_variables(&root)?;
    let features = parse_features(&root)?;
    let usage_limits = parse_usage_limits(&root, &features)?;

    let catalogue = Catalogue {
        features: &features,
        usage_limits: &usage_limits,
        variables: &variables,
    };

    let plans = match root.entries("plans")? {
        None => None,
        Some(entries) => Some(
            entries
                .into_iter()
                .map(|(name, v)| {
                    let plan = plan::parse_plan(&name, v, &catalogue)?;
                    Ok((name, plan))
                })
                .collect::<Result<BTreeMap<_, _>, PricingError>>()?,
        ),
    };

    let add_ons = match root.entries("addOns")? {
        None => None,
        Some(entries) => Some(
            entries
                .into_iter()
                .map(|(name, v)| {
                    let add_on = add_on::parse_add_on(&name, v, &catalogue, plans.as_ref())?;
                    Ok((name, add_on))
                })
                .collect::<Result<BTreeMap<_, _>, PricingError>>()?,
        ),
    };

    if plans.is_none() && add_ons.is_none() {
        return Err(PricingError::parsing(
            "The pricing manager does not have any plans or add ons",
        ));
    }

    debug!(
        saas = %saas_name,
        features = features.len(),
        plans = plans.as_ref().map_or(0, BTreeMap::len),
        "parsed pricing document"
    );

    Ok(PricingManager {
        version,
        saas_name,
        currency,
        created_at,
        has_annual_payment,
        starts,
        ends,
        variables,
        features,
        usage_limits,
        plans,
        add_ons,
    })
}

fn parse_variables(root: &Fields<'_, '_>) -> Result<BTreeMap<String, ExprValue>, PricingError> {
    let Some(entries) = root.entries("variables")? else {
        return Ok(BTreeMap::new());
    };
    entries
        .into_iter()
        .map(|(name, v)| {
            let value = match v {
                Value::Bool(b) => ExprValue::Bool(*b),
                Value::String(s) => ExprValue::Text(s.clone()),
                Value::Number(_) => decimal_from_yaml(v)
                    .map(ExprValue::Number)
                    .ok_or_else(|| invalid_variable(&name, v))?,
                other => return Err(invalid_variable(&name, other)),
            };
            Ok((name, value))
        })
        .collect()
}

fn invalid_variable(name: &str, v: &Value) -> PricingError {
    PricingError::parsing(format!(
        "variable {name} must be a number, a boolean or a string. Current value: {}",
        describe(v)
    ))
}

fn parse_features(root: &Fields<'_, '_>) -> Result<BTreeMap<String, Feature>, PricingError> {
    let entries = root.entries("features")?.filter(|e| !e.is_empty()).ok_or_else(|| {
        PricingError::parsing(
            "'features' is mandatory. It should be a map of features with their corresponding attributes.",
        )
    })?;
    entries
        .into_iter()
        .map(|(name, v)| {
            let feature = feature::parse_feature(&name, v)?;
            Ok((name, feature))
        })
        .collect()
}

fn parse_usage_limits(
    root: &Fields<'_, '_>,
    features: &BTreeMap<String, Feature>,
) -> Result<BTreeMap<String, UsageLimit>, PricingError> {
    let Some(entries) = root.entries("usageLimits")? else {
        return Ok(BTreeMap::new());
    };
    entries
        .into_iter()
        .map(|(name, v)| {
            let limit = usage_limit::parse_usage_limit(&name, v, features)?;
            Ok((name, limit))
        })
        .collect()
}
