use std::collections::BTreeMap;

use serde_yaml::Value;

use super::plan::{feature_copies, parse_price, usage_limit_copies};
use super::Catalogue;
use crate::error::PricingError;
use crate::document::Fields;
use crate::model::{AddOn, AddOnPrice, FeatureValue, Plan, ValueType};

pub(super) fn parse_add_on(
    name: &str,
    v: &Value,
    catalogue: &Catalogue<'_>,
    plans: Option<&BTreeMap<String, Plan>>,
) -> Result<AddOn, PricingError> {
    let owner = format!("add-on {name}");
    let fields = Fields::of(v, &owner)?;

    let available_for = fields.string_list("availableFor")?.unwrap_or_default();
    if let Some(missing) = available_for
        .iter()
        .find(|p| !plans.is_some_and(|plans| plans.contains_key(*p)))
    {
        return Err(PricingError::InvalidPlanReference {
            add_on: name.to_owned(),
            plan: missing.clone(),
        });
    }

    let price = match (
        fields.get("price"),
        fields.get("monthlyPrice"),
        fields.get("annualPrice"),
    ) {
        (Some(p), None, None) => AddOnPrice::Single(parse_price(p, &owner, catalogue.variables)?),
        (None, Some(m), Some(a)) => AddOnPrice::Split {
            monthly: parse_price(m, &owner, catalogue.variables)?,
            annual: parse_price(a, &owner, catalogue.variables)?,
        },
        (Some(_), _, _) => {
            return Err(PricingError::parsing(format!(
                "{owner}: 'price' cannot be combined with 'monthlyPrice' or 'annualPrice'"
            )))
        }
        (None, None, None) => {
            return Err(PricingError::parsing(format!(
                "{owner}: either 'price' or both 'monthlyPrice' and 'annualPrice' are mandatory"
            )))
        }
        (None, _, _) => {
            return Err(PricingError::parsing(format!(
                "{owner}: 'monthlyPrice' and 'annualPrice' must be given together"
            )))
        }
    };

    let features = feature_copies(&fields, "features", &format!("in {name}"), catalogue.features, false)?;
    let usage_limits = usage_limit_copies(&fields, "usageLimits", name, catalogue.usage_limits, false)?;
    let usage_limits_extensions =
        usage_limit_copies(&fields, "usageLimitsExtensions", name, catalogue.usage_limits, false)?;

    if let Some(limit) = usage_limits_extensions
        .values()
        .find(|l| l.value_type != ValueType::Numeric || !matches!(l.value, Some(FeatureValue::Number(_))))
    {
        return Err(PricingError::InvalidDefaultValue(format!(
            "{owner}: usage limit extension {} must extend a NUMERIC usage limit by a number",
            limit.name
        )));
    }

    Ok(AddOn {
        name: name.to_owned(),
        description: fields.str("description")?.map(str::to_owned),
        available_for,
        price,
        unit: fields.str("unit")?.map(str::to_owned),
        features,
        usage_limits,
        usage_limits_extensions,
    })
}
