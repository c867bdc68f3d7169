//! Typed graph → document, always at [`Version::LATEST`].
//!
//! Absent optional attributes are left out rather than written as nulls.
//! Plan entries for features and usage limits are only written when the
//! plan's value differs from the global default.

use std::collections::BTreeMap;

use pricing_expr::Value as ExprValue;
use serde_yaml::{Mapping, Value};

use crate::document::{decimal_to_yaml, format_date};
use crate::error::SerializerError;
use crate::model::{
    AddOn, AddOnPrice, Feature, FeatureKind, FeatureValue, Plan, Price, PricingManager, UsageLimit,
};
use crate::version::Version;

/// Ordered mapping builder that skips `None`.
#[derive(Default)]
struct Node(Mapping);

impl Node {
    fn put(&mut self, key: &str, value: impl Into<Value>) -> &mut Self {
        self.0.insert(Value::from(key), value.into());
        self
    }

    fn put_opt(&mut self, key: &str, value: Option<impl Into<Value>>) -> &mut Self {
        if let Some(v) = value {
            self.put(key, v);
        }
        self
    }

    fn put_nonempty(&mut self, key: &str, map: Mapping) -> &mut Self {
        if !map.is_empty() {
            self.put(key, Value::Mapping(map));
        }
        self
    }

    fn build(self) -> Value {
        Value::Mapping(self.0)
    }
}

pub fn serialize(manager: &PricingManager) -> Result<Value, SerializerError> {
    if manager.features.is_empty() {
        return Err(SerializerError(
            "Features are null. Filling this field is mandatory".to_owned(),
        ));
    }
    if manager.plans.is_none() && manager.add_ons.is_none() {
        return Err(SerializerError(
            "Plans and AddOns are null. You have to set at least one of them".to_owned(),
        ));
    }

    let mut root = Node::default();
    root.put("version", Version::LATEST.to_string())
        .put("saasName", manager.saas_name.as_str())
        .put("createdAt", format_date(manager.created_at))
        .put("currency", manager.currency.as_str())
        .put("hasAnnualPayment", manager.has_annual_payment)
        .put_opt("starts", manager.starts.map(format_date))
        .put_opt("ends", manager.ends.map(format_date))
        .put_nonempty("variables", variables(&manager.variables))
        .put("features", Value::Mapping(named(&manager.features, feature)))
        .put_nonempty("usageLimits", named(&manager.usage_limits, usage_limit));

    if let Some(plans) = &manager.plans {
        root.put("plans", Value::Mapping(named(plans, plan)));
    }
    if let Some(add_ons) = &manager.add_ons {
        root.put("addOns", Value::Mapping(named(add_ons, add_on)));
    }
    Ok(root.build())
}

fn named<T>(items: &BTreeMap<String, T>, f: fn(&T) -> Value) -> Mapping {
    items
        .iter()
        .map(|(name, item)| (Value::from(name.as_str()), f(item)))
        .collect()
}

fn variables(vars: &BTreeMap<String, ExprValue>) -> Mapping {
    vars.iter()
        .map(|(name, v)| {
            let value = match v {
                ExprValue::Bool(b) => Value::Bool(*b),
                ExprValue::Number(d) => decimal_to_yaml(*d),
                ExprValue::Text(s) => Value::from(s.as_str()),
            };
            (Value::from(name.as_str()), value)
        })
        .collect()
}

pub(crate) fn feature_value(v: &FeatureValue) -> Value {
    match v {
        FeatureValue::Bool(b) => Value::Bool(*b),
        FeatureValue::Number(d) => decimal_to_yaml(*d),
        FeatureValue::Text(s) => Value::from(s.as_str()),
        FeatureValue::PaymentMethods(methods) => {
            Value::Sequence(methods.iter().map(|m| Value::from(m.tag())).collect())
        }
    }
}

fn price(p: &Price) -> Value {
    match p {
        Price::Amount(d) => decimal_to_yaml(*d),
        Price::Formula { source, .. } => Value::from(source.as_str()),
        Price::Text(s) => Value::from(s.as_str()),
    }
}

fn string_list(items: &[String]) -> Value {
    Value::Sequence(items.iter().map(|s| Value::from(s.as_str())).collect())
}

fn feature(f: &Feature) -> Value {
    let mut node = Node::default();
    node.put_opt("description", f.description.as_deref())
        .put("valueType", f.value_type.tag())
        .put("defaultValue", feature_value(&f.default_value))
        .put_opt("expression", f.expression.as_deref())
        .put_opt("serverExpression", f.server_expression.as_deref())
        .put("type", f.kind.tag());
    match &f.kind {
        FeatureKind::Integration {
            integration_type,
            pricing_urls,
        } => {
            node.put("integrationType", integration_type.tag())
                .put_opt("pricingUrls", pricing_urls.as_deref().map(string_list));
        }
        FeatureKind::Automation { automation_type } => {
            node.put("automationType", automation_type.tag());
        }
        FeatureKind::Guarantee { doc_url } => {
            node.put_opt("docUrl", doc_url.as_deref());
        }
        FeatureKind::Information
        | FeatureKind::Domain
        | FeatureKind::Management
        | FeatureKind::Payment
        | FeatureKind::Support
        | FeatureKind::Tool => {}
    }
    node.build()
}

fn usage_limit(l: &UsageLimit) -> Value {
    let mut node = Node::default();
    node.put_opt("description", l.description.as_deref())
        .put("valueType", l.value_type.tag())
        .put("defaultValue", feature_value(&l.default_value))
        .put_opt("unit", l.unit.as_deref())
        .put("type", l.kind.tag())
        .put_opt("linkedFeatures", l.linked_features.as_deref().map(string_list))
        .put_opt("expression", l.expression.as_deref())
        .put_opt("serverExpression", l.server_expression.as_deref());
    node.build()
}

fn value_entry(v: &FeatureValue) -> Value {
    let mut node = Node::default();
    node.put("value", feature_value(v));
    node.build()
}

/// `{name: {value: ..}}` for copies whose value is not the default.
fn overrides<'a, I>(copies: I, all: bool) -> Mapping
where
    I: Iterator<Item = (&'a String, &'a FeatureValue, &'a FeatureValue)>,
{
    copies
        .filter(|(_, value, default)| all || value != default)
        .map(|(name, value, _)| (Value::from(name.as_str()), value_entry(value)))
        .collect()
}

fn feature_overrides(features: &BTreeMap<String, Feature>, all: bool) -> Mapping {
    overrides(
        features
            .iter()
            .map(|(n, f)| (n, f.effective_value(), &f.default_value)),
        all,
    )
}

fn limit_overrides(limits: &BTreeMap<String, UsageLimit>, all: bool) -> Mapping {
    overrides(
        limits
            .iter()
            .map(|(n, l)| (n, l.effective_value(), &l.default_value)),
        all,
    )
}

fn plan(p: &Plan) -> Value {
    let mut node = Node::default();
    node.put_opt("description", p.description.as_deref())
        .put("price", price(&p.price))
        .put_opt("unit", p.unit.as_deref())
        .put_nonempty("features", feature_overrides(&p.features, false))
        .put_nonempty("usageLimits", limit_overrides(&p.usage_limits, false));
    node.build()
}

fn add_on(a: &AddOn) -> Value {
    let mut node = Node::default();
    node.put_opt("description", a.description.as_deref());
    if !a.available_for.is_empty() {
        node.put("availableFor", string_list(&a.available_for));
    }
    match &a.price {
        AddOnPrice::Single(p) => {
            node.put("price", price(p));
        }
        AddOnPrice::Split { monthly, annual } => {
            node.put("monthlyPrice", price(monthly))
                .put("annualPrice", price(annual));
        }
    }
    node.put_opt("unit", a.unit.as_deref())
        .put_nonempty("features", feature_overrides(&a.features, true))
        .put_nonempty("usageLimits", limit_overrides(&a.usage_limits, true))
        .put_nonempty(
            "usageLimitsExtensions",
            limit_overrides(&a.usage_limits_extensions, true),
        );
    node.build()
}
