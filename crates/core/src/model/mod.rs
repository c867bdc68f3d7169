//! Typed pricing configuration graph.
//!
//! The root [`PricingManager`] owns everything. Plans and add-ons hold their
//! own copies of the global features and usage limits; a copy is a plain
//! `Clone` of the global definition, so editing it never touches the global
//! entry or another plan.

mod add_on;
mod feature;
mod manager;
mod plan;
mod usage_limit;

use std::fmt;

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

pub use add_on::{AddOn, AddOnPrice};
pub use feature::{AutomationType, Feature, FeatureKind, IntegrationType, PaymentMethod};
pub use manager::PricingManager;
pub use plan::{Plan, Price};
pub use usage_limit::{UsageLimit, UsageLimitKind};

/// Declared type of a feature or usage-limit value.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ValueType {
    Boolean,
    Numeric,
    Text,
}

impl ValueType {
    pub fn tag(self) -> &'static str {
        match self {
            ValueType::Boolean => "BOOLEAN",
            ValueType::Numeric => "NUMERIC",
            ValueType::Text => "TEXT",
        }
    }

    pub fn from_tag(tag: &str) -> Option<Self> {
        match tag {
            "BOOLEAN" => Some(ValueType::Boolean),
            "NUMERIC" => Some(ValueType::Numeric),
            "TEXT" => Some(ValueType::Text),
            _ => None,
        }
    }

    /// The zero value used when a type change resets existing values.
    pub fn zero(self) -> FeatureValue {
        match self {
            ValueType::Boolean => FeatureValue::Bool(false),
            ValueType::Numeric => FeatureValue::Number(Decimal::ZERO),
            ValueType::Text => FeatureValue::Text(String::new()),
        }
    }
}

impl fmt::Display for ValueType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.tag())
    }
}

/// A feature or usage-limit value.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FeatureValue {
    Bool(bool),
    Number(Decimal),
    Text(String),
    /// Only ever held by payment features.
    PaymentMethods(Vec<PaymentMethod>),
}

impl FeatureValue {
    /// Whether this value fits `value_type`. Payment lists are checked by the
    /// caller, since they ignore the declared type.
    pub fn fits(&self, value_type: ValueType) -> bool {
        matches!(
            (self, value_type),
            (FeatureValue::Bool(_), ValueType::Boolean)
                | (FeatureValue::Number(_), ValueType::Numeric)
                | (FeatureValue::Text(_), ValueType::Text)
        )
    }

    pub fn describe(&self) -> String {
        match self {
            FeatureValue::Bool(b) => b.to_string(),
            FeatureValue::Number(d) => d.normalize().to_string(),
            FeatureValue::Text(s) => s.clone(),
            FeatureValue::PaymentMethods(methods) => methods
                .iter()
                .map(|m| m.tag())
                .collect::<Vec<_>>()
                .join(", "),
        }
    }

    /// Expression-level view used to build plan contexts. Payment lists are
    /// joined into a single comma-separated string.
    pub fn to_expr_value(&self) -> pricing_expr::Value {
        match self {
            FeatureValue::Bool(b) => pricing_expr::Value::Bool(*b),
            FeatureValue::Number(d) => pricing_expr::Value::Number(*d),
            FeatureValue::Text(s) => pricing_expr::Value::Text(s.clone()),
            FeatureValue::PaymentMethods(_) => pricing_expr::Value::Text(self.describe()),
        }
    }
}

impl From<bool> for FeatureValue {
    fn from(b: bool) -> Self {
        FeatureValue::Bool(b)
    }
}

impl From<i64> for FeatureValue {
    fn from(n: i64) -> Self {
        FeatureValue::Number(Decimal::from(n))
    }
}

impl From<i32> for FeatureValue {
    fn from(n: i32) -> Self {
        FeatureValue::Number(Decimal::from(n))
    }
}

impl From<Decimal> for FeatureValue {
    fn from(d: Decimal) -> Self {
        FeatureValue::Number(d)
    }
}

impl From<&str> for FeatureValue {
    fn from(s: &str) -> Self {
        FeatureValue::Text(s.to_owned())
    }
}
