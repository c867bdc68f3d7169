use std::collections::BTreeMap;
use std::fmt;

use rust_decimal::Decimal;

use super::{Feature, UsageLimit};

/// A plan or add-on price.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Price {
    Amount(Decimal),
    /// A `#variable` formula, resolved once when the document was parsed.
    Formula { source: String, amount: Decimal },
    /// Free text such as "Contact sales".
    Text(String),
}

impl Price {
    pub fn amount(&self) -> Option<Decimal> {
        match self {
            Price::Amount(d) | Price::Formula { amount: d, .. } => Some(*d),
            Price::Text(_) => None,
        }
    }
}

impl fmt::Display for Price {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Price::Amount(d) | Price::Formula { amount: d, .. } => write!(f, "{}", d.normalize()),
            Price::Text(s) => f.write_str(s),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Plan {
    pub name: String,
    pub description: Option<String>,
    pub price: Price,
    pub unit: Option<String>,
    /// One entry per global feature, carrying this plan's effective value.
    pub features: BTreeMap<String, Feature>,
    /// One entry per global usage limit.
    pub usage_limits: BTreeMap<String, UsageLimit>,
}

impl Plan {
    /// A plan with no copies yet. Adding it to a manager fills in every
    /// global feature and usage limit.
    pub fn new(name: impl Into<String>, price: Price) -> Self {
        Plan {
            name: name.into(),
            description: None,
            price,
            unit: None,
            features: BTreeMap::new(),
            usage_limits: BTreeMap::new(),
        }
    }

    pub fn feature(&self, name: &str) -> Option<&Feature> {
        self.features.get(name)
    }

    pub fn usage_limit(&self, name: &str) -> Option<&UsageLimit> {
        self.usage_limits.get(name)
    }
}
