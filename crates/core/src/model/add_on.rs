use std::collections::BTreeMap;

use super::{Feature, Price, UsageLimit};

/// How an add-on is priced. The two forms are mutually exclusive.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AddOnPrice {
    Single(Price),
    Split { monthly: Price, annual: Price },
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AddOn {
    pub name: String,
    pub description: Option<String>,
    /// Plans this add-on can be bought with. Empty means every plan.
    pub available_for: Vec<String>,
    pub price: AddOnPrice,
    pub unit: Option<String>,
    /// Overridden features only, each a copy of the global definition.
    pub features: BTreeMap<String, Feature>,
    pub usage_limits: BTreeMap<String, UsageLimit>,
    /// Amounts added on top of the plan's usage limits.
    pub usage_limits_extensions: BTreeMap<String, UsageLimit>,
}

impl AddOn {
    pub fn new(name: impl Into<String>, price: AddOnPrice) -> Self {
        AddOn {
            name: name.into(),
            description: None,
            available_for: Vec::new(),
            price,
            unit: None,
            features: BTreeMap::new(),
            usage_limits: BTreeMap::new(),
            usage_limits_extensions: BTreeMap::new(),
        }
    }

    pub fn is_available_for(&self, plan: &str) -> bool {
        self.available_for.is_empty() || self.available_for.iter().any(|p| p == plan)
    }
}
