use std::collections::BTreeMap;

use pricing_expr::Value;
use time::Date;

use super::{AddOn, Feature, Plan, UsageLimit};
use crate::version::Version;

/// Root of a pricing configuration.
#[derive(Debug, Clone, PartialEq)]
pub struct PricingManager {
    pub version: Version,
    pub saas_name: String,
    pub currency: String,
    pub created_at: Date,
    pub has_annual_payment: bool,
    pub starts: Option<Date>,
    pub ends: Option<Date>,
    /// Named constants for price formulas.
    pub variables: BTreeMap<String, Value>,
    pub features: BTreeMap<String, Feature>,
    pub usage_limits: BTreeMap<String, UsageLimit>,
    pub plans: Option<BTreeMap<String, Plan>>,
    pub add_ons: Option<BTreeMap<String, AddOn>>,
}

impl PricingManager {
    pub fn plan(&self, name: &str) -> Option<&Plan> {
        self.plans.as_ref().and_then(|plans| plans.get(name))
    }

    pub fn add_on(&self, name: &str) -> Option<&AddOn> {
        self.add_ons.as_ref().and_then(|add_ons| add_ons.get(name))
    }

    pub fn plan_names(&self) -> impl Iterator<Item = &str> {
        self.plans.iter().flat_map(|plans| plans.keys().map(String::as_str))
    }

    /// Whether `date` lies inside the optional `starts`..=`ends` window.
    pub fn is_active_on(&self, date: Date) -> bool {
        self.starts.map_or(true, |s| s <= date) && self.ends.map_or(true, |e| date <= e)
    }
}
