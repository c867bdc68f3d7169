//! Read-modify-write operations against a stored pricing document.

use pricing_storage::{DocumentStore, Revision, StorageError};
use tracing::{debug, info};

use crate::error::{EntityKind, PricingError};
use crate::model::{AddOn, Feature, FeatureValue, Plan, Price, PricingManager, UsageLimit, ValueType};
use crate::{dump, load_str};

/// Runs graph mutations against the document held by a [`DocumentStore`].
///
/// Every call reads the stored document, migrates and parses it, applies the
/// change, then writes the serialized result back guarded by the revision it
/// read. A writer that lost the race gets
/// [`StorageError::ConcurrentConflict`] and nothing is written; callers that
/// want to retry simply call again.
pub struct PricingService<S> {
    store: S,
}

impl<S: DocumentStore> PricingService<S> {
    pub fn new(store: S) -> Self {
        PricingService { store }
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    /// The current configuration, upgraded to the latest schema version.
    pub fn load(&self) -> Result<PricingManager, PricingError> {
        let doc = self.store.load()?;
        debug!(location = %self.store.location(), revision = %doc.revision, "loaded pricing document");
        load_str(&doc.content)
    }

    pub fn get_plan(&self, name: &str) -> Result<Plan, PricingError> {
        self.load()?
            .plan(name)
            .cloned()
            .ok_or_else(|| PricingError::not_found(EntityKind::Plan, name))
    }

    /// Overwrite the stored configuration with `manager`, creating the
    /// document if the store is empty.
    pub fn replace_all(&self, manager: &PricingManager) -> Result<Revision, PricingError> {
        let text = dump(manager)?;
        let revision = match self.store.load() {
            Ok(current) => self.store.replace(&text, &current.revision)?,
            Err(StorageError::DocumentNotFound { .. }) => self.store.create(&text)?,
            Err(e) => return Err(e.into()),
        };
        info!(location = %self.store.location(), %revision, "replaced pricing configuration");
        Ok(revision)
    }

    /// Apply `change` to the stored configuration and persist the result.
    pub fn update<F>(&self, action: &str, change: F) -> Result<Revision, PricingError>
    where
        F: FnOnce(&mut PricingManager) -> Result<(), PricingError>,
    {
        let current = self.store.load()?;
        let mut manager = load_str(&current.content)?;
        change(&mut manager)?;
        let text = dump(&manager)?;
        let revision = self.store.replace(&text, &current.revision)?;
        info!(action, location = %self.store.location(), %revision, "pricing configuration updated");
        Ok(revision)
    }

    pub fn add_plan(&self, plan: Plan) -> Result<Revision, PricingError> {
        let action = format!("add plan {}", plan.name);
        self.update(&action, |m| m.add_plan(plan))
    }

    /// Replace the plan `previous`; `plan.name` may rename it.
    pub fn update_plan(&self, previous: &str, plan: Plan) -> Result<Revision, PricingError> {
        self.update(&format!("update plan {previous}"), |m| m.update_plan(previous, plan))
    }

    pub fn remove_plan(&self, name: &str) -> Result<Revision, PricingError> {
        self.update(&format!("remove plan {name}"), |m| m.remove_plan(name).map(drop))
    }

    pub fn set_plan_price(&self, plan: &str, price: Price) -> Result<Revision, PricingError> {
        self.update(&format!("set price of plan {plan}"), |m| m.set_plan_price(plan, price))
    }

    /// Set a plan's price from a `#variable` formula.
    pub fn set_plan_formula_price(&self, plan: &str, formula: &str) -> Result<Revision, PricingError> {
        self.update(&format!("set price of plan {plan}"), |m| {
            let price = m.formula_price(formula)?;
            m.set_plan_price(plan, price)
        })
    }

    pub fn set_plan_feature_value(
        &self,
        plan: &str,
        feature: &str,
        value: FeatureValue,
    ) -> Result<Revision, PricingError> {
        self.update(&format!("set {feature} of plan {plan}"), |m| {
            m.set_plan_feature_value(plan, feature, value)
        })
    }

    pub fn set_plan_usage_limit_value(
        &self,
        plan: &str,
        limit: &str,
        value: FeatureValue,
    ) -> Result<Revision, PricingError> {
        self.update(&format!("set {limit} of plan {plan}"), |m| {
            m.set_plan_usage_limit_value(plan, limit, value)
        })
    }

    pub fn add_feature(&self, feature: Feature) -> Result<Revision, PricingError> {
        let action = format!("add feature {}", feature.name);
        self.update(&action, |m| m.add_feature(feature))
    }

    pub fn update_feature(&self, previous: &str, feature: Feature) -> Result<Revision, PricingError> {
        self.update(&format!("update feature {previous}"), |m| {
            m.update_feature(previous, feature)
        })
    }

    pub fn remove_feature(&self, name: &str) -> Result<Revision, PricingError> {
        self.update(&format!("remove feature {name}"), |m| m.remove_feature(name).map(drop))
    }

    pub fn set_feature_expression(
        &self,
        name: &str,
        expression: Option<String>,
    ) -> Result<Revision, PricingError> {
        self.update(&format!("set expression of feature {name}"), |m| {
            m.set_feature_expression(name, expression)
        })
    }

    pub fn set_feature_value_type(
        &self,
        name: &str,
        value_type: ValueType,
        default_value: FeatureValue,
    ) -> Result<Revision, PricingError> {
        self.update(&format!("set value type of feature {name}"), |m| {
            m.set_feature_value_type(name, value_type, default_value)
        })
    }

    pub fn add_usage_limit(&self, limit: UsageLimit) -> Result<Revision, PricingError> {
        let action = format!("add usage limit {}", limit.name);
        self.update(&action, |m| m.add_usage_limit(limit))
    }

    pub fn update_usage_limit(&self, previous: &str, limit: UsageLimit) -> Result<Revision, PricingError> {
        self.update(&format!("update usage limit {previous}"), |m| {
            m.update_usage_limit(previous, limit)
        })
    }

    pub fn remove_usage_limit(&self, name: &str) -> Result<Revision, PricingError> {
        self.update(&format!("remove usage limit {name}"), |m| {
            m.remove_usage_limit(name).map(drop)
        })
    }

    pub fn add_add_on(&self, add_on: AddOn) -> Result<Revision, PricingError> {
        let action = format!("add add-on {}", add_on.name);
        self.update(&action, |m| m.add_add_on(add_on))
    }

    pub fn update_add_on(&self, previous: &str, add_on: AddOn) -> Result<Revision, PricingError> {
        self.update(&format!("update add-on {previous}"), |m| m.update_add_on(previous, add_on))
    }

    pub fn remove_add_on(&self, name: &str) -> Result<Revision, PricingError> {
        self.update(&format!("remove add-on {name}"), |m| m.remove_add_on(name).map(drop))
    }
}
