//! In-place edits of a [`PricingManager`] that keep the graph consistent.
//!
//! Every plan holds one copy per global feature and usage limit; add-ons hold
//! copies of the entries they override. The operations here keep those copies
//! in step with the global definitions and reject edits that would leave a
//! dangling name or an ill-typed value behind.

use std::collections::BTreeMap;

use pricing_expr::is_blank;
use tracing::debug;

use crate::error::{EntityKind, PricingError};
use crate::model::{
    AddOn, Feature, FeatureValue, Plan, Price, PricingManager, UsageLimit, ValueType,
};
use crate::parser::parse_price;

fn expected_of(feature: &Feature) -> String {
    if feature.kind.is_payment() {
        "a list of payment methods".to_owned()
    } else {
        feature.value_type.to_string()
    }
}

fn check_expression(owner: &str, expression: Option<&str>) -> Result<(), PricingError> {
    match expression {
        Some(src) if !is_blank(src) => pricing_expr::parse(src).map(|_| ()).map_err(|source| {
            PricingError::Expression {
                context: owner.to_owned(),
                source,
            }
        }),
        _ => Ok(()),
    }
}

fn validate_feature(feature: &Feature) -> Result<(), PricingError> {
    if !feature.accepts(&feature.default_value) {
        return Err(PricingError::InvalidDefaultValue(format!(
            "The feature {} does not have a valid defaultValue. Current valueType: {}; Current defaultValue: {}",
            feature.name,
            expected_of(feature),
            feature.default_value.describe()
        )));
    }
    let owner = format!("feature {}", feature.name);
    check_expression(&owner, feature.expression.as_deref())?;
    check_expression(&owner, feature.server_expression.as_deref())
}

/// The value a copy keeps across an update of its global definition.
///
/// Copies that sat on the old default follow the new one, and so does every
/// copy once the value type changes.
fn carried_value(
    copy: Option<&FeatureValue>,
    old_default: &FeatureValue,
    type_changed: bool,
    accepts: impl Fn(&FeatureValue) -> bool,
) -> Option<FeatureValue> {
    match copy {
        Some(v) if !type_changed && v != old_default && accepts(v) => Some(v.clone()),
        _ => None,
    }
}

/// Point usage limit links at a renamed feature.
fn relink(limits: &mut BTreeMap<String, UsageLimit>, previous: &str, current: &str) {
    for links in limits.values_mut().filter_map(|l| l.linked_features.as_mut()) {
        for link in links.iter_mut().filter(|l| l.as_str() == previous) {
            *link = current.to_owned();
        }
    }
}

impl PricingManager {
    // ──────────────────────────────────────────────
    // Copies
    // ──────────────────────────────────────────────

    /// A plan or add-on copy of the global feature `name` carrying `value`.
    pub fn feature_copy(&self, name: &str, value: FeatureValue) -> Result<Feature, PricingError> {
        let global = self.features.get(name).ok_or_else(|| {
            PricingError::FeatureNotFound(format!(
                "The feature {name} is not defined in the global features"
            ))
        })?;
        if !global.accepts(&value) {
            return Err(PricingError::ValueMismatch {
                name: name.to_owned(),
                expected: expected_of(global),
                got: value.describe(),
            });
        }
        Ok(global.copy_with(Some(value)))
    }

    pub fn usage_limit_copy(&self, name: &str, value: FeatureValue) -> Result<UsageLimit, PricingError> {
        let global = self.usage_limits.get(name).ok_or_else(|| {
            PricingError::FeatureNotFound(format!(
                "The usageLimit {name} is not defined in the global usageLimits"
            ))
        })?;
        if !global.accepts(&value) {
            return Err(PricingError::ValueMismatch {
                name: name.to_owned(),
                expected: global.value_type.to_string(),
                got: value.describe(),
            });
        }
        Ok(global.copy_with(Some(value)))
    }

    /// Rebuild caller-supplied copies from the global definitions, keeping
    /// only their values.
    fn rebuild_features(
        &self,
        given: &BTreeMap<String, Feature>,
    ) -> Result<BTreeMap<String, Feature>, PricingError> {
        given
            .iter()
            .map(|(name, f)| Ok((name.clone(), self.feature_copy(name, f.effective_value().clone())?)))
            .collect()
    }

    fn rebuild_usage_limits(
        &self,
        given: &BTreeMap<String, UsageLimit>,
    ) -> Result<BTreeMap<String, UsageLimit>, PricingError> {
        given
            .iter()
            .map(|(name, l)| {
                Ok((name.clone(), self.usage_limit_copy(name, l.effective_value().clone())?))
            })
            .collect()
    }

    fn plans_mut(&mut self) -> impl Iterator<Item = &mut Plan> {
        self.plans.iter_mut().flat_map(|plans| plans.values_mut())
    }

    fn add_ons_mut(&mut self) -> impl Iterator<Item = &mut AddOn> {
        self.add_ons.iter_mut().flat_map(|add_ons| add_ons.values_mut())
    }

    fn plan_mut(&mut self, name: &str) -> Result<&mut Plan, PricingError> {
        self.plans
            .as_mut()
            .and_then(|plans| plans.get_mut(name))
            .ok_or_else(|| PricingError::not_found(EntityKind::Plan, name))
    }

    // ──────────────────────────────────────────────
    // Plans
    // ──────────────────────────────────────────────

    /// Insert a new plan. Entries already in `plan.features` and
    /// `plan.usage_limits` are taken as overrides; every other global entry
    /// is copied in with its default value.
    pub fn add_plan(&mut self, plan: Plan) -> Result<(), PricingError> {
        if self.plan(&plan.name).is_some() {
            return Err(PricingError::already_exists(EntityKind::Plan, &plan.name));
        }
        let plan = self.fill_plan(plan)?;
        debug!(plan = %plan.name, "adding plan");
        self.plans
            .get_or_insert_with(BTreeMap::new)
            .insert(plan.name.clone(), plan);
        Ok(())
    }

    fn fill_plan(&self, mut plan: Plan) -> Result<Plan, PricingError> {
        let mut features = self.rebuild_features(&plan.features)?;
        for (name, global) in &self.features {
            features
                .entry(name.clone())
                .or_insert_with(|| global.copy_with(None));
        }
        let mut usage_limits = self.rebuild_usage_limits(&plan.usage_limits)?;
        for (name, global) in &self.usage_limits {
            usage_limits
                .entry(name.clone())
                .or_insert_with(|| global.copy_with(None));
        }
        plan.features = features;
        plan.usage_limits = usage_limits;
        Ok(plan)
    }

    /// Replace the plan `previous` with `plan`, which may carry a new name.
    /// Add-ons available for the old name follow the rename.
    pub fn update_plan(&mut self, previous: &str, plan: Plan) -> Result<(), PricingError> {
        if self.plan(previous).is_none() {
            return Err(PricingError::not_found(EntityKind::Plan, previous));
        }
        if plan.name != previous && self.plan(&plan.name).is_some() {
            return Err(PricingError::already_exists(EntityKind::Plan, &plan.name));
        }
        let plan = self.fill_plan(plan)?;
        let renamed = plan.name != previous;
        if renamed {
            for add_on in self.add_ons_mut() {
                for name in add_on.available_for.iter_mut().filter(|p| p.as_str() == previous) {
                    *name = plan.name.clone();
                }
            }
        }
        debug!(previous, plan = %plan.name, "updating plan");
        if let Some(plans) = self.plans.as_mut() {
            plans.remove(previous);
            plans.insert(plan.name.clone(), plan);
        }
        Ok(())
    }

    /// Remove a plan. Rejected while an add-on names it in `availableFor`.
    pub fn remove_plan(&mut self, name: &str) -> Result<Plan, PricingError> {
        if self.plan(name).is_none() {
            return Err(PricingError::not_found(EntityKind::Plan, name));
        }
        if let Some(add_on) = self
            .add_ons
            .iter()
            .flat_map(|a| a.values())
            .find(|a| a.available_for.iter().any(|p| p == name))
        {
            return Err(PricingError::PlanInUse {
                plan: name.to_owned(),
                add_on: add_on.name.clone(),
            });
        }
        self.plans
            .as_mut()
            .and_then(|plans| plans.remove(name))
            .ok_or_else(|| PricingError::not_found(EntityKind::Plan, name))
    }

    pub fn set_plan_price(&mut self, plan: &str, price: Price) -> Result<(), PricingError> {
        self.plan_mut(plan)?.price = price;
        Ok(())
    }

    /// Resolve a `#variable` price formula against the document variables.
    pub fn formula_price(&self, source: &str) -> Result<Price, PricingError> {
        match parse_price(
            &serde_yaml::Value::from(source),
            "price formula",
            &self.variables,
        )? {
            Price::Text(text) => Err(PricingError::parsing(format!(
                "{text} does not reference any variable; use a text price instead"
            ))),
            price => Ok(price),
        }
    }

    pub fn set_plan_feature_value(
        &mut self,
        plan: &str,
        feature: &str,
        value: FeatureValue,
    ) -> Result<(), PricingError> {
        let copy = self.feature_copy(feature, value)?;
        self.plan_mut(plan)?.features.insert(feature.to_owned(), copy);
        Ok(())
    }

    pub fn set_plan_usage_limit_value(
        &mut self,
        plan: &str,
        limit: &str,
        value: FeatureValue,
    ) -> Result<(), PricingError> {
        let copy = self.usage_limit_copy(limit, value)?;
        self.plan_mut(plan)?.usage_limits.insert(limit.to_owned(), copy);
        Ok(())
    }

    // ──────────────────────────────────────────────
    // Features
    // ──────────────────────────────────────────────

    /// Add a global feature and give every plan a default-valued copy.
    pub fn add_feature(&mut self, mut feature: Feature) -> Result<(), PricingError> {
        if self.features.contains_key(&feature.name) {
            return Err(PricingError::already_exists(EntityKind::Feature, &feature.name));
        }
        validate_feature(&feature)?;

        feature.value = None;
        for plan in self.plans_mut() {
            plan.features
                .insert(feature.name.clone(), feature.copy_with(None));
        }
        debug!(feature = %feature.name, "adding feature");
        self.features.insert(feature.name.clone(), feature);
        Ok(())
    }

    /// Replace the global feature `previous` with `feature`, which may carry
    /// a new name.
    ///
    /// Plan copies and add-on overrides take the new definition and keep
    /// their values; plan copies that held the old default take the new one.
    /// When the value type changes, plan copies fall back to the new default
    /// and add-on overrides are dropped. A rename also rewrites every usage
    /// limit link to the old name.
    pub fn update_feature(&mut self, previous: &str, mut feature: Feature) -> Result<(), PricingError> {
        let old = self
            .features
            .get(previous)
            .cloned()
            .ok_or_else(|| PricingError::not_found(EntityKind::Feature, previous))?;
        if feature.name != previous && self.features.contains_key(&feature.name) {
            return Err(PricingError::already_exists(EntityKind::Feature, &feature.name));
        }
        validate_feature(&feature)?;

        feature.value = None;
        let type_changed =
            old.value_type != feature.value_type || old.kind.is_payment() != feature.kind.is_payment();
        let name = feature.name.clone();
        let carry = |copy: Option<&Feature>| {
            carried_value(
                copy.and_then(|c| c.value.as_ref()),
                &old.default_value,
                type_changed,
                |v| feature.accepts(v),
            )
        };

        for plan in self.plans_mut() {
            let copy = plan.features.remove(previous);
            plan.features.insert(name.clone(), feature.copy_with(carry(copy.as_ref())));
            relink(&mut plan.usage_limits, previous, &name);
        }
        for add_on in self.add_ons_mut() {
            if let Some(value) = add_on.features.remove(previous).and_then(|c| c.value) {
                if !type_changed && feature.accepts(&value) {
                    add_on.features.insert(name.clone(), feature.copy_with(Some(value)));
                }
            }
            relink(&mut add_on.usage_limits, previous, &name);
            relink(&mut add_on.usage_limits_extensions, previous, &name);
        }
        relink(&mut self.usage_limits, previous, &name);

        debug!(previous, feature = %name, type_changed, "updating feature");
        self.features.remove(previous);
        self.features.insert(name, feature);
        Ok(())
    }

    /// Remove a global feature together with every copy and every usage
    /// limit link that names it.
    pub fn remove_feature(&mut self, name: &str) -> Result<Feature, PricingError> {
        if !self.features.contains_key(name) {
            return Err(PricingError::not_found(EntityKind::Feature, name));
        }
        if self.features.len() == 1 {
            return Err(PricingError::Invariant(
                "You cannot delete a feature from a one-feature pricing configuration".to_owned(),
            ));
        }

        fn unlink(limits: &mut BTreeMap<String, UsageLimit>, feature: &str) {
            for limit in limits.values_mut() {
                if let Some(links) = &mut limit.linked_features {
                    links.retain(|l| l != feature);
                    if links.is_empty() {
                        limit.linked_features = None;
                    }
                }
            }
        }

        unlink(&mut self.usage_limits, name);
        for plan in self.plans_mut() {
            plan.features.remove(name);
            unlink(&mut plan.usage_limits, name);
        }
        for add_on in self.add_ons_mut() {
            add_on.features.remove(name);
            unlink(&mut add_on.usage_limits, name);
            unlink(&mut add_on.usage_limits_extensions, name);
        }
        self.features
            .remove(name)
            .ok_or_else(|| PricingError::not_found(EntityKind::Feature, name))
    }

    /// Replace a feature's entitlement rule everywhere it is copied.
    pub fn set_feature_expression(
        &mut self,
        name: &str,
        expression: Option<String>,
    ) -> Result<(), PricingError> {
        if !self.features.contains_key(name) {
            return Err(PricingError::not_found(EntityKind::Feature, name));
        }
        check_expression(&format!("feature {name}"), expression.as_deref())?;

        let apply = |f: &mut Feature| f.expression = expression.clone();
        if let Some(global) = self.features.get_mut(name) {
            apply(global);
        }
        for plan in self.plans_mut() {
            if let Some(copy) = plan.features.get_mut(name) {
                apply(copy);
            }
        }
        for add_on in self.add_ons_mut() {
            if let Some(copy) = add_on.features.get_mut(name) {
                apply(copy);
            }
        }
        Ok(())
    }

    /// Change a feature's value type. Plan copies fall back to the new
    /// default and add-on overrides of the feature are dropped.
    pub fn set_feature_value_type(
        &mut self,
        name: &str,
        value_type: ValueType,
        default_value: FeatureValue,
    ) -> Result<(), PricingError> {
        let global = self
            .features
            .get_mut(name)
            .ok_or_else(|| PricingError::not_found(EntityKind::Feature, name))?;
        if global.kind.is_payment() {
            return Err(PricingError::InvalidValueType(format!(
                "The feature {name} is a payment feature; its values are always payment method lists"
            )));
        }
        if !default_value.fits(value_type) {
            return Err(PricingError::ValueMismatch {
                name: name.to_owned(),
                expected: value_type.to_string(),
                got: default_value.describe(),
            });
        }
        global.value_type = value_type;
        global.default_value = default_value;
        let reset = global.copy_with(None);

        for plan in self.plans_mut() {
            if plan.features.contains_key(name) {
                plan.features.insert(name.to_owned(), reset.clone());
            }
        }
        for add_on in self.add_ons_mut() {
            add_on.features.remove(name);
        }
        Ok(())
    }

    // ──────────────────────────────────────────────
    // Usage limits
    // ──────────────────────────────────────────────

    pub fn add_usage_limit(&mut self, mut limit: UsageLimit) -> Result<(), PricingError> {
        if self.usage_limits.contains_key(&limit.name) {
            return Err(PricingError::already_exists(EntityKind::UsageLimit, &limit.name));
        }
        self.validate_usage_limit(&limit)?;

        limit.value = None;
        for plan in self.plans_mut() {
            plan.usage_limits
                .insert(limit.name.clone(), limit.copy_with(None));
        }
        debug!(usage_limit = %limit.name, "adding usage limit");
        self.usage_limits.insert(limit.name.clone(), limit);
        Ok(())
    }

    fn validate_usage_limit(&self, limit: &UsageLimit) -> Result<(), PricingError> {
        if !limit.accepts(&limit.default_value) {
            return Err(PricingError::InvalidDefaultValue(format!(
                "The usageLimit {} does not have a valid defaultValue. Current valueType: {}; Current defaultValue: {}",
                limit.name,
                limit.value_type,
                limit.default_value.describe()
            )));
        }
        if let Some(missing) = limit
            .linked_features
            .iter()
            .flatten()
            .find(|f| !self.features.contains_key(*f))
        {
            return Err(PricingError::InvalidLinkedFeature {
                limit: limit.name.clone(),
                feature: missing.clone(),
            });
        }
        check_expression(&format!("usage limit {}", limit.name), limit.expression.as_deref())
    }

    /// Replace the global usage limit `previous` with `limit`, which may
    /// carry a new name.
    ///
    /// Copies keep their values under the same rules as
    /// [`update_feature`](Self::update_feature). Add-on extensions are
    /// dropped once the limit is no longer numeric.
    pub fn update_usage_limit(&mut self, previous: &str, mut limit: UsageLimit) -> Result<(), PricingError> {
        let old = self
            .usage_limits
            .get(previous)
            .cloned()
            .ok_or_else(|| PricingError::not_found(EntityKind::UsageLimit, previous))?;
        if limit.name != previous && self.usage_limits.contains_key(&limit.name) {
            return Err(PricingError::already_exists(EntityKind::UsageLimit, &limit.name));
        }
        self.validate_usage_limit(&limit)?;

        limit.value = None;
        let type_changed = old.value_type != limit.value_type;
        let name = limit.name.clone();
        let keep = |value: &FeatureValue| !type_changed && limit.accepts(value);

        for plan in self.plans_mut() {
            let copy = plan.usage_limits.remove(previous);
            let value = carried_value(
                copy.as_ref().and_then(|c| c.value.as_ref()),
                &old.default_value,
                type_changed,
                |v| limit.accepts(v),
            );
            plan.usage_limits.insert(name.clone(), limit.copy_with(value));
        }
        for add_on in self.add_ons_mut() {
            if let Some(value) = add_on.usage_limits.remove(previous).and_then(|c| c.value) {
                if keep(&value) {
                    add_on.usage_limits.insert(name.clone(), limit.copy_with(Some(value)));
                }
            }
            if let Some(value) = add_on.usage_limits_extensions.remove(previous).and_then(|c| c.value) {
                if keep(&value) && limit.value_type == ValueType::Numeric {
                    add_on
                        .usage_limits_extensions
                        .insert(name.clone(), limit.copy_with(Some(value)));
                }
            }
        }

        debug!(previous, usage_limit = %name, type_changed, "updating usage limit");
        self.usage_limits.remove(previous);
        self.usage_limits.insert(name, limit);
        Ok(())
    }

    pub fn remove_usage_limit(&mut self, name: &str) -> Result<UsageLimit, PricingError> {
        let removed = self
            .usage_limits
            .remove(name)
            .ok_or_else(|| PricingError::not_found(EntityKind::UsageLimit, name))?;
        for plan in self.plans_mut() {
            plan.usage_limits.remove(name);
        }
        for add_on in self.add_ons_mut() {
            add_on.usage_limits.remove(name);
            add_on.usage_limits_extensions.remove(name);
        }
        Ok(removed)
    }

    // ──────────────────────────────────────────────
    // Add-ons
    // ──────────────────────────────────────────────

    /// Insert an add-on. Its `features`, `usage_limits` and
    /// `usage_limits_extensions` hold overrides only.
    pub fn add_add_on(&mut self, add_on: AddOn) -> Result<(), PricingError> {
        if self.add_on(&add_on.name).is_some() {
            return Err(PricingError::already_exists(EntityKind::AddOn, &add_on.name));
        }
        let add_on = self.prepare_add_on(add_on)?;
        debug!(add_on = %add_on.name, "adding add-on");
        self.add_ons
            .get_or_insert_with(BTreeMap::new)
            .insert(add_on.name.clone(), add_on);
        Ok(())
    }

    fn prepare_add_on(&self, mut add_on: AddOn) -> Result<AddOn, PricingError> {
        if let Some(plan) = add_on.available_for.iter().find(|p| self.plan(p).is_none()) {
            return Err(PricingError::InvalidPlanReference {
                add_on: add_on.name.clone(),
                plan: plan.clone(),
            });
        }
        add_on.features = self.rebuild_features(&add_on.features)?;
        add_on.usage_limits = self.rebuild_usage_limits(&add_on.usage_limits)?;
        let extensions = self.rebuild_usage_limits(&add_on.usage_limits_extensions)?;
        if let Some(limit) = extensions
            .values()
            .find(|l| l.value_type != ValueType::Numeric)
        {
            return Err(PricingError::InvalidValueType(format!(
                "The usageLimitExtension {} of the add-on {} must be NUMERIC. Current valueType: {}",
                limit.name, add_on.name, limit.value_type
            )));
        }
        add_on.usage_limits_extensions = extensions;
        Ok(add_on)
    }

    /// Replace the add-on `previous` with `add_on`, which may carry a new
    /// name.
    pub fn update_add_on(&mut self, previous: &str, add_on: AddOn) -> Result<(), PricingError> {
        if self.add_on(previous).is_none() {
            return Err(PricingError::not_found(EntityKind::AddOn, previous));
        }
        if add_on.name != previous && self.add_on(&add_on.name).is_some() {
            return Err(PricingError::already_exists(EntityKind::AddOn, &add_on.name));
        }
        let add_on = self.prepare_add_on(add_on)?;
        debug!(previous, add_on = %add_on.name, "updating add-on");
        if let Some(add_ons) = self.add_ons.as_mut() {
            add_ons.remove(previous);
            add_ons.insert(add_on.name.clone(), add_on);
        }
        Ok(())
    }

    pub fn remove_add_on(&mut self, name: &str) -> Result<AddOn, PricingError> {
        self.add_ons
            .as_mut()
            .and_then(|add_ons| add_ons.remove(name))
            .ok_or_else(|| PricingError::not_found(EntityKind::AddOn, name))
    }
}

#[cfg(test)]
mod tests {
    use rust_decimal::Decimal;

    use super::*;
    use crate::model::{AddOnPrice, FeatureKind, PaymentMethod, UsageLimitKind};
    use crate::load_str;

    const DOC: &str = r##"
version: "2.0"
saasName: Petclinic
createdAt: "2024-01-15"
currency: EUR
variables:
  base: 10
features:
  maxPets:
    valueType: NUMERIC
    defaultValue: 2
    expression: "userContext['pets'] < planContext['maxPets']"
    type: DOMAIN
  haveCalendar:
    valueType: BOOLEAN
    defaultValue: false
    expression: "planContext['haveCalendar']"
    type: DOMAIN
  payments:
    valueType: TEXT
    defaultValue: [CARD]
    type: PAYMENT
usageLimits:
  visits:
    valueType: NUMERIC
    defaultValue: 1
    type: RENEWABLE
    linkedFeatures: [haveCalendar]
plans:
  BASIC:
    price: 0
  ADVANCED:
    price: "#base * 2"
    features:
      maxPets:
        value: 4
addOns:
  extraVisits:
    availableFor: [ADVANCED]
    price: 3
    usageLimitsExtensions:
      visits:
        value: 5
"##;

    fn manager() -> PricingManager {
        load_str(DOC).unwrap()
    }

    #[test]
    fn added_plan_gets_every_global_entry() {
        let mut m = manager();
        let mut plan = Plan::new("PRO", Price::Amount(Decimal::from(20)));
        plan.features.insert(
            "haveCalendar".into(),
            m.feature_copy("haveCalendar", true.into()).unwrap(),
        );
        m.add_plan(plan).unwrap();
        let pro = m.plan("PRO").unwrap();
        assert_eq!(pro.features.len(), 3);
        assert_eq!(pro.usage_limits.len(), 1);
        assert_eq!(pro.feature("haveCalendar").unwrap().effective_value(), &FeatureValue::Bool(true));
        assert_eq!(pro.feature("maxPets").unwrap().effective_value(), &FeatureValue::from(2));
    }

    #[test]
    fn duplicate_plan_names_the_plan() {
        let mut m = manager();
        let err = m
            .add_plan(Plan::new("BASIC", Price::Amount(Decimal::ONE)))
            .unwrap_err();
        assert!(matches!(err, PricingError::AlreadyExists { kind: EntityKind::Plan, .. }));
        assert!(err.to_string().contains("BASIC"));
        assert!(err.to_string().contains("already exists"));
    }

    #[test]
    fn plan_referenced_by_add_on_is_kept() {
        let mut m = manager();
        assert!(matches!(
            m.remove_plan("ADVANCED"),
            Err(PricingError::PlanInUse { .. })
        ));
        m.remove_plan("BASIC").unwrap();
        assert!(m.plan("BASIC").is_none());
        assert!(matches!(m.remove_plan("BASIC"), Err(PricingError::NotFound { .. })));
    }

    #[test]
    fn new_feature_reaches_every_plan() {
        let mut m = manager();
        let f = Feature::new("support", FeatureKind::Support, ValueType::Text, "email".into());
        m.add_feature(f).unwrap();
        for plan in m.plans.as_ref().unwrap().values() {
            assert_eq!(plan.feature("support").unwrap().effective_value(), &FeatureValue::from("email"));
        }
        assert_eq!(m.features["support"].value, None);
    }

    #[test]
    fn feature_default_must_match_type() {
        let mut m = manager();
        let f = Feature::new("broken", FeatureKind::Tool, ValueType::Boolean, 3.into());
        assert!(matches!(m.add_feature(f), Err(PricingError::InvalidDefaultValue(_))));
        let f = Feature::new("rule", FeatureKind::Tool, ValueType::Boolean, false.into())
            .with_expression("planContext['rule'] <");
        assert!(matches!(m.add_feature(f), Err(PricingError::Expression { .. })));
    }

    #[test]
    fn removed_feature_leaves_no_trace() {
        let mut m = manager();
        m.remove_feature("haveCalendar").unwrap();
        assert!(m.plans.as_ref().unwrap().values().all(|p| p.feature("haveCalendar").is_none()));
        assert_eq!(m.usage_limits["visits"].linked_features, None);
        assert_eq!(m.plan("BASIC").unwrap().usage_limit("visits").unwrap().linked_features, None);
    }

    #[test]
    fn last_feature_cannot_be_removed() {
        let mut m = manager();
        m.remove_feature("haveCalendar").unwrap();
        m.remove_feature("payments").unwrap();
        assert!(matches!(m.remove_feature("maxPets"), Err(PricingError::Invariant(_))));
    }

    #[test]
    fn plan_value_is_type_checked() {
        let mut m = manager();
        let err = m
            .set_plan_feature_value("BASIC", "maxPets", "many".into())
            .unwrap_err();
        match err {
            PricingError::ValueMismatch { expected, .. } => assert_eq!(expected, "NUMERIC"),
            other => panic!("unexpected {other:?}"),
        }
        m.set_plan_feature_value(
            "BASIC",
            "payments",
            FeatureValue::PaymentMethods(vec![PaymentMethod::Invoice]),
        )
        .unwrap();
        assert!(m.set_plan_feature_value("NOPE", "maxPets", 1.into()).is_err());
    }

    #[test]
    fn editing_a_copy_leaves_others_alone() {
        let mut m = manager();
        m.set_plan_feature_value("BASIC", "maxPets", 9.into()).unwrap();
        assert_eq!(m.features["maxPets"].default_value, FeatureValue::from(2));
        assert_eq!(m.features["maxPets"].value, None);
        assert_eq!(
            m.plan("ADVANCED").unwrap().feature("maxPets").unwrap().effective_value(),
            &FeatureValue::from(4)
        );
    }

    #[test]
    fn expression_change_reaches_copies() {
        let mut m = manager();
        m.set_feature_expression("maxPets", Some("userContext['pets'] <= planContext['maxPets']".into()))
            .unwrap();
        assert_eq!(
            m.plan("BASIC").unwrap().feature("maxPets").unwrap().expression.as_deref(),
            Some("userContext['pets'] <= planContext['maxPets']")
        );
        assert!(m.set_feature_expression("maxPets", Some("((".into())).is_err());
    }

    #[test]
    fn value_type_change_resets_copies() {
        let mut m = manager();
        m.set_feature_value_type("maxPets", ValueType::Text, "few".into()).unwrap();
        assert_eq!(
            m.plan("ADVANCED").unwrap().feature("maxPets").unwrap().effective_value(),
            &FeatureValue::from("few")
        );
        assert!(matches!(
            m.set_feature_value_type("payments", ValueType::Boolean, true.into()),
            Err(PricingError::InvalidValueType(_))
        ));
    }

    #[test]
    fn usage_limit_lifecycle() {
        let mut m = manager();
        let mut limit = UsageLimit::new("storage", UsageLimitKind::Capacity, ValueType::Numeric, 5.into());
        limit.linked_features = Some(vec!["ghost".into()]);
        assert!(matches!(
            m.add_usage_limit(limit.clone()),
            Err(PricingError::InvalidLinkedFeature { .. })
        ));
        limit.linked_features = Some(vec!["maxPets".into()]);
        m.add_usage_limit(limit).unwrap();
        assert!(m.plan("BASIC").unwrap().usage_limit("storage").is_some());

        m.remove_usage_limit("visits").unwrap();
        assert!(m.add_on("extraVisits").unwrap().usage_limits_extensions.is_empty());
    }

    #[test]
    fn formula_prices_resolve_against_variables() {
        let m = manager();
        let price = m.formula_price("#base + 5").unwrap();
        assert_eq!(price.amount(), Some(Decimal::from(15)));
        assert!(m.formula_price("Contact sales").is_err());
    }

    #[test]
    fn add_on_checks_plan_references() {
        let mut m = manager();
        let mut a = AddOn::new("phone", AddOnPrice::Single(Price::Amount(Decimal::ONE)));
        a.available_for = vec!["GOLD".into()];
        assert!(matches!(
            m.add_add_on(a.clone()),
            Err(PricingError::InvalidPlanReference { .. })
        ));
        a.available_for = vec!["BASIC".into()];
        m.add_add_on(a).unwrap();
        m.remove_add_on("phone").unwrap();
        assert!(m.remove_add_on("phone").is_err());
    }

    #[test]
    fn feature_rename_carries_into_copies() {
        let mut m = manager();
        let mut f = m.features["maxPets"].clone();
        f.name = "maxAnimals".into();
        f.expression = Some("userContext['pets'] < planContext['maxAnimals']".into());
        m.update_feature("maxPets", f).unwrap();
        assert!(!m.features.contains_key("maxPets"));
        let advanced = m.plan("ADVANCED").unwrap();
        assert!(advanced.feature("maxPets").is_none());
        let copy = advanced.feature("maxAnimals").unwrap();
        assert_eq!(copy.effective_value(), &FeatureValue::from(4));
        assert_eq!(copy.expression.as_deref(), Some("userContext['pets'] < planContext['maxAnimals']"));
        assert_eq!(
            m.plan("BASIC").unwrap().feature("maxAnimals").unwrap().effective_value(),
            &FeatureValue::from(2)
        );
    }

    #[test]
    fn feature_rename_updates_links() {
        let mut m = manager();
        let mut f = m.features["haveCalendar"].clone();
        f.name = "calendar".into();
        m.update_feature("haveCalendar", f).unwrap();
        let links = Some(vec!["calendar".to_owned()]);
        assert_eq!(m.usage_limits["visits"].linked_features, links);
        assert_eq!(m.plan("BASIC").unwrap().usage_limit("visits").unwrap().linked_features, links);
        assert_eq!(
            m.add_on("extraVisits").unwrap().usage_limits_extensions["visits"].linked_features,
            links
        );
    }

    #[test]
    fn update_cannot_take_an_existing_name() {
        let mut m = manager();
        let mut f = m.features["maxPets"].clone();
        f.name = "haveCalendar".into();
        assert!(matches!(
            m.update_feature("maxPets", f),
            Err(PricingError::AlreadyExists { kind: EntityKind::Feature, .. })
        ));
        let mut l = m.usage_limits["visits"].clone();
        l.name = "visits".into();
        m.update_usage_limit("visits", l).unwrap();
        let plan = Plan::new("BASIC", Price::Amount(Decimal::ONE));
        assert!(matches!(
            m.update_plan("ADVANCED", plan),
            Err(PricingError::AlreadyExists { kind: EntityKind::Plan, .. })
        ));
        let ghost = Feature::new("ghost", FeatureKind::Domain, ValueType::Boolean, false.into());
        assert!(matches!(
            m.update_feature("ghost", ghost),
            Err(PricingError::NotFound { kind: EntityKind::Feature, .. })
        ));
    }

    #[test]
    fn default_change_keeps_overrides() {
        let mut m = manager();
        let mut f = m.features["maxPets"].clone();
        f.default_value = 3.into();
        m.update_feature("maxPets", f).unwrap();
        assert_eq!(m.plan("BASIC").unwrap().feature("maxPets").unwrap().effective_value(), &FeatureValue::from(3));
        assert_eq!(m.plan("ADVANCED").unwrap().feature("maxPets").unwrap().effective_value(), &FeatureValue::from(4));
    }

    #[test]
    fn value_type_update_resets_overrides() {
        let mut m = manager();
        let mut a = AddOn::new("petPack", AddOnPrice::Single(Price::Amount(Decimal::ONE)));
        a.features.insert("maxPets".into(), m.feature_copy("maxPets", 10.into()).unwrap());
        m.add_add_on(a).unwrap();

        let mut f = m.features["maxPets"].clone();
        f.value_type = ValueType::Text;
        f.default_value = "few".into();
        m.update_feature("maxPets", f).unwrap();
        assert_eq!(
            m.plan("ADVANCED").unwrap().feature("maxPets").unwrap().effective_value(),
            &FeatureValue::from("few")
        );
        assert!(m.add_on("petPack").unwrap().features.is_empty());

        let mut l = m.usage_limits["visits"].clone();
        l.value_type = ValueType::Boolean;
        l.default_value = true.into();
        m.update_usage_limit("visits", l).unwrap();
        assert!(m.add_on("extraVisits").unwrap().usage_limits_extensions.is_empty());
        assert_eq!(
            m.plan("BASIC").unwrap().usage_limit("visits").unwrap().effective_value(),
            &FeatureValue::Bool(true)
        );
    }

    #[test]
    fn usage_limit_rename_rekeys_extensions() {
        let mut m = manager();
        let mut l = m.usage_limits["visits"].clone();
        l.name = "appointments".into();
        m.update_usage_limit("visits", l).unwrap();
        let extra = m.add_on("extraVisits").unwrap();
        assert_eq!(
            extra.usage_limits_extensions["appointments"].effective_value(),
            &FeatureValue::from(5)
        );
        assert!(m.plan("ADVANCED").unwrap().usage_limit("visits").is_none());
        assert!(m.plan("ADVANCED").unwrap().usage_limit("appointments").is_some());
    }

    #[test]
    fn plan_rename_follows_into_add_ons() {
        let mut m = manager();
        let mut plan = m.plan("ADVANCED").unwrap().clone();
        plan.name = "PREMIUM".into();
        m.update_plan("ADVANCED", plan).unwrap();
        assert!(m.plan("ADVANCED").is_none());
        assert_eq!(
            m.plan("PREMIUM").unwrap().feature("maxPets").unwrap().effective_value(),
            &FeatureValue::from(4)
        );
        assert_eq!(m.add_on("extraVisits").unwrap().available_for, vec!["PREMIUM".to_owned()]);
    }

    #[test]
    fn add_on_update_is_validated() {
        let mut m = manager();
        let mut a = m.add_on("extraVisits").unwrap().clone();
        a.name = "moreVisits".into();
        a.price = AddOnPrice::Single(Price::Amount(Decimal::from(4)));
        m.update_add_on("extraVisits", a.clone()).unwrap();
        assert!(m.add_on("extraVisits").is_none());
        assert_eq!(m.add_on("moreVisits").unwrap().price, a.price);

        a.available_for = vec!["GOLD".into()];
        assert!(matches!(
            m.update_add_on("moreVisits", a),
            Err(PricingError::InvalidPlanReference { .. })
        ));
        assert!(m.add_on("moreVisits").is_some());
    }
}
