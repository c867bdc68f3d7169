//! Building the `planContext` scope for a subscription.

use pricing_core::{AddOn, FeatureValue, Plan, PricingManager};
use pricing_expr::{Context, Value};

use crate::error::EvalError;

/// A plan plus the add-ons bought with it, resolved against a manager.
#[derive(Debug, Clone, Copy)]
pub struct Subscription<'a> {
    pub plan: &'a Plan,
    pub add_ons: &'a [&'a AddOn],
}

/// Look up `plan` and `add_ons` and check each add-on can be bought with it.
pub fn resolve<'a>(
    manager: &'a PricingManager,
    plan: &str,
    add_ons: &[&str],
) -> Result<(&'a Plan, Vec<&'a AddOn>), EvalError> {
    let plan_ref = manager
        .plan(plan)
        .ok_or_else(|| EvalError::UnknownPlan(plan.to_owned()))?;
    let add_on_refs = add_ons
        .iter()
        .map(|name| {
            let add_on = manager
                .add_on(name)
                .ok_or_else(|| EvalError::UnknownAddOn((*name).to_owned()))?;
            if !add_on.is_available_for(plan) {
                return Err(EvalError::AddOnNotAvailable {
                    add_on: (*name).to_owned(),
                    plan: plan.to_owned(),
                });
            }
            Ok(add_on)
        })
        .collect::<Result<Vec<_>, _>>()?;
    Ok((plan_ref, add_on_refs))
}

impl<'a> Subscription<'a> {
    /// Effective feature and usage-limit values for this subscription.
    ///
    /// Starts from the plan's copies, then applies each add-on in order:
    /// feature and usage-limit overrides replace the value, usage-limit
    /// extensions are added to numeric limits. Payment method lists become a
    /// comma-separated string.
    pub fn plan_context(&self) -> Context {
        let mut ctx: Context = self
            .plan
            .features
            .iter()
            .map(|(name, f)| (name.clone(), f.effective_value().to_expr_value()))
            .collect();
        ctx.extend(
            self.plan
                .usage_limits
                .iter()
                .map(|(name, l)| (name.clone(), l.effective_value().to_expr_value())),
        );

        for add_on in self.add_ons {
            for (name, f) in &add_on.features {
                ctx.insert(name.clone(), f.effective_value().to_expr_value());
            }
            for (name, l) in &add_on.usage_limits {
                ctx.insert(name.clone(), l.effective_value().to_expr_value());
            }
            for (name, ext) in &add_on.usage_limits_extensions {
                let FeatureValue::Number(extra) = ext.effective_value() else {
                    continue;
                };
                if let Some(Value::Number(current)) = ctx.get_mut(name) {
                    *current += *extra;
                }
            }
        }
        ctx
    }
}
