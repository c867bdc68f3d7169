//! Per-feature entitlement evaluation.

use pricing_core::{Feature, PricingManager};
use pricing_expr::{eval_expr, is_blank, used_key, Context, Scopes, Value};
use tracing::debug;

use crate::context::{resolve, Subscription};
use crate::error::EvalError;
use crate::status::{Eval, FeatureStatus, FeatureStatusMap};

/// Evaluate one feature's entitlement rule.
///
/// A missing or blank rule denies the feature. Boolean results become
/// `eval: true|false`; numbers and text are reported as text. When the rule
/// compares a `userContext` value relationally, `used` carries that value and
/// `limit` the plan-context value it was compared to, falling back to the
/// plan-context entry named after the feature.
pub fn evaluate_feature(
    feature: &Feature,
    user_context: &Context,
    plan_context: &Context,
) -> Result<FeatureStatus, EvalError> {
    let source = match feature.expression.as_deref() {
        Some(src) if !is_blank(src) => src,
        _ => return Ok(FeatureStatus::denied()),
    };
    let wrap = |source| EvalError::Expression {
        feature: feature.name.clone(),
        source,
    };
    let expr = pricing_expr::parse(source).map_err(wrap)?;
    let scopes = Scopes::entitlement(user_context, plan_context);
    let eval = match eval_expr(&expr, &scopes).map_err(wrap)? {
        Value::Bool(b) => Eval::Bool(b),
        other => Eval::Text(other.to_string()),
    };

    let (used, limit) = match used_key(&expr) {
        Some(key) => {
            let limit_key = key.plan_key.as_deref().unwrap_or(&feature.name);
            (
                user_context.get(&key.user_key).map(Value::to_json),
                plan_context.get(limit_key).map(Value::to_json),
            )
        }
        None => (None, None),
    };
    Ok(FeatureStatus { eval, used, limit })
}

/// Evaluate every feature of `plan` with `add_ons` applied.
pub fn evaluate_plan(
    manager: &PricingManager,
    plan: &str,
    add_ons: &[&str],
    user_context: &Context,
) -> Result<FeatureStatusMap, EvalError> {
    let (plan_ref, add_on_refs) = resolve(manager, plan, add_ons)?;
    let subscription = Subscription {
        plan: plan_ref,
        add_ons: &add_on_refs,
    };
    evaluate_subscription(&subscription, &subscription.plan_context(), user_context)
}

/// Evaluate every feature of an already resolved subscription against its
/// `plan_context`.
pub fn evaluate_subscription(
    subscription: &Subscription<'_>,
    plan_context: &Context,
    user_context: &Context,
) -> Result<FeatureStatusMap, EvalError> {
    let statuses = subscription
        .plan
        .features
        .iter()
        .map(|(name, feature)| {
            Ok((
                name.clone(),
                evaluate_feature(feature, user_context, plan_context)?,
            ))
        })
        .collect::<Result<FeatureStatusMap, EvalError>>()?;
    debug!(
        plan = %subscription.plan.name,
        features = statuses.len(),
        granted = statuses.values().filter(|s| s.eval.is_granted()).count(),
        "evaluated plan"
    );
    Ok(statuses)
}

/// Strict gate for a single feature: `Ok` only if its rule yields `true`.
pub fn check_feature(
    manager: &PricingManager,
    plan: &str,
    feature: &str,
    user_context: &Context,
) -> Result<(), EvalError> {
    let (plan_ref, _) = resolve(manager, plan, &[])?;
    let copy = plan_ref
        .feature(feature)
        .ok_or_else(|| EvalError::UnknownFeature(feature.to_owned()))?;
    let plan_context = Subscription {
        plan: plan_ref,
        add_ons: &[],
    }
    .plan_context();
    let status = evaluate_feature(copy, user_context, &plan_context)?;
    if status.eval.is_granted() {
        Ok(())
    } else {
        Err(EvalError::FeatureDenied {
            feature: feature.to_owned(),
        })
    }
}

/// Whether a client holding `previous` should be handed a fresh token.
pub fn needs_renewal(previous: Option<&FeatureStatusMap>, current: &FeatureStatusMap) -> bool {
    previous != Some(current)
}

#[cfg(test)]
mod tests {
    use super::*;
    use pricing_core::{FeatureKind, ValueType};
    use pricing_expr::context_from_json;
    use serde_json::json;

    fn feature(expr: Option<&str>) -> Feature {
        let mut f = Feature::new("maxPets", FeatureKind::Domain, ValueType::Numeric, 6.into());
        f.expression = expr.map(str::to_owned);
        f
    }

    fn plan_ctx() -> Context {
        context_from_json(&json!({"maxPets": 6, "haveCalendar": true, "support": "HIGH"}))
    }

    #[test]
    fn relational_rule_reports_used_and_limit() {
        let user = context_from_json(&json!({"pets": 2}));
        let status = evaluate_feature(
            &feature(Some("userContext['pets'] < planContext['maxPets']")),
            &user,
            &plan_ctx(),
        )
        .unwrap();
        assert_eq!(status.eval, Eval::Bool(true));
        assert_eq!(status.used, Some(json!(2)));
        assert_eq!(status.limit, Some(json!(6)));
    }

    #[test]
    fn limit_falls_back_to_feature_name() {
        let user = context_from_json(&json!({"pets": 8}));
        let status = evaluate_feature(&feature(Some("userContext['pets'] < 7")), &user, &plan_ctx()).unwrap();
        assert_eq!(status.eval, Eval::Bool(false));
        assert_eq!(status.used, Some(json!(8)));
        assert_eq!(status.limit, Some(json!(6)));
    }

    #[test]
    fn blank_rule_is_denied() {
        let user = Context::new();
        for expr in [None, Some(""), Some("  ")] {
            assert_eq!(
                evaluate_feature(&feature(expr), &user, &plan_ctx()).unwrap(),
                FeatureStatus::denied()
            );
        }
    }

    #[test]
    fn non_boolean_results_are_text() {
        let status = evaluate_feature(&feature(Some("planContext['support']")), &Context::new(), &plan_ctx()).unwrap();
        assert_eq!(status.eval, Eval::Text("HIGH".into()));
        assert_eq!(status.used, None);
        let status = evaluate_feature(&feature(Some("planContext['maxPets']")), &Context::new(), &plan_ctx()).unwrap();
        assert_eq!(status.eval, Eval::Text("6".into()));
    }

    #[test]
    fn evaluation_errors_surface() {
        let err = evaluate_feature(
            &feature(Some("userContext['pets'] < planContext['maxPets']")),
            &Context::new(),
            &plan_ctx(),
        )
        .unwrap_err();
        assert!(matches!(err, EvalError::Expression { ref feature, .. } if feature == "maxPets"));
    }

    #[test]
    fn deeply_nested_rule_is_an_error() {
        let rule = format!("{}true{}", "(".repeat(10_000), ")".repeat(10_000));
        let err = evaluate_feature(&feature(Some(&rule)), &Context::new(), &plan_ctx()).unwrap_err();
        assert!(matches!(err, EvalError::Expression { ref feature, .. } if feature == "maxPets"));
    }

    #[test]
    fn renewal_only_when_features_change() {
        let mut a = FeatureStatusMap::new();
        a.insert("maxPets".into(), FeatureStatus::denied());
        let b = a.clone();
        assert!(!needs_renewal(Some(&a), &b));
        assert!(needs_renewal(None, &b));
        let mut c = b.clone();
        c.insert("maxPets".into(), FeatureStatus { eval: Eval::Bool(true), used: None, limit: None });
        assert!(needs_renewal(Some(&a), &c));
    }
}
