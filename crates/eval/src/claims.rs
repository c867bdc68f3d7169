//! The pricing claims payload handed to the token issuer.

use pricing_core::PricingManager;
use pricing_expr::{context_from_json, Context, Value};
use serde::{Deserialize, Serialize};
use time::OffsetDateTime;

use crate::context::{resolve, Subscription};
use crate::error::EvalError;
use crate::evaluate::evaluate_subscription;
use crate::status::FeatureStatusMap;

/// Default token lifetime: one day.
pub const DEFAULT_EXPIRATION_SECS: i64 = 86_400;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Claims {
    /// Opaque caller-supplied authorities, copied through unchanged.
    pub authorities: serde_json::Value,
    pub features: FeatureStatusMap,
    pub user_context: serde_json::Map<String, serde_json::Value>,
    pub plan_context: serde_json::Map<String, serde_json::Value>,
    pub sub: String,
    /// Seconds since the Unix epoch.
    pub iat: i64,
    pub exp: i64,
}

/// Knobs for building claims.
#[derive(Debug, Clone)]
pub struct ClaimsOptions {
    pub authorities: serde_json::Value,
    pub expiration_secs: i64,
}

impl Default for ClaimsOptions {
    fn default() -> Self {
        ClaimsOptions {
            authorities: serde_json::Value::Null,
            expiration_secs: DEFAULT_EXPIRATION_SECS,
        }
    }
}

fn to_json_map(ctx: &Context) -> serde_json::Map<String, serde_json::Value> {
    ctx.iter().map(|(k, v)| (k.clone(), v.to_json())).collect()
}

/// `username`, else `user`, else `"Default"`.
pub fn subject_of(user_context: &Context) -> String {
    match user_context.get("username").or_else(|| user_context.get("user")) {
        Some(Value::Text(s)) => s.clone(),
        Some(other) => other.to_string(),
        None => "Default".to_owned(),
    }
}

impl Claims {
    pub fn is_expired_at(&self, now: i64) -> bool {
        now >= self.exp
    }

    /// Evaluate `plan` with `add_ons` for `user_context`, stamped at `issued_at`.
    pub fn build(
        manager: &PricingManager,
        plan: &str,
        add_ons: &[&str],
        user_context: &Context,
        options: &ClaimsOptions,
        issued_at: OffsetDateTime,
    ) -> Result<Claims, EvalError> {
        let (plan_ref, add_on_refs) = resolve(manager, plan, add_ons)?;
        let subscription = Subscription {
            plan: plan_ref,
            add_ons: &add_on_refs,
        };
        let plan_context = subscription.plan_context();
        let features = evaluate_subscription(&subscription, &plan_context, user_context)?;

        let iat = issued_at.unix_timestamp();
        let exp = iat
            .checked_add(options.expiration_secs)
            .ok_or(EvalError::ExpirationOverflow {
                iat,
                secs: options.expiration_secs,
            })?;
        Ok(Claims {
            authorities: options.authorities.clone(),
            features,
            user_context: to_json_map(user_context),
            plan_context: to_json_map(&plan_context),
            sub: subject_of(user_context),
            iat,
            exp,
        })
    }

    /// Like [`Claims::build`] for a raw JSON user context. Rules see only the
    /// scalar entries; the `userContext` claim carries the object unchanged.
    pub fn build_from_json(
        manager: &PricingManager,
        plan: &str,
        add_ons: &[&str],
        user_context: &serde_json::Map<String, serde_json::Value>,
        options: &ClaimsOptions,
        issued_at: OffsetDateTime,
    ) -> Result<Claims, EvalError> {
        let scalars = context_from_json(&serde_json::Value::Object(user_context.clone()));
        let mut claims = Claims::build(manager, plan, add_ons, &scalars, options, issued_at)?;
        claims.user_context = user_context.clone();
        Ok(claims)
    }

    /// Like [`Claims::build`], stamped with the current time.
    pub fn build_now(
        manager: &PricingManager,
        plan: &str,
        add_ons: &[&str],
        user_context: &Context,
        options: &ClaimsOptions,
    ) -> Result<Claims, EvalError> {
        Claims::build(manager, plan, add_ons, user_context, options, OffsetDateTime::now_utc())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn subject_prefers_username() {
        assert_eq!(subject_of(&context_from_json(&json!({"username": "ana", "user": "x"}))), "ana");
        assert_eq!(subject_of(&context_from_json(&json!({"user": "bob"}))), "bob");
        assert_eq!(subject_of(&Context::new()), "Default");
    }

    fn one_plan() -> PricingManager {
        pricing_core::load_str(
            r#"
version: "2.0"
saasName: Petclinic
createdAt: "2024-01-15"
currency: EUR
features:
  maxPets:
    valueType: NUMERIC
    defaultValue: 2
    expression: "userContext['pets'] < planContext['maxPets']"
    type: DOMAIN
plans:
  BASIC:
    price: 0
"#,
        )
        .unwrap()
    }

    #[test]
    fn claims_carry_the_plan_evaluation() {
        let manager = one_plan();
        let user = context_from_json(&json!({"pets": 3}));
        let issued = OffsetDateTime::from_unix_timestamp(1_000).unwrap();
        let claims = Claims::build(&manager, "BASIC", &[], &user, &ClaimsOptions::default(), issued).unwrap();
        assert_eq!(
            claims.features,
            crate::evaluate::evaluate_plan(&manager, "BASIC", &[], &user).unwrap()
        );
        assert_eq!(claims.exp, 1_000 + DEFAULT_EXPIRATION_SECS);
    }

    #[test]
    fn raw_user_context_is_carried_whole() {
        let manager = one_plan();
        let raw = json!({"username": "ana", "pets": 1, "roles": ["OWNER"], "address": {"city": "Seville"}});
        let issued = OffsetDateTime::from_unix_timestamp(1_000).unwrap();
        let claims = Claims::build_from_json(
            &manager,
            "BASIC",
            &[],
            raw.as_object().unwrap(),
            &ClaimsOptions::default(),
            issued,
        )
        .unwrap();
        assert_eq!(serde_json::Value::Object(claims.user_context.clone()), raw);
        assert_eq!(claims.sub, "ana");
        assert!(claims.features["maxPets"].eval.is_granted());
    }

    #[test]
    fn expiration_overflow_is_an_error() {
        let manager = one_plan();
        let user = context_from_json(&json!({"pets": 1}));
        let options = ClaimsOptions {
            authorities: serde_json::Value::Null,
            expiration_secs: i64::MAX,
        };
        let issued = OffsetDateTime::from_unix_timestamp(1_000).unwrap();
        let err = Claims::build(&manager, "BASIC", &[], &user, &options, issued).unwrap_err();
        assert!(matches!(err, EvalError::ExpirationOverflow { iat: 1_000, .. }));
    }

    #[test]
    fn expiry() {
        let claims = Claims {
            authorities: json!(["USER"]),
            features: FeatureStatusMap::new(),
            user_context: Default::default(),
            plan_context: Default::default(),
            sub: "Default".into(),
            iat: 100,
            exp: 100 + DEFAULT_EXPIRATION_SECS,
        };
        assert!(!claims.is_expired_at(100));
        assert!(claims.is_expired_at(100 + DEFAULT_EXPIRATION_SECS));
        let wire = serde_json::to_value(&claims).unwrap();
        assert!(wire.get("userContext").is_some());
        assert!(wire.get("planContext").is_some());
    }
}
