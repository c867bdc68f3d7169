use pricing_expr::ExprError;

/// Errors raised while evaluating entitlements or handling pricing tokens.
#[derive(Debug, thiserror::Error)]
pub enum EvalError {
    #[error("plan {0} not found")]
    UnknownPlan(String),

    #[error("add-on {0} not found")]
    UnknownAddOn(String),

    #[error("add-on {add_on} is not available for plan {plan}")]
    AddOnNotAvailable { add_on: String, plan: String },

    #[error("feature {0} not found")]
    UnknownFeature(String),

    #[error("feature {feature}: {source}")]
    Expression {
        feature: String,
        #[source]
        source: ExprError,
    },

    /// The strict single-feature gate refused access.
    #[error("Context evaluation failed for featureId: {feature}")]
    FeatureDenied { feature: String },

    #[error("malformed pricing token: {0}")]
    MalformedToken(String),

    #[error("pricing token signature is invalid")]
    BadSignature,

    #[error("pricing token expired at {exp}")]
    Expired { exp: i64 },

    #[error("token expiration overflows: issued at {iat} plus {secs} seconds")]
    ExpirationOverflow { iat: i64, secs: i64 },

    #[error("{0}")]
    Key(String),

    #[error(transparent)]
    Json(#[from] serde_json::Error),
}
