use pricing_expr::ExprError;
use pricing_storage::StorageError;

use crate::version::Version;

/// A declared schema version that cannot be used.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum VersionError {
    #[error("the document does not declare a 'version'")]
    Missing,

    #[error("Invalid version \"{0}\", use <major>.<minor> version format")]
    Malformed(String),

    #[error("{component} {raw} overflows an int")]
    Overflow { component: &'static str, raw: String },

    #[error("version {0} is not supported")]
    Unsupported(String),
}

/// A migration link could not transform the document. Carries the document as
/// it stood when the link gave up.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
#[error("{message}")]
pub struct UpdateError {
    pub message: String,
    pub document: serde_yaml::Value,
}

#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum MigrationError {
    #[error(transparent)]
    Version(#[from] VersionError),

    #[error("cannot migrate from {from} down to {to}")]
    Downgrade { from: Version, to: Version },

    #[error(transparent)]
    Update(#[from] UpdateError),
}

/// Raised when a model graph is not complete enough to be written out.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("{0}")]
pub struct SerializerError(pub String);

/// The kind of named entity a lookup or insertion refers to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EntityKind {
    Plan,
    AddOn,
    Feature,
    UsageLimit,
}

impl std::fmt::Display for EntityKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(match self {
            EntityKind::Plan => "plan",
            EntityKind::AddOn => "add-on",
            EntityKind::Feature => "feature",
            EntityKind::UsageLimit => "usage limit",
        })
    }
}

/// All errors surfaced by the pricing model: parsing, validation, mutation and
/// persistence.
#[derive(Debug, thiserror::Error)]
pub enum PricingError {
    #[error(transparent)]
    Version(#[from] VersionError),

    #[error(transparent)]
    Migration(#[from] MigrationError),

    /// Structural problem: a mandatory field is missing or has the wrong shape.
    #[error("{0}")]
    Parsing(String),

    #[error("{0}")]
    InvalidValueType(String),

    #[error("{0}")]
    InvalidDefaultValue(String),

    #[error("The usageLimit {limit} is linked to a nonexistent feature. Current linkedFeature: {feature}")]
    InvalidLinkedFeature { limit: String, feature: String },

    #[error("{0}")]
    FeatureNotFound(String),

    #[error("The plan {plan} is not defined in the pricing manager")]
    InvalidPlanReference { add_on: String, plan: String },

    /// A price formula or entitlement rule failed to parse or evaluate.
    #[error("expression error in {context}: {source}")]
    Expression {
        context: String,
        #[source]
        source: ExprError,
    },

    #[error(transparent)]
    Serializer(#[from] SerializerError),

    #[error("{kind} {name} not found")]
    NotFound { kind: EntityKind, name: String },

    #[error("{kind} {name} already exists")]
    AlreadyExists { kind: EntityKind, name: String },

    #[error("The value {got} of {name} does not match its value type. Expected: {expected}")]
    ValueMismatch {
        name: String,
        expected: String,
        got: String,
    },

    #[error("The plan {plan} cannot be removed while the add-on {add_on} is available for it")]
    PlanInUse { plan: String, add_on: String },

    /// A mutation would leave the graph in a state no document can describe.
    #[error("{0}")]
    Invariant(String),

    #[error(transparent)]
    Storage(#[from] StorageError),

    #[error("YAML error: {0}")]
    Yaml(#[from] serde_yaml::Error),
}

impl PricingError {
    pub(crate) fn parsing(message: impl Into<String>) -> Self {
        PricingError::Parsing(message.into())
    }

    pub(crate) fn not_found(kind: EntityKind, name: &str) -> Self {
        PricingError::NotFound {
            kind,
            name: name.to_owned(),
        }
    }

    pub(crate) fn already_exists(kind: EntityKind, name: &str) -> Self {
        PricingError::AlreadyExists {
            kind,
            name: name.to_owned(),
        }
    }
}

impl From<UpdateError> for PricingError {
    fn from(e: UpdateError) -> Self {
        PricingError::Migration(MigrationError::Update(e))
    }
}
