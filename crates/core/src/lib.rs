#![allow(clippy::result_large_err)]
//! pricing-core: typed SaaS pricing configurations.
//!
//! A pricing document goes through three stages:
//!
//! - [`migrate()`] upgrades a raw document to [`Version::LATEST`]
//! - [`parse()`] turns it into a typed [`PricingManager`] graph
//! - [`serialize()`] writes the graph back as a document
//!
//! [`PricingManager`] also carries the graph mutations (add/remove plans,
//! features, usage limits and add-ons), and [`PricingService`] runs them
//! against a [`pricing_storage::DocumentStore`].

pub mod document;
pub mod error;
pub mod migration;
pub mod model;
pub mod mutation;
pub mod parser;
pub mod serialize;
pub mod service;
pub mod version;

// ── Convenience re-exports ───────────────────────────────────────────

pub use error::{EntityKind, MigrationError, PricingError, SerializerError, UpdateError, VersionError};
pub use migration::{migrate, migrate_with_report, MigrationReport};
pub use model::{
    AddOn, AddOnPrice, AutomationType, Feature, FeatureKind, FeatureValue, IntegrationType,
    PaymentMethod, Plan, Price, PricingManager, UsageLimit, UsageLimitKind, ValueType,
};
pub use parser::parse;
pub use serialize::serialize;
pub use service::PricingService;
pub use version::Version;

/// YAML text at any supported version → typed graph.
pub fn load_str(text: &str) -> Result<PricingManager, PricingError> {
    load_str_with_report(text).map(|(manager, _)| manager)
}

/// Like [`load_str`], also returning the migration steps that ran.
pub fn load_str_with_report(text: &str) -> Result<(PricingManager, MigrationReport), PricingError> {
    let doc = document::from_yaml_str(text)?;
    let (doc, report) = migrate_with_report(doc, Version::LATEST)?;
    Ok((parse(&doc)?, report))
}

/// Typed graph → YAML text at [`Version::LATEST`].
pub fn dump(manager: &PricingManager) -> Result<String, PricingError> {
    document::to_yaml_string(&serialize(manager)?)
}
