//! Upgrade chain for pricing documents.
//!
//! Each link upgrades a document from one schema version to the next and wraps
//! the link below it, ending in an identity [`BaseUpdater`]. Running a link
//! first delegates to the wrapped link when the document is older than the
//! link's source version, then applies its own step only if the document now
//! declares exactly that source version. A document already at or past a link
//! passes through it untouched, which makes every link idempotent.

mod v10_to_v11;
mod v11_to_v12;
mod v12_to_v20;

use serde_yaml::Value;
use tracing::{info, warn};

use crate::error::{MigrationError, UpdateError};
use crate::version::Version;

/// Non-fatal notes produced while migrating.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MigrationReport {
    /// Versions whose upgrade step ran, in order.
    pub applied: Vec<Version>,
    pub warnings: Vec<String>,
}

impl MigrationReport {
    pub(crate) fn warn(&mut self, message: String) {
        warn!("{}", message);
        self.warnings.push(message);
    }
}

pub trait Updater {
    fn update(&self, doc: &mut Value, report: &mut MigrationReport) -> Result<(), UpdateError>;
}

/// End of the chain. Leaves the document as it is.
pub struct BaseUpdater;

impl Updater for BaseUpdater {
    fn update(&self, _doc: &mut Value, _report: &mut MigrationReport) -> Result<(), UpdateError> {
        Ok(())
    }
}

type Step = fn(&mut Value, &mut MigrationReport) -> Result<(), UpdateError>;

/// One link: upgrades documents declaring `source` to the next version.
pub struct VersionUpdater {
    source: Version,
    step: Step,
    previous: Box<dyn Updater>,
}

impl VersionUpdater {
    pub fn source(&self) -> Version {
        self.source
    }
}

impl Updater for VersionUpdater {
    fn update(&self, doc: &mut Value, report: &mut MigrationReport) -> Result<(), UpdateError> {
        if declared(doc)? < self.source {
            self.previous.update(doc, report)?;
        }
        if declared(doc)? != self.source {
            return Ok(());
        }
        let Some(target) = self.source.next() else {
            return Ok(());
        };
        (self.step)(doc, report)?;
        set_version(doc, target);
        info!(from = %self.source, to = %target, "applied migration step");
        report.applied.push(self.source);
        Ok(())
    }
}

fn declared(doc: &Value) -> Result<Version, UpdateError> {
    Version::of_document(doc).map_err(|e| UpdateError {
        message: e.to_string(),
        document: doc.clone(),
    })
}

fn set_version(doc: &mut Value, version: Version) {
    if let Value::Mapping(map) = doc {
        map.insert(
            Value::String("version".to_owned()),
            Value::String(version.to_string()),
        );
    }
}

fn step_from(source: Version) -> Option<Step> {
    match source {
        Version::V1_0 => Some(v10_to_v11::update),
        Version::V1_1 => Some(v11_to_v12::update),
        Version::V1_2 => Some(v12_to_v20::update),
        Version::V2_0 => None,
    }
}

/// Build the chain whose outermost link ends at `target`.
pub fn chain_to(target: Version) -> Box<dyn Updater> {
    let mut chain: Box<dyn Updater> = Box::new(BaseUpdater);
    for source in Version::ALL.into_iter().filter(|v| *v < target) {
        if let Some(step) = step_from(source) {
            chain = Box::new(VersionUpdater {
                source,
                step,
                previous: chain,
            });
        }
    }
    chain
}

/// Upgrade `doc` to `target`, returning the upgraded document.
pub fn migrate(doc: Value, target: Version) -> Result<Value, MigrationError> {
    migrate_with_report(doc, target).map(|(doc, _)| doc)
}

/// Upgrade `doc` to `target`, also returning which steps ran and any warnings.
pub fn migrate_with_report(
    mut doc: Value,
    target: Version,
) -> Result<(Value, MigrationReport), MigrationError> {
    if !doc.is_mapping() {
        return Err(UpdateError {
            message: "the document root must be a mapping".to_owned(),
            document: doc,
        }
        .into());
    }
    let from = Version::of_document(&doc)?;
    if from > target {
        return Err(MigrationError::Downgrade { from, to: target });
    }
    let mut report = MigrationReport::default();
    if from == target {
        return Ok((doc, report));
    }
    chain_to(target).update(&mut doc, &mut report)?;
    Ok((doc, report))
}
