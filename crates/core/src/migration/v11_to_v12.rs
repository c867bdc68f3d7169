use serde_yaml::Value;

use super::MigrationReport;
use crate::error::UpdateError;

/// 1.1 → 1.2 carries no structural change; the chain only bumps the tag.
pub(super) fn update(_doc: &mut Value, _report: &mut MigrationReport) -> Result<(), UpdateError> {
    Ok(())
}
