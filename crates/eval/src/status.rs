use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

/// Outcome of one entitlement rule: a flag, or the text form of a numeric
/// or text result.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Eval {
    Bool(bool),
    Text(String),
}

impl Eval {
    pub fn is_granted(&self) -> bool {
        matches!(self, Eval::Bool(true))
    }
}

/// Evaluation result for one feature, as carried in the claims payload.
///
/// `used` and `limit` are only set for rules that compare a user-context
/// value against a limit.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FeatureStatus {
    pub eval: Eval,
    pub used: Option<serde_json::Value>,
    pub limit: Option<serde_json::Value>,
}

impl FeatureStatus {
    pub fn denied() -> Self {
        FeatureStatus {
            eval: Eval::Bool(false),
            used: None,
            limit: None,
        }
    }
}

pub type FeatureStatusMap = BTreeMap<String, FeatureStatus>;
