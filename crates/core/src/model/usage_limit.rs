use super::feature::tag_enum;
use super::{FeatureValue, ValueType};

tag_enum!(UsageLimitKind {
    Capacity => "CAPACITY",
    Quota => "QUOTA",
    Renewable => "RENEWABLE",
    ResponseDriven => "RESPONSE_DRIVEN",
    TimeDriven => "TIME_DRIVEN",
    NonRenewable => "NON_RENEWABLE",
});

/// A quantitative ceiling, optionally tied to the features it constrains.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UsageLimit {
    pub name: String,
    pub description: Option<String>,
    pub value_type: ValueType,
    pub default_value: FeatureValue,
    /// Set on plan and add-on copies; `None` on global definitions.
    pub value: Option<FeatureValue>,
    pub unit: Option<String>,
    pub kind: UsageLimitKind,
    pub linked_features: Option<Vec<String>>,
    pub expression: Option<String>,
    pub server_expression: Option<String>,
}

impl UsageLimit {
    pub fn new(
        name: impl Into<String>,
        kind: UsageLimitKind,
        value_type: ValueType,
        default_value: FeatureValue,
    ) -> Self {
        UsageLimit {
            name: name.into(),
            description: None,
            value_type,
            default_value,
            value: None,
            unit: None,
            kind,
            linked_features: None,
            expression: None,
            server_expression: None,
        }
    }

    pub fn effective_value(&self) -> &FeatureValue {
        self.value.as_ref().unwrap_or(&self.default_value)
    }

    pub fn accepts(&self, value: &FeatureValue) -> bool {
        value.fits(self.value_type)
    }

    pub fn is_linked_to(&self, feature: &str) -> bool {
        self.linked_features
            .as_ref()
            .is_some_and(|links| links.iter().any(|l| l == feature))
    }

    pub(crate) fn copy_with(&self, value: Option<FeatureValue>) -> UsageLimit {
        let mut copy = self.clone();
        copy.value = Some(value.unwrap_or_else(|| self.default_value.clone()));
        copy
    }
}
