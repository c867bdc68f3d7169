use super::{FeatureValue, ValueType};

macro_rules! tag_enum {
    ($(#[$meta:meta])* $name:ident { $($variant:ident => $tag:literal),+ $(,)? }) => {
        $(#[$meta])*
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
        pub enum $name {
            $($variant),+
        }

        impl $name {
            pub const ALL: &'static [$name] = &[$($name::$variant),+];

            pub fn tag(self) -> &'static str {
                match self {
                    $($name::$variant => $tag),+
                }
            }

            pub fn from_tag(tag: &str) -> Option<Self> {
                match tag {
                    $($tag => Some($name::$variant),)+
                    _ => None,
                }
            }
        }

        impl std::fmt::Display for $name {
            fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
                f.write_str(self.tag())
            }
        }
    };
}

pub(crate) use tag_enum;

tag_enum!(AutomationType {
    Bot => "BOT",
    Filtering => "FILTERING",
    Tracking => "TRACKING",
    TaskAutomation => "TASK_AUTOMATION",
});

tag_enum!(IntegrationType {
    Api => "API",
    Extension => "EXTENSION",
    IdentityProvider => "IDENTITY_PROVIDER",
    WebSaas => "WEB_SAAS",
    Marketplace => "MARKETPLACE",
    ExternalDevice => "EXTERNAL_DEVICE",
});

tag_enum!(
    /// Accepted payment channel of a payment feature.
    PaymentMethod {
        Card => "CARD",
        Gateway => "GATEWAY",
        Invoice => "INVOICE",
        Ach => "ACH",
        WireTransfer => "WIRE_TRANSFER",
        Other => "OTHER",
    }
);

/// Variant of a feature, with the attributes only that variant carries.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FeatureKind {
    Information,
    Integration {
        integration_type: IntegrationType,
        /// Only kept for `WEB_SAAS` integrations.
        pricing_urls: Option<Vec<String>>,
    },
    Domain,
    Automation {
        automation_type: AutomationType,
    },
    Management,
    Guarantee {
        doc_url: Option<String>,
    },
    /// Values are lists of [`PaymentMethod`] regardless of the declared type.
    Payment,
    Support,
    Tool,
}

impl FeatureKind {
    pub fn tag(&self) -> &'static str {
        match self {
            FeatureKind::Information => "INFORMATION",
            FeatureKind::Integration { .. } => "INTEGRATION",
            FeatureKind::Domain => "DOMAIN",
            FeatureKind::Automation { .. } => "AUTOMATION",
            FeatureKind::Management => "MANAGEMENT",
            FeatureKind::Guarantee { .. } => "GUARANTEE",
            FeatureKind::Payment => "PAYMENT",
            FeatureKind::Support => "SUPPORT",
            FeatureKind::Tool => "TOOL",
        }
    }

    pub fn is_payment(&self) -> bool {
        matches!(self, FeatureKind::Payment)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Feature {
    pub name: String,
    pub description: Option<String>,
    pub value_type: ValueType,
    pub default_value: FeatureValue,
    /// Set on plan and add-on copies; `None` on global definitions.
    pub value: Option<FeatureValue>,
    pub expression: Option<String>,
    pub server_expression: Option<String>,
    pub kind: FeatureKind,
}

impl Feature {
    pub fn new(
        name: impl Into<String>,
        kind: FeatureKind,
        value_type: ValueType,
        default_value: FeatureValue,
    ) -> Self {
        Feature {
            name: name.into(),
            description: None,
            value_type,
            default_value,
            value: None,
            expression: None,
            server_expression: None,
            kind,
        }
    }

    pub fn with_expression(mut self, expression: impl Into<String>) -> Self {
        self.expression = Some(expression.into());
        self
    }

    /// The copy's own value, or the default when none is set.
    pub fn effective_value(&self) -> &FeatureValue {
        self.value.as_ref().unwrap_or(&self.default_value)
    }

    /// Whether `value` is acceptable for this feature.
    pub fn accepts(&self, value: &FeatureValue) -> bool {
        if self.kind.is_payment() {
            matches!(value, FeatureValue::PaymentMethods(_))
        } else {
            value.fits(self.value_type)
        }
    }

    /// A per-plan copy carrying `value`, or the default when `None`.
    pub(crate) fn copy_with(&self, value: Option<FeatureValue>) -> Feature {
        let mut copy = self.clone();
        copy.value = Some(value.unwrap_or_else(|| self.default_value.clone()));
        copy
    }
}
