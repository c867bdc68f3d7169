use serde_yaml::Value;

use super::values::{read_payment_methods, read_scalar};
use crate::document::{describe, Fields};
use crate::error::PricingError;
use crate::model::{AutomationType, Feature, FeatureKind, IntegrationType, ValueType};

pub(super) fn parse_feature(name: &str, v: &Value) -> Result<Feature, PricingError> {
    let owner = format!("feature {name}");
    let fields = Fields::of(v, &owner).map_err(|_| {
        PricingError::parsing(format!(
            "The feature {name} is not defined correctly. All its options must be specified, and it cannot be defined as a key-value pair"
        ))
    })?;

    let type_tag = fields.str("type")?.unwrap_or_default();
    let kind = parse_kind(name, type_tag, &fields)?;

    let value_type = parse_value_type(name, &fields)?;

    let raw_default = fields.get("defaultValue");
    let default_value = match (&kind, raw_default) {
        (FeatureKind::Payment, Some(raw)) => read_payment_methods(raw)
            .map_err(|tail| PricingError::InvalidDefaultValue(format!("The feature {name} {tail}")))?,
        (_, Some(raw)) => read_scalar(raw, value_type).ok_or_else(|| {
            PricingError::InvalidDefaultValue(format!(
                "The feature {name} does not have a valid defaultValue. Current valueType: {value_type}; Current defaultValue: {}",
                describe(raw)
            ))
        })?,
        (_, None) => {
            return Err(PricingError::InvalidDefaultValue(format!(
                "The feature {name} does not have a valid defaultValue. Current valueType: {value_type}; Current defaultValue: null"
            )))
        }
    };

    Ok(Feature {
        name: name.to_owned(),
        description: fields.str("description")?.map(str::to_owned),
        value_type,
        default_value,
        value: None,
        expression: fields.str("expression")?.map(str::to_owned),
        server_expression: fields.str("serverExpression")?.map(str::to_owned),
        kind,
    })
}

pub(super) fn parse_value_type(name: &str, fields: &Fields<'_, '_>) -> Result<ValueType, PricingError> {
    let tag = fields.str("valueType")?;
    tag.and_then(ValueType::from_tag).ok_or_else(|| {
        PricingError::InvalidValueType(format!(
            "The feature {name} does not have a supported valueType. Current valueType: {}",
            tag.unwrap_or("null")
        ))
    })
}

fn parse_kind(name: &str, tag: &str, fields: &Fields<'_, '_>) -> Result<FeatureKind, PricingError> {
    let kind = match tag {
        "INFORMATION" => FeatureKind::Information,
        "INTEGRATION" => {
            let raw = fields.str("integrationType")?;
            let integration_type = raw.and_then(IntegrationType::from_tag).ok_or_else(|| {
                PricingError::parsing(format!(
                    "The feature {name} does not have a supported integrationType. Current value: {}",
                    raw.unwrap_or("null")
                ))
            })?;
            let pricing_urls = if integration_type == IntegrationType::WebSaas {
                fields.string_list("pricingUrls")?
            } else {
                None
            };
            FeatureKind::Integration {
                integration_type,
                pricing_urls,
            }
        }
        "DOMAIN" => FeatureKind::Domain,
        "AUTOMATION" => {
            let raw = fields.str("automationType")?;
            let automation_type = raw.and_then(AutomationType::from_tag).ok_or_else(|| {
                PricingError::parsing(format!(
                    "The feature {name} does not have a supported automationType. Current value: {}",
                    raw.unwrap_or("null")
                ))
            })?;
            FeatureKind::Automation { automation_type }
        }
        "MANAGEMENT" => FeatureKind::Management,
        "GUARANTEE" => {
            let doc_url = match fields.str("docUrl")? {
                Some(url) => Some(url),
                None => fields.str("docURL")?,
            };
            FeatureKind::Guarantee {
                doc_url: doc_url.map(str::to_owned),
            }
        }
        "PAYMENT" => FeatureKind::Payment,
        "SUPPORT" => FeatureKind::Support,
        "TOOL" => FeatureKind::Tool,
        other => {
            return Err(PricingError::parsing(format!(
                "The feature {name} does not have a supported feature type. Current value: {}",
                if other.is_empty() { "null" } else { other }
            )))
        }
    };
    Ok(kind)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{FeatureValue, PaymentMethod};

    fn parse(src: &str) -> Result<Feature, PricingError> {
        let v: Value = serde_yaml::from_str(src).unwrap();
        parse_feature("f", &v)
    }

    #[test]
    fn integration_keeps_urls_only_for_web_saas() {
        let web = parse(
            "type: INTEGRATION\nintegrationType: WEB_SAAS\npricingUrls: [https://a.io]\nvalueType: BOOLEAN\ndefaultValue: true\n",
        )
        .unwrap();
        assert_eq!(
            web.kind,
            FeatureKind::Integration {
                integration_type: IntegrationType::WebSaas,
                pricing_urls: Some(vec!["https://a.io".into()])
            }
        );
        let api = parse(
            "type: INTEGRATION\nintegrationType: API\npricingUrls: [https://a.io]\nvalueType: BOOLEAN\ndefaultValue: true\n",
        )
        .unwrap();
        assert_eq!(
            api.kind,
            FeatureKind::Integration {
                integration_type: IntegrationType::Api,
                pricing_urls: None
            }
        );
    }

    #[test]
    fn guarantee_accepts_legacy_doc_url_key() {
        let g = parse("type: GUARANTEE\ndocURL: https://sla\nvalueType: BOOLEAN\ndefaultValue: true\n").unwrap();
        assert_eq!(
            g.kind,
            FeatureKind::Guarantee {
                doc_url: Some("https://sla".into())
            }
        );
    }

    #[test]
    fn payment_default_is_a_list_whatever_the_value_type() {
        let p = parse("type: PAYMENT\nvalueType: TEXT\ndefaultValue: [CARD, ACH]\n").unwrap();
        assert_eq!(
            p.default_value,
            FeatureValue::PaymentMethods(vec![PaymentMethod::Card, PaymentMethod::Ach])
        );
    }

    #[test]
    fn unknown_type_tag_is_rejected() {
        let err = parse("type: TELEPATHY\nvalueType: BOOLEAN\ndefaultValue: true\n").unwrap_err();
        assert_eq!(
            err.to_string(),
            "The feature f does not have a supported feature type. Current value: TELEPATHY"
        );
    }

    #[test]
    fn mismatched_default_is_invalid_default_value() {
        let err = parse("type: DOMAIN\nvalueType: NUMERIC\ndefaultValue: lots\n").unwrap_err();
        assert!(matches!(err, PricingError::InvalidDefaultValue(_)));
        assert_eq!(
            err.to_string(),
            "The feature f does not have a valid defaultValue. Current valueType: NUMERIC; Current defaultValue: lots"
        );
    }

    #[test]
    fn unknown_value_type() {
        let err = parse("type: DOMAIN\nvalueType: DATE\ndefaultValue: x\n").unwrap_err();
        assert!(matches!(err, PricingError::InvalidValueType(_)));
    }

    #[test]
    fn automation_requires_known_kind() {
        assert!(parse("type: AUTOMATION\nautomationType: BOT\nvalueType: BOOLEAN\ndefaultValue: false\n").is_ok());
        assert!(parse("type: AUTOMATION\nvalueType: BOOLEAN\ndefaultValue: false\n").is_err());
    }
}
