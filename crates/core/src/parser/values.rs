use serde_yaml::Value;

use crate::document::decimal_from_yaml;
use crate::model::{FeatureValue, PaymentMethod, ValueType};

/// Read a scalar that must match `value_type` exactly.
pub(crate) fn read_scalar(v: &Value, value_type: ValueType) -> Option<FeatureValue> {
    match (value_type, v) {
        (ValueType::Boolean, Value::Bool(b)) => Some(FeatureValue::Bool(*b)),
        (ValueType::Numeric, Value::Number(_)) => decimal_from_yaml(v).map(FeatureValue::Number),
        (ValueType::Text, Value::String(s)) => Some(FeatureValue::Text(s.clone())),
        _ => None,
    }
}

/// Read a list of payment-method tags. The error is the message tail after
/// "The feature X ".
pub(crate) fn read_payment_methods(v: &Value) -> Result<FeatureValue, String> {
    let Value::Sequence(items) = v else {
        return Err("should be a list of supported payment types".to_owned());
    };
    items
        .iter()
        .map(|item| {
            let tag = item.as_str().unwrap_or_default();
            PaymentMethod::from_tag(tag).ok_or_else(|| {
                format!(
                    "does not have a supported paymentType. PaymentType that generates the issue: {}",
                    crate::document::describe(item)
                )
            })
        })
        .collect::<Result<Vec<_>, _>>()
        .map(FeatureValue::PaymentMethods)
}
