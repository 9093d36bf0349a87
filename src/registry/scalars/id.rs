use async_graphql_value::ConstValue;

use super::DynamicParse;
use crate::{Error, InputValueError, InputValueResult};

/// An opaque identifier. Integers are accepted on input and coerced to their
/// decimal string form; the output form is always a string.
pub struct IdScalar;

impl DynamicParse for IdScalar {
    fn is_valid(value: &ConstValue) -> bool {
        match value {
            ConstValue::String(_) => true,
            ConstValue::Number(number) => number.is_i64() || number.is_u64(),
            _ => false,
        }
    }

    fn to_value(value: serde_json::Value) -> Result<ConstValue, Error> {
        match value {
            serde_json::Value::String(v) => Ok(ConstValue::String(v)),
            serde_json::Value::Number(number) if number.is_i64() || number.is_u64() => {
                Ok(ConstValue::String(number.to_string()))
            }
            _ => Err(Error::new("Data violation: Cannot coerce the initial value to an ID")),
        }
    }

    fn parse(value: ConstValue) -> InputValueResult<serde_json::Value> {
        match value {
            ConstValue::String(v) => Ok(serde_json::Value::String(v)),
            ConstValue::Number(number) if number.is_i64() || number.is_u64() => {
                Ok(serde_json::Value::String(number.to_string()))
            }
            _ => Err(InputValueError::ty_custom("ID", "Cannot parse into an ID")),
        }
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    #[test]
    fn test_integer_ids_coerce_to_strings() {
        assert_eq!(IdScalar::to_value(json!(42)).unwrap(), ConstValue::String("42".into()));
        assert_eq!(
            IdScalar::parse(ConstValue::from_json(json!(42)).unwrap()).unwrap(),
            json!("42")
        );
        assert!(IdScalar::parse(ConstValue::Boolean(true)).is_err());
    }
}
