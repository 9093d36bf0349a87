use async_graphql_value::ConstValue;

use super::DynamicParse;
use crate::{Error, InputValueError, InputValueResult};

/// A 32-bit signed integer. Fractional values are rejected rather than
/// truncated, and values outside the `i32` range overflow into an error.
pub struct IntScalar;

fn as_i32(number: &serde_json::Number) -> Option<i32> {
    let value = number.as_i64()?;
    i32::try_from(value).ok()
}

impl DynamicParse for IntScalar {
    fn is_valid(value: &ConstValue) -> bool {
        match value {
            ConstValue::Number(number) => as_i32(number).is_some(),
            _ => false,
        }
    }

    fn to_value(value: serde_json::Value) -> Result<ConstValue, Error> {
        match value {
            serde_json::Value::Number(number) => match as_i32(&number) {
                Some(_) => Ok(ConstValue::Number(number)),
                None => Err(Error::new(
                    "Data violation: Int must be a 32-bit signed integer without fractional part",
                )),
            },
            _ => Err(Error::new("Data violation: Cannot coerce the initial value to an Int")),
        }
    }

    fn parse(value: ConstValue) -> InputValueResult<serde_json::Value> {
        match value {
            ConstValue::Number(number) => match as_i32(&number) {
                Some(_) => Ok(serde_json::Value::Number(number)),
                None => Err(InputValueError::ty_custom(
                    "Int",
                    "must be a 32-bit signed integer without fractional part",
                )),
            },
            _ => Err(InputValueError::ty_custom("Int", "Cannot parse into an Int")),
        }
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    #[test]
    fn test_rejects_fractions_and_overflow() {
        assert!(IntScalar::to_value(json!(42)).is_ok());
        assert!(IntScalar::to_value(json!(1.5)).is_err());
        assert!(IntScalar::to_value(json!(i64::from(i32::MAX) + 1)).is_err());
        assert!(IntScalar::parse(ConstValue::from_json(json!(-7)).unwrap()).is_ok());
        assert!(IntScalar::parse(ConstValue::from_json(json!(0.25)).unwrap()).is_err());
    }
}
