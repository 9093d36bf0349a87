use async_graphql_value::ConstValue;

use super::DynamicParse;
use crate::{Error, InputValueError, InputValueResult};

/// An IEEE-754 double. Non-finite values never appear in a response; integer
/// input literals coerce.
pub struct FloatScalar;

impl DynamicParse for FloatScalar {
    fn is_valid(value: &ConstValue) -> bool {
        match value {
            ConstValue::Number(number) => number.as_f64().is_some_and(f64::is_finite),
            _ => false,
        }
    }

    fn to_value(value: serde_json::Value) -> Result<ConstValue, Error> {
        match value {
            serde_json::Value::Number(number) if number.as_f64().is_some_and(f64::is_finite) => {
                Ok(ConstValue::Number(number))
            }
            _ => Err(Error::new(
                "Data violation: Cannot coerce the initial value to a finite Float",
            )),
        }
    }

    fn parse(value: ConstValue) -> InputValueResult<serde_json::Value> {
        match value {
            ConstValue::Number(number) => Ok(serde_json::Value::Number(number)),
            _ => Err(InputValueError::ty_custom("Float", "Cannot parse into a Float")),
        }
    }
}
