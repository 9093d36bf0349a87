mod boolean;
mod date;
mod datetime;
mod float;
mod id;
mod int;
mod string;

pub use boolean::BooleanScalar;
pub use date::DateScalar;
pub use datetime::DateTimeScalar;
pub use float::FloatScalar;
pub use id::IdScalar;
pub use int::IntScalar;
pub use string::StringScalar;

use async_graphql_value::ConstValue;

use crate::{Error, InputValueError, InputValueResult};

/// The conversion surface every built-in scalar implements.
///
/// `parse` maps an input literal/variable value to its JSON-shaped internal
/// form; `to_value` maps resolver output back to a response value; `is_valid`
/// is the structural check used for validation and nominal dispatch.
pub trait DynamicParse {
    fn is_valid(value: &ConstValue) -> bool;

    fn to_value(value: serde_json::Value) -> Result<ConstValue, Error>;

    fn parse(value: ConstValue) -> InputValueResult<serde_json::Value>;
}

/// Name-driven dispatch over the built-in scalars.
pub struct PossibleScalar;

impl PossibleScalar {
    pub fn contains(type_name: &str) -> bool {
        matches!(
            type_name,
            "Int" | "Float" | "String" | "Boolean" | "ID" | "Date" | "DateTime"
        )
    }

    pub fn is_valid(type_name: &str, value: &ConstValue) -> bool {
        match type_name {
            "Int" => IntScalar::is_valid(value),
            "Float" => FloatScalar::is_valid(value),
            "String" => StringScalar::is_valid(value),
            "Boolean" => BooleanScalar::is_valid(value),
            "ID" => IdScalar::is_valid(value),
            "Date" => DateScalar::is_valid(value),
            "DateTime" => DateTimeScalar::is_valid(value),
            _ => false,
        }
    }

    pub fn to_value(type_name: &str, value: serde_json::Value) -> Result<ConstValue, Error> {
        match type_name {
            "Int" => IntScalar::to_value(value),
            "Float" => FloatScalar::to_value(value),
            "String" => StringScalar::to_value(value),
            "Boolean" => BooleanScalar::to_value(value),
            "ID" => IdScalar::to_value(value),
            "Date" => DateScalar::to_value(value),
            "DateTime" => DateTimeScalar::to_value(value),
            _ => Err(Error::new(format!("{type_name} is not a registered scalar"))),
        }
    }

    pub fn parse(type_name: &str, value: ConstValue) -> InputValueResult<serde_json::Value> {
        match type_name {
            "Int" => IntScalar::parse(value),
            "Float" => FloatScalar::parse(value),
            "String" => StringScalar::parse(value),
            "Boolean" => BooleanScalar::parse(value),
            "ID" => IdScalar::parse(value),
            "Date" => DateScalar::parse(value),
            "DateTime" => DateTimeScalar::parse(value),
            _ => Err(InputValueError::ty_custom(
                type_name,
                "not a registered scalar",
            )),
        }
    }
}
