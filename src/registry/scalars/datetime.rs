use async_graphql_value::ConstValue;
use chrono::{DateTime, SecondsFormat};

use super::DynamicParse;
use crate::{Error, InputValueError, InputValueResult};

/// An instant on the timeline.
///
/// Accepts an RFC 3339 timestamp or milliseconds since the Unix epoch on
/// input; the output form is always an RFC 3339 string in UTC.
pub struct DateTimeScalar;

fn coerce_to_rfc3339(value: &serde_json::Value) -> Option<String> {
    match value {
        serde_json::Value::String(v) => DateTime::parse_from_rfc3339(v)
            .ok()
            .map(|datetime| datetime.to_utc().to_rfc3339_opts(SecondsFormat::Millis, true)),
        serde_json::Value::Number(number) => {
            let millis = number.as_i64()?;
            DateTime::from_timestamp_millis(millis)
                .map(|datetime| datetime.to_rfc3339_opts(SecondsFormat::Millis, true))
        }
        _ => None,
    }
}

impl DynamicParse for DateTimeScalar {
    fn is_valid(value: &ConstValue) -> bool {
        match value {
            ConstValue::String(v) => DateTime::parse_from_rfc3339(v).is_ok(),
            ConstValue::Number(number) => number.as_i64().is_some(),
            _ => false,
        }
    }

    fn to_value(value: serde_json::Value) -> Result<ConstValue, Error> {
        coerce_to_rfc3339(&value)
            .map(ConstValue::String)
            .ok_or_else(|| Error::new("Data violation: Cannot coerce the initial value to a DateTime"))
    }

    fn parse(value: ConstValue) -> InputValueResult<serde_json::Value> {
        let json = value
            .into_json()
            .map_err(|err| InputValueError::ty_custom("DateTime", err))?;
        coerce_to_rfc3339(&json)
            .map(serde_json::Value::String)
            .ok_or_else(|| InputValueError::ty_custom("DateTime", "Cannot parse into a DateTime"))
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    #[test]
    fn test_round_trips_rfc3339() {
        assert_eq!(
            DateTimeScalar::to_value(json!("2007-12-03T10:15:30.000Z")).unwrap(),
            ConstValue::String("2007-12-03T10:15:30.000Z".into())
        );
    }

    #[test]
    fn test_accepts_epoch_millis() {
        assert_eq!(
            DateTimeScalar::to_value(json!(0)).unwrap(),
            ConstValue::String("1970-01-01T00:00:00.000Z".into())
        );
        assert!(DateTimeScalar::to_value(json!(true)).is_err());
    }
}
