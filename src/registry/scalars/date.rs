use async_graphql_value::ConstValue;
use chrono::{DateTime, NaiveDate};

use super::DynamicParse;
use crate::{Error, InputValueError, InputValueResult};

const DATE_FORMAT: &str = "%Y-%m-%d";

/// A date with no time-of-day component, such as `2007-12-03`.
///
/// Accepts a plain date, a full RFC 3339 timestamp, or milliseconds since the
/// Unix epoch on input; the output form is always the plain date string.
pub struct DateScalar;

fn coerce_to_date_string(value: &serde_json::Value) -> Option<String> {
    match value {
        serde_json::Value::String(v) => {
            if NaiveDate::parse_from_str(v, DATE_FORMAT).is_ok() {
                return Some(v.clone());
            }
            DateTime::parse_from_rfc3339(v)
                .ok()
                .map(|datetime| datetime.date_naive().format(DATE_FORMAT).to_string())
        }
        serde_json::Value::Number(number) => {
            let millis = number.as_i64()?;
            DateTime::from_timestamp_millis(millis).map(|datetime| datetime.date_naive().format(DATE_FORMAT).to_string())
        }
        _ => None,
    }
}

impl DynamicParse for DateScalar {
    fn is_valid(value: &ConstValue) -> bool {
        match value {
            ConstValue::String(v) => {
                NaiveDate::parse_from_str(v, DATE_FORMAT).is_ok() || DateTime::parse_from_rfc3339(v).is_ok()
            }
            ConstValue::Number(number) => number.as_i64().is_some(),
            _ => false,
        }
    }

    fn to_value(value: serde_json::Value) -> Result<ConstValue, Error> {
        coerce_to_date_string(&value)
            .map(ConstValue::String)
            .ok_or_else(|| Error::new("Data violation: Cannot coerce the initial value to a Date"))
    }

    fn parse(value: ConstValue) -> InputValueResult<serde_json::Value> {
        let json = value
            .into_json()
            .map_err(|err| InputValueError::ty_custom("Date", err))?;
        coerce_to_date_string(&json)
            .map(serde_json::Value::String)
            .ok_or_else(|| InputValueError::ty_custom("Date", "Cannot parse into a Date"))
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    #[test]
    fn test_accepts_plain_dates() {
        assert_eq!(
            DateScalar::to_value(json!("2007-12-03")).unwrap(),
            ConstValue::String("2007-12-03".into())
        );
    }

    #[test]
    fn test_normalizes_timestamps_and_millis() {
        assert_eq!(
            DateScalar::to_value(json!("2007-12-03T10:15:30+00:00")).unwrap(),
            ConstValue::String("2007-12-03".into())
        );
        // 2007-12-03T00:00:00Z
        assert_eq!(
            DateScalar::to_value(json!(1196640000000i64)).unwrap(),
            ConstValue::String("2007-12-03".into())
        );
        assert!(DateScalar::to_value(json!("not a date")).is_err());
    }
}
