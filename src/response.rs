use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::{ServerError, Value};

/// The result of an executed (or rejected) request.
#[derive(Debug, Default, Serialize, Deserialize)]
pub struct Response {
    /// The response data.
    #[serde(default)]
    pub data: Value,

    /// The errors that occurred.
    #[serde(skip_serializing_if = "Vec::is_empty", default)]
    pub errors: Vec<ServerError>,

    /// The extension payload of the response.
    #[serde(skip_serializing_if = "BTreeMap::is_empty", default)]
    pub extensions: BTreeMap<String, Value>,

    /// Whether execution was reached at all. `false` when the request was
    /// rejected before execution: parse, validation or variable-coercion
    /// failures.
    #[serde(skip)]
    pub did_execute: bool,
}

impl Response {
    /// A successfully executed response.
    pub fn new(data: impl Into<Value>) -> Self {
        Self {
            data: data.into(),
            did_execute: true,
            ..Default::default()
        }
    }

    /// A response rejected before execution.
    pub fn from_errors(errors: Vec<ServerError>) -> Self {
        Self {
            errors,
            ..Default::default()
        }
    }

    /// Append an extension value to the response.
    #[must_use]
    pub fn extension(mut self, name: impl Into<String>, value: Value) -> Self {
        self.extensions.insert(name.into(), value);
        self
    }

    /// Returns `true` if the response carries no errors.
    #[inline]
    pub fn is_ok(&self) -> bool {
        self.errors.is_empty()
    }

    #[inline]
    pub fn is_err(&self) -> bool {
        !self.is_ok()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_response_shape() {
        let response = Response::from_errors(vec![ServerError::new("boom", None)]);
        assert!(!response.did_execute);
        assert_eq!(
            serde_json::to_value(&response).unwrap(),
            serde_json::json!({ "data": null, "errors": [{ "message": "boom" }] })
        );
    }

    #[test]
    fn test_data_only_response_omits_errors() {
        let response = Response::new(Value::from_json(serde_json::json!({"a": 1})).unwrap());
        assert_eq!(
            serde_json::to_value(&response).unwrap(),
            serde_json::json!({ "data": { "a": 1 } })
        );
    }
}
