use std::{
    any::Any,
    collections::BTreeMap,
    fmt::{self, Debug, Formatter},
};

use serde::{Deserialize, Serialize};

use crate::{context::Data, Value, Variables};

#[derive(Serialize, Deserialize, Default, PartialEq, Eq, Debug, Clone, Copy, Hash)]
#[serde(rename_all = "camelCase")]
pub enum IntrospectionState {
    ForceEnabled,
    ForceDisabled,
    #[default]
    UserPreference,
}

/// GraphQL request.
///
/// This can be deserialized from a structure of the query string, the
/// operation name and the variables. The names are all in `camelCase`
/// (e.g. `operationName`).
#[derive(Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Request {
    /// The query source of the request.
    #[serde(default)]
    pub query: String,

    /// The operation name of the request.
    #[serde(default)]
    pub operation_name: Option<String>,

    /// The variables of the request.
    #[serde(default)]
    pub variables: Variables,

    /// The extension payload of the request.
    #[serde(default)]
    pub extensions: BTreeMap<String, Value>,

    /// An optional source URL used when reporting diagnostics.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub source_url: Option<String>,

    /// Force enable or disable introspection for this request.
    #[serde(skip)]
    pub introspection_state: IntrospectionState,

    /// The root value the operation's top-level resolvers run against.
    #[serde(skip)]
    pub root_value: serde_json::Value,

    /// The data of the request that can be accessed through `Context::data`.
    ///
    /// **This data is only valid for this request**
    #[serde(skip)]
    pub data: Data,
}

impl Request {
    /// Create a request object with query source.
    pub fn new(query: impl Into<String>) -> Self {
        Self {
            query: query.into(),
            operation_name: None,
            variables: Variables::default(),
            extensions: BTreeMap::default(),
            source_url: None,
            introspection_state: IntrospectionState::UserPreference,
            root_value: serde_json::Value::Null,
            data: Data::default(),
        }
    }

    /// Specify the operation name of the request.
    #[must_use]
    pub fn with_operation_name<T: Into<String>>(self, name: T) -> Self {
        Self {
            operation_name: Some(name.into()),
            ..self
        }
    }

    /// Specify the variables.
    #[must_use]
    pub fn variables(self, variables: Variables) -> Self {
        Self { variables, ..self }
    }

    /// Specify the root value for the top-level resolvers.
    #[must_use]
    pub fn root_value(self, root_value: serde_json::Value) -> Self {
        Self { root_value, ..self }
    }

    /// Insert some data for this request.
    #[must_use]
    pub fn data<D: Any + Send + Sync>(mut self, data: D) -> Self {
        self.data.insert(data);
        self
    }

    /// Set the introspection state for this request.
    #[must_use]
    pub fn set_introspection_state(mut self, state: IntrospectionState) -> Self {
        self.introspection_state = state;
        self
    }

    pub fn query(&self) -> &str {
        &self.query
    }

    pub fn operation_name(&self) -> Option<&str> {
        self.operation_name.as_deref()
    }
}

impl<T: Into<String>> From<T> for Request {
    fn from(query: T) -> Self {
        Self::new(query)
    }
}

impl Debug for Request {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        f.debug_struct("Request")
            .field("query", &self.query())
            .field("operation_name", &self.operation_name())
            .field("variables", &self.variables)
            .field("extensions", &self.extensions)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_request() {
        let request: Request = serde_json::from_value(serde_json::json!({
            "query": "{ a b c }"
        }))
        .unwrap();
        assert!(request.variables.is_empty());
        assert!(request.operation_name().is_none());
        assert_eq!(request.query(), "{ a b c }");
    }

    #[test]
    fn test_request_with_operation_name() {
        let request: Request = serde_json::from_value(serde_json::json!({
            "query": "{ a b c }",
            "operationName": "a"
        }))
        .unwrap();
        assert_eq!(request.operation_name(), Some("a"));
    }

    #[test]
    fn test_deserialize_request_with_null_variables() {
        let request: Request = serde_json::from_value(serde_json::json!({
            "query": "{ a b c }",
            "variables": null
        }))
        .unwrap();
        assert!(request.variables.is_empty());
    }
}
