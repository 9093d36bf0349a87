use std::{
    any::Any,
    collections::BTreeMap,
    convert::Infallible,
    fmt::{self, Debug, Display, Formatter},
    sync::Arc,
};

use async_graphql_parser::Pos;
use async_graphql_value::ConstValue;

#[derive(Debug, Clone, Copy, serde::Serialize, serde::Deserialize, strum_macros::Display)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
#[strum(serialize_all = "SCREAMING_SNAKE_CASE")]
pub enum ErrorCode {
    #[serde(rename = "GRAPHQL_PARSE_FAILED")]
    #[strum(serialize = "GRAPHQL_PARSE_FAILED")]
    GraphQlParseFailed,
    #[serde(rename = "GRAPHQL_VALIDATION_FAILED")]
    #[strum(serialize = "GRAPHQL_VALIDATION_FAILED")]
    GraphQlValidationFailed,
    BadUserInput,
    OperationNotFound,
    InternalServerError,
}

/// Alias for `Result<T, ServerError>`.
pub type ServerResult<T> = std::result::Result<T, ServerError>;

/// An alias for `Result<T, Error>`.
pub type Result<T, E = Error> = std::result::Result<T, E>;

/// Extension values attached to an error object under the `extensions` response key.
#[derive(Debug, Clone, Default, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct ErrorExtensionValues(pub(crate) BTreeMap<String, ConstValue>);

impl ErrorExtensionValues {
    pub fn set(&mut self, name: impl Into<String>, value: impl Into<ConstValue>) {
        self.0.insert(name.into(), value.into());
    }

    pub fn get(&self, name: &str) -> Option<&ConstValue> {
        self.0.get(name)
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

/// An error that occurred while serving a request.
///
/// Carries the source span of the offending node and, once known, the response
/// path the error applies to.
#[derive(Clone, serde::Serialize, serde::Deserialize)]
pub struct ServerError {
    /// An explanatory message of the error.
    pub message: String,
    /// The source of the error, if any.
    #[serde(skip)]
    pub source: Option<Arc<dyn Any + Send + Sync>>,
    /// Where the error occurred, 1-based line/column pairs.
    #[serde(skip_serializing_if = "Vec::is_empty", default)]
    pub locations: Vec<Pos>,
    /// If the error occurred during execution, the path to the response key
    /// the error applies to.
    #[serde(skip_serializing_if = "Vec::is_empty", default)]
    pub path: Vec<crate::QueryPathSegment>,
    /// Extensions to the error.
    #[serde(skip_serializing_if = "error_extensions_is_empty", default)]
    pub extensions: Option<ErrorExtensionValues>,
}

fn error_extensions_is_empty(values: &Option<ErrorExtensionValues>) -> bool {
    values.as_ref().map_or(true, ErrorExtensionValues::is_empty)
}

impl ServerError {
    /// Create a new server error with the message.
    pub fn new(message: impl Into<String>, pos: Option<Pos>) -> Self {
        Self {
            message: message.into(),
            source: None,
            locations: pos.map(|pos| vec![pos]).unwrap_or_default(),
            path: Vec::new(),
            extensions: None,
        }
    }

    /// Create a new server error carrying a machine-readable code in its extensions.
    pub fn new_with_code(message: impl Into<String>, pos: Option<Pos>, code: ErrorCode) -> Self {
        let mut error = Self::new(message, pos);
        error
            .extensions
            .get_or_insert_with(Default::default)
            .set("code", ConstValue::String(code.to_string()));
        error
    }
}

impl Debug for ServerError {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        f.debug_struct("ServerError")
            .field("message", &self.message)
            .field("locations", &self.locations)
            .field("path", &self.path)
            .field("extensions", &self.extensions)
            .finish_non_exhaustive()
    }
}

impl Display for ServerError {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        f.write_str(&self.message)
    }
}

impl PartialEq for ServerError {
    fn eq(&self, other: &Self) -> bool {
        self.message.eq(&other.message)
            && self.locations.eq(&other.locations)
            && self.path.eq(&other.path)
            && self.extensions.eq(&other.extensions)
    }
}

impl From<ServerError> for Vec<ServerError> {
    fn from(single: ServerError) -> Self {
        vec![single]
    }
}

/// An error parsing an input value against a scalar type.
#[derive(Debug)]
pub struct InputValueError {
    message: String,
}

impl InputValueError {
    pub fn message(self) -> String {
        self.message
    }

    /// A parse failure against the named type.
    #[must_use]
    pub fn ty_custom(ty: impl Display, msg: impl Display) -> Self {
        Self {
            message: format!(r#"Failed to parse "{ty}": {msg}"#),
        }
    }

    /// The expected input type did not match the actual input type.
    #[must_use]
    pub fn expected_type(ty: impl Display, actual: &ConstValue) -> Self {
        Self {
            message: format!(r#"Expected input type "{ty}", found {actual}."#),
        }
    }

    /// Convert the error into a server error.
    pub fn into_server_error(self, pos: Pos) -> ServerError {
        ServerError::new(self.message, Some(pos))
    }
}

/// An error parsing an input value.
pub type InputValueResult<T> = Result<T, InputValueError>;

/// An error with a message and optional extensions, raised by resolvers.
#[derive(Clone, serde::Serialize)]
pub struct Error {
    /// The error message.
    pub message: String,
    /// The source of the error.
    #[serde(skip)]
    pub source: Option<Arc<dyn Any + Send + Sync>>,
    /// Extensions to the error.
    #[serde(skip_serializing_if = "error_extensions_is_empty")]
    pub extensions: Option<ErrorExtensionValues>,
}

impl Debug for Error {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        f.debug_struct("Error")
            .field("message", &self.message)
            .field("extensions", &self.extensions)
            .finish_non_exhaustive()
    }
}

impl PartialEq for Error {
    fn eq(&self, other: &Self) -> bool {
        self.message.eq(&other.message) && self.extensions.eq(&other.extensions)
    }
}

impl Error {
    /// Create an error from the given error message.
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            source: None,
            extensions: None,
        }
    }

    /// Create an error with a type that implements `Display`, keeping the value
    /// around as the error source.
    pub fn new_with_source(source: impl Display + Send + Sync + 'static) -> Self {
        Self {
            message: source.to_string(),
            source: Some(Arc::new(source)),
            extensions: None,
        }
    }

    /// Convert the error to a server error.
    #[must_use]
    pub fn into_server_error(self, pos: Pos) -> ServerError {
        ServerError {
            message: self.message,
            source: self.source,
            locations: vec![pos],
            path: Vec::new(),
            extensions: self.extensions,
        }
    }
}

impl From<serde_json::Error> for Error {
    fn from(value: serde_json::Error) -> Self {
        Self::new(value.to_string())
    }
}

impl From<chrono::ParseError> for Error {
    fn from(value: chrono::ParseError) -> Self {
        Self::new(value.to_string())
    }
}

impl From<Infallible> for Error {
    fn from(value: Infallible) -> Self {
        Self::new(value.to_string())
    }
}

/// An error constructing a [`Schema`](crate::Schema).
#[derive(Debug, thiserror::Error)]
#[non_exhaustive]
pub enum SchemaError {
    /// A root operation type was named but never registered.
    #[error("the {0} root type `{1}` is not registered")]
    UnknownRootType(&'static str, String),

    /// A field or input references a type missing from the registry.
    #[error("type `{0}` is referenced by `{1}` but is not registered")]
    UnknownType(String, String),

    /// The named root operation type is not an object type.
    #[error("the {0} root type `{1}` must be an object type")]
    NonObjectRoot(&'static str, String),

    /// Subscription root fields must define how their event stream is obtained.
    #[error("subscription root field `{0}` has no subscriber")]
    MissingSubscriber(String),
}

/// An error which can be extended into a `Error`.
pub trait ErrorExtensions: Sized {
    /// Convert the error to a `Error`.
    fn extend(&self) -> Error;

    /// Add extensions to the error, using a callback to make the extensions.
    fn extend_with<C>(self, cb: C) -> Error
    where
        C: FnOnce(&Self, &mut ErrorExtensionValues),
    {
        let mut new_extensions = ErrorExtensionValues::default();
        cb(&self, &mut new_extensions);

        let Error {
            message,
            source,
            extensions,
        } = self.extend();

        let mut extensions = extensions.unwrap_or_default();
        extensions.0.extend(new_extensions.0);

        Error {
            message,
            source,
            extensions: Some(extensions),
        }
    }
}

impl ErrorExtensions for Error {
    fn extend(&self) -> Error {
        self.clone()
    }
}

// implementing for &E instead of E gives the user the possibility to implement
// for E without conflicting with this fallback.
impl<E: Display> ErrorExtensions for &E {
    fn extend(&self) -> Error {
        Error {
            message: self.to_string(),
            source: None,
            extensions: None,
        }
    }
}
