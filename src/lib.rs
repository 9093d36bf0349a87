//! A server-side GraphQL execution engine.
//!
//! Given a schema built over a dynamic type registry and a parsed document,
//! the engine validates the document, coerces variables and arguments,
//! executes query/mutation/subscription operations against resolver
//! functions, and serializes the resulting value tree into the GraphQL
//! response shape.
//!
//! Parsing is delegated to `async-graphql-parser`; resolvers exchange
//! JSON-shaped values (`serde_json::Value`) which the engine completes
//! against the declared types.
//!
//! ```no_run
//! use graphql_engine::{
//!     registry::{FieldResolution, MetaField, ObjectType, Resolver},
//!     Request, Schema,
//! };
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let schema = Schema::build("Query", None, None)
//!     .register(ObjectType::new(
//!         "Query",
//!         [MetaField::new("hello", "String!").with_resolver(Resolver::function(|_ctx| {
//!             Ok(FieldResolution::value(serde_json::json!("world")))
//!         }))],
//!     ))
//!     .finish()?;
//!
//! let response = schema.execute(Request::new("{ hello }")).await;
//! assert!(response.is_ok());
//! # Ok(())
//! # }
//! ```

mod context;
mod error;
pub mod extensions;
mod query_path;
pub mod registry;
mod request;
mod resolver_utils;
mod response;
mod schema;
mod scope;
mod subscription;
pub mod validation;

pub use async_graphql_parser::{parse_query, types, Pos, Positioned};
pub use async_graphql_value::{ConstValue as Value, Name, Number, Variables};

pub use crate::{
    context::{ContextExt, ContextField, ContextSelectionSet, Data, QueryEnv, QueryEnvInner},
    error::{
        Error, ErrorCode, ErrorExtensionValues, ErrorExtensions, InputValueError, InputValueResult, Result,
        SchemaError, ServerError, ServerResult,
    },
    extensions::{Extension, ExtensionContext, ExtensionFactory, ResolveInfo},
    query_path::{QueryPath, QueryPathSegment},
    registry::{
        Deprecation, EnumType, FieldResolution, InputObjectType, InterfaceType, MetaDirective, MetaEnumValue,
        MetaField, MetaInputValue, MetaType, ObjectType, Registry, ResolvedValue, Resolver, ResolverContext,
        ScalarType, SourceEvents, Subscriber, UnionType,
    },
    request::{IntrospectionState, Request},
    resolver_utils::resolve_input,
    response::Response,
    schema::{Schema, SchemaBuilder, SchemaEnv},
    scope::ScopedMap,
};
