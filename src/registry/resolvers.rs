//! The resolver abstraction fields carry.

use std::{fmt, sync::Arc};

use async_graphql_value::{ConstValue, Name};
use futures::{
    future::BoxFuture,
    stream::{self, BoxStream, StreamExt},
};
use indexmap::IndexMap;

use crate::{ContextField, Error, QueryPathSegment};

/// Values passed around between resolvers; JSON-shaped and cheap to clone or
/// take sub-copies of.
#[derive(Debug, Clone)]
pub struct ResolvedValue {
    /// The root of the JSON blob that contains this ResolvedValue.
    data_root: Arc<serde_json::Value>,
    /// The path to this ResolvedValue inside data_root.
    ///
    /// This allows us to take a sub-copy of a ResolvedValue without having to
    /// clone the entire associated serde_json::Value.
    data_path: Vec<QueryPathSegment>,
}

impl ResolvedValue {
    pub fn new(value: serde_json::Value) -> Self {
        Self {
            data_root: Arc::new(value),
            data_path: vec![],
        }
    }

    pub fn null() -> Self {
        Self::new(serde_json::Value::Null)
    }

    pub fn data_resolved(&self) -> &serde_json::Value {
        self.data_path.iter().fold(self.data_root.as_ref(), |value, index| {
            match index {
                QueryPathSegment::Field(field) => value.get(field.as_str()),
                QueryPathSegment::Index(index) => value.get(*index),
            }
            .expect("data_path to be validated before ResolvedValue construction")
        })
    }

    pub fn is_null(&self) -> bool {
        self.data_resolved().is_null()
    }

    /// Returns a new ResolvedValue pointing at the given field, assuming this
    /// is an object and the field exists.
    pub fn get_field(&self, name: &str) -> Option<ResolvedValue> {
        self.data_resolved().get(name)?;

        let mut data_path = self.data_path.clone();
        data_path.push(QueryPathSegment::Field(name.to_string()));

        Some(ResolvedValue {
            data_root: Arc::clone(&self.data_root),
            data_path,
        })
    }

    /// Takes the inner value.
    ///
    /// If possible this will avoid cloning, but if we're not the sole owner of
    /// data_root it'll clone.
    pub fn take(mut self) -> serde_json::Value {
        match Arc::try_unwrap(self.data_root) {
            Ok(value) => self.data_path.iter().fold(value, |mut value, index| match index {
                QueryPathSegment::Field(field) => {
                    value.get_mut(field.as_str()).expect("data_path to be validated").take()
                }
                QueryPathSegment::Index(index) => value.get_mut(*index).expect("data_path to be validated").take(),
            }),
            Err(arc) => {
                self.data_root = arc;
                self.data_resolved().clone()
            }
        }
    }

    /// If this ResolvedValue is an array, returns an iterator of the items of
    /// that list.
    pub fn item_iter(&self) -> Option<impl Iterator<Item = ResolvedValue> + '_> {
        match self.data_resolved() {
            serde_json::Value::Array(array) => Some((0..array.len()).map(|index| {
                let mut data_path = self.data_path.clone();
                data_path.push(QueryPathSegment::Index(index));

                ResolvedValue {
                    data_root: Arc::clone(&self.data_root),
                    data_path,
                }
            })),
            _ => None,
        }
    }
}

impl Default for ResolvedValue {
    fn default() -> Self {
        Self::null()
    }
}

impl From<serde_json::Value> for ResolvedValue {
    fn from(value: serde_json::Value) -> Self {
        Self::new(value)
    }
}

/// Everything a resolver function gets to see.
pub struct ResolverContext<'a> {
    /// The execution context of the field being resolved.
    pub ctx: &'a ContextField<'a>,
    /// The parent object's resolved value.
    pub parent_value: &'a ResolvedValue,
    /// The coerced arguments of the field.
    pub args: &'a IndexMap<Name, ConstValue>,
}

impl<'a> ResolverContext<'a> {
    pub fn arg(&self, name: &str) -> Option<&ConstValue> {
        self.args.get(name)
    }
}

/// The outcome of invoking a resolver: either a value, or more work.
///
/// Resolvers may return futures resolving to further futures; the executor
/// unwraps these iteratively, one await per step, until a value surfaces.
pub enum FieldResolution {
    Ready(ResolvedValue),
    Deferred(BoxFuture<'static, Result<FieldResolution, Error>>),
}

impl FieldResolution {
    pub fn value(value: serde_json::Value) -> Self {
        FieldResolution::Ready(ResolvedValue::new(value))
    }

    pub fn null() -> Self {
        FieldResolution::Ready(ResolvedValue::null())
    }

    pub fn future<F>(fut: F) -> Self
    where
        F: std::future::Future<Output = Result<serde_json::Value, Error>> + Send + 'static,
    {
        FieldResolution::Deferred(Box::pin(async move {
            fut.await.map(|value| FieldResolution::Ready(ResolvedValue::new(value)))
        }))
    }
}

pub type ResolverFn = Arc<dyn for<'a> Fn(ResolverContext<'a>) -> Result<FieldResolution, Error> + Send + Sync>;

/// How a field obtains its raw value.
#[derive(Clone, Default)]
pub enum Resolver {
    /// The field is read off the parent object's value by name.
    #[default]
    Parent,
    /// The field runs its own resolver function.
    Function(ResolverFn),
}

impl Resolver {
    pub fn function<F>(f: F) -> Self
    where
        F: for<'a> Fn(ResolverContext<'a>) -> Result<FieldResolution, Error> + Send + Sync + 'static,
    {
        Resolver::Function(Arc::new(f))
    }

    pub fn is_parent(&self) -> bool {
        matches!(self, Resolver::Parent)
    }
}

impl fmt::Debug for Resolver {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Resolver::Parent => f.write_str("Parent"),
            Resolver::Function(_) => f.write_str("Function"),
        }
    }
}

/// The source events a subscription field produces.
///
/// Subscribers that yield a single value rather than a stream are wrapped as
/// a one-element stream.
pub enum SourceEvents {
    Stream(BoxStream<'static, Result<serde_json::Value, Error>>),
    Single(serde_json::Value),
}

impl SourceEvents {
    pub(crate) fn into_stream(self) -> BoxStream<'static, Result<serde_json::Value, Error>> {
        match self {
            SourceEvents::Stream(stream) => stream,
            SourceEvents::Single(value) => stream::once(async move { Ok(value) }).boxed(),
        }
    }
}

pub type SubscriberFn = Arc<dyn for<'a> Fn(ResolverContext<'a>) -> Result<SourceEvents, Error> + Send + Sync>;

/// Produces the stream of source events for a subscription root field.
#[derive(Clone)]
pub struct Subscriber(SubscriberFn);

impl Subscriber {
    pub fn new<F>(f: F) -> Self
    where
        F: for<'a> Fn(ResolverContext<'a>) -> Result<SourceEvents, Error> + Send + Sync + 'static,
    {
        Subscriber(Arc::new(f))
    }

    pub(crate) fn subscribe(&self, ctx: ResolverContext<'_>) -> Result<SourceEvents, Error> {
        (self.0.as_ref())(ctx)
    }
}

impl fmt::Debug for Subscriber {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("Subscriber")
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    #[test]
    fn test_resolved_value_array() {
        let data = ResolvedValue::new(json!(["hello", "there"]));
        assert_eq!(
            data.item_iter().unwrap().map(ResolvedValue::take).collect::<Vec<_>>(),
            vec![json!("hello"), json!("there")]
        );
    }

    #[test]
    fn test_resolved_value_object() {
        let data = ResolvedValue::new(json!({"a": "hello", "b": "there"}));
        assert_eq!(data.get_field("a").unwrap().data_resolved(), &json!("hello"));
        assert_eq!(data.get_field("b").unwrap().take(), json!("there"));
        assert!(data.get_field("c").is_none());
    }

    #[test]
    fn test_resolved_value_scalar() {
        let data = ResolvedValue::new(json!(true));
        assert!(data.get_field("hello").is_none());
        assert!(data.item_iter().is_none());
        assert_eq!(data.take(), json!(true));
    }
}
