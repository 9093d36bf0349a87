//! Query context.

use std::{
    any::{Any, TypeId},
    collections::{BTreeMap, HashMap},
    fmt::{self, Debug, Formatter},
    ops::Deref,
    sync::{Arc, Mutex},
};

use async_graphql_parser::{
    types::{Field, FragmentDefinition, OperationDefinition, SelectionSet},
    Pos, Positioned,
};
use async_graphql_value::{ConstValue as Value, Name, Value as InputValue, Variables};
use fnv::FnvHashMap;

use crate::{
    extensions::Extensions,
    query_path::QueryPath,
    registry::{MetaField, MetaType, Registry, ResolvedValue},
    request::IntrospectionState,
    schema::SchemaEnv,
    scope::ScopedMap,
    Error, Result, ServerError, ServerResult,
};

/// Schema/request data.
///
/// This is a type map, allowing you to store anything inside it.
#[derive(Default)]
pub struct Data(FnvHashMap<TypeId, Box<dyn Any + Sync + Send>>);

impl Data {
    /// Insert data.
    pub fn insert<D: Any + Send + Sync>(&mut self, data: D) {
        self.0.insert(TypeId::of::<D>(), Box::new(data));
    }

    fn get(&self, type_id: &TypeId) -> Option<&(dyn Any + Sync + Send)> {
        self.0.get(type_id).map(Box::as_ref)
    }
}

impl Debug for Data {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        f.debug_tuple("Data").finish()
    }
}

#[doc(hidden)]
pub struct QueryEnvInner {
    pub extensions: Extensions,
    pub variables: Variables,
    pub operation_name: Option<String>,
    pub operation: Positioned<OperationDefinition>,
    pub fragments: HashMap<Name, Positioned<FragmentDefinition>>,
    pub ctx_data: Arc<Data>,
    pub root_value: ResolvedValue,
    pub request_extensions: BTreeMap<String, Value>,
    pub introspection_state: IntrospectionState,
    pub errors: Mutex<Vec<ServerError>>,
    /// The request's scoped globals. Subscriptions derive a child scope per
    /// emitted event.
    pub globals: Arc<ScopedMap>,
}

#[doc(hidden)]
#[derive(Clone)]
pub struct QueryEnv(Arc<QueryEnvInner>);

impl Deref for QueryEnv {
    type Target = QueryEnvInner;

    fn deref(&self) -> &Self::Target {
        &self.0
    }
}

impl QueryEnv {
    #[doc(hidden)]
    pub fn new(inner: QueryEnvInner) -> QueryEnv {
        QueryEnv(Arc::new(inner))
    }

    #[doc(hidden)]
    pub fn create_context<'a>(&'a self, schema_env: &'a SchemaEnv, root_type: &'a MetaType) -> ContextSelectionSet<'a> {
        ContextSelectionSet {
            path: QueryPath::empty(),
            ty: root_type,
            items: vec![&self.operation.node.selection_set],
            schema_env,
            query_env: self,
        }
    }

    /// A fresh environment for one subscription event: same request, empty
    /// error list, child scope of the request globals.
    pub(crate) fn event_env(&self) -> QueryEnv {
        QueryEnv::new(QueryEnvInner {
            extensions: self.extensions.clone(),
            variables: self.variables.clone(),
            operation_name: self.operation_name.clone(),
            operation: self.operation.clone(),
            fragments: self.fragments.clone(),
            ctx_data: self.ctx_data.clone(),
            root_value: self.root_value.clone(),
            request_extensions: self.request_extensions.clone(),
            introspection_state: self.introspection_state,
            errors: Mutex::new(Vec::new()),
            globals: self.globals.child(),
        })
    }

    pub(crate) fn take_errors(&self) -> Vec<ServerError> {
        let mut errors = self.errors.lock().unwrap();
        std::mem::take(&mut *errors)
    }
}

/// Shared behaviour of the per-selection-set and per-field contexts.
pub trait ContextExt {
    fn path(&self) -> &QueryPath;
    fn query_env(&self) -> &QueryEnv;
    fn schema_env(&self) -> &SchemaEnv;

    fn registry(&self) -> &Registry {
        &self.schema_env().registry
    }

    /// Find a fragment definition by name.
    fn get_fragment(&self, name: &str) -> Option<&Positioned<FragmentDefinition>> {
        self.query_env().fragments.get(name)
    }

    /// Find a type definition by name.
    fn get_type(&self, name: &str) -> Option<&MetaType> {
        self.schema_env().registry.lookup_type(name)
    }

    /// The request's scoped globals.
    fn globals(&self) -> &ScopedMap {
        &self.query_env().globals
    }

    fn set_error_path(&self, error: ServerError) -> ServerError {
        if !error.path.is_empty() {
            // If the error already has a path we don't want to overwrite it.
            return error;
        }

        ServerError {
            path: self.path().iter().cloned().collect(),
            ..error
        }
    }

    /// Report a field error.
    ///
    /// Extensions get to map the error before it enters the request error
    /// list.
    fn add_error(&self, error: ServerError) {
        let error = self.query_env().extensions.map_exception(error);
        self.query_env().errors.lock().unwrap().push(error);
    }

    /// Gets the global data defined in the request or the schema.
    ///
    /// # Errors
    ///
    /// Returns a `Error` if the specified type data does not exist.
    fn data<D: Any + Send + Sync>(&self) -> Result<&D> {
        self.data_opt::<D>()
            .ok_or_else(|| Error::new(format!("Data `{}` does not exist.", std::any::type_name::<D>())))
    }

    /// Gets the global data defined in the request or the schema, or `None` if
    /// the specified type data does not exist.
    fn data_opt<D: Any + Send + Sync>(&self) -> Option<&D> {
        self.query_env()
            .ctx_data
            .get(&TypeId::of::<D>())
            .or_else(|| self.schema_env().data.get(&TypeId::of::<D>()))
            .and_then(|d| d.downcast_ref::<D>())
    }

    /// The coerced value of a variable, falling back to the definition's
    /// default.
    fn var_value(&self, name: &str, pos: Pos) -> ServerResult<Value> {
        self.query_env()
            .operation
            .node
            .variable_definitions
            .iter()
            .find(|def| def.node.name.node.as_str() == name)
            .and_then(|def| {
                self.query_env()
                    .variables
                    .get(def.node.name.node.as_str())
                    .or_else(|| def.node.default_value())
            })
            .cloned()
            .ok_or_else(|| ServerError::new(format!("Variable {name} is not defined."), Some(pos)))
    }

    /// Substitute any variable references in the value.
    fn resolve_input_value(&self, value: Positioned<InputValue>) -> ServerResult<Value> {
        let pos = value.pos;
        value.node.into_const_with(|name| self.var_value(name.as_str(), pos))
    }
}

/// The context of a selection set under execution against a concrete object
/// type.
///
/// Fields merged from fragment expansion can carry more than one selection
/// set; collection iterates them in order.
#[derive(Clone)]
pub struct ContextSelectionSet<'a> {
    /// The current path being resolved.
    pub path: QueryPath,
    /// The object type the selection set executes against.
    pub ty: &'a MetaType,
    /// The selection sets being resolved.
    pub items: Vec<&'a Positioned<SelectionSet>>,
    /// Context scoped to the current schema.
    pub schema_env: &'a SchemaEnv,
    /// Context scoped to the current request.
    pub query_env: &'a QueryEnv,
}

impl<'a> ContextSelectionSet<'a> {
    pub fn with_field(&self, field: &'a Positioned<Field>, meta_field: &'a MetaField) -> ContextField<'a> {
        let mut path = self.path.clone();
        path.push(field.node.response_key().node.as_str());
        ContextField {
            path,
            parent_type: self.ty,
            field: meta_field,
            item: field,
            schema_env: self.schema_env,
            query_env: self.query_env,
        }
    }
}

impl ContextExt for ContextSelectionSet<'_> {
    fn path(&self) -> &QueryPath {
        &self.path
    }

    fn query_env(&self) -> &QueryEnv {
        self.query_env
    }

    fn schema_env(&self) -> &SchemaEnv {
        self.schema_env
    }
}

impl Debug for ContextSelectionSet<'_> {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        f.debug_struct("ContextSelectionSet")
            .field("path", &self.path)
            .field("ty", &self.ty.name())
            .finish_non_exhaustive()
    }
}

/// The context of a single field under execution.
#[derive(Clone)]
pub struct ContextField<'a> {
    /// The current path being resolved, ending at this field's response key.
    pub path: QueryPath,
    /// The object type the field was selected on.
    pub parent_type: &'a MetaType,
    /// The field definition.
    pub field: &'a MetaField,
    /// The field node in the document.
    pub item: &'a Positioned<Field>,
    /// Context scoped to the current schema.
    pub schema_env: &'a SchemaEnv,
    /// Context scoped to the current request.
    pub query_env: &'a QueryEnv,
}

impl<'a> ContextField<'a> {
    /// The context of one list item below this field.
    #[must_use]
    pub fn with_index(&self, idx: usize) -> ContextField<'a> {
        ContextField {
            path: self.path.child(idx),
            ..self.clone()
        }
    }

    /// Descend into a sub-selection against the given object type.
    pub fn with_selection_set(
        &self,
        ty: &'a MetaType,
        items: Vec<&'a Positioned<SelectionSet>>,
    ) -> ContextSelectionSet<'a> {
        ContextSelectionSet {
            path: self.path.clone(),
            ty,
            items,
            schema_env: self.schema_env,
            query_env: self.query_env,
        }
    }
}

impl ContextExt for ContextField<'_> {
    fn path(&self) -> &QueryPath {
        &self.path
    }

    fn query_env(&self) -> &QueryEnv {
        self.query_env
    }

    fn schema_env(&self) -> &SchemaEnv {
        self.schema_env
    }
}

impl Debug for ContextField<'_> {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        f.debug_struct("ContextField")
            .field("path", &self.path)
            .field("field", &self.field.name)
            .finish_non_exhaustive()
    }
}
