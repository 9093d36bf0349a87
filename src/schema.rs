//! Schema construction and request execution.

use std::{
    any::Any,
    ops::Deref,
    sync::{Arc, Mutex},
};

use async_graphql_parser::{
    parse_query,
    types::{BaseType, DocumentOperations, ExecutableDocument, OperationDefinition, OperationType, Type},
    Positioned,
};
use async_graphql_value::{ConstValue, Name, Variables};
use futures::stream::{self, BoxStream, StreamExt};

use crate::{
    context::{Data, QueryEnv, QueryEnvInner},
    extensions::{ExtensionFactory, Extensions},
    registry::{
        introspection, FieldResolution, MetaInputValue, MetaType, Registry, ResolvedValue, ResolverContext, ResolverFn,
    },
    resolver_utils::{resolve_container, resolve_container_serial, resolve_input},
    scope::ScopedMap,
    subscription::execute_subscription_stream,
    validation::{check_rules, RuleError},
    Error, ErrorCode, Request, Response, SchemaError, ServerError,
};

#[doc(hidden)]
pub struct SchemaEnvInner {
    pub registry: Registry,
    pub data: Data,
    pub default_resolver: Option<ResolverFn>,
    pub validation_enabled: bool,
}

#[doc(hidden)]
#[derive(Clone)]
pub struct SchemaEnv(Arc<SchemaEnvInner>);

impl Deref for SchemaEnv {
    type Target = SchemaEnvInner;

    fn deref(&self) -> &Self::Target {
        &self.0
    }
}

#[doc(hidden)]
pub struct SchemaInner {
    pub(crate) env: SchemaEnv,
    extensions: Vec<Box<dyn ExtensionFactory>>,
}

/// An executable GraphQL schema: the type registry plus the engine
/// configuration. Cheap to clone, immutable once built.
#[derive(Clone)]
pub struct Schema(Arc<SchemaInner>);

impl Deref for Schema {
    type Target = SchemaInner;

    fn deref(&self) -> &Self::Target {
        &self.0
    }
}

/// Assembles a [`Schema`] out of registered types, data, extensions and
/// engine options.
pub struct SchemaBuilder {
    registry: Registry,
    data: Data,
    extensions: Vec<Box<dyn ExtensionFactory>>,
    default_resolver: Option<ResolverFn>,
    validation_enabled: bool,
}

impl Schema {
    /// Starts a builder with the given root operation type names.
    pub fn build(query: impl Into<String>, mutation: Option<&str>, subscription: Option<&str>) -> SchemaBuilder {
        let mut registry = Registry::new();
        registry.query_type = query.into();
        registry.mutation_type = mutation.map(ToString::to_string);
        registry.subscription_type = subscription.map(ToString::to_string);

        SchemaBuilder {
            registry,
            data: Data::default(),
            extensions: Vec::new(),
            default_resolver: None,
            validation_enabled: true,
        }
    }

    pub fn registry(&self) -> &Registry {
        &self.env.registry
    }

    /// Executes a query or mutation request to completion.
    pub async fn execute(&self, request: impl Into<Request>) -> Response {
        let mut request = request.into();
        let ctx_data = Arc::new(std::mem::take(&mut request.data));
        let extensions = Extensions::new(
            self.extensions.iter().map(|factory| factory.create()),
            self.env.clone(),
            ctx_data.clone(),
        );

        let request_fut = self.execute_once(request, ctx_data, extensions.clone());
        futures_util::pin_mut!(request_fut);
        extensions.request(&mut request_fut).await
    }

    /// Executes a request as a response stream.
    ///
    /// Queries and mutations yield a single response; subscriptions yield one
    /// response per source event until the source terminates.
    pub fn execute_stream(&self, request: impl Into<Request>) -> BoxStream<'static, Response> {
        let schema = self.clone();
        let mut request = request.into();

        Box::pin(
            stream::once(async move {
                let ctx_data = Arc::new(std::mem::take(&mut request.data));
                let extensions = Extensions::new(
                    schema.extensions.iter().map(|factory| factory.create()),
                    schema.env.clone(),
                    ctx_data.clone(),
                );

                let env = match schema.prepare_request(request, ctx_data, extensions).await {
                    Ok(env) => env,
                    Err(errors) => {
                        return stream::once(async move { Response::from_errors(errors) }).boxed();
                    }
                };

                if env.operation.node.ty == OperationType::Subscription {
                    execute_subscription_stream(schema.clone(), env)
                } else {
                    let schema = schema.clone();
                    stream::once(async move { schema.execute_env(env).await }).boxed()
                }
            })
            .flatten(),
        )
    }

    async fn execute_once(&self, request: Request, ctx_data: Arc<Data>, extensions: Extensions) -> Response {
        let env = match self.prepare_request(request, ctx_data, extensions).await {
            Ok(env) => env,
            Err(errors) => return Response::from_errors(errors),
        };

        if env.operation.node.ty == OperationType::Subscription {
            return Response::from_errors(vec![ServerError::new(
                "Subscriptions are only supported on streaming transports; use execute_stream",
                Some(env.operation.pos),
            )]);
        }

        self.execute_env(env).await
    }

    /// Parses, validates, selects the operation and coerces variables,
    /// producing the request environment execution runs in.
    async fn prepare_request(
        &self,
        request: Request,
        ctx_data: Arc<Data>,
        extensions: Extensions,
    ) -> Result<QueryEnv, Vec<ServerError>> {
        let document = extensions
            .parse_query(
                &request.query,
                &request.variables,
                Box::new(|query, _variables| {
                    parse_query(query).map_err(|err| {
                        let mut error =
                            ServerError::new_with_code(err.to_string(), None, ErrorCode::GraphQlParseFailed);
                        error.locations = err.positions().collect();
                        error
                    })
                }),
            )
            .await
            .map_err(|err| vec![err])?;

        if self.env.validation_enabled {
            let validation_fut = async {
                check_rules(&self.env.registry, &document)
                    .map_err(|errors| errors.into_iter().map(rule_error_to_server_error).collect::<Vec<_>>())
            };
            futures_util::pin_mut!(validation_fut);
            extensions.validation(&mut validation_fut).await?;
        }

        let operation = select_operation(&document, request.operation_name.as_deref())
            .map_err(|err| vec![err])?
            .clone();

        let variables = self
            .coerce_variables(&operation, request.variables)
            .map_err(|err| vec![err])?;

        tracing::debug!(
            operation_type = %operation.node.ty,
            operation_name = ?request.operation_name,
            "request prepared"
        );

        Ok(QueryEnv::new(QueryEnvInner {
            extensions,
            variables,
            operation_name: request.operation_name,
            operation,
            fragments: document.fragments,
            ctx_data,
            root_value: ResolvedValue::new(request.root_value),
            request_extensions: request.extensions,
            introspection_state: request.introspection_state,
            errors: Mutex::default(),
            globals: ScopedMap::new(),
        }))
    }

    /// Runs the selected operation's selection set: serially for mutation
    /// roots, concurrently otherwise.
    async fn execute_env(&self, env: QueryEnv) -> Response {
        let Some(root_type) = self.env.registry.root_type(env.operation.node.ty) else {
            return Response::from_errors(vec![ServerError::new(
                format!("Schema is not configured for {}s.", env.operation.node.ty),
                Some(env.operation.pos),
            )]);
        };

        let ctx = env.create_context(&self.env, root_type);
        let result = match env.operation.node.ty {
            OperationType::Mutation => resolve_container_serial(&ctx, &env.root_value).await,
            _ => resolve_container(&ctx, &env.root_value).await,
        };

        match result {
            Ok(data) => {
                let mut response = Response::new(data);
                response.errors = env.take_errors();
                response
            }
            Err(error) => {
                let mut errors = env.take_errors();
                errors.push(env.extensions.map_exception(error));
                Response {
                    errors,
                    ..Response::new(ConstValue::Null)
                }
            }
        }
    }

    /// Coerces the supplied variable values against the operation's variable
    /// definitions, applying defaults and rejecting missing non-null values.
    fn coerce_variables(
        &self,
        operation: &Positioned<OperationDefinition>,
        variables: Variables,
    ) -> Result<Variables, ServerError> {
        let registry = &self.env.registry;
        let mut coerced = Variables::default();

        for definition in &operation.node.variable_definitions {
            let name = definition.node.name.node.as_str();
            let base = base_type_name(&definition.node.var_type.node);

            let base_type = registry.lookup_type(base).ok_or_else(|| {
                ServerError::new_with_code(
                    format!("Unknown type \"{base}\""),
                    Some(definition.node.var_type.pos),
                    ErrorCode::GraphQlValidationFailed,
                )
            })?;
            if !base_type.is_input() {
                return Err(ServerError::new_with_code(
                    format!("Variable \"${name}\" cannot be of non-input type \"{base}\""),
                    Some(definition.node.var_type.pos),
                    ErrorCode::GraphQlValidationFailed,
                ));
            }

            let meta_input = {
                let mut input = MetaInputValue::new(name, definition.node.var_type.node.to_string());
                if let Some(default) = definition.node.default_value() {
                    input = input.with_default(default.clone());
                }
                input
            };

            let supplied = variables.get(name).cloned();
            match resolve_input(registry, definition.pos, name, &meta_input, supplied) {
                Ok(Some(value)) => {
                    coerced.insert(Name::new(name), value);
                }
                // Absent and nullable: the variable stays unset rather than null.
                Ok(None) => {}
                Err(mut error) => {
                    error
                        .extensions
                        .get_or_insert_with(Default::default)
                        .set("code", ConstValue::String(ErrorCode::BadUserInput.to_string()));
                    return Err(error);
                }
            }
        }

        Ok(coerced)
    }
}

impl SchemaBuilder {
    /// Registers a type.
    pub fn register(mut self, ty: impl Into<MetaType>) -> Self {
        self.registry.insert_type(ty);
        self
    }

    /// Declares a custom directive. Custom directives surface through
    /// introspection but carry no runtime semantics.
    pub fn register_directive(mut self, directive: crate::registry::MetaDirective) -> Self {
        self.registry.add_directive(directive);
        self
    }

    /// Add a global data that can be accessed in the `Schema`.
    #[must_use]
    pub fn data<D: Any + Send + Sync>(mut self, data: D) -> Self {
        self.data.insert(data);
        self
    }

    /// Add an extension to the schema.
    #[must_use]
    pub fn extension(mut self, factory: impl ExtensionFactory) -> Self {
        self.extensions.push(Box::new(factory));
        self
    }

    /// The engine-level fallback used when a field has no resolver and its
    /// parent value carries no entry for it.
    #[must_use]
    pub fn default_resolver<F>(mut self, resolver: F) -> Self
    where
        F: for<'a> Fn(ResolverContext<'a>) -> Result<FieldResolution, Error> + Send + Sync + 'static,
    {
        self.default_resolver = Some(Arc::new(resolver));
        self
    }

    /// Disable introspection queries.
    #[must_use]
    pub fn disable_introspection(mut self) -> Self {
        self.registry.disable_introspection = true;
        self
    }

    /// Skip document validation. Unknown fields are then dropped from the
    /// response instead of rejecting the request.
    #[must_use]
    pub fn disable_validation(mut self) -> Self {
        self.validation_enabled = false;
        self
    }

    /// Finalizes the schema: registers built-ins, wires interface
    /// implementations, checks referential integrity and installs
    /// introspection.
    pub fn finish(mut self) -> Result<Schema, SchemaError> {
        self.registry.add_builtin_scalars();
        self.registry.add_builtin_directives();

        check_root_type(&self.registry, "query", Some(self.registry.query_type.as_str()))?;
        check_root_type(&self.registry, "mutation", self.registry.mutation_type.as_deref())?;
        check_root_type(&self.registry, "subscription", self.registry.subscription_type.as_deref())?;

        // Wire up interface possible types from the objects that declare them.
        let implementations: Vec<(String, String)> = self
            .registry
            .types
            .values()
            .filter_map(MetaType::object)
            .flat_map(|object| {
                object
                    .implements
                    .iter()
                    .map(|interface| (object.name.clone(), interface.clone()))
            })
            .collect();
        for (object, interface) in implementations {
            if let Some(MetaType::Interface(meta)) = self.registry.types.get_mut(&interface) {
                meta.possible_types.insert(object.clone());
            }
            self.registry.add_implements(&object, &interface);
        }

        check_type_references(&self.registry)?;

        if let Some(subscription_root) = self
            .registry
            .subscription_type
            .clone()
            .and_then(|name| self.registry.lookup_type(&name))
        {
            if let Some(fields) = subscription_root.fields() {
                for field in fields.values() {
                    if field.subscriber.is_none() && field.resolver.is_parent() {
                        return Err(SchemaError::MissingSubscriber(field.name.clone()));
                    }
                }
            }
        }

        introspection::add_introspection(&mut self.registry);

        Ok(Schema(Arc::new(SchemaInner {
            env: SchemaEnv(Arc::new(SchemaEnvInner {
                registry: self.registry,
                data: self.data,
                default_resolver: self.default_resolver,
                validation_enabled: self.validation_enabled,
            })),
            extensions: self.extensions,
        })))
    }
}

fn check_root_type(registry: &Registry, kind: &'static str, name: Option<&str>) -> Result<(), SchemaError> {
    let Some(name) = name else {
        return Ok(());
    };
    match registry.lookup_type(name) {
        Some(MetaType::Object(_)) => Ok(()),
        Some(_) => Err(SchemaError::NonObjectRoot(kind, name.to_string())),
        None => Err(SchemaError::UnknownRootType(kind, name.to_string())),
    }
}

/// Every named-type reference in the registry must resolve.
fn check_type_references(registry: &Registry) -> Result<(), SchemaError> {
    let mut check = |referenced: &str, referencing: String| -> Result<(), SchemaError> {
        if registry.lookup_type(referenced).is_none() {
            return Err(SchemaError::UnknownType(referenced.to_string(), referencing));
        }
        Ok(())
    };

    for ty in registry.types.values() {
        if let Some(fields) = ty.fields() {
            for field in fields.values() {
                check(
                    crate::registry::named_type_from_type_str(field.ty.as_str()),
                    format!("{}.{}", ty.name(), field.name),
                )?;
                for arg in field.args.values() {
                    check(
                        crate::registry::named_type_from_type_str(arg.ty.as_str()),
                        format!("{}.{}({})", ty.name(), field.name, arg.name),
                    )?;
                }
            }
        }
        match ty {
            MetaType::Union(union) => {
                for possible in &union.possible_types {
                    check(possible, ty.name().to_string())?;
                }
            }
            MetaType::InputObject(input_object) => {
                for input in input_object.input_fields.values() {
                    check(
                        crate::registry::named_type_from_type_str(input.ty.as_str()),
                        format!("{}.{}", ty.name(), input.name),
                    )?;
                }
            }
            MetaType::Object(object) => {
                for interface in &object.implements {
                    check(interface, ty.name().to_string())?;
                }
            }
            _ => {}
        }
    }
    Ok(())
}

/// §operation selection: zero operations and ambiguous/unknown names error
/// before any execution.
fn select_operation<'a>(
    document: &'a ExecutableDocument,
    operation_name: Option<&str>,
) -> Result<&'a Positioned<OperationDefinition>, ServerError> {
    match (operation_name, &document.operations) {
        (Some(name), DocumentOperations::Multiple(operations)) => operations.get(name).ok_or_else(|| {
            ServerError::new_with_code(
                format!("Unknown operation named \"{name}\""),
                None,
                ErrorCode::OperationNotFound,
            )
        }),
        (Some(name), DocumentOperations::Single(_)) => Err(ServerError::new_with_code(
            format!("Unknown operation named \"{name}\""),
            None,
            ErrorCode::OperationNotFound,
        )),
        (None, DocumentOperations::Single(operation)) => Ok(operation),
        (None, DocumentOperations::Multiple(operations)) => {
            if operations.is_empty() {
                return Err(ServerError::new_with_code(
                    "The document does not contain any operations",
                    None,
                    ErrorCode::OperationNotFound,
                ));
            }
            if operations.len() > 1 {
                return Err(ServerError::new_with_code(
                    "Operation name required in request",
                    None,
                    ErrorCode::OperationNotFound,
                ));
            }
            Ok(operations.values().next().unwrap())
        }
    }
}

fn rule_error_to_server_error(error: RuleError) -> ServerError {
    let mut server_error = ServerError::new(error.message, None);
    server_error.locations = error.locations;
    let extensions = server_error.extensions.get_or_insert_with(Default::default);
    extensions.set(
        "code",
        ConstValue::String(ErrorCode::GraphQlValidationFailed.to_string()),
    );
    extensions.set("rule", ConstValue::String(error.code.to_string()));
    server_error
}

fn base_type_name(ty: &Type) -> &str {
    match &ty.base {
        BaseType::Named(name) => name.as_str(),
        BaseType::List(inner) => base_type_name(inner),
    }
}
