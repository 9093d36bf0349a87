//! Extensions: middleware hooks wrapping each stage of request processing.
//!
//! Hooks compose right-to-left: for extensions `[A, B]`, `A` runs outermost
//! and its `next` continuation reaches `B`, whose `next` reaches the core
//! behaviour. The chain for each stage is rebuilt from the immutable
//! extension list, never mutated during execution.

use std::{future::Future, sync::Arc};

use async_graphql_parser::types::ExecutableDocument;
use async_graphql_value::Variables;
use async_trait::async_trait;

use crate::{
    context::Data, query_path::QueryPath, registry::ResolvedValue, schema::SchemaEnv, Response, ServerError,
    ServerResult, Value,
};

/// The per-stage context handed to every hook.
pub struct ExtensionContext<'a> {
    pub schema_env: &'a SchemaEnv,
    pub ctx_data: &'a Data,
}

/// Information about the field a `resolve`/`execute_field`/`complete_value`
/// hook is wrapping.
pub struct ResolveInfo<'a> {
    /// The response path of the field.
    pub path: QueryPath,
    /// The name of the type the field was selected on.
    pub parent_type: &'a str,
    /// The declared type of the field.
    pub return_type: &'a str,
    /// The field name.
    pub name: &'a str,
    /// The field alias, if any.
    pub alias: Option<&'a str>,
}

type RequestFut<'a> = &'a mut (dyn Future<Output = Response> + Send + Unpin);
type ParseFn<'a> = Box<dyn FnOnce(&str, &Variables) -> ServerResult<ExecutableDocument> + Send + 'a>;
type ValidationFut<'a> = &'a mut (dyn Future<Output = Result<(), Vec<ServerError>>> + Send + Unpin);
type ExecuteFieldFut<'a> = &'a mut (dyn Future<Output = ServerResult<Value>> + Send + Unpin);
type ResolveFut<'a> = &'a mut (dyn Future<Output = ServerResult<ResolvedValue>> + Send + Unpin);
type CompleteValueFut<'a> = &'a mut (dyn Future<Output = ServerResult<Value>> + Send + Unpin);
type SubscriptionEventFut<'a> = &'a mut (dyn Future<Output = Response> + Send + Unpin);

/// The continuation for [`Extension::request`].
pub struct NextRequest<'a> {
    chain: &'a [Arc<dyn Extension>],
    request_fut: RequestFut<'a>,
}

impl NextRequest<'_> {
    pub async fn run(self, ctx: &ExtensionContext<'_>) -> Response {
        if let Some((first, rest)) = self.chain.split_first() {
            first
                .request(
                    ctx,
                    NextRequest {
                        chain: rest,
                        request_fut: self.request_fut,
                    },
                )
                .await
        } else {
            self.request_fut.await
        }
    }
}

/// The continuation for [`Extension::parse_query`].
pub struct NextParseQuery<'a> {
    chain: &'a [Arc<dyn Extension>],
    parse: ParseFn<'a>,
}

impl NextParseQuery<'_> {
    pub async fn run(
        self,
        ctx: &ExtensionContext<'_>,
        query: &str,
        variables: &Variables,
    ) -> ServerResult<ExecutableDocument> {
        if let Some((first, rest)) = self.chain.split_first() {
            first
                .parse_query(
                    ctx,
                    query,
                    variables,
                    NextParseQuery {
                        chain: rest,
                        parse: self.parse,
                    },
                )
                .await
        } else {
            (self.parse)(query, variables)
        }
    }
}

/// The continuation for [`Extension::validation`].
pub struct NextValidation<'a> {
    chain: &'a [Arc<dyn Extension>],
    validation_fut: ValidationFut<'a>,
}

impl NextValidation<'_> {
    pub async fn run(self, ctx: &ExtensionContext<'_>) -> Result<(), Vec<ServerError>> {
        if let Some((first, rest)) = self.chain.split_first() {
            first
                .validation(
                    ctx,
                    NextValidation {
                        chain: rest,
                        validation_fut: self.validation_fut,
                    },
                )
                .await
        } else {
            self.validation_fut.await
        }
    }
}

/// The continuation for [`Extension::execute_field`].
pub struct NextExecuteField<'a> {
    chain: &'a [Arc<dyn Extension>],
    field_fut: ExecuteFieldFut<'a>,
}

impl NextExecuteField<'_> {
    pub async fn run(self, ctx: &ExtensionContext<'_>, info: &ResolveInfo<'_>) -> ServerResult<Value> {
        if let Some((first, rest)) = self.chain.split_first() {
            first
                .execute_field(
                    ctx,
                    info,
                    NextExecuteField {
                        chain: rest,
                        field_fut: self.field_fut,
                    },
                )
                .await
        } else {
            self.field_fut.await
        }
    }
}

/// The continuation for [`Extension::resolve`].
pub struct NextResolve<'a> {
    chain: &'a [Arc<dyn Extension>],
    resolve_fut: ResolveFut<'a>,
}

impl NextResolve<'_> {
    pub async fn run(self, ctx: &ExtensionContext<'_>, info: &ResolveInfo<'_>) -> ServerResult<ResolvedValue> {
        if let Some((first, rest)) = self.chain.split_first() {
            first
                .resolve(
                    ctx,
                    info,
                    NextResolve {
                        chain: rest,
                        resolve_fut: self.resolve_fut,
                    },
                )
                .await
        } else {
            self.resolve_fut.await
        }
    }
}

/// The continuation for [`Extension::complete_value`].
pub struct NextCompleteValue<'a> {
    chain: &'a [Arc<dyn Extension>],
    complete_fut: CompleteValueFut<'a>,
}

impl NextCompleteValue<'_> {
    pub async fn run(self, ctx: &ExtensionContext<'_>, info: &ResolveInfo<'_>) -> ServerResult<Value> {
        if let Some((first, rest)) = self.chain.split_first() {
            first
                .complete_value(
                    ctx,
                    info,
                    NextCompleteValue {
                        chain: rest,
                        complete_fut: self.complete_fut,
                    },
                )
                .await
        } else {
            self.complete_fut.await
        }
    }
}

/// The continuation for [`Extension::subscription_event`].
pub struct NextSubscriptionEvent<'a> {
    chain: &'a [Arc<dyn Extension>],
    event_fut: SubscriptionEventFut<'a>,
}

impl NextSubscriptionEvent<'_> {
    pub async fn run(self, ctx: &ExtensionContext<'_>) -> Response {
        if let Some((first, rest)) = self.chain.split_first() {
            first
                .subscription_event(
                    ctx,
                    NextSubscriptionEvent {
                        chain: rest,
                        event_fut: self.event_fut,
                    },
                )
                .await
        } else {
            self.event_fut.await
        }
    }
}

/// A set of optional middleware hooks around request processing.
///
/// Every hook defaults to calling straight through to its continuation.
#[async_trait]
#[allow(unused_variables)]
pub trait Extension: Send + Sync + 'static {
    /// Wraps the whole request.
    async fn request(&self, ctx: &ExtensionContext<'_>, next: NextRequest<'_>) -> Response {
        next.run(ctx).await
    }

    /// Wraps obtaining the document node from the query source.
    async fn parse_query(
        &self,
        ctx: &ExtensionContext<'_>,
        query: &str,
        variables: &Variables,
        next: NextParseQuery<'_>,
    ) -> ServerResult<ExecutableDocument> {
        next.run(ctx, query, variables).await
    }

    /// Wraps document validation.
    async fn validation(&self, ctx: &ExtensionContext<'_>, next: NextValidation<'_>) -> Result<(), Vec<ServerError>> {
        next.run(ctx).await
    }

    /// Wraps the execution of one field: arguments, resolver and completion.
    async fn execute_field(
        &self,
        ctx: &ExtensionContext<'_>,
        info: &ResolveInfo<'_>,
        next: NextExecuteField<'_>,
    ) -> ServerResult<Value> {
        next.run(ctx, info).await
    }

    /// Wraps the resolver dispatch of one field.
    async fn resolve(
        &self,
        ctx: &ExtensionContext<'_>,
        info: &ResolveInfo<'_>,
        next: NextResolve<'_>,
    ) -> ServerResult<ResolvedValue> {
        next.run(ctx, info).await
    }

    /// Wraps the completion of one field's raw value.
    async fn complete_value(
        &self,
        ctx: &ExtensionContext<'_>,
        info: &ResolveInfo<'_>,
        next: NextCompleteValue<'_>,
    ) -> ServerResult<Value> {
        next.run(ctx, info).await
    }

    /// Wraps the execution of one subscription event.
    async fn subscription_event(&self, ctx: &ExtensionContext<'_>, next: NextSubscriptionEvent<'_>) -> Response {
        next.run(ctx).await
    }

    /// Maps an error before it enters the request error list.
    fn map_exception(&self, error: ServerError) -> ServerError {
        error
    }
}

/// A factory producing one [`Extension`] instance per request, so extensions
/// can carry per-request state.
pub trait ExtensionFactory: Send + Sync + 'static {
    fn create(&self) -> Arc<dyn Extension>;
}

/// The per-request extension chain.
#[derive(Clone)]
pub struct Extensions {
    extensions: Vec<Arc<dyn Extension>>,
    schema_env: SchemaEnv,
    ctx_data: Arc<Data>,
}

impl Extensions {
    pub(crate) fn new(
        extensions: impl IntoIterator<Item = Arc<dyn Extension>>,
        schema_env: SchemaEnv,
        ctx_data: Arc<Data>,
    ) -> Self {
        Extensions {
            extensions: extensions.into_iter().collect(),
            schema_env,
            ctx_data,
        }
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.extensions.is_empty()
    }

    fn ctx(&self) -> ExtensionContext<'_> {
        ExtensionContext {
            schema_env: &self.schema_env,
            ctx_data: &self.ctx_data,
        }
    }

    pub async fn request(&self, request_fut: RequestFut<'_>) -> Response {
        let ctx = self.ctx();
        NextRequest {
            chain: &self.extensions,
            request_fut,
        }
        .run(&ctx)
        .await
    }

    pub async fn parse_query(
        &self,
        query: &str,
        variables: &Variables,
        parse: ParseFn<'_>,
    ) -> ServerResult<ExecutableDocument> {
        let ctx = self.ctx();
        NextParseQuery {
            chain: &self.extensions,
            parse,
        }
        .run(&ctx, query, variables)
        .await
    }

    pub async fn validation(&self, validation_fut: ValidationFut<'_>) -> Result<(), Vec<ServerError>> {
        let ctx = self.ctx();
        NextValidation {
            chain: &self.extensions,
            validation_fut,
        }
        .run(&ctx)
        .await
    }

    pub async fn execute_field(&self, info: &ResolveInfo<'_>, field_fut: ExecuteFieldFut<'_>) -> ServerResult<Value> {
        let ctx = self.ctx();
        NextExecuteField {
            chain: &self.extensions,
            field_fut,
        }
        .run(&ctx, info)
        .await
    }

    pub async fn resolve(&self, info: &ResolveInfo<'_>, resolve_fut: ResolveFut<'_>) -> ServerResult<ResolvedValue> {
        let ctx = self.ctx();
        NextResolve {
            chain: &self.extensions,
            resolve_fut,
        }
        .run(&ctx, info)
        .await
    }

    pub async fn complete_value(&self, info: &ResolveInfo<'_>, complete_fut: CompleteValueFut<'_>) -> ServerResult<Value> {
        let ctx = self.ctx();
        NextCompleteValue {
            chain: &self.extensions,
            complete_fut,
        }
        .run(&ctx, info)
        .await
    }

    pub async fn subscription_event(&self, event_fut: SubscriptionEventFut<'_>) -> Response {
        let ctx = self.ctx();
        NextSubscriptionEvent {
            chain: &self.extensions,
            event_fut,
        }
        .run(&ctx)
        .await
    }

    /// Applied in extension order, outermost first.
    pub fn map_exception(&self, error: ServerError) -> ServerError {
        self.extensions
            .iter()
            .fold(error, |error, extension| extension.map_exception(error))
    }
}
