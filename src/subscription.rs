//! Subscription execution: one response per source event.

use async_graphql_value::{ConstValue, Name};
use futures::stream::{self, BoxStream, StreamExt};
use indexmap::IndexMap;

use crate::{
    context::QueryEnv,
    registry::{ResolvedValue, Resolver, ResolverContext},
    resolver_utils::{coerce_arguments, collect_fields, complete_field_value, dispatch_resolver, extract_result},
    ContextExt, Error, Response, Schema, ServerError, ServerResult,
};

/// A single value produced by the subscription's source stream, treated as
/// the root object when the selection set executes against it.
struct SubscriptionEvent {
    value: ResolvedValue,
}

impl SubscriptionEvent {
    fn new(value: serde_json::Value) -> Self {
        SubscriptionEvent {
            value: ResolvedValue::new(value),
        }
    }
}

/// Resolves the single subscription root field, subscribes to its source
/// events and maps each event to a response. Termination of the source
/// terminates the output stream; per-event errors are reported inside their
/// response and the stream continues.
pub(crate) fn execute_subscription_stream(schema: Schema, env: QueryEnv) -> BoxStream<'static, Response> {
    Box::pin(
        stream::once(async move {
            match subscribe_to_source(&schema, &env).await {
                Ok(source) => source
                    .then({
                        let schema = schema.clone();
                        let env = env.clone();
                        move |event| execute_event(schema.clone(), env.clone(), event)
                    })
                    .boxed(),
                Err(response) => stream::once(async move { response }).boxed(),
            }
        })
        .flatten(),
    )
}

/// Coerces the root field's arguments and obtains the source event stream
/// from its subscriber, falling back to its resolver for single-shot sources.
async fn subscribe_to_source(
    schema: &Schema,
    env: &QueryEnv,
) -> Result<BoxStream<'static, Result<serde_json::Value, Error>>, Response> {
    let setup: ServerResult<_> = async {
        let root_type = schema.env.registry.root_type(env.operation.node.ty).ok_or_else(|| {
            ServerError::new("Schema is not configured for subscriptions.", Some(env.operation.pos))
        })?;
        let ctx = env.create_context(&schema.env, root_type);

        let collected = collect_fields(&ctx)?;
        if collected.len() != 1 {
            return Err(ServerError::new(
                "Subscriptions must select exactly one top-level field",
                Some(env.operation.pos),
            ));
        }
        let collected_field = &collected[0];
        let field_node = collected_field.nodes[0];
        let field_name = field_node.node.name.node.as_str();

        let meta_field = root_type.field_by_name(field_name).ok_or_else(|| {
            ServerError::new(
                format!("Unknown field \"{field_name}\" on type \"{}\"", root_type.name()),
                Some(field_node.node.name.pos),
            )
        })?;

        let ctx_field = ctx.with_field(field_node, meta_field);
        let args = coerce_arguments(&ctx_field)?;

        match &meta_field.subscriber {
            Some(subscriber) => {
                let events = subscriber
                    .subscribe(ResolverContext {
                        ctx: &ctx_field,
                        parent_value: &env.root_value,
                        args: &args,
                    })
                    .map_err(|err| err.into_server_error(field_node.pos))?;
                Ok(events.into_stream())
            }
            // No subscriber: resolve once and treat the value as the only event.
            None => {
                let value = dispatch_resolver(&ctx_field, &env.root_value, &args).await?;
                Ok(stream::once(async move { Ok(value.take()) }).boxed())
            }
        }
    }
    .await;

    setup.map_err(|error| Response::from_errors(vec![env.extensions.map_exception(error)]))
}

/// Executes the subscription's selection set against one source event in a
/// fresh child scope of the request globals.
async fn execute_event(schema: Schema, env: QueryEnv, event: Result<serde_json::Value, Error>) -> Response {
    let event_env = env.event_env();
    let extensions = event_env.extensions.clone();

    tracing::debug!(operation_name = ?event_env.operation_name, "executing subscription event");

    let event_fut = execute_event_inner(&schema, &event_env, event);
    if extensions.is_empty() {
        event_fut.await
    } else {
        futures_util::pin_mut!(event_fut);
        extensions.subscription_event(&mut event_fut).await
    }
}

async fn execute_event_inner(schema: &Schema, env: &QueryEnv, event: Result<serde_json::Value, Error>) -> Response {
    let root_type = match schema.env.registry.root_type(env.operation.node.ty) {
        Some(ty) => ty,
        None => {
            return Response::from_errors(vec![ServerError::new(
                "Schema is not configured for subscriptions.",
                Some(env.operation.pos),
            )])
        }
    };
    let ctx = env.create_context(&schema.env, root_type);

    let collected = match collect_fields(&ctx) {
        Ok(collected) if !collected.is_empty() => collected,
        Ok(_) => return Response::from_errors(vec![ServerError::new("Subscriptions must select exactly one top-level field", Some(env.operation.pos))]),
        Err(error) => return Response::from_errors(vec![error]),
    };
    let collected_field = &collected[0];
    let field_node = collected_field.nodes[0];
    let Some(meta_field) = root_type.field_by_name(field_node.node.name.node.as_str()) else {
        return Response::from_errors(vec![ServerError::new(
            format!("Unknown field \"{}\"", field_node.node.name.node),
            Some(field_node.node.name.pos),
        )]);
    };
    let ctx_field = ctx.with_field(field_node, meta_field);
    let response_key = Name::new(collected_field.response_key.node.as_str());

    let result: ServerResult<ConstValue> = async {
        let event = SubscriptionEvent::new(event.map_err(|err| err.into_server_error(field_node.pos))?);
        let args = coerce_arguments(&ctx_field)?;
        let raw = match &meta_field.resolver {
            // The event value is handed to the field's own resolver when one
            // is defined; otherwise it is the field value itself.
            Resolver::Function(resolver) => {
                let resolution = (resolver.as_ref())(ResolverContext {
                    ctx: &ctx_field,
                    parent_value: &event.value,
                    args: &args,
                })
                .map_err(|err| err.into_server_error(field_node.pos))?;
                extract_result(resolution)
                    .await
                    .map_err(|err| err.into_server_error(field_node.pos))?
            }
            Resolver::Parent => event.value,
        };
        complete_field_value(&ctx_field, raw, &collected_field.nodes).await
    }
    .await;

    match result {
        Ok(value) => {
            let mut data = IndexMap::new();
            data.insert(response_key, value);
            let mut response = Response::new(ConstValue::Object(data));
            response.errors = env.take_errors();
            response
        }
        Err(error) => {
            let error = ctx_field.set_error_path(error);
            let mut errors = env.take_errors();
            errors.push(env.extensions.map_exception(error));

            let data = if meta_field.ty.is_nullable() {
                let mut map = IndexMap::new();
                map.insert(response_key, ConstValue::Null);
                ConstValue::Object(map)
            } else {
                ConstValue::Null
            };

            Response {
                errors,
                did_execute: true,
                ..Response::new(data)
            }
        }
    }
}
