//! Subscription streams: one response per source event.

use async_graphql_value::ConstValue;
use futures_util::StreamExt;
use graphql_engine::{
    registry::{FieldResolution, MetaField, MetaInputValue, ObjectType, Resolver, SourceEvents, Subscriber},
    Error, Request, Schema, SchemaError,
};
use serde_json::json;

fn tick_schema() -> Schema {
    Schema::build("Query", None, Some("Subscription"))
        .register(ObjectType::new(
            "Query",
            [MetaField::new("noop", "Int").with_resolver(Resolver::function(|_| {
                Ok(FieldResolution::value(json!(0)))
            }))],
        ))
        .register(ObjectType::new(
            "Subscription",
            [
                MetaField::new("tick", "Int").with_subscriber(Subscriber::new(|_| {
                    Ok(SourceEvents::Stream(
                        futures_util::stream::iter([Ok(json!(1)), Ok(json!(2)), Ok(json!(3))]).boxed(),
                    ))
                })),
                MetaField::new("flaky", "Int").with_subscriber(Subscriber::new(|_| {
                    Ok(SourceEvents::Stream(
                        futures_util::stream::iter([Ok(json!(1)), Err(Error::new("tick failed")), Ok(json!(3))])
                            .boxed(),
                    ))
                })),
                MetaField::new("upTo", "Int")
                    .with_arg(MetaInputValue::new("limit", "Int!"))
                    .with_subscriber(Subscriber::new(|rctx| {
                        let limit = match rctx.arg("limit") {
                            Some(ConstValue::Number(n)) => n.as_i64().unwrap(),
                            _ => 0,
                        };
                        Ok(SourceEvents::Stream(
                            futures_util::stream::iter((1..=limit).map(|n| Ok(json!(n)))).boxed(),
                        ))
                    })),
                MetaField::new("doubled", "Int")
                    .with_subscriber(Subscriber::new(|_| {
                        Ok(SourceEvents::Stream(
                            futures_util::stream::iter([Ok(json!(1)), Ok(json!(2))]).boxed(),
                        ))
                    }))
                    .with_resolver(Resolver::function(|rctx| {
                        let event = rctx.parent_value.data_resolved().as_i64().unwrap();
                        Ok(FieldResolution::value(json!(event * 2)))
                    })),
                MetaField::new("once", "Int").with_resolver(Resolver::function(|_| {
                    Ok(FieldResolution::value(json!(42)))
                })),
            ],
        ))
        .finish()
        .unwrap()
}

async fn collect(schema: &Schema, query: &str) -> Vec<serde_json::Value> {
    let mut stream = schema.execute_stream(Request::new(query));
    let mut responses = Vec::new();
    while let Some(response) = stream.next().await {
        responses.push(serde_json::to_value(&response).unwrap());
    }
    responses
}

#[tokio::test]
async fn test_events_map_to_responses_in_order() {
    let schema = tick_schema();
    let responses = collect(&schema, "subscription { tick }").await;
    assert_eq!(
        responses,
        vec![
            json!({"data": {"tick": 1}}),
            json!({"data": {"tick": 2}}),
            json!({"data": {"tick": 3}}),
        ]
    );
}

#[tokio::test]
async fn test_event_error_is_contained_and_stream_continues() {
    let schema = tick_schema();
    let responses = collect(&schema, "subscription { flaky }").await;
    assert_eq!(responses.len(), 3);
    assert_eq!(responses[0], json!({"data": {"flaky": 1}}));
    assert_eq!(responses[1]["data"], json!({"flaky": null}));
    assert_eq!(responses[1]["errors"][0]["message"], json!("tick failed"));
    assert_eq!(responses[2], json!({"data": {"flaky": 3}}));
}

#[tokio::test]
async fn test_subscription_arguments_are_coerced() {
    let schema = tick_schema();
    let responses = collect(&schema, "subscription { upTo(limit: 2) }").await;
    assert_eq!(
        responses,
        vec![json!({"data": {"upTo": 1}}), json!({"data": {"upTo": 2}})]
    );
}

#[tokio::test]
async fn test_field_resolver_maps_each_event() {
    let schema = tick_schema();
    let responses = collect(&schema, "subscription { doubled }").await;
    assert_eq!(
        responses,
        vec![json!({"data": {"doubled": 2}}), json!({"data": {"doubled": 4}})]
    );
}

#[tokio::test]
async fn test_resolver_fallback_yields_single_event() {
    let schema = tick_schema();
    let responses = collect(&schema, "subscription { once }").await;
    assert_eq!(responses, vec![json!({"data": {"once": 42}})]);
}

#[tokio::test]
async fn test_multiple_root_fields_are_rejected() {
    let schema = tick_schema();
    let responses = collect(&schema, "subscription { tick once }").await;
    assert_eq!(responses.len(), 1);
    assert_eq!(
        responses[0]["errors"][0]["message"],
        json!("Subscriptions must select exactly one top-level field")
    );
}

#[tokio::test]
async fn test_aliased_event_field() {
    let schema = tick_schema();
    let responses = collect(&schema, "subscription { first: tick }").await;
    assert_eq!(responses[0], json!({"data": {"first": 1}}));
}

#[tokio::test]
async fn test_subscription_via_execute_is_rejected() {
    let schema = tick_schema();
    let response = schema.execute(Request::new("subscription { tick }")).await;
    assert!(!response.did_execute);
    assert!(response.errors[0].message.contains("execute_stream"));
}

#[test]
fn test_subscription_field_without_source_is_rejected_at_build() {
    let error = Schema::build("Query", None, Some("Subscription"))
        .register(ObjectType::new("Query", [MetaField::new("noop", "Int")]))
        .register(ObjectType::new("Subscription", [MetaField::new("tick", "Int")]))
        .finish()
        .err()
        .unwrap();
    assert!(matches!(error, SchemaError::MissingSubscriber(field) if field == "tick"));
}

#[tokio::test]
async fn test_queries_still_run_through_execute_stream() {
    let schema = tick_schema();
    let responses = collect(&schema, "{ noop }").await;
    assert_eq!(responses, vec![json!({"data": {"noop": 0}})]);
}
