//! Extension middleware hooks.

use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use graphql_engine::{
    extensions::{NextExecuteField, NextRequest, NextResolve, ResolveInfo},
    registry::{FieldResolution, MetaField, ObjectType, Resolver},
    Extension, ExtensionContext, ExtensionFactory, Request, Response, Schema, ServerError,
};
use serde_json::json;

#[derive(Clone)]
struct Recorder {
    label: &'static str,
    log: Arc<Mutex<Vec<String>>>,
}

impl ExtensionFactory for Recorder {
    fn create(&self) -> Arc<dyn Extension> {
        Arc::new(self.clone())
    }
}

#[async_trait]
impl Extension for Recorder {
    async fn request(&self, ctx: &ExtensionContext<'_>, next: NextRequest<'_>) -> Response {
        self.log.lock().unwrap().push(format!("{}:request:start", self.label));
        let response = next.run(ctx).await;
        self.log.lock().unwrap().push(format!("{}:request:end", self.label));
        response
    }

    async fn resolve(
        &self,
        ctx: &ExtensionContext<'_>,
        info: &ResolveInfo<'_>,
        next: NextResolve<'_>,
    ) -> graphql_engine::ServerResult<graphql_engine::ResolvedValue> {
        self.log
            .lock()
            .unwrap()
            .push(format!("{}:resolve:{}", self.label, info.name));
        next.run(ctx, info).await
    }
}

fn schema_with<F: ExtensionFactory>(factory: F) -> Schema {
    Schema::build("Query", None, None)
        .register(ObjectType::new(
            "Query",
            [MetaField::new("value", "Int").with_resolver(Resolver::function(|_| {
                Ok(FieldResolution::value(json!(7)))
            }))],
        ))
        .extension(factory)
        .finish()
        .unwrap()
}

#[tokio::test]
async fn test_request_hook_wraps_the_whole_request() {
    let log = Arc::new(Mutex::new(Vec::new()));
    let schema = schema_with(Recorder {
        label: "a",
        log: log.clone(),
    });

    let response = schema.execute(Request::new("{ value }")).await;
    assert!(response.is_ok());
    assert_eq!(
        *log.lock().unwrap(),
        vec!["a:request:start", "a:resolve:value", "a:request:end"]
    );
}

#[tokio::test]
async fn test_extensions_compose_outermost_first() {
    let log = Arc::new(Mutex::new(Vec::new()));
    let schema = Schema::build("Query", None, None)
        .register(ObjectType::new(
            "Query",
            [MetaField::new("value", "Int").with_resolver(Resolver::function(|_| {
                Ok(FieldResolution::value(json!(7)))
            }))],
        ))
        .extension(Recorder {
            label: "a",
            log: log.clone(),
        })
        .extension(Recorder {
            label: "b",
            log: log.clone(),
        })
        .finish()
        .unwrap();

    schema.execute(Request::new("{ value }")).await;
    assert_eq!(
        *log.lock().unwrap(),
        vec![
            "a:request:start",
            "b:request:start",
            "a:resolve:value",
            "b:resolve:value",
            "b:request:end",
            "a:request:end",
        ]
    );
}

struct Redact;

impl ExtensionFactory for Redact {
    fn create(&self) -> Arc<dyn Extension> {
        Arc::new(Redact)
    }
}

#[async_trait]
impl Extension for Redact {
    fn map_exception(&self, mut error: ServerError) -> ServerError {
        error.message = "internal error".to_string();
        error
    }
}

#[tokio::test]
async fn test_map_exception_redacts_field_errors() {
    let schema = Schema::build("Query", None, None)
        .register(ObjectType::new(
            "Query",
            [MetaField::new("secret", "Int").with_resolver(Resolver::function(|_| {
                Err(graphql_engine::Error::new("password is hunter2"))
            }))],
        ))
        .extension(Redact)
        .finish()
        .unwrap();

    let response = schema.execute(Request::new("{ secret }")).await;
    let response = serde_json::to_value(&response).unwrap();
    assert_eq!(response["data"], json!({"secret": null}));
    assert_eq!(response["errors"][0]["message"], json!("internal error"));
}

struct Timing;

impl ExtensionFactory for Timing {
    fn create(&self) -> Arc<dyn Extension> {
        Arc::new(Timing)
    }
}

#[async_trait]
impl Extension for Timing {
    async fn execute_field(
        &self,
        ctx: &ExtensionContext<'_>,
        info: &ResolveInfo<'_>,
        next: NextExecuteField<'_>,
    ) -> graphql_engine::ServerResult<graphql_engine::Value> {
        let value = next.run(ctx, info).await?;
        // The completed value flows back through the hook untouched.
        assert_eq!(info.parent_type, "Query");
        Ok(value)
    }
}

#[tokio::test]
async fn test_execute_field_hook_sees_completed_values() {
    let schema = schema_with_timing();
    let response = schema.execute(Request::new("{ value }")).await;
    assert_eq!(
        serde_json::to_value(&response).unwrap(),
        json!({"data": {"value": 7}})
    );
}

fn schema_with_timing() -> Schema {
    Schema::build("Query", None, None)
        .register(ObjectType::new(
            "Query",
            [MetaField::new("value", "Int").with_resolver(Resolver::function(|_| {
                Ok(FieldResolution::value(json!(7)))
            }))],
        ))
        .extension(Timing)
        .finish()
        .unwrap()
}
