//! Document validation rules.

use graphql_engine::{
    registry::{FieldResolution, MetaField, ObjectType, Resolver},
    Request, Response, Schema, Value,
};
use serde_json::json;

fn schema() -> Schema {
    Schema::build("Query", None, None)
        .register(ObjectType::new(
            "Post",
            [MetaField::new("title", "String!"), MetaField::new("likes", "Int!")],
        ))
        .register(ObjectType::new(
            "Query",
            [MetaField::new("post", "Post").with_resolver(Resolver::function(|_| {
                Ok(FieldResolution::value(json!({"title": "hi", "likes": 1})))
            }))],
        ))
        .finish()
        .unwrap()
}

async fn run(query: &str) -> Response {
    schema().execute(Request::new(query)).await
}

fn rule_of(response: &Response, index: usize) -> Value {
    response.errors[index]
        .extensions
        .as_ref()
        .unwrap()
        .get("rule")
        .cloned()
        .unwrap()
}

#[tokio::test]
async fn test_unknown_field_is_rejected() {
    let response = run("{ post { title views } }").await;
    assert!(!response.did_execute);
    assert_eq!(response.errors[0].message, "Unknown field \"views\" on type \"Post\"");
    assert_eq!(rule_of(&response, 0), Value::String("FIELDS_ON_CORRECT_TYPE".into()));
    assert_eq!(response.errors[0].locations[0].line, 1);
}

#[tokio::test]
async fn test_scalar_leaf_with_selection_is_rejected() {
    let response = run("{ post { title { length } } }").await;
    assert!(!response.did_execute);
    assert!(response.errors[0].message.contains("must not have a selection"));
    assert_eq!(rule_of(&response, 0), Value::String("SCALAR_LEAFS".into()));
}

#[tokio::test]
async fn test_composite_field_without_selection_is_rejected() {
    let response = run("{ post }").await;
    assert!(!response.did_execute);
    assert!(response.errors[0].message.contains("must have a selection of subfields"));
}

#[tokio::test]
async fn test_unknown_type_in_fragment_condition() {
    let response = run("{ post { ...f } } fragment f on Article { title }").await;
    assert!(!response.did_execute);
    assert!(response
        .errors
        .iter()
        .any(|error| error.message == "Unknown type \"Article\""));
}

#[tokio::test]
async fn test_unknown_fragment_spread() {
    let response = run("{ post { ...missing } }").await;
    assert!(!response.did_execute);
    assert_eq!(response.errors[0].message, "Unknown fragment \"missing\"");
}

#[tokio::test]
async fn test_fragment_on_scalar_is_rejected() {
    let response = run("{ post { ...f } } fragment f on Int { x }").await;
    assert!(!response.did_execute);
    assert!(response
        .errors
        .iter()
        .any(|error| error.message.contains("cannot condition on non composite type")));
}

#[tokio::test]
async fn test_fragment_cycle_is_rejected() {
    let response = run(
        r#"
        { post { ...a } }
        fragment a on Post { title ...b }
        fragment b on Post { likes ...a }
        "#,
    )
    .await;
    assert!(!response.did_execute);
    assert!(response
        .errors
        .iter()
        .any(|error| error.message.contains("within itself")));
}

#[tokio::test]
async fn test_direct_fragment_cycle_is_rejected() {
    let response = run("{ post { ...a } } fragment a on Post { ...a }").await;
    assert!(!response.did_execute);
    assert!(response
        .errors
        .iter()
        .any(|error| error.message == "Cannot spread fragment \"a\" within itself"));
}

#[tokio::test]
async fn test_non_input_variable_type_is_rejected() {
    let response = run("query Q($p: Post!) { post { title } }").await;
    assert!(!response.did_execute);
    assert!(response
        .errors
        .iter()
        .any(|error| error.message.contains("cannot be of non-input type")));
}

#[tokio::test]
async fn test_validation_is_deterministic() {
    let first = run("{ post { title views extra } }").await;
    let second = run("{ post { title views extra } }").await;
    assert_eq!(first.errors, second.errors);
    assert_eq!(first.errors.len(), 2);
}

#[tokio::test]
async fn test_validation_errors_carry_code() {
    let response = run("{ nope }").await;
    let code = response.errors[0]
        .extensions
        .as_ref()
        .unwrap()
        .get("code")
        .cloned()
        .unwrap();
    assert_eq!(code, Value::String("GRAPHQL_VALIDATION_FAILED".into()));
}

#[tokio::test]
async fn test_typename_is_always_known() {
    let response = run("{ post { __typename title } }").await;
    assert!(response.is_ok());
    assert_eq!(
        serde_json::to_value(&response).unwrap()["data"]["post"]["__typename"],
        json!("Post")
    );
}

#[tokio::test]
async fn test_parse_error_shape() {
    let response = run("{ post { title ").await;
    assert!(!response.did_execute);
    assert_eq!(serde_json::to_value(&response).unwrap()["data"], json!(null));
    assert!(!response.errors.is_empty());
}
