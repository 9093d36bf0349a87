//! `__schema` / `__type` reflection.

use graphql_engine::{
    registry::{EnumType, FieldResolution, MetaEnumValue, MetaField, MetaInputValue, ObjectType, Resolver},
    Request, Schema,
};
use serde_json::json;

fn schema() -> Schema {
    Schema::build("Query", None, None)
        .register(EnumType::new(
            "Episode",
            [
                MetaEnumValue::new("NEWHOPE"),
                MetaEnumValue::new("EMPIRE"),
                MetaEnumValue::new("JEDI").with_deprecation(Some("prefer EMPIRE".to_string())),
            ],
        ))
        .register(ObjectType::new(
            "Droid",
            [
                MetaField::new("id", "ID!"),
                MetaField::new("name", "String!"),
                MetaField::new("friends", "[Droid!]"),
                MetaField::new("primaryFunction", "String").with_deprecation(None),
            ],
        ))
        .register(ObjectType::new(
            "Query",
            [MetaField::new("droid", "Droid")
                .with_arg(MetaInputValue::new("id", "ID!"))
                .with_resolver(Resolver::function(|_| Ok(FieldResolution::null())))],
        ))
        .finish()
        .unwrap()
}

#[tokio::test]
async fn test_schema_root_types() {
    let response = schema()
        .execute(Request::new("{ __schema { queryType { name kind } mutationType { name } } }"))
        .await;
    assert_eq!(
        serde_json::to_value(&response).unwrap(),
        json!({"data": {"__schema": {
            "queryType": {"name": "Query", "kind": "OBJECT"},
            "mutationType": null,
        }}})
    );
}

#[tokio::test]
async fn test_type_field_reflection() {
    let response = schema()
        .execute(Request::new(
            r#"{ __type(name: "Droid") { name kind fields { name type { kind name ofType { kind name } } } } }"#,
        ))
        .await;
    let data = serde_json::to_value(&response).unwrap()["data"].clone();
    assert_eq!(data["__type"]["name"], json!("Droid"));
    assert_eq!(data["__type"]["kind"], json!("OBJECT"));

    let fields = data["__type"]["fields"].as_array().unwrap();
    // Deprecated fields are hidden by default.
    let names: Vec<_> = fields.iter().map(|field| field["name"].as_str().unwrap()).collect();
    assert_eq!(names, vec!["id", "name", "friends"]);

    // id: ID! renders as NON_NULL wrapping ID.
    assert_eq!(fields[0]["type"]["kind"], json!("NON_NULL"));
    assert_eq!(fields[0]["type"]["ofType"]["name"], json!("ID"));

    // friends: [Droid!] renders as LIST wrapping NON_NULL.
    assert_eq!(fields[2]["type"]["kind"], json!("LIST"));
    assert_eq!(fields[2]["type"]["ofType"]["kind"], json!("NON_NULL"));
}

#[tokio::test]
async fn test_include_deprecated_fields() {
    let response = schema()
        .execute(Request::new(
            r#"{ __type(name: "Droid") { fields(includeDeprecated: true) { name isDeprecated } } }"#,
        ))
        .await;
    let data = serde_json::to_value(&response).unwrap()["data"].clone();
    let fields = data["__type"]["fields"].as_array().unwrap();
    assert_eq!(fields.len(), 4);
    assert_eq!(fields[3]["name"], json!("primaryFunction"));
    assert_eq!(fields[3]["isDeprecated"], json!(true));
}

#[tokio::test]
async fn test_enum_values_and_deprecation() {
    let query = r#"{ __type(name: "Episode") {
        kind
        enumValues { name }
        all: enumValues(includeDeprecated: true) { name deprecationReason }
    } }"#;
    let response = schema().execute(Request::new(query)).await;
    let data = serde_json::to_value(&response).unwrap()["data"].clone();
    assert_eq!(data["__type"]["kind"], json!("ENUM"));
    assert_eq!(data["__type"]["enumValues"].as_array().unwrap().len(), 2);
    let all = data["__type"]["all"].as_array().unwrap();
    assert_eq!(all.len(), 3);
    assert_eq!(all[2]["deprecationReason"], json!("prefer EMPIRE"));
}

#[tokio::test]
async fn test_field_arguments_reflect() {
    let response = schema()
        .execute(Request::new(
            r#"{ __type(name: "Query") { fields { name args { name type { kind ofType { name } } } } } }"#,
        ))
        .await;
    let data = serde_json::to_value(&response).unwrap()["data"].clone();
    let fields = data["__type"]["fields"].as_array().unwrap();
    let droid = fields.iter().find(|field| field["name"] == json!("droid")).unwrap();
    assert_eq!(droid["args"][0]["name"], json!("id"));
    assert_eq!(droid["args"][0]["type"]["kind"], json!("NON_NULL"));
    assert_eq!(droid["args"][0]["type"]["ofType"]["name"], json!("ID"));
}

#[tokio::test]
async fn test_schema_types_cover_the_reachable_closure() {
    let response = schema()
        .execute(Request::new("{ __schema { types { name } } }"))
        .await;
    let data = serde_json::to_value(&response).unwrap()["data"].clone();
    let names: Vec<_> = data["__schema"]["types"]
        .as_array()
        .unwrap()
        .iter()
        .map(|ty| ty["name"].as_str().unwrap().to_string())
        .collect();

    for expected in ["Query", "Droid", "Episode", "ID", "String", "Boolean", "__Schema", "__Type"] {
        assert!(names.contains(&expected.to_string()), "missing {expected}");
    }
    // Unreferenced built-ins stay out of the closure.
    assert!(!names.contains(&"DateTime".to_string()));
}

#[tokio::test]
async fn test_unknown_type_lookup_returns_null() {
    let response = schema()
        .execute(Request::new(r#"{ __type(name: "Starship") { name } }"#))
        .await;
    assert_eq!(
        serde_json::to_value(&response).unwrap(),
        json!({"data": {"__type": null}})
    );
}

#[tokio::test]
async fn test_directives_are_reflected() {
    let response = schema()
        .execute(Request::new("{ __schema { directives { name args { name } } } }"))
        .await;
    let data = serde_json::to_value(&response).unwrap()["data"].clone();
    let directives = data["__schema"]["directives"].as_array().unwrap();
    let names: Vec<_> = directives
        .iter()
        .map(|directive| directive["name"].as_str().unwrap())
        .collect();
    assert_eq!(names, vec!["deprecated", "include", "skip"]);
}

#[tokio::test]
async fn test_disabled_introspection_rejects_schema_field() {
    let schema = Schema::build("Query", None, None)
        .register(ObjectType::new(
            "Query",
            [MetaField::new("n", "Int").with_resolver(Resolver::function(|_| {
                Ok(FieldResolution::value(json!(1)))
            }))],
        ))
        .disable_introspection()
        .finish()
        .unwrap();

    let response = schema.execute(Request::new("{ __schema { queryType { name } } }")).await;
    let response = serde_json::to_value(&response).unwrap();
    assert_eq!(
        response["errors"][0]["message"],
        json!("Unauthorized for introspection.")
    );

    // Plain fields keep working.
    let response = schema.execute(Request::new("{ n }")).await;
    assert_eq!(serde_json::to_value(&response).unwrap(), json!({"data": {"n": 1}}));
}

#[tokio::test]
async fn test_introspection_is_idempotent_over_type_set() {
    let first = schema();
    let second = schema();
    let first: Vec<_> = first.registry().types.keys().cloned().collect();
    let second: Vec<_> = second.registry().types.keys().cloned().collect();
    assert_eq!(first, second);
}
