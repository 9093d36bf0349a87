//! End-to-end execution over a small film schema.

use std::sync::{Arc, Mutex};

use async_graphql_value::ConstValue;
use graphql_engine::{
    registry::{
        EnumType, FieldResolution, InterfaceType, MetaEnumValue, MetaField, MetaInputValue, ObjectType, Resolver,
        UnionType,
    },
    Request, Schema, Variables,
};
use serde_json::json;

fn hero_schema() -> Schema {
    Schema::build("Query", None, None)
        .register(EnumType::new(
            "Episode",
            [
                MetaEnumValue::new("NEWHOPE"),
                MetaEnumValue::new("EMPIRE"),
                MetaEnumValue::new("JEDI"),
            ],
        ))
        .register(InterfaceType::new(
            "Character",
            [MetaField::new("name", "String!"), MetaField::new("id", "ID!")],
        ))
        .register(
            ObjectType::new(
                "Human",
                [
                    MetaField::new("name", "String!"),
                    MetaField::new("id", "ID!"),
                    MetaField::new("homePlanet", "String"),
                ],
            )
            .implement("Character"),
        )
        .register(
            ObjectType::new(
                "Droid",
                [
                    MetaField::new("name", "String!"),
                    MetaField::new("id", "ID!"),
                    MetaField::new("primaryFunction", "String"),
                ],
            )
            .implement("Character"),
        )
        .register(ObjectType::new(
            "Query",
            [
                MetaField::new("hero", "Character")
                    .with_arg(MetaInputValue::new("episode", "Episode"))
                    .with_resolver(Resolver::function(|rctx| {
                        let episode = match rctx.arg("episode") {
                            Some(ConstValue::Enum(name)) => name.as_str().to_string(),
                            _ => "NEWHOPE".to_string(),
                        };
                        let hero = match episode.as_str() {
                            "EMPIRE" => json!({"__typename": "Human", "id": "1000", "name": "Luke"}),
                            _ => json!({"__typename": "Droid", "id": "2001", "name": "R2-D2", "primaryFunction": "Astromech"}),
                        };
                        Ok(FieldResolution::value(hero))
                    })),
                MetaField::new("humans", "[Human!]!").with_resolver(Resolver::function(|_| {
                    Ok(FieldResolution::value(json!([
                        {"id": "1000", "name": "Luke", "homePlanet": "Tatooine"},
                        {"id": "1001", "name": "Leia", "homePlanet": "Alderaan"},
                    ])))
                })),
            ],
        ))
        .finish()
        .unwrap()
}

#[tokio::test]
async fn test_typename_on_query_root() {
    let schema = hero_schema();
    let response = schema.execute(Request::new("{ __typename }")).await;
    assert_eq!(
        serde_json::to_value(&response).unwrap(),
        json!({"data": {"__typename": "Query"}})
    );
}

#[tokio::test]
async fn test_enum_argument_selects_hero() {
    let schema = hero_schema();
    let response = schema
        .execute(Request::new("{ hero(episode: EMPIRE) { name } }"))
        .await;
    assert_eq!(
        serde_json::to_value(&response).unwrap(),
        json!({"data": {"hero": {"name": "Luke"}}})
    );
}

#[tokio::test]
async fn test_interface_resolution_by_typename() {
    let schema = hero_schema();
    let response = schema
        .execute(Request::new(
            "{ hero { __typename name ... on Droid { primaryFunction } } }",
        ))
        .await;
    assert_eq!(
        serde_json::to_value(&response).unwrap(),
        json!({"data": {"hero": {
            "__typename": "Droid",
            "name": "R2-D2",
            "primaryFunction": "Astromech",
        }}})
    );
}

#[tokio::test]
async fn test_non_null_field_error_propagates_to_root() {
    let schema = Schema::build("Query", None, None)
        .register(ObjectType::new(
            "Query",
            [MetaField::new("name", "String!").with_resolver(Resolver::function(|_| {
                Err(graphql_engine::Error::new("boom"))
            }))],
        ))
        .finish()
        .unwrap();

    let response = schema.execute(Request::new("{ name }")).await;
    assert!(response.did_execute);
    let response = serde_json::to_value(&response).unwrap();
    assert_eq!(response["data"], json!(null));
    assert_eq!(response["errors"][0]["message"], json!("boom"));
    assert_eq!(response["errors"][0]["path"], json!(["name"]));
}

#[tokio::test]
async fn test_nullable_field_error_becomes_null() {
    let schema = Schema::build("Query", None, None)
        .register(ObjectType::new(
            "Query",
            [
                MetaField::new("bad", "String").with_resolver(Resolver::function(|_| {
                    Err(graphql_engine::Error::new("boom"))
                })),
                MetaField::new("good", "String").with_resolver(Resolver::function(|_| {
                    Ok(FieldResolution::value(json!("fine")))
                })),
            ],
        ))
        .finish()
        .unwrap();

    let response = schema.execute(Request::new("{ bad good }")).await;
    let response = serde_json::to_value(&response).unwrap();
    assert_eq!(response["data"], json!({"bad": null, "good": "fine"}));
    assert_eq!(response["errors"][0]["path"], json!(["bad"]));
}

#[tokio::test]
async fn test_skip_directive_with_variable() {
    let schema = hero_schema();
    let request = Request::new("query Hero($s: Boolean!) { hero { name @skip(if: $s) id } }")
        .variables(serde_json::from_value::<Variables>(json!({"s": true})).unwrap());
    let response = schema.execute(request).await;
    assert_eq!(
        serde_json::to_value(&response).unwrap(),
        json!({"data": {"hero": {"id": "2001"}}})
    );
}

#[tokio::test]
async fn test_include_directive_false_omits_field() {
    let schema = hero_schema();
    let response = schema
        .execute(Request::new("{ hero { name @include(if: false) id } }"))
        .await;
    assert_eq!(
        serde_json::to_value(&response).unwrap(),
        json!({"data": {"hero": {"id": "2001"}}})
    );
}

fn mutation_log_schema(log: Arc<Mutex<Vec<i64>>>) -> Schema {
    let query_log = log.clone();
    Schema::build("Query", Some("Mutation"), None)
        .register(ObjectType::new(
            "Query",
            [MetaField::new("m", "Int!")
                .with_arg(MetaInputValue::new("x", "Int!"))
                .with_resolver(Resolver::function(move |rctx| {
                    let x = match rctx.arg("x") {
                        Some(ConstValue::Number(n)) => n.as_i64().unwrap(),
                        _ => unreachable!(),
                    };
                    query_log.lock().unwrap().push(x);
                    Ok(FieldResolution::value(json!(x)))
                }))],
        ))
        .register(ObjectType::new(
            "Mutation",
            [MetaField::new("m", "Int!")
                .with_arg(MetaInputValue::new("x", "Int!"))
                .with_resolver(Resolver::function(move |rctx| {
                    let x = match rctx.arg("x") {
                        Some(ConstValue::Number(n)) => n.as_i64().unwrap(),
                        _ => unreachable!(),
                    };
                    let log = log.clone();
                    // Defer so serial execution is what enforces the ordering,
                    // not resolver synchronicity.
                    Ok(FieldResolution::future(async move {
                        log.lock().unwrap().push(x);
                        Ok(json!(x))
                    }))
                }))],
        ))
        .finish()
        .unwrap()
}

#[tokio::test]
async fn test_mutation_roots_execute_serially() {
    let log = Arc::new(Mutex::new(Vec::new()));
    let schema = mutation_log_schema(log.clone());

    let response = schema
        .execute(Request::new("mutation { a: m(x: 1) b: m(x: 2) }"))
        .await;
    assert_eq!(
        serde_json::to_value(&response).unwrap(),
        json!({"data": {"a": 1, "b": 2}})
    );
    assert_eq!(*log.lock().unwrap(), vec![1, 2]);
}

#[tokio::test]
async fn test_query_fields_keep_response_order() {
    let log = Arc::new(Mutex::new(Vec::new()));
    let schema = mutation_log_schema(log.clone());

    let response = schema.execute(Request::new("{ b: m(x: 2) a: m(x: 1) }")).await;
    let response = serde_json::to_value(&response).unwrap();
    // Response keys follow collection order regardless of completion order.
    assert_eq!(response["data"], json!({"b": 2, "a": 1}));
    let mut seen = log.lock().unwrap().clone();
    seen.sort_unstable();
    assert_eq!(seen, vec![1, 2]);
}

#[tokio::test]
async fn test_list_of_objects_completes_in_order() {
    let schema = hero_schema();
    let response = schema.execute(Request::new("{ humans { name } }")).await;
    assert_eq!(
        serde_json::to_value(&response).unwrap(),
        json!({"data": {"humans": [{"name": "Luke"}, {"name": "Leia"}]}})
    );
}

#[tokio::test]
async fn test_nullable_list_item_error_keeps_siblings() {
    let schema = Schema::build("Query", None, None)
        .register(ObjectType::new(
            "Query",
            [MetaField::new("numbers", "[Int]").with_resolver(Resolver::function(|_| {
                Ok(FieldResolution::value(json!([1, "two", 3])))
            }))],
        ))
        .finish()
        .unwrap();

    let response = schema.execute(Request::new("{ numbers }")).await;
    let response = serde_json::to_value(&response).unwrap();
    assert_eq!(response["data"], json!({"numbers": [1, null, 3]}));
    assert_eq!(response["errors"][0]["path"], json!(["numbers", 1]));
}

#[tokio::test]
async fn test_non_null_list_item_error_nulls_the_list() {
    let schema = Schema::build("Query", None, None)
        .register(ObjectType::new(
            "Query",
            [MetaField::new("numbers", "[Int!]").with_resolver(Resolver::function(|_| {
                Ok(FieldResolution::value(json!([1, null, 3])))
            }))],
        ))
        .finish()
        .unwrap();

    let response = schema.execute(Request::new("{ numbers }")).await;
    let response = serde_json::to_value(&response).unwrap();
    assert_eq!(response["data"], json!({"numbers": null}));
    assert_eq!(response["errors"][0]["path"], json!(["numbers", 1]));
}

#[tokio::test]
async fn test_fragment_spreads_merge_fields() {
    let schema = hero_schema();
    let response = schema
        .execute(Request::new(
            r#"
            { hero { ...Names ...Ids } }
            fragment Names on Character { name }
            fragment Ids on Character { id }
            "#,
        ))
        .await;
    assert_eq!(
        serde_json::to_value(&response).unwrap(),
        json!({"data": {"hero": {"name": "R2-D2", "id": "2001"}}})
    );
}

#[tokio::test]
async fn test_cyclic_fragments_terminate_when_validation_is_off() {
    let schema = Schema::build("Query", None, None)
        .register(ObjectType::new(
            "Query",
            [MetaField::new("n", "Int").with_resolver(Resolver::function(|_| {
                Ok(FieldResolution::value(json!(1)))
            }))],
        ))
        .disable_validation()
        .finish()
        .unwrap();

    // The visited set makes collection finite even on a spread cycle.
    let response = schema
        .execute(Request::new(
            r#"
            { ...A }
            fragment A on Query { n ...B }
            fragment B on Query { ...A }
            "#,
        ))
        .await;
    assert_eq!(
        serde_json::to_value(&response).unwrap(),
        json!({"data": {"n": 1}})
    );
}

#[tokio::test]
async fn test_parent_map_resolution_from_root_value() {
    let schema = Schema::build("Query", None, None)
        .register(ObjectType::new(
            "Query",
            [MetaField::new("greeting", "String!"), MetaField::new("count", "Int")],
        ))
        .finish()
        .unwrap();

    let request = Request::new("{ greeting count }").root_value(json!({"greeting": "hi", "count": 3}));
    let response = schema.execute(request).await;
    assert_eq!(
        serde_json::to_value(&response).unwrap(),
        json!({"data": {"greeting": "hi", "count": 3}})
    );
}

#[tokio::test]
async fn test_default_resolver_fallback() {
    let schema = Schema::build("Query", None, None)
        .register(ObjectType::new("Query", [MetaField::new("anything", "String")]))
        .default_resolver(|rctx| {
            Ok(FieldResolution::value(json!(format!(
                "default:{}",
                rctx.ctx.field.name
            ))))
        })
        .finish()
        .unwrap();

    let response = schema.execute(Request::new("{ anything }")).await;
    assert_eq!(
        serde_json::to_value(&response).unwrap(),
        json!({"data": {"anything": "default:anything"}})
    );
}

#[tokio::test]
async fn test_union_resolution_by_shape() {
    let schema = Schema::build("Query", None, None)
        .register(ObjectType::new(
            "Dog",
            [MetaField::new("name", "String!"), MetaField::new("barkVolume", "Int!")],
        ))
        .register(ObjectType::new(
            "Cat",
            [MetaField::new("name", "String!"), MetaField::new("lives", "Int!")],
        ))
        .register(UnionType::new("Pet", ["Dog", "Cat"]))
        .register(ObjectType::new(
            "Query",
            [MetaField::new("pet", "Pet").with_resolver(Resolver::function(|_| {
                Ok(FieldResolution::value(json!({"name": "Rex", "barkVolume": 11})))
            }))],
        ))
        .finish()
        .unwrap();

    let response = schema
        .execute(Request::new("{ pet { __typename ... on Dog { barkVolume } } }"))
        .await;
    assert_eq!(
        serde_json::to_value(&response).unwrap(),
        json!({"data": {"pet": {"__typename": "Dog", "barkVolume": 11}}})
    );
}

#[tokio::test]
async fn test_operation_selection_errors() {
    let schema = hero_schema();

    let response = schema
        .execute(Request::new("query A { __typename } query B { __typename }"))
        .await;
    assert!(!response.did_execute);
    assert_eq!(response.errors[0].message, "Operation name required in request");

    let response = schema
        .execute(Request::new("query A { __typename }").with_operation_name("Missing"))
        .await;
    assert!(!response.did_execute);
    assert_eq!(response.errors[0].message, "Unknown operation named \"Missing\"");

    let response = schema
        .execute(Request::new("query A { __typename } query B { hero { name } }").with_operation_name("B"))
        .await;
    assert!(response.did_execute);
    assert!(response.is_ok());
}
