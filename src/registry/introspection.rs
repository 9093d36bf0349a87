//! Reflective `__schema` / `__type` support.
//!
//! The introspection types are ordinary registry entries whose fields reflect
//! over the registry at resolve time, so the regular execution pipeline
//! (collection, argument coercion, completion) drives them like any other
//! field.

use std::collections::BTreeSet;

use serde_json::json;

use super::{MetaField, MetaInputValue, MetaType, Registry, ResolverContext};
use crate::{
    registry::{type_names::TypeReference, EnumType, MetaEnumValue, MetaTypeName, ObjectType, Resolver},
    request::IntrospectionState,
    Error, FieldResolution,
};

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, strum_macros::Display)]
#[strum(serialize_all = "SCREAMING_SNAKE_CASE")]
#[allow(non_camel_case_types)]
pub enum __DirectiveLocation {
    Query,
    Mutation,
    Subscription,
    Field,
    FragmentDefinition,
    FragmentSpread,
    InlineFragment,
    VariableDefinition,
    Schema,
    Scalar,
    Object,
    FieldDefinition,
    ArgumentDefinition,
    Interface,
    Union,
    Enum,
    EnumValue,
    InputObject,
    InputFieldDefinition,
}

/// Registers the `__Schema`/`__Type`/... types and augments the query root
/// with the `__schema` and `__type` entry points. Idempotent.
pub(crate) fn add_introspection(registry: &mut Registry) {
    if registry.types.contains_key("__Schema") {
        return;
    }

    registry.insert_type(EnumType::new(
        "__TypeKind",
        [
            "SCALAR",
            "OBJECT",
            "INTERFACE",
            "UNION",
            "ENUM",
            "INPUT_OBJECT",
            "LIST",
            "NON_NULL",
        ]
        .map(MetaEnumValue::new),
    ));

    registry.insert_type(EnumType::new(
        "__DirectiveLocation",
        [
            "QUERY",
            "MUTATION",
            "SUBSCRIPTION",
            "FIELD",
            "FRAGMENT_DEFINITION",
            "FRAGMENT_SPREAD",
            "INLINE_FRAGMENT",
            "VARIABLE_DEFINITION",
            "SCHEMA",
            "SCALAR",
            "OBJECT",
            "FIELD_DEFINITION",
            "ARGUMENT_DEFINITION",
            "INTERFACE",
            "UNION",
            "ENUM",
            "ENUM_VALUE",
            "INPUT_OBJECT",
            "INPUT_FIELD_DEFINITION",
        ]
        .map(MetaEnumValue::new),
    ));

    registry.insert_type(
        ObjectType::new(
            "__Schema",
            [
                MetaField::new("description", "String"),
                MetaField::new("types", "[__Type!]!"),
                MetaField::new("queryType", "__Type!"),
                MetaField::new("mutationType", "__Type"),
                MetaField::new("subscriptionType", "__Type"),
                MetaField::new("directives", "[__Directive!]!"),
            ],
        )
        .with_description(
            "A GraphQL Schema defines the capabilities of a GraphQL server. It exposes all available types and \
             directives on the server, as well as the entry points for query, mutation, and subscription operations.",
        ),
    );

    registry.insert_type(ObjectType::new(
        "__Type",
        [
            MetaField::new("kind", "__TypeKind!"),
            MetaField::new("name", "String"),
            MetaField::new("description", "String"),
            MetaField::new("specifiedByURL", "String"),
            MetaField::new("fields", "[__Field!]")
                .with_arg(
                    MetaInputValue::new("includeDeprecated", "Boolean")
                        .with_default(async_graphql_value::ConstValue::Boolean(false)),
                )
                .with_resolver(Resolver::function(resolve_type_fields)),
            MetaField::new("interfaces", "[__Type!]").with_resolver(Resolver::function(resolve_type_interfaces)),
            MetaField::new("possibleTypes", "[__Type!]").with_resolver(Resolver::function(resolve_possible_types)),
            MetaField::new("enumValues", "[__EnumValue!]")
                .with_arg(
                    MetaInputValue::new("includeDeprecated", "Boolean")
                        .with_default(async_graphql_value::ConstValue::Boolean(false)),
                )
                .with_resolver(Resolver::function(resolve_enum_values)),
            MetaField::new("inputFields", "[__InputValue!]").with_resolver(Resolver::function(resolve_input_fields)),
            MetaField::new("ofType", "__Type"),
        ],
    ));

    registry.insert_type(ObjectType::new(
        "__Field",
        [
            MetaField::new("name", "String!"),
            MetaField::new("description", "String"),
            MetaField::new("args", "[__InputValue!]!"),
            MetaField::new("type", "__Type!"),
            MetaField::new("isDeprecated", "Boolean!"),
            MetaField::new("deprecationReason", "String"),
        ],
    ));

    registry.insert_type(ObjectType::new(
        "__InputValue",
        [
            MetaField::new("name", "String!"),
            MetaField::new("description", "String"),
            MetaField::new("type", "__Type!"),
            MetaField::new("defaultValue", "String"),
        ],
    ));

    registry.insert_type(ObjectType::new(
        "__EnumValue",
        [
            MetaField::new("name", "String!"),
            MetaField::new("description", "String"),
            MetaField::new("isDeprecated", "Boolean!"),
            MetaField::new("deprecationReason", "String"),
        ],
    ));

    registry.insert_type(ObjectType::new(
        "__Directive",
        [
            MetaField::new("name", "String!"),
            MetaField::new("description", "String"),
            MetaField::new("locations", "[__DirectiveLocation!]!"),
            MetaField::new("args", "[__InputValue!]!"),
            MetaField::new("isRepeatable", "Boolean!"),
        ],
    ));

    let query_type = registry.query_type.clone();
    if let Some(MetaType::Object(query_root)) = registry.types.get_mut(&query_type) {
        query_root.insert_field(
            MetaField::new("__schema", "__Schema!")
                .with_description("Access the current type schema of this server.")
                .with_resolver(Resolver::function(resolve_schema_field)),
        );
        query_root.insert_field(
            MetaField::new("__type", "__Type")
                .with_description("Request the type information of a single type.")
                .with_arg(MetaInputValue::new("name", "String!"))
                .with_resolver(Resolver::function(resolve_type_field)),
        );
    }
}

fn introspection_allowed(rctx: &ResolverContext<'_>) -> Result<(), Error> {
    let enabled = match rctx.ctx.query_env.introspection_state {
        IntrospectionState::ForceEnabled => true,
        IntrospectionState::ForceDisabled => false,
        IntrospectionState::UserPreference => !rctx.ctx.schema_env.registry.disable_introspection,
    };
    if enabled {
        Ok(())
    } else {
        Err(Error::new("Unauthorized for introspection."))
    }
}

fn resolve_schema_field(rctx: ResolverContext<'_>) -> Result<FieldResolution, Error> {
    introspection_allowed(&rctx)?;
    let registry = &rctx.ctx.schema_env.registry;

    let types = reachable_type_names(registry)
        .into_iter()
        .filter_map(|name| registry.lookup_type(&name))
        .map(named_type_ref)
        .collect::<Vec<_>>();

    let mut directives = registry.directives.values().collect::<Vec<_>>();
    directives.sort_by(|a, b| a.name.cmp(&b.name));
    let directives = directives
        .into_iter()
        .map(|directive| {
            json!({
                "name": directive.name,
                "description": directive.description,
                "locations": directive.locations.iter().map(|location| location.to_string()).collect::<Vec<_>>(),
                "args": directive.args.values().map(|arg| input_value_json(registry, arg)).collect::<Vec<_>>(),
                "isRepeatable": directive.is_repeatable,
            })
        })
        .collect::<Vec<_>>();

    Ok(FieldResolution::value(json!({
        "description": serde_json::Value::Null,
        "types": types,
        "queryType": registry.lookup_type(&registry.query_type).map(named_type_ref),
        "mutationType": registry
            .mutation_type
            .as_deref()
            .and_then(|name| registry.lookup_type(name))
            .map(named_type_ref),
        "subscriptionType": registry
            .subscription_type
            .as_deref()
            .and_then(|name| registry.lookup_type(name))
            .map(named_type_ref),
        "directives": directives,
    })))
}

fn resolve_type_field(rctx: ResolverContext<'_>) -> Result<FieldResolution, Error> {
    introspection_allowed(&rctx)?;
    let registry = &rctx.ctx.schema_env.registry;

    let name = match rctx.arg("name") {
        Some(async_graphql_value::ConstValue::String(name)) => name.clone(),
        _ => return Err(Error::new("__type requires a `name` argument")),
    };

    Ok(match registry.lookup_type(&name) {
        Some(ty) => FieldResolution::value(named_type_ref(ty)),
        None => FieldResolution::null(),
    })
}

/// `__Type.fields`, computed from the registry so the selection can descend
/// through cyclic type references without the reflection data being infinite.
fn resolve_type_fields(rctx: ResolverContext<'_>) -> Result<FieldResolution, Error> {
    let registry = &rctx.ctx.schema_env.registry;
    let include_deprecated = include_deprecated(&rctx);

    let Some(ty) = parent_named_type(&rctx, registry) else {
        return Ok(FieldResolution::null());
    };
    let Some(fields) = ty.fields() else {
        return Ok(FieldResolution::null());
    };

    let fields = fields
        .values()
        .filter(|field| !field.name.starts_with("__"))
        .filter(|field| include_deprecated || !field.deprecation.is_deprecated())
        .map(|field| field_json(registry, field))
        .collect::<Vec<_>>();

    Ok(FieldResolution::value(serde_json::Value::Array(fields)))
}

fn resolve_type_interfaces(rctx: ResolverContext<'_>) -> Result<FieldResolution, Error> {
    let registry = &rctx.ctx.schema_env.registry;
    match parent_named_type(&rctx, registry) {
        Some(MetaType::Object(object)) => {
            let interfaces = object
                .implements
                .iter()
                .filter_map(|name| registry.lookup_type(name))
                .map(named_type_ref)
                .collect::<Vec<_>>();
            Ok(FieldResolution::value(serde_json::Value::Array(interfaces)))
        }
        Some(MetaType::Interface(_)) => Ok(FieldResolution::value(json!([]))),
        _ => Ok(FieldResolution::null()),
    }
}

fn resolve_possible_types(rctx: ResolverContext<'_>) -> Result<FieldResolution, Error> {
    let registry = &rctx.ctx.schema_env.registry;
    match parent_named_type(&rctx, registry).and_then(MetaType::possible_types) {
        Some(possible_types) => {
            let types = possible_types
                .iter()
                .filter_map(|name| registry.lookup_type(name))
                .map(named_type_ref)
                .collect::<Vec<_>>();
            Ok(FieldResolution::value(serde_json::Value::Array(types)))
        }
        None => Ok(FieldResolution::null()),
    }
}

fn resolve_enum_values(rctx: ResolverContext<'_>) -> Result<FieldResolution, Error> {
    let registry = &rctx.ctx.schema_env.registry;
    let include_deprecated = include_deprecated(&rctx);

    match parent_named_type(&rctx, registry) {
        Some(MetaType::Enum(enum_type)) => {
            let values = enum_type
                .enum_values
                .values()
                .filter(|value| include_deprecated || !value.deprecation.is_deprecated())
                .map(|value| {
                    json!({
                        "name": value.name,
                        "description": value.description,
                        "isDeprecated": value.deprecation.is_deprecated(),
                        "deprecationReason": value.deprecation.reason(),
                    })
                })
                .collect::<Vec<_>>();
            Ok(FieldResolution::value(serde_json::Value::Array(values)))
        }
        _ => Ok(FieldResolution::null()),
    }
}

fn resolve_input_fields(rctx: ResolverContext<'_>) -> Result<FieldResolution, Error> {
    let registry = &rctx.ctx.schema_env.registry;
    match parent_named_type(&rctx, registry) {
        Some(MetaType::InputObject(input_object)) => {
            let fields = input_object
                .input_fields
                .values()
                .map(|input| input_value_json(registry, input))
                .collect::<Vec<_>>();
            Ok(FieldResolution::value(serde_json::Value::Array(fields)))
        }
        _ => Ok(FieldResolution::null()),
    }
}

fn include_deprecated(rctx: &ResolverContext<'_>) -> bool {
    matches!(
        rctx.arg("includeDeprecated"),
        Some(async_graphql_value::ConstValue::Boolean(true))
    )
}

fn parent_named_type<'a>(rctx: &ResolverContext<'_>, registry: &'a Registry) -> Option<&'a MetaType> {
    let name = rctx.parent_value.data_resolved().get("name")?.as_str()?;
    registry.lookup_type(name)
}

/// A reference to a named type: enough for `kind`/`name`/`description`, with
/// the structural fields re-derived from the registry on demand.
fn named_type_ref(ty: &MetaType) -> serde_json::Value {
    let mut reference = json!({
        "kind": ty.kind().introspection_name(),
        "name": ty.name(),
        "description": ty.description(),
        "ofType": serde_json::Value::Null,
    });
    if let MetaType::Scalar(scalar) = ty {
        reference["specifiedByURL"] = json!(scalar.specified_by_url);
    }
    reference
}

/// Expands a wrapped type string into the `LIST`/`NON_NULL` `ofType` chain.
fn type_ref(registry: &Registry, ty: &str) -> serde_json::Value {
    match MetaTypeName::create(ty) {
        MetaTypeName::NonNull(inner) => json!({
            "kind": "NON_NULL",
            "name": serde_json::Value::Null,
            "ofType": type_ref(registry, inner),
        }),
        MetaTypeName::List(inner) => json!({
            "kind": "LIST",
            "name": serde_json::Value::Null,
            "ofType": type_ref(registry, inner),
        }),
        MetaTypeName::Named(name) => registry
            .lookup_type(name)
            .map(named_type_ref)
            .unwrap_or(serde_json::Value::Null),
    }
}

fn field_json(registry: &Registry, field: &MetaField) -> serde_json::Value {
    json!({
        "name": field.name,
        "description": field.description,
        "args": field.args.values().map(|arg| input_value_json(registry, arg)).collect::<Vec<_>>(),
        "type": type_ref(registry, field.ty.as_str()),
        "isDeprecated": field.deprecation.is_deprecated(),
        "deprecationReason": field.deprecation.reason(),
    })
}

fn input_value_json(registry: &Registry, input: &MetaInputValue) -> serde_json::Value {
    json!({
        "name": input.name,
        "description": input.description,
        "type": type_ref(registry, input.ty.as_str()),
        "defaultValue": input.default_value.as_ref().map(ToString::to_string),
    })
}

/// The closure of types reachable from the operation roots and the directive
/// declarations, terminating on revisit.
pub(crate) fn reachable_type_names(registry: &Registry) -> BTreeSet<String> {
    let mut seen = BTreeSet::new();
    let mut stack: Vec<String> = Vec::new();

    stack.push(registry.query_type.clone());
    stack.extend(registry.mutation_type.clone());
    stack.extend(registry.subscription_type.clone());
    for directive in registry.directives.values() {
        stack.extend(
            directive
                .args
                .values()
                .map(|arg| arg.ty.named_type().as_str().to_string()),
        );
    }

    while let Some(name) = stack.pop() {
        if !seen.insert(name.clone()) {
            continue;
        }
        let Some(ty) = registry.lookup_type(&name) else {
            continue;
        };
        if let Some(fields) = ty.fields() {
            for field in fields.values() {
                stack.push(field.ty.named_type().as_str().to_string());
                stack.extend(field.args.values().map(|arg| arg.ty.named_type().as_str().to_string()));
            }
        }
        match ty {
            MetaType::Object(object) => stack.extend(object.implements.iter().cloned()),
            MetaType::Interface(interface) => stack.extend(interface.possible_types.iter().cloned()),
            MetaType::Union(union) => stack.extend(union.possible_types.iter().cloned()),
            MetaType::InputObject(input_object) => stack.extend(
                input_object
                    .input_fields
                    .values()
                    .map(|input| input.ty.named_type().as_str().to_string()),
            ),
            _ => {}
        }
    }

    seen
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_reachable_type_closure_terminates_on_cycles() {
        let mut registry = Registry::new();
        registry.insert_type(ObjectType::new(
            "Query",
            [MetaField::new("node", "Node")],
        ));
        // Node refers back to itself through `parent`.
        registry.insert_type(ObjectType::new(
            "Node",
            [MetaField::new("parent", "Node"), MetaField::new("id", "ID!")],
        ));
        registry.add_builtin_scalars();

        let reachable = reachable_type_names(&registry);
        assert!(reachable.contains("Query"));
        assert!(reachable.contains("Node"));
        assert!(reachable.contains("ID"));
        // Unreferenced scalars are not part of the closure.
        assert!(!reachable.contains("Date"));
    }

    #[test]
    fn test_type_ref_wrapping_chain() {
        let mut registry = Registry::new();
        registry.add_builtin_scalars();
        let reference = type_ref(&registry, "[Int!]!");
        assert_eq!(reference["kind"], "NON_NULL");
        assert_eq!(reference["ofType"]["kind"], "LIST");
        assert_eq!(reference["ofType"]["ofType"]["kind"], "NON_NULL");
        assert_eq!(reference["ofType"]["ofType"]["ofType"]["name"], "Int");
    }
}
