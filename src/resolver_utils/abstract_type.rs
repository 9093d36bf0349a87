//! Concrete-type selection for interface and union values.

use crate::{
    registry::{MetaType, ObjectType, Registry},
    Error,
};

/// Selects the concrete object type an interface/union value represents.
///
/// Strategies run in order, first match wins:
/// 1. the abstract type's `resolve_type` callback;
/// 2. exactly one possible type's `is_type_of` check accepting the value;
/// 3. a `__typename` string in the value naming a possible type;
/// 4. exactly one possible type whose required shape the value satisfies;
/// 5. the first possible type all of whose declared fields cover the value's
///    keys.
///
/// When every strategy fails the error lists each attempt's outcome.
pub(crate) fn resolve_abstract_type<'a>(
    registry: &'a Registry,
    abstract_type: &'a MetaType,
    value: &serde_json::Value,
) -> Result<&'a MetaType, Error> {
    let Some(possible_types) = abstract_type.possible_types() else {
        return Err(Error::new(format!(
            "Internal error: {} is not an abstract type",
            abstract_type.name()
        )));
    };

    let mut attempts: Vec<String> = Vec::new();

    if let Some(resolve_type) = abstract_type.resolve_type_fn() {
        match resolve_type(value, registry) {
            Some(name) if possible_types.contains(&name) => {
                return registry
                    .lookup_type(&name)
                    .ok_or_else(|| Error::new(format!("resolve_type returned unregistered type `{name}`")));
            }
            Some(name) => {
                return Err(Error::new(format!(
                    "resolve_type returned `{name}` which is not a possible type of `{}`",
                    abstract_type.name()
                )));
            }
            None => attempts.push("resolve_type returned no type".to_string()),
        }
    }

    let objects: Vec<&MetaType> = possible_types
        .iter()
        .filter_map(|name| registry.lookup_type(name))
        .collect();

    let matched: Vec<&MetaType> = objects
        .iter()
        .copied()
        .filter(|ty| {
            ty.object()
                .and_then(|object| object.is_type_of)
                .is_some_and(|is_type_of| is_type_of(value))
        })
        .collect();
    match matched.as_slice() {
        [single] => return Ok(single),
        [] => attempts.push("no is_type_of check accepted the value".to_string()),
        many => attempts.push(format!("{} is_type_of checks accepted the value", many.len())),
    }

    if let Some(type_name) = value.get("__typename").and_then(serde_json::Value::as_str) {
        if possible_types.contains(type_name) {
            if let Some(ty) = registry.lookup_type(type_name) {
                return Ok(ty);
            }
        }
        attempts.push(format!("__typename `{type_name}` is not a possible type"));
    } else {
        attempts.push("value carries no __typename".to_string());
    }

    let shaped: Vec<&MetaType> = objects
        .iter()
        .copied()
        .filter(|ty| ty.object().is_some_and(|object| shape_matches(object, value)))
        .collect();
    match shaped.as_slice() {
        [single] => return Ok(single),
        [] => attempts.push("no possible type matches the value's shape".to_string()),
        many => attempts.push(format!("{} possible types match the value's shape", many.len())),
    }

    if let Some(ty) = objects
        .iter()
        .copied()
        .find(|ty| ty.object().is_some_and(|object| keys_are_declared(object, value)))
    {
        return Ok(ty);
    }
    attempts.push("no possible type declares all of the value's keys".to_string());

    Err(Error::new(format!(
        "Could not determine the concrete type of `{}`: {}",
        abstract_type.name(),
        attempts.join("; ")
    )))
}

/// The value carries every non-nullable parent-resolved field of the type.
fn shape_matches(object: &ObjectType, value: &serde_json::Value) -> bool {
    let Some(map) = value.as_object() else {
        return false;
    };
    object
        .fields
        .values()
        .filter(|field| field.ty.is_non_null() && field.resolver.is_parent())
        .all(|field| map.contains_key(&field.name))
}

/// Every key present in the value is a declared field of the type.
fn keys_are_declared(object: &ObjectType, value: &serde_json::Value) -> bool {
    let Some(map) = value.as_object() else {
        return false;
    };
    map.keys()
        .filter(|key| *key != "__typename")
        .all(|key| object.fields.contains_key(key))
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;
    use crate::registry::{MetaField, UnionType};

    fn registry_with_union() -> Registry {
        let mut registry = Registry::new();
        registry.insert_type(ObjectType::new(
            "Dog",
            [MetaField::new("name", "String!"), MetaField::new("barkVolume", "Int!")],
        ));
        registry.insert_type(ObjectType::new(
            "Cat",
            [MetaField::new("name", "String!"), MetaField::new("lives", "Int!")],
        ));
        registry.insert_type(UnionType::new("Pet", ["Dog", "Cat"]));
        registry.add_builtin_scalars();
        registry
    }

    #[test]
    fn test_typename_discriminates() {
        let registry = registry_with_union();
        let pet = registry.lookup_type("Pet").unwrap();
        let value = json!({"__typename": "Cat", "name": "Mog", "lives": 9});
        assert_eq!(resolve_abstract_type(&registry, pet, &value).unwrap().name(), "Cat");
    }

    #[test]
    fn test_shape_discriminates_without_typename() {
        let registry = registry_with_union();
        let pet = registry.lookup_type("Pet").unwrap();
        let value = json!({"name": "Rex", "barkVolume": 11});
        assert_eq!(resolve_abstract_type(&registry, pet, &value).unwrap().name(), "Dog");
    }

    #[test]
    fn test_unresolvable_value_lists_attempts() {
        let registry = registry_with_union();
        let pet = registry.lookup_type("Pet").unwrap();
        let error = resolve_abstract_type(&registry, pet, &json!(42)).unwrap_err();
        assert!(error.message.contains("Could not determine the concrete type"));
        assert!(error.message.contains("__typename"));
    }

    #[test]
    fn test_resolve_type_takes_precedence() {
        let mut registry = registry_with_union();
        registry.insert_type(
            UnionType::new("Pet", ["Dog", "Cat"]).with_resolve_type(|_, _| Some("Dog".to_string())),
        );
        let pet = registry.lookup_type("Pet").unwrap();
        // Shape says Cat, resolve_type says Dog; resolve_type wins.
        let value = json!({"__typename": "Cat", "name": "Mog", "lives": 9});
        assert_eq!(resolve_abstract_type(&registry, pet, &value).unwrap().name(), "Dog");
    }
}
