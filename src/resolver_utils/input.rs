//! Input coercion: turning literal/variable values into typed runtime values.
//!
//! Variables and arguments share this path.

use std::borrow::{Borrow, Cow};

use async_graphql_parser::Pos;
use async_graphql_value::{ConstValue, Name};
use indexmap::IndexMap;

use crate::{
    registry::{
        scalars::PossibleScalar, EnumType, MetaInputValue, MetaType, MetaTypeName, Registry, ScalarParser, ScalarType,
    },
    Error, ServerResult,
};

/// Coerces one input value (argument, variable or defaulted input field)
/// against its declared type.
///
/// `Ok(None)` means the value is absent and may legally stay absent; missing
/// values against non-null types error here.
pub fn resolve_input(
    registry: &Registry,
    error_pos: Pos,
    arg_name: &str,
    meta_input_value: &MetaInputValue,
    value: Option<ConstValue>,
) -> ServerResult<Option<ConstValue>> {
    let ty = meta_input_value.ty.to_string();
    resolve_maybe_absent_input(
        ResolveContext {
            registry,
            path: PathNode::new(arg_name),
            ty: Cow::Owned(ty),
            allow_list_coercion: true,
            default_value: meta_input_value.default_value.as_ref(),
        },
        value,
    )
    .map_err(|err| err.into_server_error(error_pos))
}

#[derive(Clone, Copy)]
struct PathNode<'a> {
    name: &'a str,
    previous: Option<&'a PathNode<'a>>,
}

impl<'a> PathNode<'a> {
    fn new(name: &'a str) -> PathNode<'a> {
        PathNode { name, previous: None }
    }

    fn with(&'a self, name: &'a str) -> PathNode<'a> {
        PathNode {
            name,
            previous: Some(self),
        }
    }

    #[allow(clippy::wrong_self_convention)]
    fn into_vec(&self) -> Vec<String> {
        let mut previous = self.previous.map(PathNode::into_vec).unwrap_or_default();
        previous.push(self.name.to_string());
        previous
    }
}

#[derive(Clone)]
struct ResolveContext<'a> {
    registry: &'a Registry,
    path: PathNode<'a>,
    /// Expected GraphQL type.
    ty: Cow<'a, str>,
    /// Whether single values may coerce into one-element lists at this point:
    /// https://spec.graphql.org/October2021/#sec-List.Input-Coercion
    allow_list_coercion: bool,
    default_value: Option<&'a ConstValue>,
}

impl<'a> ResolveContext<'a> {
    fn with_input(&'a self, path: &'a str, input: &'a MetaInputValue) -> ResolveContext<'a> {
        ResolveContext {
            registry: self.registry,
            path: self.path.with(path),
            ty: Cow::Borrowed(input.ty.as_str()),
            allow_list_coercion: true,
            default_value: input.default_value.as_ref(),
        }
    }

    fn input_error(self, expected: &str) -> Error {
        Error::new(format!("{expected} for {}", self.path.into_vec().join(".")))
    }
}

fn resolve_maybe_absent_input(
    rctx: ResolveContext<'_>,
    value: Option<ConstValue>,
) -> Result<Option<ConstValue>, Error> {
    match value.or_else(|| rctx.default_value.cloned()) {
        Some(value) => resolve_present_input(rctx, value).map(Some),
        None => matches!(MetaTypeName::create(rctx.ty.borrow()), MetaTypeName::NonNull(_))
            .then_some(Err(rctx.input_error("Unexpected null value")))
            .transpose(),
    }
}

fn resolve_present_input(rctx: ResolveContext<'_>, value: ConstValue) -> Result<ConstValue, Error> {
    match MetaTypeName::create(rctx.ty.borrow()) {
        MetaTypeName::NonNull(type_name) => {
            if matches!(value, ConstValue::Null) {
                return Err(rctx.input_error("Unexpected null value"));
            }
            resolve_present_input(
                ResolveContext {
                    ty: Cow::Borrowed(type_name),
                    ..rctx
                },
                value,
            )
        }
        MetaTypeName::List(type_name) => {
            if matches!(value, ConstValue::Null) {
                return Ok(value);
            }
            if let ConstValue::List(list) = value {
                let rctx = ResolveContext {
                    ty: Cow::Borrowed(type_name),
                    allow_list_coercion: list.len() <= 1,
                    default_value: None,
                    ..rctx
                };
                let mut arr = Vec::new();
                for (idx, element) in list.into_iter().enumerate() {
                    let path = idx.to_string();
                    let rctx = ResolveContext {
                        path: rctx.path.with(&path),
                        ..rctx.clone()
                    };
                    arr.push(resolve_present_input(rctx, element)?);
                }
                Ok(ConstValue::List(arr))
            } else if rctx.allow_list_coercion {
                Ok(ConstValue::List(vec![resolve_present_input(
                    ResolveContext {
                        ty: Cow::Borrowed(type_name),
                        allow_list_coercion: true,
                        default_value: None,
                        ..rctx
                    },
                    value,
                )?]))
            } else {
                Err(rctx.input_error("Expected a List"))
            }
        }
        MetaTypeName::Named(type_name) => {
            if matches!(value, ConstValue::Null) {
                return Ok(value);
            }
            match rctx.registry.lookup_type(type_name) {
                Some(MetaType::InputObject(input_object)) => {
                    if let ConstValue::Object(mut fields) = value {
                        let mut map = IndexMap::with_capacity(fields.len());
                        for meta_input_value in input_object.input_fields.values() {
                            if let Some(field_value) = resolve_maybe_absent_input(
                                rctx.with_input(&meta_input_value.name, meta_input_value),
                                fields.shift_remove(meta_input_value.name.as_str()),
                            )? {
                                map.insert(Name::new(&meta_input_value.name), field_value);
                            }
                        }
                        if let Some((unknown, _)) = fields.first() {
                            return Err(rctx.input_error(&format!("Unknown field \"{unknown}\"")));
                        }
                        if input_object.oneof && map.len() != 1 {
                            return Err(
                                rctx.input_error(&format!("Expected exactly one field (@oneOf), got {}", map.len()))
                            );
                        }
                        Ok(ConstValue::Object(map))
                    } else {
                        Err(rctx.input_error("Expected an Object"))
                    }
                }
                Some(MetaType::Enum(enum_type)) => resolve_input_enum(rctx, value, enum_type),
                Some(MetaType::Scalar(scalar)) => {
                    let type_name = type_name.to_string();
                    resolve_input_scalar(rctx, value, scalar, &type_name)
                }
                Some(_) => Err(rctx
                    .clone()
                    .input_error(&format!("Internal Error: Unsupported input type {type_name}"))),
                None => Err(rctx
                    .clone()
                    .input_error(&format!("Internal Error: Unknown input type {type_name}"))),
            }
        }
    }
}

fn resolve_input_scalar(
    rctx: ResolveContext<'_>,
    value: ConstValue,
    scalar: &ScalarType,
    type_name: &str,
) -> Result<ConstValue, Error> {
    match scalar.parser {
        ScalarParser::BestEffort if PossibleScalar::contains(type_name) => Ok(ConstValue::from_json(
            PossibleScalar::parse(type_name, value).map_err(|err| Error::new(err.message()))?,
        )?),
        _ => {
            if let Some(is_valid) = scalar.is_valid {
                if !is_valid(&value) {
                    return Err(rctx.input_error(&format!("Invalid {type_name} value")));
                }
            }
            Ok(value)
        }
    }
}

fn resolve_input_enum(rctx: ResolveContext<'_>, value: ConstValue, ty: &EnumType) -> Result<ConstValue, Error> {
    let str_value = match &value {
        ConstValue::Enum(name) => name.as_str(),
        ConstValue::String(string) => string.as_str(),
        _ => return Err(rctx.input_error(&format!("Expected an enum, not a {}", const_value_kind(&value)))),
    };

    if ty.value(str_value).is_none() {
        return Err(rctx.input_error(&format!("Unknown enum value: {str_value}")));
    }

    Ok(ConstValue::Enum(Name::new(str_value)))
}

pub(crate) fn const_value_kind(value: &ConstValue) -> &'static str {
    match value {
        ConstValue::Null => "null",
        ConstValue::Number(_) => "number",
        ConstValue::String(_) => "string",
        ConstValue::Boolean(_) => "boolean",
        ConstValue::Binary(_) => "binary",
        ConstValue::Enum(_) => "enum",
        ConstValue::List(_) => "list",
        ConstValue::Object(_) => "object",
    }
}
