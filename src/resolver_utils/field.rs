//! The per-field pipeline: argument coercion, resolver dispatch and value
//! completion.

use async_graphql_parser::types::Field;
use async_graphql_value::{ConstValue, Name, Value as InputValue};
use async_recursion::async_recursion;
use indexmap::IndexMap;

use super::{abstract_type::resolve_abstract_type, container::resolve_container, input::resolve_input, list::resolve_list};
use crate::{
    extensions::ResolveInfo,
    registry::{
        scalars::PossibleScalar, EnumType, FieldResolution, MetaType, MetaTypeName, ResolvedValue, Resolver,
        ResolverContext, ScalarParser, ScalarType,
    },
    ContextExt, ContextField, Error, Positioned, ServerError, ServerResult,
};

/// Runs the whole pipeline for one field, wrapped by the `execute_field`
/// extension hook.
pub(crate) async fn resolve_field(
    ctx: &ContextField<'_>,
    nodes: &[&Positioned<Field>],
    parent_value: &ResolvedValue,
) -> ServerResult<ConstValue> {
    let extensions = &ctx.query_env.extensions;
    if extensions.is_empty() {
        return resolve_field_inner(ctx, nodes, parent_value).await;
    }

    let info = resolve_info(ctx);
    let field_fut = resolve_field_inner(ctx, nodes, parent_value);
    futures_util::pin_mut!(field_fut);
    extensions.execute_field(&info, &mut field_fut).await
}

async fn resolve_field_inner(
    ctx: &ContextField<'_>,
    nodes: &[&Positioned<Field>],
    parent_value: &ResolvedValue,
) -> ServerResult<ConstValue> {
    let args = coerce_arguments(ctx)?;
    let raw = dispatch_resolver_with_extensions(ctx, parent_value, &args).await?;
    complete_field_value(ctx, raw, nodes).await
}

/// Coerces the field's declared arguments from literals and the coerced
/// variable map.
pub(crate) fn coerce_arguments(ctx: &ContextField<'_>) -> ServerResult<IndexMap<Name, ConstValue>> {
    let mut args = IndexMap::with_capacity(ctx.field.args.len());
    for input in ctx.field.args.values() {
        let literal = ctx.item.node.get_argument(&input.name).cloned();
        let value = match literal {
            // A variable that was never supplied leaves the argument absent,
            // letting defaults and non-null checks decide below.
            Some(Positioned {
                node: InputValue::Variable(name),
                ..
            }) => ctx.query_env.variables.get(name.as_str()).cloned(),
            Some(value) => Some(ctx.resolve_input_value(value)?),
            None => None,
        };
        if let Some(value) = resolve_input(ctx.registry(), ctx.item.pos, &input.name, input, value)? {
            args.insert(Name::new(&input.name), value);
        }
    }
    Ok(args)
}

async fn dispatch_resolver_with_extensions(
    ctx: &ContextField<'_>,
    parent_value: &ResolvedValue,
    args: &IndexMap<Name, ConstValue>,
) -> ServerResult<ResolvedValue> {
    let extensions = &ctx.query_env.extensions;
    if extensions.is_empty() {
        return dispatch_resolver(ctx, parent_value, args).await;
    }

    let info = resolve_info(ctx);
    let resolve_fut = dispatch_resolver(ctx, parent_value, args);
    futures_util::pin_mut!(resolve_fut);
    extensions.resolve(&info, &mut resolve_fut).await
}

/// Obtains the field's raw value: the field resolver if one is defined, the
/// parent object's entry under the field name otherwise, then the
/// engine-level default resolver, then null.
pub(crate) async fn dispatch_resolver(
    ctx: &ContextField<'_>,
    parent_value: &ResolvedValue,
    args: &IndexMap<Name, ConstValue>,
) -> ServerResult<ResolvedValue> {
    match &ctx.field.resolver {
        Resolver::Function(resolver) => {
            let resolution = (resolver.as_ref())(ResolverContext {
                ctx,
                parent_value,
                args,
            })
            .map_err(|err| err.into_server_error(ctx.item.pos))?;
            extract_result(resolution)
                .await
                .map_err(|err| err.into_server_error(ctx.item.pos))
        }
        Resolver::Parent => {
            if let Some(value) = parent_value.get_field(&ctx.field.name) {
                return Ok(value);
            }
            if let Some(default_resolver) = &ctx.schema_env.default_resolver {
                let resolution = (default_resolver.as_ref())(ResolverContext {
                    ctx,
                    parent_value,
                    args,
                })
                .map_err(|err| err.into_server_error(ctx.item.pos))?;
                return extract_result(resolution)
                    .await
                    .map_err(|err| err.into_server_error(ctx.item.pos));
            }
            Ok(ResolvedValue::null())
        }
    }
}

/// Unwraps chained resolutions until a value surfaces. Iterative, at most one
/// await per step.
pub(crate) async fn extract_result(mut resolution: FieldResolution) -> Result<ResolvedValue, Error> {
    loop {
        match resolution {
            FieldResolution::Ready(value) => return Ok(value),
            FieldResolution::Deferred(fut) => resolution = fut.await?,
        }
    }
}

/// Completes the raw value against the field's declared type, wrapped by the
/// `complete_value` extension hook.
pub(crate) async fn complete_field_value<'a>(
    ctx: &ContextField<'a>,
    value: ResolvedValue,
    nodes: &[&'a Positioned<Field>],
) -> ServerResult<ConstValue> {
    let extensions = &ctx.query_env.extensions;
    if extensions.is_empty() {
        return complete_value(ctx, ctx.field.ty.as_str(), value, nodes).await;
    }

    let info = resolve_info(ctx);
    let complete_fut = complete_value(ctx, ctx.field.ty.as_str(), value, nodes);
    futures_util::pin_mut!(complete_fut);
    extensions.complete_value(&info, &mut complete_fut).await
}

/// Value completion: null handling, leaf serialization, abstract-type
/// selection and recursion into lists and sub-selections.
#[async_recursion]
pub(crate) async fn complete_value<'a>(
    ctx: &ContextField<'a>,
    ty: &'a str,
    value: ResolvedValue,
    nodes: &[&'a Positioned<Field>],
) -> ServerResult<ConstValue> {
    match MetaTypeName::create(ty) {
        MetaTypeName::NonNull(inner) => {
            let completed = complete_value(ctx, inner, value, nodes).await?;
            if completed == ConstValue::Null {
                tracing::warn!(
                    path = %ctx.path,
                    field = %ctx.item.node.name.node,
                    "expected a non-null value"
                );
                return Err(ServerError::new(
                    format!(
                        "An error occurred while fetching `{}`, a non-nullable value was expected but no value was found.",
                        ctx.item.node.name.node
                    ),
                    Some(ctx.item.pos),
                ));
            }
            Ok(completed)
        }
        MetaTypeName::List(inner) => {
            if value.is_null() {
                return Ok(ConstValue::Null);
            }
            resolve_list(ctx, inner, value, nodes).await
        }
        MetaTypeName::Named(name) => {
            if value.is_null() {
                return Ok(ConstValue::Null);
            }
            let meta = ctx.schema_env.registry.lookup_type(name).ok_or_else(|| {
                ServerError::new(format!("Internal error: unknown type {name}"), Some(ctx.item.pos))
            })?;
            match meta {
                MetaType::Scalar(scalar) => complete_scalar(ctx, scalar, name, value),
                MetaType::Enum(enum_type) => complete_enum(ctx, enum_type, value),
                MetaType::Object(_) => {
                    let sub_ctx = ctx.with_selection_set(meta, sub_selection_sets(nodes));
                    resolve_container(&sub_ctx, &value).await
                }
                MetaType::Interface(_) | MetaType::Union(_) => {
                    let concrete = resolve_abstract_type(&ctx.schema_env.registry, meta, value.data_resolved())
                        .map_err(|err| err.into_server_error(ctx.item.pos))?;
                    let sub_ctx = ctx.with_selection_set(concrete, sub_selection_sets(nodes));
                    resolve_container(&sub_ctx, &value).await
                }
                MetaType::InputObject(_) => Err(ServerError::new(
                    format!("Type `{name}` is an input object and cannot be resolved in output position"),
                    Some(ctx.item.pos),
                )),
            }
        }
    }
}

/// The merged sub-selections of every node sharing this response key.
fn sub_selection_sets<'a>(
    nodes: &[&'a Positioned<Field>],
) -> Vec<&'a Positioned<async_graphql_parser::types::SelectionSet>> {
    nodes.iter().map(|field| &field.node.selection_set).collect()
}

fn complete_scalar(
    ctx: &ContextField<'_>,
    scalar: &ScalarType,
    name: &str,
    value: ResolvedValue,
) -> ServerResult<ConstValue> {
    let serialized = match scalar.parser {
        ScalarParser::BestEffort if PossibleScalar::contains(name) => {
            PossibleScalar::to_value(name, value.take()).map_err(|err| err.into_server_error(ctx.item.pos))?
        }
        _ => ConstValue::from_json(value.take())
            .map_err(|err| ServerError::new(err.to_string(), Some(ctx.item.pos)))?,
    };

    if let Some(is_valid) = scalar.is_valid {
        if !is_valid(&serialized) {
            return Err(ServerError::new(
                format!("Invalid value for scalar \"{name}\""),
                Some(ctx.item.pos),
            ));
        }
    }

    Ok(serialized)
}

fn complete_enum(ctx: &ContextField<'_>, enum_type: &EnumType, value: ResolvedValue) -> ServerResult<ConstValue> {
    let member = match value.take() {
        serde_json::Value::String(member) => member,
        other => {
            return Err(ServerError::new(
                format!(
                    "Invalid value for enum \"{}\": expected a member name, found {other}",
                    enum_type.name
                ),
                Some(ctx.item.pos),
            ))
        }
    };

    if enum_type.value(&member).is_none() {
        return Err(ServerError::new(
            format!("Invalid value \"{member}\" for enum \"{}\"", enum_type.name),
            Some(ctx.item.pos),
        ));
    }

    Ok(ConstValue::Enum(Name::new(member)))
}

pub(crate) fn resolve_info<'a>(ctx: &'a ContextField<'a>) -> ResolveInfo<'a> {
    ResolveInfo {
        path: ctx.path.clone(),
        parent_type: ctx.parent_type.name(),
        return_type: ctx.field.ty.as_str(),
        name: ctx.item.node.name.node.as_str(),
        alias: ctx.item.node.alias.as_ref().map(|alias| alias.node.as_str()),
    }
}
