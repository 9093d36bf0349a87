//! Selection-set collection and execution.

use std::collections::HashSet;

use async_graphql_parser::{
    types::{Directive, Field, Selection, SelectionSet},
    Positioned,
};
use async_graphql_value::{ConstValue, Name};
use indexmap::IndexMap;

use super::field::resolve_field;
use crate::{
    registry::{MetaType, Registry, ResolvedValue},
    ContextExt, ContextSelectionSet, ServerError, ServerResult,
};

/// The field nodes grouped under one response key, in first-occurrence order.
pub(crate) struct CollectedField<'a> {
    pub response_key: &'a Positioned<Name>,
    pub nodes: Vec<&'a Positioned<Field>>,
}

/// Produces the ordered grouped field set for the context's selection sets,
/// honoring `@skip`/`@include` and expanding fragments against the context's
/// object type. Fragment spreads already seen are skipped, which keeps the
/// walk finite on cyclic spreads.
pub(crate) fn collect_fields<'a>(ctx: &ContextSelectionSet<'a>) -> ServerResult<Vec<CollectedField<'a>>> {
    let mut grouped: IndexMap<&'a str, CollectedField<'a>> = IndexMap::new();
    let mut visited_fragments = HashSet::new();

    for selection_set in ctx.items.iter().copied() {
        add_set(ctx, selection_set, &mut grouped, &mut visited_fragments)?;
    }

    Ok(grouped.into_values().collect())
}

fn add_set<'a>(
    ctx: &ContextSelectionSet<'a>,
    selection_set: &'a Positioned<SelectionSet>,
    grouped: &mut IndexMap<&'a str, CollectedField<'a>>,
    visited_fragments: &mut HashSet<&'a str>,
) -> ServerResult<()> {
    for selection in &selection_set.node.items {
        match &selection.node {
            Selection::Field(field) => {
                if skip_by_directives(ctx, &field.node.directives)? {
                    continue;
                }
                let response_key = field.node.response_key();
                grouped
                    .entry(response_key.node.as_str())
                    .or_insert_with(|| CollectedField {
                        response_key,
                        nodes: Vec::new(),
                    })
                    .nodes
                    .push(field);
            }
            Selection::FragmentSpread(spread) => {
                if skip_by_directives(ctx, &spread.node.directives)? {
                    continue;
                }
                let name = spread.node.fragment_name.node.as_str();
                if !visited_fragments.insert(name) {
                    continue;
                }
                let fragment = ctx.query_env.fragments.get(name).ok_or_else(|| {
                    ServerError::new(format!("Unknown fragment \"{name}\""), Some(spread.pos))
                })?;
                let condition = fragment.node.type_condition.node.on.node.as_str();
                if fragment_type_applies(ctx.registry(), ctx.ty, condition) {
                    add_set(ctx, &fragment.node.selection_set, grouped, visited_fragments)?;
                }
            }
            Selection::InlineFragment(inline) => {
                if skip_by_directives(ctx, &inline.node.directives)? {
                    continue;
                }
                let applies = match &inline.node.type_condition {
                    Some(condition) => fragment_type_applies(ctx.registry(), ctx.ty, condition.node.on.node.as_str()),
                    None => true,
                };
                if applies {
                    add_set(ctx, &inline.node.selection_set, grouped, visited_fragments)?;
                }
            }
        }
    }
    Ok(())
}

/// True when the fragment's type condition matches the object type being
/// executed: the condition names the type itself, an interface it implements,
/// or a union it belongs to.
pub(crate) fn fragment_type_applies(registry: &Registry, object_type: &MetaType, condition: &str) -> bool {
    if condition == object_type.name() {
        return true;
    }
    registry
        .lookup_type(condition)
        .is_some_and(|ty| ty.is_possible_type(object_type.name()))
}

/// Evaluates `@skip(if:)` and `@include(if:)`, substituting variables.
fn skip_by_directives(ctx: &ContextSelectionSet<'_>, directives: &[Positioned<Directive>]) -> ServerResult<bool> {
    for directive in directives {
        let name = directive.node.name.node.as_str();
        if name != "skip" && name != "include" {
            continue;
        }

        let condition = directive.node.get_argument("if").ok_or_else(|| {
            ServerError::new(format!("Directive @{name} requires argument `if`"), Some(directive.pos))
        })?;
        let condition = ctx.resolve_input_value(condition.clone())?;
        let flag = match condition {
            ConstValue::Boolean(flag) => flag,
            other => {
                return Err(ServerError::new(
                    format!(
                        "Directive @{name} expected a Boolean for `if`, found {}",
                        super::input::const_value_kind(&other)
                    ),
                    Some(directive.pos),
                ))
            }
        };

        if (name == "skip" && flag) || (name == "include" && !flag) {
            return Ok(true);
        }
    }
    Ok(false)
}

/// Executes the context's selection sets concurrently, joining in
/// response-key order.
pub(crate) async fn resolve_container(
    ctx: &ContextSelectionSet<'_>,
    parent_value: &ResolvedValue,
) -> ServerResult<ConstValue> {
    resolve_container_inner(ctx, parent_value, false).await
}

/// Executes the context's selection sets one field at a time; each field
/// fully completes, including its sub-selections, before the next starts.
/// Mutation roots only.
pub(crate) async fn resolve_container_serial(
    ctx: &ContextSelectionSet<'_>,
    parent_value: &ResolvedValue,
) -> ServerResult<ConstValue> {
    resolve_container_inner(ctx, parent_value, true).await
}

async fn resolve_container_inner(
    ctx: &ContextSelectionSet<'_>,
    parent_value: &ResolvedValue,
    serial: bool,
) -> ServerResult<ConstValue> {
    let collected = collect_fields(ctx)?;

    if collected.is_empty() && ctx.schema_env.validation_enabled {
        let pos = ctx.items.first().map(|selection_set| selection_set.pos);
        return Err(ServerError::new(
            format!("Must request at least one field on type `{}`", ctx.ty.name()),
            pos,
        ));
    }

    let results = if serial {
        let mut results = Vec::with_capacity(collected.len());
        for collected_field in &collected {
            results.push(resolve_field_entry(ctx, collected_field, parent_value).await);
        }
        results
    } else {
        let futures = collected
            .iter()
            .map(|collected_field| resolve_field_entry(ctx, collected_field, parent_value));
        futures_util::future::join_all(futures).await
    };

    let mut map = IndexMap::new();
    for result in results {
        if let Some((name, value)) = result? {
            map.insert(name, value);
        }
    }
    Ok(ConstValue::Object(map))
}

/// Resolves one response key: `__typename` directly, everything else through
/// the field pipeline. Field errors on nullable fields become null here;
/// non-null field errors propagate to the caller.
async fn resolve_field_entry<'a>(
    ctx: &ContextSelectionSet<'a>,
    collected: &CollectedField<'a>,
    parent_value: &ResolvedValue,
) -> ServerResult<Option<(Name, ConstValue)>> {
    let field_node = collected.nodes[0];
    let field_name = field_node.node.name.node.as_str();
    let response_key = Name::new(collected.response_key.node.as_str());

    if field_name == "__typename" {
        return Ok(Some((response_key, ConstValue::String(ctx.ty.name().to_string()))));
    }

    let Some(meta_field) = ctx.ty.field_by_name(field_name) else {
        if ctx.schema_env.validation_enabled {
            return Err(ServerError::new(
                format!("Unknown field \"{field_name}\" on type \"{}\"", ctx.ty.name()),
                Some(field_node.node.name.pos),
            ));
        }
        // With validation off the unknown field is silently dropped.
        return Ok(None);
    };

    let ctx_field = ctx.with_field(field_node, meta_field);
    match resolve_field(&ctx_field, &collected.nodes, parent_value).await {
        Ok(value) => Ok(Some((response_key, value))),
        Err(error) => {
            let error = ctx_field.set_error_path(error);
            if meta_field.ty.is_nullable() {
                ctx_field.add_error(error);
                Ok(Some((response_key, ConstValue::Null)))
            } else {
                // Propagate to the parent, who can null things out instead.
                Err(error)
            }
        }
    }
}
