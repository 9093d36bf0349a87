//! List completion with per-item null propagation.

use async_graphql_parser::types::Field;
use async_graphql_value::ConstValue;

use super::field::complete_value;
use crate::{
    registry::{MetaTypeName, ResolvedValue},
    ContextExt, ContextField, Positioned, ServerError, ServerResult,
};

/// Completes each item of the list concurrently against the inner type.
/// Output order equals input iteration order regardless of completion order.
///
/// An item error obeys the inner type's nullability: nullable items become
/// null with the error recorded, non-null items fail the whole list.
pub(crate) async fn resolve_list<'a>(
    ctx: &ContextField<'a>,
    inner_ty: &'a str,
    value: ResolvedValue,
    nodes: &[&'a Positioned<Field>],
) -> ServerResult<ConstValue> {
    let Some(items) = value.item_iter() else {
        return Err(ServerError::new(
            format!("Encountered a {} where we expected a list", json_kind_str(value.data_resolved())),
            Some(ctx.item.pos),
        ));
    };

    let futures = items.enumerate().map(|(idx, item)| {
        let ctx_idx = ctx.with_index(idx);
        async move {
            complete_value(&ctx_idx, inner_ty, item, nodes)
                .await
                .map_err(|error| ctx_idx.set_error_path(error))
        }
    });

    let inner_nullable = !MetaTypeName::create(inner_ty).is_non_null();
    let mut children = Vec::new();
    for result in futures_util::future::join_all(futures).await {
        match result {
            Ok(value) => children.push(value),
            Err(error) if inner_nullable => {
                ctx.add_error(error);
                children.push(ConstValue::Null);
            }
            Err(error) => return Err(error),
        }
    }

    Ok(ConstValue::List(children))
}

fn json_kind_str(value: &serde_json::Value) -> &'static str {
    match value {
        serde_json::Value::Null => "null",
        serde_json::Value::Bool(_) => "bool",
        serde_json::Value::Number(_) => "number",
        serde_json::Value::String(_) => "string",
        serde_json::Value::Array(_) => "list",
        serde_json::Value::Object(_) => "object",
    }
}
