use async_graphql_parser::{types::Field, Positioned};

use crate::validation::visitor::{Visitor, VisitorContext};

const CODE: &str = "FIELDS_ON_CORRECT_TYPE";

/// Every selected field must exist on its parent type.
///
/// `__typename` is valid on any composite type; `__schema` and `__type` are
/// registered on the query root and resolve like ordinary fields.
pub struct FieldsOnCorrectType;

impl<'a> Visitor<'a> for FieldsOnCorrectType {
    fn enter_field(&mut self, ctx: &mut VisitorContext<'a>, field: &'a Positioned<Field>) {
        let Some(parent) = ctx.parent_type() else {
            return;
        };
        if !parent.is_composite() {
            return;
        }

        let name = field.node.name.node.as_str();
        if name == "__typename" {
            return;
        }

        if parent.field_by_name(name).is_none() {
            ctx.report_error(
                CODE,
                vec![field.pos],
                format!("Unknown field \"{name}\" on type \"{}\"", parent.name()),
            );
        }
    }
}
