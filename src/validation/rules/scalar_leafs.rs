use async_graphql_parser::{types::Field, Positioned};

use crate::validation::visitor::{Visitor, VisitorContext};

const CODE: &str = "SCALAR_LEAFS";

/// Leaf-typed fields must not carry a sub-selection; composite-typed fields
/// must.
pub struct ScalarLeafs;

impl<'a> Visitor<'a> for ScalarLeafs {
    fn enter_field(&mut self, ctx: &mut VisitorContext<'a>, field: &'a Positioned<Field>) {
        let Some(ty) = ctx.current_type() else {
            return;
        };
        let name = &field.node.name.node;
        let has_selection = !field.node.selection_set.node.items.is_empty();

        if ty.is_leaf() && has_selection {
            ctx.report_error(
                CODE,
                vec![field.pos],
                format!(
                    "Field \"{name}\" must not have a selection since type \"{}\" has no subfields",
                    ty.name(),
                ),
            );
        } else if ty.is_composite() && !has_selection {
            ctx.report_error(
                CODE,
                vec![field.pos],
                format!("Field \"{name}\" of type \"{}\" must have a selection of subfields", ty.name()),
            );
        }
    }
}
