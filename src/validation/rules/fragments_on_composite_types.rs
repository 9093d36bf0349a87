use async_graphql_parser::{
    types::{FragmentDefinition, InlineFragment},
    Positioned,
};
use async_graphql_value::Name;

use crate::validation::visitor::{Visitor, VisitorContext};

const CODE: &str = "FRAGMENTS_ON_COMPOSITE_TYPES";

/// A fragment's type condition must be an object, interface or union.
pub struct FragmentsOnCompositeTypes;

impl<'a> Visitor<'a> for FragmentsOnCompositeTypes {
    fn enter_fragment_definition(
        &mut self,
        ctx: &mut VisitorContext<'a>,
        name: &'a Name,
        fragment: &'a Positioned<FragmentDefinition>,
    ) {
        if let Some(ty) = ctx.current_type() {
            if !ty.is_composite() {
                ctx.report_error(
                    CODE,
                    vec![fragment.pos],
                    format!("Fragment \"{name}\" cannot condition on non composite type \"{}\"", ty.name()),
                );
            }
        }
    }

    fn enter_inline_fragment(&mut self, ctx: &mut VisitorContext<'a>, inline_fragment: &'a Positioned<InlineFragment>) {
        if inline_fragment.node.type_condition.is_none() {
            return;
        }
        if let Some(ty) = ctx.current_type() {
            if !ty.is_composite() {
                ctx.report_error(
                    CODE,
                    vec![inline_fragment.pos],
                    format!("Fragment cannot condition on non composite type \"{}\"", ty.name()),
                );
            }
        }
    }
}
