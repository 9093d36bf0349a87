use async_graphql_parser::{
    types::{BaseType, FragmentDefinition, InlineFragment, Type, VariableDefinition},
    Pos, Positioned,
};
use async_graphql_value::Name;

use crate::validation::visitor::{Visitor, VisitorContext};

const CODE: &str = "KNOWN_TYPE_NAMES";

/// Every named-type reference must resolve to a registered type.
pub struct KnownTypeNames;

impl<'a> Visitor<'a> for KnownTypeNames {
    fn enter_fragment_definition(
        &mut self,
        ctx: &mut VisitorContext<'a>,
        _name: &'a Name,
        fragment: &'a Positioned<FragmentDefinition>,
    ) {
        let condition = &fragment.node.type_condition;
        check(ctx, condition.node.on.node.as_str(), condition.pos);
    }

    fn enter_variable_definition(
        &mut self,
        ctx: &mut VisitorContext<'a>,
        variable_definition: &'a Positioned<VariableDefinition>,
    ) {
        let ty = &variable_definition.node.var_type;
        check(ctx, base_type_name(&ty.node), ty.pos);
    }

    fn enter_inline_fragment(&mut self, ctx: &mut VisitorContext<'a>, inline_fragment: &'a Positioned<InlineFragment>) {
        if let Some(condition) = &inline_fragment.node.type_condition {
            check(ctx, condition.node.on.node.as_str(), condition.pos);
        }
    }
}

fn check(ctx: &mut VisitorContext<'_>, name: &str, pos: Pos) {
    if ctx.registry.lookup_type(name).is_none() {
        ctx.report_error(CODE, vec![pos], format!("Unknown type \"{name}\""));
    }
}

fn base_type_name(ty: &Type) -> &str {
    match &ty.base {
        BaseType::Named(name) => name.as_str(),
        BaseType::List(inner) => base_type_name(inner),
    }
}
