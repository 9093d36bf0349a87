use async_graphql_parser::{types::VariableDefinition, Positioned};

use crate::validation::visitor::{Visitor, VisitorContext};

const CODE: &str = "VARIABLES_ARE_INPUT_TYPES";

/// Variable declarations must use scalar, enum or input-object types.
pub struct VariablesAreInputTypes;

impl<'a> Visitor<'a> for VariablesAreInputTypes {
    fn enter_variable_definition(
        &mut self,
        ctx: &mut VisitorContext<'a>,
        variable_definition: &'a Positioned<VariableDefinition>,
    ) {
        if let Some(ty) = ctx
            .registry
            .concrete_type_by_parsed_type(&variable_definition.node.var_type.node)
        {
            if !ty.is_input() {
                ctx.report_error(
                    CODE,
                    vec![variable_definition.pos],
                    format!(
                        "Variable \"${}\" cannot be of non-input type \"{}\"",
                        variable_definition.node.name.node,
                        ty.name(),
                    ),
                );
            }
        }
    }
}
