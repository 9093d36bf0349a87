use async_graphql_parser::{types::FragmentSpread, Positioned};

use crate::validation::visitor::{Visitor, VisitorContext};

const CODE: &str = "KNOWN_FRAGMENT_NAMES";

/// Every fragment spread must refer to a fragment defined in the same
/// document.
pub struct KnownFragmentNames;

impl<'a> Visitor<'a> for KnownFragmentNames {
    fn enter_fragment_spread(&mut self, ctx: &mut VisitorContext<'a>, fragment_spread: &'a Positioned<FragmentSpread>) {
        let name = fragment_spread.node.fragment_name.node.as_str();
        if ctx.fragment(name).is_none() {
            ctx.report_error(CODE, vec![fragment_spread.pos], format!("Unknown fragment \"{name}\""));
        }
    }
}
