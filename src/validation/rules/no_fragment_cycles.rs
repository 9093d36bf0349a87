use std::collections::{HashMap, HashSet};

use async_graphql_parser::{
    types::{ExecutableDocument, FragmentDefinition, FragmentSpread},
    Pos, Positioned,
};
use async_graphql_value::Name;

use crate::validation::visitor::{CycleDetector, Visitor, VisitorContext};

const CODE: &str = "NO_FRAGMENT_CYCLES";

/// Fragment spreads must not form cycles.
#[derive(Default)]
pub struct NoFragmentCycles<'a> {
    current_fragment: Option<&'a str>,
    spreads: HashMap<&'a str, Vec<(&'a str, Pos)>>,
    fragment_order: Vec<&'a str>,
}

impl<'a> Visitor<'a> for NoFragmentCycles<'a> {
    fn exit_document(&mut self, ctx: &mut VisitorContext<'a>, _doc: &'a ExecutableDocument) {
        let mut detector = CycleDetector {
            visited: HashSet::new(),
            spreads: &self.spreads,
            errors: Vec::new(),
        };

        for fragment in &self.fragment_order {
            if !detector.visited.contains(fragment) {
                detector.detect_from(fragment, &mut Vec::new(), &mut HashMap::new());
            }
        }

        for (pos, message) in detector.errors {
            ctx.report_error(CODE, vec![pos], message);
        }
    }

    fn enter_fragment_definition(
        &mut self,
        _ctx: &mut VisitorContext<'a>,
        name: &'a Name,
        _fragment: &'a Positioned<FragmentDefinition>,
    ) {
        self.current_fragment = Some(name.as_str());
        self.fragment_order.push(name.as_str());
    }

    fn exit_fragment_definition(
        &mut self,
        _ctx: &mut VisitorContext<'a>,
        _name: &'a Name,
        _fragment: &'a Positioned<FragmentDefinition>,
    ) {
        self.current_fragment = None;
    }

    fn enter_fragment_spread(&mut self, _ctx: &mut VisitorContext<'a>, fragment_spread: &'a Positioned<FragmentSpread>) {
        if let Some(current) = self.current_fragment {
            self.spreads
                .entry(current)
                .or_default()
                .push((fragment_spread.node.fragment_name.node.as_str(), fragment_spread.pos));
        }
    }
}
