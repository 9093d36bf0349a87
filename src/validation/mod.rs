//! Rule-driven document validation.
//!
//! Runs once per request before execution. Structural rules the parser's
//! document representation already enforces (executable-only definitions,
//! unique operation and fragment names, a lone anonymous operation) surface
//! as parse errors instead; everything representable is checked here.

mod rules;
mod visitor;

use async_graphql_parser::types::ExecutableDocument;

pub use visitor::{RuleError, VisitorContext};
use visitor::{visit, VisitorNil};

use crate::registry::Registry;

/// Validates the document against the registry, reporting every rule
/// violation found in a single walk.
///
/// Running this twice over the same inputs yields the same error list.
pub fn check_rules(registry: &Registry, doc: &ExecutableDocument) -> Result<(), Vec<RuleError>> {
    let mut ctx = VisitorContext::new(registry, doc);

    let mut visitor = VisitorNil
        .with(rules::KnownTypeNames)
        .with(rules::FragmentsOnCompositeTypes)
        .with(rules::VariablesAreInputTypes)
        .with(rules::ScalarLeafs)
        .with(rules::KnownFragmentNames)
        .with(rules::FieldsOnCorrectType)
        .with(rules::NoFragmentCycles::default());

    visit(&mut visitor, &mut ctx, doc);

    if !ctx.errors.is_empty() {
        return Err(ctx.errors);
    }

    Ok(())
}
