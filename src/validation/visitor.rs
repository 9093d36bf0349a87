use std::collections::HashMap;

use async_graphql_parser::{
    types::{
        Directive, ExecutableDocument, Field, FragmentDefinition, FragmentSpread, InlineFragment, OperationDefinition,
        Selection, SelectionSet, VariableDefinition,
    },
    Pos, Positioned,
};
use async_graphql_value::{Name, Value};

use crate::registry::{MetaType, Registry};

/// One rule violation, anchored to the rule that produced it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RuleError {
    /// Machine-readable identifier of the violated rule.
    pub code: &'static str,
    pub locations: Vec<Pos>,
    pub message: String,
}

impl RuleError {
    pub fn new(code: &'static str, locations: Vec<Pos>, message: impl Into<String>) -> Self {
        RuleError {
            code,
            locations,
            message: message.into(),
        }
    }
}

/// The state shared by every rule during the single document walk.
///
/// The type stack tracks the parent/current type as the walk descends, so
/// rules can query them without re-resolving.
pub struct VisitorContext<'a> {
    pub registry: &'a Registry,
    doc: &'a ExecutableDocument,
    pub errors: Vec<RuleError>,
    type_stack: Vec<Option<&'a MetaType>>,
}

impl<'a> VisitorContext<'a> {
    pub fn new(registry: &'a Registry, doc: &'a ExecutableDocument) -> Self {
        Self {
            registry,
            doc,
            errors: Vec::new(),
            type_stack: Vec::new(),
        }
    }

    pub fn report_error(&mut self, code: &'static str, locations: Vec<Pos>, message: impl Into<String>) {
        self.errors.push(RuleError::new(code, locations, message));
    }

    pub fn with_type<F: FnOnce(&mut VisitorContext<'a>)>(&mut self, ty: Option<&'a MetaType>, f: F) {
        self.type_stack.push(ty);
        f(self);
        self.type_stack.pop();
    }

    /// The type the walk currently sits on, e.g. a field's own type inside
    /// that field.
    pub fn current_type(&self) -> Option<&'a MetaType> {
        self.type_stack.last().copied().flatten()
    }

    /// The type one level up, e.g. the selected-on type inside a field.
    pub fn parent_type(&self) -> Option<&'a MetaType> {
        if self.type_stack.len() >= 2 {
            self.type_stack[self.type_stack.len() - 2]
        } else {
            None
        }
    }

    pub fn fragment(&self, name: &str) -> Option<&'a Positioned<FragmentDefinition>> {
        self.doc.fragments.get(name)
    }
}

/// A validation rule; every hook defaults to a no-op.
#[allow(unused_variables)]
pub trait Visitor<'a> {
    fn enter_document(&mut self, ctx: &mut VisitorContext<'a>, doc: &'a ExecutableDocument) {}
    fn exit_document(&mut self, ctx: &mut VisitorContext<'a>, doc: &'a ExecutableDocument) {}

    fn enter_operation_definition(
        &mut self,
        ctx: &mut VisitorContext<'a>,
        name: Option<&'a Name>,
        operation: &'a Positioned<OperationDefinition>,
    ) {
    }
    fn exit_operation_definition(
        &mut self,
        ctx: &mut VisitorContext<'a>,
        name: Option<&'a Name>,
        operation: &'a Positioned<OperationDefinition>,
    ) {
    }

    fn enter_fragment_definition(
        &mut self,
        ctx: &mut VisitorContext<'a>,
        name: &'a Name,
        fragment: &'a Positioned<FragmentDefinition>,
    ) {
    }
    fn exit_fragment_definition(
        &mut self,
        ctx: &mut VisitorContext<'a>,
        name: &'a Name,
        fragment: &'a Positioned<FragmentDefinition>,
    ) {
    }

    fn enter_variable_definition(
        &mut self,
        ctx: &mut VisitorContext<'a>,
        variable_definition: &'a Positioned<VariableDefinition>,
    ) {
    }
    fn exit_variable_definition(
        &mut self,
        ctx: &mut VisitorContext<'a>,
        variable_definition: &'a Positioned<VariableDefinition>,
    ) {
    }

    fn enter_directive(&mut self, ctx: &mut VisitorContext<'a>, directive: &'a Positioned<Directive>) {}
    fn exit_directive(&mut self, ctx: &mut VisitorContext<'a>, directive: &'a Positioned<Directive>) {}

    fn enter_argument(&mut self, ctx: &mut VisitorContext<'a>, name: &'a Positioned<Name>, value: &'a Positioned<Value>) {
    }

    fn enter_selection_set(&mut self, ctx: &mut VisitorContext<'a>, selection_set: &'a Positioned<SelectionSet>) {}
    fn exit_selection_set(&mut self, ctx: &mut VisitorContext<'a>, selection_set: &'a Positioned<SelectionSet>) {}

    fn enter_selection(&mut self, ctx: &mut VisitorContext<'a>, selection: &'a Positioned<Selection>) {}
    fn exit_selection(&mut self, ctx: &mut VisitorContext<'a>, selection: &'a Positioned<Selection>) {}

    fn enter_field(&mut self, ctx: &mut VisitorContext<'a>, field: &'a Positioned<Field>) {}
    fn exit_field(&mut self, ctx: &mut VisitorContext<'a>, field: &'a Positioned<Field>) {}

    fn enter_fragment_spread(&mut self, ctx: &mut VisitorContext<'a>, fragment_spread: &'a Positioned<FragmentSpread>) {
    }
    fn exit_fragment_spread(&mut self, ctx: &mut VisitorContext<'a>, fragment_spread: &'a Positioned<FragmentSpread>) {}

    fn enter_inline_fragment(&mut self, ctx: &mut VisitorContext<'a>, inline_fragment: &'a Positioned<InlineFragment>) {
    }
    fn exit_inline_fragment(&mut self, ctx: &mut VisitorContext<'a>, inline_fragment: &'a Positioned<InlineFragment>) {}
}

pub struct VisitorNil;

impl VisitorNil {
    pub fn with<V>(self, visitor: V) -> VisitorCons<V, Self> {
        VisitorCons(visitor, self)
    }
}

pub struct VisitorCons<A, B>(A, B);

impl<A, B> VisitorCons<A, B> {
    pub fn with<V>(self, visitor: V) -> VisitorCons<V, Self> {
        VisitorCons(visitor, self)
    }
}

impl<'a> Visitor<'a> for VisitorNil {}

macro_rules! forward {
    ($name:ident, $($arg:ident: $ty:ty),*) => {
        fn $name(&mut self, ctx: &mut VisitorContext<'a>, $($arg: $ty),*) {
            self.0.$name(ctx, $($arg),*);
            self.1.$name(ctx, $($arg),*);
        }
    };
}

impl<'a, A, B> Visitor<'a> for VisitorCons<A, B>
where
    A: Visitor<'a>,
    B: Visitor<'a>,
{
    forward!(enter_document, doc: &'a ExecutableDocument);
    forward!(exit_document, doc: &'a ExecutableDocument);
    forward!(
        enter_operation_definition,
        name: Option<&'a Name>,
        operation: &'a Positioned<OperationDefinition>
    );
    forward!(
        exit_operation_definition,
        name: Option<&'a Name>,
        operation: &'a Positioned<OperationDefinition>
    );
    forward!(
        enter_fragment_definition,
        name: &'a Name,
        fragment: &'a Positioned<FragmentDefinition>
    );
    forward!(
        exit_fragment_definition,
        name: &'a Name,
        fragment: &'a Positioned<FragmentDefinition>
    );
    forward!(
        enter_variable_definition,
        variable_definition: &'a Positioned<VariableDefinition>
    );
    forward!(
        exit_variable_definition,
        variable_definition: &'a Positioned<VariableDefinition>
    );
    forward!(enter_directive, directive: &'a Positioned<Directive>);
    forward!(exit_directive, directive: &'a Positioned<Directive>);
    forward!(enter_argument, name: &'a Positioned<Name>, value: &'a Positioned<Value>);
    forward!(enter_selection_set, selection_set: &'a Positioned<SelectionSet>);
    forward!(exit_selection_set, selection_set: &'a Positioned<SelectionSet>);
    forward!(enter_selection, selection: &'a Positioned<Selection>);
    forward!(exit_selection, selection: &'a Positioned<Selection>);
    forward!(enter_field, field: &'a Positioned<Field>);
    forward!(exit_field, field: &'a Positioned<Field>);
    forward!(enter_fragment_spread, fragment_spread: &'a Positioned<FragmentSpread>);
    forward!(exit_fragment_spread, fragment_spread: &'a Positioned<FragmentSpread>);
    forward!(enter_inline_fragment, inline_fragment: &'a Positioned<InlineFragment>);
    forward!(exit_inline_fragment, inline_fragment: &'a Positioned<InlineFragment>);
}

/// Walks the document once, firing every rule's hooks as it goes.
pub fn visit<'a, V: Visitor<'a>>(v: &mut V, ctx: &mut VisitorContext<'a>, doc: &'a ExecutableDocument) {
    v.enter_document(ctx, doc);

    for (name, operation) in doc.operations.iter() {
        v.enter_operation_definition(ctx, name, operation);
        let root = ctx.registry.root_type(operation.node.ty);
        ctx.with_type(root, |ctx| {
            for variable_definition in &operation.node.variable_definitions {
                v.enter_variable_definition(ctx, variable_definition);
                v.exit_variable_definition(ctx, variable_definition);
            }
            visit_directives(v, ctx, &operation.node.directives);
            visit_selection_set(v, ctx, &operation.node.selection_set);
        });
        v.exit_operation_definition(ctx, name, operation);
    }

    for (name, fragment) in &doc.fragments {
        let condition = fragment.node.type_condition.node.on.node.as_str();
        let ty = ctx.registry.lookup_type(condition);
        ctx.with_type(ty, |ctx| {
            v.enter_fragment_definition(ctx, name, fragment);
            visit_directives(v, ctx, &fragment.node.directives);
            visit_selection_set(v, ctx, &fragment.node.selection_set);
            v.exit_fragment_definition(ctx, name, fragment);
        });
    }

    v.exit_document(ctx, doc);
}

fn visit_selection_set<'a, V: Visitor<'a>>(
    v: &mut V,
    ctx: &mut VisitorContext<'a>,
    selection_set: &'a Positioned<SelectionSet>,
) {
    if selection_set.node.items.is_empty() {
        return;
    }

    v.enter_selection_set(ctx, selection_set);
    for selection in &selection_set.node.items {
        v.enter_selection(ctx, selection);
        match &selection.node {
            Selection::Field(field) => {
                let field_type = ctx
                    .current_type()
                    .and_then(|ty| ty.field_by_name(field.node.name.node.as_str()))
                    .and_then(|meta| ctx.registry.concrete_type_by_name(meta.ty.as_str()));
                ctx.with_type(field_type, |ctx| {
                    v.enter_field(ctx, field);
                    for (name, value) in &field.node.arguments {
                        v.enter_argument(ctx, name, value);
                    }
                    visit_directives(v, ctx, &field.node.directives);
                    visit_selection_set(v, ctx, &field.node.selection_set);
                    v.exit_field(ctx, field);
                });
            }
            Selection::FragmentSpread(fragment_spread) => {
                v.enter_fragment_spread(ctx, fragment_spread);
                visit_directives(v, ctx, &fragment_spread.node.directives);
                v.exit_fragment_spread(ctx, fragment_spread);
            }
            Selection::InlineFragment(inline_fragment) => {
                let ty = match &inline_fragment.node.type_condition {
                    Some(condition) => ctx.registry.lookup_type(condition.node.on.node.as_str()),
                    None => ctx.current_type(),
                };
                ctx.with_type(ty, |ctx| {
                    v.enter_inline_fragment(ctx, inline_fragment);
                    visit_directives(v, ctx, &inline_fragment.node.directives);
                    visit_selection_set(v, ctx, &inline_fragment.node.selection_set);
                    v.exit_inline_fragment(ctx, inline_fragment);
                });
            }
        }
        v.exit_selection(ctx, selection);
    }
    v.exit_selection_set(ctx, selection_set);
}

fn visit_directives<'a, V: Visitor<'a>>(
    v: &mut V,
    ctx: &mut VisitorContext<'a>,
    directives: &'a [Positioned<Directive>],
) {
    for directive in directives {
        v.enter_directive(ctx, directive);
        for (name, value) in &directive.node.arguments {
            v.enter_argument(ctx, name, value);
        }
        v.exit_directive(ctx, directive);
    }
}

/// Used by cycle detection in `NoFragmentCycles`.
pub(crate) struct CycleDetector<'a> {
    pub visited: std::collections::HashSet<&'a str>,
    pub spreads: &'a HashMap<&'a str, Vec<(&'a str, Pos)>>,
    pub errors: Vec<(Pos, String)>,
}

impl<'a> CycleDetector<'a> {
    pub(crate) fn detect_from(
        &mut self,
        from: &'a str,
        path: &mut Vec<(&'a str, Pos)>,
        path_indices: &mut HashMap<&'a str, usize>,
    ) {
        self.visited.insert(from);

        let spreads = self.spreads;
        let Some(targets) = spreads.get(from) else {
            return;
        };

        path_indices.insert(from, path.len());
        for (target, pos) in targets {
            match path_indices.get(target).copied() {
                Some(index) => {
                    let via = path[index..]
                        .iter()
                        .map(|(name, _)| format!("\"{name}\""))
                        .collect::<Vec<_>>()
                        .join(", ");
                    let message = if via.is_empty() {
                        format!("Cannot spread fragment \"{target}\" within itself")
                    } else {
                        format!("Cannot spread fragment \"{target}\" within itself via {via}")
                    };
                    self.errors.push((*pos, message));
                }
                None if !self.visited.contains(target) => {
                    path.push((target, *pos));
                    self.detect_from(target, path, path_indices);
                    path.pop();
                }
                _ => {}
            }
        }
        path_indices.remove(from);
    }
}
