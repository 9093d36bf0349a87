//! The schema's type registry: an immutable description of every type the
//! engine can execute against.

pub mod introspection;
pub mod resolvers;
pub mod scalars;
pub mod type_kinds;
mod type_names;

use std::collections::{BTreeMap, HashMap, HashSet};

use async_graphql_parser::types::{BaseType as ParsedBaseType, OperationType, Type as ParsedType};
use async_graphql_value::ConstValue;
use indexmap::{IndexMap, IndexSet};

pub use self::{
    introspection::__DirectiveLocation,
    resolvers::{
        FieldResolution, ResolvedValue, Resolver, ResolverContext, ResolverFn, SourceEvents, Subscriber, SubscriberFn,
    },
    type_kinds::TypeKind,
    type_names::{
        named_type_from_type_str, InputValueType, MetaFieldType, MetaTypeName, NamedType, TypeReference, WrappingType,
        WrappingTypeIter,
    },
};
use crate::Error;

/// A nominal check deciding whether a raw value is of a given object type.
pub type IsTypeOfFn = fn(&serde_json::Value) -> bool;

/// Maps a raw value to the name of the concrete object type it represents.
pub type ResolveTypeFn = fn(&serde_json::Value, &Registry) -> Option<String>;

#[derive(Clone, Debug, Default, PartialEq, Eq, Hash)]
pub enum Deprecation {
    #[default]
    NoDeprecated,
    Deprecated {
        reason: Option<String>,
    },
}

impl Deprecation {
    #[inline]
    pub fn is_deprecated(&self) -> bool {
        matches!(self, Deprecation::Deprecated { .. })
    }

    #[inline]
    pub fn reason(&self) -> Option<&str> {
        match self {
            Deprecation::NoDeprecated => None,
            Deprecation::Deprecated { reason } => reason.as_deref(),
        }
    }
}

#[derive(Clone, Debug)]
pub struct MetaInputValue {
    pub name: String,
    pub description: Option<String>,
    pub ty: InputValueType,
    pub default_value: Option<ConstValue>,
}

impl MetaInputValue {
    pub fn new(name: impl Into<String>, ty: impl Into<InputValueType>) -> MetaInputValue {
        MetaInputValue {
            name: name.into(),
            description: None,
            ty: ty.into(),
            default_value: None,
        }
    }

    pub fn with_description(self, description: impl Into<String>) -> MetaInputValue {
        MetaInputValue {
            description: Some(description.into()),
            ..self
        }
    }

    pub fn with_default(self, default: ConstValue) -> MetaInputValue {
        MetaInputValue {
            default_value: Some(default),
            ..self
        }
    }
}

#[derive(Clone, Debug, Default)]
pub struct MetaField {
    pub name: String,
    pub description: Option<String>,
    pub args: IndexMap<String, MetaInputValue>,
    pub ty: MetaFieldType,
    pub deprecation: Deprecation,
    pub resolver: Resolver,
    pub subscriber: Option<Subscriber>,
}

impl MetaField {
    pub fn new(name: impl Into<String>, ty: impl Into<MetaFieldType>) -> MetaField {
        MetaField {
            name: name.into(),
            ty: ty.into(),
            ..Default::default()
        }
    }

    pub fn with_description(self, description: impl Into<String>) -> Self {
        Self {
            description: Some(description.into()),
            ..self
        }
    }

    pub fn with_arg(mut self, arg: MetaInputValue) -> Self {
        self.args.insert(arg.name.clone(), arg);
        self
    }

    pub fn with_deprecation(self, reason: Option<String>) -> Self {
        Self {
            deprecation: Deprecation::Deprecated { reason },
            ..self
        }
    }

    pub fn with_resolver(self, resolver: Resolver) -> Self {
        Self { resolver, ..self }
    }

    pub fn with_subscriber(self, subscriber: Subscriber) -> Self {
        Self {
            subscriber: Some(subscriber),
            ..self
        }
    }
}

#[derive(Clone, Debug)]
pub struct MetaEnumValue {
    pub name: String,
    pub description: Option<String>,
    pub deprecation: Deprecation,
}

impl MetaEnumValue {
    pub fn new(name: impl Into<String>) -> Self {
        MetaEnumValue {
            name: name.into(),
            description: None,
            deprecation: Deprecation::NoDeprecated,
        }
    }

    pub fn with_description(self, description: impl Into<String>) -> Self {
        MetaEnumValue {
            description: Some(description.into()),
            ..self
        }
    }

    pub fn with_deprecation(self, reason: Option<String>) -> Self {
        MetaEnumValue {
            deprecation: Deprecation::Deprecated { reason },
            ..self
        }
    }
}

/// How raw resolver output is mapped into response values for a scalar.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum ScalarParser {
    /// Do not parse scalar values, pass the JSON value through as-is.
    PassThrough,

    /// Parse the value with the named built-in scalar, rejecting values the
    /// scalar cannot represent.
    #[default]
    BestEffort,
}

#[derive(Clone, Debug)]
pub struct ScalarType {
    pub name: String,
    pub description: Option<String>,
    pub specified_by_url: Option<String>,
    pub is_valid: Option<fn(&ConstValue) -> bool>,
    pub parser: ScalarParser,
}

impl ScalarType {
    pub fn new(name: impl Into<String>) -> Self {
        ScalarType {
            name: name.into(),
            description: None,
            specified_by_url: None,
            is_valid: None,
            parser: ScalarParser::default(),
        }
    }

    pub fn passthrough(name: impl Into<String>) -> Self {
        ScalarType {
            parser: ScalarParser::PassThrough,
            ..Self::new(name)
        }
    }
}

#[derive(Clone, Debug)]
pub struct ObjectType {
    pub name: String,
    pub description: Option<String>,
    pub fields: IndexMap<String, MetaField>,
    pub implements: IndexSet<String>,
    pub is_type_of: Option<IsTypeOfFn>,
}

impl ObjectType {
    pub fn new(name: impl Into<String>, fields: impl IntoIterator<Item = MetaField>) -> ObjectType {
        ObjectType {
            name: name.into(),
            description: None,
            fields: fields.into_iter().map(|field| (field.name.clone(), field)).collect(),
            implements: IndexSet::default(),
            is_type_of: None,
        }
    }

    pub fn with_description(self, description: impl Into<String>) -> Self {
        ObjectType {
            description: Some(description.into()),
            ..self
        }
    }

    pub fn implement(mut self, interface: impl Into<String>) -> Self {
        self.implements.insert(interface.into());
        self
    }

    pub fn with_is_type_of(self, is_type_of: IsTypeOfFn) -> Self {
        ObjectType {
            is_type_of: Some(is_type_of),
            ..self
        }
    }

    #[inline]
    pub fn field_by_name(&self, name: &str) -> Option<&MetaField> {
        self.fields.get(name)
    }

    pub fn insert_field(&mut self, field: MetaField) {
        self.fields.insert(field.name.clone(), field);
    }
}

#[derive(Clone, Debug)]
pub struct InterfaceType {
    pub name: String,
    pub description: Option<String>,
    pub fields: IndexMap<String, MetaField>,
    pub possible_types: IndexSet<String>,
    pub resolve_type: Option<ResolveTypeFn>,
}

impl InterfaceType {
    pub fn new(name: impl Into<String>, fields: impl IntoIterator<Item = MetaField>) -> Self {
        InterfaceType {
            name: name.into(),
            description: None,
            fields: fields.into_iter().map(|field| (field.name.clone(), field)).collect(),
            possible_types: IndexSet::default(),
            resolve_type: None,
        }
    }

    pub fn with_resolve_type(self, resolve_type: ResolveTypeFn) -> Self {
        InterfaceType {
            resolve_type: Some(resolve_type),
            ..self
        }
    }

    pub fn field_by_name(&self, name: &str) -> Option<&MetaField> {
        self.fields.get(name)
    }
}

#[derive(Clone, Debug)]
pub struct UnionType {
    pub name: String,
    pub description: Option<String>,
    pub possible_types: IndexSet<String>,
    pub resolve_type: Option<ResolveTypeFn>,
}

impl UnionType {
    pub fn new<T: Into<String>>(name: impl Into<String>, possible_types: impl IntoIterator<Item = T>) -> UnionType {
        UnionType {
            name: name.into(),
            description: None,
            possible_types: possible_types.into_iter().map(Into::into).collect(),
            resolve_type: None,
        }
    }

    pub fn with_resolve_type(self, resolve_type: ResolveTypeFn) -> Self {
        UnionType {
            resolve_type: Some(resolve_type),
            ..self
        }
    }
}

#[derive(Clone, Debug)]
pub struct EnumType {
    pub name: String,
    pub description: Option<String>,
    pub enum_values: IndexMap<String, MetaEnumValue>,
}

impl EnumType {
    pub fn new(name: impl Into<String>, values: impl IntoIterator<Item = MetaEnumValue>) -> Self {
        EnumType {
            name: name.into(),
            enum_values: values.into_iter().map(|value| (value.name.clone(), value)).collect(),
            description: None,
        }
    }

    pub fn with_description(self, description: impl Into<String>) -> Self {
        EnumType {
            description: Some(description.into()),
            ..self
        }
    }

    pub fn value(&self, name: &str) -> Option<&MetaEnumValue> {
        self.enum_values.get(name)
    }
}

#[derive(Clone, Debug)]
pub struct InputObjectType {
    pub name: String,
    pub description: Option<String>,
    pub input_fields: IndexMap<String, MetaInputValue>,
    pub oneof: bool,
}

impl InputObjectType {
    pub fn new(name: impl Into<String>, input_fields: impl IntoIterator<Item = MetaInputValue>) -> Self {
        InputObjectType {
            name: name.into(),
            description: None,
            input_fields: input_fields.into_iter().map(|v| (v.name.clone(), v)).collect(),
            oneof: false,
        }
    }

    pub fn with_description(self, description: impl Into<String>) -> Self {
        InputObjectType {
            description: Some(description.into()),
            ..self
        }
    }

    pub fn with_oneof(self, oneof: bool) -> Self {
        InputObjectType { oneof, ..self }
    }
}

#[derive(Clone, Debug)]
pub enum MetaType {
    Scalar(ScalarType),
    Object(ObjectType),
    Interface(InterfaceType),
    Union(UnionType),
    Enum(EnumType),
    InputObject(InputObjectType),
}

impl From<ScalarType> for MetaType {
    fn from(val: ScalarType) -> Self {
        MetaType::Scalar(val)
    }
}

impl From<ObjectType> for MetaType {
    fn from(val: ObjectType) -> Self {
        MetaType::Object(val)
    }
}

impl From<InterfaceType> for MetaType {
    fn from(val: InterfaceType) -> Self {
        MetaType::Interface(val)
    }
}

impl From<UnionType> for MetaType {
    fn from(val: UnionType) -> Self {
        MetaType::Union(val)
    }
}

impl From<EnumType> for MetaType {
    fn from(val: EnumType) -> Self {
        MetaType::Enum(val)
    }
}

impl From<InputObjectType> for MetaType {
    fn from(val: InputObjectType) -> Self {
        MetaType::InputObject(val)
    }
}

impl MetaType {
    #[inline]
    pub fn name(&self) -> &str {
        match self {
            MetaType::Scalar(inner) => &inner.name,
            MetaType::Object(inner) => &inner.name,
            MetaType::Interface(inner) => &inner.name,
            MetaType::Union(inner) => &inner.name,
            MetaType::Enum(inner) => &inner.name,
            MetaType::InputObject(inner) => &inner.name,
        }
    }

    #[inline]
    pub fn description(&self) -> Option<&str> {
        match self {
            MetaType::Scalar(inner) => inner.description.as_deref(),
            MetaType::Object(inner) => inner.description.as_deref(),
            MetaType::Interface(inner) => inner.description.as_deref(),
            MetaType::Union(inner) => inner.description.as_deref(),
            MetaType::Enum(inner) => inner.description.as_deref(),
            MetaType::InputObject(inner) => inner.description.as_deref(),
        }
    }

    pub fn object(&self) -> Option<&ObjectType> {
        match self {
            MetaType::Object(inner) => Some(inner),
            _ => None,
        }
    }

    #[inline]
    pub fn fields(&self) -> Option<&IndexMap<String, MetaField>> {
        match self {
            MetaType::Object(inner) => Some(&inner.fields),
            MetaType::Interface(inner) => Some(&inner.fields),
            _ => None,
        }
    }

    #[inline]
    pub fn field_by_name(&self, name: &str) -> Option<&MetaField> {
        self.fields().and_then(|fields| fields.get(name))
    }

    pub fn get_input_field(&self, name: &str) -> Option<&MetaInputValue> {
        if let MetaType::InputObject(object) = self {
            object.input_fields.get(name)
        } else {
            None
        }
    }

    #[inline]
    pub fn is_composite(&self) -> bool {
        matches!(self, MetaType::Object(_) | MetaType::Interface(_) | MetaType::Union(_))
    }

    #[inline]
    pub fn is_abstract(&self) -> bool {
        matches!(self, MetaType::Interface(_) | MetaType::Union(_))
    }

    #[inline]
    pub fn is_leaf(&self) -> bool {
        matches!(self, MetaType::Enum(_) | MetaType::Scalar(_))
    }

    #[inline]
    pub fn is_input(&self) -> bool {
        matches!(self, MetaType::Enum(_) | MetaType::Scalar(_) | MetaType::InputObject(_))
    }

    #[inline]
    pub fn is_possible_type(&self, type_name: &str) -> bool {
        match self {
            MetaType::Interface(inner) => inner.possible_types.contains(type_name),
            MetaType::Union(inner) => inner.possible_types.contains(type_name),
            MetaType::Object(inner) => inner.name == type_name,
            _ => false,
        }
    }

    #[inline]
    pub fn possible_types(&self) -> Option<&IndexSet<String>> {
        match self {
            MetaType::Interface(inner) => Some(&inner.possible_types),
            MetaType::Union(inner) => Some(&inner.possible_types),
            _ => None,
        }
    }

    pub fn resolve_type_fn(&self) -> Option<ResolveTypeFn> {
        match self {
            MetaType::Interface(inner) => inner.resolve_type,
            MetaType::Union(inner) => inner.resolve_type,
            _ => None,
        }
    }
}

#[derive(Clone, Debug)]
pub struct MetaDirective {
    pub name: String,
    pub description: Option<String>,
    pub locations: Vec<__DirectiveLocation>,
    pub args: IndexMap<String, MetaInputValue>,
    pub is_repeatable: bool,
}

impl MetaDirective {
    pub fn new(name: impl Into<String>, locations: Vec<__DirectiveLocation>) -> Self {
        MetaDirective {
            name: name.into(),
            description: None,
            locations,
            args: IndexMap::default(),
            is_repeatable: false,
        }
    }

    pub fn with_description(self, description: impl Into<String>) -> Self {
        MetaDirective {
            description: Some(description.into()),
            ..self
        }
    }

    pub fn with_arg(mut self, arg: MetaInputValue) -> Self {
        self.args.insert(arg.name.clone(), arg);
        self
    }
}

/// All the types, directives and root bindings of one schema.
///
/// Types refer to one another by name; the registry map is the arena those
/// names resolve through, which keeps cyclic object references finite.
#[derive(Clone, Debug)]
pub struct Registry {
    pub types: BTreeMap<String, MetaType>,
    pub directives: HashMap<String, MetaDirective>,
    pub implements: HashMap<String, HashSet<String>>,
    pub query_type: String,
    pub mutation_type: Option<String>,
    pub subscription_type: Option<String>,
    pub disable_introspection: bool,
}

impl Default for Registry {
    fn default() -> Self {
        Self {
            types: Default::default(),
            directives: Default::default(),
            implements: Default::default(),
            query_type: "Query".to_string(),
            mutation_type: None,
            subscription_type: None,
            disable_introspection: false,
        }
    }
}

impl Registry {
    pub fn new() -> Registry {
        Registry::default()
    }

    pub fn insert_type(&mut self, ty: impl Into<MetaType>) {
        let ty = ty.into();
        self.types.insert(ty.name().to_string(), ty);
    }

    pub fn add_directive(&mut self, directive: MetaDirective) {
        self.directives.insert(directive.name.to_string(), directive);
    }

    pub fn add_implements(&mut self, ty: &str, interface: &str) {
        self.implements
            .entry(ty.to_string())
            .or_default()
            .insert(interface.to_string());
    }

    /// Looks a type up by its exact name.
    pub fn lookup_type(&self, name: &str) -> Option<&MetaType> {
        self.types.get(name)
    }

    /// Looks a type up through a (possibly wrapped) type reference.
    ///
    /// Will error if the type doesn't exist.
    pub fn lookup(&self, name: &impl TypeReference) -> Result<&MetaType, Error> {
        let name = name.named_type();
        self.types
            .get(name.as_str())
            .ok_or_else(|| Error::new(format!("Couldn't find a type named {name}")))
    }

    /// Looks up the named type behind a wrapped type string.
    pub fn concrete_type_by_name(&self, type_name: &str) -> Option<&MetaType> {
        self.types.get(MetaTypeName::concrete_typename(type_name))
    }

    pub fn concrete_type_by_parsed_type(&self, query_type: &ParsedType) -> Option<&MetaType> {
        match &query_type.base {
            ParsedBaseType::Named(name) => self.types.get(name.as_str()),
            ParsedBaseType::List(ty) => self.concrete_type_by_parsed_type(ty),
        }
    }

    pub fn query_root(&self) -> &MetaType {
        self.types.get(&self.query_type).expect("query root to be registered")
    }

    pub fn root_type(&self, operation_type: OperationType) -> Option<&MetaType> {
        match operation_type {
            OperationType::Query => Some(self.query_root()),
            OperationType::Mutation => self.mutation_type.as_deref().and_then(|name| self.types.get(name)),
            OperationType::Subscription => self.subscription_type.as_deref().and_then(|name| self.types.get(name)),
        }
    }

    /// Registers the built-in scalars every schema carries.
    pub(crate) fn add_builtin_scalars(&mut self) {
        for name in ["Int", "Float", "String", "Boolean", "ID", "Date", "DateTime"] {
            self.types
                .entry(name.to_string())
                .or_insert_with(|| MetaType::Scalar(ScalarType::new(name)));
        }
    }

    /// Registers the directives with built-in execution semantics plus the
    /// standard declaration-only ones.
    pub(crate) fn add_builtin_directives(&mut self) {
        use __DirectiveLocation::*;

        self.add_directive(
            MetaDirective::new("skip", vec![Field, FragmentSpread, InlineFragment])
                .with_description("Directs the executor to skip this field or fragment when the `if` argument is true.")
                .with_arg(MetaInputValue::new("if", "Boolean!").with_description("Skipped when true.")),
        );
        self.add_directive(
            MetaDirective::new("include", vec![Field, FragmentSpread, InlineFragment])
                .with_description(
                    "Directs the executor to include this field or fragment only when the `if` argument is true.",
                )
                .with_arg(MetaInputValue::new("if", "Boolean!").with_description("Included when true.")),
        );
        self.add_directive(
            MetaDirective::new("deprecated", vec![FieldDefinition, EnumValue])
                .with_description("Marks an element of a GraphQL schema as no longer supported.")
                .with_arg(
                    MetaInputValue::new("reason", "String")
                        .with_default(ConstValue::String("No longer supported".to_string())),
                ),
        );
    }
}
