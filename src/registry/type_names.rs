//! Various types for working with GraphQL type names.

use std::borrow::Cow;

use async_graphql_value::Name;

use super::MetaType;

/// A type-name string split into its outermost wrapper.
///
/// Wrapping is encoded in the name itself: `[Episode!]!` is a non-null list of
/// non-null `Episode`. This keeps the type graph cycle-safe, since types refer
/// to one another by name through the registry.
#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub enum MetaTypeName<'a> {
    List(&'a str),
    NonNull(&'a str),
    Named(&'a str),
}

impl<'a> std::fmt::Display for MetaTypeName<'a> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            MetaTypeName::Named(name) => write!(f, "{name}"),
            MetaTypeName::NonNull(name) => write!(f, "{name}!"),
            MetaTypeName::List(name) => write!(f, "[{name}]"),
        }
    }
}

fn strip_brackets(type_name: &str) -> Option<&str> {
    type_name.strip_prefix('[').map(|rest| &rest[..rest.len() - 1])
}

impl<'a> MetaTypeName<'a> {
    #[inline]
    pub fn create(type_name: &str) -> MetaTypeName {
        if let Some(type_name) = type_name.strip_suffix('!') {
            MetaTypeName::NonNull(type_name)
        } else if let Some(type_name) = strip_brackets(type_name) {
            MetaTypeName::List(type_name)
        } else {
            MetaTypeName::Named(type_name)
        }
    }

    #[inline]
    pub fn concrete_typename(type_name: &str) -> &str {
        match MetaTypeName::create(type_name) {
            MetaTypeName::List(type_name) => Self::concrete_typename(type_name),
            MetaTypeName::NonNull(type_name) => Self::concrete_typename(type_name),
            MetaTypeName::Named(type_name) => type_name,
        }
    }

    #[inline]
    pub fn is_non_null(&self) -> bool {
        matches!(self, MetaTypeName::NonNull(_))
    }

    #[inline]
    #[must_use]
    pub fn unwrap_non_null(&self) -> Self {
        match self {
            MetaTypeName::NonNull(ty) => MetaTypeName::create(ty),
            _ => *self,
        }
    }

    #[inline]
    pub fn is_list(&self) -> bool {
        match self {
            MetaTypeName::List(_) => true,
            MetaTypeName::NonNull(ty) => MetaTypeName::create(ty).is_list(),
            MetaTypeName::Named(name) => name.ends_with(']'),
        }
    }
}

/// Defines basic string conversion functionality for a string wrapper.
macro_rules! def_string_conversions {
    ($ty:ident) => {
        impl std::fmt::Display for $ty {
            fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
                write!(f, "{}", self.0)
            }
        }

        impl $ty {
            pub fn as_str(&self) -> &str {
                &self.0
            }
        }

        impl From<&str> for $ty {
            fn from(value: &str) -> $ty {
                $ty(value.to_string())
            }
        }

        impl From<String> for $ty {
            fn from(value: String) -> $ty {
                $ty(value)
            }
        }
    };
}

/// The type of a field, including any list/non-null wrappers.
#[derive(Clone, Default, Debug, Hash, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub struct MetaFieldType(String);

def_string_conversions!(MetaFieldType);

impl MetaFieldType {
    pub fn is_non_null(&self) -> bool {
        self.0.ends_with('!')
    }

    pub fn is_nullable(&self) -> bool {
        !self.is_non_null()
    }

    pub fn is_list(&self) -> bool {
        MetaTypeName::create(&self.0).is_list()
    }

    pub fn wrapping_types(&self) -> WrappingTypeIter<'_> {
        WrappingTypeIter(self.0.chars())
    }
}

/// The type of an input value (argument, variable or input-object field),
/// including any list/non-null wrappers.
#[derive(Clone, Default, Debug, Hash, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub struct InputValueType(String);

def_string_conversions!(InputValueType);

impl InputValueType {
    pub fn is_non_null(&self) -> bool {
        self.0.ends_with('!')
    }
}

/// A named GraphQL type without any non-null or list wrappers.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct NamedType<'a>(Cow<'a, str>);

impl NamedType<'_> {
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for NamedType<'_> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<String> for NamedType<'static> {
    fn from(value: String) -> Self {
        NamedType(Cow::Owned(value))
    }
}

impl<'a> From<&'a str> for NamedType<'a> {
    fn from(value: &'a str) -> Self {
        NamedType(Cow::Borrowed(value))
    }
}

impl<'a> From<&'a Name> for NamedType<'a> {
    fn from(value: &'a Name) -> Self {
        NamedType(Cow::Borrowed(value.as_str()))
    }
}

/// A trait for types that represent type names in some way.
///
/// This is used by the lookup functions on the `Registry` to provide a bit of
/// convenience and type-safety around retrieving types.
pub trait TypeReference {
    /// The name of the type, with all wrappers stripped.
    fn named_type(&self) -> NamedType<'_>;
}

impl TypeReference for MetaFieldType {
    fn named_type(&self) -> NamedType<'_> {
        NamedType(Cow::Borrowed(named_type_from_type_str(&self.0)))
    }
}

impl TypeReference for InputValueType {
    fn named_type(&self) -> NamedType<'_> {
        NamedType(Cow::Borrowed(named_type_from_type_str(&self.0)))
    }
}

impl TypeReference for NamedType<'_> {
    fn named_type(&self) -> NamedType<'_> {
        self.clone()
    }
}

impl TypeReference for MetaType {
    fn named_type(&self) -> NamedType<'_> {
        NamedType(Cow::Borrowed(self.name()))
    }
}

/// Strips the NonNull and List wrappers from a type string to get the
/// named type within.
pub fn named_type_from_type_str(meta: &str) -> &str {
    let mut nested = Some(meta);

    if meta.starts_with('[') && meta.ends_with(']') {
        nested = nested.and_then(|x| x.strip_prefix('['));
        nested = nested.and_then(|x| x.strip_suffix(']'));
        return named_type_from_type_str(nested.expect("Can't fail"));
    }

    if meta.ends_with('!') {
        nested = nested.and_then(|x| x.strip_suffix('!'));
        return named_type_from_type_str(nested.expect("Can't fail"));
    }

    nested.expect("Can't fail")
}

#[derive(Debug, PartialEq, Eq, Clone, Copy)]
pub enum WrappingType {
    NonNull,
    List,
}

pub struct WrappingTypeIter<'a>(std::str::Chars<'a>);

impl Iterator for WrappingTypeIter<'_> {
    type Item = WrappingType;

    fn next(&mut self) -> Option<Self::Item> {
        match self.0.next_back()? {
            '!' => Some(WrappingType::NonNull),
            ']' => Some(WrappingType::List),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_wrapping_type_iter() {
        let wrapping_types = |s: &str| MetaFieldType::from(s).wrapping_types().collect::<Vec<_>>();
        assert_eq!(wrapping_types("String"), vec![]);
        assert_eq!(wrapping_types("String!"), vec![WrappingType::NonNull]);
        assert_eq!(
            wrapping_types("[String]!"),
            vec![WrappingType::NonNull, WrappingType::List]
        );
        assert_eq!(wrapping_types("[String]"), vec![WrappingType::List]);
        assert_eq!(
            wrapping_types("[String!]"),
            vec![WrappingType::List, WrappingType::NonNull]
        );
        assert_eq!(
            wrapping_types("[String!]!"),
            vec![WrappingType::NonNull, WrappingType::List, WrappingType::NonNull]
        );
    }

    #[test]
    fn test_named_type_extraction() {
        assert_eq!(named_type_from_type_str("[Episode!]!"), "Episode");
        assert_eq!(named_type_from_type_str("Episode"), "Episode");
        assert_eq!(named_type_from_type_str("[[Int]]"), "Int");
    }

    #[test]
    fn test_meta_type_name() {
        assert_eq!(MetaTypeName::create("Int!"), MetaTypeName::NonNull("Int"));
        assert_eq!(MetaTypeName::create("[Int]"), MetaTypeName::List("Int"));
        assert_eq!(MetaTypeName::create("Int"), MetaTypeName::Named("Int"));
        assert!(MetaTypeName::create("[Int]!").is_list());
        assert!(!MetaTypeName::create("Int!").is_list());
    }
}
