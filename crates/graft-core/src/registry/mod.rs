//! Static type introspection
//!
//! The registry is the single introspection capability the engine relies on:
//! every type taking part in a mapping is registered here with its shape, and
//! discovery, matching and compilation only ever ask the registry.
//!
//! Copyright (c) 2025 Graft Team
//! Licensed under the Apache-2.0 license

pub mod descriptor;

pub use descriptor::{
    ConstructorDeclaration, MemberDeclaration, MemberShape, ParameterDeclaration,
    TypeDescriptor, TypeDescriptorBuilder, Visibility,
};

use crate::{Error, Result};
use rustc_hash::{FxHashMap, FxHashSet};
use std::fmt;
use std::sync::Arc;

/// Interned type identity
#[derive(Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct TypeKey(Arc<str>);

impl TypeKey {
    /// Create a key from a type name
    pub fn new(name: &str) -> Self {
        Self(Arc::from(name))
    }

    /// The universal base type
    pub fn object() -> Self {
        Self::new(OBJECT)
    }

    /// The built-in string type
    pub fn string() -> Self {
        Self::new("String")
    }

    /// The full type name
    pub fn name(&self) -> &str {
        &self.0
    }

    /// Type name without generic arguments or namespace
    pub fn short_name(&self) -> &str {
        let name = self.name();
        let name = name.split('<').next().unwrap_or(name);
        name.rsplit("::").next().unwrap_or(name)
    }

    /// Whether this is the universal base type
    pub fn is_object(&self) -> bool {
        self.name() == OBJECT
    }
}

impl fmt::Debug for TypeKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl fmt::Display for TypeKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<&str> for TypeKey {
    fn from(name: &str) -> Self {
        TypeKey::new(name)
    }
}

impl From<&TypeKey> for TypeKey {
    fn from(key: &TypeKey) -> Self {
        key.clone()
    }
}

/// Name of the universal base type
pub const OBJECT: &str = "Object";

/// Kinds of simple (leaf) values
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SimpleKind {
    Bool,
    Char,
    String,
    Integer { bits: u8, signed: bool },
    Float { bits: u8 },
    Decimal,
    Guid,
    DateTime,
    Enum,
}

impl SimpleKind {
    fn is_numeric(self) -> bool {
        matches!(
            self,
            SimpleKind::Integer { .. } | SimpleKind::Float { .. } | SimpleKind::Decimal
        )
    }

    /// Whether every value of `self` fits into `target` without loss
    fn widens_to(self, target: SimpleKind) -> bool {
        match (self, target) {
            (
                SimpleKind::Integer { bits: a, signed: sa },
                SimpleKind::Integer { bits: b, signed: sb },
            ) => {
                if sa == sb {
                    a <= b
                } else {
                    // unsigned into signed needs one spare bit
                    !sa && sb && a < b
                }
            }
            (SimpleKind::Integer { bits, .. }, SimpleKind::Float { bits: f }) => bits < f,
            (SimpleKind::Integer { .. }, SimpleKind::Decimal) => true,
            (SimpleKind::Float { bits: a }, SimpleKind::Float { bits: b }) => a <= b,
            _ => false,
        }
    }
}

/// Shape category of a registered type
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum TypeKind {
    Simple(SimpleKind),
    Complex,
    Enumerable { element: TypeKey },
    Array { element: TypeKey },
    Dictionary { value: TypeKey },
}

impl TypeKind {
    pub fn is_simple(&self) -> bool {
        matches!(self, TypeKind::Simple(_))
    }

    /// Element type of enumerables and arrays
    pub fn element_type(&self) -> Option<&TypeKey> {
        match self {
            TypeKind::Enumerable { element } | TypeKind::Array { element } => Some(element),
            _ => None,
        }
    }
}

/// How a simple value is converted when types differ
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ValueConversion {
    /// Same type, value is copied as-is
    Identity,
    /// Lossless numeric widening
    Widen,
    /// Numeric narrowing, may fail at runtime
    Narrow,
    /// Formatting to string
    Format,
    /// Parsing from string
    Parse,
    /// Enum to or from its numeric value, or enum to enum by name
    EnumValue,
}

impl ValueConversion {
    /// Whether the conversion can fail at runtime
    pub fn is_fallible(self) -> bool {
        matches!(
            self,
            ValueConversion::Narrow | ValueConversion::Parse | ValueConversion::EnumValue
        )
    }
}

/// Registry of type descriptors
#[derive(Debug, Clone)]
pub struct TypeRegistry {
    types: FxHashMap<TypeKey, Arc<TypeDescriptor>>,
}

impl TypeRegistry {
    /// Create a registry holding the universal base and the built-in simple types
    pub fn new() -> Self {
        let mut registry = Self {
            types: FxHashMap::default(),
        };
        registry.register(
            TypeDescriptor::complex(OBJECT)
                .method("GetHashCode", &[], Some("I32"))
                .method("GetType", &[], Some("String"))
                .method("ToString", &[], Some("String"))
                .method("Equals", &[OBJECT], Some("Bool"))
                .constructor(&[])
                .build(),
        );
        for (name, kind) in builtin_simple_types() {
            registry.register(TypeDescriptor::simple(name, kind));
        }
        registry
    }

    /// Register (or replace) a descriptor
    pub fn register(&mut self, descriptor: TypeDescriptor) {
        self.types
            .insert(descriptor.key.clone(), Arc::new(descriptor));
    }

    /// Chaining form of [`register`](Self::register)
    pub fn with(mut self, descriptor: TypeDescriptor) -> Self {
        self.register(descriptor);
        self
    }

    /// Look up a descriptor
    pub fn get(&self, key: &TypeKey) -> Result<&Arc<TypeDescriptor>> {
        self.types.get(key).ok_or_else(|| Error::UnknownType {
            type_name: key.to_string(),
        })
    }

    /// Whether the type is registered
    pub fn contains(&self, key: &TypeKey) -> bool {
        self.types.contains_key(key)
    }

    /// Kind of a registered type
    pub fn kind(&self, key: &TypeKey) -> Result<&TypeKind> {
        Ok(&self.get(key)?.kind)
    }

    /// Effective base type; complex types without one derive from `Object`
    pub fn base_of(&self, key: &TypeKey) -> Result<Option<TypeKey>> {
        let descriptor = self.get(key)?;
        if let Some(base) = &descriptor.base {
            return Ok(Some(base.clone()));
        }
        if descriptor.kind == TypeKind::Complex && !key.is_object() {
            return Ok(Some(TypeKey::object()));
        }
        Ok(None)
    }

    /// The type and its ancestors ordered base-first
    pub fn ancestry(&self, key: &TypeKey) -> Result<Vec<Arc<TypeDescriptor>>> {
        let mut chain = Vec::new();
        let mut seen = FxHashSet::default();
        let mut current = Some(key.clone());
        while let Some(key) = current {
            if !seen.insert(key.clone()) {
                break;
            }
            chain.push(Arc::clone(self.get(&key)?));
            current = self.base_of(&key)?;
        }
        chain.reverse();
        Ok(chain)
    }

    /// Whether a value of `from` can be used where `to` is expected
    pub fn is_assignable(&self, from: &TypeKey, to: &TypeKey) -> bool {
        if from == to {
            return true;
        }
        match self.ancestry(from) {
            Ok(chain) => chain.iter().any(|d| &d.key == to),
            Err(_) => false,
        }
    }

    /// How a simple `from` value converts into a simple `to` value, if at all
    pub fn conversion(&self, from: &TypeKey, to: &TypeKey) -> Option<ValueConversion> {
        if from == to {
            return Some(ValueConversion::Identity);
        }
        let (TypeKind::Simple(source), TypeKind::Simple(target)) =
            (self.kind(from).ok()?, self.kind(to).ok()?)
        else {
            return None;
        };
        let (source, target) = (*source, *target);
        if source == target && source != SimpleKind::Enum {
            return Some(ValueConversion::Identity);
        }
        match (source, target) {
            (_, SimpleKind::String) => Some(ValueConversion::Format),
            (SimpleKind::String, _) => Some(ValueConversion::Parse),
            (SimpleKind::Enum, SimpleKind::Enum) => Some(ValueConversion::EnumValue),
            (SimpleKind::Enum, t) if t.is_numeric() => Some(ValueConversion::EnumValue),
            (s, SimpleKind::Enum) if s.is_numeric() => Some(ValueConversion::EnumValue),
            (s, t) if s.widens_to(t) => Some(ValueConversion::Widen),
            (s, t) if s.is_numeric() && t.is_numeric() => Some(ValueConversion::Narrow),
            (SimpleKind::Char, SimpleKind::Integer { .. }) => Some(ValueConversion::Widen),
            _ => None,
        }
    }

    /// Number of registered types
    pub fn len(&self) -> usize {
        self.types.len()
    }

    pub fn is_empty(&self) -> bool {
        self.types.is_empty()
    }
}

impl Default for TypeRegistry {
    fn default() -> Self {
        Self::new()
    }
}

fn builtin_simple_types() -> Vec<(&'static str, SimpleKind)> {
    vec![
        ("Bool", SimpleKind::Bool),
        ("Char", SimpleKind::Char),
        ("String", SimpleKind::String),
        ("I8", SimpleKind::Integer { bits: 8, signed: true }),
        ("I16", SimpleKind::Integer { bits: 16, signed: true }),
        ("I32", SimpleKind::Integer { bits: 32, signed: true }),
        ("I64", SimpleKind::Integer { bits: 64, signed: true }),
        ("U8", SimpleKind::Integer { bits: 8, signed: false }),
        ("U16", SimpleKind::Integer { bits: 16, signed: false }),
        ("U32", SimpleKind::Integer { bits: 32, signed: false }),
        ("U64", SimpleKind::Integer { bits: 64, signed: false }),
        ("F32", SimpleKind::Float { bits: 32 }),
        ("F64", SimpleKind::Float { bits: 64 }),
        ("Decimal", SimpleKind::Decimal),
        ("Guid", SimpleKind::Guid),
        ("DateTime", SimpleKind::DateTime),
    ]
}

#[cfg(test)]
mod tests {
    use super::*;

    fn registry() -> TypeRegistry {
        TypeRegistry::new()
            .with(TypeDescriptor::complex("Entity").property("Id", "I32").build())
            .with(
                TypeDescriptor::complex("Customer")
                    .base("Entity")
                    .property("Name", "String")
                    .build(),
            )
            .with(TypeDescriptor::simple("Color", SimpleKind::Enum))
    }

    #[test]
    fn test_unknown_type_is_an_error() {
        let registry = registry();
        let err = registry.get(&TypeKey::new("Missing")).unwrap_err();
        assert!(matches!(err, Error::UnknownType { ref type_name } if type_name == "Missing"));
    }

    #[test]
    fn test_ancestry_is_base_first() {
        let registry = registry();
        let chain = registry.ancestry(&TypeKey::new("Customer")).unwrap();
        let names: Vec<_> = chain.iter().map(|d| d.key.name().to_string()).collect();
        assert_eq!(names, vec!["Object", "Entity", "Customer"]);
    }

    #[test]
    fn test_assignability_follows_base_chain() {
        let registry = registry();
        let customer = TypeKey::new("Customer");
        assert!(registry.is_assignable(&customer, &TypeKey::new("Entity")));
        assert!(registry.is_assignable(&customer, &TypeKey::object()));
        assert!(!registry.is_assignable(&TypeKey::new("Entity"), &customer));
    }

    #[test]
    fn test_numeric_conversions() {
        let registry = registry();
        let key = TypeKey::new;
        assert_eq!(registry.conversion(&key("I32"), &key("I32")), Some(ValueConversion::Identity));
        assert_eq!(registry.conversion(&key("I32"), &key("I64")), Some(ValueConversion::Widen));
        assert_eq!(registry.conversion(&key("U32"), &key("I64")), Some(ValueConversion::Widen));
        assert_eq!(registry.conversion(&key("U32"), &key("I32")), Some(ValueConversion::Narrow));
        assert_eq!(registry.conversion(&key("I64"), &key("I32")), Some(ValueConversion::Narrow));
        assert_eq!(registry.conversion(&key("I32"), &key("F64")), Some(ValueConversion::Widen));
        assert_eq!(registry.conversion(&key("I32"), &key("String")), Some(ValueConversion::Format));
        assert_eq!(registry.conversion(&key("String"), &key("Guid")), Some(ValueConversion::Parse));
        assert_eq!(registry.conversion(&key("Color"), &key("I32")), Some(ValueConversion::EnumValue));
        assert_eq!(registry.conversion(&key("Guid"), &key("I32")), None);
        assert_eq!(registry.conversion(&key("Customer"), &key("String")), None);
    }

    #[test]
    fn test_short_name() {
        assert_eq!(TypeKey::new("List<Order>").short_name(), "List");
        assert_eq!(TypeKey::new("crm::Customer").short_name(), "Customer");
        assert_eq!(TypeKey::new("Customer").short_name(), "Customer");
    }
}
