//! Member model
//!
//! A [`Member`] is one named, typed accessor on a declaring type. Members are
//! chained into [`QualifiedMember`]s describing the path from a root object to
//! a value of interest.
//!
//! Copyright (c) 2025 Graft Team
//! Licensed under the Apache-2.0 license

pub mod qualified;
pub mod recursion;

pub use qualified::QualifiedMember;

use crate::registry::{TypeKey, TypeKind};
use std::fmt;
use std::hash::{Hash, Hasher};
use std::sync::Arc;

/// Name given to synthetic enumerable element members
pub const ELEMENT_MEMBER_NAME: &str = "[i]";

/// How a member is accessed
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum MemberKind {
    /// The whole source or target object
    Root,
    Field,
    Property,
    /// A getter method paired with a setter method
    AccessorPair,
    /// A parameterless getter method
    GetMethod,
    /// A single-parameter setter method
    SetMethod,
    ConstructorParameter,
    /// The element of an enumerable or array
    EnumerableElement,
    /// A runtime key of a dictionary-like object
    DictionaryEntry,
}

impl MemberKind {
    fn default_access(self) -> (bool, bool) {
        match self {
            MemberKind::GetMethod => (true, false),
            MemberKind::SetMethod | MemberKind::ConstructorParameter => (false, true),
            _ => (true, true),
        }
    }
}

impl fmt::Display for MemberKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            MemberKind::Root => "root",
            MemberKind::Field => "field",
            MemberKind::Property => "property",
            MemberKind::AccessorPair => "accessor pair",
            MemberKind::GetMethod => "get method",
            MemberKind::SetMethod => "set method",
            MemberKind::ConstructorParameter => "constructor parameter",
            MemberKind::EnumerableElement => "element",
            MemberKind::DictionaryEntry => "dictionary entry",
        };
        f.write_str(label)
    }
}

/// A named, typed accessor on a declaring type
///
/// Identity is structural: two members are equal when their declaring type,
/// name and kind are equal.
#[derive(Debug, Clone)]
pub struct Member {
    name: Arc<str>,
    declaring_type: TypeKey,
    value_type: TypeKey,
    value_kind: TypeKind,
    kind: MemberKind,
    readable: bool,
    writeable: bool,
    populatable: bool,
}

impl Member {
    /// Create a member with the default access of its kind
    pub fn new(
        kind: MemberKind,
        name: &str,
        declaring_type: TypeKey,
        value_type: TypeKey,
        value_kind: TypeKind,
    ) -> Self {
        let (readable, writeable) = kind.default_access();
        let populatable = writeable || Self::populates_in_place(&value_kind);
        Self {
            name: Arc::from(name),
            declaring_type,
            value_type,
            value_kind,
            kind,
            readable,
            writeable,
            populatable,
        }
    }

    /// The root member of an object of `root_type`
    pub fn root(root_type: TypeKey, value_kind: TypeKind) -> Self {
        let name = root_type.short_name().to_string();
        Self::new(MemberKind::Root, &name, root_type.clone(), root_type, value_kind)
    }

    /// The element member of an enumerable or array
    pub fn element(container: TypeKey, element_type: TypeKey, element_kind: TypeKind) -> Self {
        Self::new(
            MemberKind::EnumerableElement,
            ELEMENT_MEMBER_NAME,
            container,
            element_type,
            element_kind,
        )
    }

    /// Override readability and writeability
    pub fn with_access(mut self, readable: bool, writeable: bool) -> Self {
        self.readable = readable;
        self.writeable = writeable;
        self.populatable = writeable || Self::populates_in_place(&self.value_kind);
        self
    }

    /// Contents of complex values and growable collections can be populated
    /// through a read-only member; arrays and simple values cannot
    fn populates_in_place(kind: &TypeKind) -> bool {
        matches!(kind, TypeKind::Complex | TypeKind::Enumerable { .. } | TypeKind::Dictionary { .. })
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn declaring_type(&self) -> &TypeKey {
        &self.declaring_type
    }

    pub fn value_type(&self) -> &TypeKey {
        &self.value_type
    }

    pub fn value_kind(&self) -> &TypeKind {
        &self.value_kind
    }

    pub fn kind(&self) -> MemberKind {
        self.kind
    }

    pub fn is_readable(&self) -> bool {
        self.readable
    }

    pub fn is_writeable(&self) -> bool {
        self.writeable
    }

    /// Writeable, or a read-only container whose contents can be populated
    pub fn is_populatable(&self) -> bool {
        self.populatable
    }

    pub fn is_root(&self) -> bool {
        self.kind == MemberKind::Root
    }

    pub fn is_simple(&self) -> bool {
        self.value_kind.is_simple()
    }

    pub fn is_complex(&self) -> bool {
        matches!(self.value_kind, TypeKind::Complex)
    }

    /// Enumerable or array
    pub fn is_enumerable(&self) -> bool {
        self.value_kind.element_type().is_some()
    }

    pub fn is_array(&self) -> bool {
        matches!(self.value_kind, TypeKind::Array { .. })
    }

    pub fn is_dictionary(&self) -> bool {
        matches!(self.value_kind, TypeKind::Dictionary { .. })
    }

    pub fn element_type(&self) -> Option<&TypeKey> {
        self.value_kind.element_type()
    }

    /// Element type for enumerables, value type otherwise
    pub fn effective_type(&self) -> &TypeKey {
        self.element_type().unwrap_or(&self.value_type)
    }
}

impl PartialEq for Member {
    fn eq(&self, other: &Self) -> bool {
        self.kind == other.kind
            && self.name == other.name
            && self.declaring_type == other.declaring_type
    }
}

impl Eq for Member {}

impl Hash for Member {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.declaring_type.hash(state);
        self.name.hash(state);
        self.kind.hash(state);
    }
}

impl fmt::Display for Member {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}.{}", self.declaring_type, self.name)
    }
}
