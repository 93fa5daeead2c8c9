//! Member discovery
//!
//! A [`MemberDiscoverer`] answers which members of a type can be read (source
//! side) or populated (target side), and which constructors can create it.
//! Results are ordered, immutable and shared.
//!
//! Copyright (c) 2025 Graft Team
//! Licensed under the Apache-2.0 license

pub mod conventions;
pub mod dictionary;
pub mod type_metadata;

pub use dictionary::{DictionaryKey, DictionaryMemberDiscoverer};
pub use type_metadata::TypeMetadataDiscoverer;

use crate::member::Member;
use crate::registry::TypeKey;
use crate::Result;
use std::fmt;
use std::sync::Arc;

/// One constructor parameter, as a target member
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConstructorParameter {
    pub member: Member,
    /// Optional parameters never block construction
    pub optional: bool,
}

/// A public constructor of a target type
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Constructor {
    pub parameters: Vec<ConstructorParameter>,
}

impl Constructor {
    /// Whether the constructor takes no arguments
    pub fn is_parameterless(&self) -> bool {
        self.parameters.is_empty()
    }

    /// Number of parameters
    pub fn arity(&self) -> usize {
        self.parameters.len()
    }
}

impl fmt::Display for Constructor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let parameters: Vec<String> = self
            .parameters
            .iter()
            .map(|p| format!("{}: {}", p.member.name(), p.member.value_type()))
            .collect();
        write!(f, "new({})", parameters.join(", "))
    }
}

/// Source of the members the matcher and compiler work with
pub trait MemberDiscoverer: Send + Sync {
    /// Readable members of `type_key`, in discovery order
    fn source_members(&self, type_key: &TypeKey) -> Result<Arc<[Member]>>;

    /// Writeable or populatable members of `type_key`, in discovery order,
    /// followed by the parameters of its greediest public constructor
    fn target_members(&self, type_key: &TypeKey) -> Result<Arc<[Member]>>;

    /// Public constructors of `type_key`, greediest first
    fn constructors(&self, type_key: &TypeKey) -> Result<Arc<[Constructor]>>;
}

impl<D: MemberDiscoverer + ?Sized> MemberDiscoverer for Arc<D> {
    fn source_members(&self, type_key: &TypeKey) -> Result<Arc<[Member]>> {
        (**self).source_members(type_key)
    }

    fn target_members(&self, type_key: &TypeKey) -> Result<Arc<[Member]>> {
        (**self).target_members(type_key)
    }

    fn constructors(&self, type_key: &TypeKey) -> Result<Arc<[Constructor]>> {
        (**self).constructors(type_key)
    }
}
