//! Members synthesized from runtime dictionary keys
//!
//! Dictionaries and dynamic objects have no declared members; their members
//! are the keys present at runtime. [`DictionaryMemberDiscoverer`] decorates
//! another discoverer, answering with one `DictionaryEntry` member per
//! registered key and delegating every other type.
//!
//! Copyright (c) 2025 Graft Team
//! Licensed under the Apache-2.0 license

use super::{Constructor, MemberDiscoverer};
use crate::member::{Member, MemberKind};
use crate::registry::{TypeKey, TypeKind, TypeRegistry};
use crate::{Error, Result};
use rustc_hash::FxHashMap;
use std::sync::Arc;

/// One runtime key, optionally typed
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DictionaryKey {
    pub name: String,
    pub value_type: Option<TypeKey>,
}

impl DictionaryKey {
    /// A key typed as the dictionary's value type
    pub fn new(name: &str) -> Self {
        Self {
            name: name.to_string(),
            value_type: None,
        }
    }

    /// A key with its own value type
    pub fn typed(name: &str, value_type: impl Into<TypeKey>) -> Self {
        Self {
            name: name.to_string(),
            value_type: Some(value_type.into()),
        }
    }
}

/// Decorating discoverer for dictionary-like types
pub struct DictionaryMemberDiscoverer<D> {
    inner: D,
    registry: Arc<TypeRegistry>,
    entries: FxHashMap<TypeKey, Arc<[Member]>>,
}

impl<D: MemberDiscoverer> DictionaryMemberDiscoverer<D> {
    pub fn new(inner: D, registry: Arc<TypeRegistry>) -> Self {
        Self {
            inner,
            registry,
            entries: FxHashMap::default(),
        }
    }

    /// Register the runtime key set of `type_key`, replacing any earlier one
    ///
    /// Untyped keys take the dictionary's value type, or `Object` for
    /// non-dictionary types.
    pub fn with_keys(
        mut self,
        type_key: impl Into<TypeKey>,
        keys: impl IntoIterator<Item = DictionaryKey>,
    ) -> Result<Self> {
        let type_key = type_key.into();
        let default_type = match self.registry.kind(&type_key)? {
            TypeKind::Dictionary { value } => value.clone(),
            _ => TypeKey::object(),
        };

        let mut members: Vec<Member> = Vec::new();
        for key in keys {
            if key.name.is_empty() || members.iter().any(|m| m.name() == key.name) {
                return Err(Error::InvalidMemberPath {
                    type_name: type_key.to_string(),
                    path: key.name,
                });
            }
            let value_type = key.value_type.unwrap_or_else(|| default_type.clone());
            let value_kind = self.registry.kind(&value_type)?.clone();
            members.push(Member::new(
                MemberKind::DictionaryEntry,
                &key.name,
                type_key.clone(),
                value_type,
                value_kind,
            ));
        }

        tracing::debug!(type_name = %type_key, keys = members.len(), "registered dictionary keys");
        self.entries.insert(type_key, members.into());
        Ok(self)
    }

    pub fn inner(&self) -> &D {
        &self.inner
    }
}

impl<D: MemberDiscoverer> MemberDiscoverer for DictionaryMemberDiscoverer<D> {
    fn source_members(&self, type_key: &TypeKey) -> Result<Arc<[Member]>> {
        match self.entries.get(type_key) {
            Some(members) => Ok(Arc::clone(members)),
            None => self.inner.source_members(type_key),
        }
    }

    fn target_members(&self, type_key: &TypeKey) -> Result<Arc<[Member]>> {
        match self.entries.get(type_key) {
            Some(members) => Ok(Arc::clone(members)),
            None => self.inner.target_members(type_key),
        }
    }

    fn constructors(&self, type_key: &TypeKey) -> Result<Arc<[Constructor]>> {
        self.inner.constructors(type_key)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::discovery::TypeMetadataDiscoverer;
    use crate::registry::TypeDescriptor;

    fn discoverer() -> DictionaryMemberDiscoverer<TypeMetadataDiscoverer> {
        let registry = Arc::new(
            TypeRegistry::new()
                .with(TypeDescriptor::dictionary("Bag", "String"))
                .with(TypeDescriptor::complex("Point").property("X", "I32").build()),
        );
        DictionaryMemberDiscoverer::new(TypeMetadataDiscoverer::new(Arc::clone(&registry)), registry)
            .with_keys(
                "Bag",
                [
                    DictionaryKey::new("Name"),
                    DictionaryKey::typed("Age", "I32"),
                ],
            )
            .unwrap()
    }

    #[test]
    fn test_keys_become_entries_in_order() {
        let discoverer = discoverer();
        let members = discoverer.source_members(&TypeKey::new("Bag")).unwrap();
        assert_eq!(members.len(), 2);
        assert_eq!(members[0].name(), "Name");
        assert_eq!(members[0].value_type(), &TypeKey::string());
        assert_eq!(members[1].value_type(), &TypeKey::new("I32"));
        assert!(members
            .iter()
            .all(|m| m.kind() == MemberKind::DictionaryEntry && m.is_readable() && m.is_writeable()));

        let targets = discoverer.target_members(&TypeKey::new("Bag")).unwrap();
        assert!(Arc::ptr_eq(&members, &targets));
    }

    #[test]
    fn test_other_types_are_delegated() {
        let discoverer = discoverer();
        let members = discoverer.source_members(&TypeKey::new("Point")).unwrap();
        assert_eq!(members[0].kind(), MemberKind::Property);
    }

    #[test]
    fn test_duplicate_keys_are_rejected() {
        let registry = Arc::new(TypeRegistry::new().with(TypeDescriptor::dictionary("Bag", "String")));
        let result = DictionaryMemberDiscoverer::new(
            TypeMetadataDiscoverer::new(Arc::clone(&registry)),
            registry,
        )
        .with_keys("Bag", [DictionaryKey::new("A"), DictionaryKey::new("A")]);
        assert!(matches!(result, Err(Error::InvalidMemberPath { .. })));
    }
}
