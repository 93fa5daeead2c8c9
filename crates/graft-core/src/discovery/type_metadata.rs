//! Discovery over registered type metadata
//!
//! Copyright (c) 2025 Graft Team
//! Licensed under the Apache-2.0 license

use super::conventions::{getter_name, setter_name};
use super::{Constructor, ConstructorParameter, MemberDiscoverer};
use crate::cache::{CacheStats, KeyComparison, MemoCache};
use crate::member::{Member, MemberKind};
use crate::registry::{MemberDeclaration, MemberShape, TypeKey, TypeKind, TypeRegistry};
use crate::Result;
use std::sync::Arc;
use tracing::debug;

/// A member as seen after folding inherited and paired declarations
#[derive(Debug, Clone)]
struct LogicalMember {
    name: String,
    declaring_type: TypeKey,
    value_type: TypeKey,
    kind: MemberKind,
    readable: bool,
    writeable: bool,
}

impl LogicalMember {
    fn from_declaration(declaring_type: &TypeKey, declaration: &MemberDeclaration) -> Option<Self> {
        let (name, kind, value_type, readable, writeable) = match &declaration.shape {
            MemberShape::Field { readonly } => (
                declaration.name.as_str(),
                MemberKind::Field,
                declaration.value_type.clone(),
                true,
                !readonly,
            ),
            MemberShape::Property { get, set } => (
                declaration.name.as_str(),
                MemberKind::Property,
                declaration.value_type.clone(),
                *get,
                *set,
            ),
            MemberShape::Method {
                parameters,
                returns,
            } => match (parameters.as_slice(), returns) {
                ([], Some(returns)) => {
                    let name = getter_name(&declaration.name)?;
                    (name, MemberKind::GetMethod, returns.clone(), true, false)
                }
                ([parameter], _) => {
                    let name = setter_name(&declaration.name)?;
                    (name, MemberKind::SetMethod, parameter.clone(), false, true)
                }
                _ => return None,
            },
        };
        Some(Self {
            name: name.to_string(),
            declaring_type: declaring_type.clone(),
            value_type,
            kind,
            readable,
            writeable,
        })
    }

    /// Fold a later declaration of the same name into this one
    fn absorb(&mut self, later: LogicalMember) {
        match (self.kind, later.kind) {
            (MemberKind::GetMethod, MemberKind::SetMethod)
            | (MemberKind::SetMethod, MemberKind::GetMethod)
            | (MemberKind::AccessorPair, MemberKind::GetMethod)
            | (MemberKind::AccessorPair, MemberKind::SetMethod) => {
                // getter's type wins for pairs
                if later.kind == MemberKind::GetMethod {
                    self.value_type = later.value_type;
                }
                self.declaring_type = later.declaring_type;
                self.kind = MemberKind::AccessorPair;
                self.readable = true;
                self.writeable = true;
            }
            _ => *self = later,
        }
    }
}

/// Discovers members from the static [`TypeRegistry`], memoizing per type
pub struct TypeMetadataDiscoverer {
    registry: Arc<TypeRegistry>,
    sources: MemoCache<TypeKey, Arc<[Member]>>,
    targets: MemoCache<TypeKey, Arc<[Member]>>,
    constructors: MemoCache<TypeKey, Arc<[Constructor]>>,
}

impl TypeMetadataDiscoverer {
    pub fn new(registry: Arc<TypeRegistry>) -> Self {
        Self {
            registry,
            sources: MemoCache::new("source_members", KeyComparison::HashOrdered),
            targets: MemoCache::new("target_members", KeyComparison::HashOrdered),
            constructors: MemoCache::new("constructors", KeyComparison::HashOrdered),
        }
    }

    pub fn registry(&self) -> &Arc<TypeRegistry> {
        &self.registry
    }

    /// Clear every memoized discovery result
    pub fn reset(&self) {
        self.sources.reset();
        self.targets.reset();
        self.constructors.reset();
    }

    pub fn stats(&self) -> Vec<CacheStats> {
        vec![
            self.sources.stats(),
            self.targets.stats(),
            self.constructors.stats(),
        ]
    }

    /// Public declared members of the type and its ancestors, folded
    /// base-first, `Object` excluded
    fn logical_members(&self, type_key: &TypeKey) -> Result<Vec<LogicalMember>> {
        let mut members: Vec<LogicalMember> = Vec::new();
        for descriptor in self.registry.ancestry(type_key)? {
            if descriptor.key.is_object() {
                continue;
            }
            let declared = descriptor
                .members
                .iter()
                .filter(|d| d.is_public())
                .filter_map(|d| LogicalMember::from_declaration(&descriptor.key, d));
            for member in declared {
                match members.iter_mut().find(|m| m.name == member.name) {
                    Some(existing) => existing.absorb(member),
                    None => members.push(member),
                }
            }
        }
        Ok(members)
    }

    fn to_member(&self, logical: LogicalMember) -> Result<Member> {
        let value_kind = self.registry.kind(&logical.value_type)?.clone();
        Ok(Member::new(
            logical.kind,
            &logical.name,
            logical.declaring_type,
            logical.value_type,
            value_kind,
        )
        .with_access(logical.readable, logical.writeable))
    }

    fn element_members(&self, type_key: &TypeKey, element: &TypeKey) -> Result<Arc<[Member]>> {
        let element_kind = self.registry.kind(element)?.clone();
        Ok(Arc::from(vec![Member::element(
            type_key.clone(),
            element.clone(),
            element_kind,
        )]))
    }

    fn discover_sources(&self, type_key: &TypeKey) -> Result<Arc<[Member]>> {
        match self.registry.kind(type_key)? {
            TypeKind::Complex => {}
            TypeKind::Enumerable { element } | TypeKind::Array { element } => {
                return self.element_members(type_key, element)
            }
            TypeKind::Simple(_) | TypeKind::Dictionary { .. } => return Ok(Arc::from(Vec::new())),
        }
        let members = self
            .logical_members(type_key)?
            .into_iter()
            .filter(|m| m.readable)
            .map(|m| self.to_member(m))
            .collect::<Result<Vec<_>>>()?;
        debug!(type_name = %type_key, count = members.len(), "discovered source members");
        Ok(members.into())
    }

    fn discover_targets(&self, type_key: &TypeKey) -> Result<Arc<[Member]>> {
        match self.registry.kind(type_key)? {
            TypeKind::Complex => {}
            TypeKind::Enumerable { element } | TypeKind::Array { element } => {
                return self.element_members(type_key, element)
            }
            TypeKind::Simple(_) | TypeKind::Dictionary { .. } => return Ok(Arc::from(Vec::new())),
        }
        let mut members = Vec::new();
        for logical in self.logical_members(type_key)? {
            let member = self.to_member(logical)?;
            if member.is_populatable() {
                members.push(member);
            }
        }
        if let Some(greediest) = self.constructors(type_key)?.first() {
            members.extend(greediest.parameters.iter().map(|p| p.member.clone()));
        }
        debug!(type_name = %type_key, count = members.len(), "discovered target members");
        Ok(members.into())
    }

    fn discover_constructors(&self, type_key: &TypeKey) -> Result<Arc<[Constructor]>> {
        let descriptor = self.registry.get(type_key)?;
        if descriptor.is_abstract || descriptor.kind != TypeKind::Complex {
            return Ok(Arc::from(Vec::new()));
        }
        let mut constructors = Vec::new();
        for declaration in descriptor.public_constructors() {
            let parameters = declaration
                .parameters
                .iter()
                .map(|p| {
                    let value_kind = self.registry.kind(&p.value_type)?.clone();
                    Ok(ConstructorParameter {
                        member: Member::new(
                            MemberKind::ConstructorParameter,
                            &p.name,
                            type_key.clone(),
                            p.value_type.clone(),
                            value_kind,
                        ),
                        optional: p.optional,
                    })
                })
                .collect::<Result<Vec<_>>>()?;
            constructors.push(Constructor { parameters });
        }
        Ok(constructors.into())
    }
}

impl MemberDiscoverer for TypeMetadataDiscoverer {
    fn source_members(&self, type_key: &TypeKey) -> Result<Arc<[Member]>> {
        self.sources
            .get_or_try_add(type_key.clone(), |key| self.discover_sources(key))
    }

    fn target_members(&self, type_key: &TypeKey) -> Result<Arc<[Member]>> {
        self.targets
            .get_or_try_add(type_key.clone(), |key| self.discover_targets(key))
    }

    fn constructors(&self, type_key: &TypeKey) -> Result<Arc<[Constructor]>> {
        self.constructors
            .get_or_try_add(type_key.clone(), |key| self.discover_constructors(key))
    }
}

impl std::fmt::Debug for TypeMetadataDiscoverer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TypeMetadataDiscoverer")
            .field("types", &self.registry.len())
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::registry::TypeDescriptor;
    use crate::Error;

    fn registry() -> Arc<TypeRegistry> {
        let registry = TypeRegistry::new()
            .with(
                TypeDescriptor::complex("Entity")
                    .property("Id", "I32")
                    .property("Name", "String")
                    .build(),
            )
            .with(
                TypeDescriptor::complex("Customer")
                    .base("Entity")
                    .property("Email", "String")
                    .property("Name", "String")
                    .read_only_property("Address", "Address")
                    .read_only_property("Tags", "List<String>")
                    .read_only_property("Scores", "I32[]")
                    .read_only_property("Created", "DateTime")
                    .write_only_property("Password", "String")
                    .private_property("Secret", "String")
                    .method("GetRank", &[], Some("I32"))
                    .method("SetRank", &["I32"], None)
                    .method("get_nickname", &[], Some("String"))
                    .method("SetNote", &["String"], None)
                    .method("Recalculate", &[], None)
                    .constructor(&[])
                    .constructor(&[("name", "String"), ("email", "String")])
                    .build(),
            )
            .with(TypeDescriptor::complex("Address").property("Line1", "String").build())
            .with(TypeDescriptor::enumerable("List<String>", "String"))
            .with(TypeDescriptor::array("I32[]", "I32"));
        Arc::new(registry)
    }

    fn names(members: &[Member]) -> Vec<&str> {
        members.iter().map(Member::name).collect()
    }

    #[test]
    fn test_source_members_base_first() {
        let discoverer = TypeMetadataDiscoverer::new(registry());
        let members = discoverer.source_members(&TypeKey::new("Customer")).unwrap();
        assert_eq!(
            names(&members),
            vec![
                "Id", "Name", "Email", "Address", "Tags", "Scores", "Created", "Rank", "nickname"
            ]
        );
        // redeclared Name keeps its base position with the derived declaration
        assert_eq!(members[1].declaring_type(), &TypeKey::new("Customer"));
        assert_eq!(members[7].kind(), MemberKind::AccessorPair);
        assert_eq!(members[8].kind(), MemberKind::GetMethod);
    }

    #[test]
    fn test_object_members_are_never_candidates() {
        let discoverer = TypeMetadataDiscoverer::new(registry());
        let members = discoverer.source_members(&TypeKey::new("Customer")).unwrap();
        for excluded in ["HashCode", "Type", "ToString", "Equals"] {
            assert!(!names(&members).contains(&excluded));
        }
    }

    #[test]
    fn test_target_members_filter_read_only() {
        let discoverer = TypeMetadataDiscoverer::new(registry());
        let members = discoverer.target_members(&TypeKey::new("Customer")).unwrap();
        assert_eq!(
            names(&members),
            vec![
                "Id", "Name", "Email", "Address", "Tags", "Password", "Rank", "Note", "name",
                "email"
            ]
        );

        let address = &members[3];
        assert!(!address.is_writeable());
        assert!(address.is_populatable());
        assert_eq!(members[8].kind(), MemberKind::ConstructorParameter);
    }

    #[test]
    fn test_constructors_greediest_first() {
        let discoverer = TypeMetadataDiscoverer::new(registry());
        let constructors = discoverer.constructors(&TypeKey::new("Customer")).unwrap();
        assert_eq!(constructors.len(), 2);
        assert_eq!(constructors[0].arity(), 2);
        assert!(constructors[1].is_parameterless());
        assert_eq!(constructors[0].to_string(), "new(name: String, email: String)");
    }

    #[test]
    fn test_enumerables_expose_their_element() {
        let discoverer = TypeMetadataDiscoverer::new(registry());
        let members = discoverer.source_members(&TypeKey::new("List<String>")).unwrap();
        assert_eq!(members.len(), 1);
        assert_eq!(members[0].kind(), MemberKind::EnumerableElement);
        assert_eq!(members[0].value_type(), &TypeKey::string());
    }

    #[test]
    fn test_members_are_memoized() {
        let discoverer = TypeMetadataDiscoverer::new(registry());
        let first = discoverer.source_members(&TypeKey::new("Address")).unwrap();
        let second = discoverer.source_members(&TypeKey::new("Address")).unwrap();
        assert!(Arc::ptr_eq(&first, &second));
    }

    #[test]
    fn test_empty_and_unknown_types() {
        let discoverer = TypeMetadataDiscoverer::new(Arc::new(
            TypeRegistry::new().with(TypeDescriptor::complex("Empty").build()),
        ));
        assert!(discoverer.target_members(&TypeKey::new("Empty")).unwrap().is_empty());

        let err = discoverer.source_members(&TypeKey::new("Missing")).unwrap_err();
        assert!(matches!(err, Error::UnknownType { .. }));
        let stats = discoverer.stats();
        assert_eq!(stats[0].entries, 0);
        assert_eq!(stats[1].entries, 1);
    }
}
