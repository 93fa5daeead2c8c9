//! Qualified members: root-to-leaf member chains
//!
//! Copyright (c) 2025 Graft Team
//! Licensed under the Apache-2.0 license

use super::{recursion, Member, MemberKind};
use crate::registry::{TypeKey, TypeKind};
use std::fmt;
use std::hash::{Hash, Hasher};
use std::sync::Arc;

/// An ordered, non-empty member chain starting at a root member
///
/// Chains are immutable and cheap to clone; appending creates a new chain.
#[derive(Clone)]
pub struct QualifiedMember {
    chain: Arc<[Member]>,
    recursion_depth: usize,
}

impl QualifiedMember {
    /// A chain holding only the root member of `root_type`
    pub fn root(root_type: TypeKey, value_kind: TypeKind) -> Self {
        Self::from_chain(vec![Member::root(root_type, value_kind)])
    }

    fn from_chain(chain: Vec<Member>) -> Self {
        debug_assert!(chain.first().is_some_and(Member::is_root));
        let recursion_depth = recursion::recursion_depth(&chain);
        Self {
            chain: chain.into(),
            recursion_depth,
        }
    }

    /// A new chain extending this one with `member`
    pub fn append(&self, member: Member) -> Self {
        let mut chain = Vec::with_capacity(self.chain.len() + 1);
        chain.extend(self.chain.iter().cloned());
        chain.push(member);
        Self::from_chain(chain)
    }

    /// The chain without its leaf, or `None` for a root
    pub fn parent(&self) -> Option<Self> {
        if self.is_root() {
            return None;
        }
        Some(Self::from_chain(self.chain[..self.chain.len() - 1].to_vec()))
    }

    pub fn leaf(&self) -> &Member {
        &self.chain[self.chain.len() - 1]
    }

    pub fn root_member(&self) -> &Member {
        &self.chain[0]
    }

    /// Type of the root object
    pub fn root_type(&self) -> &TypeKey {
        self.root_member().value_type()
    }

    pub fn members(&self) -> &[Member] {
        &self.chain
    }

    /// Chain length, counting the root
    pub fn depth(&self) -> usize {
        self.chain.len()
    }

    pub fn is_root(&self) -> bool {
        self.chain.len() == 1
    }

    /// Whether the leaf revisits a type already on this chain
    pub fn is_recursive(&self) -> bool {
        self.recursion_depth > 0
    }

    /// Number of earlier chain members sharing the leaf's effective type
    pub fn recursion_depth(&self) -> usize {
        self.recursion_depth
    }

    /// Member names after the root
    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.chain[1..].iter().map(Member::name)
    }

    /// Names after the root joined with `separator`, skipping element members
    pub fn joined_name(&self, separator: &str) -> String {
        self.chain[1..]
            .iter()
            .filter(|m| m.kind() != MemberKind::EnumerableElement)
            .map(Member::name)
            .collect::<Vec<_>>()
            .join(separator)
    }

    /// Dotted path after the root; element members render as `[i]`
    pub fn path(&self) -> String {
        self.relative_path(0)
    }

    /// Dotted path after the chain member at `from`
    pub fn relative_path(&self, from: usize) -> String {
        let mut path = String::new();
        for member in self.chain.iter().skip(from + 1) {
            if member.kind() != MemberKind::EnumerableElement && !path.is_empty() {
                path.push('.');
            }
            path.push_str(member.name());
        }
        path
    }

    /// Whether `other` is a prefix of this chain
    pub fn starts_with(&self, other: &QualifiedMember) -> bool {
        other.chain.len() <= self.chain.len() && self.chain[..other.chain.len()] == other.chain[..]
    }

    /// Intermediate members between the root and the leaf
    pub fn intermediates(&self) -> &[Member] {
        if self.chain.len() <= 2 {
            &[]
        } else {
            &self.chain[1..self.chain.len() - 1]
        }
    }

    /// Prefixes of this chain ending at each intermediate member
    pub fn intermediate_chains(&self) -> Vec<QualifiedMember> {
        (2..self.chain.len())
            .map(|end| Self::from_chain(self.chain[..end].to_vec()))
            .collect()
    }
}

impl PartialEq for QualifiedMember {
    fn eq(&self, other: &Self) -> bool {
        Arc::ptr_eq(&self.chain, &other.chain) || self.chain == other.chain
    }
}

impl Eq for QualifiedMember {}

impl Hash for QualifiedMember {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.chain.hash(state);
    }
}

impl fmt::Display for QualifiedMember {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.is_root() {
            write!(f, "{}", self.root_type())
        } else {
            write!(f, "{}", self.path())
        }
    }
}

impl fmt::Debug for QualifiedMember {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "QualifiedMember({}: {})", self.root_type(), self.path())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::registry::SimpleKind;

    fn property(declaring: &str, name: &str, value: &str, kind: TypeKind) -> Member {
        Member::new(
            MemberKind::Property,
            name,
            TypeKey::new(declaring),
            TypeKey::new(value),
            kind,
        )
    }

    fn order_line() -> QualifiedMember {
        QualifiedMember::root(TypeKey::new("Order"), TypeKind::Complex)
            .append(property(
                "Order",
                "Lines",
                "List<Line>",
                TypeKind::Enumerable {
                    element: TypeKey::new("Line"),
                },
            ))
            .append(Member::element(
                TypeKey::new("List<Line>"),
                TypeKey::new("Line"),
                TypeKind::Complex,
            ))
            .append(property(
                "Line",
                "Sku",
                "String",
                TypeKind::Simple(SimpleKind::String),
            ))
    }

    #[test]
    fn test_root_chain() {
        let root = QualifiedMember::root(TypeKey::new("Order"), TypeKind::Complex);
        assert!(root.is_root());
        assert_eq!(root.depth(), 1);
        assert_eq!(root.path(), "");
        assert_eq!(root.to_string(), "Order");
        assert!(root.parent().is_none());
    }

    #[test]
    fn test_path_renders_elements() {
        let line = order_line();
        assert_eq!(line.depth(), 4);
        assert_eq!(line.path(), "Lines[i].Sku");
        assert_eq!(line.relative_path(2), "Sku");
        assert_eq!(line.relative_path(1), "[i].Sku");
        assert_eq!(line.joined_name(""), "LinesSku");
        assert_eq!(line.names().collect::<Vec<_>>(), vec!["Lines", "[i]", "Sku"]);
    }

    #[test]
    fn test_structural_equality() {
        assert_eq!(order_line(), order_line());
        let parent = order_line().parent().unwrap();
        assert_ne!(parent, order_line());
        assert!(order_line().starts_with(&parent));
        assert!(!parent.starts_with(&order_line()));
    }

    #[test]
    fn test_intermediates() {
        let line = order_line();
        assert_eq!(line.intermediates().len(), 2);
        let chains = line.intermediate_chains();
        assert_eq!(chains.len(), 2);
        assert_eq!(chains[0].path(), "Lines");
        assert_eq!(chains[1].path(), "Lines[i]");
    }
}
