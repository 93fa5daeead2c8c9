//! Recursion detection over member chains
//!
//! A chain is recursive when its leaf revisits a type already present on the
//! chain. Detection bounds *plan* expansion at compile time; runtime cycles in
//! object graphs are handled separately by already-mapped-object tracking.
//!
//! Rules:
//! - the root member never counts;
//! - a member's effective type is its element type for enumerables and arrays,
//!   its value type otherwise;
//! - element members are folded into their enumerable container, so
//!   `Parent.Children[i]` is not a revisit of `Children`;
//! - simple and `Object` leaves are never recursive.
//!
//! Copyright (c) 2025 Graft Team
//! Licensed under the Apache-2.0 license

use super::{Member, MemberKind, QualifiedMember};

/// Whether the qualified member's leaf revisits a type on its own chain
pub fn is_recursive(member: &QualifiedMember) -> bool {
    member.recursion_depth() > 0
}

/// Number of earlier (non-root, folded) chain members whose effective type
/// equals the leaf's effective type
pub fn recursion_depth(chain: &[Member]) -> usize {
    let Some(leaf) = chain.last() else {
        return 0;
    };
    if leaf.is_root() || leaf.is_simple() || leaf.effective_type().is_object() {
        return 0;
    }

    let folded: Vec<&Member> = chain[1..]
        .iter()
        .filter(|m| m.kind() != MemberKind::EnumerableElement)
        .collect();
    let Some((_, earlier)) = folded.split_last() else {
        return 0;
    };

    let leaf_type = leaf.effective_type();
    earlier
        .iter()
        .filter(|m| m.effective_type() == leaf_type)
        .count()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::registry::{SimpleKind, TypeKey, TypeKind};

    fn complex(declaring: &str, name: &str, value: &str) -> Member {
        Member::new(
            MemberKind::Property,
            name,
            TypeKey::new(declaring),
            TypeKey::new(value),
            TypeKind::Complex,
        )
    }

    fn list(declaring: &str, name: &str, element: &str) -> Member {
        Member::new(
            MemberKind::Property,
            name,
            TypeKey::new(declaring),
            TypeKey::new(&format!("List<{element}>")),
            TypeKind::Enumerable {
                element: TypeKey::new(element),
            },
        )
    }

    fn element(element: &str) -> Member {
        Member::element(
            TypeKey::new(&format!("List<{element}>")),
            TypeKey::new(element),
            TypeKind::Complex,
        )
    }

    fn root(name: &str) -> QualifiedMember {
        QualifiedMember::root(TypeKey::new(name), TypeKind::Complex)
    }

    #[test]
    fn test_single_child_is_not_recursive() {
        let child = root("A").append(complex("A", "Child", "C"));
        assert!(!is_recursive(&child));
    }

    #[test]
    fn test_revisited_child_is_recursive() {
        let chain = root("A")
            .append(complex("A", "Child", "C"))
            .append(complex("C", "Parent", "A"));
        assert!(!is_recursive(&chain));

        let chain = chain.append(complex("A", "Child", "C"));
        assert!(is_recursive(&chain));
        assert_eq!(chain.recursion_depth(), 1);
    }

    #[test]
    fn test_self_reference_one_level() {
        let next = root("Node").append(complex("Node", "Next", "Node"));
        assert!(!next.is_recursive());

        let next_next = next.append(complex("Node", "Next", "Node"));
        assert!(next_next.is_recursive());

        let third = next_next.append(complex("Node", "Next", "Node"));
        assert_eq!(third.recursion_depth(), 2);
    }

    #[test]
    fn test_elements_fold_into_their_container() {
        let children = root("Category").append(list("Category", "Children", "Category"));
        assert!(!children.is_recursive());

        let child = children.append(element("Category"));
        assert!(!child.is_recursive());

        let grandchildren = child.append(list("Category", "Children", "Category"));
        assert!(grandchildren.is_recursive());

        let grandchild = grandchildren.append(element("Category"));
        assert!(grandchild.is_recursive());
    }

    #[test]
    fn test_simple_leaves_are_never_recursive() {
        let name = root("Node")
            .append(complex("Node", "Next", "Node"))
            .append(Member::new(
                MemberKind::Property,
                "Name",
                TypeKey::new("Node"),
                TypeKey::string(),
                TypeKind::Simple(SimpleKind::String),
            ));
        assert!(!name.is_recursive());
    }
}
