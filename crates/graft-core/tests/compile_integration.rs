//! Integration tests for plan compilation through the mapper
//!
//! - Determinism and compute-once caching
//! - Flattening, nesting, collections and recursion
//! - Configuration errors and failed compiles

mod test_support;

use graft_core::{
    Construction, DictionaryKey, DictionaryMemberDiscoverer, EngineSettings, Error, Guard,
    KeyComparison, Mapper, MemberRule, RuleSetKind, TypeDescriptor, TypeMetadataDiscoverer,
    TypeRegistry, UnpopulatedReason,
};
use serde_json::json;
use std::sync::{Arc, Barrier};
use test_support::{child_plan, key, mapper, source_path};

// ============================================================================
// CACHING
// ============================================================================

#[test]
fn test_compilation_is_deterministic() {
    let first = mapper()
        .plan_for(&key("Customer"), &key("CustomerDto"), RuleSetKind::CreateNew)
        .unwrap();
    let second = mapper()
        .plan_for(&key("Customer"), &key("CustomerDto"), RuleSetKind::CreateNew)
        .unwrap();
    assert_eq!(first, second);
    assert_eq!(first.to_string(), second.to_string());
}

#[test]
fn test_plan_compiled_once_across_threads() {
    let mapper = mapper();
    let threads = 8;
    let barrier = Barrier::new(threads);

    let plans: Vec<_> = std::thread::scope(|scope| {
        let handles: Vec<_> = (0..threads)
            .map(|_| {
                scope.spawn(|| {
                    barrier.wait();
                    mapper
                        .plan_for(&key("Customer"), &key("CustomerDto"), RuleSetKind::CreateNew)
                        .unwrap()
                })
            })
            .collect();
        handles.into_iter().map(|h| h.join().unwrap()).collect()
    });

    assert!(plans.windows(2).all(|w| Arc::ptr_eq(&w[0], &w[1])));
    let stats = &mapper.stats()[0];
    assert_eq!(stats.misses, 1);
    assert_eq!(stats.hits, threads as u64 - 1);
}

#[test]
fn test_equal_keys_share_a_plan() {
    for plan_cache in [KeyComparison::Equality, KeyComparison::HashOrdered] {
        let settings = EngineSettings {
            plan_cache,
            ..EngineSettings::default()
        };
        let mapper = Mapper::with_settings(Arc::new(test_support::commerce_registry()), &settings)
            .unwrap();
        let a = mapper
            .plan_for(&key("Node"), &key("NodeDto"), RuleSetKind::CreateNew)
            .unwrap();
        let b = mapper
            .plan_for(&key("Node"), &key("NodeDto"), RuleSetKind::CreateNew)
            .unwrap();
        assert!(Arc::ptr_eq(&a, &b));
        assert_eq!(mapper.stats()[0].comparison, plan_cache);
    }
}

// ============================================================================
// PLAN SHAPE
// ============================================================================

#[test]
fn test_flattened_member_guarded_by_parent_null_check() {
    let plan = mapper()
        .plan_for(&key("Customer"), &key("CustomerDto"), RuleSetKind::CreateNew)
        .unwrap();
    let line1 = plan.population("AddressLine1").unwrap();
    assert_eq!(source_path(line1), "Address.Line1");
    assert_eq!(line1.guard, Some(Guard::NotNull("Address".to_string())));
    assert!(line1.null_group.is_some());
}

#[test]
fn test_unmatched_members_do_not_fail() {
    let plan = mapper()
        .plan_for(&key("Customer"), &key("CustomerDto"), RuleSetKind::CreateNew)
        .unwrap();
    let extra = plan.population("Extra").unwrap();
    assert_eq!(extra.unpopulated, Some(UnpopulatedReason::NoMatchingSource));

    let unmapped = plan.unmapped_members();
    assert!(unmapped.contains(&"Extra".to_string()));
    assert!(unmapped.contains(&"Manager.Extra".to_string()));
}

#[test]
fn test_recursive_structures_terminate() {
    let mapper = mapper();
    let plan = mapper
        .plan_for(&key("Node"), &key("NodeDto"), RuleSetKind::CreateNew)
        .unwrap();
    let next = child_plan(&plan, "Next");
    assert_eq!(
        next.population("Next").unwrap().unpopulated,
        Some(UnpopulatedReason::RecursionLimit)
    );

    let plan = mapper
        .plan_for(&key("Customer"), &key("CustomerDto"), RuleSetKind::CreateNew)
        .unwrap();
    let manager = child_plan(&plan, "Manager");
    assert_eq!(
        manager.population("Manager").unwrap().unpopulated,
        Some(UnpopulatedReason::RecursionLimit)
    );
    assert_eq!(
        manager.population("AddressLine1").unwrap().guard,
        Some(Guard::NotNull("Address".to_string()))
    );
}

/// Level `i` of a binary tree whose two children both have the type of level
/// `i + 1`
fn tree_registry(levels: usize) -> TypeRegistry {
    let mut registry = TypeRegistry::new();
    for suffix in ["", "Dto"] {
        for level in 0..levels {
            let mut descriptor =
                TypeDescriptor::complex(format!("T{level}{suffix}").as_str()).property("V", "String");
            if level + 1 < levels {
                let child = format!("T{}{suffix}", level + 1);
                descriptor = descriptor
                    .property("A", child.as_str())
                    .property("B", child.as_str());
            }
            registry = registry.with(descriptor.build());
        }
    }
    registry
}

#[test]
fn test_wide_trees_compile_each_level_once() {
    let levels = 20;
    let mapper = Mapper::new(Arc::new(tree_registry(levels))).unwrap();
    let plan = mapper
        .plan_for(&key("T0"), &key("T0Dto"), RuleSetKind::CreateNew)
        .unwrap();

    let a = child_plan(&plan, "A");
    let b = child_plan(&plan, "B");
    assert!(std::ptr::eq(a, b));
    assert!(std::ptr::eq(child_plan(a, "A"), child_plan(b, "B")));

    let matches = &mapper.stats()[1];
    assert_eq!(matches.name, "member_matches");
    assert!(matches.entries < 4 * levels, "{} match entries", matches.entries);

    let mut deepest = &*plan;
    for _ in 1..levels {
        deepest = child_plan(deepest, "B");
    }
    assert_eq!(deepest.key().target_type, key(&format!("T{}Dto", levels - 1)));
    assert_eq!(source_path(deepest.population("V").unwrap()), "V");
}

#[test]
fn test_collection_elements_get_their_own_plan() {
    let plan = mapper()
        .plan_for(&key("Customer"), &key("CustomerDto"), RuleSetKind::CreateNew)
        .unwrap();
    let orders = child_plan(&plan, "Orders");
    assert_eq!(orders.key().target_type, key("OrderDto"));
    assert_eq!(
        source_path(orders.population("Sku").unwrap()),
        "Sku"
    );
}

#[test]
fn test_constructor_selection() {
    let mapper = mapper();
    let plan = mapper
        .plan_for(&key("Customer"), &key("Contact"), RuleSetKind::CreateNew)
        .unwrap();
    let arguments = plan.constructor_arguments();
    assert_eq!(arguments.len(), 2);
    assert!(plan.populations().is_empty());

    // no name or email on Node: the parameterless constructor is used
    let plan = mapper
        .plan_for(&key("Node"), &key("Contact"), RuleSetKind::CreateNew)
        .unwrap();
    assert_eq!(plan.construction(), &Construction::DefaultThenPopulate);
}

#[test]
fn test_naming_patterns_from_settings() {
    let settings =
        EngineSettings::from_json(r#"{ "naming": { "patterns": ["{name}Field"] } }"#).unwrap();
    let mapper =
        Mapper::with_settings(Arc::new(test_support::commerce_registry()), &settings).unwrap();
    let plan = mapper
        .plan_for(&key("Legacy"), &key("CustomerDto"), RuleSetKind::CreateNew)
        .unwrap();
    assert_eq!(source_path(plan.population("Name").unwrap()), "NameField");
    assert_eq!(source_path(plan.population("Email").unwrap()), "EmailField");
}

#[test]
fn test_dictionary_sources() {
    let registry = Arc::new(test_support::commerce_registry());
    let discoverer = DictionaryMemberDiscoverer::new(
        TypeMetadataDiscoverer::new(Arc::clone(&registry)),
        Arc::clone(&registry),
    )
    .with_keys("Row", [DictionaryKey::new("Name"), DictionaryKey::typed("Id", "I32")])
    .unwrap();
    let mapper =
        Mapper::with_discoverer(registry, Arc::new(discoverer), &EngineSettings::default())
            .unwrap();

    let plan = mapper
        .plan_for(&key("Row"), &key("CustomerDto"), RuleSetKind::CreateNew)
        .unwrap();
    assert_eq!(source_path(plan.population("Name").unwrap()), "Name");
    assert_eq!(source_path(plan.population("Id").unwrap()), "Id");
    assert!(!plan.population("Email").unwrap().is_populated());
}

// ============================================================================
// ERRORS
// ============================================================================

#[test]
fn test_conflicting_overrides() {
    let mapper = mapper();
    let err = mapper
        .configure(|config| {
            config
                .add_rule(MemberRule::constant("CustomerDto", "Name", json!("a")))?
                .add_rule(MemberRule::constant("CustomerDto", "Name", json!("b")))?;
            Ok(())
        })
        .unwrap_err();
    assert!(matches!(err, Error::ConflictingOverrides { .. }));

    mapper
        .configure(|config| {
            config
                .add_rule(MemberRule::constant("CustomerDto", "Address.City", json!("a")))?
                .add_rule(MemberRule::constant("AddressDto", "City", json!("b")))?;
            Ok(())
        })
        .unwrap();
    let err = mapper
        .plan_for(&key("Customer"), &key("CustomerDto"), RuleSetKind::CreateNew)
        .unwrap_err();
    assert!(matches!(err, Error::ConflictingOverrides { ref path, .. } if path == "Address.City"));
}

#[test]
fn test_failed_compiles_are_not_memoized() {
    let mapper = mapper();
    for _ in 0..2 {
        let err = mapper
            .plan_for(&key("Customer"), &key("Account"), RuleSetKind::CreateNew)
            .unwrap_err();
        match err {
            Error::UnsatisfiableConstructor {
                source_type,
                target_type,
                parameter,
            } => {
                assert_eq!(source_type, "Customer");
                assert_eq!(target_type, "Account");
                assert_eq!(parameter, "token");
            }
            other => panic!("unexpected error {other}"),
        }
    }
    assert!(mapper.compiled_plans().is_empty());
    assert_eq!(mapper.stats()[0].misses, 2);
}

#[test]
fn test_unknown_types() {
    let err = mapper()
        .plan_for(&key("Missing"), &key("CustomerDto"), RuleSetKind::CreateNew)
        .unwrap_err();
    assert!(matches!(err, Error::UnknownType { ref type_name } if type_name == "Missing"));
}
