//! Null-nested-member strategies
//!
//! Populations reading through the same nullable source intermediates form a
//! [`NullAccessGroup`]. When any intermediate is null at runtime the whole
//! group is handled at once, as the rule set's [`NullNestedStrategy`] decides.
//!
//! Copyright (c) 2025 Graft Team
//! Licensed under the Apache-2.0 license

use super::{Guard, MemberPopulation};
use serde::{Deserialize, Serialize};
use std::fmt;

/// What happens to a group whose nested access fails
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum NullPolicy {
    /// Leave the group's target members untouched
    Skip,
    /// Reset the group's target members to their defaults
    ResetToDefault,
}

impl fmt::Display for NullPolicy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            NullPolicy::Skip => write!(f, "skip"),
            NullPolicy::ResetToDefault => write!(f, "reset to default"),
        }
    }
}

/// Swappable policy for groups with null intermediates
pub trait NullNestedStrategy: Send + Sync + fmt::Debug {
    /// Stable name, part of the configuration signature
    fn name(&self) -> &str;

    /// Policy for a group guarded by `access_paths` not being null
    fn policy(&self, access_paths: &[String]) -> NullPolicy;
}

/// Skip the whole group silently
#[derive(Debug, Clone, Copy, Default)]
pub struct SkipGroupStrategy;

impl NullNestedStrategy for SkipGroupStrategy {
    fn name(&self) -> &str {
        "skip_group"
    }

    fn policy(&self, _access_paths: &[String]) -> NullPolicy {
        NullPolicy::Skip
    }
}

/// Reset the whole group to default values
#[derive(Debug, Clone, Copy, Default)]
pub struct ResetGroupStrategy;

impl NullNestedStrategy for ResetGroupStrategy {
    fn name(&self) -> &str {
        "reset_group"
    }

    fn policy(&self, _access_paths: &[String]) -> NullPolicy {
        NullPolicy::ResetToDefault
    }
}

/// Populations sharing one nested-access signature
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NullAccessGroup {
    /// Conjunction of the signature's null checks
    pub guard: Guard,
    /// Source paths that must not be null
    pub access_paths: Vec<String>,
    /// Target paths of the group's members, in population order
    pub members: Vec<String>,
    pub policy: NullPolicy,
}

/// Partition populations by nested-access signature in one pass, recording
/// each population's group index; groups keep first-seen order
pub fn assign_null_groups(
    populations: &mut [MemberPopulation],
    strategy: &dyn NullNestedStrategy,
) -> Vec<NullAccessGroup> {
    let mut groups: Vec<NullAccessGroup> = Vec::new();
    for population in populations.iter_mut() {
        if population.null_checks.is_empty() {
            continue;
        }
        let index = match groups
            .iter()
            .position(|g| g.access_paths == population.null_checks)
        {
            Some(index) => index,
            None => {
                let guard = Guard::and(
                    population
                        .null_checks
                        .iter()
                        .map(|path| Guard::NotNull(path.clone())),
                );
                let Some(guard) = guard else {
                    continue;
                };
                groups.push(NullAccessGroup {
                    guard,
                    access_paths: population.null_checks.clone(),
                    members: Vec::new(),
                    policy: strategy.policy(&population.null_checks),
                });
                groups.len() - 1
            }
        };
        groups[index].members.push(population.target.path());
        population.null_group = Some(index);
    }
    groups
}
