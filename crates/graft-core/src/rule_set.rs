//! Mapping rule sets
//!
//! A rule set fixes the mode of a mapping: create a new target, merge into an
//! existing one without overwriting populated values, or overwrite an
//! existing one.
//!
//! Copyright (c) 2025 Graft Team
//! Licensed under the Apache-2.0 license

use crate::plan::strategies::{NullNestedStrategy, ResetGroupStrategy, SkipGroupStrategy};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::Arc;

/// Identity of a rule set
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RuleSetKind {
    CreateNew,
    Merge,
    Overwrite,
}

impl RuleSetKind {
    pub const ALL: [RuleSetKind; 3] = [
        RuleSetKind::CreateNew,
        RuleSetKind::Merge,
        RuleSetKind::Overwrite,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            RuleSetKind::CreateNew => "create_new",
            RuleSetKind::Merge => "merge",
            RuleSetKind::Overwrite => "overwrite",
        }
    }
}

impl fmt::Display for RuleSetKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// How the target object is obtained
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TargetCreation {
    /// Always construct a new target
    Construct,
    /// Use the supplied target, constructing one only when it is null
    UseExisting,
}

/// What a plan returns for a null source
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum NullSourceResult {
    DefaultTarget,
    ExistingTarget,
}

impl fmt::Display for NullSourceResult {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            NullSourceResult::DefaultTarget => write!(f, "default target"),
            NullSourceResult::ExistingTarget => write!(f, "existing target"),
        }
    }
}

/// The behaviour of one mapping mode
#[derive(Debug, Clone)]
pub struct RuleSet {
    kind: RuleSetKind,
    creation: TargetCreation,
    tracks_identity: bool,
    guard_populated_values: bool,
    null_source: NullSourceResult,
    null_strategy: Arc<dyn NullNestedStrategy>,
}

impl RuleSet {
    /// Build a new target from the source
    pub fn create_new() -> Self {
        Self {
            kind: RuleSetKind::CreateNew,
            creation: TargetCreation::Construct,
            tracks_identity: true,
            guard_populated_values: false,
            null_source: NullSourceResult::DefaultTarget,
            null_strategy: Arc::new(SkipGroupStrategy),
        }
    }

    /// Fill only the unpopulated members of an existing target
    pub fn merge() -> Self {
        Self {
            kind: RuleSetKind::Merge,
            creation: TargetCreation::UseExisting,
            tracks_identity: true,
            guard_populated_values: true,
            null_source: NullSourceResult::ExistingTarget,
            null_strategy: Arc::new(SkipGroupStrategy),
        }
    }

    /// Overwrite every mapped member of an existing target
    pub fn overwrite() -> Self {
        Self {
            kind: RuleSetKind::Overwrite,
            creation: TargetCreation::UseExisting,
            tracks_identity: true,
            guard_populated_values: false,
            null_source: NullSourceResult::ExistingTarget,
            null_strategy: Arc::new(ResetGroupStrategy),
        }
    }

    pub fn for_kind(kind: RuleSetKind) -> Self {
        match kind {
            RuleSetKind::CreateNew => Self::create_new(),
            RuleSetKind::Merge => Self::merge(),
            RuleSetKind::Overwrite => Self::overwrite(),
        }
    }

    /// Replace the null-nested-member strategy
    pub fn with_null_strategy(mut self, strategy: Arc<dyn NullNestedStrategy>) -> Self {
        self.null_strategy = strategy;
        self
    }

    pub fn kind(&self) -> RuleSetKind {
        self.kind
    }

    pub fn creation(&self) -> TargetCreation {
        self.creation
    }

    /// Whether already-mapped source objects short-circuit to their target
    pub fn tracks_identity(&self) -> bool {
        self.tracks_identity
    }

    /// Whether simple members are only written while still unpopulated
    pub fn guards_populated_values(&self) -> bool {
        self.guard_populated_values
    }

    pub fn null_source(&self) -> NullSourceResult {
        self.null_source
    }

    pub fn null_strategy(&self) -> &dyn NullNestedStrategy {
        self.null_strategy.as_ref()
    }
}

impl From<RuleSetKind> for RuleSet {
    fn from(kind: RuleSetKind) -> Self {
        RuleSet::for_kind(kind)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::plan::strategies::NullPolicy;

    #[test]
    fn test_modes() {
        let create = RuleSet::create_new();
        assert_eq!(create.creation(), TargetCreation::Construct);
        assert_eq!(create.null_source(), NullSourceResult::DefaultTarget);
        assert!(!create.guards_populated_values());

        let merge = RuleSet::merge();
        assert_eq!(merge.creation(), TargetCreation::UseExisting);
        assert!(merge.guards_populated_values());
        assert_eq!(merge.null_strategy().policy(&[]), NullPolicy::Skip);

        let overwrite = RuleSet::overwrite();
        assert_eq!(overwrite.null_source(), NullSourceResult::ExistingTarget);
        assert_eq!(overwrite.null_strategy().policy(&[]), NullPolicy::ResetToDefault);

        for kind in RuleSetKind::ALL {
            assert!(RuleSet::from(kind).tracks_identity());
        }
    }

    #[test]
    fn test_swapping_strategy() {
        let overwrite = RuleSet::overwrite().with_null_strategy(Arc::new(SkipGroupStrategy));
        assert_eq!(overwrite.null_strategy().name(), "skip_group");
    }

    #[test]
    fn test_kind_serialization() {
        let json = serde_json::to_string(&RuleSetKind::CreateNew).unwrap();
        assert_eq!(json, "\"create_new\"");
        let kind: RuleSetKind = serde_json::from_str("\"overwrite\"").unwrap();
        assert_eq!(kind, RuleSetKind::Overwrite);
    }
}
