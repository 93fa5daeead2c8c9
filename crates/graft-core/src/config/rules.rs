//! Member rules: ignore directives and value overrides
//!
//! Copyright (c) 2025 Graft Team
//! Licensed under the Apache-2.0 license

use crate::registry::TypeKey;
use crate::rule_set::RuleSetKind;
use std::fmt;

/// What a rule does to its target member
#[derive(Debug, Clone, PartialEq)]
pub enum RuleAction {
    /// Leave the member unpopulated
    Ignore,
    /// Populate the member with a constant
    Constant(serde_json::Value),
    /// Populate the member from a named expression evaluated by the backend
    Expression { name: String, description: String },
}

impl RuleAction {
    /// Whether the action supplies a value
    pub fn is_override(&self) -> bool {
        !matches!(self, RuleAction::Ignore)
    }

    pub(crate) fn canonical(&self) -> String {
        match self {
            RuleAction::Ignore => "ignore".to_string(),
            RuleAction::Constant(value) => format!("constant:{value}"),
            RuleAction::Expression { name, .. } => format!("expression:{name}"),
        }
    }
}

/// Which mappings a rule applies to
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct RuleScope {
    /// Any source type when `None`
    pub source_type: Option<TypeKey>,
    pub target_type: TypeKey,
    /// Every rule set when `None`
    pub rule_set: Option<RuleSetKind>,
}

impl fmt::Display for RuleScope {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.source_type {
            Some(source) => write!(f, "{source} -> {}", self.target_type)?,
            None => write!(f, "* -> {}", self.target_type)?,
        }
        if let Some(rule_set) = self.rule_set {
            write!(f, " [{rule_set}]")?;
        }
        Ok(())
    }
}

/// A configured directive for one target member path
///
/// # Examples
///
/// ```
/// use graft_core::config::MemberRule;
/// use serde_json::json;
///
/// let rule = MemberRule::constant("PersonDto", "Country", json!("NZ"))
///     .from_source("Person")
///     .when("source.Country is empty");
/// assert_eq!(rule.target_path, "Country");
/// ```
#[derive(Debug, Clone, PartialEq)]
pub struct MemberRule {
    pub scope: RuleScope,
    /// Dotted path relative to the scope's target type
    pub target_path: String,
    pub action: RuleAction,
    /// Description of a configured condition
    pub condition: Option<String>,
}

impl MemberRule {
    fn new(target_type: impl Into<TypeKey>, target_path: &str, action: RuleAction) -> Self {
        Self {
            scope: RuleScope {
                source_type: None,
                target_type: target_type.into(),
                rule_set: None,
            },
            target_path: target_path.to_string(),
            action,
            condition: None,
        }
    }

    /// Never populate the member
    pub fn ignore(target_type: impl Into<TypeKey>, target_path: &str) -> Self {
        Self::new(target_type, target_path, RuleAction::Ignore)
    }

    /// Populate the member with a constant
    pub fn constant(
        target_type: impl Into<TypeKey>,
        target_path: &str,
        value: serde_json::Value,
    ) -> Self {
        Self::new(target_type, target_path, RuleAction::Constant(value))
    }

    /// Populate the member from a named expression
    pub fn expression(
        target_type: impl Into<TypeKey>,
        target_path: &str,
        name: &str,
        description: &str,
    ) -> Self {
        Self::new(
            target_type,
            target_path,
            RuleAction::Expression {
                name: name.to_string(),
                description: description.to_string(),
            },
        )
    }

    /// Restrict the rule to one source type
    pub fn from_source(mut self, source_type: impl Into<TypeKey>) -> Self {
        self.scope.source_type = Some(source_type.into());
        self
    }

    /// Restrict the rule to one rule set
    pub fn in_rule_set(mut self, rule_set: RuleSetKind) -> Self {
        self.scope.rule_set = Some(rule_set);
        self
    }

    /// Apply the rule only when a configured condition holds
    pub fn when(mut self, condition: &str) -> Self {
        self.condition = Some(condition.to_string());
        self
    }

    /// Whether this rule and `other` claim the same member in the same scope
    /// and cannot both apply
    pub(crate) fn conflicts_with(&self, other: &MemberRule) -> bool {
        self.scope == other.scope
            && self.target_path == other.target_path
            && (self.action.is_override() || other.action.is_override())
    }

    pub(crate) fn canonical(&self) -> String {
        format!(
            "rule|{}|{}|{}|{}",
            self.scope,
            self.target_path,
            self.action.canonical(),
            self.condition.as_deref().unwrap_or("")
        )
    }
}

/// Maps instances of a derived source type with a derived target type
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct DerivedPairing {
    pub source_base: TypeKey,
    pub target_base: TypeKey,
    pub source_derived: TypeKey,
    pub target_derived: TypeKey,
}

impl DerivedPairing {
    pub fn new(
        source_base: impl Into<TypeKey>,
        target_base: impl Into<TypeKey>,
        source_derived: impl Into<TypeKey>,
        target_derived: impl Into<TypeKey>,
    ) -> Self {
        Self {
            source_base: source_base.into(),
            target_base: target_base.into(),
            source_derived: source_derived.into(),
            target_derived: target_derived.into(),
        }
    }
}

impl fmt::Display for DerivedPairing {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} -> {} as {} -> {}",
            self.source_base, self.target_base, self.source_derived, self.target_derived
        )
    }
}

/// Named callback receiving runtime mapping errors for a type pair
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ErrorCallback {
    pub source_type: Option<TypeKey>,
    pub target_type: TypeKey,
    pub name: String,
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_conflicts() {
        let a = MemberRule::constant("Dto", "Name", json!("a"));
        let b = MemberRule::expression("Dto", "Name", "upper", "source.Name.upper()");
        let ignore = MemberRule::ignore("Dto", "Name");

        assert!(a.conflicts_with(&b));
        assert!(a.conflicts_with(&ignore));
        assert!(!ignore.conflicts_with(&ignore.clone()));
        assert!(!a.conflicts_with(&a.clone().from_source("Person")));
        assert!(!a.conflicts_with(&MemberRule::constant("Dto", "Other", json!(1))));
    }

    #[test]
    fn test_canonical_form() {
        let rule = MemberRule::constant("Dto", "Name", json!("x"))
            .from_source("Person")
            .in_rule_set(RuleSetKind::Merge)
            .when("flag");
        assert_eq!(
            rule.canonical(),
            "rule|Person -> Dto [merge]|Name|constant:\"x\"|flag"
        );
    }
}
