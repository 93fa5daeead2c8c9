//! Mapping configuration
//!
//! The compiler consults configuration through two things only: a
//! [`ConfigSignature`] that becomes part of every plan key, and member
//! directive resolution (ignore rules and value overrides). Everything else
//! here is a small fluent surface for building that configuration.
//!
//! Copyright (c) 2025 Graft Team
//! Licensed under the Apache-2.0 license

pub mod rules;
pub mod settings;

pub use rules::{DerivedPairing, ErrorCallback, MemberRule, RuleAction, RuleScope};
pub use settings::{EngineSettings, DEFAULT_MAX_RECURSION_DEPTH};

use crate::cache::key_hash;
use crate::discovery::MemberDiscoverer;
use crate::member::QualifiedMember;
use crate::naming::{NamingOptions, NamingSettings};
use crate::plan::data_source::{DataSource, DataSourceKind, Guard};
use crate::plan::strategies::NullNestedStrategy;
use crate::plan::ErrorHandling;
use crate::registry::{TypeKey, TypeRegistry};
use crate::rule_set::{RuleSet, RuleSetKind};
use crate::{Error, Result};
use std::fmt;
use std::hash::{Hash, Hasher};
use std::sync::Arc;

/// Opaque, structurally comparable identity of a configuration
#[derive(Clone)]
pub struct ConfigSignature {
    digest: u64,
    canonical: Arc<str>,
}

impl ConfigSignature {
    fn new(canonical: String) -> Self {
        Self {
            digest: key_hash(&canonical),
            canonical: canonical.into(),
        }
    }

    pub fn digest(&self) -> u64 {
        self.digest
    }

    /// Canonical text the signature was computed from
    pub fn canonical(&self) -> &str {
        &self.canonical
    }
}

impl PartialEq for ConfigSignature {
    fn eq(&self, other: &Self) -> bool {
        self.digest == other.digest && self.canonical == other.canonical
    }
}

impl Eq for ConfigSignature {}

impl Hash for ConfigSignature {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.digest.hash(state);
    }
}

impl fmt::Debug for ConfigSignature {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "ConfigSignature({:016x})", self.digest)
    }
}

impl fmt::Display for ConfigSignature {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:016x}", self.digest)
    }
}

/// The mapping being compiled, as seen by directive resolution
#[derive(Debug, Clone, Copy)]
pub struct OverrideQuery<'a> {
    /// Source type of the plan being compiled
    pub source_type: &'a TypeKey,
    /// Target type of the plan being compiled
    pub target_type: &'a TypeKey,
    /// Source type at the target member's parent level
    pub level_source_type: &'a TypeKey,
    /// Target type at the target member's parent level; differs from the
    /// chain's type for derived type plans
    pub level_target_type: &'a TypeKey,
    pub rule_set: RuleSetKind,
}

/// Configured handling of one target member
#[derive(Debug, Clone, PartialEq)]
pub enum MemberDirective {
    /// Leave unpopulated, unconditionally or when the condition holds
    Ignore { condition: Option<Guard> },
    /// Populate from a configured data source
    Override(DataSource),
}

/// Mapping configuration
#[derive(Debug, Clone)]
pub struct MappingConfiguration {
    rules: Vec<MemberRule>,
    derived_pairings: Vec<DerivedPairing>,
    error_callbacks: Vec<ErrorCallback>,
    naming: NamingOptions,
    max_recursion_depth: usize,
    null_strategies: Vec<(RuleSetKind, Arc<dyn NullNestedStrategy>)>,
}

impl Default for MappingConfiguration {
    fn default() -> Self {
        Self {
            rules: Vec::new(),
            derived_pairings: Vec::new(),
            error_callbacks: Vec::new(),
            naming: NamingOptions::default(),
            max_recursion_depth: DEFAULT_MAX_RECURSION_DEPTH,
            null_strategies: Vec::new(),
        }
    }
}

impl MappingConfiguration {
    pub fn new() -> Self {
        Self::default()
    }

    /// Configuration seeded from engine settings
    pub fn from_settings(settings: &EngineSettings) -> Result<Self> {
        let mut config = Self::new();
        config.set_naming(settings.naming.clone())?;
        config.set_max_recursion_depth(settings.max_recursion_depth);
        Ok(config)
    }

    /// Add a member rule
    ///
    /// Two overrides, or an override and an ignore directive, for the same
    /// member path in the same scope are rejected.
    pub fn add_rule(&mut self, rule: MemberRule) -> Result<&mut Self> {
        if let Some(existing) = self.rules.iter().find(|r| **r != rule && r.conflicts_with(&rule)) {
            return Err(Error::ConflictingOverrides {
                source_type: scope_source(&rule.scope),
                target_type: rule.scope.target_type.to_string(),
                path: rule.target_path.clone(),
                message: format!(
                    "{} conflicts with existing {}",
                    rule.action.canonical(),
                    existing.action.canonical()
                ),
            });
        }
        if !self.rules.contains(&rule) {
            self.rules.push(rule);
        }
        Ok(self)
    }

    /// Map `source_derived` instances with the `target_derived` plan when
    /// mapping `source_base` to `target_base`
    pub fn add_derived_pairing(&mut self, pairing: DerivedPairing) -> Result<&mut Self> {
        for (base, derived) in [
            (&pairing.source_base, &pairing.source_derived),
            (&pairing.target_base, &pairing.target_derived),
        ] {
            if base == derived {
                return Err(Error::InvalidDerivedPairing {
                    base_type: base.to_string(),
                    derived_type: derived.to_string(),
                    message: "a type cannot be paired as its own derived type".to_string(),
                });
            }
        }
        if !self.derived_pairings.contains(&pairing) {
            self.derived_pairings.push(pairing);
        }
        Ok(self)
    }

    /// Route runtime errors for a type pair to a named callback
    pub fn on_error(
        &mut self,
        source_type: Option<TypeKey>,
        target_type: impl Into<TypeKey>,
        callback: &str,
    ) -> &mut Self {
        let target_type = target_type.into();
        self.error_callbacks
            .retain(|c| !(c.source_type == source_type && c.target_type == target_type));
        self.error_callbacks.push(ErrorCallback {
            source_type,
            target_type,
            name: callback.to_string(),
        });
        self
    }

    /// Replace naming options; patterns are validated immediately
    pub fn set_naming(&mut self, naming: NamingOptions) -> Result<&mut Self> {
        NamingSettings::compile(&naming)?;
        self.naming = naming;
        Ok(self)
    }

    pub fn set_max_recursion_depth(&mut self, depth: usize) -> &mut Self {
        self.max_recursion_depth = depth;
        self
    }

    /// Swap the null-nested-member strategy of one rule set
    pub fn set_null_strategy(
        &mut self,
        rule_set: RuleSetKind,
        strategy: Arc<dyn NullNestedStrategy>,
    ) -> &mut Self {
        self.null_strategies.retain(|(kind, _)| *kind != rule_set);
        self.null_strategies.push((rule_set, strategy));
        self
    }

    pub fn rules(&self) -> &[MemberRule] {
        &self.rules
    }

    pub fn derived_pairings(&self) -> &[DerivedPairing] {
        &self.derived_pairings
    }

    pub fn naming(&self) -> &NamingOptions {
        &self.naming
    }

    pub fn max_recursion_depth(&self) -> usize {
        self.max_recursion_depth
    }

    /// The rule set of `kind` with any configured strategy swap applied
    pub fn rule_set(&self, kind: RuleSetKind) -> RuleSet {
        let rule_set = RuleSet::for_kind(kind);
        match self.null_strategies.iter().find(|(k, _)| *k == kind) {
            Some((_, strategy)) => rule_set.with_null_strategy(Arc::clone(strategy)),
            None => rule_set,
        }
    }

    /// Error handling for a type pair
    pub fn error_handling(&self, source_type: &TypeKey, target_type: &TypeKey) -> ErrorHandling {
        self.error_callbacks
            .iter()
            .filter(|c| &c.target_type == target_type)
            .filter(|c| c.source_type.as_ref().map_or(true, |s| s == source_type))
            // source-specific callbacks win over wildcards
            .max_by_key(|c| c.source_type.is_some())
            .map(|c| ErrorHandling::Callback(c.name.clone()))
            .unwrap_or(ErrorHandling::Wrap)
    }

    /// Derived pairings applying to a (source, target) plan, in configuration
    /// order; only pairings whose derived source type is a strict subtype of
    /// `source_type` apply
    pub fn derived_pairings_for<'a>(
        &'a self,
        registry: &'a TypeRegistry,
        source_type: &'a TypeKey,
        target_type: &'a TypeKey,
    ) -> impl Iterator<Item = &'a DerivedPairing> + 'a {
        self.derived_pairings.iter().filter(move |p| {
            p.source_derived != *source_type
                && registry.is_assignable(source_type, &p.source_base)
                && registry.is_assignable(target_type, &p.target_base)
                && registry.is_assignable(&p.source_derived, source_type)
                && registry.is_assignable(&p.target_derived, target_type)
        })
    }

    /// Signature of everything that influences compiled plans
    pub fn signature(&self) -> ConfigSignature {
        let mut rules: Vec<String> = self.rules.iter().map(MemberRule::canonical).collect();
        rules.sort();

        let mut lines = rules;
        lines.extend(
            self.derived_pairings
                .iter()
                .map(|p| format!("derived|{p}")),
        );
        let mut callbacks: Vec<String> = self
            .error_callbacks
            .iter()
            .map(|c| {
                let source = c.source_type.as_ref().map_or("*".to_string(), ToString::to_string);
                format!("callback|{source} -> {}|{}", c.target_type, c.name)
            })
            .collect();
        callbacks.sort();
        lines.extend(callbacks);
        lines.push(format!(
            "naming|{}|{}",
            self.naming.separators.join(","),
            self.naming.patterns.join(",")
        ));
        lines.push(format!("depth|{}", self.max_recursion_depth));
        let mut strategies: Vec<String> = self
            .null_strategies
            .iter()
            .map(|(kind, strategy)| format!("null|{kind}|{}", strategy.name()))
            .collect();
        strategies.sort();
        lines.extend(strategies);

        ConfigSignature::new(lines.join("\n"))
    }

    /// Check configured paths and pairings against the registered types
    pub fn validate(&self, registry: &TypeRegistry, discoverer: &dyn MemberDiscoverer) -> Result<()> {
        for rule in &self.rules {
            resolve_target_path(registry, discoverer, &rule.scope.target_type, &rule.target_path)?;
        }
        for pairing in &self.derived_pairings {
            for (base, derived) in [
                (&pairing.source_base, &pairing.source_derived),
                (&pairing.target_base, &pairing.target_derived),
            ] {
                registry.get(base)?;
                registry.get(derived)?;
                if !registry.is_assignable(derived, base) {
                    return Err(Error::InvalidDerivedPairing {
                        base_type: base.to_string(),
                        derived_type: derived.to_string(),
                        message: format!("{derived} does not derive from {base}"),
                    });
                }
            }
        }
        Ok(())
    }

    /// Configured directive for `target`, if any
    ///
    /// A rule applies when its scope's target type is the type at some level
    /// of the target chain and its path equals the chain's path below that
    /// level. More than one applicable override is a conflict.
    pub fn directive(
        &self,
        query: &OverrideQuery<'_>,
        target: &QualifiedMember,
    ) -> Result<Option<MemberDirective>> {
        let applicable: Vec<&MemberRule> = self
            .rules
            .iter()
            .filter(|rule| rule_applies(rule, query, target))
            .collect();

        let overrides: Vec<&&MemberRule> = applicable
            .iter()
            .filter(|rule| rule.action.is_override())
            .collect();
        if overrides.len() > 1 || (!overrides.is_empty() && overrides.len() != applicable.len()) {
            let described: Vec<String> = applicable
                .iter()
                .map(|r| format!("{} ({})", r.action.canonical(), r.scope))
                .collect();
            return Err(Error::ConflictingOverrides {
                source_type: query.source_type.to_string(),
                target_type: query.target_type.to_string(),
                path: target.path(),
                message: format!("multiple directives apply: {}", described.join(", ")),
            });
        }

        let Some(rule) = applicable.first() else {
            return Ok(None);
        };
        let condition = rule.condition.clone().map(Guard::Configured);
        let value_type = target.leaf().value_type().clone();
        let directive = match &rule.action {
            RuleAction::Ignore => {
                // any unconditional ignore wins over conditional ones
                let condition = if applicable.iter().any(|r| r.condition.is_none()) {
                    None
                } else {
                    Guard::or(
                        applicable
                            .iter()
                            .filter_map(|r| r.condition.clone().map(Guard::Configured)),
                    )
                };
                MemberDirective::Ignore { condition }
            }
            RuleAction::Constant(value) => MemberDirective::Override(
                DataSource::new(DataSourceKind::Constant(value.clone()), value_type)
                    .with_condition(condition),
            ),
            RuleAction::Expression { name, description } => MemberDirective::Override(
                DataSource::new(
                    DataSourceKind::Expression {
                        name: name.clone(),
                        description: description.clone(),
                    },
                    value_type,
                )
                .with_condition(condition),
            ),
        };
        Ok(Some(directive))
    }

    /// Rules anchored above the leaf of `level` whose paths continue below
    /// it, as (rule index, remaining path, anchored at the root)
    ///
    /// Directives for members below `level` depend on the chain above it
    /// only through these.
    pub fn rules_reaching(
        &self,
        level: &QualifiedMember,
        rule_set: RuleSetKind,
    ) -> Vec<(usize, String, bool)> {
        let members = level.members();
        let mut reaching = Vec::new();
        for (index, rule) in self.rules.iter().enumerate() {
            if rule.scope.rule_set.is_some_and(|r| r != rule_set) {
                continue;
            }
            for anchor in 0..members.len().saturating_sub(1) {
                if members[anchor].value_type() != &rule.scope.target_type {
                    continue;
                }
                let prefix = level.relative_path(anchor);
                let Some(rest) = rule.target_path.strip_prefix(prefix.as_str()) else {
                    continue;
                };
                if rest.starts_with('.') || rest.starts_with('[') {
                    reaching.push((index, rest.to_string(), anchor == 0));
                }
            }
        }
        reaching
    }

    /// Configured override data source for `target`, if any
    pub fn resolve_override(
        &self,
        query: &OverrideQuery<'_>,
        target: &QualifiedMember,
    ) -> Result<Option<DataSource>> {
        Ok(match self.directive(query, target)? {
            Some(MemberDirective::Override(source)) => Some(source),
            _ => None,
        })
    }
}

fn scope_source(scope: &RuleScope) -> String {
    scope
        .source_type
        .as_ref()
        .map_or("*".to_string(), ToString::to_string)
}

fn rule_applies(rule: &MemberRule, query: &OverrideQuery<'_>, target: &QualifiedMember) -> bool {
    if rule.scope.rule_set.is_some_and(|r| r != query.rule_set) {
        return false;
    }
    let members = target.members();
    let parent_level = members.len().saturating_sub(2);
    (0..members.len().saturating_sub(1)).any(|level| {
        let scoped_type = members[level].value_type() == &rule.scope.target_type
            || (level == parent_level && query.level_target_type == &rule.scope.target_type);
        if !scoped_type || target.relative_path(level) != rule.target_path {
            return false;
        }
        match &rule.scope.source_type {
            None => true,
            Some(source) => {
                (level == parent_level && source == query.level_source_type)
                    || (level == 0 && source == query.source_type)
            }
        }
    })
}

/// Walk a dotted path (`Lines[i].Sku`) through target members
fn resolve_target_path(
    registry: &TypeRegistry,
    discoverer: &dyn MemberDiscoverer,
    target_type: &TypeKey,
    path: &str,
) -> Result<()> {
    let invalid = || Error::InvalidMemberPath {
        type_name: target_type.to_string(),
        path: path.to_string(),
    };
    if path.is_empty() {
        return Err(invalid());
    }
    let mut current = target_type.clone();
    for segment in path.split('.') {
        let (name, element) = match segment.strip_suffix("[i]") {
            Some(name) => (name, true),
            None => (segment, false),
        };
        let members = discoverer.target_members(&current)?;
        let member = members
            .iter()
            .find(|m| m.name() == name)
            .ok_or_else(invalid)?;
        current = member.value_type().clone();
        if element {
            current = registry
                .kind(&current)?
                .element_type()
                .cloned()
                .ok_or_else(invalid)?;
        }
    }
    Ok(())
}
