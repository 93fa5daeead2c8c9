//! Compiled mapping plans
//!
//! A [`MappingPlan`] is the immutable, declarative result of compiling one
//! (source type, target type, rule set, configuration) combination: short
//! circuits evaluated first, a construction strategy, ordered member
//! populations with their data sources and guards, null access groups and a
//! failure guard. Plans are handed to an execution backend as-is.
//!
//! Copyright (c) 2025 Graft Team
//! Licensed under the Apache-2.0 license

pub mod compiler;
pub mod construction;
pub mod data_source;
pub mod strategies;

pub use compiler::PlanCompiler;
pub use data_source::{DataSource, DataSourceKind, ElementMapping, Guard};
pub use strategies::{NullAccessGroup, NullNestedStrategy, NullPolicy};

use crate::config::ConfigSignature;
use crate::discovery::Constructor;
use crate::member::{Member, QualifiedMember};
use crate::registry::TypeKey;
use crate::rule_set::{NullSourceResult, RuleSetKind};
use crate::Error;
use std::fmt::{self, Write as _};
use std::sync::Arc;

/// Cache key of a compiled plan
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct PlanKey {
    pub source_type: TypeKey,
    pub target_type: TypeKey,
    pub rule_set: RuleSetKind,
    pub signature: ConfigSignature,
}

impl fmt::Display for PlanKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} -> {} [{}]",
            self.source_type, self.target_type, self.rule_set
        )
    }
}

/// Checks evaluated once, before any member is populated
#[derive(Debug, Clone, PartialEq)]
pub enum ShortCircuit {
    /// Return the target already produced for this source object
    AlreadyMapped,
    /// A null source yields `result` without populating anything
    NullSource { result: NullSourceResult },
    /// Delegate to a derived type pair's plan when `condition` holds
    DerivedType {
        condition: Guard,
        plan: Arc<MappingPlan>,
    },
}

impl fmt::Display for ShortCircuit {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ShortCircuit::AlreadyMapped => write!(f, "already mapped"),
            ShortCircuit::NullSource { result } => write!(f, "null source -> {result}"),
            ShortCircuit::DerivedType { condition, plan } => {
                write!(f, "{condition} -> plan {}", plan.key())
            }
        }
    }
}

/// A constructor parameter and where its value comes from
#[derive(Debug, Clone, PartialEq)]
pub struct ConstructorArgument {
    pub parameter: Member,
    /// Empty for an optional parameter left at its default
    pub data_sources: Vec<DataSource>,
    pub guard: Option<Guard>,
}

/// How the target object is obtained
#[derive(Debug, Clone, PartialEq)]
pub enum Construction {
    /// Call a constructor with resolved arguments
    Constructor {
        constructor: Constructor,
        arguments: Vec<ConstructorArgument>,
    },
    /// Create with defaults, then populate members
    DefaultThenPopulate,
    /// Populate the supplied target; construct with `fallback` when it is
    /// null, or leave it null when there is no fallback
    UseExisting { fallback: Option<Box<Construction>> },
}

impl fmt::Display for Construction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Construction::Constructor { constructor, .. } => write!(f, "{constructor}"),
            Construction::DefaultThenPopulate => write!(f, "default then populate"),
            Construction::UseExisting { fallback: None } => write!(f, "use existing"),
            Construction::UseExisting {
                fallback: Some(fallback),
            } => write!(f, "use existing, else {fallback}"),
        }
    }
}

/// Why a target member has no data source
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum UnpopulatedReason {
    /// No source member matched and nothing is configured
    NoMatchingSource,
    /// An ignore directive applies
    Ignored,
    /// The member's chain reached the maximum recursion depth
    RecursionLimit,
}

impl fmt::Display for UnpopulatedReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            UnpopulatedReason::NoMatchingSource => write!(f, "no matching source"),
            UnpopulatedReason::Ignored => write!(f, "ignored"),
            UnpopulatedReason::RecursionLimit => write!(f, "recursion limit"),
        }
    }
}

/// One target member and how it is populated
#[derive(Debug, Clone, PartialEq)]
pub struct MemberPopulation {
    pub target: QualifiedMember,
    /// Tried in order; the first whose condition holds supplies the value
    pub data_sources: Vec<DataSource>,
    pub guard: Option<Guard>,
    /// Source paths that must not be null, the population's access signature
    pub null_checks: Vec<String>,
    /// Index into the plan's null access groups
    pub null_group: Option<usize>,
    pub unpopulated: Option<UnpopulatedReason>,
}

impl MemberPopulation {
    /// A population with data sources
    pub fn populated(target: QualifiedMember, data_sources: Vec<DataSource>) -> Self {
        Self {
            target,
            data_sources,
            guard: None,
            null_checks: Vec::new(),
            null_group: None,
            unpopulated: None,
        }
    }

    /// A member left untouched
    pub fn unpopulated(target: QualifiedMember, reason: UnpopulatedReason) -> Self {
        Self {
            target,
            data_sources: Vec::new(),
            guard: None,
            null_checks: Vec::new(),
            null_group: None,
            unpopulated: Some(reason),
        }
    }

    pub fn is_populated(&self) -> bool {
        self.unpopulated.is_none() && !self.data_sources.is_empty()
    }

    pub fn path(&self) -> String {
        self.target.path()
    }
}

/// How runtime failures are reported
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum ErrorHandling {
    /// Wrap in [`Error::Mapping`] with path context
    Wrap,
    /// Hand to a configured callback
    Callback(String),
}

/// Runtime error wrapping for one plan
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FailureGuard {
    pub source_type: TypeKey,
    pub target_type: TypeKey,
    pub handling: ErrorHandling,
}

impl FailureGuard {
    /// Wrap a failure raised while populating `path`
    pub fn wrap(&self, path: &str, error: anyhow::Error) -> Error {
        Error::Mapping {
            source_type: self.source_type.to_string(),
            target_type: self.target_type.to_string(),
            path: path.to_string(),
            source: error,
        }
    }

    /// Name of the configured callback, if errors are not wrapped
    pub fn callback(&self) -> Option<&str> {
        match &self.handling {
            ErrorHandling::Callback(name) => Some(name),
            ErrorHandling::Wrap => None,
        }
    }
}

/// An immutable compiled plan
#[derive(Debug, Clone, PartialEq)]
pub struct MappingPlan {
    pub(crate) key: PlanKey,
    pub(crate) source: QualifiedMember,
    pub(crate) target: QualifiedMember,
    pub(crate) short_circuits: Vec<ShortCircuit>,
    pub(crate) construction: Construction,
    pub(crate) populations: Vec<MemberPopulation>,
    pub(crate) null_groups: Vec<NullAccessGroup>,
    pub(crate) failure_guard: FailureGuard,
}

impl MappingPlan {
    pub fn key(&self) -> &PlanKey {
        &self.key
    }

    /// Root chain of the source object this plan reads
    ///
    /// Population paths, source paths and guards are relative to it. An
    /// unflattened child plan reads the same object as its parent.
    pub fn source(&self) -> &QualifiedMember {
        &self.source
    }

    /// Root chain of the target object this plan populates
    pub fn target(&self) -> &QualifiedMember {
        &self.target
    }

    pub fn short_circuits(&self) -> &[ShortCircuit] {
        &self.short_circuits
    }

    pub fn construction(&self) -> &Construction {
        &self.construction
    }

    /// Member populations in target discovery order
    pub fn populations(&self) -> &[MemberPopulation] {
        &self.populations
    }

    pub fn null_groups(&self) -> &[NullAccessGroup] {
        &self.null_groups
    }

    pub fn failure_guard(&self) -> &FailureGuard {
        &self.failure_guard
    }

    /// Population of the target member at `path`
    pub fn population(&self, path: &str) -> Option<&MemberPopulation> {
        self.populations.iter().find(|p| p.target.path() == path)
    }

    /// Constructor arguments, when a constructor is used
    pub fn constructor_arguments(&self) -> &[ConstructorArgument] {
        let mut construction = &self.construction;
        loop {
            match construction {
                Construction::Constructor { arguments, .. } => return arguments,
                Construction::UseExisting {
                    fallback: Some(fallback),
                } => construction = fallback.as_ref(),
                _ => return &[],
            }
        }
    }

    /// Target paths, including those of child plans, that have no data source
    /// and are not ignored
    ///
    /// Child plan paths are reported from this plan's target root, so
    /// `Orders[i].Discount` names the `Discount` member of the element plan
    /// under `Orders`.
    pub fn unmapped_members(&self) -> Vec<String> {
        let mut unmapped = Vec::new();
        self.collect_unmapped("", &mut unmapped);
        unmapped
    }

    fn collect_unmapped(&self, prefix: &str, unmapped: &mut Vec<String>) {
        for population in &self.populations {
            let path = join_path(prefix, &population.path());
            for source in &population.data_sources {
                collect_child_unmapped(source, &path, unmapped);
            }
            if population.unpopulated == Some(UnpopulatedReason::NoMatchingSource)
                && !unmapped.contains(&path)
            {
                unmapped.push(path);
            }
        }
        for argument in self.constructor_arguments() {
            let path = join_path(prefix, argument.parameter.name());
            for source in &argument.data_sources {
                collect_child_unmapped(source, &path, unmapped);
            }
        }
    }

    fn describe<'p>(
        &'p self,
        out: &mut String,
        indent: usize,
        shown: &mut Vec<&'p MappingPlan>,
    ) -> fmt::Result {
        let pad = "  ".repeat(indent);
        // child plans shared between members are described once
        if shown.iter().any(|plan| std::ptr::eq(*plan, self)) {
            return writeln!(out, "{pad}{} (described above)", self.key);
        }
        shown.push(self);
        writeln!(out, "{pad}{}", self.key)?;
        for short_circuit in &self.short_circuits {
            writeln!(out, "{pad}  short-circuit: {short_circuit}")?;
        }
        writeln!(out, "{pad}  construct: {}", self.construction)?;
        for argument in self.constructor_arguments() {
            write!(out, "{pad}    {} <- ", argument.parameter.name())?;
            describe_sources(out, &argument.data_sources, &argument.guard, None)?;
            for source in &argument.data_sources {
                if let Some(plan) = source.child_plan() {
                    plan.describe(out, indent + 3, shown)?;
                }
            }
        }
        for population in &self.populations {
            match population.unpopulated {
                Some(reason) => writeln!(out, "{pad}  {}: unpopulated ({reason})", population.path())?,
                None => {
                    write!(out, "{pad}  {} <- ", population.path())?;
                    describe_sources(
                        out,
                        &population.data_sources,
                        &population.guard,
                        population.null_group,
                    )?;
                    for source in &population.data_sources {
                        if let Some(plan) = source.child_plan() {
                            plan.describe(out, indent + 2, shown)?;
                        }
                    }
                }
            }
        }
        for (index, group) in self.null_groups.iter().enumerate() {
            writeln!(out, "{pad}  group {index}: {} else {}", group.guard, group.policy)?;
        }
        match self.failure_guard.callback() {
            Some(callback) => writeln!(out, "{pad}  on error: callback {callback}"),
            None => writeln!(out, "{pad}  on error: wrap"),
        }
    }
}

fn collect_child_unmapped(source: &DataSource, path: &str, unmapped: &mut Vec<String>) {
    if let Some(plan) = source.child_plan() {
        let prefix = format!("{path}{}", "[i]".repeat(source.element_depth()));
        plan.collect_unmapped(&prefix, unmapped);
    }
}

fn join_path(prefix: &str, path: &str) -> String {
    match (prefix.is_empty(), path.is_empty()) {
        (true, _) => path.to_string(),
        (_, true) => prefix.to_string(),
        _ => format!("{prefix}.{path}"),
    }
}

fn describe_sources(
    out: &mut String,
    sources: &[DataSource],
    guard: &Option<Guard>,
    group: Option<usize>,
) -> fmt::Result {
    let rendered: Vec<String> = sources.iter().map(ToString::to_string).collect();
    if rendered.is_empty() {
        write!(out, "default")?;
    } else {
        write!(out, "{}", rendered.join(" | "))?;
    }
    if let Some(guard) = guard {
        write!(out, " when {guard}")?;
    }
    if let Some(group) = group {
        write!(out, " [group {group}]")?;
    }
    writeln!(out)
}

impl fmt::Display for MappingPlan {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut out = String::new();
        self.describe(&mut out, 0, &mut Vec::new())?;
        f.write_str(out.trim_end())
    }
}
