//! Plan compilation
//!
//! The compiler walks the target type's members in discovery order and, for
//! each one, resolves its data sources (configured override, then matched
//! source member), composes its guard and assigns its null access group.
//!
//! Complex and enumerable members get child plans rooted at their own source
//! and target objects. A level also carries the absolute target chain from the
//! compile's root, which drives recursion detection and rule scoping. Child
//! levels that agree on everything those depend on share one plan per compile.
//!
//! Copyright (c) 2025 Graft Team
//! Licensed under the Apache-2.0 license

use super::construction::{select_constructor, ConstructorSelection};
use super::strategies::assign_null_groups;
use super::{
    Construction, ConstructorArgument, DataSource, DataSourceKind, ElementMapping, FailureGuard,
    Guard, MappingPlan, MemberPopulation, PlanKey, ShortCircuit, UnpopulatedReason,
};
use crate::config::{ConfigSignature, MappingConfiguration, MemberDirective, OverrideQuery};
use crate::discovery::MemberDiscoverer;
use crate::matcher::{MatchContext, MemberMatcher};
use crate::member::{Member, MemberKind, QualifiedMember};
use crate::naming::NamingSettings;
use crate::registry::{TypeKey, TypeKind, TypeRegistry, ValueConversion};
use crate::rule_set::{NullSourceResult, RuleSet, RuleSetKind, TargetCreation};
use crate::{Error, Result};
use rustc_hash::FxHashMap;
use std::cell::RefCell;
use std::sync::Arc;
use tracing::{debug, debug_span, trace};

/// How the target object of one plan level is obtained
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
enum LevelCreation {
    /// The requested target of the compile
    Root,
    /// A writeable nested member or collection element
    Nested,
    /// A read-only member whose existing value is populated in place
    InPlace,
}

/// One plan being assembled: a source object mapped onto a target object
#[derive(Debug, Clone)]
struct Level {
    /// Root chain of the source object
    source: QualifiedMember,
    /// Root chain of the target object
    target: QualifiedMember,
    /// Type discovered on the source side; differs from the chain's root type
    /// for derived-type plans
    source_type: TypeKey,
    target_type: TypeKey,
    /// Target chain from the compile's root down to this level's object
    path: QualifiedMember,
    /// Names of unmatched target ancestors directly above this level's
    /// members, outermost first
    unmatched: Vec<String>,
    creation: LevelCreation,
}

/// Everything a child plan depends on besides the compile's root types, rule
/// set and configuration
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
struct LevelKey {
    source: QualifiedMember,
    target: QualifiedMember,
    source_type: TypeKey,
    target_type: TypeKey,
    unmatched: Vec<String>,
    creation: LevelCreation,
    at_root: bool,
    /// Effective types above this level, sorted
    ancestry: Vec<TypeKey>,
    /// Rules anchored above this level that reach below it
    rules: Vec<(usize, String, bool)>,
}

/// State shared by every level of one compile
struct Run<'r> {
    source_type: &'r TypeKey,
    target_type: &'r TypeKey,
    rule_set: RuleSet,
    children: RefCell<FxHashMap<LevelKey, Arc<MappingPlan>>>,
}

/// Compiles mapping plans
pub struct PlanCompiler<'a> {
    registry: &'a TypeRegistry,
    discoverer: &'a dyn MemberDiscoverer,
    matcher: &'a MemberMatcher,
    config: &'a MappingConfiguration,
    naming: &'a NamingSettings,
    signature: &'a ConfigSignature,
}

impl<'a> PlanCompiler<'a> {
    pub fn new(
        registry: &'a TypeRegistry,
        discoverer: &'a dyn MemberDiscoverer,
        matcher: &'a MemberMatcher,
        config: &'a MappingConfiguration,
        naming: &'a NamingSettings,
        signature: &'a ConfigSignature,
    ) -> Self {
        Self {
            registry,
            discoverer,
            matcher,
            config,
            naming,
            signature,
        }
    }

    /// Compile the plan mapping `source_type` onto `target_type`
    pub fn compile(
        &self,
        source_type: &TypeKey,
        target_type: &TypeKey,
        rule_set: RuleSetKind,
    ) -> Result<MappingPlan> {
        let span = debug_span!(
            "compile_plan",
            source = %source_type,
            target = %target_type,
            rule_set = %rule_set
        );
        let _entered = span.enter();

        let source_kind = self.registry.kind(source_type)?.clone();
        let target_kind = self.registry.kind(target_type)?.clone();
        let run = Run {
            source_type,
            target_type,
            rule_set: self.config.rule_set(rule_set),
            children: RefCell::new(FxHashMap::default()),
        };
        let target = QualifiedMember::root(target_type.clone(), target_kind);
        let level = Level {
            source: QualifiedMember::root(source_type.clone(), source_kind),
            path: target.clone(),
            target,
            source_type: source_type.clone(),
            target_type: target_type.clone(),
            unmatched: Vec::new(),
            creation: LevelCreation::Root,
        };

        let plan = self.compile_level(&run, level)?;
        debug!(
            populations = plan.populations.len(),
            child_plans = run.children.borrow().len(),
            "compiled mapping plan"
        );
        Ok(plan)
    }

    /// The plan for a child level, compiled once per compile
    fn compile_child(&self, run: &Run<'_>, level: Level) -> Result<Arc<MappingPlan>> {
        let key = self.level_key(run, &level);
        let existing = run.children.borrow().get(&key).cloned();
        if let Some(plan) = existing {
            trace!(target_type = %level.target_type, path = %level.path, "reusing child plan");
            return Ok(plan);
        }
        let plan = Arc::new(self.compile_level(run, level)?);
        run.children.borrow_mut().insert(key, Arc::clone(&plan));
        Ok(plan)
    }

    fn level_key(&self, run: &Run<'_>, level: &Level) -> LevelKey {
        let mut ancestry: Vec<TypeKey> = level.path.members()[1..]
            .iter()
            .filter(|m| m.kind() != MemberKind::EnumerableElement)
            .map(|m| m.effective_type().clone())
            .collect();
        ancestry.sort();
        LevelKey {
            source: level.source.clone(),
            target: level.target.clone(),
            source_type: level.source_type.clone(),
            target_type: level.target_type.clone(),
            unmatched: level.unmatched.clone(),
            creation: level.creation,
            at_root: level.path.is_root(),
            ancestry,
            rules: self.config.rules_reaching(&level.path, run.rule_set.kind()),
        }
    }

    fn compile_level(&self, run: &Run<'_>, level: Level) -> Result<MappingPlan> {
        let key = PlanKey {
            source_type: level.source_type.clone(),
            target_type: level.target_type.clone(),
            rule_set: run.rule_set.kind(),
            signature: self.signature.clone(),
        };

        let short_circuits = self.short_circuits(run, &level)?;
        let construction = self.construction(run, &level)?;

        let supplied: Vec<&str> = match &construction {
            Construction::Constructor { arguments, .. } => arguments
                .iter()
                .filter(|a| !a.data_sources.is_empty())
                .map(|a| a.parameter.name())
                .collect(),
            _ => Vec::new(),
        };

        let mut populations = Vec::new();
        for member in self.discoverer.target_members(&level.target_type)?.iter() {
            if member.kind() == MemberKind::ConstructorParameter {
                continue;
            }
            if supplied.iter().any(|p| p.eq_ignore_ascii_case(member.name())) {
                trace!(member = %member, "supplied by constructor");
                continue;
            }
            populations.push(self.populate(run, &level, member, false)?);
        }

        let null_groups = assign_null_groups(&mut populations, run.rule_set.null_strategy());
        let failure_guard = FailureGuard {
            source_type: level.source_type.clone(),
            target_type: level.target_type.clone(),
            handling: self
                .config
                .error_handling(&level.source_type, &level.target_type),
        };

        Ok(MappingPlan {
            key,
            source: level.source,
            target: level.target,
            short_circuits,
            construction,
            populations,
            null_groups,
            failure_guard,
        })
    }

    fn short_circuits(&self, run: &Run<'_>, level: &Level) -> Result<Vec<ShortCircuit>> {
        let mut short_circuits = Vec::new();
        // unflattened levels read the parent's source object
        if run.rule_set.tracks_identity() && level.unmatched.is_empty() {
            short_circuits.push(ShortCircuit::AlreadyMapped);
        }
        let result = match level.creation {
            LevelCreation::InPlace => NullSourceResult::ExistingTarget,
            LevelCreation::Root | LevelCreation::Nested => run.rule_set.null_source(),
        };
        short_circuits.push(ShortCircuit::NullSource { result });

        let pairings: Vec<_> = self
            .config
            .derived_pairings_for(self.registry, &level.source_type, &level.target_type)
            .cloned()
            .collect();
        for pairing in pairings {
            trace!(pairing = %pairing, "compiling derived type plan");
            let derived = Level {
                source_type: pairing.source_derived.clone(),
                target_type: pairing.target_derived.clone(),
                ..level.clone()
            };
            let plan = self.compile_child(run, derived)?;
            short_circuits.push(ShortCircuit::DerivedType {
                condition: Guard::SourceIs(pairing.source_derived),
                plan,
            });
        }
        Ok(short_circuits)
    }

    fn construction(&self, run: &Run<'_>, level: &Level) -> Result<Construction> {
        if level.creation == LevelCreation::InPlace {
            return Ok(Construction::UseExisting { fallback: None });
        }
        match run.rule_set.creation() {
            TargetCreation::Construct => self.construct(run, level),
            TargetCreation::UseExisting => {
                let fallback = match self.construct(run, level) {
                    Ok(construction) => Some(Box::new(construction)),
                    Err(Error::UnsatisfiableConstructor { parameter, .. }) => {
                        debug!(
                            target_type = %level.target_type,
                            parameter = %parameter,
                            "no construction fallback for existing target"
                        );
                        None
                    }
                    Err(e) => return Err(e),
                };
                Ok(Construction::UseExisting { fallback })
            }
        }
    }

    fn construct(&self, run: &Run<'_>, level: &Level) -> Result<Construction> {
        let constructors = self.discoverer.constructors(&level.target_type)?;
        let selection = select_constructor(&constructors, |parameter| {
            let population = self.populate(run, level, &parameter.member, true)?;
            Ok(population.is_populated().then(|| ConstructorArgument {
                parameter: parameter.member.clone(),
                data_sources: population.data_sources,
                guard: population.guard,
            }))
        })?;

        match selection {
            ConstructorSelection::Constructor {
                constructor,
                arguments,
            } => Ok(Construction::Constructor {
                constructor,
                arguments,
            }),
            ConstructorSelection::DefaultThenPopulate => Ok(Construction::DefaultThenPopulate),
            ConstructorSelection::Unsatisfiable { parameter } => {
                Err(Error::UnsatisfiableConstructor {
                    source_type: level.source_type.to_string(),
                    target_type: level.target_type.to_string(),
                    parameter,
                })
            }
        }
    }

    /// Resolve one target member of `level`
    fn populate(
        &self,
        run: &Run<'_>,
        level: &Level,
        member: &Member,
        for_constructor: bool,
    ) -> Result<MemberPopulation> {
        let target = level.target.append(member.clone());
        let path = level.path.append(member.clone());

        if path.is_recursive() && path.recursion_depth() >= self.config.max_recursion_depth() {
            trace!(target_member = %path, "recursion limit reached");
            return Ok(MemberPopulation::unpopulated(
                target,
                UnpopulatedReason::RecursionLimit,
            ));
        }

        let query = OverrideQuery {
            source_type: run.source_type,
            target_type: run.target_type,
            level_source_type: &level.source_type,
            level_target_type: &level.target_type,
            rule_set: run.rule_set.kind(),
        };
        let mut guards = Vec::new();
        let mut data_sources = Vec::new();
        match self.config.directive(&query, &path)? {
            Some(MemberDirective::Ignore { condition: None }) => {
                trace!(target_member = %path, "ignored");
                return Ok(MemberPopulation::unpopulated(target, UnpopulatedReason::Ignored));
            }
            Some(MemberDirective::Ignore {
                condition: Some(condition),
            }) => guards.push(condition.negate()),
            Some(MemberDirective::Override(source)) => {
                let conditional = source.condition.is_some();
                data_sources.push(source);
                if !conditional {
                    return Ok(MemberPopulation::populated(target, data_sources));
                }
            }
            None => {}
        }

        let mut null_checks = Vec::new();
        if let Some((mut source, checks)) = self.match_source(run, level, member, &path)? {
            if data_sources.is_empty() {
                null_checks = checks;
            } else {
                // a fallback behind a conditional override guards its own access
                source.condition = Guard::and(checks.into_iter().map(Guard::NotNull));
            }
            data_sources.push(source);
        }

        if data_sources.is_empty() {
            trace!(target_member = %path, "no data source");
            return Ok(MemberPopulation::unpopulated(
                target,
                UnpopulatedReason::NoMatchingSource,
            ));
        }

        guards.extend(null_checks.iter().cloned().map(Guard::NotNull));
        if !for_constructor && run.rule_set.guards_populated_values() && member.is_simple() {
            guards.push(Guard::TargetUnpopulated(target.path()));
        }

        let mut population = MemberPopulation::populated(target, data_sources);
        population.guard = Guard::and(guards);
        population.null_checks = null_checks;
        Ok(population)
    }

    /// Matched data source for `member` plus the null checks its source path
    /// needs
    fn match_source(
        &self,
        run: &Run<'_>,
        level: &Level,
        member: &Member,
        path: &QualifiedMember,
    ) -> Result<Option<(DataSource, Vec<String>)>> {
        let context = MatchContext {
            registry: self.registry,
            discoverer: self.discoverer,
            naming: self.naming,
            source_parent: &level.source,
            source_type: &level.source_type,
            unmatched_names: &level.unmatched,
        };
        match self.matcher.find_best_source_member(member, &context)? {
            Some(found) => {
                let checks = Guard::nested_access(&found.member, level.source.depth());
                let source = self.data_source_for(run, member, path, found.member)?;
                Ok(Some((source, checks)))
            }
            None if matches!(member.value_kind(), TypeKind::Complex) => {
                self.unflatten(run, level, member, path)
            }
            None => Ok(None),
        }
    }

    fn data_source_for(
        &self,
        run: &Run<'_>,
        member: &Member,
        path: &QualifiedMember,
        source: QualifiedMember,
    ) -> Result<DataSource> {
        let value_type = member.value_type().clone();
        let source_leaf = source.leaf().clone();

        let data_source = match (member.value_kind(), source_leaf.value_kind()) {
            (TypeKind::Simple(_), _) => {
                let conversion = self
                    .registry
                    .conversion(source_leaf.value_type(), member.value_type());
                DataSource::new(DataSourceKind::SourceMember(source), value_type)
                    .with_conversion(conversion)
            }
            (
                TypeKind::Enumerable { .. } | TypeKind::Array { .. },
                TypeKind::Enumerable { .. } | TypeKind::Array { .. },
            ) => {
                let element = self.element_mapping(run, &source, path)?;
                DataSource::new(DataSourceKind::ElementPlan { source, element }, value_type)
            }
            (
                TypeKind::Complex | TypeKind::Dictionary { .. },
                TypeKind::Complex | TypeKind::Dictionary { .. },
            ) => {
                let nested = Level {
                    source: QualifiedMember::root(
                        source_leaf.value_type().clone(),
                        source_leaf.value_kind().clone(),
                    ),
                    target: QualifiedMember::root(
                        member.value_type().clone(),
                        member.value_kind().clone(),
                    ),
                    source_type: source_leaf.value_type().clone(),
                    target_type: member.value_type().clone(),
                    path: path.clone(),
                    unmatched: Vec::new(),
                    creation: creation_for(member),
                };
                let plan = self.compile_child(run, nested)?;
                DataSource::new(DataSourceKind::NestedPlan { source, plan }, value_type)
            }
            _ => DataSource::new(DataSourceKind::SourceMember(source), value_type),
        };
        Ok(data_source)
    }

    /// How elements of the `source` collection become elements of the
    /// collection at `path`
    fn element_mapping(
        &self,
        run: &Run<'_>,
        source: &QualifiedMember,
        path: &QualifiedMember,
    ) -> Result<ElementMapping> {
        let source_element = self.element_member(source.leaf(), true)?;
        let target_element = self.element_member(path.leaf(), false)?;

        if target_element.is_simple() {
            let conversion = self
                .registry
                .conversion(source_element.value_type(), target_element.value_type())
                .unwrap_or(ValueConversion::Identity);
            return Ok(ElementMapping::Convert(conversion));
        }

        if is_collection(target_element.value_kind()) && is_collection(source_element.value_kind())
        {
            let inner = self.element_mapping(
                run,
                &source.append(source_element),
                &path.append(target_element),
            )?;
            return Ok(ElementMapping::Elements(Box::new(inner)));
        }

        let level = Level {
            source: QualifiedMember::root(
                source_element.value_type().clone(),
                source_element.value_kind().clone(),
            ),
            target: QualifiedMember::root(
                target_element.value_type().clone(),
                target_element.value_kind().clone(),
            ),
            source_type: source_element.value_type().clone(),
            target_type: target_element.value_type().clone(),
            path: path.append(target_element),
            unmatched: Vec::new(),
            creation: LevelCreation::Nested,
        };
        Ok(ElementMapping::Plan(self.compile_child(run, level)?))
    }

    fn element_member(&self, container: &Member, source_side: bool) -> Result<Member> {
        let members = if source_side {
            self.discoverer.source_members(container.value_type())?
        } else {
            self.discoverer.target_members(container.value_type())?
        };
        members
            .iter()
            .find(|m| m.kind() == MemberKind::EnumerableElement)
            .cloned()
            .ok_or_else(|| Error::Internal {
                message: format!("{} exposes no element member", container.value_type()),
                source: anyhow::anyhow!("enumerable discovery returned no element"),
            })
    }

    /// Populate an unmatched complex target member from the parent source
    /// object, matching its members by their full flattened names
    fn unflatten(
        &self,
        run: &Run<'_>,
        level: &Level,
        member: &Member,
        path: &QualifiedMember,
    ) -> Result<Option<(DataSource, Vec<String>)>> {
        let mut unmatched = level.unmatched.clone();
        unmatched.push(member.name().to_string());
        let nested = Level {
            source: level.source.clone(),
            target: QualifiedMember::root(member.value_type().clone(), member.value_kind().clone()),
            source_type: level.source_type.clone(),
            target_type: member.value_type().clone(),
            path: path.clone(),
            unmatched,
            creation: creation_for(member),
        };
        let plan = match self.compile_child(run, nested) {
            Ok(plan) => plan,
            Err(Error::UnsatisfiableConstructor { .. }) => return Ok(None),
            Err(e) => return Err(e),
        };
        let populates_anything = plan.populations.iter().any(MemberPopulation::is_populated)
            || plan
                .constructor_arguments()
                .iter()
                .any(|a| !a.data_sources.is_empty());
        if !populates_anything {
            return Ok(None);
        }
        trace!(target_member = %path, "unflattened from parent source");
        let source = DataSource::new(
            DataSourceKind::NestedPlan {
                source: level.source.clone(),
                plan,
            },
            member.value_type().clone(),
        );
        Ok(Some((source, Vec::new())))
    }
}

fn creation_for(member: &Member) -> LevelCreation {
    if member.is_writeable() {
        LevelCreation::Nested
    } else {
        LevelCreation::InPlace
    }
}

fn is_collection(kind: &TypeKind) -> bool {
    matches!(kind, TypeKind::Enumerable { .. } | TypeKind::Array { .. })
}

impl std::fmt::Debug for PlanCompiler<'_> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PlanCompiler")
            .field("signature", self.signature)
            .finish_non_exhaustive()
    }
}
