//! Mapper: the engine facade
//!
//! A [`Mapper`] owns the type registry, a member discoverer, the current
//! configuration and one memo cache per concern. Plans are requested with
//! [`Mapper::plan_for`] and compiled at most once per (source type, target
//! type, rule set, configuration signature).
//!
//! # Example
//!
//! ```
//! use graft_core::{Mapper, RuleSetKind, TypeDescriptor, TypeKey, TypeRegistry};
//! use std::sync::Arc;
//!
//! let registry = TypeRegistry::new()
//!     .with(TypeDescriptor::complex("Person").property("Name", "String").build())
//!     .with(TypeDescriptor::complex("PersonDto").property("Name", "String").build());
//! let mapper = Mapper::new(Arc::new(registry)).unwrap();
//!
//! let plan = mapper
//!     .plan_for(&TypeKey::new("Person"), &TypeKey::new("PersonDto"), RuleSetKind::CreateNew)
//!     .unwrap();
//! assert!(plan.unmapped_members().is_empty());
//! ```
//!
//! Copyright (c) 2025 Graft Team
//! Licensed under the Apache-2.0 license

use crate::cache::{CacheStats, KeyComparison, MemoCache};
use crate::config::{ConfigSignature, EngineSettings, MappingConfiguration};
use crate::discovery::{MemberDiscoverer, TypeMetadataDiscoverer};
use crate::matcher::MemberMatcher;
use crate::naming::{NamingOptions, NamingSettings};
use crate::plan::{MappingPlan, PlanCompiler, PlanKey};
use crate::registry::{TypeKey, TypeRegistry};
use crate::rule_set::RuleSetKind;
use crate::{Error, Result};
use parking_lot::RwLock;
use std::sync::Arc;
use tracing::{debug, info};

/// A configuration snapshot; replaced wholesale by [`Mapper::configure`]
struct EngineState {
    config: MappingConfiguration,
    signature: ConfigSignature,
    naming: Arc<NamingSettings>,
}

/// Plan compilation engine
pub struct Mapper {
    registry: Arc<TypeRegistry>,
    discoverer: Arc<dyn MemberDiscoverer>,
    state: RwLock<Arc<EngineState>>,
    plans: MemoCache<PlanKey, Arc<MappingPlan>>,
    matcher: MemberMatcher,
    naming: MemoCache<NamingOptions, Arc<NamingSettings>>,
}

impl Mapper {
    /// Mapper with default settings, discovering members from type metadata
    pub fn new(registry: Arc<TypeRegistry>) -> Result<Self> {
        Self::with_settings(registry, &EngineSettings::default())
    }

    pub fn with_settings(registry: Arc<TypeRegistry>, settings: &EngineSettings) -> Result<Self> {
        let discoverer = Arc::new(TypeMetadataDiscoverer::new(Arc::clone(&registry)));
        Self::with_discoverer(registry, discoverer, settings)
    }

    /// Mapper using a custom member discoverer
    pub fn with_discoverer(
        registry: Arc<TypeRegistry>,
        discoverer: Arc<dyn MemberDiscoverer>,
        settings: &EngineSettings,
    ) -> Result<Self> {
        let naming = MemoCache::new("naming_settings", KeyComparison::Equality);
        let config = MappingConfiguration::from_settings(settings)?;
        let state = Self::snapshot(&naming, config)?;
        debug!(
            types = registry.len(),
            plan_cache = %settings.plan_cache,
            "mapper created"
        );
        Ok(Self {
            registry,
            discoverer,
            state: RwLock::new(Arc::new(state)),
            plans: MemoCache::new("mapping_plans", settings.plan_cache),
            matcher: MemberMatcher::new(),
            naming,
        })
    }

    fn snapshot(
        naming: &MemoCache<NamingOptions, Arc<NamingSettings>>,
        config: MappingConfiguration,
    ) -> Result<EngineState> {
        let settings = naming.get_or_try_add(config.naming().clone(), |options| {
            NamingSettings::compile(options).map(Arc::new)
        })?;
        Ok(EngineState {
            signature: config.signature(),
            naming: settings,
            config,
        })
    }

    pub fn registry(&self) -> &Arc<TypeRegistry> {
        &self.registry
    }

    /// Copy of the current configuration
    pub fn configuration(&self) -> MappingConfiguration {
        self.state.read().config.clone()
    }

    /// Signature of the current configuration
    pub fn signature(&self) -> ConfigSignature {
        self.state.read().signature.clone()
    }

    /// Change the configuration
    ///
    /// `update` edits a copy of the current configuration, which is validated
    /// against the registry before it replaces the current one. On error the
    /// current configuration is kept. Plans compiled under earlier
    /// configurations stay cached under their own signatures.
    pub fn configure<F>(&self, update: F) -> Result<()>
    where
        F: FnOnce(&mut MappingConfiguration) -> Result<()>,
    {
        let mut state = self.state.write();
        let mut config = state.config.clone();
        update(&mut config)?;
        config.validate(&self.registry, &*self.discoverer)?;

        let next = Self::snapshot(&self.naming, config)?;
        info!(
            signature = %next.signature,
            rules = next.config.rules().len(),
            derived_pairings = next.config.derived_pairings().len(),
            "configuration updated"
        );
        *state = Arc::new(next);
        Ok(())
    }

    /// The plan mapping `source_type` onto `target_type`, compiled on first use
    pub fn plan_for(
        &self,
        source_type: &TypeKey,
        target_type: &TypeKey,
        rule_set: RuleSetKind,
    ) -> Result<Arc<MappingPlan>> {
        let state = Arc::clone(&self.state.read());
        let key = PlanKey {
            source_type: source_type.clone(),
            target_type: target_type.clone(),
            rule_set,
            signature: state.signature.clone(),
        };
        self.plans.get_or_try_add(key, |key| {
            let compiler = PlanCompiler::new(
                &self.registry,
                &*self.discoverer,
                &self.matcher,
                &state.config,
                &state.naming,
                &state.signature,
            );
            compiler
                .compile(&key.source_type, &key.target_type, key.rule_set)
                .map(Arc::new)
        })
    }

    /// The plan for a type pair, failing if any target member is unmapped
    pub fn validate(
        &self,
        source_type: &TypeKey,
        target_type: &TypeKey,
        rule_set: RuleSetKind,
    ) -> Result<Arc<MappingPlan>> {
        let plan = self.plan_for(source_type, target_type, rule_set)?;
        let members = plan.unmapped_members();
        if !members.is_empty() {
            return Err(Error::IncompletePlan {
                source_type: source_type.to_string(),
                target_type: target_type.to_string(),
                members,
            });
        }
        Ok(plan)
    }

    /// Every plan compiled so far
    pub fn compiled_plans(&self) -> Vec<Arc<MappingPlan>> {
        self.plans.values()
    }

    /// Clear compiled plans and member matches
    pub fn reset_caches(&self) {
        self.plans.reset();
        self.matcher.reset();
        self.naming.reset();
        info!("mapper caches reset");
    }

    /// Statistics of the plan, match and naming caches
    pub fn stats(&self) -> Vec<CacheStats> {
        vec![self.plans.stats(), self.matcher.stats(), self.naming.stats()]
    }
}

impl std::fmt::Debug for Mapper {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Mapper")
            .field("types", &self.registry.len())
            .field("signature", &self.signature())
            .field("plans", &self.plans.len())
            .finish_non_exhaustive()
    }
}
