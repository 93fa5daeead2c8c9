//! Graft Core - Object-graph mapping plan compiler
//!
//! Given the member graphs of a source type and a target type, this crate
//! derives a reusable, declarative [`MappingPlan`] describing how target
//! instances are created and populated from source instances. Plans are
//! compiled once per (source type, target type, rule set, configuration) and
//! shared from a concurrency-safe cache.
//!
//! # Main Components
//!
//! - **Type Registry**: static type descriptors standing in for runtime reflection
//! - **Member Discovery**: readable and populatable members, constructors
//! - **Member Matching**: exact, case-insensitive, flattened and identifier matches
//! - **Plan Compiler**: data sources, guards, null groups, construction
//! - **Memoized Cache**: compute-once storage shared by every stage
//!
//! # Example
//!
//! ```
//! use graft_core::{Mapper, RuleSetKind, TypeDescriptor, TypeKey, TypeRegistry};
//! use std::sync::Arc;
//!
//! fn example() -> graft_core::Result<()> {
//!     let registry = TypeRegistry::new()
//!         .with(TypeDescriptor::complex("Address").property("Line1", "String").build())
//!         .with(
//!             TypeDescriptor::complex("Person")
//!                 .property("Name", "String")
//!                 .property("Address", "Address")
//!                 .build(),
//!         )
//!         .with(
//!             TypeDescriptor::complex("PersonDto")
//!                 .property("Name", "String")
//!                 .property("AddressLine1", "String")
//!                 .build(),
//!         );
//!
//!     let mapper = Mapper::new(Arc::new(registry))?;
//!     let plan = mapper.plan_for(
//!         &TypeKey::new("Person"),
//!         &TypeKey::new("PersonDto"),
//!         RuleSetKind::CreateNew,
//!     )?;
//!     println!("{plan}");
//!     Ok(())
//! }
//! # example().unwrap();
//! ```

pub mod cache;
pub mod config;
pub mod discovery;
pub mod engine;
pub mod error;
pub mod matcher;
pub mod member;
pub mod naming;
pub mod plan;
pub mod registry;
pub mod rule_set;

// Re-export main types for convenience
pub use cache::{CacheStats, KeyComparison, MemoCache};
pub use config::{
    ConfigSignature, DerivedPairing, EngineSettings, MappingConfiguration, MemberRule,
    OverrideQuery,
};
pub use discovery::{
    DictionaryKey, DictionaryMemberDiscoverer, MemberDiscoverer, TypeMetadataDiscoverer,
};
pub use engine::Mapper;
pub use error::{Error, ErrorCategory, Result};
pub use matcher::{MatchQuality, MemberMatcher, SourceMatch};
pub use member::{Member, MemberKind, QualifiedMember};
pub use naming::{NamingOptions, NamingSettings};
pub use plan::{
    Construction, DataSource, DataSourceKind, Guard, MappingPlan, MemberPopulation, PlanKey,
    ShortCircuit, UnpopulatedReason,
};
pub use registry::{SimpleKind, TypeDescriptor, TypeKey, TypeKind, TypeRegistry};
pub use rule_set::{RuleSet, RuleSetKind};

/// Library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
