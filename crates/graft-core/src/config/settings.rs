//! Engine settings loaded from JSON
//!
//! Copyright (c) 2025 Graft Team
//! Licensed under the Apache-2.0 license

use crate::cache::KeyComparison;
use crate::naming::NamingOptions;
use crate::{Error, Result};
use serde::{Deserialize, Serialize};
use std::path::Path;

/// Default number of self-referential levels mapped before stopping
pub const DEFAULT_MAX_RECURSION_DEPTH: usize = 1;

/// Serializable engine settings
///
/// Every field is optional in JSON:
///
/// ```
/// use graft_core::config::EngineSettings;
///
/// let settings = EngineSettings::from_json(
///     r#"{ "naming": { "patterns": ["_{name}"] }, "max_recursion_depth": 2 }"#,
/// ).unwrap();
/// assert_eq!(settings.max_recursion_depth, 2);
/// assert_eq!(settings.naming.separators, vec!["", "_"]);
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineSettings {
    pub naming: NamingOptions,
    pub max_recursion_depth: usize,
    /// Key comparison of the plan cache
    pub plan_cache: KeyComparison,
}

impl Default for EngineSettings {
    fn default() -> Self {
        Self {
            naming: NamingOptions::default(),
            max_recursion_depth: DEFAULT_MAX_RECURSION_DEPTH,
            plan_cache: KeyComparison::HashOrdered,
        }
    }
}

impl EngineSettings {
    /// Parse settings from a JSON document
    pub fn from_json(json: &str) -> Result<Self> {
        serde_json::from_str(json).map_err(|e| Error::Settings {
            message: format!("invalid engine settings: {e}"),
            source: Some(e),
        })
    }

    /// Read settings from a JSON file
    pub fn from_file(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path).map_err(|e| Error::Settings {
            message: format!("failed to read {}: {e}", path.display()),
            source: None,
        })?;
        Self::from_json(&content)
    }
}
