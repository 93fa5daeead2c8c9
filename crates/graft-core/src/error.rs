//! Error types for the Graft core library
//!
//! This module defines the error handling system for plan compilation,
//! using thiserror for ergonomic error definitions and anyhow for flexible
//! runtime error sources.
//!
//! Copyright (c) 2025 Graft Team
//! Licensed under the Apache-2.0 license

use serde::{Deserialize, Serialize};
use std::fmt;
use thiserror::Error;

/// Main error type for Graft operations
#[derive(Error, Debug)]
pub enum Error {
    /// A constructor parameter has no data source and no other constructor fits
    #[error(
        "Unable to construct {target_type} from {source_type}: no data source for constructor parameter '{parameter}'"
    )]
    UnsatisfiableConstructor {
        source_type: String,
        target_type: String,
        parameter: String,
    },

    /// Two member rules claim the same target member path
    #[error("Conflicting configuration for {source_type} -> {target_type}, member '{path}': {message}")]
    ConflictingOverrides {
        source_type: String,
        target_type: String,
        path: String,
        message: String,
    },

    /// Naming patterns must contain exactly one placeholder
    #[error("Invalid naming pattern '{pattern}': expected exactly one {{name}} placeholder, found {placeholders}")]
    InvalidNamingPattern { pattern: String, placeholders: usize },

    /// A configured member path does not resolve against the target type
    #[error("Invalid member path '{path}' on type {type_name}")]
    InvalidMemberPath { type_name: String, path: String },

    /// A configured derived type pairing is not usable
    #[error("Invalid derived type pairing {base_type} -> {derived_type}: {message}")]
    InvalidDerivedPairing {
        base_type: String,
        derived_type: String,
        message: String,
    },

    /// The type is not known to the registry
    #[error("Unknown type: {type_name}")]
    UnknownType { type_name: String },

    /// Explicit validation found target members without a data source
    #[error("Incomplete mapping plan {source_type} -> {target_type}: unmapped members [{}]", .members.join(", "))]
    IncompletePlan {
        source_type: String,
        target_type: String,
        members: Vec<String>,
    },

    /// Runtime failure while evaluating a data source, wrapped with path context
    #[error("Mapping {source_type} -> {target_type} failed at '{path}': {source}")]
    Mapping {
        source_type: String,
        target_type: String,
        path: String,
        #[source]
        source: anyhow::Error,
    },

    /// Settings could not be parsed
    #[error("Settings error: {message}")]
    Settings {
        message: String,
        #[source]
        source: Option<serde_json::Error>,
    },

    /// Generic internal error with context
    #[error("Internal error: {message}")]
    Internal {
        message: String,
        #[source]
        source: anyhow::Error,
    },
}

/// Convenience type alias for Results using our Error type
pub type Result<T> = std::result::Result<T, Error>;

/// Broad classification of errors, used by callers deciding whether a retry
/// with corrected configuration makes sense
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ErrorCategory {
    /// Fatal to one plan; fix the configuration and retry
    Configuration,
    /// Raised only by explicit validation
    Validation,
    /// Raised while a compiled plan runs
    Runtime,
    /// Bug or unexpected state
    Internal,
}

impl Error {
    /// Classify this error
    pub fn category(&self) -> ErrorCategory {
        match self {
            Error::UnsatisfiableConstructor { .. }
            | Error::ConflictingOverrides { .. }
            | Error::InvalidNamingPattern { .. }
            | Error::InvalidMemberPath { .. }
            | Error::InvalidDerivedPairing { .. }
            | Error::UnknownType { .. }
            | Error::Settings { .. } => ErrorCategory::Configuration,
            Error::IncompletePlan { .. } => ErrorCategory::Validation,
            Error::Mapping { .. } => ErrorCategory::Runtime,
            Error::Internal { .. } => ErrorCategory::Internal,
        }
    }

    /// Whether this is a compile-time configuration error
    pub fn is_configuration(&self) -> bool {
        self.category() == ErrorCategory::Configuration
    }
}

impl fmt::Display for ErrorCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ErrorCategory::Configuration => write!(f, "configuration"),
            ErrorCategory::Validation => write!(f, "validation"),
            ErrorCategory::Runtime => write!(f, "runtime"),
            ErrorCategory::Internal => write!(f, "internal"),
        }
    }
}

impl From<serde_json::Error> for Error {
    fn from(err: serde_json::Error) -> Self {
        Error::Settings {
            message: err.to_string(),
            source: Some(err),
        }
    }
}

impl From<anyhow::Error> for Error {
    fn from(err: anyhow::Error) -> Self {
        Error::Internal {
            message: err.to_string(),
            source: err,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let err = Error::UnsatisfiableConstructor {
            source_type: "PersonDto".to_string(),
            target_type: "Person".to_string(),
            parameter: "name".to_string(),
        };
        let message = err.to_string();
        assert!(message.contains("PersonDto"));
        assert!(message.contains("Person"));
        assert!(message.contains("'name'"));
    }

    #[test]
    fn test_naming_pattern_display() {
        let err = Error::InvalidNamingPattern {
            pattern: "_{name}{name}".to_string(),
            placeholders: 2,
        };
        assert_eq!(
            err.to_string(),
            "Invalid naming pattern '_{name}{name}': expected exactly one {name} placeholder, found 2"
        );
    }

    #[test]
    fn test_incomplete_plan_lists_members() {
        let err = Error::IncompletePlan {
            source_type: "A".to_string(),
            target_type: "B".to_string(),
            members: vec!["Extra".to_string(), "Other.Value".to_string()],
        };
        assert!(err.to_string().ends_with("[Extra, Other.Value]"));
    }

    #[test]
    fn test_error_categories() {
        let err = Error::UnknownType {
            type_name: "Missing".to_string(),
        };
        assert!(err.is_configuration());

        let err = Error::Mapping {
            source_type: "A".to_string(),
            target_type: "B".to_string(),
            path: "Value".to_string(),
            source: anyhow::anyhow!("boom"),
        };
        assert_eq!(err.category(), ErrorCategory::Runtime);
        assert_eq!(err.category().to_string(), "runtime");
    }
}
