//! Member naming conventions
//!
//! Naming options describe how member names relate across types: the
//! separators used when flattening nested member names (`AddressLine1`,
//! `Address_Line1`) and name patterns such as `_{name}` or `{name}Value` which
//! let a differently-decorated source member stand in for a target member.
//!
//! Copyright (c) 2025 Graft Team
//! Licensed under the Apache-2.0 license

use crate::{Error, Result};
use regex::Regex;
use serde::{Deserialize, Serialize};

/// Placeholder a name pattern must contain exactly once
pub const NAME_PLACEHOLDER: &str = "{name}";

/// Plain, serializable naming options
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(default)]
pub struct NamingOptions {
    /// Separators tried when joining nested member names
    pub separators: Vec<String>,
    /// Patterns containing exactly one `{name}` placeholder
    pub patterns: Vec<String>,
}

impl Default for NamingOptions {
    fn default() -> Self {
        Self {
            separators: vec![String::new(), "_".to_string()],
            patterns: Vec::new(),
        }
    }
}

/// A compiled name pattern
#[derive(Debug, Clone)]
pub struct NamePattern {
    template: String,
    regex: Regex,
}

impl NamePattern {
    /// Compile a template such as `_{name}`
    pub fn parse(template: &str) -> Result<Self> {
        let placeholders = template.matches(NAME_PLACEHOLDER).count();
        if placeholders != 1 {
            return Err(Error::InvalidNamingPattern {
                pattern: template.to_string(),
                placeholders,
            });
        }
        let (prefix, suffix) = template
            .split_once(NAME_PLACEHOLDER)
            .unwrap_or((template, ""));
        if prefix.is_empty() && suffix.is_empty() {
            return Err(Error::InvalidNamingPattern {
                pattern: template.to_string(),
                placeholders,
            });
        }
        let expression = format!(
            "(?i)^{}(?P<name>.+?){}$",
            regex::escape(prefix),
            regex::escape(suffix)
        );
        let regex = Regex::new(&expression).map_err(|e| Error::Internal {
            message: format!("failed to compile naming pattern '{template}'"),
            source: e.into(),
        })?;
        Ok(Self {
            template: template.to_string(),
            regex,
        })
    }

    /// The core name inside a decorated member name
    pub fn extract<'a>(&self, name: &'a str) -> Option<&'a str> {
        self.regex
            .captures(name)
            .and_then(|captures| captures.name("name"))
            .map(|m| m.as_str())
    }

    pub fn template(&self) -> &str {
        &self.template
    }
}

/// Compiled naming settings
#[derive(Debug, Clone)]
pub struct NamingSettings {
    options: NamingOptions,
    patterns: Vec<NamePattern>,
}

impl NamingSettings {
    /// Validate and compile naming options
    pub fn compile(options: &NamingOptions) -> Result<Self> {
        let patterns = options
            .patterns
            .iter()
            .map(|p| NamePattern::parse(p))
            .collect::<Result<Vec<_>>>()?;
        let mut options = options.clone();
        if options.separators.is_empty() {
            options.separators.push(String::new());
        }
        Ok(Self {
            options,
            patterns,
        })
    }

    pub fn options(&self) -> &NamingOptions {
        &self.options
    }

    pub fn separators(&self) -> &[String] {
        &self.options.separators
    }

    /// The member name plus any core names extracted by patterns
    pub fn name_variants<'a>(&self, name: &'a str) -> Vec<&'a str> {
        let mut variants = vec![name];
        for pattern in &self.patterns {
            if let Some(core) = pattern.extract(name) {
                if !variants.iter().any(|v| v.eq_ignore_ascii_case(core)) {
                    variants.push(core);
                }
            }
        }
        variants
    }

    /// Names a target chain may be known by: joined with each separator and
    /// dotted, most specific first
    pub fn joined_names(&self, names: &[&str]) -> Vec<String> {
        let mut joined: Vec<String> = Vec::new();
        let mut push = |candidate: String| {
            if !joined.contains(&candidate) {
                joined.push(candidate);
            }
        };
        for separator in self.separators() {
            push(names.join(separator));
        }
        push(names.join("."));
        joined
    }
}

impl Default for NamingSettings {
    fn default() -> Self {
        let options = NamingOptions::default();
        Self {
            options,
            patterns: Vec::new(),
        }
    }
}

/// Whether `name` is an identifier name for a member declared on `type_name`:
/// `Id`, `Identifier` or `<TypeName>Id`
pub fn is_identifier(name: &str, type_name: &str) -> bool {
    if name.eq_ignore_ascii_case("id") || name.eq_ignore_ascii_case("identifier") {
        return true;
    }
    name.len() == type_name.len() + 2
        && name[..type_name.len()].eq_ignore_ascii_case(type_name)
        && name[type_name.len()..].eq_ignore_ascii_case("id")
}

/// Case-insensitive prefix strip, respecting char boundaries
pub fn strip_prefix_ignore_case<'a>(value: &'a str, prefix: &str) -> Option<&'a str> {
    if value.len() < prefix.len() || !value.is_char_boundary(prefix.len()) {
        return None;
    }
    let (head, tail) = value.split_at(prefix.len());
    head.eq_ignore_ascii_case(prefix).then_some(tail)
}
