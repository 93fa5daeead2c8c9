//! Data sources and guards
//!
//! A [`DataSource`] says where a target member's value comes from; a
//! [`Guard`] says when it applies. Both are declarative: the execution backend
//! decides how to evaluate them.
//!
//! Copyright (c) 2025 Graft Team
//! Licensed under the Apache-2.0 license

use super::MappingPlan;
use crate::member::QualifiedMember;
use crate::registry::{TypeKey, ValueConversion};
use std::fmt;
use std::sync::Arc;

/// Declarative condition tree
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Guard {
    /// The source value at this path is not null
    NotNull(String),
    /// A configured condition, identified by its description
    Configured(String),
    /// The target value at this path still holds its default
    TargetUnpopulated(String),
    /// The runtime source object is an instance of this type
    SourceIs(TypeKey),
    And(Vec<Guard>),
    Or(Vec<Guard>),
    Not(Box<Guard>),
}

impl Guard {
    /// Conjunction of `guards`, flattened and de-duplicated; `None` when empty
    pub fn and(guards: impl IntoIterator<Item = Guard>) -> Option<Guard> {
        Self::combine(guards, true)
    }

    /// Disjunction of `guards`, flattened and de-duplicated; `None` when empty
    pub fn or(guards: impl IntoIterator<Item = Guard>) -> Option<Guard> {
        Self::combine(guards, false)
    }

    fn combine(guards: impl IntoIterator<Item = Guard>, conjunction: bool) -> Option<Guard> {
        let mut flat: Vec<Guard> = Vec::new();
        for guard in guards {
            let parts = match guard {
                Guard::And(parts) if conjunction => parts,
                Guard::Or(parts) if !conjunction => parts,
                other => vec![other],
            };
            for part in parts {
                if !flat.contains(&part) {
                    flat.push(part);
                }
            }
        }
        match flat.len() {
            0 => None,
            1 => flat.pop(),
            _ if conjunction => Some(Guard::And(flat)),
            _ => Some(Guard::Or(flat)),
        }
    }

    /// Logical negation, cancelling a double negation
    pub fn negate(self) -> Guard {
        match self {
            Guard::Not(inner) => *inner,
            other => Guard::Not(Box::new(other)),
        }
    }

    /// Null checks for every complex intermediate of `source` below the
    /// first `level_depth` chain members
    pub fn nested_access(source: &QualifiedMember, level_depth: usize) -> Vec<String> {
        source
            .intermediate_chains()
            .into_iter()
            .filter(|chain| chain.depth() > level_depth.max(1) && !chain.leaf().is_simple())
            .map(|chain| chain.path())
            .collect()
    }
}

impl fmt::Display for Guard {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Guard::NotNull(path) => write!(f, "{path} != null"),
            Guard::Configured(description) => write!(f, "{description}"),
            Guard::TargetUnpopulated(path) => write!(f, "target.{path} is unpopulated"),
            Guard::SourceIs(type_key) => write!(f, "source is {type_key}"),
            Guard::And(parts) | Guard::Or(parts) => {
                let separator = if matches!(self, Guard::And(_)) { " && " } else { " || " };
                let rendered: Vec<String> = parts.iter().map(ToString::to_string).collect();
                write!(f, "({})", rendered.join(separator))
            }
            Guard::Not(inner) => write!(f, "!({inner})"),
        }
    }
}

/// How an enumerable's elements are produced
#[derive(Debug, Clone, PartialEq)]
pub enum ElementMapping {
    /// Complex elements are mapped by their own plan
    Plan(Arc<MappingPlan>),
    /// Simple elements are converted
    Convert(ValueConversion),
    /// Elements that are collections themselves are mapped element by element
    Elements(Box<ElementMapping>),
}

impl ElementMapping {
    /// Plan of the innermost complex elements
    pub fn plan(&self) -> Option<&Arc<MappingPlan>> {
        match self {
            ElementMapping::Plan(plan) => Some(plan),
            ElementMapping::Elements(inner) => inner.plan(),
            ElementMapping::Convert(_) => None,
        }
    }

    /// Number of collection levels, counting this one
    pub fn depth(&self) -> usize {
        match self {
            ElementMapping::Elements(inner) => inner.depth() + 1,
            ElementMapping::Plan(_) | ElementMapping::Convert(_) => 1,
        }
    }
}

/// Where a value comes from
#[derive(Debug, Clone, PartialEq)]
pub enum DataSourceKind {
    /// A matched source member, read through its full chain
    SourceMember(QualifiedMember),
    /// A configured constant
    Constant(serde_json::Value),
    /// A configured expression, named for the backend
    Expression { name: String, description: String },
    /// A complex source member mapped by a child plan
    NestedPlan {
        source: QualifiedMember,
        plan: Arc<MappingPlan>,
    },
    /// An enumerable source member mapped element by element
    ElementPlan {
        source: QualifiedMember,
        element: ElementMapping,
    },
}

/// A resolved origin for a target member's value
#[derive(Debug, Clone, PartialEq)]
pub struct DataSource {
    pub kind: DataSourceKind,
    pub condition: Option<Guard>,
    pub value_type: TypeKey,
    /// Conversion applied to simple values
    pub conversion: Option<ValueConversion>,
}

impl DataSource {
    pub fn new(kind: DataSourceKind, value_type: TypeKey) -> Self {
        Self {
            kind,
            condition: None,
            value_type,
            conversion: None,
        }
    }

    pub fn with_condition(mut self, condition: Option<Guard>) -> Self {
        self.condition = condition;
        self
    }

    pub fn with_conversion(mut self, conversion: Option<ValueConversion>) -> Self {
        self.conversion = conversion;
        self
    }

    /// Source chain read by this data source, if any
    pub fn source_member(&self) -> Option<&QualifiedMember> {
        match &self.kind {
            DataSourceKind::SourceMember(source)
            | DataSourceKind::NestedPlan { source, .. }
            | DataSourceKind::ElementPlan { source, .. } => Some(source),
            DataSourceKind::Constant(_) | DataSourceKind::Expression { .. } => None,
        }
    }

    /// Whether this value comes from configuration rather than matching
    pub fn is_configured(&self) -> bool {
        matches!(
            self.kind,
            DataSourceKind::Constant(_) | DataSourceKind::Expression { .. }
        )
    }

    /// Child plan, if this data source delegates to one
    pub fn child_plan(&self) -> Option<&Arc<MappingPlan>> {
        match &self.kind {
            DataSourceKind::NestedPlan { plan, .. } => Some(plan),
            DataSourceKind::ElementPlan { element, .. } => element.plan(),
            _ => None,
        }
    }

    /// Collection levels between the source member and the child plan
    pub fn element_depth(&self) -> usize {
        match &self.kind {
            DataSourceKind::ElementPlan { element, .. } => element.depth(),
            _ => 0,
        }
    }
}

impl fmt::Display for DataSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.kind {
            DataSourceKind::SourceMember(source) => write!(f, "{}", source.path())?,
            DataSourceKind::Constant(value) => write!(f, "constant {value}")?,
            DataSourceKind::Expression { name, .. } => write!(f, "expression {name}")?,
            DataSourceKind::NestedPlan { source, plan } => {
                write!(f, "{} via plan {}", source.path(), plan.key().target_type)?
            }
            DataSourceKind::ElementPlan { source, element } => {
                write!(f, "{}{}", source.path(), "[i]".repeat(element.depth()))?;
                if let Some(plan) = element.plan() {
                    write!(f, " via plan {}", plan.key().target_type)?;
                }
            }
        }
        if let Some(conversion) = self.conversion {
            if conversion != ValueConversion::Identity {
                write!(f, " ({conversion:?})")?;
            }
        }
        if let Some(condition) = &self.condition {
            write!(f, " if {condition}")?;
        }
        Ok(())
    }
}
