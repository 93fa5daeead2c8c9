//! Constructor selection
//!
//! Constructors are tried greediest first. The first one whose required
//! parameters all resolve is used; optional parameters that do not resolve
//! keep their defaults. A parameterless constructor, or none at all, means
//! default-then-populate.
//!
//! Copyright (c) 2025 Graft Team
//! Licensed under the Apache-2.0 license

use super::ConstructorArgument;
use crate::discovery::{Constructor, ConstructorParameter};
use crate::Result;

/// Outcome of constructor selection
#[derive(Debug, Clone, PartialEq)]
pub enum ConstructorSelection {
    Constructor {
        constructor: Constructor,
        arguments: Vec<ConstructorArgument>,
    },
    DefaultThenPopulate,
    /// No constructor fits; names the first unresolved required parameter
    /// of the greediest constructor
    Unsatisfiable { parameter: String },
}

/// Select a constructor, resolving parameters with `resolve`
///
/// `resolve` returns `None` for a parameter without a data source; errors
/// abort selection.
pub fn select_constructor<F>(constructors: &[Constructor], mut resolve: F) -> Result<ConstructorSelection>
where
    F: FnMut(&ConstructorParameter) -> Result<Option<ConstructorArgument>>,
{
    let mut first_unsatisfiable: Option<String> = None;

    'constructors: for constructor in constructors {
        if constructor.is_parameterless() {
            return Ok(ConstructorSelection::DefaultThenPopulate);
        }
        let mut arguments = Vec::with_capacity(constructor.arity());
        for parameter in &constructor.parameters {
            match resolve(parameter)? {
                Some(argument) => arguments.push(argument),
                None if parameter.optional => arguments.push(ConstructorArgument {
                    parameter: parameter.member.clone(),
                    data_sources: Vec::new(),
                    guard: None,
                }),
                None => {
                    first_unsatisfiable.get_or_insert_with(|| parameter.member.name().to_string());
                    continue 'constructors;
                }
            }
        }
        return Ok(ConstructorSelection::Constructor {
            constructor: constructor.clone(),
            arguments,
        });
    }

    Ok(match first_unsatisfiable {
        Some(parameter) => ConstructorSelection::Unsatisfiable { parameter },
        None => ConstructorSelection::DefaultThenPopulate,
    })
}
