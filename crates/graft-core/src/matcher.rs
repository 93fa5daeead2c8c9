//! Source member matching
//!
//! For each target member the matcher looks for the source member that should
//! feed it. Candidates are the discovered source members of the source object
//! of the target member's level. A level whose target found no source of its
//! own reads its parent's source object and matches with the unmatched
//! ancestors' names prepended, which unflattens `Address.Line1` from
//! `AddressLine1`.
//!
//! Match quality, best first:
//!
//! | Quality | Rule |
//! |---|---|
//! | `Exact` | name equals a target token |
//! | `CaseInsensitive` | name equals a token ignoring case, or via a naming pattern |
//! | `Flattened` | a path of complex source members spells a token |
//! | `IdentifierAlias` | both are `Id`, `Identifier` or `<Type>Id` |
//!
//! Equal quality goes to the first candidate in discovery order.
//!
//! Copyright (c) 2025 Graft Team
//! Licensed under the Apache-2.0 license

use crate::cache::{CacheStats, KeyComparison, MemoCache};
use crate::discovery::MemberDiscoverer;
use crate::member::{Member, MemberKind, QualifiedMember};
use crate::naming::{is_identifier, strip_prefix_ignore_case, NamingOptions, NamingSettings};
use crate::registry::{TypeKey, TypeKind, TypeRegistry};
use crate::Result;
use std::fmt;
use tracing::trace;

/// How well a source member matched
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum MatchQuality {
    Exact,
    CaseInsensitive,
    Flattened,
    IdentifierAlias,
}

impl fmt::Display for MatchQuality {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            MatchQuality::Exact => "exact",
            MatchQuality::CaseInsensitive => "case-insensitive",
            MatchQuality::Flattened => "flattened",
            MatchQuality::IdentifierAlias => "identifier alias",
        };
        f.write_str(label)
    }
}

/// The source member chosen for a target member
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SourceMatch {
    /// Full source chain; its leaf is the matched member
    pub member: QualifiedMember,
    pub quality: MatchQuality,
}

/// Everything a match depends on besides the target member
#[derive(Clone, Copy)]
pub struct MatchContext<'a> {
    pub registry: &'a TypeRegistry,
    pub discoverer: &'a dyn MemberDiscoverer,
    pub naming: &'a NamingSettings,
    /// Source chain matches are appended to
    pub source_parent: &'a QualifiedMember,
    /// Type whose members are candidates; the parent leaf's type except for
    /// derived type plans
    pub source_type: &'a TypeKey,
    /// Names of target ancestors, directly above the target member and
    /// outermost first, that found no source of their own
    pub unmatched_names: &'a [String],
}

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
struct MatchKey {
    source_parent: QualifiedMember,
    source_type: TypeKey,
    target: Member,
    unmatched_names: Vec<String>,
    naming: NamingOptions,
}

/// Memoizing member matcher
pub struct MemberMatcher {
    cache: MemoCache<MatchKey, Option<SourceMatch>>,
}

impl MemberMatcher {
    pub fn new() -> Self {
        Self {
            cache: MemoCache::new("member_matches", KeyComparison::HashOrdered),
        }
    }

    /// Best source member for `target`, or `None`
    pub fn find_best_source_member(
        &self,
        target: &Member,
        context: &MatchContext<'_>,
    ) -> Result<Option<SourceMatch>> {
        let key = MatchKey {
            source_parent: context.source_parent.clone(),
            source_type: context.source_type.clone(),
            target: target.clone(),
            unmatched_names: context.unmatched_names.to_vec(),
            naming: context.naming.options().clone(),
        };
        self.cache
            .get_or_try_add(key, |_| find_best_source_member(target, context))
    }

    pub fn reset(&self) {
        self.cache.reset();
    }

    pub fn stats(&self) -> CacheStats {
        self.cache.stats()
    }
}

impl Default for MemberMatcher {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Debug for MemberMatcher {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("MemberMatcher")
            .field("entries", &self.cache.len())
            .finish()
    }
}

/// Uncached matching
pub fn find_best_source_member(
    target: &Member,
    context: &MatchContext<'_>,
) -> Result<Option<SourceMatch>> {
    let tokens = target_tokens(target, context);
    let target_is_identifier = is_identifier(target.name(), target.declaring_type().short_name());
    let candidates = context.discoverer.source_members(context.source_type)?;

    let mut best: Option<SourceMatch> = None;
    for candidate in candidates.iter() {
        if candidate.kind() == MemberKind::EnumerableElement {
            continue;
        }
        let found = match_candidate(candidate, target, &tokens, target_is_identifier, context)?;
        let Some(found) = found else {
            continue;
        };
        if best.as_ref().map_or(true, |b| found.quality < b.quality) {
            let exact = found.quality == MatchQuality::Exact;
            best = Some(found);
            if exact {
                break;
            }
        }
    }

    trace!(
        target_member = %target,
        source = ?best.as_ref().map(|m| m.member.path()),
        "matched target member"
    );
    Ok(best)
}

/// Names the target member may be known by on the source side
fn target_tokens(target: &Member, context: &MatchContext<'_>) -> Vec<String> {
    let names: Vec<&str> = context
        .unmatched_names
        .iter()
        .map(String::as_str)
        .chain(std::iter::once(target.name()))
        .collect();
    context.naming.joined_names(&names)
}

fn match_candidate(
    candidate: &Member,
    leaf: &Member,
    tokens: &[String],
    target_is_identifier: bool,
    context: &MatchContext<'_>,
) -> Result<Option<SourceMatch>> {
    let compatible = are_compatible(context.registry, candidate, leaf);

    if compatible {
        if let Some(quality) = name_quality(candidate.name(), tokens, context.naming) {
            return Ok(Some(SourceMatch {
                member: context.source_parent.append(candidate.clone()),
                quality,
            }));
        }
    }

    if matches!(candidate.value_kind(), TypeKind::Complex) {
        let chain = context.source_parent.append(candidate.clone());
        for token in tokens {
            let Some(remainder) = strip_prefix_ignore_case(token, candidate.name()) else {
                continue;
            };
            if let Some(member) = flatten(&chain, remainder, leaf, context)? {
                return Ok(Some(SourceMatch {
                    member,
                    quality: MatchQuality::Flattened,
                }));
            }
        }
    }

    if compatible
        && target_is_identifier
        && is_identifier(candidate.name(), candidate.declaring_type().short_name())
    {
        return Ok(Some(SourceMatch {
            member: context.source_parent.append(candidate.clone()),
            quality: MatchQuality::IdentifierAlias,
        }));
    }

    Ok(None)
}

fn name_quality(name: &str, tokens: &[String], naming: &NamingSettings) -> Option<MatchQuality> {
    let mut best = None;
    for (index, variant) in naming.name_variants(name).into_iter().enumerate() {
        for token in tokens {
            if index == 0 && variant == token {
                return Some(MatchQuality::Exact);
            }
            if variant.eq_ignore_ascii_case(token) {
                best = Some(MatchQuality::CaseInsensitive);
            }
        }
    }
    best
}

/// Walk complex source members below `chain` whose names spell `remainder`
fn flatten(
    chain: &QualifiedMember,
    remainder: &str,
    leaf: &Member,
    context: &MatchContext<'_>,
) -> Result<Option<QualifiedMember>> {
    let remainder = strip_separator(remainder, context.naming);
    if remainder.is_empty() {
        return Ok(None);
    }
    let members = context
        .discoverer
        .source_members(chain.leaf().value_type())?;
    for member in members.iter() {
        if member.kind() == MemberKind::EnumerableElement {
            continue;
        }
        if member.name().eq_ignore_ascii_case(remainder)
            && are_compatible(context.registry, member, leaf)
        {
            return Ok(Some(chain.append(member.clone())));
        }
        if !matches!(member.value_kind(), TypeKind::Complex) {
            continue;
        }
        if let Some(rest) = strip_prefix_ignore_case(remainder, member.name()) {
            if let Some(found) = flatten(&chain.append(member.clone()), rest, leaf, context)? {
                return Ok(Some(found));
            }
        }
    }
    Ok(None)
}

fn strip_separator<'a>(value: &'a str, naming: &NamingSettings) -> &'a str {
    naming
        .separators()
        .iter()
        .map(String::as_str)
        .chain(std::iter::once("."))
        .filter(|s| !s.is_empty())
        .find_map(|s| value.strip_prefix(s))
        .unwrap_or(value)
}

/// Whether a source member's value can feed a target member
pub fn are_compatible(registry: &TypeRegistry, source: &Member, target: &Member) -> bool {
    kinds_compatible(
        registry,
        source.value_type(),
        source.value_kind(),
        target.value_type(),
        target.value_kind(),
    )
}

fn kinds_compatible(
    registry: &TypeRegistry,
    source_type: &TypeKey,
    source_kind: &TypeKind,
    target_type: &TypeKey,
    target_kind: &TypeKind,
) -> bool {
    match (source_kind, target_kind) {
        (TypeKind::Simple(_), TypeKind::Simple(_)) => {
            registry.conversion(source_type, target_type).is_some()
        }
        (TypeKind::Complex, TypeKind::Complex)
        | (TypeKind::Dictionary { .. }, TypeKind::Dictionary { .. })
        | (TypeKind::Dictionary { .. }, TypeKind::Complex)
        | (TypeKind::Complex, TypeKind::Dictionary { .. }) => true,
        (
            TypeKind::Enumerable { element: source } | TypeKind::Array { element: source },
            TypeKind::Enumerable { element: target } | TypeKind::Array { element: target },
        ) => match (registry.kind(source), registry.kind(target)) {
            (Ok(source_kind), Ok(target_kind)) => {
                kinds_compatible(registry, source, source_kind, target, target_kind)
            }
            _ => false,
        },
        _ => {
            registry.is_assignable(source_type, target_type)
                || registry.is_assignable(target_type, source_type)
        }
    }
}
