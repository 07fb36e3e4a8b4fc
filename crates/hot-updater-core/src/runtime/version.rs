// crates/hot-updater-core/src/runtime/version.rs
// ============================================================================
// Module: Hot Updater Version Compatibility
// Description: npm-style semver range matching for app-version targeting.
// Purpose: Decide which target-version groups a device's app version satisfies.
// Dependencies: semver, thiserror
// ============================================================================

//! ## Overview
//! Bundles target native app versions with npm range syntax (`1.x.x`, `~1.2.3`,
//! `^1.2.3`, `1.2.3 - 1.2.7`, `>=1.2.3 <1.2.7`, `||` alternatives, bare
//! partials). The device's reported version is coerced first (`1.0` becomes
//! `1.0.0`). Compatibility is symmetric: an exact stored version also matches
//! when the device reports a range that contains it.
//!
//! Two unparsable strings are compatible only when they are equal; an
//! unparsable string never matches a valid one.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::cmp::Ordering;
use std::collections::BTreeSet;
use std::str::FromStr;

use semver::Prerelease;
use semver::Version;
use thiserror::Error;

// ============================================================================
// SECTION: Errors
// ============================================================================

/// Range parsing errors.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RangeError {
    /// Range syntax is not recognized.
    #[error("invalid version range: {0}")]
    Invalid(String),
}

// ============================================================================
// SECTION: Comparators
// ============================================================================

/// Comparison operator for a single bound.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Op {
    /// Exact precedence match.
    Eq,
    /// Strictly greater.
    Gt,
    /// Greater or equal.
    Gte,
    /// Strictly less.
    Lt,
    /// Less or equal.
    Lte,
}

/// One bound of a comparator set.
#[derive(Debug, Clone, PartialEq, Eq)]
struct Comparator {
    /// Bound operator.
    op: Op,
    /// Bound version.
    version: Version,
}

impl Comparator {
    /// Creates a comparator.
    const fn new(op: Op, version: Version) -> Self {
        Self {
            op,
            version,
        }
    }

    /// Returns a comparator that no version satisfies.
    fn none() -> Self {
        let floor = Version {
            pre: Prerelease::new("0").unwrap_or(Prerelease::EMPTY),
            ..Version::new(0, 0, 0)
        };
        Self::new(Op::Lt, floor)
    }

    /// Returns true when the version satisfies this bound.
    fn matches(&self, version: &Version) -> bool {
        let ordering = precedence(version, &self.version);
        match self.op {
            Op::Eq => ordering == Ordering::Equal,
            Op::Gt => ordering == Ordering::Greater,
            Op::Gte => ordering != Ordering::Less,
            Op::Lt => ordering == Ordering::Less,
            Op::Lte => ordering != Ordering::Greater,
        }
    }
}

/// Compares versions by semver precedence, ignoring build metadata.
fn precedence(left: &Version, right: &Version) -> Ordering {
    (left.major, left.minor, left.patch)
        .cmp(&(right.major, right.minor, right.patch))
        .then_with(|| left.pre.cmp(&right.pre))
}

// ============================================================================
// SECTION: Version Range
// ============================================================================

/// Parsed npm-style version range: a union of comparator sets.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VersionRange {
    /// Alternatives joined by `||`; each set is an intersection of bounds.
    sets: Vec<Vec<Comparator>>,
}

impl VersionRange {
    /// Parses a range expression.
    ///
    /// # Errors
    ///
    /// Returns [`RangeError`] when the expression is not a valid range.
    pub fn parse(input: &str) -> Result<Self, RangeError> {
        let sets = input.split("||").map(parse_comparator_set).collect::<Result<Vec<_>, _>>()?;
        Ok(Self {
            sets,
        })
    }

    /// Returns true when the version satisfies any alternative.
    #[must_use]
    pub fn matches(&self, version: &Version) -> bool {
        self.sets.iter().any(|set| set_matches(set, version))
    }
}

impl FromStr for VersionRange {
    type Err = RangeError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        Self::parse(value)
    }
}

/// Evaluates one comparator set, applying the prerelease opt-in rule.
fn set_matches(set: &[Comparator], version: &Version) -> bool {
    if !set.iter().all(|comparator| comparator.matches(version)) {
        return false;
    }
    if version.pre.is_empty() {
        return true;
    }
    set.iter().any(|comparator| {
        !comparator.version.pre.is_empty()
            && comparator.version.major == version.major
            && comparator.version.minor == version.minor
            && comparator.version.patch == version.patch
    })
}

// ============================================================================
// SECTION: Range Parsing
// ============================================================================

/// Partially specified version; `None` parts are wildcards.
#[derive(Debug, Clone, PartialEq, Eq)]
struct Partial {
    /// Major component.
    major: Option<u64>,
    /// Minor component.
    minor: Option<u64>,
    /// Patch component.
    patch: Option<u64>,
    /// Prerelease tag (only with a full version).
    pre: Prerelease,
}

impl Partial {
    /// Returns the lowest version this partial covers.
    fn floor(&self) -> Version {
        Version {
            pre: self.pre.clone(),
            ..Version::new(
                self.major.unwrap_or(0),
                self.minor.unwrap_or(0),
                self.patch.unwrap_or(0),
            )
        }
    }

    /// Returns the first version above everything this partial covers, when
    /// the partial is not fully specified.
    fn ceiling(&self) -> Result<Option<Version>, RangeError> {
        match (self.major, self.minor, self.patch) {
            (Some(major), None, _) => Ok(Some(Version::new(bump(major)?, 0, 0))),
            (Some(major), Some(minor), None) => Ok(Some(Version::new(major, bump(minor)?, 0))),
            _ => Ok(None),
        }
    }
}

/// Increments a version component, rejecting overflow.
fn bump(value: u64) -> Result<u64, RangeError> {
    value.checked_add(1).ok_or_else(|| RangeError::Invalid("version component overflow".into()))
}

/// Operators accepted as token prefixes, longest first.
const OPERATORS: [&str; 8] = [">=", "<=", "~>", ">", "<", "=", "~", "^"];

/// Parses one `||` alternative.
fn parse_comparator_set(input: &str) -> Result<Vec<Comparator>, RangeError> {
    let tokens: Vec<&str> = input.split_whitespace().collect();
    if tokens.is_empty() {
        return Ok(Vec::new());
    }
    if tokens.len() == 3 && tokens[1] == "-" {
        return parse_hyphen(tokens[0], tokens[2]);
    }
    let mut comparators = Vec::new();
    let mut index = 0;
    while index < tokens.len() {
        let token = tokens[index];
        if OPERATORS.contains(&token) {
            let operand = tokens
                .get(index + 1)
                .ok_or_else(|| RangeError::Invalid(format!("dangling operator: {token}")))?;
            comparators.extend(parse_token(&format!("{token}{operand}"))?);
            index += 2;
        } else {
            comparators.extend(parse_token(token)?);
            index += 1;
        }
    }
    Ok(comparators)
}

/// Parses an inclusive hyphen range `low - high`.
fn parse_hyphen(low: &str, high: &str) -> Result<Vec<Comparator>, RangeError> {
    let low = parse_partial(low)?;
    let high = parse_partial(high)?;
    let mut comparators = Vec::new();
    if low.major.is_some() {
        comparators.push(Comparator::new(Op::Gte, low.floor()));
    }
    if high.major.is_some() {
        match high.ceiling()? {
            Some(ceiling) => comparators.push(Comparator::new(Op::Lt, ceiling)),
            None => comparators.push(Comparator::new(Op::Lte, high.floor())),
        }
    }
    Ok(comparators)
}

/// Parses one operator-prefixed token into its bounds.
fn parse_token(token: &str) -> Result<Vec<Comparator>, RangeError> {
    let (operator, rest) = OPERATORS
        .iter()
        .find_map(|operator| token.strip_prefix(operator).map(|rest| (*operator, rest)))
        .unwrap_or(("", token));
    let partial = parse_partial(rest)?;
    match operator {
        "" | "=" => desugar_exact(&partial),
        "~" | "~>" => desugar_tilde(&partial),
        "^" => desugar_caret(&partial),
        ">" => desugar_greater(&partial),
        ">=" => Ok(partial.major.map_or_else(Vec::new, |_| vec![Comparator::new(Op::Gte, partial.floor())])),
        "<" => Ok(vec![match partial.major {
            None => Comparator::none(),
            Some(_) => Comparator::new(Op::Lt, partial.floor()),
        }]),
        "<=" => desugar_at_most(&partial),
        other => Err(RangeError::Invalid(format!("unknown operator: {other}"))),
    }
}

/// Desugars a bare or `=` partial.
fn desugar_exact(partial: &Partial) -> Result<Vec<Comparator>, RangeError> {
    if partial.major.is_none() {
        return Ok(Vec::new());
    }
    Ok(match partial.ceiling()? {
        Some(ceiling) => {
            vec![Comparator::new(Op::Gte, partial.floor()), Comparator::new(Op::Lt, ceiling)]
        }
        None => vec![Comparator::new(Op::Eq, partial.floor())],
    })
}

/// Desugars `~`: patch-level changes when a minor is given.
fn desugar_tilde(partial: &Partial) -> Result<Vec<Comparator>, RangeError> {
    let Some(major) = partial.major else {
        return Ok(Vec::new());
    };
    let ceiling = match partial.minor {
        None => Version::new(bump(major)?, 0, 0),
        Some(minor) => Version::new(major, bump(minor)?, 0),
    };
    Ok(vec![Comparator::new(Op::Gte, partial.floor()), Comparator::new(Op::Lt, ceiling)])
}

/// Desugars `^`: changes that keep the left-most non-zero component.
fn desugar_caret(partial: &Partial) -> Result<Vec<Comparator>, RangeError> {
    let Some(major) = partial.major else {
        return Ok(Vec::new());
    };
    let ceiling = match (major, partial.minor, partial.patch) {
        (0, Some(0), Some(patch)) => Version::new(0, 0, bump(patch)?),
        (0, Some(minor), _) => Version::new(0, bump(minor)?, 0),
        _ => Version::new(bump(major)?, 0, 0),
    };
    Ok(vec![Comparator::new(Op::Gte, partial.floor()), Comparator::new(Op::Lt, ceiling)])
}

/// Desugars `>`: partials exclude their whole covered span.
fn desugar_greater(partial: &Partial) -> Result<Vec<Comparator>, RangeError> {
    if partial.major.is_none() {
        return Ok(vec![Comparator::none()]);
    }
    Ok(vec![match partial.ceiling()? {
        Some(ceiling) => Comparator::new(Op::Gte, ceiling),
        None => Comparator::new(Op::Gt, partial.floor()),
    }])
}

/// Desugars `<=`: partials include their whole covered span.
fn desugar_at_most(partial: &Partial) -> Result<Vec<Comparator>, RangeError> {
    if partial.major.is_none() {
        return Ok(Vec::new());
    }
    Ok(vec![match partial.ceiling()? {
        Some(ceiling) => Comparator::new(Op::Lt, ceiling),
        None => Comparator::new(Op::Lte, partial.floor()),
    }])
}

/// Parses `[v]MAJOR[.MINOR[.PATCH]][-PRE][+BUILD]` with `x`, `X`, `*` wildcards.
fn parse_partial(input: &str) -> Result<Partial, RangeError> {
    let invalid = || RangeError::Invalid(input.to_string());
    let text = input.trim();
    let text = text.strip_prefix('v').or_else(|| text.strip_prefix('=')).unwrap_or(text);
    let text = text.split_once('+').map_or(text, |(head, _)| head);
    let (core, pre) = match text.split_once('-') {
        Some((core, pre)) => (core, Some(pre)),
        None => (text, None),
    };
    let parts: Vec<&str> = core.split('.').collect();
    if core.is_empty() || parts.len() > 3 {
        return Err(invalid());
    }
    let mut values = [None, None, None];
    let mut wildcard = false;
    for (slot, part) in values.iter_mut().zip(parts.iter()) {
        if matches!(*part, "x" | "X" | "*") {
            wildcard = true;
            continue;
        }
        if part.is_empty() || !part.bytes().all(|byte| byte.is_ascii_digit()) {
            return Err(invalid());
        }
        if !wildcard {
            *slot = Some(part.parse::<u64>().map_err(|_| invalid())?);
        }
    }
    let [major, minor, patch] = values;
    let pre = match pre {
        None => Prerelease::EMPTY,
        Some(tag) => {
            if patch.is_none() {
                return Err(invalid());
            }
            Prerelease::new(tag).map_err(|_| invalid())?
        }
    };
    Ok(Partial {
        major,
        minor,
        patch,
        pre,
    })
}

// ============================================================================
// SECTION: Coercion
// ============================================================================

/// Extracts the first `MAJOR[.MINOR[.PATCH]]` run, filling missing parts with 0.
#[must_use]
pub fn coerce_version(input: &str) -> Option<Version> {
    let bytes = input.as_bytes();
    let start = bytes.iter().position(u8::is_ascii_digit)?;
    let mut cursor = start;
    let mut components = Vec::with_capacity(3);
    loop {
        let run_end = bytes[cursor..]
            .iter()
            .position(|byte| !byte.is_ascii_digit())
            .map_or(bytes.len(), |offset| cursor + offset);
        components.push(input[cursor..run_end].parse::<u64>().ok()?);
        if components.len() == 3 {
            break;
        }
        let next_is_digit = bytes.get(run_end + 1).is_some_and(u8::is_ascii_digit);
        if bytes.get(run_end) == Some(&b'.') && next_is_digit {
            cursor = run_end + 1;
        } else {
            break;
        }
    }
    Some(Version::new(
        components[0],
        components.get(1).copied().unwrap_or(0),
        components.get(2).copied().unwrap_or(0),
    ))
}

// ============================================================================
// SECTION: Compatibility
// ============================================================================

/// Returns true when the coerced current version satisfies the target range.
#[must_use]
pub fn semver_satisfies(target: &str, current: &str) -> bool {
    let Some(version) = coerce_version(current) else {
        return false;
    };
    VersionRange::parse(target).is_ok_and(|range| range.matches(&version))
}

/// Symmetric compatibility between a stored target and a device version.
#[must_use]
pub fn is_compatible(target: &str, current: &str) -> bool {
    if semver_satisfies(target, current) {
        return true;
    }
    let current_range = VersionRange::parse(current);
    if let (Ok(stored), Ok(range)) = (Version::parse(target.trim()), &current_range)
        && range.matches(&stored)
    {
        return true;
    }
    let target_invalid = VersionRange::parse(target).is_err();
    let current_invalid = coerce_version(current).is_none() && current_range.is_err();
    target_invalid && current_invalid && target.trim() == current.trim()
}

/// Returns the compatible target versions, de-duplicated and sorted descending.
#[must_use]
pub fn filter_compatible_app_versions(versions: &[String], current: &str) -> Vec<String> {
    let compatible: BTreeSet<&str> = versions
        .iter()
        .map(String::as_str)
        .filter(|version| is_compatible(version, current))
        .collect();
    compatible.into_iter().rev().map(str::to_string).collect()
}

// ============================================================================
// SECTION: Tests
// ============================================================================

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used, clippy::expect_used, reason = "Test-only assertions.")]

    use super::*;

    #[test]
    fn coerces_partial_versions() {
        assert_eq!(coerce_version("1.0"), Some(Version::new(1, 0, 0)));
        assert_eq!(coerce_version("1.12"), Some(Version::new(1, 12, 0)));
        assert_eq!(coerce_version("v2"), Some(Version::new(2, 0, 0)));
        assert_eq!(coerce_version("1.2.3.4"), Some(Version::new(1, 2, 3)));
        assert_eq!(coerce_version("1.2.3-beta"), Some(Version::new(1, 2, 3)));
        assert_eq!(coerce_version("release"), None);
    }

    #[test]
    fn partial_rejects_garbage() {
        assert!(VersionRange::parse("1.2.a").is_err());
        assert!(VersionRange::parse("1..2").is_err());
        assert!(VersionRange::parse(">=").is_err());
        assert!(VersionRange::parse("1.2-beta").is_err());
    }

    #[test]
    fn prerelease_needs_matching_tuple() {
        let range = VersionRange::parse(">=1.2.3-alpha.1 <2.0.0").unwrap();
        assert!(range.matches(&Version::parse("1.2.3-beta").unwrap()));
        assert!(!range.matches(&Version::parse("1.4.0-beta").unwrap()));
        assert!(range.matches(&Version::parse("1.4.0").unwrap()));
    }

    #[test]
    fn operator_partials() {
        let check = |range: &str, version: &str| {
            VersionRange::parse(range).unwrap().matches(&Version::parse(version).unwrap())
        };
        assert!(check(">1.2", "1.3.0"));
        assert!(!check(">1.2", "1.2.9"));
        assert!(check("<=1.2", "1.2.9"));
        assert!(!check("<=1.2", "1.3.0"));
        assert!(!check("<1.2", "1.2.0"));
        assert!(check(">= 1.0.0 < 2", "1.9.9"));
        assert!(check("^0.2.3", "0.2.9"));
        assert!(!check("^0.2.3", "0.3.0"));
        assert!(check("^0.0.3", "0.0.3"));
        assert!(!check("^0.0.3", "0.0.4"));
        assert!(check("1.0.0 || >=3.0.0", "3.1.0"));
        assert!(!check("1.0.0 || >=3.0.0", "2.0.0"));
        assert!(!check(">*", "1.0.0"));
    }
}
