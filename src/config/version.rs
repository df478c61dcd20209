//! Version comparison for SDK version gating
//!
//! SDK versions are dot-separated integer components ("1.1.66"). Comparison
//! is component-wise; a component missing on either side counts as zero, so
//! "1.2" compares equal to "1.2.0".

use once_cell::sync::Lazy;
use regex::Regex;
use std::cmp::Ordering;
use std::fmt;

static VERSION_SHAPE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^\d+(\.\d+)*$").expect("valid version shape regex"));

/// A version string that is not a dot-separated list of integers
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MalformedVersion {
    pub value: String,
}

impl fmt::Display for MalformedVersion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "invalid version '{}': expected dot-separated integers such as 1.2.0",
            self.value
        )
    }
}

impl std::error::Error for MalformedVersion {}

/// Check that a version string is made of dot-separated integer components,
/// each of which fits in a `u64`.
pub fn check_format(version: &str) -> Result<(), MalformedVersion> {
    let trimmed = version.trim();
    if VERSION_SHAPE.is_match(trimmed)
        && trimmed
            .split('.')
            .all(|part| part.parse::<u64>().is_ok())
    {
        Ok(())
    } else {
        Err(MalformedVersion {
            value: version.to_string(),
        })
    }
}

fn components(version: &str) -> Vec<u64> {
    version
        .trim()
        .split('.')
        .map(|part| part.parse::<u64>().unwrap_or(0))
        .collect()
}

/// Compare two versions component by component.
///
/// Missing trailing components are treated as zero and non-numeric
/// components compare as zero. Use [`check_format`] first when the input is
/// user supplied.
pub fn compare(version: &str, other: &str) -> Ordering {
    let left = components(version);
    let right = components(other);
    let len = left.len().max(right.len());

    for idx in 0..len {
        let a = left.get(idx).copied().unwrap_or(0);
        let b = right.get(idx).copied().unwrap_or(0);
        match a.cmp(&b) {
            Ordering::Equal => continue,
            unequal => return unequal,
        }
    }

    Ordering::Equal
}

/// Check if a version is greater than or equal to `minimum`
///
/// # Examples
///
/// ```
/// use beacon_patcher::config::version::version_at_least;
///
/// assert!(version_at_least(Some("1.1.66"), "1.1.66"));
/// assert!(version_at_least(Some("1.2"), "1.1.66"));
/// assert!(!version_at_least(Some("1.1.5"), "1.1.66"));
///
/// // No declared version never satisfies a minimum
/// assert!(!version_at_least(None, "1.1.66"));
/// ```
pub fn version_at_least(version: Option<&str>, minimum: &str) -> bool {
    match version {
        Some(version) => compare(version, minimum) != Ordering::Less,
        None => false,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn test_equal_versions() {
        assert!(version_at_least(Some("1.1.66"), "1.1.66"));
        assert_eq!(compare("1.1.66", "1.1.66"), Ordering::Equal);
    }

    #[test]
    fn test_shorter_version_with_larger_prefix() {
        assert!(version_at_least(Some("1.2"), "1.1.66"));
    }

    #[test]
    fn test_numeric_not_lexical() {
        // "5" < "66" numerically even though '5' > '6' lexically
        assert!(!version_at_least(Some("1.1.5"), "1.1.66"));
        assert!(version_at_least(Some("1.1.100"), "1.1.66"));
    }

    #[test]
    fn test_missing_version() {
        assert!(!version_at_least(None, "1.1.66"));
        assert!(!version_at_least(None, "0"));
    }

    #[test]
    fn test_missing_components_are_zero() {
        assert_eq!(compare("1.2", "1.2.0"), Ordering::Equal);
        assert_eq!(compare("1.2.0.0", "1.2"), Ordering::Equal);
        assert_eq!(compare("1.2.0.1", "1.2"), Ordering::Greater);
        assert_eq!(compare("1", "1.0.1"), Ordering::Less);
    }

    #[test]
    fn test_check_format() {
        assert!(check_format("1.2.3").is_ok());
        assert!(check_format("10").is_ok());
        assert!(check_format(" 1.2 ").is_ok());
        assert!(check_format("1.2.x").is_err());
        assert!(check_format("v1.2.3").is_err());
        assert!(check_format("1..2").is_err());
        assert!(check_format("").is_err());
    }

    #[test]
    fn test_check_format_rejects_overflow() {
        assert!(check_format("1.18446744073709551615").is_ok());
        assert!(check_format("1.99999999999999999999").is_err());
        assert!(check_format("18446744073709551616.0").is_err());
    }

    proptest! {
        #[test]
        fn prop_compare_is_reflexive(parts in prop::collection::vec(0u64..1000, 1..5)) {
            let version = parts.iter().map(|p| p.to_string()).collect::<Vec<_>>().join(".");
            prop_assert!(version_at_least(Some(&version), &version));
        }

        #[test]
        fn prop_trailing_zeros_do_not_matter(
            parts in prop::collection::vec(0u64..1000, 1..4),
            zeros in 1usize..3,
        ) {
            let version = parts.iter().map(|p| p.to_string()).collect::<Vec<_>>().join(".");
            let padded = format!("{}{}", version, ".0".repeat(zeros));
            prop_assert_eq!(compare(&version, &padded), Ordering::Equal);
        }

        #[test]
        fn prop_compare_is_antisymmetric(
            a in prop::collection::vec(0u64..50, 1..4),
            b in prop::collection::vec(0u64..50, 1..4),
        ) {
            let a = a.iter().map(|p| p.to_string()).collect::<Vec<_>>().join(".");
            let b = b.iter().map(|p| p.to_string()).collect::<Vec<_>>().join(".");
            prop_assert_eq!(compare(&a, &b), compare(&b, &a).reverse());
        }
    }
}
