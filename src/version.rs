//! Semantic-version arithmetic over lenient version strings.
//!
//! Schema versions are stored as strings. The grammar accepted here is looser
//! than strict semver: a leading `v` is tolerated and missing components are
//! treated as zero, so `"1.2"` parses as `1.2.0` and compares equal to it.

use std::cmp::Ordering;

use semver::Version;
use serde::{Deserialize, Serialize};

use crate::error::{SpecError, SpecResult};

/// Which version component an update advances
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum VersionBump {
    Major,
    #[default]
    Minor,
    Patch,
}

/// Parse a lenient version string into a full `semver::Version`
pub fn parse_version(version: &str) -> SpecResult<Version> {
    let trimmed = version.trim();
    let trimmed = trimmed
        .strip_prefix('v')
        .or_else(|| trimmed.strip_prefix('V'))
        .unwrap_or(trimmed);

    if trimmed.is_empty() {
        return Err(SpecError::InvalidVersion(version.to_string()));
    }

    let parts: Vec<&str> = trimmed.split('.').collect();
    if parts.len() > 3 {
        return Err(SpecError::InvalidVersion(version.to_string()));
    }

    let mut components = [0u64; 3];
    for (i, part) in parts.iter().enumerate() {
        components[i] = part
            .parse::<u64>()
            .map_err(|_| SpecError::InvalidVersion(version.to_string()))?;
    }

    Ok(Version::new(components[0], components[1], components[2]))
}

/// Advance a version along one component.
///
/// `major` zeroes minor and patch, `minor` zeroes patch, `patch` increments
/// the last component only.
pub fn increment_version(version: &str, bump: VersionBump) -> SpecResult<String> {
    let parsed = parse_version(version)?;
    let next = match bump {
        VersionBump::Major => Version::new(parsed.major + 1, 0, 0),
        VersionBump::Minor => Version::new(parsed.major, parsed.minor + 1, 0),
        VersionBump::Patch => Version::new(parsed.major, parsed.minor, parsed.patch + 1),
    };
    Ok(next.to_string())
}

/// Component-wise comparison of two lenient version strings
pub fn compare_versions(a: &str, b: &str) -> SpecResult<Ordering> {
    let left = parse_version(a)?;
    let right = parse_version(b)?;
    Ok(left.cmp(&right))
}

/// Semantic equality; false when either side does not parse
pub fn versions_equal(a: &str, b: &str) -> bool {
    matches!(compare_versions(a, b), Ok(Ordering::Equal))
}

/// Two versions are compatible iff their major components are equal
pub fn is_compatible_version(a: &str, b: &str) -> SpecResult<bool> {
    let left = parse_version(a)?;
    let right = parse_version(b)?;
    Ok(left.major == right.major)
}
