//! Tolerant semantic version handling for container tags

use std::cmp::Ordering;
use std::sync::LazyLock;

use regex::Regex;
use semver::Version;

use crate::types::UpdateClassification;
use crate::version::suffix::strip_suffix;

static SEMVER_PREFIX: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^([0-9]+)\.([0-9]+)\.([0-9]+)(.*)$").expect("valid regex"));
static TWO_PART: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^([0-9]+)\.([0-9]+)$").expect("valid regex"));
static ONE_PART: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^([0-9]+)$").expect("valid regex"));

/// Normalizes a tag for version parsing.
///
/// Strips the leading `v` and any known base-image suffix (with its numeric variant),
/// repeating until nothing changes so that normalizing twice gives the same result.
///
/// Examples:
/// - "v1.2.3" -> "1.2.3"
/// - "1.25-alpine3.18" -> "1.25"
/// - "latest" -> "latest"
pub fn normalize_tag(tag: &str) -> String {
    let mut normalized = tag.trim_start_matches('v').to_string();
    loop {
        let stripped = strip_suffix(&normalized);
        if stripped == normalized {
            return normalized;
        }
        normalized = stripped;
    }
}

/// Parses a tag into a semver::Version, padding Docker-style partial versions.
///
/// The normalized tag is parsed strictly first. Numeric parts with leading zeros
/// (`22.04.1`) are read as integers, keeping any pre-release or build part. Otherwise
/// `major.minor` is padded with `.0` and a bare `major` with `.0.0`.
///
/// Examples:
/// - "1.2.3-alpine" -> Version(1, 2, 3)
/// - "2024.01.15" -> Version(2024, 1, 15)
/// - "18.1" -> Version(18, 1, 0)
/// - "19" -> Version(19, 0, 0)
/// - "bookworm" -> None
pub fn parse_flexible_semver(tag: &str) -> Option<Version> {
    let normalized = normalize_tag(tag);

    if let Ok(version) = Version::parse(&normalized) {
        return Some(version);
    }

    if let Some(caps) = SEMVER_PREFIX.captures(&normalized) {
        let rest = &caps[4];
        // Borrow the pre-release/build grammar from a placeholder core
        let extra = match rest.chars().next() {
            None => Version::new(0, 0, 0),
            Some('-' | '+') => Version::parse(&format!("0.0.0{}", rest)).ok()?,
            Some(_) => return None,
        };
        let mut version = Version::new(
            caps[1].parse().ok()?,
            caps[2].parse().ok()?,
            caps[3].parse().ok()?,
        );
        version.pre = extra.pre;
        version.build = extra.build;
        return Some(version);
    }

    if let Some(caps) = TWO_PART.captures(&normalized) {
        let major = caps[1].parse().ok()?;
        let minor = caps[2].parse().ok()?;
        return Some(Version::new(major, minor, 0));
    }

    if let Some(caps) = ONE_PART.captures(&normalized) {
        let major = caps[1].parse().ok()?;
        return Some(Version::new(major, 0, 0));
    }

    None
}

/// Returns true if the tag looks numeric, so that names like "trixie" are not mistaken for versions
pub fn is_semantic_version(tag: &str) -> bool {
    let normalized = normalize_tag(tag);
    SEMVER_PREFIX.is_match(&normalized)
        || TWO_PART.is_match(&normalized)
        || ONE_PART.is_match(&normalized)
}

/// Compares only the numeric core, ignoring pre-release and build metadata
pub fn compare_core(a: &Version, b: &Version) -> Ordering {
    (a.major, a.minor, a.patch).cmp(&(b.major, b.minor, b.patch))
}

/// Classifies the update from `current` to `candidate`.
///
/// Semantic tags are compared component-wise and the first higher component decides the
/// classification. If either tag is not semantic, a lexicographically greater candidate is
/// `Unknown`. Never fails.
pub fn compare_versions(current: &str, candidate: &str) -> UpdateClassification {
    let (Some(current_version), Some(candidate_version)) =
        (parse_flexible_semver(current), parse_flexible_semver(candidate))
    else {
        return compare_lexicographic(current, candidate);
    };

    if compare_core(&candidate_version, &current_version) != Ordering::Greater {
        return UpdateClassification::None;
    }

    if candidate_version.major > current_version.major {
        UpdateClassification::Major
    } else if candidate_version.minor > current_version.minor {
        UpdateClassification::Minor
    } else {
        UpdateClassification::Patch
    }
}

fn compare_lexicographic(current: &str, candidate: &str) -> UpdateClassification {
    if candidate > current {
        UpdateClassification::Unknown
    } else {
        UpdateClassification::None
    }
}

/// Returns true if `candidate` is a newer version than `current`
pub fn is_newer(current: &str, candidate: &str) -> bool {
    compare_versions(current, candidate) != UpdateClassification::None
}
