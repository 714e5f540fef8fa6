//! Detection of unstable or development tags

use std::sync::LazyLock;

use regex::Regex;

/// Keywords marking a tag as a pre-release. Matched as substrings of the lower-cased tag.
pub const PRE_RELEASE_KEYWORDS: &[&str] = &[
    "alpha",
    "beta",
    "rc",
    "dev",
    "devel",
    "development",
    "nightly",
    "snapshot",
    "test",
    "experimental",
    "canary",
    "pre",
    "preview",
    "unstable",
];

/// Hyphenated semver-style markers such as `-alpha` or `-rc.2`
const HYPHENATED_MARKERS: &[&str] = &[
    "-alpha",
    "-beta",
    "-rc",
    "-dev",
    "-devel",
    "-development",
    "-pre",
    "-preview",
    "-unstable",
];

/// Single letter markers such as `-a.1` or `-b.2`
static SINGLE_LETTER_MARKER: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"-[a-zA-Z]\.").expect("valid regex"));

/// Returns true if the tag looks like a pre-release.
///
/// `latest` and `stable` are never pre-releases. Otherwise the tag is checked for hyphenated
/// markers, single-letter markers and finally any keyword substring.
pub fn is_pre_release(tag: &str) -> bool {
    let lower = tag.to_lowercase();

    if lower == "latest" || lower == "stable" {
        return false;
    }

    if HYPHENATED_MARKERS.iter().any(|marker| lower.contains(marker)) {
        return true;
    }

    if SINGLE_LETTER_MARKER.is_match(&lower) {
        return true;
    }

    PRE_RELEASE_KEYWORDS.iter().any(|keyword| {
        // "latest" contains "test"
        if *keyword == "test" && lower == "latest" {
            return false;
        }
        lower.contains(keyword)
    })
}

/// Removes pre-release tags, keeping the input order
pub fn filter_pre_releases(tags: &[String]) -> Vec<String> {
    tags.iter()
        .filter(|tag| !is_pre_release(tag))
        .cloned()
        .collect()
}
