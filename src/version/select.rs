//! Ordering tags and choosing the update candidate

use indexmap::IndexMap;
use semver::Version;

use crate::version::prerelease::filter_pre_releases;
use crate::version::semver::{compare_core, parse_flexible_semver};
use crate::version::suffix::{extract_version_suffix, matches_suffix};

/// Sorts tags newest first.
///
/// Semantic tags come first, ordered by (major, minor, patch) descending; tags with equal
/// numbers keep their input order. Non-semantic tags follow in descending lexicographic order.
pub fn sort_versions(tags: &[String]) -> Vec<String> {
    let mut semantic: Vec<(Version, &String)> = Vec::new();
    let mut non_semantic: Vec<&String> = Vec::new();

    for tag in tags {
        match parse_flexible_semver(tag) {
            Some(version) => semantic.push((version, tag)),
            None => non_semantic.push(tag),
        }
    }

    semantic.sort_by(|(a, _), (b, _)| compare_core(b, a));
    non_semantic.sort_by(|a, b| b.cmp(a));

    semantic
        .into_iter()
        .map(|(_, tag)| tag)
        .chain(non_semantic)
        .cloned()
        .collect()
}

/// Returns the newest tag, or None for an empty list
pub fn latest_version(tags: &[String]) -> Option<String> {
    sort_versions(tags).into_iter().next()
}

/// Returns the newest tag that is not a pre-release
pub fn latest_stable_version(tags: &[String]) -> Option<String> {
    latest_version(&filter_pre_releases(tags))
}

/// Picks the tag to propose as the update for `current`.
///
/// Candidates are grouped by their normalized version. The highest group strictly newer than
/// `current` wins; within it a tag with the same suffix as `current` is preferred, then a tag
/// without any suffix, then the first tag seen. If `current` is not semantic, the head of
/// [`sort_versions`] is returned instead.
///
/// Example: current "2.32.0-alpine" with ["2.33.2", "2.33.2-alpine"] -> "2.33.2-alpine"
pub fn find_best_update_tag(current: &str, candidates: &[String]) -> Option<String> {
    if candidates.is_empty() {
        return None;
    }

    let Some(current_version) = parse_flexible_semver(current) else {
        return latest_version(candidates);
    };

    let mut groups: IndexMap<String, (Version, Vec<&String>)> = IndexMap::new();
    for tag in candidates {
        let Some(version) = parse_flexible_semver(tag) else {
            continue;
        };
        groups
            .entry(version.to_string())
            .or_insert_with(|| (version, Vec::new()))
            .1
            .push(tag);
    }

    let (_, best_tags) = groups
        .into_values()
        .filter(|(version, _)| *version > current_version)
        .max_by(|(a, _), (b, _)| a.cmp(b))?;

    let same_suffix = extract_version_suffix(current)
        .and_then(|suffix| best_tags.iter().find(|tag| matches_suffix(tag, suffix)));

    same_suffix
        .or_else(|| {
            best_tags
                .iter()
                .find(|tag| extract_version_suffix(tag).is_none())
        })
        .or_else(|| best_tags.first())
        .map(|tag| tag.to_string())
}
