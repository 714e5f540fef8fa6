//! Update filtering by pre-release status, exclude patterns and minimum severity

use serde::{Deserialize, Serialize};

use crate::types::UpdateClassification;
use crate::version::prerelease::is_pre_release;
use crate::version::semver::compare_versions;

/// Filtering preferences for candidate updates
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct UpdateFilter {
    pub include_pre_releases: bool,
    /// Least significant classification still reported
    pub min_update_type: UpdateClassification,
    /// Case-insensitive substrings excluding a candidate tag
    pub exclude_patterns: Vec<String>,
}

impl Default for UpdateFilter {
    fn default() -> Self {
        Self {
            include_pre_releases: false,
            min_update_type: UpdateClassification::Patch,
            exclude_patterns: ["nightly", "snapshot", "temp", "tmp"]
                .iter()
                .map(|s| s.to_string())
                .collect(),
        }
    }
}

impl UpdateFilter {
    /// Default filter reporting only major and minor updates
    pub fn significant() -> Self {
        Self {
            min_update_type: UpdateClassification::Minor,
            ..Self::default()
        }
    }

    fn matches_exclude_pattern(&self, tag: &str) -> bool {
        let lower = tag.to_lowercase();
        self.exclude_patterns
            .iter()
            .any(|pattern| lower.contains(&pattern.to_lowercase()))
    }
}

/// Returns true if `candidate` is an update of `current` accepted by `filter`
pub fn should_include_update(current: &str, candidate: &str, filter: &UpdateFilter) -> bool {
    if !filter.include_pre_releases && is_pre_release(candidate) {
        return false;
    }

    if filter.matches_exclude_pattern(candidate) {
        return false;
    }

    let classification = compare_versions(current, candidate);
    if classification == UpdateClassification::None {
        return false;
    }

    classification.meets(filter.min_update_type)
}

/// Keeps the candidates accepted by `filter`, in input order
pub fn filter_updates(current: &str, candidates: &[String], filter: &UpdateFilter) -> Vec<String> {
    candidates
        .iter()
        .filter(|candidate| should_include_update(current, candidate, filter))
        .cloned()
        .collect()
}

/// Stable major and minor updates
pub fn significant_updates(current: &str, candidates: &[String]) -> Vec<String> {
    filter_updates(current, candidates, &UpdateFilter::significant())
}

/// All stable updates
pub fn all_stable_updates(current: &str, candidates: &[String]) -> Vec<String> {
    filter_updates(current, candidates, &UpdateFilter::default())
}

/// Detailed classification of a single update
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct UpdateDetails {
    pub classification: UpdateClassification,
    pub is_pre_release: bool,
    pub is_significant: bool,
    pub description: String,
}

pub fn classify_update(current: &str, candidate: &str) -> UpdateDetails {
    let classification = compare_versions(current, candidate);
    let is_pre_release = is_pre_release(candidate);

    let mut description = match classification {
        UpdateClassification::None => "No update available",
        UpdateClassification::Patch => "Patch update available",
        UpdateClassification::Minor => "Minor update available",
        UpdateClassification::Major => "Major update available",
        UpdateClassification::Unknown => "Update available (version format unknown)",
    }
    .to_string();

    if is_pre_release {
        description.push_str(" (pre-release)");
    }

    UpdateDetails {
        classification,
        is_pre_release,
        is_significant: classification.is_significant(),
        description,
    }
}
