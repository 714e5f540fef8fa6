//! OS, libc and base-image suffixes carried by container tags (e.g. `1.25-alpine3.18`)

use std::sync::LazyLock;

use regex::Regex;

/// Known base-image suffixes. A suffix may be followed by a numeric variant (`-alpine3.18`).
pub const KNOWN_SUFFIXES: &[&str] = &[
    "-alpine",
    "-slim",
    "-scratch",
    "-ubuntu",
    "-debian",
    "-bullseye",
    "-buster",
    "-focal",
    "-jammy",
    "-musl",
    "-glibc",
    "-bookworm",
    "-noble",
];

static SUFFIX_PATTERNS: LazyLock<Vec<(&'static str, Regex)>> = LazyLock::new(|| {
    KNOWN_SUFFIXES
        .iter()
        .filter_map(|suffix| suffix_pattern(suffix).map(|re| (*suffix, re)))
        .collect()
});

/// Builds the pattern matching `suffix` plus any trailing digits, dots or hyphens at the end of a tag
fn suffix_pattern(suffix: &str) -> Option<Regex> {
    Regex::new(&format!(r"(?i){}[0-9.\-]*$", regex::escape(suffix))).ok()
}

fn known_pattern(suffix: &str) -> Option<&'static Regex> {
    SUFFIX_PATTERNS
        .iter()
        .find(|(known, _)| *known == suffix)
        .map(|(_, re)| re)
}

/// Returns true if `tag` ends with `suffix`, optionally followed by a numeric variant
pub fn matches_suffix(tag: &str, suffix: &str) -> bool {
    match known_pattern(suffix) {
        Some(re) => re.is_match(tag),
        None => suffix_pattern(suffix).is_some_and(|re| re.is_match(tag)),
    }
}

/// Extracts the known suffix of a tag, preferring the longest one when several match
///
/// Examples:
/// - "2.10.0-alpine" -> Some("-alpine")
/// - "3.12-slim-bookworm" -> Some("-bookworm")
/// - "1.0.0" -> None
pub fn extract_version_suffix(tag: &str) -> Option<&'static str> {
    SUFFIX_PATTERNS
        .iter()
        .filter(|(_, re)| re.is_match(tag))
        .map(|(suffix, _)| *suffix)
        .fold(None, |best: Option<&'static str>, suffix| match best {
            Some(current) if current.len() >= suffix.len() => Some(current),
            _ => Some(suffix),
        })
}

/// Removes the known suffix and its numeric variant from the end of a tag
pub fn strip_suffix(tag: &str) -> String {
    match extract_version_suffix(tag).and_then(known_pattern) {
        Some(re) => re.replace(tag, "").into_owned(),
        None => tag.to_string(),
    }
}

/// Keeps only the tags sharing the suffix of `current`
///
/// When `current` has no suffix every tag is returned. When it has one and no tag shares it,
/// the result is empty: there is no compatible update.
pub fn filter_tags_by_suffix(tags: &[String], current: &str) -> Vec<String> {
    let Some(suffix) = extract_version_suffix(current) else {
        return tags.to_vec();
    };

    tags.iter()
        .filter(|tag| matches_suffix(tag, suffix))
        .cloned()
        .collect()
}
