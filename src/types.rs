//! Common types shared by the comparator, the registry cache and the scanner

use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Registry name used when an image reference carries no explicit registry
pub const DEFAULT_REGISTRY: &str = "docker.io";

/// A container image as deployed by a service
#[derive(Debug, Clone, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub struct ImageReference {
    /// Empty means the default public registry
    #[serde(default)]
    pub registry: String,
    pub repository: String,
    pub tag: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub digest: Option<String>,
}

impl ImageReference {
    pub fn new(registry: &str, repository: &str, tag: &str) -> Self {
        Self {
            registry: registry.to_string(),
            repository: repository.to_string(),
            tag: tag.to_string(),
            digest: None,
        }
    }

    /// Parses `[registry/]repository[:tag][@digest]`.
    ///
    /// The first path segment is treated as a registry host when it contains a `.` or a `:`,
    /// or is `localhost`. A missing tag defaults to `latest`.
    ///
    /// Examples:
    /// - "nginx:1.25" -> ("", "nginx", "1.25")
    /// - "ghcr.io/owner/app:v2.0.0" -> ("ghcr.io", "owner/app", "v2.0.0")
    /// - "localhost:5000/app" -> ("localhost:5000", "app", "latest")
    pub fn parse(reference: &str) -> Option<Self> {
        let reference = reference.trim();
        if reference.is_empty() {
            return None;
        }

        let (name, digest) = match reference.split_once('@') {
            Some((name, digest)) if !digest.is_empty() => (name, Some(digest.to_string())),
            Some(_) => return None,
            None => (reference, None),
        };

        let (registry, remainder) = match name.split_once('/') {
            Some((first, rest))
                if first.contains('.') || first.contains(':') || first == "localhost" =>
            {
                (first, rest)
            }
            _ => ("", name),
        };

        // A colon after the last slash separates the tag; earlier colons belong to a port
        let last_slash = remainder.rfind('/').map(|i| i + 1).unwrap_or(0);
        let (repository, tag) = match remainder[last_slash..].rfind(':') {
            Some(i) => {
                let split = last_slash + i;
                (&remainder[..split], &remainder[split + 1..])
            }
            None => (remainder, "latest"),
        };

        if repository.is_empty() || tag.is_empty() {
            return None;
        }

        Some(Self {
            registry: registry.to_string(),
            repository: repository.to_string(),
            tag: tag.to_string(),
            digest,
        })
    }

    /// Returns the registry name, resolving an empty registry to `docker.io`
    pub fn registry_or_default(&self) -> &str {
        if self.registry.is_empty() {
            DEFAULT_REGISTRY
        } else {
            &self.registry
        }
    }

    /// Reference including the registry host, e.g. `docker.io/nginx:1.25`
    pub fn full_name(&self) -> String {
        format!("{}/{}:{}", self.registry_or_default(), self.repository, self.tag)
    }

    /// Same image with a different tag; the digest is dropped since it names the old tag
    pub fn with_tag(&self, tag: &str) -> Self {
        Self {
            registry: self.registry.clone(),
            repository: self.repository.clone(),
            tag: tag.to_string(),
            digest: None,
        }
    }

    pub fn is_valid(&self) -> bool {
        !self.repository.is_empty() && !self.tag.is_empty()
    }
}

impl fmt::Display for ImageReference {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.registry.is_empty() || self.registry == DEFAULT_REGISTRY {
            write!(f, "{}:{}", self.repository, self.tag)
        } else {
            write!(f, "{}/{}:{}", self.registry, self.repository, self.tag)
        }
    }
}

/// Detailed image information returned by a registry
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct ImageInfo {
    pub tags: Vec<String>,
    pub last_modified: Option<DateTime<Utc>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub size: Option<i64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub architecture: Option<String>,
}

/// How significant an available update is
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum UpdateClassification {
    None,
    Patch,
    Minor,
    Major,
    /// At least one tag is not a semantic version; candidate sorts after current
    Unknown,
}

impl UpdateClassification {
    pub fn as_str(&self) -> &'static str {
        match self {
            UpdateClassification::None => "none",
            UpdateClassification::Patch => "patch",
            UpdateClassification::Minor => "minor",
            UpdateClassification::Major => "major",
            UpdateClassification::Unknown => "unknown",
        }
    }

    /// Rank used for threshold filtering. Unknown ranks with Patch.
    pub fn severity(&self) -> u8 {
        match self {
            UpdateClassification::None => 0,
            UpdateClassification::Patch | UpdateClassification::Unknown => 1,
            UpdateClassification::Minor => 2,
            UpdateClassification::Major => 3,
        }
    }

    /// Returns true if this classification is at least as severe as `minimum`
    pub fn meets(&self, minimum: UpdateClassification) -> bool {
        self.severity() >= minimum.severity()
    }

    pub fn is_significant(&self) -> bool {
        matches!(
            self,
            UpdateClassification::Major | UpdateClassification::Minor
        )
    }
}

impl fmt::Display for UpdateClassification {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// An update found for one service
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ImageUpdate {
    pub service_name: String,
    pub current_image: ImageReference,
    pub latest_image: ImageReference,
    pub update_type: UpdateClassification,
    pub detected_at: DateTime<Utc>,
}

impl ImageUpdate {
    pub fn is_significant(&self) -> bool {
        self.update_type.is_significant()
    }
}

/// Terminal result of checking a single scan task
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ScanOutcome {
    Update(ImageUpdate),
    UpToDate { service: String },
    Failed { service: String, cause: String },
}

/// Aggregate result of a scan, handed to report formatters and notifiers
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScanResult {
    pub scan_timestamp: DateTime<Utc>,
    pub updates: Vec<ImageUpdate>,
    pub up_to_date: Vec<String>,
    pub errors: Vec<String>,
    pub total_tasks: usize,
}

impl ScanResult {
    pub fn new(total_tasks: usize) -> Self {
        Self {
            scan_timestamp: Utc::now(),
            updates: Vec::new(),
            up_to_date: Vec::new(),
            errors: Vec::new(),
            total_tasks,
        }
    }

    /// Partitions an outcome into the matching bucket
    pub fn record(&mut self, outcome: ScanOutcome) {
        match outcome {
            ScanOutcome::Update(update) => self.updates.push(update),
            ScanOutcome::UpToDate { service } => self.up_to_date.push(service),
            ScanOutcome::Failed { service, cause } => {
                self.errors.push(format!("{}: {}", service, cause))
            }
        }
    }

    pub fn has_updates(&self) -> bool {
        !self.updates.is_empty()
    }

    pub fn has_errors(&self) -> bool {
        !self.errors.is_empty()
    }

    /// Number of tasks that reached a terminal state
    pub fn completed(&self) -> usize {
        self.updates.len() + self.up_to_date.len() + self.errors.len()
    }

    pub fn significant_updates(&self) -> impl Iterator<Item = &ImageUpdate> {
        self.updates.iter().filter(|u| u.is_significant())
    }

    pub fn summary(&self) -> String {
        if self.has_updates() {
            format!(
                "{} updates available, {} services up to date",
                self.updates.len(),
                self.up_to_date.len()
            )
        } else {
            format!("All {} services are up to date", self.up_to_date.len())
        }
    }
}
