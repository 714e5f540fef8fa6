//! Scan input units and their lifecycle

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::types::{ImageReference, ScanOutcome};

/// One deployed service/image pair to check for updates
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScanTask {
    pub service_name: String,
    pub image: ImageReference,
}

impl ScanTask {
    pub fn new(service_name: &str, image: ImageReference) -> Self {
        Self {
            service_name: service_name.to_string(),
            image,
        }
    }

    /// Builds a task from an image reference string such as `nginx:1.25-alpine`
    pub fn parse(service_name: &str, reference: &str) -> Option<Self> {
        ImageReference::parse(reference).map(|image| Self::new(service_name, image))
    }
}

/// Lifecycle of a task within a scan
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TaskState {
    /// Waiting for a concurrency slot
    Queued,
    /// Holding a slot
    Dispatched,
    /// Registry query in flight
    Fetching,
    /// Terminal: update found or up to date
    Classified,
    /// Terminal: no registry, registry error, no tags or timeout
    Failed,
}

impl TaskState {
    pub fn is_terminal(&self) -> bool {
        matches!(self, TaskState::Classified | TaskState::Failed)
    }

    /// Terminal state reached by an outcome
    pub fn of(outcome: &ScanOutcome) -> Self {
        match outcome {
            ScanOutcome::Update(_) | ScanOutcome::UpToDate { .. } => TaskState::Classified,
            ScanOutcome::Failed { .. } => TaskState::Failed,
        }
    }
}

impl fmt::Display for TaskState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            TaskState::Queued => "queued",
            TaskState::Dispatched => "dispatched",
            TaskState::Fetching => "fetching",
            TaskState::Classified => "classified",
            TaskState::Failed => "failed",
        };
        f.write_str(name)
    }
}
