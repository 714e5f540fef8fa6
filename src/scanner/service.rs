//! Concurrent update check over a batch of scan tasks

use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use tokio::sync::Semaphore;
use tokio::task::{JoinError, JoinSet};
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};

use crate::config::ScanConfig;
use crate::scanner::task::{ScanTask, TaskState};
use crate::types::{ImageUpdate, ScanOutcome, ScanResult, UpdateClassification};
use crate::version::error::{ConfigError, RegistryError};
use crate::version::prerelease::filter_pre_releases;
use crate::version::registry::{RegistryClient, RegistrySet};
use crate::version::select::sort_versions;
use crate::version::semver::compare_versions;

/// Checks scan tasks against their registries with bounded concurrency
///
/// Every task yields exactly one outcome. A failing task never affects the others, and a
/// cancelled scan still returns the outcomes completed so far.
#[derive(Debug)]
pub struct Scanner {
    registries: RegistrySet,
    config: ScanConfig,
}

impl Scanner {
    /// Creates a scanner, rejecting invalid configuration before any task runs
    pub fn new(registries: RegistrySet, config: ScanConfig) -> Result<Self, ConfigError> {
        config.validate()?;
        Ok(Self { registries, config })
    }

    pub fn config(&self) -> &ScanConfig {
        &self.config
    }

    /// Scans all tasks until they finish or `cancel` fires
    pub async fn scan(&self, tasks: Vec<ScanTask>, cancel: &CancellationToken) -> ScanResult {
        let mut result = ScanResult::new(tasks.len());
        if tasks.is_empty() {
            return result;
        }

        info!(
            "Starting scan of {} tasks (concurrency: {})",
            tasks.len(),
            self.config.max_concurrency
        );

        let semaphore = Arc::new(Semaphore::new(self.config.max_concurrency));
        let timeout = self.config.registry_timeout();
        let mut workers = JoinSet::new();

        for task in tasks {
            if !task.image.is_valid() {
                warn!("Invalid image reference for {}: {:?}", task.service_name, task.image);
                result.record(ScanOutcome::Failed {
                    cause: format!(
                        "invalid image reference {} (repository and tag are required)",
                        task.image
                    ),
                    service: task.service_name,
                });
                continue;
            }

            let Some(client) = self.registries.find(&task.image.registry) else {
                warn!(
                    "No registry client available for {} (registry: {})",
                    task.image, task.image.registry
                );
                result.record(ScanOutcome::Failed {
                    cause: format!(
                        "no registry client available for {} (registry: {})",
                        task.image,
                        task.image.registry_or_default()
                    ),
                    service: task.service_name,
                });
                continue;
            };

            workers.spawn(check_task(task, client, semaphore.clone(), timeout));
        }

        loop {
            tokio::select! {
                biased;
                _ = cancel.cancelled() => {
                    while let Some(joined) = workers.try_join_next() {
                        record_joined(&mut result, joined);
                    }
                    workers.abort_all();

                    warn!(
                        "Scan cancelled after {} of {} tasks",
                        result.completed(),
                        result.total_tasks
                    );
                    result.errors.push(format!(
                        "scan cancelled: {} of {} tasks completed",
                        result.completed(),
                        result.total_tasks
                    ));
                    break;
                }
                joined = workers.join_next() => match joined {
                    Some(joined) => record_joined(&mut result, joined),
                    None => break,
                },
            }
        }

        info!(
            "Scan completed: {} updates, {} up to date, {} errors",
            result.updates.len(),
            result.up_to_date.len(),
            result.errors.len()
        );

        result
    }

    /// Scans all tasks, cancelling the batch once `deadline` has elapsed
    pub async fn scan_with_deadline(&self, tasks: Vec<ScanTask>, deadline: Duration) -> ScanResult {
        let cancel = CancellationToken::new();
        let timer = {
            let cancel = cancel.clone();
            tokio::spawn(async move {
                tokio::time::sleep(deadline).await;
                cancel.cancel();
            })
        };

        let result = self.scan(tasks, &cancel).await;
        timer.abort();
        result
    }
}

fn record_joined(result: &mut ScanResult, joined: Result<ScanOutcome, JoinError>) {
    match joined {
        Ok(outcome) => result.record(outcome),
        Err(e) if e.is_cancelled() => {}
        Err(e) => {
            error!("Scan task panicked: {}", e);
            result.errors.push(format!("scan task failed: {}", e));
        }
    }
}

/// Runs one task through its lifecycle: waits for a slot, queries the registry under
/// `timeout`, then classifies the returned tags
async fn check_task(
    task: ScanTask,
    client: Arc<dyn RegistryClient>,
    semaphore: Arc<Semaphore>,
    timeout: Duration,
) -> ScanOutcome {
    debug!("{} ({}): {}", task.service_name, task.image, TaskState::Queued);

    let Ok(_permit) = semaphore.acquire_owned().await else {
        return failed(&task, "scan slots closed".to_string());
    };
    debug!("{} ({}): {}", task.service_name, task.image, TaskState::Dispatched);

    debug!(
        "{} ({}): {} from {}",
        task.service_name,
        task.image,
        TaskState::Fetching,
        client.name()
    );
    let fetched = match tokio::time::timeout(timeout, client.get_latest_tags(&task.image)).await {
        Ok(fetched) => fetched,
        Err(_) => Err(RegistryError::Timeout {
            timeout_ms: timeout.as_millis() as u64,
        }),
    };

    let outcome = match fetched {
        Ok(tags) => evaluate_tags(&task, &tags),
        Err(e) => {
            error!("Failed to get tags for {}: {}", task.image, e);
            failed(&task, format!("getting tags for {}: {}", task.image, e))
        }
    };

    debug!(
        "{} ({}): {}",
        task.service_name,
        task.image,
        TaskState::of(&outcome)
    );
    outcome
}

fn failed(task: &ScanTask, cause: String) -> ScanOutcome {
    ScanOutcome::Failed {
        service: task.service_name.clone(),
        cause,
    }
}

/// Classifies the tags fetched for a task.
///
/// Pre-releases are ignored unless every tag is one. The newest remaining tag is compared
/// with the deployed tag.
pub fn evaluate_tags(task: &ScanTask, tags: &[String]) -> ScanOutcome {
    if tags.is_empty() {
        warn!("No tags found for {}", task.image);
        return failed(task, format!("no tags found for {}", task.image));
    }

    let mut stable = filter_pre_releases(tags);
    if stable.is_empty() {
        debug!("No stable tags found for {}, using all tags", task.image);
        stable = tags.to_vec();
    }

    let Some(latest) = sort_versions(&stable).into_iter().next() else {
        return failed(task, format!("no tags found for {}", task.image));
    };

    let classification = compare_versions(&task.image.tag, &latest);
    if classification == UpdateClassification::None {
        debug!("{} is up to date ({})", task.service_name, task.image);
        return ScanOutcome::UpToDate {
            service: task.service_name.clone(),
        };
    }

    info!(
        "Update available for {}: {} -> {} ({})",
        task.service_name, task.image.tag, latest, classification
    );
    ScanOutcome::Update(ImageUpdate {
        service_name: task.service_name.clone(),
        current_image: task.image.clone(),
        latest_image: task.image.with_tag(&latest),
        update_type: classification,
        detected_at: Utc::now(),
    })
}
