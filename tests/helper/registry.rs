//! Registry test utilities

use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

use async_trait::async_trait;

use image_reporter::types::{ImageInfo, ImageReference};
use image_reporter::version::error::RegistryError;
use image_reporter::version::registry::RegistryClient;

/// In-memory registry answering from fixed tag lists after an optional delay
pub struct StubRegistry {
    name: String,
    responses: HashMap<String, Result<Vec<String>, RegistryError>>,
    delay: Duration,
    calls: AtomicUsize,
    in_flight: AtomicUsize,
    max_in_flight: AtomicUsize,
}

impl StubRegistry {
    pub fn new(name: &str) -> Self {
        Self {
            name: name.to_string(),
            responses: HashMap::new(),
            delay: Duration::ZERO,
            calls: AtomicUsize::new(0),
            in_flight: AtomicUsize::new(0),
            max_in_flight: AtomicUsize::new(0),
        }
    }

    pub fn with_tags(mut self, repository: &str, tags: Vec<&str>) -> Self {
        self.responses.insert(
            repository.to_string(),
            Ok(tags.into_iter().map(|t| t.to_string()).collect()),
        );
        self
    }

    pub fn with_error(mut self, repository: &str, error: RegistryError) -> Self {
        self.responses.insert(repository.to_string(), Err(error));
        self
    }

    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = delay;
        self
    }

    /// Number of tag queries received so far
    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    /// Highest number of tag queries observed running at once
    pub fn max_in_flight(&self) -> usize {
        self.max_in_flight.load(Ordering::SeqCst)
    }
}

struct InFlight<'a>(&'a AtomicUsize);

impl Drop for InFlight<'_> {
    fn drop(&mut self) {
        self.0.fetch_sub(1, Ordering::SeqCst);
    }
}

#[async_trait]
impl RegistryClient for StubRegistry {
    fn name(&self) -> String {
        self.name.clone()
    }

    async fn get_latest_tags(&self, image: &ImageReference) -> Result<Vec<String>, RegistryError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        let current = self.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
        self.max_in_flight.fetch_max(current, Ordering::SeqCst);
        let _in_flight = InFlight(&self.in_flight);

        if !self.delay.is_zero() {
            tokio::time::sleep(self.delay).await;
        }

        match self.responses.get(&image.repository) {
            Some(response) => response.clone(),
            None => Err(RegistryError::NotFound(image.repository.clone())),
        }
    }

    async fn get_image_info(&self, image: &ImageReference) -> Result<ImageInfo, RegistryError> {
        let tags = self.get_latest_tags(image).await?;
        Ok(ImageInfo {
            tags,
            ..ImageInfo::default()
        })
    }
}
