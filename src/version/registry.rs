//! Registry capability for fetching image tags, and the lookup choosing one per image

use std::fmt;
use std::sync::Arc;

#[cfg(test)]
use mockall::automock;

use crate::types::{ImageInfo, ImageReference};
use crate::version::error::RegistryError;

/// Trait for querying a container registry
///
/// Implementations own transport, authentication, rate limiting and retries. Callers bound a
/// query by dropping its future (e.g. with `tokio::time::timeout`), so implementations must
/// be cancel-safe.
#[cfg_attr(test, automock)]
#[async_trait::async_trait]
pub trait RegistryClient: Send + Sync {
    /// Identity of the registry this client serves (e.g. "docker.io", "ghcr.io")
    fn name(&self) -> String;

    /// Fetches the tags published for the image's repository
    async fn get_latest_tags(&self, image: &ImageReference) -> Result<Vec<String>, RegistryError>;

    /// Fetches detailed information about the image
    async fn get_image_info(&self, image: &ImageReference) -> Result<ImageInfo, RegistryError>;
}

/// Returns true if a client identified by `client_name` serves images from `registry`.
///
/// Comparison is case-insensitive. `docker.io` and `dockerhub` also serve images with an
/// empty registry, and `ghcr` is an alias of `ghcr.io`.
pub fn handles_registry(client_name: &str, registry: &str) -> bool {
    let client = client_name.to_lowercase();
    let registry = registry.to_lowercase();

    match client.as_str() {
        "docker.io" | "dockerhub" => {
            registry.is_empty() || registry == "docker.io" || registry == client
        }
        "ghcr.io" | "ghcr" => registry == "ghcr.io" || registry == client,
        _ => client == registry,
    }
}

/// Registered registry clients, searched in registration order
#[derive(Clone, Default)]
pub struct RegistrySet {
    clients: Vec<Arc<dyn RegistryClient>>,
}

impl RegistrySet {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register(&mut self, client: Arc<dyn RegistryClient>) {
        self.clients.push(client);
    }

    pub fn with_client(mut self, client: Arc<dyn RegistryClient>) -> Self {
        self.register(client);
        self
    }

    /// Returns the first client serving `registry`
    pub fn find(&self, registry: &str) -> Option<Arc<dyn RegistryClient>> {
        self.clients
            .iter()
            .find(|client| handles_registry(&client.name(), registry))
            .cloned()
    }

    pub fn names(&self) -> Vec<String> {
        self.clients.iter().map(|client| client.name()).collect()
    }

    pub fn len(&self) -> usize {
        self.clients.len()
    }

    pub fn is_empty(&self) -> bool {
        self.clients.is_empty()
    }
}

impl fmt::Debug for RegistrySet {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RegistrySet")
            .field("clients", &self.names())
            .finish()
    }
}

impl FromIterator<Arc<dyn RegistryClient>> for RegistrySet {
    fn from_iter<I: IntoIterator<Item = Arc<dyn RegistryClient>>>(iter: I) -> Self {
        Self {
            clients: iter.into_iter().collect(),
        }
    }
}
