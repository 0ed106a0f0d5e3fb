//! Mock provider for testing
//!
//! Serves a fixed catalog, records create requests and replays scripted
//! server states and metadata reads.

use async_trait::async_trait;
use std::collections::{BTreeMap, VecDeque};
use std::sync::Mutex;

use super::{ComputeProvider, CreateServerRequest, Image, Network, Server, ServerStatus, Size};
use crate::BootstrapError;

/// Scripted metadata read: a map, or an error message
pub type MetadataRead = Result<BTreeMap<String, String>, String>;

/// Mock provider for testing
///
/// # Example
/// ```
/// use rackspace_bootstrap::provider::mock::MockProvider;
/// use rackspace_bootstrap::provider::Size;
///
/// let mock = MockProvider::new().with_sizes(vec![Size {
///     id: "2".to_string(),
///     name: "512MB Standard Instance".to_string(),
///     ram: 512,
/// }]);
/// ```
pub struct MockProvider {
    sizes: Vec<Size>,
    images: Vec<Image>,
    networks: Vec<Network>,
    server: Server,
    statuses: Mutex<VecDeque<ServerStatus>>,
    metadata_reads: Mutex<VecDeque<MetadataRead>>,
    created: Mutex<Vec<CreateServerRequest>>,
    metadata_calls: Mutex<u32>,
    catalog_error: Option<String>,
}

impl MockProvider {
    /// Create a new mock provider with an empty catalog
    pub fn new() -> Self {
        Self {
            sizes: Vec::new(),
            images: Vec::new(),
            networks: Vec::new(),
            server: Server {
                id: "mock-server".to_string(),
                name: "mock".to_string(),
                status: ServerStatus::Active,
                access_ipv4: None,
                public_ips: Vec::new(),
                private_ips: Vec::new(),
            },
            statuses: Mutex::new(VecDeque::new()),
            metadata_reads: Mutex::new(VecDeque::new()),
            created: Mutex::new(Vec::new()),
            metadata_calls: Mutex::new(0),
            catalog_error: None,
        }
    }

    pub fn with_sizes(mut self, sizes: Vec<Size>) -> Self {
        self.sizes = sizes;
        self
    }

    pub fn with_images(mut self, images: Vec<Image>) -> Self {
        self.images = images;
        self
    }

    pub fn with_networks(mut self, networks: Vec<Network>) -> Self {
        self.networks = networks;
        self
    }

    /// Details returned by `get_server` once it stops replaying statuses
    pub fn with_server(mut self, server: Server) -> Self {
        self.server = server;
        self
    }

    /// Statuses returned by successive `get_server` calls before the final details
    pub fn with_statuses(self, statuses: Vec<ServerStatus>) -> Self {
        *lock(&self.statuses) = statuses.into();
        self
    }

    /// Results of successive `get_metadata` calls; the last one repeats
    pub fn with_metadata_reads(self, reads: Vec<MetadataRead>) -> Self {
        *lock(&self.metadata_reads) = reads.into();
        self
    }

    /// Fail every catalog listing
    pub fn with_catalog_error(mut self, error: &str) -> Self {
        self.catalog_error = Some(error.to_string());
        self
    }

    /// Create requests received so far
    pub fn created(&self) -> Vec<CreateServerRequest> {
        lock(&self.created).clone()
    }

    /// Number of `get_metadata` calls received so far
    pub fn metadata_calls(&self) -> u32 {
        *lock(&self.metadata_calls)
    }

    fn catalog<T: Clone>(&self, items: &[T]) -> Result<Vec<T>, BootstrapError> {
        match &self.catalog_error {
            Some(error) => Err(BootstrapError::Provider(error.clone())),
            None => Ok(items.to_vec()),
        }
    }
}

impl Default for MockProvider {
    fn default() -> Self {
        Self::new()
    }
}

// A poisoned lock only means another test thread panicked; keep the data.
fn lock<T>(mutex: &Mutex<T>) -> std::sync::MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}

#[async_trait]
impl ComputeProvider for MockProvider {
    fn name(&self) -> &'static str {
        "Mock"
    }

    async fn list_sizes(&self) -> Result<Vec<Size>, BootstrapError> {
        self.catalog(&self.sizes)
    }

    async fn list_images(&self) -> Result<Vec<Image>, BootstrapError> {
        self.catalog(&self.images)
    }

    async fn list_networks(&self) -> Result<Vec<Network>, BootstrapError> {
        self.catalog(&self.networks)
    }

    async fn create_server(&self, request: &CreateServerRequest) -> Result<Server, BootstrapError> {
        lock(&self.created).push(request.clone());
        Ok(Server {
            id: self.server.id.clone(),
            name: request.name.clone(),
            status: ServerStatus::Build,
            access_ipv4: None,
            public_ips: Vec::new(),
            private_ips: Vec::new(),
        })
    }

    async fn get_server(&self, _id: &str) -> Result<Server, BootstrapError> {
        let mut server = self.server.clone();
        if let Some(status) = lock(&self.statuses).pop_front() {
            server.status = status;
        }
        Ok(server)
    }

    async fn get_metadata(&self, _id: &str) -> Result<BTreeMap<String, String>, BootstrapError> {
        *lock(&self.metadata_calls) += 1;

        let mut reads = lock(&self.metadata_reads);
        let read = if reads.len() > 1 {
            reads.pop_front()
        } else {
            reads.front().cloned()
        };

        match read {
            Some(Ok(metadata)) => Ok(metadata),
            Some(Err(error)) => Err(BootstrapError::Http(error)),
            None => Ok(BTreeMap::new()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_mock_provider_default() {
        let mock = MockProvider::new();

        assert_eq!(mock.name(), "Mock");
        assert!(mock.list_sizes().await.unwrap().is_empty());
        assert!(mock.get_metadata("x").await.unwrap().is_empty());
        assert_eq!(mock.metadata_calls(), 1);
    }

    #[tokio::test]
    async fn test_statuses_replay_then_settle() {
        let mock = MockProvider::new().with_statuses(vec![ServerStatus::Build]);

        assert_eq!(mock.get_server("x").await.unwrap().status, ServerStatus::Build);
        assert_eq!(mock.get_server("x").await.unwrap().status, ServerStatus::Active);
    }

    #[tokio::test]
    async fn test_last_metadata_read_repeats() {
        let deployed = BTreeMap::from([("k".to_string(), "v".to_string())]);
        let mock = MockProvider::new()
            .with_metadata_reads(vec![Err("blip".to_string()), Ok(deployed.clone())]);

        assert!(mock.get_metadata("x").await.is_err());
        assert_eq!(mock.get_metadata("x").await.unwrap(), deployed);
        assert_eq!(mock.get_metadata("x").await.unwrap(), deployed);
    }

    #[tokio::test]
    async fn test_catalog_error() {
        let mock = MockProvider::new().with_catalog_error("unauthorized");

        let err = mock.list_images().await.unwrap_err();
        assert!(err.to_string().contains("unauthorized"));
    }

    #[tokio::test]
    async fn test_create_is_recorded() {
        let mock = MockProvider::new();
        let request = CreateServerRequest {
            name: "web1".to_string(),
            image_id: "img".to_string(),
            flavor_id: "2".to_string(),
            user_data: "#cloud-config\n".to_string(),
            personality: BTreeMap::new(),
            metadata: BTreeMap::new(),
            network_ids: vec![],
        };

        let server = mock.create_server(&request).await.unwrap();
        assert_eq!(server.name, "web1");
        assert_eq!(mock.created(), vec![request]);
    }
}
