//! Catalog resolution
//!
//! Matches the requested flavor, image and private network against what
//! the provider currently offers. A missing flavor or image is fatal; a
//! missing private network only produces a warning.

use crate::BootstrapError;
use crate::config::BootstrapConfig;
use crate::provider::{ComputeProvider, Image, Network, Size};
use tracing::{info, warn};

/// Memory of the flavor picked when none is requested
pub const DEFAULT_RAM_MB: u64 = 1024;

/// Image picked when none is requested
pub const DEFAULT_IMAGE_NAME: &str = "Ubuntu 14.04 LTS (Trusty Tahr) (PVHVM)";

/// Rackspace ServiceNet
pub const PRIVATE_NETWORK_ID: &str = "11111111-1111-1111-1111-111111111111";

/// Rackspace PublicNet
pub const PUBLIC_NETWORK_ID: &str = "00000000-0000-0000-0000-000000000000";

/// Catalog entries chosen for a new server
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Selection {
    pub size: Size,
    pub image: Image,
    pub networks: Vec<Network>,
}

impl Selection {
    pub fn network_ids(&self) -> Vec<String> {
        self.networks.iter().map(|n| n.id.clone()).collect()
    }
}

/// Pick a flavor by id, or the first 1 GB flavor when no id is given
pub fn resolve_size(sizes: &[Size], flavor: Option<&str>) -> Result<Size, BootstrapError> {
    let (found, wanted) = match flavor {
        None => (
            sizes.iter().find(|s| s.ram == DEFAULT_RAM_MB),
            "with 1GB of RAM".to_string(),
        ),
        Some(id) => (sizes.iter().find(|s| s.id == id), id.to_string()),
    };

    found
        .cloned()
        .ok_or_else(|| BootstrapError::Resolution(format!("Unable to find flavor {}", wanted)))
}

/// Pick an image by id, or the default image by name when no id is given
pub fn resolve_image(images: &[Image], image: Option<&str>) -> Result<Image, BootstrapError> {
    let (found, wanted) = match image {
        None => (
            images.iter().find(|i| i.name == DEFAULT_IMAGE_NAME),
            DEFAULT_IMAGE_NAME.to_string(),
        ),
        Some(id) => (
            images.iter().find(|i| i.id == id),
            format!("with uuid={}", id),
        ),
    };

    found
        .cloned()
        .ok_or_else(|| BootstrapError::Resolution(format!("Unable to find image {}", wanted)))
}

/// Select PublicNet, ServiceNet and the requested private network, in catalog order
pub fn resolve_networks(networks: &[Network], lan: Option<&str>) -> Vec<Network> {
    let selected: Vec<Network> = networks
        .iter()
        .filter(|n| {
            n.id == PRIVATE_NETWORK_ID || n.id == PUBLIC_NETWORK_ID || Some(n.id.as_str()) == lan
        })
        .cloned()
        .collect();

    if let Some(lan) = lan {
        if !selected.iter().any(|n| n.id == lan) {
            warn!("Private network {} not found; continuing without it", lan);
        }
    }

    selected
}

/// Resolves a configuration against a provider's live catalog
pub struct CatalogResolver<'a> {
    provider: &'a dyn ComputeProvider,
}

impl<'a> CatalogResolver<'a> {
    pub fn new(provider: &'a dyn ComputeProvider) -> Self {
        Self { provider }
    }

    /// Query sizes, images and networks, then select from each
    pub async fn resolve(&self, config: &BootstrapConfig) -> Result<Selection, BootstrapError> {
        info!("Querying {} for available flavors", self.provider.name());
        let sizes = self.provider.list_sizes().await?;
        let size = resolve_size(&sizes, config.flavor.as_deref())?;

        info!("Querying {} for available images", self.provider.name());
        let images = self.provider.list_images().await?;
        let image = resolve_image(&images, config.image.as_deref())?;

        info!("Querying {} for available networks", self.provider.name());
        let networks = self.provider.list_networks().await?;
        let networks = resolve_networks(&networks, config.lan.as_deref());

        info!(
            "Selected flavor {} ({} MB), image {}, {} network(s)",
            size.id,
            size.ram,
            image.name,
            networks.len()
        );
        Ok(Selection {
            size,
            image,
            networks,
        })
    }
}
