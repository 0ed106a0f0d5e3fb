//! Rackspace Cloud Servers provider
//!
//! Authenticates against the Rackspace identity service with an API key,
//! then talks to the Cloud Servers (OpenStack compute) endpoint of the
//! selected region.
//! https://docs.rackspace.com/docs/cloud-servers/v2/

use async_trait::async_trait;
use base64::{Engine, engine::general_purpose::STANDARD as BASE64};
use reqwest::{Client, Response};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::time::Duration;
use tracing::debug;

use super::{ComputeProvider, CreateServerRequest, Image, Network, Server, ServerStatus, Size};
use crate::BootstrapError;
use crate::config::{Credentials, Region};

/// Rackspace identity service (v2.0)
pub const DEFAULT_IDENTITY_URL: &str = "https://identity.api.rackspacecloud.com/v2.0";

/// Service catalog entry for Cloud Servers
const COMPUTE_SERVICE_NAME: &str = "cloudServersOpenStack";

/// Address label Rackspace uses for the internet-facing network
const PUBLIC_ADDRESS_LABEL: &str = "public";

// ==================== Identity payloads ====================

#[derive(Serialize)]
struct AuthRequest<'a> {
    auth: AuthBody<'a>,
}

#[derive(Serialize)]
struct AuthBody<'a> {
    #[serde(rename = "RAX-KSKEY:apiKeyCredentials")]
    credentials: ApiKeyCredentials<'a>,
}

#[derive(Serialize)]
struct ApiKeyCredentials<'a> {
    username: &'a str,
    #[serde(rename = "apiKey")]
    api_key: &'a str,
}

#[derive(Debug, Deserialize)]
struct AuthResponse {
    access: Access,
}

#[derive(Debug, Deserialize)]
struct Access {
    token: Token,
    #[serde(rename = "serviceCatalog", default)]
    service_catalog: Vec<CatalogService>,
}

#[derive(Debug, Deserialize)]
struct Token {
    id: String,
}

#[derive(Debug, Deserialize)]
struct CatalogService {
    name: String,
    #[serde(default)]
    endpoints: Vec<CatalogEndpoint>,
}

#[derive(Debug, Deserialize)]
struct CatalogEndpoint {
    #[serde(default)]
    region: String,
    #[serde(rename = "publicURL")]
    public_url: String,
}

// ==================== Compute payloads ====================

#[derive(Debug, Deserialize)]
struct FlavorList {
    flavors: Vec<FlavorBody>,
}

#[derive(Debug, Deserialize)]
struct FlavorBody {
    id: String,
    #[serde(default)]
    name: String,
    #[serde(default)]
    ram: u64,
}

#[derive(Debug, Deserialize)]
struct ImageList {
    images: Vec<ImageBody>,
}

#[derive(Debug, Deserialize)]
struct ImageBody {
    id: String,
    #[serde(default)]
    name: String,
}

#[derive(Debug, Deserialize)]
struct NetworkList {
    networks: Vec<NetworkBody>,
}

#[derive(Debug, Deserialize)]
struct NetworkBody {
    id: String,
    #[serde(default)]
    label: String,
}

#[derive(Debug, Deserialize)]
struct ServerEnvelope {
    server: ServerBody,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct ServerBody {
    id: String,
    name: String,
    status: Option<String>,
    #[serde(rename = "accessIPv4")]
    access_ipv4: Option<String>,
    addresses: BTreeMap<String, Vec<AddressBody>>,
}

#[derive(Debug, Deserialize)]
struct AddressBody {
    addr: String,
}

#[derive(Debug, Deserialize)]
struct MetadataEnvelope {
    #[serde(default)]
    metadata: BTreeMap<String, String>,
}

#[derive(Serialize)]
struct CreateServerEnvelope<'a> {
    server: CreateServerBody<'a>,
}

#[derive(Serialize)]
struct CreateServerBody<'a> {
    name: &'a str,
    #[serde(rename = "imageRef")]
    image_ref: &'a str,
    #[serde(rename = "flavorRef")]
    flavor_ref: &'a str,
    config_drive: bool,
    user_data: String,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    personality: Vec<PersonalityFile<'a>>,
    metadata: &'a BTreeMap<String, String>,
    networks: Vec<NetworkRef<'a>>,
}

#[derive(Serialize)]
struct PersonalityFile<'a> {
    path: &'a str,
    contents: String,
}

#[derive(Serialize)]
struct NetworkRef<'a> {
    uuid: &'a str,
}

impl ServerBody {
    fn into_server(self, fallback_name: &str) -> Server {
        let mut public_ips = Vec::new();
        let mut private_ips = Vec::new();
        for (label, addresses) in self.addresses {
            let ips = addresses.into_iter().map(|a| a.addr);
            if label == PUBLIC_ADDRESS_LABEL {
                public_ips.extend(ips);
            } else {
                private_ips.extend(ips);
            }
        }

        let name = if self.name.is_empty() {
            fallback_name.to_string()
        } else {
            self.name
        };

        Server {
            id: self.id,
            name,
            status: self
                .status
                .as_deref()
                .map(ServerStatus::parse)
                .unwrap_or(ServerStatus::Build),
            access_ipv4: self.access_ipv4.filter(|ip| !ip.is_empty()),
            public_ips,
            private_ips,
        }
    }
}

/// Rackspace Cloud Servers client bound to one region
pub struct RackspaceProvider {
    client: Client,
    endpoint: String,
    token: String,
}

impl RackspaceProvider {
    /// Authenticate with the public identity service
    pub async fn connect(credentials: &Credentials, region: Region) -> Result<Self, BootstrapError> {
        Self::connect_with_identity(DEFAULT_IDENTITY_URL, credentials, region).await
    }

    /// Authenticate against a specific identity endpoint
    pub async fn connect_with_identity(
        identity_url: &str,
        credentials: &Credentials,
        region: Region,
    ) -> Result<Self, BootstrapError> {
        let client = build_client()?;
        let url = format!("{}/tokens", identity_url.trim_end_matches('/'));
        debug!("Authenticating as {} at {}", credentials.username, url);

        let body = AuthRequest {
            auth: AuthBody {
                credentials: ApiKeyCredentials {
                    username: &credentials.username,
                    api_key: &credentials.api_key,
                },
            },
        };
        let response = client.post(&url).json(&body).send().await?;
        let auth: AuthResponse = check(response, "authenticate").await?.json().await?;

        let endpoint = auth
            .access
            .service_catalog
            .iter()
            .filter(|service| service.name == COMPUTE_SERVICE_NAME)
            .flat_map(|service| service.endpoints.iter())
            .find(|endpoint| endpoint.region.eq_ignore_ascii_case(region.as_str()))
            .map(|endpoint| endpoint.public_url.clone())
            .ok_or_else(|| {
                BootstrapError::Provider(format!(
                    "no {} endpoint for region {}",
                    COMPUTE_SERVICE_NAME, region
                ))
            })?;
        debug!("Using compute endpoint {}", endpoint);

        Ok(Self {
            client,
            endpoint: endpoint.trim_end_matches('/').to_string(),
            token: auth.access.token.id,
        })
    }

    /// Use a known compute endpoint and token (for testing)
    pub fn with_endpoint(endpoint: &str, token: &str) -> Result<Self, BootstrapError> {
        Ok(Self {
            client: build_client()?,
            endpoint: endpoint.trim_end_matches('/').to_string(),
            token: token.to_string(),
        })
    }

    /// Compute endpoint in use
    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.endpoint, path)
    }

    async fn get_json<T: DeserializeOwned>(
        &self,
        path: &str,
        what: &'static str,
    ) -> Result<T, BootstrapError> {
        let url = self.url(path);
        debug!("GET {}", url);

        let response = self
            .client
            .get(&url)
            .header("X-Auth-Token", &self.token)
            .header("Accept", "application/json")
            .send()
            .await?;

        Ok(check(response, what).await?.json().await?)
    }
}

fn build_client() -> Result<Client, BootstrapError> {
    Ok(Client::builder()
        .timeout(Duration::from_secs(30))
        .connect_timeout(Duration::from_secs(10))
        .user_agent(concat!("rackspace-bootstrap/", env!("CARGO_PKG_VERSION")))
        .build()?)
}

async fn check(response: Response, what: &'static str) -> Result<Response, BootstrapError> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }

    let body = response.text().await.unwrap_or_default();
    Err(BootstrapError::Provider(format!(
        "{} returned {}: {}",
        what, status, body
    )))
}

#[async_trait]
impl ComputeProvider for RackspaceProvider {
    fn name(&self) -> &'static str {
        "Rackspace"
    }

    async fn list_sizes(&self) -> Result<Vec<Size>, BootstrapError> {
        let list: FlavorList = self.get_json("/flavors/detail", "list flavors").await?;
        Ok(list
            .flavors
            .into_iter()
            .map(|f| Size {
                id: f.id,
                name: f.name,
                ram: f.ram,
            })
            .collect())
    }

    async fn list_images(&self) -> Result<Vec<Image>, BootstrapError> {
        let list: ImageList = self.get_json("/images/detail", "list images").await?;
        Ok(list
            .images
            .into_iter()
            .map(|i| Image {
                id: i.id,
                name: i.name,
            })
            .collect())
    }

    async fn list_networks(&self) -> Result<Vec<Network>, BootstrapError> {
        let list: NetworkList = self.get_json("/os-networksv2", "list networks").await?;
        Ok(list
            .networks
            .into_iter()
            .map(|n| Network {
                id: n.id,
                label: n.label,
            })
            .collect())
    }

    async fn create_server(&self, request: &CreateServerRequest) -> Result<Server, BootstrapError> {
        let body = CreateServerEnvelope {
            server: CreateServerBody {
                name: &request.name,
                image_ref: &request.image_id,
                flavor_ref: &request.flavor_id,
                config_drive: true,
                user_data: BASE64.encode(&request.user_data),
                personality: request
                    .personality
                    .iter()
                    .map(|(path, contents)| PersonalityFile {
                        path,
                        contents: BASE64.encode(contents),
                    })
                    .collect(),
                metadata: &request.metadata,
                networks: request
                    .network_ids
                    .iter()
                    .map(|uuid| NetworkRef { uuid })
                    .collect(),
            },
        };

        let url = self.url("/servers");
        debug!("POST {}", url);
        let response = self
            .client
            .post(&url)
            .header("X-Auth-Token", &self.token)
            .json(&body)
            .send()
            .await?;

        let created: ServerEnvelope = check(response, "create server").await?.json().await?;
        if created.server.id.is_empty() {
            return Err(BootstrapError::InvalidData(
                "create server response carried no id".to_string(),
            ));
        }
        Ok(created.server.into_server(&request.name))
    }

    async fn get_server(&self, id: &str) -> Result<Server, BootstrapError> {
        let envelope: ServerEnvelope = self
            .get_json(&format!("/servers/{}", id), "get server")
            .await?;
        Ok(envelope.server.into_server(""))
    }

    async fn get_metadata(&self, id: &str) -> Result<BTreeMap<String, String>, BootstrapError> {
        let envelope: MetadataEnvelope = self
            .get_json(&format!("/servers/{}/metadata", id), "get metadata")
            .await?;
        Ok(envelope.metadata)
    }
}
