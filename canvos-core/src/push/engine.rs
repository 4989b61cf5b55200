//! Image engine access
//!
//! The push orchestrator only needs two things from the local image
//! engine: the tags it knows and a way to push one of them. Docker is
//! reached over its Engine HTTP API.

use async_trait::async_trait;
use base64::engine::general_purpose::STANDARD;
use base64::Engine;
use futures::StreamExt;
use reqwest::StatusCode;
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use super::ProgressStream;
use crate::catalog::user_agent;
use crate::error::{CanvosError, Result};

/// Docker endpoint used when `DOCKER_HOST` is not an HTTP address
pub const DEFAULT_DOCKER_ENDPOINT: &str = "http://localhost:2375";

/// Registry credentials for a push
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct RegistryAuth {
    pub username: String,
    pub password: String,
}

impl RegistryAuth {
    pub fn new(username: impl Into<String>, password: impl Into<String>) -> Self {
        Self {
            username: username.into(),
            password: password.into(),
        }
    }

    /// Base64 of `{"Username":..,"Password":..}`, the opaque blob the
    /// engine expects
    pub fn encode(&self) -> Result<String> {
        Ok(STANDARD.encode(serde_json::to_vec(self)?))
    }
}

#[async_trait]
pub trait ImageEngine: Send + Sync {
    /// Every `repository:tag` known locally
    async fn list_repo_tags(&self) -> Result<Vec<String>>;

    /// Start pushing `image` and return its progress stream
    async fn push(&self, image: &str, encoded_auth: &str) -> Result<ProgressStream>;
}

#[derive(Debug, Deserialize)]
struct ImageSummary {
    #[serde(rename = "RepoTags", default)]
    repo_tags: Option<Vec<String>>,
}

/// Split `registry:5000/repo/name:tag` into name and tag.
///
/// The tag separator is the last `:` after the last `/`. Images without
/// a tag get `latest`.
pub fn split_image_reference(image: &str) -> (&str, &str) {
    let name_start = image.rfind('/').map(|i| i + 1).unwrap_or(0);

    match image[name_start..].rfind(':') {
        Some(i) => (&image[..name_start + i], &image[name_start + i + 1..]),
        None => (image, "latest"),
    }
}

/// Docker Engine API client
pub struct DockerEngine {
    client: reqwest::Client,
    endpoint: String,
}

impl DockerEngine {
    pub fn new(endpoint: impl Into<String>) -> Result<Self> {
        let client = reqwest::Client::builder()
            .user_agent(user_agent(env!("CARGO_PKG_VERSION")))
            .build()?;

        Ok(Self::with_client(client, endpoint))
    }

    pub fn with_client(client: reqwest::Client, endpoint: impl Into<String>) -> Self {
        Self {
            client,
            endpoint: endpoint.into().trim_end_matches('/').to_string(),
        }
    }

    /// Connect to the engine named by `DOCKER_HOST`
    pub fn from_env() -> Result<Self> {
        let docker_host = std::env::var("DOCKER_HOST").ok();
        Self::new(endpoint_from_docker_host(docker_host.as_deref()))
    }

    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }
}

/// HTTP endpoint for a `DOCKER_HOST` value.
///
/// `tcp://` becomes `http://`; `http(s)://` is used as is. Anything
/// else, including unix sockets, falls back to the default endpoint.
pub fn endpoint_from_docker_host(docker_host: Option<&str>) -> String {
    match docker_host.map(str::trim).filter(|h| !h.is_empty()) {
        Some(host) if host.starts_with("tcp://") => {
            format!("http://{}", &host["tcp://".len()..])
        }
        Some(host) if host.starts_with("http://") || host.starts_with("https://") => {
            host.to_string()
        }
        Some(host) => {
            warn!(
                "DOCKER_HOST '{}' is not an HTTP address, using {}",
                host, DEFAULT_DOCKER_ENDPOINT
            );
            DEFAULT_DOCKER_ENDPOINT.to_string()
        }
        None => DEFAULT_DOCKER_ENDPOINT.to_string(),
    }
}

#[async_trait]
impl ImageEngine for DockerEngine {
    async fn list_repo_tags(&self) -> Result<Vec<String>> {
        let response = self
            .client
            .get(format!("{}/images/json", self.endpoint))
            .send()
            .await?
            .error_for_status()?;

        let images: Vec<ImageSummary> = response.json().await?;

        Ok(images
            .into_iter()
            .flat_map(|image| image.repo_tags.unwrap_or_default())
            .collect())
    }

    async fn push(&self, image: &str, encoded_auth: &str) -> Result<ProgressStream> {
        let (name, tag) = split_image_reference(image);
        debug!("Pushing {} (tag {})", name, tag);

        let response = self
            .client
            .post(format!("{}/images/{}/push", self.endpoint, name))
            .query(&[("tag", tag)])
            .header("X-Registry-Auth", encoded_auth)
            .send()
            .await?;

        if response.status() != StatusCode::OK {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            return Err(CanvosError::PushFailed {
                image: image.to_string(),
                message: format!("{status}: {}", body.trim()),
            });
        }

        Ok(response
            .bytes_stream()
            .map(|chunk| chunk.map(|bytes| bytes.to_vec()).map_err(CanvosError::from))
            .boxed())
    }
}
