//! Palette API client
//!
//! Fetches catalog pages and submits cluster profiles. Every request
//! carries the API key and, when configured, the project scope.

use reqwest::{Method, RequestBuilder, StatusCode};
use serde::Deserialize;
use tracing::debug;

use super::PackList;
use crate::error::{CanvosError, Result};
use crate::profile::ClusterProfile;

/// User agent product token sent with every request
pub const DEFAULT_USER_AGENT: &str = "CanvOS";

/// Default Palette API endpoint
pub const DEFAULT_PALETTE_HOST: &str = "https://api.spectrocloud.com";

/// Credentials and scope for the Palette API
#[derive(Debug, Clone, Default, PartialEq)]
pub struct PaletteAuth {
    pub host: String,
    pub api_key: String,
    /// Empty means tenant scope
    pub project_id: String,
}

/// Error body returned by the Palette API on failure
#[derive(Debug, Default, Deserialize)]
struct ApiErrorBody {
    #[serde(default)]
    code: String,
    #[serde(default)]
    message: String,
    #[serde(default, rename = "ref")]
    reference: String,
}

#[derive(Debug, Deserialize)]
struct CreateProfileResponse {
    uid: String,
}

/// User agent string, with the version appended when one is known
pub fn user_agent(version: &str) -> String {
    if version.is_empty() {
        DEFAULT_USER_AGENT.to_string()
    } else {
        format!("{DEFAULT_USER_AGENT}/v{version}")
    }
}

pub struct PaletteClient {
    client: reqwest::Client,
    auth: PaletteAuth,
}

impl PaletteClient {
    pub fn new(auth: PaletteAuth) -> Result<Self> {
        Self::with_version(auth, "")
    }

    pub fn with_version(auth: PaletteAuth, version: &str) -> Result<Self> {
        let client = reqwest::Client::builder()
            .user_agent(user_agent(version))
            .build()?;

        Ok(Self::with_client(client, auth))
    }

    /// Use a preconfigured HTTP client
    pub fn with_client(client: reqwest::Client, auth: PaletteAuth) -> Self {
        Self { client, auth }
    }

    pub fn auth(&self) -> &PaletteAuth {
        &self.auth
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.auth.host.trim_end_matches('/'), path)
    }

    fn request(&self, method: Method, path: &str) -> RequestBuilder {
        let builder = self
            .client
            .request(method, self.url(path))
            .header("Content-Type", "application/json")
            .header("Accept", "application/json")
            .header("ApiKey", &self.auth.api_key);

        if self.auth.project_id.is_empty() {
            builder
        } else {
            builder.header("ProjectUid", &self.auth.project_id)
        }
    }

    /// Fetch one page of packs.
    ///
    /// `query` is the raw query string, e.g.
    /// `filters=spec.cloudTypes=edge-nativeANDspec.layer=cni&limit=50`.
    pub async fn get_packs(&self, query: &str) -> Result<PackList> {
        let response = self
            .request(Method::GET, &format!("/v1/packs?{query}"))
            .send()
            .await?;

        debug!("Pack request status: {} ({})", response.status(), query);

        if response.status() != StatusCode::OK {
            return Err(api_error(response).await);
        }

        Ok(response.json::<PackList>().await?)
    }

    /// Create a cluster profile and return its UID
    pub async fn create_cluster_profile(&self, profile: &ClusterProfile) -> Result<String> {
        let response = self
            .request(Method::POST, "/v1/clusterprofiles")
            .json(profile)
            .send()
            .await?;

        if response.status() != StatusCode::CREATED {
            return Err(api_error(response).await);
        }

        let created: CreateProfileResponse = response.json().await?;
        debug!(
            "Created cluster profile {} ({})",
            profile.metadata.name, created.uid
        );
        Ok(created.uid)
    }

    pub async fn publish_cluster_profile(&self, uid: &str) -> Result<()> {
        let response = self
            .request(Method::PATCH, &format!("/v1/clusterprofiles/{uid}/publish"))
            .send()
            .await?;

        if response.status() != StatusCode::NO_CONTENT {
            return Err(api_error(response).await);
        }

        Ok(())
    }
}

async fn api_error(response: reqwest::Response) -> CanvosError {
    let status = response.status().as_u16();
    let body = response.text().await.unwrap_or_default();
    decode_api_error(status, &body)
}

/// Turn a non-success response body into a structured error.
///
/// Bodies that are not the `{code, message, ref}` shape keep the raw
/// text as the message.
pub(crate) fn decode_api_error(status: u16, body: &str) -> CanvosError {
    let parsed: ApiErrorBody = serde_json::from_str(body).unwrap_or_else(|_| ApiErrorBody {
        message: body.trim().to_string(),
        ..Default::default()
    });

    CanvosError::Api {
        status,
        code: parsed.code,
        message: parsed.message,
        reference: parsed.reference,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tokio::io::{AsyncReadExt, AsyncWriteExt};
    use tokio::net::TcpListener;

    /// Serve exactly one canned HTTP response and hand back the raw request
    async fn serve_once(status_line: &str, body: &str) -> (String, tokio::task::JoinHandle<String>) {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        let response = format!(
            "HTTP/1.1 {status_line}\r\nContent-Type: application/json\r\nContent-Length: {}\r\nConnection: close\r\n\r\n{body}",
            body.len()
        );

        let handle = tokio::spawn(async move {
            let (mut socket, _) = listener.accept().await.unwrap();
            let mut buf = vec![0u8; 8192];
            let n = socket.read(&mut buf).await.unwrap();
            socket.write_all(response.as_bytes()).await.unwrap();
            socket.shutdown().await.ok();
            String::from_utf8_lossy(&buf[..n]).to_string()
        });

        (format!("http://{addr}"), handle)
    }

    fn local_client(auth: PaletteAuth) -> PaletteClient {
        let http = reqwest::Client::builder()
            .user_agent(user_agent(""))
            .no_proxy()
            .build()
            .unwrap();
        PaletteClient::with_client(http, auth)
    }

    #[test]
    fn test_user_agent() {
        assert_eq!(user_agent(""), "CanvOS");
        assert_eq!(user_agent("4.0.3"), "CanvOS/v4.0.3");
    }

    #[test]
    fn test_decode_api_error_structured() {
        let err = decode_api_error(
            401,
            r#"{"code":"Unauthorized","message":"invalid api key","ref":"abc123"}"#,
        );
        match err {
            CanvosError::Api {
                status,
                code,
                message,
                reference,
            } => {
                assert_eq!(status, 401);
                assert_eq!(code, "Unauthorized");
                assert_eq!(message, "invalid api key");
                assert_eq!(reference, "abc123");
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[test]
    fn test_decode_api_error_plain_text() {
        let err = decode_api_error(502, "bad gateway\n");
        assert_eq!(err.to_string(), "Palette API error (HTTP 502): bad gateway");
    }

    #[tokio::test]
    async fn test_get_packs_sends_auth_headers() {
        let body = r#"{"items":[{"metadata":{"uid":"u1"},"spec":{"name":"cni-calico","version":"3.26.1","layer":"cni","registryUid":"r1"}}],"listmeta":{"count":1}}"#;
        let (host, server) = serve_once("200 OK", body).await;

        let client = local_client(PaletteAuth {
            host,
            api_key: "secret-key".to_string(),
            project_id: "project-1".to_string(),
        });

        let list = client.get_packs("filters=spec.layer=cni&limit=50").await.unwrap();
        assert_eq!(list.items.len(), 1);
        assert_eq!(list.items[0].uid(), "u1");

        let request = server.await.unwrap().to_lowercase();
        assert!(request.starts_with("get /v1/packs?filters=spec.layer=cni&limit=50 "));
        assert!(request.contains("apikey: secret-key"));
        assert!(request.contains("projectuid: project-1"));
        assert!(request.contains("user-agent: canvos"));
    }

    #[tokio::test]
    async fn test_get_packs_surfaces_api_error() {
        let (host, server) = serve_once(
            "403 Forbidden",
            r#"{"code":"Forbidden","message":"no access","ref":"r-9"}"#,
        )
        .await;

        let client = local_client(PaletteAuth {
            host,
            api_key: "k".to_string(),
            project_id: String::new(),
        });

        let err = client.get_packs("limit=1").await.unwrap_err();
        assert!(matches!(err, CanvosError::Api { status: 403, .. }));

        let request = server.await.unwrap().to_lowercase();
        assert!(!request.contains("projectuid"));
    }
}
