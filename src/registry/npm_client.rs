//! HTTP registry client
//!
//! Sends the publish document with `PUT <registry>/<escaped-name>` using
//! reqwest. The reply is returned as-is; status interpretation belongs to
//! the publisher.

use crate::core::error::PublishError;
use crate::core::traits::{PublishRequest, RegistryClient, RegistryResponse};
use crate::registry::document::package_url;
use async_trait::async_trait;
use reqwest::header::{AUTHORIZATION, CONTENT_TYPE, HeaderMap, HeaderValue};
use secrecy::ExposeSecret;
use std::time::Duration;
use tracing::{debug, warn};
use uuid::Uuid;

const USER_AGENT: &str = concat!("npm-registry-publisher/", env!("CARGO_PKG_VERSION"));

/// reqwest-backed [`RegistryClient`]
pub struct HttpRegistryClient {
    client: reqwest::Client,
    session: String,
}

impl HttpRegistryClient {
    /// Create a client with an optional request timeout
    pub fn new(timeout: Option<Duration>) -> Result<Self, PublishError> {
        let mut builder = reqwest::Client::builder().user_agent(USER_AGENT);
        if let Some(timeout) = timeout {
            builder = builder.timeout(timeout);
        }

        let client = builder
            .build()
            .map_err(|e| PublishError::ConfigError(format!("Failed to build HTTP client: {}", e)))?;

        // npm sends a 16 hex-digit session id with every request of one run
        let mut session = Uuid::new_v4().simple().to_string();
        session.truncate(16);

        Ok(Self { client, session })
    }

    fn headers(&self, request: &PublishRequest<'_>) -> anyhow::Result<HeaderMap> {
        let mut headers = HeaderMap::new();
        let mut auth = HeaderValue::from_str(&format!(
            "Bearer {}",
            request.token.expose_secret()
        ))?;
        auth.set_sensitive(true);
        headers.insert(AUTHORIZATION, auth);
        headers.insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));
        headers.insert("npm-command", HeaderValue::from_static("publish"));
        headers.insert("npm-session", HeaderValue::from_str(&self.session)?);
        Ok(headers)
    }
}

#[async_trait]
impl RegistryClient for HttpRegistryClient {
    fn name(&self) -> &str {
        "http"
    }

    async fn put_package(&self, request: &PublishRequest<'_>) -> anyhow::Result<RegistryResponse> {
        let url = package_url(request.registry_url, request.metadata.name())?;
        let body = serde_json::to_vec(&request.document)?;
        debug!("PUT {} ({} bytes)", url, body.len());

        let response = self
            .client
            .put(url)
            .headers(self.headers(request)?)
            .body(body)
            .send()
            .await?;

        let status = response.status().as_u16();
        let body = match response.text().await {
            Ok(body) => body,
            Err(e) => {
                warn!("could not read registry reply body (HTTP {}): {}", status, e);
                String::new()
            }
        };
        debug!("registry replied HTTP {}", status);

        Ok(RegistryResponse { status, body })
    }
}
