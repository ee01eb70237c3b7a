//! HTTP code origin: `GET {origin}/code/{tenant}`.

use std::time::Duration;

use anyhow::{Context, Result};
use async_trait::async_trait;
use classio_core::{CodeOrigin, OriginError, TenantId};
use reqwest::Client;
use tracing::debug;
use url::Url;

/// Per-request timeout for origin fetches.
const FETCH_TIMEOUT: Duration = Duration::from_secs(10);

/// Fetches tenant code from the deployment API.
#[derive(Debug, Clone)]
pub struct HttpOrigin {
    client: Client,
    base_url: Url,
}

impl HttpOrigin {
    pub fn new(base_url: &str) -> Result<Self> {
        let client = Client::builder()
            .timeout(FETCH_TIMEOUT)
            .build()
            .context("failed to build origin HTTP client")?;
        Self::with_client(client, base_url)
    }

    pub fn with_client(client: Client, base_url: &str) -> Result<Self> {
        let parsed =
            Url::parse(base_url).with_context(|| format!("invalid origin URL: {base_url}"))?;
        if parsed.cannot_be_a_base() {
            anyhow::bail!("origin URL cannot carry a path: {base_url}");
        }
        Ok(Self {
            client,
            base_url: parsed,
        })
    }

    pub const fn base_url(&self) -> &Url {
        &self.base_url
    }

    /// URL of a tenant's code on the origin. The tenant id is always one
    /// percent-encoded path segment under `code/`.
    pub fn code_url(&self, tenant: &TenantId) -> Url {
        let mut url = self.base_url.clone();
        url.set_query(None);
        url.set_fragment(None);
        if let Ok(mut segments) = url.path_segments_mut() {
            segments.pop_if_empty().push("code").push(tenant.as_str());
        }
        url
    }
}

#[async_trait]
impl CodeOrigin for HttpOrigin {
    async fn fetch(&self, tenant: &TenantId) -> Result<String, OriginError> {
        let url = self.code_url(tenant);
        debug!(tenant = %tenant, %url, "fetching tenant code");

        let response = self
            .client
            .get(url)
            .send()
            .await
            .map_err(|e| OriginError::Unavailable(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            debug!(tenant = %tenant, %status, "origin has no code for tenant");
            return Err(OriginError::NotFound(tenant.to_string()));
        }

        response
            .text()
            .await
            .map_err(|e| OriginError::Unavailable(e.to_string()))
    }
}
