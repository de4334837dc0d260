// # Update rounds
//
// One round POSTs the domain's `{"domain", "secret"}` body to every
// configured endpoint. Each endpoint is usually reachable over a single
// address family, so the server sees (and writes) that family's address.
// Every endpoint is attempted even when an earlier one fails.

use anyhow::{Context, Result, anyhow, bail};
use ddns_core::DomainUpdateRequest;
use reqwest::Client;
use std::time::Duration;
use tracing::{debug, info};

/// Time allowed for one update request
pub const UPDATE_TIMEOUT: Duration = Duration::from_secs(10);

/// `User-Agent` sent with every update
pub const USER_AGENT: &str = concat!("ddns-client/", env!("CARGO_PKG_VERSION"));

/// An update endpoint and the record type it is meant to refresh
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Endpoint {
    pub record_type: &'static str,
    pub url: String,
}

impl Endpoint {
    pub fn new(record_type: &'static str, url: impl Into<String>) -> Self {
        Self {
            record_type,
            url: url.into(),
        }
    }
}

/// Sends update rounds for a single domain
pub struct Updater {
    client: Client,
    request: DomainUpdateRequest,
    endpoints: Vec<Endpoint>,
}

// The secret stays out of Debug output
impl std::fmt::Debug for Updater {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Updater")
            .field("domain", &self.request.domain)
            .field("secret", &"<REDACTED>")
            .field("endpoints", &self.endpoints)
            .finish()
    }
}

impl Updater {
    /// Create an updater
    ///
    /// # Errors
    ///
    /// Fails when no endpoint is given or the HTTP client cannot be built.
    pub fn new(request: DomainUpdateRequest, endpoints: Vec<Endpoint>) -> Result<Self> {
        if endpoints.is_empty() {
            bail!("at least one update endpoint is required");
        }

        let client = Client::builder()
            .timeout(UPDATE_TIMEOUT)
            .user_agent(USER_AGENT)
            .build()
            .context("failed to build HTTP client")?;

        Ok(Self {
            client,
            request,
            endpoints,
        })
    }

    pub fn domain(&self) -> &str {
        &self.request.domain
    }

    /// Run one round against every endpoint
    ///
    /// All failures of the round are reported together.
    pub async fn run_round(&self) -> Result<()> {
        let mut failures = Vec::new();

        for endpoint in &self.endpoints {
            match self.update(&endpoint.url).await {
                Ok(()) => info!(
                    "{} update for '{}' accepted by '{}'",
                    endpoint.record_type, self.request.domain, endpoint.url
                ),
                Err(e) => failures.push(e),
            }
        }

        match failures.len() {
            0 => Ok(()),
            1 => Err(failures.remove(0)),
            n => Err(anyhow!(
                "{} updates failed: {}",
                n,
                failures
                    .iter()
                    .map(|e| format!("{:#}", e))
                    .collect::<Vec<_>>()
                    .join("; ")
            )),
        }
    }

    async fn update(&self, url: &str) -> Result<()> {
        debug!("Sending update for '{}' to '{}'", self.request.domain, url);

        let response = self
            .client
            .post(url)
            .json(&self.request)
            .send()
            .await
            .with_context(|| {
                format!(
                    "update request to '{}' for '{}' failed",
                    url, self.request.domain
                )
            })?;

        let status = response.status();
        if status.is_client_error() || status.is_server_error() {
            bail!(
                "update request to '{}' for '{}' failed with HTTP {}",
                url,
                self.request.domain,
                status
            );
        }

        Ok(())
    }
}
