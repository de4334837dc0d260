// # DigitalOcean DNS Provider
//
// This crate provides the DigitalOcean DNS provider for the dynamic DNS
// server.
//
// ## Behaviour
//
// - Lists every record of the root domain, following `links.pages.next`
// - Rewrites only matching records whose data differs (full record PUT)
// - Creates a record on request; whether to create is the engine's call
// - Decodes API failures (`{"id", "message"}` + status) into `Error::Api`
// - 5 second timeout on every request, no retries
//
// ## Security Requirements
//
// - The API key NEVER appears in logs or `Debug` output
// - An empty API key is rejected at construction
//
// ## API Reference
//
// - DigitalOcean API v2: https://docs.digitalocean.com/reference/api/
// - Verify key: GET `/account`
// - List records: GET `/domains/:domain/records`
// - Update record: PUT `/domains/:domain/records/:id`
// - Create record: POST `/domains/:domain/records`

use async_trait::async_trait;
use ddns_core::traits::{AddressRecord, DnsProvider, UpdateOutcome};
use ddns_core::{Error, RecordType, Result};
use reqwest::{Client, Method, RequestBuilder, Response, Url};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tracing::{debug, info};

/// DigitalOcean API base URL
pub const DIGITALOCEAN_API_BASE: &str = "https://api.digitalocean.com/v2";

/// HTTP timeout for API requests
const DEFAULT_HTTP_TIMEOUT: Duration = Duration::from_secs(5);

/// TTL given to records this provider creates
pub const DEFAULT_RECORD_TTL: u32 = 300;

/// A domain record as the DigitalOcean API represents it
///
/// Updates send the whole record back with new data, so every field the
/// API returns is kept.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DomainRecord {
    pub id: i64,
    #[serde(rename = "type")]
    pub record_type: String,
    pub name: String,
    #[serde(default)]
    pub priority: Option<i64>,
    #[serde(default)]
    pub port: Option<i64>,
    #[serde(default)]
    pub weight: Option<i64>,
    pub ttl: u32,
    #[serde(default)]
    pub flags: Option<u8>,
    #[serde(default)]
    pub tag: Option<String>,
    pub data: String,
}

impl From<DomainRecord> for AddressRecord {
    fn from(record: DomainRecord) -> Self {
        Self {
            id: record.id,
            record_type: record.record_type,
            name: record.name,
            data: record.data,
            ttl: record.ttl,
        }
    }
}

#[derive(Debug, Default, Deserialize)]
struct RecordsPage {
    #[serde(default)]
    domain_records: Vec<DomainRecord>,
    #[serde(default)]
    links: Links,
}

#[derive(Debug, Default, Deserialize)]
struct Links {
    #[serde(default)]
    pages: Pages,
}

#[derive(Debug, Default, Deserialize)]
struct Pages {
    #[serde(default)]
    next: Option<String>,
}

#[derive(Debug, Serialize)]
struct NewRecord<'a> {
    #[serde(rename = "type")]
    record_type: &'a str,
    name: &'a str,
    data: &'a str,
    ttl: u32,
}

#[derive(Debug, Deserialize)]
struct ApiErrorBody {
    id: String,
    message: String,
}

/// DigitalOcean DNS provider
///
/// Stateless apart from the HTTP client; safe to share between request
/// tasks.
pub struct DigitalOceanProvider {
    /// Personal access token
    /// ⚠️ NEVER log this value
    api_key: String,

    /// API root, without a trailing slash
    base_url: String,

    /// HTTP client for API requests
    client: Client,
}

// Custom Debug implementation that hides the API key
impl std::fmt::Debug for DigitalOceanProvider {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DigitalOceanProvider")
            .field("api_key", &"<REDACTED>")
            .field("base_url", &self.base_url)
            .finish()
    }
}

impl DigitalOceanProvider {
    /// Create a new DigitalOcean provider
    ///
    /// # Errors
    ///
    /// Returns a configuration error if `api_key` is empty or the HTTP
    /// client cannot be built.
    pub fn new(api_key: impl Into<String>) -> Result<Self> {
        let api_key = api_key.into();
        if api_key.is_empty() {
            return Err(Error::config("DigitalOcean API key cannot be empty"));
        }

        let client = Client::builder()
            .timeout(DEFAULT_HTTP_TIMEOUT)
            .build()
            .map_err(|e| Error::config(format!("Failed to build HTTP client: {}", e)))?;

        Ok(Self {
            api_key,
            base_url: DIGITALOCEAN_API_BASE.to_string(),
            client,
        })
    }

    /// Point the provider at a different API root
    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into().trim_end_matches('/').to_string();
        self
    }

    /// The API root requests are sent to
    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// Check that the API key is accepted
    ///
    /// # API Call
    ///
    /// ```http
    /// GET /account
    /// Authorization: Bearer <token>
    /// ```
    pub async fn verify(&self) -> Result<()> {
        let url = self.url(&["account"])?;
        self.send(self.request(Method::GET, url)).await?;
        debug!("DigitalOcean API key verified");
        Ok(())
    }

    /// Fetch every record of `root_domain`, following pagination
    pub async fn records(&self, root_domain: &str) -> Result<Vec<DomainRecord>> {
        let mut records = Vec::new();
        let mut next = Some(self.url(&["domains", root_domain, "records"])?);

        while let Some(url) = next.take() {
            debug!("Listing records: {}", url);
            let page: RecordsPage = self.get_json(url).await?;
            records.extend(page.domain_records);

            next = match page.links.pages.next.filter(|n| !n.is_empty()) {
                Some(n) => Some(self.next_page_url(&n)?),
                None => None,
            };
        }

        Ok(records)
    }

    /// Build `base_url/segment/...`, percent-encoding each segment
    fn url(&self, segments: &[&str]) -> Result<Url> {
        let mut url = Url::parse(&self.base_url)
            .map_err(|e| Error::config(format!("Invalid API base URL '{}': {}", self.base_url, e)))?;
        url.path_segments_mut()
            .map_err(|_| Error::config(format!("API base URL '{}' cannot be a base", self.base_url)))?
            .pop_if_empty()
            .extend(segments);
        Ok(url)
    }

    /// Parse a `links.pages.next` URL
    ///
    /// The bearer token goes with every request, so the link must stay on
    /// the API root's origin.
    fn next_page_url(&self, next: &str) -> Result<Url> {
        let url = Url::parse(next)
            .map_err(|e| Error::http(format!("Invalid next page URL '{}': {}", next, e)))?;
        let base = self.url(&[])?;
        if url.origin() != base.origin() {
            return Err(Error::http(format!(
                "Next page URL '{}' leaves the API origin '{}'",
                next,
                base.origin().ascii_serialization()
            )));
        }
        Ok(url)
    }

    fn request(&self, method: Method, url: Url) -> RequestBuilder {
        self.client
            .request(method, url)
            .bearer_auth(&self.api_key)
            .header("Accept", "application/json")
            .header("Content-Type", "application/json")
    }

    /// Send a request, turning HTTP ≥ 400 into `Error::Api`
    async fn send(&self, request: RequestBuilder) -> Result<Response> {
        let response = request
            .send()
            .await
            .map_err(|e| Error::http(format!("HTTP request failed: {}", e)))?;

        let status = response.status();
        if status.is_client_error() || status.is_server_error() {
            let body = response.text().await.unwrap_or_default();
            return Err(match serde_json::from_str::<ApiErrorBody>(&body) {
                Ok(err) => Error::api(status.as_u16(), err.id, err.message),
                Err(e) => Error::http(format!(
                    "HTTP {}: failed to decode error response: {}",
                    status.as_u16(),
                    e
                )),
            });
        }

        Ok(response)
    }

    async fn get_json<T: DeserializeOwned>(&self, url: Url) -> Result<T> {
        let response = self.send(self.request(Method::GET, url.clone())).await?;
        response
            .json()
            .await
            .map_err(|e| Error::http(format!("Failed to decode response from '{}': {}", url, e)))
    }
}

#[async_trait]
impl DnsProvider for DigitalOceanProvider {
    async fn list_records(&self, root_domain: &str) -> Result<Vec<AddressRecord>> {
        Ok(self
            .records(root_domain)
            .await?
            .into_iter()
            .map(AddressRecord::from)
            .collect())
    }

    /// # API Calls
    ///
    /// ```http
    /// # List records (repeated while links.pages.next is set)
    /// GET /domains/:root/records
    ///
    /// # For each matching record whose data differs
    /// PUT /domains/:root/records/:id
    /// { ...record, "data": "1.2.3.4" }
    /// ```
    async fn sync(
        &self,
        root_domain: &str,
        record_name: &str,
        record_type: RecordType,
        value: &str,
    ) -> Result<UpdateOutcome> {
        let records = self.records(root_domain).await?;
        if records.is_empty() {
            return Err(Error::NoRecordsFound(root_domain.to_string()));
        }

        let mut found = 0;
        let mut written = 0;
        for mut record in records
            .into_iter()
            .filter(|r| r.name == record_name && r.record_type == record_type.as_str())
        {
            found += 1;
            if record.data == value {
                continue;
            }

            debug!(
                "Record {} ({}) holds '{}', rewriting",
                record.id, record_type, record.data
            );
            record.data = value.to_string();
            let url = self.url(&["domains", root_domain, "records", &record.id.to_string()])?;
            self.send(self.request(Method::PUT, url).json(&record))
                .await?;
            written += 1;
        }

        if found == 0 {
            return Err(Error::no_matching_record(
                root_domain,
                record_name,
                record_type.as_str(),
            ));
        }

        if written > 0 {
            info!(
                "Updated {} of {} {} record(s) for '{}.{}'",
                written, found, record_type, record_name, root_domain
            );
            Ok(UpdateOutcome::Updated)
        } else {
            debug!(
                "All {} {} record(s) for '{}.{}' already up to date",
                found, record_type, record_name, root_domain
            );
            Ok(UpdateOutcome::Skipped)
        }
    }

    /// # API Call
    ///
    /// ```http
    /// POST /domains/:root/records
    /// { "type": "A", "name": "home", "data": "1.2.3.4", "ttl": 300 }
    /// ```
    async fn create(
        &self,
        root_domain: &str,
        record_name: &str,
        record_type: RecordType,
        value: &str,
    ) -> Result<UpdateOutcome> {
        let body = NewRecord {
            record_type: record_type.as_str(),
            name: record_name,
            data: value,
            ttl: DEFAULT_RECORD_TTL,
        };

        let url = self.url(&["domains", root_domain, "records"])?;
        self.send(self.request(Method::POST, url).json(&body))
            .await?;

        info!(
            "Created {} record '{}.{}' -> '{}'",
            record_type, record_name, root_domain, value
        );
        Ok(UpdateOutcome::Created)
    }

    fn provider_name(&self) -> &'static str {
        "digitalocean"
    }
}
