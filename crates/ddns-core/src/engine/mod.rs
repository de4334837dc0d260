//! Update orchestration
//!
//! The UpdateEngine is responsible for:
//! - Authenticating update requests against the domain configuration
//! - Working out which address(es) to write
//! - Skipping writes the cache says are already done
//! - Syncing records via DnsProvider, creating them when permitted
//! - Recording successful writes in the cache
//!
//! ## Architecture
//!
//! ```text
//!   request ──► auth ──► address ──► UpdateEngine
//!                                        │
//!             ┌──────────────────────────┼──────────────────────────┐
//!             ▼                          ▼                          ▼
//!     ┌──────────────┐          ┌──────────────┐          ┌──────────────┐
//!     │ UpdateCache  │          │ DnsProvider  │          │ UpdateCache  │
//!     │ (check)      │          │ (sync/create)│          │ (set)        │
//!     └──────────────┘          └──────────────┘          └──────────────┘
//! ```
//!
//! ## Update Flow (per record)
//!
//! 1. Cache holds the same value → skip
//! 2. Split the domain into root domain + record name
//! 3. `DnsProvider::sync()`
//! 4. `NoMatchingRecord` and `createMissingRecords` → `DnsProvider::create()`
//! 5. On success, cache the value

use std::sync::Arc;
use tracing::{debug, info, warn};

use crate::address::{self, AddressTargets};
use crate::api::{DomainUpdateRequest, DynDnsUpdateRequest, RequestOrigin};
use crate::auth::{self, Credential};
use crate::cache::UpdateCache;
use crate::config::{DomainConfig, DomainRegistry, RecordType};
use crate::domain::RecordLocation;
use crate::error::{Error, Result};
use crate::traits::{DnsProvider, UpdateOutcome};

/// Core update engine
///
/// One engine is shared by every request task. It holds no per-request
/// state; the cache and the domain registry are the only shared state.
///
/// ## Concurrency
///
/// Two concurrent requests for the same record may both miss the cache and
/// both call the provider. Both write the same value, so the race only
/// costs an extra provider call.
pub struct UpdateEngine {
    /// DNS provider for syncing records
    provider: Arc<dyn DnsProvider>,

    /// Cache of recent writes
    cache: UpdateCache,

    /// Configured domains
    domains: Arc<DomainRegistry>,
}

impl UpdateEngine {
    /// Create a new update engine
    pub fn new(
        provider: Arc<dyn DnsProvider>,
        cache: UpdateCache,
        domains: Arc<DomainRegistry>,
    ) -> Self {
        Self {
            provider,
            cache,
            domains,
        }
    }

    /// The domain registry this engine reads from
    pub fn domains(&self) -> &Arc<DomainRegistry> {
        &self.domains
    }

    /// The cache this engine consults
    pub fn cache(&self) -> &UpdateCache {
        &self.cache
    }

    /// Handle a direct update request
    ///
    /// Writes the observed address to the A or AAAA record of the domain.
    /// Success maps to `204 No Content`.
    pub async fn direct_update(
        &self,
        request: &DomainUpdateRequest,
        origin: &RequestOrigin,
    ) -> Result<UpdateOutcome> {
        let snapshot = self.domains.snapshot();
        let config = auth::authenticate(
            &snapshot,
            &request.domain,
            Credential::Secret(&request.secret),
        )?;

        let observed = address::resolve_observed(origin.peer, origin.forwarded_for.as_deref())?;
        let record_type = observed.family.record_type();

        self.perform_update(&config, record_type, &observed.value())
            .await
    }

    /// Handle a DynDNS-style update request
    ///
    /// `authorization` is the raw `Authorization` header. Both address
    /// families are attempted even if the first fails; any failure fails the
    /// request, although a write for the other family may already have
    /// landed.
    ///
    /// # Returns
    ///
    /// The protocol response body, `good <ip>`.
    pub async fn dyndns_update(
        &self,
        request: &DynDnsUpdateRequest,
        authorization: Option<&str>,
        origin: &RequestOrigin,
    ) -> Result<String> {
        request.validate()?;

        let snapshot = self.domains.snapshot();
        let config = auth::authenticate(
            &snapshot,
            &request.hostnames,
            Credential::BasicAuth(authorization),
        )?;

        let observed = address::resolve_observed(origin.peer, origin.forwarded_for.as_deref())?;
        let targets = address::disambiguate(
            &observed,
            request.myip.as_deref(),
            config.allow_client_ip_choice,
        )?;

        let mut errors = Vec::new();
        for (record_type, value) in targets.iter() {
            if let Err(e) = self.perform_update(&config, record_type, value).await {
                warn!(
                    "{} update for {} to {} failed: {}",
                    record_type, config.domain, value, e
                );
                errors.push(e);
            }
        }

        if let Some(error) = Error::collect(errors) {
            return Err(error);
        }

        Ok(format!(
            "good {}",
            response_ip(&config, request.myip.as_deref(), &targets)
        ))
    }

    /// Bring one record of a configured domain to `value`
    pub async fn perform_update(
        &self,
        config: &DomainConfig,
        record_type: RecordType,
        value: &str,
    ) -> Result<UpdateOutcome> {
        if self.cache.get(&config.domain, record_type).await.as_deref() == Some(value) {
            debug!(
                "Cache indicates that {} record for {} is up to date",
                record_type, config.domain
            );
            return Ok(UpdateOutcome::Skipped);
        }

        let location = RecordLocation::split(&config.domain)?;

        info!(
            "Updating {} records for '{}.{}' to '{}' via {}",
            record_type,
            location.record_name,
            location.root_domain,
            value,
            self.provider.provider_name()
        );

        let outcome = match self
            .provider
            .sync(&location.root_domain, &location.record_name, record_type, value)
            .await
        {
            Err(Error::NoMatchingRecord { .. }) if config.create_missing_records => {
                info!(
                    "No {} record for {} yet, creating it",
                    record_type, config.domain
                );
                self.provider
                    .create(&location.root_domain, &location.record_name, record_type, value)
                    .await?
            }
            other => other?,
        };

        self.cache.set(&config.domain, record_type, value).await;
        Ok(outcome)
    }
}

/// The address echoed back in a `good` response
fn response_ip<'a>(
    config: &DomainConfig,
    myip: Option<&'a str>,
    targets: &'a AddressTargets,
) -> &'a str {
    if config.allow_client_ip_choice {
        return myip.unwrap_or_default();
    }
    targets
        .a
        .as_deref()
        .or(targets.aaaa.as_deref())
        .unwrap_or_default()
}
