// # DNS Provider Trait
//
// Defines the interface for synchronizing address records with a DNS
// provider API.
//
// ## Implementations
//
// - DigitalOcean: `ddns-provider-digitalocean` crate
//
// ## Usage
//
// ```rust,ignore
// use ddns_core::config::RecordType;
// use ddns_core::traits::DnsProvider;
//
// #[tokio::main]
// async fn main() -> anyhow::Result<()> {
//     let provider = /* DnsProvider implementation */;
//
//     // Point every "home" A record under example.com at 1.2.3.4
//     provider.sync("example.com", "home", RecordType::A, "1.2.3.4").await?;
//
//     Ok(())
// }
// ```

use async_trait::async_trait;

use crate::config::RecordType;

/// Result of one record write
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UpdateOutcome {
    /// Nothing was written (cache hit, or every match already had the value)
    Skipped,
    /// At least one existing record was rewritten
    Updated,
    /// A new record was created
    Created,
}

/// An address record as the provider reports it
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AddressRecord {
    /// Provider-assigned identifier
    pub id: i64,
    /// Record type as the provider spells it ("A", "AAAA", "MX", ...)
    pub record_type: String,
    /// Record name relative to the root domain ("@" for the apex)
    pub name: String,
    /// Record value
    pub data: String,
    /// Time-to-live in seconds
    pub ttl: u32,
}

/// Trait for DNS provider implementations
///
/// Providers only talk to their API. The cache, create-fallback policy and
/// credential checks all belong to `UpdateEngine`.
///
/// # Thread Safety
///
/// Implementations must be usable from many request tasks at once.
///
/// # Errors
///
/// [`sync`](DnsProvider::sync) must keep two failures distinguishable, since
/// only the second one may lead to a create:
///
/// - [`Error::NoRecordsFound`](crate::Error::NoRecordsFound): the root domain
///   has no records at all (not managed by the provider)
/// - [`Error::NoMatchingRecord`](crate::Error::NoMatchingRecord): the domain
///   exists but has no record with this name and type
///
/// Any transport, decoding or HTTP ≥ 400 failure is reported as
/// [`Error::Api`](crate::Error::Api) or [`Error::Http`](crate::Error::Http).
#[async_trait]
pub trait DnsProvider: Send + Sync {
    /// List every record of `root_domain`, in provider order
    ///
    /// An unknown root domain yields either an empty list or an API error,
    /// depending on the provider.
    async fn list_records(&self, root_domain: &str) -> Result<Vec<AddressRecord>, crate::Error>;

    /// Point every `(record_name, record_type)` record under `root_domain` at `value`
    ///
    /// Lists all records of the root domain (following pagination), then
    /// rewrites each matching record whose data differs. Matching records
    /// that already hold `value` are left untouched.
    ///
    /// # Returns
    ///
    /// - `Ok(UpdateOutcome::Updated)`: at least one record was rewritten
    /// - `Ok(UpdateOutcome::Skipped)`: every match already held `value`
    /// - `Err(Error)`: listing or writing failed, or nothing matched
    async fn sync(
        &self,
        root_domain: &str,
        record_name: &str,
        record_type: RecordType,
        value: &str,
    ) -> Result<UpdateOutcome, crate::Error>;

    /// Create a new address record
    ///
    /// # Returns
    ///
    /// - `Ok(UpdateOutcome::Created)`: the record was created
    /// - `Err(Error)`: the provider refused or could not be reached
    async fn create(
        &self,
        root_domain: &str,
        record_name: &str,
        record_type: RecordType,
        value: &str,
    ) -> Result<UpdateOutcome, crate::Error>;

    /// Get the provider name (for logging/debugging)
    fn provider_name(&self) -> &'static str;
}
