//! Configuration types for the DDNS update server
//!
//! The operator lists the domains clients may update in a JSON file:
//!
//! ```json
//! {
//!   "domains": [
//!     { "domain": "home.example.com", "secret": "s3cret", "allowClientIPChoice": true }
//!   ]
//! }
//! ```
//!
//! The parsed set is held by a [`DomainRegistry`] as an immutable snapshot.
//! Reloading builds a fresh snapshot and swaps it in under an exclusive lock,
//! so readers never observe a partially-updated set.

use serde::{Deserialize, Serialize};
use std::collections::{HashMap, HashSet};
use std::fmt;
use std::path::Path;
use std::str::FromStr;
use std::sync::{Arc, RwLock};
use tracing::debug;

use crate::error::{Error, Result};

/// Configuration for a single updatable domain
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DomainConfig {
    /// Fully-qualified domain name (e.g., "home.example.com")
    pub domain: String,

    /// Shared secret clients must present
    pub secret: String,

    /// Whether a client-declared `myip` may override the observed address
    #[serde(default, rename = "allowClientIPChoice")]
    pub allow_client_ip_choice: bool,

    /// Whether to create the record when the domain exists but the record doesn't
    #[serde(default)]
    pub create_missing_records: bool,
}

impl DomainConfig {
    /// Create a new domain configuration
    pub fn new(domain: impl Into<String>, secret: impl Into<String>) -> Self {
        Self {
            domain: domain.into(),
            secret: secret.into(),
            allow_client_ip_choice: false,
            create_missing_records: false,
        }
    }

    /// Allow or forbid client-declared addresses
    pub fn with_client_ip_choice(mut self, allow: bool) -> Self {
        self.allow_client_ip_choice = allow;
        self
    }

    /// Allow or forbid creating missing records
    pub fn with_create_missing_records(mut self, create: bool) -> Self {
        self.create_missing_records = create;
        self
    }
}

/// The full set of configured domains, as read from the config file
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DomainsConfig {
    /// Configured domains, in file order
    #[serde(default)]
    pub domains: Vec<DomainConfig>,
}

impl DomainsConfig {
    /// Create a configuration from a list of domains
    pub fn new(domains: Vec<DomainConfig>) -> Self {
        Self { domains }
    }

    /// Parse and validate a configuration from JSON text
    pub fn from_json(json: &str) -> Result<Self> {
        let config: Self = serde_json::from_str(json)
            .map_err(|e| Error::config(format!("couldn't parse domains config as JSON: {}", e)))?;
        config.validate()?;
        Ok(config)
    }

    /// Read, parse and validate a configuration file
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let json = std::fs::read_to_string(path).map_err(|e| {
            Error::config(format!("couldn't read config file '{}': {}", path.display(), e))
        })?;
        Self::from_json(&json).map_err(|e| match e {
            Error::Config(msg) => Error::config(format!("{} ({})", msg, path.display())),
            other => other,
        })
    }

    /// Validate the configuration
    ///
    /// Domain names are the identity key, so they must be non-empty and unique.
    pub fn validate(&self) -> Result<()> {
        let mut seen = HashSet::new();
        for entry in &self.domains {
            if entry.domain.trim().is_empty() {
                return Err(Error::config("domain name cannot be empty"));
            }
            if entry.secret.is_empty() {
                return Err(Error::config(format!(
                    "secret for domain '{}' cannot be empty",
                    entry.domain
                )));
            }
            if !seen.insert(entry.domain.as_str()) {
                return Err(Error::config(format!(
                    "domain '{}' is configured more than once",
                    entry.domain
                )));
            }
        }
        Ok(())
    }
}

/// An immutable, indexed view of one loaded [`DomainsConfig`]
#[derive(Debug, Default)]
pub struct DomainsSnapshot {
    by_name: HashMap<String, DomainConfig>,
}

impl DomainsSnapshot {
    fn new(config: DomainsConfig) -> Self {
        let by_name = config
            .domains
            .into_iter()
            .map(|entry| (entry.domain.clone(), entry))
            .collect();
        Self { by_name }
    }

    /// Look up the configuration for a domain
    pub fn get(&self, domain: &str) -> Option<&DomainConfig> {
        self.by_name.get(domain)
    }

    /// Number of configured domains
    pub fn len(&self) -> usize {
        self.by_name.len()
    }

    /// Whether no domains are configured
    pub fn is_empty(&self) -> bool {
        self.by_name.is_empty()
    }
}

/// Process-wide holder of the current domain configuration
///
/// ## Thread Safety
///
/// Readers take the shared lock just long enough to clone the snapshot `Arc`.
/// [`DomainRegistry::replace`] takes the exclusive lock to swap it.
#[derive(Debug, Default)]
pub struct DomainRegistry {
    current: RwLock<Arc<DomainsSnapshot>>,
}

impl DomainRegistry {
    /// Create a registry holding the given configuration
    pub fn new(config: DomainsConfig) -> Self {
        Self {
            current: RwLock::new(Arc::new(DomainsSnapshot::new(config))),
        }
    }

    /// Create a registry from a config file
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self> {
        Ok(Self::new(DomainsConfig::load(path)?))
    }

    /// Current snapshot of the configured domains
    pub fn snapshot(&self) -> Arc<DomainsSnapshot> {
        let guard = self.current.read().unwrap_or_else(|e| e.into_inner());
        Arc::clone(&guard)
    }

    /// Look up the configuration for a domain in the current snapshot
    pub fn lookup(&self, domain: &str) -> Option<DomainConfig> {
        self.snapshot().get(domain).cloned()
    }

    /// Atomically replace the configured domains
    pub fn replace(&self, config: DomainsConfig) {
        let snapshot = Arc::new(DomainsSnapshot::new(config));
        let mut guard = self.current.write().unwrap_or_else(|e| e.into_inner());
        *guard = snapshot;
    }

    /// Re-read the config file and swap it in
    ///
    /// On failure the previous configuration stays active.
    pub fn reload_from_file(&self, path: impl AsRef<Path>) -> Result<usize> {
        let config = DomainsConfig::load(path)?;
        let count = config.domains.len();
        self.replace(config);
        debug!("Domains config swapped in: {} domain(s)", count);
        Ok(count)
    }
}

/// DNS address record type
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum RecordType {
    /// A record (IPv4)
    #[serde(rename = "A")]
    A,
    /// AAAA record (IPv6)
    #[serde(rename = "AAAA")]
    Aaaa,
}

impl RecordType {
    /// Wire name of the record type
    pub fn as_str(&self) -> &'static str {
        match self {
            RecordType::A => "A",
            RecordType::Aaaa => "AAAA",
        }
    }
}

impl fmt::Display for RecordType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for RecordType {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "A" => Ok(RecordType::A),
            "AAAA" => Ok(RecordType::Aaaa),
            other => Err(Error::InvalidRecordType(other.to_string())),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    const SAMPLE: &str = r#"{
        "domains": [
            { "domain": "home.example.com", "secret": "abc", "allowClientIPChoice": true },
            { "domain": "example.org", "secret": "def", "createMissingRecords": true }
        ]
    }"#;

    #[test]
    fn test_parse_camel_case_fields() {
        let config = DomainsConfig::from_json(SAMPLE).unwrap();
        assert_eq!(config.domains.len(), 2);

        let home = &config.domains[0];
        assert!(home.allow_client_ip_choice);
        assert!(!home.create_missing_records);

        let org = &config.domains[1];
        assert!(!org.allow_client_ip_choice);
        assert!(org.create_missing_records);
    }

    #[test]
    fn test_duplicate_domains_rejected() {
        let config = DomainsConfig::new(vec![
            DomainConfig::new("a.example.com", "x"),
            DomainConfig::new("a.example.com", "y"),
        ]);
        assert!(matches!(config.validate(), Err(Error::Config(_))));
    }

    #[test]
    fn test_empty_secret_rejected() {
        let result = DomainsConfig::from_json(r#"{"domains":[{"domain":"a.com","secret":""}]}"#);
        assert!(result.is_err());
    }

    #[test]
    fn test_registry_lookup_and_replace() {
        let registry = DomainRegistry::new(DomainsConfig::from_json(SAMPLE).unwrap());
        let before = registry.snapshot();

        assert!(registry.lookup("home.example.com").is_some());
        assert!(registry.lookup("unknown.example.com").is_none());

        registry.replace(DomainsConfig::new(vec![DomainConfig::new("new.example.com", "z")]));

        assert!(registry.lookup("home.example.com").is_none());
        assert_eq!(registry.lookup("new.example.com").unwrap().secret, "z");

        // Snapshots taken before the swap are unaffected
        assert_eq!(before.len(), 2);
        assert!(before.get("home.example.com").is_some());
    }

    #[test]
    fn test_reload_from_file_keeps_previous_on_error() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        file.write_all(SAMPLE.as_bytes()).unwrap();

        let registry = DomainRegistry::from_file(file.path()).unwrap();
        assert_eq!(registry.snapshot().len(), 2);

        std::fs::write(file.path(), "{ not json").unwrap();
        assert!(registry.reload_from_file(file.path()).is_err());
        assert_eq!(registry.snapshot().len(), 2);

        std::fs::write(
            file.path(),
            r#"{"domains":[{"domain":"only.example.com","secret":"s"}]}"#,
        )
        .unwrap();
        assert_eq!(registry.reload_from_file(file.path()).unwrap(), 1);
        assert!(registry.lookup("only.example.com").is_some());
    }

    #[test]
    fn test_load_missing_file() {
        let err = DomainsConfig::load("/nonexistent/domains.json").unwrap_err();
        assert!(err.to_string().contains("couldn't read config file"));
    }

    #[test]
    fn test_record_type_parse() {
        assert_eq!("A".parse::<RecordType>().unwrap(), RecordType::A);
        assert_eq!("AAAA".parse::<RecordType>().unwrap(), RecordType::Aaaa);
        assert!(matches!(
            "CNAME".parse::<RecordType>(),
            Err(Error::InvalidRecordType(t)) if t == "CNAME"
        ));
        assert_eq!(RecordType::Aaaa.to_string(), "AAAA");
    }
}
