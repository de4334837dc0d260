//! Test doubles and common utilities for update contract tests
//!
//! The mock provider keeps an in-memory zone per root domain and follows
//! the same list-match-update rules a real provider client does, while
//! counting every call the engine makes.

#![allow(dead_code)]

use base64::Engine;
use base64::engine::general_purpose::STANDARD as BASE64;
use ddns_core::traits::{AddressRecord, DnsProvider, UpdateOutcome};
use ddns_core::{
    DomainConfig, DomainRegistry, DomainsConfig, Error, RecordType, RequestOrigin, Result,
    UpdateCache, UpdateEngine,
};
use std::collections::{HashMap, HashSet};
use std::sync::atomic::{AtomicI64, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

/// A mock DnsProvider backed by in-memory zones
#[derive(Default)]
pub struct MockDnsProvider {
    zones: Mutex<HashMap<String, Vec<AddressRecord>>>,
    failing: Mutex<HashSet<RecordType>>,
    sync_calls: AtomicUsize,
    create_calls: AtomicUsize,
    writes: AtomicUsize,
    next_id: AtomicI64,
}

impl MockDnsProvider {
    pub fn new() -> Self {
        Self {
            next_id: AtomicI64::new(1000),
            ..Default::default()
        }
    }

    /// Add an existing record to a zone
    pub fn with_record(self, root: &str, name: &str, record_type: &str, data: &str) -> Self {
        let id = self.next_id.fetch_add(1, Ordering::SeqCst);
        self.zones
            .lock()
            .unwrap()
            .entry(root.to_string())
            .or_default()
            .push(AddressRecord {
                id,
                record_type: record_type.to_string(),
                name: name.to_string(),
                data: data.to_string(),
                ttl: 300,
            });
        self
    }

    /// Make every sync for this record type fail with an API error
    pub fn failing_for(self, record_type: RecordType) -> Self {
        self.failing.lock().unwrap().insert(record_type);
        self
    }

    pub fn sync_calls(&self) -> usize {
        self.sync_calls.load(Ordering::SeqCst)
    }

    pub fn create_calls(&self) -> usize {
        self.create_calls.load(Ordering::SeqCst)
    }

    /// Number of records rewritten by sync
    pub fn writes(&self) -> usize {
        self.writes.load(Ordering::SeqCst)
    }

    pub fn total_calls(&self) -> usize {
        self.sync_calls() + self.create_calls()
    }

    /// Data of every record with this name and type
    pub fn values(&self, root: &str, name: &str, record_type: RecordType) -> Vec<String> {
        self.zones
            .lock()
            .unwrap()
            .get(root)
            .map(|records| {
                records
                    .iter()
                    .filter(|r| r.name == name && r.record_type == record_type.as_str())
                    .map(|r| r.data.clone())
                    .collect()
            })
            .unwrap_or_default()
    }
}

#[async_trait::async_trait]
impl DnsProvider for MockDnsProvider {
    async fn list_records(&self, root_domain: &str) -> Result<Vec<AddressRecord>> {
        Ok(self
            .zones
            .lock()
            .unwrap()
            .get(root_domain)
            .cloned()
            .unwrap_or_default())
    }

    async fn sync(
        &self,
        root_domain: &str,
        record_name: &str,
        record_type: RecordType,
        value: &str,
    ) -> Result<UpdateOutcome> {
        self.sync_calls.fetch_add(1, Ordering::SeqCst);

        if self.failing.lock().unwrap().contains(&record_type) {
            return Err(Error::api(500, "server_error", "injected failure"));
        }

        let mut zones = self.zones.lock().unwrap();
        let records = match zones.get_mut(root_domain) {
            Some(records) if !records.is_empty() => records,
            _ => return Err(Error::NoRecordsFound(root_domain.to_string())),
        };

        let mut found = 0;
        let mut written = 0;
        for record in records
            .iter_mut()
            .filter(|r| r.name == record_name && r.record_type == record_type.as_str())
        {
            found += 1;
            if record.data != value {
                record.data = value.to_string();
                written += 1;
            }
        }

        if found == 0 {
            return Err(Error::no_matching_record(
                root_domain,
                record_name,
                record_type.as_str(),
            ));
        }

        self.writes.fetch_add(written, Ordering::SeqCst);
        Ok(if written > 0 {
            UpdateOutcome::Updated
        } else {
            UpdateOutcome::Skipped
        })
    }

    async fn create(
        &self,
        root_domain: &str,
        record_name: &str,
        record_type: RecordType,
        value: &str,
    ) -> Result<UpdateOutcome> {
        self.create_calls.fetch_add(1, Ordering::SeqCst);
        let id = self.next_id.fetch_add(1, Ordering::SeqCst);
        self.zones
            .lock()
            .unwrap()
            .entry(root_domain.to_string())
            .or_default()
            .push(AddressRecord {
                id,
                record_type: record_type.as_str().to_string(),
                name: record_name.to_string(),
                data: value.to_string(),
                ttl: 300,
            });
        Ok(UpdateOutcome::Created)
    }

    fn provider_name(&self) -> &'static str {
        "mock"
    }
}

/// Build an engine over the given provider and domains
pub fn engine_with(provider: &Arc<MockDnsProvider>, domains: Vec<DomainConfig>) -> UpdateEngine {
    let provider: Arc<dyn DnsProvider> = provider.clone();
    UpdateEngine::new(
        provider,
        UpdateCache::new(),
        Arc::new(DomainRegistry::new(DomainsConfig::new(domains))),
    )
}

/// A request arriving directly from `ip`
pub fn origin(ip: &str) -> RequestOrigin {
    RequestOrigin::new(ip.parse().expect("valid test IP"))
}

/// `Authorization` header value for `domain:secret`
pub fn basic_auth(domain: &str, secret: &str) -> String {
    format!("Basic {}", BASE64.encode(format!("{}:{}", domain, secret)))
}
