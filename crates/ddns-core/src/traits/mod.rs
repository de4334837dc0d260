//! Core traits for the DDNS update server
//!
//! - [`DnsProvider`]: Synchronize address records via a provider API

pub mod dns_provider;

pub use dns_provider::{AddressRecord, DnsProvider, UpdateOutcome};
