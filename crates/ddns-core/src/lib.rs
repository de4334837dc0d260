// # ddns-core
//
// Core library for the dynamic DNS update server.
//
// ## Architecture Overview
//
// Clients behind a changing public IP call the server, which keeps their
// address records at the DNS provider current:
// - **auth**: Validates per-domain secrets (body secret or basic auth)
// - **address**: Observed client address and dual-stack disambiguation
// - **UpdateCache**: Short-TTL memo of the last value written per record
// - **DnsProvider**: Trait for syncing address records via provider APIs
// - **UpdateEngine**: Composes the above into the direct and DynDNS flows
// - **DomainRegistry**: Reloadable, atomically swapped domain configuration
//
// ## Design Principles
//
// 1. **Separation of Concerns**: Decision logic lives here; HTTP and provider
//    wire formats live in their own crates
// 2. **Explicit State**: Cache and configuration are injected service
//    objects, never globals
// 3. **Structural Errors**: Every failure kind is an `Error` variant that
//    knows its HTTP status
// 4. **Write Economy**: The provider is called at most once per cache TTL
//    for an unchanged address

pub mod address;
pub mod api;
pub mod auth;
pub mod cache;
pub mod config;
pub mod domain;
pub mod engine;
pub mod error;
pub mod traits;

// Re-export core types for convenience
pub use api::{DomainUpdateRequest, DynDnsUpdateRequest, RequestOrigin};
pub use cache::UpdateCache;
pub use config::{DomainConfig, DomainRegistry, DomainsConfig, RecordType};
pub use engine::UpdateEngine;
pub use error::{CredentialFault, Error, Result};
pub use traits::{AddressRecord, DnsProvider, UpdateOutcome};
