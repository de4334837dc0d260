//! Request authentication against per-domain secrets

use base64::Engine;
use base64::engine::general_purpose::STANDARD as BASE64;
use tracing::debug;

use crate::config::{DomainConfig, DomainsSnapshot};
use crate::error::{CredentialFault, Error, Result};

/// A credential presented with an update request
#[derive(Debug, Clone, Copy)]
pub enum Credential<'a> {
    /// Shared secret from a JSON body
    Secret(&'a str),
    /// Raw `Authorization` header value, if any, expected as `Basic base64(domain:secret)`
    BasicAuth(Option<&'a str>),
}

/// Authenticate a request for `domain`
///
/// The domain is looked up first, so an unconfigured domain is reported as
/// [`Error::UnknownDomain`] whatever the credential looks like.
pub fn authenticate(
    domains: &DomainsSnapshot,
    domain: &str,
    credential: Credential<'_>,
) -> Result<DomainConfig> {
    let config = domains
        .get(domain)
        .ok_or_else(|| Error::UnknownDomain(domain.to_string()))?;

    match credential {
        Credential::Secret(secret) => {
            if secret != config.secret {
                return Err(Error::bad_credential(domain, CredentialFault::SecretMismatch));
            }
        }
        Credential::BasicAuth(header) => {
            let decoded =
                decode_basic_auth(header).map_err(|fault| Error::bad_credential(domain, fault))?;
            let expected = format!("{}:{}", config.domain, config.secret);
            if decoded != expected.as_bytes() {
                return Err(Error::bad_credential(domain, CredentialFault::BasicAuthMismatch));
            }
        }
    }

    debug!("Authenticated update request for {}", domain);
    Ok(config.clone())
}

fn decode_basic_auth(header: Option<&str>) -> std::result::Result<Vec<u8>, CredentialFault> {
    let encoded = header
        .and_then(|h| h.strip_prefix("Basic "))
        .ok_or(CredentialFault::MissingBasicAuth)?;

    BASE64
        .decode(encoded)
        .map_err(|e| CredentialFault::UndecodableBasicAuth(e.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{DomainRegistry, DomainsConfig};
    use std::sync::Arc;

    fn snapshot() -> Arc<DomainsSnapshot> {
        DomainRegistry::new(DomainsConfig::new(vec![DomainConfig::new(
            "home.example.com",
            "hunter2",
        )]))
        .snapshot()
    }

    fn basic(user_pass: &str) -> String {
        format!("Basic {}", BASE64.encode(user_pass))
    }

    #[test]
    fn test_secret_ok() {
        let config =
            authenticate(&snapshot(), "home.example.com", Credential::Secret("hunter2")).unwrap();
        assert_eq!(config.domain, "home.example.com");
    }

    #[test]
    fn test_secret_mismatch() {
        let err =
            authenticate(&snapshot(), "home.example.com", Credential::Secret("nope")).unwrap_err();
        assert!(matches!(
            err,
            Error::BadCredential { fault: CredentialFault::SecretMismatch, .. }
        ));
    }

    #[test]
    fn test_unknown_domain_wins_over_bad_credential() {
        let err = authenticate(&snapshot(), "other.example.com", Credential::BasicAuth(None))
            .unwrap_err();
        assert!(matches!(err, Error::UnknownDomain(d) if d == "other.example.com"));
    }

    #[test]
    fn test_basic_auth_ok() {
        let header = basic("home.example.com:hunter2");
        let result = authenticate(
            &snapshot(),
            "home.example.com",
            Credential::BasicAuth(Some(&header)),
        );
        assert!(result.is_ok());
    }

    #[test]
    fn test_basic_auth_faults() {
        let snap = snapshot();

        let err = authenticate(&snap, "home.example.com", Credential::BasicAuth(None)).unwrap_err();
        assert!(matches!(
            err,
            Error::BadCredential { fault: CredentialFault::MissingBasicAuth, .. }
        ));

        let err = authenticate(
            &snap,
            "home.example.com",
            Credential::BasicAuth(Some("Bearer abc")),
        )
        .unwrap_err();
        assert!(matches!(
            err,
            Error::BadCredential { fault: CredentialFault::MissingBasicAuth, .. }
        ));

        let err = authenticate(
            &snap,
            "home.example.com",
            Credential::BasicAuth(Some("Basic !!!")),
        )
        .unwrap_err();
        assert!(matches!(
            err,
            Error::BadCredential { fault: CredentialFault::UndecodableBasicAuth(_), .. }
        ));

        // Secret alone is not enough, the domain must be part of the pair
        let header = basic("user:hunter2");
        let err = authenticate(
            &snap,
            "home.example.com",
            Credential::BasicAuth(Some(&header)),
        )
        .unwrap_err();
        assert!(matches!(
            err,
            Error::BadCredential { fault: CredentialFault::BasicAuthMismatch, .. }
        ));
        assert_eq!(err.status_code(), 401);
    }
}
