//! Error types for the DDNS update server
//!
//! Every error knows the HTTP status it surfaces as and, optionally, a
//! message that is safe to show to the caller. The internal detail (the
//! `Display` output) is only ever logged.

use thiserror::Error;

/// Result type alias for DDNS operations
pub type Result<T> = std::result::Result<T, Error>;

/// Why a presented credential was rejected
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum CredentialFault {
    /// The shared secret in the request body did not match
    #[error("secret mismatch")]
    SecretMismatch,

    /// No `Authorization: Basic ...` header was presented
    #[error("authorization header doesn't look like basic auth")]
    MissingBasicAuth,

    /// The basic-auth payload was not valid base64
    #[error("authorization decoding error: {0}")]
    UndecodableBasicAuth(String),

    /// The decoded `domain:secret` pair did not match
    #[error("domain:secret mismatch")]
    BasicAuthMismatch,
}

/// Core error type for the DDNS update server
#[derive(Error, Debug)]
pub enum Error {
    /// The direct-update body was not valid JSON for the expected shape
    #[error("Malformed request body: {0}")]
    MalformedBody(String),

    /// Query parameters could not be decoded, or an unsupported one was set
    #[error("Invalid query parameters: {0}")]
    InvalidParameters(String),

    /// More than one hostname was requested at once
    #[error("Multiple hostnames requested: {0}")]
    MultipleHostnames(String),

    /// The observed client address is not an IP literal
    #[error("Invalid client IP '{0}'")]
    UnparsableAddress(String),

    /// The client-declared `myip` is not an IP literal
    #[error("Invalid claimed IP '{0}'")]
    InvalidClaimedAddress(String),

    /// No configuration entry exists for the domain
    #[error("Domain '{0}' is not configured")]
    UnknownDomain(String),

    /// The domain exists but the credential was rejected
    #[error("Bad credential for domain '{domain}': {fault}")]
    BadCredential {
        /// Domain the credential was presented for
        domain: String,
        /// What was wrong with it
        fault: CredentialFault,
    },

    /// Fewer than two labels in a domain name
    #[error("'{0}' is not a valid domain name")]
    InvalidDomainName(String),

    /// A record type other than A/AAAA was requested
    #[error("Record type '{0}' is not an address record type")]
    InvalidRecordType(String),

    /// The provider returned zero records for the root domain
    #[error("No records found for domain '{0}'")]
    NoRecordsFound(String),

    /// The root domain has records, but none with this name and type
    #[error("No {record_type} records named '{name}' found for domain '{domain}'")]
    NoMatchingRecord {
        /// Root domain that was listed
        domain: String,
        /// Record name that was searched for
        name: String,
        /// Record type that was searched for
        record_type: String,
    },

    /// The provider answered with an HTTP error status
    #[error("Provider API error: HTTP {status}: ({id}) {message}")]
    Api {
        /// HTTP status code of the provider response
        status: u16,
        /// Provider error identifier
        id: String,
        /// Provider error message
        message: String,
    },

    /// Transport or decoding failure talking to the provider
    #[error("HTTP error: {0}")]
    Http(String),

    /// Configuration errors
    #[error("Configuration error: {0}")]
    Config(String),

    /// Several independent updates failed
    #[error("{} updates failed: {}", .0.len(), join_errors(.0))]
    Multiple(Vec<Error>),
}

fn join_errors(errors: &[Error]) -> String {
    errors
        .iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join("; ")
}

impl Error {
    /// Create a malformed body error
    pub fn malformed_body(msg: impl Into<String>) -> Self {
        Self::MalformedBody(msg.into())
    }

    /// Create an invalid parameters error
    pub fn invalid_parameters(msg: impl Into<String>) -> Self {
        Self::InvalidParameters(msg.into())
    }

    /// Create a bad credential error
    pub fn bad_credential(domain: impl Into<String>, fault: CredentialFault) -> Self {
        Self::BadCredential {
            domain: domain.into(),
            fault,
        }
    }

    /// Create a "no matching record" error
    pub fn no_matching_record(
        domain: impl Into<String>,
        name: impl Into<String>,
        record_type: impl Into<String>,
    ) -> Self {
        Self::NoMatchingRecord {
            domain: domain.into(),
            name: name.into(),
            record_type: record_type.into(),
        }
    }

    /// Create a provider API error
    pub fn api(status: u16, id: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Api {
            status,
            id: id.into(),
            message: message.into(),
        }
    }

    /// Create an HTTP error
    pub fn http(msg: impl Into<String>) -> Self {
        Self::Http(msg.into())
    }

    /// Create a configuration error
    pub fn config(msg: impl Into<String>) -> Self {
        Self::Config(msg.into())
    }

    /// Collapse a list of failures into one error
    ///
    /// Returns `None` for an empty list and the error itself for a single one.
    pub fn collect(mut errors: Vec<Error>) -> Option<Self> {
        match errors.len() {
            0 => None,
            1 => errors.pop(),
            _ => Some(Self::Multiple(errors)),
        }
    }

    /// HTTP status code this error surfaces as
    pub fn status_code(&self) -> u16 {
        match self {
            Self::MalformedBody(_) => 422,
            Self::InvalidParameters(_)
            | Self::MultipleHostnames(_)
            | Self::UnparsableAddress(_)
            | Self::InvalidClaimedAddress(_)
            | Self::InvalidDomainName(_) => 400,
            Self::UnknownDomain(_) => 404,
            Self::BadCredential { .. } => 401,
            Self::InvalidRecordType(_)
            | Self::NoRecordsFound(_)
            | Self::NoMatchingRecord { .. }
            | Self::Api { .. }
            | Self::Http(_)
            | Self::Config(_)
            | Self::Multiple(_) => 500,
        }
    }

    /// Message that may be shown to the caller
    ///
    /// `None` means the caller only sees the standard status text.
    pub fn public_message(&self) -> Option<String> {
        match self {
            Self::InvalidParameters(_) => Some(
                "Invalid query parameters. (Note that backmx, mx, offline, and wildcard are unsupported.)"
                    .to_string(),
            ),
            Self::MultipleHostnames(_) => Some(
                "This server does not support updating multiple hostnames at once.".to_string(),
            ),
            Self::UnparsableAddress(_) => {
                Some("could not determine a valid client IP address".to_string())
            }
            Self::InvalidClaimedAddress(_) => {
                Some("myip must be a valid ipv4 or ipv6 address".to_string())
            }
            Self::UnknownDomain(domain) => Some(format!("domain '{}' is not configured", domain)),
            Self::BadCredential { domain, fault } => match fault {
                CredentialFault::SecretMismatch => {
                    Some(format!("incorrect secret for domain '{}'", domain))
                }
                CredentialFault::BasicAuthMismatch => Some(format!(
                    "incorrect authorization header for domain '{}' (must be of format 'domain:secret')",
                    domain
                )),
                CredentialFault::MissingBasicAuth | CredentialFault::UndecodableBasicAuth(_) => None,
            },
            Self::InvalidDomainName(domain) => {
                Some(format!("'{}' is not a valid domain name", domain))
            }
            _ => None,
        }
    }
}
