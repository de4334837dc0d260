//! Request types for the two update endpoints

use serde::{Deserialize, Serialize};
use std::net::IpAddr;

use crate::error::{Error, Result};

/// Maximum number of body bytes read from a direct update request
pub const MAX_BODY_BYTES: usize = 1_000_000;

/// Body of a direct update request
///
/// Missing fields decode as empty strings and fail authentication later.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct DomainUpdateRequest {
    /// Domain to update
    pub domain: String,
    /// Shared secret for the domain
    pub secret: String,
}

impl DomainUpdateRequest {
    /// Decode a request body
    ///
    /// Only the first [`MAX_BODY_BYTES`] bytes are considered, so an oversized
    /// body fails to decode rather than being read in full.
    pub fn from_body(body: &[u8]) -> Result<Self> {
        let body = &body[..body.len().min(MAX_BODY_BYTES)];
        serde_json::from_slice(body).map_err(|e| Error::malformed_body(e.to_string()))
    }
}

/// Query parameters of a DynDNS-style update request
///
/// See <https://help.dyn.com/remote-access-api/perform-update/>. Unknown
/// parameters fail to decode.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct DynDnsUpdateRequest {
    /// Hostname to update (only one is supported)
    #[serde(default, rename = "hostname")]
    pub hostnames: String,

    /// Address the client asks for
    #[serde(default)]
    pub myip: Option<String>,

    /// Accepted and ignored
    #[serde(default)]
    pub system: Option<String>,

    /// Accepted and ignored
    #[serde(default)]
    pub url: Option<String>,

    /// Unsupported: must be empty
    #[serde(default)]
    pub wildcard: Option<String>,

    /// Unsupported: must be empty
    #[serde(default)]
    pub mx: Option<String>,

    /// Unsupported: must be empty
    #[serde(default)]
    pub backmx: Option<String>,

    /// Unsupported: must be empty
    #[serde(default)]
    pub offline: Option<String>,
}

impl DynDnsUpdateRequest {
    /// Reject unsupported features and batch updates
    pub fn validate(&self) -> Result<()> {
        let unsupported = [
            ("wildcard", &self.wildcard),
            ("mx", &self.mx),
            ("backmx", &self.backmx),
            ("offline", &self.offline),
        ];
        for (name, value) in unsupported {
            if value.as_deref().is_some_and(|v| !v.is_empty()) {
                return Err(Error::invalid_parameters(format!(
                    "unsupported parameter '{}' is set",
                    name
                )));
            }
        }

        if self.hostnames.contains(',') {
            return Err(Error::MultipleHostnames(self.hostnames.clone()));
        }

        Ok(())
    }
}

/// Where a request came from, as seen by the HTTP layer
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RequestOrigin {
    /// Transport-level peer address
    pub peer: IpAddr,
    /// Value of the `X-Forwarded-For` header, if present
    pub forwarded_for: Option<String>,
}

impl RequestOrigin {
    /// Origin without a proxy header
    pub fn new(peer: IpAddr) -> Self {
        Self {
            peer,
            forwarded_for: None,
        }
    }

    /// Attach a forwarded-for header value
    pub fn with_forwarded_for(mut self, header: impl Into<String>) -> Self {
        self.forwarded_for = Some(header.into());
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_direct_body_decode() {
        let req = DomainUpdateRequest::from_body(br#"{"domain":"a.example.com","secret":"s"}"#)
            .unwrap();
        assert_eq!(req.domain, "a.example.com");
        assert_eq!(req.secret, "s");

        let err = DomainUpdateRequest::from_body(b"{\"domain\":").unwrap_err();
        assert_eq!(err.status_code(), 422);
    }

    #[test]
    fn test_direct_body_missing_fields_are_empty() {
        let req = DomainUpdateRequest::from_body(br#"{"domain":"home.example.com"}"#).unwrap();
        assert_eq!(req.domain, "home.example.com");
        assert_eq!(req.secret, "");

        let req = DomainUpdateRequest::from_body(b"{}").unwrap();
        assert_eq!(req, DomainUpdateRequest::default());

        // Not an object at all
        let err = DomainUpdateRequest::from_body(br#""home.example.com""#).unwrap_err();
        assert_eq!(err.status_code(), 422);
    }

    #[test]
    fn test_oversized_body_is_truncated() {
        let mut body = br#"{"domain":"a.example.com","secret":""#.to_vec();
        body.extend(std::iter::repeat_n(b'x', MAX_BODY_BYTES));
        body.extend(br#""}"#);

        assert!(matches!(
            DomainUpdateRequest::from_body(&body),
            Err(Error::MalformedBody(_))
        ));
    }

    #[test]
    fn test_dyndns_unsupported_params() {
        let req = DynDnsUpdateRequest {
            hostnames: "a.example.com".into(),
            wildcard: Some("yes".into()),
            ..Default::default()
        };
        assert!(matches!(req.validate(), Err(Error::InvalidParameters(_))));

        let req = DynDnsUpdateRequest {
            hostnames: "a.example.com".into(),
            mx: Some(String::new()),
            system: Some("dyndns".into()),
            ..Default::default()
        };
        assert!(req.validate().is_ok());
    }

    #[test]
    fn test_dyndns_multiple_hostnames() {
        let req = DynDnsUpdateRequest {
            hostnames: "a.com,b.com".into(),
            ..Default::default()
        };
        let err = req.validate().unwrap_err();
        assert!(matches!(err, Error::MultipleHostnames(_)));
        assert_eq!(err.status_code(), 400);
    }

    #[test]
    fn test_dyndns_unknown_field_rejected() {
        let json = serde_json::json!({ "hostname": "a.example.com", "bogus": "1" });
        assert!(serde_json::from_value::<DynDnsUpdateRequest>(json).is_err());

        let json = serde_json::json!({ "hostname": "a.example.com", "myip": "1.2.3.4" });
        let req: DynDnsUpdateRequest = serde_json::from_value(json).unwrap();
        assert_eq!(req.myip.as_deref(), Some("1.2.3.4"));
    }
}
