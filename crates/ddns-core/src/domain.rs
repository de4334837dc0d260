//! Splitting fully-qualified names into provider zone + record name

use crate::error::{Error, Result};

/// Record name used for the zone apex
pub const APEX_RECORD_NAME: &str = "@";

/// Where a fully-qualified domain lives at the provider
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RecordLocation {
    /// Last two labels (e.g., "example.com")
    pub root_domain: String,
    /// Remaining leading labels, or "@" for the apex
    pub record_name: String,
}

impl RecordLocation {
    /// Split a fully-qualified domain name
    ///
    /// `a.b.example.com` splits into root `example.com` and name `a.b`;
    /// `example.com` into root `example.com` and name `@`.
    pub fn split(domain: &str) -> Result<Self> {
        let labels: Vec<&str> = domain.split('.').collect();
        if labels.len() < 2 {
            return Err(Error::InvalidDomainName(domain.to_string()));
        }

        let (leading, root) = labels.split_at(labels.len() - 2);
        let record_name = if leading.is_empty() {
            APEX_RECORD_NAME.to_string()
        } else {
            leading.join(".")
        };

        Ok(Self {
            root_domain: root.join("."),
            record_name,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_subdomain() {
        let loc = RecordLocation::split("www.example.com").unwrap();
        assert_eq!(loc.root_domain, "example.com");
        assert_eq!(loc.record_name, "www");
    }

    #[test]
    fn test_nested_subdomain() {
        let loc = RecordLocation::split("sub.sub2.example.com").unwrap();
        assert_eq!(loc.root_domain, "example.com");
        assert_eq!(loc.record_name, "sub.sub2");
    }

    #[test]
    fn test_apex() {
        let loc = RecordLocation::split("example.com").unwrap();
        assert_eq!(loc.root_domain, "example.com");
        assert_eq!(loc.record_name, "@");
    }

    #[test]
    fn test_single_label() {
        assert!(matches!(
            RecordLocation::split("a"),
            Err(Error::InvalidDomainName(d)) if d == "a"
        ));
    }
}
