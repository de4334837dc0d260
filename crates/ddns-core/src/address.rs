// # Client Address Resolution
//
// Works out which address a request came from, and which A/AAAA values a
// DynDNS-style request should write.
//
// ## Dual-stack disambiguation
//
// A dual-stack router can only reach us over one family per request, but it
// may declare its other address in `myip`. When the domain allows client IP
// choice, the observed and the declared address are combined:
//
// | myip vs observed        | A value         | AAAA value      |
// |-------------------------|-----------------|-----------------|
// | equal, or not permitted | observed if v4  | observed if v6  |
// | differ, other family    | whichever is v4 | whichever is v6 |
// | differ, same family     | myip if v4      | myip if v6      |

use std::net::IpAddr;

use crate::config::RecordType;
use crate::error::{Error, Result};

/// IP address family
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum IpFamily {
    V4,
    V6,
}

impl IpFamily {
    /// Address record type that holds this family
    pub fn record_type(self) -> RecordType {
        match self {
            IpFamily::V4 => RecordType::A,
            IpFamily::V6 => RecordType::Aaaa,
        }
    }
}

/// A parsed client address
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClientIp {
    /// Parsed address, IPv4-mapped IPv6 folded to IPv4
    pub addr: IpAddr,
    /// Family of `addr`
    pub family: IpFamily,
}

impl ClientIp {
    /// Parse an IP literal
    ///
    /// Returns `None` if `s` is not a valid IPv4 or IPv6 address.
    pub fn parse(s: &str) -> Option<Self> {
        let addr = s.parse::<IpAddr>().ok()?;
        Some(Self::from_addr(addr))
    }

    /// Wrap an already-parsed address
    pub fn from_addr(addr: IpAddr) -> Self {
        let addr = addr.to_canonical();
        let family = match addr {
            IpAddr::V4(_) => IpFamily::V4,
            IpAddr::V6(_) => IpFamily::V6,
        };
        Self { addr, family }
    }

    /// Textual form written to DNS records
    pub fn value(&self) -> String {
        self.addr.to_string()
    }
}

/// Determine the observed client address
///
/// A non-empty forwarded-for header wins over the transport peer address;
/// its first comma-separated entry is used.
pub fn resolve_observed(peer: IpAddr, forwarded_for: Option<&str>) -> Result<ClientIp> {
    match forwarded_for.filter(|h| !h.is_empty()) {
        Some(header) => {
            let first = header.split(',').next().unwrap_or_default().trim();
            ClientIp::parse(first).ok_or_else(|| Error::UnparsableAddress(first.to_string()))
        }
        None => Ok(ClientIp::from_addr(peer)),
    }
}

/// The A/AAAA values a request should write; `None` means leave alone
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AddressTargets {
    /// IPv4 value for the A record
    pub a: Option<String>,
    /// IPv6 value for the AAAA record
    pub aaaa: Option<String>,
}

impl AddressTargets {
    /// Targets for a single address
    pub fn single(ip: &ClientIp) -> Self {
        let mut targets = Self::default();
        targets.put(ip);
        targets
    }

    fn put(&mut self, ip: &ClientIp) {
        match ip.family {
            IpFamily::V4 => self.a = Some(ip.value()),
            IpFamily::V6 => self.aaaa = Some(ip.value()),
        }
    }

    /// Non-empty targets as (record type, value) pairs, A first
    pub fn iter(&self) -> impl Iterator<Item = (RecordType, &str)> {
        [
            (RecordType::A, self.a.as_deref()),
            (RecordType::Aaaa, self.aaaa.as_deref()),
        ]
        .into_iter()
        .filter_map(|(record_type, value)| value.map(|v| (record_type, v)))
    }
}

/// Reconcile the observed address with a client-declared one
///
/// `claimed` is only considered when `allow_choice` is set; it must then be
/// a valid IP literal unless it equals the observed address.
pub fn disambiguate(
    observed: &ClientIp,
    claimed: Option<&str>,
    allow_choice: bool,
) -> Result<AddressTargets> {
    if !allow_choice {
        return Ok(AddressTargets::single(observed));
    }

    let raw = claimed.unwrap_or_default();
    let claimed =
        ClientIp::parse(raw).ok_or_else(|| Error::InvalidClaimedAddress(raw.to_string()))?;

    if claimed.addr == observed.addr {
        return Ok(AddressTargets::single(observed));
    }

    if claimed.family == observed.family {
        return Ok(AddressTargets::single(&claimed));
    }

    let mut targets = AddressTargets::single(&claimed);
    targets.put(observed);
    Ok(targets)
}
