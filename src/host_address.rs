use std::fmt;
use std::net::Ipv4Addr;
use std::str::FromStr;
use thiserror::Error;

/// A single-host IPv4 source address; every grant is an implicit /32.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct HostAddress(Ipv4Addr);

#[derive(Debug, Error)]
#[error("'{input}' is not a valid IPv4 host address")]
pub struct InvalidAddress {
    pub input: String,
}

impl HostAddress {
    /// Validates a textual address. Accepts strict dotted-decimal IPv4 only:
    /// four octets 0-255, no leading zeros, no CIDR suffix, no IPv6.
    pub fn validate(raw: &str) -> Result<Self, InvalidAddress> {
        Ipv4Addr::from_str(raw).map(Self).map_err(|_| InvalidAddress {
            input: raw.to_string(),
        })
    }

    /// The provider's CIDR rendering of this host.
    pub fn to_cidr(self) -> String {
        format!("{}/32", self.0)
    }

    /// Reverses [`to_cidr`](Self::to_cidr). Ranges wider than a single host
    /// are not representable and yield `None`.
    pub fn from_cidr(cidr: &str) -> Option<Self> {
        let host = cidr.strip_suffix("/32")?;
        Ipv4Addr::from_str(host).ok().map(Self)
    }
}

impl From<Ipv4Addr> for HostAddress {
    fn from(addr: Ipv4Addr) -> Self {
        Self(addr)
    }
}

impl fmt::Display for HostAddress {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        self.0.fmt(f)
    }
}
