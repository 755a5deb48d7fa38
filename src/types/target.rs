//! Scan target validation.
//!
//! Every target handed to the scan tool passes through [`validate`] first.
//! Accepted forms:
//! - IPv4 and IPv6 literals ("192.168.1.1", "::1")
//! - CIDR networks ("192.168.1.0/24"), bounded in size
//! - Hostnames ("scanme.nmap.org")

use crate::error::ValidationError;
use ipnetwork::IpNetwork;
use serde::{Serialize, Serializer};
use std::fmt;
use std::net::IpAddr;
use std::str::FromStr;

/// Maximum accepted target length (the DNS name limit).
pub const MAX_TARGET_LEN: usize = 253;

/// Characters that carry meaning to a shell or to the scan tool's own
/// argument parser.
const FORBIDDEN_CHARS: &[char] = &[
    ';', '&', '|', '`', '$', '(', ')', '<', '>', '\\', '\'', '"', '*', '?', '!', '{', '}', '[',
    ']', '~', '#', '%', ',', '=', '@', '^',
];

/// What kind of target was accepted.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum TargetKind {
    Ip,
    Cidr,
    Hostname,
}

impl fmt::Display for TargetKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Ip => write!(f, "ip"),
            Self::Cidr => write!(f, "cidr"),
            Self::Hostname => write!(f, "hostname"),
        }
    }
}

/// A target that is safe to pass to the scan tool as a single argument.
///
/// Only constructible through [`validate`].
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ValidatedTarget {
    value: String,
    kind: TargetKind,
}

impl ValidatedTarget {
    pub fn as_str(&self) -> &str {
        &self.value
    }

    pub fn kind(&self) -> TargetKind {
        self.kind
    }

}

impl AsRef<str> for ValidatedTarget {
    fn as_ref(&self) -> &str {
        &self.value
    }
}

impl fmt::Display for ValidatedTarget {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.value)
    }
}

impl Serialize for ValidatedTarget {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.value)
    }
}

impl FromStr for ValidatedTarget {
    type Err = ValidationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        validate(s)
    }
}

/// Maximum number of addresses a CIDR target may cover (a /16 for IPv4).
pub const MAX_CIDR_HOSTS: u128 = 65536;

/// Validate a raw target string.
///
/// Pure: no DNS lookups, no side effects.
pub fn validate(raw: &str) -> Result<ValidatedTarget, ValidationError> {
    let s = raw.trim();

    if s.is_empty() {
        return Err(ValidationError::new("target must not be empty"));
    }
    if s.len() > MAX_TARGET_LEN {
        return Err(ValidationError::new(format!(
            "target is too long ({} characters, max {})",
            s.len(),
            MAX_TARGET_LEN
        )));
    }
    if s.starts_with('-') {
        return Err(ValidationError::new("target must not start with '-'"));
    }
    if let Some(c) = s
        .chars()
        .find(|c| c.is_whitespace() || c.is_control() || FORBIDDEN_CHARS.contains(c))
    {
        return Err(ValidationError::new(format!(
            "target contains forbidden character {:?}",
            c
        )));
    }

    if s.parse::<IpAddr>().is_ok() {
        return Ok(accept(s, TargetKind::Ip));
    }

    if s.contains('/') {
        let network: IpNetwork = s
            .parse()
            .map_err(|_| ValidationError::new(format!("invalid CIDR notation: {}", s)))?;
        let hosts = host_count(&network);
        if hosts > MAX_CIDR_HOSTS {
            return Err(ValidationError::new(format!(
                "CIDR range too large: {} addresses (max: {})",
                hosts, MAX_CIDR_HOSTS
            )));
        }
        return Ok(accept(s, TargetKind::Cidr));
    }

    if is_valid_hostname(s) {
        return Ok(accept(s, TargetKind::Hostname));
    }

    Err(ValidationError::new(format!(
        "'{}' is not a valid hostname or IP address",
        s
    )))
}

fn accept(s: &str, kind: TargetKind) -> ValidatedTarget {
    ValidatedTarget {
        value: s.to_string(),
        kind,
    }
}

fn host_count(network: &IpNetwork) -> u128 {
    match network {
        IpNetwork::V4(net) => net.size() as u128,
        IpNetwork::V6(net) => {
            let prefix = net.prefix() as u32;
            if prefix == 0 {
                u128::MAX
            } else {
                1u128 << (128 - prefix)
            }
        }
    }
}

/// Check RFC 1123 hostname syntax (ASCII only, optional trailing dot).
///
/// The last label may not be all digits, so malformed dotted quads such as
/// "999.999.999.999" are not mistaken for names.
fn is_valid_hostname(s: &str) -> bool {
    let s = s.strip_suffix('.').unwrap_or(s);
    if s.is_empty() {
        return false;
    }

    let last = s.rsplit('.').next().unwrap_or(s);
    if last.bytes().all(|b| b.is_ascii_digit()) {
        return false;
    }

    s.split('.').all(|label| {
        let bytes = label.as_bytes();
        !bytes.is_empty()
            && bytes.len() <= 63
            && bytes[0].is_ascii_alphanumeric()
            && bytes[bytes.len() - 1].is_ascii_alphanumeric()
            && bytes.iter().all(|b| b.is_ascii_alphanumeric() || *b == b'-')
    })
}
