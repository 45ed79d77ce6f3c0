//! Network module: address enumeration, probes and link-layer lookups

pub mod arp;
pub mod cidr;
pub mod host_probe;
pub mod icmp;
pub mod port_probe;
pub mod vendor;

use serde::{Deserialize, Serialize};

pub use cidr::{enumerate_hosts, CidrBlock};
pub use host_probe::{HostProbeKind, HostProber, IcmpProber, PingProber, TcpPingProber};
pub use port_probe::{PortProber, TcpConnectProber};

/// Transport protocol enumeration
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Protocol {
    Tcp,
    Udp,
}

impl Protocol {
    pub fn as_str(&self) -> &'static str {
        match self {
            Protocol::Tcp => "tcp",
            Protocol::Udp => "udp",
        }
    }
}

impl std::fmt::Display for Protocol {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Protocol::Tcp => write!(f, "TCP"),
            Protocol::Udp => write!(f, "UDP"),
        }
    }
}

impl std::str::FromStr for Protocol {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "tcp" => Ok(Protocol::Tcp),
            "udp" => Ok(Protocol::Udp),
            other => Err(format!("Unknown protocol: {}", other)),
        }
    }
}

/// Result of a single probe
///
/// `Unreachable` is a normal negative answer, not an error.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProbeOutcome<T> {
    Reachable(T),
    Unreachable,
}

impl<T> ProbeOutcome<T> {
    pub fn is_reachable(&self) -> bool {
        matches!(self, ProbeOutcome::Reachable(_))
    }

    pub fn into_option(self) -> Option<T> {
        match self {
            ProbeOutcome::Reachable(target) => Some(target),
            ProbeOutcome::Unreachable => None,
        }
    }
}

impl<T> From<Option<T>> for ProbeOutcome<T> {
    fn from(value: Option<T>) -> Self {
        match value {
            Some(target) => ProbeOutcome::Reachable(target),
            None => ProbeOutcome::Unreachable,
        }
    }
}
