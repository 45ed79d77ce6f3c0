//! CIDR block parsing and host enumeration

use crate::ScanError;
use ipnetwork::Ipv4Network;
use std::net::Ipv4Addr;
use std::str::FromStr;

/// An IPv4 block written as `a.b.c.d/n`
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CidrBlock {
    network: Ipv4Network,
}

impl CidrBlock {
    /// Parse `a.b.c.d/n`.
    ///
    /// The prefix length is mandatory: a bare address is rejected rather than
    /// being read as a `/32`.
    pub fn parse(cidr: &str) -> crate::Result<Self> {
        let cidr = cidr.trim();
        let (addr, prefix) = cidr.split_once('/').ok_or_else(|| {
            ScanError::InvalidRange(format!("{}: missing prefix length (expected a.b.c.d/n)", cidr))
        })?;

        let addr = Ipv4Addr::from_str(addr)
            .map_err(|e| ScanError::InvalidRange(format!("{}: {}", cidr, e)))?;
        let prefix: u8 = prefix
            .parse()
            .map_err(|_| ScanError::InvalidRange(format!("{}: invalid prefix length", cidr)))?;

        let network = Ipv4Network::new(addr, prefix)
            .map_err(|e| ScanError::InvalidRange(format!("{}: {}", cidr, e)))?;

        Ok(Self { network })
    }

    pub fn prefix(&self) -> u8 {
        self.network.prefix()
    }

    /// First address of the block
    pub fn network_address(&self) -> Ipv4Addr {
        self.network.network()
    }

    /// Last address of the block
    pub fn broadcast_address(&self) -> Ipv4Addr {
        self.network.broadcast()
    }

    /// Number of usable host addresses (network and broadcast excluded)
    pub fn host_count(&self) -> u64 {
        let total = 1u64 << (32 - u32::from(self.prefix()));
        total.saturating_sub(2)
    }

    /// Usable host addresses in ascending order.
    ///
    /// Empty for `/31` and `/32`.
    pub fn hosts(&self) -> impl Iterator<Item = Ipv4Addr> {
        let first = u32::from(self.network_address());
        let last = u32::from(self.broadcast_address());
        let range = if last - first >= 2 {
            (first + 1)..last
        } else {
            first..first
        };
        range.map(Ipv4Addr::from)
    }
}

impl FromStr for CidrBlock {
    type Err = ScanError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

impl std::fmt::Display for CidrBlock {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}/{}", self.network_address(), self.prefix())
    }
}

/// Expand a CIDR string into its usable host addresses
pub fn enumerate_hosts(cidr: &str) -> crate::Result<Vec<Ipv4Addr>> {
    Ok(CidrBlock::parse(cidr)?.hosts().collect())
}
