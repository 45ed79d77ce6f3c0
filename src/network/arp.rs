//! Link-layer address lookup from the operating system's neighbour cache
//!
//! Hosts answered a probe moments before enrichment runs, so the kernel's ARP
//! cache normally holds their entries already; nothing is sent on the wire.

use once_cell::sync::Lazy;
use pnet::util::MacAddr;
use regex::Regex;
use std::collections::HashMap;
use std::net::Ipv4Addr;

/// Maps an IPv4 address to its link-layer address
pub trait LinkLayerResolver: Send + Sync {
    fn resolve(&self, ip: Ipv4Addr) -> Option<MacAddr>;
}

/// `? (192.168.1.1) at 0:1b:2c:3d:4e:5f on en0` (BSD) and
/// `  192.168.1.1   00-1b-2c-3d-4e-5f   dynamic` (Windows)
static ARP_LINE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"\(?(\d{1,3}(?:\.\d{1,3}){3})\)?\s+(?:at\s+)?([0-9A-Fa-f]{1,2}(?:[:-][0-9A-Fa-f]{1,2}){5})")
        .unwrap()
});

/// Snapshot of the neighbour cache
#[derive(Debug, Clone, Default)]
pub struct ArpTable {
    entries: HashMap<Ipv4Addr, MacAddr>,
}

impl ArpTable {
    /// Read the current neighbour cache. Unreadable caches give an empty table.
    pub fn load() -> Self {
        let entries = match Self::read_system_table() {
            Ok(entries) => entries,
            Err(e) => {
                log::debug!("ARP table unavailable: {}", e);
                HashMap::new()
            }
        };
        log::debug!("Loaded {} ARP entries", entries.len());
        Self { entries }
    }

    pub fn from_entries(entries: impl IntoIterator<Item = (Ipv4Addr, MacAddr)>) -> Self {
        Self {
            entries: entries
                .into_iter()
                .filter(|(_, mac)| !is_incomplete(mac))
                .collect(),
        }
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    #[cfg(target_os = "linux")]
    fn read_system_table() -> std::io::Result<HashMap<Ipv4Addr, MacAddr>> {
        let content = std::fs::read_to_string("/proc/net/arp")?;
        Ok(parse_proc_net_arp(&content))
    }

    #[cfg(not(target_os = "linux"))]
    fn read_system_table() -> std::io::Result<HashMap<Ipv4Addr, MacAddr>> {
        #[cfg(windows)]
        let output = std::process::Command::new("arp").arg("-a").output()?;
        #[cfg(not(windows))]
        let output = std::process::Command::new("arp").arg("-an").output()?;

        Ok(parse_arp_output(&String::from_utf8_lossy(&output.stdout)))
    }
}

impl LinkLayerResolver for ArpTable {
    fn resolve(&self, ip: Ipv4Addr) -> Option<MacAddr> {
        self.entries.get(&ip).copied()
    }
}

fn is_incomplete(mac: &MacAddr) -> bool {
    *mac == MacAddr::zero()
}

/// Parse `aa:bb:cc:dd:ee:ff` or `aa-bb-cc-dd-ee-ff`; octets may drop a leading zero
pub fn parse_mac(text: &str) -> Option<MacAddr> {
    let octets: Vec<u8> = text
        .split(|c| c == ':' || c == '-')
        .map(|part| u8::from_str_radix(part, 16).ok())
        .collect::<Option<Vec<u8>>>()?;

    match octets.as_slice() {
        [a, b, c, d, e, f] => Some(MacAddr::new(*a, *b, *c, *d, *e, *f)),
        _ => None,
    }
}

/// Parse the Linux `/proc/net/arp` format.
///
/// ```text
/// IP address       HW type     Flags       HW address            Mask     Device
/// 192.168.1.1      0x1         0x2         aa:bb:cc:dd:ee:ff     *        eth0
/// ```
pub fn parse_proc_net_arp(content: &str) -> HashMap<Ipv4Addr, MacAddr> {
    content
        .lines()
        .skip(1)
        .filter_map(|line| {
            let fields: Vec<&str> = line.split_whitespace().collect();
            let ip = fields.first()?.parse::<Ipv4Addr>().ok()?;
            let mac = parse_mac(fields.get(3)?)?;
            (!is_incomplete(&mac)).then_some((ip, mac))
        })
        .collect()
}

/// Parse `arp -an` (BSD/macOS) or `arp -a` (Windows) output
pub fn parse_arp_output(content: &str) -> HashMap<Ipv4Addr, MacAddr> {
    content
        .lines()
        .filter_map(|line| {
            let caps = ARP_LINE.captures(line)?;
            let ip = caps.get(1)?.as_str().parse::<Ipv4Addr>().ok()?;
            let mac = parse_mac(caps.get(2)?.as_str())?;
            (!is_incomplete(&mac)).then_some((ip, mac))
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    const PROC_NET_ARP: &str = "\
IP address       HW type     Flags       HW address            Mask     Device
192.168.1.1      0x1         0x2         aa:bb:cc:dd:ee:ff     *        eth0
192.168.1.20     0x1         0x0         00:00:00:00:00:00     *        eth0
192.168.1.7      0x1         0x2         00:1b:21:0a:0b:0c     *        eth0
";

    #[test]
    fn test_proc_net_arp() {
        let entries = parse_proc_net_arp(PROC_NET_ARP);
        assert_eq!(entries.len(), 2);
        assert_eq!(
            entries.get(&Ipv4Addr::new(192, 168, 1, 1)),
            Some(&MacAddr::new(0xaa, 0xbb, 0xcc, 0xdd, 0xee, 0xff))
        );
        // incomplete entry
        assert!(!entries.contains_key(&Ipv4Addr::new(192, 168, 1, 20)));
    }

    #[test]
    fn test_bsd_arp_output() {
        let output = "\
? (10.0.0.1) at 0:1b:2c:3d:4e:5f on en0 ifscope [ethernet]
? (10.0.0.9) at (incomplete) on en0 ifscope [ethernet]
";
        let entries = parse_arp_output(output);
        assert_eq!(entries.len(), 1);
        assert_eq!(
            entries.get(&Ipv4Addr::new(10, 0, 0, 1)),
            Some(&MacAddr::new(0x00, 0x1b, 0x2c, 0x3d, 0x4e, 0x5f))
        );
    }

    #[test]
    fn test_windows_arp_output() {
        let output = "\
Interface: 192.168.0.10 --- 0x4
  Internet Address      Physical Address      Type
  192.168.0.1           c8-3a-35-01-02-03     dynamic
  192.168.0.255         ff-ff-ff-ff-ff-ff     static
";
        let table = ArpTable::from_entries(parse_arp_output(output));
        assert_eq!(
            table.resolve(Ipv4Addr::new(192, 168, 0, 1)),
            Some(MacAddr::new(0xc8, 0x3a, 0x35, 0x01, 0x02, 0x03))
        );
        assert_eq!(table.resolve(Ipv4Addr::new(192, 168, 0, 10)), None);
    }

    #[test]
    fn test_parse_mac() {
        assert_eq!(parse_mac("a:b:c:d:e:f"), Some(MacAddr::new(10, 11, 12, 13, 14, 15)));
        assert_eq!(parse_mac("aa:bb:cc"), None);
        assert_eq!(parse_mac("zz:bb:cc:dd:ee:ff"), None);
    }

    #[test]
    fn test_from_entries_drops_zero_mac() {
        let table = ArpTable::from_entries(vec![
            (Ipv4Addr::new(10, 0, 0, 1), MacAddr::zero()),
            (Ipv4Addr::new(10, 0, 0, 2), MacAddr::new(1, 2, 3, 4, 5, 6)),
        ]);
        assert_eq!(table.len(), 1);
        assert_eq!(table.resolve(Ipv4Addr::new(10, 0, 0, 1)), None);
    }
}
