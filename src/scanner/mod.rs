//! Scan orchestration
//!
//! [`Scanner`] turns user input into a job set, runs it through the
//! [`WorkerPool`], sorts what comes back and enriches it with link-layer,
//! vendor and service information.

pub mod aggregator;
pub mod pool;

use crate::config::ScanConfig;
use crate::network::arp::{ArpTable, LinkLayerResolver};
use crate::network::vendor::{OuiVendorLookup, VendorLookup};
use crate::network::{CidrBlock, HostProber, PortProber, ProbeOutcome, Protocol, TcpConnectProber};
use crate::services::{ServiceLookup, ServiceRegistry};
use crate::utils::{parse_port_spec, validator};
use crate::ScanError;
use pnet::util::MacAddr;
use serde::{Serialize, Serializer};
use std::net::{IpAddr, Ipv4Addr};
use std::sync::Arc;
use std::time::Instant;

pub use aggregator::{sort_results, Aggregator};
pub use pool::{ScanPlan, WorkerPool};

/// A live host found by the network scan
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct HostRecord {
    pub ip: Ipv4Addr,
    #[serde(serialize_with = "serialize_mac")]
    pub mac: Option<MacAddr>,
    pub vendor: Option<String>,
}

impl HostRecord {
    pub fn new(ip: Ipv4Addr) -> Self {
        Self {
            ip,
            mac: None,
            vendor: None,
        }
    }
}

fn serialize_mac<S: Serializer>(mac: &Option<MacAddr>, serializer: S) -> Result<S::Ok, S::Error> {
    match mac {
        Some(mac) => serializer.serialize_some(&mac.to_string()),
        None => serializer.serialize_none(),
    }
}

/// An open port found by the port scan
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PortRecord {
    pub port: u16,
    pub protocol: Protocol,
    /// Empty when the port has no registered service
    pub service_name: String,
    pub description: String,
}

/// Runs network and port scans with injectable probes and lookups
pub struct Scanner {
    config: ScanConfig,
    pool: WorkerPool,
    host_prober: Arc<dyn HostProber>,
    port_prober: Arc<dyn PortProber>,
    // None: snapshot the system ARP cache after each sweep
    link_layer: Option<Arc<dyn LinkLayerResolver>>,
    vendors: Arc<dyn VendorLookup>,
    services: Arc<dyn ServiceLookup>,
}

impl Scanner {
    /// Build a scanner with the system probes and lookups
    pub fn new(config: ScanConfig) -> crate::Result<Self> {
        config.validate()?;

        Ok(Self {
            pool: WorkerPool::new(config.result_buffer),
            host_prober: config.host_probe.prober(),
            port_prober: Arc::new(TcpConnectProber::new()),
            link_layer: None,
            vendors: Arc::new(OuiVendorLookup::new()),
            services: Arc::new(ServiceRegistry::load(config.services_file.as_deref())),
            config,
        })
    }

    pub fn with_host_prober(mut self, prober: Arc<dyn HostProber>) -> Self {
        self.host_prober = prober;
        self
    }

    pub fn with_port_prober(mut self, prober: Arc<dyn PortProber>) -> Self {
        self.port_prober = prober;
        self
    }

    pub fn with_link_layer(mut self, resolver: Arc<dyn LinkLayerResolver>) -> Self {
        self.link_layer = Some(resolver);
        self
    }

    pub fn with_vendor_lookup(mut self, vendors: Arc<dyn VendorLookup>) -> Self {
        self.vendors = vendors;
        self
    }

    pub fn with_service_lookup(mut self, services: Arc<dyn ServiceLookup>) -> Self {
        self.services = services;
        self
    }

    pub fn config(&self) -> &ScanConfig {
        &self.config
    }

    /// Find live hosts in a CIDR block
    pub async fn scan_network(&self, cidr: &str) -> crate::Result<Vec<HostRecord>> {
        let block = CidrBlock::parse(cidr)?;

        if block.host_count() > self.config.max_hosts {
            return Err(ScanError::HostLimitExceeded(format!(
                "{} expands to {} hosts (max_hosts is {})",
                block,
                block.host_count(),
                self.config.max_hosts
            )));
        }

        let hosts: Vec<Ipv4Addr> = block.hosts().collect();
        if hosts.is_empty() {
            log::info!("{} has no usable host addresses", block);
            return Ok(Vec::new());
        }

        log::info!("Scanning net {} ({} hosts)", block, hosts.len());
        let start_time = Instant::now();

        let alive = self.sweep_hosts(hosts).await;
        let records = self.enrich_hosts(alive);

        log::info!(
            "Net scan of {} finished in {:?}: {} hosts up",
            block,
            start_time.elapsed(),
            records.len()
        );
        Ok(records)
    }

    /// Find open TCP ports on one host
    pub async fn scan_ports(&self, host: &str, port_spec: &str) -> crate::Result<Vec<PortRecord>> {
        let ports = parse_port_spec(port_spec)?;
        let ip = resolve_host(host).await?;

        if ports.is_empty() {
            return Ok(Vec::new());
        }

        log::info!("Scanning {} ({}) for {} ports", host, ip, ports.len());
        let start_time = Instant::now();

        let open = self.sweep_ports(ip, ports).await;
        let records: Vec<PortRecord> = open.into_iter().map(|port| self.describe_port(port)).collect();

        log::info!(
            "Port scan of {} finished in {:?}: {} open",
            host,
            start_time.elapsed(),
            records.len()
        );
        Ok(records)
    }

    /// Probe addresses and return the reachable ones in ascending order
    pub async fn sweep_hosts(&self, hosts: Vec<Ipv4Addr>) -> Vec<Ipv4Addr> {
        let plan = ScanPlan::new(hosts, self.config.concurrency, self.config.host_timeout());
        let prober = self.host_prober.clone();

        let mut alive = self
            .pool
            .run(plan, move |ip, timeout| {
                let prober = prober.clone();
                async move {
                    let outcome = prober.probe_host(ip, timeout).await;
                    if let ProbeOutcome::Reachable(ip) = &outcome {
                        log::info!("Found host: {}", ip);
                    }
                    outcome
                }
            })
            .await;

        sort_results(&mut alive);
        alive
    }

    /// Probe ports on `host` and return the open ones in ascending order
    pub async fn sweep_ports(&self, host: IpAddr, ports: Vec<u16>) -> Vec<u16> {
        let plan = ScanPlan::new(ports, self.config.concurrency, self.config.port_timeout());
        let prober = self.port_prober.clone();

        let mut open = self
            .pool
            .run(plan, move |port, timeout| {
                let prober = prober.clone();
                async move {
                    let outcome = prober.probe_port(host, port, timeout).await;
                    if let ProbeOutcome::Reachable(port) = &outcome {
                        log::info!("Found open port: {}", port);
                    }
                    outcome
                }
            })
            .await;

        sort_results(&mut open);
        open
    }

    fn enrich_hosts(&self, alive: Vec<Ipv4Addr>) -> Vec<HostRecord> {
        if alive.is_empty() {
            return Vec::new();
        }

        let link_layer: Arc<dyn LinkLayerResolver> = match &self.link_layer {
            Some(resolver) => resolver.clone(),
            None => Arc::new(ArpTable::load()),
        };

        alive
            .into_iter()
            .map(|ip| {
                let mac = link_layer.resolve(ip);
                let vendor = mac.and_then(|mac| self.vendors.vendor_for(mac));
                HostRecord { ip, mac, vendor }
            })
            .collect()
    }

    fn describe_port(&self, port: u16) -> PortRecord {
        let service = self.services.find_service(port, Protocol::Tcp);
        let (service_name, description) = match service {
            Some(info) => (info.name, info.description),
            None => (String::new(), String::new()),
        };

        PortRecord {
            port,
            protocol: Protocol::Tcp,
            service_name,
            description,
        }
    }
}

/// Resolve a host name or IP literal to the address to scan.
///
/// IPv4 results are preferred when a name has both families.
pub async fn resolve_host(host: &str) -> crate::Result<IpAddr> {
    let host = host.trim();
    if let Ok(ip) = host.parse::<IpAddr>() {
        return Ok(ip);
    }

    validator::validate_host(host)?;

    let addrs: Vec<IpAddr> = tokio::net::lookup_host((host, 0))
        .await
        .map_err(|e| ScanError::Resolution(format!("{}: {}", host, e)))?
        .map(|addr| addr.ip())
        .collect();

    addrs
        .iter()
        .find(|ip| ip.is_ipv4())
        .or_else(|| addrs.first())
        .copied()
        .ok_or_else(|| ScanError::Resolution(format!("{}: no addresses found", host)))
}
