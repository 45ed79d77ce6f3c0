//! netool - host discovery, TCP port scanning and DNS lookups
//!
//! The core is a bounded worker pool ([`scanner::WorkerPool`]) that fans probe
//! jobs out to concurrent workers and collects the reachable results through a
//! single aggregator. [`Scanner`] wires it to CIDR enumeration, port
//! specifications and the host/port probes.

pub mod config;
pub mod dns;
pub mod error;
pub mod network;
pub mod output;
pub mod scanner;
pub mod services;
pub mod utils;

// Re-export commonly used types
pub use config::ScanConfig;
pub use dns::{Digger, DnsRecord, RecordKind};
pub use error::ScanError;
pub use network::{HostProbeKind, ProbeOutcome, Protocol};
pub use output::{OutputFormat, Report};
pub use scanner::{HostRecord, PortRecord, Scanner};

pub type Result<T> = std::result::Result<T, ScanError>;
