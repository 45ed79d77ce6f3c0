//! Port reference data: service names for open ports
//!
//! The registry reads the IANA `service-names-port-numbers.csv` export. When no
//! file is available a small built-in table of common services is used.

use crate::network::Protocol;
use crate::ScanError;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fs::File;
use std::io::Read;
use std::path::{Path, PathBuf};

/// File name looked up next to the executable when no path is configured
pub const SERVICES_CSV_NAME: &str = "service-names-port-numbers.csv";

/// Name and description of a registered service
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ServiceInfo {
    pub name: String,
    pub description: String,
}

/// Looks up which service a port is registered to
pub trait ServiceLookup: Send + Sync {
    fn find_service(&self, port: u16, protocol: Protocol) -> Option<ServiceInfo>;
}

/// One row of the IANA registry export
#[derive(Debug, Deserialize)]
struct ServiceRow {
    #[serde(rename = "Service Name", default)]
    name: String,
    #[serde(rename = "Port Number", default)]
    port: String,
    #[serde(rename = "Transport Protocol", default)]
    protocol: String,
    #[serde(rename = "Description", default)]
    description: String,
}

const BUILTIN_SERVICES: &[(u16, &str, &str)] = &[
    (20, "ftp-data", "File Transfer [Default Data]"),
    (21, "ftp", "File Transfer Protocol [Control]"),
    (22, "ssh", "The Secure Shell (SSH) Protocol"),
    (23, "telnet", "Telnet"),
    (25, "smtp", "Simple Mail Transfer"),
    (53, "domain", "Domain Name Server"),
    (67, "bootps", "Bootstrap Protocol Server"),
    (69, "tftp", "Trivial File Transfer"),
    (79, "finger", "Finger"),
    (80, "http", "World Wide Web HTTP"),
    (88, "kerberos", "Kerberos"),
    (110, "pop3", "Post Office Protocol - Version 3"),
    (111, "sunrpc", "SUN Remote Procedure Call"),
    (119, "nntp", "Network News Transfer Protocol"),
    (123, "ntp", "Network Time Protocol"),
    (135, "epmap", "DCE endpoint resolution"),
    (137, "netbios-ns", "NETBIOS Name Service"),
    (139, "netbios-ssn", "NETBIOS Session Service"),
    (143, "imap", "Internet Message Access Protocol"),
    (161, "snmp", "SNMP"),
    (179, "bgp", "Border Gateway Protocol"),
    (389, "ldap", "Lightweight Directory Access Protocol"),
    (443, "https", "http protocol over TLS/SSL"),
    (445, "microsoft-ds", "Microsoft-DS"),
    (465, "submissions", "Message Submission over TLS protocol"),
    (514, "shell", "cmd"),
    (515, "printer", "spooler"),
    (587, "submission", "Message Submission"),
    (631, "ipp", "IPP (Internet Printing Protocol)"),
    (636, "ldaps", "ldap protocol over TLS/SSL"),
    (873, "rsync", "rsync"),
    (993, "imaps", "IMAP over TLS protocol"),
    (995, "pop3s", "POP3 over TLS protocol"),
    (1433, "ms-sql-s", "Microsoft-SQL-Server"),
    (1521, "ncube-lm", "nCube License Manager"),
    (1723, "pptp", "pptp"),
    (2049, "nfs", "Network File System - Sun Microsystems"),
    (3306, "mysql", "MySQL"),
    (3389, "ms-wbt-server", "MS WBT Server"),
    (5432, "postgresql", "PostgreSQL Database"),
    (5900, "rfb", "Remote Framebuffer"),
    (6379, "redis", "An advanced key-value cache and store"),
    (8080, "http-alt", "HTTP Alternate (see port 80)"),
    (8443, "pcsync-https", "PCsync HTTPS"),
];

/// Port reference table, loaded once and then read-only
#[derive(Debug, Clone, Default)]
pub struct ServiceRegistry {
    services: HashMap<(u16, Protocol), ServiceInfo>,
}

impl ServiceRegistry {
    /// Common TCP services
    pub fn builtin() -> Self {
        let services = BUILTIN_SERVICES
            .iter()
            .map(|&(port, name, description)| {
                (
                    (port, Protocol::Tcp),
                    ServiceInfo {
                        name: name.to_string(),
                        description: description.to_string(),
                    },
                )
            })
            .collect();
        Self { services }
    }

    /// Read an IANA-format CSV.
    ///
    /// Rows whose port is not a single number (ranges, blanks) are skipped; the
    /// first row for a given port and protocol wins.
    pub fn from_reader<R: Read>(reader: R) -> crate::Result<Self> {
        let mut reader = csv::ReaderBuilder::new().flexible(true).from_reader(reader);
        let mut services = HashMap::new();

        for row in reader.deserialize::<ServiceRow>() {
            let row = match row {
                Ok(row) => row,
                Err(e) => {
                    log::trace!("Skipping service row: {}", e);
                    continue;
                }
            };

            let Ok(port) = row.port.trim().parse::<u16>() else {
                continue;
            };
            let Ok(protocol) = row.protocol.parse::<Protocol>() else {
                continue;
            };

            services.entry((port, protocol)).or_insert(ServiceInfo {
                name: row.name,
                description: row.description,
            });
        }

        Ok(Self { services })
    }

    pub fn from_csv_path<P: AsRef<Path>>(path: P) -> crate::Result<Self> {
        let path = path.as_ref();
        let file = File::open(path).map_err(|e| {
            ScanError::ConfigError(format!("Failed to open {}: {}", path.display(), e))
        })?;
        Self::from_reader(file)
    }

    /// Load the configured CSV, else the one next to the executable, else the
    /// built-in table
    pub fn load(configured: Option<&Path>) -> Self {
        let candidate = configured.map(Path::to_path_buf).or_else(default_csv_path);

        if let Some(path) = candidate {
            if path.exists() {
                match Self::from_csv_path(&path) {
                    Ok(registry) => {
                        log::info!("Loaded {} services from {}", registry.len(), path.display());
                        return registry;
                    }
                    Err(e) => log::warn!("{}; using built-in services", e),
                }
            } else if configured.is_some() {
                log::warn!("{} not found; using built-in services", path.display());
            }
        }

        Self::builtin()
    }

    pub fn len(&self) -> usize {
        self.services.len()
    }

    pub fn is_empty(&self) -> bool {
        self.services.is_empty()
    }
}

impl ServiceLookup for ServiceRegistry {
    fn find_service(&self, port: u16, protocol: Protocol) -> Option<ServiceInfo> {
        self.services.get(&(port, protocol)).cloned()
    }
}

fn default_csv_path() -> Option<PathBuf> {
    let exe = std::env::current_exe().ok()?;
    Some(exe.parent()?.join(SERVICES_CSV_NAME))
}
