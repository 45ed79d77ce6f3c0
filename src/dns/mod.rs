//! DNS record lookups for `dig` and the single-record commands

use crate::utils::validator;
use crate::ScanError;
use async_trait::async_trait;
use hickory_resolver::name_server::TokioConnectionProvider;
use hickory_resolver::proto::rr::{RData, RecordType};
use hickory_resolver::TokioResolver;
use serde::Serialize;
use std::net::IpAddr;
use std::sync::Arc;

/// A mail exchanger and its preference
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct MailExchanger {
    pub exchange: String,
    pub preference: u16,
}

impl std::fmt::Display for MailExchanger {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{} {}", self.exchange, self.preference)
    }
}

/// Record lookups needed by [`Digger`]
#[async_trait]
pub trait RecordResolver: Send + Sync {
    async fn lookup_host_addresses(&self, domain: &str) -> crate::Result<Vec<IpAddr>>;
    async fn lookup_name_servers(&self, domain: &str) -> crate::Result<Vec<String>>;
    /// Falls back to `domain` itself when there is no CNAME
    async fn lookup_canonical_name(&self, domain: &str) -> crate::Result<String>;
    async fn lookup_mail_exchangers(&self, domain: &str) -> crate::Result<Vec<MailExchanger>>;
}

/// Resolver using the operating system's DNS configuration
pub struct SystemResolver {
    resolver: TokioResolver,
}

impl SystemResolver {
    pub fn new() -> crate::Result<Self> {
        let resolver = TokioResolver::builder(TokioConnectionProvider::default())
            .map_err(|e| ScanError::Resolution(format!("Failed to create resolver: {}", e)))?
            .build();
        Ok(Self { resolver })
    }
}

fn resolution_error(domain: &str, kind: RecordKind, e: impl std::fmt::Display) -> ScanError {
    ScanError::Resolution(format!("{} lookup for {} failed: {}", kind, domain, e))
}

#[async_trait]
impl RecordResolver for SystemResolver {
    async fn lookup_host_addresses(&self, domain: &str) -> crate::Result<Vec<IpAddr>> {
        let response = self
            .resolver
            .lookup_ip(domain)
            .await
            .map_err(|e| resolution_error(domain, RecordKind::A, e))?;
        Ok(response.iter().collect())
    }

    async fn lookup_name_servers(&self, domain: &str) -> crate::Result<Vec<String>> {
        let response = self
            .resolver
            .ns_lookup(domain)
            .await
            .map_err(|e| resolution_error(domain, RecordKind::Ns, e))?;
        Ok(response.iter().map(|ns| ns.to_string()).collect())
    }

    async fn lookup_canonical_name(&self, domain: &str) -> crate::Result<String> {
        match self.resolver.lookup(domain, RecordType::CNAME).await {
            Ok(response) => {
                let cname = response.iter().find_map(|rdata| match rdata {
                    RData::CNAME(cname) => Some(cname.to_string()),
                    _ => None,
                });
                Ok(cname.unwrap_or_else(|| fully_qualified(domain)))
            }
            Err(e) => {
                // no CNAME record: the name is its own canonical name
                log::debug!("CNAME lookup for {}: {}", domain, e);
                Ok(fully_qualified(domain))
            }
        }
    }

    async fn lookup_mail_exchangers(&self, domain: &str) -> crate::Result<Vec<MailExchanger>> {
        let response = self
            .resolver
            .mx_lookup(domain)
            .await
            .map_err(|e| resolution_error(domain, RecordKind::Mx, e))?;
        Ok(response
            .iter()
            .map(|mx| MailExchanger {
                exchange: mx.exchange().to_string(),
                preference: mx.preference(),
            })
            .collect())
    }
}

fn fully_qualified(domain: &str) -> String {
    if domain.ends_with('.') {
        domain.to_string()
    } else {
        format!("{}.", domain)
    }
}

/// DNS record types reported by `dig`
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub enum RecordKind {
    A,
    #[serde(rename = "AAAA")]
    Aaaa,
    #[serde(rename = "CNAME")]
    Cname,
    #[serde(rename = "NS")]
    Ns,
    #[serde(rename = "MX")]
    Mx,
}

impl RecordKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            RecordKind::A => "A",
            RecordKind::Aaaa => "AAAA",
            RecordKind::Cname => "CNAME",
            RecordKind::Ns => "NS",
            RecordKind::Mx => "MX",
        }
    }
}

impl std::fmt::Display for RecordKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One row of `dig` output
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DnsRecord {
    pub domain: String,
    #[serde(rename = "type")]
    pub kind: RecordKind,
    pub value: String,
}

impl DnsRecord {
    fn new(domain: &str, kind: RecordKind, value: impl Into<String>) -> Self {
        Self {
            domain: domain.to_string(),
            kind,
            value: value.into(),
        }
    }
}

/// Collects the records of a domain
pub struct Digger {
    resolver: Arc<dyn RecordResolver>,
}

impl Digger {
    pub fn new(resolver: Arc<dyn RecordResolver>) -> Self {
        Self { resolver }
    }

    /// Digger backed by [`SystemResolver`]
    pub fn system() -> crate::Result<Self> {
        Ok(Self::new(Arc::new(SystemResolver::new()?)))
    }

    /// Address, CNAME, NS and MX records, in that order.
    ///
    /// A domain with no addresses is an error; the other record types are
    /// optional and a failed lookup just leaves them out.
    pub async fn dig(&self, domain: &str) -> crate::Result<Vec<DnsRecord>> {
        validator::validate_domain(domain)?;
        log::info!("Digging {}", domain);

        let (addrs, cname, name_servers, exchangers) = tokio::join!(
            self.resolver.lookup_host_addresses(domain),
            self.resolver.lookup_canonical_name(domain),
            self.resolver.lookup_name_servers(domain),
            self.resolver.lookup_mail_exchangers(domain),
        );

        let mut records = address_records(domain, addrs?);

        match cname {
            Ok(cname) => records.push(DnsRecord::new(domain, RecordKind::Cname, cname)),
            Err(e) => log::warn!("{}", e),
        }
        match name_servers {
            Ok(name_servers) => records.extend(
                name_servers
                    .into_iter()
                    .map(|ns| DnsRecord::new(domain, RecordKind::Ns, ns)),
            ),
            Err(e) => log::warn!("{}", e),
        }
        match exchangers {
            Ok(exchangers) => records.extend(
                exchangers
                    .into_iter()
                    .map(|mx| DnsRecord::new(domain, RecordKind::Mx, mx.to_string())),
            ),
            Err(e) => log::warn!("{}", e),
        }

        Ok(records)
    }

    /// Records of one type; lookup failures are returned
    pub async fn lookup(&self, domain: &str, kind: RecordKind) -> crate::Result<Vec<DnsRecord>> {
        match kind {
            RecordKind::A | RecordKind::Aaaa => {
                validator::validate_host(domain)?;
                let addrs = self.resolver.lookup_host_addresses(domain).await?;
                Ok(address_records(domain, addrs))
            }
            RecordKind::Cname => {
                validator::validate_host(domain)?;
                let cname = self.resolver.lookup_canonical_name(domain).await?;
                Ok(vec![DnsRecord::new(domain, RecordKind::Cname, cname)])
            }
            RecordKind::Ns => {
                validator::validate_domain(domain)?;
                let name_servers = self.resolver.lookup_name_servers(domain).await?;
                Ok(name_servers
                    .into_iter()
                    .map(|ns| DnsRecord::new(domain, RecordKind::Ns, ns))
                    .collect())
            }
            RecordKind::Mx => {
                validator::validate_domain(domain)?;
                let exchangers = self.resolver.lookup_mail_exchangers(domain).await?;
                Ok(exchangers
                    .into_iter()
                    .map(|mx| DnsRecord::new(domain, RecordKind::Mx, mx.to_string()))
                    .collect())
            }
        }
    }
}

fn address_records(domain: &str, addrs: Vec<IpAddr>) -> Vec<DnsRecord> {
    addrs
        .into_iter()
        .map(|ip| {
            let kind = if ip.is_ipv4() { RecordKind::A } else { RecordKind::Aaaa };
            DnsRecord::new(domain, kind, ip.to_string())
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::net::Ipv4Addr;

    struct StaticResolver {
        fail_mx: bool,
    }

    #[async_trait]
    impl RecordResolver for StaticResolver {
        async fn lookup_host_addresses(&self, domain: &str) -> crate::Result<Vec<IpAddr>> {
            if domain == "nowhere.test" {
                return Err(ScanError::Resolution("no such host".to_string()));
            }
            Ok(vec![
                IpAddr::V4(Ipv4Addr::new(93, 184, 216, 34)),
                "2606:2800:220:1::1".parse().unwrap(),
            ])
        }

        async fn lookup_name_servers(&self, _domain: &str) -> crate::Result<Vec<String>> {
            Ok(vec!["a.iana-servers.net.".to_string(), "b.iana-servers.net.".to_string()])
        }

        async fn lookup_canonical_name(&self, domain: &str) -> crate::Result<String> {
            Ok(fully_qualified(domain))
        }

        async fn lookup_mail_exchangers(&self, _domain: &str) -> crate::Result<Vec<MailExchanger>> {
            if self.fail_mx {
                return Err(ScanError::Resolution("timed out".to_string()));
            }
            Ok(vec![MailExchanger {
                exchange: "mail.example.com.".to_string(),
                preference: 10,
            }])
        }
    }

    fn digger(fail_mx: bool) -> Digger {
        Digger::new(Arc::new(StaticResolver { fail_mx }))
    }

    #[tokio::test]
    async fn test_dig_record_order() {
        let records = digger(false).dig("example.com").await.unwrap();
        let kinds: Vec<RecordKind> = records.iter().map(|r| r.kind).collect();
        assert_eq!(
            kinds,
            vec![
                RecordKind::A,
                RecordKind::Aaaa,
                RecordKind::Cname,
                RecordKind::Ns,
                RecordKind::Ns,
                RecordKind::Mx
            ]
        );
        assert_eq!(records[2].value, "example.com.");
        assert_eq!(records[5].value, "mail.example.com. 10");
        assert!(records.iter().all(|r| r.domain == "example.com"));
    }

    #[tokio::test]
    async fn test_dig_tolerates_optional_failures() {
        let records = digger(true).dig("example.com").await.unwrap();
        assert!(records.iter().all(|r| r.kind != RecordKind::Mx));
        assert!(records.iter().any(|r| r.kind == RecordKind::Ns));
    }

    #[tokio::test]
    async fn test_dig_unresolvable_domain() {
        let err = digger(false).dig("nowhere.test").await.unwrap_err();
        assert!(matches!(err, ScanError::Resolution(_)));
    }

    #[tokio::test]
    async fn test_dig_rejects_bad_domain() {
        let err = digger(false).dig("not_a_domain").await.unwrap_err();
        assert!(matches!(err, ScanError::InvalidDomain(_)));
    }

    #[tokio::test]
    async fn test_single_record_lookup() {
        let mx = digger(false).lookup("example.com", RecordKind::Mx).await.unwrap();
        assert_eq!(mx, vec![DnsRecord::new("example.com", RecordKind::Mx, "mail.example.com. 10")]);

        let err = digger(true).lookup("example.com", RecordKind::Mx).await.unwrap_err();
        assert!(matches!(err, ScanError::Resolution(_)));
    }

    #[test]
    fn test_fully_qualified() {
        assert_eq!(fully_qualified("example.com"), "example.com.");
        assert_eq!(fully_qualified("example.com."), "example.com.");
    }
}
