//! Syntax checks for command-line arguments
//!
//! These only look at the shape of the input; semantic checks (octet ranges,
//! port bounds) happen in the parsers.

use crate::ScanError;
use once_cell::sync::Lazy;
use regex::Regex;
use std::net::IpAddr;

static DOMAIN_REGEX: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^(?:[A-Za-z0-9_](?:[A-Za-z0-9_-]{0,61}[A-Za-z0-9])?\.)+[A-Za-z]{2,63}\.?$").unwrap()
});

static HOSTNAME_REGEX: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^[A-Za-z0-9_](?:[A-Za-z0-9_-]{0,61}[A-Za-z0-9])?(?:\.[A-Za-z0-9_](?:[A-Za-z0-9_-]{0,61}[A-Za-z0-9])?)*\.?$")
        .unwrap()
});

static PORT_REGEX: Lazy<Regex> = Lazy::new(|| Regex::new(r"^\d+([,-]\d+)*$").unwrap());

static CIDR_REGEX: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^\d{1,3}\.\d{1,3}\.\d{1,3}\.\d{1,3}/\d{1,2}$").unwrap()
});

/// `example.com`, `mail.example.co.uk`
pub fn validate_domain(domain: &str) -> crate::Result<()> {
    if domain.len() <= 253 && DOMAIN_REGEX.is_match(domain) {
        Ok(())
    } else {
        Err(ScanError::InvalidDomain(format!(
            "'{}'. Example: example.com",
            domain
        )))
    }
}

/// An IP literal or a host name
pub fn validate_host(host: &str) -> crate::Result<()> {
    if host.parse::<IpAddr>().is_ok() || (host.len() <= 253 && HOSTNAME_REGEX.is_match(host)) {
        Ok(())
    } else {
        Err(ScanError::InvalidHost(format!(
            "'{}'. Example: www.example.com or 10.10.10.10",
            host
        )))
    }
}

/// `80`, `22,80,100-200`
pub fn validate_port_spec(spec: &str) -> crate::Result<()> {
    if PORT_REGEX.is_match(spec) {
        Ok(())
    } else {
        Err(ScanError::InvalidPortSpec(format!(
            "'{}'. Example: 80,100-200",
            spec
        )))
    }
}

/// `192.168.1.0/24`
pub fn validate_cidr(cidr: &str) -> crate::Result<()> {
    if CIDR_REGEX.is_match(cidr) {
        Ok(())
    } else {
        Err(ScanError::InvalidRange(format!(
            "'{}'. Example: 192.168.1.1/24",
            cidr
        )))
    }
}
