//! Host reachability probes
//!
//! The orchestrator only depends on [`HostProber`]; which implementation runs
//! is chosen from [`HostProbeKind`] at startup.

use super::{icmp, ProbeOutcome};
use async_trait::async_trait;
use futures::future::join_all;
use rand::Rng;
use serde::{Deserialize, Serialize};
use std::io;
use std::net::{IpAddr, Ipv4Addr, SocketAddr};
use std::process::Stdio;
use std::sync::Arc;
use std::time::Duration;
use tokio::net::TcpStream;
use tokio::process::Command;

/// Decides whether one address answers
#[async_trait]
pub trait HostProber: Send + Sync {
    async fn probe_host(&self, addr: Ipv4Addr, timeout: Duration) -> ProbeOutcome<Ipv4Addr>;
}

/// Available host probing strategies
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum HostProbeKind {
    /// Shell out to the system `ping`
    Ping,
    /// Raw ICMP echo (needs privileges)
    Icmp,
    /// TCP handshake against well-known ports
    Tcp,
}

impl HostProbeKind {
    pub fn name(&self) -> &'static str {
        match self {
            HostProbeKind::Ping => "ping",
            HostProbeKind::Icmp => "icmp",
            HostProbeKind::Tcp => "tcp",
        }
    }

    /// Build the prober for this strategy
    pub fn prober(&self) -> Arc<dyn HostProber> {
        match self {
            HostProbeKind::Ping => Arc::new(PingProber::new()),
            HostProbeKind::Icmp => Arc::new(IcmpProber::new()),
            HostProbeKind::Tcp => Arc::new(TcpPingProber::default()),
        }
    }
}

impl std::str::FromStr for HostProbeKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "ping" => Ok(HostProbeKind::Ping),
            "icmp" | "raw" => Ok(HostProbeKind::Icmp),
            "tcp" => Ok(HostProbeKind::Tcp),
            _ => Err(format!("Unknown host probe: {}", s)),
        }
    }
}

impl std::fmt::Display for HostProbeKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.name())
    }
}

/// Runs the platform `ping` with a single echo request
#[derive(Debug, Clone)]
pub struct PingProber {
    program: String,
}

impl Default for PingProber {
    fn default() -> Self {
        Self::new()
    }
}

impl PingProber {
    pub fn new() -> Self {
        Self {
            program: "ping".to_string(),
        }
    }

    /// Use another ping binary (e.g. an absolute path)
    pub fn with_program(program: impl Into<String>) -> Self {
        Self {
            program: program.into(),
        }
    }

    fn command(&self, addr: Ipv4Addr, timeout: Duration) -> Command {
        let mut cmd = Command::new(&self.program);

        #[cfg(windows)]
        {
            let wait = timeout.as_millis().to_string();
            cmd.args(["-n", "1", "-w", wait.as_str()]);
        }

        // BSD ping takes the wait time in milliseconds
        #[cfg(any(target_os = "macos", target_os = "freebsd"))]
        {
            let wait = timeout.as_millis().to_string();
            cmd.args(["-c", "1", "-W", wait.as_str()]);
        }

        #[cfg(all(unix, not(any(target_os = "macos", target_os = "freebsd"))))]
        {
            let wait = wait_seconds(timeout).to_string();
            cmd.args(["-c", "1", "-W", wait.as_str()]);
        }

        cmd.arg(addr.to_string())
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::null())
            .kill_on_drop(true);
        cmd
    }
}

/// iputils `-W` only understands whole seconds
#[cfg_attr(any(windows, target_os = "macos", target_os = "freebsd"), allow(dead_code))]
fn wait_seconds(timeout: Duration) -> u64 {
    let secs = timeout.as_secs() + u64::from(timeout.subsec_nanos() > 0);
    secs.max(1)
}

/// Windows `ping` exits 0 even when a router answers "Destination host
/// unreachable", so the output has to be checked as well.
pub fn classify_ping_output(exit_success: bool, stdout: &str) -> bool {
    exit_success && !stdout.to_lowercase().contains("destination host unreachable")
}

#[async_trait]
impl HostProber for PingProber {
    async fn probe_host(&self, addr: Ipv4Addr, timeout: Duration) -> ProbeOutcome<Ipv4Addr> {
        let output = match tokio::time::timeout(timeout, self.command(addr, timeout).output()).await {
            Ok(Ok(output)) => output,
            Ok(Err(e)) => {
                log::debug!("Failed to run {} for {}: {}", self.program, addr, e);
                return ProbeOutcome::Unreachable;
            }
            Err(_) => {
                log::trace!("ping {} timed out after {:?}", addr, timeout);
                return ProbeOutcome::Unreachable;
            }
        };

        let stdout = String::from_utf8_lossy(&output.stdout);
        if classify_ping_output(output.status.success(), &stdout) {
            ProbeOutcome::Reachable(addr)
        } else {
            ProbeOutcome::Unreachable
        }
    }
}

/// Extra time a blocking echo gets past its own deadline before the worker moves on
const ICMP_GRACE: Duration = Duration::from_millis(100);

/// Native ICMP echo over a raw socket
#[derive(Debug, Clone, Default)]
pub struct IcmpProber;

impl IcmpProber {
    pub fn new() -> Self {
        Self
    }
}

#[async_trait]
impl HostProber for IcmpProber {
    async fn probe_host(&self, addr: Ipv4Addr, timeout: Duration) -> ProbeOutcome<Ipv4Addr> {
        let identifier = rand::thread_rng().gen::<u16>();

        let task = tokio::task::spawn_blocking(move || icmp::echo(addr, identifier, 1, timeout));

        let result = match tokio::time::timeout(timeout + ICMP_GRACE, task).await {
            Ok(result) => result,
            Err(_) => {
                log::debug!("ICMP echo to {} did not return within {:?}", addr, timeout);
                return ProbeOutcome::Unreachable;
            }
        };

        match result {
            Ok(Ok(true)) => ProbeOutcome::Reachable(addr),
            Ok(Ok(false)) => ProbeOutcome::Unreachable,
            Ok(Err(e)) => {
                if e.kind() == io::ErrorKind::PermissionDenied {
                    log::warn!("Raw ICMP needs root or CAP_NET_RAW: {}", e);
                } else {
                    log::debug!("ICMP echo to {} failed: {}", addr, e);
                }
                ProbeOutcome::Unreachable
            }
            Err(e) => {
                log::error!("ICMP probe task for {} failed: {}", addr, e);
                ProbeOutcome::Unreachable
            }
        }
    }
}

/// TCP reachability: a completed handshake or an active refusal both mean
/// something answered at that address
#[derive(Debug, Clone)]
pub struct TcpPingProber {
    ports: Vec<u16>,
}

impl Default for TcpPingProber {
    fn default() -> Self {
        Self {
            ports: vec![80, 443, 22, 445, 3389],
        }
    }
}

impl TcpPingProber {
    pub fn new(ports: Vec<u16>) -> Self {
        Self { ports }
    }

    async fn knock(addr: SocketAddr, timeout: Duration) -> bool {
        match tokio::time::timeout(timeout, TcpStream::connect(addr)).await {
            Ok(Ok(_)) => true,
            Ok(Err(e)) => e.kind() == io::ErrorKind::ConnectionRefused,
            Err(_) => false,
        }
    }
}

#[async_trait]
impl HostProber for TcpPingProber {
    async fn probe_host(&self, addr: Ipv4Addr, timeout: Duration) -> ProbeOutcome<Ipv4Addr> {
        let knocks = self
            .ports
            .iter()
            .map(|&port| Self::knock(SocketAddr::new(IpAddr::V4(addr), port), timeout));

        if join_all(knocks).await.into_iter().any(|answered| answered) {
            ProbeOutcome::Reachable(addr)
        } else {
            ProbeOutcome::Unreachable
        }
    }
}
