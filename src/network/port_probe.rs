//! TCP connect probing of a single (host, port) pair

use super::ProbeOutcome;
use async_trait::async_trait;
use std::net::{IpAddr, SocketAddr};
use std::time::Duration;
use tokio::net::TcpStream;

/// Decides whether one port on one host accepts connections
#[async_trait]
pub trait PortProber: Send + Sync {
    async fn probe_port(&self, host: IpAddr, port: u16, timeout: Duration) -> ProbeOutcome<u16>;
}

/// Full TCP handshake scanner; no application data is exchanged
#[derive(Debug, Clone, Copy, Default)]
pub struct TcpConnectProber;

impl TcpConnectProber {
    pub fn new() -> Self {
        Self
    }
}

#[async_trait]
impl PortProber for TcpConnectProber {
    async fn probe_port(&self, host: IpAddr, port: u16, timeout: Duration) -> ProbeOutcome<u16> {
        let addr = SocketAddr::new(host, port);

        match tokio::time::timeout(timeout, TcpStream::connect(addr)).await {
            Ok(Ok(stream)) => {
                // Connection successful - close immediately
                drop(stream);
                ProbeOutcome::Reachable(port)
            }
            Ok(Err(e)) => {
                log::trace!("{} closed: {}", addr, e);
                ProbeOutcome::Unreachable
            }
            Err(_) => {
                log::trace!("{} timed out after {:?}", addr, timeout);
                ProbeOutcome::Unreachable
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::net::Ipv4Addr;
    use tokio::net::TcpListener;

    #[tokio::test]
    async fn test_open_port_is_reachable() {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let port = listener.local_addr().unwrap().port();

        let outcome = TcpConnectProber::new()
            .probe_port(IpAddr::V4(Ipv4Addr::LOCALHOST), port, Duration::from_secs(2))
            .await;
        assert_eq!(outcome, ProbeOutcome::Reachable(port));
    }

    #[tokio::test]
    async fn test_closed_port_is_unreachable() {
        let port = {
            let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
            listener.local_addr().unwrap().port()
        };

        let outcome = TcpConnectProber::new()
            .probe_port(IpAddr::V4(Ipv4Addr::LOCALHOST), port, Duration::from_secs(2))
            .await;
        assert_eq!(outcome, ProbeOutcome::Unreachable);
    }
}
