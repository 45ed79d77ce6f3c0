//! Shared mock probes for the integration tests

#![allow(dead_code)]

use async_trait::async_trait;
use netool::network::{HostProber, PortProber, ProbeOutcome};
use std::collections::HashSet;
use std::net::{IpAddr, Ipv4Addr};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Mutex;
use std::time::Duration;

/// Tracks how many probes run at the same time
#[derive(Default)]
pub struct InFlight {
    current: AtomicUsize,
    peak: AtomicUsize,
}

impl InFlight {
    fn enter(&self) {
        let now = self.current.fetch_add(1, Ordering::SeqCst) + 1;
        self.peak.fetch_max(now, Ordering::SeqCst);
    }

    fn leave(&self) {
        self.current.fetch_sub(1, Ordering::SeqCst);
    }

    pub fn peak(&self) -> usize {
        self.peak.load(Ordering::SeqCst)
    }
}

/// Host prober that answers for a fixed set of addresses
pub struct MockHostProber {
    alive: HashSet<Ipv4Addr>,
    delay: Duration,
    pub calls: Mutex<Vec<Ipv4Addr>>,
    pub in_flight: InFlight,
}

impl MockHostProber {
    pub fn new(alive: impl IntoIterator<Item = Ipv4Addr>) -> Self {
        Self {
            alive: alive.into_iter().collect(),
            delay: Duration::ZERO,
            calls: Mutex::new(Vec::new()),
            in_flight: InFlight::default(),
        }
    }

    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = delay;
        self
    }

    pub fn call_count(&self) -> usize {
        self.calls.lock().unwrap().len()
    }
}

#[async_trait]
impl HostProber for MockHostProber {
    async fn probe_host(&self, addr: Ipv4Addr, _timeout: Duration) -> ProbeOutcome<Ipv4Addr> {
        self.in_flight.enter();
        self.calls.lock().unwrap().push(addr);
        if !self.delay.is_zero() {
            tokio::time::sleep(self.delay).await;
        }
        self.in_flight.leave();

        ProbeOutcome::from(self.alive.contains(&addr).then_some(addr))
    }
}

/// Port prober that reports a fixed set of ports open
pub struct MockPortProber {
    open: HashSet<u16>,
    delay: Duration,
    pub calls: Mutex<Vec<(IpAddr, u16)>>,
    pub in_flight: InFlight,
}

impl MockPortProber {
    pub fn new(open: impl IntoIterator<Item = u16>) -> Self {
        Self {
            open: open.into_iter().collect(),
            delay: Duration::ZERO,
            calls: Mutex::new(Vec::new()),
            in_flight: InFlight::default(),
        }
    }

    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = delay;
        self
    }

    pub fn call_count(&self) -> usize {
        self.calls.lock().unwrap().len()
    }

    pub fn probed_ports(&self) -> Vec<u16> {
        self.calls.lock().unwrap().iter().map(|(_, port)| *port).collect()
    }
}

#[async_trait]
impl PortProber for MockPortProber {
    async fn probe_port(&self, host: IpAddr, port: u16, _timeout: Duration) -> ProbeOutcome<u16> {
        self.in_flight.enter();
        self.calls.lock().unwrap().push((host, port));
        if !self.delay.is_zero() {
            tokio::time::sleep(self.delay).await;
        }
        self.in_flight.leave();

        ProbeOutcome::from(self.open.contains(&port).then_some(port))
    }
}
