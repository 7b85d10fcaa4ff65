//! TCP connect timing, one attempt per configured port.

use crate::error::ProbeError;
use crate::resolve::resolve_ipv4;
use crate::strategy::{elapsed_ms, Prober};
use oping_model::ProbeResult;
use std::io::ErrorKind;
use std::net::{Ipv4Addr, SocketAddr, TcpStream};
use std::time::{Duration, Instant};
use tracing::debug;

pub const DEFAULT_PORT: u16 = 80;

#[derive(Debug, Clone)]
pub struct SynProber {
    ports: Vec<u16>,
}

impl SynProber {
    /// An empty port list probes [`DEFAULT_PORT`].
    pub fn new(ports: Vec<u16>) -> Self {
        let ports = if ports.is_empty() {
            vec![DEFAULT_PORT]
        } else {
            ports
        };
        Self { ports }
    }

    pub fn ports(&self) -> &[u16] {
        &self.ports
    }

    fn connect(
        &self,
        target: &str,
        port: u16,
        timeout: Duration,
    ) -> Result<(Ipv4Addr, f64), ProbeError> {
        let addr = resolve_ipv4(target, port)?;

        let started = Instant::now();
        let stream = TcpStream::connect_timeout(&SocketAddr::V4(addr), timeout).map_err(|err| {
            if matches!(err.kind(), ErrorKind::TimedOut | ErrorKind::WouldBlock) {
                ProbeError::Timeout(timeout)
            } else {
                ProbeError::Socket(err)
            }
        })?;
        let rtt_ms = elapsed_ms(started, Instant::now());
        drop(stream);

        Ok((*addr.ip(), rtt_ms))
    }
}

impl Prober for SynProber {
    fn probe(&self, target: &str, timeout: Duration) -> Vec<ProbeResult> {
        self.ports
            .iter()
            .map(|&port| match self.connect(target, port, timeout) {
                Ok((ip, rtt_ms)) => ProbeResult::reply(target, rtt_ms, ip, Some(port)),
                Err(err) => {
                    debug!(target_host = %target, port, error = %err, "syn probe failed");
                    ProbeResult::lost(target, None, Some(port))
                }
            })
            .collect()
    }
}
