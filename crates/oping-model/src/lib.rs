//! Shared data structures for oping.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::net::Ipv4Addr;
use std::str::FromStr;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ProbeMode {
    Icmp,
    Syn,
}

impl fmt::Display for ProbeMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ProbeMode::Icmp => f.write_str("icmp"),
            ProbeMode::Syn => f.write_str("syn"),
        }
    }
}

impl FromStr for ProbeMode {
    type Err = String;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.to_ascii_lowercase().as_str() {
            "icmp" => Ok(ProbeMode::Icmp),
            "syn" => Ok(ProbeMode::Syn),
            other => Err(format!("unsupported probe type: {other}")),
        }
    }
}

/// Key of one probe series for a target: the protocol tag in ICMP mode,
/// the destination port in SYN mode.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ProbeId {
    Icmp,
    Port(u16),
}

impl fmt::Display for ProbeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ProbeId::Icmp => f.write_str("icmp"),
            ProbeId::Port(port) => write!(f, "{port}"),
        }
    }
}

/// Outcome of a single probe attempt.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProbeResult {
    pub target: String,
    pub rtt_ms: Option<f64>,
    pub ip: Option<Ipv4Addr>,
    pub port: Option<u16>,
}

impl ProbeResult {
    pub fn reply(target: impl Into<String>, rtt_ms: f64, ip: Ipv4Addr, port: Option<u16>) -> Self {
        Self {
            target: target.into(),
            rtt_ms: Some(rtt_ms),
            ip: Some(ip),
            port,
        }
    }

    pub fn lost(target: impl Into<String>, ip: Option<Ipv4Addr>, port: Option<u16>) -> Self {
        Self {
            target: target.into(),
            rtt_ms: None,
            ip,
            port,
        }
    }

    pub fn success(&self) -> bool {
        self.rtt_ms.is_some()
    }

    pub fn probe_id(&self) -> ProbeId {
        match self.port {
            Some(port) => ProbeId::Port(port),
            None => ProbeId::Icmp,
        }
    }
}

/// Accumulated history of one (target, probe id) series.
///
/// `failures` holds the 1-based attempt index of every lost probe, so
/// `successes.len() + failures.len()` is always the attempt count.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SeriesStats {
    pub successes: Vec<f64>,
    pub failures: Vec<u64>,
}

impl SeriesStats {
    pub fn attempts(&self) -> u64 {
        (self.successes.len() + self.failures.len()) as u64
    }

    pub fn push(&mut self, rtt_ms: Option<f64>) {
        match rtt_ms {
            Some(rtt) => self.successes.push(rtt),
            None => {
                let attempt = self.attempts() + 1;
                self.failures.push(attempt);
            }
        }
    }

    pub fn summary(&self) -> SeriesSummary {
        let successful = self.successes.len() as u64;
        let unsuccessful = self.failures.len() as u64;
        let total = successful + unsuccessful;

        let loss_percent = if total > 0 {
            unsuccessful as f64 / total as f64 * 100.0
        } else {
            0.0
        };
        let mean_rtt_ms = if successful > 0 {
            self.successes.iter().sum::<f64>() / successful as f64
        } else {
            0.0
        };

        SeriesSummary {
            successful,
            unsuccessful,
            loss_percent,
            mean_rtt_ms,
            min_rtt_ms: self.successes.iter().copied().reduce(f64::min),
            max_rtt_ms: self.successes.iter().copied().reduce(f64::max),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SeriesSummary {
    pub successful: u64,
    pub unsuccessful: u64,
    pub loss_percent: f64,
    pub mean_rtt_ms: f64,
    pub min_rtt_ms: Option<f64>,
    pub max_rtt_ms: Option<f64>,
}
