use crate::icmp::{EchoMatch, IcmpProber};
use crate::syn::SynProber;
use oping_model::{ProbeMode, ProbeResult};
use std::sync::Arc;
use std::time::{Duration, Instant};

/// Issues one probe attempt per series of `target`.
///
/// Implementations bound every attempt by `timeout` and report failures as
/// lost results; they never block indefinitely or return errors.
pub trait Prober: Send + Sync {
    fn probe(&self, target: &str, timeout: Duration) -> Vec<ProbeResult>;
}

impl<P: Prober + ?Sized> Prober for Arc<P> {
    fn probe(&self, target: &str, timeout: Duration) -> Vec<ProbeResult> {
        (**self).probe(target, timeout)
    }
}

#[derive(Debug, Clone)]
pub enum Strategy {
    Icmp(IcmpProber),
    Syn(SynProber),
}

impl Strategy {
    pub fn new(mode: ProbeMode, ports: Vec<u16>, matching: EchoMatch) -> Self {
        match mode {
            ProbeMode::Icmp => Strategy::Icmp(IcmpProber::new(matching)),
            ProbeMode::Syn => Strategy::Syn(SynProber::new(ports)),
        }
    }

    pub fn mode(&self) -> ProbeMode {
        match self {
            Strategy::Icmp(_) => ProbeMode::Icmp,
            Strategy::Syn(_) => ProbeMode::Syn,
        }
    }
}

impl Prober for Strategy {
    fn probe(&self, target: &str, timeout: Duration) -> Vec<ProbeResult> {
        match self {
            Strategy::Icmp(prober) => prober.probe(target, timeout),
            Strategy::Syn(prober) => prober.probe(target, timeout),
        }
    }
}

pub(crate) fn elapsed_ms(start: Instant, end: Instant) -> f64 {
    end.saturating_duration_since(start).as_secs_f64() * 1000.0
}
