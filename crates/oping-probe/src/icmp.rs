//! ICMP echo probing over a raw IPv4 socket.

use crate::error::ProbeError;
use crate::packet::{
    build_echo_request, echo_identifier, parse_echo_reply, IcmpHeader, ECHO_PAYLOAD, ECHO_REPLY,
    ECHO_SEQUENCE,
};
use crate::resolve::resolve_ipv4;
use crate::strategy::{elapsed_ms, Prober};
use oping_model::ProbeResult;
use socket2::{Domain, Protocol, SockAddr, Socket, Type};
use std::io::{ErrorKind, Read};
use std::net::Ipv4Addr;
use std::time::{Duration, Instant};
use tracing::debug;

const RECV_BUFFER_LEN: usize = 1024;

/// Which echo replies complete a probe.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum EchoMatch {
    /// The first echo reply read from the socket, whoever it answers.
    #[default]
    AnyReply,
    /// Only a reply carrying our identifier and sequence number.
    Exact,
}

#[derive(Debug, Clone)]
pub struct IcmpProber {
    identifier: u16,
    matching: EchoMatch,
}

impl IcmpProber {
    pub fn new(matching: EchoMatch) -> Self {
        Self {
            identifier: echo_identifier(),
            matching,
        }
    }

    pub fn identifier(&self) -> u16 {
        self.identifier
    }

    pub fn matching(&self) -> EchoMatch {
        self.matching
    }

    fn accepts(&self, header: &IcmpHeader) -> bool {
        if header.kind != ECHO_REPLY {
            return false;
        }
        match self.matching {
            EchoMatch::AnyReply => true,
            EchoMatch::Exact => {
                header.identifier == self.identifier && header.sequence == ECHO_SEQUENCE
            }
        }
    }

    fn echo(&self, target: &str, timeout: Duration) -> Result<(Ipv4Addr, f64), ProbeError> {
        let dest = resolve_ipv4(target, 0)?;
        let socket = open_raw_socket()?;
        let packet = build_echo_request(self.identifier, ECHO_SEQUENCE, ECHO_PAYLOAD);

        let sent_at = Instant::now();
        socket.send_to(&packet, &SockAddr::from(dest))?;

        let deadline = sent_at + timeout;
        let mut buf = [0u8; RECV_BUFFER_LEN];
        loop {
            let remaining = deadline.saturating_duration_since(Instant::now());
            if remaining.is_zero() {
                return Err(ProbeError::Timeout(timeout));
            }
            socket.set_read_timeout(Some(remaining))?;

            let len = match (&socket).read(&mut buf) {
                Ok(len) => len,
                Err(err) if matches!(err.kind(), ErrorKind::WouldBlock | ErrorKind::TimedOut) => {
                    return Err(ProbeError::Timeout(timeout));
                }
                Err(err) if err.kind() == ErrorKind::Interrupted => continue,
                Err(err) => return Err(err.into()),
            };
            let received_at = Instant::now();

            match parse_echo_reply(&buf[..len]) {
                Some(header) if self.accepts(&header) => {
                    return Ok((*dest.ip(), elapsed_ms(sent_at, received_at)));
                }
                Some(header) => {
                    debug!(
                        target_host = %target,
                        kind = header.kind,
                        identifier = header.identifier,
                        "skipping icmp datagram"
                    );
                }
                None => {}
            }
        }
    }
}

impl Default for IcmpProber {
    fn default() -> Self {
        Self::new(EchoMatch::default())
    }
}

impl Prober for IcmpProber {
    fn probe(&self, target: &str, timeout: Duration) -> Vec<ProbeResult> {
        match self.echo(target, timeout) {
            Ok((ip, rtt_ms)) => vec![ProbeResult::reply(target, rtt_ms, ip, None)],
            Err(err) => {
                debug!(target_host = %target, error = %err, "icmp probe failed");
                vec![ProbeResult::lost(target, None, None)]
            }
        }
    }
}

fn open_raw_socket() -> Result<Socket, ProbeError> {
    Ok(Socket::new(
        Domain::IPV4,
        Type::RAW,
        Some(Protocol::ICMPV4),
    )?)
}

/// Fails with [`ProbeError::Privilege`] when this process may not open a
/// raw ICMP socket.
pub fn ensure_raw_socket_access() -> Result<(), ProbeError> {
    match open_raw_socket() {
        Ok(_) => Ok(()),
        Err(ProbeError::Socket(err)) if err.kind() == ErrorKind::PermissionDenied => {
            Err(ProbeError::Privilege(err))
        }
        Err(err) => Err(err),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn reply(identifier: u16, sequence: u16) -> IcmpHeader {
        IcmpHeader {
            kind: ECHO_REPLY,
            code: 0,
            checksum: 0,
            identifier,
            sequence,
        }
    }

    #[test]
    fn any_reply_accepts_foreign_identifier() {
        let prober = IcmpProber::new(EchoMatch::AnyReply);
        let foreign = prober.identifier().wrapping_add(1);
        assert!(prober.accepts(&reply(foreign, 9)));
    }

    #[test]
    fn exact_match_requires_identifier_and_sequence() {
        let prober = IcmpProber::new(EchoMatch::Exact);
        let own = prober.identifier();
        assert!(prober.accepts(&reply(own, ECHO_SEQUENCE)));
        assert!(!prober.accepts(&reply(own.wrapping_add(1), ECHO_SEQUENCE)));
        assert!(!prober.accepts(&reply(own, ECHO_SEQUENCE + 1)));
    }

    #[test]
    fn non_reply_types_are_never_accepted() {
        let prober = IcmpProber::default();
        let mut header = reply(prober.identifier(), ECHO_SEQUENCE);
        header.kind = 3;
        assert!(!prober.accepts(&header));
    }
}
