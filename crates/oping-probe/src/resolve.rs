use crate::error::ProbeError;
use std::net::{Ipv4Addr, SocketAddr, SocketAddrV4, ToSocketAddrs};

/// Resolves `target` to its first IPv4 address, paired with `port`.
pub fn resolve_ipv4(target: &str, port: u16) -> Result<SocketAddrV4, ProbeError> {
    if let Ok(ip) = target.parse::<Ipv4Addr>() {
        return Ok(SocketAddrV4::new(ip, port));
    }

    let addrs = (target, port)
        .to_socket_addrs()
        .map_err(|source| ProbeError::Resolve {
            target: target.to_string(),
            source,
        })?;

    addrs
        .filter_map(|addr| match addr {
            SocketAddr::V4(v4) => Some(v4),
            SocketAddr::V6(_) => None,
        })
        .next()
        .ok_or_else(|| ProbeError::NoIpv4(target.to_string()))
}
