//! Probe strategies: ICMP echo over a raw socket and TCP connect timing.

pub mod error;
pub mod icmp;
pub mod packet;
pub mod resolve;
pub mod strategy;
pub mod syn;

pub use error::ProbeError;
pub use icmp::{ensure_raw_socket_access, EchoMatch, IcmpProber};
pub use packet::{build_echo_request, checksum, parse_echo_reply, verify_checksum, IcmpHeader};
pub use resolve::resolve_ipv4;
pub use strategy::{Prober, Strategy};
pub use syn::{SynProber, DEFAULT_PORT};
