use std::io;
use std::time::Duration;
use thiserror::Error;

/// Why a single probe attempt failed.
///
/// These never escape a [`Prober`](crate::Prober); they are logged and the
/// attempt is recorded as lost.
#[derive(Debug, Error)]
pub enum ProbeError {
    #[error("failed to resolve {target}: {source}")]
    Resolve {
        target: String,
        #[source]
        source: io::Error,
    },

    #[error("no IPv4 address found for {0}")]
    NoIpv4(String),

    #[error("socket error: {0}")]
    Socket(#[from] io::Error),

    #[error("no reply within {0:?}")]
    Timeout(Duration),

    #[error("raw socket access denied: {0}")]
    Privilege(#[source] io::Error),
}
