use thiserror::Error;

/// Four classes: Transport, Decode, Protocol, Persistence. Nothing at this
/// level is retried: retry emerges naturally because the DHT resurfaces
/// the same infohashes repeatedly.
#[derive(Debug, Error)]
pub enum Error {
    #[error("transport error talking to {addr}: {source}")]
    Transport {
        addr: std::net::SocketAddr,
        #[source]
        source: std::io::Error,
    },

    #[error("decode error: {0}")]
    Decode(#[from] krpc_protocol::Error),

    #[error("protocol error: {0}")]
    Protocol(&'static str),

    #[error("persistence error: {0}")]
    Persistence(#[source] rusqlite::Error),
}

pub type Result<T> = std::result::Result<T, Error>;
