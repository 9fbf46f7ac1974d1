use thiserror::Error;

pub type Result<T> = std::result::Result<T, Error>;

/// Errors raised while encoding or decoding KRPC messages.
///
/// Per the crawler's fail-open policy, callers on the hot path typically
/// discard these rather than propagate them further.
#[derive(Debug, Error)]
pub enum Error {
    #[error("failed to decode bencoded message: {cause}")]
    Decode { cause: serde_bencode::Error },

    #[error("failed to encode message: {cause}")]
    Encode { cause: serde_bencode::Error },

    #[error("compact node-info blob had length {len}, not a multiple of 26")]
    InvalidCompactNodes { len: usize },
}
