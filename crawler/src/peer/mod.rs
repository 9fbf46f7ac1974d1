//! BEP-9 ("Extension for Peers to Send Metadata Files") over the BitTorrent
//! wire handshake and BEP-10 extension protocol.

pub mod handshake;
pub mod metadata;

pub use metadata::fetch;
