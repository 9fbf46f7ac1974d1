//! Passive Mainline DHT crawler: harvests infohashes by impersonating
//! neighbors of random targets, then fetches torrent metadata from peers
//! that announce those infohashes via the BEP-9 extension protocol.

pub mod bloom;
pub mod config;
pub mod decode;
pub mod error;
pub mod inquirer;
pub mod joiner;
pub mod node_pool;
pub mod peer;
pub mod receiver;
pub mod recorder;
pub mod sniffer;
pub mod spider;
pub mod state;
pub mod storage;
pub mod transport;
pub mod types;

pub use config::Config;
pub use error::{Error, Result};
pub use spider::Spider;
pub use storage::{MetadataSink, SqliteSink};
