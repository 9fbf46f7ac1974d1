use std::net::SocketAddrV4;

use krpc_protocol::NodeId;

/// Produced by the `announce_peer` query handler, consumed by the Inquirer
/// pool.
#[derive(Debug, Clone, Copy)]
pub struct Announce {
    pub info_hash: NodeId,
    pub peer_addr: SocketAddrV4,
}

/// Produced by a successful BEP-9 fetch, consumed by the Recorder.
///
/// `name` stays raw bytes here; charset decoding is the Recorder's job, not
/// the fetch task's.
#[derive(Debug, Clone)]
pub struct MetadataRecord {
    pub hash: String,
    pub name: Vec<u8>,
    pub size: String,
}
