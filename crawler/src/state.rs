use std::net::Ipv4Addr;

use krpc_protocol::NodeId;

use crate::node_pool::NodePool;
use crate::transport::Transport;
use crate::types::{Announce, MetadataRecord};

/// State shared by every task belonging to one `Spider` instance.
///
/// The node pool has one producer (the Receiver's `find_node` response
/// handler) and one consumer (the Sniffer), so it needs no more
/// synchronization than a mutex-guarded FIFO; the queues are genuine
/// multi-producer/multi-consumer and use `async_channel`.
pub struct SharedState {
    pub self_id: NodeId,
    pub bind_ip: Ipv4Addr,
    pub pool: NodePool,
    pub transport: Transport,
    pub inquiry_tx: async_channel::Sender<Announce>,
    pub inquiry_rx: async_channel::Receiver<Announce>,
    pub metadata_tx: async_channel::Sender<MetadataRecord>,
    pub metadata_rx: async_channel::Receiver<MetadataRecord>,
}
