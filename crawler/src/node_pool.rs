use std::collections::VecDeque;
use std::net::Ipv4Addr;

use krpc_protocol::{NodeId, NodeInfo};
use tokio::sync::Mutex;

/// FIFO ingestion buffer for nodes discovered via `find_node` responses.
///
/// This is *not* a routing table: no buckets, no liveness tracking, no
/// eviction beyond the size cap. New inserts are simply dropped once full.
pub struct NodePool {
    max_size: usize,
    nodes: Mutex<VecDeque<NodeInfo>>,
}

impl NodePool {
    pub fn new(max_size: usize) -> NodePool {
        NodePool {
            max_size,
            nodes: Mutex::new(VecDeque::new()),
        }
    }

    pub async fn len(&self) -> usize {
        self.nodes.lock().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.len().await == 0
    }

    pub async fn is_at_capacity(&self) -> bool {
        self.len().await > self.max_size
    }

    /// Validates and inserts a single candidate node. Returns whether it was
    /// accepted. Invariants: `nid != self_id`, `ip != bind_ip`, `port` in
    /// `[1, 65535]`. `NodeId` is always 20 bytes by construction.
    pub async fn try_insert(&self, candidate: NodeInfo, self_id: &NodeId, bind_ip: Ipv4Addr) -> bool {
        if &candidate.id == self_id {
            return false;
        }
        if *candidate.addr.ip() == bind_ip {
            return false;
        }
        let port = candidate.addr.port();
        if port == 0 {
            return false;
        }

        let mut nodes = self.nodes.lock().await;
        if nodes.len() >= self.max_size {
            return false;
        }
        nodes.push_back(candidate);
        true
    }

    pub async fn pop_front(&self) -> Option<NodeInfo> {
        self.nodes.lock().await.pop_front()
    }

    /// Returns (a copy of) the first `n` nodes, for `r.nodes` replies.
    pub async fn front(&self, n: usize) -> Vec<NodeInfo> {
        self.nodes.lock().await.iter().take(n).copied().collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::net::SocketAddrV4;

    fn node(byte: u8, ip: Ipv4Addr, port: u16) -> NodeInfo {
        NodeInfo {
            id: NodeId([byte; 20]),
            addr: SocketAddrV4::new(ip, port),
        }
    }

    #[tokio::test]
    async fn rejects_self_id() {
        let pool = NodePool::new(10);
        let self_id = NodeId([1u8; 20]);
        let candidate = node(1, Ipv4Addr::new(1, 1, 1, 1), 6881);
        assert!(!pool.try_insert(candidate, &self_id, Ipv4Addr::UNSPECIFIED).await);
        assert_eq!(pool.len().await, 0);
    }

    #[tokio::test]
    async fn rejects_bind_ip_and_bad_port() {
        let pool = NodePool::new(10);
        let self_id = NodeId([1u8; 20]);
        let bind_ip = Ipv4Addr::new(10, 0, 0, 1);

        assert!(!pool.try_insert(node(2, bind_ip, 6881), &self_id, bind_ip).await);
        assert!(!pool.try_insert(node(3, Ipv4Addr::new(2, 2, 2, 2), 0), &self_id, bind_ip).await);
        assert_eq!(pool.len().await, 0);
    }

    #[tokio::test]
    async fn caps_at_max_size() {
        let pool = NodePool::new(2);
        let self_id = NodeId([1u8; 20]);
        let bind_ip = Ipv4Addr::UNSPECIFIED;

        assert!(pool.try_insert(node(2, Ipv4Addr::new(2, 2, 2, 2), 1), &self_id, bind_ip).await);
        assert!(pool.try_insert(node(3, Ipv4Addr::new(3, 3, 3, 3), 1), &self_id, bind_ip).await);
        assert!(!pool.try_insert(node(4, Ipv4Addr::new(4, 4, 4, 4), 1), &self_id, bind_ip).await);
        assert_eq!(pool.len().await, 2);
    }

    #[tokio::test]
    async fn fifo_pop_order() {
        let pool = NodePool::new(10);
        let self_id = NodeId([1u8; 20]);
        let bind_ip = Ipv4Addr::UNSPECIFIED;
        pool.try_insert(node(2, Ipv4Addr::new(2, 2, 2, 2), 1), &self_id, bind_ip).await;
        pool.try_insert(node(3, Ipv4Addr::new(3, 3, 3, 3), 1), &self_id, bind_ip).await;

        let first = pool.pop_front().await.unwrap();
        assert_eq!(first.id, NodeId([2u8; 20]));
    }
}
