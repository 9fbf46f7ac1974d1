use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use tokio::sync::watch;
use tracing::trace;

use crate::state::SharedState;

/// Drains the node pool, sending `find_node` queries that impersonate a
/// neighbor of each discovered node. This induces more `find_node`
/// responses (amplification) and positions the crawler's identity near
/// many infohashes, since the queried node is likely to respond with its
/// own closest known contacts.
pub async fn run(state: Arc<SharedState>, mut stop: watch::Receiver<bool>) {
    while !*stop.borrow() {
        for _ in 0..200 {
            if *stop.borrow() {
                return;
            }
            match state.pool.pop_front().await {
                None => {
                    tokio::time::sleep(Duration::from_secs(1)).await;
                }
                Some(node) => {
                    let target = node.id.neighbor(10);
                    let addr: SocketAddr = node.addr.into();
                    trace!(%addr, "sniffer: probing");
                    state.transport.send_find_node(state.self_id, target, addr).await;
                }
            }
        }

        tokio::select! {
            _ = stop.changed() => {}
            _ = tokio::time::sleep(Duration::from_secs(10)) => {}
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::node_pool::NodePool;
    use crate::transport::Transport;
    use krpc_protocol::{Message, MessageType, NodeId, NodeInfo, Query};
    use std::net::{Ipv4Addr, SocketAddrV4};
    use tokio::net::UdpSocket;

    async fn bind_state() -> Arc<SharedState> {
        let socket = Arc::new(UdpSocket::bind(SocketAddr::from((Ipv4Addr::LOCALHOST, 0))).await.unwrap());
        let transport = Transport::new(socket);
        let (inquiry_tx, inquiry_rx) = async_channel::unbounded();
        let (metadata_tx, metadata_rx) = async_channel::unbounded();
        Arc::new(SharedState {
            self_id: NodeId::random(),
            bind_ip: Ipv4Addr::UNSPECIFIED,
            pool: NodePool::new(500),
            transport,
            inquiry_tx,
            inquiry_rx,
            metadata_tx,
            metadata_rx,
        })
    }

    /// Drives the pool-empty 1s-retry and the 200-burst/10s-sleep cadence
    /// through a paused clock: the loop runs its real sleeps, but the test
    /// completes instantly because virtual time auto-advances whenever the
    /// runtime is otherwise idle.
    #[tokio::test(start_paused = true)]
    async fn drains_pool_front_to_back_and_survives_empty_retries() {
        let state = bind_state().await;
        let peer_socket = UdpSocket::bind(SocketAddr::from((Ipv4Addr::LOCALHOST, 0)))
            .await
            .unwrap();
        let peer_addr = peer_socket.local_addr().unwrap();
        let peer_addr_v4 = match peer_addr {
            SocketAddr::V4(v4) => v4,
            _ => unreachable!(),
        };

        let first = NodeInfo {
            id: NodeId([0xaa; 20]),
            addr: SocketAddrV4::new(*peer_addr_v4.ip(), peer_addr_v4.port()),
        };
        let second = NodeInfo {
            id: NodeId([0xbb; 20]),
            addr: SocketAddrV4::new(*peer_addr_v4.ip(), peer_addr_v4.port()),
        };
        let self_id = NodeId([0xff; 20]);
        assert!(state.pool.try_insert(first, &self_id, Ipv4Addr::UNSPECIFIED).await);
        assert!(state.pool.try_insert(second, &self_id, Ipv4Addr::UNSPECIFIED).await);

        let (stop_tx, stop_rx) = watch::channel(false);
        let handle = tokio::spawn(run(state.clone(), stop_rx));

        // The pool is drained FIFO: `first` is queried before `second`, and
        // the pool is empty once both arrive (the remaining ~198 burst slots
        // and the closing 10s sleep are all spent on paused-clock retries).
        let mut seen = Vec::new();
        for _ in 0..2 {
            let mut buf = [0u8; 512];
            let (n, _) = peer_socket.recv_from(&mut buf).await.unwrap();
            let msg = Message::decode(&buf[..n]).unwrap();
            match msg.body {
                MessageType::Query {
                    query: Query::FindNode { target, .. },
                } => seen.push(target),
                other => panic!("expected a find_node query, got {other:?}"),
            }
        }
        assert_eq!(&seen[0].as_bytes()[..10], &first.id.as_bytes()[..10]);
        assert_eq!(&seen[1].as_bytes()[..10], &second.id.as_bytes()[..10]);
        assert!(state.pool.is_empty().await);

        stop_tx.send(true).unwrap();
        handle.await.unwrap();
    }
}
