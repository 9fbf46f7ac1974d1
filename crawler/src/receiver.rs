use std::net::SocketAddr;
use std::sync::Arc;

use krpc_protocol::{Message, MessageType, NodeInfo, Query};
use tokio::net::UdpSocket;
use tokio::sync::watch;
use tracing::trace;

use crate::state::SharedState;
use crate::types::Announce;

/// Matches the `recvfrom(65536)` buffer size used for DHT datagrams.
const RECV_BUF_SIZE: usize = 65536;

/// Sole reader of the UDP socket. Decodes each datagram and dispatches to a
/// query or response handler. Every handler fails open: any decode error or
/// missing field discards the packet and moves on to the next one.
pub async fn run(socket: Arc<UdpSocket>, state: Arc<SharedState>, mut stop: watch::Receiver<bool>) {
    let mut buf = vec![0u8; RECV_BUF_SIZE];
    loop {
        tokio::select! {
            _ = stop.changed() => {
                if *stop.borrow() {
                    break;
                }
            }
            result = socket.recv_from(&mut buf) => {
                let (n, from) = match result {
                    Ok(pair) => pair,
                    Err(_) => continue,
                };
                handle_datagram(&buf[..n], from, &state).await;
            }
        }
    }
}

async fn handle_datagram(data: &[u8], from: SocketAddr, state: &Arc<SharedState>) {
    let message = match Message::decode(data) {
        Ok(m) => m,
        Err(_) => return,
    };

    match message.body {
        MessageType::Response { response } => {
            if let Some(nodes) = response.nodes {
                process_find_node_response(nodes, state).await;
            }
        }
        MessageType::Query { query } => match query {
            Query::Ping { .. } => {
                state
                    .transport
                    .send_pong(message.transaction_id, state.self_id, from)
                    .await;
            }
            Query::FindNode { .. } => {
                process_find_node_request(message.transaction_id, state, from).await;
            }
            Query::GetPeers { info_hash, .. } => {
                process_get_peers_request(message.transaction_id, info_hash, state, from).await;
            }
            Query::AnnouncePeer {
                implied_port,
                port,
                info_hash,
                token,
                ..
            } => {
                process_announce_peer_request(
                    message.transaction_id,
                    implied_port,
                    port,
                    info_hash,
                    token,
                    state,
                    from,
                )
                .await;
            }
        },
        MessageType::Error { .. } => {}
    }
}

/// If the pool is already at capacity, the whole response is dropped
/// (backpressure) rather than inserting a partial batch.
async fn process_find_node_response(nodes: Vec<NodeInfo>, state: &Arc<SharedState>) {
    if state.pool.is_at_capacity().await {
        return;
    }
    for node in nodes {
        state
            .pool
            .try_insert(node, &state.self_id, state.bind_ip)
            .await;
    }
}

/// Replies with `neighbor(self_id)` rather than `self_id`, so the caller
/// records a different identity for us each time, widening the set of
/// targets we appear nearby to.
async fn process_find_node_request(transaction_id: Vec<u8>, state: &Arc<SharedState>, from: SocketAddr) {
    let id = state.self_id.neighbor(10);
    let nodes = state.pool.front(8).await;
    trace!(%from, "receiver: find_node request");
    state
        .transport
        .send_find_node_reply(transaction_id, id, nodes, from)
        .await;
}

/// We never return real peers; the only goal is to be contacted again, so
/// the queried node is as useful a `get_peers` target as a real swarm
/// member. The token is non-opaque: the first four bytes of the infohash,
/// validated against the same rule on `announce_peer`.
async fn process_get_peers_request(
    transaction_id: Vec<u8>,
    info_hash: krpc_protocol::NodeId,
    state: &Arc<SharedState>,
    from: SocketAddr,
) {
    let id = info_hash.neighbor(3);
    let nodes = state.pool.front(8).await;
    let token = info_hash.as_bytes()[..4].to_vec();
    state
        .transport
        .send_get_peers_reply(transaction_id, id, nodes, token, from)
        .await;
}

/// Enqueues the announce for the Inquirer pool and always sends a pong.
///
/// The enqueue is gated on port validity: an invalid resolved port means no
/// enqueue, but the pong still goes out regardless (see DESIGN.md).
async fn process_announce_peer_request(
    transaction_id: Vec<u8>,
    implied_port: Option<bool>,
    port: Option<u16>,
    info_hash: krpc_protocol::NodeId,
    // Not validated against `info_hash[:4]` before enqueueing: see
    // DESIGN.md's Open Question resolutions.
    _token: Vec<u8>,
    state: &Arc<SharedState>,
    from: SocketAddr,
) {
    let resolved_port = if implied_port.unwrap_or(false) {
        Some(from.port())
    } else {
        port
    };

    if let (Some(port), SocketAddr::V4(from_v4)) = (resolved_port, from) {
        if port != 0 {
            let announce = Announce {
                info_hash,
                peer_addr: std::net::SocketAddrV4::new(*from_v4.ip(), port),
            };
            let _ = state.inquiry_tx.try_send(announce);
        }
    }

    state
        .transport
        .send_pong(transaction_id, state.self_id, from)
        .await;
}
