use std::net::SocketAddr;
use std::sync::Arc;

use krpc_protocol::{Message, MessageType, NodeId, NodeInfo, Query, Response};
use rand::RngCore;
use tokio::net::UdpSocket;
use tracing::{debug, trace};

/// Thin sender over a shared UDP socket. Datagram sends are atomic at the
/// OS level, so no cross-writer ordering is required between the Joiner,
/// Sniffer, and Receiver's reply paths.
pub struct Transport {
    socket: Arc<UdpSocket>,
}

fn random_transaction_id() -> Vec<u8> {
    let mut t = [0u8; 2];
    rand::thread_rng().fill_bytes(&mut t);
    t.to_vec()
}

impl Transport {
    pub fn new(socket: Arc<UdpSocket>) -> Transport {
        Transport { socket }
    }

    async fn send(&self, message: &Message, to: SocketAddr) {
        match message.encode() {
            Ok(bytes) => {
                if let Err(err) = self.socket.send_to(&bytes, to).await {
                    debug!(%err, %to, "transport: send failed");
                }
            }
            Err(err) => debug!(%err, "transport: encode failed"),
        }
    }

    pub async fn send_pong(&self, transaction_id: Vec<u8>, self_id: NodeId, to: SocketAddr) {
        let message = Message {
            transaction_id,
            body: MessageType::Response {
                response: Response {
                    id: self_id,
                    nodes: None,
                    token: None,
                },
            },
        };
        trace!(%to, "transport: pong");
        self.send(&message, to).await;
    }

    pub async fn send_find_node(&self, self_id: NodeId, target: NodeId, to: SocketAddr) {
        let message = Message {
            transaction_id: random_transaction_id(),
            body: MessageType::Query {
                query: Query::FindNode {
                    id: self_id,
                    target,
                },
            },
        };
        self.send(&message, to).await;
    }

    pub async fn send_find_node_reply(
        &self,
        transaction_id: Vec<u8>,
        id: NodeId,
        nodes: Vec<NodeInfo>,
        to: SocketAddr,
    ) {
        let message = Message {
            transaction_id,
            body: MessageType::Response {
                response: Response {
                    id,
                    nodes: Some(nodes),
                    token: None,
                },
            },
        };
        self.send(&message, to).await;
    }

    pub async fn send_get_peers_reply(
        &self,
        transaction_id: Vec<u8>,
        id: NodeId,
        nodes: Vec<NodeInfo>,
        token: Vec<u8>,
        to: SocketAddr,
    ) {
        let message = Message {
            transaction_id,
            body: MessageType::Response {
                response: Response {
                    id,
                    nodes: Some(nodes),
                    token: Some(serde_bytes::ByteBuf::from(token)),
                },
            },
        };
        self.send(&message, to).await;
    }
}
