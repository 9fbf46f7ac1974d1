//! Bencoded KRPC message types for the BitTorrent Mainline DHT (BEP-5).
//!
//! This crate only models what the crawler actually speaks: four query
//! types, and a single response shape distinguished by whether it carries
//! compact node info. It does not attempt a general-purpose DHT client.

pub mod booleans;
pub mod errors;
pub mod messages;
pub mod node;

pub use errors::{Error, Result};
pub use messages::{KrpcError, Message, MessageType, Query, Response};
pub use node::{decode_compact_nodes, encode_compact_nodes, NodeId, NodeInfo};

#[cfg(test)]
mod tests {
    use super::*;
    use std::net::{Ipv4Addr, SocketAddrV4};

    #[test]
    fn compact_node_roundtrip() {
        let nodes = vec![
            NodeInfo {
                id: NodeId([1u8; 20]),
                addr: SocketAddrV4::new(Ipv4Addr::new(1, 2, 3, 4), 6881),
            },
            NodeInfo {
                id: NodeId([2u8; 20]),
                addr: SocketAddrV4::new(Ipv4Addr::new(5, 6, 7, 8), 80),
            },
        ];
        let encoded = encode_compact_nodes(&nodes);
        assert_eq!(encoded.len(), 52);
        let decoded = decode_compact_nodes(&encoded);
        assert_eq!(decoded, nodes);
    }

    #[test]
    fn compact_nodes_wrong_length_rejected_whole() {
        let bytes = vec![0u8; 27]; // not a multiple of 26
        assert!(decode_compact_nodes(&bytes).is_empty());
    }

    #[test]
    fn compact_nodes_exact_multiple_yields_exact_count() {
        let bytes = vec![0u8; 26 * 3];
        assert_eq!(decode_compact_nodes(&bytes).len(), 3);
    }

    #[test]
    fn neighbor_shares_prefix_and_is_20_bytes() {
        let target = NodeId([7u8; 20]);
        let n = target.neighbor(10);
        assert_eq!(&n.as_bytes()[..10], &target.as_bytes()[..10]);
        assert_eq!(n.as_bytes().len(), 20);
    }

    #[test]
    fn ping_query_roundtrip() {
        let msg = Message {
            transaction_id: vec![1, 2],
            body: MessageType::Query {
                query: Query::Ping {
                    id: NodeId([9u8; 20]),
                },
            },
        };
        let encoded = msg.encode().unwrap();
        let decoded = Message::decode(&encoded).unwrap();
        assert_eq!(msg, decoded);
    }

    #[test]
    fn find_node_response_decodes_nodes() {
        let nodes = vec![NodeInfo {
            id: NodeId([3u8; 20]),
            addr: SocketAddrV4::new(Ipv4Addr::new(9, 9, 9, 9), 1234),
        }];
        let msg = Message {
            transaction_id: vec![0xaa, 0xbb],
            body: MessageType::Response {
                response: Response {
                    id: NodeId([4u8; 20]),
                    nodes: Some(nodes.clone()),
                    token: None,
                },
            },
        };
        let encoded = msg.encode().unwrap();
        let decoded = Message::decode(&encoded).unwrap();
        match decoded.body {
            MessageType::Response { response } => assert_eq!(response.nodes, Some(nodes)),
            _ => panic!("expected a response"),
        }
    }

    #[test]
    fn announce_peer_implied_port_decodes_as_bool() {
        let msg = Message {
            transaction_id: vec![1, 1],
            body: MessageType::Query {
                query: Query::AnnouncePeer {
                    id: NodeId([1u8; 20]),
                    implied_port: Some(true),
                    port: Some(9999),
                    info_hash: NodeId([2u8; 20]),
                    token: vec![0, 1, 2, 3],
                },
            },
        };
        let encoded = msg.encode().unwrap();
        let decoded = Message::decode(&encoded).unwrap();
        assert_eq!(msg, decoded);
    }
}
