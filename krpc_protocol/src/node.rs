use std::fmt;
use std::net::{Ipv4Addr, SocketAddrV4};

use byteorder::{BigEndian, ByteOrder};
use rand::RngCore;
use serde::de::{self, Visitor};
use serde::{Deserialize, Deserializer, Serialize, Serializer};

use crate::errors::{Error, Result};

/// A 20-byte Kademlia node identifier, or an infohash: both are 20 raw
/// bytes in the Mainline DHT's key space.
#[derive(Clone, Copy, PartialEq, Eq, Hash)]
pub struct NodeId(pub [u8; 20]);

impl NodeId {
    pub fn random() -> NodeId {
        let mut bytes = [0u8; 20];
        rand::thread_rng().fill_bytes(&mut bytes);
        NodeId(bytes)
    }

    pub fn as_bytes(&self) -> &[u8; 20] {
        &self.0
    }

    pub fn to_hex(&self) -> String {
        hex::encode(self.0)
    }

    /// Builds an identifier sharing `prefix_len` leading bytes with `self`,
    /// the rest filled with fresh random bytes.
    ///
    /// Presenting this as our own id puts us in the XOR-neighborhood of
    /// `self` from the point of view of whoever we send it to, without
    /// requiring us to actually hold that identity anywhere else.
    pub fn neighbor(&self, prefix_len: usize) -> NodeId {
        let prefix_len = prefix_len.min(20);
        let mut bytes = [0u8; 20];
        bytes[..prefix_len].copy_from_slice(&self.0[..prefix_len]);
        rand::thread_rng().fill_bytes(&mut bytes[prefix_len..]);
        NodeId(bytes)
    }
}

impl fmt::Debug for NodeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "NodeId({})", self.to_hex())
    }
}

impl Serialize for NodeId {
    fn serialize<S>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        serializer.serialize_bytes(&self.0)
    }
}

struct NodeIdVisitor;

impl<'de> Visitor<'de> for NodeIdVisitor {
    type Value = NodeId;

    fn expecting(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "20 raw bytes")
    }

    fn visit_bytes<E>(self, v: &[u8]) -> std::result::Result<Self::Value, E>
    where
        E: de::Error,
    {
        if v.len() != 20 {
            return Err(E::invalid_length(v.len(), &self));
        }
        let mut bytes = [0u8; 20];
        bytes.copy_from_slice(v);
        Ok(NodeId(bytes))
    }

    fn visit_byte_buf<E>(self, v: Vec<u8>) -> std::result::Result<Self::Value, E>
    where
        E: de::Error,
    {
        self.visit_bytes(&v)
    }
}

impl<'de> Deserialize<'de> for NodeId {
    fn deserialize<D>(deserializer: D) -> std::result::Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        deserializer.deserialize_bytes(NodeIdVisitor)
    }
}

/// A node's compact contact information: id plus IPv4 socket address.
///
/// Equality and hashing are by `id` alone: two sightings of the same node
/// from different addresses are still "the same node" for pool purposes.
#[derive(Debug, Clone, Copy)]
pub struct NodeInfo {
    pub id: NodeId,
    pub addr: SocketAddrV4,
}

impl PartialEq for NodeInfo {
    fn eq(&self, other: &Self) -> bool {
        self.id == other.id
    }
}
impl Eq for NodeInfo {}

impl std::hash::Hash for NodeInfo {
    fn hash<H: std::hash::Hasher>(&self, state: &mut H) {
        self.id.hash(state)
    }
}

/// Compact node info is a byte string whose length must be a multiple of 26:
/// `id(20) ++ ipv4(4) ++ port(2, big-endian)` per record.
///
/// Records of the wrong total length are rejected whole: the result is
/// either `len / 26` nodes or zero, never a partial parse.
pub fn decode_compact_nodes(bytes: &[u8]) -> Vec<NodeInfo> {
    if bytes.len() % 26 != 0 {
        return Vec::new();
    }
    bytes
        .chunks_exact(26)
        .map(|chunk| {
            let mut id = [0u8; 20];
            id.copy_from_slice(&chunk[..20]);
            let ip = Ipv4Addr::new(chunk[20], chunk[21], chunk[22], chunk[23]);
            let port = BigEndian::read_u16(&chunk[24..26]);
            NodeInfo {
                id: NodeId(id),
                addr: SocketAddrV4::new(ip, port),
            }
        })
        .collect()
}

pub fn encode_compact_nodes(nodes: &[NodeInfo]) -> Vec<u8> {
    let mut out = Vec::with_capacity(nodes.len() * 26);
    for node in nodes {
        out.extend_from_slice(&node.id.0);
        out.extend_from_slice(&node.addr.ip().octets());
        let mut port = [0u8; 2];
        BigEndian::write_u16(&mut port, node.addr.port());
        out.extend_from_slice(&port);
    }
    out
}

/// `serde(with = "compact_nodes")` helper so `NodeInfo` vectors can sit
/// directly on a bencoded `nodes` field as a single byte string.
pub mod compact_nodes {
    use super::{decode_compact_nodes, encode_compact_nodes, NodeInfo};
    use serde::{Deserialize, Deserializer, Serialize, Serializer};
    use serde_bytes::ByteBuf;

    pub fn serialize<S>(nodes: &[NodeInfo], serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        ByteBuf::from(encode_compact_nodes(nodes)).serialize(serializer)
    }

    pub fn deserialize<'de, D>(deserializer: D) -> Result<Vec<NodeInfo>, D::Error>
    where
        D: Deserializer<'de>,
    {
        let buf = ByteBuf::deserialize(deserializer)?;
        Ok(decode_compact_nodes(&buf))
    }

    pub mod opt {
        use super::*;

        pub fn serialize<S>(
            nodes: &Option<Vec<NodeInfo>>,
            serializer: S,
        ) -> Result<S::Ok, S::Error>
        where
            S: Serializer,
        {
            match nodes {
                Some(nodes) => super::serialize(nodes, serializer),
                None => serializer.serialize_none(),
            }
        }

        pub fn deserialize<'de, D>(deserializer: D) -> Result<Option<Vec<NodeInfo>>, D::Error>
        where
            D: Deserializer<'de>,
        {
            let buf = Option::<ByteBuf>::deserialize(deserializer)?;
            Ok(buf.map(|b| decode_compact_nodes(&b)))
        }
    }
}

pub fn validate_compact_len(len: usize) -> Result<()> {
    if len % 26 != 0 {
        return Err(Error::InvalidCompactNodes { len });
    }
    Ok(())
}
