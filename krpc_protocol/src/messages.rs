use serde::{Deserialize, Serialize};
use serde_bytes::ByteBuf;

use crate::booleans;
use crate::errors::{Error, Result};
use crate::node::NodeId;
use crate::node::compact_nodes;

/// Envelope holding fields common to every KRPC message: transaction id,
/// message type tag, and the type-specific payload (flattened).
///
/// See BEP-5: every message is a bencoded dictionary with `t` and `y`.
#[derive(Debug, Serialize, Deserialize, PartialEq, Eq)]
pub struct Message {
    /// Transaction id generated by the querying node and echoed back.
    #[serde(rename = "t", with = "serde_bytes")]
    pub transaction_id: Vec<u8>,

    #[serde(flatten)]
    pub body: MessageType,
}

impl Message {
    pub fn decode(bytes: &[u8]) -> Result<Message> {
        serde_bencode::de::from_bytes(bytes).map_err(|cause| Error::Decode { cause })
    }

    pub fn encode(&self) -> Result<Vec<u8>> {
        serde_bencode::ser::to_bytes(self).map_err(|cause| Error::Encode { cause })
    }
}

/// The four queries this crawler answers, and the one response shape it
/// cares about (any response carrying `r.nodes`). A tagged variant
/// dispatched with `match` rather than comparing `q` strings by hand.
#[derive(Debug, Serialize, Deserialize, PartialEq, Eq)]
#[serde(tag = "y")]
pub enum MessageType {
    #[serde(rename = "q")]
    Query {
        #[serde(flatten)]
        query: Query,
    },

    #[serde(rename = "r")]
    Response {
        #[serde(rename = "r")]
        response: Response,
    },

    #[serde(rename = "e")]
    Error {
        #[serde(rename = "e")]
        error: KrpcError,
    },
}

#[derive(Debug, Serialize, Deserialize, PartialEq, Eq, Clone)]
pub struct KrpcError(pub i64, pub String);

/// Possible queries, tagged by `q` with arguments flattened from `a`.
#[derive(Debug, Serialize, Deserialize, PartialEq, Eq)]
#[serde(tag = "q", content = "a")]
pub enum Query {
    #[serde(rename = "ping")]
    Ping { id: NodeId },

    #[serde(rename = "find_node")]
    FindNode { id: NodeId, target: NodeId },

    #[serde(rename = "get_peers")]
    GetPeers {
        id: NodeId,
        info_hash: NodeId,
    },

    #[serde(rename = "announce_peer")]
    AnnouncePeer {
        id: NodeId,

        /// If present and non-zero, the peer's port is the UDP source port
        /// rather than the `port` field below.
        #[serde(
            default,
            skip_serializing_if = "Option::is_none",
            deserialize_with = "booleans::opt::deserialize"
        )]
        implied_port: Option<bool>,

        #[serde(default, skip_serializing_if = "Option::is_none")]
        port: Option<u16>,

        info_hash: NodeId,

        #[serde(with = "serde_bytes")]
        token: Vec<u8>,
    },
}

/// Response payload. Modeled as one struct with optional fields rather than
/// a tagged enum: the crawler only ever needs to ask "does this carry
/// `nodes`?", and the fields it sends (`id`, `nodes`, `token`) and the
/// fields it may receive overlap completely.
#[derive(Debug, Serialize, Deserialize, PartialEq, Eq, Default)]
pub struct Response {
    pub id: NodeId,

    #[serde(
        default,
        skip_serializing_if = "Option::is_none",
        with = "compact_nodes::opt"
    )]
    pub nodes: Option<Vec<crate::node::NodeInfo>>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub token: Option<ByteBuf>,
}

impl Default for NodeId {
    fn default() -> Self {
        NodeId([0u8; 20])
    }
}
