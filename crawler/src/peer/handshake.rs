use krpc_protocol::NodeId;
use rand::RngCore;
use tokio::io::AsyncWriteExt;
use tokio::net::TcpStream;

pub const PROTOCOL: &[u8; 19] = b"BitTorrent protocol";

/// Sets bit 20 (extension protocol, BEP-10) and bit 0 of the LTEP byte
/// (fast extension support, by convention).
pub const RESERVED: [u8; 8] = [0x00, 0x00, 0x00, 0x00, 0x00, 0x10, 0x00, 0x01];

/// `"-LT0100-"` followed by 12 random bytes.
pub fn generate_peer_id() -> [u8; 20] {
    let mut id = [0u8; 20];
    id[..8].copy_from_slice(b"-LT0100-");
    rand::thread_rng().fill_bytes(&mut id[8..]);
    id
}

/// Serializes and sends the handshake: `0x13 ++ "BitTorrent protocol" ++
/// reserved(8) ++ infohash(20) ++ peer_id(20)`.
pub async fn send(stream: &mut TcpStream, info_hash: &NodeId) -> std::io::Result<()> {
    let mut packet = Vec::with_capacity(68);
    packet.push(PROTOCOL.len() as u8);
    packet.extend_from_slice(PROTOCOL);
    packet.extend_from_slice(&RESERVED);
    packet.extend_from_slice(info_hash.as_bytes());
    packet.extend_from_slice(&generate_peer_id());
    stream.write_all(&packet).await
}

/// Validates a received handshake: protocol-string length must be 19, the
/// string itself must match, and (after skipping 8 reserved bytes) the
/// infohash must match ours exactly. Any mismatch rejects the whole packet.
pub fn validate(packet: &[u8], info_hash: &NodeId) -> bool {
    if packet.len() < 1 + 19 + 8 + 20 {
        return false;
    }
    if packet[0] != PROTOCOL.len() as u8 {
        return false;
    }
    if &packet[1..20] != PROTOCOL.as_slice() {
        return false;
    }
    &packet[28..48] == info_hash.as_bytes().as_slice()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn make_packet(info_hash: &[u8; 20], peer_id: &[u8; 20]) -> Vec<u8> {
        let mut packet = Vec::with_capacity(68);
        packet.push(19);
        packet.extend_from_slice(PROTOCOL);
        packet.extend_from_slice(&[0u8; 8]);
        packet.extend_from_slice(info_hash);
        packet.extend_from_slice(peer_id);
        packet
    }

    #[test]
    fn accepts_matching_handshake() {
        let info_hash = NodeId([0x11; 20]);
        let packet = make_packet(info_hash.as_bytes(), &[0u8; 20]);
        assert!(validate(&packet, &info_hash));
    }

    #[test]
    fn rejects_wrong_infohash() {
        let info_hash = NodeId([0x11; 20]);
        let packet = make_packet(&[0x22; 20], &[0u8; 20]);
        assert!(!validate(&packet, &info_hash));
    }

    #[test]
    fn rejects_corrupted_protocol_string() {
        let info_hash = NodeId([0x11; 20]);
        let mut packet = make_packet(info_hash.as_bytes(), &[0u8; 20]);
        packet[5] = b'X';
        assert!(!validate(&packet, &info_hash));
    }

    #[test]
    fn rejects_short_packet() {
        let info_hash = NodeId([0x11; 20]);
        assert!(!validate(&[0u8; 10], &info_hash));
    }
}
