use std::net::SocketAddrV4;
use std::time::{Duration, Instant};

use krpc_protocol::NodeId;
use regex::bytes::Regex;
use serde::Serialize;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::TcpStream;
use tracing::instrument;

use super::handshake;
use crate::types::MetadataRecord;

const BT_MSG_ID: u8 = 20;
const EXT_HANDSHAKE_ID: u8 = 0;
const PIECE_SIZE: u64 = 16384;

#[derive(Serialize)]
struct ExtHandshakePayload {
    m: ExtHandshakeM,
}

#[derive(Serialize)]
struct ExtHandshakeM {
    ut_metadata: i64,
}

#[derive(Serialize)]
struct PieceRequest {
    msg_type: i64,
    piece: i64,
}

async fn send_message(stream: &mut TcpStream, payload: &[u8]) -> std::io::Result<()> {
    let mut framed = Vec::with_capacity(4 + payload.len());
    framed.extend_from_slice(&(payload.len() as u32).to_be_bytes());
    framed.extend_from_slice(payload);
    stream.write_all(&framed).await
}

async fn send_ext_handshake(stream: &mut TcpStream) -> std::io::Result<()> {
    let body = serde_bencode::ser::to_bytes(&ExtHandshakePayload {
        m: ExtHandshakeM { ut_metadata: 1 },
    })
    .unwrap_or_default();

    let mut payload = Vec::with_capacity(2 + body.len());
    payload.push(BT_MSG_ID);
    payload.push(EXT_HANDSHAKE_ID);
    payload.extend_from_slice(&body);
    send_message(stream, &payload).await
}

async fn request_piece(stream: &mut TcpStream, ut_metadata: u8, piece: u32) -> std::io::Result<()> {
    let body = serde_bencode::ser::to_bytes(&PieceRequest {
        msg_type: 0,
        piece: piece as i64,
    })
    .unwrap_or_default();

    let mut payload = Vec::with_capacity(2 + body.len());
    payload.push(BT_MSG_ID);
    payload.push(ut_metadata);
    payload.extend_from_slice(&body);
    send_message(stream, &payload).await
}

/// The peer's numeric extension id for `ut_metadata`, extracted as the
/// digit run that follows the ASCII substring `"ut_metadata"` plus one
/// separator byte. This is robust to bencode framing we don't otherwise
/// parse, because only the integer immediately following in ASCII is of
/// interest.
fn find_ut_metadata(data: &[u8]) -> Option<u8> {
    let needle = b"ut_metadata";
    let pos = find_subslice(data, needle)?;
    let start = pos + needle.len() + 1;
    let digits = take_ascii_digits(data, start)?;
    std::str::from_utf8(digits).ok()?.parse().ok()
}

fn find_metadata_size(data: &[u8]) -> Option<u64> {
    let needle = b"metadata_size";
    let pos = find_subslice(data, needle)?;
    let start = pos + needle.len() + 1;
    let digits = take_ascii_digits(data, start)?;
    std::str::from_utf8(digits).ok()?.parse().ok()
}

fn take_ascii_digits(data: &[u8], start: usize) -> Option<&[u8]> {
    let tail = data.get(start..)?;
    let end = tail.iter().position(|b| !b.is_ascii_digit()).unwrap_or(tail.len());
    if end == 0 {
        None
    } else {
        Some(&tail[..end])
    }
}

fn find_subslice(haystack: &[u8], needle: &[u8]) -> Option<usize> {
    haystack
        .windows(needle.len())
        .position(|window| window == needle)
}

/// Drain-until-idle receive. Peers may fragment metadata responses and we
/// cannot parse message boundaries without implementing full BitTorrent
/// framing, so we poll non-blocking reads until the connection goes quiet:
/// break once data has arrived and gone quiet for `timeout`, or once
/// `2 * timeout` has passed without any data at all. A hard close is also
/// treated as an early-exit signal.
async fn recv_until_idle(stream: &mut TcpStream, timeout: Duration) -> Vec<u8> {
    let mut collected = Vec::new();
    let mut begin = Instant::now();
    let mut got_any = false;
    let mut buf = [0u8; 4096];

    loop {
        tokio::time::sleep(Duration::from_millis(50)).await;

        match stream.try_read(&mut buf) {
            Ok(0) => break,
            Ok(n) => {
                collected.extend_from_slice(&buf[..n]);
                got_any = true;
                begin = Instant::now();
            }
            Err(ref err) if err.kind() == std::io::ErrorKind::WouldBlock => {}
            Err(_) => {}
        }

        let elapsed = begin.elapsed();
        if got_any && elapsed > timeout {
            break;
        }
        if !got_any && elapsed > timeout * 2 {
            break;
        }
    }

    collected
}

/// First match of `:name.utf-8(\d+):`, falling back to `:name(\d+):`,
/// case-insensitive. The captured digits are the byte length of the
/// filename that immediately follows the matched prefix.
fn extract_name(metadata: &[u8]) -> Option<Vec<u8>> {
    static UTF8_NAME: std::sync::OnceLock<Regex> = std::sync::OnceLock::new();
    static PLAIN_NAME: std::sync::OnceLock<Regex> = std::sync::OnceLock::new();

    let utf8_re = UTF8_NAME.get_or_init(|| Regex::new(r"(?i):name\.utf-8(\d+):").unwrap());
    let plain_re = PLAIN_NAME.get_or_init(|| Regex::new(r"(?i):name(\d+):").unwrap());

    let caps = utf8_re
        .captures(metadata)
        .or_else(|| plain_re.captures(metadata))?;

    let len: usize = std::str::from_utf8(caps.get(1)?.as_bytes()).ok()?.parse().ok()?;
    let start = caps.get(0)?.end();
    metadata.get(start..start + len).map(|s| s.to_vec())
}

/// Sums every `:lengthi(\d+)e` match. Multi-file torrents report one
/// `length` field per file, which sum to total content size.
fn extract_size(metadata: &[u8]) -> u64 {
    static LENGTH_RE: std::sync::OnceLock<Regex> = std::sync::OnceLock::new();
    let re = LENGTH_RE.get_or_init(|| Regex::new(r"(?i):lengthi(\d+)e").unwrap());

    re.captures_iter(metadata)
        .filter_map(|c| std::str::from_utf8(c.get(1)?.as_bytes()).ok()?.parse::<u64>().ok())
        .sum()
}

/// Performs the full BEP-9 metadata exchange against one peer, bounded by
/// `timeout`. Every error inside is swallowed: the caller only sees
/// `None`, and the socket is always closed on the way out (dropping
/// `stream` at the end of the function does this).
#[instrument(skip(timeout), fields(peer = %addr))]
pub async fn fetch(info_hash: NodeId, addr: SocketAddrV4, timeout: Duration) -> Option<MetadataRecord> {
    let addr = std::net::SocketAddr::V4(addr);

    let mut stream = tokio::time::timeout(timeout, TcpStream::connect(addr))
        .await
        .ok()?
        .ok()?;

    handshake::send(&mut stream, &info_hash).await.ok()?;

    let mut buf = vec![0u8; 4096];
    let n = tokio::time::timeout(timeout, stream.read(&mut buf)).await.ok()?.ok()?;
    if !handshake::validate(&buf[..n], &info_hash) {
        return None;
    }

    send_ext_handshake(&mut stream).await.ok()?;
    let mut buf = vec![0u8; 4096];
    let n = tokio::time::timeout(timeout, stream.read(&mut buf)).await.ok()?.ok()?;
    let ext_payload = &buf[..n];

    let ut_metadata = find_ut_metadata(ext_payload)?;
    let metadata_size = find_metadata_size(ext_payload)?;
    if metadata_size == 0 {
        return None;
    }

    let piece_count = metadata_size.div_ceil(PIECE_SIZE) as u32;
    let mut metadata = Vec::new();

    for piece in 0..piece_count {
        request_piece(&mut stream, ut_metadata, piece).await.ok()?;
        let chunk = recv_until_idle(&mut stream, timeout).await;
        // A missing "ee" means a garbled or truncated piece response; the
        // original aborts the whole fetch on this rather than stitching the
        // buffer back together around the hole.
        let pos = find_subslice(&chunk, b"ee")?;
        metadata.extend_from_slice(&chunk[pos + 2..]);
    }

    let name = extract_name(&metadata)?;
    let size = extract_size(&metadata);

    if size == 0 || name.is_empty() {
        return None;
    }

    Some(MetadataRecord {
        hash: info_hash.to_hex(),
        name,
        size: size.to_string(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_single_file_metadata() {
        let metadata = b"d6:lengthi1048576e4:name8:hello.mpe";
        assert_eq!(extract_name(metadata), Some(b"hello.mp".to_vec()));
        assert_eq!(extract_size(metadata), 1048576);
    }

    #[test]
    fn parses_multi_file_metadata_preferring_utf8_name() {
        let metadata = b"...:lengthi100e...:lengthi250e...:name.utf-84:test...";
        assert_eq!(extract_size(metadata), 350);
        assert_eq!(extract_name(metadata), Some(b"test".to_vec()));
    }

    #[test]
    fn piece_count_boundary() {
        assert_eq!((16384u64).div_ceil(PIECE_SIZE), 1);
        assert_eq!((16385u64).div_ceil(PIECE_SIZE), 2);
    }

    #[test]
    fn finds_ut_metadata_and_metadata_size() {
        let data = b"d1:md11:ut_metadatai3eee13:metadata_sizei20000ee";
        assert_eq!(find_ut_metadata(data), Some(3));
        assert_eq!(find_metadata_size(data), Some(20000));
    }
}
