//! Filename decoding: UTF-8 → GB18030 → a last-resort heuristic.
//!
//! The heuristic step is a pluggable `HeuristicDecode` trait with one
//! default implementation, so a caller can swap in a fuller chardet-style
//! crate without touching the Recorder.

/// A pure `bytes -> text` best-effort decoder, used only after UTF-8 and
/// GB18030 have both failed.
pub trait HeuristicDecode {
    fn decode(&self, bytes: &[u8]) -> Option<String>;
}

/// BOM sniffing (UTF-8 / UTF-16 LE / UTF-16 BE) followed by a lossy UTF-8
/// decode. Does not attempt full single-byte-encoding heuristics.
pub struct DefaultHeuristicDecoder;

impl HeuristicDecode for DefaultHeuristicDecoder {
    fn decode(&self, bytes: &[u8]) -> Option<String> {
        if let Some(rest) = bytes.strip_prefix(&[0xEF, 0xBB, 0xBF]) {
            return std::str::from_utf8(rest).ok().map(str::to_owned);
        }
        if let Some(rest) = bytes.strip_prefix(&[0xFF, 0xFE]) {
            return decode_utf16(rest, true);
        }
        if let Some(rest) = bytes.strip_prefix(&[0xFE, 0xFF]) {
            return decode_utf16(rest, false);
        }
        if bytes.is_empty() {
            return None;
        }
        Some(String::from_utf8_lossy(bytes).into_owned())
    }
}

fn decode_utf16(bytes: &[u8], little_endian: bool) -> Option<String> {
    if bytes.len() % 2 != 0 {
        return None;
    }
    let units: Vec<u16> = bytes
        .chunks_exact(2)
        .map(|c| {
            if little_endian {
                u16::from_le_bytes([c[0], c[1]])
            } else {
                u16::from_be_bytes([c[0], c[1]])
            }
        })
        .collect();
    String::from_utf16(&units).ok()
}

/// UTF-8 → GB18030 → `heuristic`. Returns `None` iff every step failed,
/// which the Recorder treats as "drop the record: a metadata record with
/// an undecodable name is worthless".
pub fn decode_name(bytes: &[u8], heuristic: &dyn HeuristicDecode) -> Option<String> {
    if let Ok(text) = std::str::from_utf8(bytes) {
        return Some(text.to_owned());
    }

    let (text, _, had_errors) = encoding_rs::GB18030.decode(bytes);
    if !had_errors {
        return Some(text.into_owned());
    }

    heuristic.decode(bytes)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn decodes_valid_utf8_directly() {
        assert_eq!(
            decode_name("hello".as_bytes(), &DefaultHeuristicDecoder),
            Some("hello".to_string())
        );
    }

    #[test]
    fn falls_back_to_gb18030_for_chinese_bytes() {
        let (bytes, _, _) = encoding_rs::GB18030.encode("种子");
        let decoded = decode_name(&bytes, &DefaultHeuristicDecoder).unwrap();
        assert_eq!(decoded, "种子");
    }

    #[test]
    fn drops_when_every_step_including_heuristic_fails() {
        struct AlwaysFails;
        impl HeuristicDecode for AlwaysFails {
            fn decode(&self, _bytes: &[u8]) -> Option<String> {
                None
            }
        }
        // Invalid UTF-8 and not valid GB18030 either (lone continuation byte repeated).
        let bytes = [0x80, 0x80, 0x80];
        assert!(decode_name(&bytes, &AlwaysFails).is_none());
    }

    #[test]
    fn default_heuristic_falls_back_to_lossy_utf8() {
        // Same bytes the always-failing heuristic above gives up on: the
        // default heuristic has no stricter obligation and lossy-decodes.
        let bytes = [0x80, 0x80, 0x80];
        assert!(decode_name(&bytes, &DefaultHeuristicDecoder).is_some());
    }
}
