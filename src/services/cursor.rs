//! Opaque pagination cursors
//!
//! A cursor carries the `seq` of the last item a caller has seen. The token is
//! the 8 big-endian bytes of the sequence followed by a 4-byte SHA-256 prefix,
//! encoded as unpadded URL-safe base64. Anything else fails to decode.

use base64::{Engine as _, engine::general_purpose::URL_SAFE_NO_PAD};
use sha2::{Digest, Sha256};

use super::error::CatalogError;

const SEQ_LEN: usize = 8;
const CHECKSUM_LEN: usize = 4;

fn checksum(seq_bytes: &[u8]) -> [u8; CHECKSUM_LEN] {
    let digest = Sha256::digest(seq_bytes);
    let mut out = [0u8; CHECKSUM_LEN];
    out.copy_from_slice(&digest[..CHECKSUM_LEN]);
    out
}

/// Encode a sequence position as a cursor string
pub fn encode_cursor(seq: i64) -> String {
    let seq_bytes = seq.to_be_bytes();
    let mut payload = Vec::with_capacity(SEQ_LEN + CHECKSUM_LEN);
    payload.extend_from_slice(&seq_bytes);
    payload.extend_from_slice(&checksum(&seq_bytes));
    URL_SAFE_NO_PAD.encode(payload)
}

/// Decode a cursor string back to the sequence position it was made from
pub fn decode_cursor(cursor: &str) -> Result<i64, CatalogError> {
    let payload = URL_SAFE_NO_PAD
        .decode(cursor)
        .map_err(|_| CatalogError::MalformedCursor)?;

    if payload.len() != SEQ_LEN + CHECKSUM_LEN {
        return Err(CatalogError::MalformedCursor);
    }

    let (seq_bytes, sum) = payload.split_at(SEQ_LEN);
    if sum != checksum(seq_bytes) {
        return Err(CatalogError::MalformedCursor);
    }

    let mut buf = [0u8; SEQ_LEN];
    buf.copy_from_slice(seq_bytes);
    Ok(i64::from_be_bytes(buf))
}

#[cfg(test)]
mod tests {
    use super::*;
    use assert_matches::assert_matches;

    #[test]
    fn test_cursor_roundtrip() {
        for seq in [0, 1, 2, 100, 999_999, i64::MAX, -1, i64::MIN] {
            let cursor = encode_cursor(seq);
            assert_eq!(decode_cursor(&cursor).unwrap(), seq);
        }
    }

    #[test]
    fn test_cursor_is_url_safe() {
        let cursor = encode_cursor(i64::MAX);
        assert_eq!(cursor.len(), 16);
        assert!(
            cursor
                .chars()
                .all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_')
        );
    }

    #[test]
    fn test_distinct_positions_give_distinct_cursors() {
        let cursors: std::collections::HashSet<_> = (0..500).map(encode_cursor).collect();
        assert_eq!(cursors.len(), 500);
    }

    #[test]
    fn test_tampered_cursor_is_rejected() {
        let cursor = encode_cursor(42);
        for i in 0..cursor.len() {
            let mut chars: Vec<char> = cursor.chars().collect();
            chars[i] = if chars[i] == 'A' { 'B' } else { 'A' };
            let tampered: String = chars.into_iter().collect();
            assert_matches!(decode_cursor(&tampered), Err(CatalogError::MalformedCursor));
        }
    }

    #[test]
    fn test_garbage_is_rejected() {
        assert_matches!(decode_cursor(""), Err(CatalogError::MalformedCursor));
        assert_matches!(decode_cursor("not a cursor!"), Err(CatalogError::MalformedCursor));
        // Valid base64 of the wrong shape
        assert_matches!(decode_cursor("Y3Vyc29yOjEw"), Err(CatalogError::MalformedCursor));
        // A raw timestamp is not a cursor either
        assert_matches!(
            decode_cursor("2024-01-15T10:30:45Z"),
            Err(CatalogError::MalformedCursor)
        );
    }
}
