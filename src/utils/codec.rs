//! Base64 payload helpers

use base64::engine::general_purpose::STANDARD;
use base64::Engine as _;

/// Decode a base64 image payload.
///
/// Accepts a bare base64 string or a `data:<mime>;base64,` URL; ASCII
/// whitespace (line-wrapped payloads) is ignored.
pub fn decode_base64(payload: &str) -> Result<Vec<u8>, base64::DecodeError> {
    let data = strip_data_url(payload.trim());
    let compact: String = data.chars().filter(|c| !c.is_ascii_whitespace()).collect();
    STANDARD.decode(compact)
}

pub fn encode_base64(bytes: &[u8]) -> String {
    STANDARD.encode(bytes)
}

fn strip_data_url(payload: &str) -> &str {
    if payload.starts_with("data:") {
        if let Some((_, data)) = payload.split_once(";base64,") {
            return data;
        }
    }
    payload
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_decode_plain() {
        assert_eq!(decode_base64("aGVsbG8=").unwrap(), b"hello");
    }

    #[test]
    fn test_decode_data_url_and_whitespace() {
        assert_eq!(decode_base64("data:image/png;base64,aGVs\nbG8=\n").unwrap(), b"hello");
    }

    #[test]
    fn test_decode_rejects_garbage() {
        assert!(decode_base64("not-base64!!").is_err());
    }

    #[test]
    fn test_encode() {
        assert_eq!(encode_base64(b"hello"), "aGVsbG8=");
    }
}
