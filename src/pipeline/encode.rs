//! Request encoding: raw document bytes → `{"base64Source": "..."}`.
//!
//! The analyze endpoint accepts either a URL or inline content; inline content
//! travels as standard (padded) base64 inside the JSON body.

use base64::{engine::general_purpose::STANDARD, Engine as _};
use tracing::debug;

/// Encode a document payload as the analyze request body.
pub fn encode_document(bytes: &[u8]) -> serde_json::Value {
    let b64 = STANDARD.encode(bytes);
    debug!("Encoded {} bytes → {} bytes base64", bytes.len(), b64.len());
    serde_json::json!({ "base64Source": b64 })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn body_has_single_base64_field() {
        let body = encode_document(b"\x89PNG\r\n\x1a\n");
        let obj = body.as_object().expect("object body");
        assert_eq!(obj.len(), 1);
        let b64 = obj["base64Source"].as_str().expect("string field");
        assert_eq!(STANDARD.decode(b64).unwrap(), b"\x89PNG\r\n\x1a\n");
    }

    #[test]
    fn uses_padded_alphabet() {
        let body = encode_document(b"ab");
        assert_eq!(body["base64Source"], "YWI=");
    }
}
