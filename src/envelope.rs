use base64::engine::general_purpose::{STANDARD, STANDARD_NO_PAD, URL_SAFE, URL_SAFE_NO_PAD};
use base64::Engine;
use serde_json::{json, Value};

use crate::error::ProtocolError;

/// Envelope types persisted to the message log and re-sequenced before
/// fan-out.
pub const PERSISTED_TYPES: &[&str] = &["MSG", "IMG_META", "IMG_CHUNK", "IMG_END"];

pub fn is_persisted_type(t: &str) -> bool {
    PERSISTED_TYPES.contains(&t)
}

/// Tries all four base64 alphabets a client might use (standard, raw
/// standard, URL-safe, raw URL-safe). Returns the first alphabet that
/// decodes successfully.
pub fn decode_lenient(s: &str) -> Option<Vec<u8>> {
    STANDARD
        .decode(s)
        .or_else(|_| STANDARD_NO_PAD.decode(s))
        .or_else(|_| URL_SAFE.decode(s))
        .or_else(|_| URL_SAFE_NO_PAD.decode(s))
        .ok()
}

/// Always emits the standard (padded) alphabet on egress, regardless of
/// which alphabet the client used on ingress.
pub fn encode_standard(bytes: &[u8]) -> String {
    STANDARD.encode(bytes)
}

/// Pulls `nonce`/`ciphertext` out of a persisted-type payload, accepting
/// either the compact (`n`/`c`) or long-form (`nonce`/`ciphertext`) field
/// names and decoding leniently. Fails with [`ProtocolError`] describing
/// exactly which field was missing or unparseable — the caller turns this
/// into a per-sender `ERROR` frame without closing the connection.
pub fn extract_nonce_ciphertext(d: &Value) -> Result<(Vec<u8>, Vec<u8>), ProtocolError> {
    let n = d
        .get("n")
        .or_else(|| d.get("nonce"))
        .and_then(Value::as_str)
        .ok_or(ProtocolError::MissingField("n"))?;
    let c = d
        .get("c")
        .or_else(|| d.get("ciphertext"))
        .and_then(Value::as_str)
        .ok_or(ProtocolError::MissingField("c"))?;

    let nonce = decode_lenient(n).ok_or(ProtocolError::InvalidBase64("n"))?;
    let ciphertext = decode_lenient(c).ok_or(ProtocolError::InvalidBase64("c"))?;
    Ok((nonce, ciphertext))
}

/// Builds the outgoing envelope for a persisted type, with `seq` rewritten
/// to the server-assigned value — never the value the client proposed.
pub fn build_persisted_envelope(message_type: &str, seq: i64, nonce: &[u8], ciphertext: &[u8]) -> Value {
    json!({
        "t": message_type,
        "d": {
            "v": 1,
            "seq": seq,
            "n": encode_standard(nonce),
            "c": encode_standard(ciphertext),
        }
    })
}

/// Builds the `ERROR` frame sent to a single offending sender.
pub fn build_error_envelope(code: &str, message: &str) -> Value {
    json!({ "t": "ERROR", "d": { "code": code, "message": message } })
}
