//! Structured payload encoding for line messages.
//!
//! Payloads are JSON-encoded so that a source name containing delimiter
//! characters can never bleed into the line text, and so that unknown or
//! truncated bytes fail decoding instead of producing a mangled record.

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Errors that can occur while encoding or decoding line payloads.
#[derive(Error, Debug)]
pub enum PayloadError {
    /// Failed to serialize a payload.
    #[error("Encode error: {0}")]
    Encode(String),

    /// Failed to deserialize a payload.
    #[error("Decode error: {0}")]
    Decode(String),
}

/// The payload of one line message.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LinePayload {
    /// Identity of the source the line was read from.
    pub source: String,
    /// 1-indexed line number within the source.
    pub line: i64,
    /// The line text, without its trailing newline.
    pub text: String,
}

impl LinePayload {
    /// Create a payload for one source line.
    pub fn new(source: impl Into<String>, line: i64, text: impl Into<String>) -> Self {
        Self {
            source: source.into(),
            line,
            text: text.into(),
        }
    }

    /// Encode the payload into message bytes.
    pub fn encode(&self) -> Result<Vec<u8>, PayloadError> {
        serde_json::to_vec(self).map_err(|e| PayloadError::Encode(e.to_string()))
    }

    /// Decode message bytes back into a payload.
    pub fn decode(bytes: &[u8]) -> Result<Self, PayloadError> {
        serde_json::from_slice(bytes).map_err(|e| PayloadError::Decode(e.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_round_trip() {
        let payload = LinePayload::new("f.txt", 3, "ccc");
        let bytes = payload.encode().unwrap();
        let decoded = LinePayload::decode(&bytes).unwrap();
        assert_eq!(decoded, payload);
    }

    #[test]
    fn test_delimiters_in_source_name() {
        // A colon-delimited encoding would split this source name apart.
        let payload = LinePayload::new("dir:sub/f:1.txt", 1, "text: with colons");
        let decoded = LinePayload::decode(&payload.encode().unwrap()).unwrap();
        assert_eq!(decoded.source, "dir:sub/f:1.txt");
        assert_eq!(decoded.text, "text: with colons");
    }

    #[test]
    fn test_decode_rejects_garbage() {
        assert!(matches!(
            LinePayload::decode(b"not a payload"),
            Err(PayloadError::Decode(_))
        ));
    }

    #[test]
    fn test_decode_rejects_truncated_bytes() {
        let mut bytes = LinePayload::new("f.txt", 1, "a").encode().unwrap();
        bytes.truncate(bytes.len() / 2);
        assert!(LinePayload::decode(&bytes).is_err());
    }
}
