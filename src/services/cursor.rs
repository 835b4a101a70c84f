use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use base64::Engine as _;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Opaque keyset cursor for the discovery feed, ordered by
/// (start_time ASC, id ASC).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ClassCursor {
    pub start_time: DateTime<Utc>,
    pub id: Uuid,
}

pub fn encode(cursor: &ClassCursor) -> String {
    // serializing a two-field struct cannot fail
    let bytes = serde_json::to_vec(cursor).unwrap_or_default();
    URL_SAFE_NO_PAD.encode(bytes)
}

pub fn decode(raw: &str) -> Option<ClassCursor> {
    let bytes = URL_SAFE_NO_PAD.decode(raw).ok()?;
    serde_json::from_slice(&bytes).ok()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn round_trips() {
        let cursor = ClassCursor {
            start_time: "2026-06-01T18:00:00Z".parse().unwrap(),
            id: Uuid::new_v4(),
        };
        assert_eq!(decode(&encode(&cursor)), Some(cursor));
    }

    #[test]
    fn garbage_is_rejected() {
        assert_eq!(decode("not-a-cursor"), None);
        assert_eq!(decode(""), None);
        let tampered = URL_SAFE_NO_PAD.encode(b"{\"start_time\":42}");
        assert_eq!(decode(&tampered), None);
    }

    #[test]
    fn cursor_is_url_safe() {
        let cursor = ClassCursor {
            start_time: Utc::now(),
            id: Uuid::new_v4(),
        };
        let encoded = encode(&cursor);
        assert!(!encoded.contains('+') && !encoded.contains('/') && !encoded.contains('='));
    }
}
