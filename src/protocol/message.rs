use crate::protocol::error::{ProtocolError, Result};
use serde::{Deserialize, Serialize};

/// Server-pushed broadcast event.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BroadcastEvent {
    pub timestamp: i64,
    pub sequence: i64,
    pub payload: String,
}

/// Client request in RTT mode.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RttRequest {
    pub timestamp: i64,
    pub sequence: i64,
    #[serde(rename = "clientTimestamp")]
    pub client_timestamp: i64,
    pub payload: String,
}

/// Server response in RTT mode, echoing the request it answers.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RttResponse {
    pub timestamp: i64,
    pub sequence: i64,
    #[serde(rename = "clientTimestamp")]
    pub client_timestamp: i64,
    #[serde(rename = "serverTimestamp")]
    pub server_timestamp: i64,
    #[serde(rename = "serverSendTime")]
    pub server_send_time: i64,
    pub payload: String,
}

impl BroadcastEvent {
    pub fn new(timestamp: i64, sequence: i64, payload: String) -> Self {
        Self {
            timestamp,
            sequence,
            payload,
        }
    }
}

impl RttRequest {
    pub fn new(timestamp: i64, sequence: i64, payload: String) -> Self {
        Self {
            timestamp,
            sequence,
            client_timestamp: timestamp,
            payload,
        }
    }
}

impl RttResponse {
    /// Build a response echoing `request`. The client timestamp and payload
    /// carry over unmodified; `server_send_time` defaults to `response_ts`
    /// and is re-sampled right before serialization by the echo path.
    pub fn from_request(request: RttRequest, server_timestamp: i64, response_ts: i64) -> Self {
        Self {
            timestamp: response_ts,
            sequence: request.sequence,
            client_timestamp: request.client_timestamp,
            server_timestamp,
            server_send_time: response_ts,
            payload: request.payload,
        }
    }
}

/// A wire message, one JSON object per WebSocket text frame.
///
/// The `type` field discriminates the variant on the wire.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum Message {
    #[serde(rename = "event")]
    Event(BroadcastEvent),
    #[serde(rename = "request")]
    Request(RttRequest),
    #[serde(rename = "response")]
    Response(RttResponse),
}

#[derive(Deserialize)]
struct Discriminator {
    #[serde(rename = "type")]
    kind: String,
}

impl Message {
    /// Serialize to a single JSON text frame.
    pub fn encode(&self) -> Result<String> {
        serde_json::to_string(self).map_err(ProtocolError::Encoding)
    }

    /// Parse a frame, reading the discriminator first so an unrecognized
    /// `type` is classified separately from a malformed known variant.
    pub fn decode(data: &[u8]) -> Result<Message> {
        let tag: Discriminator = serde_json::from_slice(data).map_err(ProtocolError::Decoding)?;
        match tag.kind.as_str() {
            "event" | "request" | "response" => {
                serde_json::from_slice(data).map_err(ProtocolError::Decoding)
            }
            other => Err(ProtocolError::UnknownMessageType(other.to_string())),
        }
    }
}

/// Deterministic payload of `size` bytes cycling through 'A'..'Z'.
pub fn generate_payload(size: usize) -> String {
    (0..size).map(|i| (b'A' + (i % 26) as u8) as char).collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_event_encode_decode() {
        let original = Message::Event(BroadcastEvent::new(1_000_000, 42, "AB".to_string()));
        let encoded = original.encode().unwrap();
        let decoded = Message::decode(encoded.as_bytes()).unwrap();
        assert_eq!(original, decoded);
    }

    #[test]
    fn test_response_round_trip_preserves_all_fields() {
        let request = RttRequest::new(111, 7, "ABC".to_string());
        let mut response = RttResponse::from_request(request, 222, 333);
        response.server_send_time = 444;

        let encoded = Message::Response(response.clone()).encode().unwrap();
        let decoded = Message::decode(encoded.as_bytes()).unwrap();
        match decoded {
            Message::Response(r) => {
                assert_eq!(r, response);
                assert_eq!(r.client_timestamp, 111);
                assert_eq!(r.server_timestamp, 222);
                assert_eq!(r.server_send_time, 444);
            }
            other => panic!("expected response, got {:?}", other),
        }
    }

    #[test]
    fn test_wire_field_names() {
        let request = RttRequest::new(5, 1, String::new());
        let encoded = Message::Request(request).encode().unwrap();
        assert!(encoded.contains("\"type\":\"request\""));
        assert!(encoded.contains("\"clientTimestamp\""));
        assert!(encoded.contains("\"timestamp\""));
        assert!(encoded.contains("\"sequence\""));
    }

    #[test]
    fn test_decode_unknown_type() {
        let err = Message::decode(br#"{"type":"bogus","timestamp":1}"#).unwrap_err();
        match err {
            ProtocolError::UnknownMessageType(kind) => assert_eq!(kind, "bogus"),
            other => panic!("expected unknown message type, got {}", other),
        }
    }

    #[test]
    fn test_decode_missing_fields() {
        // Recognized discriminator but no required fields.
        let err = Message::decode(br#"{"type":"event"}"#).unwrap_err();
        assert!(matches!(err, ProtocolError::Decoding(_)));
    }

    #[test]
    fn test_decode_malformed_json() {
        let err = Message::decode(b"not json at all").unwrap_err();
        assert!(matches!(err, ProtocolError::Decoding(_)));
    }

    #[test]
    fn test_generate_payload() {
        assert_eq!(generate_payload(0), "");
        assert_eq!(generate_payload(3), "ABC");
        assert_eq!(generate_payload(27).as_bytes()[26], b'A');
        assert_eq!(generate_payload(100).len(), 100);
    }
}
