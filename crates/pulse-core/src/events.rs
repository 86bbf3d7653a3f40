use serde::{Deserialize, Serialize};

/// Event frames pushed to session-protocol clients.
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum ServerEvent {
    /// Directed welcome or broadcast announcement.
    #[serde(rename = "message")]
    Message { data: String },

    /// Periodic broadcaster tick carrying the shared counter.
    #[serde(rename = "update")]
    Update { counter: u64, timestamp: String },
}

impl ServerEvent {
    /// Serialize the event to a JSON text frame.
    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string(self)
    }
}

/// Event frames accepted from session-protocol clients.
///
/// Dispatched through an explicit `match`; frames with an unknown tag
/// fail to parse and are dropped by the caller.
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum ClientEvent {
    /// Accepted and ignored; reserved for future command handling.
    #[serde(rename = "test_message")]
    TestMessage {
        #[serde(default)]
        data: Option<serde_json::Value>,
    },
}

/// Response object sent for every inbound text frame on the echo endpoint.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct EchoReply {
    pub message: String,
    pub timestamp: String,
    pub service: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn message_serialization() {
        let event = ServerEvent::Message {
            data: "Welcome to the server - conn_1".to_string(),
        };
        let json = event.to_json().unwrap();
        assert!(json.contains("\"type\":\"message\""));
        assert!(json.contains("\"data\":\"Welcome to the server - conn_1\""));
    }

    #[test]
    fn update_serialization() {
        let event = ServerEvent::Update {
            counter: 7,
            timestamp: "2026-08-07 12:00:00".to_string(),
        };
        let json = event.to_json().unwrap();
        assert!(json.contains("\"type\":\"update\""));
        assert!(json.contains("\"counter\":7"));
        assert!(json.contains("\"timestamp\":\"2026-08-07 12:00:00\""));
    }

    #[test]
    fn test_message_parses_with_payload() {
        let frame = r#"{"type":"test_message","data":{"message":"hi"}}"#;
        let event: ClientEvent = serde_json::from_str(frame).unwrap();
        let ClientEvent::TestMessage { data } = event;
        assert_eq!(data.unwrap()["message"], "hi");
    }

    #[test]
    fn test_message_parses_without_payload() {
        let frame = r#"{"type":"test_message"}"#;
        let event: ClientEvent = serde_json::from_str(frame).unwrap();
        let ClientEvent::TestMessage { data } = event;
        assert!(data.is_none());
    }

    #[test]
    fn unknown_event_kind_fails_to_parse() {
        let frame = r#"{"type":"no_such_event","data":1}"#;
        assert!(serde_json::from_str::<ClientEvent>(frame).is_err());
    }

    #[test]
    fn non_object_frame_fails_to_parse() {
        assert!(serde_json::from_str::<ClientEvent>("[1,2,3]").is_err());
        assert!(serde_json::from_str::<ClientEvent>("not json").is_err());
    }

    #[test]
    fn echo_reply_wire_shape() {
        let reply = EchoReply {
            message: "Echo: ping".to_string(),
            timestamp: "2026-08-07T12:00:00Z".to_string(),
            service: "pulse-server".to_string(),
        };
        let json = serde_json::to_string(&reply).unwrap();
        let parsed: serde_json::Value = serde_json::from_str(&json).unwrap();
        assert_eq!(parsed["message"], "Echo: ping");
        assert_eq!(parsed["service"], "pulse-server");
        assert!(parsed["timestamp"].is_string());
    }
}
