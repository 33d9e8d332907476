use serde::{Deserialize, Serialize};

/// Body of a Feishu event subscription callback. Only the fields this relay
/// reads are modelled; everything is optional because the same endpoint
/// receives URL verification requests and v2 event callbacks.
#[derive(Debug, Deserialize)]
pub struct EventEnvelope {
    pub challenge: Option<String>,
    /// Verification token on URL verification requests.
    pub token: Option<String>,
    #[serde(rename = "type")]
    pub kind: Option<String>,
    pub header: Option<EventHeader>,
    pub event: Option<EventBody>,
}

#[derive(Debug, Deserialize)]
pub struct EventHeader {
    pub event_id: Option<String>,
    pub event_type: Option<String>,
    pub token: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct EventBody {
    pub message: Option<ReceivedMessage>,
}

#[derive(Debug, Deserialize)]
pub struct ReceivedMessage {
    pub chat_id: String,
    pub message_id: Option<String>,
    pub message_type: Option<String>,
    /// JSON document encoded as a string, e.g. `{"text":"..."}`.
    pub content: String,
}

#[derive(Debug, Deserialize)]
pub struct TextContent {
    pub text: String,
}

#[derive(Debug, Serialize)]
pub struct ChallengeResponse {
    pub challenge: String,
}

impl EventEnvelope {
    pub fn verification_token(&self) -> Option<&str> {
        self.header
            .as_ref()
            .and_then(|header| header.token.as_deref())
            .or(self.token.as_deref())
    }

    pub fn event_type(&self) -> Option<&str> {
        self.header
            .as_ref()
            .and_then(|header| header.event_type.as_deref())
    }
}

impl ReceivedMessage {
    /// Text of a plain text message; `None` for any other message type.
    pub fn text(&self) -> Option<String> {
        if matches!(self.message_type.as_deref(), Some(kind) if kind != "text") {
            return None;
        }
        serde_json::from_str::<TextContent>(&self.content)
            .ok()
            .map(|content| content.text)
    }
}
