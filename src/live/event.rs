use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::data::chat::Message;
use crate::resp::fail::{ApiError, ErrorCode};

/// Socket events emitted by clients, as `{"event": ..., "data": ...}` JSON
/// frames. Event names are part of the wire contract with the frontend.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "event", content = "data", rename_all = "kebab-case")]
pub enum ClientEvent {
    /// Registers the connection for presence tracking.
    AddUser,
    JoinChat { chat: Uuid },
    LeaveChat { chat: Uuid },
    SendMsg { chat: Uuid, text: String },
}

/// Socket events emitted by the server. `msg-recieve` keeps its historical
/// misspelling; clients match on it literally.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "event", content = "data", rename_all = "kebab-case")]
pub enum ServerEvent {
    #[serde(rename = "msg-recieve")]
    MsgRecieve(MessagePayload),
    Error { msg: String, code: ErrorCode },
}

impl ServerEvent {
    pub fn from_error(e: &ApiError) -> ServerEvent {
        ServerEvent::Error {
            msg: e.msg.clone(),
            code: e.code,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MessagePayload {
    pub id: Uuid,
    pub chat: Uuid,
    pub sender: Uuid,
    pub body: String,
    pub created: DateTime<Utc>,
}

impl From<&Message> for MessagePayload {
    fn from(message: &Message) -> Self {
        MessagePayload {
            id: message.id,
            chat: message.chat,
            sender: message.sender,
            body: message.body.clone(),
            created: message.created,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn client_events_parse_from_wire_names() {
        let chat = Uuid::new_v4();

        let event: ClientEvent = serde_json::from_str(&format!(
            r#"{{"event":"send-msg","data":{{"chat":"{}","text":"hello"}}}}"#,
            chat
        ))
        .unwrap();
        match event {
            ClientEvent::SendMsg { chat: c, text } => {
                assert_eq!(c, chat);
                assert_eq!(text, "hello");
            }
            other => panic!("parsed wrong event: {:?}", other),
        }

        let event: ClientEvent = serde_json::from_str(r#"{"event":"add-user"}"#).unwrap();
        assert!(matches!(event, ClientEvent::AddUser));

        let event: ClientEvent = serde_json::from_str(&format!(
            r#"{{"event":"join-chat","data":{{"chat":"{}"}}}}"#,
            chat
        ))
        .unwrap();
        assert!(matches!(event, ClientEvent::JoinChat { .. }));
    }

    #[test]
    fn message_event_keeps_misspelled_name() {
        let message = Message::new(Uuid::new_v4(), Uuid::new_v4(), "hi");
        let event = ServerEvent::MsgRecieve(MessagePayload::from(&message));

        let wire = serde_json::to_value(&event).unwrap();
        assert_eq!(wire["event"], "msg-recieve");
        assert_eq!(wire["data"]["body"], "hi");
    }

    #[test]
    fn error_event_carries_code() {
        let event = ServerEvent::from_error(&crate::resp::fail::chat_access_denied());
        let wire = serde_json::to_value(&event).unwrap();
        assert_eq!(wire["event"], "error");
        assert_eq!(wire["data"]["code"], "CHAT_ACCESS_DENIED");
    }
}
