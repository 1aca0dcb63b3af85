use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::messages::Message;

/// What clients push over the socket.
#[derive(Debug, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ClientEvent {
    Join {
        username: String,
    },
    SendMessage {
        sender: String,
        receiver: String,
        #[serde(default)]
        text: String,
        #[serde(default)]
        replied_to: Option<i64>,
    },
    Typing {
        sender: String,
        receiver: String,
    },
    StopTyping {
        sender: String,
        receiver: String,
    },
    MarkReadRealtime {
        sender: String,
        reader: String,
    },
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Status {
    Online,
    Offline,
}

/// What the server pushes back. Names and fields are the wire contract;
/// timestamps serialize as ISO-8601 UTC with a trailing Z.
#[derive(Debug, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ServerEvent {
    NewMessage {
        id: i64,
        sender: String,
        receiver: String,
        text: String,
        is_read: bool,
        timestamp: DateTime<Utc>,
        replied_to: Option<i64>,
        replied_text: Option<String>,
        replied_sender: Option<String>,
    },
    UpdateChatList {
        partner: String,
    },
    DisplayTyping {
        sender: String,
    },
    HideTyping {
        sender: String,
    },
    MessagesRead {
        reader: String,
    },
    UserStatusChange {
        username: String,
        status: Status,
        #[serde(skip_serializing_if = "Option::is_none")]
        last_seen: Option<DateTime<Utc>>,
    },
}

impl ServerEvent {
    pub fn new_message(msg: Message, reply: Option<(String, String)>) -> Self {
        let (replied_text, replied_sender) = match reply {
            Some((text, sender)) => (Some(text), Some(sender)),
            None => (None, None),
        };
        Self::NewMessage {
            id: msg.id,
            sender: msg.sender,
            receiver: msg.receiver,
            text: msg.text,
            is_read: msg.is_read,
            timestamp: msg.timestamp,
            replied_to: msg.replied_to,
            replied_text,
            replied_sender,
        }
    }

    pub fn json(&self) -> String {
        serde_json::to_string(self).unwrap_or_default()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn inbound_events_parse_by_tag() {
        let event: ClientEvent =
            serde_json::from_str(r#"{"type":"join","username":"alice"}"#).unwrap();
        assert!(matches!(event, ClientEvent::Join { username } if username == "alice"));

        let event: ClientEvent = serde_json::from_str(
            r#"{"type":"send_message","sender":"alice","receiver":"bob","text":"hi"}"#,
        )
        .unwrap();
        match event {
            ClientEvent::SendMessage { replied_to, text, .. } => {
                assert_eq!(text, "hi");
                assert_eq!(replied_to, None);
            }
            other => panic!("wrong variant: {other:?}"),
        }
    }

    #[test]
    fn status_change_hides_absent_last_seen() {
        let online = ServerEvent::UserStatusChange {
            username: "alice".to_owned(),
            status: Status::Online,
            last_seen: None,
        }
        .json();
        assert!(online.contains(r#""type":"user_status_change""#));
        assert!(online.contains(r#""status":"online""#));
        assert!(!online.contains("last_seen"));

        let offline = ServerEvent::UserStatusChange {
            username: "alice".to_owned(),
            status: Status::Offline,
            last_seen: Some(chrono::Utc::now()),
        }
        .json();
        assert!(offline.contains(r#""status":"offline""#));
        assert!(offline.contains("last_seen"));
        // trailing Z marker on the wire
        assert!(offline.contains('Z'));
    }
}
