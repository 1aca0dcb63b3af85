use axum::{Json, debug_handler, extract::State, response::{IntoResponse, Response}};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::SqlitePool;
use tower_sessions::Session;

use crate::{
    AppResult, messages::MessageStore, presence::Presence, realtime::ServerEvent,
    session::USERNAME, users,
};

#[derive(Deserialize)]
pub(crate) struct HistoryQuery {
    #[serde(default)]
    partner: String,
}

#[derive(Debug, Default, Serialize)]
pub struct ConversationView {
    pub messages: Vec<HistoryMessage>,
    pub partner_status: PartnerStatus,
}

#[derive(Debug, Serialize)]
pub struct HistoryMessage {
    pub id: i64,
    pub sender: String,
    pub text: String,
    pub timestamp: DateTime<Utc>,
    pub is_read: bool,
    pub replied_to: Option<i64>,
    pub replied_text: Option<String>,
    pub replied_sender: Option<String>,
}

#[derive(Debug, Default, Serialize)]
pub struct PartnerStatus {
    pub online: bool,
    pub last_seen: Option<DateTime<Utc>>,
}

#[debug_handler(state = crate::AppState)]
pub(crate) async fn get_history(
    State(db_pool): State<SqlitePool>,
    State(store): State<MessageStore>,
    State(presence): State<Presence>,
    session: Session,
    Json(HistoryQuery { partner }): Json<HistoryQuery>,
) -> AppResult<Response> {
    let me = session.get::<String>(USERNAME).await?;
    let Some(me) = me.filter(|_| !partner.is_empty()) else {
        return Ok(Json(ConversationView::default()).into_response());
    };

    let (view, receipt) = conversation_view(&db_pool, &store, &presence, &me, &partner).await?;
    if let Some(receipt) = receipt {
        // the read receipt rides the socket even though history came over http
        presence.deliver(&partner, &receipt.json());
    }
    Ok(Json(view).into_response())
}

/// Read side of one conversation: flips the caller's unread messages to
/// read, then returns the whole thread with reply metadata resolved and
/// the partner's status. The returned event, if any, is the
/// `messages_read` receipt the caller owes the partner's delivery group;
/// emitting it is left to the caller so this stays transport-free.
/// Calling again with nothing new marks nothing and returns no event.
pub async fn conversation_view(
    db_pool: &SqlitePool,
    store: &MessageStore,
    presence: &Presence,
    me: &str,
    partner: &str,
) -> sqlx::Result<(ConversationView, Option<ServerEvent>)> {
    let marked = store.mark_read(partner, me).await?;
    let receipt = (marked > 0).then(|| ServerEvent::MessagesRead { reader: me.to_owned() });

    let mut messages = Vec::new();
    for msg in store.conversation(me, partner).await? {
        let reply = match msg.replied_to {
            Some(id) => store.resolve_reply(id).await?,
            None => None,
        };
        let (replied_text, replied_sender) = match reply {
            Some((text, sender)) => (Some(text), Some(sender)),
            None => (None, None),
        };
        messages.push(HistoryMessage {
            id: msg.id,
            sender: msg.sender,
            text: msg.text,
            timestamp: msg.timestamp,
            is_read: msg.is_read,
            replied_to: msg.replied_to,
            replied_text,
            replied_sender,
        });
    }

    let partner_status = PartnerStatus {
        online: presence.is_online(partner),
        last_seen: users::last_seen(db_pool, partner).await?,
    };

    Ok((ConversationView { messages, partner_status }, receipt))
}
