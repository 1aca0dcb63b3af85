use axum::{Json, debug_handler, extract::State, response::{IntoResponse, Response}};
use chrono::{DateTime, Utc};
use serde::Serialize;
use sqlx::SqlitePool;
use tower_sessions::Session;

use crate::{AppResult, messages::MessageStore, presence::Presence, session::USERNAME, users};

#[derive(Debug, Serialize)]
pub struct ChatEntry {
    pub username: String,
    pub online: bool,
    pub unread: i64,
    pub last_seen: Option<DateTime<Utc>>,
}

#[debug_handler(state = crate::AppState)]
pub(crate) async fn get_chats(
    State(db_pool): State<SqlitePool>,
    State(store): State<MessageStore>,
    State(presence): State<Presence>,
    session: Session,
) -> AppResult<Response> {
    let Some(me) = session.get::<String>(USERNAME).await? else {
        return Ok(Json(Vec::<ChatEntry>::new()).into_response());
    };
    Ok(Json(chat_list(&db_pool, &store, &presence, &me).await?).into_response())
}

/// One entry per conversation partner, most unread first, name breaking
/// ties so the ordering is stable across calls.
pub async fn chat_list(
    db_pool: &SqlitePool,
    store: &MessageStore,
    presence: &Presence,
    me: &str,
) -> sqlx::Result<Vec<ChatEntry>> {
    let mut chats = Vec::new();
    for partner in store.partners_of(me).await? {
        let unread = store.unread_count(&partner, me).await?;
        let last_seen = users::last_seen(db_pool, &partner).await?;
        chats.push(ChatEntry {
            online: presence.is_online(&partner),
            unread,
            last_seen,
            username: partner,
        });
    }
    chats.sort_by(|a, b| b.unread.cmp(&a.unread).then_with(|| a.username.cmp(&b.username)));
    Ok(chats)
}
