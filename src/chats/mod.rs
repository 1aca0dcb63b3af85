mod history;
mod list;

pub use history::{ConversationView, HistoryMessage, PartnerStatus, conversation_view};
pub use list::{ChatEntry, chat_list};

use axum::{
    Router,
    routing::{get, post},
};

use crate::AppState;

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/get_chats", get(list::get_chats))
        .route("/get_history", post(history::get_history))
}
