mod login;
mod logout;
mod register;

use axum::{
    Json, Router, debug_handler,
    routing::{get, post},
};
use serde::Deserialize;
use serde_json::{Value, json};
use tower_sessions::Session;

use crate::{AppResult, AppState, session::USERNAME};

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/check_session", get(check_session))
        .route("/register", post(register::register))
        .route("/login", post(login::login))
        .route("/logout", post(logout::logout))
}

#[derive(Deserialize)]
pub(crate) struct CredentialsQuery {
    #[serde(default)]
    pub(crate) username: String,
    #[serde(default)]
    pub(crate) password: String,
}

pub(crate) fn error(message: &str) -> Json<Value> {
    Json(json!({ "status": "error", "message": message }))
}

#[debug_handler]
async fn check_session(session: Session) -> AppResult<Json<Value>> {
    Ok(match session.get::<String>(USERNAME).await? {
        Some(username) => Json(json!({ "status": "logged_in", "username": username })),
        None => Json(json!({ "status": "guest" })),
    })
}
