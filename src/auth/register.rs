use axum::{Json, debug_handler, extract::State};
use serde_json::{Value, json};
use sqlx::SqlitePool;
use tower_sessions::Session;
use tracing::info;

use crate::{AppResult, session::USERNAME, users};

use super::{CredentialsQuery, error};

#[debug_handler]
pub(crate) async fn register(
    State(db_pool): State<SqlitePool>,
    session: Session,
    Json(CredentialsQuery { username, password }): Json<CredentialsQuery>,
) -> AppResult<Json<Value>> {
    if username.is_empty() || password.is_empty() {
        return Ok(error("username and password are required"));
    }
    if users::exists(&db_pool, &username).await? {
        return Ok(error("username is taken"));
    }

    let password_hash = bcrypt::hash(&password, bcrypt::DEFAULT_COST)?;
    users::create(&db_pool, &username, &password_hash).await?;
    info!("registered {username}");

    session.insert(USERNAME, &username).await?;
    Ok(Json(json!({ "status": "success", "username": username })))
}
