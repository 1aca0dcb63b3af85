use axum::{Json, debug_handler, extract::State};
use serde_json::{Value, json};
use sqlx::SqlitePool;
use tower_sessions::Session;
use tracing::info;

use crate::{AppResult, session::USERNAME, users};

use super::{CredentialsQuery, error};

#[debug_handler]
pub(crate) async fn login(
    State(db_pool): State<SqlitePool>,
    session: Session,
    Json(CredentialsQuery { username, password }): Json<CredentialsQuery>,
) -> AppResult<Json<Value>> {
    if username.is_empty() || password.is_empty() {
        return Ok(error("username and password are required"));
    }

    // same answer whether the name or the password was wrong
    let Some(password_hash) = users::password_hash(&db_pool, &username).await? else {
        return Ok(error("wrong username or password"));
    };
    if !bcrypt::verify(&password, &password_hash)? {
        return Ok(error("wrong username or password"));
    }

    session.insert(USERNAME, &username).await?;
    info!("welcome {username}");
    Ok(Json(json!({ "status": "success", "username": username })))
}
