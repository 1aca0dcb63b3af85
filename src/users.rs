use axum::{Json, Router, debug_handler, extract::State, routing::post};
use chrono::{DateTime, Utc};
use serde::Deserialize;
use sqlx::SqlitePool;
use tower_sessions::Session;

use crate::{AppResult, AppState, session::USERNAME};

pub fn router() -> Router<AppState> {
    Router::new().route("/search_user", post(search_user))
}

#[derive(Deserialize)]
pub(crate) struct SearchQuery {
    #[serde(default)]
    query: String,
}

#[debug_handler]
pub(crate) async fn search_user(
    State(db_pool): State<SqlitePool>,
    session: Session,
    Json(SearchQuery { query }): Json<SearchQuery>,
) -> AppResult<Json<Vec<String>>> {
    if query.is_empty() {
        return Ok(Json(Vec::new()));
    }
    let me = session.get::<String>(USERNAME).await?.unwrap_or_default();
    Ok(Json(search(&db_pool, &query, &me).await?))
}

pub async fn search(db_pool: &SqlitePool, query: &str, exclude: &str) -> sqlx::Result<Vec<String>> {
    let rows: Vec<(String,)> =
        sqlx::query_as("SELECT username FROM users WHERE instr(username, ?) > 0 AND username != ? LIMIT 10")
            .bind(query)
            .bind(exclude)
            .fetch_all(db_pool)
            .await?;
    Ok(rows.into_iter().map(|(username,)| username).collect())
}

pub async fn exists(db_pool: &SqlitePool, username: &str) -> sqlx::Result<bool> {
    Ok(sqlx::query("SELECT 1 FROM users WHERE username=?")
        .bind(username)
        .fetch_optional(db_pool)
        .await?
        .is_some())
}

pub async fn create(db_pool: &SqlitePool, username: &str, password_hash: &str) -> sqlx::Result<()> {
    sqlx::query("INSERT INTO users (username, password_hash) VALUES (?, ?)")
        .bind(username)
        .bind(password_hash)
        .execute(db_pool)
        .await?;
    Ok(())
}

pub async fn password_hash(db_pool: &SqlitePool, username: &str) -> sqlx::Result<Option<String>> {
    Ok(
        sqlx::query_as::<_, (String,)>("SELECT password_hash FROM users WHERE username=?")
            .bind(username)
            .fetch_optional(db_pool)
            .await?
            .map(|(hash,)| hash),
    )
}

/// None both for an unknown user and for one who has never gone offline.
pub async fn last_seen(db_pool: &SqlitePool, username: &str) -> sqlx::Result<Option<DateTime<Utc>>> {
    let row: Option<(Option<DateTime<Utc>>,)> =
        sqlx::query_as("SELECT last_seen FROM users WHERE username=?")
            .bind(username)
            .fetch_optional(db_pool)
            .await?;
    Ok(row.and_then(|(last_seen,)| last_seen))
}

/// Stamps the moment `username` went offline; returns the stamp, or
/// None if no such user record exists.
pub async fn touch_last_seen(
    db_pool: &SqlitePool,
    username: &str,
) -> sqlx::Result<Option<DateTime<Utc>>> {
    let now = Utc::now();
    let result = sqlx::query("UPDATE users SET last_seen=? WHERE username=?")
        .bind(now)
        .bind(username)
        .execute(db_pool)
        .await?;
    Ok((result.rows_affected() > 0).then_some(now))
}
