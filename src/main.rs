use axum::Router;
use tetatet::{AppState, auth, chats, db, messages::MessageStore, presence::Presence, realtime, users};
use tokio::sync::broadcast;
use tower_sessions::{Expiry, MemoryStore, SessionManagerLayer, cookie::SameSite};
use tracing::info;
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("tetatet=debug,info")),
        )
        .init();

    let session_store = MemoryStore::default();
    let session_layer = SessionManagerLayer::new(session_store)
        .with_secure(false)
        .with_same_site(SameSite::Lax)
        .with_expiry(Expiry::OnInactivity(time::Duration::days(31)));

    let db_url = dotenv::var("DATABASE_URL").unwrap_or_else(|_| "sqlite://messenger.db".to_owned());
    let db_pool = db::connect(&db_url).await.unwrap();

    let app_state = AppState {
        store: MessageStore::new(db_pool.clone()),
        presence: Presence::new(),
        status_feed: broadcast::channel(64).0,
        db_pool,
    };

    let app = Router::new()
        .merge(auth::router())
        .merge(users::router())
        .merge(chats::router())
        .merge(realtime::router())
        .with_state(app_state)
        .layer(session_layer);

    let addr = dotenv::var("BIND_ADDR").unwrap_or_else(|_| "0.0.0.0:5000".to_owned());
    let listener = tokio::net::TcpListener::bind(&addr).await.unwrap();
    info!("listening on {addr}");
    axum::serve(listener, app).await.unwrap();
}
