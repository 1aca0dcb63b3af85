mod events;

pub use events::{ClientEvent, ServerEvent, Status};

use axum::{
    Router, debug_handler,
    extract::{State, WebSocketUpgrade, ws::WebSocket},
    response::IntoResponse,
    routing::get,
};
use futures_util::{SinkExt, StreamExt};
use tokio::sync::mpsc;
use tracing::{info, warn};

use crate::{AppState, presence::ConnId, users};

pub fn router() -> Router<AppState> {
    Router::new().route("/ws", get(chat_ws))
}

#[debug_handler]
async fn chat_ws(State(state): State<AppState>, ws: WebSocketUpgrade) -> impl IntoResponse {
    ws.on_upgrade(async move |stream| socket_loop(state, stream).await)
}

async fn socket_loop(state: AppState, stream: WebSocket) {
    let (mut sender, mut receiver) = stream.split();
    let conn = ConnId::next();
    let (tx, mut rx) = mpsc::unbounded_channel::<String>();
    let mut status_feed = state.status_feed.subscribe();

    // one pump per socket: targeted deliveries plus the presence feed
    let send_task = tokio::spawn(async move {
        loop {
            let frame = tokio::select! {
                Some(payload) = rx.recv() => payload,
                Ok(payload) = status_feed.recv() => payload,
                else => break,
            };
            if sender.send(frame.into()).await.is_err() {
                break;
            }
        }
    });

    while let Some(Ok(frame)) = receiver.next().await {
        let Ok(event) = serde_json::from_slice::<ClientEvent>(&frame.into_data()) else {
            continue;
        };

        // the socket has no reply channel, so a bad event is dropped
        if let Err(err) = dispatch(&state, conn, &tx, event).await {
            warn!("dropping event: {err:#}");
        }
    }

    // a leave miss here means a newer join already took the handle over
    if let Some(username) = state.presence.leave(conn) {
        match users::touch_last_seen(&state.db_pool, &username).await {
            Ok(Some(last_seen)) => {
                info!("{username} went offline");
                let _ = state.status_feed.send(
                    ServerEvent::UserStatusChange {
                        username,
                        status: Status::Offline,
                        last_seen: Some(last_seen),
                    }
                    .json(),
                );
            }
            Ok(None) => {}
            Err(err) => warn!("last_seen update for {username} failed: {err}"),
        }
    }

    send_task.abort();
}

async fn dispatch(
    state: &AppState,
    conn: ConnId,
    tx: &mpsc::UnboundedSender<String>,
    event: ClientEvent,
) -> anyhow::Result<()> {
    match event {
        ClientEvent::Join { username } => {
            if username.is_empty() {
                anyhow::bail!("join without a username");
            }
            state.presence.join(&username, conn, tx.clone());
            info!("{username} joined");
            let _ = state.status_feed.send(
                ServerEvent::UserStatusChange {
                    username,
                    status: Status::Online,
                    last_seen: None,
                }
                .json(),
            );
        }
        ClientEvent::SendMessage { sender, receiver, text, replied_to } => {
            let msg = state.store.append(&sender, &receiver, &text, replied_to).await?;
            let reply = match msg.replied_to {
                Some(id) => state.store.resolve_reply(id).await?,
                None => None,
            };

            let payload = ServerEvent::new_message(msg, reply).json();
            // both ends, so the sender's own open chat updates too
            state.presence.deliver(&receiver, &payload);
            state.presence.deliver(&sender, &payload);
            state
                .presence
                .deliver(&receiver, &ServerEvent::UpdateChatList { partner: sender }.json());
        }
        ClientEvent::Typing { sender, receiver } => {
            state
                .presence
                .deliver(&receiver, &ServerEvent::DisplayTyping { sender }.json());
        }
        ClientEvent::StopTyping { sender, receiver } => {
            state
                .presence
                .deliver(&receiver, &ServerEvent::HideTyping { sender }.json());
        }
        ClientEvent::MarkReadRealtime { sender, reader } => {
            state.store.mark_read(&sender, &reader).await?;
            state
                .presence
                .deliver(&sender, &ServerEvent::MessagesRead { reader }.json());
        }
    }
    Ok(())
}
