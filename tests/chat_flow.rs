//! Offline send → join → chat list → history read-receipt flow, driven
//! at the component level over an in-memory database.

use sqlx::sqlite::SqlitePoolOptions;
use tetatet::{
    chats,
    db,
    messages::MessageStore,
    presence::{ConnId, Presence},
    users,
};
use tokio::sync::mpsc;

#[tokio::test]
async fn offline_message_is_recovered_and_read() -> anyhow::Result<()> {
    let pool = SqlitePoolOptions::new()
        .max_connections(1)
        .connect("sqlite::memory:")
        .await?;
    db::init(&pool).await?;
    let store = MessageStore::new(pool.clone());
    let presence = Presence::new();

    users::create(&pool, "alice", "hash").await?;
    users::create(&pool, "bob", "hash").await?;

    // alice is connected, bob is not
    let (alice_tx, mut alice_rx) = mpsc::unbounded_channel();
    presence.join("alice", ConnId::next(), alice_tx);
    assert!(!presence.is_online("bob"));

    // alice sends while bob is offline: persisted, nothing queued for him
    let msg = store.append("alice", "bob", "hi", None).await?;
    assert!(!msg.is_read);

    // bob comes online and pulls his chat list
    let (bob_tx, _bob_rx) = mpsc::unbounded_channel();
    presence.join("bob", ConnId::next(), bob_tx);

    let bobs_chats = chats::chat_list(&pool, &store, &presence, "bob").await?;
    assert_eq!(bobs_chats.len(), 1);
    assert_eq!(bobs_chats[0].username, "alice");
    assert_eq!(bobs_chats[0].unread, 1);
    assert!(bobs_chats[0].online);

    // opening the history flips the message and owes alice a receipt
    let (view, receipt) = chats::conversation_view(&pool, &store, &presence, "bob", "alice").await?;
    assert_eq!(view.messages.len(), 1);
    assert!(view.messages[0].is_read);
    assert!(view.partner_status.online);

    let receipt = receipt.expect("first read produces a receipt");
    presence.deliver("alice", &receipt.json());
    let delivered = alice_rx.recv().await.expect("alice gets the receipt");
    assert!(delivered.contains(r#""type":"messages_read""#));
    assert!(delivered.contains(r#""reader":"bob""#));

    // a second view marks nothing further and owes nothing
    let (view, receipt) = chats::conversation_view(&pool, &store, &presence, "bob", "alice").await?;
    assert!(receipt.is_none());
    assert_eq!(view.messages.len(), 1);

    // bob's list is clean now
    let bobs_chats = chats::chat_list(&pool, &store, &presence, "bob").await?;
    assert_eq!(bobs_chats[0].unread, 0);

    Ok(())
}
