use std::time::Duration;

use huddle_services::{RoomError, RoomEvent, UpdateRoomParams};

use crate::fixtures::TestCtx;

#[tokio::test]
async fn send_requires_an_existing_room_and_membership() {
    let Some(ctx) = TestCtx::try_new().await else { return };
    let room = ctx.public_room("alice").await;

    assert!(matches!(
        ctx.chat.send("ZZZZZZ", "alice", "hello").await,
        Err(RoomError::RoomNotFound)
    ));
    assert!(matches!(
        ctx.chat.send(&room.id, "stranger", "hello").await,
        Err(RoomError::NotMember)
    ));

    ctx.cleanup().await;
}

#[tokio::test]
async fn blank_messages_are_dropped_silently() {
    let Some(ctx) = TestCtx::try_new().await else { return };
    let room = ctx.public_room("alice").await;

    ctx.chat.send(&room.id, "alice", "   ").await.unwrap();
    ctx.chat.send(&room.id, "alice", "").await.unwrap();

    let sub = ctx.chat.subscribe(&room.id).await.unwrap();
    assert!(sub.backlog.is_empty());

    ctx.cleanup().await;
}

#[tokio::test]
async fn backlog_is_oldest_first() {
    let Some(ctx) = TestCtx::try_new().await else { return };
    let room = ctx.public_room("alice").await;
    ctx.coordinator.join(&room.id, "bob", None).await.unwrap();

    ctx.chat.send(&room.id, "alice", "one").await.unwrap();
    tokio::time::sleep(Duration::from_millis(5)).await;
    ctx.chat.send(&room.id, "bob", "two").await.unwrap();
    tokio::time::sleep(Duration::from_millis(5)).await;
    ctx.chat.send(&room.id, "alice", "three").await.unwrap();

    let sub = ctx.chat.subscribe(&room.id).await.unwrap();
    let texts: Vec<_> = sub.backlog.iter().map(|m| m.text.as_str()).collect();
    assert_eq!(texts, vec!["one", "two", "three"]);
    assert_eq!(sub.backlog[1].sender_id, "bob");
    assert!(sub.backlog[0].created_at <= sub.backlog[1].created_at);

    ctx.cleanup().await;
}

#[tokio::test]
async fn live_feed_delivers_new_messages() {
    let Some(ctx) = TestCtx::try_new().await else { return };
    let room = ctx.public_room("alice").await;

    let mut sub = ctx.chat.subscribe(&room.id).await.unwrap();
    assert!(sub.backlog.is_empty());

    ctx.chat.send(&room.id, "alice", "ping").await.unwrap();

    let message = sub.live.recv().await.unwrap();
    assert_eq!(message.text, "ping");
    assert_eq!(message.room_id, room.id);

    ctx.cleanup().await;
}

#[tokio::test]
async fn subscribe_to_unknown_room_is_not_found() {
    let Some(ctx) = TestCtx::try_new().await else { return };

    assert!(matches!(
        ctx.chat.subscribe("ZZZZZZ").await,
        Err(RoomError::RoomNotFound)
    ));

    ctx.cleanup().await;
}

#[tokio::test]
async fn room_feed_reports_the_full_lifecycle() {
    let Some(ctx) = TestCtx::try_new().await else { return };
    let mut feed = ctx.coordinator.subscribe_rooms();

    let room = ctx.public_room("alice").await;
    ctx.coordinator
        .update_room(
            &room.id,
            "alice",
            UpdateRoomParams {
                name: Some("renamed".to_string()),
                ..Default::default()
            },
        )
        .await
        .unwrap();
    ctx.coordinator.delete_room(&room.id, "alice").await.unwrap();

    match feed.recv().await.unwrap() {
        RoomEvent::Created(created) => assert_eq!(created.id, room.id),
        other => panic!("expected Created, got {other:?}"),
    }
    match feed.recv().await.unwrap() {
        RoomEvent::Updated(updated) => assert_eq!(updated.name, "renamed"),
        other => panic!("expected Updated, got {other:?}"),
    }
    match feed.recv().await.unwrap() {
        RoomEvent::Deleted { room_id } => assert_eq!(room_id, room.id),
        other => panic!("expected Deleted, got {other:?}"),
    }

    ctx.cleanup().await;
}
