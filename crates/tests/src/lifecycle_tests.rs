use std::time::Duration;

use futures::TryStreamExt;
use huddle_db::models::Visibility;
use huddle_services::dao::room::ActiveRoomsFilter;
use huddle_services::{CreateRoomParams, RoomError};

use crate::fixtures::{TestCtx, public_params};

fn temporary_params(name: &str, ttl: chrono::Duration) -> CreateRoomParams {
    CreateRoomParams {
        name: name.to_string(),
        description: None,
        visibility: Visibility::Public,
        join_key: None,
        ttl: Some(ttl),
    }
}

#[tokio::test]
async fn temporary_room_carries_a_deadline() {
    let Some(ctx) = TestCtx::try_new().await else { return };

    let room = ctx
        .coordinator
        .create_room("alice", temporary_params("standup", chrono::Duration::hours(1)))
        .await
        .unwrap()
        .room;

    assert!(room.temporary);
    let deadline = room.expires_at.expect("deadline set");
    assert!(deadline > bson::DateTime::now());

    // Still fully usable before the deadline.
    ctx.coordinator.join(&room.id, "bob", None).await.unwrap();
    ctx.chat.send(&room.id, "bob", "hi").await.unwrap();

    ctx.cleanup().await;
}

#[tokio::test]
async fn expired_room_rejects_joins_and_messages() {
    let Some(ctx) = TestCtx::try_new().await else { return };

    let room = ctx
        .coordinator
        .create_room(
            "alice",
            temporary_params("flash", chrono::Duration::milliseconds(50)),
        )
        .await
        .unwrap()
        .room;
    tokio::time::sleep(Duration::from_millis(120)).await;

    assert!(matches!(
        ctx.coordinator.join(&room.id, "bob", None).await,
        Err(RoomError::ExpiredRoom)
    ));
    assert!(matches!(
        ctx.chat.send(&room.id, "alice", "too late").await,
        Err(RoomError::ExpiredRoom)
    ));

    // The record itself stays readable, untouched by expiry.
    let fetched = ctx.reload(&room.id).await;
    assert_eq!(fetched.members_count, 1);
    assert!(fetched.temporary);

    ctx.cleanup().await;
}

#[tokio::test]
async fn listings_exclude_expired_rooms() {
    let Some(ctx) = TestCtx::try_new().await else { return };

    ctx.coordinator
        .create_room("alice", public_params("evergreen"))
        .await
        .unwrap();
    ctx.coordinator
        .create_room(
            "alice",
            temporary_params("flash", chrono::Duration::milliseconds(50)),
        )
        .await
        .unwrap();
    tokio::time::sleep(Duration::from_millis(120)).await;

    let rooms: Vec<_> = ctx
        .coordinator
        .rooms
        .list_active(ActiveRoomsFilter::default())
        .await
        .unwrap()
        .try_collect()
        .await
        .unwrap();

    assert_eq!(rooms.len(), 1);
    assert_eq!(rooms[0].name, "evergreen");

    ctx.cleanup().await;
}

#[tokio::test]
async fn expired_room_can_still_be_left_and_deleted() {
    let Some(ctx) = TestCtx::try_new().await else { return };

    let room = ctx
        .coordinator
        .create_room(
            "alice",
            temporary_params("flash", chrono::Duration::milliseconds(50)),
        )
        .await
        .unwrap()
        .room;
    ctx.coordinator.join(&room.id, "bob", None).await.unwrap();
    tokio::time::sleep(Duration::from_millis(120)).await;

    ctx.coordinator.leave(&room.id, "bob").await.unwrap();
    assert_eq!(ctx.reload(&room.id).await.members_count, 1);

    ctx.coordinator.delete_room(&room.id, "alice").await.unwrap();
    assert!(matches!(
        ctx.coordinator.get_room(&room.id).await,
        Err(RoomError::RoomNotFound)
    ));

    ctx.cleanup().await;
}
