use huddle_db::models::Visibility;
use huddle_services::RoomError;

use crate::fixtures::TestCtx;

#[tokio::test]
async fn verify_matches_only_the_current_key() {
    let Some(ctx) = TestCtx::try_new().await else { return };
    let room = ctx.private_room("alice", "first-key").await;

    assert!(
        ctx.coordinator
            .credentials
            .verify(&room.id, "first-key")
            .await
            .unwrap()
    );
    assert!(
        !ctx.coordinator
            .credentials
            .verify(&room.id, "not-it")
            .await
            .unwrap()
    );

    ctx.cleanup().await;
}

#[tokio::test]
async fn missing_credential_never_matches_and_never_errors() {
    let Some(ctx) = TestCtx::try_new().await else { return };
    let room = ctx.public_room("alice").await;

    assert!(
        !ctx.coordinator
            .credentials
            .verify(&room.id, "anything")
            .await
            .unwrap()
    );
    assert!(
        !ctx.coordinator
            .credentials
            .verify("no-such-room", "anything")
            .await
            .unwrap()
    );

    ctx.cleanup().await;
}

#[tokio::test]
async fn change_secret_invalidates_the_old_key() {
    let Some(ctx) = TestCtx::try_new().await else { return };
    let room = ctx.private_room("alice", "old-key").await;

    ctx.coordinator
        .change_secret(&room.id, "alice", "new-key")
        .await
        .unwrap();

    assert!(
        !ctx.coordinator
            .credentials
            .verify(&room.id, "old-key")
            .await
            .unwrap()
    );
    assert!(
        ctx.coordinator
            .credentials
            .verify(&room.id, "new-key")
            .await
            .unwrap()
    );

    let old = ctx.coordinator.join(&room.id, "bob", Some("old-key")).await;
    assert!(matches!(old, Err(RoomError::InvalidJoinKey)));
    ctx.coordinator
        .join(&room.id, "bob", Some("new-key"))
        .await
        .unwrap();

    ctx.cleanup().await;
}

#[tokio::test]
async fn change_secret_forces_a_room_private() {
    let Some(ctx) = TestCtx::try_new().await else { return };
    let room = ctx.public_room("alice").await;

    ctx.coordinator
        .change_secret(&room.id, "alice", "s3cr3t")
        .await
        .unwrap();

    let fetched = ctx.reload(&room.id).await;
    assert_eq!(fetched.visibility, Visibility::Private);

    let bare = ctx.coordinator.join(&room.id, "bob", None).await;
    assert!(matches!(bare, Err(RoomError::InvalidJoinKey)));

    ctx.cleanup().await;
}

#[tokio::test]
async fn change_secret_is_creator_only_and_rejects_blanks() {
    let Some(ctx) = TestCtx::try_new().await else { return };
    let room = ctx.private_room("alice", "s3cr3t").await;
    ctx.coordinator
        .join(&room.id, "bob", Some("s3cr3t"))
        .await
        .unwrap();
    ctx.coordinator
        .promote(&room.id, "alice", "bob")
        .await
        .unwrap();

    let denied = ctx
        .coordinator
        .change_secret(&room.id, "bob", "taken-over")
        .await;
    assert!(matches!(denied, Err(RoomError::PermissionDenied)));

    let blank = ctx.coordinator.change_secret(&room.id, "alice", "  ").await;
    assert!(matches!(blank, Err(RoomError::EmptySecret)));

    // The old key is untouched after both rejections.
    assert!(
        ctx.coordinator
            .credentials
            .verify(&room.id, "s3cr3t")
            .await
            .unwrap()
    );

    ctx.cleanup().await;
}
