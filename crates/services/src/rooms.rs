use std::sync::Arc;

use bson::{DateTime, doc};
use chrono::Duration;
use futures::future::BoxFuture;
use huddle_config::RoomSettings;
use huddle_db::models::{MemberRole, Membership, Room, Visibility};
use mongodb::error::{TRANSIENT_TRANSACTION_ERROR, UNKNOWN_TRANSACTION_COMMIT_RESULT};
use mongodb::{Client, ClientSession, Database};
use rand::Rng;
use tracing::{info, warn};
use validator::Validate;

use crate::dao::base::DaoError;
use crate::dao::{CredentialDao, MembershipDao, MessageDao, RoomDao};
use crate::error::{RoomError, RoomResult};
use crate::events::{EventBus, RoomEvent};
use crate::expiry;

/// How many fresh codes to try when room creation collides on `_id`.
const CODE_COLLISION_ATTEMPTS: u32 = 8;

/// Serializes multi-document membership changes. Every operation reads the
/// current room (and credential) state inside a store transaction, validates
/// against that freshly read state, and only then writes; conflicting
/// concurrent transactions are re-run within the configured retry budget.
pub struct RoomCoordinator {
    client: Client,
    pub rooms: RoomDao,
    pub memberships: MembershipDao,
    pub credentials: CredentialDao,
    pub messages: MessageDao,
    events: Arc<EventBus>,
    settings: RoomSettings,
}

#[derive(Debug, Clone, Validate)]
pub struct CreateRoomParams {
    #[validate(length(min = 1, max = 64))]
    pub name: String,
    #[validate(length(max = 500))]
    pub description: Option<String>,
    pub visibility: Visibility,
    /// Join secret for a private room. Generated when absent.
    pub join_key: Option<String>,
    /// Lifetime for a temporary room; fixed at creation, no extensions.
    pub ttl: Option<Duration>,
}

#[derive(Debug, Default, Clone, Validate)]
pub struct UpdateRoomParams {
    #[validate(length(min = 1, max = 64))]
    pub name: Option<String>,
    #[validate(length(max = 500))]
    pub description: Option<String>,
}

/// Creation result. `join_key` is populated exactly once, when the secret
/// was generated server-side; it is not retrievable afterwards.
#[derive(Debug, Clone)]
pub struct CreatedRoom {
    pub room: Room,
    pub join_key: Option<String>,
}

impl RoomCoordinator {
    pub fn new(db: &Database, events: Arc<EventBus>, settings: RoomSettings) -> Self {
        Self {
            client: db.client().clone(),
            rooms: RoomDao::new(db, settings.code_length),
            memberships: MembershipDao::new(db),
            credentials: CredentialDao::new(db),
            messages: MessageDao::new(db),
            events,
            settings,
        }
    }

    // ── Registry reads ──────────────────────────────────────────

    /// Returns the room even when expired; expiry gates writes and
    /// listings, not lookups.
    pub async fn get_room(&self, room_id: &str) -> RoomResult<Room> {
        self.rooms
            .try_get(room_id)
            .await?
            .ok_or(RoomError::RoomNotFound)
    }

    pub fn subscribe_rooms(&self) -> tokio::sync::broadcast::Receiver<RoomEvent> {
        self.events.subscribe_rooms()
    }

    // ── Creation ────────────────────────────────────────────────

    /// Creates the room, the creator's admin membership and (for private
    /// rooms) the credential in one atomic commit. Retries with a fresh
    /// code on `_id` collision.
    pub async fn create_room(
        &self,
        creator_id: &str,
        params: CreateRoomParams,
    ) -> RoomResult<CreatedRoom> {
        params
            .validate()
            .map_err(|e| DaoError::Validation(e.to_string()))?;

        let mut generated_key = None;
        let join_key: Option<String> = match params.visibility {
            Visibility::Public => None,
            Visibility::Private => match params.join_key.clone() {
                Some(key) => {
                    if key.trim().is_empty() {
                        return Err(RoomError::EmptySecret);
                    }
                    Some(key)
                }
                None => {
                    let key = generate_join_key(self.settings.join_key_length);
                    generated_key = Some(key.clone());
                    Some(key)
                }
            },
        };

        let now = DateTime::now();
        let expires_at = params
            .ttl
            .map(|ttl| DateTime::from_millis(now.timestamp_millis() + ttl.num_milliseconds()));

        for _ in 0..CODE_COLLISION_ATTEMPTS {
            let room = Room {
                id: self.rooms.new_code(),
                name: params.name.clone(),
                description: params.description.clone(),
                visibility: params.visibility,
                creator_id: creator_id.to_string(),
                admins: vec![creator_id.to_string()],
                members: vec![creator_id.to_string()],
                members_count: 1,
                temporary: params.ttl.is_some(),
                expires_at,
                created_at: now,
                updated_at: now,
            };
            let creator_membership = membership(&room.id, creator_id, MemberRole::Admin, now);

            let result = self
                .run_transaction(
                    &(&room, &creator_membership, join_key.as_deref(), creator_id),
                    |this, session, ctx| {
                        Box::pin(async move {
                            let &(room, creator_membership, join_key, creator_id) = ctx;
                            this.rooms.base.insert_one_session(room, session).await?;
                            this.memberships
                                .base
                                .insert_one_session(creator_membership, session)
                                .await?;
                            if let Some(key) = join_key {
                                this.credentials
                                    .set_session(session, &room.id, key, creator_id)
                                    .await?;
                            }
                            Ok(())
                        })
                    },
                )
                .await;

            match result {
                Ok(()) => {
                    info!(room_id = %room.id, visibility = room.visibility.as_str(), "Room created");
                    self.events.publish_room(RoomEvent::Created(room.clone()));
                    return Ok(CreatedRoom {
                        room,
                        join_key: generated_key,
                    });
                }
                // Another room drew the same code; try again with a new one.
                Err(RoomError::Store(DaoError::DuplicateKey(_))) => continue,
                Err(e) => return Err(e),
            }
        }

        warn!("Room code generation exhausted its collision retries");
        Err(RoomError::TransactionFailed)
    }

    // ── Membership transitions ──────────────────────────────────

    /// Idempotent join. For private rooms the supplied key must verify
    /// against the stored digest read in the same transaction.
    pub async fn join(
        &self,
        room_id: &str,
        user_id: &str,
        join_key: Option<&str>,
    ) -> RoomResult<()> {
        self.run_transaction(&(room_id, user_id, join_key), |this, session, ctx| {
            Box::pin(async move {
                let &(room_id, user_id, join_key) = ctx;
                let room = this.room_in_txn(session, room_id).await?;
                expiry::ensure_active(&room)?;
                if room.visibility == Visibility::Private {
                    let supplied = join_key.unwrap_or_default();
                    if !this
                        .credentials
                        .verify_session(session, room_id, supplied)
                        .await?
                    {
                        return Err(RoomError::InvalidJoinKey);
                    }
                }
                if this
                    .memberships
                    .find_session(session, room_id, user_id)
                    .await?
                    .is_some()
                {
                    return Ok(());
                }

                let now = DateTime::now();
                this.memberships
                    .base
                    .insert_one_session(
                        &membership(room_id, user_id, MemberRole::Member, now),
                        session,
                    )
                    .await?;
                this.rooms
                    .base
                    .update_one_session(
                        doc! { "_id": room_id },
                        doc! {
                            "$addToSet": { "members": user_id },
                            "$inc": { "members_count": 1 },
                            "$set": { "updated_at": now },
                        },
                        session,
                    )
                    .await?;
                Ok(())
            })
        })
        .await?;

        self.notify_updated(room_id).await;
        Ok(())
    }

    /// No-op for non-members. The creator cannot leave their own room;
    /// deleting it is the way out.
    pub async fn leave(&self, room_id: &str, user_id: &str) -> RoomResult<()> {
        let changed = self
            .run_transaction(&(room_id, user_id), |this, session, ctx| {
                Box::pin(async move {
                    let &(room_id, user_id) = ctx;
                    let room = this.room_in_txn(session, room_id).await?;
                    if room.creator_id == user_id {
                        return Err(RoomError::SelfTargetNotAllowed);
                    }
                    this.remove_membership(session, &room, user_id).await
                })
            })
            .await?;

        if changed {
            self.notify_updated(room_id).await;
        }
        Ok(())
    }

    /// Any admin may promote an existing member. Idempotent.
    pub async fn promote(
        &self,
        room_id: &str,
        actor_id: &str,
        target_id: &str,
    ) -> RoomResult<()> {
        self.run_transaction(&(room_id, actor_id, target_id), |this, session, ctx| {
            Box::pin(async move {
                let &(room_id, actor_id, target_id) = ctx;
                let room = this.room_in_txn(session, room_id).await?;
                if !room.is_admin(actor_id) {
                    return Err(RoomError::PermissionDenied);
                }
                let Some(target) = this
                    .memberships
                    .find_session(session, room_id, target_id)
                    .await?
                else {
                    return Err(RoomError::NotMember);
                };

                let now = DateTime::now();
                if target.role != MemberRole::Admin {
                    this.memberships
                        .base
                        .update_one_session(
                            doc! { "room_id": room_id, "uid": target_id },
                            doc! { "$set": { "role": "admin", "updated_at": now } },
                            session,
                        )
                        .await?;
                }
                this.rooms
                    .base
                    .update_one_session(
                        doc! { "_id": room_id },
                        doc! {
                            "$addToSet": { "admins": target_id },
                            "$set": { "updated_at": now },
                        },
                        session,
                    )
                    .await?;
                Ok(())
            })
        })
        .await?;

        self.notify_updated(room_id).await;
        Ok(())
    }

    /// Any admin may demote another admin, except the creator whose admin
    /// status is permanent.
    pub async fn demote(
        &self,
        room_id: &str,
        actor_id: &str,
        target_id: &str,
    ) -> RoomResult<()> {
        self.run_transaction(&(room_id, actor_id, target_id), |this, session, ctx| {
            Box::pin(async move {
                let &(room_id, actor_id, target_id) = ctx;
                let room = this.room_in_txn(session, room_id).await?;
                if !room.is_admin(actor_id) {
                    return Err(RoomError::PermissionDenied);
                }
                if room.creator_id == target_id {
                    return Err(RoomError::SelfTargetNotAllowed);
                }

                let now = DateTime::now();
                this.memberships
                    .base
                    .update_one_session(
                        doc! { "room_id": room_id, "uid": target_id },
                        doc! { "$set": { "role": "member", "updated_at": now } },
                        session,
                    )
                    .await?;
                this.rooms
                    .base
                    .update_one_session(
                        doc! { "_id": room_id },
                        doc! {
                            "$pull": { "admins": target_id },
                            "$set": { "updated_at": now },
                        },
                        session,
                    )
                    .await?;
                Ok(())
            })
        })
        .await?;

        self.notify_updated(room_id).await;
        Ok(())
    }

    /// Host-only removal of a member; the creator can never be removed.
    pub async fn remove_member(
        &self,
        room_id: &str,
        actor_id: &str,
        target_id: &str,
    ) -> RoomResult<()> {
        let changed = self
            .run_transaction(&(room_id, actor_id, target_id), |this, session, ctx| {
                Box::pin(async move {
                    let &(room_id, actor_id, target_id) = ctx;
                    let room = this.room_in_txn(session, room_id).await?;
                    if room.creator_id != actor_id {
                        return Err(RoomError::PermissionDenied);
                    }
                    if room.creator_id == target_id {
                        return Err(RoomError::SelfTargetNotAllowed);
                    }
                    this.remove_membership(session, &room, target_id).await
                })
            })
            .await?;

        if changed {
            self.notify_updated(room_id).await;
        }
        Ok(())
    }

    /// Host-only. Setting a secret implies privacy, so the room flips to
    /// private as part of the same commit.
    pub async fn change_secret(
        &self,
        room_id: &str,
        actor_id: &str,
        new_secret: &str,
    ) -> RoomResult<()> {
        if new_secret.trim().is_empty() {
            return Err(RoomError::EmptySecret);
        }

        self.run_transaction(&(room_id, actor_id, new_secret), |this, session, ctx| {
            Box::pin(async move {
                let &(room_id, actor_id, new_secret) = ctx;
                let room = this.room_in_txn(session, room_id).await?;
                if room.creator_id != actor_id {
                    return Err(RoomError::PermissionDenied);
                }
                this.credentials
                    .set_session(session, room_id, new_secret, actor_id)
                    .await?;
                this.rooms
                    .base
                    .update_one_session(
                        doc! { "_id": room_id },
                        doc! { "$set": { "visibility": "private", "updated_at": DateTime::now() } },
                        session,
                    )
                    .await?;
                Ok(())
            })
        })
        .await?;

        self.notify_updated(room_id).await;
        Ok(())
    }

    // ── Metadata update / deletion ──────────────────────────────

    /// Admin-only partial update of name/description. Returns whether
    /// anything changed; an empty patch is a no-op.
    pub async fn update_room(
        &self,
        room_id: &str,
        actor_id: &str,
        params: UpdateRoomParams,
    ) -> RoomResult<bool> {
        params
            .validate()
            .map_err(|e| DaoError::Validation(e.to_string()))?;

        let mut patch = doc! {};
        if let Some(name) = params.name.as_deref() {
            patch.insert("name", name);
        }
        if let Some(description) = params.description.as_deref() {
            patch.insert("description", description);
        }
        if patch.is_empty() {
            return Ok(false);
        }

        let updated = self
            .run_transaction(&(room_id, actor_id, &patch), |this, session, ctx| {
                Box::pin(async move {
                    let &(room_id, actor_id, patch) = ctx;
                    let room = this.room_in_txn(session, room_id).await?;
                    if !room.is_admin(actor_id) {
                        return Err(RoomError::PermissionDenied);
                    }
                    let mut patch = patch.clone();
                    patch.insert("updated_at", DateTime::now());
                    let updated = this
                        .rooms
                        .base
                        .update_one_session(doc! { "_id": room_id }, doc! { "$set": patch }, session)
                        .await?;
                    Ok(updated)
                })
            })
            .await?;

        if updated {
            self.notify_updated(room_id).await;
        }
        Ok(updated)
    }

    /// Admin-only. The room document goes atomically; memberships,
    /// credential and messages are cascaded best-effort afterwards.
    pub async fn delete_room(&self, room_id: &str, actor_id: &str) -> RoomResult<()> {
        self.run_transaction(&(room_id, actor_id), |this, session, ctx| {
            Box::pin(async move {
                let &(room_id, actor_id) = ctx;
                let room = this.room_in_txn(session, room_id).await?;
                if !room.is_admin(actor_id) {
                    return Err(RoomError::PermissionDenied);
                }
                this.rooms
                    .base
                    .delete_one_session(doc! { "_id": room_id }, session)
                    .await?;
                Ok(())
            })
        })
        .await?;

        if let Err(e) = self.memberships.delete_for_room(room_id).await {
            warn!(room_id, error = %e, "Cascade delete of memberships failed");
        }
        if let Err(e) = self.credentials.delete_for_room(room_id).await {
            warn!(room_id, error = %e, "Cascade delete of credential failed");
        }
        if let Err(e) = self.messages.delete_for_room(room_id).await {
            warn!(room_id, error = %e, "Cascade delete of messages failed");
        }

        self.events.remove_room(room_id);
        self.events.publish_room(RoomEvent::Deleted {
            room_id: room_id.to_string(),
        });
        info!(room_id, "Room deleted");
        Ok(())
    }

    // ── Transaction plumbing ────────────────────────────────────

    async fn run_transaction<T, C>(
        &self,
        ctx: &C,
        mut body: impl for<'a> FnMut(
            &'a Self,
            &'a mut ClientSession,
            &'a C,
        ) -> BoxFuture<'a, RoomResult<T>>,
    ) -> RoomResult<T> {
        let mut session = self.client.start_session().await.map_err(DaoError::from)?;
        let mut attempts = 0u32;
        loop {
            session.start_transaction().await.map_err(DaoError::from)?;
            match body(self, &mut session, ctx).await {
                Ok(value) => match commit(&mut session).await {
                    Ok(()) => return Ok(value),
                    Err(e) if is_transient(&e) => {
                        if attempts >= self.settings.txn_retry_budget {
                            warn!(error = %e, "Transaction retry budget exhausted at commit");
                            return Err(RoomError::TransactionFailed);
                        }
                        attempts += 1;
                    }
                    Err(e) => return Err(DaoError::from(e).into()),
                },
                Err(err) => {
                    let _ = session.abort_transaction().await;
                    match err {
                        RoomError::Store(DaoError::Mongo(e)) if is_transient(&e) => {
                            if attempts >= self.settings.txn_retry_budget {
                                warn!(error = %e, "Transaction retry budget exhausted");
                                return Err(RoomError::TransactionFailed);
                            }
                            attempts += 1;
                        }
                        other => return Err(other),
                    }
                }
            }
        }
    }

    async fn room_in_txn(
        &self,
        session: &mut ClientSession,
        room_id: &str,
    ) -> RoomResult<Room> {
        self.rooms
            .base
            .find_one_session(doc! { "_id": room_id }, session)
            .await?
            .ok_or(RoomError::RoomNotFound)
    }

    /// Shared body of `leave` and `remove_member`: delete the ledger record
    /// and keep the room's mirror set + counter in lockstep. Returns false
    /// when the user was not a member.
    async fn remove_membership(
        &self,
        session: &mut ClientSession,
        room: &Room,
        user_id: &str,
    ) -> RoomResult<bool> {
        if self
            .memberships
            .find_session(session, &room.id, user_id)
            .await?
            .is_none()
        {
            return Ok(false);
        }

        self.memberships
            .base
            .delete_one_session(doc! { "room_id": &room.id, "uid": user_id }, session)
            .await?;
        // Pulling from admins unconditionally keeps admins a subset of
        // members even when the departing user held the role. No
        // replacement admin is promoted when this empties the set.
        self.rooms
            .base
            .update_one_session(
                doc! { "_id": &room.id },
                doc! {
                    "$pull": { "members": user_id, "admins": user_id },
                    "$inc": { "members_count": -1 },
                    "$set": { "updated_at": DateTime::now() },
                },
                session,
            )
            .await?;
        Ok(true)
    }

    async fn notify_updated(&self, room_id: &str) {
        match self.rooms.try_get(room_id).await {
            Ok(Some(room)) => self.events.publish_room(RoomEvent::Updated(room)),
            Ok(None) => {}
            Err(e) => warn!(room_id, error = %e, "Could not load room for event publish"),
        }
    }
}

async fn commit(session: &mut ClientSession) -> Result<(), mongodb::error::Error> {
    loop {
        match session.commit_transaction().await {
            Ok(()) => return Ok(()),
            Err(e) if e.contains_label(UNKNOWN_TRANSACTION_COMMIT_RESULT) => continue,
            Err(e) => return Err(e),
        }
    }
}

fn is_transient(e: &mongodb::error::Error) -> bool {
    e.contains_label(TRANSIENT_TRANSACTION_ERROR)
}

fn membership(room_id: &str, uid: &str, role: MemberRole, now: DateTime) -> Membership {
    Membership {
        id: None,
        room_id: room_id.to_string(),
        uid: uid.to_string(),
        role,
        joined_at: now,
        updated_at: now,
    }
}

fn generate_join_key(length: usize) -> String {
    rand::rng()
        .sample_iter(&rand::distr::Alphanumeric)
        .take(length)
        .map(char::from)
        .collect()
}
