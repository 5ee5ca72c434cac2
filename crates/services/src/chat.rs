use std::sync::Arc;

use futures::TryStreamExt;
use huddle_db::models::ChatMessage;
use mongodb::Database;
use tokio::sync::broadcast;
use tracing::debug;

use crate::dao::{MembershipDao, MessageDao, RoomDao};
use crate::error::{RoomError, RoomResult};
use crate::events::EventBus;
use crate::expiry;

/// Per-room chat channel. Sends are plain appends with a server-assigned
/// timestamp, outside any membership transaction.
pub struct ChatService {
    rooms: RoomDao,
    memberships: MembershipDao,
    messages: MessageDao,
    events: Arc<EventBus>,
}

/// A live, restartable view of a room's messages: everything persisted so
/// far, oldest first, plus a receiver for messages sent from now on.
pub struct ChatSubscription {
    pub backlog: Vec<ChatMessage>,
    pub live: broadcast::Receiver<ChatMessage>,
}

impl ChatService {
    pub fn new(db: &Database, events: Arc<EventBus>, code_length: usize) -> Self {
        Self {
            rooms: RoomDao::new(db, code_length),
            memberships: MembershipDao::new(db),
            messages: MessageDao::new(db),
            events,
        }
    }

    /// Appends a message. Blank text is dropped silently rather than
    /// rejected. Expired rooms are read-only.
    pub async fn send(&self, room_id: &str, sender_id: &str, text: &str) -> RoomResult<()> {
        let room = self
            .rooms
            .try_get(room_id)
            .await?
            .ok_or(RoomError::RoomNotFound)?;
        expiry::ensure_active(&room)?;
        if !self.memberships.is_member(room_id, sender_id).await? {
            return Err(RoomError::NotMember);
        }
        if text.trim().is_empty() {
            debug!(room_id, "Dropping blank message");
            return Ok(());
        }

        let message = self.messages.append(room_id, sender_id, text).await?;
        self.events.publish_chat(message);
        Ok(())
    }

    /// Snapshot-plus-live subscription. Ordering across concurrent senders
    /// follows the server-assigned timestamps, not client send order.
    pub async fn subscribe(&self, room_id: &str) -> RoomResult<ChatSubscription> {
        if self.rooms.try_get(room_id).await?.is_none() {
            return Err(RoomError::RoomNotFound);
        }

        // Register the live receiver before reading the backlog so nothing
        // sent in between is lost (it may be seen twice, never skipped).
        let live = self.events.subscribe_chat(room_id);
        let backlog = self.messages.history(room_id).await?.try_collect().await?;
        Ok(ChatSubscription { backlog, live })
    }
}
