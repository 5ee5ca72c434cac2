use bson::{Bson, DateTime, doc};
use futures::stream::BoxStream;
use huddle_db::models::ChatMessage;
use mongodb::Database;

use super::base::{BaseDao, DaoResult};

/// Append-only message log, ordered per room by the server-assigned
/// timestamp. Messages never participate in membership transactions.
pub struct MessageDao {
    pub base: BaseDao<ChatMessage>,
}

impl MessageDao {
    pub fn new(db: &Database) -> Self {
        Self {
            base: BaseDao::new(db, ChatMessage::COLLECTION),
        }
    }

    pub async fn append(
        &self,
        room_id: &str,
        sender_id: &str,
        text: &str,
    ) -> DaoResult<ChatMessage> {
        let mut message = ChatMessage {
            id: None,
            room_id: room_id.to_string(),
            sender_id: sender_id.to_string(),
            text: text.to_string(),
            created_at: DateTime::now(),
        };
        let inserted_id = self.base.insert_one(&message).await?;
        if let Bson::ObjectId(id) = inserted_id {
            message.id = Some(id);
        }
        Ok(message)
    }

    /// Full ordered history for a room, oldest first.
    pub async fn history(
        &self,
        room_id: &str,
    ) -> DaoResult<BoxStream<'static, DaoResult<ChatMessage>>> {
        self.base
            .find_stream(doc! { "room_id": room_id }, Some(doc! { "created_at": 1 }))
            .await
    }

    pub async fn delete_for_room(&self, room_id: &str) -> DaoResult<u64> {
        self.base.delete_many(doc! { "room_id": room_id }).await
    }
}
