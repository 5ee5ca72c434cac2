use bson::{DateTime, oid::ObjectId};
use serde::{Deserialize, Serialize};

/// Immutable chat message, ordered within a room by the server-assigned
/// `created_at`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChatMessage {
    #[serde(rename = "_id", skip_serializing_if = "Option::is_none")]
    pub id: Option<ObjectId>,
    pub room_id: String,
    pub sender_id: String,
    pub text: String,
    pub created_at: DateTime,
}

impl ChatMessage {
    pub const COLLECTION: &'static str = "room_messages";
}
