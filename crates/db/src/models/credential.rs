use bson::DateTime;
use serde::{Deserialize, Serialize};

/// Join-secret record for a private room, stored apart from the room
/// document. Holds only the digest; the plaintext is never persisted.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RoomCredential {
    #[serde(rename = "_id")]
    pub room_id: String,
    pub join_key_hash: String,
    /// The user who set the current secret.
    pub issuer_id: String,
    pub updated_at: DateTime,
}

impl RoomCredential {
    pub const COLLECTION: &'static str = "room_credentials";
}
