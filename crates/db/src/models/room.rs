use bson::DateTime;
use serde::{Deserialize, Serialize};

/// A named, creator-owned collaboration space. The document `_id` is the
/// short join code shown to users.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Room {
    #[serde(rename = "_id")]
    pub id: String,
    pub name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    pub visibility: Visibility,
    pub creator_id: String,
    /// User ids with elevated privileges. The creator is always listed.
    #[serde(default)]
    pub admins: Vec<String>,
    /// Mirror of the membership records for this room. `members_count`
    /// moves in lockstep via `$inc`, never by recounting.
    #[serde(default)]
    pub members: Vec<String>,
    #[serde(default)]
    pub members_count: i64,
    #[serde(default)]
    pub temporary: bool,
    /// Set at creation for temporary rooms and immutable afterwards.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub expires_at: Option<DateTime>,
    pub created_at: DateTime,
    pub updated_at: DateTime,
}

impl Room {
    pub const COLLECTION: &'static str = "rooms";

    pub fn is_member(&self, user_id: &str) -> bool {
        self.members.iter().any(|m| m == user_id)
    }

    pub fn is_admin(&self, user_id: &str) -> bool {
        self.creator_id == user_id || self.admins.iter().any(|a| a == user_id)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Visibility {
    Public,
    Private,
}

impl Visibility {
    /// The wire/store spelling, matching the serde rename.
    pub fn as_str(&self) -> &'static str {
        match self {
            Visibility::Public => "public",
            Visibility::Private => "private",
        }
    }
}
