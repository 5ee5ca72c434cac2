use bson::{DateTime, oid::ObjectId};
use serde::{Deserialize, Serialize};

/// One record per (room, user) pair, the source of truth for membership.
/// Uniqueness is enforced by the `(room_id, uid)` index.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Membership {
    #[serde(rename = "_id", skip_serializing_if = "Option::is_none")]
    pub id: Option<ObjectId>,
    pub room_id: String,
    pub uid: String,
    pub role: MemberRole,
    pub joined_at: DateTime,
    pub updated_at: DateTime,
}

impl Membership {
    pub const COLLECTION: &'static str = "memberships";
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MemberRole {
    Admin,
    Member,
}
