use bson::doc;
use futures::stream::BoxStream;
use huddle_db::models::{MemberRole, Membership};
use mongodb::{ClientSession, Database};

use super::base::{BaseDao, DaoResult};

/// The membership ledger: one record per (room, user). This layer performs
/// no cross-record validation: membership changes always co-occur with
/// room counter/set updates, which the transaction coordinator owns.
pub struct MembershipDao {
    pub base: BaseDao<Membership>,
}

impl MembershipDao {
    pub fn new(db: &Database) -> Self {
        Self {
            base: BaseDao::new(db, Membership::COLLECTION),
        }
    }

    pub async fn is_member(&self, room_id: &str, uid: &str) -> DaoResult<bool> {
        Ok(self.find(room_id, uid).await?.is_some())
    }

    pub async fn get_role(&self, room_id: &str, uid: &str) -> DaoResult<Option<MemberRole>> {
        Ok(self.find(room_id, uid).await?.map(|m| m.role))
    }

    pub async fn find(&self, room_id: &str, uid: &str) -> DaoResult<Option<Membership>> {
        self.base
            .find_one(doc! { "room_id": room_id, "uid": uid })
            .await
    }

    pub async fn find_session(
        &self,
        session: &mut ClientSession,
        room_id: &str,
        uid: &str,
    ) -> DaoResult<Option<Membership>> {
        self.base
            .find_one_session(doc! { "room_id": room_id, "uid": uid }, session)
            .await
    }

    /// Members of a room ordered by join time, as a restartable stream.
    pub async fn list_members(
        &self,
        room_id: &str,
    ) -> DaoResult<BoxStream<'static, DaoResult<Membership>>> {
        self.base
            .find_stream(doc! { "room_id": room_id }, Some(doc! { "joined_at": 1 }))
            .await
    }

    pub async fn count_for_room(&self, room_id: &str) -> DaoResult<u64> {
        self.base.count(doc! { "room_id": room_id }).await
    }

    pub async fn delete_for_room(&self, room_id: &str) -> DaoResult<u64> {
        self.base.delete_many(doc! { "room_id": room_id }).await
    }
}
