use bson::{DateTime, doc};
use futures::future;
use futures::stream::BoxStream;
use futures::{StreamExt, TryStreamExt};
use huddle_db::models::{Membership, Room, Visibility};
use mongodb::Database;

use super::base::{BaseDao, DaoResult};
use crate::expiry;

/// Alphabet for room codes: uppercase plus digits with the easily-confused
/// glyphs (0/O, 1/I) removed.
const CODE_ALPHABET: [char; 32] = [
    'A', 'B', 'C', 'D', 'E', 'F', 'G', 'H', 'J', 'K', 'L', 'M', 'N', 'P', 'Q', 'R', 'S', 'T',
    'U', 'V', 'W', 'X', 'Y', 'Z', '2', '3', '4', '5', '6', '7', '8', '9',
];

/// Room registry: metadata lifecycle and listings. Mutations that must pair
/// with ledger/credential writes go through the transaction coordinator.
pub struct RoomDao {
    pub base: BaseDao<Room>,
    memberships: BaseDao<Membership>,
    code_length: usize,
}

#[derive(Debug, Default, Clone)]
pub struct ActiveRoomsFilter {
    pub visibility: Option<Visibility>,
    /// Case-insensitive substring match on name or description.
    pub search: Option<String>,
}

impl RoomDao {
    pub fn new(db: &Database, code_length: usize) -> Self {
        Self {
            base: BaseDao::new(db, Room::COLLECTION),
            memberships: BaseDao::new(db, Membership::COLLECTION),
            code_length,
        }
    }

    /// A fresh candidate room code. Uniqueness is settled by the store's
    /// `_id` constraint, not here.
    pub fn new_code(&self) -> String {
        nanoid::format(nanoid::rngs::default, &CODE_ALPHABET, self.code_length)
    }

    pub async fn try_get(&self, room_id: &str) -> DaoResult<Option<Room>> {
        self.base.find_one(doc! { "_id": room_id }).await
    }

    /// Lazy stream of non-expired rooms, newest first. Expiry is decided by
    /// the policy predicate at read time, so a just-expired room drops out
    /// without any background sweep.
    pub async fn list_active(
        &self,
        filter: ActiveRoomsFilter,
    ) -> DaoResult<BoxStream<'static, DaoResult<Room>>> {
        let mut query = doc! {};
        if let Some(visibility) = filter.visibility {
            query.insert("visibility", visibility.as_str());
        }
        if let Some(search) = filter.search.as_deref().filter(|s| !s.trim().is_empty()) {
            let escaped = escape_regex(search);
            query.insert(
                "$or",
                vec![
                    doc! { "name": { "$regex": &escaped, "$options": "i" } },
                    doc! { "description": { "$regex": &escaped, "$options": "i" } },
                ],
            );
        }

        let stream = self
            .base
            .find_stream(query, Some(doc! { "created_at": -1 }))
            .await?;
        Ok(stream
            .try_filter(|room| future::ready(!expiry::is_expired(room, DateTime::now())))
            .boxed())
    }

    /// Rooms the user belongs to, driven off the membership ledger.
    pub async fn list_for_user(&self, uid: &str) -> DaoResult<Vec<Room>> {
        let memberships = self
            .memberships
            .find_many(doc! { "uid": uid }, None)
            .await?;
        let room_ids: Vec<&str> = memberships.iter().map(|m| m.room_id.as_str()).collect();
        if room_ids.is_empty() {
            return Ok(Vec::new());
        }

        self.base
            .find_many(
                doc! { "_id": { "$in": room_ids } },
                Some(doc! { "created_at": -1 }),
            )
            .await
    }
}

fn escape_regex(query: &str) -> String {
    query
        .chars()
        .flat_map(|c| {
            if ".*+?^${}()|[]\\".contains(c) {
                vec!['\\', c]
            } else {
                vec![c]
            }
        })
        .collect()
}
