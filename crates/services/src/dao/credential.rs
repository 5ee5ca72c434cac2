use bson::{DateTime, doc};
use huddle_db::models::RoomCredential;
use mongodb::{ClientSession, Database};
use sha2::{Digest, Sha256};

use super::base::{BaseDao, DaoResult};

/// Hashes and verifies room join-secrets. Only the digest is ever stored;
/// `verify` answers false for missing or mismatching credentials and never
/// errors on either.
pub struct CredentialDao {
    pub base: BaseDao<RoomCredential>,
}

impl CredentialDao {
    pub fn new(db: &Database) -> Self {
        Self {
            base: BaseDao::new(db, RoomCredential::COLLECTION),
        }
    }

    /// Stores (or overwrites) the digest for a room's join-secret.
    /// Callers are responsible for rejecting blank secrets first.
    pub async fn set_session(
        &self,
        session: &mut ClientSession,
        room_id: &str,
        plaintext: &str,
        issuer_id: &str,
    ) -> DaoResult<()> {
        self.base
            .upsert_one_session(
                doc! { "_id": room_id },
                doc! {
                    "$set": {
                        "join_key_hash": digest(plaintext),
                        "issuer_id": issuer_id,
                        "updated_at": DateTime::now(),
                    }
                },
                session,
            )
            .await
    }

    pub async fn verify(&self, room_id: &str, supplied: &str) -> DaoResult<bool> {
        let credential = self.base.find_one(doc! { "_id": room_id }).await?;
        Ok(matches(credential.as_ref(), supplied))
    }

    pub async fn verify_session(
        &self,
        session: &mut ClientSession,
        room_id: &str,
        supplied: &str,
    ) -> DaoResult<bool> {
        let credential = self
            .base
            .find_one_session(doc! { "_id": room_id }, session)
            .await?;
        Ok(matches(credential.as_ref(), supplied))
    }

    pub async fn delete_for_room(&self, room_id: &str) -> DaoResult<u64> {
        self.base.delete_many(doc! { "_id": room_id }).await
    }
}

fn matches(credential: Option<&RoomCredential>, supplied: &str) -> bool {
    match credential {
        Some(credential) => constant_time_eq(
            digest(supplied).as_bytes(),
            credential.join_key_hash.as_bytes(),
        ),
        None => false,
    }
}

fn digest(secret: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(secret.as_bytes());
    hex::encode(hasher.finalize())
}

/// Compares without early exit so the comparison shape does not depend on
/// where the inputs diverge.
fn constant_time_eq(a: &[u8], b: &[u8]) -> bool {
    if a.len() != b.len() {
        return false;
    }
    a.iter().zip(b).fold(0u8, |acc, (x, y)| acc | (x ^ y)) == 0
}
