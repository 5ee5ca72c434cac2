//! Expiration policy for temporary rooms. Pure and stateless: consulted on
//! every read/write path instead of running a background sweep. An expired
//! room stops accepting joins and messages and drops out of listings, but
//! its data stays until an explicit delete.

use bson::DateTime;
use huddle_db::models::Room;

use crate::error::RoomError;

pub fn is_expired(room: &Room, now: DateTime) -> bool {
    room.temporary
        && room
            .expires_at
            .is_some_and(|at| at.timestamp_millis() <= now.timestamp_millis())
}

pub fn ensure_active(room: &Room) -> Result<(), RoomError> {
    if is_expired(room, DateTime::now()) {
        Err(RoomError::ExpiredRoom)
    } else {
        Ok(())
    }
}
