pub mod chat;
pub mod dao;
pub mod error;
pub mod events;
pub mod expiry;
pub mod rooms;

pub use chat::{ChatService, ChatSubscription};
pub use error::RoomError;
pub use events::{EventBus, RoomEvent};
pub use rooms::{CreateRoomParams, CreatedRoom, RoomCoordinator, UpdateRoomParams};
