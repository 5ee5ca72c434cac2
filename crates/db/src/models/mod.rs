mod credential;
mod membership;
mod message;
mod room;

pub use credential::RoomCredential;
pub use membership::{MemberRole, Membership};
pub use message::ChatMessage;
pub use room::{Room, Visibility};
