pub mod base;
pub mod credential;
pub mod membership;
pub mod message;
pub mod room;

pub use base::BaseDao;
pub use credential::CredentialDao;
pub use membership::MembershipDao;
pub use message::MessageDao;
pub use room::RoomDao;
