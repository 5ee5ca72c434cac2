use crate::dao::base::DaoError;

/// Closed error set for the room subsystem. Every validation failure is
/// detected before any write inside the owning transaction; `Store` carries
/// unexpected store failures that are not plain contention.
#[derive(Debug, thiserror::Error)]
pub enum RoomError {
    #[error("room not found")]
    RoomNotFound,
    #[error("invalid join key")]
    InvalidJoinKey,
    #[error("join secret must not be empty")]
    EmptySecret,
    #[error("permission denied")]
    PermissionDenied,
    #[error("operation not allowed on the room creator")]
    SelfTargetNotAllowed,
    #[error("not a member of this room")]
    NotMember,
    #[error("room has expired")]
    ExpiredRoom,
    #[error("transaction failed after retries")]
    TransactionFailed,
    #[error(transparent)]
    Store(#[from] DaoError),
}

impl RoomError {
    /// Safe to blindly re-issue: either the operation is idempotent or its
    /// failure left no partial state behind.
    pub fn is_retryable(&self) -> bool {
        matches!(self, RoomError::TransactionFailed)
    }
}

pub type RoomResult<T> = Result<T, RoomError>;
