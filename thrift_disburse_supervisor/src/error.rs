use thiserror::Error;
use thrift_disburse_core::GroupId;

/// Fault reported by a `RecordStore`. The desk does not retry these.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum StoreError {
    #[error("store unavailable: {0}")]
    Unavailable(String),

    #[error("unknown group {0}")]
    UnknownGroup(GroupId),
}

#[derive(Error, Debug)]
pub enum DeskError {
    #[error("no authenticated member")]
    Unauthenticated,

    #[error("group {0} not found")]
    GroupNotFound(GroupId),

    #[error("store fault: {0}")]
    Store(#[from] StoreError),
}

impl DeskError {
    /// Text shown to the member for this failure.
    pub fn user_message(&self) -> &'static str {
        match self {
            DeskError::Unauthenticated => "Please sign in to set a disbursement preference.",
            DeskError::GroupNotFound(_) => "This group could not be found.",
            DeskError::Store(_) => "Failed to save preference",
        }
    }
}
