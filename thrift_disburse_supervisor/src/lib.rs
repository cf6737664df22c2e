//! thrift_disburse_supervisor
//!
//! Outside-world facing shell for `thrift_disburse_core`.
//!
//! Responsibilities:
//! - capability traits for storage, auth and notifications
//! - an in-memory `RecordStore`
//! - read, decide and write per submission, serialized per group
//!
//! Policy (what is accepted) lives in core.

pub mod adapter;
pub mod config;
pub mod error;
pub mod store;
pub mod supervisor;

pub use adapter::{
    AuthProvider,
    CollectingSink,
    Notice,
    NoticeLevel,
    NotificationSink,
    NullSink,
    RecordStore,
    StaticAuth,
};

pub use config::DeskCfg;
pub use error::{DeskError, StoreError};
pub use store::{MemoryStore, StoreSnapshot};

pub use supervisor::{
    DeskSnapshot,
    DisbursementDesk,
    GroupTally,
    RestoreStats,
    SubmissionOutcome,
};
