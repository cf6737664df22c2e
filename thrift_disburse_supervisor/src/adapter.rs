//! Capability seams between the desk and the outside world.
//!
//! The desk never talks to a backend directly. Products inject:
//! - a `RecordStore` for groups and preference rows
//! - an `AuthProvider` that names the signed-in member
//! - a `NotificationSink` that shows outcomes to that member

use serde::{Deserialize, Serialize};
use thrift_disburse_core::{GroupCapacity, GroupId, MemberId, PreferenceRecord};

use crate::error::StoreError;

/// Row storage for groups and disbursement preferences.
///
/// Implementations must key preferences by `(member_id, group_id)` so a
/// second upsert for the same pair replaces the first.
pub trait RecordStore {
    fn get_group(&self, group_id: &GroupId) -> Result<Option<GroupCapacity>, StoreError>;

    /// All preferences for the group, ordered by position.
    fn list_preferences(&self, group_id: &GroupId) -> Result<Vec<PreferenceRecord>, StoreError>;

    fn upsert_preference(&self, record: PreferenceRecord) -> Result<PreferenceRecord, StoreError>;
}

/// Supplies the authenticated member, if any.
pub trait AuthProvider {
    fn current_member(&self) -> Option<MemberId>;
}

/// Fixed identity, for batch imports and tests.
#[derive(Clone, Debug)]
pub struct StaticAuth(pub Option<MemberId>);

impl StaticAuth {
    pub fn member(id: impl Into<MemberId>) -> Self {
        Self(Some(id.into()))
    }

    pub fn anonymous() -> Self {
        Self(None)
    }
}

impl AuthProvider for StaticAuth {
    fn current_member(&self) -> Option<MemberId> {
        self.0.clone()
    }
}

#[derive(Clone, Copy, Debug, Serialize, Deserialize, PartialEq, Eq)]
pub enum NoticeLevel {
    Success,
    Error,
}

/// A user-facing outcome message.
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq, Eq)]
pub struct Notice {
    pub member_id: Option<MemberId>,
    pub group_id: GroupId,
    pub level: NoticeLevel,
    pub message: String,
}

pub trait NotificationSink {
    fn notify(&self, notice: &Notice);
}

/// Drops every notice.
#[derive(Clone, Copy, Debug, Default)]
pub struct NullSink;

impl NotificationSink for NullSink {
    fn notify(&self, _notice: &Notice) {}
}

/// Keeps notices in memory so a caller (or test) can drain them.
#[derive(Debug, Default)]
pub struct CollectingSink {
    notices: std::sync::Mutex<Vec<Notice>>,
}

impl CollectingSink {
    pub fn drain(&self) -> Vec<Notice> {
        let mut guard = self
            .notices
            .lock()
            .expect("collecting sink mutex poisoned");
        std::mem::take(&mut *guard)
    }
}

impl NotificationSink for CollectingSink {
    fn notify(&self, notice: &Notice) {
        self.notices
            .lock()
            .expect("collecting sink mutex poisoned")
            .push(notice.clone());
    }
}
