//! In-process `RecordStore`.
//!
//! Preferences live in one map keyed by `(group_id, member_id)`, which is the
//! uniqueness constraint the desk relies on. Group rows must exist before a
//! preference can reference them.

use std::collections::{BTreeMap, HashMap};
use std::sync::Mutex;

use serde::{Deserialize, Serialize};
use thrift_disburse_core::{GroupCapacity, GroupId, MemberId, PreferenceRecord};
use tracing::{debug, warn};

use crate::adapter::RecordStore;
use crate::error::StoreError;

#[derive(Default, Debug)]
struct Tables {
    groups: HashMap<GroupId, GroupCapacity>,
    preferences: BTreeMap<(GroupId, MemberId), PreferenceRecord>,
}

/// Plain-data copy of a `MemoryStore`. Deterministic ordering.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct StoreSnapshot {
    pub groups: Vec<GroupCapacity>,
    pub preferences: Vec<PreferenceRecord>,
}

#[derive(Debug, Default)]
pub struct MemoryStore {
    tables: Mutex<Tables>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn tables(&self) -> std::sync::MutexGuard<'_, Tables> {
        self.tables.lock().expect("memory store mutex poisoned")
    }

    /// Register or resize a group.
    pub fn insert_group(&self, group: GroupCapacity) {
        debug!(group_id = %group.group_id, max_members = group.max_members, "group registered");
        self.tables().groups.insert(group.group_id.clone(), group);
    }

    /// Total preference rows across all groups.
    pub fn len(&self) -> usize {
        self.tables().preferences.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn snapshot(&self) -> StoreSnapshot {
        let t = self.tables();
        let mut groups: Vec<GroupCapacity> = t.groups.values().cloned().collect();
        groups.sort_by(|a, b| a.group_id.cmp(&b.group_id));
        StoreSnapshot {
            groups,
            preferences: t.preferences.values().cloned().collect(),
        }
    }

    /// Replace all contents with `snap`. Later duplicates of a
    /// `(member_id, group_id)` pair win. Rows whose group is not in the
    /// snapshot are dropped; returns how many.
    pub fn restore(&self, snap: StoreSnapshot) -> usize {
        let mut t = self.tables();
        t.groups.clear();
        t.preferences.clear();
        for g in snap.groups {
            t.groups.insert(g.group_id.clone(), g);
        }
        let mut orphans = 0;
        for p in snap.preferences {
            if !t.groups.contains_key(&p.group_id) {
                warn!(group_id = %p.group_id, member_id = %p.member_id, "orphan preference dropped on restore");
                orphans += 1;
                continue;
            }
            t.preferences
                .insert((p.group_id.clone(), p.member_id.clone()), p);
        }
        orphans
    }
}

impl RecordStore for MemoryStore {
    fn get_group(&self, group_id: &GroupId) -> Result<Option<GroupCapacity>, StoreError> {
        Ok(self.tables().groups.get(group_id).cloned())
    }

    fn list_preferences(&self, group_id: &GroupId) -> Result<Vec<PreferenceRecord>, StoreError> {
        let t = self.tables();
        let mut out: Vec<PreferenceRecord> = t
            .preferences
            .values()
            .filter(|p| &p.group_id == group_id)
            .cloned()
            .collect();
        out.sort_by(|a, b| {
            a.preferred_position
                .cmp(&b.preferred_position)
                .then_with(|| a.member_id.cmp(&b.member_id))
        });
        Ok(out)
    }

    fn upsert_preference(&self, record: PreferenceRecord) -> Result<PreferenceRecord, StoreError> {
        let mut t = self.tables();
        if !t.groups.contains_key(&record.group_id) {
            return Err(StoreError::UnknownGroup(record.group_id));
        }
        let key = (record.group_id.clone(), record.member_id.clone());
        let replaced = t.preferences.insert(key, record.clone()).is_some();
        debug!(
            group_id = %record.group_id,
            member_id = %record.member_id,
            position = record.preferred_position,
            replaced,
            "preference upserted"
        );
        Ok(record)
    }
}
