//! Sharded disbursement desk.
//!
//! The imperative shell around `thrift_disburse_core`:
//! - resolves the member through an `AuthProvider`
//! - reads group capacity and preferences from a `RecordStore`
//! - runs the pure resolver
//! - writes the accepted record back and reports the outcome to a `NotificationSink`
//!
//! Read, decide and write for one group happen under that group's shard mutex,
//! so two submissions for the same free slot cannot both see it as free.

use std::collections::HashMap;

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use thrift_disburse_core::{
    evaluate_preference_cfg, position_board, Decision, GroupId, PositionSlot, PreferenceRecord,
    PreferenceRequest,
};
use tracing::{debug, info, warn};

use crate::adapter::{AuthProvider, Notice, NoticeLevel, NotificationSink, RecordStore};
use crate::config::DeskCfg;
use crate::error::DeskError;

/// Result of one accepted or rejected submission.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct SubmissionOutcome {
    pub request: PreferenceRequest,
    pub decision: Decision,
    /// What the store returned for an accepted upsert.
    pub stored: Option<PreferenceRecord>,
}

/// Per-group counters.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct GroupTally {
    pub accepted: u64,
    /// Accepted while another member referenced the slot; subset of `accepted`.
    pub contested: u64,
    pub rejected: u64,
    pub store_faults: u64,
}

/// Snapshot of desk counters for storage-agnostic persistence.
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
pub struct DeskSnapshot {
    pub tallies: Vec<(GroupId, GroupTally)>,
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RestoreStats {
    pub applied: usize,
    pub overwritten: usize,
}

#[derive(Default, Debug)]
struct Shard {
    tallies: HashMap<GroupId, GroupTally>,
}

/// Deterministic FNV-1a hash (stable across runs).
fn fnv1a_u64(s: &str) -> u64 {
    let mut h: u64 = 0xcbf29ce484222325;
    for b in s.as_bytes() {
        h ^= *b as u64;
        h = h.wrapping_mul(0x100000001b3);
    }
    h
}

fn shard_index(group_id: &str, shard_count: usize) -> usize {
    if shard_count <= 1 {
        return 0;
    }
    (fnv1a_u64(group_id) % shard_count as u64) as usize
}

#[derive(Debug)]
pub struct DisbursementDesk {
    cfg: DeskCfg,
    shards: Vec<std::sync::Mutex<Shard>>,
}

impl Default for DisbursementDesk {
    fn default() -> Self {
        Self::new(DeskCfg::default())
    }
}

impl DisbursementDesk {
    pub fn new(cfg: DeskCfg) -> Self {
        let count = cfg.shards.max(1);
        let shards = (0..count)
            .map(|_| std::sync::Mutex::new(Shard::default()))
            .collect();
        Self { cfg, shards }
    }

    pub fn cfg(&self) -> &DeskCfg {
        &self.cfg
    }

    fn shard(&self, idx: usize) -> std::sync::MutexGuard<'_, Shard> {
        self.shards[idx]
            .lock()
            .expect("disbursement desk shard mutex poisoned")
    }

    fn shard_for(&self, group_id: &str) -> std::sync::MutexGuard<'_, Shard> {
        self.shard(shard_index(group_id, self.shards.len()))
    }

    /// Submit the signed-in member's preference for `group_id`.
    ///
    /// Rejections are `Ok` with a `Decision::Rejected`; only missing auth, a
    /// missing group or a store fault produce `Err`. Every path emits one notice.
    pub fn submit<S, A, N>(
        &self,
        store: &S,
        auth: &A,
        sink: &N,
        group_id: &str,
        preferred_position: u32,
        bid_amount: Option<Decimal>,
    ) -> Result<SubmissionOutcome, DeskError>
    where
        S: RecordStore + ?Sized,
        A: AuthProvider + ?Sized,
        N: NotificationSink + ?Sized,
    {
        let Some(member_id) = auth.current_member() else {
            let err = DeskError::Unauthenticated;
            warn!(group_id, "preference submitted without an authenticated member");
            sink.notify(&Notice {
                member_id: None,
                group_id: group_id.to_string(),
                level: NoticeLevel::Error,
                message: err.user_message().to_string(),
            });
            return Err(err);
        };

        let request = PreferenceRequest {
            group_id: group_id.to_string(),
            member_id,
            preferred_position,
            bid_amount,
        };

        let mut guard = self.shard_for(group_id);
        self.process_locked(&mut guard, store, sink, request)
    }

    /// Apply pre-authenticated requests (imports, admin tooling).
    ///
    /// Each shard is locked once; requests for the same group keep their input
    /// order. Results are returned in input order.
    pub fn submit_batch<S, N>(
        &self,
        store: &S,
        sink: &N,
        requests: &[PreferenceRequest],
    ) -> Vec<Result<SubmissionOutcome, DeskError>>
    where
        S: RecordStore + ?Sized,
        N: NotificationSink + ?Sized,
    {
        let mut by_shard: Vec<Vec<usize>> = vec![Vec::new(); self.shards.len()];
        for (i, req) in requests.iter().enumerate() {
            by_shard[shard_index(&req.group_id, self.shards.len())].push(i);
        }

        let mut out: Vec<Option<Result<SubmissionOutcome, DeskError>>> =
            (0..requests.len()).map(|_| None).collect();

        for (shard_idx, indices) in by_shard.into_iter().enumerate() {
            if indices.is_empty() {
                continue;
            }
            let mut guard = self.shard(shard_idx);
            for i in indices {
                out[i] = Some(self.process_locked(&mut guard, store, sink, requests[i].clone()));
            }
        }

        debug!(count = requests.len(), "batch applied");
        out.into_iter().flatten().collect()
    }

    /// Position board for a group, as currently stored.
    pub fn board<S>(&self, store: &S, group_id: &str) -> Result<Vec<PositionSlot>, DeskError>
    where
        S: RecordStore + ?Sized,
    {
        let group_id = group_id.to_string();
        let group = store
            .get_group(&group_id)?
            .ok_or_else(|| DeskError::GroupNotFound(group_id.clone()))?;
        let existing = store.list_preferences(&group_id)?;
        Ok(position_board(&existing, group.max_members))
    }

    fn resolve<S>(&self, store: &S, request: &PreferenceRequest) -> Result<(Decision, Option<PreferenceRecord>), DeskError>
    where
        S: RecordStore + ?Sized,
    {
        let group = store
            .get_group(&request.group_id)?
            .ok_or_else(|| DeskError::GroupNotFound(request.group_id.clone()))?;
        let existing = store.list_preferences(&request.group_id)?;

        let decision = evaluate_preference_cfg(request, &existing, group.max_members, &self.cfg.resolver);

        let stored = match &decision {
            Decision::Accepted { upsert, .. } => Some(store.upsert_preference(upsert.clone())?),
            Decision::Rejected { .. } => None,
        };
        Ok((decision, stored))
    }

    fn process_locked<S, N>(
        &self,
        shard: &mut Shard,
        store: &S,
        sink: &N,
        request: PreferenceRequest,
    ) -> Result<SubmissionOutcome, DeskError>
    where
        S: RecordStore + ?Sized,
        N: NotificationSink + ?Sized,
    {
        let result = self.resolve(store, &request);
        // Unknown groups get no tally entry.
        let mut tally = match &result {
            Err(DeskError::GroupNotFound(_)) => None,
            _ => Some(shard.tallies.entry(request.group_id.clone()).or_default()),
        };

        let (level, message) = match &result {
            Ok((Decision::Accepted { upsert, contested }, _)) => {
                if let Some(t) = tally.as_deref_mut() {
                    t.accepted += 1;
                    if *contested {
                        t.contested += 1;
                    }
                }
                info!(
                    group_id = %upsert.group_id,
                    member_id = %upsert.member_id,
                    position = upsert.preferred_position,
                    bid = %upsert.bid_amount,
                    contested,
                    "disbursement preference accepted"
                );
                (NoticeLevel::Success, accepted_message(upsert.preferred_position, *contested))
            }
            Ok((Decision::Rejected { reason }, _)) => {
                if let Some(t) = tally.as_deref_mut() {
                    t.rejected += 1;
                }
                debug!(
                    group_id = %request.group_id,
                    member_id = %request.member_id,
                    position = request.preferred_position,
                    ?reason,
                    "disbursement preference rejected"
                );
                (NoticeLevel::Error, reason.to_string())
            }
            Err(e) => {
                if let (DeskError::Store(_), Some(t)) = (e, tally.as_deref_mut()) {
                    t.store_faults += 1;
                }
                warn!(
                    group_id = %request.group_id,
                    member_id = %request.member_id,
                    error = %e,
                    "disbursement preference not saved"
                );
                (NoticeLevel::Error, e.user_message().to_string())
            }
        };

        sink.notify(&Notice {
            member_id: Some(request.member_id.clone()),
            group_id: request.group_id.clone(),
            level,
            message,
        });

        let (decision, stored) = result?;
        Ok(SubmissionOutcome {
            request,
            decision,
            stored,
        })
    }

    /// Counters for one group; zero if the desk has not seen it.
    pub fn tally(&self, group_id: &str) -> GroupTally {
        self.shard_for(group_id)
            .tallies
            .get(group_id)
            .copied()
            .unwrap_or_default()
    }

    /// Export all `(group_id, GroupTally)` pairs, sorted by `group_id`.
    pub fn snapshot(&self) -> DeskSnapshot {
        let mut out: Vec<(GroupId, GroupTally)> = Vec::new();
        // Lock shards in a stable order.
        for idx in 0..self.shards.len() {
            let guard = self.shard(idx);
            out.extend(guard.tallies.iter().map(|(k, v)| (k.clone(), *v)));
        }
        out.sort_by(|a, b| a.0.cmp(&b.0));
        DeskSnapshot { tallies: out }
    }

    /// Replace all counters with the snapshot's.
    pub fn restore(&self, snap: DeskSnapshot) -> RestoreStats {
        for idx in 0..self.shards.len() {
            self.shard(idx).tallies.clear();
        }
        self.restore_merge(snap)
    }

    /// Merge a snapshot into current counters; snapshot entries overwrite.
    pub fn restore_merge(&self, snap: DeskSnapshot) -> RestoreStats {
        let mut stats = RestoreStats::default();
        for (group_id, tally) in snap.tallies {
            let mut guard = self.shard_for(&group_id);
            if guard.tallies.insert(group_id, tally).is_some() {
                stats.overwritten += 1;
            }
            stats.applied += 1;
        }
        stats
    }

    pub fn clear_group(&self, group_id: &str) {
        self.shard_for(group_id).tallies.remove(group_id);
    }
}

fn accepted_message(position: u32, contested: bool) -> String {
    if contested {
        format!("Bid placed for position {position}. The group administrator will settle this position.")
    } else {
        format!("Disbursement preference saved for position {position}.")
    }
}
