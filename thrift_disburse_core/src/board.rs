use std::collections::{BTreeMap, BTreeSet};

use serde::{Deserialize, Serialize};

use crate::record::{position_in_range, MemberId, PreferenceRecord};

/// Who currently references one payout position.
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq, Eq)]
pub struct PositionSlot {
    pub position: u32,
    pub claimants: Vec<MemberId>,
}

impl PositionSlot {
    #[inline]
    pub fn is_contested(&self) -> bool {
        self.claimants.len() > 1
    }
}

/// Occupied positions in ascending order, claimants in listing order.
///
/// Sized by the records, not by `max_members`. Records outside
/// `1..=max_members` are skipped.
pub fn position_board(existing: &[PreferenceRecord], max_members: u32) -> Vec<PositionSlot> {
    let mut by_position: BTreeMap<u32, Vec<MemberId>> = BTreeMap::new();
    for rec in existing
        .iter()
        .filter(|r| position_in_range(r.preferred_position, max_members))
    {
        by_position
            .entry(rec.preferred_position)
            .or_default()
            .push(rec.member_id.clone());
    }

    by_position
        .into_iter()
        .map(|(position, claimants)| PositionSlot { position, claimants })
        .collect()
}

/// Unreferenced positions in `1..=max_members`, ascending. Lazy, so callers
/// can `take` a page from very large groups.
pub fn free_positions(existing: &[PreferenceRecord], max_members: u32) -> impl Iterator<Item = u32> {
    let taken: BTreeSet<u32> = existing.iter().map(|r| r.preferred_position).collect();
    (1..=max_members).filter(move |p| !taken.contains(p))
}

pub fn contested_positions(existing: &[PreferenceRecord], max_members: u32) -> Vec<PositionSlot> {
    position_board(existing, max_members)
        .into_iter()
        .filter(PositionSlot::is_contested)
        .collect()
}
