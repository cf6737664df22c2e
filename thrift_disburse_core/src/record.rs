use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

pub type GroupId = String;
pub type MemberId = String;

/// Review state of a preference. This crate only ever writes `Pending`;
/// group administration moves records to `Accepted` or `Rejected`.
#[derive(Clone, Copy, Debug, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum PreferenceStatus {
    #[default]
    Pending,
    Accepted,
    Rejected,
}

/// One member's requested payout slot within one group.
///
/// Identity is `(member_id, group_id)`: a member holds at most one record per group.
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq, Eq)]
pub struct PreferenceRecord {
    pub group_id: GroupId,
    pub member_id: MemberId,
    pub preferred_position: u32,
    pub bid_amount: Decimal,
    pub status: PreferenceStatus,
}

impl PreferenceRecord {
    pub fn new(
        group_id: impl Into<GroupId>,
        member_id: impl Into<MemberId>,
        preferred_position: u32,
    ) -> Self {
        Self {
            group_id: group_id.into(),
            member_id: member_id.into(),
            preferred_position,
            bid_amount: Decimal::ZERO,
            status: PreferenceStatus::Pending,
        }
    }

    pub fn with_bid(mut self, bid_amount: Decimal) -> Self {
        self.bid_amount = bid_amount;
        self
    }

    #[inline]
    pub fn same_identity(&self, member_id: &str, group_id: &str) -> bool {
        self.member_id == member_id && self.group_id == group_id
    }
}

/// A member's submission for a group, before validation.
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq, Eq)]
pub struct PreferenceRequest {
    pub group_id: GroupId,
    pub member_id: MemberId,
    pub preferred_position: u32,
    pub bid_amount: Option<Decimal>,
}

impl PreferenceRequest {
    pub fn new(
        group_id: impl Into<GroupId>,
        member_id: impl Into<MemberId>,
        preferred_position: u32,
    ) -> Self {
        Self {
            group_id: group_id.into(),
            member_id: member_id.into(),
            preferred_position,
            bid_amount: None,
        }
    }

    pub fn with_bid(mut self, bid_amount: Decimal) -> Self {
        self.bid_amount = Some(bid_amount);
        self
    }

    /// True when a bid was supplied and is strictly positive.
    #[inline]
    pub fn has_positive_bid(&self) -> bool {
        matches!(self.bid_amount, Some(b) if b > Decimal::ZERO)
    }
}

/// Capacity of a savings group: positions run `1..=max_members`.
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq, Eq)]
pub struct GroupCapacity {
    pub group_id: GroupId,
    pub max_members: u32,
}

impl GroupCapacity {
    pub fn new(group_id: impl Into<GroupId>, max_members: u32) -> Self {
        Self {
            group_id: group_id.into(),
            max_members,
        }
    }

    #[inline]
    pub fn contains(&self, position: u32) -> bool {
        position_in_range(position, self.max_members)
    }
}

#[inline]
pub fn position_in_range(position: u32, max_members: u32) -> bool {
    (1..=max_members).contains(&position)
}
