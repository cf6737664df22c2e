use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::{
    cfg::ResolverCfg,
    record::{position_in_range, PreferenceRecord, PreferenceRequest},
    upsert::{own_record, upsert_preference},
};

/// Why a preference was turned down. Both are fixed by re-submitting.
///
/// `Display` is the text shown to the member.
#[derive(Error, Clone, Copy, Debug, Serialize, Deserialize, PartialEq, Eq)]
pub enum RejectReason {
    #[error("Position must be between 1 and {max_members}.")]
    OutOfRange { max_members: u32 },

    #[error("Please enter a bid amount for this position as it's already taken.")]
    BidRequired,
}

/// Resolver outcome.
///
/// `Accepted` carries the record to upsert keyed by `(member_id, group_id)`.
/// `contested` marks an acceptance that still awaits administrative resolution
/// because another member already references the slot.
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq, Eq)]
pub enum Decision {
    Accepted {
        upsert: PreferenceRecord,
        contested: bool,
    },
    Rejected {
        reason: RejectReason,
    },
}

impl Decision {
    pub fn is_accepted(&self) -> bool {
        matches!(self, Decision::Accepted { .. })
    }

    pub fn reason(&self) -> Option<RejectReason> {
        match self {
            Decision::Rejected { reason } => Some(*reason),
            Decision::Accepted { .. } => None,
        }
    }
}

/// True if some member other than `member_id` already references `position`.
///
/// `existing` is one group's listing.
pub fn is_taken_by_other(existing: &[PreferenceRecord], member_id: &str, position: u32) -> bool {
    existing
        .iter()
        .any(|r| r.preferred_position == position && r.member_id != member_id)
}

fn is_occupied(existing: &[PreferenceRecord], request: &PreferenceRequest, cfg: &ResolverCfg) -> bool {
    if cfg.treat_own_slot_as_free {
        is_taken_by_other(existing, &request.member_id, request.preferred_position)
    } else {
        existing
            .iter()
            .any(|r| r.preferred_position == request.preferred_position)
    }
}

pub fn evaluate_preference_cfg(
    request: &PreferenceRequest,
    existing: &[PreferenceRecord],
    max_members: u32,
    cfg: &ResolverCfg,
) -> Decision {
    if !position_in_range(request.preferred_position, max_members) {
        return Decision::Rejected {
            reason: RejectReason::OutOfRange { max_members },
        };
    }

    let contested = is_occupied(existing, request, cfg);
    if contested && !request.has_positive_bid() {
        return Decision::Rejected {
            reason: RejectReason::BidRequired,
        };
    }

    Decision::Accepted {
        upsert: upsert_preference(own_record(existing, request), request),
        contested,
    }
}

/// Validate `request` against the group's current preferences with default cfg.
///
/// Pure and linear in `existing`. The caller performs the read before and the
/// upsert after; see `DisbursementDesk` for a shell that serializes both per group.
pub fn evaluate_preference(
    request: &PreferenceRequest,
    existing: &[PreferenceRecord],
    max_members: u32,
) -> Decision {
    evaluate_preference_cfg(request, existing, max_members, &ResolverCfg::default())
}
