use rust_decimal::Decimal;

use crate::record::{PreferenceRecord, PreferenceRequest, PreferenceStatus};

/// Build the record to store for `request`.
///
/// If `existing` is the member's record for the same group it is replaced in
/// place (same identity); otherwise a fresh record is created. Either way the
/// result is `Pending`. An absent bid stores as zero and negative bids are
/// floored at zero.
pub fn upsert_preference(
    existing: Option<&PreferenceRecord>,
    request: &PreferenceRequest,
) -> PreferenceRecord {
    let bid_amount = request.bid_amount.unwrap_or(Decimal::ZERO).max(Decimal::ZERO);

    match existing {
        Some(prev) if prev.same_identity(&request.member_id, &request.group_id) => {
            let mut rec = prev.clone();
            rec.preferred_position = request.preferred_position;
            rec.bid_amount = bid_amount;
            rec.status = PreferenceStatus::Pending;
            rec
        }
        _ => PreferenceRecord {
            group_id: request.group_id.clone(),
            member_id: request.member_id.clone(),
            preferred_position: request.preferred_position,
            bid_amount,
            status: PreferenceStatus::Pending,
        },
    }
}

/// Find the member's own record in a group listing.
pub fn own_record<'a>(
    existing: &'a [PreferenceRecord],
    request: &PreferenceRequest,
) -> Option<&'a PreferenceRecord> {
    existing
        .iter()
        .find(|r| r.same_identity(&request.member_id, &request.group_id))
}
