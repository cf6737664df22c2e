use std::sync::Once;

use thrift_disburse_core::{
    Decimal, Decision, GroupCapacity, GroupId, PreferenceRecord, PreferenceRequest,
    PreferenceStatus, RejectReason,
};
use thrift_disburse_supervisor::*;
use tracing_subscriber::{fmt, EnvFilter};

static LOGS: Once = Once::new();

fn init_logs() {
    LOGS.call_once(|| {
        let _ = fmt()
            .with_env_filter(EnvFilter::from_default_env())
            .with_test_writer()
            .try_init();
    });
}

fn store_with_group(group: &str, max_members: u32) -> MemoryStore {
    let store = MemoryStore::new();
    store.insert_group(GroupCapacity::new(group, max_members));
    store
}

/// Store whose reads work but whose writes always fail.
struct ReadOnlyStore(MemoryStore);

impl RecordStore for ReadOnlyStore {
    fn get_group(&self, group_id: &GroupId) -> Result<Option<GroupCapacity>, StoreError> {
        self.0.get_group(group_id)
    }

    fn list_preferences(&self, group_id: &GroupId) -> Result<Vec<PreferenceRecord>, StoreError> {
        self.0.list_preferences(group_id)
    }

    fn upsert_preference(&self, _record: PreferenceRecord) -> Result<PreferenceRecord, StoreError> {
        Err(StoreError::Unavailable("write timeout".to_string()))
    }
}

#[test]
fn submit_free_slot() {
    init_logs();
    let store = store_with_group("g1", 5);
    let desk = DisbursementDesk::default();
    let sink = CollectingSink::default();

    let out = desk
        .submit(&store, &StaticAuth::member("A"), &sink, "g1", 3, None)
        .unwrap();

    assert!(out.decision.is_accepted());
    let stored = out.stored.unwrap();
    assert_eq!(stored.preferred_position, 3);
    assert_eq!(stored.bid_amount, Decimal::ZERO);
    assert_eq!(stored.status, PreferenceStatus::Pending);
    assert_eq!(store.len(), 1);

    let notices = sink.drain();
    assert_eq!(notices.len(), 1);
    assert_eq!(notices[0].level, NoticeLevel::Success);
    assert_eq!(notices[0].member_id.as_deref(), Some("A"));
}

#[test]
fn contested_slot_flow() {
    init_logs();
    let store = store_with_group("g1", 5);
    let desk = DisbursementDesk::default();
    let sink = CollectingSink::default();

    desk.submit(&store, &StaticAuth::member("B"), &sink, "g1", 2, None).unwrap();

    let out = desk
        .submit(&store, &StaticAuth::member("A"), &sink, "g1", 2, Some(Decimal::ZERO))
        .unwrap();
    assert_eq!(out.decision.reason(), Some(RejectReason::BidRequired));
    assert!(out.stored.is_none());

    let out = desk
        .submit(&store, &StaticAuth::member("A"), &sink, "g1", 2, Some(Decimal::from(50)))
        .unwrap();
    assert!(matches!(out.decision, Decision::Accepted { contested: true, .. }));

    let notices = sink.drain();
    assert_eq!(notices.len(), 3);
    assert_eq!(
        notices[1].message,
        "Please enter a bid amount for this position as it's already taken."
    );
    assert_eq!(notices[1].level, NoticeLevel::Error);

    let tally = desk.tally("g1");
    assert_eq!(tally, GroupTally { accepted: 2, contested: 1, rejected: 1, store_faults: 0 });

    let board = desk.board(&store, "g1").unwrap();
    assert_eq!(board.len(), 1);
    assert_eq!(board[0].position, 2);
    assert_eq!(board[0].claimants, vec!["A".to_string(), "B".to_string()]);
}

#[test]
fn out_of_range_message() {
    let store = store_with_group("g1", 5);
    let desk = DisbursementDesk::default();
    let sink = CollectingSink::default();

    let out = desk
        .submit(&store, &StaticAuth::member("A"), &sink, "g1", 6, None)
        .unwrap();
    assert_eq!(out.decision.reason(), Some(RejectReason::OutOfRange { max_members: 5 }));
    assert_eq!(sink.drain()[0].message, "Position must be between 1 and 5.");
    assert!(store.is_empty());
}

#[test]
fn resubmission_overwrites() {
    let store = store_with_group("g1", 5);
    let desk = DisbursementDesk::default();
    let auth = StaticAuth::member("A");

    desk.submit(&store, &auth, &NullSink, "g1", 1, None).unwrap();
    desk.submit(&store, &auth, &NullSink, "g1", 4, Some(Decimal::from(20))).unwrap();

    let rows = store.list_preferences(&"g1".to_string()).unwrap();
    assert_eq!(rows.len(), 1);
    assert_eq!(rows[0].preferred_position, 4);
    assert_eq!(rows[0].bid_amount, Decimal::from(20));

    // own held slot, no bid
    let out = desk.submit(&store, &auth, &NullSink, "g1", 4, None).unwrap();
    assert!(matches!(out.decision, Decision::Accepted { contested: false, .. }));
    assert_eq!(store.len(), 1);
}

#[test]
fn unauthenticated() {
    let store = store_with_group("g1", 5);
    let desk = DisbursementDesk::default();
    let sink = CollectingSink::default();

    let err = desk
        .submit(&store, &StaticAuth::anonymous(), &sink, "g1", 1, None)
        .unwrap_err();
    assert!(matches!(err, DeskError::Unauthenticated));
    let notices = sink.drain();
    assert_eq!(notices[0].member_id, None);
    assert_eq!(notices[0].level, NoticeLevel::Error);
}

#[test]
fn unknown_group() {
    let store = MemoryStore::new();
    let desk = DisbursementDesk::default();

    let err = desk
        .submit(&store, &StaticAuth::member("A"), &NullSink, "missing", 1, None)
        .unwrap_err();
    assert!(matches!(err, DeskError::GroupNotFound(ref g) if g == "missing"));
    assert!(matches!(desk.board(&store, "missing"), Err(DeskError::GroupNotFound(_))));
}

#[test]
fn unknown_group_leaves_no_tally() {
    let store = MemoryStore::new();
    let desk = DisbursementDesk::new(DeskCfg { shards: 3, ..DeskCfg::default() });

    for i in 0..3 {
        let group = format!("nope-{i}");
        let err = desk
            .submit(&store, &StaticAuth::member("A"), &NullSink, &group, 1, None)
            .unwrap_err();
        assert!(matches!(err, DeskError::GroupNotFound(_)));
    }
    let out = desk.submit_batch(&store, &NullSink, &[PreferenceRequest::new("nope-9", "B", 1)]);
    assert!(matches!(out[0], Err(DeskError::GroupNotFound(_))));

    assert!(desk.snapshot().tallies.is_empty());
}

#[test]
fn board_for_huge_group() {
    let store = store_with_group("big", u32::MAX);
    let desk = DisbursementDesk::default();
    desk.submit(&store, &StaticAuth::member("A"), &NullSink, "big", u32::MAX, None).unwrap();
    desk.submit(&store, &StaticAuth::member("B"), &NullSink, "big", 7, None).unwrap();

    let board = desk.board(&store, "big").unwrap();
    let positions: Vec<u32> = board.iter().map(|s| s.position).collect();
    assert_eq!(positions, vec![7, u32::MAX]);
}

#[test]
fn store_fault_surfaces_generic_message() {
    init_logs();
    let store = ReadOnlyStore(store_with_group("g1", 5));
    let desk = DisbursementDesk::default();
    let sink = CollectingSink::default();

    let err = desk
        .submit(&store, &StaticAuth::member("A"), &sink, "g1", 2, None)
        .unwrap_err();
    assert!(matches!(err, DeskError::Store(StoreError::Unavailable(_))));
    assert_eq!(sink.drain()[0].message, "Failed to save preference");
    assert_eq!(desk.tally("g1").store_faults, 1);
    assert_eq!(desk.tally("g1").accepted, 0);
}

#[test]
fn memory_store_rejects_orphan_rows() {
    let store = MemoryStore::new();
    let err = store
        .upsert_preference(PreferenceRecord::new("nowhere", "A", 1))
        .unwrap_err();
    assert_eq!(err, StoreError::UnknownGroup("nowhere".to_string()));
}

#[test]
fn restore_drops_orphan_rows() {
    let store = MemoryStore::new();
    let dropped = store.restore(StoreSnapshot {
        groups: vec![GroupCapacity::new("g1", 5)],
        preferences: vec![
            PreferenceRecord::new("ghost", "A", 1),
            PreferenceRecord::new("g1", "B", 2),
        ],
    });
    assert_eq!(dropped, 1);
    assert_eq!(store.len(), 1);
    assert!(store.list_preferences(&"ghost".to_string()).unwrap().is_empty());

    let dropped = store.restore(StoreSnapshot {
        groups: vec![],
        preferences: vec![PreferenceRecord::new("ghost", "A", 1)],
    });
    assert_eq!(dropped, 1);
    assert!(store.is_empty());
}

#[test]
fn concurrent_same_free_slot() {
    let store = store_with_group("g1", 5);
    let desk = DisbursementDesk::new(DeskCfg { shards: 4, ..DeskCfg::default() });

    let outcomes: Vec<SubmissionOutcome> = std::thread::scope(|s| {
        let handles: Vec<_> = ["A", "B"]
            .into_iter()
            .map(|member| {
                let (store, desk) = (&store, &desk);
                s.spawn(move || {
                    desk.submit(store, &StaticAuth::member(member), &NullSink, "g1", 3, None)
                        .unwrap()
                })
            })
            .collect();
        handles.into_iter().map(|h| h.join().unwrap()).collect()
    });

    let accepted = outcomes.iter().filter(|o| o.decision.is_accepted()).count();
    let bid_required = outcomes
        .iter()
        .filter(|o| o.decision.reason() == Some(RejectReason::BidRequired))
        .count();
    assert_eq!(accepted, 1);
    assert_eq!(bid_required, 1);
    assert_eq!(store.len(), 1);
}

#[test]
fn batch_keeps_input_order() {
    let store = store_with_group("g1", 3);
    store.insert_group(GroupCapacity::new("g2", 2));
    let desk = DisbursementDesk::new(DeskCfg { shards: 3, ..DeskCfg::default() });

    let reqs = vec![
        PreferenceRequest::new("g1", "A", 1),
        PreferenceRequest::new("g2", "A", 2),
        PreferenceRequest::new("g1", "B", 1),
        PreferenceRequest::new("g1", "B", 1).with_bid(Decimal::from(5)),
        PreferenceRequest::new("g2", "C", 9),
        PreferenceRequest::new("g3", "C", 1),
    ];
    let out = desk.submit_batch(&store, &NullSink, &reqs);
    assert_eq!(out.len(), reqs.len());

    assert!(out[0].as_ref().unwrap().decision.is_accepted());
    assert!(out[1].as_ref().unwrap().decision.is_accepted());
    assert_eq!(out[2].as_ref().unwrap().decision.reason(), Some(RejectReason::BidRequired));
    assert!(matches!(
        out[3].as_ref().unwrap().decision,
        Decision::Accepted { contested: true, .. }
    ));
    assert_eq!(
        out[4].as_ref().unwrap().decision.reason(),
        Some(RejectReason::OutOfRange { max_members: 2 })
    );
    assert!(matches!(out[5], Err(DeskError::GroupNotFound(_))));
    assert_eq!(out[3].as_ref().unwrap().request.member_id, "B");
}

#[test]
fn tally_snapshot_restore() {
    let store = store_with_group("g1", 5);
    let desk = DisbursementDesk::new(DeskCfg { shards: 2, ..DeskCfg::default() });
    desk.submit(&store, &StaticAuth::member("A"), &NullSink, "g1", 1, None).unwrap();
    desk.submit(&store, &StaticAuth::member("B"), &NullSink, "g1", 9, None).unwrap();

    let snap = desk.snapshot();
    let json = serde_json::to_string(&snap).unwrap();
    let snap: DeskSnapshot = serde_json::from_str(&json).unwrap();

    let fresh = DisbursementDesk::new(DeskCfg { shards: 5, ..DeskCfg::default() });
    fresh.restore_merge(DeskSnapshot {
        tallies: vec![("g9".to_string(), GroupTally { rejected: 4, ..GroupTally::default() })],
    });
    let stats = fresh.restore(snap);
    assert_eq!(stats, RestoreStats { applied: 1, overwritten: 0 });
    assert_eq!(fresh.tally("g1"), desk.tally("g1"));
    assert_eq!(fresh.tally("g9"), GroupTally::default());

    fresh.clear_group("g1");
    assert_eq!(fresh.tally("g1"), GroupTally::default());
}

#[test]
fn store_snapshot_roundtrip() {
    let store = store_with_group("g1", 5);
    let desk = DisbursementDesk::default();
    desk.submit(&store, &StaticAuth::member("A"), &NullSink, "g1", 2, None).unwrap();

    let snap = store.snapshot();
    let copy = MemoryStore::new();
    let dropped = copy.restore(serde_json::from_str(&serde_json::to_string(&snap).unwrap()).unwrap());
    assert_eq!(dropped, 0);
    assert_eq!(copy.snapshot(), snap);
    assert_eq!(copy.list_preferences(&"g1".to_string()).unwrap()[0].member_id, "A");
}

#[test]
fn strict_cfg_from_desk() {
    let store = store_with_group("g1", 5);
    let mut cfg = DeskCfg::default();
    cfg.resolver.treat_own_slot_as_free = false;
    let desk = DisbursementDesk::new(cfg);
    let auth = StaticAuth::member("A");

    desk.submit(&store, &auth, &NullSink, "g1", 2, None).unwrap();
    let out = desk.submit(&store, &auth, &NullSink, "g1", 2, None).unwrap();
    assert_eq!(out.decision.reason(), Some(RejectReason::BidRequired));
}
