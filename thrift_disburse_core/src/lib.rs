pub mod record;
pub mod cfg;
pub mod upsert;
pub mod decide;
pub mod board;

pub use record::{GroupCapacity, GroupId, MemberId, PreferenceRecord, PreferenceRequest, PreferenceStatus, position_in_range};
pub use cfg::ResolverCfg;
pub use upsert::{upsert_preference, own_record};
pub use decide::{Decision, RejectReason, evaluate_preference, evaluate_preference_cfg, is_taken_by_other};
pub use board::{PositionSlot, position_board, free_positions, contested_positions};

pub use rust_decimal::Decimal;
