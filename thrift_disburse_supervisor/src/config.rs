use std::{env, fmt::Display, str::FromStr};

use thrift_disburse_core::ResolverCfg;
use tracing::{info, warn};

pub const SHARDS_VAR: &str = "THRIFT_DESK_SHARDS";
pub const STRICT_OWN_SLOT_VAR: &str = "THRIFT_DESK_STRICT_OWN_SLOT";

#[derive(Clone, Debug)]
pub struct DeskCfg {
    /// Number of group-serialization shards. Values below 1 are raised to 1.
    pub shards: usize,
    pub resolver: ResolverCfg,
}

impl Default for DeskCfg {
    fn default() -> Self {
        Self {
            shards: 1,
            resolver: ResolverCfg::default(),
        }
    }
}

impl DeskCfg {
    /// Read overrides from the environment, falling back to defaults with a log line.
    pub fn from_env() -> Self {
        let defaults = Self::default();
        let strict: bool = try_load(STRICT_OWN_SLOT_VAR, false);
        Self {
            shards: try_load(SHARDS_VAR, defaults.shards).max(1),
            resolver: ResolverCfg {
                treat_own_slot_as_free: !strict,
            },
        }
    }
}

fn try_load<T>(key: &str, default: T) -> T
where
    T: FromStr + Display,
    T::Err: Display,
{
    match env::var(key) {
        Ok(raw) => raw.trim().parse().unwrap_or_else(|e| {
            warn!("Invalid {key} value {raw:?}: {e}, using default: {default}");
            default
        }),
        Err(_) => {
            info!("{key} not set, using default: {default}");
            default
        }
    }
}
