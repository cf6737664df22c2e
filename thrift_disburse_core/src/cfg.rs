#[derive(Clone, Debug, serde::Serialize, serde::Deserialize)]
pub struct ResolverCfg {
    /// A member re-selecting the slot their own record already holds is not
    /// contested by that record. Turn off for strict administrative re-checks.
    pub treat_own_slot_as_free: bool,
}

impl Default for ResolverCfg {
    fn default() -> Self {
        Self {
            treat_own_slot_as_free: true,
        }
    }
}
