/// Tunables for one [`crate::Level`].
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RulesConfig {
    /// Oldest turns are forgotten past this many snapshots. `None` keeps all.
    pub history_limit: Option<usize>,
}

impl RulesConfig {
    pub fn with_history_limit(limit: usize) -> Self {
        Self {
            history_limit: Some(limit),
        }
    }
}
