//! Update rate control for record subscriptions

use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Update rate for record subscriptions
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum UpdateRate {
    /// Every record as the meter reports it
    Native,

    /// At most this many records per second, latest wins
    Max(u32),
}

impl UpdateRate {
    /// Minimum spacing between records, `None` when no limiting applies.
    ///
    /// `Max(0)` is treated as `Native`.
    pub fn min_interval(self) -> Option<Duration> {
        match self {
            UpdateRate::Native | UpdateRate::Max(0) => None,
            UpdateRate::Max(hz) => Some(Duration::from_secs_f64(1.0 / hz as f64)),
        }
    }

    /// Check if throttling is needed
    pub fn needs_throttle(self) -> bool {
        self.min_interval().is_some()
    }
}

impl Default for UpdateRate {
    fn default() -> Self {
        UpdateRate::Native
    }
}
