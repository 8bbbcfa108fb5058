use core::time::Duration;

use serde::{Deserialize, Serialize};
use storefront_primitives::common::serde_duration;

#[derive(Clone, Copy, Debug, Deserialize, Eq, PartialEq, Serialize)]
pub struct CartConfig {
    /// How long a removed line can be restored.
    #[serde(
        rename = "undo_window_ms",
        with = "serde_duration",
        default = "default_undo_window"
    )]
    pub undo_window: Duration,
    #[serde(default = "default_notice_capacity")]
    pub notice_capacity: usize,
}

impl Default for CartConfig {
    fn default() -> Self {
        Self {
            undo_window: default_undo_window(),
            notice_capacity: default_notice_capacity(),
        }
    }
}

const fn default_undo_window() -> Duration {
    Duration::from_secs(5)
}

const fn default_notice_capacity() -> usize {
    32
}
