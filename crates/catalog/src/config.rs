use core::num::NonZeroUsize;
use core::time::Duration;

use serde::{Deserialize, Serialize};
use storefront_primitives::common::serde_duration;

pub const DEFAULT_BATCH_SIZE: NonZeroUsize = match NonZeroUsize::new(12) {
    Some(size) => size,
    None => unreachable!(),
};

#[derive(Clone, Copy, Debug, Deserialize, Eq, PartialEq, Serialize)]
pub struct CatalogConfig {
    /// Products delivered per page.
    #[serde(default = "default_batch_size")]
    pub batch_size: NonZeroUsize,
}

impl Default for CatalogConfig {
    fn default() -> Self {
        Self {
            batch_size: DEFAULT_BATCH_SIZE,
        }
    }
}

const fn default_batch_size() -> NonZeroUsize {
    DEFAULT_BATCH_SIZE
}

#[derive(Clone, Copy, Debug, Deserialize, Eq, PartialEq, Serialize)]
pub struct StockConfig {
    #[serde(
        rename = "reconnect_initial_ms",
        with = "serde_duration",
        default = "default_reconnect_initial"
    )]
    pub reconnect_initial: Duration,
    #[serde(
        rename = "reconnect_max_ms",
        with = "serde_duration",
        default = "default_reconnect_max"
    )]
    pub reconnect_max: Duration,
    /// Capacity of the notice channel; slow receivers lag past this.
    #[serde(default = "default_notice_capacity")]
    pub notice_capacity: usize,
}

impl Default for StockConfig {
    fn default() -> Self {
        Self {
            reconnect_initial: default_reconnect_initial(),
            reconnect_max: default_reconnect_max(),
            notice_capacity: default_notice_capacity(),
        }
    }
}

const fn default_reconnect_initial() -> Duration {
    Duration::from_millis(500)
}

const fn default_reconnect_max() -> Duration {
    Duration::from_secs(30)
}

const fn default_notice_capacity() -> usize {
    32
}

impl StockConfig {
    /// Delay before reconnect attempt `attempt` (1-based): the initial delay
    /// doubled per earlier attempt, capped at `reconnect_max`.
    #[must_use]
    pub fn backoff_delay(&self, attempt: u32) -> Duration {
        let exponent = attempt.saturating_sub(1).min(16);

        self.reconnect_initial
            .saturating_mul(2_u32.pow(exponent))
            .min(self.reconnect_max)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_backoff_doubles_until_capped() {
        let config = StockConfig {
            reconnect_initial: Duration::from_millis(500),
            reconnect_max: Duration::from_secs(3),
            notice_capacity: 4,
        };

        let delays: Vec<_> = (1..=6).map(|n| config.backoff_delay(n)).collect();

        assert_eq!(
            delays,
            [500, 1000, 2000, 3000, 3000, 3000].map(Duration::from_millis)
        );
    }

    #[test]
    fn test_backoff_never_overflows() {
        let config = StockConfig::default();

        assert_eq!(config.backoff_delay(u32::MAX), config.reconnect_max);
        assert_eq!(config.backoff_delay(0), config.reconnect_initial);
    }
}
