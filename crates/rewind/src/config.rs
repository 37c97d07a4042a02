use serde::{Deserialize, Serialize};
use thiserror::Error;

pub const MIN_HISTORY_CAPACITY: usize = 2;
/// Upper bound on samples per entity. Ten hours at 20 snapshots a second
/// stays under it.
pub const MAX_HISTORY_CAPACITY: usize = 1 << 20;

#[derive(Debug, Clone, PartialEq, Error)]
pub enum ConfigError {
    #[error("snaps_per_second must be a finite number above zero, got {0}")]
    InvalidSnapRate(f32),
    #[error("seconds_saved must be a finite number above zero, got {0}")]
    InvalidSecondsSaved(f32),
    #[error(
        "history capacity {capacity} (snaps_per_second * seconds_saved, rounded) is below the minimum of {min}"
    )]
    CapacityTooSmall { capacity: usize, min: usize },
    #[error(
        "history capacity {capacity} (snaps_per_second * seconds_saved, rounded) exceeds the maximum of {max}"
    )]
    CapacityTooLarge { capacity: usize, max: usize },
    #[error("cannot change history rate or depth while {recorded} entities hold recorded history; clear history first")]
    HistoryNotEmpty { recorded: usize },
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct RewindConfig {
    /// Snapshots committed per second of live play.
    pub snaps_per_second: f32,
    /// Seconds of history kept before the oldest snapshots are evicted.
    pub seconds_saved: f32,
}

impl Default for RewindConfig {
    fn default() -> Self {
        Self {
            snaps_per_second: 20.0,
            seconds_saved: 10.0,
        }
    }
}

impl RewindConfig {
    pub fn new(snaps_per_second: f32, seconds_saved: f32) -> Self {
        Self {
            snaps_per_second,
            seconds_saved,
        }
    }

    /// `round(snaps_per_second * seconds_saved)`.
    pub fn capacity(&self) -> usize {
        let total = (self.snaps_per_second * self.seconds_saved).round();
        if total.is_finite() && total > 0.0 {
            total as usize
        } else {
            0
        }
    }

    pub fn snap_interval(&self) -> f32 {
        self.snaps_per_second.recip()
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if !(self.snaps_per_second.is_finite() && self.snaps_per_second > 0.0) {
            return Err(ConfigError::InvalidSnapRate(self.snaps_per_second));
        }
        if !(self.seconds_saved.is_finite() && self.seconds_saved > 0.0) {
            return Err(ConfigError::InvalidSecondsSaved(self.seconds_saved));
        }
        let capacity = self.capacity();
        if capacity < MIN_HISTORY_CAPACITY {
            return Err(ConfigError::CapacityTooSmall {
                capacity,
                min: MIN_HISTORY_CAPACITY,
            });
        }
        if capacity > MAX_HISTORY_CAPACITY {
            return Err(ConfigError::CapacityTooLarge {
                capacity,
                max: MAX_HISTORY_CAPACITY,
            });
        }
        Ok(())
    }
}
