use thiserror::Error;

/// How far below zero a fold may land before it counts as a timing fault
/// rather than float drift.
pub const FOLD_TOLERANCE: f32 = 1e-5;

/// Above this many pending intervals, whole intervals are removed in one
/// step instead of one at a time.
const BULK_SKIP_RATIO: f32 = 64.0;

#[derive(Debug, Clone, Copy, PartialEq, Error)]
pub enum ClockError {
    #[error(
        "rewind fold went negative ({folded}s): elapsed {elapsed}s exceeds snapshot interval {interval}s"
    )]
    NegativeFold {
        interval: f32,
        elapsed: f32,
        folded: f32,
    },
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ClockStep {
    /// Snapshot boundaries crossed during this advance.
    pub steps: u32,
    /// Position between the last crossed boundary and the next one, in
    /// units of the interval.
    pub fraction: f32,
}

/// Fixed-cadence accumulator that decouples snapshot timing from frame
/// timing.
#[derive(Debug, Clone)]
pub struct RewindClock {
    interval: f32,
    time_elapsed: f32,
}

impl RewindClock {
    pub fn new(snaps_per_second: f32) -> Self {
        Self {
            interval: snaps_per_second.recip(),
            time_elapsed: 0.0,
        }
    }

    pub fn interval(&self) -> f32 {
        self.interval
    }

    pub fn time_elapsed(&self) -> f32 {
        self.time_elapsed
    }

    pub fn fraction(&self) -> f32 {
        self.time_elapsed / self.interval
    }

    pub fn reset(&mut self) {
        self.time_elapsed = 0.0;
    }

    #[cfg(test)]
    pub(crate) fn set_time_elapsed(&mut self, time_elapsed: f32) {
        self.time_elapsed = time_elapsed;
    }

    /// Mirrors the accumulated time around the interval. Entering rewind
    /// flips which boundary the clock is approaching.
    pub fn fold(&mut self) -> Result<(), ClockError> {
        let elapsed = self.time_elapsed;
        let folded = self.interval - elapsed;
        if folded >= 0.0 {
            self.time_elapsed = folded;
            return Ok(());
        }

        self.time_elapsed = 0.0;
        if folded < -FOLD_TOLERANCE {
            return Err(ClockError::NegativeFold {
                interval: self.interval,
                elapsed,
                folded,
            });
        }
        Ok(())
    }

    pub fn advance(&mut self, delta_seconds: f32) -> ClockStep {
        if delta_seconds.is_finite() && delta_seconds > 0.0 {
            self.time_elapsed += delta_seconds;
        }

        let mut steps = 0u32;
        if self.time_elapsed / self.interval > BULK_SKIP_RATIO {
            // f32 subtraction stops making progress once elapsed dwarfs the
            // interval, so skip all but the last boundary in f64.
            let elapsed = f64::from(self.time_elapsed);
            let interval = f64::from(self.interval);
            let skipped = (elapsed / interval).floor() - 1.0;
            self.time_elapsed = (elapsed - skipped * interval).max(0.0) as f32;
            steps = skipped as u32;
        }
        while self.time_elapsed > self.interval {
            self.time_elapsed -= self.interval;
            steps = steps.saturating_add(1);
        }

        ClockStep {
            steps,
            fraction: self.fraction(),
        }
    }
}
