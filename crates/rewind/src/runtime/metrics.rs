use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, RwLock};
use std::time::{Duration, Instant};

use tracing::warn;

static METRICS_LOCK_POISON_WARNED: AtomicBool = AtomicBool::new(false);

fn warn_metrics_lock_poison_once(operation: &'static str) {
    if METRICS_LOCK_POISON_WARNED
        .compare_exchange(false, true, Ordering::Relaxed, Ordering::Relaxed)
        .is_ok()
    {
        warn!(operation, "metrics lock poisoned; recovered inner value");
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct RewindMetricsSnapshot {
    pub fps: f32,
    pub snaps_per_second: f32,
    pub pops_per_second: f32,
    pub interpolations_per_second: f32,
    pub tracked_entities: usize,
}

#[derive(Clone, Debug)]
pub struct MetricsHandle {
    snapshot: Arc<RwLock<RewindMetricsSnapshot>>,
}

impl Default for MetricsHandle {
    fn default() -> Self {
        Self {
            snapshot: Arc::new(RwLock::new(RewindMetricsSnapshot::default())),
        }
    }
}

impl MetricsHandle {
    pub fn snapshot(&self) -> RewindMetricsSnapshot {
        match self.snapshot.read() {
            Ok(guard) => *guard,
            Err(poisoned) => {
                warn_metrics_lock_poison_once("read");
                *poisoned.into_inner()
            }
        }
    }

    pub fn publish(&self, snapshot: RewindMetricsSnapshot) {
        match self.snapshot.write() {
            Ok(mut guard) => *guard = snapshot,
            Err(poisoned) => {
                warn_metrics_lock_poison_once("write");
                let mut guard = poisoned.into_inner();
                *guard = snapshot;
            }
        }
    }
}

/// Counts per-interval work and turns it into rates.
///
/// Time is passed in explicitly so hosts with a simulated clock can drive it.
#[derive(Debug)]
pub struct MetricsAccumulator {
    interval_start: Instant,
    interval: Duration,
    frames: u32,
    snaps: u32,
    pops: u32,
    interpolations: u32,
}

impl MetricsAccumulator {
    pub fn new(interval: Duration, start: Instant) -> Self {
        Self {
            interval_start: start,
            interval,
            frames: 0,
            snaps: 0,
            pops: 0,
            interpolations: 0,
        }
    }

    pub fn record_frame(&mut self) {
        self.frames = self.frames.saturating_add(1);
    }

    pub fn record_snaps(&mut self, count: u32) {
        self.snaps = self.snaps.saturating_add(count);
    }

    pub fn record_pops(&mut self, count: u32) {
        self.pops = self.pops.saturating_add(count);
    }

    pub fn record_interpolation(&mut self) {
        self.interpolations = self.interpolations.saturating_add(1);
    }

    pub fn maybe_snapshot(
        &mut self,
        now: Instant,
        tracked_entities: usize,
    ) -> Option<RewindMetricsSnapshot> {
        let elapsed = now.saturating_duration_since(self.interval_start);
        if elapsed < self.interval {
            return None;
        }

        let elapsed_seconds = elapsed.as_secs_f32().max(f32::EPSILON);
        let snapshot = RewindMetricsSnapshot {
            fps: self.frames as f32 / elapsed_seconds,
            snaps_per_second: self.snaps as f32 / elapsed_seconds,
            pops_per_second: self.pops as f32 / elapsed_seconds,
            interpolations_per_second: self.interpolations as f32 / elapsed_seconds,
            tracked_entities,
        };

        self.interval_start = now;
        self.frames = 0;
        self.snaps = 0;
        self.pops = 0;
        self.interpolations = 0;

        Some(snapshot)
    }
}
