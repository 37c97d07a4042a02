//! Time-rewind engine: records rolling per-object history while a host
//! simulation runs live and plays it back, newest first, on request.

mod config;
mod history;
mod runtime;

pub use config::{ConfigError, RewindConfig, MAX_HISTORY_CAPACITY, MIN_HISTORY_CAPACITY};
pub use history::{
    ActionOutcome, CustomAction, DeferredAction, HistoryError, HistoryTrack, PopResult, Sample,
};
pub use runtime::{
    reverse_particle_velocity, ApplyOutcome, ClockError, ClockStep, EmitterHandle, EntityError,
    EntityHandle, EntityId, EntityPop, MetricsAccumulator, MetricsHandle, RewindClock,
    RewindCoordinator, RewindError, RewindHost, RewindMetricsSnapshot, RewindMode,
    RewindableEntity, TickReport, FOLD_TOLERANCE,
};

pub use glam::{Quat, Vec3};
