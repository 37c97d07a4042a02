mod clock;
mod coordinator;
mod entity;
mod host;
mod metrics;
#[cfg(test)]
pub(crate) mod test_host;

pub use clock::{ClockError, ClockStep, RewindClock, FOLD_TOLERANCE};
pub use coordinator::{RewindCoordinator, RewindError, RewindMode, TickReport};
pub use entity::{ApplyOutcome, EntityError, EntityId, EntityPop, RewindableEntity};
pub use host::{reverse_particle_velocity, EmitterHandle, EntityHandle, RewindHost};
pub use metrics::{MetricsAccumulator, MetricsHandle, RewindMetricsSnapshot};
