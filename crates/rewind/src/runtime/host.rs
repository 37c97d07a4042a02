use std::fmt;

use glam::{Quat, Vec3};
use serde::{Deserialize, Serialize};

use crate::history::{ActionOutcome, CustomAction};

/// Opaque reference to an object owned by the host application.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct EntityHandle(pub u64);

impl fmt::Display for EntityHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct EmitterHandle(pub u64);

/// Everything the rewind engine needs from the application it runs in.
///
/// Reads sample the simulation, writes play interpolated history back, and
/// the remaining calls are mode-transition and action side effects.
pub trait RewindHost {
    /// `None` when the handle no longer refers to a live object.
    fn read_transform(&self, handle: EntityHandle) -> Option<(Vec3, Quat)>;

    /// `Some` only for objects with a physics body.
    fn read_velocity(&self, handle: EntityHandle) -> Option<Vec3>;

    fn write_transform(&mut self, handle: EntityHandle, position: Vec3, rotation: Quat);

    fn write_velocity(&mut self, handle: EntityHandle, velocity: Vec3);

    fn set_forward_control_enabled(&mut self, enabled: bool);

    fn resync_look_orientation(&mut self, handle: EntityHandle);

    /// Called once when rewind starts and once when it stops, for every
    /// registered emitter.
    fn reverse_particle_velocities(&mut self, emitter: EmitterHandle);

    fn destroy(&mut self, handle: EntityHandle);

    fn run_custom_action(&mut self, _handle: EntityHandle, _action: &CustomAction) -> ActionOutcome {
        ActionOutcome::Continue
    }
}

/// Reflects a particle's own velocity about its total velocity
/// (`v - 2 * total`). Applying it twice restores the original velocity as
/// long as the external contribution (`total - v`) is unchanged.
pub fn reverse_particle_velocity(velocity: Vec3, total_velocity: Vec3) -> Vec3 {
    velocity - 2.0 * total_velocity
}
