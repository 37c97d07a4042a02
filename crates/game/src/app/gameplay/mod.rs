use std::collections::BTreeMap;

use glam::{EulerRot, Quat, Vec3};
use rewind::{
    reverse_particle_velocity, ActionOutcome, CustomAction, DeferredAction, EmitterHandle,
    EntityHandle, RewindCoordinator, RewindHost, TickReport,
};
use serde::{Deserialize, Serialize};
use serde_json::json;
use tracing::{debug, info, warn};

use super::input::{ActionStates, InputAction};

const ROOM_HALF_EXTENT: f32 = 5.0;
const CRATE_HALF_EXTENT: f32 = 0.25;
const PLAYER_EYE_HEIGHT: f32 = 1.6;
const PLAYER_SPAWN: Vec3 = Vec3::new(0.0, PLAYER_EYE_HEIGHT, 3.0);
const MAX_PITCH_RADIANS: f32 = 1.4;
const REST_SPEED: f32 = 0.2;
const FLOOR_FRICTION: f32 = 0.8;
const SPIN_PER_UNIT_SPEED: f32 = 1.5;
const EMITTER_HANDLE: EmitterHandle = EmitterHandle(1);
const EMITTER_ORIGIN: Vec3 = Vec3::new(0.0, 0.2, -3.0);
const PARTICLE_SPEED: f32 = 1.5;
const GOLDEN_ANGLE_RADIANS: f32 = 2.399_963;
const REVIVE_ACTION: &str = "revive";
const STARTING_CRATES: [Vec3; 2] = [
    Vec3::new(-2.0, CRATE_HALF_EXTENT, -1.0),
    Vec3::new(2.0, CRATE_HALF_EXTENT, -1.5),
];

include!("types.rs");
include!("world.rs");
include!("scene_impl.rs");
