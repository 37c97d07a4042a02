use std::collections::{BTreeMap, HashMap};

use glam::{Quat, Vec3};

use super::{EmitterHandle, EntityHandle, RewindHost};
use crate::history::{ActionOutcome, CustomAction};

#[derive(Debug, Clone, PartialEq)]
pub(crate) enum HostEvent {
    WriteTransform(EntityHandle, Vec3, Quat),
    WriteVelocity(EntityHandle, Vec3),
    ForwardControl(bool),
    ResyncLook(EntityHandle),
    ReverseParticles(EmitterHandle),
    Destroy(EntityHandle),
    Custom(EntityHandle, String),
}

#[derive(Debug, Clone)]
pub(crate) struct Body {
    pub(crate) position: Vec3,
    pub(crate) rotation: Quat,
    pub(crate) velocity: Option<Vec3>,
}

/// In-memory host that records every outward call in order.
#[derive(Debug, Default)]
pub(crate) struct RecordingHost {
    pub(crate) bodies: BTreeMap<EntityHandle, Body>,
    pub(crate) events: Vec<HostEvent>,
    pub(crate) custom_outcomes: HashMap<String, ActionOutcome>,
}

impl RecordingHost {
    pub(crate) fn insert_body(&mut self, handle: EntityHandle, position: Vec3, velocity: Option<Vec3>) {
        self.bodies.insert(
            handle,
            Body {
                position,
                rotation: Quat::IDENTITY,
                velocity,
            },
        );
    }

    pub(crate) fn move_to(&mut self, handle: EntityHandle, position: Vec3) {
        if let Some(body) = self.bodies.get_mut(&handle) {
            body.position = position;
        }
    }

    pub(crate) fn set_velocity(&mut self, handle: EntityHandle, velocity: Vec3) {
        if let Some(body) = self.bodies.get_mut(&handle) {
            body.velocity = Some(velocity);
        }
    }

    pub(crate) fn position(&self, handle: EntityHandle) -> Option<Vec3> {
        self.bodies.get(&handle).map(|body| body.position)
    }

    pub(crate) fn count(&self, predicate: impl Fn(&HostEvent) -> bool) -> usize {
        self.events.iter().filter(|event| predicate(event)).count()
    }
}

impl RewindHost for RecordingHost {
    fn read_transform(&self, handle: EntityHandle) -> Option<(Vec3, Quat)> {
        self.bodies
            .get(&handle)
            .map(|body| (body.position, body.rotation))
    }

    fn read_velocity(&self, handle: EntityHandle) -> Option<Vec3> {
        self.bodies.get(&handle).and_then(|body| body.velocity)
    }

    fn write_transform(&mut self, handle: EntityHandle, position: Vec3, rotation: Quat) {
        if let Some(body) = self.bodies.get_mut(&handle) {
            body.position = position;
            body.rotation = rotation;
        }
        self.events
            .push(HostEvent::WriteTransform(handle, position, rotation));
    }

    fn write_velocity(&mut self, handle: EntityHandle, velocity: Vec3) {
        if let Some(body) = self.bodies.get_mut(&handle) {
            body.velocity = Some(velocity);
        }
        self.events.push(HostEvent::WriteVelocity(handle, velocity));
    }

    fn set_forward_control_enabled(&mut self, enabled: bool) {
        self.events.push(HostEvent::ForwardControl(enabled));
    }

    fn resync_look_orientation(&mut self, handle: EntityHandle) {
        self.events.push(HostEvent::ResyncLook(handle));
    }

    fn reverse_particle_velocities(&mut self, emitter: EmitterHandle) {
        self.events.push(HostEvent::ReverseParticles(emitter));
    }

    fn destroy(&mut self, handle: EntityHandle) {
        self.bodies.remove(&handle);
        self.events.push(HostEvent::Destroy(handle));
    }

    fn run_custom_action(&mut self, handle: EntityHandle, action: &CustomAction) -> ActionOutcome {
        self.events
            .push(HostEvent::Custom(handle, action.name.clone()));
        self.custom_outcomes
            .get(&action.name)
            .copied()
            .unwrap_or_default()
    }
}
