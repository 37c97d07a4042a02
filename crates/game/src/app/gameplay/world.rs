/// The room's simulation state and the host side of the rewind engine.
#[derive(Debug)]
pub(crate) struct RoomWorld {
    bodies: BTreeMap<EntityHandle, Body>,
    next_handle: u64,
    player: EntityHandle,
    look: LookState,
    player_alive: bool,
    forward_control_enabled: bool,
    emitter: Emitter,
    destroyed: Vec<EntityHandle>,
    revivals: u32,
    look_resyncs: u32,
}

impl RoomWorld {
    pub(crate) fn new(particle_drift: Vec3) -> Self {
        let mut world = Self {
            bodies: BTreeMap::new(),
            next_handle: 1,
            player: EntityHandle(0),
            look: LookState::default(),
            player_alive: true,
            forward_control_enabled: true,
            emitter: Emitter::new(EMITTER_HANDLE, EMITTER_ORIGIN, particle_drift),
            destroyed: Vec::new(),
            revivals: 0,
            look_resyncs: 0,
        };
        world.player = world.spawn(BodyKind::Player, PLAYER_SPAWN, None);
        world
    }

    pub(crate) fn spawn(
        &mut self,
        kind: BodyKind,
        position: Vec3,
        velocity: Option<Vec3>,
    ) -> EntityHandle {
        let handle = EntityHandle(self.next_handle);
        self.next_handle = self.next_handle.saturating_add(1);
        self.bodies.insert(
            handle,
            Body {
                kind,
                position,
                rotation: Quat::IDENTITY,
                velocity,
            },
        );
        handle
    }

    pub(crate) fn player(&self) -> EntityHandle {
        self.player
    }

    pub(crate) fn emitter_handle(&self) -> EmitterHandle {
        self.emitter.handle
    }

    pub(crate) fn body(&self, handle: EntityHandle) -> Option<&Body> {
        self.bodies.get(&handle)
    }

    pub(crate) fn body_count(&self, kind: BodyKind) -> usize {
        self.bodies.values().filter(|body| body.kind == kind).count()
    }

    pub(crate) fn particles(&self) -> &[Particle] {
        &self.emitter.particles
    }

    pub(crate) fn look(&self) -> LookState {
        self.look
    }

    pub(crate) fn is_player_alive(&self) -> bool {
        self.player_alive
    }

    pub(crate) fn forward_control_enabled(&self) -> bool {
        self.forward_control_enabled
    }

    pub(crate) fn destroyed(&self) -> &[EntityHandle] {
        &self.destroyed
    }

    pub(crate) fn revivals(&self) -> u32 {
        self.revivals
    }

    pub(crate) fn look_resyncs(&self) -> u32 {
        self.look_resyncs
    }

    /// Returns `false` if the player was already dead.
    pub(crate) fn kill_player(&mut self) -> bool {
        std::mem::replace(&mut self.player_alive, false)
    }

    pub(crate) fn step_player(&mut self, actions: &ActionStates, dt: f32, config: &RoomConfig) {
        if !self.player_alive {
            return;
        }
        let turn = actions.axis(InputAction::LookRight, InputAction::LookLeft);
        let tilt = actions.axis(InputAction::LookDown, InputAction::LookUp);
        self.look.yaw += turn * config.look_speed_radians * dt;
        self.look.pitch = (self.look.pitch + tilt * config.look_speed_radians * dt)
            .clamp(-MAX_PITCH_RADIANS, MAX_PITCH_RADIANS);

        let heading = Quat::from_rotation_y(self.look.yaw);
        let forward = heading * Vec3::NEG_Z;
        let right = heading * Vec3::X;
        let wish = forward * actions.axis(InputAction::MoveBack, InputAction::MoveForward)
            + right * actions.axis(InputAction::StrafeLeft, InputAction::StrafeRight);
        let step = wish.normalize_or_zero() * config.player_move_speed * dt;

        let rotation = self.look.rotation();
        if let Some(body) = self.bodies.get_mut(&self.player) {
            let limit = ROOM_HALF_EXTENT - CRATE_HALF_EXTENT;
            body.position.x = (body.position.x + step.x).clamp(-limit, limit);
            body.position.z = (body.position.z + step.z).clamp(-limit, limit);
            body.rotation = rotation;
        }
    }

    /// Gravity, floor bounce and wall bounce for every body with a velocity.
    pub(crate) fn step_bodies(&mut self, dt: f32, config: &RoomConfig) {
        let wall = ROOM_HALF_EXTENT - CRATE_HALF_EXTENT;
        for body in self.bodies.values_mut() {
            let Some(mut velocity) = body.velocity else {
                continue;
            };
            velocity.y += config.gravity * dt;
            body.position += velocity * dt;

            if body.position.y < CRATE_HALF_EXTENT {
                body.position.y = CRATE_HALF_EXTENT;
                velocity.y = -velocity.y * config.restitution;
                if velocity.y.abs() < REST_SPEED {
                    velocity.y = 0.0;
                }
                velocity.x *= FLOOR_FRICTION;
                velocity.z *= FLOOR_FRICTION;
            }
            if body.position.x.abs() > wall {
                body.position.x = body.position.x.clamp(-wall, wall);
                velocity.x = -velocity.x * config.restitution;
            }
            if body.position.z.abs() > wall {
                body.position.z = body.position.z.clamp(-wall, wall);
                velocity.z = -velocity.z * config.restitution;
            }

            let spin = Vec3::new(velocity.x, 0.0, velocity.z).length() * SPIN_PER_UNIT_SPEED;
            body.rotation = (Quat::from_rotation_y(spin * dt) * body.rotation).normalize();
            body.velocity = Some(velocity);
        }
    }

    pub(crate) fn step_particles(&mut self, dt: f32, config: &RoomConfig) {
        self.emitter.step(
            dt,
            self.forward_control_enabled,
            config.particles_per_second,
            config.particle_lifetime_seconds,
        );
    }
}

impl RewindHost for RoomWorld {
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
    }

    fn write_velocity(&mut self, handle: EntityHandle, velocity: Vec3) {
        if let Some(body) = self.bodies.get_mut(&handle) {
            if body.velocity.is_some() {
                body.velocity = Some(velocity);
            }
        }
    }

    fn set_forward_control_enabled(&mut self, enabled: bool) {
        self.forward_control_enabled = enabled;
    }

    fn resync_look_orientation(&mut self, handle: EntityHandle) {
        if handle != self.player {
            return;
        }
        let Some(body) = self.bodies.get(&handle) else {
            return;
        };
        let (yaw, pitch, _roll) = body.rotation.to_euler(EulerRot::YXZ);
        self.look = LookState {
            yaw,
            pitch: pitch.clamp(-MAX_PITCH_RADIANS, MAX_PITCH_RADIANS),
        };
        self.look_resyncs = self.look_resyncs.saturating_add(1);
        debug!(yaw, pitch, "look_resynced");
    }

    fn reverse_particle_velocities(&mut self, emitter: EmitterHandle) {
        if emitter == self.emitter.handle {
            self.emitter.reverse();
            debug!(
                particle_count = self.emitter.particles.len(),
                "particles_reversed"
            );
        }
    }

    fn destroy(&mut self, handle: EntityHandle) {
        if self.bodies.remove(&handle).is_some() {
            self.destroyed.push(handle);
            info!(entity = %handle, "body_destroyed");
        }
    }

    fn run_custom_action(&mut self, handle: EntityHandle, action: &CustomAction) -> ActionOutcome {
        match action.name.as_str() {
            REVIVE_ACTION if handle == self.player => {
                if !self.player_alive {
                    self.player_alive = true;
                    self.revivals = self.revivals.saturating_add(1);
                    info!(entity = %handle, payload = %action.payload, "player_revived");
                }
            }
            other => {
                warn!(entity = %handle, action = other, "unknown_custom_action");
            }
        }
        ActionOutcome::Continue
    }
}
