#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub(crate) struct RoomConfig {
    pub(crate) gravity: f32,
    pub(crate) restitution: f32,
    pub(crate) player_move_speed: f32,
    pub(crate) look_speed_radians: f32,
    pub(crate) crate_spawn_interval_seconds: f32,
    pub(crate) max_crates: u32,
    pub(crate) particles_per_second: f32,
    pub(crate) particle_lifetime_seconds: f32,
    /// Constant wind added to every particle's own velocity.
    pub(crate) particle_drift: Vec3,
}

impl Default for RoomConfig {
    fn default() -> Self {
        Self {
            gravity: -9.81,
            restitution: 0.35,
            player_move_speed: 4.0,
            look_speed_radians: 1.8,
            crate_spawn_interval_seconds: 1.5,
            max_crates: 8,
            particles_per_second: 40.0,
            particle_lifetime_seconds: 3.0,
            particle_drift: Vec3::new(0.3, 0.0, 0.1),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum BodyKind {
    Player,
    Crate,
}

#[derive(Debug, Clone)]
pub(crate) struct Body {
    pub(crate) kind: BodyKind,
    pub(crate) position: Vec3,
    pub(crate) rotation: Quat,
    /// `None` for kinematic bodies that the controller moves directly.
    pub(crate) velocity: Option<Vec3>,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub(crate) struct Particle {
    pub(crate) position: Vec3,
    pub(crate) velocity: Vec3,
    pub(crate) age: f32,
}

#[derive(Debug, Clone)]
pub(crate) struct Emitter {
    handle: EmitterHandle,
    origin: Vec3,
    drift: Vec3,
    particles: Vec<Particle>,
    spawn_accumulator: f32,
    emitted: u32,
}

impl Emitter {
    fn new(handle: EmitterHandle, origin: Vec3, drift: Vec3) -> Self {
        Self {
            handle,
            origin,
            drift,
            particles: Vec::new(),
            spawn_accumulator: 0.0,
            emitted: 0,
        }
    }

    fn emit(&mut self, count: u32) {
        for _ in 0..count {
            let angle = self.emitted as f32 * GOLDEN_ANGLE_RADIANS;
            let velocity = Vec3::new(angle.cos() * 0.4, PARTICLE_SPEED, angle.sin() * 0.4);
            self.particles.push(Particle {
                position: self.origin,
                velocity,
                age: 0.0,
            });
            self.emitted = self.emitted.wrapping_add(1);
        }
    }

    /// Moves particles along their total velocity. Ages run backwards while
    /// `forward` is false, so reversed particles fold back into the emitter.
    fn step(&mut self, dt: f32, forward: bool, rate: f32, lifetime: f32) {
        if forward {
            self.spawn_accumulator += dt * rate.max(0.0);
            let whole = self.spawn_accumulator.floor();
            self.spawn_accumulator -= whole;
            self.emit(whole as u32);
        }
        let age_step = if forward { dt } else { -dt };
        let drift = self.drift;
        for particle in &mut self.particles {
            particle.position += (particle.velocity + drift) * dt;
            particle.age += age_step;
        }
        self.particles
            .retain(|particle| particle.age >= 0.0 && particle.age < lifetime);
    }

    fn reverse(&mut self) {
        let drift = self.drift;
        for particle in &mut self.particles {
            particle.velocity = reverse_particle_velocity(particle.velocity, particle.velocity + drift);
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub(crate) struct LookState {
    pub(crate) yaw: f32,
    pub(crate) pitch: f32,
}

impl LookState {
    pub(crate) fn rotation(&self) -> Quat {
        Quat::from_euler(EulerRot::YXZ, self.yaw, self.pitch, 0.0)
    }
}

#[derive(Debug, Clone, PartialEq)]
pub(crate) struct RoomSummary {
    pub(crate) crates_spawned: u32,
    pub(crate) crates_undone: usize,
    pub(crate) live_crates: usize,
    pub(crate) deaths: u32,
    pub(crate) revivals: u32,
    pub(crate) look_resyncs: u32,
    pub(crate) player_alive: bool,
    pub(crate) player_position: Option<Vec3>,
    pub(crate) look: LookState,
    pub(crate) particles: usize,
    pub(crate) tracked_entities: usize,
}
