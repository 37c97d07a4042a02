pub(crate) struct RoomScene {
    config: RoomConfig,
    world: RoomWorld,
    spawn_timer: f32,
    crates_spawned: u32,
    deaths: u32,
}

impl RoomScene {
    pub(crate) fn new(config: RoomConfig) -> Self {
        Self {
            world: RoomWorld::new(config.particle_drift),
            config,
            spawn_timer: 0.0,
            crates_spawned: 0,
            deaths: 0,
        }
    }

    #[cfg(test)]
    pub(crate) fn world(&self) -> &RoomWorld {
        &self.world
    }

    /// Tracks everything present at load. None of it has a creation to undo.
    pub(crate) fn load(&mut self, coordinator: &mut RewindCoordinator) {
        let player = self.world.player();
        coordinator.track(&self.world, player);
        coordinator.set_controller(player);
        for position in STARTING_CRATES {
            let handle = self.world.spawn(BodyKind::Crate, position, Some(Vec3::ZERO));
            coordinator.track(&self.world, handle);
        }
        coordinator.add_particle_emitter(self.world.emitter_handle());
        info!(
            entity_count = coordinator.entity_count(),
            capacity = coordinator.capacity(),
            "scene_loaded"
        );
    }

    /// One fixed simulation step. Particles always move; everything else
    /// only runs while forward control is enabled.
    pub(crate) fn fixed_update(
        &mut self,
        coordinator: &mut RewindCoordinator,
        actions: &mut ActionStates,
        dt: f32,
    ) {
        self.world.step_particles(dt, &self.config);
        let kill_pressed = actions.take_pressed(InputAction::Kill);
        if !self.world.forward_control_enabled() {
            return;
        }

        if kill_pressed {
            self.kill_player(coordinator);
        }
        self.world.step_player(actions, dt, &self.config);
        self.tick_spawner(coordinator, dt);
        self.world.step_bodies(dt, &self.config);
    }

    /// Once per rendered frame, with the frame's own delta.
    pub(crate) fn frame_update(
        &mut self,
        coordinator: &mut RewindCoordinator,
        actions: &ActionStates,
        frame_dt: f32,
    ) -> TickReport {
        let report = coordinator.tick(
            &mut self.world,
            actions.is_down(InputAction::Rewind),
            frame_dt,
        );
        if !report.removed.is_empty() {
            debug!(removed = report.removed.len(), "spawned_crates_undone");
        }
        report
    }

    pub(crate) fn summary(&self, coordinator: &RewindCoordinator) -> RoomSummary {
        RoomSummary {
            crates_spawned: self.crates_spawned,
            crates_undone: self.world.destroyed().len(),
            live_crates: self.world.body_count(BodyKind::Crate),
            deaths: self.deaths,
            revivals: self.world.revivals(),
            look_resyncs: self.world.look_resyncs(),
            player_alive: self.world.is_player_alive(),
            player_position: self
                .world
                .body(self.world.player())
                .map(|body| body.position),
            look: self.world.look(),
            particles: self.world.particles().len(),
            tracked_entities: coordinator.entity_count(),
        }
    }

    fn kill_player(&mut self, coordinator: &mut RewindCoordinator) {
        if !self.world.kill_player() {
            return;
        }
        self.deaths = self.deaths.saturating_add(1);
        let player = self.world.player();
        // Rewinding back over this snapshot brings the player back.
        let revive = DeferredAction::custom(REVIVE_ACTION, json!({ "death": self.deaths }));
        if let Err(error) = coordinator.register_action(player, revive) {
            warn!(error = %error, "revive_action_not_recorded");
        }
        info!(entity = %player, deaths = self.deaths, "player_died");
    }

    fn tick_spawner(&mut self, coordinator: &mut RewindCoordinator, dt: f32) {
        let interval = self.config.crate_spawn_interval_seconds;
        if interval <= 0.0 {
            return;
        }
        self.spawn_timer += dt;
        if self.spawn_timer < interval {
            return;
        }
        self.spawn_timer -= interval;

        let live = self.world.body_count(BodyKind::Crate);
        if live >= self.config.max_crates as usize {
            return;
        }
        let (position, velocity) = crate_drop(self.crates_spawned);
        let handle = self.world.spawn(BodyKind::Crate, position, Some(velocity));
        let id = coordinator.register(&self.world, handle);
        self.crates_spawned = self.crates_spawned.saturating_add(1);
        info!(
            entity = %handle,
            id = id.0,
            live_crates = live + 1,
            "crate_spawned"
        );
    }
}

/// Deterministic drop point and toss for the `index`-th spawned crate.
fn crate_drop(index: u32) -> (Vec3, Vec3) {
    let column = (index % 5) as f32 - 2.0;
    let row = ((index / 5) % 3) as f32;
    let position = Vec3::new(column * 1.2, 3.0 + (index % 3) as f32 * 0.5, -1.0 - row * 1.2);
    let side = if index % 2 == 0 { 1.0 } else { -1.0 };
    (position, Vec3::new(0.6 * side, 0.0, 0.4))
}
