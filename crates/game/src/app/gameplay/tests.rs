    use super::*;
    use rewind::RewindConfig;

    const DT: f32 = 1.0 / 60.0;

    fn loaded_scene(config: RoomConfig) -> (RoomScene, RewindCoordinator) {
        let mut coordinator =
            RewindCoordinator::new(RewindConfig::new(20.0, 10.0)).expect("valid rewind config");
        let mut scene = RoomScene::new(config);
        scene.load(&mut coordinator);
        (scene, coordinator)
    }

    fn run_ticks(
        scene: &mut RoomScene,
        coordinator: &mut RewindCoordinator,
        actions: &mut ActionStates,
        ticks: u32,
    ) {
        for _ in 0..ticks {
            scene.fixed_update(coordinator, actions, DT);
            scene.frame_update(coordinator, actions, DT);
        }
    }

    fn assert_vec3_near(actual: Vec3, expected: Vec3, tolerance: f32) {
        assert!(
            actual.abs_diff_eq(expected, tolerance),
            "expected {expected:?}, got {actual:?}"
        );
    }

    #[test]
    fn host_round_trips_transforms() {
        let mut world = RoomWorld::new(Vec3::ZERO);
        let handle = world.spawn(BodyKind::Crate, Vec3::ONE, Some(Vec3::ZERO));
        let rotation = Quat::from_rotation_y(0.5);

        world.write_transform(handle, Vec3::new(1.0, 2.0, 3.0), rotation);

        assert_eq!(
            world.read_transform(handle),
            Some((Vec3::new(1.0, 2.0, 3.0), rotation))
        );
        assert_eq!(world.read_transform(EntityHandle(999)), None);
    }

    #[test]
    fn kinematic_player_records_no_velocity() {
        let mut world = RoomWorld::new(Vec3::ZERO);
        let player = world.player();

        world.write_velocity(player, Vec3::X);

        assert_eq!(world.read_velocity(player), None);
        assert_eq!(
            world.body(player).expect("player body").kind,
            BodyKind::Player
        );
    }

    #[test]
    fn destroy_removes_body_once() {
        let mut world = RoomWorld::new(Vec3::ZERO);
        let handle = world.spawn(BodyKind::Crate, Vec3::ONE, Some(Vec3::ZERO));

        world.destroy(handle);
        world.destroy(handle);

        assert!(world.body(handle).is_none());
        assert_eq!(world.destroyed(), &[handle]);
    }

    #[test]
    fn reversed_particles_retrace_their_path() {
        let mut emitter = Emitter::new(EMITTER_HANDLE, Vec3::ZERO, Vec3::new(0.5, 0.0, -0.25));
        emitter.emit(3);
        for _ in 0..5 {
            emitter.step(0.1, true, 0.0, 10.0);
        }
        let midway = emitter.particles.clone();
        for _ in 0..5 {
            emitter.step(0.1, true, 0.0, 10.0);
        }

        emitter.reverse();
        for _ in 0..5 {
            emitter.step(0.1, false, 0.0, 10.0);
        }

        assert_eq!(emitter.particles.len(), midway.len());
        for (particle, expected) in emitter.particles.iter().zip(&midway) {
            assert_vec3_near(particle.position, expected.position, 1e-4);
            assert!((particle.age - expected.age).abs() < 1e-4);
        }
    }

    #[test]
    fn reversing_twice_restores_particle_velocity() {
        let mut emitter = Emitter::new(EMITTER_HANDLE, Vec3::ZERO, Vec3::new(0.3, 0.0, 0.1));
        emitter.emit(2);
        let original = emitter.particles.clone();

        emitter.reverse();
        emitter.reverse();

        for (particle, expected) in emitter.particles.iter().zip(&original) {
            assert_vec3_near(particle.velocity, expected.velocity, 1e-5);
        }
    }

    #[test]
    fn reversed_particles_age_back_into_emitter() {
        let mut emitter = Emitter::new(EMITTER_HANDLE, Vec3::ZERO, Vec3::ZERO);
        emitter.emit(1);
        emitter.step(0.1, true, 0.0, 10.0);
        emitter.reverse();

        emitter.step(0.25, false, 0.0, 10.0);

        assert!(emitter.particles.is_empty());
    }

    #[test]
    fn look_resync_recovers_yaw_and_pitch() {
        let mut world = RoomWorld::new(Vec3::ZERO);
        let player = world.player();
        let target = LookState {
            yaw: 0.7,
            pitch: -0.3,
        };

        world.write_transform(player, PLAYER_SPAWN, target.rotation());
        world.resync_look_orientation(player);

        let look = world.look();
        assert!((look.yaw - target.yaw).abs() < 1e-4);
        assert!((look.pitch - target.pitch).abs() < 1e-4);
        assert_eq!(world.look_resyncs(), 1);
    }

    #[test]
    fn revive_action_restores_dead_player_once() {
        let mut world = RoomWorld::new(Vec3::ZERO);
        let player = world.player();
        let revive = CustomAction {
            name: REVIVE_ACTION.to_string(),
            payload: json!({ "death": 1 }),
        };
        assert!(world.kill_player());
        assert!(!world.kill_player());

        assert_eq!(
            world.run_custom_action(player, &revive),
            ActionOutcome::Continue
        );
        world.run_custom_action(player, &revive);

        assert!(world.is_player_alive());
        assert_eq!(world.revivals(), 1);
    }

    #[test]
    fn unknown_custom_action_lets_playback_continue() {
        let mut world = RoomWorld::new(Vec3::ZERO);
        let action = CustomAction {
            name: "open_door".to_string(),
            payload: serde_json::Value::Null,
        };

        assert_eq!(
            world.run_custom_action(world.player(), &action),
            ActionOutcome::Continue
        );
    }

    #[test]
    fn dropped_crate_comes_to_rest_on_floor() {
        let config = RoomConfig::default();
        let mut world = RoomWorld::new(Vec3::ZERO);
        let handle = world.spawn(BodyKind::Crate, Vec3::new(0.0, 3.0, 0.0), Some(Vec3::ZERO));

        for _ in 0..600 {
            world.step_bodies(DT, &config);
        }

        let body = world.body(handle).expect("crate");
        assert!((body.position.y - CRATE_HALF_EXTENT).abs() < 1e-4);
        assert!(body.velocity.expect("dynamic").y.abs() < REST_SPEED);
    }

    #[test]
    fn crates_bounce_off_walls() {
        let config = RoomConfig::default();
        let mut world = RoomWorld::new(Vec3::ZERO);
        let handle = world.spawn(
            BodyKind::Crate,
            Vec3::new(4.7, CRATE_HALF_EXTENT, 0.0),
            Some(Vec3::new(3.0, 0.0, 0.0)),
        );

        for _ in 0..30 {
            world.step_bodies(DT, &config);
        }

        let body = world.body(handle).expect("crate");
        assert!(body.position.x <= ROOM_HALF_EXTENT - CRATE_HALF_EXTENT);
        assert!(body.velocity.expect("dynamic").x < 0.0);
    }

    #[test]
    fn load_tracks_player_crates_and_emitter() {
        let (scene, coordinator) = loaded_scene(RoomConfig::default());

        assert_eq!(coordinator.entity_count(), 1 + STARTING_CRATES.len());
        assert_eq!(coordinator.controller(), Some(scene.world().player()));
        assert_eq!(coordinator.emitters(), &[EMITTER_HANDLE]);
        assert_eq!(coordinator.history_len(scene.world().player()), Some(1));
    }

    #[test]
    fn player_moves_forward_and_turns() {
        let (mut scene, mut coordinator) = loaded_scene(RoomConfig::default());
        let mut actions = ActionStates::default();
        actions.set(InputAction::MoveForward, true);
        actions.set(InputAction::LookLeft, true);

        run_ticks(&mut scene, &mut coordinator, &mut actions, 30);

        let player = scene.world().body(scene.world().player()).expect("player");
        assert!(player.position.z < PLAYER_SPAWN.z);
        assert!(scene.world().look().yaw > 0.0);
    }

    #[test]
    fn summary_reports_player_position_and_look() {
        let (mut scene, mut coordinator) = loaded_scene(RoomConfig::default());
        let mut actions = ActionStates::default();
        actions.set(InputAction::MoveForward, true);
        actions.set(InputAction::LookLeft, true);

        run_ticks(&mut scene, &mut coordinator, &mut actions, 10);

        let summary = scene.summary(&coordinator);
        let player = scene.world().body(scene.world().player()).expect("player");
        assert_eq!(summary.player_position, Some(player.position));
        assert_eq!(summary.look, scene.world().look());
        assert!(summary.look.yaw > 0.0);
    }

    #[test]
    fn rewinding_freezes_player_input_and_spawner() {
        let config = RoomConfig {
            crate_spawn_interval_seconds: 0.1,
            ..RoomConfig::default()
        };
        let (mut scene, mut coordinator) = loaded_scene(config);
        let mut actions = ActionStates::default();
        run_ticks(&mut scene, &mut coordinator, &mut actions, 3);
        actions.set(InputAction::Rewind, true);
        run_ticks(&mut scene, &mut coordinator, &mut actions, 1);
        let spawned = scene.summary(&coordinator).crates_spawned;
        let look = scene.world().look();

        actions.set(InputAction::LookLeft, true);
        run_ticks(&mut scene, &mut coordinator, &mut actions, 30);

        assert!(!scene.world().forward_control_enabled());
        assert_eq!(scene.summary(&coordinator).crates_spawned, spawned);
        assert_eq!(scene.world().look(), look);
    }

    #[test]
    fn spawned_crate_is_destroyed_when_rewound_past_its_creation() {
        let config = RoomConfig {
            crate_spawn_interval_seconds: 0.5,
            ..RoomConfig::default()
        };
        let (mut scene, mut coordinator) = loaded_scene(config);
        let mut actions = ActionStates::default();

        run_ticks(&mut scene, &mut coordinator, &mut actions, 45);
        assert_eq!(scene.summary(&coordinator).crates_spawned, 1);
        assert_eq!(coordinator.entity_count(), 4);

        actions.set(InputAction::Rewind, true);
        run_ticks(&mut scene, &mut coordinator, &mut actions, 40);

        let summary = scene.summary(&coordinator);
        assert_eq!(summary.crates_undone, 1);
        assert_eq!(summary.live_crates, STARTING_CRATES.len());
        assert_eq!(coordinator.entity_count(), 1 + STARTING_CRATES.len());
    }

    #[test]
    fn rewinding_over_a_death_revives_the_player() {
        let (mut scene, mut coordinator) = loaded_scene(RoomConfig::default());
        let mut actions = ActionStates::default();
        run_ticks(&mut scene, &mut coordinator, &mut actions, 20);

        actions.set(InputAction::Kill, true);
        run_ticks(&mut scene, &mut coordinator, &mut actions, 1);
        actions.set(InputAction::Kill, false);
        run_ticks(&mut scene, &mut coordinator, &mut actions, 20);
        assert!(!scene.world().is_player_alive());
        assert_eq!(scene.summary(&coordinator).deaths, 1);

        actions.set(InputAction::Rewind, true);
        run_ticks(&mut scene, &mut coordinator, &mut actions, 30);
        assert!(scene.world().is_player_alive());

        actions.set(InputAction::Rewind, false);
        run_ticks(&mut scene, &mut coordinator, &mut actions, 1);

        let summary = scene.summary(&coordinator);
        assert_eq!(summary.revivals, 1);
        assert_eq!(summary.look_resyncs, 1);
        assert!(scene.world().forward_control_enabled());
    }

    #[test]
    fn crate_drops_are_spread_across_the_room() {
        let (first, _) = crate_drop(0);
        let (second, second_velocity) = crate_drop(1);

        assert_ne!(first, second);
        assert!(second_velocity.x < 0.0);
        for index in 0..15 {
            let (position, _) = crate_drop(index);
            assert!(position.x.abs() < ROOM_HALF_EXTENT);
            assert!(position.z.abs() < ROOM_HALF_EXTENT);
        }
    }
