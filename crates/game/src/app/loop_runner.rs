use std::process::ExitCode;
use std::time::{Duration, Instant};

use rewind::{MetricsAccumulator, MetricsHandle, RewindMode};
use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use super::bootstrap::AppWiring;
use super::gameplay::RoomSummary;
use super::input::{ActionStates, InputAction};

/// Headless frame loop settings. Frames are simulated; nothing sleeps.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub(crate) struct LoopConfig {
    pub(crate) target_tps: u32,
    pub(crate) frame_ms: u64,
    pub(crate) max_frame_delta_ms: u64,
    pub(crate) max_ticks_per_frame: u32,
    pub(crate) total_frames: u32,
    /// Every n-th frame takes `hitch_ms` instead of `frame_ms`. 0 disables.
    pub(crate) hitch_every_frames: u32,
    pub(crate) hitch_ms: u64,
    pub(crate) metrics_interval_ms: u64,
}

impl Default for LoopConfig {
    fn default() -> Self {
        Self {
            target_tps: 60,
            frame_ms: 16,
            max_frame_delta_ms: 250,
            max_ticks_per_frame: 5,
            total_frames: 1200,
            hitch_every_frames: 300,
            hitch_ms: 180,
            metrics_interval_ms: 1000,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub(crate) struct RunSummary {
    pub(crate) frames: u32,
    pub(crate) sim_ticks: u64,
    pub(crate) rewind_frames: u32,
    pub(crate) dropped_backlog: Duration,
    pub(crate) max_history_len: usize,
    pub(crate) quit_requested: bool,
    pub(crate) room: RoomSummary,
}

pub(crate) fn run(app: AppWiring) -> ExitCode {
    let metrics_handle = MetricsHandle::default();
    let summary = run_headless(app, &metrics_handle);
    let metrics = metrics_handle.snapshot();
    info!(
        frames = summary.frames,
        sim_ticks = summary.sim_ticks,
        rewind_frames = summary.rewind_frames,
        dropped_backlog_ms = summary.dropped_backlog.as_millis() as u64,
        max_history_len = summary.max_history_len,
        crates_spawned = summary.room.crates_spawned,
        crates_undone = summary.room.crates_undone,
        live_crates = summary.room.live_crates,
        deaths = summary.room.deaths,
        revivals = summary.room.revivals,
        player_alive = summary.room.player_alive,
        player_position = ?summary.room.player_position,
        look_yaw = summary.room.look.yaw,
        look_pitch = summary.room.look.pitch,
        particles = summary.room.particles,
        tracked_entities = summary.room.tracked_entities,
        last_fps = metrics.fps,
        "run_summary"
    );
    ExitCode::SUCCESS
}

pub(crate) fn run_headless(app: AppWiring, metrics_handle: &MetricsHandle) -> RunSummary {
    let AppWiring {
        config,
        mut coordinator,
        mut scene,
        mut script,
    } = app;
    let loop_config = config.loop_config;
    let LoopSettings {
        target_tps,
        fixed_dt,
        max_frame_delta,
        max_ticks_per_frame,
        metrics_interval,
    } = loop_config.settings();
    let fixed_dt_seconds = fixed_dt.as_secs_f32();

    info!(
        target_tps,
        max_frame_delta_ms = max_frame_delta.as_millis() as u64,
        max_ticks_per_frame,
        total_frames = loop_config.total_frames,
        hitch_every_frames = loop_config.hitch_every_frames,
        hitch_ms = loop_config.hitch_ms,
        metrics_interval_ms = metrics_interval.as_millis() as u64,
        "loop_config"
    );

    let start = Instant::now();
    let mut simulated_elapsed = Duration::ZERO;
    let mut accumulator = Duration::ZERO;
    let mut metrics_accumulator = MetricsAccumulator::new(metrics_interval, start);
    let mut actions = ActionStates::default();
    let mut summary = RunSummary {
        frames: 0,
        sim_ticks: 0,
        rewind_frames: 0,
        dropped_backlog: Duration::ZERO,
        max_history_len: 0,
        quit_requested: false,
        room: scene.summary(&coordinator),
    };

    for frame in 0..loop_config.total_frames {
        script.apply_frame(frame, &mut actions);
        if actions.is_down(InputAction::Quit) {
            info!(frame, reason = "scripted_quit", "shutdown_requested");
            summary.quit_requested = true;
            break;
        }

        let raw_frame_dt = simulated_frame_duration(frame, &loop_config);
        simulated_elapsed = simulated_elapsed.saturating_add(raw_frame_dt);
        let clamped_frame_dt = raw_frame_dt.min(max_frame_delta);
        accumulator = accumulator.saturating_add(clamped_frame_dt);

        let step_plan = plan_sim_steps(accumulator, fixed_dt, max_ticks_per_frame);
        for _ in 0..step_plan.ticks_to_run {
            scene.fixed_update(&mut coordinator, &mut actions, fixed_dt_seconds);
            summary.sim_ticks = summary.sim_ticks.saturating_add(1);
        }
        accumulator = step_plan.remaining_accumulator;

        if step_plan.dropped_backlog > Duration::ZERO {
            warn!(
                dropped_backlog_ms = step_plan.dropped_backlog.as_millis() as u64,
                max_ticks_per_frame, "sim_clamp_triggered"
            );
            summary.dropped_backlog = summary
                .dropped_backlog
                .saturating_add(step_plan.dropped_backlog);
        }

        let report = scene.frame_update(&mut coordinator, &actions, clamped_frame_dt.as_secs_f32());
        if report.mode == RewindMode::Rewinding {
            summary.rewind_frames = summary.rewind_frames.saturating_add(1);
        }
        let history_len = coordinator
            .entities()
            .iter()
            .map(|entity| entity.track().len())
            .max()
            .unwrap_or(0);
        summary.max_history_len = summary.max_history_len.max(history_len);
        summary.frames = summary.frames.saturating_add(1);

        metrics_accumulator.record_frame();
        metrics_accumulator.record_snaps(report.snaps);
        metrics_accumulator.record_pops(report.pops);
        if report.interpolated > 0 {
            metrics_accumulator.record_interpolation();
        }
        if let Some(snapshot) = metrics_accumulator
            .maybe_snapshot(start + simulated_elapsed, coordinator.entity_count())
        {
            metrics_handle.publish(snapshot);
            info!(
                fps = snapshot.fps,
                snaps_per_second = snapshot.snaps_per_second,
                pops_per_second = snapshot.pops_per_second,
                interpolations_per_second = snapshot.interpolations_per_second,
                tracked_entities = snapshot.tracked_entities,
                mode = ?coordinator.mode(),
                "rewind_metrics"
            );
        }
    }

    summary.room = scene.summary(&coordinator);
    info!(script_finished = script.is_finished(), "shutdown");
    summary
}

/// `LoopConfig` with zero values replaced by usable defaults.
struct LoopSettings {
    target_tps: u32,
    fixed_dt: Duration,
    max_frame_delta: Duration,
    max_ticks_per_frame: u32,
    metrics_interval: Duration,
}

impl LoopConfig {
    fn settings(&self) -> LoopSettings {
        let target_tps = self.target_tps.max(1);
        let or_default = |millis: u64, fallback: Duration| {
            if millis == 0 {
                fallback
            } else {
                Duration::from_millis(millis)
            }
        };
        LoopSettings {
            target_tps,
            fixed_dt: Duration::from_secs_f64(1.0 / f64::from(target_tps)),
            max_frame_delta: or_default(self.max_frame_delta_ms, Duration::from_millis(250)),
            max_ticks_per_frame: self.max_ticks_per_frame.max(1),
            metrics_interval: or_default(self.metrics_interval_ms, Duration::from_secs(1)),
        }
    }
}

struct StepPlan {
    ticks_to_run: u32,
    remaining_accumulator: Duration,
    dropped_backlog: Duration,
}

/// Whole fixed ticks owed by `accumulator`, capped per frame. Anything still
/// owed past the cap is dropped instead of carried, so one hitch cannot
/// snowball into later frames.
fn plan_sim_steps(
    accumulator: Duration,
    fixed_dt: Duration,
    max_ticks_per_frame: u32,
) -> StepPlan {
    let owed = accumulator.as_nanos() / fixed_dt.as_nanos().max(1);
    let ticks_to_run = u32::try_from(owed)
        .unwrap_or(u32::MAX)
        .min(max_ticks_per_frame);
    let remaining = accumulator.saturating_sub(fixed_dt.saturating_mul(ticks_to_run));

    if remaining >= fixed_dt {
        StepPlan {
            ticks_to_run,
            remaining_accumulator: Duration::ZERO,
            dropped_backlog: remaining,
        }
    } else {
        StepPlan {
            ticks_to_run,
            remaining_accumulator: remaining,
            dropped_backlog: Duration::ZERO,
        }
    }
}

fn simulated_frame_duration(frame: u32, config: &LoopConfig) -> Duration {
    let is_hitch = config.hitch_every_frames > 0
        && frame > 0
        && frame % config.hitch_every_frames == 0;
    if is_hitch {
        Duration::from_millis(config.hitch_ms)
    } else {
        Duration::from_millis(config.frame_ms)
    }
}
