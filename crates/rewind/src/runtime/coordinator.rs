use std::sync::atomic::{AtomicBool, Ordering};

use thiserror::Error;
use tracing::{debug, info, warn};

use crate::config::{ConfigError, RewindConfig};
use crate::history::{ActionOutcome, DeferredAction, HistoryError, PopResult};

use super::clock::RewindClock;
use super::entity::{ApplyOutcome, EntityError, EntityId, EntityIdAllocator, RewindableEntity};
use super::host::{EmitterHandle, EntityHandle, RewindHost};

static COORDINATOR_LIVE: AtomicBool = AtomicBool::new(false);

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum RewindMode {
    #[default]
    Live,
    Rewinding,
}

#[derive(Debug, Error)]
pub enum RewindError {
    #[error(transparent)]
    Config(#[from] ConfigError),
    #[error(transparent)]
    Entity(#[from] EntityError),
    #[error("no tracked entity for handle {0}")]
    UnknownHandle(EntityHandle),
}

/// What one `tick` did.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct TickReport {
    pub mode: RewindMode,
    /// Set when this tick changed mode.
    pub transition: Option<RewindMode>,
    pub steps: u32,
    pub fraction: f32,
    pub snaps: u32,
    pub pops: u32,
    pub interpolated: u32,
    pub removed: Vec<EntityId>,
}

/// Owns every tracked entity and the snapshot clock, and drives recording
/// and playback once per frame.
///
/// Entities are kept in registration order; every fan-out walks them in that
/// order. Removals requested mid-pass are deferred until the pass ends.
#[derive(Debug)]
pub struct RewindCoordinator {
    config: RewindConfig,
    capacity: usize,
    clock: RewindClock,
    mode: RewindMode,
    allocator: EntityIdAllocator,
    entities: Vec<RewindableEntity>,
    pending_removals: Vec<EntityId>,
    emitters: Vec<EmitterHandle>,
    controller: Option<EntityHandle>,
    owns_instance_slot: bool,
}

impl RewindCoordinator {
    pub fn new(config: RewindConfig) -> Result<Self, ConfigError> {
        config.validate()?;
        Ok(Self {
            capacity: config.capacity(),
            clock: RewindClock::new(config.snaps_per_second),
            config,
            mode: RewindMode::Live,
            allocator: EntityIdAllocator::default(),
            entities: Vec::new(),
            pending_removals: Vec::new(),
            emitters: Vec::new(),
            controller: None,
            owns_instance_slot: false,
        })
    }

    /// Claims the process-wide coordinator slot. While another acquired
    /// coordinator is alive this disposes of the new one and returns `None`.
    pub fn acquire(config: RewindConfig) -> Result<Option<Self>, ConfigError> {
        let mut coordinator = Self::new(config)?;
        if COORDINATOR_LIVE
            .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .is_err()
        {
            warn!("duplicate rewind coordinator disposed; one is already live");
            return Ok(None);
        }
        coordinator.owns_instance_slot = true;
        info!(
            snaps_per_second = config.snaps_per_second,
            seconds_saved = config.seconds_saved,
            capacity = coordinator.capacity,
            "rewind_coordinator_started"
        );
        Ok(Some(coordinator))
    }

    pub fn config(&self) -> &RewindConfig {
        &self.config
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    pub fn clock(&self) -> &RewindClock {
        &self.clock
    }

    pub fn mode(&self) -> RewindMode {
        self.mode
    }

    pub fn is_rewinding(&self) -> bool {
        self.mode == RewindMode::Rewinding
    }

    pub fn entity_count(&self) -> usize {
        self.entities.len()
    }

    pub fn entities(&self) -> &[RewindableEntity] {
        &self.entities
    }

    pub fn entity(&self, id: EntityId) -> Option<&RewindableEntity> {
        self.entities.iter().find(|entity| entity.id() == id)
    }

    pub fn find_by_handle(&self, handle: EntityHandle) -> Option<&RewindableEntity> {
        self.entities.iter().find(|entity| entity.handle() == handle)
    }

    pub fn history_len(&self, handle: EntityHandle) -> Option<usize> {
        self.find_by_handle(handle).map(|entity| entity.track().len())
    }

    pub fn controller(&self) -> Option<EntityHandle> {
        self.controller
    }

    /// The entity whose look orientation is resynced when rewind ends.
    pub fn set_controller(&mut self, handle: EntityHandle) {
        self.controller = Some(handle);
    }

    pub fn emitters(&self) -> &[EmitterHandle] {
        &self.emitters
    }

    pub fn add_particle_emitter(&mut self, emitter: EmitterHandle) {
        if !self.emitters.contains(&emitter) {
            self.emitters.push(emitter);
        }
    }

    /// Starts tracking an object that exists from scene start. It has no
    /// creation to undo, so its history simply runs out at the oldest sample.
    pub fn track<H: RewindHost + ?Sized>(&mut self, host: &H, handle: EntityHandle) -> EntityId {
        if let Some(existing) = self.find_by_handle(handle) {
            return existing.id();
        }
        let id = self.allocator.allocate();
        let mut entity = RewindableEntity::new(id, handle, self.capacity);
        entity.snap(host);
        debug!(entity = %entity, id = id.0, "entity_tracked");
        self.entities.push(entity);
        id
    }

    /// Starts tracking an object created during play. Rewinding past this
    /// call destroys the object again.
    pub fn register<H: RewindHost + ?Sized>(&mut self, host: &H, handle: EntityHandle) -> EntityId {
        if let Some(existing) = self.find_by_handle(handle) {
            debug!(entity = %existing, "entity_already_registered");
            return existing.id();
        }
        let id = self.allocator.allocate();
        let mut entity = RewindableEntity::new(id, handle, self.capacity);
        entity.snap(host);
        // The second snap puts the baseline one slot behind the newest, so
        // the hook fires on the pop that reaches the baseline.
        entity.set_on_exhausted(DeferredAction::Destroy(id));
        entity.snap(host);
        info!(entity = %entity, id = id.0, "entity_registered");
        self.entities.push(entity);
        id
    }

    /// Binds `action` to the next snapshot of the entity behind `handle`.
    pub fn register_action(
        &mut self,
        handle: EntityHandle,
        action: DeferredAction,
    ) -> Result<(), RewindError> {
        let entity = self
            .entities
            .iter_mut()
            .find(|entity| entity.handle() == handle)
            .ok_or(RewindError::UnknownHandle(handle))?;
        let label = action.to_string();
        if let Err(error) = entity.register_action(action) {
            warn!(entity = %handle, error = %error, "deferred_action_rejected");
            return Err(error.into());
        }
        debug!(entity = %handle, action = %label, "deferred_action_staged");
        Ok(())
    }

    /// Applies the requested mode, running transition effects only on an
    /// edge. Returns the new mode when it changed.
    pub fn set_rewinding<H: RewindHost + ?Sized>(
        &mut self,
        host: &mut H,
        requested: bool,
    ) -> Option<RewindMode> {
        match (self.mode, requested) {
            (RewindMode::Live, true) => {
                self.begin_rewind(host);
                Some(RewindMode::Rewinding)
            }
            (RewindMode::Rewinding, false) => {
                self.end_rewind(host);
                Some(RewindMode::Live)
            }
            _ => None,
        }
    }

    pub fn tick<H: RewindHost + ?Sized>(
        &mut self,
        host: &mut H,
        rewind_requested: bool,
        delta_seconds: f32,
    ) -> TickReport {
        let transition = self.set_rewinding(host, rewind_requested);
        let step = self.clock.advance(delta_seconds);
        let mut report = TickReport {
            mode: self.mode,
            transition,
            steps: step.steps,
            fraction: step.fraction,
            ..TickReport::default()
        };

        // Past capacity + 1 passes the ring only churns: live snaps overwrite
        // themselves and playback is already pinned to the oldest sample.
        let passes = step.steps.min(self.max_passes_per_tick());
        if passes < step.steps {
            debug!(steps = step.steps, passes, "rewind_tick_passes_capped");
        }

        match self.mode {
            RewindMode::Live => {
                for _ in 0..passes {
                    report.snaps = report.snaps.saturating_add(self.snap_all(host));
                }
            }
            RewindMode::Rewinding => {
                for _ in 0..passes {
                    let pops = self.pop_all(host, &mut report.removed);
                    report.pops = report.pops.saturating_add(pops);
                }
                report.interpolated = self.apply_all(host, step.fraction, &mut report.removed);
            }
        }

        report
    }

    /// Drops all recorded history and re-baselines the clock. Entities stay
    /// tracked but lose their creation hooks, since the creation point is
    /// no longer in history.
    pub fn clear_history(&mut self) {
        for entity in &mut self.entities {
            entity.reset(self.capacity);
        }
        self.clock.reset();
        info!(entity_count = self.entities.len(), "rewind_history_cleared");
    }

    /// Changes rate and depth. Only allowed while no entity holds history.
    pub fn reconfigure(&mut self, config: RewindConfig) -> Result<(), RewindError> {
        config.validate()?;
        let recorded = self
            .entities
            .iter()
            .filter(|entity| !entity.track().is_empty())
            .count();
        if recorded > 0 {
            return Err(ConfigError::HistoryNotEmpty { recorded }.into());
        }

        self.config = config;
        self.capacity = config.capacity();
        self.clock = RewindClock::new(config.snaps_per_second);
        for entity in &mut self.entities {
            entity.reset(self.capacity);
        }
        info!(
            snaps_per_second = config.snaps_per_second,
            seconds_saved = config.seconds_saved,
            capacity = self.capacity,
            "rewind_reconfigured"
        );
        Ok(())
    }

    fn begin_rewind<H: RewindHost + ?Sized>(&mut self, host: &mut H) {
        host.set_forward_control_enabled(false);
        // Anchor playback at the exact instant rewind was requested.
        self.snap_all(host);
        if let Err(error) = self.clock.fold() {
            warn!(error = %error, "rewind_clock_fold_clamped");
        }
        for emitter in &self.emitters {
            host.reverse_particle_velocities(*emitter);
        }
        self.mode = RewindMode::Rewinding;
        info!(
            entity_count = self.entities.len(),
            time_elapsed = self.clock.time_elapsed(),
            "rewind_started"
        );
    }

    fn end_rewind<H: RewindHost + ?Sized>(&mut self, host: &mut H) {
        host.set_forward_control_enabled(true);
        if let Some(controller) = self.controller {
            host.resync_look_orientation(controller);
        }
        for emitter in &self.emitters {
            host.reverse_particle_velocities(*emitter);
        }
        self.mode = RewindMode::Live;
        info!(entity_count = self.entities.len(), "rewind_stopped");
    }

    fn max_passes_per_tick(&self) -> u32 {
        u32::try_from(self.capacity.saturating_add(1)).unwrap_or(u32::MAX)
    }

    fn snap_all<H: RewindHost + ?Sized>(&mut self, host: &H) -> u32 {
        let mut snaps = 0u32;
        for entity in &mut self.entities {
            if entity.snap(host) {
                snaps = snaps.saturating_add(1);
            }
        }
        snaps
    }

    fn pop_all<H: RewindHost + ?Sized>(&mut self, host: &mut H, removed: &mut Vec<EntityId>) -> u32 {
        let mut pops = 0u32;
        for index in 0..self.entities.len() {
            let entity = &mut self.entities[index];
            let (id, handle) = (entity.id(), entity.handle());
            if self.pending_removals.contains(&id) || entity.is_exhausted() {
                continue;
            }

            let mut destroys = Vec::new();
            let popped =
                entity.pop(|action| dispatch_action(host, id, handle, action, &mut destroys));

            match popped {
                Ok(pop) => {
                    if matches!(pop.result, PopResult::Popped { .. }) {
                        pops = pops.saturating_add(1);
                    }
                    if let Some(action) = pop.exhausted {
                        self.run_exhaustion(host, id, handle, action, removed);
                    }
                }
                Err(error) => {
                    warn!(entity = %handle, error = %error, "rewind_pop_failed");
                }
            }

            for target in destroys {
                self.destroy_entity(host, target, removed);
            }
        }
        self.apply_pending_removals();
        pops
    }

    fn apply_all<H: RewindHost + ?Sized>(
        &mut self,
        host: &mut H,
        fraction: f32,
        removed: &mut Vec<EntityId>,
    ) -> u32 {
        let mut applied = 0u32;
        for index in 0..self.entities.len() {
            let entity = &mut self.entities[index];
            let (id, handle) = (entity.id(), entity.handle());
            if self.pending_removals.contains(&id) {
                continue;
            }

            match entity.apply_interpolated(host, fraction) {
                Ok(ApplyOutcome::Written(_)) => applied = applied.saturating_add(1),
                Ok(ApplyOutcome::Exhausted(action)) => {
                    self.run_exhaustion(host, id, handle, action, removed);
                }
                Err(HistoryError::InsufficientHistory { .. }) => {
                    // Nothing older to play back; hold at the oldest state.
                    self.entities[index].apply_oldest(host);
                }
                Err(error) => {
                    warn!(entity = %handle, error = %error, "rewind_interpolation_failed");
                }
            }
        }
        self.apply_pending_removals();
        applied
    }

    fn run_exhaustion<H: RewindHost + ?Sized>(
        &mut self,
        host: &mut H,
        id: EntityId,
        handle: EntityHandle,
        action: DeferredAction,
        removed: &mut Vec<EntityId>,
    ) {
        debug!(entity = %handle, id = id.0, action = %action, "rewind_history_exhausted");
        match action {
            DeferredAction::Destroy(target) => self.destroy_entity(host, target, removed),
            DeferredAction::Custom(custom) => {
                host.run_custom_action(handle, &custom);
            }
        }
    }

    fn destroy_entity<H: RewindHost + ?Sized>(
        &mut self,
        host: &mut H,
        target: EntityId,
        removed: &mut Vec<EntityId>,
    ) {
        if self.pending_removals.contains(&target) {
            return;
        }
        let Some(entity) = self.entities.iter().find(|entity| entity.id() == target) else {
            debug!(id = target.0, "destroy_target_not_tracked");
            return;
        };
        let handle = entity.handle();
        host.destroy(handle);
        self.pending_removals.push(target);
        removed.push(target);
        info!(entity = %handle, id = target.0, "entity_creation_undone");
    }

    fn apply_pending_removals(&mut self) {
        if self.pending_removals.is_empty() {
            return;
        }
        let pending = &self.pending_removals;
        self.entities
            .retain(|entity| !pending.contains(&entity.id()));
        self.pending_removals.clear();
    }
}

impl Drop for RewindCoordinator {
    fn drop(&mut self) {
        if self.owns_instance_slot {
            COORDINATOR_LIVE.store(false, Ordering::Release);
            info!("rewind_coordinator_stopped");
        }
    }
}

fn dispatch_action<H: RewindHost + ?Sized>(
    host: &mut H,
    owner: EntityId,
    handle: EntityHandle,
    action: &DeferredAction,
    destroys: &mut Vec<EntityId>,
) -> ActionOutcome {
    match action {
        DeferredAction::Destroy(target) => {
            destroys.push(*target);
            // The owner leaves tracking with this slot still in place.
            if *target == owner {
                ActionOutcome::Hold
            } else {
                ActionOutcome::Continue
            }
        }
        DeferredAction::Custom(custom) => {
            let outcome = host.run_custom_action(handle, custom);
            debug!(entity = %handle, action = %custom.name, ?outcome, "deferred_action_dispatched");
            outcome
        }
    }
}
