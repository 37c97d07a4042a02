use std::fmt;

use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::debug;

use crate::history::{ActionOutcome, DeferredAction, HistoryError, HistoryTrack, PopResult, Sample};

use super::host::{EntityHandle, RewindHost};

/// Stable id the coordinator assigns to each tracked entity. Never reused.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct EntityId(pub u64);

#[derive(Debug, Default)]
pub(crate) struct EntityIdAllocator {
    next: u64,
}

impl EntityIdAllocator {
    pub(crate) fn allocate(&mut self) -> EntityId {
        let id = EntityId(self.next);
        self.next = self.next.saturating_add(1);
        id
    }
}

#[derive(Debug, Clone, PartialEq, Error)]
pub enum EntityError {
    #[error("entity {handle} already has an action staged for this snapshot ({staged})")]
    DuplicateAction {
        handle: EntityHandle,
        staged: DeferredAction,
    },
}

/// What a single pop did, for the coordinator to act on.
#[derive(Debug, Clone, PartialEq)]
pub struct EntityPop {
    pub result: PopResult,
    /// Set on the pop that brought history down to one sample, when the
    /// entity has an exhaustion action that has not fired yet.
    pub exhausted: Option<DeferredAction>,
}

#[derive(Debug, Clone, PartialEq)]
pub enum ApplyOutcome {
    Written(Sample),
    Exhausted(DeferredAction),
}

/// One tracked object and its history.
#[derive(Debug, Clone)]
pub struct RewindableEntity {
    id: EntityId,
    handle: EntityHandle,
    track: HistoryTrack,
    staged_action: Option<DeferredAction>,
    on_exhausted: Option<DeferredAction>,
    exhaustion_fired: bool,
}

impl RewindableEntity {
    pub fn new(id: EntityId, handle: EntityHandle, capacity: usize) -> Self {
        Self {
            id,
            handle,
            track: HistoryTrack::with_capacity(capacity),
            staged_action: None,
            on_exhausted: None,
            exhaustion_fired: false,
        }
    }

    pub fn id(&self) -> EntityId {
        self.id
    }

    pub fn handle(&self) -> EntityHandle {
        self.handle
    }

    pub fn track(&self) -> &HistoryTrack {
        &self.track
    }

    pub fn staged_action(&self) -> Option<&DeferredAction> {
        self.staged_action.as_ref()
    }

    pub fn on_exhausted(&self) -> Option<&DeferredAction> {
        self.on_exhausted.as_ref()
    }

    pub fn set_on_exhausted(&mut self, action: DeferredAction) {
        self.on_exhausted = Some(action);
        self.exhaustion_fired = false;
    }

    /// Fewer than two samples left; nothing to blend between.
    pub fn is_exhausted(&self) -> bool {
        self.track.len() < 2
    }

    /// Stages `action` to ride on the next snapshot.
    pub fn register_action(&mut self, action: DeferredAction) -> Result<(), EntityError> {
        if let Some(staged) = &self.staged_action {
            return Err(EntityError::DuplicateAction {
                handle: self.handle,
                staged: staged.clone(),
            });
        }
        self.staged_action = Some(action);
        Ok(())
    }

    /// Records the host's current state. Returns `false` if the host no
    /// longer knows the handle; the staged action is kept for a later snap.
    pub fn snap<H: RewindHost + ?Sized>(&mut self, host: &H) -> bool {
        let Some((position, rotation)) = host.read_transform(self.handle) else {
            debug!(entity = %self, "snap_skipped_missing_handle");
            return false;
        };
        let velocity = host.read_velocity(self.handle);
        self.track.push(
            Sample::new(position, rotation, velocity),
            self.staged_action.take(),
        );
        true
    }

    pub fn pop<F>(&mut self, dispatch: F) -> Result<EntityPop, HistoryError>
    where
        F: FnOnce(&DeferredAction) -> ActionOutcome,
    {
        let result = self.track.pop_front(dispatch)?;
        let exhausted = match result {
            PopResult::Popped { remaining: 1 } => self.take_exhaustion(),
            _ => None,
        };
        Ok(EntityPop { result, exhausted })
    }

    /// Writes the blended state back to the host. Without an exhaustion
    /// action, running out of history is returned as an error for the
    /// caller to route.
    pub fn apply_interpolated<H: RewindHost + ?Sized>(
        &mut self,
        host: &mut H,
        fraction: f32,
    ) -> Result<ApplyOutcome, HistoryError> {
        match self.track.interpolate(fraction) {
            Ok(sample) => {
                write_sample(host, self.handle, &sample);
                Ok(ApplyOutcome::Written(sample))
            }
            Err(error @ HistoryError::InsufficientHistory { .. }) => {
                match self.take_exhaustion() {
                    Some(action) => Ok(ApplyOutcome::Exhausted(action)),
                    None => Err(error),
                }
            }
            Err(error) => Err(error),
        }
    }

    /// Pins the host object to the oldest remaining sample.
    pub fn apply_oldest<H: RewindHost + ?Sized>(&self, host: &mut H) -> Option<Sample> {
        let sample = *self.track.oldest()?;
        write_sample(host, self.handle, &sample);
        Some(sample)
    }

    /// Drops history, staged action and exhaustion hook, and rebuilds the
    /// track at `capacity`.
    pub(crate) fn reset(&mut self, capacity: usize) {
        self.track = HistoryTrack::with_capacity(capacity);
        self.staged_action = None;
        self.on_exhausted = None;
        self.exhaustion_fired = false;
    }

    fn take_exhaustion(&mut self) -> Option<DeferredAction> {
        if self.exhaustion_fired {
            return None;
        }
        let action = self.on_exhausted.clone()?;
        self.exhaustion_fired = true;
        Some(action)
    }
}

impl fmt::Display for RewindableEntity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "rewindable {}", self.handle)
    }
}

fn write_sample<H: RewindHost + ?Sized>(host: &mut H, handle: EntityHandle, sample: &Sample) {
    host.write_transform(handle, sample.position, sample.rotation);
    if let Some(velocity) = sample.velocity {
        host.write_velocity(handle, velocity);
    }
}
