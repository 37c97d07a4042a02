use std::collections::VecDeque;

use thiserror::Error;

use super::{ActionOutcome, DeferredAction, Sample};

const INITIAL_RESERVE: usize = 256;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum HistoryError {
    #[error("cannot pop from an empty history")]
    EmptyHistory,
    #[error("interpolation needs at least 2 samples, {remaining} remaining")]
    InsufficientHistory { remaining: usize },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PopResult {
    /// The newest slot was removed.
    Popped { remaining: usize },
    /// The newest slot's action asked to hold; nothing was removed.
    Held,
}

/// Fixed-depth, newest-first history of samples with one action slot per
/// sample.
///
/// Invariants:
/// - `samples.len() == actions.len()`
/// - `samples.len() <= capacity`
#[derive(Debug, Clone)]
pub struct HistoryTrack {
    capacity: usize,
    samples: VecDeque<Sample>,
    actions: VecDeque<Option<DeferredAction>>,
}

impl HistoryTrack {
    pub fn with_capacity(capacity: usize) -> Self {
        let capacity = capacity.max(1);
        // Deep histories grow on demand; pushes evict back to `capacity`.
        let reserve = capacity.min(INITIAL_RESERVE).saturating_add(1);
        Self {
            capacity,
            samples: VecDeque::with_capacity(reserve),
            actions: VecDeque::with_capacity(reserve),
        }
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    pub fn len(&self) -> usize {
        self.samples.len()
    }

    pub fn is_empty(&self) -> bool {
        self.samples.is_empty()
    }

    pub fn newest(&self) -> Option<&Sample> {
        self.samples.front()
    }

    pub fn oldest(&self) -> Option<&Sample> {
        self.samples.back()
    }

    /// Samples from newest to oldest.
    pub fn samples(&self) -> impl Iterator<Item = &Sample> {
        self.samples.iter()
    }

    /// Occupied action slots with their offset from the newest sample.
    pub fn pending_actions(&self) -> impl Iterator<Item = (usize, &DeferredAction)> {
        self.actions
            .iter()
            .enumerate()
            .filter_map(|(offset, slot)| slot.as_ref().map(|action| (offset, action)))
    }

    pub fn push(&mut self, sample: Sample, action: Option<DeferredAction>) {
        self.samples.push_front(sample);
        self.actions.push_front(action);
        while self.samples.len() > self.capacity {
            self.samples.pop_back();
            self.actions.pop_back();
        }
        debug_assert_eq!(self.samples.len(), self.actions.len());
    }

    /// Plays back the newest slot. A present action is handed to `dispatch`
    /// first; a `Hold` outcome leaves the track untouched.
    pub fn pop_front<F>(&mut self, dispatch: F) -> Result<PopResult, HistoryError>
    where
        F: FnOnce(&DeferredAction) -> ActionOutcome,
    {
        if self.samples.is_empty() {
            return Err(HistoryError::EmptyHistory);
        }

        if let Some(Some(action)) = self.actions.front() {
            if dispatch(action) == ActionOutcome::Hold {
                return Ok(PopResult::Held);
            }
        }

        self.samples.pop_front();
        self.actions.pop_front();
        Ok(PopResult::Popped {
            remaining: self.samples.len(),
        })
    }

    /// Blends the two newest samples; `fraction` weights the older one.
    pub fn interpolate(&self, fraction: f32) -> Result<Sample, HistoryError> {
        match (self.samples.front(), self.samples.get(1)) {
            (Some(newest), Some(previous)) => Ok(newest.lerp_unclamped(previous, fraction)),
            _ => Err(HistoryError::InsufficientHistory {
                remaining: self.samples.len(),
            }),
        }
    }

    pub fn clear(&mut self) {
        self.samples.clear();
        self.actions.clear();
    }
}
