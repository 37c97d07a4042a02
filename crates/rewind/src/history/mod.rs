mod action;
mod sample;
mod track;

pub use action::{ActionOutcome, CustomAction, DeferredAction};
pub use sample::Sample;
pub use track::{HistoryError, HistoryTrack, PopResult};
