use std::fmt;

use serde::{Deserialize, Serialize};

use crate::runtime::EntityId;

/// Side effect bound to one slot of an entity's history. It runs when
/// playback pops that slot.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", content = "data", rename_all = "snake_case")]
pub enum DeferredAction {
    /// Remove the entity from tracking and ask the host to destroy it.
    Destroy(EntityId),
    Custom(CustomAction),
}

impl DeferredAction {
    pub fn custom(name: impl Into<String>, payload: serde_json::Value) -> Self {
        Self::Custom(CustomAction {
            name: name.into(),
            payload,
        })
    }
}

impl fmt::Display for DeferredAction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Destroy(id) => write!(f, "destroy({})", id.0),
            Self::Custom(custom) => write!(f, "custom({})", custom.name),
        }
    }
}

/// Host-interpreted action. The payload is opaque to the rewind engine.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CustomAction {
    pub name: String,
    #[serde(default)]
    pub payload: serde_json::Value,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum ActionOutcome {
    /// Consume the slot and let playback continue past it.
    #[default]
    Continue,
    /// Keep the slot in place; playback stays frozen on it until a later
    /// dispatch returns `Continue`.
    Hold,
}
