use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub(crate) enum InputAction {
    MoveForward,
    MoveBack,
    StrafeLeft,
    StrafeRight,
    LookLeft,
    LookRight,
    LookUp,
    LookDown,
    Kill,
    Rewind,
    Quit,
}

const ACTION_COUNT: usize = 11;

impl InputAction {
    const fn index(self) -> usize {
        match self {
            InputAction::MoveForward => 0,
            InputAction::MoveBack => 1,
            InputAction::StrafeLeft => 2,
            InputAction::StrafeRight => 3,
            InputAction::LookLeft => 4,
            InputAction::LookRight => 5,
            InputAction::LookUp => 6,
            InputAction::LookDown => 7,
            InputAction::Kill => 8,
            InputAction::Rewind => 9,
            InputAction::Quit => 10,
        }
    }
}

/// Held state per action plus press edges that are consumed once.
#[derive(Debug, Clone, Copy, Default)]
pub(crate) struct ActionStates {
    down: [bool; ACTION_COUNT],
    pressed: [bool; ACTION_COUNT],
}

impl ActionStates {
    pub(crate) fn set(&mut self, action: InputAction, is_down: bool) {
        let index = action.index();
        if is_down && !self.down[index] {
            self.pressed[index] = true;
        }
        self.down[index] = is_down;
    }

    pub(crate) fn is_down(&self, action: InputAction) -> bool {
        self.down[action.index()]
    }

    /// True once per press, on the first tick that asks.
    pub(crate) fn take_pressed(&mut self, action: InputAction) -> bool {
        std::mem::take(&mut self.pressed[action.index()])
    }

    /// Axis from a pair of opposing actions.
    pub(crate) fn axis(&self, negative: InputAction, positive: InputAction) -> f32 {
        let mut value = 0.0;
        if self.is_down(negative) {
            value -= 1.0;
        }
        if self.is_down(positive) {
            value += 1.0;
        }
        value
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub(crate) struct ScriptedInput {
    pub(crate) frame: u32,
    pub(crate) action: InputAction,
    pub(crate) down: bool,
}

impl ScriptedInput {
    const fn new(frame: u32, action: InputAction, down: bool) -> Self {
        Self {
            frame,
            action,
            down,
        }
    }
}

/// Replays key transitions by frame number in place of a keyboard.
#[derive(Debug, Clone)]
pub(crate) struct InputScript {
    events: Vec<ScriptedInput>,
    cursor: usize,
}

impl InputScript {
    pub(crate) fn new(mut events: Vec<ScriptedInput>) -> Self {
        events.sort_by_key(|event| event.frame);
        Self { events, cursor: 0 }
    }

    /// Applies every event scheduled at or before `frame`. Returns how many
    /// were applied.
    pub(crate) fn apply_frame(&mut self, frame: u32, states: &mut ActionStates) -> usize {
        let start = self.cursor;
        while let Some(event) = self.events.get(self.cursor) {
            if event.frame > frame {
                break;
            }
            states.set(event.action, event.down);
            self.cursor += 1;
        }
        self.cursor - start
    }

    pub(crate) fn is_finished(&self) -> bool {
        self.cursor >= self.events.len()
    }
}

/// Walk, look around, die, rewind past the death, then rewind again over
/// the spawned crates.
pub(crate) fn default_script() -> Vec<ScriptedInput> {
    use InputAction::*;
    vec![
        ScriptedInput::new(0, MoveForward, true),
        ScriptedInput::new(60, LookRight, true),
        ScriptedInput::new(100, LookRight, false),
        ScriptedInput::new(120, MoveForward, false),
        ScriptedInput::new(150, StrafeLeft, true),
        ScriptedInput::new(170, LookUp, true),
        ScriptedInput::new(185, LookUp, false),
        ScriptedInput::new(220, StrafeLeft, false),
        ScriptedInput::new(360, Kill, true),
        ScriptedInput::new(361, Kill, false),
        ScriptedInput::new(420, Rewind, true),
        ScriptedInput::new(540, Rewind, false),
        ScriptedInput::new(560, MoveBack, true),
        ScriptedInput::new(640, MoveBack, false),
        ScriptedInput::new(760, Rewind, true),
        ScriptedInput::new(1000, Rewind, false),
        ScriptedInput::new(1080, Quit, true),
    ]
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn press_edge_is_consumed_once() {
        let mut states = ActionStates::default();
        states.set(InputAction::Kill, true);

        assert!(states.take_pressed(InputAction::Kill));
        assert!(!states.take_pressed(InputAction::Kill));
        assert!(states.is_down(InputAction::Kill));
    }

    #[test]
    fn held_key_does_not_retrigger_press() {
        let mut states = ActionStates::default();
        states.set(InputAction::Kill, true);
        states.take_pressed(InputAction::Kill);
        states.set(InputAction::Kill, true);

        assert!(!states.take_pressed(InputAction::Kill));

        states.set(InputAction::Kill, false);
        states.set(InputAction::Kill, true);
        assert!(states.take_pressed(InputAction::Kill));
    }

    #[test]
    fn opposing_actions_cancel_on_axis() {
        let mut states = ActionStates::default();
        states.set(InputAction::MoveForward, true);
        assert_eq!(
            states.axis(InputAction::MoveBack, InputAction::MoveForward),
            1.0
        );

        states.set(InputAction::MoveBack, true);
        assert_eq!(
            states.axis(InputAction::MoveBack, InputAction::MoveForward),
            0.0
        );
    }

    #[test]
    fn script_applies_events_up_to_frame_in_order() {
        let mut script = InputScript::new(vec![
            ScriptedInput::new(5, InputAction::Rewind, false),
            ScriptedInput::new(2, InputAction::Rewind, true),
        ]);
        let mut states = ActionStates::default();

        assert_eq!(script.apply_frame(1, &mut states), 0);
        assert_eq!(script.apply_frame(3, &mut states), 1);
        assert!(states.is_down(InputAction::Rewind));
        assert_eq!(script.apply_frame(10, &mut states), 1);
        assert!(!states.is_down(InputAction::Rewind));
        assert!(script.is_finished());
    }

    #[test]
    fn scripted_input_parses_snake_case_actions() {
        let event: ScriptedInput =
            serde_json::from_str(r#"{ "frame": 12, "action": "strafe_left", "down": true }"#)
                .expect("parse");
        assert_eq!(event, ScriptedInput::new(12, InputAction::StrafeLeft, true));
    }

    #[test]
    fn default_script_ends_with_quit() {
        let script = default_script();
        let last = script.last().expect("non-empty");
        assert_eq!(last.action, InputAction::Quit);
        assert!(last.down);
    }
}
