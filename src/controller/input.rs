/// Platform-agnostic keyboard state
use std::collections::HashSet;

/// Held-key map fed by platform key events. Last write wins; keys never
/// seen read as released.
#[derive(Debug, Default)]
pub struct InputState {
    pressed_keys: HashSet<String>,
}

impl InputState {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn key_down(&mut self, key: impl Into<String>) {
        self.pressed_keys.insert(key.into());
    }

    pub fn key_up(&mut self, key: &str) {
        self.pressed_keys.remove(key);
    }

    pub fn is_down(&self, key: &str) -> bool {
        self.pressed_keys.contains(key)
    }

    /// Drop everything held, e.g. on focus loss so keys do not stick.
    pub fn clear_keys(&mut self) {
        self.pressed_keys.clear();
    }
}

/// Key mapping configuration
#[derive(Clone)]
pub struct KeyBindings {
    pub forward: String,
    pub backward: String,
    pub strafe_left: String,
    pub strafe_right: String,
    pub turn_left: String,
    pub turn_right: String,
    pub fire: String,
}

impl Default for KeyBindings {
    fn default() -> Self {
        Self {
            forward: "w".to_string(),
            backward: "s".to_string(),
            strafe_left: "a".to_string(),
            strafe_right: "d".to_string(),
            turn_left: "ArrowLeft".to_string(),
            turn_right: "ArrowRight".to_string(),
            fire: " ".to_string(),
        }
    }
}

/// Maps held keys to the fixed set of logical actions.
#[derive(Clone, Default)]
pub struct InputProcessor {
    bindings: KeyBindings,
}

impl InputProcessor {
    pub fn new(bindings: KeyBindings) -> Self {
        Self { bindings }
    }

    fn letter_down(input: &InputState, key: &str) -> bool {
        input.is_down(key) || input.is_down(&key.to_ascii_uppercase())
    }

    pub fn is_moving_forward(&self, input: &InputState) -> bool {
        Self::letter_down(input, &self.bindings.forward)
    }

    pub fn is_moving_backward(&self, input: &InputState) -> bool {
        Self::letter_down(input, &self.bindings.backward)
    }

    pub fn is_strafing_left(&self, input: &InputState) -> bool {
        Self::letter_down(input, &self.bindings.strafe_left)
    }

    pub fn is_strafing_right(&self, input: &InputState) -> bool {
        Self::letter_down(input, &self.bindings.strafe_right)
    }

    pub fn is_turning_left(&self, input: &InputState) -> bool {
        input.is_down(&self.bindings.turn_left)
    }

    pub fn is_turning_right(&self, input: &InputState) -> bool {
        input.is_down(&self.bindings.turn_right)
    }

    pub fn is_firing(&self, input: &InputState) -> bool {
        input.is_down(&self.bindings.fire)
    }

    /// Keys whose browser default (scrolling, mostly) must be suppressed.
    pub fn is_bound(&self, key: &str) -> bool {
        let b = &self.bindings;
        [
            &b.forward,
            &b.backward,
            &b.strafe_left,
            &b.strafe_right,
            &b.turn_left,
            &b.turn_right,
            &b.fire,
        ]
        .iter()
        .any(|bound| key.eq_ignore_ascii_case(bound.as_str()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn is_down_reflects_the_most_recent_event() {
        let mut input = InputState::new();
        assert!(!input.is_down("w"));

        input.key_down("w");
        assert!(input.is_down("w"));

        input.key_down("w"); // repeat while held
        input.key_up("w");
        assert!(!input.is_down("w"));

        // Releasing a never-pressed key is a no-op
        input.key_up("q");
        assert!(!input.is_down("q"));
    }

    #[test]
    fn clear_keys_releases_everything() {
        let mut input = InputState::new();
        input.key_down("w");
        input.key_down("ArrowLeft");
        input.clear_keys();
        assert!(!input.is_down("w"));
        assert!(!input.is_down("ArrowLeft"));
    }

    #[test]
    fn processor_maps_bindings_to_actions() {
        let processor = InputProcessor::default();
        let mut input = InputState::new();

        input.key_down("W"); // shifted letters still move
        input.key_down("ArrowRight");
        input.key_down(" ");

        assert!(processor.is_moving_forward(&input));
        assert!(processor.is_turning_right(&input));
        assert!(processor.is_firing(&input));
        assert!(!processor.is_moving_backward(&input));
        assert!(!processor.is_turning_left(&input));
    }
}
