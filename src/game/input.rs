//! Held-key tracking for the shared keyboard

use std::collections::HashSet;

/// Keys currently held down, keyed by `KeyboardEvent.code`
#[derive(Debug, Clone, Default)]
pub struct InputState {
    held: HashSet<String>,
}

impl InputState {
    pub fn new() -> Self {
        Self::default()
    }

    /// Mark a key as held and return the updated state for classification
    pub fn key_down(&mut self, code: &str) -> &Self {
        if !self.held.contains(code) {
            self.held.insert(code.to_string());
        }
        self
    }

    pub fn key_up(&mut self, code: &str) {
        self.held.remove(code);
    }

    pub fn is_held(&self, code: &str) -> bool {
        self.held.contains(code)
    }

    /// True when every key in `codes` is held
    pub fn all_held<S: AsRef<str>>(&self, codes: &[S]) -> bool {
        codes.iter().all(|code| self.is_held(code.as_ref()))
    }

    pub fn clear(&mut self) {
        self.held.clear();
    }

    #[cfg(test)]
    pub fn len(&self) -> usize {
        self.held.len()
    }

    #[cfg(test)]
    pub fn is_empty(&self) -> bool {
        self.held.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_press_and_release() {
        let mut input = InputState::new();
        assert!(input.key_down("KeyA").is_held("KeyA"));
        input.key_down("KeyA");
        assert_eq!(input.len(), 1);

        input.key_up("KeyA");
        assert!(!input.is_held("KeyA"));
        assert!(input.is_empty());
    }

    #[test]
    fn test_unknown_keys_are_stored() {
        let mut input = InputState::new();
        input.key_down("F13");
        assert!(input.is_held("F13"));
        input.key_up("NeverPressed");
        assert_eq!(input.len(), 1);
    }

    #[test]
    fn test_all_held() {
        let mut input = InputState::new();
        input.key_down("KeyQ");
        input.key_down("KeyW");
        assert!(!input.all_held(&["KeyQ", "KeyW", "KeyE"]));
        input.key_down("KeyE");
        assert!(input.all_held(&["KeyQ", "KeyW", "KeyE"]));

        input.clear();
        assert!(input.is_empty());
    }
}
