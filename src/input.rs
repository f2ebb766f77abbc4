use std::collections::HashSet;

use winit::event::ElementState;
use winit::keyboard::{KeyCode, PhysicalKey};

/// Set of currently held keys, by physical position.
///
/// Physical keys are used so WASD stays in the same place on any layout.
pub struct KeyMap {
    pressed_keys: HashSet<KeyCode>,
}

impl KeyMap {
    pub fn new() -> Self {
        Self {
            pressed_keys: HashSet::new(),
        }
    }

    pub fn handle_key(&mut self, key: PhysicalKey, state: ElementState) {
        let PhysicalKey::Code(code) = key else {
            log::trace!("ignoring unidentified key {key:?}");
            return;
        };
        match state {
            ElementState::Pressed => self.pressed_keys.insert(code),
            ElementState::Released => self.pressed_keys.remove(&code),
        };
    }

    pub fn is_pressed(&self, key: KeyCode) -> bool {
        self.pressed_keys.contains(&key)
    }

    /// -1, 0 or 1 depending on which of the two keys are held
    pub fn axis(&self, negative: KeyCode, positive: KeyCode) -> f32 {
        let mut value = 0.;
        if self.is_pressed(negative) {
            value -= 1.;
        }
        if self.is_pressed(positive) {
            value += 1.;
        }
        value
    }

    /// Forgets every held key. Release events are not delivered while
    /// the window is unfocused so this is called on focus loss.
    pub fn release_all(&mut self) {
        self.pressed_keys.clear();
    }
}

impl Default for KeyMap {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn press(map: &mut KeyMap, code: KeyCode) {
        map.handle_key(PhysicalKey::Code(code), ElementState::Pressed);
    }

    #[test]
    fn tracks_press_and_release() {
        let mut map = KeyMap::new();
        press(&mut map, KeyCode::KeyW);
        assert!(map.is_pressed(KeyCode::KeyW));
        map.handle_key(PhysicalKey::Code(KeyCode::KeyW), ElementState::Released);
        assert!(!map.is_pressed(KeyCode::KeyW));
    }

    #[test]
    fn opposite_keys_cancel() {
        let mut map = KeyMap::new();
        press(&mut map, KeyCode::KeyA);
        assert_eq!(map.axis(KeyCode::KeyA, KeyCode::KeyD), -1.);
        press(&mut map, KeyCode::KeyD);
        assert_eq!(map.axis(KeyCode::KeyA, KeyCode::KeyD), 0.);
    }

    #[test]
    fn release_all_clears_state() {
        let mut map = KeyMap::new();
        press(&mut map, KeyCode::KeyS);
        press(&mut map, KeyCode::KeyD);
        map.release_all();
        assert!(!map.is_pressed(KeyCode::KeyS));
        assert!(!map.is_pressed(KeyCode::KeyD));
    }
}
