/// Platform-agnostic keyboard input for flying the drone
use glam::Vec3;

/// Platform-independent input events
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum InputEvent {
    KeyDown(String),
    KeyUp(String),

    // Window events
    FocusLost,
    VisibilityChanged { visible: bool },
}

/// The six logical movement directions
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Direction {
    Forward,
    Backward,
    Left,
    Right,
    Up,
    Down,
}

impl Direction {
    pub const ALL: [Direction; 6] = [
        Direction::Forward,
        Direction::Backward,
        Direction::Left,
        Direction::Right,
        Direction::Up,
        Direction::Down,
    ];

    /// Unit step along the direction's axis. Forward is -Z (into the screen).
    pub fn axis(self) -> Vec3 {
        match self {
            Direction::Forward => Vec3::NEG_Z,
            Direction::Backward => Vec3::Z,
            Direction::Left => Vec3::NEG_X,
            Direction::Right => Vec3::X,
            Direction::Up => Vec3::Y,
            Direction::Down => Vec3::NEG_Y,
        }
    }
}

/// Held state of every movement direction
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct InputState {
    pub forward: bool,
    pub backward: bool,
    pub left: bool,
    pub right: bool,
    pub up: bool,
    pub down: bool,
}

impl InputState {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_held(&self, dir: Direction) -> bool {
        match dir {
            Direction::Forward => self.forward,
            Direction::Backward => self.backward,
            Direction::Left => self.left,
            Direction::Right => self.right,
            Direction::Up => self.up,
            Direction::Down => self.down,
        }
    }

    pub fn set(&mut self, dir: Direction, held: bool) {
        let flag = match dir {
            Direction::Forward => &mut self.forward,
            Direction::Backward => &mut self.backward,
            Direction::Left => &mut self.left,
            Direction::Right => &mut self.right,
            Direction::Up => &mut self.up,
            Direction::Down => &mut self.down,
        };
        *flag = held;
    }

    /// Directions currently held, in `Direction::ALL` order
    pub fn held(&self) -> impl Iterator<Item = Direction> + '_ {
        Direction::ALL.into_iter().filter(move |d| self.is_held(*d))
    }

    pub fn clear_keys(&mut self) {
        *self = Self::default();
    }

    /// Update the flag bound to `key`. Returns the direction touched, or
    /// `None` for keys with no binding (those leave the state alone).
    pub fn apply_key_event(&mut self, bindings: &KeyBindings, key: &str, pressed: bool) -> Option<Direction> {
        let dir = bindings.direction_for(key)?;
        self.set(dir, pressed);
        Some(dir)
    }

    /// Process an input event and update state
    pub fn process_event(&mut self, bindings: &KeyBindings, event: &InputEvent) {
        match event {
            InputEvent::KeyDown(key) => {
                self.apply_key_event(bindings, key, true);
            }
            InputEvent::KeyUp(key) => {
                self.apply_key_event(bindings, key, false);
            }
            InputEvent::FocusLost | InputEvent::VisibilityChanged { .. } => {
                self.clear_keys();
            }
        }
    }
}

/// Value form of [`InputState::apply_key_event`]
pub fn apply_key_event(mut state: InputState, bindings: &KeyBindings, key: &str, pressed: bool) -> InputState {
    state.apply_key_event(bindings, key, pressed);
    state
}

/// Key mapping configuration
#[derive(Debug, Clone)]
pub struct KeyBindings {
    pub forward: String,
    pub backward: String,
    pub left: String,
    pub right: String,
    pub up: String,
    pub down: String,
}

impl Default for KeyBindings {
    fn default() -> Self {
        Self {
            forward: "w".to_string(),
            backward: "s".to_string(),
            left: "a".to_string(),
            right: "d".to_string(),
            up: " ".to_string(),
            down: "Shift".to_string(),
        }
    }
}

impl KeyBindings {
    pub fn key_for(&self, dir: Direction) -> &str {
        match dir {
            Direction::Forward => &self.forward,
            Direction::Backward => &self.backward,
            Direction::Left => &self.left,
            Direction::Right => &self.right,
            Direction::Up => &self.up,
            Direction::Down => &self.down,
        }
    }

    /// Letter keys match regardless of case: with Shift held the browser
    /// reports "W" for the same physical key, and its keyup must still clear
    /// the flag set by "w".
    pub fn direction_for(&self, key: &str) -> Option<Direction> {
        Direction::ALL.into_iter().find(|dir| {
            let bound = self.key_for(*dir);
            if bound.chars().count() == 1 {
                key.eq_ignore_ascii_case(bound)
            } else {
                key == bound
            }
        })
    }

    /// Whether the browser default action for `key` should be suppressed
    pub fn is_bound(&self, key: &str) -> bool {
        self.direction_for(key).is_some()
    }
}

#[cfg(target_arch = "wasm32")]
pub mod wasm {
    use super::*;
    use web_sys::KeyboardEvent;

    pub fn keyboard_event_to_input(e: &KeyboardEvent, is_down: bool) -> InputEvent {
        let key = e.key();
        if is_down {
            InputEvent::KeyDown(key)
        } else {
            InputEvent::KeyUp(key)
        }
    }
}

#[cfg(not(target_arch = "wasm32"))]
pub mod native {
    use super::*;
    use winit::event::{ElementState, KeyEvent};
    use winit::keyboard::{Key, NamedKey};

    /// Browser-style identifier for a winit logical key
    pub fn key_identifier(key: &Key) -> Option<String> {
        match key {
            Key::Character(s) => Some(s.to_string()),
            Key::Named(NamedKey::Space) => Some(" ".to_string()),
            Key::Named(NamedKey::Shift) => Some("Shift".to_string()),
            _ => None,
        }
    }

    pub fn key_event_to_input(event: &KeyEvent) -> Option<InputEvent> {
        let key = key_identifier(&event.logical_key)?;
        Some(match event.state {
            ElementState::Pressed => InputEvent::KeyDown(key),
            ElementState::Released => InputEvent::KeyUp(key),
        })
    }

}

#[cfg(test)]
mod tests {
    use super::*;

    fn press(state: &mut InputState, key: &str) -> Option<Direction> {
        state.apply_key_event(&KeyBindings::default(), key, true)
    }

    fn release(state: &mut InputState, key: &str) -> Option<Direction> {
        state.apply_key_event(&KeyBindings::default(), key, false)
    }

    #[test]
    fn default_bindings_cover_all_directions() {
        let b = KeyBindings::default();
        assert_eq!(b.direction_for("w"), Some(Direction::Forward));
        assert_eq!(b.direction_for("s"), Some(Direction::Backward));
        assert_eq!(b.direction_for("a"), Some(Direction::Left));
        assert_eq!(b.direction_for("d"), Some(Direction::Right));
        assert_eq!(b.direction_for(" "), Some(Direction::Up));
        assert_eq!(b.direction_for("Shift"), Some(Direction::Down));
    }

    #[test]
    fn press_sets_and_release_clears() {
        let mut state = InputState::new();
        assert_eq!(press(&mut state, "w"), Some(Direction::Forward));
        assert!(state.forward);
        assert_eq!(release(&mut state, "w"), Some(Direction::Forward));
        assert!(!state.forward);
    }

    #[test]
    fn holding_keeps_flag_set() {
        let mut state = InputState::new();
        // key repeat delivers several keydowns
        for _ in 0..5 {
            press(&mut state, "d");
        }
        assert!(state.right);
        release(&mut state, "d");
        assert!(!state.right);
    }

    #[test]
    fn unknown_keys_are_ignored() {
        let mut state = InputState::new();
        press(&mut state, "w");
        let before = state;
        assert_eq!(press(&mut state, "q"), None);
        assert_eq!(release(&mut state, "Enter"), None);
        assert_eq!(press(&mut state, ""), None);
        assert_eq!(state, before);
    }

    #[test]
    fn uppercase_letter_releases_lowercase_press() {
        let mut state = InputState::new();
        press(&mut state, "w");
        press(&mut state, "Shift");
        release(&mut state, "W");
        assert!(!state.forward);
        assert!(state.down);
    }

    #[test]
    fn named_keys_match_exactly() {
        let b = KeyBindings::default();
        assert_eq!(b.direction_for("shift"), None);
        assert_eq!(b.direction_for("Space"), None);
    }

    #[test]
    fn flag_follows_most_recent_notification() {
        let b = KeyBindings::default();
        let events = [
            ("w", true),
            ("a", true),
            ("w", false),
            ("x", true),
            ("a", false),
            ("a", true),
            (" ", true),
            ("Shift", true),
            ("Shift", false),
        ];
        let mut state = InputState::new();
        for (i, (key, pressed)) in events.iter().enumerate() {
            state.apply_key_event(&b, key, *pressed);
            for dir in Direction::ALL {
                let last = events[..=i]
                    .iter()
                    .rev()
                    .find(|(k, _)| b.direction_for(k) == Some(dir))
                    .map(|(_, p)| *p)
                    .unwrap_or(false);
                assert_eq!(state.is_held(dir), last, "{dir:?} after event {i}");
            }
        }
    }

    #[test]
    fn value_form_leaves_input_untouched() {
        let b = KeyBindings::default();
        let start = InputState::new();
        let next = apply_key_event(start, &b, " ", true);
        assert!(next.up);
        assert!(!start.up);
    }

    #[test]
    fn focus_loss_clears_everything() {
        let b = KeyBindings::default();
        let mut state = InputState::new();
        state.process_event(&b, &InputEvent::KeyDown("w".into()));
        state.process_event(&b, &InputEvent::KeyDown(" ".into()));
        assert_eq!(state.held().count(), 2);

        state.process_event(&b, &InputEvent::FocusLost);
        assert_eq!(state, InputState::default());

        state.process_event(&b, &InputEvent::KeyDown("a".into()));
        state.process_event(&b, &InputEvent::VisibilityChanged { visible: false });
        assert_eq!(state.held().count(), 0);
    }

    #[test]
    fn axes_are_unit_and_opposed() {
        for dir in Direction::ALL {
            assert!((dir.axis().length() - 1.0).abs() < f32::EPSILON);
        }
        assert_eq!(Direction::Forward.axis(), -Direction::Backward.axis());
        assert_eq!(Direction::Left.axis(), -Direction::Right.axis());
        assert_eq!(Direction::Up.axis(), -Direction::Down.axis());
    }

    #[test]
    fn custom_bindings() {
        let b = KeyBindings {
            forward: "ArrowUp".to_string(),
            ..KeyBindings::default()
        };
        let mut state = InputState::new();
        state.apply_key_event(&b, "ArrowUp", true);
        assert!(state.forward);
        assert_eq!(b.direction_for("w"), None);
    }
}
