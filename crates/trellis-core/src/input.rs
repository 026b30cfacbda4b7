// Copyright 2025 eraflo
//
// Licensed under the Apache License, Version 2.0 (the "License");
// you may not use this file except in compliance with the License.
// You may obtain a copy of the License at
//
//     http://www.apache.org/licenses/LICENSE-2.0
//
// Unless required by applicable law or agreed to in writing, software
// distributed under the License is distributed on an "AS IS" BASIS,
// WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
// See the License for the specific language governing permissions and
// limitations under the License.

//! Backend-agnostic input vocabulary produced by keyboard and mouse modules.

/// A semantic input event, independent of the backend that produced it.
#[derive(Debug, Clone, PartialEq)]
pub enum InputEvent {
    /// A keyboard key was pressed.
    KeyPressed {
        /// Name of the physical key, e.g. `"KeyA"` or `"Escape"`.
        key_code: String,
        /// Modifiers held once this key was applied.
        modifiers: ModifierState,
    },
    /// A keyboard key was released.
    KeyReleased {
        /// Name of the physical key.
        key_code: String,
        /// Modifiers held once this key was applied.
        modifiers: ModifierState,
    },
    /// A mouse button was pressed.
    MouseButtonPressed {
        /// The button.
        button: MouseButton,
    },
    /// A mouse button was released.
    MouseButtonReleased {
        /// The button.
        button: MouseButton,
    },
    /// The pointer moved, in window coordinates.
    MouseMoved {
        /// Horizontal position.
        x: f32,
        /// Vertical position.
        y: f32,
    },
    /// The wheel was scrolled.
    MouseWheelScrolled {
        /// Horizontal delta.
        delta_x: f32,
        /// Vertical delta.
        delta_y: f32,
    },
}

impl InputEvent {
    /// Builds a key press or release with no modifier held. Keyboard modules
    /// stamp the real state with [`with_modifiers`](Self::with_modifiers).
    pub fn key(key_code: impl Into<String>, pressed: bool) -> Self {
        let key_code = key_code.into();
        let modifiers = ModifierState::default();
        if pressed {
            Self::KeyPressed { key_code, modifiers }
        } else {
            Self::KeyReleased { key_code, modifiers }
        }
    }

    /// Returns the key name of a key press or release.
    pub fn key_code(&self) -> Option<&str> {
        match self {
            Self::KeyPressed { key_code, .. } | Self::KeyReleased { key_code, .. } => Some(key_code),
            _ => None,
        }
    }

    /// Returns `Some(true)` for a key press, `Some(false)` for a release.
    pub fn key_pressed(&self) -> Option<bool> {
        match self {
            Self::KeyPressed { .. } => Some(true),
            Self::KeyReleased { .. } => Some(false),
            _ => None,
        }
    }

    /// Returns the modifiers carried by a key event.
    pub fn modifiers(&self) -> Option<ModifierState> {
        match self {
            Self::KeyPressed { modifiers, .. } | Self::KeyReleased { modifiers, .. } => Some(*modifiers),
            _ => None,
        }
    }

    /// Replaces the modifiers of a key event. Other events are unchanged.
    pub fn with_modifiers(mut self, state: ModifierState) -> Self {
        if let Self::KeyPressed { modifiers, .. } | Self::KeyReleased { modifiers, .. } = &mut self {
            *modifiers = state;
        }
        self
    }
}

/// A mouse button.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum MouseButton {
    /// Left button.
    Left,
    /// Right button.
    Right,
    /// Middle button.
    Middle,
    /// Side "back" button.
    Back,
    /// Side "forward" button.
    Forward,
    /// Any other button, by numeric code.
    Other(u16),
}

/// State of the keyboard modifiers.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ModifierState {
    /// Either shift key is held.
    pub shift: bool,
    /// Either control key is held.
    pub control: bool,
    /// Either alt key is held.
    pub alt: bool,
    /// Either meta (super, command) key is held.
    pub meta: bool,
}

impl ModifierState {
    /// Updates the state from a key name. Returns `true` if the key is a
    /// modifier.
    pub fn apply(&mut self, key_code: &str, pressed: bool) -> bool {
        let flag = match key_code {
            "ShiftLeft" | "ShiftRight" => &mut self.shift,
            "ControlLeft" | "ControlRight" => &mut self.control,
            "AltLeft" | "AltRight" => &mut self.alt,
            "SuperLeft" | "SuperRight" | "Meta" => &mut self.meta,
            _ => return false,
        };
        *flag = pressed;
        true
    }
}

/// Where keyboard and mouse modules publish their [`InputEvent`]s.
pub type InputSink = flume::Sender<InputEvent>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_modifier_tracking() {
        let mut mods = ModifierState::default();
        assert!(mods.apply("SuperLeft", true));
        assert!(mods.apply("ShiftRight", true));
        assert!(!mods.apply("KeyQ", true));
        assert!(mods.meta && mods.shift && !mods.control);

        mods.apply("SuperLeft", false);
        assert!(!mods.meta);
    }

    #[test]
    fn test_key_accessors() {
        let press = InputEvent::key("KeyQ", true);
        assert_eq!(press.key_code(), Some("KeyQ"));
        assert_eq!(press.key_pressed(), Some(true));
        assert_eq!(press.modifiers(), Some(ModifierState::default()));
        assert_eq!(InputEvent::key("KeyQ", false).key_pressed(), Some(false));

        let moved = InputEvent::MouseMoved { x: 1.0, y: 2.0 };
        assert_eq!(moved.key_code(), None);
        assert_eq!(moved.modifiers(), None);
    }

    #[test]
    fn test_with_modifiers_only_touches_keys() {
        let meta = ModifierState {
            meta: true,
            ..ModifierState::default()
        };
        let stamped = InputEvent::key("KeyQ", false).with_modifiers(meta);
        assert_eq!(
            stamped,
            InputEvent::KeyReleased {
                key_code: "KeyQ".to_string(),
                modifiers: meta
            }
        );

        let moved = InputEvent::MouseMoved { x: 1.0, y: 2.0 };
        assert_eq!(moved.clone().with_modifiers(meta), moved);
    }
}
