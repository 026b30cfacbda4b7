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

//! The capabilities a module can serve, and the selection of one module per
//! capability.

mod environment;
mod window;

pub use environment::{select_environment, Environment};
pub use window::{PlatformWindowHandle, WindowHandle};

use crate::config::RoleCandidates;
use crate::error::MultiplexerError;
use crate::input::{InputSink, ModifierState};

/// The video role: owns the window.
pub trait Video {
    /// Returns the size of the window, or of the screen if no window is open.
    fn screen_size(&self) -> (u32, u32);

    /// Opens the shared window.
    ///
    /// # Errors
    /// Fails if this module is not the window owner of its backend, or if the
    /// native layer refuses.
    fn open_window(&mut self, width: u32, height: u32, title: &str) -> Result<(), MultiplexerError>;

    /// Returns the native handles of the window, once it exists.
    fn window_handle(&self) -> Option<PlatformWindowHandle> {
        None
    }

    /// Returns `true` once the user asked to close the window.
    fn close_requested(&self) -> bool;
}

/// The keyboard role.
pub trait Keyboard {
    /// Sets where key presses and releases are published.
    fn set_sink(&mut self, sink: InputSink);

    /// Returns the current modifier state.
    fn modifier_state(&self) -> ModifierState;
}

/// The mouse role.
pub trait Mouse {
    /// Sets where pointer events are published.
    fn set_sink(&mut self, sink: InputSink);

    /// Returns the last known pointer position.
    fn position(&self) -> (f32, f32);

    /// Restricts reported positions to `[0, width] x [0, height]`.
    fn set_bounds(&mut self, width: u32, height: u32);
}

/// The environment-probe role: decides which candidates fit this machine.
pub trait EnvProbe {
    /// Returns the candidate module ids per role, most preferred first.
    fn candidates(&self) -> RoleCandidates;
}
