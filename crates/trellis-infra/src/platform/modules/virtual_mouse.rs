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

//! A keyboard-driven pointer for machines without a mouse module.
//!
//! Meta+arrow keys move the pointer while held, meta+Enter clicks the left
//! button. Movement is applied once per tick, so the pointer registers itself
//! on the application's dispatch list instead of joining a multiplexer.

use super::Sink;
use std::cell::Cell;
use std::rc::{Rc, Weak};
use trellis_core::app::{DispatcherId, EventDispatcher};
use trellis_core::error::MultiplexerError;
use trellis_core::input::{InputEvent, InputSink, MouseButton};
use trellis_core::platform::Mouse;
use trellis_core::{App, Module, WeakApp};

/// Id of the virtual mouse.
pub const MOUSE_VIRTUAL_ID: &str = "mouse_virtual";

/// Pixels moved per tick while an arrow is held.
const SPEED: f32 = 2.0;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
struct Arrows {
    up: bool,
    down: bool,
    left: bool,
    right: bool,
}

impl Arrows {
    fn any(self) -> bool {
        self.up || self.down || self.left || self.right
    }
}

#[derive(Default)]
struct PointerState {
    sink: Sink,
    position: Cell<(f32, f32)>,
    bounds: Cell<Option<(u32, u32)>>,
    held: Cell<Arrows>,
}

impl PointerState {
    fn clamp(&self, x: f32, y: f32) -> (f32, f32) {
        match self.bounds.get() {
            Some((w, h)) => (x.clamp(0.0, w as f32), y.clamp(0.0, h as f32)),
            None => (x, y),
        }
    }
}

impl EventDispatcher for PointerState {
    fn name(&self) -> &'static str {
        MOUSE_VIRTUAL_ID
    }

    fn dispatch(&self) -> Result<usize, MultiplexerError> {
        let held = self.held.get();
        if !held.any() {
            return Ok(0);
        }
        let (mut x, mut y) = self.position.get();
        if held.up {
            y -= SPEED;
        }
        if held.down {
            y += SPEED;
        }
        if held.left {
            x -= SPEED;
        }
        if held.right {
            x += SPEED;
        }
        let (x, y) = self.clamp(x, y);
        self.position.set((x, y));
        self.sink.publish(InputEvent::MouseMoved { x, y });
        Ok(1)
    }
}

/// The mouse role played by the keyboard's meta keys.
#[derive(Default)]
pub struct MouseVirtual {
    state: Rc<PointerState>,
    app: WeakApp,
    dispatcher: Option<DispatcherId>,
}

impl Module for MouseVirtual {
    fn id(&self) -> &'static str {
        MOUSE_VIRTUAL_ID
    }

    fn probe(&mut self, app: &App) -> bool {
        if self.dispatcher.is_none() {
            let state = Rc::downgrade(&self.state);
            let state: Weak<dyn EventDispatcher> = state;
            self.dispatcher = Some(app.add_dispatcher(state));
            self.app = app.downgrade();
            log::debug!("{MOUSE_VIRTUAL_ID}: joined the dispatch list.");
        }
        true
    }

    fn cleanup(&mut self) {
        if let (Some(id), Some(app)) = (self.dispatcher.take(), self.app.upgrade()) {
            app.remove_dispatcher(id);
        }
        self.state.held.set(Arrows::default());
    }

    fn handle_meta(&mut self, key_code: &str, pressed: bool) -> bool {
        let mut held = self.state.held.get();
        match key_code {
            "ArrowUp" => held.up = pressed,
            "ArrowDown" => held.down = pressed,
            "ArrowLeft" => held.left = pressed,
            "ArrowRight" => held.right = pressed,
            "Enter" => {
                let button = MouseButton::Left;
                self.state.sink.publish(if pressed {
                    InputEvent::MouseButtonPressed { button }
                } else {
                    InputEvent::MouseButtonReleased { button }
                });
                return true;
            }
            _ => return false,
        }
        self.state.held.set(held);
        true
    }

    fn as_mouse(&mut self) -> Option<&mut dyn Mouse> {
        Some(self)
    }
}

impl Mouse for MouseVirtual {
    fn set_sink(&mut self, sink: InputSink) {
        self.state.sink.set(sink);
    }

    fn position(&self) -> (f32, f32) {
        self.state.position.get()
    }

    /// Parks the pointer in the bottom-right corner, out of the way.
    fn set_bounds(&mut self, width: u32, height: u32) {
        self.state.bounds.set(Some((width, height)));
        let corner = (width.saturating_sub(1) as f32, height.saturating_sub(1) as f32);
        self.state.position.set(corner);
    }
}
