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

//! The mouse role, with a meta+M pointer grab toggle.

use super::{Attachment, Sink};
use crate::platform::{role_request, subscribe, PlatformBackend, PlatformEvent};
use std::cell::Cell;
use std::rc::Rc;
use trellis_core::input::{InputEvent, InputSink};
use trellis_core::multiplexer::EventHandler;
use trellis_core::platform::Mouse;
use trellis_core::{App, Module};

/// Meta key toggling the pointer grab, on release.
const GRAB_KEY: &str = "KeyM";

struct MouseState<B: PlatformBackend> {
    attachment: Attachment<B>,
    sink: Sink,
    position: Cell<(f32, f32)>,
    bounds: Cell<Option<(u32, u32)>>,
    grabbed: Cell<bool>,
}

impl<B: PlatformBackend> MouseState<B> {
    fn clamp(&self, x: f32, y: f32) -> (f32, f32) {
        match self.bounds.get() {
            Some((w, h)) => (x.clamp(0.0, w as f32), y.clamp(0.0, h as f32)),
            None => (x, y),
        }
    }
}

impl<B: PlatformBackend> EventHandler for MouseState<B> {
    fn on_event(&self) {
        let Some(PlatformEvent::Input(input)) = self.attachment.current() else {
            return;
        };
        let input = match input {
            InputEvent::MouseMoved { x, y } => {
                let (x, y) = self.clamp(x, y);
                self.position.set((x, y));
                InputEvent::MouseMoved { x, y }
            }
            InputEvent::KeyPressed { .. } | InputEvent::KeyReleased { .. } => return,
            other => other,
        };
        self.sink.publish(input);
    }
}

/// The mouse role on backend `B`.
pub struct MouseModule<B: PlatformBackend> {
    state: Rc<MouseState<B>>,
}

impl<B: PlatformBackend> Default for MouseModule<B> {
    fn default() -> Self {
        Self {
            state: Rc::new(MouseState {
                attachment: Attachment::default(),
                sink: Sink::default(),
                position: Cell::new((0.0, 0.0)),
                bounds: Cell::new(None),
                grabbed: Cell::new(false),
            }),
        }
    }
}

impl<B: PlatformBackend> Module for MouseModule<B> {
    fn id(&self) -> &'static str {
        B::MOUSE_ID
    }

    fn probe(&mut self, app: &App) -> bool {
        if self.state.attachment.is_attached() {
            return true;
        }
        let request = role_request::<B>(B::MOUSE_EVENTS);
        match subscribe::<B, _>(app, B::MOUSE_ID, &self.state, request) {
            Some(sub) => {
                self.state.attachment.attach(sub);
                true
            }
            None => false,
        }
    }

    fn cleanup(&mut self) {
        if self.state.grabbed.replace(false) {
            self.state
                .attachment
                .with_sub(|s| s.with_backend(|b| b.set_cursor_grab(false)));
        }
        self.state.attachment.detach();
    }

    fn handle_meta(&mut self, key_code: &str, pressed: bool) -> bool {
        if pressed || key_code != GRAB_KEY {
            return false;
        }
        let grab = !self.state.grabbed.get();
        let done = self
            .state
            .attachment
            .with_sub(|s| s.with_backend(|b| b.set_cursor_grab(grab)))
            .unwrap_or(false);
        if done {
            self.state.grabbed.set(grab);
            log::info!("{}: pointer grab {}.", B::MOUSE_ID, if grab { "on" } else { "off" });
        } else {
            log::warn!("{}: pointer grab not available.", B::MOUSE_ID);
        }
        true
    }

    fn as_mouse(&mut self) -> Option<&mut dyn Mouse> {
        Some(self)
    }
}

impl<B: PlatformBackend> Mouse for MouseModule<B> {
    fn set_sink(&mut self, sink: InputSink) {
        self.state.sink.set(sink);
    }

    fn position(&self) -> (f32, f32) {
        self.state.position.get()
    }

    fn set_bounds(&mut self, width: u32, height: u32) {
        self.state.bounds.set(Some((width, height)));
        let (x, y) = self.state.position.get();
        self.state.position.set(self.state.clamp(x, y));
    }
}
