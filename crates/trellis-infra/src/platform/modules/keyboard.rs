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

//! The keyboard role. Tracks modifiers and stamps them on every key it publishes.

use super::{Attachment, Sink};
use crate::platform::{role_request, subscribe, PlatformBackend, PlatformEvent};
use std::cell::Cell;
use std::rc::Rc;
use trellis_core::input::{InputEvent, InputSink, ModifierState};
use trellis_core::multiplexer::EventHandler;
use trellis_core::platform::Keyboard;
use trellis_core::{App, Module};

struct KeyboardState<B: PlatformBackend> {
    attachment: Attachment<B>,
    sink: Sink,
    modifiers: Cell<ModifierState>,
}

impl<B: PlatformBackend> EventHandler for KeyboardState<B> {
    fn on_event(&self) {
        let Some(PlatformEvent::Input(input)) = self.attachment.current() else {
            return;
        };
        let (Some(code), Some(pressed)) = (input.key_code(), input.key_pressed()) else {
            return;
        };
        let mut modifiers = self.modifiers.get();
        modifiers.apply(code, pressed);
        self.modifiers.set(modifiers);
        self.sink.publish(input.with_modifiers(modifiers));
    }
}

/// The keyboard role on backend `B`.
pub struct KeyboardModule<B: PlatformBackend> {
    state: Rc<KeyboardState<B>>,
}

impl<B: PlatformBackend> Default for KeyboardModule<B> {
    fn default() -> Self {
        Self {
            state: Rc::new(KeyboardState {
                attachment: Attachment::default(),
                sink: Sink::default(),
                modifiers: Cell::new(ModifierState::default()),
            }),
        }
    }
}

impl<B: PlatformBackend> Module for KeyboardModule<B> {
    fn id(&self) -> &'static str {
        B::KEYBOARD_ID
    }

    fn probe(&mut self, app: &App) -> bool {
        if self.state.attachment.is_attached() {
            return true;
        }
        let request = role_request::<B>(B::KEYBOARD_EVENTS);
        match subscribe::<B, _>(app, B::KEYBOARD_ID, &self.state, request) {
            Some(sub) => {
                self.state.attachment.attach(sub);
                true
            }
            None => false,
        }
    }

    fn cleanup(&mut self) {
        self.state.attachment.detach();
        self.state.modifiers.set(ModifierState::default());
    }

    fn as_keyboard(&mut self) -> Option<&mut dyn Keyboard> {
        Some(self)
    }
}

impl<B: PlatformBackend> Keyboard for KeyboardModule<B> {
    fn set_sink(&mut self, sink: InputSink) {
        self.state.sink.set(sink);
    }

    fn modifier_state(&self) -> ModifierState {
        self.state.modifiers.get()
    }
}
