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

//! Video, keyboard and mouse modules, written once for any
//! [`PlatformBackend`], plus the keyboard-driven [`MouseVirtual`].
//!
//! Each module keeps its callback state behind an `Rc` so the multiplexer
//! only ever holds a weak reference to it.

mod keyboard;
mod mouse;
mod video;
mod virtual_mouse;

pub use keyboard::KeyboardModule;
pub use mouse::MouseModule;
pub use video::VideoModule;
pub use virtual_mouse::{MouseVirtual, MOUSE_VIRTUAL_ID};

use super::{PlatformBackend, PlatformEvent};
use std::cell::RefCell;
use trellis_core::input::{InputEvent, InputSink};
use trellis_core::Subscription;

/// A module's membership in its backend's multiplexer.
pub(crate) struct Attachment<B: PlatformBackend> {
    sub: RefCell<Option<Subscription<B>>>,
}

impl<B: PlatformBackend> Attachment<B> {
    pub(crate) fn is_attached(&self) -> bool {
        self.sub.borrow().is_some()
    }

    pub(crate) fn attach(&self, sub: Subscription<B>) {
        *self.sub.borrow_mut() = Some(sub);
    }

    /// Leaves the multiplexer. The last module to leave tears the backend down.
    pub(crate) fn detach(&self) {
        let sub = self.sub.borrow_mut().take();
        drop(sub);
    }

    /// The event being dispatched, as the roles read it.
    pub(crate) fn current(&self) -> Option<PlatformEvent> {
        let event = self.sub.borrow().as_ref()?.current_event()?;
        B::translate(&event)
    }

    pub(crate) fn with_sub<R>(&self, f: impl FnOnce(&Subscription<B>) -> R) -> Option<R> {
        self.sub.borrow().as_ref().map(f)
    }
}

impl<B: PlatformBackend> Default for Attachment<B> {
    fn default() -> Self {
        Self {
            sub: RefCell::new(None),
        }
    }
}

/// Where a module forwards its input events.
#[derive(Default)]
pub(crate) struct Sink {
    sender: RefCell<Option<InputSink>>,
}

impl Sink {
    pub(crate) fn set(&self, sender: InputSink) {
        *self.sender.borrow_mut() = Some(sender);
    }

    pub(crate) fn publish(&self, event: InputEvent) {
        if let Some(sender) = self.sender.borrow().as_ref() {
            if sender.send(event).is_err() {
                log::debug!("Input sink disconnected, event dropped.");
            }
        }
    }
}
