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

//! Backends and the modules built on them.
//!
//! Every backend implements [`PlatformBackend`], which tells the generic
//! [`modules`] which event types each role listens to and how a native
//! event reads as a [`PlatformEvent`]. Registering a backend's three roles is
//! then one line each.

pub mod envprobe;
pub mod headless;
pub mod modules;
pub mod winit;

use std::rc::{Rc, Weak};
use trellis_core::input::InputEvent;
use trellis_core::multiplexer::{Backend, EventFilter, EventHandler, EventMask, SubscriptionRequest};
use trellis_core::platform::PlatformWindowHandle;
use trellis_core::{App, Multiplexer, Subscription};

use self::headless::HeadlessBackend;
use self::modules::{KeyboardModule, MouseModule, MouseVirtual, VideoModule};
use self::winit::WinitBackend;

/// A native event as the role modules understand it.
#[derive(Debug, Clone, PartialEq)]
pub enum PlatformEvent {
    /// User input.
    Input(InputEvent),
    /// The window was resized.
    Resized {
        /// New width.
        width: u32,
        /// New height.
        height: u32,
    },
    /// The user asked to close the window.
    CloseRequested,
}

/// A [`Backend`] the generic role modules can run on.
pub trait PlatformBackend: Backend {
    /// Id of the video module of this backend.
    const VIDEO_ID: &'static str;
    /// Id of the keyboard module of this backend.
    const KEYBOARD_ID: &'static str;
    /// Id of the mouse module of this backend.
    const MOUSE_ID: &'static str;

    /// Event types the video module listens to.
    const VIDEO_EVENTS: &'static [Self::EventType];
    /// Event types the keyboard module listens to.
    const KEYBOARD_EVENTS: &'static [Self::EventType];
    /// Event types the mouse module listens to.
    const MOUSE_EVENTS: &'static [Self::EventType];

    /// Interest bit of one event type.
    fn mask_of(ty: Self::EventType) -> EventMask;

    /// Reads a native event. `None` for events no role cares about.
    fn translate(event: &Self::Event) -> Option<PlatformEvent>;

    /// Size of the window, if one exists.
    fn window_size(&self) -> Option<(u32, u32)>;

    /// Native handles of the window, if one exists.
    fn window_handle(&self) -> Option<PlatformWindowHandle> {
        None
    }

    /// Confines (or frees) the pointer. Returns `true` on success.
    fn set_cursor_grab(&self, _grab: bool) -> bool {
        false
    }
}

/// Builds the request of a role listening to `types`.
pub(crate) fn role_request<B: PlatformBackend>(
    types: &[B::EventType],
) -> SubscriptionRequest<B::EventType> {
    let mask = types.iter().fold(0, |acc, ty| acc | B::mask_of(*ty));
    SubscriptionRequest::new(EventFilter::only(types.iter().copied())).with_mask(mask)
}

/// Joins the multiplexer of `B` with `handler` as callback. Failures are
/// logged and reported as `None`, which is what a failed probe needs.
pub(crate) fn subscribe<B, H>(
    app: &App,
    module: &str,
    handler: &Rc<H>,
    request: SubscriptionRequest<B::EventType>,
) -> Option<Subscription<B>>
where
    B: Backend,
    H: EventHandler + 'static,
{
    let handler = Rc::downgrade(handler);
    let handler: Weak<dyn EventHandler> = handler;
    match Multiplexer::<B>::acquire(app, request.with_handler(handler)) {
        Ok(sub) => Some(sub),
        Err(err) => {
            log::warn!("{module}: {err}");
            None
        }
    }
}

trellis_core::register_module!(VideoModule<WinitBackend>);
trellis_core::register_module!(KeyboardModule<WinitBackend>);
trellis_core::register_module!(MouseModule<WinitBackend>);
trellis_core::register_module!(VideoModule<HeadlessBackend>);
trellis_core::register_module!(KeyboardModule<HeadlessBackend>);
trellis_core::register_module!(MouseModule<HeadlessBackend>);
trellis_core::register_module!(MouseVirtual);
trellis_core::register_module!(envprobe::EnvProbeModule);
