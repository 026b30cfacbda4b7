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

use crate::error::BackendError;
use std::fmt::Debug;

/// A bitmask of platform-specific interest flags.
///
/// Backends that must declare up front which input they want from the
/// native layer (an X11 display, for instance) receive the union of every
/// subscriber's mask through [`Backend::select_input`]. Others ignore it.
pub type EventMask = u64;

/// Width of the window a multiplexer creates when nobody claimed ownership.
pub const DEFAULT_WINDOW_WIDTH: u32 = 100;
/// Height of the window a multiplexer creates when nobody claimed ownership.
pub const DEFAULT_WINDOW_HEIGHT: u32 = 100;
/// Title of the window a multiplexer creates when nobody claimed ownership.
pub const DEFAULT_WINDOW_TITLE: &str = "Trellis";

/// The native side of a [`Multiplexer`](super::Multiplexer).
///
/// Implementations are thin translations onto one platform API. Construction
/// through [`create`](Backend::create) must be cheap and must not touch the
/// native layer: the connection is only opened by [`connect`](Backend::connect),
/// which the multiplexer calls on first dispatch or first window creation.
pub trait Backend: Sized + 'static {
    /// The context-slot key under which the backend's multiplexer is published.
    /// Part of the backend's public contract.
    const CONTEXT_KEY: &'static str;

    /// Number of subscriber slots of the multiplexer.
    const MAX_SUBSCRIBERS: usize = 10;

    /// A native event.
    type Event: 'static;

    /// The tag subscribers filter on.
    type EventType: Copy + Eq + Debug + 'static;

    /// Creates the in-process object. No native resource is opened here.
    fn create() -> Self;

    /// Opens the native connection.
    fn connect(&mut self) -> Result<(), BackendError>;

    /// Returns `true` once [`connect`](Backend::connect) succeeded.
    fn is_connected(&self) -> bool;

    /// Returns `true` if a window exists (or is pending creation).
    fn has_window(&self) -> bool;

    /// Creates the shared window on an open connection.
    fn create_window(&mut self, width: u32, height: u32, title: &str) -> Result<(), BackendError>;

    /// Creates the fallback window used when no subscriber owns window creation.
    fn create_default_window(&mut self) -> Result<(), BackendError> {
        self.create_window(
            DEFAULT_WINDOW_WIDTH,
            DEFAULT_WINDOW_HEIGHT,
            DEFAULT_WINDOW_TITLE,
        )
    }

    /// Declares the aggregate interest mask to the native layer.
    fn select_input(&mut self, _mask: EventMask) {}

    /// Gives the native layer a chance to collect pending events. Called once
    /// at the start of every dispatch, must not block.
    fn pump(&mut self) {}

    /// Returns the next pending event without blocking.
    fn poll_event(&mut self) -> Option<Self::Event>;

    /// Returns the tag of `event`.
    fn event_type(event: &Self::Event) -> Self::EventType;

    /// Releases every native resource. Called exactly once, when the last
    /// subscriber leaves.
    fn teardown(&mut self) -> Result<(), BackendError>;
}
