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

//! # Trellis Core
//!
//! Lets independently developed platform modules (video, keyboard, mouse)
//! share one native connection and one window without knowing about each
//! other.
//!
//! - [`module`]: the statically registered module catalog and its probing.
//! - [`context`]: named singleton cells modules use to find each other's
//!   shared objects.
//! - [`multiplexer`]: one native connection per backend, fanned out to
//!   type-filtered subscribers.
//! - [`app`]: the application object and the per-tick event routing.
//! - [`platform`]: the capability traits served by modules.

#![warn(missing_docs)]

pub mod app;
pub mod config;
pub mod context;
pub mod error;
pub mod event;
pub mod input;
pub mod module;
pub mod multiplexer;
pub mod platform;

#[doc(hidden)]
pub use inventory;

pub use app::{App, EventDispatcher, WeakApp};
pub use config::{Capacities, RoleCandidates, SelectionOverride};
pub use event::EventBus;
pub use input::{InputEvent, InputSink, ModifierState, MouseButton};
pub use module::{Module, ModuleHandle, ModuleRegistry};
pub use multiplexer::{Multiplexer, Subscription};
