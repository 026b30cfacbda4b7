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

//! # Trellis Infra
//!
//! Concrete platform backends (`winit` for desktop sessions, `headless` for
//! everything else) and the statically registered modules serving the
//! video, keyboard, mouse and environment-probe roles on top of them.

#![warn(missing_docs)]

pub mod platform;

pub use platform::envprobe::EnvProbeModule;
pub use platform::headless::{HeadlessBackend, HeadlessEventKind};
pub use platform::modules::{KeyboardModule, MouseModule, MouseVirtual, VideoModule, MOUSE_VIRTUAL_ID};
pub use platform::winit::{WinitBackend, WinitEventKind};
pub use platform::{PlatformBackend, PlatformEvent};
