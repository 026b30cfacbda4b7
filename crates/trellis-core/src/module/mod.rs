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

//! Capability-providing modules and their static registration.

mod registry;

pub use registry::ModuleRegistry;

use crate::app::App;
use crate::platform::{EnvProbe, Keyboard, Mouse, Video};
use std::cell::RefCell;
use std::rc::Rc;

/// A shared handle to a registered module.
pub type ModuleHandle = Rc<RefCell<dyn Module>>;

/// A capability-providing unit (video, keyboard, mouse, environment probe...).
///
/// Modules are registered once, probed on demand and cleaned up at shutdown.
/// The role accessors replace downcasting: a module serving a role returns
/// itself from the matching accessor.
pub trait Module {
    /// The stable identifier used for lookup and selection.
    fn id(&self) -> &'static str;

    /// Checks whether the module can work on this machine. May perform real
    /// I/O or subscribe to a multiplexer. Calling it again after a success
    /// must be harmless.
    fn probe(&mut self, app: &App) -> bool;

    /// Releases everything acquired by [`probe`](Module::probe).
    fn cleanup(&mut self);

    /// Secondary hot-key channel. Returns `true` if the key was consumed.
    fn handle_meta(&mut self, _key_code: &str, _pressed: bool) -> bool {
        false
    }

    /// Returns the video role of this module, if any.
    fn as_video(&mut self) -> Option<&mut dyn Video> {
        None
    }

    /// Returns the keyboard role of this module, if any.
    fn as_keyboard(&mut self) -> Option<&mut dyn Keyboard> {
        None
    }

    /// Returns the mouse role of this module, if any.
    fn as_mouse(&mut self) -> Option<&mut dyn Mouse> {
        None
    }

    /// Returns the environment-probe role of this module, if any.
    fn as_env_probe(&mut self) -> Option<&mut dyn EnvProbe> {
        None
    }
}

/// Builds a fresh module instance for the registry.
pub trait ModuleFactory {
    /// Constructs the module behind a [`ModuleHandle`].
    fn construct() -> ModuleHandle;
}

impl<T: Module + Default + 'static> ModuleFactory for T {
    fn construct() -> ModuleHandle {
        Rc::new(RefCell::new(T::default()))
    }
}

/// A statically registered module constructor, collected with `inventory`.
pub struct ModuleRegistration {
    construct: fn() -> ModuleHandle,
}

impl ModuleRegistration {
    /// Wraps a constructor. Prefer the [`register_module!`](crate::register_module) macro.
    pub const fn new(construct: fn() -> ModuleHandle) -> Self {
        Self { construct }
    }

    /// Builds the module.
    pub fn construct(&self) -> ModuleHandle {
        (self.construct)()
    }
}

inventory::collect!(ModuleRegistration);

/// Registers a `Default` module type so that
/// [`ModuleRegistry::from_inventory`] picks it up.
///
/// ```rust,ignore
/// #[derive(Default)]
/// struct VideoDummy;
/// impl Module for VideoDummy { /* ... */ }
///
/// trellis_core::register_module!(VideoDummy);
/// ```
#[macro_export]
macro_rules! register_module {
    ($ty:ty) => {
        $crate::inventory::submit! {
            $crate::module::ModuleRegistration::new(
                <$ty as $crate::module::ModuleFactory>::construct
            )
        }
    };
}
