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

use super::{ModuleHandle, ModuleRegistration};
use crate::app::App;
use crate::config::Capacities;
use crate::context::{ContextCell, ContextKey, ContextTable, TypedSlot};
use crate::error::{ContextError, RegistrationError};
use std::cell::{RefCell, RefMut};
use std::rc::Rc;

/// A fixed-capacity catalog of modules plus the named context slots.
///
/// Lookups are linear scans with exact string matching; the first matching
/// entry wins. Ids are unique by convention only.
pub struct ModuleRegistry {
    modules: RefCell<Vec<ModuleHandle>>,
    contexts: RefCell<ContextTable>,
    capacity: usize,
}

impl ModuleRegistry {
    /// Creates an empty registry.
    pub fn new(capacities: Capacities) -> Self {
        Self {
            modules: RefCell::new(Vec::with_capacity(capacities.max_modules)),
            contexts: RefCell::new(ContextTable::with_capacity(capacities.max_contexts)),
            capacity: capacities.max_modules,
        }
    }

    /// Creates a registry holding every module registered with
    /// [`register_module!`](crate::register_module) in the linked crates.
    ///
    /// Modules that do not fit are reported with `log::error!` and skipped.
    pub fn from_inventory(capacities: Capacities) -> Self {
        let registry = Self::new(capacities);
        for registration in inventory::iter::<ModuleRegistration> {
            if let Err(err) = registry.register(registration.construct()) {
                log::error!("{err}");
            }
        }
        log::info!("ModuleRegistry: {} module(s) registered.", registry.len());
        registry
    }

    /// Appends a module to the catalog.
    ///
    /// # Errors
    /// Returns [`RegistrationError::CapacityExceeded`] if the catalog is full.
    pub fn register(&self, module: ModuleHandle) -> Result<(), RegistrationError> {
        let id = module.borrow().id();
        let mut modules = self.modules.borrow_mut();
        if modules.len() >= self.capacity {
            return Err(RegistrationError::CapacityExceeded {
                id: id.to_string(),
                capacity: self.capacity,
            });
        }
        log::debug!("ModuleRegistry: registered '{id}'.");
        modules.push(module);
        Ok(())
    }

    /// Returns the first module whose id is exactly `id`.
    pub fn find_by_id(&self, id: &str) -> Option<ModuleHandle> {
        self.modules
            .borrow()
            .iter()
            .find(|m| m.try_borrow().is_ok_and(|m| m.id() == id))
            .cloned()
    }

    /// Tries each id in the given priority order and returns the first
    /// present module whose probe succeeds.
    pub fn probe(&self, app: &App, ids: &[&str]) -> Option<ModuleHandle> {
        ids.iter().find_map(|id| {
            let Some(module) = self.find_by_id(id) else {
                log::debug!("ModuleRegistry: '{id}' is not registered.");
                return None;
            };
            Self::run_probe(&module, app).then_some(module)
        })
    }

    /// Succeeds only if exactly one module is registered and its probe succeeds.
    pub fn probe_single(&self, app: &App) -> Option<ModuleHandle> {
        let module = {
            let modules = self.modules.borrow();
            if modules.len() != 1 {
                return None;
            }
            Rc::clone(&modules[0])
        };
        Self::run_probe(&module, app).then_some(module)
    }

    fn run_probe(module: &ModuleHandle, app: &App) -> bool {
        let Ok(mut module) = module.try_borrow_mut() else {
            log::warn!("ModuleRegistry: module is busy, probe skipped.");
            return false;
        };
        let ok = module.probe(app);
        if ok {
            log::info!("ModuleRegistry: '{}' probed successfully.", module.id());
        } else {
            log::warn!("ModuleRegistry: '{}' probe failed.", module.id());
        }
        ok
    }

    /// Idempotent lookup-or-insert of the untyped context slot `key`.
    ///
    /// # Errors
    /// Returns [`ContextError::CapacityExceeded`] if `key` is new and the
    /// context table is full.
    pub fn context(&self, key: &str) -> Result<RefMut<'_, ContextCell>, ContextError> {
        let mut table = self.contexts.borrow_mut();
        let index = table.slot_index(key)?;
        Ok(RefMut::map(table, |t| t.cell_mut(index)))
    }

    /// Typed access to the context slot tagged by `K`.
    ///
    /// # Errors
    /// See [`context`](Self::context).
    pub fn context_slot<K: ContextKey>(&self) -> Result<TypedSlot<'_, K>, ContextError> {
        self.context(K::KEY).map(TypedSlot::new)
    }

    /// Returns the ids of all registered modules, in registration order.
    /// A module busy in a call of its own is skipped.
    pub fn ids(&self) -> Vec<&'static str> {
        self.modules
            .borrow()
            .iter()
            .filter_map(|m| m.try_borrow().ok().map(|m| m.id()))
            .collect()
    }

    /// Returns a snapshot of all registered modules.
    pub fn modules(&self) -> Vec<ModuleHandle> {
        self.modules.borrow().clone()
    }

    /// Returns the number of registered modules.
    pub fn len(&self) -> usize {
        self.modules.borrow().len()
    }

    /// Returns `true` if no module is registered.
    pub fn is_empty(&self) -> bool {
        self.modules.borrow().is_empty()
    }
}

impl Default for ModuleRegistry {
    fn default() -> Self {
        Self::new(Capacities::default())
    }
}
