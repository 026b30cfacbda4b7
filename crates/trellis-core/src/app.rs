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

//! The application object: module registry, the set of active
//! multiplexers, and the per-tick event routing step.

use crate::config::Capacities;
use crate::error::MultiplexerError;
use crate::module::{ModuleHandle, ModuleRegistry};
use std::cell::{Cell, RefCell};
use std::rc::{Rc, Weak};

/// Identifies an entry of the dispatch list.
pub type DispatcherId = u64;

/// Something that drains native events once per application tick.
///
/// Implemented by every [`Multiplexer`](crate::multiplexer::Multiplexer), and
/// by modules that need a tick without owning a native resource.
pub trait EventDispatcher {
    /// Name used when reporting dispatch failures.
    fn name(&self) -> &'static str;

    /// Drains every pending native event without blocking and returns the
    /// number of callback invocations performed.
    fn dispatch(&self) -> Result<usize, MultiplexerError>;
}

struct AppInner {
    registry: ModuleRegistry,
    dispatchers: RefCell<Vec<(DispatcherId, Weak<dyn EventDispatcher>)>>,
    next_dispatcher: Cell<DispatcherId>,
    running: Cell<bool>,
}

/// A cheap, clonable handle to the application state.
///
/// Single-threaded by construction (`!Send`): every acquire, release and
/// dispatch happens on the application's main tick.
#[derive(Clone)]
pub struct App {
    inner: Rc<AppInner>,
}

/// A non-owning reference to an [`App`].
#[derive(Clone, Default)]
pub struct WeakApp {
    inner: Weak<AppInner>,
}

impl WeakApp {
    /// Returns the application if it is still alive.
    pub fn upgrade(&self) -> Option<App> {
        self.inner.upgrade().map(|inner| App { inner })
    }
}

impl App {
    /// Creates an application with an empty registry of the given capacities.
    pub fn new(capacities: Capacities) -> Self {
        Self::with_registry(ModuleRegistry::new(capacities))
    }

    /// Creates an application around an existing registry.
    pub fn with_registry(registry: ModuleRegistry) -> Self {
        Self {
            inner: Rc::new(AppInner {
                registry,
                dispatchers: RefCell::new(Vec::new()),
                next_dispatcher: Cell::new(1),
                running: Cell::new(true),
            }),
        }
    }

    /// Returns the module registry.
    pub fn registry(&self) -> &ModuleRegistry {
        &self.inner.registry
    }

    /// Returns a weak handle, used by long-lived objects that must not keep
    /// the application alive.
    pub fn downgrade(&self) -> WeakApp {
        WeakApp {
            inner: Rc::downgrade(&self.inner),
        }
    }

    /// Probes `ids` in order and returns the first module whose probe succeeds.
    pub fn probe(&self, ids: &[&str]) -> Option<ModuleHandle> {
        self.registry().probe(self, ids)
    }

    /// Returns the only registered module if its probe succeeds.
    pub fn probe_single(&self) -> Option<ModuleHandle> {
        self.registry().probe_single(self)
    }

    /// Appends `dispatcher` to the per-tick list. The list only holds a weak
    /// reference; a dropped dispatcher is skipped.
    pub fn add_dispatcher(&self, dispatcher: Weak<dyn EventDispatcher>) -> DispatcherId {
        let id = self.inner.next_dispatcher.get();
        self.inner.next_dispatcher.set(id + 1);
        self.inner.dispatchers.borrow_mut().push((id, dispatcher));
        id
    }

    /// Removes the entry returned by [`add_dispatcher`](Self::add_dispatcher).
    /// Unknown ids are ignored.
    pub fn remove_dispatcher(&self, id: DispatcherId) {
        self.inner
            .dispatchers
            .borrow_mut()
            .retain(|(entry, _)| *entry != id);
    }

    /// Returns the number of multiplexers currently registered for dispatch.
    pub fn active_dispatchers(&self) -> usize {
        self.inner.dispatchers.borrow().len()
    }

    /// Runs one dispatch tick over every active multiplexer, in creation order.
    ///
    /// A multiplexer destroyed during the tick is skipped; one created during
    /// the tick is first dispatched on the next tick. A failing multiplexer
    /// does not prevent the others from being dispatched.
    ///
    /// # Errors
    /// Returns the first error encountered, after the whole pass.
    pub fn dispatch_events(&self) -> Result<usize, MultiplexerError> {
        let snapshot: Vec<Rc<dyn EventDispatcher>> = self
            .inner
            .dispatchers
            .borrow()
            .iter()
            .filter_map(|(_, d)| d.upgrade())
            .collect();

        let mut delivered = 0;
        let mut first_error = None;
        for dispatcher in snapshot {
            match dispatcher.dispatch() {
                Ok(count) => delivered += count,
                Err(err) => {
                    log::error!("Dispatch of '{}' failed: {err}", dispatcher.name());
                    first_error.get_or_insert(err);
                }
            }
        }
        match first_error {
            Some(err) => Err(err),
            None => Ok(delivered),
        }
    }

    /// Returns `false` once [`quit`](Self::quit) was called.
    pub fn is_running(&self) -> bool {
        self.inner.running.get()
    }

    /// Asks the main loop to stop after the current tick.
    pub fn quit(&self) {
        if self.inner.running.replace(false) {
            log::info!("Quit requested.");
        }
    }
}

impl Default for App {
    fn default() -> Self {
        Self::new(Capacities::default())
    }
}
