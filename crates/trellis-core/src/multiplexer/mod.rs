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

//! Shares one native platform connection, and one window, between several
//! independent subscribers.
//!
//! # Lifecycle
//!
//! 1. The first [`Multiplexer::acquire`] for a backend creates the in-process
//!    object, publishes it in the backend's context slot and registers it with
//!    the [`App`]'s dispatch list. No native resource exists yet.
//! 2. The first dispatch (or the first window creation by the owner) opens
//!    the native connection.
//! 3. Dropping the last [`Subscription`] tears the native side down once,
//!    unregisters the multiplexer and clears the context slot.
//!
//! Subscribers collectively own the multiplexer: the context slot and the
//! dispatch list only hold weak references.

mod backend;
mod slots;

#[cfg(test)]
mod tests;

pub use backend::{
    Backend, EventMask, DEFAULT_WINDOW_HEIGHT, DEFAULT_WINDOW_TITLE, DEFAULT_WINDOW_WIDTH,
};
pub use slots::{EventFilter, EventHandler, SubscriptionRequest};

use crate::app::{App, DispatcherId, EventDispatcher, WeakApp};
use crate::context::ContextKey;
use crate::error::MultiplexerError;
use slots::{SlotKey, SlotTable};
use std::cell::RefCell;
use std::fmt;
use std::marker::PhantomData;
use std::rc::{Rc, Weak};

/// Context-slot tag under which the multiplexer of backend `B` is published.
pub struct MultiplexerKey<B>(PhantomData<B>);

impl<B: Backend> ContextKey for MultiplexerKey<B> {
    const KEY: &'static str = B::CONTEXT_KEY;
    type Value = Weak<Multiplexer<B>>;
}

/// The observable lifecycle state of a multiplexer.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MultiplexerState {
    /// The object exists but the native connection is not open yet.
    Uninitialized,
    /// The native connection is open.
    Active,
    /// The native side was released; the object is about to be dropped.
    Destroyed,
}

struct Shared<B: Backend> {
    backend: B,
    slots: SlotTable<B::EventType>,
    window_owner: Option<SlotKey>,
    mask: EventMask,
    mask_dirty: bool,
    current: Option<Rc<B::Event>>,
    destroyed: bool,
    dispatcher_id: DispatcherId,
}

impl<B: Backend> Shared<B> {
    fn state(&self) -> MultiplexerState {
        if self.destroyed {
            MultiplexerState::Destroyed
        } else if self.backend.is_connected() {
            MultiplexerState::Active
        } else {
            MultiplexerState::Uninitialized
        }
    }

    fn refresh_mask(&mut self) {
        let aggregate = self.slots.aggregate_mask();
        if aggregate != self.mask {
            self.mask = aggregate;
            self.mask_dirty = true;
        }
    }

    fn ensure_connected(&mut self) -> Result<(), MultiplexerError> {
        if !self.backend.is_connected() {
            self.backend.connect()?;
            log::info!("'{}' native connection opened.", B::CONTEXT_KEY);
        }
        Ok(())
    }

    /// Everything that must happen before events are drained.
    fn prepare(&mut self) -> Result<(), MultiplexerError> {
        self.ensure_connected()?;
        if self.window_owner.is_none() && !self.backend.has_window() {
            log::info!(
                "'{}' has no window owner, creating the default window.",
                B::CONTEXT_KEY
            );
            self.backend.create_default_window()?;
        }
        if self.mask_dirty {
            log::debug!(
                "'{}' selecting input mask {:#x}.",
                B::CONTEXT_KEY,
                self.mask
            );
            self.backend.select_input(self.mask);
            self.mask_dirty = false;
        }
        self.backend.pump();
        Ok(())
    }
}

/// One shared native connection and its subscriber table.
///
/// Never constructed directly: use [`Multiplexer::acquire`].
pub struct Multiplexer<B: Backend> {
    shared: RefCell<Shared<B>>,
}

impl<B: Backend> Multiplexer<B> {
    /// Joins the fan-out list of backend `B`, creating the multiplexer if it
    /// does not exist yet.
    ///
    /// If the request asks for window ownership and nobody owns the window
    /// yet, the new subscriber becomes the owner and the multiplexer will not
    /// create its default window. Later ownership requests are ignored.
    ///
    /// # Errors
    /// - [`MultiplexerError::ResourceExhausted`] if every subscriber slot is taken.
    /// - [`MultiplexerError::Context`] if the backend's context slot cannot be
    ///   created or holds a foreign value.
    pub fn acquire(
        app: &App,
        request: SubscriptionRequest<B::EventType>,
    ) -> Result<Subscription<B>, MultiplexerError> {
        let mux = Self::get_or_create(app)?;
        match mux.subscribe(request) {
            Ok(key) => Ok(Subscription {
                mux,
                key,
                app: app.downgrade(),
            }),
            Err(err) => {
                // A multiplexer must not outlive its last subscriber, even
                // one that never got in.
                if mux.shared.borrow().slots.live() == 0 {
                    mux.destroy(&app.downgrade());
                }
                Err(err)
            }
        }
    }

    /// Returns `true` if a multiplexer for `B` currently exists in `app`.
    pub fn exists(app: &App) -> bool {
        let Ok(slot) = app.registry().context_slot::<MultiplexerKey<B>>() else {
            return false;
        };
        let alive = matches!(slot.get(), Ok(Some(weak)) if weak.strong_count() > 0);
        alive
    }

    fn get_or_create(app: &App) -> Result<Rc<Self>, MultiplexerError> {
        let mut slot = app.registry().context_slot::<MultiplexerKey<B>>()?;
        if let Some(existing) = slot.get()?.and_then(Weak::upgrade) {
            return Ok(existing);
        }

        let mux = Rc::new(Self {
            shared: RefCell::new(Shared {
                backend: B::create(),
                slots: SlotTable::with_capacity(B::MAX_SUBSCRIBERS),
                window_owner: None,
                mask: 0,
                mask_dirty: false,
                current: None,
                destroyed: false,
                dispatcher_id: 0,
            }),
        });
        slot.set(Rc::downgrade(&mux));
        drop(slot);

        let dispatcher = Rc::downgrade(&mux);
        let dispatcher: Weak<dyn EventDispatcher> = dispatcher;
        let id = app.add_dispatcher(dispatcher);
        mux.shared.borrow_mut().dispatcher_id = id;
        log::info!("'{}' multiplexer created.", B::CONTEXT_KEY);
        Ok(mux)
    }

    fn subscribe(&self, request: SubscriptionRequest<B::EventType>) -> Result<SlotKey, MultiplexerError> {
        let mut shared = self.shared.borrow_mut();
        let wants_owner = request.window_owner;
        let grant_owner = wants_owner && shared.window_owner.is_none();
        let capacity = shared.slots.capacity();

        let key = shared.slots.occupy(request, grant_owner).ok_or_else(|| {
            log::warn!("'{}' has no free subscriber slot.", B::CONTEXT_KEY);
            MultiplexerError::ResourceExhausted {
                backend: B::CONTEXT_KEY,
                capacity,
            }
        })?;

        if grant_owner {
            shared.window_owner = Some(key);
        } else if wants_owner {
            log::warn!(
                "'{}' window ownership already claimed, request of slot {} ignored.",
                B::CONTEXT_KEY,
                key.0
            );
        }
        shared.refresh_mask();
        log::debug!(
            "'{}' subscriber acquired slot {} ({} live).",
            B::CONTEXT_KEY,
            key.0,
            shared.slots.live()
        );
        Ok(key)
    }

    fn release(&self, key: SlotKey, app: &WeakApp) {
        let last = {
            let mut shared = self.shared.borrow_mut();
            let Some(was_owner) = shared.slots.vacate(key) else {
                log::warn!("'{}' ignored release of a stale slot.", B::CONTEXT_KEY);
                return;
            };
            if was_owner {
                shared.window_owner = None;
            }
            shared.refresh_mask();
            log::debug!(
                "'{}' subscriber released slot {} ({} live).",
                B::CONTEXT_KEY,
                key.0,
                shared.slots.live()
            );
            shared.slots.live() == 0
        };
        if last {
            self.destroy(app);
        }
    }

    /// Tears the native side down and unpublishes the multiplexer.
    /// Every step is attempted even if an earlier one failed.
    fn destroy(&self, app: &WeakApp) {
        let dispatcher_id = {
            let mut shared = self.shared.borrow_mut();
            if shared.destroyed {
                return;
            }
            shared.destroyed = true;
            shared.current = None;
            if let Err(err) = shared.backend.teardown() {
                log::error!("{err}");
            }
            shared.dispatcher_id
        };

        if let Some(app) = app.upgrade() {
            app.remove_dispatcher(dispatcher_id);
            match app.registry().context_slot::<MultiplexerKey<B>>() {
                Ok(mut slot) => {
                    let ours = matches!(slot.get(), Ok(Some(w)) if std::ptr::eq(w.as_ptr(), self));
                    if ours {
                        slot.clear();
                    }
                }
                Err(err) => log::error!("'{}' could not clear its context slot: {err}", B::CONTEXT_KEY),
            }
        }
        log::info!("'{}' multiplexer destroyed.", B::CONTEXT_KEY);
    }
}

impl<B: Backend> EventDispatcher for Multiplexer<B> {
    fn name(&self) -> &'static str {
        B::CONTEXT_KEY
    }

    fn dispatch(&self) -> Result<usize, MultiplexerError> {
        {
            let mut shared = self.shared.borrow_mut();
            if shared.destroyed {
                return Ok(0);
            }
            shared.prepare()?;
        }

        let mut delivered = 0;
        loop {
            // No borrow of the shared state survives into the callbacks, so
            // a subscriber may query the event, acquire or release.
            let targets = {
                let mut shared = self.shared.borrow_mut();
                if shared.destroyed {
                    break;
                }
                let Some(event) = shared.backend.poll_event() else {
                    break;
                };
                let ty = B::event_type(&event);
                shared.current = Some(Rc::new(event));
                let targets = shared.slots.matching(&ty);
                log::trace!(
                    "'{}' routing {ty:?} to {} subscriber(s).",
                    B::CONTEXT_KEY,
                    targets.len()
                );
                targets
            };

            for key in targets {
                // Re-checked per target: an earlier callback may have
                // released this slot.
                let handler = self.shared.borrow().slots.handler(key);
                if let Some(handler) = handler {
                    handler.on_event();
                    delivered += 1;
                }
            }
        }
        Ok(delivered)
    }
}

/// A subscriber's membership in a [`Multiplexer`].
///
/// Not `Clone`. Dropping it (or calling [`release`](Subscription::release))
/// leaves the fan-out list; dropping the last one tears the backend down.
pub struct Subscription<B: Backend> {
    mux: Rc<Multiplexer<B>>,
    key: SlotKey,
    app: WeakApp,
}

impl<B: Backend> Subscription<B> {
    /// Returns the event being dispatched (or the last one dispatched).
    ///
    /// The event is shared between all subscribers, never copied.
    pub fn current_event(&self) -> Option<Rc<B::Event>> {
        self.mux.shared.borrow().current.clone()
    }

    /// Returns `true` if this subscriber owns window creation.
    pub fn is_window_owner(&self) -> bool {
        self.mux.shared.borrow().slots.is_owner(self.key)
    }

    /// Opens the native connection now instead of on the first dispatch.
    /// Probes use it to find out whether the backend works on this machine.
    ///
    /// # Errors
    /// The backend's connection failure.
    pub fn ensure_connected(&self) -> Result<(), MultiplexerError> {
        self.mux.shared.borrow_mut().ensure_connected()
    }

    /// Creates the shared window, opening the native connection first if
    /// needed.
    ///
    /// # Errors
    /// [`MultiplexerError::NotWindowOwner`] if this subscriber does not own
    /// the window, or the backend's failure.
    pub fn create_window(&self, width: u32, height: u32, title: &str) -> Result<(), MultiplexerError> {
        let mut shared = self.mux.shared.borrow_mut();
        if !shared.slots.is_owner(self.key) {
            return Err(MultiplexerError::NotWindowOwner {
                backend: B::CONTEXT_KEY,
            });
        }
        shared.ensure_connected()?;
        shared.backend.create_window(width, height, title)?;
        log::info!(
            "'{}' window {width}x{height} '{title}' created by its owner.",
            B::CONTEXT_KEY
        );
        Ok(())
    }

    /// Runs `f` with read-only access to the backend, for queries such as
    /// the display or window handle.
    pub fn with_backend<R>(&self, f: impl FnOnce(&B) -> R) -> R {
        f(&self.mux.shared.borrow().backend)
    }

    /// Returns the multiplexer's lifecycle state.
    pub fn state(&self) -> MultiplexerState {
        self.mux.shared.borrow().state()
    }

    /// Returns the number of live subscribers, this one included.
    pub fn subscriber_count(&self) -> usize {
        self.mux.shared.borrow().slots.live()
    }

    /// Returns the aggregate interest mask of all live subscribers.
    pub fn aggregate_mask(&self) -> EventMask {
        self.mux.shared.borrow().mask
    }

    /// Leaves the fan-out list. Equivalent to dropping the subscription.
    pub fn release(self) {}
}

impl<B: Backend> Drop for Subscription<B> {
    fn drop(&mut self) {
        self.mux.release(self.key, &self.app);
    }
}

impl<B: Backend> fmt::Debug for Subscription<B> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Subscription")
            .field("backend", &B::CONTEXT_KEY)
            .field("slot", &self.key.0)
            .finish()
    }
}
