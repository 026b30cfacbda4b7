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

//! The subscriber side of a multiplexer: filters, requests and the slot table.

use super::backend::EventMask;
use std::rc::{Rc, Weak};

/// Receives a notification for every event matching its subscription filter.
///
/// The event itself is not passed along: several subscribers may look at the
/// same event, so each one fetches it with
/// [`Subscription::current_event`](super::Subscription::current_event).
pub trait EventHandler {
    /// Called once per matching event.
    fn on_event(&self);
}

/// Which event types a subscriber wants to be notified about.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EventFilter<T> {
    /// No notification at all. Used by subscribers that only want the shared
    /// connection or the window, like a video module.
    Nothing,
    /// Every native event.
    All,
    /// Only the listed types.
    Only(Vec<T>),
}

impl<T: PartialEq> EventFilter<T> {
    /// Builds a filter accepting exactly `types`.
    pub fn only(types: impl IntoIterator<Item = T>) -> Self {
        Self::Only(types.into_iter().collect())
    }

    /// Returns `true` if an event tagged `ty` passes the filter.
    pub fn matches(&self, ty: &T) -> bool {
        match self {
            Self::Nothing => false,
            Self::All => true,
            Self::Only(types) => types.contains(ty),
        }
    }
}

impl<T> Default for EventFilter<T> {
    fn default() -> Self {
        Self::Nothing
    }
}

/// Describes what a subscriber wants from a multiplexer.
///
/// # Example
///
/// ```rust
/// use trellis_core::multiplexer::{EventFilter, SubscriptionRequest};
///
/// let request = SubscriptionRequest::new(EventFilter::only([1u8, 2]))
///     .with_mask(0b11)
///     .window_owner();
/// assert!(request.wants_window_owner());
/// ```
pub struct SubscriptionRequest<T> {
    pub(crate) filter: EventFilter<T>,
    pub(crate) mask: EventMask,
    pub(crate) handler: Option<Weak<dyn EventHandler>>,
    pub(crate) window_owner: bool,
}

impl<T> SubscriptionRequest<T> {
    /// Creates a request with the given filter, no mask, no handler.
    pub fn new(filter: EventFilter<T>) -> Self {
        Self {
            filter,
            mask: 0,
            handler: None,
            window_owner: false,
        }
    }

    /// Sets the interest mask merged into the backend's aggregate.
    pub fn with_mask(mut self, mask: EventMask) -> Self {
        self.mask = mask;
        self
    }

    /// Sets the callback. The multiplexer only keeps the weak reference, it
    /// never extends the subscriber's lifetime.
    pub fn with_handler(mut self, handler: Weak<dyn EventHandler>) -> Self {
        self.handler = Some(handler);
        self
    }

    /// Asks to become the subscriber responsible for creating the window.
    /// Ignored if another subscriber already owns it.
    pub fn window_owner(mut self) -> Self {
        self.window_owner = true;
        self
    }

    /// Returns `true` if the request asks for window ownership.
    pub fn wants_window_owner(&self) -> bool {
        self.window_owner
    }
}

impl<T> Default for SubscriptionRequest<T> {
    fn default() -> Self {
        Self::new(EventFilter::Nothing)
    }
}

struct SubscriberSlot<T> {
    valid: bool,
    generation: u64,
    filter: EventFilter<T>,
    mask: EventMask,
    handler: Option<Weak<dyn EventHandler>>,
    window_owner: bool,
}

impl<T> SubscriberSlot<T> {
    fn vacant() -> Self {
        Self {
            valid: false,
            generation: 0,
            filter: EventFilter::Nothing,
            mask: 0,
            handler: None,
            window_owner: false,
        }
    }
}

/// A `(slot index, generation)` pair. The generation changes every time the
/// slot is vacated, so a stale pair never matches a newer occupant.
pub(crate) type SlotKey = (usize, u64);

/// Fixed-size table of subscriber slots. Never force-reuses a valid slot.
pub(crate) struct SlotTable<T> {
    slots: Vec<SubscriberSlot<T>>,
    live: usize,
}

impl<T: PartialEq> SlotTable<T> {
    pub(crate) fn with_capacity(capacity: usize) -> Self {
        Self {
            slots: (0..capacity).map(|_| SubscriberSlot::vacant()).collect(),
            live: 0,
        }
    }

    pub(crate) fn capacity(&self) -> usize {
        self.slots.len()
    }

    pub(crate) fn live(&self) -> usize {
        self.live
    }

    /// Fills the first free slot. `owner` is the final ownership decision,
    /// already arbitrated by the caller.
    pub(crate) fn occupy(
        &mut self,
        request: SubscriptionRequest<T>,
        owner: bool,
    ) -> Option<SlotKey> {
        let index = self.slots.iter().position(|s| !s.valid)?;
        let slot = &mut self.slots[index];
        slot.valid = true;
        slot.filter = request.filter;
        slot.mask = request.mask;
        slot.handler = request.handler;
        slot.window_owner = owner;
        self.live += 1;
        Some((index, slot.generation))
    }

    /// Invalidates the slot. Returns whether it was the window owner, or
    /// `None` if the key is stale.
    pub(crate) fn vacate(&mut self, (index, generation): SlotKey) -> Option<bool> {
        let slot = self.slots.get_mut(index)?;
        if !slot.valid || slot.generation != generation {
            return None;
        }
        let was_owner = slot.window_owner;
        slot.valid = false;
        slot.generation = slot.generation.wrapping_add(1);
        slot.filter = EventFilter::Nothing;
        slot.mask = 0;
        slot.handler = None;
        slot.window_owner = false;
        self.live -= 1;
        Some(was_owner)
    }

    pub(crate) fn is_live(&self, (index, generation): SlotKey) -> bool {
        self.slots
            .get(index)
            .is_some_and(|s| s.valid && s.generation == generation)
    }

    pub(crate) fn is_owner(&self, key: SlotKey) -> bool {
        self.is_live(key) && self.slots[key.0].window_owner
    }

    /// Snapshot of the live slots whose filter accepts `ty`, in slot order.
    pub(crate) fn matching(&self, ty: &T) -> Vec<SlotKey> {
        self.slots
            .iter()
            .enumerate()
            .filter(|(_, s)| s.valid && s.filter.matches(ty))
            .map(|(i, s)| (i, s.generation))
            .collect()
    }

    /// The callback of a still-live slot, if the subscriber is still alive.
    pub(crate) fn handler(&self, key: SlotKey) -> Option<Rc<dyn EventHandler>> {
        if !self.is_live(key) {
            return None;
        }
        self.slots[key.0].handler.as_ref().and_then(Weak::upgrade)
    }

    pub(crate) fn aggregate_mask(&self) -> EventMask {
        self.slots
            .iter()
            .filter(|s| s.valid)
            .fold(0, |acc, s| acc | s.mask)
    }
}
