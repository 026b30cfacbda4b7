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

//! Named singleton cells shared between otherwise unrelated modules.
//!
//! A context slot is looked up by a string key. The first lookup of a key
//! inserts an empty cell; later lookups return the same cell. Any module may
//! read or overwrite it, which is how, for example, every module talking to
//! the same backend finds the one multiplexer instance for that backend.
//!
//! Untyped access goes through [`ContextCell`]. Typed access goes through a
//! [`ContextKey`] tag, which binds a key string to the value type stored
//! under it, so a read never performs an unchecked cast.

use crate::error::ContextError;
use std::any::{type_name, Any};
use std::cell::RefMut;
use std::marker::PhantomData;

/// A compile-time tag naming a context slot and the type stored in it.
///
/// # Example
///
/// ```rust
/// use trellis_core::context::{ContextKey, ContextTable};
///
/// struct FrameCounter;
/// impl ContextKey for FrameCounter {
///     const KEY: &'static str = "frame_counter";
///     type Value = u64;
/// }
///
/// let mut table = ContextTable::with_capacity(4);
/// let cell = table.get_or_create(FrameCounter::KEY).unwrap();
/// cell.set(7u64);
/// assert_eq!(cell.get::<u64>(), Some(&7));
/// ```
pub trait ContextKey: 'static {
    /// The string key shared by every module using this slot.
    const KEY: &'static str;
    /// The type of the value published in the slot.
    type Value: 'static;
}

/// One named cell of the context table. Starts empty.
pub struct ContextCell {
    key: String,
    value: Option<Box<dyn Any>>,
}

impl ContextCell {
    fn new(key: &str) -> Self {
        Self {
            key: key.to_string(),
            value: None,
        }
    }

    /// Returns the key of this cell.
    pub fn key(&self) -> &str {
        &self.key
    }

    /// Returns `true` if nothing is published in this cell.
    pub fn is_empty(&self) -> bool {
        self.value.is_none()
    }

    /// Returns the published value if the cell holds a `T`.
    pub fn get<T: 'static>(&self) -> Option<&T> {
        self.value.as_ref().and_then(|v| v.downcast_ref::<T>())
    }

    /// Publishes `value`, returning whatever was stored before.
    pub fn set<T: 'static>(&mut self, value: T) -> Option<Box<dyn Any>> {
        self.value.replace(Box::new(value))
    }

    /// Empties the cell, returning the previous content.
    pub fn clear(&mut self) -> Option<Box<dyn Any>> {
        self.value.take()
    }
}

impl std::fmt::Debug for ContextCell {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ContextCell")
            .field("key", &self.key)
            .field("occupied", &self.value.is_some())
            .finish()
    }
}

/// A fixed-capacity table of [`ContextCell`]s.
#[derive(Debug)]
pub struct ContextTable {
    cells: Vec<ContextCell>,
    capacity: usize,
}

impl ContextTable {
    /// Creates an empty table able to hold `capacity` distinct keys.
    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            cells: Vec::with_capacity(capacity),
            capacity,
        }
    }

    /// Returns the index of the cell for `key`, inserting an empty one on a miss.
    ///
    /// # Errors
    /// Returns [`ContextError::CapacityExceeded`] if `key` is new and the
    /// table is full.
    pub fn slot_index(&mut self, key: &str) -> Result<usize, ContextError> {
        if let Some(index) = self.cells.iter().position(|c| c.key == key) {
            return Ok(index);
        }
        if self.cells.len() >= self.capacity {
            log::warn!("Context table full, cannot create slot '{key}'.");
            return Err(ContextError::CapacityExceeded {
                key: key.to_string(),
                capacity: self.capacity,
            });
        }
        log::debug!("Created context slot '{key}'.");
        self.cells.push(ContextCell::new(key));
        Ok(self.cells.len() - 1)
    }

    /// Idempotent lookup-or-insert of the cell for `key`.
    ///
    /// # Errors
    /// See [`slot_index`](Self::slot_index).
    pub fn get_or_create(&mut self, key: &str) -> Result<&mut ContextCell, ContextError> {
        let index = self.slot_index(key)?;
        Ok(&mut self.cells[index])
    }

    /// Returns a mutable reference to the cell at `index`.
    pub(crate) fn cell_mut(&mut self, index: usize) -> &mut ContextCell {
        &mut self.cells[index]
    }

    /// Returns the number of slots created so far.
    pub fn len(&self) -> usize {
        self.cells.len()
    }

    /// Returns `true` if no slot was ever created.
    pub fn is_empty(&self) -> bool {
        self.cells.is_empty()
    }

    /// Returns the maximum number of slots.
    pub fn capacity(&self) -> usize {
        self.capacity
    }
}

/// Typed, borrowed access to the context slot named by `K`.
///
/// Obtained from [`ModuleRegistry::context_slot`](crate::module::ModuleRegistry::context_slot).
/// The borrow of the context table lasts as long as this value, so keep it
/// short-lived.
pub struct TypedSlot<'a, K: ContextKey> {
    cell: RefMut<'a, ContextCell>,
    _key: PhantomData<K>,
}

impl<'a, K: ContextKey> TypedSlot<'a, K> {
    pub(crate) fn new(cell: RefMut<'a, ContextCell>) -> Self {
        Self {
            cell,
            _key: PhantomData,
        }
    }

    /// Returns the published value, if any.
    ///
    /// # Errors
    /// Returns [`ContextError::TypeMismatch`] if another module published a
    /// value of a different type under the same key.
    pub fn get(&self) -> Result<Option<&K::Value>, ContextError> {
        if self.cell.is_empty() {
            return Ok(None);
        }
        self.cell
            .get::<K::Value>()
            .map(Some)
            .ok_or_else(Self::mismatch)
    }

    /// Publishes `value`, replacing whatever was stored.
    pub fn set(&mut self, value: K::Value) {
        self.cell.set(value);
    }

    /// Empties the slot.
    pub fn clear(&mut self) {
        self.cell.clear();
    }

    /// Returns `true` if nothing is published.
    pub fn is_empty(&self) -> bool {
        self.cell.is_empty()
    }

    fn mismatch() -> ContextError {
        ContextError::TypeMismatch {
            key: K::KEY,
            expected: type_name::<K::Value>(),
        }
    }
}
