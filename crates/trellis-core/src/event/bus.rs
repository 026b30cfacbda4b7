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

/// An unbounded multi-producer channel owned by its single consumer.
///
/// Producers get a [`flume::Sender`] through [`sender`](EventBus::sender);
/// the owner drains pending events without blocking once per tick.
#[derive(Debug)]
pub struct EventBus<T: Send + 'static> {
    sender: flume::Sender<T>,
    receiver: flume::Receiver<T>,
}

impl<T: Send + 'static> EventBus<T> {
    /// Creates a bus over a fresh unbounded channel.
    pub fn new() -> Self {
        let (sender, receiver) = flume::unbounded();
        log::debug!("EventBus initialized.");
        Self { sender, receiver }
    }

    /// Sends an event, logging an error if the bus is disconnected.
    pub fn publish(&self, event: T) {
        if let Err(e) = self.sender.send(event) {
            log::error!("Failed to publish event: {e}.");
        }
    }

    /// Returns a new producer handle.
    pub fn sender(&self) -> flume::Sender<T> {
        self.sender.clone()
    }

    /// Takes every event published so far, in publication order.
    pub fn drain(&self) -> Vec<T> {
        self.receiver.try_iter().collect()
    }

    /// Returns the number of pending events.
    pub fn len(&self) -> usize {
        self.receiver.len()
    }

    /// Returns `true` if no event is pending.
    pub fn is_empty(&self) -> bool {
        self.receiver.is_empty()
    }
}

impl<T: Send + 'static> Default for EventBus<T> {
    fn default() -> Self {
        Self::new()
    }
}
