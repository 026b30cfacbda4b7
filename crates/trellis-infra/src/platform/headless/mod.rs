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

//! A display-less backend fed through an in-process channel.
//!
//! Anything holding a [`feed`] sender can inject [`PlatformEvent`]s; the
//! backend hands them out on the next dispatch, keeping only the kinds
//! some subscriber selected. Used on machines without a desktop session and
//! to drive the whole module stack from tests.

use crate::platform::{PlatformBackend, PlatformEvent};
use trellis_core::error::BackendError;
use trellis_core::input::InputEvent;
use trellis_core::multiplexer::{Backend, EventMask};

thread_local! {
    static FEED: (flume::Sender<PlatformEvent>, flume::Receiver<PlatformEvent>) = flume::unbounded();
}

/// Returns a sender injecting events into this thread's headless backend.
pub fn feed() -> flume::Sender<PlatformEvent> {
    FEED.with(|(sender, _)| sender.clone())
}

/// Event types of the headless backend.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum HeadlessEventKind {
    /// Key press or release.
    Key,
    /// Pointer motion, button or wheel.
    Mouse,
    /// Window resize.
    Resized,
    /// Close request.
    CloseRequested,
}

impl HeadlessEventKind {
    /// Returns the kind of `event`.
    pub fn of(event: &PlatformEvent) -> Self {
        match event {
            PlatformEvent::Input(InputEvent::KeyPressed { .. })
            | PlatformEvent::Input(InputEvent::KeyReleased { .. }) => Self::Key,
            PlatformEvent::Input(_) => Self::Mouse,
            PlatformEvent::Resized { .. } => Self::Resized,
            PlatformEvent::CloseRequested => Self::CloseRequested,
        }
    }

    /// The interest bit of this kind.
    pub const fn mask(self) -> EventMask {
        1 << self as u32
    }
}

/// A window that only exists as a record.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HeadlessWindow {
    /// Width.
    pub width: u32,
    /// Height.
    pub height: u32,
    /// Title.
    pub title: String,
}

/// The headless [`Backend`].
#[derive(Debug, Default)]
pub struct HeadlessBackend {
    receiver: Option<flume::Receiver<PlatformEvent>>,
    window: Option<HeadlessWindow>,
    selected: EventMask,
    grabbed: std::cell::Cell<bool>,
}

impl HeadlessBackend {
    /// The window, once created.
    pub fn window(&self) -> Option<&HeadlessWindow> {
        self.window.as_ref()
    }

    /// The interest mask last selected by the multiplexer.
    pub fn selected_mask(&self) -> EventMask {
        self.selected
    }

    /// Whether the pointer is grabbed.
    pub fn is_grabbed(&self) -> bool {
        self.grabbed.get()
    }
}

impl Backend for HeadlessBackend {
    const CONTEXT_KEY: &'static str = "headless";

    type Event = PlatformEvent;
    type EventType = HeadlessEventKind;

    fn create() -> Self {
        Self::default()
    }

    fn connect(&mut self) -> Result<(), BackendError> {
        self.receiver = Some(FEED.with(|(_, receiver)| receiver.clone()));
        Ok(())
    }

    fn is_connected(&self) -> bool {
        self.receiver.is_some()
    }

    fn has_window(&self) -> bool {
        self.window.is_some()
    }

    fn create_window(&mut self, width: u32, height: u32, title: &str) -> Result<(), BackendError> {
        if width == 0 || height == 0 {
            return Err(BackendError::WindowCreationFailed {
                backend: Self::CONTEXT_KEY,
                reason: format!("invalid size {width}x{height}"),
            });
        }
        self.window = Some(HeadlessWindow {
            width,
            height,
            title: title.to_string(),
        });
        Ok(())
    }

    fn select_input(&mut self, mask: EventMask) {
        self.selected = mask;
    }

    fn poll_event(&mut self) -> Option<PlatformEvent> {
        let receiver = self.receiver.as_ref()?;
        loop {
            let event = receiver.try_recv().ok()?;
            let kind = HeadlessEventKind::of(&event);
            if self.selected & kind.mask() != 0 {
                if let PlatformEvent::Resized { width, height } = event {
                    if let Some(window) = self.window.as_mut() {
                        window.width = width;
                        window.height = height;
                    }
                }
                return Some(event);
            }
            log::trace!("headless: dropping unselected {kind:?} event.");
        }
    }

    fn event_type(event: &PlatformEvent) -> HeadlessEventKind {
        HeadlessEventKind::of(event)
    }

    fn teardown(&mut self) -> Result<(), BackendError> {
        // Events fed while nobody listened are stale for the next multiplexer.
        if let Some(receiver) = self.receiver.take() {
            receiver.drain().for_each(drop);
        }
        self.window = None;
        self.selected = 0;
        self.grabbed.set(false);
        Ok(())
    }
}

impl PlatformBackend for HeadlessBackend {
    const VIDEO_ID: &'static str = "video_headless";
    const KEYBOARD_ID: &'static str = "keyboard_headless";
    const MOUSE_ID: &'static str = "mouse_headless";

    const VIDEO_EVENTS: &'static [HeadlessEventKind] =
        &[HeadlessEventKind::Resized, HeadlessEventKind::CloseRequested];
    const KEYBOARD_EVENTS: &'static [HeadlessEventKind] = &[HeadlessEventKind::Key];
    const MOUSE_EVENTS: &'static [HeadlessEventKind] = &[HeadlessEventKind::Mouse];

    fn mask_of(ty: HeadlessEventKind) -> EventMask {
        ty.mask()
    }

    fn translate(event: &PlatformEvent) -> Option<PlatformEvent> {
        Some(event.clone())
    }

    fn window_size(&self) -> Option<(u32, u32)> {
        self.window.as_ref().map(|w| (w.width, w.height))
    }

    fn set_cursor_grab(&self, grab: bool) -> bool {
        self.grabbed.set(grab);
        true
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn key(code: &str) -> PlatformEvent {
        PlatformEvent::Input(InputEvent::key(code, true))
    }

    #[test]
    fn test_kind_classification() {
        assert_eq!(HeadlessEventKind::of(&key("KeyA")), HeadlessEventKind::Key);
        let wheel = PlatformEvent::Input(InputEvent::MouseWheelScrolled {
            delta_x: 0.0,
            delta_y: 1.0,
        });
        assert_eq!(HeadlessEventKind::of(&wheel), HeadlessEventKind::Mouse);
        assert_ne!(HeadlessEventKind::Key.mask(), HeadlessEventKind::Mouse.mask());
    }

    #[test]
    fn test_unselected_kinds_are_dropped() {
        let mut backend = HeadlessBackend::create();
        backend.connect().unwrap();
        backend.select_input(HeadlessEventKind::Key.mask());

        let sender = feed();
        sender.send(PlatformEvent::CloseRequested).unwrap();
        sender.send(key("KeyA")).unwrap();

        assert_eq!(backend.poll_event(), Some(key("KeyA")));
        assert_eq!(backend.poll_event(), None);
    }

    #[test]
    fn test_resize_updates_window_record() {
        let mut backend = HeadlessBackend::create();
        backend.connect().unwrap();
        backend.create_window(100, 100, "t").unwrap();
        backend.select_input(HeadlessEventKind::Resized.mask());
        feed()
            .send(PlatformEvent::Resized {
                width: 640,
                height: 360,
            })
            .unwrap();
        backend.poll_event().unwrap();
        assert_eq!(backend.window_size(), Some((640, 360)));
    }

    #[test]
    fn test_zero_sized_window_is_rejected() {
        let mut backend = HeadlessBackend::create();
        assert!(backend.create_window(0, 10, "t").is_err());
    }

    #[test]
    fn test_teardown_discards_pending_events() {
        let mut backend = HeadlessBackend::create();
        backend.connect().unwrap();
        backend.select_input(u64::MAX);
        feed().send(key("KeyA")).unwrap();
        backend.teardown().unwrap();

        backend.connect().unwrap();
        backend.select_input(u64::MAX);
        assert_eq!(backend.poll_event(), None);
    }
}
