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

//! The desktop backend, built on a `winit` event loop pumped without
//! blocking once per dispatch.

mod input;

pub use input::translate_input;

use crate::platform::{PlatformBackend, PlatformEvent};
use std::cell::RefCell;
use std::collections::VecDeque;
use std::sync::Arc;
use std::time::Duration;
use trellis_core::error::BackendError;
use trellis_core::multiplexer::{Backend, EventMask};
use trellis_core::platform::PlatformWindowHandle;
use winit::application::ApplicationHandler;
use winit::dpi::LogicalSize;
use winit::event::WindowEvent;
use winit::event_loop::{ActiveEventLoop, ControlFlow, EventLoop};
use winit::platform::pump_events::{EventLoopExtPumpEvents, PumpStatus};
use winit::window::{CursorGrabMode, Window, WindowId};

thread_local! {
    // winit allows one event loop per process. A torn-down backend parks
    // it here for the next multiplexer.
    static PARKED_LOOP: RefCell<Option<EventLoop<()>>> = const { RefCell::new(None) };
}

/// Event types of the winit backend.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum WinitEventKind {
    /// Keyboard key.
    Key,
    /// Mouse button.
    MouseButton,
    /// Pointer motion.
    CursorMoved,
    /// Wheel or touchpad scroll.
    MouseWheel,
    /// Window resize.
    Resized,
    /// Close button or window-manager close.
    CloseRequested,
    /// Focus gained or lost.
    Focus,
}

impl WinitEventKind {
    /// Classifies a window event. `None` for events this backend never routes.
    pub fn of(event: &WindowEvent) -> Option<Self> {
        Some(match event {
            WindowEvent::KeyboardInput { .. } => Self::Key,
            WindowEvent::MouseInput { .. } => Self::MouseButton,
            WindowEvent::CursorMoved { .. } => Self::CursorMoved,
            WindowEvent::MouseWheel { .. } => Self::MouseWheel,
            WindowEvent::Resized(_) => Self::Resized,
            WindowEvent::CloseRequested | WindowEvent::Destroyed => Self::CloseRequested,
            WindowEvent::Focused(_) => Self::Focus,
            _ => return None,
        })
    }

    /// The interest bit of this kind.
    pub const fn mask(self) -> EventMask {
        1 << self as u32
    }
}

/// A routed window event with its precomputed kind.
#[derive(Debug)]
pub struct WinitEvent {
    /// The kind subscribers filter on.
    pub kind: WinitEventKind,
    /// The raw event.
    pub event: WindowEvent,
}

struct WindowRequest {
    width: u32,
    height: u32,
    title: String,
}

/// What the event loop calls back into while being pumped.
#[derive(Default)]
struct PumpState {
    window: Option<Arc<Window>>,
    pending: Option<WindowRequest>,
    failure: Option<String>,
    queue: VecDeque<WinitEvent>,
    selected: EventMask,
}

impl PumpState {
    fn open_pending(&mut self, event_loop: &ActiveEventLoop) {
        let Some(request) = self.pending.take() else {
            return;
        };
        let attributes = Window::default_attributes()
            .with_title(request.title)
            .with_inner_size(LogicalSize::new(request.width, request.height))
            .with_visible(true);
        match event_loop.create_window(attributes) {
            Ok(window) => {
                log::info!("Winit window created successfully (id: {:?}).", window.id());
                self.window = Some(Arc::new(window));
            }
            Err(err) => self.failure = Some(err.to_string()),
        }
    }
}

impl ApplicationHandler for PumpState {
    fn resumed(&mut self, event_loop: &ActiveEventLoop) {
        event_loop.set_control_flow(ControlFlow::Poll);
        self.open_pending(event_loop);
    }

    fn about_to_wait(&mut self, event_loop: &ActiveEventLoop) {
        self.open_pending(event_loop);
    }

    fn window_event(&mut self, _event_loop: &ActiveEventLoop, window_id: WindowId, event: WindowEvent) {
        if self.window.as_ref().map(|w| w.id()) != Some(window_id) {
            return;
        }
        let Some(kind) = WinitEventKind::of(&event) else {
            return;
        };
        if self.selected & kind.mask() != 0 {
            self.queue.push_back(WinitEvent { kind, event });
        }
    }
}

/// The winit [`Backend`]. Context key `"winit"`.
#[derive(Default)]
pub struct WinitBackend {
    event_loop: Option<EventLoop<()>>,
    state: PumpState,
    exited: bool,
}

impl WinitBackend {
    fn pump_once(&mut self) {
        let Some(event_loop) = self.event_loop.as_mut() else {
            return;
        };
        if let PumpStatus::Exit(code) = event_loop.pump_app_events(Some(Duration::ZERO), &mut self.state) {
            if !self.exited {
                log::info!("Winit event loop exited with code {code}.");
                self.exited = true;
                self.state.queue.push_back(WinitEvent {
                    kind: WinitEventKind::CloseRequested,
                    event: WindowEvent::CloseRequested,
                });
            }
        }
    }
}

impl Backend for WinitBackend {
    const CONTEXT_KEY: &'static str = "winit";

    type Event = WinitEvent;
    type EventType = WinitEventKind;

    fn create() -> Self {
        Self::default()
    }

    fn connect(&mut self) -> Result<(), BackendError> {
        let event_loop = match PARKED_LOOP.with(|p| p.borrow_mut().take()) {
            Some(event_loop) => event_loop,
            None => EventLoop::new().map_err(|e| BackendError::ConnectionFailed {
                backend: Self::CONTEXT_KEY,
                reason: e.to_string(),
            })?,
        };
        self.event_loop = Some(event_loop);
        self.exited = false;
        Ok(())
    }

    fn is_connected(&self) -> bool {
        self.event_loop.is_some()
    }

    fn has_window(&self) -> bool {
        self.state.window.is_some() || self.state.pending.is_some()
    }

    fn create_window(&mut self, width: u32, height: u32, title: &str) -> Result<(), BackendError> {
        log::info!("Building window with title: '{title}' and size: {width}x{height}");
        self.state.failure = None;
        self.state.pending = Some(WindowRequest {
            width,
            height,
            title: title.to_string(),
        });
        // The window is created from inside the loop, on the next callback.
        self.pump_once();
        match self.state.failure.take() {
            Some(reason) => Err(BackendError::WindowCreationFailed {
                backend: Self::CONTEXT_KEY,
                reason,
            }),
            None => Ok(()),
        }
    }

    fn select_input(&mut self, mask: EventMask) {
        self.state.selected = mask;
    }

    fn pump(&mut self) {
        self.pump_once();
    }

    fn poll_event(&mut self) -> Option<WinitEvent> {
        self.state.queue.pop_front()
    }

    fn event_type(event: &WinitEvent) -> WinitEventKind {
        event.kind
    }

    fn teardown(&mut self) -> Result<(), BackendError> {
        self.state.window = None;
        self.state.pending = None;
        self.state.queue.clear();
        self.state.selected = 0;
        // Let the platform process the window destruction before parking.
        self.pump_once();
        if let Some(event_loop) = self.event_loop.take() {
            PARKED_LOOP.with(|p| *p.borrow_mut() = Some(event_loop));
        }
        Ok(())
    }
}

impl PlatformBackend for WinitBackend {
    const VIDEO_ID: &'static str = "video_winit";
    const KEYBOARD_ID: &'static str = "keyboard_winit";
    const MOUSE_ID: &'static str = "mouse_winit";

    const VIDEO_EVENTS: &'static [WinitEventKind] =
        &[WinitEventKind::Resized, WinitEventKind::CloseRequested];
    const KEYBOARD_EVENTS: &'static [WinitEventKind] = &[WinitEventKind::Key];
    const MOUSE_EVENTS: &'static [WinitEventKind] = &[
        WinitEventKind::MouseButton,
        WinitEventKind::CursorMoved,
        WinitEventKind::MouseWheel,
    ];

    fn mask_of(ty: WinitEventKind) -> EventMask {
        ty.mask()
    }

    fn translate(event: &WinitEvent) -> Option<PlatformEvent> {
        match &event.event {
            WindowEvent::CloseRequested | WindowEvent::Destroyed => Some(PlatformEvent::CloseRequested),
            WindowEvent::Resized(size) => Some(PlatformEvent::Resized {
                width: size.width,
                height: size.height,
            }),
            other => translate_input(other).map(PlatformEvent::Input),
        }
    }

    fn window_size(&self) -> Option<(u32, u32)> {
        self.state.window.as_ref().map(|w| {
            let size = w.inner_size();
            (size.width, size.height)
        })
    }

    fn window_handle(&self) -> Option<PlatformWindowHandle> {
        let window: PlatformWindowHandle = self.state.window.clone()?;
        Some(window)
    }

    fn set_cursor_grab(&self, grab: bool) -> bool {
        let Some(window) = self.state.window.as_ref() else {
            return false;
        };
        let result = if grab {
            window
                .set_cursor_grab(CursorGrabMode::Confined)
                .or_else(|_| window.set_cursor_grab(CursorGrabMode::Locked))
        } else {
            window.set_cursor_grab(CursorGrabMode::None)
        };
        match result {
            Ok(()) => true,
            Err(err) => {
                log::warn!("Cursor grab change failed: {err}");
                false
            }
        }
    }
}
