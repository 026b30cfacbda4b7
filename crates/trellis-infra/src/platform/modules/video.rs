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

//! The video role: claims window ownership and tracks resize and close requests.

use super::Attachment;
use crate::platform::{role_request, subscribe, PlatformBackend, PlatformEvent};
use std::cell::Cell;
use std::rc::Rc;
use trellis_core::error::MultiplexerError;
use trellis_core::multiplexer::EventHandler;
use trellis_core::platform::{PlatformWindowHandle, Video};
use trellis_core::{App, Module};

struct VideoState<B: PlatformBackend> {
    attachment: Attachment<B>,
    close_requested: Cell<bool>,
    last_size: Cell<Option<(u32, u32)>>,
}

impl<B: PlatformBackend> EventHandler for VideoState<B> {
    fn on_event(&self) {
        match self.attachment.current() {
            Some(PlatformEvent::CloseRequested) => {
                log::info!("{}: close requested.", B::VIDEO_ID);
                self.close_requested.set(true);
            }
            Some(PlatformEvent::Resized { width, height }) => {
                log::debug!("{}: window resized to {width}x{height}.", B::VIDEO_ID);
                self.last_size.set(Some((width, height)));
            }
            _ => {}
        }
    }
}

/// The video role on backend `B`. Claims window ownership when probed.
pub struct VideoModule<B: PlatformBackend> {
    state: Rc<VideoState<B>>,
}

impl<B: PlatformBackend> Default for VideoModule<B> {
    fn default() -> Self {
        Self {
            state: Rc::new(VideoState {
                attachment: Attachment::default(),
                close_requested: Cell::new(false),
                last_size: Cell::new(None),
            }),
        }
    }
}

impl<B: PlatformBackend> Module for VideoModule<B> {
    fn id(&self) -> &'static str {
        B::VIDEO_ID
    }

    fn probe(&mut self, app: &App) -> bool {
        if self.state.attachment.is_attached() {
            return true;
        }
        let request = role_request::<B>(B::VIDEO_EVENTS).window_owner();
        let Some(sub) = subscribe::<B, _>(app, B::VIDEO_ID, &self.state, request) else {
            return false;
        };
        // Input modules stay lazy, video connects right away.
        if let Err(err) = sub.ensure_connected() {
            log::warn!("{}: {err}", B::VIDEO_ID);
            return false;
        }
        if !sub.is_window_owner() {
            log::warn!("{}: another module owns the window.", B::VIDEO_ID);
        }
        self.state.attachment.attach(sub);
        true
    }

    fn cleanup(&mut self) {
        self.state.attachment.detach();
        self.state.close_requested.set(false);
    }

    fn as_video(&mut self) -> Option<&mut dyn Video> {
        Some(self)
    }
}

impl<B: PlatformBackend> Video for VideoModule<B> {
    fn screen_size(&self) -> (u32, u32) {
        self.state
            .attachment
            .with_sub(|s| s.with_backend(B::window_size))
            .flatten()
            .or(self.state.last_size.get())
            .unwrap_or((0, 0))
    }

    fn open_window(&mut self, width: u32, height: u32, title: &str) -> Result<(), MultiplexerError> {
        self.state
            .attachment
            .with_sub(|s| s.create_window(width, height, title))
            .unwrap_or(Err(MultiplexerError::NotWindowOwner {
                backend: B::CONTEXT_KEY,
            }))
    }

    fn window_handle(&self) -> Option<PlatformWindowHandle> {
        self.state
            .attachment
            .with_sub(|s| s.with_backend(B::window_handle))
            .flatten()
    }

    fn close_requested(&self) -> bool {
        self.state.close_requested.get()
    }
}
