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

//! Module selection, the per-frame loop and orderly shutdown.

use crate::cli::WindowConfig;
use anyhow::{Context, Result};
use std::time::Duration;
use trellis_core::config::{RoleCandidates, SelectionOverride};
use trellis_core::platform::{select_environment, Environment};
use trellis_core::{App, EventBus, InputEvent, ModuleHandle};
use trellis_infra::{EnvProbeModule, MOUSE_VIRTUAL_ID};

/// Id of the module deciding the candidates when no override is given.
const ENVPROBE_ID: &str = "envprobe";

/// Meta key quitting the application when no module consumes it.
const QUIT_KEY: &str = "KeyQ";

/// A running module stack.
pub struct Runner {
    app: App,
    env: Environment,
    video: ModuleHandle,
    bus: EventBus<InputEvent>,
    frames: u64,
}

impl Runner {
    /// Selects the modules, opens the window and wires the input sinks.
    ///
    /// # Errors
    /// Fails if no video module can be selected or its window cannot be opened.
    pub fn start(app: App, selection: Option<SelectionOverride>, window: &WindowConfig) -> Result<Self> {
        let candidates = match selection {
            Some(selection) => {
                log::info!("Using explicit module selection {selection:?}.");
                selection.into_candidates()
            }
            None => probe_candidates(&app),
        };

        let mut env = select_environment(&app, &candidates);
        let video = env.require_video(&candidates)?;
        if env.keyboard.is_some() && env.mouse.is_none() {
            env.mouse = app.probe(&[MOUSE_VIRTUAL_ID]);
            if env.mouse.is_some() {
                log::info!("No mouse module, pointer driven by meta+arrow keys.");
            }
        }
        video
            .borrow_mut()
            .as_video()
            .context("selected video module does not serve the video role")?
            .open_window(window.width, window.height, &window.title)
            .context("failed to open the window")?;

        let bus = EventBus::new();
        if let Some(keyboard) = &env.keyboard {
            if let Some(keyboard) = keyboard.borrow_mut().as_keyboard() {
                keyboard.set_sink(bus.sender());
            }
        }
        if let Some(mouse) = &env.mouse {
            let (width, height) = video
                .borrow_mut()
                .as_video()
                .map(|v| v.screen_size())
                .unwrap_or((window.width, window.height));
            if let Some(mouse) = mouse.borrow_mut().as_mouse() {
                mouse.set_sink(bus.sender());
                mouse.set_bounds(width, height);
            }
        }

        Ok(Self {
            app,
            env,
            video,
            bus,
            frames: 0,
        })
    }

    /// Runs frames until quit, or until `max_frames` frames have run.
    ///
    /// # Errors
    /// Stops at the first failing frame.
    pub fn run(&mut self, max_frames: Option<u64>, frame_time: Duration) -> Result<()> {
        log::info!("Entering main loop.");
        while self.app.is_running() {
            self.frame()?;
            if max_frames.is_some_and(|max| self.frames >= max) {
                log::info!("Frame limit of {} reached.", self.frames);
                self.app.quit();
            }
            if !frame_time.is_zero() {
                std::thread::sleep(frame_time);
            }
        }
        Ok(())
    }

    /// One tick: dispatch native events, then handle the resulting input.
    pub fn frame(&mut self) -> Result<()> {
        self.app
            .dispatch_events()
            .context("event dispatch failed")?;
        self.frames += 1;

        for event in self.bus.drain() {
            log::debug!("Input: {event:?}");
            self.handle_input(&event);
        }
        let close_requested = self
            .video
            .borrow_mut()
            .as_video()
            .is_some_and(|v| v.close_requested());
        if close_requested {
            self.app.quit();
        }
        Ok(())
    }

    /// Offers meta key combinations to the modules (mouse, keyboard, video)
    /// and quits on an unconsumed meta+Q press. Meta is read from the state
    /// the keyboard stamped on the event, not from the state after the tick.
    fn handle_input(&self, event: &InputEvent) {
        let (Some(code), Some(pressed), Some(modifiers)) =
            (event.key_code(), event.key_pressed(), event.modifiers())
        else {
            return;
        };
        if !modifiers.meta {
            return;
        }
        let consumed = self
            .env
            .cleanup_order()
            .any(|module| module.borrow_mut().handle_meta(code, pressed));
        if !consumed && pressed && code == QUIT_KEY {
            self.app.quit();
        }
    }

    /// Number of frames run so far.
    pub fn frames(&self) -> u64 {
        self.frames
    }

    /// Cleans the modules up in mouse, keyboard, video order. The last
    /// one releases the backend.
    pub fn shutdown(self) {
        for module in self.env.cleanup_order() {
            let mut module = module.borrow_mut();
            log::info!("Cleaning up '{}'.", module.id());
            module.cleanup();
        }
        log::info!("Shutdown complete.");
    }
}

fn probe_candidates(app: &App) -> RoleCandidates {
    let candidates = app.probe(&[ENVPROBE_ID]).and_then(|probe| {
        probe
            .borrow_mut()
            .as_env_probe()
            .map(|p| p.candidates())
    });
    candidates.unwrap_or_else(|| {
        log::warn!("No environment probe available, assuming a headless session.");
        EnvProbeModule::candidates_for(false)
    })
}
