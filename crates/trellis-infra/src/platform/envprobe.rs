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

//! Picks the backend candidates fitting the current session.

use super::headless::HeadlessBackend;
use super::winit::WinitBackend;
use super::PlatformBackend;
use trellis_core::config::RoleCandidates;
use trellis_core::platform::EnvProbe;
use trellis_core::{App, Module};

/// The environment probe: desktop backends when a display server is
/// reachable, headless otherwise. Headless always stays as the last resort.
#[derive(Debug, Default)]
pub struct EnvProbeModule {
    desktop: Option<bool>,
}

impl EnvProbeModule {
    /// Candidates for a session with or without a desktop.
    pub fn candidates_for(desktop: bool) -> RoleCandidates {
        let mut video = Vec::new();
        let mut keyboard = Vec::new();
        let mut mouse = Vec::new();
        if desktop {
            video.push(WinitBackend::VIDEO_ID);
            keyboard.push(WinitBackend::KEYBOARD_ID);
            mouse.push(WinitBackend::MOUSE_ID);
        }
        video.push(HeadlessBackend::VIDEO_ID);
        keyboard.push(HeadlessBackend::KEYBOARD_ID);
        mouse.push(HeadlessBackend::MOUSE_ID);
        RoleCandidates::new(&video, &keyboard, &mouse)
    }
}

#[cfg(all(unix, not(target_os = "macos"), not(target_os = "android")))]
fn desktop_session() -> bool {
    ["WAYLAND_DISPLAY", "DISPLAY"]
        .iter()
        .any(|var| std::env::var_os(var).is_some_and(|v| !v.is_empty()))
}

#[cfg(not(all(unix, not(target_os = "macos"), not(target_os = "android"))))]
fn desktop_session() -> bool {
    true
}

impl Module for EnvProbeModule {
    fn id(&self) -> &'static str {
        "envprobe"
    }

    fn probe(&mut self, _app: &App) -> bool {
        let desktop = *self.desktop.get_or_insert_with(desktop_session);
        log::info!(
            "envprobe: {} session detected.",
            if desktop { "desktop" } else { "headless" }
        );
        true
    }

    fn cleanup(&mut self) {
        self.desktop = None;
    }

    fn as_env_probe(&mut self) -> Option<&mut dyn EnvProbe> {
        Some(self)
    }
}

impl EnvProbe for EnvProbeModule {
    fn candidates(&self) -> RoleCandidates {
        Self::candidates_for(self.desktop.unwrap_or_else(desktop_session))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_desktop_prefers_winit_then_headless() {
        let candidates = EnvProbeModule::candidates_for(true);
        assert_eq!(candidates.video, vec!["video_winit", "video_headless"]);
        assert_eq!(candidates.mouse, vec!["mouse_winit", "mouse_headless"]);
    }

    #[test]
    fn test_no_desktop_is_headless_only() {
        let candidates = EnvProbeModule::candidates_for(false);
        assert_eq!(candidates.video, vec!["video_headless"]);
        assert_eq!(candidates.keyboard, vec!["keyboard_headless"]);
    }

    #[test]
    fn test_probe_always_succeeds() {
        let app = App::default();
        let mut probe = EnvProbeModule::default();
        assert!(probe.probe(&app));
        assert!(probe.as_env_probe().is_some());
    }
}
