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

use crate::app::App;
use crate::config::RoleCandidates;
use crate::error::SelectionError;
use crate::module::ModuleHandle;
use std::fmt;

/// The modules chosen to serve each role. A role may be left unserved.
#[derive(Default, Clone)]
pub struct Environment {
    /// The video module.
    pub video: Option<ModuleHandle>,
    /// The keyboard module.
    pub keyboard: Option<ModuleHandle>,
    /// The mouse module.
    pub mouse: Option<ModuleHandle>,
}

impl Environment {
    /// Returns the video module, which every application requires.
    ///
    /// # Errors
    /// [`SelectionError::MissingRole`] listing the video candidates tried.
    pub fn require_video(&self, candidates: &RoleCandidates) -> Result<ModuleHandle, SelectionError> {
        self.video.clone().ok_or_else(|| SelectionError::MissingRole {
            role: "video",
            tried: candidates.video.join(","),
        })
    }

    /// Returns the selected modules in cleanup order: mouse, keyboard, video.
    pub fn cleanup_order(&self) -> impl Iterator<Item = &ModuleHandle> {
        [&self.mouse, &self.keyboard, &self.video]
            .into_iter()
            .flatten()
    }
}

impl fmt::Debug for Environment {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let id = |m: &Option<ModuleHandle>| {
            m.as_ref()
                .and_then(|m| m.try_borrow().ok().map(|m| m.id()))
        };
        f.debug_struct("Environment")
            .field("video", &id(&self.video))
            .field("keyboard", &id(&self.keyboard))
            .field("mouse", &id(&self.mouse))
            .finish()
    }
}

/// Probes the candidates of each role in priority order, video first so
/// that the video module claims window ownership before input modules join
/// the same backend.
pub fn select_environment(app: &App, candidates: &RoleCandidates) -> Environment {
    let pick = |role: &str, ids: &[String]| {
        let ids: Vec<&str> = ids.iter().map(String::as_str).collect();
        let chosen = app.probe(&ids);
        if chosen.is_none() && !ids.is_empty() {
            log::warn!("No usable {role} module among {ids:?}.");
        }
        chosen
    };
    let environment = Environment {
        video: pick("video", &candidates.video),
        keyboard: pick("keyboard", &candidates.keyboard),
        mouse: pick("mouse", &candidates.mouse),
    };
    log::info!("Selected {environment:?}.");
    environment
}
