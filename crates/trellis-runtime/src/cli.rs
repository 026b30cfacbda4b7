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

//! Command-line arguments of the `trellis` binary.

use clap::Parser;
use std::time::Duration;
use trellis_core::config::{SelectionOverride, MODULES_ENV_VAR};

/// Probes the platform modules, opens the shared window and logs input
/// until quit (meta+Q or closing the window).
#[derive(Parser, Debug)]
#[command(name = "trellis", version, about)]
pub struct Cli {
    /// Module ids as `video,keyboard,mouse`. An empty field leaves the role
    /// unserved. Falls back to the TRELLIS_MODULES environment variable, then
    /// to the environment probe.
    #[arg(long, value_name = "VIDEO,KEYBOARD,MOUSE")]
    pub modules: Option<SelectionOverride>,

    /// Quit after this many frames.
    #[arg(long)]
    pub frames: Option<u64>,

    /// Window width.
    #[arg(long, default_value_t = 1024)]
    pub width: u32,

    /// Window height.
    #[arg(long, default_value_t = 768)]
    pub height: u32,

    /// Window title.
    #[arg(long, default_value = "Trellis")]
    pub title: String,

    /// Delay between two frames, in milliseconds.
    #[arg(long, default_value_t = 16)]
    pub frame_ms: u64,

    /// Print the registered module ids and exit.
    #[arg(long)]
    pub list_modules: bool,
}

/// The window the video module is asked to open.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WindowConfig {
    /// Width.
    pub width: u32,
    /// Height.
    pub height: u32,
    /// Title.
    pub title: String,
}

impl Cli {
    /// The explicit selection, from the flag or from the environment.
    pub fn selection(&self) -> anyhow::Result<Option<SelectionOverride>> {
        match &self.modules {
            Some(selection) => Ok(Some(selection.clone())),
            None => SelectionOverride::from_env()
                .map_err(|e| anyhow::anyhow!("{MODULES_ENV_VAR}: {e}")),
        }
    }

    /// The requested window.
    pub fn window(&self) -> WindowConfig {
        WindowConfig {
            width: self.width,
            height: self.height,
            title: self.title.clone(),
        }
    }

    /// The pause between frames.
    pub fn frame_time(&self) -> Duration {
        Duration::from_millis(self.frame_ms)
    }
}
