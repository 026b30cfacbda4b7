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

//! Table sizes and the operator's module selection override.

use crate::error::SelectionError;
use std::str::FromStr;

/// Environment variable carrying `video,keyboard,mouse` module ids.
pub const MODULES_ENV_VAR: &str = "TRELLIS_MODULES";

/// Sizes of the fixed-capacity registry tables.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Capacities {
    /// Maximum number of registered modules.
    pub max_modules: usize,
    /// Maximum number of distinct context slot keys.
    pub max_contexts: usize,
}

impl Default for Capacities {
    fn default() -> Self {
        Self {
            max_modules: 30,
            max_contexts: 10,
        }
    }
}

/// Ordered candidate module ids for each platform role.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RoleCandidates {
    /// Video candidates, most preferred first.
    pub video: Vec<String>,
    /// Keyboard candidates, most preferred first.
    pub keyboard: Vec<String>,
    /// Mouse candidates, most preferred first.
    pub mouse: Vec<String>,
}

impl RoleCandidates {
    /// Convenience constructor from string slices.
    pub fn new(video: &[&str], keyboard: &[&str], mouse: &[&str]) -> Self {
        let owned = |ids: &[&str]| ids.iter().map(|s| (*s).to_string()).collect();
        Self {
            video: owned(video),
            keyboard: owned(keyboard),
            mouse: owned(mouse),
        }
    }
}

/// An explicit `video,keyboard,mouse` selection that bypasses the
/// environment probe. An empty field leaves the role unserved.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SelectionOverride {
    /// Video module id, if any.
    pub video: Option<String>,
    /// Keyboard module id, if any.
    pub keyboard: Option<String>,
    /// Mouse module id, if any.
    pub mouse: Option<String>,
}

impl SelectionOverride {
    /// Reads [`MODULES_ENV_VAR`]. Unset or empty means "no override".
    ///
    /// # Errors
    /// Returns [`SelectionError::MalformedOverride`] if the variable does not
    /// hold exactly three fields.
    pub fn from_env() -> Result<Option<Self>, SelectionError> {
        match std::env::var(MODULES_ENV_VAR) {
            Ok(value) if !value.trim().is_empty() => value.parse().map(Some),
            _ => Ok(None),
        }
    }

    /// Turns the override into single-candidate lists.
    pub fn into_candidates(self) -> RoleCandidates {
        RoleCandidates {
            video: self.video.into_iter().collect(),
            keyboard: self.keyboard.into_iter().collect(),
            mouse: self.mouse.into_iter().collect(),
        }
    }
}

impl FromStr for SelectionOverride {
    type Err = SelectionError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        let fields: Vec<&str> = value.split(',').map(str::trim).collect();
        let [video, keyboard, mouse] = fields.as_slice() else {
            return Err(SelectionError::MalformedOverride {
                value: value.to_string(),
                fields: fields.len(),
            });
        };
        let field = |s: &str| (!s.is_empty()).then(|| s.to_string());
        Ok(Self {
            video: field(*video),
            keyboard: field(*keyboard),
            mouse: field(*mouse),
        })
    }
}
