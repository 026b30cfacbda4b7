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

//! Defines the error taxonomy shared by the registry, the context slots and
//! the platform multiplexers.

use thiserror::Error;

/// An error raised while adding a module to the [`ModuleRegistry`](crate::module::ModuleRegistry).
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RegistrationError {
    /// The fixed-size module catalog is full.
    #[error("module catalog is full ({capacity} entries), cannot register '{id}'")]
    CapacityExceeded {
        /// The id of the module that was rejected.
        id: String,
        /// The configured catalog capacity.
        capacity: usize,
    },
}

/// An error raised while looking up or reading a context slot.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ContextError {
    /// The key was not present and the slot table has no room for it.
    #[error("context table is full ({capacity} slots), cannot create slot '{key}'")]
    CapacityExceeded {
        /// The key that could not be inserted.
        key: String,
        /// The configured table capacity.
        capacity: usize,
    },
    /// The slot holds a value of a different type than the one requested.
    #[error("context slot '{key}' holds a value of another type than '{expected}'")]
    TypeMismatch {
        /// The key of the offending slot.
        key: &'static str,
        /// The type name the caller asked for.
        expected: &'static str,
    },
}

/// A failure reported by a concrete platform backend.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum BackendError {
    /// The native connection (display, event loop...) could not be opened.
    #[error("failed to connect to '{backend}': {reason}")]
    ConnectionFailed {
        /// The backend's context key.
        backend: &'static str,
        /// A human readable reason.
        reason: String,
    },
    /// A window could not be created on an open connection.
    #[error("failed to create window on '{backend}': {reason}")]
    WindowCreationFailed {
        /// The backend's context key.
        backend: &'static str,
        /// A human readable reason.
        reason: String,
    },
    /// The native resource could not be released cleanly.
    #[error("failed to tear down '{backend}': {reason}")]
    TeardownFailed {
        /// The backend's context key.
        backend: &'static str,
        /// A human readable reason.
        reason: String,
    },
}

/// An error raised by a [`Multiplexer`](crate::multiplexer::Multiplexer).
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum MultiplexerError {
    /// Every subscriber slot of the multiplexer is in use.
    #[error("all {capacity} subscriber slots of '{backend}' are in use")]
    ResourceExhausted {
        /// The backend's context key.
        backend: &'static str,
        /// The subscriber table capacity.
        capacity: usize,
    },
    /// The operation is reserved to the subscriber owning the window.
    #[error("only the window owner of '{backend}' may create its window")]
    NotWindowOwner {
        /// The backend's context key.
        backend: &'static str,
    },
    /// The multiplexer's context slot could not be used.
    #[error(transparent)]
    Context(#[from] ContextError),
    /// The native layer failed.
    #[error(transparent)]
    Backend(#[from] BackendError),
}

/// An error raised while selecting the modules serving the platform roles.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SelectionError {
    /// The override list did not have one field per role.
    #[error("malformed module list '{value}': expected 3 comma-separated fields (video,keyboard,mouse), found {fields}")]
    MalformedOverride {
        /// The raw override value.
        value: String,
        /// The number of fields actually found.
        fields: usize,
    },
    /// No module could be found for a mandatory role.
    #[error("no usable {role} module (tried: {tried})")]
    MissingRole {
        /// The role that could not be satisfied.
        role: &'static str,
        /// The candidate ids that were tried, comma separated.
        tried: String,
    },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_backend_error_converts_into_multiplexer_error() {
        let err: MultiplexerError = BackendError::ConnectionFailed {
            backend: "headless",
            reason: "boom".to_string(),
        }
        .into();
        assert_eq!(err.to_string(), "failed to connect to 'headless': boom");
    }

    #[test]
    fn test_malformed_override_message() {
        let err = SelectionError::MalformedOverride {
            value: "a,b".to_string(),
            fields: 2,
        };
        assert!(err.to_string().contains("found 2"));
    }
}
