#![allow(non_shorthand_field_patterns)]
#![doc = "Error handling primitives shared across the crate."]

//! The derive emitted by [`masterror::Error`] expands pattern matches that
//! trigger the `non_shorthand_field_patterns` lint. The lint is disabled for
//! the module to keep the generated implementations warning-free while still
//! exposing a thoroughly documented error surface for library consumers.

use std::path::{Path, PathBuf};

/// Unified error type returned by the configuration loader, the API facade
/// and the metric collectors.
///
/// Every failure is local to the invoked action: one invocation performs one
/// action and the whole run fails rather than degrading partially. Instances
/// are typically constructed through the helper constructors or by converting
/// from the underlying library error types via the provided `From`
/// implementations.
#[derive(Debug, masterror::Error)]
pub enum Error {
    /// Wraps I/O errors that occur while reading configuration files.
    #[error("failed to read configuration from {path:?}: {source}")]
    Io {
        /// Location of the configuration file.
        path:   PathBuf,
        /// Underlying I/O error.
        source: std::io::Error
    },
    /// Wraps YAML decoding errors.
    #[error("failed to parse configuration: {source}")]
    Parse {
        /// Source decoding error from serde_yaml.
        source: serde_yaml::Error
    },
    /// Returned when the configuration or an argument violates invariants.
    #[error("invalid configuration: {message}")]
    Validation {
        /// Human readable message describing the validation problem.
        message: String
    },
    /// Returned when a filter string contains a key that is not recognized
    /// for the queried object type. Reported before any API call is made.
    #[error("invalid filter key '{key}' for {kind} queries")]
    InvalidFilter {
        /// The unrecognized key.
        key:  String,
        /// Object type the filter string was parsed for.
        kind: String
    },
    /// Returned when a reference (user login, milestone title) cannot be
    /// resolved to a concrete API object.
    #[error("{what} was not found")]
    NotFound {
        /// Description of the missing reference.
        what: String
    },
    /// Service errors when interacting with the GitHub API.
    #[error("service error: {message}")]
    Service {
        /// Human readable message describing the service error.
        message: String
    },
    /// Returned when a metric batch cannot be delivered to the push gateway.
    #[error("failed to push metrics to {target}: {message}")]
    Push {
        /// Gateway address the batch was sent to.
        target:  String,
        /// Underlying failure reported by the gateway client.
        message: String
    }
}

impl Error {
    /// Constructs a validation error from the provided displayable value.
    pub fn validation<M>(message: M) -> Self
    where
        M: Into<String>
    {
        Self::Validation {
            message: message.into()
        }
    }

    /// Constructs a service error from the provided displayable value.
    pub fn service<M>(message: M) -> Self
    where
        M: Into<String>
    {
        Self::Service {
            message: message.into()
        }
    }

    /// Constructs a not-found error for an unresolvable reference.
    pub fn not_found<M>(what: M) -> Self
    where
        M: Into<String>
    {
        Self::NotFound {
            what: what.into()
        }
    }

    /// Constructs a push error for the given gateway target.
    pub fn push<T, M>(target: T, message: M) -> Self
    where
        T: Into<String>,
        M: Into<String>
    {
        Self::Push {
            target:  target.into(),
            message: message.into()
        }
    }

    /// Constructs an invalid-filter error for the given key and object type.
    pub fn invalid_filter<K, T>(key: K, kind: T) -> Self
    where
        K: Into<String>,
        T: Into<String>
    {
        Self::InvalidFilter {
            key:  key.into(),
            kind: kind.into()
        }
    }
}

impl From<serde_yaml::Error> for Error {
    fn from(source: serde_yaml::Error) -> Self {
        Self::Parse {
            source
        }
    }
}

/// Creates an [`Error::Io`] variant capturing the failing path and source.
pub fn io_error(path: &Path, source: std::io::Error) -> Error {
    Error::Io {
        path: path.to_path_buf(),
        source
    }
}
