//! Fatal errors that abort a generation run.
//!
//! Non-fatal problems (unsupported content types, malformed operations,
//! degraded schemas) are reported as [`crate::Diagnostic`] values instead.

use std::path::PathBuf;

use apigen_common::ConfigError;
use thiserror::Error;

/// Errors that abort the run for a source.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum Error {
    /// The input document could not be read.
    #[error("failed to read {}: {source}", .path.display())]
    Read {
        /// Input path.
        path: PathBuf,
        /// Underlying IO error.
        source: std::io::Error,
    },

    /// The input document is not valid JSON/YAML or not an OpenAPI object.
    #[error("failed to parse API document: {0}")]
    Parse(String),

    /// A `$ref` points at a registry entry that doesn't exist.
    #[error("dangling reference '{reference}' at {location}")]
    DanglingRef {
        /// The pointer as written (or the canonical schema name).
        reference: String,
        /// Where the reference was found.
        location: String,
    },

    /// A chain of non-schema references loops back on itself.
    #[error("reference cycle through '{reference}' at {location}")]
    RefCycle {
        /// First pointer seen twice.
        reference: String,
        /// Where the chain started.
        location: String,
    },

    /// Project configuration problem.
    #[error(transparent)]
    Config(#[from] ConfigError),

    /// A source listed on the command line is not in the config.
    #[error("unknown source '{0}'")]
    UnknownSource(String),

    /// A driver lifecycle hook failed.
    #[error("{hook} hook failed: {message}")]
    Hook {
        /// Hook name.
        hook: &'static str,
        /// Driver-provided message.
        message: String,
    },

    /// A generated JSON artifact failed to serialize.
    #[error("failed to serialize {what}: {message}")]
    Serialize {
        /// What was being serialized.
        what: String,
        /// Serializer message.
        message: String,
    },

    /// File watching could not be set up.
    #[error("file watcher error: {0}")]
    Watch(String),

    /// The search index was queried before `init`.
    #[error("search index is not initialized")]
    IndexNotInitialized,
}

/// Result alias used across the crate.
pub type Result<T, E = Error> = std::result::Result<T, E>;
