//! Shared configuration types for apigen.
//!
//! This crate holds the project configuration model used by both the
//! compiler (`apigen-core`) and the command surface (`apigen-cli`).

pub mod config;

use std::fs;
use std::path::Path;

pub use config::{
    CONFIG_FILENAMES, ConfigError, DEFAULT_DEBOUNCE_MS, DEFAULT_OUTPUT_DIR, ProjectConfig,
    RuntimeConfig, SourceConfig, TargetKind,
};

/// Create a directory and all of its parents if they don't exist.
pub fn ensure_dir(path: &Path) -> Result<(), String> {
    fs::create_dir_all(path)
        .map_err(|e| format!("Failed to create directory {}: {e}", path.display()))
}

/// Check whether a name is safe to use as a single path segment.
pub fn is_path_safe(name: &str) -> bool {
    !name.is_empty()
        && name != "."
        && name != ".."
        && name
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || c == '_' || c == '-' || c == '.')
}
