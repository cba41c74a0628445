//! Project configuration (`apigen.toml` or `apigen.yaml`).
//!
//! A project lists one or more API sources. Each source is compiled
//! independently into its own subtree of the output directory.

use serde::{Deserialize, Serialize};
use std::collections::{BTreeSet, HashSet};
use std::fs;
use std::path::{Path, PathBuf};
use thiserror::Error;
use tracing::debug;

use crate::is_path_safe;

/// Config file names probed by [`ProjectConfig::discover`], in priority order.
pub const CONFIG_FILENAMES: &[&str] = &["apigen.toml", "apigen.yaml", "apigen.yml"];

/// Output directory used when the config omits `output`.
pub const DEFAULT_OUTPUT_DIR: &str = "generated";

/// Debounce window for generated accessors when the config omits it.
pub const DEFAULT_DEBOUNCE_MS: u64 = 250;

/// Errors raised while loading or validating a project configuration.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum ConfigError {
    /// None of [`CONFIG_FILENAMES`] exists in the directory.
    #[error("no apigen config found in {}", .0.display())]
    NotFound(PathBuf),

    /// The config file could not be read.
    #[error("failed to read {}: {source}", .path.display())]
    Read {
        /// Config file path.
        path: PathBuf,
        /// Underlying IO error.
        source: std::io::Error,
    },

    /// The config file could not be written.
    #[error("failed to write {}: {source}", .path.display())]
    Write {
        /// Config file path.
        path: PathBuf,
        /// Underlying IO error.
        source: std::io::Error,
    },

    /// The config file is not valid TOML/YAML or doesn't match the schema.
    #[error("failed to parse {}: {message}", .path.display())]
    Parse {
        /// Config file path.
        path: PathBuf,
        /// Parser message.
        message: String,
    },

    /// The config parsed but is semantically invalid.
    #[error("invalid config: {0}")]
    Invalid(String),
}

/// Artifact target a source can be compiled for.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TargetKind {
    /// Server-side callable per operation variant (plus params and schemas).
    Callable,
    /// Browser-side stateful accessor (React hook) built on the callable.
    Accessor,
    /// Per-URL route handler dispatching by HTTP method.
    Dispatch,
    /// Per-operation documentation metadata.
    Docs,
}

impl TargetKind {
    /// Every target, in emission order.
    pub const ALL: [Self; 4] = [Self::Callable, Self::Accessor, Self::Dispatch, Self::Docs];

    /// Config spelling of the target.
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Callable => "callable",
            Self::Accessor => "accessor",
            Self::Dispatch => "dispatch",
            Self::Docs => "docs",
        }
    }
}

impl std::fmt::Display for TargetKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One API description to compile.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SourceConfig {
    /// Source id; also the name of the output subdirectory.
    pub name: String,
    /// Path to the bundled OpenAPI document (JSON or YAML).
    pub input: PathBuf,
    /// Targets to emit for this source.
    pub targets: Vec<TargetKind>,
    /// Disabled sources are skipped by every command.
    pub enabled: bool,
}

impl Default for SourceConfig {
    fn default() -> Self {
        Self {
            name: String::new(),
            input: PathBuf::new(),
            targets: TargetKind::ALL.to_vec(),
            enabled: true,
        }
    }
}

impl SourceConfig {
    /// Create a source emitting every target.
    pub fn new(name: impl Into<String>, input: impl Into<PathBuf>) -> Self {
        Self {
            name: name.into(),
            input: input.into(),
            ..Self::default()
        }
    }

    /// Replace the target list.
    #[must_use]
    pub fn with_targets(mut self, targets: impl IntoIterator<Item = TargetKind>) -> Self {
        self.targets = targets.into_iter().collect();
        self
    }

    /// Targets after applying implications (an accessor needs its callable).
    pub fn effective_targets(&self) -> BTreeSet<TargetKind> {
        let mut targets: BTreeSet<_> = self.targets.iter().copied().collect();
        if targets.contains(&TargetKind::Accessor) {
            targets.insert(TargetKind::Callable);
        }
        targets
    }
}

/// Settings baked into the generated runtime module.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct RuntimeConfig {
    /// Default debounce window (milliseconds) for accessors using the debounce policy.
    pub debounce_ms: u64,
}

impl Default for RuntimeConfig {
    fn default() -> Self {
        Self {
            debounce_ms: DEFAULT_DEBOUNCE_MS,
        }
    }
}

/// Root of `apigen.toml`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ProjectConfig {
    /// Output root; every source writes below `<output>/<source.name>/`.
    pub output: PathBuf,
    /// Runtime defaults.
    pub runtime: RuntimeConfig,
    /// Sources to compile.
    pub sources: Vec<SourceConfig>,
}

impl Default for ProjectConfig {
    fn default() -> Self {
        Self {
            output: PathBuf::from(DEFAULT_OUTPUT_DIR),
            runtime: RuntimeConfig::default(),
            sources: Vec::new(),
        }
    }
}

impl ProjectConfig {
    /// Find and load the config file in `dir`.
    ///
    /// Relative `input` and `output` paths are resolved against `dir`.
    pub fn discover(dir: &Path) -> Result<(PathBuf, Self), ConfigError> {
        let path = CONFIG_FILENAMES
            .iter()
            .map(|name| dir.join(name))
            .find(|candidate| candidate.is_file())
            .ok_or_else(|| ConfigError::NotFound(dir.to_path_buf()))?;

        let mut config = Self::load(&path)?;
        config.resolve_paths(dir);
        Ok((path, config))
    }

    /// Load a config file, choosing the format from its extension.
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let contents = fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.to_path_buf(),
            source,
        })?;

        let is_yaml = path
            .extension()
            .and_then(|ext| ext.to_str())
            .is_some_and(|ext| ext == "yaml" || ext == "yml");

        let config = if is_yaml {
            Self::from_yaml_str(&contents)
        } else {
            Self::from_toml_str(&contents)
        }
        .map_err(|message| ConfigError::Parse {
            path: path.to_path_buf(),
            message,
        })?;

        config.validate()?;
        debug!(
            path = %path.display(),
            sources = config.sources.len(),
            "Loaded project config."
        );
        Ok(config)
    }

    /// Parse TOML config text.
    pub fn from_toml_str(contents: &str) -> Result<Self, String> {
        toml::from_str(contents).map_err(|e| e.to_string())
    }

    /// Parse YAML config text.
    pub fn from_yaml_str(contents: &str) -> Result<Self, String> {
        serde_yaml::from_str(contents).map_err(|e| e.to_string())
    }

    /// Render the config as TOML.
    pub fn to_toml_string(&self) -> Result<String, ConfigError> {
        toml::to_string_pretty(self).map_err(|e| ConfigError::Invalid(e.to_string()))
    }

    /// Write the config as TOML, refusing to overwrite an existing file.
    pub fn write_new(&self, path: &Path) -> Result<(), ConfigError> {
        if path.exists() {
            return Err(ConfigError::Invalid(format!(
                "{} already exists",
                path.display()
            )));
        }
        let contents = self.to_toml_string()?;
        fs::write(path, contents).map_err(|source| ConfigError::Write {
            path: path.to_path_buf(),
            source,
        })
    }

    /// Check source names are unique and usable as directory names.
    pub fn validate(&self) -> Result<(), ConfigError> {
        let mut seen = HashSet::new();
        for source in &self.sources {
            if !is_path_safe(&source.name) {
                return Err(ConfigError::Invalid(format!(
                    "source name '{}' must be a non-empty path segment of [A-Za-z0-9._-]",
                    source.name
                )));
            }
            if !seen.insert(source.name.as_str()) {
                return Err(ConfigError::Invalid(format!(
                    "duplicate source name '{}'",
                    source.name
                )));
            }
            if source.targets.is_empty() {
                return Err(ConfigError::Invalid(format!(
                    "source '{}' has no targets",
                    source.name
                )));
            }
        }
        Ok(())
    }

    /// Make relative paths absolute with respect to `base`.
    pub fn resolve_paths(&mut self, base: &Path) {
        if self.output.is_relative() {
            self.output = base.join(&self.output);
        }
        for source in &mut self.sources {
            if source.input.is_relative() {
                source.input = base.join(&source.input);
            }
        }
    }

    /// Sources with `enabled = true`.
    pub fn enabled_sources(&self) -> impl Iterator<Item = &SourceConfig> {
        self.sources.iter().filter(|s| s.enabled)
    }

    /// Look up a source by name.
    pub fn source(&self, name: &str) -> Option<&SourceConfig> {
        self.sources.iter().find(|s| s.name == name)
    }
}
