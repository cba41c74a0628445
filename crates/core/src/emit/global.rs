//! Artifacts shared by every source: the runtime module and the source index.

use apigen_common::{RuntimeConfig, SourceConfig, TargetKind};
use serde::{Deserialize, Serialize};

use super::artifact::Artifact;
use super::layout::{RUNTIME_FILE, SOURCES_FILE, registry_file};
use crate::error::{Error, Result};

/// Source of the generated `runtime.ts`.
pub const RUNTIME_TEMPLATE: &str = include_str!("../../templates/runtime.ts");

const DEBOUNCE_PLACEHOLDER: &str = "__DEFAULT_DEBOUNCE_MS__";

/// One entry of `sources.json`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SourceEntry {
    pub name: String,
    pub targets: Vec<TargetKind>,
    /// Path of the source's `registry.json`, relative to the output root.
    pub registry: String,
}

/// Contents of `sources.json`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SourcesIndex {
    pub version: u32,
    pub sources: Vec<SourceEntry>,
}

impl SourcesIndex {
    /// Index of the enabled sources, in config order.
    pub fn new(sources: &[SourceConfig]) -> Self {
        Self {
            version: 1,
            sources: sources
                .iter()
                .filter(|s| s.enabled)
                .map(|s| SourceEntry {
                    name: s.name.clone(),
                    targets: s.effective_targets().into_iter().collect(),
                    registry: registry_file(&s.name),
                })
                .collect(),
        }
    }
}

fn runtime_module(runtime: &RuntimeConfig) -> Artifact {
    Artifact::new(
        RUNTIME_FILE,
        RUNTIME_TEMPLATE.replace(DEBOUNCE_PLACEHOLDER, &runtime.debounce_ms.to_string()),
    )
}

/// `runtime.ts` and `sources.json`.
pub fn emit_global(sources: &[SourceConfig], runtime: &RuntimeConfig) -> Result<Vec<Artifact>> {
    let mut index = serde_json::to_string_pretty(&SourcesIndex::new(sources)).map_err(|err| {
        Error::Serialize {
            what: SOURCES_FILE.to_string(),
            message: err.to_string(),
        }
    })?;
    index.push('\n');
    Ok(vec![
        runtime_module(runtime),
        Artifact::new(SOURCES_FILE, index),
    ])
}
