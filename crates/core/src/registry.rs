//! Machine-readable summary of a generated source (`registry.json`).
//!
//! Documentation and search tooling read this file instead of the compiler
//! internals, so its shape is versioned and only ever extended.

use std::collections::BTreeMap;
use std::fs;
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::emit::{Artifact, SourcePlan, registry_file};
use crate::error::{Error, Result};
use crate::extract::RequestDescriptor;
use crate::openapi::Document;
use crate::schema::CompiledTypes;

/// Current `registry.json` schema version.
pub const REGISTRY_VERSION: u32 = 1;

/// One request variant with the identifiers generated for it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RegistryRequest {
    pub callable: String,
    pub hook: String,
    #[serde(flatten)]
    pub descriptor: RequestDescriptor,
}

/// Contents of `<source>/registry.json`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RegistrySummary {
    pub version: u32,
    pub source: String,
    pub title: String,
    /// `info.version` of the document.
    pub api_version: String,
    pub controllers: Vec<String>,
    pub schemas: Vec<String>,
    pub requests: Vec<RegistryRequest>,
    /// Artifact path to sha256 (hex) of its content.
    pub artifacts: BTreeMap<String, String>,
}

impl RegistrySummary {
    /// Summarize one source's emission. `artifacts` should not contain the
    /// registry file itself.
    pub fn build(
        source: &str,
        document: &Document,
        plan: &SourcePlan<'_>,
        types: &CompiledTypes,
        artifacts: &[Artifact],
    ) -> Self {
        let own = registry_file(source);
        Self {
            version: REGISTRY_VERSION,
            source: source.to_string(),
            title: document.info.title.clone(),
            api_version: document.info.version.clone(),
            controllers: document.controllers.clone(),
            schemas: types.descriptors.keys().cloned().collect(),
            requests: plan
                .variants()
                .map(|(_, variant)| RegistryRequest {
                    callable: variant.callable.clone(),
                    hook: variant.hook.clone(),
                    descriptor: variant.descriptor.clone(),
                })
                .collect(),
            artifacts: artifacts
                .iter()
                .filter(|a| a.path() != own)
                .map(|a| (a.path().to_string(), a.sha256()))
                .collect(),
        }
    }

    /// Render as the `registry.json` artifact.
    pub fn to_artifact(&self) -> Result<Artifact> {
        let path = registry_file(&self.source);
        let mut content = serde_json::to_string_pretty(self).map_err(|err| Error::Serialize {
            what: path.clone(),
            message: err.to_string(),
        })?;
        content.push('\n');
        Ok(Artifact::new(path, content))
    }

    /// Parse a summary, rejecting versions this build doesn't understand.
    pub fn from_json(contents: &str) -> Result<Self> {
        let summary: Self = serde_json::from_str(contents)
            .map_err(|err| Error::Parse(format!("invalid registry summary: {err}")))?;
        if summary.version != REGISTRY_VERSION {
            return Err(Error::Parse(format!(
                "unsupported registry summary version {} (expected {REGISTRY_VERSION})",
                summary.version
            )));
        }
        Ok(summary)
    }

    /// Read `<out>/<source>/registry.json`.
    pub fn load(path: &Path) -> Result<Self> {
        let contents = fs::read_to_string(path).map_err(|source| Error::Read {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_json(&contents)
    }
}
