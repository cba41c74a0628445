//! Structured artifact assembly.
//!
//! An [`ArtifactBuilder`] collects three sections (imports, types, body)
//! for one TypeScript file. Imports are merged per module and split into
//! value and type-only statements; every local binding is tracked so two
//! declarations or imports claiming the same identifier are caught before
//! anything is rendered.

use std::collections::{BTreeMap, BTreeSet};

use sha2::{Digest, Sha256};

use super::layout::import_specifier;
use crate::diagnostic::{Diagnostic, DiagnosticKind};
use crate::ts::{Emit, ImportItem, TsImport, TsItem, TsModule, TsTypeDef};

/// Header placed at the top of every generated TypeScript file.
pub const GENERATED_HEADER: &str = "Generated by apigen. Do not edit.";

/// A generated file: path relative to the output root plus its content.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord)]
pub struct Artifact {
    path: String,
    content: String,
}

impl Artifact {
    /// Create an artifact. Paths use `/` separators.
    pub fn new(path: impl Into<String>, content: impl Into<String>) -> Self {
        Self {
            path: path.into(),
            content: content.into(),
        }
    }

    /// Path relative to the output root.
    pub fn path(&self) -> &str {
        &self.path
    }

    /// File content.
    pub fn content(&self) -> &str {
        &self.content
    }

    /// Hex sha256 of the content.
    pub fn sha256(&self) -> String {
        hex::encode(Sha256::digest(self.content.as_bytes()))
    }
}

#[derive(Debug, Default)]
struct ModuleImports {
    values: BTreeSet<ImportItem>,
    types: BTreeSet<ImportItem>,
}

/// Builder for one TypeScript artifact.
#[derive(Debug)]
pub struct ArtifactBuilder {
    path: String,
    imports: BTreeMap<String, ModuleImports>,
    types: Vec<TsTypeDef>,
    body: Vec<TsItem>,
    /// Local identifier to the module it comes from (`None` for local declarations).
    bindings: BTreeMap<String, Option<String>>,
    collisions: Vec<String>,
}

impl ArtifactBuilder {
    /// Start an artifact at `path` (relative to the output root).
    pub fn new(path: impl Into<String>) -> Self {
        Self {
            path: path.into(),
            imports: BTreeMap::new(),
            types: Vec::new(),
            body: Vec::new(),
            bindings: BTreeMap::new(),
            collisions: Vec::new(),
        }
    }

    /// Path of the artifact being built.
    pub fn path(&self) -> &str {
        &self.path
    }

    fn bind(&mut self, name: &str, origin: Option<&str>) {
        match self.bindings.get(name) {
            Some(existing) if existing.as_deref() == origin && origin.is_some() => {}
            Some(existing) => {
                let describe = |o: Option<&str>| o.map_or_else(|| "a local declaration".to_string(), |m| format!("\"{m}\""));
                self.collisions.push(format!(
                    "identifier '{name}' is bound by both {} and {}",
                    describe(existing.as_deref()),
                    describe(origin)
                ));
            }
            None => {
                self.bindings.insert(name.to_string(), origin.map(str::to_string));
            }
        }
    }

    fn import(&mut self, module: String, name: &str, type_only: bool) {
        self.bind(name, Some(&module));
        let entry = self.imports.entry(module).or_default();
        let item = ImportItem {
            name: name.to_string(),
            alias: None,
        };
        if type_only {
            entry.types.insert(item);
        } else {
            entry.values.insert(item);
        }
    }

    /// Import a value from another artifact. Imports of the artifact itself are dropped.
    pub fn import_value(&mut self, target: &str, name: &str) {
        if target != self.path {
            self.import(import_specifier(&self.path, target), name, false);
        }
    }

    /// Import a type from another artifact. Imports of the artifact itself are dropped.
    pub fn import_type(&mut self, target: &str, name: &str) {
        if target != self.path {
            self.import(import_specifier(&self.path, target), name, true);
        }
    }

    /// Import from a package (`zod`, `react`).
    pub fn import_package(&mut self, module: &str, name: &str, type_only: bool) {
        self.import(module.to_string(), name, type_only);
    }

    /// Add a named type declaration.
    pub fn add_type(&mut self, def: TsTypeDef) {
        self.bind(&def.name, None);
        self.types.push(def);
    }

    /// Add a body item, binding `name` when it declares one.
    pub fn add_item(&mut self, item: TsItem) {
        match &item {
            TsItem::Const(c) => self.bind(&c.name, None),
            TsItem::Function(f) => self.bind(&f.name, None),
            TsItem::Raw(_) => {}
        }
        self.body.push(item);
    }

    /// Render the artifact, or fail with the identifier collisions found.
    pub fn build(self) -> Result<Artifact, Vec<String>> {
        if !self.collisions.is_empty() {
            return Err(self.collisions);
        }

        let mut imports = Vec::new();
        for (from, module) in self.imports {
            // A name imported as both a value and a type only needs the value import.
            let types: Vec<ImportItem> = module
                .types
                .into_iter()
                .filter(|item| !module.values.contains(item))
                .collect();
            if !module.values.is_empty() {
                imports.push(TsImport {
                    items: module.values.into_iter().collect(),
                    from: from.clone(),
                    type_only: false,
                });
            }
            if !types.is_empty() {
                imports.push(TsImport {
                    items: types,
                    from,
                    type_only: true,
                });
            }
        }

        let module = TsModule {
            header: Some(GENERATED_HEADER.to_string()),
            imports,
            types: self.types,
            body: self.body,
        };
        Ok(Artifact::new(self.path, module.emit()))
    }
}

/// Artifacts and diagnostics produced by emission.
#[derive(Debug, Clone, Default)]
pub struct EmitOutput {
    pub artifacts: Vec<Artifact>,
    pub diagnostics: Vec<Diagnostic>,
}

impl EmitOutput {
    /// Add an artifact. An identical artifact at the same path is dropped; a
    /// different one at the same path is reported as a collision.
    pub fn push(&mut self, artifact: Artifact) {
        match self.artifacts.iter().find(|a| a.path == artifact.path) {
            None => self.artifacts.push(artifact),
            Some(existing) if existing.content == artifact.content => {}
            Some(_) => self.diagnostics.push(Diagnostic::error(
                DiagnosticKind::IdentifierCollision,
                artifact.path.clone(),
                "two different artifacts claim the same path",
            )),
        }
    }

    /// Add a built artifact, or report its collisions against `subject`.
    pub fn push_built(&mut self, subject: &str, built: Result<Artifact, Vec<String>>) -> bool {
        match built {
            Ok(artifact) => {
                self.push(artifact);
                true
            }
            Err(collisions) => {
                for message in collisions {
                    self.diagnostics.push(Diagnostic::error(
                        DiagnosticKind::IdentifierCollision,
                        subject,
                        message,
                    ));
                }
                false
            }
        }
    }

    /// Merge another output into this one.
    pub fn extend(&mut self, other: Self) {
        for artifact in other.artifacts {
            self.push(artifact);
        }
        self.diagnostics.extend(other.diagnostics);
    }

    /// Sort artifacts by path.
    pub fn sort(&mut self) {
        self.artifacts.sort();
    }
}
