//! Per-language drivers and their lifecycle hooks.
//!
//! The pipeline owns the run; a driver turns one normalized document into
//! artifacts and gets a callback at each packaging step. Hooks default to
//! no-ops.

use std::fmt;
use std::path::Path;

use apigen_common::{RuntimeConfig, SourceConfig};
use tracing::debug;

use crate::dump::DumpReport;
use crate::emit::{Artifact, EmitContext, EmitOutput, emit_global, emit_source};
use crate::error::Result;
use crate::extract::extract;
use crate::openapi::Document;
use crate::schema::SchemaCompiler;

/// Turns normalized documents into artifacts for one target language.
pub trait Driver: fmt::Debug + Send + Sync {
    /// Short name used in logs.
    fn name(&self) -> &'static str;

    /// Artifacts of one source. `document` is already normalized.
    fn generate_source_content(
        &self,
        source: &SourceConfig,
        out_root: &Path,
        document: &Document,
    ) -> Result<EmitOutput>;

    /// Artifacts shared by every source.
    fn generate_global_content(&self, out_root: &Path, sources: &[SourceConfig]) -> Result<Vec<Artifact>>;

    /// Before anything is generated.
    fn pre_build(&self, _out_root: &Path) -> Result<()> {
        Ok(())
    }

    /// After every artifact of the run is on disk.
    fn post_build(&self, _out_root: &Path, _report: &DumpReport) -> Result<()> {
        Ok(())
    }

    /// Once, before watch mode's first generation.
    fn predev(&self, _out_root: &Path) -> Result<()> {
        Ok(())
    }

    /// After `init` wrote a new project config.
    fn post_init(&self, _project_root: &Path) -> Result<()> {
        Ok(())
    }

    /// After a source was compiled, before it is written.
    fn post_compile(&self, _source: &SourceConfig, _output: &EmitOutput) -> Result<()> {
        Ok(())
    }
}

/// TypeScript output: zod schemas, callables, React hooks, route modules.
#[derive(Debug, Clone, Default)]
pub struct TypeScriptDriver {
    runtime: RuntimeConfig,
}

impl TypeScriptDriver {
    /// Driver baking `runtime` into the generated runtime module.
    pub fn new(runtime: RuntimeConfig) -> Self {
        Self { runtime }
    }
}

impl Driver for TypeScriptDriver {
    fn name(&self) -> &'static str {
        "typescript"
    }

    fn generate_source_content(
        &self,
        source: &SourceConfig,
        _out_root: &Path,
        document: &Document,
    ) -> Result<EmitOutput> {
        let types = SchemaCompiler::new(&document.components.schemas).compile_all();
        let extraction = extract(&source.name, document);
        debug!(
            source = %source.name,
            schemas = types.descriptors.len(),
            requests = extraction.descriptors.len(),
            "Compiled source."
        );

        let ctx = EmitContext {
            source: &source.name,
            document,
        };
        let mut output = emit_source(
            &source.effective_targets(),
            &extraction.descriptors,
            &types,
            &ctx,
        )?;

        let mut diagnostics = types.diagnostics;
        diagnostics.extend(extraction.diagnostics);
        diagnostics.append(&mut output.diagnostics);
        output.diagnostics = diagnostics;
        Ok(output)
    }

    fn generate_global_content(&self, _out_root: &Path, sources: &[SourceConfig]) -> Result<Vec<Artifact>> {
        emit_global(sources, &self.runtime)
    }
}
