//! One generation run: load, normalize, compile, emit and write every source.
//!
//! Sources share nothing but the read-only config and write to disjoint
//! subtrees of the output root, so they are compiled in parallel.

use std::path::Path;
use std::time::Instant;

use apigen_common::{ProjectConfig, SourceConfig};
use rayon::prelude::*;
use tracing::{debug, info, warn};

use crate::diagnostic::Diagnostic;
use crate::driver::Driver;
use crate::dump::{DumpReport, dump, prune};
use crate::emit::{Artifact, EmitOutput};
use crate::error::{Error, Result};
use crate::normalize::normalize_with_diagnostics;
use crate::openapi::load_document;

/// Compiled (not yet written) output of one source.
#[derive(Debug)]
pub struct CompiledSource {
    pub name: String,
    pub output: Result<EmitOutput>,
}

/// Written output of one source.
#[derive(Debug)]
pub struct SourceReport {
    pub name: String,
    pub artifacts: usize,
    pub diagnostics: Vec<Diagnostic>,
    pub dump: DumpReport,
}

/// Outcome of [`Pipeline::generate`].
#[derive(Debug, Default)]
pub struct RunReport {
    pub sources: Vec<SourceReport>,
    /// Sources that failed fatally, with the error.
    pub failures: Vec<(String, Error)>,
    /// Dump of `runtime.ts` and `sources.json`.
    pub global: DumpReport,
}

impl RunReport {
    /// No fatal source errors and no failed writes.
    pub fn is_ok(&self) -> bool {
        self.failures.is_empty()
            && self.global.is_ok()
            && self.sources.iter().all(|s| s.dump.is_ok())
    }

    /// Reported-and-skipped problems across every source.
    pub fn error_count(&self) -> usize {
        self.sources
            .iter()
            .flat_map(|s| &s.diagnostics)
            .filter(|d| d.is_error())
            .count()
    }
}

/// A project plus the driver that renders it.
#[derive(Debug)]
pub struct Pipeline<D: Driver> {
    config: ProjectConfig,
    driver: D,
}

impl<D: Driver> Pipeline<D> {
    /// Create a pipeline over a validated config.
    pub fn new(config: ProjectConfig, driver: D) -> Self {
        Self { config, driver }
    }

    /// Project config.
    pub fn config(&self) -> &ProjectConfig {
        &self.config
    }

    /// Driver.
    pub fn driver(&self) -> &D {
        &self.driver
    }

    /// Output root.
    pub fn out_root(&self) -> &Path {
        &self.config.output
    }

    /// The named sources, or every enabled source when `names` is empty.
    pub fn select(&self, names: &[String]) -> Result<Vec<&SourceConfig>> {
        if names.is_empty() {
            return Ok(self.config.enabled_sources().collect());
        }
        names
            .iter()
            .map(|name| {
                self.config
                    .source(name)
                    .ok_or_else(|| Error::UnknownSource(name.clone()))
            })
            .collect()
    }

    /// Load, normalize and emit one source in memory.
    pub fn compile_source(&self, source: &SourceConfig) -> Result<EmitOutput> {
        let started = Instant::now();
        let document = load_document(&source.input)?;
        let (document, normalize_diagnostics) = normalize_with_diagnostics(document)?;

        let mut output = self
            .driver
            .generate_source_content(source, self.out_root(), &document)?;
        output.diagnostics.splice(0..0, normalize_diagnostics);
        for diagnostic in &output.diagnostics {
            diagnostic.log(&source.name);
        }
        self.driver.post_compile(source, &output)?;

        debug!(
            source = %source.name,
            artifacts = output.artifacts.len(),
            elapsed_ms = started.elapsed().as_millis(),
            "Source compiled."
        );
        Ok(output)
    }

    /// Compile the selected sources in parallel, without writing anything.
    pub fn compile(&self, sources: &[&SourceConfig]) -> Vec<CompiledSource> {
        sources
            .par_iter()
            .map(|source| CompiledSource {
                name: source.name.clone(),
                output: self.compile_source(source),
            })
            .collect()
    }

    /// Global artifacts for the whole project.
    pub fn global_artifacts(&self) -> Result<Vec<Artifact>> {
        self.driver
            .generate_global_content(self.out_root(), &self.config.sources)
    }

    fn write_source(&self, source: &SourceConfig) -> Result<SourceReport> {
        let output = self.compile_source(source)?;
        let mut report = dump(self.out_root(), &output.artifacts);
        report.pruned = prune(self.out_root(), &source.name, &output.artifacts);
        Ok(SourceReport {
            name: source.name.clone(),
            artifacts: output.artifacts.len(),
            diagnostics: output.diagnostics,
            dump: report,
        })
    }

    /// Generate and write the named sources (every enabled one when empty),
    /// then the global artifacts unless a source failed.
    pub fn generate(&self, names: &[String]) -> Result<RunReport> {
        let started = Instant::now();
        let sources = self.select(names)?;
        self.driver.pre_build(self.out_root())?;

        let results: Vec<(String, Result<SourceReport>)> = sources
            .par_iter()
            .map(|source| (source.name.clone(), self.write_source(source)))
            .collect();

        let mut run = RunReport::default();
        for (name, result) in results {
            match result {
                Ok(report) => run.sources.push(report),
                Err(err) => {
                    warn!(source = %name, "Source failed: {err}");
                    run.failures.push((name, err));
                }
            }
        }

        // The manifest only lists sources whose output is current
        if run.failures.is_empty() {
            run.global = dump(self.out_root(), &self.global_artifacts()?);
        } else {
            warn!(failed = run.failures.len(), "Skipping runtime.ts and sources.json.");
        }
        let mut combined = run.global.clone();
        for source in &run.sources {
            combined.extend(source.dump.clone());
        }
        self.driver.post_build(self.out_root(), &combined)?;

        info!(
            sources = run.sources.len(),
            failed = run.failures.len(),
            written = combined.written.len(),
            unchanged = combined.unchanged.len(),
            skipped_operations = run.error_count(),
            elapsed_ms = started.elapsed().as_millis(),
            "Generation finished."
        );
        Ok(run)
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;
    use crate::driver::TypeScriptDriver;
    use std::fs;

    #[test]
    fn test_select_rejects_unknown_sources() {
        let config = ProjectConfig {
            sources: vec![SourceConfig::new("pets", "pets.json")],
            ..ProjectConfig::default()
        };
        let pipeline = Pipeline::new(config, TypeScriptDriver::default());
        assert_eq!(pipeline.select(&[]).unwrap().len(), 1);
        assert!(matches!(
            pipeline.select(&["nope".to_string()]),
            Err(Error::UnknownSource(name)) if name == "nope"
        ));
    }

    #[test]
    fn test_failed_source_skips_globals_but_not_the_others() {
        let dir = tempfile::tempdir().unwrap();
        fs::write(
            dir.path().join("good.json"),
            r#"{"openapi": "3.0.0", "paths": {"/ping": {"get": {"operationId": "ping", "responses": {"204": {"description": "ok"}}}}}}"#,
        )
        .unwrap();
        let config = ProjectConfig {
            output: dir.path().join("out"),
            sources: vec![
                SourceConfig::new("good", dir.path().join("good.json")),
                SourceConfig::new("bad", dir.path().join("missing.json")),
            ],
            ..ProjectConfig::default()
        };

        let pipeline = Pipeline::new(config, TypeScriptDriver::default());
        let run = pipeline.generate(&[]).unwrap();
        assert_eq!(run.sources.len(), 1);
        assert_eq!(run.failures.len(), 1);
        assert_eq!(run.failures[0].0, "bad");
        assert!(!run.is_ok());
        assert!(dir.path().join("out/good/ping/ping.ts").is_file());
        assert!(!dir.path().join("out/runtime.ts").exists());
        assert!(!dir.path().join("out/sources.json").exists());
        assert!(run.global.written.is_empty());
    }
}
