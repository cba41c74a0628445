//! Drift detection: regenerate in memory and compare with what is on disk.

use std::collections::BTreeSet;
use std::fs;
use std::path::{Path, PathBuf};

use similar::TextDiff;
use tracing::debug;
use walkdir::WalkDir;

use crate::driver::Driver;
use crate::dump::{artifact_path, is_generated};
use crate::emit::Artifact;
use crate::error::Result;
use crate::pipeline::Pipeline;

/// How one file differs from its regenerated artifact.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Drift {
    /// The artifact was never written.
    Missing(PathBuf),
    /// The file exists with different content.
    Changed {
        path: PathBuf,
        /// Unified diff from disk to the regenerated content.
        diff: String,
    },
    /// A generated file that the current input no longer produces.
    Stale(PathBuf),
}

impl Drift {
    /// Path of the drifted file.
    pub fn path(&self) -> &Path {
        match self {
            Self::Missing(path) | Self::Stale(path) | Self::Changed { path, .. } => path,
        }
    }
}

/// Unified diff between two texts, labelled with `path`.
pub fn unified_diff(path: &str, old: &str, new: &str) -> String {
    TextDiff::from_lines(old, new)
        .unified_diff()
        .context_radius(3)
        .header(&format!("a/{path}"), &format!("b/{path}"))
        .to_string()
}

/// Compare `artifacts` with the files below `out_root`.
///
/// When `source` is given, generated files in `<out_root>/<source>` that are
/// not among `artifacts` are reported as stale.
pub fn check_artifacts(out_root: &Path, source: Option<&str>, artifacts: &[Artifact]) -> Vec<Drift> {
    let mut drifts = Vec::new();
    for artifact in artifacts {
        let path = artifact_path(out_root, artifact);
        match fs::read_to_string(&path) {
            Err(_) => drifts.push(Drift::Missing(path)),
            Ok(existing) if existing == artifact.content() => {}
            Ok(existing) => {
                let diff = unified_diff(artifact.path(), &existing, artifact.content());
                drifts.push(Drift::Changed { path, diff });
            }
        }
    }

    if let Some(source) = source {
        let expected: BTreeSet<PathBuf> = artifacts.iter().map(|a| artifact_path(out_root, a)).collect();
        let mut stale: Vec<PathBuf> = WalkDir::new(out_root.join(source))
            .into_iter()
            .filter_map(Result::ok)
            .filter(|entry| entry.file_type().is_file())
            .map(|entry| entry.into_path())
            .filter(|path| !expected.contains(path) && is_generated(path))
            .collect();
        stale.sort();
        drifts.extend(stale.into_iter().map(Drift::Stale));
    }

    debug!(
        out_root = %out_root.display(),
        checked = artifacts.len(),
        drifted = drifts.len(),
        "Checked artifacts."
    );
    drifts
}

/// Drift of every selected source plus the global artifacts (under `"*"`).
///
/// A source that fails to compile fails the whole check.
pub fn check_project<D: Driver>(pipeline: &Pipeline<D>, names: &[String]) -> Result<Vec<(String, Vec<Drift>)>> {
    let sources = pipeline.select(names)?;
    let mut results = Vec::new();
    for compiled in pipeline.compile(&sources) {
        let output = compiled.output?;
        let drifts = check_artifacts(pipeline.out_root(), Some(&compiled.name), &output.artifacts);
        results.push((compiled.name, drifts));
    }
    let global = pipeline.global_artifacts()?;
    results.push(("*".to_string(), check_artifacts(pipeline.out_root(), None, &global)));
    Ok(results)
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;
    use crate::dump::dump;
    use crate::emit::GENERATED_HEADER;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_detects_missing_changed_and_stale() {
        let dir = tempfile::tempdir().unwrap();
        let header = format!("// {GENERATED_HEADER}\n");
        dump(
            dir.path(),
            &[
                Artifact::new("pets/a.ts", format!("{header}const a = 1;\n")),
                Artifact::new("pets/gone.ts", format!("{header}\n")),
            ],
        );

        let fresh = vec![
            Artifact::new("pets/a.ts", format!("{header}const a = 2;\n")),
            Artifact::new("pets/b.ts", format!("{header}\n")),
        ];
        let drifts = check_artifacts(dir.path(), Some("pets"), &fresh);
        assert_eq!(drifts.len(), 3);

        assert_eq!(drifts[0].path(), dir.path().join("pets/a.ts"));
        let diff = match &drifts[0] {
            Drift::Changed { diff, .. } => diff.as_str(),
            Drift::Missing(_) | Drift::Stale(_) => "",
        };
        assert!(diff.contains("--- a/pets/a.ts"));
        assert!(diff.contains("-const a = 1;"));
        assert!(diff.contains("+const a = 2;"));

        assert_eq!(drifts[1], Drift::Missing(dir.path().join("pets/b.ts")));
        assert_eq!(drifts[2], Drift::Stale(dir.path().join("pets/gone.ts")));
    }

    #[test]
    fn test_clean_tree_has_no_drift() {
        let dir = tempfile::tempdir().unwrap();
        let artifacts = vec![Artifact::new("x/registry.json", "{}\n")];
        dump(dir.path(), &artifacts);
        assert!(check_artifacts(dir.path(), Some("x"), &artifacts).is_empty());
    }
}
