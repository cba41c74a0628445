//! Writes artifacts below an output root.
//!
//! Writing is not transactional. A failed artifact is recorded in the report
//! and the rest are still written; the next run overwrites everything.

use std::collections::BTreeSet;
use std::fs;
use std::path::{Path, PathBuf};

use tracing::{debug, warn};
use walkdir::WalkDir;

use crate::emit::{Artifact, GENERATED_HEADER};

/// Outcome of a dump.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DumpReport {
    pub written: Vec<PathBuf>,
    /// Artifacts whose file already had the same content.
    pub unchanged: Vec<PathBuf>,
    pub failed: Vec<(PathBuf, String)>,
    /// Stale generated files that were removed.
    pub pruned: Vec<PathBuf>,
}

impl DumpReport {
    /// Whether every artifact made it to disk.
    pub fn is_ok(&self) -> bool {
        self.failed.is_empty()
    }

    /// Merge another report into this one.
    pub fn extend(&mut self, other: Self) {
        self.written.extend(other.written);
        self.unchanged.extend(other.unchanged);
        self.failed.extend(other.failed);
        self.pruned.extend(other.pruned);
    }
}

/// Absolute destination of an artifact.
pub fn artifact_path(out_root: &Path, artifact: &Artifact) -> PathBuf {
    artifact
        .path()
        .split('/')
        .fold(out_root.to_path_buf(), |path, segment| path.join(segment))
}

fn write_artifact(path: &Path, artifact: &Artifact) -> Result<bool, String> {
    if fs::read_to_string(path).is_ok_and(|existing| existing == artifact.content()) {
        return Ok(false);
    }
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)
            .map_err(|err| format!("Failed to create {}: {err}", parent.display()))?;
    }
    fs::write(path, artifact.content())
        .map_err(|err| format!("Failed to write {}: {err}", path.display()))?;
    Ok(true)
}

/// Write every artifact, skipping files whose content is already current.
pub fn dump(out_root: &Path, artifacts: &[Artifact]) -> DumpReport {
    let mut report = DumpReport::default();
    for artifact in artifacts {
        let path = artifact_path(out_root, artifact);
        match write_artifact(&path, artifact) {
            Ok(true) => {
                debug!(path = %path.display(), "Wrote artifact.");
                report.written.push(path);
            }
            Ok(false) => report.unchanged.push(path),
            Err(message) => {
                warn!(path = %path.display(), "{message}");
                report.failed.push((path, message));
            }
        }
    }
    report
}

/// Whether a file on disk looks like something this tool generated.
pub(crate) fn is_generated(path: &Path) -> bool {
    match path.extension().and_then(|ext| ext.to_str()) {
        Some("ts") => fs::read_to_string(path).is_ok_and(|c| {
            c.lines()
                .next()
                .is_some_and(|line| line.trim_start_matches('/').trim() == GENERATED_HEADER)
        }),
        Some("json") => path
            .file_name()
            .and_then(|name| name.to_str())
            .is_some_and(|name| name == "meta.json" || name == "registry.json"),
        _ => false,
    }
}

/// Remove generated files under `<out_root>/<source>` that are not in `keep`.
///
/// Files without the generated header are left alone.
pub fn prune(out_root: &Path, source: &str, keep: &[Artifact]) -> Vec<PathBuf> {
    let root = out_root.join(source);
    let keep: BTreeSet<PathBuf> = keep.iter().map(|a| artifact_path(out_root, a)).collect();

    let mut pruned = Vec::new();
    for entry in WalkDir::new(&root)
        .into_iter()
        .filter_map(Result::ok)
        .filter(|entry| entry.file_type().is_file())
    {
        let path = entry.path();
        if keep.contains(path) || !is_generated(path) {
            continue;
        }
        match fs::remove_file(path) {
            Ok(()) => {
                debug!(path = %path.display(), "Pruned stale artifact.");
                pruned.push(path.to_path_buf());
            }
            Err(err) => warn!(path = %path.display(), "Failed to prune stale artifact: {err}"),
        }
    }
    pruned
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn ts(path: &str, body: &str) -> Artifact {
        Artifact::new(path, format!("// {GENERATED_HEADER}\n{body}"))
    }

    #[test]
    fn test_dump_creates_directories_and_skips_unchanged() {
        let dir = tempfile::tempdir().unwrap();
        let artifacts = vec![ts("pets/pet/getPet/getPet.ts", "a"), Artifact::new("runtime.ts", "b")];

        let first = dump(dir.path(), &artifacts);
        assert_eq!(first.written.len(), 2);
        assert!(first.is_ok());
        assert_eq!(
            fs::read_to_string(dir.path().join("pets/pet/getPet/getPet.ts")).unwrap(),
            artifacts[0].content()
        );

        let second = dump(dir.path(), &artifacts);
        assert!(second.written.is_empty());
        assert_eq!(second.unchanged.len(), 2);
    }

    #[test]
    fn test_failure_is_per_artifact() {
        let dir = tempfile::tempdir().unwrap();
        // A file where a directory is needed
        fs::write(dir.path().join("blocked"), "").unwrap();
        let artifacts = vec![Artifact::new("blocked/x.ts", "x"), Artifact::new("ok.ts", "y")];

        let report = dump(dir.path(), &artifacts);
        assert_eq!(report.failed.len(), 1);
        assert_eq!(report.written, vec![dir.path().join("ok.ts")]);
    }

    #[test]
    fn test_prune_only_removes_generated_files() {
        let dir = tempfile::tempdir().unwrap();
        let kept = ts("pets/a.ts", "kept");
        dump(
            dir.path(),
            &[kept.clone(), ts("pets/old/old.ts", "stale"), Artifact::new("pets/old/meta.json", "{}")],
        );
        fs::write(dir.path().join("pets/handwritten.ts"), "export {};").unwrap();

        let mut pruned = prune(dir.path(), "pets", &[kept]);
        pruned.sort();
        assert_eq!(
            pruned,
            vec![dir.path().join("pets/old/meta.json"), dir.path().join("pets/old/old.ts")]
        );
        assert!(dir.path().join("pets/a.ts").exists());
        assert!(dir.path().join("pets/handwritten.ts").exists());
    }
}
