//! Watch mode: regenerate a source whenever its input document changes.

use std::collections::BTreeSet;
use std::path::{Path, PathBuf};
use std::pin::Pin;

use apigen_common::SourceConfig;
use notify::{RecursiveMode, Watcher};
use tokio::sync::{broadcast, mpsc};
use tokio::time::{Duration, Sleep};
use tracing::{debug, info, warn};

use crate::driver::Driver;
use crate::error::{Error, Result};
use crate::pipeline::Pipeline;

/// Quiet period after the last change before regenerating.
pub const WATCH_DEBOUNCE_MS: u64 = 150;

#[derive(Debug)]
struct WatchedInput {
    source: String,
    path: PathBuf,
    canonical: Option<PathBuf>,
}

impl WatchedInput {
    fn new(source: &SourceConfig) -> Self {
        Self {
            source: source.name.clone(),
            path: source.input.clone(),
            canonical: source.input.canonicalize().ok(),
        }
    }

    fn matches(&self, changed: &Path) -> bool {
        if changed == self.path {
            return true;
        }
        // Editors often replace the file, so compare parent + name as well.
        let canonical_parent = changed.parent().and_then(|p| p.canonicalize().ok());
        let input_parent = self.canonical.as_deref().and_then(Path::parent);
        changed.file_name() == self.path.file_name()
            && canonical_parent.is_some()
            && canonical_parent.as_deref() == input_parent
    }
}

/// Sources whose input is among `paths`.
fn changed_sources(inputs: &[WatchedInput], paths: &[PathBuf]) -> BTreeSet<String> {
    inputs
        .iter()
        .filter(|input| paths.iter().any(|path| input.matches(path)))
        .map(|input| input.source.clone())
        .collect()
}

fn debounce_timer(ms: u64) -> Option<Pin<Box<Sleep>>> {
    Some(Box::pin(tokio::time::sleep(Duration::from_millis(ms))))
}

/// Generate the selected sources, then regenerate each one when its input
/// changes, until `shutdown` fires.
pub async fn watch<D: Driver>(
    pipeline: &Pipeline<D>,
    names: &[String],
    mut shutdown: broadcast::Receiver<()>,
) -> Result<()> {
    let sources = pipeline.select(names)?;
    let inputs: Vec<WatchedInput> = sources.iter().map(|s| WatchedInput::new(s)).collect();
    pipeline.driver().predev(pipeline.out_root())?;

    let (tx, mut rx) = mpsc::unbounded_channel();
    let mut watcher = notify::recommended_watcher(move |result| {
        let _ = tx.send(result);
    })
    .map_err(|err| Error::Watch(format!("failed to create file watcher: {err}")))?;

    let dirs: BTreeSet<PathBuf> = inputs
        .iter()
        .filter_map(|input| input.path.parent().map(Path::to_path_buf))
        .collect();
    for dir in &dirs {
        watcher
            .watch(dir, RecursiveMode::NonRecursive)
            .map_err(|err| Error::Watch(format!("failed to watch {}: {err}", dir.display())))?;
        debug!(dir = %dir.display(), "Watching directory.");
    }

    // Initial generation covers every selected source.
    let mut pending: BTreeSet<String> = inputs.iter().map(|i| i.source.clone()).collect();
    let mut debounce = debounce_timer(0);
    info!(sources = pending.len(), "Watching API documents.");

    loop {
        tokio::select! {
            biased;

            _ = shutdown.recv() => {
                debug!("Watcher stopping.");
                break;
            }
            maybe = rx.recv() => {
                let Some(result) = maybe else {
                    debug!("Watcher channel closed.");
                    break;
                };
                match result {
                    Ok(event) if event.kind.is_access() => {}
                    Ok(event) => {
                        let changed = changed_sources(&inputs, &event.paths);
                        if !changed.is_empty() {
                            if pending.is_empty() {
                                info!(sources = ?changed, "API document changed, regenerating…");
                            }
                            pending.extend(changed);
                            debounce = debounce_timer(WATCH_DEBOUNCE_MS);
                        }
                    }
                    Err(err) => warn!("File watcher error: {err}"),
                }
            }
            () = async {
                if let Some(timer) = debounce.as_mut() {
                    timer.await;
                }
            }, if debounce.is_some() => {
                debounce = None;
                let batch: Vec<String> = std::mem::take(&mut pending).into_iter().collect();
                match pipeline.generate(&batch) {
                    Ok(run) if run.is_ok() => info!(sources = run.sources.len(), "Regenerated."),
                    Ok(run) => warn!(failed = run.failures.len(), "Regenerated with failures."),
                    Err(err) => warn!("Regeneration failed: {err}"),
                }
            }
        }
    }

    drop(watcher);
    Ok(())
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;
    use crate::driver::TypeScriptDriver;
    use apigen_common::ProjectConfig;
    use std::fs;

    #[test]
    fn test_changed_sources_matches_by_path() {
        let dir = tempfile::tempdir().unwrap();
        let input = dir.path().join("pets.json");
        fs::write(&input, "{}").unwrap();
        let inputs = vec![WatchedInput::new(&SourceConfig::new("pets", &input))];

        let changed = changed_sources(&inputs, &[input.clone(), dir.path().join("other.json")]);
        assert_eq!(changed.into_iter().collect::<Vec<_>>(), vec!["pets".to_string()]);
        assert!(changed_sources(&inputs, &[dir.path().join("other.json")]).is_empty());
    }

    #[tokio::test]
    async fn test_initial_generation_then_shutdown() {
        let dir = tempfile::tempdir().unwrap();
        let input = dir.path().join("pets.json");
        fs::write(
            &input,
            r#"{"openapi": "3.0.0", "paths": {"/ping": {"get": {"operationId": "ping", "responses": {"204": {"description": "ok"}}}}}}"#,
        )
        .unwrap();
        let out = dir.path().join("out");
        let config = ProjectConfig {
            output: out.clone(),
            sources: vec![SourceConfig::new("pets", &input)],
            ..ProjectConfig::default()
        };
        let pipeline = Pipeline::new(config, TypeScriptDriver::default());
        let (stop, shutdown) = broadcast::channel(1);

        let stopper = async {
            for _ in 0..200 {
                if out.join("pets/registry.json").is_file() {
                    break;
                }
                tokio::time::sleep(Duration::from_millis(10)).await;
            }
            stop.send(()).unwrap();
        };
        let (result, ()) = tokio::join!(watch(&pipeline, &[], shutdown), stopper);

        result.unwrap();
        assert!(out.join("pets/ping/ping.ts").is_file());
        assert!(out.join("runtime.ts").is_file());
    }
}
