use std::path::{Path, PathBuf};
use std::time::Instant;

use apigen_common::ProjectConfig;
use apigen_core::{Pipeline, TypeScriptDriver};
use clap::Args;
use tracing::debug;

/// Project selection shared by every command that reads a config.
#[derive(Args, Debug, Clone, Default)]
pub struct ProjectArgs {
    #[arg(
        long = "project",
        short = 'p',
        value_name = "DIR",
        help = "Project directory. Defaults to current working directory"
    )]
    pub project_dir: Option<PathBuf>,
    #[arg(
        long = "config",
        short = 'c',
        value_name = "FILE",
        help = "Explicit config file instead of discovering apigen.toml"
    )]
    pub config: Option<PathBuf>,
}

impl ProjectArgs {
    pub fn dir(&self) -> PathBuf {
        self.project_dir
            .clone()
            .unwrap_or_else(|| std::env::current_dir().unwrap_or_else(|_| PathBuf::from(".")))
    }

    /// Load the config with paths resolved against its directory.
    pub fn load(&self) -> Result<ProjectConfig, String> {
        if let Some(path) = &self.config {
            let mut config = ProjectConfig::load(path).map_err(|e| e.to_string())?;
            let base = path.parent().unwrap_or_else(|| Path::new("."));
            config.resolve_paths(base);
            return Ok(config);
        }
        let (path, config) = ProjectConfig::discover(&self.dir()).map_err(|e| e.to_string())?;
        debug!(path = %path.display(), "Using project config.");
        Ok(config)
    }

    pub fn pipeline(&self) -> Result<Pipeline<TypeScriptDriver>, String> {
        let config = self.load()?;
        let driver = TypeScriptDriver::new(config.runtime.clone());
        Ok(Pipeline::new(config, driver))
    }
}

pub fn format_elapsed_ms(start: Instant) -> String {
    let elapsed = start.elapsed();
    if elapsed.as_secs() == 0 {
        return format!("{}ms", elapsed.as_millis());
    }
    format!("{}s {}ms", elapsed.as_secs(), elapsed.subsec_millis())
}

/// `n noun` with a trailing `s` unless `n == 1`.
pub fn plural(n: usize, noun: &str) -> String {
    if n == 1 {
        format!("{n} {noun}")
    } else {
        format!("{n} {noun}s")
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;
    use std::fs;

    #[test]
    fn test_plural() {
        assert_eq!(plural(1, "file"), "1 file");
        assert_eq!(plural(3, "file"), "3 files");
    }

    #[test]
    fn test_explicit_config_resolves_relative_paths() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("custom.toml");
        fs::write(
            &path,
            "output = \"out\"\n[[sources]]\nname = \"pets\"\ninput = \"pets.yaml\"\n",
        )
        .unwrap();

        let args = ProjectArgs {
            project_dir: None,
            config: Some(path),
        };
        let config = args.load().unwrap();
        assert_eq!(config.output, dir.path().join("out"));
        assert_eq!(config.sources[0].input, dir.path().join("pets.yaml"));
    }

    #[test]
    fn test_missing_config_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        let args = ProjectArgs {
            project_dir: Some(dir.path().to_path_buf()),
            config: None,
        };
        assert!(args.load().unwrap_err().contains("no apigen config"));
    }
}
