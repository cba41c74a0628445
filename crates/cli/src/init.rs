use std::path::{Path, PathBuf};

use apigen_common::{
    CONFIG_FILENAMES, DEFAULT_OUTPUT_DIR, ProjectConfig, SourceConfig, ensure_dir, is_path_safe,
};
use apigen_core::{Driver, TypeScriptDriver};
use clap::Args;
use console::style;
use tracing::debug;

use crate::run_cli_async;

#[derive(Args, Debug, Clone)]
pub struct InitArgs {
    #[arg(
        value_name = "PROJECT_PATH",
        help = "Where to create apigen.toml. Defaults to current working directory"
    )]
    pub project_path: Option<PathBuf>,
    #[arg(
        long = "input",
        short = 'i',
        value_name = "FILE",
        help = "OpenAPI document to register as the first source"
    )]
    pub input: Option<PathBuf>,
    #[arg(
        long = "name",
        short = 'n',
        help = "Name of the first source. Defaults to the input file stem"
    )]
    pub name: Option<String>,
    #[arg(
        long = "output",
        short = 'o',
        default_value = DEFAULT_OUTPUT_DIR,
        help = "Output directory, relative to the project path"
    )]
    pub output: PathBuf,
}

pub async fn run(args: InitArgs) -> i32 {
    run_cli_async(|| run_inner(args)).await
}

async fn run_inner(args: InitArgs) -> Result<(), String> {
    let project_path = args
        .project_path
        .clone()
        .unwrap_or_else(|| std::env::current_dir().unwrap_or_else(|_| PathBuf::from(".")));
    ensure_dir(&project_path)?;

    if let Some(existing) = CONFIG_FILENAMES
        .iter()
        .map(|name| project_path.join(name))
        .find(|path| path.exists())
    {
        return Err(format!("{} already exists", existing.display()));
    }

    let config = initial_config(&args)?;
    let config_path = project_path.join(CONFIG_FILENAMES[0]);
    config.write_new(&config_path).map_err(|e| e.to_string())?;
    debug!(path = %config_path.display(), "Wrote project config.");

    TypeScriptDriver::new(config.runtime.clone())
        .post_init(&project_path)
        .map_err(|e| e.to_string())?;

    println!(
        "{} {}",
        style("Created").green().bold(),
        config_path.display()
    );
    if config.sources.is_empty() {
        println!("Add a [[sources]] entry, then run `apigen generate`");
    } else {
        println!("Run `apigen generate` to compile it");
    }
    Ok(())
}

fn initial_config(args: &InitArgs) -> Result<ProjectConfig, String> {
    let mut config = ProjectConfig {
        output: args.output.clone(),
        ..ProjectConfig::default()
    };
    if let Some(input) = &args.input {
        let name = match &args.name {
            Some(name) => name.clone(),
            None => source_name_from(input)?,
        };
        config.sources.push(SourceConfig::new(name, input.clone()));
    }
    config.validate().map_err(|e| e.to_string())?;
    Ok(config)
}

fn source_name_from(input: &Path) -> Result<String, String> {
    input
        .file_stem()
        .and_then(|stem| stem.to_str())
        .filter(|stem| is_path_safe(stem))
        .map(str::to_string)
        .ok_or_else(|| {
            format!(
                "cannot derive a source name from {}; pass --name",
                input.display()
            )
        })
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;

    fn args(dir: &Path, input: Option<&str>) -> InitArgs {
        InitArgs {
            project_path: Some(dir.to_path_buf()),
            input: input.map(PathBuf::from),
            name: None,
            output: PathBuf::from(DEFAULT_OUTPUT_DIR),
        }
    }

    #[tokio::test]
    async fn test_init_writes_loadable_config() {
        let dir = tempfile::tempdir().unwrap();
        let project = dir.path().join("app");

        run_inner(args(&project, Some("specs/petstore.yaml")))
            .await
            .unwrap();

        let (_, config) = ProjectConfig::discover(&project).unwrap();
        assert_eq!(config.sources.len(), 1);
        assert_eq!(config.sources[0].name, "petstore");
        assert_eq!(config.sources[0].input, project.join("specs/petstore.yaml"));
        assert_eq!(config.output, project.join(DEFAULT_OUTPUT_DIR));
    }

    #[tokio::test]
    async fn test_init_refuses_existing_config() {
        let dir = tempfile::tempdir().unwrap();
        run_inner(args(dir.path(), None)).await.unwrap();

        let err = run_inner(args(dir.path(), None)).await.unwrap_err();
        assert!(err.contains("already exists"));
    }

    #[test]
    fn test_source_name_requires_safe_stem() {
        assert_eq!(
            source_name_from(Path::new("api/pet-store.json")).unwrap(),
            "pet-store"
        );
        assert!(source_name_from(Path::new("my api.yaml")).is_err());
    }
}
