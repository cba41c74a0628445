use apigen_core::{Drift, check_project};
use clap::Args;
use console::style;

use crate::common::{ProjectArgs, plural};
use crate::run_cli_async;

#[derive(Args, Debug, Clone)]
pub struct CheckArgs {
    #[command(flatten)]
    pub project: ProjectArgs,
    #[arg(
        value_name = "SOURCE",
        help = "Sources to check. Defaults to every enabled source"
    )]
    pub sources: Vec<String>,
    #[arg(long = "quiet", short = 'q', help = "List drifted files without diffs")]
    pub quiet: bool,
}

pub async fn run(args: CheckArgs) -> i32 {
    run_cli_async(|| run_inner(args)).await
}

async fn run_inner(args: CheckArgs) -> Result<(), String> {
    let pipeline = args.project.pipeline()?;
    let names = args.sources;
    let results = tokio::task::spawn_blocking(move || check_project(&pipeline, &names))
        .await
        .map_err(|e| format!("Check task failed: {e}"))?
        .map_err(|e| e.to_string())?;

    let mut drifted = 0;
    for (source, drifts) in &results {
        for drift in drifts {
            drifted += 1;
            print_drift(source, drift, args.quiet);
        }
    }

    if drifted == 0 {
        println!("{}", style("Generated files are up to date").green());
        Ok(())
    } else {
        Err(format!(
            "{} out of date; run `apigen generate`",
            plural(drifted, "file")
        ))
    }
}

fn print_drift(source: &str, drift: &Drift, quiet: bool) {
    let (label, path) = match drift {
        Drift::Missing(path) => (style("missing").yellow(), path),
        Drift::Changed { path, .. } => (style("changed").red(), path),
        Drift::Stale(path) => (style("stale").yellow(), path),
    };
    println!("{label} [{source}] {}", path.display());

    if let Drift::Changed { diff, .. } = drift
        && !quiet
    {
        for line in diff.lines() {
            let styled = if line.starts_with("+++") || line.starts_with("---") {
                style(line).bold()
            } else if line.starts_with('+') {
                style(line).green()
            } else if line.starts_with('-') {
                style(line).red()
            } else if line.starts_with("@@") {
                style(line).cyan()
            } else {
                style(line)
            };
            println!("{styled}");
        }
    }
}
