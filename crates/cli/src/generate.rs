use std::time::Instant;

use apigen_core::RunReport;
use clap::Args;
use console::style;

use crate::common::{ProjectArgs, format_elapsed_ms, plural};
use crate::run_cli_async;

#[derive(Args, Debug, Clone)]
pub struct GenerateArgs {
    #[command(flatten)]
    pub project: ProjectArgs,
    #[arg(
        value_name = "SOURCE",
        help = "Sources to generate. Defaults to every enabled source"
    )]
    pub sources: Vec<String>,
}

pub async fn run(args: GenerateArgs) -> i32 {
    run_cli_async(|| run_inner(args)).await
}

async fn run_inner(args: GenerateArgs) -> Result<(), String> {
    let started = Instant::now();
    let pipeline = args.project.pipeline()?;
    let names = args.sources;

    let report = tokio::task::spawn_blocking(move || pipeline.generate(&names))
        .await
        .map_err(|e| format!("Generation task failed: {e}"))?
        .map_err(|e| e.to_string())?;

    print_report(&report);
    println!(
        "{} in {}",
        if report.is_ok() {
            style("Generated").green().bold()
        } else {
            style("Generated with errors").red().bold()
        },
        format_elapsed_ms(started)
    );

    if report.is_ok() {
        Ok(())
    } else if report.failures.is_empty() {
        Err("Some artifacts could not be written".to_string())
    } else {
        Err(format!(
            "{} failed",
            plural(report.failures.len(), "source")
        ))
    }
}

fn print_report(report: &RunReport) {
    for source in &report.sources {
        println!(
            "  {} {}: {}, {} written, {} unchanged, {} pruned",
            style("✓").green(),
            style(&source.name).bold(),
            plural(source.artifacts, "artifact"),
            source.dump.written.len(),
            source.dump.unchanged.len(),
            source.dump.pruned.len(),
        );
        for diagnostic in &source.diagnostics {
            let marker = if diagnostic.is_error() {
                style("error").red()
            } else {
                style("warning").yellow()
            };
            println!("    {marker}: {diagnostic}");
        }
        for (path, message) in &source.dump.failed {
            println!("    {}: {}: {message}", style("write failed").red(), path.display());
        }
    }
    for (path, message) in &report.global.failed {
        println!("  {}: {}: {message}", style("write failed").red(), path.display());
    }
    for (name, error) in &report.failures {
        println!("  {} {}: {error}", style("✗").red(), style(name).bold());
    }
}
