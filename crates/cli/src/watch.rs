use apigen_core::watch;
use clap::Args;
use console::style;
use tokio::sync::broadcast;
use tracing::debug;

use crate::common::ProjectArgs;
use crate::run_cli_async;

#[derive(Args, Debug, Clone)]
pub struct WatchArgs {
    #[command(flatten)]
    pub project: ProjectArgs,
    #[arg(
        value_name = "SOURCE",
        help = "Sources to watch. Defaults to every enabled source"
    )]
    pub sources: Vec<String>,
}

pub async fn run(args: WatchArgs) -> i32 {
    run_cli_async(|| run_inner(args)).await
}

async fn run_inner(args: WatchArgs) -> Result<(), String> {
    let pipeline = args.project.pipeline()?;
    let (shutdown_tx, shutdown_rx) = broadcast::channel(1);

    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            debug!("Received Ctrl+C, stopping watch.");
            let _ = shutdown_tx.send(());
        }
    });

    println!(
        "{} {} (Ctrl+C to stop)",
        style("Watching").cyan().bold(),
        pipeline.config().output.display()
    );
    watch(&pipeline, &args.sources, shutdown_rx)
        .await
        .map_err(|e| e.to_string())?;
    println!("Stopped watching");
    Ok(())
}
