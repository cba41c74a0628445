//! Command surface of the `apigen` binary.
//!
//! Every command is `run(args) -> i32`: the body returns
//! `Result<(), String>` and [`run_cli_async`] prints the error and maps it
//! to an exit code.

pub mod check;
pub mod common;
pub mod generate;
pub mod init;
pub mod search;
pub mod watch;

use clap::{CommandFactory, Parser, Subcommand};

#[derive(Parser, Debug)]
#[command(name = "apigen", version, about = "OpenAPI to TypeScript artifact compiler")]
pub struct Cli {
    /// Log at debug level unless RUST_LOG is set
    #[arg(long, short = 'v', global = true)]
    pub verbose: bool,
    #[command(subcommand)]
    pub command: Option<Commands>,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Write a new apigen.toml
    Init(init::InitArgs),
    /// Compile every configured source into the output directory
    Generate(generate::GenerateArgs),
    /// Fail if the output directory differs from a fresh generation
    Check(check::CheckArgs),
    /// Regenerate whenever a source document changes
    Watch(watch::WatchArgs),
    /// Find operations in the generated registries
    Search(search::SearchArgs),
}

pub async fn run_cli_async<F, Fut>(f: F) -> i32
where
    F: FnOnce() -> Fut,
    Fut: std::future::Future<Output = Result<(), String>>,
{
    match f().await {
        Ok(()) => 0,
        Err(err) => {
            eprintln!("{} {err}", console::style("error:").red().bold());
            1
        }
    }
}

/// Run a parsed command line on a fresh tokio runtime.
pub fn run(cli: Cli) -> i32 {
    let runtime = match tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()
    {
        Ok(runtime) => runtime,
        Err(err) => {
            eprintln!("Failed to create tokio runtime: {err}");
            return 1;
        }
    };

    runtime.block_on(run_command(cli.command))
}

async fn run_command(command: Option<Commands>) -> i32 {
    match command {
        Some(Commands::Init(args)) => init::run(args).await,
        Some(Commands::Generate(args)) => generate::run(args).await,
        Some(Commands::Check(args)) => check::run(args).await,
        Some(Commands::Watch(args)) => watch::run(args).await,
        Some(Commands::Search(args)) => search::run(args).await,
        None => {
            let mut cmd = Cli::command();
            let _ = cmd.print_help();
            println!();
            0
        }
    }
}
