//! apigen: OpenAPI to TypeScript artifact compiler.

use std::process::ExitCode;

use apigen_cli::Cli;
use clap::Parser;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

fn main() -> ExitCode {
    let cli = Cli::parse();

    let default_filter = if cli.verbose { "apigen=debug" } else { "apigen=info" };
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| default_filter.into()),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    let code = apigen_cli::run(cli);
    ExitCode::from(u8::try_from(code).unwrap_or(1))
}
