use apigen_core::{SearchHit, SearchIndex};
use clap::Args;
use console::style;

use crate::common::ProjectArgs;
use crate::run_cli_async;

const DEFAULT_LIMIT: usize = 10;

#[derive(Args, Debug, Clone)]
pub struct SearchArgs {
    #[command(flatten)]
    pub project: ProjectArgs,
    #[arg(value_name = "QUERY", help = "Words to look for in operation ids, paths, tags and summaries")]
    pub query: String,
    #[arg(long = "limit", short = 'l', default_value_t = DEFAULT_LIMIT)]
    pub limit: usize,
    #[arg(long = "json", help = "Print hits as JSON")]
    pub json: bool,
}

pub async fn run(args: SearchArgs) -> i32 {
    run_cli_async(|| run_inner(args)).await
}

async fn run_inner(args: SearchArgs) -> Result<(), String> {
    let config = args.project.load()?;
    let mut index = SearchIndex::new();
    if index.init(&config.output) == 0 {
        return Err(format!(
            "No registry found under {}; run `apigen generate` first",
            config.output.display()
        ));
    }

    let hits = index
        .search(&args.query, args.limit)
        .map_err(|e| e.to_string())?;

    if args.json {
        let json = serde_json::to_string_pretty(&hits)
            .map_err(|e| format!("Failed to serialize hits: {e}"))?;
        println!("{json}");
    } else if hits.is_empty() {
        println!("No operations match '{}'", args.query);
    } else {
        for hit in &hits {
            println!("{}", format_hit(hit));
        }
    }
    Ok(())
}

fn format_hit(hit: &SearchHit) -> String {
    let line = format!(
        "{:>6.2}  {} {} {}  {}",
        hit.score,
        style(&hit.source).dim(),
        style(format!("{:<7}", hit.method.as_upper())).cyan(),
        hit.url,
        style(&hit.callable).bold(),
    );
    match &hit.summary {
        Some(summary) => format!("{line}  {}", style(summary).dim()),
        None => line,
    }
}
