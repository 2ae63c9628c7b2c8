//! Storefront load generator CLI

use clap::{Args, Parser, Subcommand};
use std::{path::PathBuf, time::Duration};
use storefront_bench::{
    runner::{p95_speedup, save_results, LoadRunner},
    LoadProfile, LoadTestSummary, Target,
};
use storefront_core::{Mode, WorkloadParams};
use tracing::Level;

#[derive(Parser)]
#[command(name = "storefront-bench")]
#[command(about = "Constant-arrival-rate load generator for the storefront demo API")]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Directory for JSON results and Markdown reports
    #[arg(short, long, global = true)]
    output: Option<PathBuf>,

    /// Print summaries as JSON instead of a table
    #[arg(long, global = true)]
    json: bool,

    /// Enable verbose logging
    #[arg(short, long, global = true)]
    verbose: bool,
}

#[derive(Subcommand)]
enum Commands {
    /// Load one mode of /api/public-heavy
    Run(RunArgs),

    /// Load `before`, then `after`, with identical settings
    Compare(LoadArgs),
}

#[derive(Args)]
struct RunArgs {
    /// Workload mode to request (before, after)
    #[arg(short, long, default_value = "before")]
    mode: String,

    #[command(flatten)]
    load: LoadArgs,
}

#[derive(Args)]
struct LoadArgs {
    /// Base URL of the deployment under test
    #[arg(long, env = "BASE_URL")]
    base_url: String,

    /// Workload size query parameter
    #[arg(long, default_value_t = 30_000)]
    size: usize,

    /// Workload rounds query parameter
    #[arg(long, default_value_t = 80)]
    rounds: usize,

    /// Iterations started per second
    #[arg(long, default_value_t = 10)]
    rate: u32,

    /// Test duration in seconds
    #[arg(long, default_value_t = 120)]
    duration: u64,

    /// Requests allowed in flight before iterations are dropped
    #[arg(long, default_value_t = 60)]
    max_in_flight: usize,

    /// Per-request timeout in seconds
    #[arg(long, default_value_t = 30)]
    timeout: u64,
}

impl LoadArgs {
    fn profile(&self) -> LoadProfile {
        LoadProfile {
            rate: self.rate,
            time_unit: Duration::from_secs(1),
            duration: Duration::from_secs(self.duration),
            max_in_flight: self.max_in_flight,
            request_timeout: Duration::from_secs(self.timeout),
        }
    }

    fn target(&self, mode: Mode) -> Target {
        Target::new(
            self.base_url.clone(),
            WorkloadParams::new(mode, self.size, self.rounds),
        )
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let log_level = if cli.verbose { Level::DEBUG } else { Level::INFO };
    tracing_subscriber::fmt().with_max_level(log_level).init();

    let summaries = match cli.command {
        Commands::Run(args) => {
            let mode = parse_mode(&args.mode)?;
            let runner = LoadRunner::new(args.load.profile())?;
            vec![runner.run(&args.load.target(mode)).await?]
        }
        Commands::Compare(args) => {
            let runner = LoadRunner::new(args.profile())?;
            let mut summaries = Vec::with_capacity(2);
            for mode in [Mode::Before, Mode::After] {
                summaries.push(runner.run(&args.target(mode)).await?);
            }
            summaries
        }
    };

    print_summaries(&summaries, cli.json)?;

    if let Some(output_dir) = cli.output {
        save_results(&output_dir, &summaries)?;
    }

    let failed: usize = summaries.iter().map(|s| s.failed).sum();
    if failed > 0 {
        anyhow::bail!("{} requests failed the status check", failed);
    }
    Ok(())
}

fn parse_mode(value: &str) -> anyhow::Result<Mode> {
    match value {
        "before" => Ok(Mode::Before),
        "after" => Ok(Mode::After),
        other => anyhow::bail!("Unknown mode: {} (expected before or after)", other),
    }
}

fn print_summaries(summaries: &[LoadTestSummary], json: bool) -> anyhow::Result<()> {
    if json {
        println!("{}", serde_json::to_string_pretty(summaries)?);
        return Ok(());
    }

    println!(
        "{:<36} {:>8} {:>8} {:>8} {:>8} {:>8} {:>10} {:>10} {:>10}",
        "Run", "Reqs", "Passed", "Failed", "Dropped", "Cached", "Mean", "p95", "Max"
    );
    for s in summaries {
        println!(
            "{:<36} {:>8} {:>8} {:>8} {:>8} {:>8} {:>8.1}ms {:>8.1}ms {:>8.1}ms",
            s.name, s.requests, s.succeeded, s.failed, s.dropped, s.cached, s.mean_ms, s.p95_ms, s.max_ms
        );
    }

    if let Some(speedup) = p95_speedup(summaries) {
        println!("\np95 before / after: {:.2}x", speedup);
    }
    Ok(())
}
