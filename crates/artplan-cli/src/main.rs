mod cmd;
mod output;

use clap::{Parser, Subcommand};
use cmd::config::ConfigSubcommand;
use std::path::PathBuf;

#[derive(Parser)]
#[command(
    name = "artplan",
    about = "PI planning for agile release trains: dependency analysis, WSJF scoring and iteration allocation",
    version,
    propagate_version = true
)]
struct Cli {
    /// Planner config file (default: nearest artplan.yaml, else built-in defaults)
    #[arg(long, global = true, env = "ARTPLAN_CONFIG")]
    config: Option<PathBuf>,

    /// Output as JSON
    #[arg(long, global = true, short = 'j')]
    json: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Plan a program increment: order, allocate and assess readiness
    Plan {
        /// Input file with programIncrement, workItems, dependencies and teams
        input: PathBuf,
    },

    /// Rank stories by WSJF
    Score {
        /// Input file with a stories list
        input: PathBuf,
    },

    /// Validate a dependency graph and show its critical path
    Graph {
        /// Input file with workItems and dependencies
        input: PathBuf,
    },

    /// Show the iteration structure and team capacity of a program increment
    Iterations {
        /// Input file with programIncrement and teams
        input: PathBuf,
    },

    /// Inspect and validate the planner configuration
    Config {
        #[command(subcommand)]
        subcommand: ConfigSubcommand,
    },
}

fn main() {
    let cli = Cli::parse();

    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive(tracing::Level::WARN.into()),
        )
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();

    let config = cli.config.as_deref();
    let result = match cli.command {
        Commands::Plan { input } => cmd::plan::run(&input, config, cli.json),
        Commands::Score { input } => cmd::score::run(&input, config, cli.json),
        Commands::Graph { input } => cmd::graph::run(&input, config, cli.json),
        Commands::Iterations { input } => cmd::iterations::run(&input, config, cli.json),
        Commands::Config { subcommand } => cmd::config::run(config, subcommand, cli.json),
    };

    if let Err(e) = result {
        // Print the full error chain (anyhow's alternate Display)
        eprintln!("error: {e:#}");
        std::process::exit(1);
    }
}
