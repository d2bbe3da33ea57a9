mod cmd;
mod output;
mod root;

use clap::{Parser, Subcommand};
use cmd::metrics::MetricsSubcommand;
use cmd::run::RunArgs;
use std::path::PathBuf;

#[derive(Parser)]
#[command(
    name = "qa",
    about = "Three-layer quality gate pipeline: pre-commit checks, PR review ingestion, human sign-off",
    version,
    propagate_version = true
)]
struct Cli {
    /// Project root (default: auto-detect from .qa/ or .git/)
    #[arg(long, global = true, env = "QA_ROOT")]
    root: Option<PathBuf>,

    /// Output as JSON
    #[arg(long, global = true, short = 'j')]
    json: bool,

    /// Print sub-check details and full error chains
    #[arg(long, global = true, short = 'v')]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Initialize quality gates in the current project
    Init,

    /// Run the gate pipeline (or a single layer)
    Run {
        /// Run only this layer (1, 2, or 3)
        #[arg(long)]
        layer: Option<u8>,

        /// Story identifier the run is attributed to
        #[arg(long)]
        story: Option<String>,

        /// Continue to layer 2 even when layer 1 fails
        #[arg(long = "no-fail-fast")]
        no_fail_fast: bool,

        /// Write a markdown report under .qa/reports/
        #[arg(long)]
        save_report: bool,
    },

    /// Show the persisted pipeline status (read-only)
    Status,

    /// Record a human sign-off for a story
    Signoff {
        #[arg(long)]
        story: String,

        #[arg(long)]
        reviewer: String,
    },

    /// Record and inspect gate metrics
    Metrics {
        #[command(subcommand)]
        subcommand: MetricsSubcommand,
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
        .init();

    let root = root::resolve_root(cli.root.as_deref());

    let result = match cli.command {
        Commands::Init => cmd::init::run(&root).map(|()| 0),
        Commands::Run {
            layer,
            story,
            no_fail_fast,
            save_report,
        } => cmd::run::run(
            &root,
            &RunArgs {
                layer,
                story,
                no_fail_fast,
                save_report,
            },
            cli.json,
            cli.verbose,
        ),
        Commands::Status => cmd::status::run(&root, cli.json, cli.verbose).map(|()| 0),
        Commands::Signoff { story, reviewer } => {
            cmd::signoff::run(&root, &story, &reviewer, cli.json).map(|()| 0)
        }
        Commands::Metrics { subcommand } => cmd::metrics::run(&root, subcommand, cli.json),
    };

    match result {
        Ok(code) => std::process::exit(code),
        Err(e) => {
            if cli.verbose {
                // Full chain plus backtrace when available.
                eprintln!("❌ Error: {e:?}");
            } else {
                eprintln!("❌ Error: {e}");
            }
            std::process::exit(1);
        }
    }
}
