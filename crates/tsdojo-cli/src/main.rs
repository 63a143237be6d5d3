//! tsdojo CLI: judge a submission against a lesson suite.

use std::path::PathBuf;
use std::process;

use clap::{Parser, Subcommand, ValueEnum};
use tracing_subscriber::EnvFilter;

mod commands;

#[derive(Parser)]
#[command(name = "tsdojo", version, about = "TypeScript exercise evaluation engine")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run a suite against a submission
    Run {
        /// Path to the submission (.ts)
        #[arg(long)]
        code: PathBuf,

        /// Path to the suite (.json or .toml)
        #[arg(long)]
        suite: PathBuf,

        /// Output format
        #[arg(long, value_enum, default_value_t = Format::Text)]
        format: Format,

        /// Runner config file (TOML)
        #[arg(long)]
        config: Option<PathBuf>,

        /// Override the per-case step budget
        #[arg(long)]
        case_step_limit: Option<u64>,
    },

    /// Parse a submission and list its exports
    Check {
        /// Path to the submission (.ts)
        #[arg(long)]
        code: PathBuf,
    },
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, ValueEnum)]
pub enum Format {
    Text,
    Json,
}

fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("tsdojo=info")),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();

    let result = match cli.command {
        Commands::Run {
            code,
            suite,
            format,
            config,
            case_step_limit,
        } => commands::run::execute(code, suite, format, config, case_step_limit),
        Commands::Check { code } => commands::check::execute(code),
    };

    match result {
        Ok(true) => {}
        Ok(false) => process::exit(1),
        Err(e) => {
            eprintln!("Error: {e:#}");
            process::exit(2);
        }
    }
}
