//! reviewer - automated code review for web projects

use clap::{Parser, Subcommand};
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;

mod commands;

use commands::{files_command, init_command, review_command, status_command, ReviewOptions};

/// reviewer - let a model review and fix your source files
#[derive(Parser)]
#[command(name = "reviewer")]
#[command(about = "◆ Automated code review for web projects")]
#[command(version = env!("CARGO_PKG_VERSION"))]
struct Cli {
    /// Config file to use instead of ~/.reviewer/config.json
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Verbose logging
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Review and fix every source file under a directory
    Review {
        /// Project directory
        #[arg(default_value = ".")]
        path: PathBuf,
        /// API key, overrides the config file
        #[arg(long, env = "REVIEWER_API_KEY", hide_env_values = true)]
        api_key: Option<String>,
        /// Model name, overrides the config file
        #[arg(short, long)]
        model: Option<String>,
        /// Maximum model rounds per file
        #[arg(long, value_parser = clap::value_parser!(u32).range(1..))]
        max_rounds: Option<u32>,
        /// Print the run summary as JSON
        #[arg(long)]
        json: bool,
    },
    /// List the files a review would visit
    Files {
        /// Project directory
        #[arg(default_value = ".")]
        path: PathBuf,
    },
    /// Initialize config
    Init,
    /// Show configuration status
    Status,
}

fn init_tracing(verbose: bool) {
    let default = if verbose { "debug" } else { "warn" };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

#[tokio::main]
async fn main() {
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    let config = cli.config;
    let result = match cli.command {
        Commands::Review {
            path,
            api_key,
            model,
            max_rounds,
            json,
        } => {
            let options = ReviewOptions {
                path,
                api_key,
                model,
                max_rounds,
                json,
            };
            review_command(options, config.as_deref()).await
        }
        Commands::Files { path } => files_command(&path).await,
        Commands::Init => init_command(config.as_deref()).await,
        Commands::Status => status_command(config.as_deref()).await,
    };

    if let Err(e) = result {
        eprintln!("✗ {:#}", e);
        std::process::exit(1);
    }
}
