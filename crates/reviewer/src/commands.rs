//! reviewer command implementations

use anyhow::{Context, Result};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

use reviewer_agent::tools::list_source_files;
use reviewer_agent::{CancellationToken, ChannelReporter, Coordinator, LoopSettings, ReportEvent};
use reviewer_config::{self, Config, ProviderKind};
use reviewer_provider::{GeminiProvider, OpenAiProvider, Provider};

const MISSING_KEY: &str = "No API key configured. Set provider.api_key in ~/.reviewer/config.json, \
                           pass --api-key, or export REVIEWER_API_KEY";

/// Flags of the `review` command
pub struct ReviewOptions {
    pub path: PathBuf,
    pub api_key: Option<String>,
    pub model: Option<String>,
    pub max_rounds: Option<u32>,
    pub json: bool,
}

async fn load_config(path: Option<&Path>) -> Result<Config> {
    match path {
        Some(path) => Config::load_explicit(path)
            .await
            .with_context(|| format!("Failed to load config from {}", path.display())),
        None => Config::load().await.context("Failed to load config"),
    }
}

/// Command-line key first, then the config file
fn resolve_api_key(flag: Option<&str>, config: &Config) -> Option<String> {
    flag.map(str::trim)
        .filter(|key| !key.is_empty())
        .map(str::to_string)
        .or_else(|| config.api_key())
}

fn build_provider(config: &Config, api_key: String) -> Arc<dyn Provider> {
    let model = Some(config.model()).filter(|m| !m.is_empty());
    match config.provider.kind {
        ProviderKind::Gemini => Arc::new(GeminiProvider::new(api_key, config.api_base(), model)),
        ProviderKind::OpenAi => Arc::new(OpenAiProvider::new(api_key, config.api_base(), model)),
    }
}

fn print_event(event: &ReportEvent, to_stderr: bool) {
    let glyph = match event {
        ReportEvent::FileWritten { .. } | ReportEvent::Verdict { .. } => "✓",
        ReportEvent::FileSkipped { .. } | ReportEvent::RunFailed { .. } => "✗",
        _ => "◆",
    };
    if to_stderr {
        eprintln!("{} {}", glyph, event);
    } else {
        println!("{} {}", glyph, event);
    }
}

/// Drain reporter events into the terminal until every sender is gone
fn spawn_printer(mut rx: mpsc::UnboundedReceiver<ReportEvent>, to_stderr: bool) -> JoinHandle<()> {
    tokio::spawn(async move {
        while let Some(event) = rx.recv().await {
            print_event(&event, to_stderr);
        }
    })
}

/// Review every source file under a directory
pub async fn review_command(options: ReviewOptions, config_path: Option<&Path>) -> Result<()> {
    let mut config = load_config(config_path).await?;
    if let Some(model) = options.model {
        config.provider.model = model;
    }
    if let Some(max_rounds) = options.max_rounds {
        config.review.max_rounds = max_rounds;
    }

    let api_key = resolve_api_key(options.api_key.as_deref(), &config).context(MISSING_KEY)?;
    let provider = build_provider(&config, api_key);
    let settings = LoopSettings::from_config(&config);
    debug!("Loop settings: {:?}", settings);

    let coordinator = Coordinator::new(provider, settings);
    let cancel = CancellationToken::new();

    let interrupt = {
        let cancel = cancel.clone();
        tokio::spawn(async move {
            if tokio::signal::ctrl_c().await.is_ok() {
                warn!("Interrupted, stopping after the current step");
                cancel.cancel();
            }
        })
    };

    let (reporter, rx) = ChannelReporter::channel();
    let printer = spawn_printer(rx, options.json);

    info!("Reviewing {}", options.path.display());
    let result = coordinator.run(&options.path, &reporter, &cancel).await;

    drop(reporter);
    interrupt.abort();
    if let Err(e) = printer.await {
        warn!("Progress printer stopped: {}", e);
    }

    let summary = result.context("Review failed")?;

    if options.json {
        println!("{}", serde_json::to_string_pretty(&summary)?);
    } else if summary.cancelled {
        println!("✗ Code review cancelled");
    } else {
        println!("✓ Code review completed");
    }

    Ok(())
}

/// Dry run: print what a review would visit
pub async fn files_command(path: &Path) -> Result<()> {
    let root = tokio::fs::canonicalize(path)
        .await
        .with_context(|| format!("Cannot open {}", path.display()))?;
    let files = list_source_files(&root)
        .await
        .with_context(|| format!("Failed to list files under {}", root.display()))?;

    if files.is_empty() {
        println!("No reviewable files found in {}", root.display());
        return Ok(());
    }

    for file in &files {
        let shown = file.strip_prefix(&root).unwrap_or(file);
        println!("  {}", shown.display());
    }
    println!("{} files", files.len());

    Ok(())
}

/// Initialize config
pub async fn init_command(config_path: Option<&Path>) -> Result<()> {
    println!("◆ Initializing reviewer...");
    println!("━━━━━━━━━━━━━━━━━━━━━━━━━━━");

    let path = config_path
        .map(Path::to_path_buf)
        .unwrap_or_else(reviewer_config::config_path);
    reviewer_config::init_at(&path)
        .await
        .with_context(|| format!("Failed to write config to {}", path.display()))?;

    println!("Config: {}", path.display());
    println!("\nNext steps:");
    println!("  1. Add your API key to {}", path.display());
    println!("     or export REVIEWER_API_KEY");
    println!("  2. Review a project: reviewer review ./my-site");

    Ok(())
}

/// Show configuration status
pub async fn status_command(config_path: Option<&Path>) -> Result<()> {
    let path = config_path
        .map(Path::to_path_buf)
        .unwrap_or_else(reviewer_config::config_path);

    println!("◆ Reviewer Status");
    println!("━━━━━━━━━━━━━━━━━━━━━━━━━━━");
    println!(
        "Config:    {} {}",
        path.display(),
        if path.exists() { "[OK]" } else { "[Missing]" }
    );

    let config = Config::load_from(&path)
        .await
        .with_context(|| format!("Failed to load config from {}", path.display()))?;
    let env_key = std::env::var("REVIEWER_API_KEY").ok();

    println!("Provider:  {}", config.provider.kind);
    let model = config.model();
    println!(
        "Model:     {}",
        if model.is_empty() { "(provider default)" } else { model.as_str() }
    );
    println!(
        "API Key:   {}",
        if resolve_api_key(env_key.as_deref(), &config).is_some() {
            "[Set]"
        } else {
            "[Missing]"
        }
    );
    println!(
        "Limits:    {} rounds/file, {}s/request",
        config.review.max_rounds, config.review.request_timeout_secs
    );

    Ok(())
}
