//! followloop - persisted follow/unfollow automation
//!
//! Main entry point for the followloop CLI.

mod app;
mod cli;
mod cmd_page;
mod cmd_store;

use std::path::PathBuf;

use clap::Parser;
use tracing_appender::rolling::{RollingFileAppender, Rotation};
use tracing_subscriber::{EnvFilter, fmt, layer::SubscriberExt, util::SubscriberInitExt};

use crate::app::App;
use crate::cli::{Cli, Commands};

/// Get the .followloop directory path.
fn followloop_dir() -> PathBuf {
    dirs::home_dir()
        .map(|h| h.join(".followloop"))
        .unwrap_or_else(|| PathBuf::from(".followloop"))
}

/// Initialize tracing with console and file output.
///
/// Log files are written to ~/.followloop/logs/ with daily rotation.
fn init_tracing() -> Result<(), Box<dyn std::error::Error>> {
    let log_dir = followloop_dir().join("logs");
    std::fs::create_dir_all(&log_dir)?;

    let file_appender = RollingFileAppender::builder()
        .rotation(Rotation::DAILY)
        .filename_prefix("followloop")
        .filename_suffix("log")
        .max_log_files(30)
        .build(&log_dir)?;

    let (non_blocking, guard) = tracing_appender::non_blocking(file_appender);

    // The writer flushes only while the guard lives.
    static GUARD: std::sync::OnceLock<tracing_appender::non_blocking::WorkerGuard> = std::sync::OnceLock::new();
    let _ = GUARD.set(guard);

    let env_filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));

    tracing_subscriber::registry()
        .with(env_filter)
        .with(fmt::layer().with_target(true).with_ansi(true).with_writer(std::io::stderr))
        .with(fmt::layer().with_writer(non_blocking).with_ansi(false))
        .init();

    Ok(())
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    init_tracing()?;

    let cli = Cli::parse();
    let app = App::load(cli.config.as_deref()).await?;

    match cli.command {
        Commands::Run { page, start } => cmd_page::run(&app, page.as_deref(), start).await,
        Commands::Start { page } => cmd_page::run(&app, page.as_deref(), true).await,
        Commands::Stop => cmd_store::stop(&app).await,
        Commands::Status { watch } => cmd_store::status(&app, watch).await,
        Commands::Queue { action } => cmd_store::queue(&app, action).await,
        Commands::History { active } => cmd_store::history(&app, active).await,
        Commands::Extract { page, max_scrolls } => cmd_page::extract(&app, page.as_deref(), max_scrolls).await,
        Commands::Settings { action } => cmd_store::settings(&app, action).await,
        Commands::Metrics => cmd_store::metrics(&app).await,
        Commands::Errors => cmd_store::errors(&app).await,
        Commands::Test { target, page, wait } => cmd_page::test(&app, page.as_deref(), &target, wait).await,
        Commands::Diagnose { page } => cmd_page::diagnose(&app, page.as_deref()).await,
        Commands::Init => cmd_store::init(&app).await,
    }
}
