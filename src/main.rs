mod app;
mod auth;
mod backend;
mod cache;
mod cli;
mod commands;
mod config;
mod context;
mod data;
mod error;
mod event;
mod model;
mod projects;
mod query;
mod routes;
#[cfg(test)]
mod testutil;
mod ui;

use clap::Parser;
use color_eyre::Result;
use std::path::PathBuf;
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use crate::cli::Command;
use crate::routes::Route;

#[derive(Parser, Debug)]
#[command(name = "chatdeck")]
#[command(about = "A terminal client for chatbot projects and their knowledge base")]
#[command(version)]
struct Args {
  /// Path to config file (default: $XDG_CONFIG_HOME/chatdeck/config.yaml)
  #[arg(short, long)]
  config: Option<PathBuf>,

  #[command(subcommand)]
  command: Option<Command>,
}

/// Log to a daily file; the terminal belongs to the UI.
fn init_tracing() -> Result<WorkerGuard> {
  let log_dir = config::Config::log_dir()?;
  std::fs::create_dir_all(&log_dir)
    .map_err(|e| color_eyre::eyre::eyre!("Failed to create log directory: {}", e))?;
  let appender = tracing_appender::rolling::daily(log_dir, "chatdeck.log");
  let (writer, guard) = tracing_appender::non_blocking(appender);

  tracing_subscriber::registry()
    .with(EnvFilter::try_from_env("CHATDECK_LOG").unwrap_or_else(|_| "chatdeck=info".into()))
    .with(fmt::layer().with_writer(writer).with_ansi(false))
    .init();

  Ok(guard)
}

#[tokio::main]
async fn main() -> Result<()> {
  color_eyre::install()?;

  let args = Args::parse();
  let _guard = init_tracing()?;

  // Load configuration
  let config = config::Config::load(args.config.as_deref())?;

  match args.command.unwrap_or(Command::Tui { path: None }) {
    Command::Tui { path } => {
      let route = Route::parse(path.as_deref().unwrap_or("/admin/projects"));
      let ctx = context::Context::connect(config).await?;
      let mut app = app::App::new(ctx, route);
      app.run().await?;
    }
    command => cli::run(command, config).await?,
  }

  Ok(())
}
