mod cli;
mod shell;

use std::sync::Arc;

use anyhow::Context;
use clap::Parser;
use tracing::info;
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::EnvFilter;

use cli::{Cli, Commands};
use pocketchat::app::{AppConfig, AppState};
use pocketchat::platform::AppPaths;

fn init_logging(paths: &AppPaths, config: &AppConfig, debug: bool) -> anyhow::Result<Option<WorkerGuard>> {
    let level = if debug { "debug" } else { config.logging.level.as_str() };
    let filter = EnvFilter::from_default_env().add_directive(
        format!("pocketchat={}", level)
            .parse()
            .context("invalid log level")?,
    );

    // The shell owns stdout, so logs go to a file unless disabled.
    if config.logging.log_to_file {
        let appender = tracing_appender::rolling::daily(paths.logs_dir(), "pocketchat.log");
        let (writer, guard) = tracing_appender::non_blocking(appender);
        tracing_subscriber::fmt()
            .with_env_filter(filter)
            .with_writer(writer)
            .with_ansi(false)
            .init();
        Ok(Some(guard))
    } else {
        tracing_subscriber::fmt()
            .with_env_filter(filter)
            .with_writer(std::io::stderr)
            .init();
        Ok(None)
    }
}

async fn print_profile(state: &AppState) {
    match state.auth().restore().await.profile() {
        Some(profile) => println!("{}", shell::render::render_profile(profile)),
        None => println!("Not signed in."),
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let paths = match &cli.data_dir {
        Some(dir) => AppPaths::with_root(dir),
        None => AppPaths::new()?,
    };
    paths.ensure_dirs_exist()?;

    let config = match &cli.config {
        Some(file) => AppConfig::load_from(file).await?,
        None => AppConfig::load(&paths).await?,
    };

    let _log_guard = init_logging(&paths, &config, cli.debug)?;
    info!("Starting PocketChat {}", env!("CARGO_PKG_VERSION"));

    let state = Arc::new(AppState::new(config, paths).await?);

    let result = match cli.command.unwrap_or(Commands::Chat) {
        Commands::Chat => shell::Shell::new(state.clone()).run().await,
        Commands::Profile => {
            print_profile(&state).await;
            Ok(())
        }
        Commands::Logout => state.auth().logout().await.map(|()| println!("Signed out.")),
    };

    state.shutdown();
    info!("PocketChat exiting");
    Ok(result?)
}
