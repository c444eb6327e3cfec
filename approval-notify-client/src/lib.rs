use tracing::{info, warn};
use tracing_appender::non_blocking::WorkerGuard;
use tracing_appender::rolling::{RollingFileAppender, Rotation};
use tracing_subscriber::prelude::*;
use tracing_subscriber::{EnvFilter, fmt};

pub mod admin;
pub mod alert;
pub mod app;
pub mod badge;
pub mod cli;
pub mod commands;
pub mod config;
pub mod fetch;
pub mod geometry;
pub mod platform;
pub mod settings;

pub use cli::{Cli, Command};
pub use config::{ClientConfig, load_config, resolve_config_path};

use app::ui::Exit;
use settings::SettingsError;

#[derive(Debug, thiserror::Error)]
pub enum AppError {
    #[error("config error: {0}")]
    Config(String),
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
    #[error("settings error: {0}")]
    Settings(#[from] SettingsError),
    #[error("platform error: {0}")]
    Platform(String),
}

/// Compact stderr output plus a daily log file under the data directory.
/// The returned guard flushes the file writer; keep it alive until exit.
fn init_tracing() -> Option<WorkerGuard> {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    let stderr = fmt::layer()
        .with_writer(std::io::stderr)
        .with_target(false)
        .compact();

    let mut file_err = None;
    let (file, guard) = match log_dir().map(|dir| {
        RollingFileAppender::builder()
            .rotation(Rotation::DAILY)
            .filename_prefix("approval-notify")
            .filename_suffix("log")
            .build(dir)
    }) {
        Some(Ok(appender)) => {
            let (writer, guard) = tracing_appender::non_blocking(appender);
            let layer = fmt::layer()
                .with_writer(writer)
                .with_ansi(false)
                .with_target(false);
            (Some(layer), Some(guard))
        }
        Some(Err(e)) => {
            file_err = Some(e);
            (None, None)
        }
        None => (None, None),
    };

    let _ = tracing_subscriber::registry()
        .with(filter)
        .with(stderr)
        .with(file)
        .try_init();
    if let Some(e) = file_err {
        warn!(error=%e, "file logging unavailable; logging to stderr only");
    }
    guard
}

fn log_dir() -> Option<std::path::PathBuf> {
    Some(config::project_dirs()?.data_local_dir().join("logs"))
}

pub async fn run(cli: Cli) -> Result<(), AppError> {
    let guard = init_tracing();

    match cli.command.unwrap_or(Command::Run) {
        Command::Run => {}
        Command::HashSecret => return commands::hash_secret(),
        cmd => {
            let ctx = commands::Context::load(cli.config, cli.settings, cli.debug)?;
            return match cmd {
                Command::Check => commands::check(&ctx).await,
                Command::Open => commands::open(&ctx),
                Command::Settings => commands::show_settings(&ctx),
                Command::Run | Command::HashSecret => Ok(()),
            };
        }
    }

    let plat = platform::detect();
    let opts = app::AgentOptions {
        config: cli.config,
        settings: cli.settings,
        debug: cli.debug,
    };
    let exit = app::run(opts, plat.clone()).await;

    // Stdin is read on a blocking thread the runtime cannot cancel, so leave
    // through the process rather than by returning from main.
    info!(?exit, "leaving");
    drop(guard);
    match exit {
        Exit::Quit => std::process::exit(0),
        Exit::Restart => plat.restart(),
    }
}
