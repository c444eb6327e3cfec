//! The resident agent: UI context, monitor task, control surface and
//! signal handling wired together.

pub mod control;
pub mod monitor;
pub mod ui;

use std::path::PathBuf;
use std::sync::Arc;

use tokio::io::BufReader;
use tracing::{info, warn};

use crate::admin::AdminGate;
use crate::config::{ClientConfig, SETTINGS_FILE_NAME};
use crate::fetch;
use crate::platform::Platform;
use crate::settings::{Settings, SettingsStore};
use ui::{Exit, TrayAction, UiContext, UiEvent, UiHandle, UiOptions};

#[derive(Debug, Clone, Default)]
pub struct AgentOptions {
    pub config: Option<PathBuf>,
    pub settings: Option<PathBuf>,
    pub debug: bool,
}

/// Run the agent until the user (or a signal) asks it to quit or restart.
///
/// Never fails on a bad config or settings file: the indicator comes up on
/// built-in defaults and says so in the log.
pub async fn run(opts: AgentOptions, platform: Arc<dyn Platform>) -> Exit {
    let (cfg_path, mut cfg) = ClientConfig::find_and_load_or_default(opts.config);
    if let Some(p) = &cfg_path {
        info!(path=?p, "config resolved");
    }
    if opts.debug {
        cfg.debug.enabled = true;
    }
    if cfg.debug.enabled {
        info!(
            interval_secs = cfg.debug.refresh_interval_secs,
            "debug mode: fixture counts, no network"
        );
    }

    let settings_path = cfg
        .resolve_settings_path(opts.settings)
        .unwrap_or_else(|e| {
            warn!(error=%e, "falling back to settings file in the working directory");
            PathBuf::from(SETTINGS_FILE_NAME)
        });
    info!(path=?settings_path, "settings file");
    let store = SettingsStore::new(settings_path, Settings::defaults_from(&cfg));

    let admin = AdminGate::new(cfg.admin_secret_sha256.as_deref());
    if !admin.is_configured() {
        info!("no admin secret configured; settings editor is locked");
    }

    let (ui, rx) = ui::channel();
    let ctx = UiContext::new(
        UiOptions::from_config(&cfg),
        store,
        platform,
        fetch::source_from_config(&cfg),
        admin,
        ui.clone(),
    );

    let control = tokio::spawn(control::run(BufReader::new(tokio::io::stdin()), ui.clone()));
    let signals = tokio::spawn(quit_on_signal(ui));

    let exit = ctx.run(rx).await;
    control.abort();
    signals.abort();
    info!(?exit, "agent stopped");
    exit
}

async fn quit_on_signal(ui: UiHandle) {
    shutdown_signal().await;
    ui.post(UiEvent::Tray(TrayAction::Quit));
}

async fn shutdown_signal() {
    #[cfg(unix)]
    {
        use tokio::signal::unix::{SignalKind, signal};
        let (mut sigint, mut sigterm) =
            match (signal(SignalKind::interrupt()), signal(SignalKind::terminate())) {
                (Ok(i), Ok(t)) => (i, t),
                (Err(e), _) | (_, Err(e)) => {
                    warn!(
                        error = %e,
                        "cannot listen for termination signals; falling back to Ctrl+C"
                    );
                    let _ = tokio::signal::ctrl_c().await;
                    info!("shutdown: received Ctrl+C");
                    return;
                }
            };
        tokio::select! {
            _ = sigint.recv() => {
                info!("shutdown: received SIGINT");
            }
            _ = sigterm.recv() => {
                info!("shutdown: received SIGTERM");
            }
        }
    }
    #[cfg(not(unix))]
    {
        let _ = tokio::signal::ctrl_c().await;
        info!("shutdown: received Ctrl+C");
    }
}
