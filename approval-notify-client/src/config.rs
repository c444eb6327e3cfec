use std::path::{Path, PathBuf};
use std::time::Duration;

use approval_notify_shared::{ApprovalCounts, UserId};
use directories::ProjectDirs;
use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use crate::AppError;

pub const ENV_CONFIG: &str = "APPROVAL_NOTIFY_CONFIG";
pub const SETTINGS_FILE_NAME: &str = "approval-notify-setting.json";

/// Deployment constants. Everything a user may change at runtime lives in
/// [`crate::settings::Settings`] instead.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ClientConfig {
    pub api_base_url: String,
    pub approval_page_url: String,
    pub fetch_timeout_secs: u64,
    /// Hex SHA-256 of the admin secret. `None` keeps the settings editor locked.
    pub admin_secret_sha256: Option<String>,
    pub settings_path: Option<PathBuf>,
    pub defaults: DefaultsConfig,
    pub geometry: GeometryConfig,
    pub debug: DebugConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct DefaultsConfig {
    pub user_id: i64,
    pub refresh_interval_secs: u64,
    pub size: u32,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
#[serde(default)]
pub struct GeometryConfig {
    pub min_size: u32,
    pub max_size: u32,
    pub step: u32,
    pub margin_x: i32,
    pub margin_y: i32,
    pub screen_width: i32,
    pub screen_height: i32,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct DebugConfig {
    pub enabled: bool,
    pub refresh_interval_secs: u64,
    pub latency_ms: u64,
    pub fixture: approval_notify_shared::api::ApprovalRequestsDto,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            api_base_url: "https://akioka.cloud".into(),
            approval_page_url: "https://akioka.cloud/accept/order-request".into(),
            fetch_timeout_secs: 10,
            admin_secret_sha256: None,
            settings_path: None,
            defaults: DefaultsConfig::default(),
            geometry: GeometryConfig::default(),
            debug: DebugConfig::default(),
        }
    }
}

impl Default for DefaultsConfig {
    fn default() -> Self {
        Self {
            user_id: 2,
            refresh_interval_secs: 60,
            size: 120,
        }
    }
}

impl Default for GeometryConfig {
    fn default() -> Self {
        Self {
            min_size: 80,
            max_size: 300,
            step: 10,
            margin_x: 40,
            margin_y: 80,
            screen_width: 1920,
            screen_height: 1080,
        }
    }
}

impl Default for DebugConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            refresh_interval_secs: 10,
            latency_ms: 1000,
            fixture: ApprovalCounts::new(14, 8, 2).into(),
        }
    }
}

impl ClientConfig {
    /// Resolve the config path and load it. A missing file is not an error:
    /// the built-in defaults are used.
    pub fn find_and_load(cli_value: Option<PathBuf>) -> Result<(PathBuf, Self), AppError> {
        let path = resolve_config_path(cli_value)?;
        if !path.exists() {
            info!(path=?path, "config file not found; using built-in defaults");
            return Ok((path, Self::default()));
        }
        let cfg = load_config(&path)?;
        Ok((path, cfg))
    }

    /// Like [`ClientConfig::find_and_load`] but never fails; used by the
    /// resident agent which must keep running on a broken config.
    pub fn find_and_load_or_default(cli_value: Option<PathBuf>) -> (Option<PathBuf>, Self) {
        match Self::find_and_load(cli_value) {
            Ok((p, cfg)) => (Some(p), cfg),
            Err(e) => {
                warn!(error=%e, "config unusable; continuing with built-in defaults");
                (None, Self::default())
            }
        }
    }

    pub fn fetch_timeout(&self) -> Duration {
        Duration::from_secs(self.fetch_timeout_secs.max(1))
    }

    pub fn default_user(&self) -> UserId {
        UserId(self.defaults.user_id)
    }

    pub fn resolve_settings_path(&self, cli_value: Option<PathBuf>) -> Result<PathBuf, AppError> {
        if let Some(p) = cli_value.or_else(|| self.settings_path.clone()) {
            return Ok(p);
        }
        project_dirs()
            .map(|pd| pd.config_dir().join(SETTINGS_FILE_NAME))
            .ok_or_else(|| AppError::Config("could not determine config dir".into()))
    }
}

impl GeometryConfig {
    /// Bounds with `min_size <= max_size` and a non-zero step, whatever the
    /// file said.
    pub fn normalized(self) -> Self {
        let (min_size, max_size) = if self.min_size <= self.max_size {
            (self.min_size, self.max_size)
        } else {
            (self.max_size, self.min_size)
        };
        Self {
            min_size,
            max_size,
            step: self.step.max(1),
            ..self
        }
    }
}

pub fn project_dirs() -> Option<ProjectDirs> {
    ProjectDirs::from("cloud", "akioka", "approval-notify")
}

pub fn resolve_config_path(cli_value: Option<PathBuf>) -> Result<PathBuf, AppError> {
    if let Some(p) = cli_value {
        return Ok(p);
    }
    if let Ok(p) = std::env::var(ENV_CONFIG) {
        return Ok(PathBuf::from(p));
    }
    default_config_path().ok_or_else(|| AppError::Config("could not determine config dir".into()))
}

pub fn default_config_path() -> Option<PathBuf> {
    Some(project_dirs()?.config_dir().join("client.yaml"))
}

pub fn load_config(path: &Path) -> Result<ClientConfig, AppError> {
    let data = std::fs::read_to_string(path)
        .map_err(|e| AppError::Config(format!("read {} failed: {e}", path.display())))?;
    let cfg: ClientConfig = serde_yaml::from_str(&data)
        .map_err(|e| AppError::Config(format!("parse {} failed: {e}", path.display())))?;
    Ok(cfg)
}

pub fn normalize_base_url(input: &str) -> String {
    let trimmed = input.trim();
    if trimmed.starts_with("http://") || trimmed.starts_with("https://") {
        trimmed.trim_end_matches('/').to_string()
    } else {
        format!("https://{}", trimmed.trim_end_matches('/'))
    }
}
