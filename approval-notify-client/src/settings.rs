//! Durable per-user state: which user to watch, how often, and where the
//! badge sits on screen.
//!
//! The file is plain JSON so it can be edited by hand. Loading never fails:
//! each key is merged over its default on its own, so an older file missing
//! newer keys (or holding a garbage value for one of them) keeps everything
//! else it does have.

use std::io::Write;
use std::path::{Path, PathBuf};

use approval_notify_shared::UserId;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use tracing::{info, warn};

use crate::config::ClientConfig;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Settings {
    pub user_id: UserId,
    pub size: u32,
    pub x: Option<i32>,
    pub y: Option<i32>,
    /// Seconds between fetch cycles.
    pub refresh_interval: u64,
}

impl Settings {
    pub fn defaults_from(cfg: &ClientConfig) -> Self {
        Self {
            user_id: cfg.default_user(),
            size: cfg.defaults.size,
            x: None,
            y: None,
            refresh_interval: cfg.defaults.refresh_interval_secs.max(1),
        }
    }
}

#[derive(Debug, thiserror::Error)]
pub enum SettingsError {
    #[error("io error on {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("serialize settings failed: {0}")]
    Serialize(#[from] serde_json::Error),
    #[error("replace {path} failed: {source}")]
    Persist {
        path: PathBuf,
        #[source]
        source: tempfile::PersistError,
    },
}

#[derive(Debug, Clone)]
pub struct SettingsStore {
    path: PathBuf,
    defaults: Settings,
}

impl SettingsStore {
    pub fn new(path: impl Into<PathBuf>, defaults: Settings) -> Self {
        Self {
            path: path.into(),
            defaults,
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn defaults(&self) -> &Settings {
        &self.defaults
    }

    /// Read the settings file, falling back to defaults for whatever is
    /// missing or unreadable. A missing file is created with the defaults.
    pub fn load(&self) -> Settings {
        let text = match std::fs::read_to_string(&self.path) {
            Ok(t) => t,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                info!(path=?self.path, "settings file not found; writing defaults");
                if let Err(e) = self.save(&self.defaults) {
                    warn!(error=%e, "could not write default settings");
                }
                return self.defaults.clone();
            }
            Err(e) => {
                warn!(error=%e, path=?self.path, "settings read failed; using defaults");
                return self.defaults.clone();
            }
        };
        match serde_json::from_str::<Value>(&text) {
            Ok(Value::Object(map)) => merge_over_defaults(&map, &self.defaults),
            Ok(other) => {
                warn!(
                    path = ?self.path,
                    kind = %json_kind(&other),
                    "settings file is not a JSON object; using defaults"
                );
                self.defaults.clone()
            }
            Err(e) => {
                warn!(error=%e, path=?self.path, "settings parse failed; using defaults");
                self.defaults.clone()
            }
        }
    }

    /// Replace the settings file. The new content is written next to the
    /// target and renamed over it, so a crash mid-write leaves the previous
    /// file intact.
    pub fn save(&self, settings: &Settings) -> Result<(), SettingsError> {
        let dir = match self.path.parent() {
            Some(p) if !p.as_os_str().is_empty() => p.to_path_buf(),
            _ => PathBuf::from("."),
        };
        std::fs::create_dir_all(&dir).map_err(|source| SettingsError::Io {
            path: dir.clone(),
            source,
        })?;
        let body = serde_json::to_string_pretty(settings)?;
        let mut tmp = tempfile::NamedTempFile::new_in(&dir).map_err(|source| SettingsError::Io {
            path: dir.clone(),
            source,
        })?;
        if let Err(source) = write_and_sync(&mut tmp, body.as_bytes()) {
            return Err(SettingsError::Io {
                path: tmp.path().to_path_buf(),
                source,
            });
        }
        tmp.persist(&self.path)
            .map_err(|source| SettingsError::Persist {
                path: self.path.clone(),
                source,
            })?;
        info!(path=?self.path, ?settings, "settings saved");
        Ok(())
    }
}

fn write_and_sync(tmp: &mut tempfile::NamedTempFile, body: &[u8]) -> std::io::Result<()> {
    tmp.write_all(body)?;
    tmp.write_all(b"\n")?;
    tmp.as_file().sync_all()
}

fn merge_over_defaults(map: &Map<String, Value>, defaults: &Settings) -> Settings {
    Settings {
        user_id: field(map, "user_id")
            .map(UserId)
            .unwrap_or(defaults.user_id),
        size: field(map, "size").unwrap_or(defaults.size),
        x: optional_field(map, "x").unwrap_or(defaults.x),
        y: optional_field(map, "y").unwrap_or(defaults.y),
        refresh_interval: field(map, "refresh_interval")
            .filter(|s| *s > 0)
            .unwrap_or(defaults.refresh_interval),
    }
}

fn field<T: serde::de::DeserializeOwned>(map: &Map<String, Value>, key: &str) -> Option<T> {
    let v = map.get(key)?;
    match serde_json::from_value::<T>(v.clone()) {
        Ok(t) => Some(t),
        Err(e) => {
            warn!(key, error=%e, "settings field has wrong type; using default");
            None
        }
    }
}

/// Like [`field`] but an explicit `null` means "absent" rather than "use the
/// default". Returns `None` only when the default should apply.
fn optional_field<T: serde::de::DeserializeOwned>(
    map: &Map<String, Value>,
    key: &str,
) -> Option<Option<T>> {
    match map.get(key)? {
        Value::Null => Some(None),
        _ => field(map, key).map(Some),
    }
}

fn json_kind(v: &Value) -> &'static str {
    match v {
        Value::Null => "null",
        Value::Bool(_) => "bool",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}
