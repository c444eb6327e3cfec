//! Password-gated editor for the settings file.
//!
//! The gate compares a SHA-256 digest of the candidate against the digest in
//! the deployment config. It keeps casual hands off the settings; it is not a
//! security boundary.

use approval_notify_shared::UserId;
use sha2::{Digest, Sha256};
use tracing::{info, warn};

use crate::geometry::SizeBounds;
use crate::settings::{Settings, SettingsError, SettingsStore};

#[derive(Debug, thiserror::Error)]
pub enum ValidationError {
    #[error("{field}: expected an integer, got {value:?}")]
    NotAnInteger { field: &'static str, value: String },
    #[error("size must be between {min} and {max}, got {got}")]
    SizeOutOfBounds { min: u32, max: u32, got: i64 },
    #[error("refresh_interval must be at least 1 second, got {0}")]
    RefreshInterval(i64),
}

#[derive(Debug, thiserror::Error)]
pub enum AdminError {
    #[error("wrong admin password")]
    Auth,
    #[error("invalid input: {0}")]
    Validation(#[from] ValidationError),
    #[error("saving settings failed: {0}")]
    Persist(#[from] SettingsError),
}

pub fn digest_hex(secret: &str) -> String {
    hex::encode(Sha256::digest(secret.as_bytes()))
}

#[derive(Debug, Clone)]
pub struct AdminGate {
    digest: Option<[u8; 32]>,
}

impl AdminGate {
    /// `digest_hex` is the configured SHA-256 of the secret. A missing or
    /// malformed digest leaves the gate permanently closed.
    pub fn new(digest_hex: Option<&str>) -> Self {
        let digest = digest_hex.and_then(|h| {
            let mut out = [0u8; 32];
            match hex::decode_to_slice(h.trim(), &mut out) {
                Ok(()) => Some(out),
                Err(e) => {
                    warn!(
                        error = %e,
                        "admin_secret_sha256 is not a 32-byte hex digest; admin editor disabled"
                    );
                    None
                }
            }
        });
        Self { digest }
    }

    pub fn is_configured(&self) -> bool {
        self.digest.is_some()
    }

    pub fn authenticate(&self, candidate: &str) -> bool {
        let Some(expected) = &self.digest else {
            return false;
        };
        let got: [u8; 32] = Sha256::digest(candidate.as_bytes()).into();
        got == *expected
    }

    pub fn unlock(&self, candidate: &str) -> Result<AdminSession, AdminError> {
        if self.authenticate(candidate) {
            info!("admin editor unlocked");
            Ok(AdminSession { _private: () })
        } else {
            warn!("admin authentication failed");
            Err(AdminError::Auth)
        }
    }
}

/// Proof that the gate was passed; the only way to reach [`AdminSession::save`].
#[derive(Debug)]
pub struct AdminSession {
    _private: (),
}

impl AdminSession {
    /// Validate `form` against `current` and write the result. Nothing is
    /// written when any field is invalid.
    pub fn save(
        &self,
        form: &SettingsForm,
        current: &Settings,
        bounds: SizeBounds,
        store: &SettingsStore,
    ) -> Result<Settings, AdminError> {
        let next = form.validate(current, bounds)?;
        store.save(&next)?;
        Ok(next)
    }
}

/// Raw text the user typed, one entry per settings key. `None` keeps the
/// current value; for `x`/`y` an empty string clears the coordinate.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SettingsForm {
    pub user_id: Option<String>,
    pub size: Option<String>,
    pub x: Option<String>,
    pub y: Option<String>,
    pub refresh_interval: Option<String>,
}

impl SettingsForm {
    pub const KEYS: [&'static str; 5] = ["user_id", "size", "x", "y", "refresh_interval"];

    /// Set a field by its settings-file key. Returns `false` for unknown keys.
    pub fn set(&mut self, key: &str, value: impl Into<String>) -> bool {
        let slot = match key {
            "user_id" => &mut self.user_id,
            "size" => &mut self.size,
            "x" => &mut self.x,
            "y" => &mut self.y,
            "refresh_interval" => &mut self.refresh_interval,
            _ => return false,
        };
        *slot = Some(value.into());
        true
    }

    pub fn validate(
        &self,
        current: &Settings,
        bounds: SizeBounds,
    ) -> Result<Settings, ValidationError> {
        let mut next = current.clone();
        if let Some(v) = &self.user_id {
            next.user_id = UserId(parse_int("user_id", v)?);
        }
        if let Some(v) = &self.size {
            let got = parse_int("size", v)?;
            if got < i64::from(bounds.min) || got > i64::from(bounds.max) {
                return Err(ValidationError::SizeOutOfBounds {
                    min: bounds.min,
                    max: bounds.max,
                    got,
                });
            }
            next.size = got as u32;
        }
        if let Some(v) = &self.x {
            next.x = parse_coordinate("x", v)?;
        }
        if let Some(v) = &self.y {
            next.y = parse_coordinate("y", v)?;
        }
        if let Some(v) = &self.refresh_interval {
            let got = parse_int("refresh_interval", v)?;
            if got < 1 {
                return Err(ValidationError::RefreshInterval(got));
            }
            next.refresh_interval = got as u64;
        }
        Ok(next)
    }
}

fn parse_int(field: &'static str, raw: &str) -> Result<i64, ValidationError> {
    raw.trim()
        .parse::<i64>()
        .map_err(|_| ValidationError::NotAnInteger {
            field,
            value: raw.to_string(),
        })
}

fn parse_coordinate(field: &'static str, raw: &str) -> Result<Option<i32>, ValidationError> {
    if raw.trim().is_empty() {
        return Ok(None);
    }
    raw.trim()
        .parse::<i32>()
        .map(Some)
        .map_err(|_| ValidationError::NotAnInteger {
            field,
            value: raw.to_string(),
        })
}
