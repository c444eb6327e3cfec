//! One-shot CLI commands. Unlike the agent, these fail loudly on a bad
//! config.

use approval_notify_shared::api::endpoints;
use tracing::info;

use crate::AppError;
use crate::admin;
use crate::badge;
use crate::config::ClientConfig;
use crate::fetch;
use crate::platform;
use crate::settings::{Settings, SettingsStore};

pub struct Context {
    pub cfg: ClientConfig,
    pub store: SettingsStore,
}

impl Context {
    pub fn load(
        config: Option<std::path::PathBuf>,
        settings: Option<std::path::PathBuf>,
        debug: bool,
    ) -> Result<Self, AppError> {
        let (path, mut cfg) = ClientConfig::find_and_load(config)?;
        info!(path=?path, "loaded config");
        if debug {
            cfg.debug.enabled = true;
        }
        let store = SettingsStore::new(
            cfg.resolve_settings_path(settings)?,
            Settings::defaults_from(&cfg),
        );
        Ok(Self { cfg, store })
    }
}

pub async fn check(ctx: &Context) -> Result<(), AppError> {
    let settings = ctx.store.load();
    let source = fetch::source_from_config(&ctx.cfg);
    match source.fetch(settings.user_id).await {
        Some(counts) => {
            let token = badge::present(&counts);
            println!(
                "user {}: {} pending ({} danger, {} alert) -> {} [{}]",
                settings.user_id,
                counts.total,
                counts.danger,
                counts.alert,
                token.text,
                token.severity
            );
        }
        None => println!("user {}: no data (see log)", settings.user_id),
    }
    Ok(())
}

pub fn open(ctx: &Context) -> Result<(), AppError> {
    let settings = ctx.store.load();
    let page = endpoints::approval_page(&ctx.cfg.approval_page_url, settings.user_id);
    let parsed = url::Url::parse(&page)
        .map_err(|e| AppError::Config(format!("approval_page_url {page:?} is not a URL: {e}")))?;
    platform::launch_browser(parsed.as_str())
}

pub fn show_settings(ctx: &Context) -> Result<(), AppError> {
    let settings = ctx.store.load();
    let json = serde_json::to_string_pretty(&settings)
        .map_err(|e| AppError::Config(format!("serialize settings failed: {e}")))?;
    println!("{}", ctx.store.path().display());
    println!("{json}");
    Ok(())
}

pub fn hash_secret() -> Result<(), AppError> {
    let secret = rpassword::prompt_password("Secret: ")?;
    if secret.is_empty() {
        return Err(AppError::Config("secret must not be empty".into()));
    }
    let confirm = rpassword::prompt_password("Repeat: ")?;
    if secret != confirm {
        return Err(AppError::Config("secrets do not match".into()));
    }
    println!("admin_secret_sha256: {}", admin::digest_hex(&secret));
    Ok(())
}
