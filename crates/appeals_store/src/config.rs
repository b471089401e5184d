use std::{fs, path::Path};

use anyhow::{bail, Context};
use serde::Deserialize;
use tracing::warn;
use url::Url;

use crate::state::DEFAULT_PAGE_SIZE;

pub const DEFAULT_SETTINGS_FILE: &str = "appeals.toml";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClientSettings {
    pub api_base_url: String,
    pub auth_token: Option<String>,
    pub request_timeout_secs: u64,
    pub page_size: u32,
}

impl Default for ClientSettings {
    fn default() -> Self {
        Self {
            api_base_url: "http://127.0.0.1:8000".into(),
            auth_token: None,
            request_timeout_secs: 30,
            page_size: DEFAULT_PAGE_SIZE,
        }
    }
}

#[derive(Debug, Default, Deserialize)]
struct FileSettings {
    api_base_url: Option<String>,
    auth_token: Option<String>,
    request_timeout_secs: Option<u64>,
    page_size: Option<u32>,
}

pub fn load_settings() -> anyhow::Result<ClientSettings> {
    load_settings_from(Path::new(DEFAULT_SETTINGS_FILE))
}

/// Defaults, then `path` (if readable), then environment overrides. The base
/// URL is validated last.
pub fn load_settings_from(path: &Path) -> anyhow::Result<ClientSettings> {
    let mut settings = ClientSettings::default();

    if let Ok(raw) = fs::read_to_string(path) {
        match toml::from_str::<FileSettings>(&raw) {
            Ok(file_cfg) => apply_file(&mut settings, file_cfg),
            Err(err) => warn!("config: ignoring unreadable {} err={err}", path.display()),
        }
    }

    apply_env(&mut settings, |key| std::env::var(key).ok());
    enforce_limits(&mut settings);

    settings.api_base_url = prepare_base_url(&settings.api_base_url)?;
    Ok(settings)
}

fn apply_file(settings: &mut ClientSettings, file_cfg: FileSettings) {
    if let Some(v) = file_cfg.api_base_url {
        settings.api_base_url = v;
    }
    if let Some(v) = file_cfg.auth_token {
        settings.auth_token = Some(v);
    }
    if let Some(v) = file_cfg.request_timeout_secs {
        settings.request_timeout_secs = v;
    }
    if let Some(v) = file_cfg.page_size {
        settings.page_size = v;
    }
}

fn apply_env(settings: &mut ClientSettings, lookup: impl Fn(&str) -> Option<String>) {
    if let Some(v) = lookup("APPEALS_API_BASE_URL") {
        settings.api_base_url = v;
    }
    if let Some(v) = lookup("APP__API_BASE_URL") {
        settings.api_base_url = v;
    }

    if let Some(v) = lookup("APPEALS_AUTH_TOKEN") {
        settings.auth_token = Some(v);
    }
    if let Some(v) = lookup("APP__AUTH_TOKEN") {
        settings.auth_token = Some(v);
    }

    if let Some(v) = lookup("APP__REQUEST_TIMEOUT_SECS") {
        if let Ok(parsed) = v.parse::<u64>() {
            settings.request_timeout_secs = parsed;
        }
    }

    if let Some(v) = lookup("APP__PAGE_SIZE") {
        if let Ok(parsed) = v.parse::<u32>() {
            settings.page_size = parsed;
        }
    }
}

/// Zero page sizes and zero timeouts are unusable, whichever layer set them;
/// both fall back to their defaults.
fn enforce_limits(settings: &mut ClientSettings) {
    let defaults = ClientSettings::default();
    if settings.page_size == 0 {
        warn!(
            "config: page_size must be positive, using {}",
            defaults.page_size
        );
        settings.page_size = defaults.page_size;
    }
    if settings.request_timeout_secs == 0 {
        warn!(
            "config: request_timeout_secs must be positive, using {}",
            defaults.request_timeout_secs
        );
        settings.request_timeout_secs = defaults.request_timeout_secs;
    }
}

/// Normalizes the API base URL: blank falls back to the default, only
/// http(s) is accepted, and trailing slashes are dropped so request paths can
/// be appended as-is.
pub fn prepare_base_url(raw_base_url: &str) -> anyhow::Result<String> {
    let raw_base_url = raw_base_url.trim();

    if raw_base_url.is_empty() {
        return Ok(ClientSettings::default().api_base_url);
    }

    let parsed = Url::parse(raw_base_url)
        .with_context(|| format!("invalid api base url '{raw_base_url}'"))?;

    if !matches!(parsed.scheme(), "http" | "https") {
        bail!(
            "unsupported scheme '{}' in api base url '{raw_base_url}'",
            parsed.scheme()
        );
    }

    Ok(raw_base_url.trim_end_matches('/').to_string())
}

#[cfg(test)]
#[path = "tests/config_tests.rs"]
mod tests;
