//! Backend connection settings persisted in `app_settings`.
//!
//! Stored values can be overridden per process through the environment,
//! which is how deployments point the desk at a different backend without
//! touching the local database.

use anyhow::{anyhow, Result};
use rusqlite::{params, OptionalExtension};
use serde::{Deserialize, Serialize};
use serde_json::json;
use time::OffsetDateTime;

use crate::logging::log_event;

const SETTINGS_KEY: &str = "backend.endpoint";

pub const ENV_API_URL: &str = "ASSISTDESK_API_URL";
pub const ENV_API_TOKEN: &str = "ASSISTDESK_API_TOKEN";

pub const DEFAULT_BASE_URL: &str = "http://localhost:8080";
pub const DEFAULT_TIMEOUT_SECS: u64 = 30;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BackendSettings {
    pub base_url: String,
    #[serde(default)]
    pub api_token: Option<String>,
    #[serde(default = "default_timeout")]
    pub timeout_secs: u64,
}

fn default_timeout() -> u64 {
    DEFAULT_TIMEOUT_SECS
}

impl Default for BackendSettings {
    fn default() -> Self {
        Self {
            base_url: DEFAULT_BASE_URL.to_string(),
            api_token: None,
            timeout_secs: DEFAULT_TIMEOUT_SECS,
        }
    }
}

/// Partial update coming from the command surface.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct BackendSettingsUpdate {
    pub base_url: Option<String>,
    pub api_token: Option<String>,
    pub timeout_secs: Option<u64>,
}

/// Settings view that never leaks the token itself.
#[derive(Debug, Clone, Serialize)]
pub struct BackendSettingsSnapshot {
    pub base_url: String,
    pub has_token: bool,
    pub timeout_secs: u64,
}

impl From<&BackendSettings> for BackendSettingsSnapshot {
    fn from(settings: &BackendSettings) -> Self {
        Self {
            base_url: settings.base_url.clone(),
            has_token: settings.api_token.is_some(),
            timeout_secs: settings.timeout_secs,
        }
    }
}

pub fn seed_defaults(conn: &rusqlite::Connection) -> Result<()> {
    if read_stored(conn)?.is_none() {
        write_stored(conn, &BackendSettings::default())?;
    }
    Ok(())
}

/// Stored settings, without environment overrides.
pub fn get_settings(conn: &rusqlite::Connection) -> Result<BackendSettings> {
    Ok(read_stored(conn)?.unwrap_or_default())
}

/// Stored settings with `ASSISTDESK_*` environment overrides applied.
pub fn effective_settings(conn: &rusqlite::Connection) -> Result<BackendSettings> {
    let stored = get_settings(conn)?;
    Ok(apply_overrides(stored, |key| std::env::var(key).ok()))
}

pub fn apply_overrides<F>(mut settings: BackendSettings, lookup: F) -> BackendSettings
where
    F: Fn(&str) -> Option<String>,
{
    if let Some(url) = lookup(ENV_API_URL).filter(|v| !v.trim().is_empty()) {
        settings.base_url = url.trim().to_string();
    }
    if let Some(token) = lookup(ENV_API_TOKEN).filter(|v| !v.trim().is_empty()) {
        settings.api_token = Some(token.trim().to_string());
    }
    settings
}

pub fn update_settings(
    conn: &rusqlite::Connection,
    update: BackendSettingsUpdate,
) -> Result<BackendSettings> {
    let mut settings = get_settings(conn)?;

    if let Some(base_url) = update.base_url {
        let trimmed = base_url.trim().trim_end_matches('/').to_string();
        if !(trimmed.starts_with("http://") || trimmed.starts_with("https://")) {
            return Err(anyhow!("Backend URL must start with http:// or https://"));
        }
        settings.base_url = trimmed;
    }

    if let Some(token) = update.api_token {
        let trimmed = token.trim().to_string();
        settings.api_token = if trimmed.is_empty() { None } else { Some(trimmed) };
    }

    if let Some(timeout) = update.timeout_secs {
        if timeout == 0 {
            return Err(anyhow!("Timeout must be at least one second"));
        }
        settings.timeout_secs = timeout;
    }

    write_stored(conn, &settings)?;
    audit_settings_change(conn, &settings);
    Ok(settings)
}

fn read_stored(conn: &rusqlite::Connection) -> Result<Option<BackendSettings>> {
    let value: Option<String> = conn
        .query_row(
            "SELECT value FROM app_settings WHERE key = ?1",
            params![SETTINGS_KEY],
            |row| row.get(0),
        )
        .optional()?;

    match value {
        Some(raw) => Ok(Some(serde_json::from_str(&raw)?)),
        None => Ok(None),
    }
}

fn write_stored(conn: &rusqlite::Connection, settings: &BackendSettings) -> Result<()> {
    let now = OffsetDateTime::now_utc().unix_timestamp();
    let payload = serde_json::to_string(settings)?;
    conn.execute(
        "INSERT INTO app_settings (key, value, updated_at) VALUES (?1, ?2, ?3)
         ON CONFLICT(key) DO UPDATE SET value = excluded.value, updated_at = excluded.updated_at",
        params![SETTINGS_KEY, payload, now],
    )?;
    Ok(())
}

fn audit_settings_change(conn: &rusqlite::Connection, settings: &BackendSettings) {
    let _ = log_event(
        conn,
        "info",
        Some("CFG-0001"),
        "config",
        "Backend settings updated",
        Some("Subsequent requests use the new endpoint"),
        Some(json!({
            "base_url": settings.base_url,
            "has_token": settings.api_token.is_some(),
            "timeout_secs": settings.timeout_secs,
        })),
    );
}
