use std::{collections::HashMap, fs, path::Path, time::Duration};

use anyhow::anyhow;
use serde::Serialize;

pub const DEFAULT_SETTINGS_FILE: &str = "client.toml";

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ClientSettings {
    pub server_url: String,
    pub typing_idle_ms: u64,
    pub presence_poll_secs: u64,
    pub message_page_size: u32,
}

impl Default for ClientSettings {
    fn default() -> Self {
        Self {
            server_url: "http://127.0.0.1:8443".into(),
            typing_idle_ms: 2000,
            presence_poll_secs: 30,
            message_page_size: 20,
        }
    }
}

impl ClientSettings {
    pub fn typing_idle_window(&self) -> Duration {
        Duration::from_millis(self.typing_idle_ms)
    }

    pub fn presence_poll_interval(&self) -> Duration {
        Duration::from_secs(self.presence_poll_secs.max(1))
    }

    /// Realtime endpoint derived from the HTTP server URL.
    pub fn ws_url(&self) -> anyhow::Result<String> {
        let base = self.server_url.trim_end_matches('/');
        let ws_base = if base.starts_with("https://") {
            base.replacen("https://", "wss://", 1)
        } else if base.starts_with("http://") {
            base.replacen("http://", "ws://", 1)
        } else {
            return Err(anyhow!("server_url must start with http:// or https://"));
        };
        Ok(format!("{ws_base}/ws"))
    }
}

/// Defaults, then `client.toml` in the working directory, then environment.
pub fn load_settings() -> ClientSettings {
    load_settings_from(Path::new(DEFAULT_SETTINGS_FILE), |name| std::env::var(name).ok())
}

pub fn load_settings_from(
    path: &Path,
    env: impl Fn(&str) -> Option<String>,
) -> ClientSettings {
    let mut settings = ClientSettings::default();

    if let Ok(raw) = fs::read_to_string(path) {
        match toml::from_str::<HashMap<String, String>>(&raw) {
            Ok(file_cfg) => apply_overrides(&mut settings, |key| file_cfg.get(key).cloned()),
            Err(err) => tracing::warn!(path = %path.display(), "ignoring unreadable settings file: {err}"),
        }
    }

    apply_overrides(&mut settings, |key| env(&format!("APP__{}", key.to_ascii_uppercase())));

    settings
}

fn apply_overrides(settings: &mut ClientSettings, lookup: impl Fn(&str) -> Option<String>) {
    if let Some(v) = lookup("server_url") {
        settings.server_url = v;
    }
    if let Some(v) = lookup("typing_idle_ms").and_then(|v| v.parse().ok()) {
        settings.typing_idle_ms = v;
    }
    if let Some(v) = lookup("presence_poll_secs").and_then(|v| v.parse().ok()) {
        settings.presence_poll_secs = v;
    }
    if let Some(v) = lookup("message_page_size").and_then(|v| v.parse().ok()) {
        settings.message_page_size = v;
    }
}

#[cfg(test)]
#[path = "tests/config_tests.rs"]
mod tests;
