//! Configuration loading.
//!
//! Values are layered, lowest precedence first:
//!
//! 1. built-in defaults
//! 2. `config.json` in the config directory
//! 3. environment (`CODEMSG_SERVER_URL`, `CODEMSG_TOKEN`, `CODEMSG_INSECURE`)
//! 4. command-line flags
//!
//! The resulting [`Config`] is passed by value into the session; nothing is
//! read from process-wide state after startup.

use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};

use crate::constants::{APP_NAME, DEFAULT_SERVER_URL, NOTIFICATION_TIMEOUT_SECS, NOTIFICATION_TITLE};
use crate::dispatch::NotificationStyle;

/// Name of the config file inside the config directory.
pub const CONFIG_FILE_NAME: &str = "config.json";

/// Configuration for the codemsg client.
#[derive(Serialize, Deserialize, Clone, PartialEq, Eq)]
#[serde(default)]
pub struct Config {
    /// Base address of the push server (`http(s)://` or `ws(s)://`).
    pub server_url: String,
    /// Client token sent as `Authorization: Bearer <token>`.
    pub token: String,
    /// Verify the server's TLS certificate.
    pub verify_tls: bool,
    /// Title token of desktop notifications.
    pub notification_title: String,
    /// Application name attached to desktop notifications.
    pub app_name: String,
    /// Seconds before a desktop notification is dismissed.
    pub notification_timeout_secs: u64,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            server_url: DEFAULT_SERVER_URL.to_string(),
            token: String::new(),
            verify_tls: true,
            notification_title: NOTIFICATION_TITLE.to_string(),
            app_name: APP_NAME.to_string(),
            notification_timeout_secs: NOTIFICATION_TIMEOUT_SECS,
        }
    }
}

impl std::fmt::Debug for Config {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Config")
            .field("server_url", &self.server_url)
            .field("token", &mask_token(&self.token))
            .field("verify_tls", &self.verify_tls)
            .field("notification_title", &self.notification_title)
            .field("app_name", &self.app_name)
            .field("notification_timeout_secs", &self.notification_timeout_secs)
            .finish()
    }
}

/// Command-line overrides; `None` / `false` leaves the loaded value alone.
#[derive(Debug, Clone, Default)]
pub struct ConfigOverrides {
    /// Replacement server URL.
    pub server_url: Option<String>,
    /// Replacement token.
    pub token: Option<String>,
    /// Disable certificate verification.
    pub insecure: bool,
}

impl Config {
    /// Returns the configuration directory path.
    ///
    /// `CODEMSG_CONFIG_DIR` overrides the platform config directory
    /// (`~/.config/codemsg` on Linux).
    pub fn config_dir() -> Result<PathBuf> {
        if let Ok(dir) = std::env::var("CODEMSG_CONFIG_DIR") {
            return Ok(PathBuf::from(dir));
        }
        Ok(dirs::config_dir()
            .context("Could not determine config directory")?
            .join("codemsg"))
    }

    /// Path of the default config file.
    pub fn default_path() -> Result<PathBuf> {
        Ok(Self::config_dir()?.join(CONFIG_FILE_NAME))
    }

    /// Load configuration from `path` (or the default location), then apply
    /// environment overrides.
    ///
    /// A missing file falls back to defaults; an unreadable or malformed
    /// file is an error.
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let path = match path {
            Some(p) => p.to_path_buf(),
            None => Self::default_path()?,
        };

        let mut config = Self::load_from_file(&path)?.unwrap_or_default();
        config.apply_env(|key| std::env::var(key).ok());
        Ok(config)
    }

    /// Read a config file; `Ok(None)` if it does not exist.
    pub fn load_from_file(path: &Path) -> Result<Option<Self>> {
        if !path.exists() {
            log::debug!("No config file at {}", path.display());
            return Ok(None);
        }
        let content = fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file {}", path.display()))?;
        let config = serde_json::from_str(&content)
            .with_context(|| format!("Malformed config file {}", path.display()))?;
        Ok(Some(config))
    }

    /// Apply environment overrides using `lookup` to read variables.
    pub fn apply_env(&mut self, lookup: impl Fn(&str) -> Option<String>) {
        if let Some(server_url) = lookup("CODEMSG_SERVER_URL") {
            self.server_url = server_url;
        }

        if let Some(token) = lookup("CODEMSG_TOKEN") {
            self.token = token;
        }

        if let Some(insecure) = lookup("CODEMSG_INSECURE") {
            if matches!(insecure.trim().to_ascii_lowercase().as_str(), "1" | "true" | "yes") {
                self.verify_tls = false;
            }
        }
    }

    /// Apply command-line overrides.
    pub fn apply_overrides(&mut self, overrides: ConfigOverrides) {
        if let Some(server_url) = overrides.server_url {
            self.server_url = server_url;
        }
        if let Some(token) = overrides.token {
            self.token = token;
        }
        if overrides.insecure {
            self.verify_tls = false;
        }
    }

    /// Check that a session can be started with this configuration.
    pub fn validate(&self) -> Result<()> {
        if self.server_url.trim().is_empty() {
            anyhow::bail!("server_url is empty");
        }
        if self.token.trim().is_empty() {
            anyhow::bail!(
                "no client token configured (set CODEMSG_TOKEN, pass --token, or add \"token\" to {})",
                CONFIG_FILE_NAME
            );
        }
        Ok(())
    }

    /// Presentation settings for desktop notifications.
    #[must_use]
    pub fn notification_style(&self) -> NotificationStyle {
        NotificationStyle {
            title: self.notification_title.clone(),
            app_name: self.app_name.clone(),
            timeout: Duration::from_secs(self.notification_timeout_secs),
        }
    }

    /// Copy of this configuration with the token masked, for display.
    #[must_use]
    pub fn redacted(&self) -> Self {
        Self {
            token: mask_token(&self.token),
            ..self.clone()
        }
    }
}

/// Keep the first two characters of a token, mask the rest.
fn mask_token(token: &str) -> String {
    if token.is_empty() {
        return String::new();
    }
    let visible: String = token.chars().take(2).collect();
    format!("{visible}***")
}
