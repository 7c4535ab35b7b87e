use anyhow::{Context, Result, bail};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::domain::value_objects::{AlertPolicy, ChannelKind, RetentionPolicy, StoreKind};

/// Top-level application configuration loaded from TOML.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct AppConfig {
    #[serde(default)]
    pub general: GeneralConfig,
    #[serde(default)]
    pub alerting: AlertingConfig,
    #[serde(default)]
    pub retention: RetentionConfig,
    #[serde(default)]
    pub probe: ProbeConfig,
    #[serde(default = "default_stores")]
    pub stores: Vec<StoreEntry>,
    #[serde(default)]
    pub channels: Vec<ChannelEntry>,
}

/// Monitored services and loop cadence.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct GeneralConfig {
    #[serde(default)]
    pub services: Vec<String>,
    #[serde(default = "default_scan_interval")]
    pub scan_interval_minutes: u64,
    #[serde(default = "default_cleanup_interval")]
    pub cleanup_interval_minutes: u64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub log_file: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct AlertingConfig {
    #[serde(default = "default_window_hours")]
    pub window_hours: f64,
    #[serde(default = "default_threshold")]
    pub threshold: u32,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct RetentionConfig {
    #[serde(default = "default_retention_hours")]
    pub hours: f64,
}

/// How the service manager is invoked.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct ProbeConfig {
    /// Pass `--user` to `systemctl`.
    #[serde(default)]
    pub user_mode: bool,
    #[serde(default = "default_probe_timeout")]
    pub timeout_secs: u64,
}

/// One `[[stores]]` entry. Fields not used by `kind` are ignored.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct StoreEntry {
    #[serde(rename = "type")]
    pub kind: StoreKind,
    #[serde(default = "default_true")]
    pub enabled: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub path: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub url: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub token: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub org: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub bucket: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub host: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub port: Option<u16>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub password: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub connection_string: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub database: Option<String>,
}

/// One `[[channels]]` entry. Fields not used by `kind` are ignored.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct ChannelEntry {
    #[serde(rename = "type")]
    pub kind: ChannelKind,
    #[serde(default = "default_true")]
    pub enabled: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub webhook_url: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub smtp_server: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub smtp_port: Option<u16>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sender_email: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub receiver_email: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub password: Option<String>,
}

impl StoreEntry {
    #[must_use]
    pub const fn new(kind: StoreKind) -> Self {
        Self {
            kind,
            enabled: true,
            path: None,
            url: None,
            token: None,
            org: None,
            bucket: None,
            host: None,
            port: None,
            password: None,
            connection_string: None,
            database: None,
        }
    }
}

impl ChannelEntry {
    #[must_use]
    pub const fn new(kind: ChannelKind) -> Self {
        Self {
            kind,
            enabled: true,
            webhook_url: None,
            smtp_server: None,
            smtp_port: None,
            sender_email: None,
            receiver_email: None,
            password: None,
        }
    }
}

// --- Default value functions ---

const fn default_scan_interval() -> u64 {
    5
}

const fn default_cleanup_interval() -> u64 {
    60
}

const fn default_window_hours() -> f64 {
    1.0
}

const fn default_threshold() -> u32 {
    3
}

const fn default_retention_hours() -> f64 {
    24.0
}

const fn default_probe_timeout() -> u64 {
    30
}

const fn default_true() -> bool {
    true
}

// NOTE: Stored as raw string with tilde, expanded with shellexpand by the store.
pub const DEFAULT_SQLITE_PATH: &str = "~/.local/share/service-doctor/events.db";
pub const DEFAULT_JSONL_PATH: &str = "~/.local/share/service-doctor/events.jsonl";
pub const DEFAULT_SMTP_PORT: u16 = 587;
pub const DEFAULT_REDIS_HOST: &str = "localhost";
pub const DEFAULT_REDIS_PORT: u16 = 6379;
pub const DEFAULT_MONGODB_URI: &str = "mongodb://localhost:27017";
pub const DEFAULT_MONGODB_DATABASE: &str = "service_doctor";
pub const MAX_INTERVAL_MINUTES: u64 = 525_600;

fn default_stores() -> Vec<StoreEntry> {
    vec![StoreEntry {
        path: Some(DEFAULT_SQLITE_PATH.into()),
        ..StoreEntry::new(StoreKind::Sqlite)
    }]
}

// --- Default impls ---

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            general: GeneralConfig::default(),
            alerting: AlertingConfig::default(),
            retention: RetentionConfig::default(),
            probe: ProbeConfig::default(),
            stores: default_stores(),
            channels: Vec::new(),
        }
    }
}

impl Default for GeneralConfig {
    fn default() -> Self {
        Self {
            services: Vec::new(),
            scan_interval_minutes: default_scan_interval(),
            cleanup_interval_minutes: default_cleanup_interval(),
            log_file: None,
        }
    }
}

impl Default for AlertingConfig {
    fn default() -> Self {
        Self {
            window_hours: default_window_hours(),
            threshold: default_threshold(),
        }
    }
}

impl Default for RetentionConfig {
    fn default() -> Self {
        Self {
            hours: default_retention_hours(),
        }
    }
}

impl Default for ProbeConfig {
    fn default() -> Self {
        Self {
            user_mode: false,
            timeout_secs: default_probe_timeout(),
        }
    }
}

// --- AppConfig methods ---

impl AppConfig {
    /// Load config from default path or create default config file
    ///
    /// # Errors
    ///
    /// Returns an error if the config directory cannot be determined,
    /// the file cannot be read, or the TOML content is invalid.
    pub fn load() -> Result<Self> {
        let path = Self::config_path()?;
        Self::load_or_create(&path)
    }

    /// Load from a specific path, or create a default config file if missing
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be read, the TOML content is invalid,
    /// or the default config file cannot be written.
    pub fn load_or_create(path: &Path) -> Result<Self> {
        Self::load_or_create_reporting(path).map(|(config, _)| config)
    }

    /// Like [`AppConfig::load_or_create`], also reporting whether the
    /// default file was written by this call.
    ///
    /// # Errors
    ///
    /// Same as [`AppConfig::load_or_create`].
    pub fn load_or_create_reporting(path: &Path) -> Result<(Self, bool)> {
        if path.exists() {
            Ok((Self::load_from(path)?, false))
        } else {
            let config = Self::default();
            config.save_to(path)?;
            Ok((config, true))
        }
    }

    /// Load from a specific path
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be read or the TOML content is invalid.
    pub fn load_from(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file {}", path.display()))?;
        toml::from_str(&content).context("Failed to parse config file")
    }

    /// Save config to a specific path, creating parent directories if needed
    ///
    /// # Errors
    ///
    /// Returns an error if the directory cannot be created,
    /// serialization fails, or the file cannot be written.
    pub fn save_to(&self, path: &Path) -> Result<()> {
        let parent = path.parent().unwrap_or_else(|| Path::new("."));
        std::fs::create_dir_all(parent).context("Failed to create config directory")?;
        let content = toml::to_string_pretty(self).context("Failed to serialize config")?;
        std::fs::write(path, content).context("Failed to write config file")?;
        Ok(())
    }

    /// `$XDG_CONFIG_HOME/service-doctor/config.toml` or the platform equivalent.
    ///
    /// # Errors
    ///
    /// Returns an error if the config directory cannot be determined.
    pub fn config_path() -> Result<PathBuf> {
        let config_dir = dirs::config_dir().context("Could not determine config directory")?;
        Ok(config_dir.join("service-doctor").join("config.toml"))
    }

    /// Reject configurations the scheduler cannot run with.
    ///
    /// # Errors
    ///
    /// Returns an error naming the first invalid setting.
    pub fn validate(&self) -> Result<()> {
        if self.general.services.is_empty() {
            bail!("no services configured for monitoring (general.services is empty)");
        }
        if let Some(blank) = self.general.services.iter().position(|s| s.trim().is_empty()) {
            bail!("general.services[{blank}] is blank");
        }
        for (field, minutes) in [
            ("scan_interval_minutes", self.general.scan_interval_minutes),
            ("cleanup_interval_minutes", self.general.cleanup_interval_minutes),
        ] {
            if minutes == 0 {
                bail!("general.{field} must be greater than 0");
            }
            if minutes > MAX_INTERVAL_MINUTES {
                bail!("general.{field} must not exceed {MAX_INTERVAL_MINUTES} (one year)");
            }
        }
        if self.probe.timeout_secs == 0 {
            bail!("probe.timeout_secs must be greater than 0");
        }
        self.alert_policy().context("invalid [alerting] section")?;
        self.retention_policy().context("invalid [retention] section")?;
        Ok(())
    }

    /// Let secrets and endpoints come from the environment. A variable that
    /// is set and non-empty replaces the value from the file for every entry
    /// of the matching kind.
    pub fn apply_env_overrides<F>(&mut self, lookup: F)
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |name: &str| lookup(name).filter(|v| !v.is_empty());

        for store in &mut self.stores {
            match store.kind {
                StoreKind::Influxdb => {
                    override_field(&mut store.url, get("INFLUXDB_URL"));
                    override_field(&mut store.token, get("INFLUXDB_TOKEN"));
                    override_field(&mut store.org, get("INFLUXDB_ORG"));
                    override_field(&mut store.bucket, get("INFLUXDB_BUCKET"));
                }
                StoreKind::Redis => {
                    override_field(&mut store.host, get("REDIS_HOST"));
                    override_field(&mut store.password, get("REDIS_PASSWORD"));
                    if let Some(port) = get("REDIS_PORT") {
                        match port.parse() {
                            Ok(port) => store.port = Some(port),
                            Err(e) => tracing::warn!("ignoring REDIS_PORT={port:?}: {e}"),
                        }
                    }
                }
                StoreKind::Mongodb => {
                    override_field(
                        &mut store.connection_string,
                        get("MONGODB_CONNECTION_STRING"),
                    );
                }
                StoreKind::Sqlite => override_field(&mut store.path, get("SQLITE_PATH")),
                StoreKind::Jsonl | StoreKind::Memory => {}
            }
        }

        for channel in &mut self.channels {
            match channel.kind {
                ChannelKind::Email => override_field(&mut channel.password, get("EMAIL_PASSWORD")),
                ChannelKind::Slack => {
                    override_field(&mut channel.webhook_url, get("SLACK_WEBHOOK_URL"));
                }
                ChannelKind::Teams => {
                    override_field(&mut channel.webhook_url, get("TEAMS_WEBHOOK_URL"));
                }
            }
        }
    }

    /// # Errors
    ///
    /// Returns an error if the window is not positive or the threshold is 0.
    pub fn alert_policy(&self) -> Result<AlertPolicy> {
        Ok(AlertPolicy::from_hours(
            self.alerting.window_hours,
            self.alerting.threshold,
        )?)
    }

    /// # Errors
    ///
    /// Returns an error if the retention is not positive.
    pub fn retention_policy(&self) -> Result<RetentionPolicy> {
        Ok(RetentionPolicy::from_hours(self.retention.hours)?)
    }

    #[must_use]
    pub const fn scan_interval(&self) -> Duration {
        Duration::from_secs(self.general.scan_interval_minutes.saturating_mul(60))
    }

    #[must_use]
    pub const fn cleanup_interval(&self) -> Duration {
        Duration::from_secs(self.general.cleanup_interval_minutes.saturating_mul(60))
    }

    #[must_use]
    pub const fn probe_timeout(&self) -> Duration {
        Duration::from_secs(self.probe.timeout_secs)
    }
}

fn override_field(field: &mut Option<String>, value: Option<String>) {
    if let Some(value) = value {
        *field = Some(value);
    }
}
