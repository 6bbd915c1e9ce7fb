//! Console configuration, loaded from a kebab-case YAML file.
//!
//! Every key has a default so an empty file (or no file at all) yields a
//! runnable configuration listening on localhost.

use std::net::SocketAddr;
use std::path::{Path, PathBuf};
use std::time::Duration;

use anyhow::{Context, Result, ensure};
use serde::Deserialize;

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "kebab-case", deny_unknown_fields)]
pub struct Configuration {
    /// Address the console listens on.
    #[serde(default = "Configuration::default_bind_address")]
    pub bind_address: SocketAddr,

    /// JSON data file holding users, kiosks, the activity log, and settings.
    #[serde(default = "Configuration::default_data_file")]
    pub data_file: PathBuf,

    /// How often a player session re-reads its kiosk from the store.
    #[serde(
        default = "Configuration::default_poll_interval",
        with = "humantime_serde"
    )]
    pub poll_interval: Duration,

    /// Dwell applied to slides with no usable duration.
    #[serde(
        default = "Configuration::default_advance_fallback",
        with = "humantime_serde"
    )]
    pub advance_fallback: Duration,

    /// Delay the exported offline players wait before refetching after a
    /// failed fetch.
    #[serde(
        default = "Configuration::default_retry_delay",
        with = "humantime_serde"
    )]
    pub retry_delay: Duration,

    /// Activity-log bound; oldest entries are dropped past this.
    #[serde(default = "Configuration::default_log_capacity")]
    pub log_capacity: usize,

    /// Administrator seeded into a fresh data file.
    #[serde(default)]
    pub bootstrap_admin: BootstrapAdmin,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "kebab-case", deny_unknown_fields)]
pub struct BootstrapAdmin {
    pub username: String,
    pub password: String,
    #[serde(default = "BootstrapAdmin::default_full_name")]
    pub full_name: String,
}

impl BootstrapAdmin {
    fn default_full_name() -> String {
        "Administrator".to_string()
    }
}

impl Default for BootstrapAdmin {
    fn default() -> Self {
        Self {
            username: "admin".to_string(),
            password: "admin".to_string(),
            full_name: Self::default_full_name(),
        }
    }
}

impl Configuration {
    fn default_bind_address() -> SocketAddr {
        ([127, 0, 0, 1], 8080).into()
    }

    fn default_data_file() -> PathBuf {
        PathBuf::from("console-data.json")
    }

    fn default_poll_interval() -> Duration {
        Duration::from_secs(30)
    }

    fn default_advance_fallback() -> Duration {
        Duration::from_secs(10)
    }

    fn default_retry_delay() -> Duration {
        Duration::from_secs(30)
    }

    fn default_log_capacity() -> usize {
        100
    }

    pub fn from_yaml_file(path: &Path) -> Result<Self> {
        let raw = std::fs::read_to_string(path)
            .with_context(|| format!("failed to read {}", path.display()))?;
        let cfg: Self = serde_yaml::from_str(&raw)
            .with_context(|| format!("failed to parse {}", path.display()))?;
        Ok(cfg)
    }

    /// Rejects values that would stall timers or make the store unusable.
    pub fn validated(self) -> Result<Self> {
        ensure!(!self.poll_interval.is_zero(), "poll-interval must be > 0");
        ensure!(
            !self.advance_fallback.is_zero(),
            "advance-fallback must be > 0"
        );
        ensure!(!self.retry_delay.is_zero(), "retry-delay must be > 0");
        ensure!(self.log_capacity > 0, "log-capacity must be > 0");
        ensure!(
            !self.bootstrap_admin.username.is_empty(),
            "bootstrap-admin username must not be empty"
        );
        ensure!(
            !self.bootstrap_admin.password.is_empty(),
            "bootstrap-admin password must not be empty"
        );
        Ok(self)
    }
}

impl Default for Configuration {
    fn default() -> Self {
        Self {
            bind_address: Self::default_bind_address(),
            data_file: Self::default_data_file(),
            poll_interval: Self::default_poll_interval(),
            advance_fallback: Self::default_advance_fallback(),
            retry_delay: Self::default_retry_delay(),
            log_capacity: Self::default_log_capacity(),
            bootstrap_admin: BootstrapAdmin::default(),
        }
    }
}
