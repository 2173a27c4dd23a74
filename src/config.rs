//! Connection settings for the InfluxDB backend.
//!
//! Settings come from a TOML file, from `INFLUX_*` environment variables, or are
//! filled in directly. Environment variables take precedence over the file.

use std::{path::Path, time::Duration};

use anyhow::Context;
use serde::Deserialize;

use crate::error::ConfigurationError;

pub const DEFAULT_FLUSH_INTERVAL: Duration = Duration::from_secs(60);

/// How the single tag of each point is keyed.
#[derive(Debug, Clone, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "snake_case", tag = "kind")]
pub enum TagScheme {
    /// Tag key is the daemon name, tag value is the point name.
    #[default]
    PerDaemon,
    /// Tag key is fixed, tag value is the point name.
    Fixed { key: String },
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct InfluxConfig {
    pub host_port: String,
    pub organisation: String,
    pub bucket: String,
    pub daemon: String,
    /// Measurement name of written points; the daemon name when unset.
    pub measurement: Option<String>,
    pub token: Option<String>,
    /// Zero counts as unset.
    pub flush_interval_secs: Option<u64>,
    pub tag_scheme: TagScheme,
    /// Write `IsRunning = 1` at loop start and on every flush cycle.
    pub running_marker: bool,
    /// Run the separate 1-second heartbeat task.
    ///
    /// Off by default: with `running_marker` set the flush loop already writes the
    /// liveness point each cycle, and the heartbeat adds one write per second on top.
    pub heartbeat: bool,
}
impl Default for InfluxConfig {
    fn default() -> Self {
        Self {
            host_port: String::new(),
            organisation: String::new(),
            bucket: String::new(),
            daemon: String::new(),
            measurement: None,
            token: None,
            flush_interval_secs: None,
            tag_scheme: TagScheme::default(),
            running_marker: true,
            heartbeat: false,
        }
    }
}
impl InfluxConfig {
    pub fn new(
        host_port: impl Into<String>,
        organisation: impl Into<String>,
        bucket: impl Into<String>,
        daemon: impl Into<String>,
    ) -> Self {
        Self {
            host_port: host_port.into(),
            organisation: organisation.into(),
            bucket: bucket.into(),
            daemon: daemon.into(),
            ..Default::default()
        }
    }

    pub fn from_toml_str(s: &str) -> anyhow::Result<Self> {
        toml::from_str(s).context("parse influx config")
    }

    pub fn load(path: impl AsRef<Path>) -> anyhow::Result<Self> {
        let path = path.as_ref();
        let s = std::fs::read_to_string(path)
            .with_context(|| format!("read config file {}", path.display()))?;
        Self::from_toml_str(&s)
    }

    /// Overrides fields with any `INFLUX_*` environment variables that are set.
    pub fn apply_env_overrides(&mut self) -> anyhow::Result<()> {
        self.apply_overrides(|key| std::env::var(key).ok())
    }

    fn apply_overrides(&mut self, var: impl Fn(&str) -> Option<String>) -> anyhow::Result<()> {
        if let Some(v) = var("INFLUX_HOST") {
            self.host_port = v;
        }
        if let Some(v) = var("INFLUX_ORG") {
            self.organisation = v;
        }
        if let Some(v) = var("INFLUX_BUCKET") {
            self.bucket = v;
        }
        if let Some(v) = var("INFLUX_DAEMON") {
            self.daemon = v;
        }
        if let Some(v) = var("INFLUX_MEASUREMENT") {
            self.measurement = Some(v);
        }
        if let Some(v) = var("INFLUX_TOKEN") {
            self.token = Some(v);
        }
        if let Some(v) = var("INFLUX_FLUSH_INTERVAL_SECS") {
            let secs = v
                .trim()
                .parse()
                .with_context(|| format!("INFLUX_FLUSH_INTERVAL_SECS={v}"))?;
            self.flush_interval_secs = Some(secs);
        }
        Ok(())
    }

    /// Checks bucket, organisation, host and daemon in that order.
    pub fn validate(&self) -> Result<(), ConfigurationError> {
        let required = [
            ("bucket", &self.bucket),
            ("organisation", &self.organisation),
            ("host", &self.host_port),
            ("daemon", &self.daemon),
        ];
        for (name, value) in required {
            if value.trim().is_empty() {
                return Err(ConfigurationError::MissingField(name));
            }
        }
        Ok(())
    }

    pub fn flush_interval(&self) -> Duration {
        match self.flush_interval_secs {
            Some(0) | None => DEFAULT_FLUSH_INTERVAL,
            Some(secs) => Duration::from_secs(secs),
        }
    }

    pub fn measurement(&self) -> &str {
        match &self.measurement {
            Some(m) if !m.is_empty() => m,
            _ => &self.daemon,
        }
    }

    pub fn tag_key(&self) -> &str {
        match &self.tag_scheme {
            TagScheme::PerDaemon => &self.daemon,
            TagScheme::Fixed { key } => key,
        }
    }

    pub fn base_url(&self) -> String {
        let host = self.host_port.trim().trim_end_matches('/');
        if host.starts_with("http://") || host.starts_with("https://") {
            host.to_string()
        } else {
            format!("http://{host}")
        }
    }
}
