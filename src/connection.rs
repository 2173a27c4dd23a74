use std::{
    sync::{Arc, PoisonError, RwLock},
    time::SystemTime,
};

use tracing::{debug, info};

use crate::{
    config::InfluxConfig,
    error::{ConfigurationError, WriteError},
    exporter::{HttpExporter, PointExporter},
    point::{FieldValue, Point},
};

type Opener = dyn Fn(&InfluxConfig) -> Arc<dyn PointExporter> + Send + Sync;

/// Connection state for one backend plus the point writer on top of it.
pub struct Connection {
    config: InfluxConfig,
    opener: Box<Opener>,
    client: RwLock<Option<Arc<dyn PointExporter>>>,
}
impl Connection {
    /// Connects through [`HttpExporter`].
    pub fn new(config: InfluxConfig) -> Self {
        Self::with_opener(config, |config| {
            Arc::new(HttpExporter::new(config)) as Arc<dyn PointExporter>
        })
    }

    /// `opener` builds the backend client on each successful `connect`.
    pub fn with_opener<F>(config: InfluxConfig, opener: F) -> Self
    where
        F: Fn(&InfluxConfig) -> Arc<dyn PointExporter> + Send + Sync + 'static,
    {
        Self {
            config,
            opener: Box::new(opener),
            client: RwLock::new(None),
        }
    }

    pub fn config(&self) -> &InfluxConfig {
        &self.config
    }

    /// No-op while already connected.
    pub fn connect(&self) -> Result<(), ConfigurationError> {
        let mut client = self.client.write().unwrap_or_else(PoisonError::into_inner);
        if client.is_some() {
            return Ok(());
        }
        self.config.validate()?;
        *client = Some((self.opener)(&self.config));
        info!(
            host = %self.config.host_port,
            org = %self.config.organisation,
            bucket = %self.config.bucket,
            daemon = %self.config.daemon,
            "connected to influxdb"
        );
        Ok(())
    }

    pub fn is_connected(&self) -> bool {
        self.client
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .is_some()
    }

    /// Releases the backend client. Writes already in flight keep their handle and finish.
    pub fn close(&self) {
        let client = self
            .client
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .take();
        if let Some(client) = client {
            client.close();
            info!(daemon = %self.config.daemon, "closed influxdb connection");
        }
    }

    /// Builds a point tagged according to the configured tag scheme and writes it.
    pub fn write(
        &self,
        measurement: &str,
        tag_value: &str,
        value: impl Into<FieldValue>,
        time: SystemTime,
    ) -> Result<(), WriteError> {
        let client = self.client()?;
        let value = value.into();
        if let FieldValue::Float(v) = value {
            if !v.is_finite() {
                return Err(WriteError::InvalidPoint(format!(
                    "non-finite value {v} for `{tag_value}`"
                )));
            }
        }
        let point = Point::new(measurement, self.config.tag_key(), tag_value, value).at(time);
        debug!(measurement, tag = tag_value, value = ?point.value, "write point");
        client.write_point(&point)
    }

    pub fn send_data(
        &self,
        measurement: &str,
        tag_value: &str,
        value: impl Into<FieldValue>,
    ) -> Result<(), WriteError> {
        self.write(measurement, tag_value, value, SystemTime::now())
    }

    fn client(&self) -> Result<Arc<dyn PointExporter>, WriteError> {
        self.client
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
            .ok_or(WriteError::NotConnected)
    }
}
impl core::fmt::Debug for Connection {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("Connection")
            .field("config", &self.config)
            .field("connected", &self.is_connected())
            .finish()
    }
}
