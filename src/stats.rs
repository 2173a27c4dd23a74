use std::sync::{Arc, Mutex, PoisonError};

use crate::{
    aggregator::StatAggregator,
    config::InfluxConfig,
    connection::Connection,
    error::{ConfigurationError, CounterError, WriteError},
    exporter::PointExporter,
    flush::{spawn_flush_loop, FlushHandle},
    point::FieldValue,
};

/// Connection, counters and flush loop of one reporting daemon.
///
/// Independent instances share nothing.
#[derive(Debug)]
pub struct InfluxStats {
    conn: Arc<Connection>,
    stats: Arc<StatAggregator>,
    flush: Mutex<Option<FlushHandle>>,
}
impl InfluxStats {
    pub fn new(config: InfluxConfig) -> Self {
        Self::from_connection(Connection::new(config))
    }

    pub fn with_opener<F>(config: InfluxConfig, opener: F) -> Self
    where
        F: Fn(&InfluxConfig) -> Arc<dyn PointExporter> + Send + Sync + 'static,
    {
        Self::from_connection(Connection::with_opener(config, opener))
    }

    fn from_connection(conn: Connection) -> Self {
        Self {
            conn: Arc::new(conn),
            stats: Arc::new(StatAggregator::new()),
            flush: Mutex::new(None),
        }
    }

    pub fn connection(&self) -> &Connection {
        &self.conn
    }
    pub fn counters(&self) -> &StatAggregator {
        &self.stats
    }

    pub fn connect(&self) -> Result<(), ConfigurationError> {
        self.conn.connect()
    }

    /// Writes one point immediately, bypassing the counters.
    pub fn send_data(
        &self,
        measurement: &str,
        name: &str,
        value: impl Into<FieldValue>,
    ) -> Result<(), WriteError> {
        self.conn.send_data(measurement, name, value)
    }

    /// [`send_data`](Self::send_data) under the configured measurement.
    pub fn send_stat(&self, name: &str, value: impl Into<FieldValue>) -> Result<(), WriteError> {
        self.send_data(self.conn.config().measurement(), name, value)
    }

    pub fn increment_counter(
        &self,
        name: &str,
        delta: impl Into<FieldValue>,
    ) -> Result<(), CounterError> {
        self.stats.increment(name, delta)
    }

    /// Starts the flush loop unless one is already running.
    ///
    /// # Panics
    ///
    /// Panics when called outside a tokio runtime.
    pub fn start_flush_loop(&self) {
        let mut flush = self.flush.lock().unwrap_or_else(PoisonError::into_inner);
        if flush.is_some() {
            return;
        }
        *flush = Some(spawn_flush_loop(self.conn.clone(), self.stats.clone()));
    }

    pub fn is_flushing(&self) -> bool {
        self.flush
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .is_some()
    }

    /// Completed flush cycles of the running loop.
    pub fn flush_cycles(&self) -> Option<u64> {
        self.flush
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .as_ref()
            .map(|h| h.cycles())
    }

    /// Stops the flush loop and waits for its tasks to exit.
    pub async fn stop_flush_loop(&self) {
        let handle = self
            .flush
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .take();
        if let Some(handle) = handle {
            handle.stop().await;
        }
    }

    pub fn close(&self) {
        self.conn.close();
    }
}

#[cfg(test)]
mod tests {
    use crate::exporter::InMemExporter;

    use super::*;

    fn stats() -> (InfluxStats, Arc<InMemExporter>) {
        let mut config = InfluxConfig::new("localhost:9999", "org1", "b1", "svc1");
        config.flush_interval_secs = Some(1);
        let exporter = Arc::new(InMemExporter::new());
        let stats = {
            let exporter = exporter.clone();
            InfluxStats::with_opener(config, move |_| exporter.clone() as Arc<dyn PointExporter>)
        };
        (stats, exporter)
    }

    #[test]
    fn test_send_before_connect() {
        let (stats, exporter) = stats();
        assert!(matches!(
            stats.send_data("main", "requests", 1),
            Err(WriteError::NotConnected)
        ));
        assert!(exporter.points().is_empty());
        stats.connect().unwrap();
        stats.send_data("main", "requests", 1).unwrap();
        stats.send_stat("requests", 2).unwrap();
        let points = exporter.points();
        assert_eq!(points.len(), 2);
        assert_eq!(points[0].measurement, "main");
        assert_eq!(points[0].tag, ("svc1".into(), "requests".into()));
        assert_eq!(points[1].measurement, "svc1");
        assert_eq!(points[1].value, FieldValue::Int(2));
    }

    #[test]
    fn test_instances_do_not_share_counters() {
        let (a, _) = stats();
        let (b, _) = stats();
        a.increment_counter("requests", 1).unwrap();
        assert!(b.counters().is_empty());
    }

    #[tokio::test]
    async fn test_start_is_idempotent() {
        let (stats, _) = stats();
        stats.connect().unwrap();
        stats.start_flush_loop();
        stats.start_flush_loop();
        assert!(stats.is_flushing());
        assert_eq!(stats.flush_cycles(), Some(0));
        stats.stop_flush_loop().await;
        assert!(!stats.is_flushing());
        // Stopping twice is harmless.
        stats.stop_flush_loop().await;
        stats.close();
    }
}
