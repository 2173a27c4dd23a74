use std::sync::{Mutex, PoisonError};

use crate::{codec::encode_point, config::InfluxConfig, error::WriteError, point::Point};

/// Outbound side of the backend: writes one point synchronously.
///
/// Implementations must tolerate concurrent blocking calls.
pub trait PointExporter: core::fmt::Debug + Send + Sync {
    /// Blocking I/O
    fn write_point(&self, point: &Point) -> Result<(), WriteError>;
    fn close(&self) {}
}

/// Writes points to the InfluxDB v2 `/api/v2/write` endpoint.
#[derive(Debug)]
pub struct HttpExporter {
    client: ureq::Agent,
    url: String,
    organisation: String,
    bucket: String,
    token: Option<String>,
}
impl HttpExporter {
    pub fn new(config: &InfluxConfig) -> Self {
        let client = ureq::Agent::new();
        let url = format!("{}/api/v2/write", config.base_url());
        Self {
            client,
            url,
            organisation: config.organisation.clone(),
            bucket: config.bucket.clone(),
            token: config.token.clone().filter(|t| !t.is_empty()),
        }
    }

    pub fn url(&self) -> &str {
        &self.url
    }
}
impl PointExporter for HttpExporter {
    fn write_point(&self, point: &Point) -> Result<(), WriteError> {
        let mut buf = vec![];
        encode_point(&mut buf, point).map_err(|e| WriteError::InvalidPoint(e.to_string()))?;
        let req = self
            .client
            .post(&self.url)
            .query("org", &self.organisation)
            .query("bucket", &self.bucket)
            .query("precision", "ns")
            .set("Content-Type", "text/plain; charset=utf-8");
        let req = match &self.token {
            Some(token) => req.set("Authorization", &format!("Token {token}")),
            None => req,
        };
        let _resp = req.send_bytes(&buf)?;
        Ok(())
    }
}

/// Keeps every written point in memory.
#[derive(Debug, Default)]
pub struct InMemExporter {
    points: Mutex<Vec<Point>>,
}
impl InMemExporter {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn points(&self) -> Vec<Point> {
        self.points
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }
    pub fn take(&self) -> Vec<Point> {
        core::mem::take(&mut *self.points.lock().unwrap_or_else(PoisonError::into_inner))
    }
}
impl PointExporter for InMemExporter {
    fn write_point(&self, point: &Point) -> Result<(), WriteError> {
        self.points
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(point.clone());
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_http_url() {
        let mut config = InfluxConfig::new("localhost:8086", "org1", "b1", "svc1");
        config.token = Some(String::new());
        let exporter = HttpExporter::new(&config);
        assert_eq!(exporter.url(), "http://localhost:8086/api/v2/write");
        assert!(exporter.token.is_none());
    }

    #[test]
    fn test_http_rejects_non_finite_before_sending() {
        // Nothing listens on port 9; encoding fails before any request is made.
        let exporter = HttpExporter::new(&InfluxConfig::new("127.0.0.1:9", "org1", "b1", "svc1"));
        let err = exporter
            .write_point(&Point::new("svc1", "svc1", "x", f64::NAN))
            .unwrap_err();
        assert!(matches!(err, WriteError::InvalidPoint(_)));
    }

    #[test]
    fn test_in_mem() {
        let exporter = InMemExporter::new();
        exporter
            .write_point(&Point::new("m", "k", "v", 1))
            .unwrap();
        assert_eq!(exporter.points().len(), 1);
        assert_eq!(exporter.take().len(), 1);
        assert!(exporter.points().is_empty());
    }
}
