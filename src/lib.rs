pub mod aggregator;
pub mod codec;
pub mod config;
pub mod connection;
pub mod error;
pub mod exporter;
pub mod flush;
pub mod logging;
pub mod point;
pub mod stats;

pub use config::{InfluxConfig, TagScheme};
pub use error::{ConfigurationError, CounterError, WriteError};
pub use point::{FieldValue, Point};
pub use stats::InfluxStats;

pub type MetricKey = String;
