use anyhow::Context;
use influx_stats::{logging::init_logging, InfluxConfig, InfluxStats};
use tracing::info;

/// Reports liveness of this process until Ctrl-C.
///
/// Usage: `influx-stats [config.toml]`; `INFLUX_*` environment variables override the file.
#[tokio::main]
async fn main() -> anyhow::Result<()> {
    init_logging();

    let mut config = match std::env::args().nth(1) {
        Some(path) => InfluxConfig::load(path)?,
        None => InfluxConfig::default(),
    };
    config.apply_env_overrides()?;

    let stats = InfluxStats::new(config);
    stats.connect().context("connect to influxdb")?;
    stats.increment_counter("Started", 1)?;
    stats.start_flush_loop();

    tokio::signal::ctrl_c().await?;
    info!("shutting down");
    stats.stop_flush_loop().await;
    stats.close();
    Ok(())
}
