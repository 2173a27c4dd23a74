use std::{
    sync::{
        atomic::{AtomicU64, Ordering},
        Arc,
    },
    time::Duration,
};

use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use crate::{
    aggregator::{Snapshot, StatAggregator},
    connection::Connection,
    error::WriteError,
};

pub const HEARTBEAT_INTERVAL: Duration = Duration::from_secs(1);
/// Tag value of the liveness point.
pub const RUNNING_MARKER: &str = "IsRunning";

/// Running flush loop (and heartbeat task, if configured).
///
/// Dropping the handle requests a stop without waiting for the tasks.
#[derive(Debug)]
pub struct FlushHandle {
    token: CancellationToken,
    tasks: Vec<JoinHandle<()>>,
    cycles: Arc<AtomicU64>,
    heartbeats: Arc<AtomicU64>,
}
impl FlushHandle {
    /// Completed flush cycles.
    pub fn cycles(&self) -> u64 {
        self.cycles.load(Ordering::Acquire)
    }
    pub fn heartbeats(&self) -> u64 {
        self.heartbeats.load(Ordering::Acquire)
    }
    pub fn is_finished(&self) -> bool {
        self.tasks.iter().all(|t| t.is_finished())
    }

    /// Requests a stop and waits for every task to exit.
    ///
    /// A flush already writing runs to completion first.
    pub async fn stop(mut self) {
        self.token.cancel();
        for task in core::mem::take(&mut self.tasks) {
            if let Err(e) = task.await {
                warn!(error = %e, "flush task ended abnormally");
            }
        }
    }
}
impl Drop for FlushHandle {
    fn drop(&mut self) {
        self.token.cancel();
    }
}

/// Spawns the flush loop onto the current tokio runtime.
///
/// # Panics
///
/// Panics when called outside a tokio runtime.
pub fn spawn_flush_loop(conn: Arc<Connection>, stats: Arc<StatAggregator>) -> FlushHandle {
    let token = CancellationToken::new();
    let cycles = Arc::new(AtomicU64::new(0));
    let heartbeats = Arc::new(AtomicU64::new(0));
    let interval = conn.config().flush_interval();
    let heartbeat = conn.config().heartbeat;
    info!(
        interval = %humantime::format_duration(interval),
        heartbeat,
        "starting flush loop"
    );

    let mut tasks = vec![];
    tasks.push(tokio::spawn(flush_loop(
        conn.clone(),
        stats,
        interval,
        token.clone(),
        cycles.clone(),
    )));
    if heartbeat {
        tasks.push(tokio::spawn(heartbeat_loop(
            conn,
            token.clone(),
            heartbeats.clone(),
        )));
    }
    FlushHandle {
        token,
        tasks,
        cycles,
        heartbeats,
    }
}

async fn flush_loop(
    conn: Arc<Connection>,
    stats: Arc<StatAggregator>,
    interval: Duration,
    token: CancellationToken,
    cycles: Arc<AtomicU64>,
) {
    let running_marker = conn.config().running_marker;
    if running_marker {
        write_blocking(&conn, |conn| {
            if let Err(e) = send_running_marker(conn) {
                warn!(error = %e, "write running marker");
            }
        })
        .await;
    }
    loop {
        tokio::select! {
            () = tokio::time::sleep(interval) => {}
            () = token.cancelled() => break,
        }
        let snapshot = stats.drain_and_reset();
        write_blocking(&conn, move |conn| {
            flush_snapshot(conn, snapshot, running_marker);
        })
        .await;
        cycles.fetch_add(1, Ordering::AcqRel);
    }
    debug!("flush loop stopped");
}

async fn heartbeat_loop(conn: Arc<Connection>, token: CancellationToken, beats: Arc<AtomicU64>) {
    loop {
        tokio::select! {
            () = tokio::time::sleep(HEARTBEAT_INTERVAL) => {}
            () = token.cancelled() => break,
        }
        write_blocking(&conn, |conn| {
            if let Err(e) = send_running_marker(conn) {
                warn!(error = %e, "write heartbeat");
            }
        })
        .await;
        beats.fetch_add(1, Ordering::AcqRel);
    }
    debug!("heartbeat stopped");
}

/// Writes every drained counter; failures are logged and skipped.
fn flush_snapshot(conn: &Connection, snapshot: Snapshot, running_marker: bool) {
    let measurement = conn.config().measurement();
    if running_marker {
        if let Err(e) = send_running_marker(conn) {
            warn!(error = %e, "write running marker");
        }
    }
    let mut failed = 0;
    let total = snapshot.len();
    for (key, value) in snapshot {
        if let Err(e) = conn.send_data(measurement, &key, value) {
            warn!(error = %e, key = %key, "write counter");
            failed += 1;
        }
    }
    debug!(total, failed, "flushed counters");
}

fn send_running_marker(conn: &Connection) -> Result<(), WriteError> {
    conn.send_data(conn.config().measurement(), RUNNING_MARKER, 1)
}

/// Runs a blocking backend call off the async worker threads.
async fn write_blocking<F>(conn: &Arc<Connection>, f: F)
where
    F: FnOnce(&Connection) + Send + 'static,
{
    let conn = conn.clone();
    if let Err(e) = tokio::task::spawn_blocking(move || f(&conn)).await {
        warn!(error = %e, "blocking write task failed");
    }
}
