use std::sync::{atomic::AtomicBool, Arc};
use std::thread;
use std::time::Duration;
use thermal_core::{SnapshotExchange, TrendRecorder};
use thermal_io::metrics::{init_metrics, record_snapshot, serve_metrics, CounterCursor};
use tracing::{debug, info};

pub fn init() {
    init_metrics();
}

pub fn start_metrics_server(addr: &Option<String>) -> Option<thread::JoinHandle<()>> {
    addr.as_ref().map(|addr| {
        info!(addr = %addr, "Starting metrics server");
        serve_metrics(addr.clone())
    })
}

pub fn start_metrics_updater(
    exchange: Arc<SnapshotExchange>,
    stop: Arc<AtomicBool>,
) -> thread::JoinHandle<()> {
    thread::spawn(move || {
        let mut cursor = CounterCursor::default();
        while !stop.load(std::sync::atomic::Ordering::Relaxed) {
            let snapshot = exchange.read();
            record_snapshot(&snapshot);
            cursor.advance(&snapshot);
            thread::sleep(Duration::from_millis(200));
        }
    })
}

/// Samples published snapshots on its own cadence, like the bench's live
/// graph. Returns the recorded history when stopped.
pub fn start_trend_sampler(
    exchange: Arc<SnapshotExchange>,
    stop: Arc<AtomicBool>,
    interval: Duration,
    capacity: usize,
) -> thread::JoinHandle<TrendRecorder> {
    thread::spawn(move || {
        let mut trend = TrendRecorder::new(capacity);
        while !stop.load(std::sync::atomic::Ordering::Relaxed) {
            let snapshot = exchange.read();
            if trend.record(&snapshot) {
                debug!(
                    temperature_c = snapshot.temperature_c,
                    temp_rise_c = snapshot.temp_rise_c,
                    watt_loss_w = snapshot.watt_loss_w,
                    "trend sample"
                );
            }
            thread::sleep(interval);
        }
        trend
    })
}
