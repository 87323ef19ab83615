//! Prometheus metrics for the thermal bench.
//!
//! Gauges mirror the latest monitor snapshot; counters track tick health.

use prometheus::{Encoder, Gauge, Histogram, HistogramOpts, IntCounter, Registry, TextEncoder};
use std::sync::LazyLock;
use std::thread;
use thermal_core::{tags, ThermalSnapshot};
use tiny_http::{Response, Server};

/// Global metrics registry
pub static REGISTRY: LazyLock<Registry> = LazyLock::new(Registry::new);

fn register_gauge(name: &str, help: &str) -> Gauge {
    let gauge = Gauge::new(name, help).expect("valid gauge definition");
    REGISTRY
        .register(Box::new(gauge.clone()))
        .expect("gauge registered once");
    gauge
}

fn register_counter(name: &str, help: &str) -> IntCounter {
    let counter = IntCounter::new(name, help).expect("valid counter definition");
    REGISTRY
        .register(Box::new(counter.clone()))
        .expect("counter registered once");
    counter
}

// ============================================================================
// Monitor Loop Metrics
// ============================================================================

pub static TICKS_EXECUTED: LazyLock<IntCounter> = LazyLock::new(|| {
    register_counter(
        "thermal_bench_ticks_executed_total",
        "Monitor ticks that updated the thermal estimate",
    )
});

pub static READ_FAILURES: LazyLock<IntCounter> = LazyLock::new(|| {
    register_counter(
        "thermal_bench_drive_read_failures_total",
        "Monitor ticks skipped because the drive could not be read",
    )
});

pub static COMPUTATION_ERRORS: LazyLock<IntCounter> = LazyLock::new(|| {
    register_counter(
        "thermal_bench_computation_errors_total",
        "Thermal updates rejected for a zero or non-finite divisor",
    )
});

/// Gap of the latest update, observed once per metrics refresh. Its sample
/// count trails `TICKS_EXECUTED` when the monitor polls faster than the
/// refresh.
pub static TICK_GAP_S: LazyLock<Histogram> = LazyLock::new(|| {
    let histogram = Histogram::with_opts(
        HistogramOpts::new(
            tags::TICK_GAP_S.metric,
            "Elapsed seconds integrated by the latest thermal update, sampled per metrics refresh",
        )
        .buckets(vec![0.05, 0.1, 0.25, 0.5, 1.0, 2.5, 5.0, 30.0, 300.0]),
    )
    .expect("valid histogram definition");
    REGISTRY
        .register(Box::new(histogram.clone()))
        .expect("histogram registered once");
    histogram
});

// ============================================================================
// Thermal State Metrics
// ============================================================================

pub static MOTOR_TEMP_C: LazyLock<Gauge> = LazyLock::new(|| {
    register_gauge(tags::MOTOR_TEMP_C.metric, "Estimated winding temperature in Celsius")
});

pub static TEMP_RISE_C: LazyLock<Gauge> = LazyLock::new(|| {
    register_gauge(tags::TEMP_RISE_C.metric, "Estimated rise above ambient in Celsius")
});

pub static WATT_LOSS_W: LazyLock<Gauge> =
    LazyLock::new(|| register_gauge(tags::WATT_LOSS_W.metric, "Latest power loss in watts"));

pub static TIME_CONSTANT_H: LazyLock<Gauge> = LazyLock::new(|| {
    register_gauge(tags::TIME_CONSTANT_H.metric, "Thermal time constant in hours")
});

pub static MAX_TEMP_RISE_C: LazyLock<Gauge> = LazyLock::new(|| {
    register_gauge(
        tags::MAX_TEMP_RISE_C.metric,
        "Steady-state rise for the latest loss in Celsius",
    )
});

// ============================================================================
// Electrical Metrics
// ============================================================================

pub static SHAFT_POWER_KW: LazyLock<Gauge> = LazyLock::new(|| {
    register_gauge(tags::SHAFT_POWER_KW.metric, "Calculated shaft power in kW")
});

pub static EFFICIENCY_PCT: LazyLock<Gauge> = LazyLock::new(|| {
    register_gauge(tags::EFFICIENCY_PCT.metric, "Shaft over input power in percent")
});

pub static I2R_LOSS_KW: LazyLock<Gauge> =
    LazyLock::new(|| register_gauge(tags::I2R_LOSS_KW.metric, "Stator I2R loss in kW"));

pub static MOTOR_SPEED_RPM: LazyLock<Gauge> =
    LazyLock::new(|| register_gauge(tags::MOTOR_SPEED_RPM.metric, "Drive output speed in RPM"));

/// Motor run flag (1 = on, 0 = off)
pub static MOTOR_ON: LazyLock<Gauge> = LazyLock::new(|| {
    register_gauge("thermal_bench_motor_on", "Motor run flag (1=on, 0=off)")
});

/// Copies a snapshot into the gauges.
pub fn record_snapshot(snapshot: &ThermalSnapshot) {
    MOTOR_TEMP_C.set(snapshot.temperature_c);
    TEMP_RISE_C.set(snapshot.temp_rise_c);
    WATT_LOSS_W.set(snapshot.watt_loss_w);
    TIME_CONSTANT_H.set(snapshot.time_constant_h);
    MAX_TEMP_RISE_C.set(snapshot.max_temp_rise_c);
    SHAFT_POWER_KW.set(snapshot.shaft_power_kw);
    EFFICIENCY_PCT.set(snapshot.efficiency_pct);
    I2R_LOSS_KW.set(snapshot.i2r_loss_kw);
    MOTOR_SPEED_RPM.set(snapshot.speed_rpm);
    MOTOR_ON.set(if snapshot.motor_on { 1.0 } else { 0.0 });
}

/// Tracks counter progress between snapshots so each tick is counted once.
/// The tick-gap histogram gets one observation per advance that saw new ticks.
#[derive(Debug, Default, Clone, Copy)]
pub struct CounterCursor {
    ticks: u64,
    read_failures: u64,
    computation_errors: u64,
}

impl CounterCursor {
    pub fn advance(&mut self, snapshot: &ThermalSnapshot) {
        if snapshot.tick_count > self.ticks {
            TICKS_EXECUTED.inc_by(snapshot.tick_count - self.ticks);
            TICK_GAP_S.observe(snapshot.tick_gap_s);
            self.ticks = snapshot.tick_count;
        }
        if snapshot.read_failures > self.read_failures {
            READ_FAILURES.inc_by(snapshot.read_failures - self.read_failures);
            self.read_failures = snapshot.read_failures;
        }
        if snapshot.computation_errors > self.computation_errors {
            COMPUTATION_ERRORS.inc_by(snapshot.computation_errors - self.computation_errors);
            self.computation_errors = snapshot.computation_errors;
        }
    }
}

// ============================================================================
// Metrics HTTP Server
// ============================================================================

/// Renders the registry in the Prometheus text format.
pub fn render() -> Result<Vec<u8>, prometheus::Error> {
    let encoder = TextEncoder::new();
    let mut buffer = Vec::new();
    encoder.encode(&REGISTRY.gather(), &mut buffer)?;
    Ok(buffer)
}

/// Start the metrics HTTP server on the given address.
/// Returns a join handle for the server thread.
pub fn serve_metrics(bind_addr: String) -> thread::JoinHandle<()> {
    thread::spawn(move || {
        let server = match Server::http(&bind_addr) {
            Ok(s) => s,
            Err(e) => {
                tracing::error!("Failed to start metrics server on {}: {}", bind_addr, e);
                return;
            }
        };

        tracing::info!("Metrics server listening on http://{}/metrics", bind_addr);

        for request in server.incoming_requests() {
            match request.url() {
                "/metrics" => {
                    let buffer = match render() {
                        Ok(buffer) => buffer,
                        Err(e) => {
                            tracing::warn!("Failed to encode metrics: {}", e);
                            let _ = request.respond(
                                Response::from_string("Internal Server Error")
                                    .with_status_code(500),
                            );
                            continue;
                        }
                    };

                    let mut response = Response::from_data(buffer);
                    if let Ok(header) = tiny_http::Header::from_bytes(
                        &b"Content-Type"[..],
                        &b"text/plain; version=0.0.4"[..],
                    ) {
                        response = response.with_header(header);
                    }
                    let _ = request.respond(response);
                }
                "/health" => {
                    let _ = request.respond(Response::from_string("OK"));
                }
                "/ready" => {
                    // Ready once the estimator has seen a sample
                    if TICKS_EXECUTED.get() > 0 {
                        let _ = request.respond(Response::from_string("Ready"));
                    } else {
                        let _ = request
                            .respond(Response::from_string("Not Ready").with_status_code(503));
                    }
                }
                _ => {
                    let _ =
                        request.respond(Response::from_string("Not Found").with_status_code(404));
                }
            }
        }
    })
}

/// Initialize all metrics (forces lazy initialization)
pub fn init_metrics() {
    let _ = TICKS_EXECUTED.get();
    let _ = READ_FAILURES.get();
    let _ = COMPUTATION_ERRORS.get();
    let _ = TICK_GAP_S.get_sample_count();
    let _ = MOTOR_TEMP_C.get();
    let _ = TEMP_RISE_C.get();
    let _ = WATT_LOSS_W.get();
    let _ = TIME_CONSTANT_H.get();
    let _ = MAX_TEMP_RISE_C.get();
    let _ = SHAFT_POWER_KW.get();
    let _ = EFFICIENCY_PCT.get();
    let _ = I2R_LOSS_KW.get();
    let _ = MOTOR_SPEED_RPM.get();
    let _ = MOTOR_ON.get();
}
