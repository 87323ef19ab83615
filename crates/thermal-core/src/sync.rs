use crate::estimator::ThermalState;
use crate::power::{DriveReading, PowerBreakdown};
use serde::Serialize;
use std::sync::Mutex;

/// Everything a passive reader needs from one monitor tick.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize)]
pub struct ThermalSnapshot {
    pub timestamp_us: u64,
    pub tick_count: u64,
    pub motor_on: bool,
    pub temperature_c: f64,
    pub temp_rise_c: f64,
    pub watt_loss_w: f64,
    pub time_constant_h: f64,
    pub max_temp_rise_c: f64,
    pub output_voltage_v: f64,
    pub output_current_a: f64,
    pub speed_rpm: f64,
    pub bus_voltage_v: f64,
    pub output_torque_nm: f64,
    pub shaft_power_kw: f64,
    pub efficiency_pct: f64,
    pub i2r_loss_kw: f64,
    pub tick_gap_s: f64,
    pub read_failures: u64,
    pub computation_errors: u64,
    /// Bumped each time the estimator is returned to ambient.
    pub estimator_resets: u64,
}

impl ThermalSnapshot {
    pub fn compose(
        timestamp_us: u64,
        tick_count: u64,
        reading: &DriveReading,
        power: &PowerBreakdown,
        state: &ThermalState,
    ) -> Self {
        Self {
            timestamp_us,
            tick_count,
            motor_on: state.is_motor_on,
            temperature_c: state.current_temperature,
            temp_rise_c: state.current_delta_temp,
            watt_loss_w: state.current_watt_loss,
            time_constant_h: state.time_constant,
            max_temp_rise_c: state.maximum_temp,
            output_voltage_v: reading.output_voltage_v,
            output_current_a: reading.output_current_a,
            speed_rpm: reading.speed_rpm,
            bus_voltage_v: reading.bus_voltage_v,
            output_torque_nm: power.output_torque_nm,
            shaft_power_kw: power.shaft_power_kw,
            efficiency_pct: power.efficiency_pct,
            i2r_loss_kw: power.i2r_loss_kw,
            ..Self::default()
        }
    }
}

/// Latest-value slot: one writer replaces, any number of readers copy.
struct LatestValue<T: Copy + Default> {
    slot: Mutex<T>,
}

impl<T: Copy + Default> LatestValue<T> {
    fn new() -> Self {
        Self {
            slot: Mutex::new(T::default()),
        }
    }

    fn write(&self, value: T) {
        let mut slot = self.slot.lock().unwrap_or_else(|e| e.into_inner());
        *slot = value;
    }

    fn read(&self) -> T {
        *self.slot.lock().unwrap_or_else(|e| e.into_inner())
    }
}

/// Hands monitor snapshots to read-only consumers (metrics, trend sampler).
pub struct SnapshotExchange {
    snapshot: LatestValue<ThermalSnapshot>,
}

impl SnapshotExchange {
    pub fn new() -> Self {
        Self {
            snapshot: LatestValue::new(),
        }
    }

    /// Called by the monitor loop only.
    pub fn publish(&self, snapshot: ThermalSnapshot) {
        self.snapshot.write(snapshot);
    }

    pub fn read(&self) -> ThermalSnapshot {
        self.snapshot.read()
    }
}

impl Default for SnapshotExchange {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;
    use std::thread;

    #[test]
    fn readers_see_latest_publish() {
        let exchange = Arc::new(SnapshotExchange::new());
        assert_eq!(exchange.read().tick_count, 0);

        let writer = Arc::clone(&exchange);
        thread::spawn(move || {
            for tick in 1..=100 {
                writer.publish(ThermalSnapshot {
                    tick_count: tick,
                    temperature_c: 27.0 + tick as f64,
                    ..ThermalSnapshot::default()
                });
            }
        })
        .join()
        .unwrap();

        let snapshot = exchange.read();
        assert_eq!(snapshot.tick_count, 100);
        assert_eq!(snapshot.temperature_c, 127.0);
    }
}
