//! Bounded history of snapshots, sampled on its own cadence for plotting.

use crate::sync::ThermalSnapshot;
use serde::Serialize;
use std::collections::VecDeque;

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct TrendSample {
    /// Seconds since the first recorded sample.
    pub time_s: f64,
    pub temperature_c: f64,
    pub temp_rise_c: f64,
    pub watt_loss_w: f64,
    pub i2r_loss_kw: f64,
    pub speed_rpm: f64,
}

#[derive(Debug, Clone)]
pub struct TrendRecorder {
    capacity: usize,
    origin_us: Option<u64>,
    estimator_resets: u64,
    samples: VecDeque<TrendSample>,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct TrendSummary {
    pub samples: usize,
    pub span_s: f64,
    pub peak_temperature_c: f64,
    pub final_temperature_c: f64,
    pub mean_watt_loss_w: f64,
}

impl TrendRecorder {
    pub fn new(capacity: usize) -> Self {
        Self {
            capacity: capacity.max(1),
            origin_us: None,
            estimator_resets: 0,
            samples: VecDeque::with_capacity(capacity.clamp(1, 4096)),
        }
    }

    /// Appends a sample. Snapshots published before the first monitor tick are
    /// skipped, and history restarts when the estimator has been reset.
    /// Returns whether a sample was kept.
    pub fn record(&mut self, snapshot: &ThermalSnapshot) -> bool {
        if snapshot.tick_count == 0 {
            return false;
        }
        if snapshot.estimator_resets != self.estimator_resets {
            self.clear();
            self.estimator_resets = snapshot.estimator_resets;
        }
        let origin = *self.origin_us.get_or_insert(snapshot.timestamp_us);
        let time_s = snapshot.timestamp_us.saturating_sub(origin) as f64 / 1_000_000.0;

        if self.samples.len() == self.capacity {
            self.samples.pop_front();
        }
        self.samples.push_back(TrendSample {
            time_s,
            temperature_c: snapshot.temperature_c,
            temp_rise_c: snapshot.temp_rise_c,
            watt_loss_w: snapshot.watt_loss_w,
            i2r_loss_kw: snapshot.i2r_loss_kw,
            speed_rpm: snapshot.speed_rpm,
        });
        true
    }

    pub fn samples(&self) -> impl Iterator<Item = &TrendSample> {
        self.samples.iter()
    }

    pub fn len(&self) -> usize {
        self.samples.len()
    }

    pub fn is_empty(&self) -> bool {
        self.samples.is_empty()
    }

    pub fn latest(&self) -> Option<&TrendSample> {
        self.samples.back()
    }

    pub fn clear(&mut self) {
        self.samples.clear();
        self.origin_us = None;
    }

    pub fn summary(&self) -> Option<TrendSummary> {
        let first = self.samples.front()?;
        let last = self.samples.back()?;
        let peak = self
            .samples
            .iter()
            .map(|s| s.temperature_c)
            .fold(f64::NEG_INFINITY, f64::max);
        let mean_loss =
            self.samples.iter().map(|s| s.watt_loss_w).sum::<f64>() / self.samples.len() as f64;

        Some(TrendSummary {
            samples: self.samples.len(),
            span_s: last.time_s - first.time_s,
            peak_temperature_c: peak,
            final_temperature_c: last.temperature_c,
            mean_watt_loss_w: mean_loss,
        })
    }
}
