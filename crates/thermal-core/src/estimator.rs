//! Lumped-capacitance estimate of motor winding temperature.
//!
//! The estimator integrates `m·c · dΔT/dt = P_loss − h·A·ΔT` with one
//! forward-Euler step per call to [`ThermalEstimator::update`]. Callers feed it
//! the measured loss in kilowatts and the wall-clock seconds since the previous
//! call; sampling may be irregular.
//!
//! The estimator is single-writer. `update` takes `&mut self`, so two pollers
//! cannot drive the same instance; consumers that only display the result
//! should read a published copy of [`ThermalState`] instead.

use crate::profile::{ConfigError, MotorThermalProfile};
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Elapsed seconds are divided by this before integration. Calibration data
/// depends on it.
pub const ELAPSED_TIME_DIVISOR: f64 = 30.0;
/// Loss arrives in kilowatts; the model works in watts.
pub const WATTS_PER_KILOWATT: f64 = 1000.0;
pub const SECONDS_PER_HOUR: f64 = 3600.0;
/// Increments smaller than this (°C) count as zero.
pub const DEADBAND_C: f64 = 1e-6;

/// What happens to the accumulated rise when an increment falls inside the
/// deadband.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DeadbandPolicy {
    /// The accumulated rise is zeroed along with the increment. Matches the
    /// calibrated bench behaviour, which drops to ambient near equilibrium.
    #[default]
    ResetAccumulated,
    /// Only the increment is suppressed.
    Freeze,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum EstimatorPhase {
    #[default]
    Uninitialized,
    Running,
}

#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct ThermalState {
    /// Rise above ambient in °C.
    pub current_delta_temp: f64,
    /// Ambient plus rise, °C.
    pub current_temperature: f64,
    /// Last loss sample in W.
    pub current_watt_loss: f64,
    /// Hours.
    pub time_constant: f64,
    /// Steady-state rise for the last loss sample, °C.
    pub maximum_temp: f64,
    pub is_motor_on: bool,
}

impl ThermalState {
    fn at_ambient(ambient_temperature: f64, is_motor_on: bool) -> Self {
        Self {
            current_delta_temp: 0.0,
            current_temperature: ambient_temperature,
            current_watt_loss: 0.0,
            time_constant: 0.0,
            maximum_temp: 0.0,
            is_motor_on,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Error)]
pub enum ThermalError {
    #[error("invalid motor profile: {0}")]
    Config(#[from] ConfigError),
    #[error("thermal update divisor `{divisor}` evaluated to {value}")]
    Computation { divisor: &'static str, value: f64 },
    #[error("thermal update produced non-finite `{quantity}` ({value})")]
    NonFinite { quantity: &'static str, value: f64 },
}

#[derive(Debug, Clone)]
pub struct ThermalEstimator {
    profile: MotorThermalProfile,
    policy: DeadbandPolicy,
    state: ThermalState,
    phase: EstimatorPhase,
}

impl ThermalEstimator {
    pub fn new(profile: MotorThermalProfile) -> Result<Self, ThermalError> {
        Self::with_policy(profile, DeadbandPolicy::default())
    }

    pub fn with_policy(
        profile: MotorThermalProfile,
        policy: DeadbandPolicy,
    ) -> Result<Self, ThermalError> {
        profile.validate()?;
        Ok(Self {
            profile,
            policy,
            state: ThermalState::at_ambient(profile.ambient_temperature, false),
            phase: EstimatorPhase::Uninitialized,
        })
    }

    /// Advances the model by one sample and returns the new temperature.
    ///
    /// `loss_kw` is the dissipated power in kilowatts. `delta_time_s` is not
    /// range-checked: zero, negative and very long gaps are all integrated as
    /// given. On error the state is left untouched.
    pub fn update(&mut self, loss_kw: f64, delta_time_s: f64) -> Result<f64, ThermalError> {
        let p = &self.profile;
        let heat_capacity = p.weight_active_parts * p.specific_heat;
        check_divisor("surface_area", p.surface_area)?;
        check_divisor("specific_heat_dissipation", p.specific_heat_dissipation)?;
        check_divisor("heat_capacity", heat_capacity)?;

        let dt = delta_time_s / ELAPSED_TIME_DIVISOR;
        let watt_loss = loss_kw * WATTS_PER_KILOWATT;

        // Left-to-right grouping is intentional: (m·c / A) · h / 3600.
        let time_constant = p.weight_active_parts * p.specific_heat / p.surface_area
            * p.specific_heat_dissipation
            / SECONDS_PER_HOUR;
        let maximum_temp = loss_kw * WATTS_PER_KILOWATT / p.surface_area / p.specific_heat_dissipation;
        check_finite("time_constant", time_constant)?;
        check_finite("maximum_temp", maximum_temp)?;

        if delta_time_s > p.max_monotonic_step_s() {
            log::warn!(
                "thermal step of {:.1} s exceeds the monotonic limit of {:.1} s; estimate may overshoot",
                delta_time_s,
                p.max_monotonic_step_s()
            );
        }

        let mut delta_temp = self.state.current_delta_temp;
        let mut rise = ((watt_loss
            - p.surface_area * p.specific_heat_dissipation * delta_temp)
            * dt)
            / heat_capacity;

        if rise.abs() < DEADBAND_C {
            rise = 0.0;
            if self.policy == DeadbandPolicy::ResetAccumulated {
                delta_temp = 0.0;
            }
        }
        delta_temp += rise;
        check_finite("current_delta_temp", delta_temp)?;

        self.state.current_watt_loss = watt_loss;
        self.state.time_constant = time_constant;
        self.state.maximum_temp = maximum_temp;
        self.state.current_delta_temp = delta_temp;
        self.state.current_temperature = p.ambient_temperature + delta_temp;
        self.phase = EstimatorPhase::Running;

        Ok(self.state.current_temperature)
    }

    /// Returns to ambient. The motor-on flag is kept.
    pub fn reset(&mut self) {
        self.state = ThermalState::at_ambient(self.profile.ambient_temperature, self.state.is_motor_on);
        self.phase = EstimatorPhase::Uninitialized;
    }

    pub fn set_motor_on(&mut self, on: bool) {
        self.state.is_motor_on = on;
    }

    pub fn is_motor_on(&self) -> bool {
        self.state.is_motor_on
    }

    pub fn state(&self) -> &ThermalState {
        &self.state
    }

    pub fn phase(&self) -> EstimatorPhase {
        self.phase
    }

    pub fn profile(&self) -> &MotorThermalProfile {
        &self.profile
    }

    pub fn deadband_policy(&self) -> DeadbandPolicy {
        self.policy
    }
}

fn check_divisor(divisor: &'static str, value: f64) -> Result<(), ThermalError> {
    if value == 0.0 || !value.is_finite() {
        return Err(ThermalError::Computation { divisor, value });
    }
    Ok(())
}

fn check_finite(quantity: &'static str, value: f64) -> Result<(), ThermalError> {
    if !value.is_finite() {
        return Err(ThermalError::NonFinite { quantity, value });
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::profile::MotorPreset;

    fn bench_profile() -> MotorThermalProfile {
        MotorThermalProfile {
            surface_area: 0.104758,
            stator_resistance: 9.4585,
            weight_active_parts: 6.0,
            specific_heat: 750.0,
            specific_heat_dissipation: 540.0,
            torque_constant: 1.867,
            ambient_temperature: 27.0,
        }
    }

    fn close(a: f64, b: f64, tol: f64) -> bool {
        (a - b).abs() <= tol
    }

    #[test]
    fn starts_at_ambient() {
        let est = ThermalEstimator::new(bench_profile()).unwrap();
        assert_eq!(est.state().current_delta_temp, 0.0);
        assert_eq!(est.state().current_temperature, 27.0);
        assert_eq!(est.phase(), EstimatorPhase::Uninitialized);
        assert!(!est.is_motor_on());
    }

    #[test]
    fn first_half_kilowatt_step() {
        let mut est = ThermalEstimator::new(bench_profile()).unwrap();
        let temp = est.update(0.5, 30.0).unwrap();

        let state = est.state();
        assert_eq!(state.current_watt_loss, 500.0);
        assert!(close(state.current_delta_temp, 500.0 / 4500.0, 1e-12));
        assert!(close(temp, 27.0 + 500.0 / 4500.0, 1e-12));
        assert_eq!(temp, state.current_temperature);
        assert_eq!(est.phase(), EstimatorPhase::Running);
    }

    #[test]
    fn diagnostics_use_literal_grouping() {
        let mut est = ThermalEstimator::new(bench_profile()).unwrap();
        est.update(0.5, 30.0).unwrap();

        let p = bench_profile();
        let expected_tau = 6.0 * 750.0 / p.surface_area * 540.0 / 3600.0;
        assert_eq!(est.state().time_constant, expected_tau);
        assert!(close(est.state().time_constant, 6443.42, 0.01));

        let expected_max = 500.0 / p.surface_area / 540.0;
        assert_eq!(est.state().maximum_temp, expected_max);
        assert!(close(est.state().maximum_temp, 8.8387, 1e-3));
    }

    #[test]
    fn rejects_zero_surface_area() {
        let profile = MotorThermalProfile {
            surface_area: 0.0,
            ..bench_profile()
        };
        let err = ThermalEstimator::new(profile).unwrap_err();
        assert!(matches!(
            err,
            ThermalError::Config(ConfigError::NonPositive {
                field: "surface_area",
                ..
            })
        ));
    }

    #[test]
    fn underflowing_heat_capacity_is_a_computation_error() {
        let profile = MotorThermalProfile {
            weight_active_parts: 1e-200,
            specific_heat: 1e-200,
            ..bench_profile()
        };
        let mut est = ThermalEstimator::new(profile).expect("each field is positive");
        let before = *est.state();

        let err = est.update(0.5, 30.0).unwrap_err();
        assert_eq!(
            err,
            ThermalError::Computation {
                divisor: "heat_capacity",
                value: 0.0
            }
        );
        assert_eq!(*est.state(), before);
        assert_eq!(est.phase(), EstimatorPhase::Uninitialized);
    }

    #[test]
    fn overflowing_time_constant_is_rejected() {
        let profile = MotorThermalProfile {
            surface_area: 1e-300,
            ..bench_profile()
        };
        let mut est = ThermalEstimator::new(profile).expect("each field is positive");
        let before = *est.state();

        let err = est.update(0.5, 30.0).unwrap_err();
        assert!(matches!(
            err,
            ThermalError::NonFinite {
                quantity: "time_constant",
                value,
            } if value.is_infinite()
        ));
        assert_eq!(*est.state(), before);
        assert_eq!(est.phase(), EstimatorPhase::Uninitialized);
    }

    #[test]
    fn non_finite_loss_leaves_state_untouched() {
        let mut est = ThermalEstimator::new(bench_profile()).unwrap();
        est.update(0.5, 30.0).unwrap();
        let before = *est.state();

        assert!(matches!(
            est.update(f64::NAN, 30.0),
            Err(ThermalError::NonFinite { .. })
        ));
        assert!(matches!(
            est.update(0.5, f64::INFINITY),
            Err(ThermalError::NonFinite {
                quantity: "current_delta_temp",
                ..
            })
        ));
        assert_eq!(*est.state(), before);
    }

    #[test]
    fn zero_update_under_freeze_keeps_rise() {
        let mut est =
            ThermalEstimator::with_policy(bench_profile(), DeadbandPolicy::Freeze).unwrap();
        est.update(0.5, 30.0).unwrap();
        let before = *est.state();

        est.update(0.0, 0.0).unwrap();
        let after = est.state();
        assert_eq!(after.current_delta_temp, before.current_delta_temp);
        assert_eq!(after.current_temperature, before.current_temperature);
        assert_eq!(after.maximum_temp, 0.0);
        assert_eq!(after.current_watt_loss, 0.0);
    }

    #[test]
    fn zero_update_under_reset_drops_rise() {
        let mut est = ThermalEstimator::new(bench_profile()).unwrap();
        est.update(0.5, 30.0).unwrap();
        assert!(est.state().current_delta_temp > 0.1);

        est.update(0.0, 0.0).unwrap();
        assert_eq!(est.state().current_delta_temp, 0.0);
        assert_eq!(est.state().current_temperature, 27.0);
    }

    #[test]
    fn constant_loss_settles_under_freeze() {
        let mut est =
            ThermalEstimator::with_policy(bench_profile(), DeadbandPolicy::Freeze).unwrap();
        let mut previous = 0.0;
        for _ in 0..3000 {
            est.update(0.5, 30.0).unwrap();
            let delta = est.state().current_delta_temp;
            assert!(delta >= previous, "rise must not decrease");
            previous = delta;
        }
        let state = est.state();
        assert!(close(state.current_delta_temp, state.maximum_temp, 1e-3));
    }

    #[test]
    fn constant_loss_resets_near_equilibrium() {
        let mut est = ThermalEstimator::new(bench_profile()).unwrap();
        let mut peak: f64 = 0.0;
        let mut reset_seen = false;
        for _ in 0..3000 {
            est.update(0.5, 30.0).unwrap();
            let delta = est.state().current_delta_temp;
            if peak > 8.0 && delta == 0.0 {
                reset_seen = true;
                break;
            }
            peak = peak.max(delta);
        }
        assert!(reset_seen, "rise should be zeroed once increments hit the deadband");
        assert!(peak < est.state().maximum_temp);
    }

    #[test]
    fn cools_toward_ambient_without_loss() {
        let mut est =
            ThermalEstimator::with_policy(bench_profile(), DeadbandPolicy::Freeze).unwrap();
        for _ in 0..200 {
            est.update(0.5, 30.0).unwrap();
        }
        let mut previous = est.state().current_delta_temp;
        assert!(previous > 5.0);

        for _ in 0..500 {
            est.update(0.0, 60.0).unwrap();
            let delta = est.state().current_delta_temp;
            assert!(delta <= previous);
            assert!(delta >= 0.0);
            previous = delta;
        }
        assert!(previous < 0.01);
    }

    #[test]
    fn negative_elapsed_time_is_integrated() {
        let mut est = ThermalEstimator::new(bench_profile()).unwrap();
        est.update(0.5, -30.0).unwrap();
        assert!(close(est.state().current_delta_temp, -500.0 / 4500.0, 1e-12));
    }

    #[test]
    fn reset_restores_ambient_and_keeps_motor_flag() {
        let mut est = ThermalEstimator::new(MotorPreset::Motor13684.profile()).unwrap();
        est.set_motor_on(true);
        est.update(0.2, 30.0).unwrap();
        assert!(est.state().current_temperature > 27.0);

        est.reset();
        assert_eq!(est.state().current_temperature, 27.0);
        assert_eq!(est.state().current_delta_temp, 0.0);
        assert_eq!(est.state().time_constant, 0.0);
        assert_eq!(est.phase(), EstimatorPhase::Uninitialized);
        assert!(est.is_motor_on());
    }

    #[test]
    fn motor_flag_does_not_gate_update() {
        let mut on = ThermalEstimator::new(bench_profile()).unwrap();
        let mut off = ThermalEstimator::new(bench_profile()).unwrap();
        on.set_motor_on(true);
        on.update(0.3, 10.0).unwrap();
        off.update(0.3, 10.0).unwrap();
        assert_eq!(
            on.state().current_delta_temp,
            off.state().current_delta_temp
        );
    }

    #[test]
    fn deadband_policy_round_trips_through_json() {
        let json = serde_json::to_string(&DeadbandPolicy::Freeze).unwrap();
        assert_eq!(json, "\"freeze\"");
        let parsed: DeadbandPolicy = serde_json::from_str("\"reset_accumulated\"").unwrap();
        assert_eq!(parsed, DeadbandPolicy::ResetAccumulated);
    }
}
