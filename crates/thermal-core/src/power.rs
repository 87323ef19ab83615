use crate::profile::MotorThermalProfile;
use serde::{Deserialize, Serialize};

/// Converts torque (Nm) times speed (rpm) into kilowatts.
pub const NM_RPM_PER_KW: f64 = 9550.0;

/// One scaled sample of drive outputs.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct DriveReading {
    pub output_voltage_v: f64,
    pub output_current_a: f64,
    pub speed_rpm: f64,
    pub bus_voltage_v: f64,
}

/// Power figures derived from a [`DriveReading`], all in kW unless noted.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct PowerBreakdown {
    pub input_power_kw: f64,
    pub output_torque_nm: f64,
    pub shaft_power_kw: f64,
    pub efficiency_pct: f64,
    pub loss_kw: f64,
    pub i2r_loss_kw: f64,
}

impl PowerBreakdown {
    /// Applies the bench's calibrated formulas. Input power is taken as
    /// `V² / 1000` and torque as `Kt · I`; the difference between input and
    /// shaft power is the loss fed to the thermal model.
    pub fn from_reading(reading: &DriveReading, profile: &MotorThermalProfile) -> Self {
        let input_power_kw = reading.output_voltage_v * reading.output_voltage_v / 1000.0;
        let output_torque_nm = profile.torque_constant * reading.output_current_a;
        let shaft_power_kw = output_torque_nm * reading.speed_rpm / NM_RPM_PER_KW;

        let efficiency_pct = if input_power_kw == 0.0 {
            0.0
        } else {
            shaft_power_kw / input_power_kw * 100.0
        };

        let i2r_loss_kw =
            reading.output_current_a * reading.output_current_a * profile.stator_resistance / 1000.0;

        Self {
            input_power_kw,
            output_torque_nm,
            shaft_power_kw,
            efficiency_pct,
            loss_kw: input_power_kw - shaft_power_kw,
            i2r_loss_kw,
        }
    }
}
