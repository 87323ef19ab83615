//! Motor nameplate and autotune block of the drive.
//!
//! The bench reads these parameters when it connects and writes them back
//! before each run, so the drive always controls the motor it is bolted to.

use crate::drive::{params, DriveError, DriveLink};
use crate::profile::ConfigError;
use serde::{Deserialize, Serialize};

/// Maximum output frequency written ahead of the nameplate block.
pub const BENCH_MAX_FREQUENCY_HZ: f64 = 150.0;

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct MotorNameplate {
    pub voltage_v: f64,
    pub frequency_hz: f64,
    pub overload_current_a: f64,
    pub full_load_current_a: f64,
    pub poles: u16,
    pub rated_rpm: f64,
    pub power_kw: f64,
    /// Stator IR drop from autotune, V.
    pub ir_drop_v: f64,
    pub ixd_drop_v: f64,
    pub ixq_drop_v: f64,
    pub bemf_v: f64,
}

impl MotorNameplate {
    pub fn validate(&self) -> Result<(), ConfigError> {
        let ratings = [
            ("voltage_v", self.voltage_v),
            ("frequency_hz", self.frequency_hz),
            ("overload_current_a", self.overload_current_a),
            ("full_load_current_a", self.full_load_current_a),
            ("rated_rpm", self.rated_rpm),
            ("power_kw", self.power_kw),
        ];
        for (field, value) in ratings {
            if !(value.is_finite() && value > 0.0) {
                return Err(ConfigError::NonPositive { field, value });
            }
        }

        if self.poles == 0 || self.poles % 2 != 0 {
            return Err(ConfigError::InvalidPoleCount(self.poles));
        }

        let autotune = [
            ("ir_drop_v", self.ir_drop_v),
            ("ixd_drop_v", self.ixd_drop_v),
            ("ixq_drop_v", self.ixq_drop_v),
            ("bemf_v", self.bemf_v),
        ];
        for (field, value) in autotune {
            if !value.is_finite() {
                return Err(ConfigError::NonFinite { field, value });
            }
        }
        Ok(())
    }

    /// Synchronous speed at nameplate frequency.
    pub fn synchronous_rpm(&self) -> f64 {
        120.0 * self.frequency_hz / f64::from(self.poles)
    }

    /// Parameter id and raw value for every nameplate register, in write order.
    fn registers(&self) -> [(u16, f64); 11] {
        [
            (params::MOTOR_NP_VOLTS, self.voltage_v),
            (params::MOTOR_NP_HERTZ, self.frequency_hz),
            (
                params::MOTOR_OL_CURRENT,
                self.overload_current_a * params::NAMEPLATE_CURRENT_SCALE,
            ),
            (
                params::MOTOR_NP_FLA,
                self.full_load_current_a * params::NAMEPLATE_CURRENT_SCALE,
            ),
            (params::MOTOR_NP_POLES, f64::from(self.poles)),
            (params::MOTOR_NP_RPM, self.rated_rpm),
            (params::MOTOR_NP_POWER, self.power_kw * params::POWER_SCALE),
            (
                params::IR_VOLTAGE_DROP,
                self.ir_drop_v * params::DROP_VOLTAGE_SCALE,
            ),
            (
                params::IXD_VOLTAGE_DROP,
                self.ixd_drop_v * params::DROP_VOLTAGE_SCALE,
            ),
            (
                params::IXQ_VOLTAGE_DROP,
                self.ixq_drop_v * params::DROP_VOLTAGE_SCALE,
            ),
            (params::BEMF_VOLTAGE, self.bemf_v * params::VOLTAGE_SCALE),
        ]
    }
}

pub fn read_nameplate<D: DriveLink + ?Sized>(drive: &mut D) -> Result<MotorNameplate, DriveError> {
    let poles = drive.read_param(params::MOTOR_NP_POLES)?;
    Ok(MotorNameplate {
        voltage_v: drive.read_param(params::MOTOR_NP_VOLTS)?,
        frequency_hz: drive.read_param(params::MOTOR_NP_HERTZ)?,
        overload_current_a: drive.read_param(params::MOTOR_OL_CURRENT)?
            / params::NAMEPLATE_CURRENT_SCALE,
        full_load_current_a: drive.read_param(params::MOTOR_NP_FLA)?
            / params::NAMEPLATE_CURRENT_SCALE,
        poles: poles.round().clamp(0.0, f64::from(u16::MAX)) as u16,
        rated_rpm: drive.read_param(params::MOTOR_NP_RPM)?,
        power_kw: drive.read_param(params::MOTOR_NP_POWER)? / params::POWER_SCALE,
        ir_drop_v: drive.read_param(params::IR_VOLTAGE_DROP)? / params::DROP_VOLTAGE_SCALE,
        ixd_drop_v: drive.read_param(params::IXD_VOLTAGE_DROP)? / params::DROP_VOLTAGE_SCALE,
        ixq_drop_v: drive.read_param(params::IXQ_VOLTAGE_DROP)? / params::DROP_VOLTAGE_SCALE,
        bemf_v: drive.read_param(params::BEMF_VOLTAGE)? / params::VOLTAGE_SCALE,
    })
}

/// Writes the maximum frequency, then the nameplate block. Stops at the
/// first rejected register.
pub fn write_nameplate<D: DriveLink + ?Sized>(
    drive: &mut D,
    nameplate: &MotorNameplate,
) -> Result<(), DriveError> {
    drive.write_param(
        params::MAXIMUM_FREQUENCY,
        (BENCH_MAX_FREQUENCY_HZ * params::FREQUENCY_SCALE).round(),
    )?;
    for (id, raw) in nameplate.registers() {
        drive.write_param(id, raw.round())?;
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    #[derive(Default)]
    struct RegisterLog {
        values: HashMap<u16, f64>,
        order: Vec<u16>,
        reject: Option<u16>,
    }

    impl DriveLink for RegisterLog {
        fn read_param(&mut self, id: u16) -> Result<f64, DriveError> {
            self.values
                .get(&id)
                .copied()
                .ok_or(DriveError::UnknownParameter(id))
        }

        fn write_param(&mut self, id: u16, value: f64) -> Result<(), DriveError> {
            if self.reject == Some(id) {
                return Err(DriveError::Write {
                    id,
                    reason: "rejected".to_string(),
                });
            }
            self.order.push(id);
            self.values.insert(id, value);
            Ok(())
        }
    }

    fn nameplate() -> MotorNameplate {
        MotorNameplate {
            voltage_v: 230.0,
            frequency_hz: 60.0,
            overload_current_a: 2.2,
            full_load_current_a: 2.0,
            poles: 4,
            rated_rpm: 1746.0,
            power_kw: 0.37,
            ir_drop_v: 2.5,
            ixd_drop_v: 11.0,
            ixq_drop_v: 10.5,
            bemf_v: 200.0,
        }
    }

    #[test]
    fn writes_scaled_registers_after_max_frequency() {
        let mut drive = RegisterLog::default();
        write_nameplate(&mut drive, &nameplate()).unwrap();

        assert_eq!(drive.order[0], params::MAXIMUM_FREQUENCY);
        assert_eq!(drive.values[&params::MAXIMUM_FREQUENCY], 15000.0);
        assert_eq!(drive.values[&params::MOTOR_OL_CURRENT], 22.0);
        assert_eq!(drive.values[&params::MOTOR_NP_FLA], 20.0);
        assert_eq!(drive.values[&params::MOTOR_NP_POWER], 37.0);
        assert_eq!(drive.values[&params::IXD_VOLTAGE_DROP], 1100.0);
        assert_eq!(drive.values[&params::BEMF_VOLTAGE], 2000.0);
        assert_eq!(drive.order.len(), 12);
    }

    #[test]
    fn read_inverts_write() {
        let mut drive = RegisterLog::default();
        write_nameplate(&mut drive, &nameplate()).unwrap();
        let read = read_nameplate(&mut drive).unwrap();
        assert_eq!(read.poles, 4);
        assert!((read.power_kw - 0.37).abs() < 1e-12);
        assert!((read.overload_current_a - 2.2).abs() < 1e-12);
        assert!((read.ixq_drop_v - 10.5).abs() < 1e-12);
    }

    #[test]
    fn stops_at_first_rejected_register() {
        let mut drive = RegisterLog {
            reject: Some(params::MOTOR_NP_POLES),
            ..RegisterLog::default()
        };
        assert!(matches!(
            write_nameplate(&mut drive, &nameplate()),
            Err(DriveError::Write { id: params::MOTOR_NP_POLES, .. })
        ));
        assert!(!drive.values.contains_key(&params::MOTOR_NP_RPM));
    }

    #[test]
    fn validation_rejects_bad_ratings() {
        assert!(nameplate().validate().is_ok());
        assert_eq!(nameplate().synchronous_rpm(), 1800.0);

        let odd = MotorNameplate {
            poles: 3,
            ..nameplate()
        };
        assert_eq!(odd.validate(), Err(ConfigError::InvalidPoleCount(3)));

        let no_fla = MotorNameplate {
            full_load_current_a: 0.0,
            ..nameplate()
        };
        assert!(matches!(
            no_fla.validate(),
            Err(ConfigError::NonPositive {
                field: "full_load_current_a",
                ..
            })
        ));
    }
}
