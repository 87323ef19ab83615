use crate::drive::{params, DriveError, DriveLink};
use std::collections::BTreeMap;

/// Volts-per-hertz drive driving a lightly loaded induction motor.
#[derive(Debug, Clone)]
pub struct SimulatedDrive {
    output_hz: f64,
    commanded_hz: f64,
    running: bool,

    base_hz: f64,
    max_hz: f64,
    rated_voltage_v: f64,
    pole_count: f64,
    slip: f64,
    no_load_current_a: f64,
    load_current_a: f64,
    bus_voltage_v: f64,
    accel_time_s: f64,
    decel_time_s: f64,
    /// Raw nameplate registers the model stores but does not use.
    motor_registers: BTreeMap<u16, f64>,

    read_fault: bool,
}

impl SimulatedDrive {
    pub fn new() -> Self {
        Self {
            output_hz: 0.0,
            commanded_hz: 0.0,
            running: false,
            base_hz: 60.0,
            max_hz: 150.0,
            rated_voltage_v: 230.0,
            pole_count: 4.0,
            slip: 0.03,
            no_load_current_a: 0.8,
            load_current_a: 1.2,
            bus_voltage_v: 325.0,
            accel_time_s: 10.0,
            decel_time_s: 10.0,
            motor_registers: BTreeMap::from([
                (params::MOTOR_OL_CURRENT, 22.0),
                (params::MOTOR_NP_FLA, 20.0),
                (params::MOTOR_NP_RPM, 1746.0),
                (params::MOTOR_NP_POWER, 37.0),
                (params::IR_VOLTAGE_DROP, 250.0),
                (params::IXD_VOLTAGE_DROP, 1100.0),
                (params::IXQ_VOLTAGE_DROP, 1050.0),
                (params::BEMF_VOLTAGE, 2000.0),
            ]),
            read_fault: false,
        }
    }

    /// Makes every subsequent read fail until cleared.
    pub fn inject_read_fault(&mut self, enabled: bool) {
        self.read_fault = enabled;
    }

    pub fn output_hz(&self) -> f64 {
        self.output_hz
    }

    pub fn is_running(&self) -> bool {
        self.running
    }

    fn output_voltage_v(&self) -> f64 {
        self.rated_voltage_v * (self.output_hz / self.base_hz).min(1.0)
    }

    fn output_current_a(&self) -> f64 {
        if self.output_hz <= 0.0 {
            return 0.0;
        }
        self.no_load_current_a + self.load_current_a * (self.output_hz / self.base_hz).min(1.0)
    }

    fn speed_rpm(&self) -> f64 {
        120.0 * self.output_hz / self.pole_count * (1.0 - self.slip)
    }
}

impl Default for SimulatedDrive {
    fn default() -> Self {
        Self::new()
    }
}

impl DriveLink for SimulatedDrive {
    fn read_param(&mut self, id: u16) -> Result<f64, DriveError> {
        if self.read_fault {
            return Err(DriveError::Read {
                id,
                reason: "injected fault".to_string(),
            });
        }
        let value = match id {
            params::OUTPUT_FREQUENCY => self.output_hz * params::FREQUENCY_SCALE,
            params::COMMANDED_FREQUENCY => self.commanded_hz * params::FREQUENCY_SCALE,
            params::OUTPUT_CURRENT => (self.output_current_a() * params::CURRENT_SCALE).round(),
            params::OUTPUT_VOLTAGE => (self.output_voltage_v() * params::VOLTAGE_SCALE).round(),
            params::DC_BUS_VOLTAGE => self.bus_voltage_v,
            params::OUTPUT_RPM => self.speed_rpm().round(),
            params::OUTPUT_POWER => {
                let kw = self.output_voltage_v() * self.output_current_a() * 3f64.sqrt() / 1000.0;
                (kw * params::POWER_SCALE).round()
            }
            params::ACCEL_TIME => self.accel_time_s * params::TIME_SCALE,
            params::DECEL_TIME => self.decel_time_s * params::TIME_SCALE,
            params::LOGIC_COMMAND => {
                if self.running {
                    1.0
                } else {
                    0.0
                }
            }
            params::MAXIMUM_FREQUENCY => self.max_hz * params::FREQUENCY_SCALE,
            params::MOTOR_NP_VOLTS => self.rated_voltage_v,
            params::MOTOR_NP_HERTZ => self.base_hz,
            params::MOTOR_NP_POLES => self.pole_count,
            other => match self.motor_registers.get(&other) {
                Some(raw) => *raw,
                None => return Err(DriveError::UnknownParameter(other)),
            },
        };
        Ok(value)
    }

    fn write_param(&mut self, id: u16, value: f64) -> Result<(), DriveError> {
        if !value.is_finite() {
            return Err(DriveError::Write {
                id,
                reason: format!("non-finite value {value}"),
            });
        }
        match id {
            params::COMMANDED_FREQUENCY => {
                self.commanded_hz = (value / params::FREQUENCY_SCALE).clamp(0.0, self.max_hz);
            }
            params::LOGIC_COMMAND => self.running = value != 0.0,
            params::ACCEL_TIME => self.accel_time_s = (value / params::TIME_SCALE).max(0.01),
            params::DECEL_TIME => self.decel_time_s = (value / params::TIME_SCALE).max(0.01),
            params::MAXIMUM_FREQUENCY => {
                self.max_hz = positive(id, value)? / params::FREQUENCY_SCALE;
                self.commanded_hz = self.commanded_hz.min(self.max_hz);
            }
            params::MOTOR_NP_VOLTS => self.rated_voltage_v = positive(id, value)?,
            params::MOTOR_NP_HERTZ => self.base_hz = positive(id, value)?,
            params::MOTOR_NP_POLES => self.pole_count = positive(id, value)?,
            other => match self.motor_registers.get_mut(&other) {
                Some(raw) => *raw = value,
                None => return Err(DriveError::UnknownParameter(other)),
            },
        }
        Ok(())
    }

    fn step(&mut self, dt_s: f64) {
        if dt_s <= 0.0 {
            return;
        }
        let target = if self.running { self.commanded_hz } else { 0.0 };
        if target > self.output_hz {
            let ramp = self.base_hz / self.accel_time_s * dt_s;
            self.output_hz = (self.output_hz + ramp).min(target);
        } else {
            let ramp = self.base_hz / self.decel_time_s * dt_s;
            self.output_hz = (self.output_hz - ramp).max(target);
        }
    }
}

fn positive(id: u16, value: f64) -> Result<f64, DriveError> {
    if value <= 0.0 {
        return Err(DriveError::Write {
            id,
            reason: format!("value {value} must be positive"),
        });
    }
    Ok(value)
}
