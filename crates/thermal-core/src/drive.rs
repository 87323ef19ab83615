use crate::power::DriveReading;
use thiserror::Error;

/// PowerFlex 525 parameter numbers used by the bench.
pub mod params {
    /// 0.01 Hz.
    pub const OUTPUT_FREQUENCY: u16 = 1;
    /// 0.01 Hz.
    pub const COMMANDED_FREQUENCY: u16 = 2;
    /// 0.01 A.
    pub const OUTPUT_CURRENT: u16 = 3;
    /// 0.1 V.
    pub const OUTPUT_VOLTAGE: u16 = 4;
    /// 1 V.
    pub const DC_BUS_VOLTAGE: u16 = 5;
    pub const OUTPUT_RPM: u16 = 15;
    /// 0.01 kW.
    pub const OUTPUT_POWER: u16 = 16;
    /// 0.01 s.
    pub const ACCEL_TIME: u16 = 41;
    /// 0.01 s.
    pub const DECEL_TIME: u16 = 42;
    /// 0.01 Hz.
    pub const MAXIMUM_FREQUENCY: u16 = 44;

    /// Motor nameplate block, written before every run.
    pub const MOTOR_NP_VOLTS: u16 = 31;
    pub const MOTOR_NP_HERTZ: u16 = 32;
    /// 0.1 A.
    pub const MOTOR_OL_CURRENT: u16 = 33;
    /// 0.1 A.
    pub const MOTOR_NP_FLA: u16 = 34;
    pub const MOTOR_NP_POLES: u16 = 35;
    pub const MOTOR_NP_RPM: u16 = 36;
    /// 0.01 kW.
    pub const MOTOR_NP_POWER: u16 = 37;

    /// Autotune results: stator IR, d/q-axis IX drops (0.01 V) and back EMF (0.1 V).
    pub const IR_VOLTAGE_DROP: u16 = 501;
    pub const IXD_VOLTAGE_DROP: u16 = 502;
    pub const IXQ_VOLTAGE_DROP: u16 = 503;
    pub const BEMF_VOLTAGE: u16 = 504;
    /// Logic command word; 1.0 runs the motor, 0.0 stops it.
    pub const LOGIC_COMMAND: u16 = 0x0100;

    pub const VOLTAGE_SCALE: f64 = 10.0;
    pub const CURRENT_SCALE: f64 = 100.0;
    pub const FREQUENCY_SCALE: f64 = 100.0;
    pub const TIME_SCALE: f64 = 100.0;
    pub const POWER_SCALE: f64 = 100.0;
    pub const NAMEPLATE_CURRENT_SCALE: f64 = 10.0;
    pub const DROP_VOLTAGE_SCALE: f64 = 100.0;
}

#[derive(Debug, Clone, PartialEq, Error)]
pub enum DriveError {
    #[error("reading parameter {id} failed: {reason}")]
    Read { id: u16, reason: String },
    #[error("writing parameter {id} failed: {reason}")]
    Write { id: u16, reason: String },
    #[error("parameter {0} is not supported by this drive")]
    UnknownParameter(u16),
}

/// Parameter-level access to a drive.
///
/// Values are exchanged in the drive's raw units; see [`params`] for the
/// scale of each parameter.
pub trait DriveLink: Send {
    fn read_param(&mut self, id: u16) -> Result<f64, DriveError>;
    fn write_param(&mut self, id: u16, value: f64) -> Result<(), DriveError>;

    /// Advances any internal model by `dt_s`. Hardware ignores this.
    fn step(&mut self, _dt_s: f64) {}
}

/// Reads the electrical outputs the power model needs and applies their scales.
pub fn read_drive_reading<D: DriveLink + ?Sized>(drive: &mut D) -> Result<DriveReading, DriveError> {
    Ok(DriveReading {
        output_voltage_v: drive.read_param(params::OUTPUT_VOLTAGE)? / params::VOLTAGE_SCALE,
        output_current_a: drive.read_param(params::OUTPUT_CURRENT)? / params::CURRENT_SCALE,
        speed_rpm: drive.read_param(params::OUTPUT_RPM)?,
        bus_voltage_v: drive.read_param(params::DC_BUS_VOLTAGE)?,
    })
}

pub fn command_run<D: DriveLink + ?Sized>(drive: &mut D, frequency_hz: f64) -> Result<(), DriveError> {
    set_frequency(drive, frequency_hz)?;
    drive.write_param(params::LOGIC_COMMAND, 1.0)
}

pub fn set_frequency<D: DriveLink + ?Sized>(
    drive: &mut D,
    frequency_hz: f64,
) -> Result<(), DriveError> {
    drive.write_param(
        params::COMMANDED_FREQUENCY,
        (frequency_hz * params::FREQUENCY_SCALE).round(),
    )
}

pub fn command_stop<D: DriveLink + ?Sized>(drive: &mut D) -> Result<(), DriveError> {
    drive.write_param(params::LOGIC_COMMAND, 0.0)
}
