pub mod drive;
#[cfg(feature = "simulation")]
pub mod drive_sim;
pub mod estimator;
pub mod monitor;
pub mod nameplate;
pub mod power;
pub mod profile;
pub mod sync;
pub mod tags;
pub mod timebase;
pub mod trend;

pub use drive::{DriveError, DriveLink};
#[cfg(feature = "simulation")]
pub use drive_sim::SimulatedDrive;
pub use estimator::{DeadbandPolicy, EstimatorPhase, ThermalError, ThermalEstimator, ThermalState};
pub use monitor::{MonitorConfig, MonitorError, MonitorLoop, MonitorStats, OperatorCommand};
pub use nameplate::{read_nameplate, write_nameplate, MotorNameplate};
pub use power::{DriveReading, PowerBreakdown};
pub use profile::{ConfigError, MotorPreset, MotorThermalProfile};
pub use sync::{SnapshotExchange, ThermalSnapshot};
pub use timebase::{TickClock, TimeBase};
pub use trend::{TrendRecorder, TrendSample, TrendSummary};
