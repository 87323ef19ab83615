use crate::drive::{command_run, command_stop, read_drive_reading, set_frequency, DriveError, DriveLink};
use crate::estimator::{ThermalError, ThermalEstimator};
use crate::nameplate::{write_nameplate, MotorNameplate};
use crate::power::PowerBreakdown;
use crate::sync::{SnapshotExchange, ThermalSnapshot};
use crate::timebase::{TickClock, TimeBase};
use std::sync::mpsc::{Receiver, TryRecvError};
use std::sync::{atomic::AtomicBool, Arc};
use std::thread;
use std::time::{Duration, Instant};
use thiserror::Error;

#[derive(Clone, Debug)]
pub struct MonitorConfig {
    pub poll_interval: Duration,
    /// Overruns longer than this count as missed ticks.
    pub overrun_tolerance: Duration,
}

impl Default for MonitorConfig {
    fn default() -> Self {
        Self {
            poll_interval: Duration::from_millis(250),
            overrun_tolerance: Duration::from_millis(50),
        }
    }
}

/// Operator actions queued for the monitor loop.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum OperatorCommand {
    Start { frequency_hz: f64 },
    SetFrequency { frequency_hz: f64 },
    Stop,
    ResetEstimator,
}

#[derive(Clone, Default, Debug)]
pub struct MonitorStats {
    pub ticks_executed: u64,
    pub ticks_missed: u64,
    pub read_failures: u64,
    pub write_failures: u64,
    pub computation_errors: u64,
    pub estimator_resets: u64,
    pub max_tick_gap_s: f64,
}

#[derive(Debug, Error)]
pub enum MonitorError {
    #[error(transparent)]
    Drive(#[from] DriveError),
    #[error(transparent)]
    Thermal(#[from] ThermalError),
}

/// Single owner of the drive and the thermal estimator.
///
/// All estimator updates happen here; other threads observe the published
/// [`ThermalSnapshot`]s.
pub struct MonitorLoop<D: DriveLink> {
    drive: D,
    estimator: ThermalEstimator,
    config: MonitorConfig,
    exchange: Arc<SnapshotExchange>,
    commands: Receiver<OperatorCommand>,
    /// Written to the drive ahead of every start.
    nameplate: Option<MotorNameplate>,
    stats: MonitorStats,
    timebase: TimeBase,
    clock: TickClock,
    /// Elapsed time of ticks whose update was skipped.
    pending_gap_s: f64,
    last_snapshot: ThermalSnapshot,
}

impl<D: DriveLink> MonitorLoop<D> {
    pub fn new(
        drive: D,
        estimator: ThermalEstimator,
        config: MonitorConfig,
        exchange: Arc<SnapshotExchange>,
        commands: Receiver<OperatorCommand>,
        timebase: TimeBase,
    ) -> Self {
        Self {
            drive,
            estimator,
            config,
            exchange,
            commands,
            nameplate: None,
            stats: MonitorStats::default(),
            timebase,
            clock: TickClock::new(),
            pending_gap_s: 0.0,
            last_snapshot: ThermalSnapshot::default(),
        }
    }

    pub fn with_nameplate(mut self, nameplate: MotorNameplate) -> Self {
        self.nameplate = Some(nameplate);
        self
    }

    pub fn run(&mut self, stop: &AtomicBool) {
        let mut next_tick = Instant::now();

        while !stop.load(std::sync::atomic::Ordering::Relaxed) {
            let now = Instant::now();
            if now < next_tick {
                thread::sleep(next_tick - now);
            } else {
                let overrun = now.duration_since(next_tick);
                if overrun > self.config.overrun_tolerance {
                    self.stats.ticks_missed += 1;
                    log::debug!("monitor tick overran by {} ms", overrun.as_millis());
                    next_tick = now;
                }
            }

            if let Err(e) = self.tick() {
                log::warn!("monitor tick failed: {}", e);
            }

            next_tick += self.config.poll_interval;
        }

        self.shutdown();
    }

    /// Runs one tick using the wall-clock time since the previous one.
    pub fn tick(&mut self) -> Result<ThermalSnapshot, MonitorError> {
        let elapsed_s = self.clock.lap_s();
        self.tick_with_elapsed(elapsed_s)
    }

    pub fn tick_with_elapsed(&mut self, elapsed_s: f64) -> Result<ThermalSnapshot, MonitorError> {
        self.apply_commands();
        self.drive.step(elapsed_s);

        let timestamp_us = self.timebase.now_us();
        let gap_s = self.pending_gap_s + elapsed_s;

        let reading = match read_drive_reading(&mut self.drive) {
            Ok(reading) => reading,
            Err(e) => {
                self.stats.read_failures += 1;
                self.pending_gap_s = gap_s;
                self.publish_fault_counts();
                return Err(e.into());
            }
        };

        let power = PowerBreakdown::from_reading(&reading, self.estimator.profile());
        if let Err(e) = self.estimator.update(power.loss_kw, gap_s) {
            self.stats.computation_errors += 1;
            self.pending_gap_s = gap_s;
            self.publish_fault_counts();
            log::error!("thermal update rejected: {}", e);
            return Err(e.into());
        }
        self.pending_gap_s = 0.0;

        self.stats.ticks_executed += 1;
        self.stats.max_tick_gap_s = self.stats.max_tick_gap_s.max(gap_s);

        let snapshot = ThermalSnapshot {
            tick_gap_s: gap_s,
            read_failures: self.stats.read_failures,
            computation_errors: self.stats.computation_errors,
            estimator_resets: self.stats.estimator_resets,
            ..ThermalSnapshot::compose(
                timestamp_us,
                self.stats.ticks_executed,
                &reading,
                &power,
                self.estimator.state(),
            )
        };
        self.last_snapshot = snapshot;
        self.exchange.publish(snapshot);
        Ok(snapshot)
    }

    fn apply_commands(&mut self) {
        loop {
            let command = match self.commands.try_recv() {
                Ok(command) => command,
                Err(TryRecvError::Empty) | Err(TryRecvError::Disconnected) => break,
            };

            let result = match command {
                OperatorCommand::Start { frequency_hz } => {
                    let started = match &self.nameplate {
                        Some(nameplate) => write_nameplate(&mut self.drive, nameplate),
                        None => Ok(()),
                    }
                    .and_then(|()| command_run(&mut self.drive, frequency_hz));
                    if started.is_ok() {
                        self.estimator.set_motor_on(true);
                    }
                    started
                }
                OperatorCommand::SetFrequency { frequency_hz } => {
                    set_frequency(&mut self.drive, frequency_hz)
                }
                OperatorCommand::Stop => {
                    self.estimator.set_motor_on(false);
                    command_stop(&mut self.drive)
                }
                OperatorCommand::ResetEstimator => {
                    self.estimator.reset();
                    self.pending_gap_s = 0.0;
                    self.stats.estimator_resets += 1;
                    Ok(())
                }
            };

            match result {
                Ok(()) => log::info!("applied operator command {:?}", command),
                Err(e) => {
                    self.stats.write_failures += 1;
                    log::warn!("operator command {:?} failed: {}", command, e);
                }
            }
        }
    }

    fn publish_fault_counts(&mut self) {
        self.last_snapshot.read_failures = self.stats.read_failures;
        self.last_snapshot.computation_errors = self.stats.computation_errors;
        self.exchange.publish(self.last_snapshot);
    }

    fn shutdown(&mut self) {
        self.estimator.set_motor_on(false);
        if let Err(e) = command_stop(&mut self.drive) {
            self.stats.write_failures += 1;
            log::error!("failed to stop drive on shutdown: {}", e);
        }
    }

    pub fn stats(&self) -> &MonitorStats {
        &self.stats
    }

    pub fn estimator(&self) -> &ThermalEstimator {
        &self.estimator
    }

    pub fn drive(&self) -> &D {
        &self.drive
    }

    pub fn drive_mut(&mut self) -> &mut D {
        &mut self.drive
    }
}
