use crate::infra::journal::{JournalEventType, SessionJournal};
use crate::runtime::config::RuntimeConfig;
use crate::runtime::logging::init_tracing;
use crate::runtime::telemetry;
use std::path::PathBuf;
use std::process::ExitCode;
use std::sync::mpsc::{self, Sender};
use std::sync::{atomic::AtomicBool, Arc};
use std::thread;
use std::time::Duration;
use thermal_core::{
    read_nameplate, MonitorConfig, MonitorLoop, MonitorStats, OperatorCommand, SimulatedDrive,
    SnapshotExchange, ThermalError, ThermalEstimator, ThermalState, TimeBase,
};
use thermal_io::profile_file::{load_profile_document, ProfileDocument, ProfileFileError};
use thiserror::Error;
use tracing::{error, info, warn};

#[derive(Debug, Error)]
pub enum AppError {
    #[error(transparent)]
    Profile(#[from] ProfileFileError),
    #[error("cannot build thermal estimator: {0}")]
    Thermal(#[from] ThermalError),
    #[error("failed to open session journal {path}: {source}")]
    Journal {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("{0} thread panicked")]
    ThreadPanicked(&'static str),
}

pub fn run_from_args() -> ExitCode {
    let config = match RuntimeConfig::from_env() {
        Ok(config) => config,
        Err(e) => {
            eprintln!("thermal-bench: {e}");
            eprintln!("Try `thermal-bench --help` for usage.");
            return ExitCode::from(2);
        }
    };
    if config.show_help {
        RuntimeConfig::print_help();
        return ExitCode::SUCCESS;
    }

    // Keeps the file sink flushing until exit.
    let _log_guard = init_tracing(config.json_logs, config.log_file.as_deref());

    match run(config) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            error!(error = %e, "thermal-bench failed");
            eprintln!("thermal-bench: {e}");
            ExitCode::FAILURE
        }
    }
}

/// Runs one monitoring session. Tracing must already be initialized.
pub fn run(config: RuntimeConfig) -> Result<(), AppError> {
    let document = resolve_profile(&config)?;
    let policy = config.deadband.unwrap_or(document.deadband_policy);
    let estimator = ThermalEstimator::with_policy(document.profile, policy)?;

    telemetry::init();
    let _metrics_handle = telemetry::start_metrics_server(&config.metrics_addr);

    let timebase = TimeBase::new();
    let exchange = Arc::new(SnapshotExchange::new());
    let journal = open_journal(config.journal_path.as_ref())?;

    info!(
        profile = document.display_name(),
        ambient_c = document.profile.ambient_temperature,
        max_monotonic_step_s = document.profile.max_monotonic_step_s(),
        deadband = ?policy,
        "Thermal model configured"
    );
    record(
        journal.as_deref(),
        &timebase,
        JournalEventType::SessionStart,
        serde_json::json!({
            "version": env!("CARGO_PKG_VERSION"),
            "poll_interval_ms": config.poll_interval_ms,
            "trend_interval_ms": config.trend_interval_ms,
        }),
    );
    record(
        journal.as_deref(),
        &timebase,
        JournalEventType::ProfileLoaded,
        serde_json::json!({
            "name": document.display_name(),
            "profile": document.profile,
            "deadband_policy": policy,
        }),
    );

    let mut drive = SimulatedDrive::new();
    let drive_nameplate = match read_nameplate(&mut drive) {
        Ok(nameplate) => Some(nameplate),
        Err(e) => {
            warn!(error = %e, "Could not read motor nameplate from drive");
            None
        }
    };
    let nameplate = document.nameplate.or(drive_nameplate);
    if let Some(nameplate) = &nameplate {
        info!(
            voltage_v = nameplate.voltage_v,
            frequency_hz = nameplate.frequency_hz,
            full_load_current_a = nameplate.full_load_current_a,
            poles = nameplate.poles,
            rated_rpm = nameplate.rated_rpm,
            from_profile = document.nameplate.is_some(),
            "Motor nameplate ready for commissioning"
        );
    }
    record(
        journal.as_deref(),
        &timebase,
        JournalEventType::NameplateRead,
        serde_json::json!({
            "drive": drive_nameplate,
            "commissioned": nameplate,
        }),
    );

    let stop = Arc::new(AtomicBool::new(false));
    let (commands, command_rx) = mpsc::channel();

    let monitor_config = MonitorConfig {
        poll_interval: Duration::from_millis(config.poll_interval_ms),
        ..MonitorConfig::default()
    };
    info!(
        poll_interval_ms = config.poll_interval_ms,
        "Starting monitor loop"
    );

    let exchange_monitor = Arc::clone(&exchange);
    let stop_monitor = Arc::clone(&stop);
    let monitor_handle = thread::spawn(move || -> (MonitorStats, ThermalState) {
        let mut monitor = MonitorLoop::new(
            drive,
            estimator,
            monitor_config,
            exchange_monitor,
            command_rx,
            timebase,
        );
        if let Some(nameplate) = nameplate {
            monitor = monitor.with_nameplate(nameplate);
        }
        monitor.run(&stop_monitor);
        (monitor.stats().clone(), *monitor.estimator().state())
    });

    let _updater_handle = config
        .metrics_addr
        .as_ref()
        .map(|_| telemetry::start_metrics_updater(Arc::clone(&exchange), Arc::clone(&stop)));
    let trend_handle = telemetry::start_trend_sampler(
        Arc::clone(&exchange),
        Arc::clone(&stop),
        Duration::from_millis(config.trend_interval_ms),
        config.trend_capacity,
    );

    if let Some(frequency_hz) = config.speed_hz {
        send_command(&commands, OperatorCommand::Start { frequency_hz });
        info!(frequency_hz, "Motor start requested");
        record(
            journal.as_deref(),
            &timebase,
            JournalEventType::MotorStarted,
            serde_json::json!({ "frequency_hz": frequency_hz }),
        );
    }

    let Some(seconds) = config.run_seconds else {
        info!("Monitoring until the process is terminated");
        let _ = monitor_handle.join();
        return Ok(());
    };

    info!(seconds, "Running for limited duration");
    thread::sleep(Duration::from_secs(seconds));

    if config.speed_hz.is_some() {
        send_command(&commands, OperatorCommand::Stop);
        record(
            journal.as_deref(),
            &timebase,
            JournalEventType::MotorStopped,
            serde_json::json!({ "reason": "run complete" }),
        );
    }
    stop.store(true, std::sync::atomic::Ordering::Relaxed);

    let (stats, final_state) = monitor_handle
        .join()
        .map_err(|_| AppError::ThreadPanicked("monitor"))?;
    let trend = trend_handle
        .join()
        .map_err(|_| AppError::ThreadPanicked("trend sampler"))?;
    let summary = trend.summary();

    info!(
        ticks_executed = stats.ticks_executed,
        ticks_missed = stats.ticks_missed,
        read_failures = stats.read_failures,
        computation_errors = stats.computation_errors,
        max_tick_gap_s = stats.max_tick_gap_s,
        final_temperature_c = final_state.current_temperature,
        peak_trend_temperature_c = summary.map(|s| s.peak_temperature_c),
        "Run complete"
    );

    record(
        journal.as_deref(),
        &timebase,
        JournalEventType::SessionEnd,
        serde_json::json!({
            "ticks_executed": stats.ticks_executed,
            "ticks_missed": stats.ticks_missed,
            "read_failures": stats.read_failures,
            "write_failures": stats.write_failures,
            "computation_errors": stats.computation_errors,
            "estimator_resets": stats.estimator_resets,
            "final_state": final_state,
            "trend": summary,
        }),
    );
    Ok(())
}

fn resolve_profile(config: &RuntimeConfig) -> Result<ProfileDocument, AppError> {
    match &config.profile_path {
        Some(path) => {
            let document = load_profile_document(path)?;
            info!(path = %path.display(), name = document.display_name(), "Loaded motor profile");
            Ok(document)
        }
        None => Ok(ProfileDocument::from_preset(config.preset)),
    }
}

fn open_journal(path: Option<&PathBuf>) -> Result<Option<Arc<SessionJournal>>, AppError> {
    let Some(path) = path else {
        return Ok(None);
    };
    let journal = SessionJournal::new(path).map_err(|source| AppError::Journal {
        path: path.clone(),
        source,
    })?;
    info!(path = %path.display(), "Session journal enabled");
    Ok(Some(Arc::new(journal)))
}

fn record(
    journal: Option<&SessionJournal>,
    timebase: &TimeBase,
    event_type: JournalEventType,
    details: serde_json::Value,
) {
    let Some(journal) = journal else {
        return;
    };
    if let Err(e) = journal.log_event(timebase.now_us(), timebase.unix_us(), event_type, details) {
        warn!(error = %e, "Failed to write session journal entry");
    }
}

fn send_command(commands: &Sender<OperatorCommand>, command: OperatorCommand) {
    if commands.send(command).is_err() {
        warn!(?command, "Monitor loop is no longer accepting commands");
    }
}
