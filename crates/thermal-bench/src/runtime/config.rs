use std::path::PathBuf;
use thermal_core::{DeadbandPolicy, MotorPreset};
use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ArgError {
    #[error("{flag} expects a value")]
    MissingValue { flag: String },
    #[error("invalid value `{value}` for {flag}: {reason}")]
    InvalidValue {
        flag: String,
        value: String,
        reason: String,
    },
    #[error("unknown option `{0}`")]
    UnknownOption(String),
}

#[derive(Debug, Clone)]
pub struct RuntimeConfig {
    pub show_help: bool,
    pub run_seconds: Option<u64>,
    pub profile_path: Option<PathBuf>,
    pub preset: MotorPreset,
    /// Overrides the policy carried by the profile document.
    pub deadband: Option<DeadbandPolicy>,
    pub poll_interval_ms: u64,
    pub trend_interval_ms: u64,
    pub trend_capacity: usize,
    pub speed_hz: Option<f64>,
    pub json_logs: bool,
    pub log_file: Option<PathBuf>,
    pub metrics_addr: Option<String>,
    pub journal_path: Option<PathBuf>,
}

impl Default for RuntimeConfig {
    fn default() -> Self {
        Self {
            show_help: false,
            run_seconds: None,
            profile_path: None,
            preset: MotorPreset::default(),
            deadband: None,
            poll_interval_ms: 250,
            trend_interval_ms: 500,
            trend_capacity: 7200,
            speed_hz: None,
            json_logs: false,
            log_file: None,
            metrics_addr: None,
            journal_path: None,
        }
    }
}

impl RuntimeConfig {
    pub fn from_env() -> Result<Self, ArgError> {
        let args: Vec<String> = std::env::args().collect();
        Self::from_args(&args)
    }

    pub fn from_args(args: &[String]) -> Result<Self, ArgError> {
        let mut cfg = RuntimeConfig::default();
        let mut i = 1;
        while i < args.len() {
            let flag = args[i].as_str();
            match flag {
                "--run-seconds" => {
                    cfg.run_seconds = Some(parse_value(args, &mut i)?);
                }
                "--profile" => {
                    cfg.profile_path = Some(PathBuf::from(take_value(args, &mut i)?));
                }
                "--preset" => {
                    cfg.preset = parse_value(args, &mut i)?;
                }
                "--deadband" => {
                    let value = take_value(args, &mut i)?;
                    cfg.deadband = Some(match value {
                        "reset" | "reset_accumulated" => DeadbandPolicy::ResetAccumulated,
                        "freeze" => DeadbandPolicy::Freeze,
                        other => {
                            return Err(ArgError::InvalidValue {
                                flag: flag.to_string(),
                                value: other.to_string(),
                                reason: "expected `reset` or `freeze`".to_string(),
                            })
                        }
                    });
                }
                "--poll-ms" => {
                    cfg.poll_interval_ms = parse_positive(args, &mut i)?;
                }
                "--trend-ms" => {
                    cfg.trend_interval_ms = parse_positive(args, &mut i)?;
                }
                "--trend-capacity" => {
                    cfg.trend_capacity = parse_positive::<u64>(args, &mut i)? as usize;
                }
                "--speed-hz" => {
                    let hz: f64 = parse_value(args, &mut i)?;
                    if !hz.is_finite() || hz < 0.0 {
                        return Err(ArgError::InvalidValue {
                            flag: flag.to_string(),
                            value: args[i].clone(),
                            reason: "frequency must be a non-negative number".to_string(),
                        });
                    }
                    cfg.speed_hz = Some(hz);
                }
                "--json-logs" => {
                    cfg.json_logs = true;
                }
                "--log-file" => {
                    cfg.log_file = Some(PathBuf::from(take_value(args, &mut i)?));
                }
                "--metrics-addr" => {
                    cfg.metrics_addr = Some(take_value(args, &mut i)?.to_string());
                }
                "--journal" => {
                    cfg.journal_path = Some(PathBuf::from(take_value(args, &mut i)?));
                }
                "--help" | "-h" => {
                    cfg.show_help = true;
                    break;
                }
                other => return Err(ArgError::UnknownOption(other.to_string())),
            }
            i += 1;
        }
        Ok(cfg)
    }

    pub fn print_help() {
        println!(
            r#"thermal-bench - PowerFlex 525 bench monitor with motor thermal-rise estimation

USAGE:
    thermal-bench [OPTIONS]

OPTIONS:
    --profile <PATH>        Load the motor profile from a JSON document
    --preset <ID>           Built-in motor profile (10340|13684) [default: 10340]
    --deadband <POLICY>     Deadband policy (reset|freeze) [default: from profile, else reset]
    --poll-ms <MS>          Monitor polling interval [default: 250]
    --trend-ms <MS>         Trend sampling interval [default: 500]
    --trend-capacity <N>    Trend samples kept in memory [default: 7200]
    --speed-hz <HZ>         Start the motor at this frequency
    --run-seconds <SECS>    Run for a fixed duration then exit
    --json-logs             Output logs in JSON format
    --log-file <PATH>       Also write logs to this file
    --metrics-addr <ADDR>   Enable Prometheus metrics server on address (e.g., 0.0.0.0:9090)
    --journal <PATH>        Append session events to a JSONL journal
    -h, --help              Print this help message

ENVIRONMENT VARIABLES:
    RUST_LOG                Set log filter (e.g., RUST_LOG=debug,thermal_core=trace)

EXAMPLES:
    # Ten minute heat run of the 13684 motor at 20 Hz
    thermal-bench --preset 13684 --speed-hz 20 --run-seconds 600

    # Custom motor with bench journal and metrics
    thermal-bench --profile motor.json --journal runs/journal.jsonl --metrics-addr 0.0.0.0:9090
"#
        );
    }
}

fn take_value<'a>(args: &'a [String], i: &mut usize) -> Result<&'a str, ArgError> {
    let flag = &args[*i];
    match args.get(*i + 1) {
        Some(value) => {
            *i += 1;
            Ok(value.as_str())
        }
        None => Err(ArgError::MissingValue { flag: flag.clone() }),
    }
}

fn parse_value<T>(args: &[String], i: &mut usize) -> Result<T, ArgError>
where
    T: std::str::FromStr,
    T::Err: std::fmt::Display,
{
    let flag = args[*i].clone();
    let value = take_value(args, i)?;
    value.parse::<T>().map_err(|e| ArgError::InvalidValue {
        flag,
        value: value.to_string(),
        reason: e.to_string(),
    })
}

fn parse_positive<T>(args: &[String], i: &mut usize) -> Result<T, ArgError>
where
    T: std::str::FromStr + PartialOrd + Default,
    T::Err: std::fmt::Display,
{
    let flag = args[*i].clone();
    let parsed: T = parse_value(args, i)?;
    if parsed <= T::default() {
        return Err(ArgError::InvalidValue {
            flag,
            value: args[*i].clone(),
            reason: "must be greater than zero".to_string(),
        });
    }
    Ok(parsed)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn args(list: &[&str]) -> Vec<String> {
        std::iter::once("thermal-bench")
            .chain(list.iter().copied())
            .map(String::from)
            .collect()
    }

    #[test]
    fn defaults_match_bench_cadence() {
        let cfg = RuntimeConfig::from_args(&args(&[])).unwrap();
        assert_eq!(cfg.poll_interval_ms, 250);
        assert_eq!(cfg.trend_interval_ms, 500);
        assert_eq!(cfg.preset, MotorPreset::Motor10340);
        assert!(cfg.deadband.is_none());
        assert!(cfg.speed_hz.is_none());
    }

    #[test]
    fn parses_full_command_line() {
        let cfg = RuntimeConfig::from_args(&args(&[
            "--preset",
            "13684",
            "--deadband",
            "freeze",
            "--speed-hz",
            "20",
            "--run-seconds",
            "5",
            "--poll-ms",
            "100",
            "--journal",
            "out/journal.jsonl",
            "--json-logs",
        ]))
        .unwrap();
        assert_eq!(cfg.preset, MotorPreset::Motor13684);
        assert_eq!(cfg.deadband, Some(DeadbandPolicy::Freeze));
        assert_eq!(cfg.speed_hz, Some(20.0));
        assert_eq!(cfg.run_seconds, Some(5));
        assert_eq!(cfg.poll_interval_ms, 100);
        assert_eq!(cfg.journal_path, Some(PathBuf::from("out/journal.jsonl")));
        assert!(cfg.json_logs);
    }

    #[test]
    fn rejects_bad_values() {
        assert_eq!(
            RuntimeConfig::from_args(&args(&["--poll-ms"])).unwrap_err(),
            ArgError::MissingValue {
                flag: "--poll-ms".to_string()
            }
        );
        assert!(matches!(
            RuntimeConfig::from_args(&args(&["--poll-ms", "0"])),
            Err(ArgError::InvalidValue { .. })
        ));
        assert!(matches!(
            RuntimeConfig::from_args(&args(&["--deadband", "hold"])),
            Err(ArgError::InvalidValue { .. })
        ));
        assert!(matches!(
            RuntimeConfig::from_args(&args(&["--preset", "1"])),
            Err(ArgError::InvalidValue { .. })
        ));
        assert!(matches!(
            RuntimeConfig::from_args(&args(&["--speed-hz", "-5"])),
            Err(ArgError::InvalidValue { .. })
        ));
        assert_eq!(
            RuntimeConfig::from_args(&args(&["--bind", "x"])).unwrap_err(),
            ArgError::UnknownOption("--bind".to_string())
        );
    }

    #[test]
    fn help_stops_parsing() {
        let cfg = RuntimeConfig::from_args(&args(&["-h", "--poll-ms"])).unwrap();
        assert!(cfg.show_help);
    }
}
