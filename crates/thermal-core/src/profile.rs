use crate::estimator::ELAPSED_TIME_DIVISOR;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

/// Thermal and electrical constants of one motor.
///
/// All four divisor fields (`surface_area`, `weight_active_parts`,
/// `specific_heat`, `specific_heat_dissipation`) must be strictly positive.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct MotorThermalProfile {
    /// Effective cooling surface in m².
    pub surface_area: f64,
    /// Stator resistance in ohms, used for the I²R readout.
    pub stator_resistance: f64,
    /// Mass of the heated parts in kg.
    pub weight_active_parts: f64,
    /// J/(kg·K).
    pub specific_heat: f64,
    /// Convective/radiative loss coefficient in W/(m²·K).
    pub specific_heat_dissipation: f64,
    /// Nm/A.
    pub torque_constant: f64,
    /// Reference baseline in °C.
    pub ambient_temperature: f64,
}

#[derive(Debug, Clone, Copy, PartialEq, Error)]
pub enum ConfigError {
    #[error("{field} must be a positive finite number, got {value}")]
    NonPositive { field: &'static str, value: f64 },
    #[error("{field} must be finite, got {value}")]
    NonFinite { field: &'static str, value: f64 },
    #[error("pole count must be a positive even number, got {0}")]
    InvalidPoleCount(u16),
}

impl MotorThermalProfile {
    pub fn validate(&self) -> Result<(), ConfigError> {
        let divisors = [
            ("surface_area", self.surface_area),
            ("weight_active_parts", self.weight_active_parts),
            ("specific_heat", self.specific_heat),
            ("specific_heat_dissipation", self.specific_heat_dissipation),
        ];
        for (field, value) in divisors {
            if !(value.is_finite() && value > 0.0) {
                return Err(ConfigError::NonPositive { field, value });
            }
        }

        let others = [
            ("stator_resistance", self.stator_resistance),
            ("torque_constant", self.torque_constant),
            ("ambient_temperature", self.ambient_temperature),
        ];
        for (field, value) in others {
            if !value.is_finite() {
                return Err(ConfigError::NonFinite { field, value });
            }
        }
        Ok(())
    }

    /// Thermal capacity m·c in J/K.
    pub fn heat_capacity(&self) -> f64 {
        self.weight_active_parts * self.specific_heat
    }

    /// Cooling coefficient h·A in W/K.
    pub fn cooling_coefficient(&self) -> f64 {
        self.surface_area * self.specific_heat_dissipation
    }

    /// Largest elapsed time (seconds) for which one integration step cannot
    /// carry the rise past its equilibrium value.
    pub fn max_monotonic_step_s(&self) -> f64 {
        self.heat_capacity() / self.cooling_coefficient() * ELAPSED_TIME_DIVISOR
    }
}

impl Default for MotorThermalProfile {
    fn default() -> Self {
        MotorPreset::default().profile()
    }
}

/// Motors the bench has been calibrated against.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum MotorPreset {
    #[default]
    #[serde(rename = "10340")]
    Motor10340,
    #[serde(rename = "13684")]
    Motor13684,
}

impl MotorPreset {
    pub fn profile(self) -> MotorThermalProfile {
        match self {
            Self::Motor10340 => MotorThermalProfile {
                surface_area: 0.104758,
                stator_resistance: 9.4585,
                weight_active_parts: 6.0,
                specific_heat: 750.0,
                specific_heat_dissipation: 540.0,
                torque_constant: 1.867,
                ambient_temperature: 27.0,
            },
            Self::Motor13684 => MotorThermalProfile {
                surface_area: 0.02841,
                stator_resistance: 3.71,
                weight_active_parts: 1.42,
                specific_heat: 500.0,
                specific_heat_dissipation: 540.0,
                torque_constant: 0.71,
                ambient_temperature: 27.0,
            },
        }
    }

    pub fn id(self) -> &'static str {
        match self {
            Self::Motor10340 => "10340",
            Self::Motor13684 => "13684",
        }
    }
}

impl fmt::Display for MotorPreset {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.id())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("unknown motor preset `{0}` (expected 10340 or 13684)")]
pub struct UnknownPreset(pub String);

impl FromStr for MotorPreset {
    type Err = UnknownPreset;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim() {
            "10340" => Ok(Self::Motor10340),
            "13684" => Ok(Self::Motor13684),
            other => Err(UnknownPreset(other.to_string())),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn presets_are_valid() {
        for preset in [MotorPreset::Motor10340, MotorPreset::Motor13684] {
            assert!(preset.profile().validate().is_ok(), "{preset} invalid");
        }
    }

    #[test]
    fn rejects_zero_surface_area() {
        let profile = MotorThermalProfile {
            surface_area: 0.0,
            ..MotorThermalProfile::default()
        };
        assert_eq!(
            profile.validate(),
            Err(ConfigError::NonPositive {
                field: "surface_area",
                value: 0.0
            })
        );
    }

    #[test]
    fn rejects_negative_and_nan_divisors() {
        let negative = MotorThermalProfile {
            specific_heat: -750.0,
            ..MotorThermalProfile::default()
        };
        assert!(matches!(
            negative.validate(),
            Err(ConfigError::NonPositive {
                field: "specific_heat",
                ..
            })
        ));

        let nan = MotorThermalProfile {
            specific_heat_dissipation: f64::NAN,
            ..MotorThermalProfile::default()
        };
        assert!(matches!(
            nan.validate(),
            Err(ConfigError::NonPositive {
                field: "specific_heat_dissipation",
                ..
            })
        ));
    }

    #[test]
    fn rejects_nonfinite_ambient() {
        let profile = MotorThermalProfile {
            ambient_temperature: f64::INFINITY,
            ..MotorThermalProfile::default()
        };
        assert!(matches!(
            profile.validate(),
            Err(ConfigError::NonFinite {
                field: "ambient_temperature",
                ..
            })
        ));
    }

    #[test]
    fn parses_preset_ids() {
        assert_eq!("13684".parse::<MotorPreset>(), Ok(MotorPreset::Motor13684));
        assert_eq!(" 10340 ".parse::<MotorPreset>(), Ok(MotorPreset::Motor10340));
        assert!("9999".parse::<MotorPreset>().is_err());
    }

    #[test]
    fn monotonic_step_limit_for_default_motor() {
        // 4500 J/K over 56.569 W/K, scaled by the elapsed-time divisor.
        let limit = MotorThermalProfile::default().max_monotonic_step_s();
        assert!((limit - 2386.5).abs() < 0.5, "limit = {limit}");
    }
}
