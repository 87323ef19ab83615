//! JSON motor profile documents.
//!
//! ```json
//! {
//!   "name": "10340 bench motor",
//!   "profile": {
//!     "surface_area": 0.104758,
//!     "stator_resistance": 9.4585,
//!     "weight_active_parts": 6.0,
//!     "specific_heat": 750.0,
//!     "specific_heat_dissipation": 540.0,
//!     "torque_constant": 1.867,
//!     "ambient_temperature": 27.0
//!   },
//!   "deadband_policy": "freeze",
//!   "nameplate": {
//!     "voltage_v": 230.0,
//!     "frequency_hz": 60.0,
//!     "overload_current_a": 2.2,
//!     "full_load_current_a": 2.0,
//!     "poles": 4,
//!     "rated_rpm": 1746.0,
//!     "power_kw": 0.37,
//!     "ir_drop_v": 2.5,
//!     "ixd_drop_v": 11.0,
//!     "ixq_drop_v": 10.5,
//!     "bemf_v": 200.0
//!   }
//! }
//! ```
//!
//! Without a `nameplate`, the bench keeps whatever the drive already holds.

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use thermal_core::{ConfigError, DeadbandPolicy, MotorNameplate, MotorPreset, MotorThermalProfile};
use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ProfileDocument {
    #[serde(default)]
    pub name: Option<String>,
    pub profile: MotorThermalProfile,
    #[serde(default)]
    pub deadband_policy: DeadbandPolicy,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub nameplate: Option<MotorNameplate>,
}

#[derive(Debug, Error)]
pub enum ProfileFileError {
    #[error("failed to read profile {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("failed to parse profile {path}: {source}")]
    Parse {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },
    #[error("profile {path} is invalid: {source}")]
    Invalid {
        path: PathBuf,
        #[source]
        source: ConfigError,
    },
}

impl ProfileDocument {
    pub fn from_preset(preset: MotorPreset) -> Self {
        Self {
            name: Some(format!("motor {preset}")),
            profile: preset.profile(),
            deadband_policy: DeadbandPolicy::default(),
            nameplate: None,
        }
    }

    pub fn display_name(&self) -> &str {
        self.name.as_deref().unwrap_or("unnamed profile")
    }
}

/// Parses and validates a profile document. `origin` only labels errors.
pub fn parse_profile_document(raw: &str, origin: &Path) -> Result<ProfileDocument, ProfileFileError> {
    let document: ProfileDocument =
        serde_json::from_str(raw).map_err(|source| ProfileFileError::Parse {
            path: origin.to_path_buf(),
            source,
        })?;
    let invalid = |source| ProfileFileError::Invalid {
        path: origin.to_path_buf(),
        source,
    };
    document.profile.validate().map_err(invalid)?;
    if let Some(nameplate) = &document.nameplate {
        nameplate.validate().map_err(invalid)?;
    }
    Ok(document)
}

pub fn load_profile_document(path: &Path) -> Result<ProfileDocument, ProfileFileError> {
    let raw = std::fs::read_to_string(path).map_err(|source| ProfileFileError::Io {
        path: path.to_path_buf(),
        source,
    })?;
    parse_profile_document(&raw, path)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn policy_defaults_to_reset() {
        let raw = r#"{
            "profile": {
                "surface_area": 0.02841,
                "stator_resistance": 3.71,
                "weight_active_parts": 1.42,
                "specific_heat": 500.0,
                "specific_heat_dissipation": 540.0,
                "torque_constant": 0.71,
                "ambient_temperature": 25.0
            }
        }"#;
        let doc = parse_profile_document(raw, Path::new("inline")).unwrap();
        assert_eq!(doc.deadband_policy, DeadbandPolicy::ResetAccumulated);
        assert_eq!(doc.display_name(), "unnamed profile");
        assert_eq!(doc.profile.ambient_temperature, 25.0);
    }

    #[test]
    fn preset_document_round_trips() {
        let doc = ProfileDocument::from_preset(MotorPreset::Motor13684);
        let raw = serde_json::to_string(&doc).unwrap();
        let parsed = parse_profile_document(&raw, Path::new("inline")).unwrap();
        assert_eq!(parsed, doc);
    }

    #[test]
    fn nameplate_is_optional_and_validated() {
        let mut doc = ProfileDocument::from_preset(MotorPreset::Motor10340);
        let raw = serde_json::to_string(&doc).unwrap();
        assert!(!raw.contains("nameplate"));

        doc.nameplate = Some(MotorNameplate {
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
        });
        let raw = serde_json::to_string(&doc).unwrap();
        assert_eq!(parse_profile_document(&raw, Path::new("inline")).unwrap(), doc);

        let raw = raw.replace("\"poles\":4", "\"poles\":5");
        assert!(matches!(
            parse_profile_document(&raw, Path::new("inline")),
            Err(ProfileFileError::Invalid {
                source: ConfigError::InvalidPoleCount(5),
                ..
            })
        ));
    }
}
