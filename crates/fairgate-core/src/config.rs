//! fairgate.toml configuration parser and threshold validation.

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use thiserror::Error;

/// Errors raised while loading or validating configuration.
///
/// Every variant is fatal: a run must abort before any snapshot is
/// processed or any state is touched.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("failed to parse config {}: {message}", path.display())]
    Parse { path: PathBuf, message: String },
    #[error("missing required parameter `{0}`")]
    Missing(&'static str),
    #[error("parameter `{name}` must be a finite number in [0, 1], got {value}")]
    OutOfRange { name: &'static str, value: f64 },
    #[error("consecutive_required_standard must be at least 1, got {0}")]
    ZeroDebounce(u32),
    #[error(
        "threshold ordering violated: expected T_enter_major ({major}) <= \
         T_enter_standard ({standard}) <= T_exit ({exit})"
    )]
    Ordering { major: f64, standard: f64, exit: f64 },
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct FairgateConfig {
    #[serde(default)]
    pub hysteresis: RawParameters,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub storage: Option<StorageConfig>,
}

/// Threshold parameters as they appear on disk; any key may be absent.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RawParameters {
    #[serde(rename = "T_enter_major")]
    pub t_enter_major: Option<f64>,
    #[serde(rename = "T_enter_standard")]
    pub t_enter_standard: Option<f64>,
    #[serde(rename = "T_exit")]
    pub t_exit: Option<f64>,
    pub consecutive_required_standard: Option<u32>,
    pub cooldown_snapshots_after_exit: Option<u32>,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StorageBackend {
    #[default]
    Json,
    Redb,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct StorageConfig {
    pub backend: Option<StorageBackend>,
    pub state_path: Option<PathBuf>,
    pub events_path: Option<PathBuf>,
    pub db_path: Option<PathBuf>,
}

pub const DEFAULT_STATE_PATH: &str = "fairgate-state/units.json";
pub const DEFAULT_EVENTS_PATH: &str = "fairgate-state/events.json";
pub const DEFAULT_DB_PATH: &str = "fairgate-state/fairgate.redb";

impl StorageConfig {
    pub fn backend(&self) -> StorageBackend {
        self.backend.unwrap_or_default()
    }

    pub fn state_path(&self) -> PathBuf {
        self.state_path
            .clone()
            .unwrap_or_else(|| PathBuf::from(DEFAULT_STATE_PATH))
    }

    pub fn events_path(&self) -> PathBuf {
        self.events_path
            .clone()
            .unwrap_or_else(|| PathBuf::from(DEFAULT_EVENTS_PATH))
    }

    pub fn db_path(&self) -> PathBuf {
        self.db_path
            .clone()
            .unwrap_or_else(|| PathBuf::from(DEFAULT_DB_PATH))
    }
}

/// Validated hysteresis parameters.
///
/// Only obtainable through [`RawParameters::validate`] (or
/// [`Parameters::new`]), so holding one proves
/// `t_enter_major <= t_enter_standard <= t_exit`.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct Parameters {
    #[serde(rename = "T_enter_major")]
    t_enter_major: f64,
    #[serde(rename = "T_enter_standard")]
    t_enter_standard: f64,
    #[serde(rename = "T_exit")]
    t_exit: f64,
    consecutive_required_standard: u32,
    cooldown_snapshots_after_exit: u32,
}

impl Parameters {
    pub fn new(
        t_enter_major: f64,
        t_enter_standard: f64,
        t_exit: f64,
        consecutive_required_standard: u32,
        cooldown_snapshots_after_exit: u32,
    ) -> Result<Self, ConfigError> {
        RawParameters {
            t_enter_major: Some(t_enter_major),
            t_enter_standard: Some(t_enter_standard),
            t_exit: Some(t_exit),
            consecutive_required_standard: Some(consecutive_required_standard),
            cooldown_snapshots_after_exit: Some(cooldown_snapshots_after_exit),
        }
        .validate()
    }

    pub fn t_enter_major(&self) -> f64 {
        self.t_enter_major
    }

    pub fn t_enter_standard(&self) -> f64 {
        self.t_enter_standard
    }

    pub fn t_exit(&self) -> f64 {
        self.t_exit
    }

    pub fn consecutive_required_standard(&self) -> u32 {
        self.consecutive_required_standard
    }

    pub fn cooldown_snapshots_after_exit(&self) -> u32 {
        self.cooldown_snapshots_after_exit
    }

    /// The numeric value of each parameter, keyed by its configuration name.
    pub fn named_values(&self) -> [(&'static str, f64); 5] {
        [
            ("T_enter_major", self.t_enter_major),
            ("T_enter_standard", self.t_enter_standard),
            ("T_exit", self.t_exit),
            (
                "consecutive_required_standard",
                f64::from(self.consecutive_required_standard),
            ),
            (
                "cooldown_snapshots_after_exit",
                f64::from(self.cooldown_snapshots_after_exit),
            ),
        ]
    }
}

fn threshold(name: &'static str, value: Option<f64>) -> Result<f64, ConfigError> {
    let value = value.ok_or(ConfigError::Missing(name))?;
    if !value.is_finite() || !(0.0..=1.0).contains(&value) {
        return Err(ConfigError::OutOfRange { name, value });
    }
    Ok(value)
}

impl RawParameters {
    /// Check presence, range, and ordering of every parameter.
    pub fn validate(&self) -> Result<Parameters, ConfigError> {
        let major = threshold("T_enter_major", self.t_enter_major)?;
        let standard = threshold("T_enter_standard", self.t_enter_standard)?;
        let exit = threshold("T_exit", self.t_exit)?;
        let required = self
            .consecutive_required_standard
            .ok_or(ConfigError::Missing("consecutive_required_standard"))?;
        let cooldown = self
            .cooldown_snapshots_after_exit
            .ok_or(ConfigError::Missing("cooldown_snapshots_after_exit"))?;

        if required == 0 {
            return Err(ConfigError::ZeroDebounce(required));
        }
        if !(major <= standard && standard <= exit) {
            return Err(ConfigError::Ordering {
                major,
                standard,
                exit,
            });
        }

        Ok(Parameters {
            t_enter_major: major,
            t_enter_standard: standard,
            t_exit: exit,
            consecutive_required_standard: required,
            cooldown_snapshots_after_exit: cooldown,
        })
    }
}

impl FairgateConfig {
    /// Load from TOML, or JSON when the file extension is `.json`.
    pub fn from_file(path: &Path) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        let is_json = path
            .extension()
            .is_some_and(|ext| ext.eq_ignore_ascii_case("json"));
        let parse_err = |message: String| ConfigError::Parse {
            path: path.to_path_buf(),
            message,
        };

        let mut config: FairgateConfig = if is_json {
            serde_json::from_str(&content).map_err(|e| parse_err(e.to_string()))?
        } else {
            toml::from_str(&content).map_err(|e| parse_err(e.to_string()))?
        };

        // A bare parameter file keeps the five keys at the top level.
        if config.hysteresis == RawParameters::default() {
            config.hysteresis = if is_json {
                serde_json::from_str(&content).map_err(|e| parse_err(e.to_string()))?
            } else {
                toml::from_str(&content).map_err(|e| parse_err(e.to_string()))?
            };
        }
        Ok(config)
    }

    /// Validated parameters from the `[hysteresis]` section.
    pub fn parameters(&self) -> Result<Parameters, ConfigError> {
        self.hysteresis.validate()
    }

    pub fn storage(&self) -> StorageConfig {
        self.storage.clone().unwrap_or_default()
    }

    pub fn to_toml_string(&self) -> anyhow::Result<String> {
        Ok(toml::to_string_pretty(self)?)
    }

    /// A starting configuration with conventional thresholds.
    pub fn scaffold() -> Self {
        FairgateConfig {
            hysteresis: RawParameters {
                t_enter_major: Some(0.50),
                t_enter_standard: Some(0.60),
                t_exit: Some(0.65),
                consecutive_required_standard: Some(3),
                cooldown_snapshots_after_exit: Some(1),
            },
            storage: Some(StorageConfig {
                backend: Some(StorageBackend::Json),
                state_path: Some(PathBuf::from(DEFAULT_STATE_PATH)),
                events_path: Some(PathBuf::from(DEFAULT_EVENTS_PATH)),
                db_path: None,
            }),
        }
    }
}
