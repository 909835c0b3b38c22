use std::env;
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::info;

use crate::runtime::{DEFAULT_QUALITY_FLOOR, DEFAULT_QUALITY_STEP};
use crate::AppPaths;

pub const CONFIG_ENV_VAR: &str = "CHIMERA_CONFIG";
pub const ENABLED_MODS_ENV_VAR: &str = "CHIMERA_ENABLED_MODS";

const BUILTIN_CONFIG_JSON: &str = include_str!("data/default_config.json");
const BUILTIN_ORIGIN: &str = "<builtin>";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct LoopConfig {
    pub target_tps: u32,
    pub target_fps: u32,
    pub max_frame_delta_ms: u64,
    pub max_ticks_per_frame: u32,
    pub metrics_log_interval_ms: u64,
    pub simulated_slow_frame_ms: u64,
    pub frame_count: u64,
}

impl Default for LoopConfig {
    fn default() -> Self {
        Self {
            target_tps: 60,
            target_fps: 60,
            max_frame_delta_ms: 250,
            max_ticks_per_frame: 5,
            metrics_log_interval_ms: 1000,
            simulated_slow_frame_ms: 0,
            frame_count: 1800,
        }
    }
}

impl LoopConfig {
    pub fn max_frame_delta(&self) -> Duration {
        Duration::from_millis(self.max_frame_delta_ms)
    }

    pub fn metrics_log_interval(&self) -> Duration {
        Duration::from_millis(self.metrics_log_interval_ms)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct InstantiationConfig {
    pub max_instances_per_frame: u32,
    pub idle_timeout_secs: u64,
    pub idle_sweep_interval_secs: u64,
    pub default_pool_capacity: usize,
}

impl Default for InstantiationConfig {
    fn default() -> Self {
        Self {
            max_instances_per_frame: 10,
            idle_timeout_secs: 300,
            idle_sweep_interval_secs: 30,
            default_pool_capacity: 32,
        }
    }
}

impl InstantiationConfig {
    pub fn idle_timeout(&self) -> Duration {
        Duration::from_secs(self.idle_timeout_secs)
    }

    pub fn idle_sweep_interval(&self) -> Duration {
        Duration::from_secs(self.idle_sweep_interval_secs)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct EffectsConfig {
    /// Distance from the viewer past which effects are dropped; 0 disables
    /// culling.
    pub cull_radius: f32,
    pub max_concurrent_effects: usize,
    pub default_pool_capacity: usize,
}

impl Default for EffectsConfig {
    fn default() -> Self {
        Self {
            cull_radius: 50.0,
            max_concurrent_effects: 32,
            default_pool_capacity: 16,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct QualityConfig {
    pub target_fps: f32,
    pub floor: f32,
    pub step: f32,
    pub evaluation_interval_ms: u64,
}

impl Default for QualityConfig {
    fn default() -> Self {
        Self {
            target_fps: 60.0,
            floor: DEFAULT_QUALITY_FLOOR,
            step: DEFAULT_QUALITY_STEP,
            evaluation_interval_ms: 1000,
        }
    }
}

impl QualityConfig {
    pub fn evaluation_interval(&self) -> Duration {
        Duration::from_millis(self.evaluation_interval_ms)
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ContentConfig {
    pub enabled_mods: Vec<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ChimeraConfig {
    #[serde(rename = "loop")]
    pub run_loop: LoopConfig,
    pub instantiation: InstantiationConfig,
    pub effects: EffectsConfig,
    pub quality: QualityConfig,
    pub content: ContentConfig,
}

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read environment variable {var}: {source}")]
    EnvVar {
        var: &'static str,
        #[source]
        source: env::VarError,
    },
    #[error("failed to read config file {path}: {source}")]
    ReadFile {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("failed to parse config {origin} at {json_path}: {source}")]
    Parse {
        origin: String,
        json_path: String,
        #[source]
        source: serde_json::Error,
    },
    #[error("invalid config value {field}: {message}")]
    Invalid {
        field: &'static str,
        message: String,
    },
}

impl ChimeraConfig {
    pub fn builtin() -> Result<Self, ConfigError> {
        parse_config_json(BUILTIN_CONFIG_JSON, BUILTIN_ORIGIN)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.run_loop.target_tps == 0 {
            return Err(invalid("loop.target_tps", "must be greater than zero"));
        }
        if self.run_loop.target_fps == 0 {
            return Err(invalid("loop.target_fps", "must be greater than zero"));
        }
        if self.instantiation.max_instances_per_frame == 0 {
            return Err(invalid(
                "instantiation.max_instances_per_frame",
                "must be greater than zero",
            ));
        }
        if !(self.effects.cull_radius >= 0.0) {
            return Err(invalid("effects.cull_radius", "must be zero or positive"));
        }
        if self.effects.max_concurrent_effects == 0 {
            return Err(invalid(
                "effects.max_concurrent_effects",
                "must be greater than zero",
            ));
        }
        if !(self.quality.floor > 0.0 && self.quality.floor <= 1.0) {
            return Err(invalid("quality.floor", "must be in (0, 1]"));
        }
        if !(self.quality.step > 0.0) {
            return Err(invalid("quality.step", "must be greater than zero"));
        }
        if !(self.quality.target_fps > 0.0) {
            return Err(invalid("quality.target_fps", "must be greater than zero"));
        }
        Ok(())
    }
}

/// Resolves the effective configuration: embedded defaults, replaced by the
/// file named in `CHIMERA_CONFIG` when set, then `CHIMERA_ENABLED_MODS`.
pub fn load_config(app_paths: &AppPaths) -> Result<ChimeraConfig, ConfigError> {
    let override_path = read_env(CONFIG_ENV_VAR)?.map(|raw| {
        let path = PathBuf::from(raw);
        if path.is_relative() {
            app_paths.root.join(path)
        } else {
            path
        }
    });
    let mut config = load_config_from(override_path.as_deref())?;
    if let Some(raw) = read_env(ENABLED_MODS_ENV_VAR)? {
        config.content.enabled_mods = parse_enabled_mods(&raw);
    }
    config.validate()?;

    let config_file = override_path
        .as_deref()
        .map_or_else(|| BUILTIN_ORIGIN.to_string(), |path| path.display().to_string());
    info!(
        config_file = %config_file,
        enabled_mods = config.content.enabled_mods.len(),
        max_instances_per_frame = config.instantiation.max_instances_per_frame,
        cull_radius = config.effects.cull_radius,
        "config_loaded"
    );
    Ok(config)
}

pub fn load_config_from(path: Option<&Path>) -> Result<ChimeraConfig, ConfigError> {
    let Some(path) = path else {
        return ChimeraConfig::builtin();
    };
    let raw = fs::read_to_string(path).map_err(|source| ConfigError::ReadFile {
        path: path.to_path_buf(),
        source,
    })?;
    parse_config_json(&raw, &path.display().to_string())
}

pub fn parse_config_json(raw: &str, origin: &str) -> Result<ChimeraConfig, ConfigError> {
    let mut deserializer = serde_json::Deserializer::from_str(raw);
    serde_path_to_error::deserialize::<_, ChimeraConfig>(&mut deserializer).map_err(|error| {
        let json_path = error.path().to_string();
        ConfigError::Parse {
            origin: origin.to_string(),
            json_path,
            source: error.into_inner(),
        }
    })
}

pub fn parse_enabled_mods(raw: &str) -> Vec<String> {
    raw.split(',')
        .map(str::trim)
        .filter(|entry| !entry.is_empty())
        .map(ToString::to_string)
        .collect()
}

fn read_env(var: &'static str) -> Result<Option<String>, ConfigError> {
    match env::var(var) {
        Ok(value) => Ok(Some(value)),
        Err(env::VarError::NotPresent) => Ok(None),
        Err(source) => Err(ConfigError::EnvVar { var, source }),
    }
}

fn invalid(field: &'static str, message: &str) -> ConfigError {
    ConfigError::Invalid {
        field,
        message: message.to_string(),
    }
}
