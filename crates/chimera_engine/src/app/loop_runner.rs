use std::env;
use std::time::Duration;

use serde::Serialize;
use thiserror::Error;
use tracing::{info, warn};

use crate::catalog::{load_catalog, CatalogLoadError, CatalogRequest};
use crate::config::{ChimeraConfig, ConfigError};
use crate::runtime::{PresentationBackend, PresentationRuntime, RuntimeSummary};
use crate::ui::hud_widget_tree;
use crate::{AppPaths, StartupError};

use super::metrics::LoopMetricsSnapshot;
use super::scenario::{Scenario, ScenarioCommand};

pub const SLOW_FRAME_ENV_VAR: &str = "CHIMERA_SLOW_FRAME_MS";

#[derive(Debug, Error)]
pub enum AppError {
    #[error(transparent)]
    Startup(#[from] StartupError),
    #[error("failed to load configuration: {0}")]
    Config(#[from] ConfigError),
    #[error("failed to load prefab catalog: {0}")]
    Catalog(#[from] CatalogLoadError),
}

#[derive(Debug, Clone, Serialize)]
pub struct RunSummary {
    pub scenario: String,
    pub frames_run: u64,
    pub sim_ticks: u64,
    pub stopped_by_scenario: bool,
    pub dropped_backlog_ms: u64,
    pub catalog_templates: usize,
    pub catalog_fingerprint: String,
    pub runtime: RuntimeSummary,
    pub last_metrics: Option<LoopMetricsSnapshot>,
}

/// Loads the catalog, then drives `scenario` at the fixed simulation rate
/// against frames synthesized at the target frame rate. No wall-clock time
/// passes; every duration is simulated.
pub fn run_headless(
    config: &ChimeraConfig,
    app_paths: &AppPaths,
    scenario: &mut dyn Scenario,
    backend: Box<dyn PresentationBackend>,
) -> Result<RunSummary, AppError> {
    info!(
        root = %app_paths.root.display(),
        base_content_dir = %app_paths.base_content_dir.display(),
        mods_dir = %app_paths.mods_dir.display(),
        "startup"
    );
    let loaded = load_catalog(
        app_paths,
        &CatalogRequest {
            enabled_mods: config.content.enabled_mods.clone(),
        },
    )?;
    let catalog_templates = loaded.summary.total_count;
    let catalog_fingerprint = loaded.summary.fingerprint_sha256_hex.clone();

    let mut runtime = PresentationRuntime::new(loaded.catalog, config, backend, hud_widget_tree());

    let loop_config = &config.run_loop;
    let target_tps = loop_config.target_tps.max(1);
    let target_fps = loop_config.target_fps.max(1);
    let max_frame_delta =
        normalize_non_zero_duration(loop_config.max_frame_delta(), Duration::from_millis(250));
    let max_ticks_per_frame = loop_config.max_ticks_per_frame.max(1);
    let fixed_dt = Duration::from_secs_f64(1.0 / target_tps as f64);
    let fixed_dt_seconds = fixed_dt.as_secs_f32();
    let base_frame_dt = Duration::from_secs_f64(1.0 / target_fps as f64);
    let slow_frame_delay = resolve_slow_frame_delay(loop_config.simulated_slow_frame_ms);
    let frame_dt = clamp_frame_delta(base_frame_dt + slow_frame_delay, max_frame_delta);

    scenario.load(&mut runtime);
    info!(scenario = scenario.name(), "scenario_loaded");
    info!(
        target_tps,
        target_fps,
        max_frame_delta_ms = max_frame_delta.as_millis() as u64,
        max_ticks_per_frame,
        slow_frame_delay_ms = slow_frame_delay.as_millis() as u64,
        frame_count = loop_config.frame_count,
        "loop_config"
    );

    let mut accumulator = Duration::ZERO;
    let mut sim_ticks = 0u64;
    let mut frames_run = 0u64;
    let mut dropped_backlog = Duration::ZERO;
    let mut stopped_by_scenario = false;
    let mut last_metrics = None;

    while frames_run < loop_config.frame_count {
        accumulator = accumulator.saturating_add(frame_dt);
        let step_plan = plan_sim_steps(accumulator, fixed_dt, max_ticks_per_frame);
        for _ in 0..step_plan.ticks_to_run {
            let command = scenario.update(fixed_dt_seconds, &mut runtime);
            runtime.record_sim_tick();
            sim_ticks = sim_ticks.saturating_add(1);
            if command == ScenarioCommand::Stop {
                stopped_by_scenario = true;
                break;
            }
        }
        accumulator = step_plan.remaining_accumulator;

        if step_plan.dropped_backlog > Duration::ZERO {
            dropped_backlog = dropped_backlog.saturating_add(step_plan.dropped_backlog);
            warn!(
                dropped_backlog_ms = step_plan.dropped_backlog.as_millis() as u64,
                max_ticks_per_frame, "sim_clamp_triggered"
            );
        }

        let report = runtime.tick(frame_dt);
        frames_run = frames_run.saturating_add(1);
        if let Some(snapshot) = report.metrics {
            info!(
                fps = snapshot.fps,
                tps = snapshot.tps,
                frame_time_ms = snapshot.frame_time_ms,
                effects_active = runtime.dispatcher().active_count(),
                instances_active = runtime.facade().active_count(),
                quality_scale = runtime.quality().scale(),
                "loop_metrics"
            );
            last_metrics = Some(snapshot);
        }

        if stopped_by_scenario {
            info!(reason = "scenario", "shutdown_requested");
            break;
        }
    }

    scenario.unload(&mut runtime);
    let runtime_summary = runtime.shutdown();
    info!(frames_run, sim_ticks, "shutdown");

    Ok(RunSummary {
        scenario: scenario.name().to_string(),
        frames_run,
        sim_ticks,
        stopped_by_scenario,
        dropped_backlog_ms: dropped_backlog.as_millis() as u64,
        catalog_templates,
        catalog_fingerprint,
        runtime: runtime_summary,
        last_metrics,
    })
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct StepPlan {
    ticks_to_run: u32,
    remaining_accumulator: Duration,
    dropped_backlog: Duration,
}

fn plan_sim_steps(
    mut accumulator: Duration,
    fixed_dt: Duration,
    max_ticks_per_frame: u32,
) -> StepPlan {
    let mut ticks_to_run = 0u32;

    while accumulator >= fixed_dt && ticks_to_run < max_ticks_per_frame {
        accumulator = accumulator.saturating_sub(fixed_dt);
        ticks_to_run = ticks_to_run.saturating_add(1);
    }

    if accumulator >= fixed_dt {
        StepPlan {
            ticks_to_run,
            remaining_accumulator: Duration::ZERO,
            dropped_backlog: accumulator,
        }
    } else {
        StepPlan {
            ticks_to_run,
            remaining_accumulator: accumulator,
            dropped_backlog: Duration::ZERO,
        }
    }
}

fn clamp_frame_delta(frame_dt: Duration, max_frame_delta: Duration) -> Duration {
    frame_dt.min(max_frame_delta)
}

fn normalize_non_zero_duration(value: Duration, fallback: Duration) -> Duration {
    if value.is_zero() {
        fallback
    } else {
        value
    }
}

fn resolve_slow_frame_delay(config_slow_frame_ms: u64) -> Duration {
    match env::var(SLOW_FRAME_ENV_VAR) {
        Ok(value) => match value.parse::<u64>() {
            Ok(ms) => Duration::from_millis(ms),
            Err(_) => {
                warn!(
                    env_var = SLOW_FRAME_ENV_VAR,
                    value = value.as_str(),
                    "invalid slow-frame env var value; falling back to config"
                );
                Duration::from_millis(config_slow_frame_ms)
            }
        },
        Err(env::VarError::NotPresent) => Duration::from_millis(config_slow_frame_ms),
        Err(err) => {
            warn!(
                env_var = SLOW_FRAME_ENV_VAR,
                error = %err,
                "unable to read slow-frame env var; falling back to config"
            );
            Duration::from_millis(config_slow_frame_ms)
        }
    }
}
