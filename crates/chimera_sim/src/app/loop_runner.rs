use std::env;
use std::process::ExitCode;

use chimera_engine::{load_config, resolve_app_paths, run_headless, AppError, RunSummary};
use tracing::{error, info, warn};

use super::bootstrap::AppWiring;

const PRINT_SUMMARY_ENV_VAR: &str = "CHIMERA_PRINT_SUMMARY";

pub(crate) fn run(app: AppWiring) -> ExitCode {
    match run_wired(app) {
        Ok(summary) => {
            info!(
                scenario = summary.scenario.as_str(),
                frames_run = summary.frames_run,
                effects_played = summary.runtime.effects.played,
                effects_culled = summary.runtime.effects.culled,
                quality_scale = summary.runtime.quality_scale,
                "run_complete"
            );
            if print_summary_requested() {
                match serde_json::to_string_pretty(&summary) {
                    Ok(json) => println!("{json}"),
                    Err(err) => warn!(error = %err, "summary_serialize_failed"),
                }
            }
            ExitCode::SUCCESS
        }
        Err(err) => {
            error!(error = %err, "startup_failed");
            ExitCode::FAILURE
        }
    }
}

fn run_wired(mut app: AppWiring) -> Result<RunSummary, AppError> {
    let app_paths = resolve_app_paths()?;
    let config = load_config(&app_paths)?;
    run_headless(&config, &app_paths, app.scenario.as_mut(), app.backend)
}

fn print_summary_requested() -> bool {
    env::var(PRINT_SUMMARY_ENV_VAR)
        .map(|value| matches!(value.trim(), "1" | "true" | "yes"))
        .unwrap_or(false)
}
