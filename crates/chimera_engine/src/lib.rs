use std::env;
use std::fs;
use std::path::{Path, PathBuf};

use thiserror::Error;

pub mod app;
pub mod catalog;
pub mod config;
pub mod events;
pub mod runtime;
pub mod ui;

pub use app::{
    run_headless, AppError, LoopMetricsSnapshot, RunSummary, Scenario, ScenarioCommand,
    SLOW_FRAME_ENV_VAR,
};
pub use catalog::{
    load_catalog, AssetKind, CatalogCompileError, CatalogErrorCode, CatalogLoadError,
    CatalogLoadSummary, CatalogRequest, LoadedCatalog, NumericField, PrefabCatalog,
    PresentationAsset, SourceLocation, TemplateCategory, TemplateEntry, TemplateParams,
};
pub use config::{
    load_config, ChimeraConfig, ConfigError, CONFIG_ENV_VAR, ENABLED_MODS_ENV_VAR,
};
pub use events::{CueKey, CueTarget, DomainEvent, EffectCue, EffectRouter, EventQueue, PlantStage};
pub use runtime::{
    EffectDispatcher, EffectId, EffectState, InstanceId, InstancePool, InstantiationFacade,
    Instantiation, NullBackend, Placement, PlayOutcome, PresentationBackend,
    PresentationRuntime, QualityController, RecordingBackend, RuntimeSummary, TickReport, Vec3,
};
pub use ui::{UiBindingController, UiSurface, WidgetTree};

pub const ROOT_ENV_VAR: &str = "CHIMERA_ROOT";

#[derive(Debug, Clone)]
pub struct AppPaths {
    pub root: PathBuf,
    pub base_content_dir: PathBuf,
    pub mods_dir: PathBuf,
}

#[derive(Debug, Error)]
pub enum StartupError {
    #[error("failed to read environment variable {var}: {source}")]
    EnvVar {
        var: &'static str,
        #[source]
        source: env::VarError,
    },
    #[error("failed to resolve current executable path: {0}")]
    CurrentExe(#[source] std::io::Error),
    #[error("current executable path has no parent directory: {0}")]
    ExeHasNoParent(PathBuf),
    #[error(
        "CHIMERA_ROOT is set but does not point to a valid project root: {path}\n\
A valid root must contain Cargo.toml and either crates/ or assets/."
    )]
    InvalidEnvRoot { path: PathBuf },
    #[error(
        "Could not detect project root by walking upward from executable directory: {start_dir}\n\
Expected a directory containing Cargo.toml and either crates/ or assets/.\n\
Set {env_var} explicitly, for example:\n\
Bash/zsh: export {env_var}=\"/path/to/chimera\""
    )]
    RootNotFound {
        start_dir: PathBuf,
        env_var: &'static str,
    },
}

pub fn resolve_app_paths() -> Result<AppPaths, StartupError> {
    let root = resolve_root()?;
    Ok(app_paths_for_root(root))
}

pub fn app_paths_for_root(root: PathBuf) -> AppPaths {
    let base_content_dir = root.join("assets").join("base");
    let mods_dir = root.join("mods");
    AppPaths {
        root,
        base_content_dir,
        mods_dir,
    }
}

fn resolve_root() -> Result<PathBuf, StartupError> {
    match env::var(ROOT_ENV_VAR) {
        Ok(value) => {
            let raw = PathBuf::from(value);
            let normalized = normalize_path(&raw);
            if is_repo_marker(&normalized) {
                Ok(normalized)
            } else {
                Err(StartupError::InvalidEnvRoot { path: normalized })
            }
        }
        Err(env::VarError::NotPresent) => {
            let exe = env::current_exe().map_err(StartupError::CurrentExe)?;
            let exe_dir = exe
                .parent()
                .map(Path::to_path_buf)
                .ok_or_else(|| StartupError::ExeHasNoParent(exe.clone()))?;

            for candidate in exe_dir.ancestors() {
                if is_repo_marker(candidate) {
                    return Ok(normalize_path(candidate));
                }
            }

            Err(StartupError::RootNotFound {
                start_dir: normalize_path(&exe_dir),
                env_var: ROOT_ENV_VAR,
            })
        }
        Err(source) => Err(StartupError::EnvVar {
            var: ROOT_ENV_VAR,
            source,
        }),
    }
}

fn is_repo_marker(path: &Path) -> bool {
    let cargo_toml = path.join("Cargo.toml").is_file();
    let has_crates = path.join("crates").is_dir();
    let has_assets = path.join("assets").is_dir();

    cargo_toml && (has_crates || has_assets)
}

fn normalize_path(path: &Path) -> PathBuf {
    fs::canonicalize(path).unwrap_or_else(|_| path.to_path_buf())
}
