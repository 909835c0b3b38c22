mod loop_runner;
pub(crate) mod metrics;
mod scenario;

pub use loop_runner::{run_headless, AppError, RunSummary, SLOW_FRAME_ENV_VAR};
pub use metrics::LoopMetricsSnapshot;
pub use scenario::{Scenario, ScenarioCommand};
