mod backend;
mod effects;
mod host;
mod instantiate;
mod math;
mod pool;
mod quality;
mod timers;

pub use backend::{
    BackendCall, BackendLog, EffectParams, NullBackend, PresentationBackend, RecordingBackend,
};
pub use effects::{DispatchStats, EffectDispatcher, EffectId, EffectState, EffectTick, PlayOutcome};
pub use host::{PresentationRuntime, RuntimeSummary, TickReport};
pub use instantiate::{
    ActiveInstanceRecord, CompletionCallback, FrameDrain, InstantiationFacade, Instantiation,
    RequestId,
};
pub use math::{Placement, Vec3};
pub use pool::{Instance, InstanceId, InstancePool, PoolStats, ReleaseOutcome};
pub use quality::{
    scaled_ceiling, QualityAdjustment, QualityController, DEFAULT_QUALITY_FLOOR,
    DEFAULT_QUALITY_STEP,
};
pub use timers::{TimerId, TimerQueue};
