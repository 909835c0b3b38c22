use chimera_engine::{NullBackend, PresentationBackend, Scenario};
use tracing::info;
use tracing_subscriber::EnvFilter;

use super::grow_room::{GrowRoomLayout, GrowRoomScenario};

pub(crate) struct AppWiring {
    pub(crate) scenario: Box<dyn Scenario>,
    pub(crate) backend: Box<dyn PresentationBackend>,
}

pub(crate) fn build_app() -> AppWiring {
    init_tracing();
    info!("=== Chimera Startup ===");

    AppWiring {
        scenario: Box::new(GrowRoomScenario::new(GrowRoomLayout::default())),
        backend: Box::new(NullBackend),
    }
}

fn init_tracing() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_thread_names(true)
        .compact()
        .init();
}
