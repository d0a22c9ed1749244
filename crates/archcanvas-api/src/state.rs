use archcanvas_core::{CanvasOptions, CanvasStore, ConfigManager, Library};
use std::sync::Arc;
use tracing::info;

#[derive(Clone)]
pub struct AppState {
    pub store: Arc<CanvasStore>,
    pub config: Arc<ConfigManager>,
}

impl AppState {
    pub fn new(config: Arc<ConfigManager>) -> Self {
        let library = if config.settings().library.seed_defaults {
            Library::seeded()
        } else {
            Library::new()
        };
        info!(
            risks = library.risk_count(),
            mitigations = library.mitigation_count(),
            "library initialised"
        );
        Self {
            store: Arc::new(CanvasStore::new(library)),
            config,
        }
    }

    pub fn canvas_options(&self) -> CanvasOptions {
        self.config.settings().canvas.options()
    }
}
