use btcmi::config::AppConfig;
use btcmi::schema::SchemaRegistry;
use btcmi::EngineRegistry;
use std::sync::atomic::AtomicBool;
use std::sync::Arc;

#[derive(Clone)]
pub(crate) struct AppState {
    pub(crate) readiness: Arc<AtomicBool>,
    pub(crate) registry: Arc<EngineRegistry>,
    pub(crate) schemas: Arc<SchemaRegistry>,
}

impl AppState {
    /// State for a service that has not finished binding yet.
    pub(crate) fn from_config(config: &AppConfig) -> Self {
        Self {
            readiness: Arc::new(AtomicBool::new(false)),
            registry: Arc::new(
                EngineRegistry::standard().with_default_mode(config.engine.default_mode),
            ),
            schemas: Arc::new(SchemaRegistry::new(config.engine.schema_dir.clone())),
        }
    }
}
