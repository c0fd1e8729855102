use nt_core::{Result, RunConfig, SearchBackend, StorageKind};
use std::sync::Arc;
use tracing::info;

pub mod backends;

pub use backends::*;

/// Build the backend handle for one run. The handle is shared by the dedup
/// guard and the batch writer and dropped when the run ends.
pub fn create_storage(config: &RunConfig) -> Result<Arc<dyn SearchBackend>> {
    let backend: Arc<dyn SearchBackend> = match config.storage {
        StorageKind::Memory => Arc::new(MemoryBackend::new()),
        #[cfg(feature = "elastic")]
        StorageKind::Elastic => {
            let elastic = ElasticConfig::new(config.backend_url.clone(), config.backend_timeout);
            Arc::new(ElasticBackend::new(&elastic)?)
        }
        #[cfg(not(feature = "elastic"))]
        StorageKind::Elastic => {
            return Err(nt_core::Error::Configuration(
                "elasticsearch support is disabled; rebuild with the `elastic` feature".to_string(),
            ))
        }
    };
    info!("🏦 Storage backend ready (using {})", backend.name());
    Ok(backend)
}

pub mod prelude {
    pub use super::backends::*;
    pub use super::create_storage;
}
