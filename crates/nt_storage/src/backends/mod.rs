pub mod memory;

#[cfg(feature = "elastic")]
pub mod elastic;

pub use memory::MemoryBackend;

#[cfg(feature = "elastic")]
pub use elastic::{ElasticBackend, ElasticConfig};
