pub mod config;
pub mod error;
pub mod fetch;
pub mod storage;
pub mod types;

pub use config::{PartitionPolicy, RunConfig, StorageKind};
pub use error::{Error, Result};
pub use fetch::Fetcher;
pub use storage::SearchBackend;
pub use types::{Article, BulkItemResult, IndexAction, TIMESTAMP_FORMAT};
