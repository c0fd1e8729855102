use std::time::Duration;
use url::Url;
use crate::{Error, Result};

pub const DEFAULT_BACKEND_URL: &str = "http://localhost:9200";
pub const DEFAULT_INDEX: &str = "news";
pub const DEFAULT_LOOKBACK_DAYS: u32 = 365;
pub const DEFAULT_BATCH_SIZE: usize = 100;
pub const DEFAULT_FETCH_TIMEOUT: Duration = Duration::from_secs(30);
pub const DEFAULT_FETCH_RETRIES: u32 = 2;
pub const DEFAULT_WRITE_RETRIES: u32 = 3;
pub const DEFAULT_CONCURRENCY: usize = 4;

/// Which calendar year selects the backend partition of an article.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, clap::ValueEnum)]
pub enum PartitionPolicy {
    /// Year of ingestion (the run's wall clock)
    #[default]
    IngestYear,
    /// Year the article was published, falling back to the ingestion year
    PublishedYear,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, clap::ValueEnum)]
pub enum StorageKind {
    #[default]
    Elastic,
    Memory,
}

impl StorageKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            StorageKind::Elastic => "elastic",
            StorageKind::Memory => "memory",
        }
    }
}

/// Everything a crawl run needs besides the adapters themselves.
#[derive(Debug, Clone)]
pub struct RunConfig {
    pub storage: StorageKind,
    pub backend_url: String,
    pub backend_timeout: Duration,
    pub index: String,
    pub lookback_days: u32,
    pub oldest_first: bool,
    pub batch_size: usize,
    /// Source keys to crawl; empty means every known source.
    pub sources: Vec<String>,
    pub fetch_timeout: Duration,
    pub fetch_retries: u32,
    pub write_retries: u32,
    pub concurrency: usize,
    pub partition_policy: PartitionPolicy,
}

impl Default for RunConfig {
    fn default() -> Self {
        Self {
            storage: StorageKind::default(),
            backend_url: DEFAULT_BACKEND_URL.to_string(),
            backend_timeout: DEFAULT_FETCH_TIMEOUT,
            index: DEFAULT_INDEX.to_string(),
            lookback_days: DEFAULT_LOOKBACK_DAYS,
            oldest_first: false,
            batch_size: DEFAULT_BATCH_SIZE,
            sources: Vec::new(),
            fetch_timeout: DEFAULT_FETCH_TIMEOUT,
            fetch_retries: DEFAULT_FETCH_RETRIES,
            write_retries: DEFAULT_WRITE_RETRIES,
            concurrency: DEFAULT_CONCURRENCY,
            partition_policy: PartitionPolicy::default(),
        }
    }
}

impl RunConfig {
    /// Reject settings the pipeline cannot run with. Called before any fetch.
    pub fn validate(&self) -> Result<()> {
        if self.batch_size == 0 {
            return Err(Error::Configuration("batch size must be at least 1".to_string()));
        }
        if self.concurrency == 0 {
            return Err(Error::Configuration("concurrency must be at least 1".to_string()));
        }
        if self.lookback_days == 0 {
            return Err(Error::Configuration("lookback window must cover at least one day".to_string()));
        }
        if self.fetch_timeout.is_zero() {
            return Err(Error::Configuration("fetch timeout must be positive".to_string()));
        }
        validate_index_name(&self.index)?;
        if self.storage == StorageKind::Elastic {
            Url::parse(&self.backend_url).map_err(|e| {
                Error::Configuration(format!("invalid backend url {:?}: {}", self.backend_url, e))
            })?;
        }
        Ok(())
    }
}

fn validate_index_name(index: &str) -> Result<()> {
    const FORBIDDEN: &[char] = &['\\', '/', '*', '?', '"', '<', '>', '|', ' ', ',', '#', ':'];

    if index.is_empty() {
        return Err(Error::Configuration("index name must not be empty".to_string()));
    }
    if index.starts_with(['-', '_', '+']) {
        return Err(Error::Configuration(format!("index name {:?} cannot start with '-', '_' or '+'", index)));
    }
    if let Some(c) = index.chars().find(|c| c.is_uppercase() || FORBIDDEN.contains(c)) {
        return Err(Error::Configuration(format!("index name {:?} contains invalid character {:?}", index, c)));
    }
    Ok(())
}
