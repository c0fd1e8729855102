use async_trait::async_trait;
use std::time::Duration;
use crate::Result;

/// Raw page retrieval. Implementations must give up after `timeout` and
/// report it as `Error::Fetch`.
#[async_trait]
pub trait Fetcher: Send + Sync {
    async fn fetch(&self, url: &str, timeout: Duration) -> Result<Vec<u8>>;
}
