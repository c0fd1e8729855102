use async_trait::async_trait;
use crate::types::{BulkItemResult, IndexAction};
use crate::Result;

/// The search/index backend the pipeline writes into.
///
/// Partitions are independent id spaces; an id present in one partition says
/// nothing about another.
#[async_trait]
pub trait SearchBackend: Send + Sync {
    /// Human-readable backend name used in logs
    fn name(&self) -> &str;

    /// Point existence check. A missing partition counts as "not present".
    async fn exists(&self, id: &str, partition: &str) -> Result<bool>;

    /// Write a batch of documents. Transport-level failures are returned as
    /// `Err`; per-document rejections are reported in the returned items.
    async fn bulk_write(&self, batch: &[IndexAction]) -> Result<Vec<BulkItemResult>>;
}
