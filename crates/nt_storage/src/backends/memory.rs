use async_trait::async_trait;
use nt_core::{Article, BulkItemResult, IndexAction, Result, SearchBackend};
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::RwLock;

/// Partition name -> (document id -> document)
type Partitions = HashMap<String, HashMap<String, Article>>;

/// Process-local backend. Used for dry runs and as the reference backend in tests.
#[derive(Clone, Default)]
pub struct MemoryBackend {
    partitions: Arc<RwLock<Partitions>>,
}

impl MemoryBackend {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn get(&self, id: &str, partition: &str) -> Option<Article> {
        let partitions = self.partitions.read().await;
        partitions.get(partition).and_then(|docs| docs.get(id)).cloned()
    }

    /// Number of documents in one partition
    pub async fn count(&self, partition: &str) -> usize {
        let partitions = self.partitions.read().await;
        partitions.get(partition).map_or(0, |docs| docs.len())
    }

    /// Number of documents across all partitions
    pub async fn len(&self) -> usize {
        let partitions = self.partitions.read().await;
        partitions.values().map(|docs| docs.len()).sum()
    }

    pub async fn is_empty(&self) -> bool {
        self.len().await == 0
    }

    pub async fn partitions(&self) -> Vec<String> {
        let partitions = self.partitions.read().await;
        let mut names: Vec<String> = partitions.keys().cloned().collect();
        names.sort();
        names
    }
}

#[async_trait]
impl SearchBackend for MemoryBackend {
    fn name(&self) -> &str {
        "memory"
    }

    async fn exists(&self, id: &str, partition: &str) -> Result<bool> {
        let partitions = self.partitions.read().await;
        Ok(partitions
            .get(partition)
            .is_some_and(|docs| docs.contains_key(id)))
    }

    async fn bulk_write(&self, batch: &[IndexAction]) -> Result<Vec<BulkItemResult>> {
        let mut partitions = self.partitions.write().await;
        let results = batch
            .iter()
            .map(|action| {
                partitions
                    .entry(action.partition.clone())
                    .or_default()
                    .insert(action.id.clone(), action.document.clone());
                BulkItemResult::ok(&action.id)
            })
            .collect();
        Ok(results)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn action(id: &str, partition: &str) -> IndexAction {
        IndexAction {
            id: id.to_string(),
            partition: partition.to_string(),
            document: Article {
                title: format!("Article {}", id),
                created_at: None,
                image_url: None,
                content: "Test content".to_string(),
                source: "test".to_string(),
                link: format!("http://test.com/{}", id),
            },
        }
    }

    #[tokio::test]
    async fn test_memory_backend() {
        let backend = MemoryBackend::new();
        assert!(!backend.exists("a", "news-2024").await.unwrap());

        let results = backend
            .bulk_write(&[action("a", "news-2024"), action("b", "news-2024")])
            .await
            .unwrap();
        assert_eq!(results.len(), 2);
        assert!(results.iter().all(|r| r.is_ok()));

        assert!(backend.exists("a", "news-2024").await.unwrap());
        assert_eq!(backend.count("news-2024").await, 2);
    }

    #[tokio::test]
    async fn test_partitions_are_isolated() {
        let backend = MemoryBackend::new();
        backend.bulk_write(&[action("a", "news-2024")]).await.unwrap();

        assert!(!backend.exists("a", "news-2025").await.unwrap());
        assert_eq!(backend.partitions().await, vec!["news-2024".to_string()]);
    }

    #[tokio::test]
    async fn test_rewrite_same_id_keeps_one_document() {
        let backend = MemoryBackend::new();
        backend.bulk_write(&[action("a", "news-2024")]).await.unwrap();
        backend.bulk_write(&[action("a", "news-2024")]).await.unwrap();
        assert_eq!(backend.len().await, 1);
    }
}
