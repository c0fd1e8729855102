use chrono::{Datelike, Local};
use nt_core::{Article, IndexAction, PartitionPolicy, Result, SearchBackend};
use serde::Serialize;
use sha2::{Digest, Sha256};
use std::collections::HashSet;
use std::sync::Arc;
use tracing::debug;

#[derive(Serialize)]
struct Identity<'a> {
    title: &'a str,
    created_at: Option<String>,
    link: &'a str,
}

/// Stable document id derived from `(title, created_at, link)`.
///
/// The triple is serialized to JSON with a fixed key order and hashed with
/// SHA-256; the lowercase hex digest is the id.
pub fn fingerprint(article: &Article) -> String {
    let identity = Identity {
        title: &article.title,
        created_at: article.created_at_string(),
        link: &article.link,
    };
    // Serializing a struct of strings cannot fail.
    let body = serde_json::to_vec(&identity).unwrap_or_default();
    format!("{:x}", Sha256::digest(&body))
}

/// `{index}-{year}`
pub fn partition_name(index: &str, year: i32) -> String {
    format!("{}-{}", index, year)
}

/// Decides whether an extracted article is new and should be written.
///
/// The check is a point lookup against the backend and is not transactional.
/// Ids admitted earlier in the same run are also remembered until their batch
/// is written, so a link listed twice is only written once even before the
/// flush.
pub struct DedupGuard {
    backend: Arc<dyn SearchBackend>,
    index: String,
    policy: PartitionPolicy,
    seen: HashSet<String>,
}

impl DedupGuard {
    pub fn new(backend: Arc<dyn SearchBackend>, index: impl Into<String>, policy: PartitionPolicy) -> Self {
        Self {
            backend,
            index: index.into(),
            policy,
            seen: HashSet::new(),
        }
    }

    pub fn partition_for(&self, article: &Article) -> String {
        let ingest_year = Local::now().year();
        let year = match self.policy {
            PartitionPolicy::IngestYear => ingest_year,
            PartitionPolicy::PublishedYear => article.created_at.map_or(ingest_year, |dt| dt.year()),
        };
        partition_name(&self.index, year)
    }

    /// Ids remembered from this run that the backend may not know about yet
    pub fn remembered(&self) -> usize {
        self.seen.len()
    }

    /// Forget every remembered id that is not in `pending`. Ids whose batch
    /// has been written are answered by the backend lookup from then on, so
    /// the set stays bounded by the batch buffer.
    pub fn retain_pending<'a>(&mut self, pending: impl IntoIterator<Item = &'a str>) {
        let pending: HashSet<&str> = pending.into_iter().collect();
        self.seen.retain(|id| pending.contains(id.as_str()));
    }

    pub async fn exists(&self, id: &str, partition: &str) -> Result<bool> {
        self.backend.exists(id, partition).await
    }

    /// Returns the write action for `article` when it is not yet stored,
    /// `None` when it is a duplicate.
    pub async fn admit(&mut self, article: Article) -> Result<Option<IndexAction>> {
        let id = fingerprint(&article);
        if self.seen.contains(&id) {
            debug!(%id, link = %article.link, "duplicate within run");
            return Ok(None);
        }

        let partition = self.partition_for(&article);
        if self.exists(&id, &partition).await? {
            debug!(%id, %partition, link = %article.link, "already stored");
            return Ok(None);
        }

        self.seen.insert(id.clone());
        Ok(Some(IndexAction {
            id,
            partition,
            document: article,
        }))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use chrono::NaiveDate;
    use nt_core::BulkItemResult;
    use std::sync::Mutex;

    #[derive(Default)]
    struct MockBackend {
        stored: Mutex<HashSet<(String, String)>>,
    }

    #[async_trait]
    impl SearchBackend for MockBackend {
        fn name(&self) -> &str {
            "mock"
        }

        async fn exists(&self, id: &str, partition: &str) -> Result<bool> {
            Ok(self.stored.lock().unwrap().contains(&(id.to_string(), partition.to_string())))
        }

        async fn bulk_write(&self, batch: &[IndexAction]) -> Result<Vec<BulkItemResult>> {
            let mut stored = self.stored.lock().unwrap();
            Ok(batch
                .iter()
                .map(|a| {
                    stored.insert((a.id.clone(), a.partition.clone()));
                    BulkItemResult::ok(&a.id)
                })
                .collect())
        }
    }

    fn article() -> Article {
        Article {
            title: "Harga Emas Naik".to_string(),
            created_at: NaiveDate::from_ymd_opt(2023, 12, 31).and_then(|d| d.and_hms_opt(23, 50, 0)),
            image_url: None,
            content: "Emas naik.".to_string(),
            source: "detik finance".to_string(),
            link: "https://finance.detik.com/d-1".to_string(),
        }
    }

    #[test]
    fn test_fingerprint_is_deterministic() {
        let id = fingerprint(&article());
        assert_eq!(id, fingerprint(&article()));
        assert_eq!(id.len(), 64);
        assert!(id.chars().all(|c| c.is_ascii_hexdigit() && !c.is_ascii_uppercase()));
    }

    #[test]
    fn test_fingerprint_changes_with_each_identity_field() {
        let base = fingerprint(&article());

        let mut a = article();
        a.title.push('!');
        assert_ne!(fingerprint(&a), base);

        let mut a = article();
        a.created_at = a.created_at.map(|dt| dt + chrono::Duration::minutes(1));
        assert_ne!(fingerprint(&a), base);

        let mut a = article();
        a.created_at = None;
        assert_ne!(fingerprint(&a), base);

        let mut a = article();
        a.link.push_str("?page=2");
        assert_ne!(fingerprint(&a), base);
    }

    #[test]
    fn test_fingerprint_ignores_non_identity_fields() {
        let base = fingerprint(&article());
        let mut a = article();
        a.content = "Completely different body".to_string();
        a.image_url = Some("https://img.example/x.jpg".to_string());
        a.source = "cnn indonesia".to_string();
        assert_eq!(fingerprint(&a), base);
    }

    #[test]
    fn test_partition_policies() {
        let backend = Arc::new(MockBackend::default());
        let this_year = Local::now().year();

        let guard = DedupGuard::new(backend.clone(), "news", PartitionPolicy::IngestYear);
        assert_eq!(guard.partition_for(&article()), format!("news-{}", this_year));

        let guard = DedupGuard::new(backend, "news", PartitionPolicy::PublishedYear);
        assert_eq!(guard.partition_for(&article()), "news-2023");
        let mut undated = article();
        undated.created_at = None;
        assert_eq!(guard.partition_for(&undated), format!("news-{}", this_year));
    }

    #[tokio::test]
    async fn test_admit_skips_stored_and_repeated_articles() {
        let backend = Arc::new(MockBackend::default());
        let mut guard = DedupGuard::new(backend.clone(), "news", PartitionPolicy::IngestYear);

        let action = guard.admit(article()).await.unwrap().expect("new article is admitted");
        assert_eq!(action.id, fingerprint(&article()));
        assert!(guard.admit(article()).await.unwrap().is_none());

        backend.bulk_write(&[action]).await.unwrap();
        let mut fresh_guard = DedupGuard::new(backend, "news", PartitionPolicy::IngestYear);
        assert!(fresh_guard.admit(article()).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_written_ids_are_forgotten_but_still_deduplicated() {
        let backend = Arc::new(MockBackend::default());
        let mut guard = DedupGuard::new(backend.clone(), "news", PartitionPolicy::IngestYear);

        let first = guard.admit(article()).await.unwrap().expect("new article is admitted");
        let mut other = article();
        other.link.push_str("-2");
        let second = guard.admit(other.clone()).await.unwrap().expect("new article is admitted");
        assert_eq!(guard.remembered(), 2);

        // only `first` reached the backend; `second` is still buffered
        backend.bulk_write(&[first]).await.unwrap();
        guard.retain_pending([second.id.as_str()]);
        assert_eq!(guard.remembered(), 1);

        assert!(guard.admit(article()).await.unwrap().is_none());
        assert!(guard.admit(other).await.unwrap().is_none());
    }
}
