use nt_core::{Error, IndexAction, Result, SearchBackend};
use std::collections::HashSet;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tracing::{info, warn};

#[derive(Debug, Clone, PartialEq)]
pub struct BatchReport {
    pub count: usize,
    pub elapsed: Duration,
}

/// Buffers admitted documents and writes them to the backend in batches.
///
/// The buffer is only touched through `admit`, `flush` and `drain`. Once it
/// reaches the threshold it is flushed before `admit` returns.
pub struct BatchWriter {
    backend: Arc<dyn SearchBackend>,
    buffer: Vec<IndexAction>,
    threshold: usize,
    reports: Vec<BatchReport>,
}

impl BatchWriter {
    pub fn new(backend: Arc<dyn SearchBackend>, threshold: usize) -> Self {
        let threshold = threshold.max(1);
        Self {
            backend,
            buffer: Vec::with_capacity(threshold),
            threshold,
            reports: Vec::new(),
        }
    }

    pub fn buffered(&self) -> usize {
        self.buffer.len()
    }

    /// Ids admitted but not yet written
    pub fn pending_ids(&self) -> impl Iterator<Item = &str> {
        self.buffer.iter().map(|action| action.id.as_str())
    }

    pub fn threshold(&self) -> usize {
        self.threshold
    }

    /// Completed flushes, oldest first
    pub fn reports(&self) -> &[BatchReport] {
        &self.reports
    }

    /// Queue one document. Flushes synchronously when the buffer is full; on
    /// a failed flush the document stays buffered and the error is returned.
    pub async fn admit(&mut self, action: IndexAction) -> Result<Option<BatchReport>> {
        self.buffer.push(action);
        if self.buffer.len() >= self.threshold {
            return self.flush().await.map(Some);
        }
        Ok(None)
    }

    /// Write the whole buffer.
    ///
    /// A transport failure leaves the buffer untouched. When the backend
    /// reports per-item results, accepted items are removed and rejected ones
    /// stay buffered for the next attempt; any rejection is an error.
    pub async fn flush(&mut self) -> Result<BatchReport> {
        let started = Instant::now();
        if self.buffer.is_empty() {
            return Ok(BatchReport { count: 0, elapsed: started.elapsed() });
        }

        let results = self.backend.bulk_write(&self.buffer).await.map_err(|e| match e {
            Error::BackendWrite(_) => e,
            other => Error::BackendWrite(other.to_string()),
        })?;

        // A backend that answers without per-item detail is trusted for the whole batch.
        let rejected: HashSet<String> = results
            .iter()
            .filter(|r| !r.is_ok())
            .map(|r| {
                warn!(id = %r.id, error = r.error.as_deref().unwrap_or_default(), "❌ document rejected by backend");
                r.id.clone()
            })
            .collect();

        let attempted = self.buffer.len();
        self.buffer.retain(|action| rejected.contains(&action.id));
        let written = attempted - self.buffer.len();
        let report = BatchReport { count: written, elapsed: started.elapsed() };

        if written > 0 {
            info!(
                count = written,
                elapsed_ms = report.elapsed.as_millis() as u64,
                backend = self.backend.name(),
                "💾 inserted batch"
            );
            self.reports.push(report.clone());
        }

        if !rejected.is_empty() {
            return Err(Error::BackendWrite(format!(
                "{} of {} documents rejected",
                rejected.len(),
                attempted
            )));
        }
        Ok(report)
    }

    /// Flush whatever is left. Must run at the end of every crawl, including
    /// aborted ones.
    pub async fn drain(&mut self) -> Result<BatchReport> {
        self.flush().await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use nt_core::{Article, BulkItemResult};
    use std::sync::Mutex;

    #[derive(Default)]
    struct RecordingBackend {
        batches: Mutex<Vec<usize>>,
        reject: Vec<String>,
        fail: bool,
    }

    #[async_trait]
    impl SearchBackend for RecordingBackend {
        fn name(&self) -> &str {
            "recording"
        }

        async fn exists(&self, _id: &str, _partition: &str) -> Result<bool> {
            Ok(false)
        }

        async fn bulk_write(&self, batch: &[IndexAction]) -> Result<Vec<BulkItemResult>> {
            self.batches.lock().unwrap().push(batch.len());
            if self.fail {
                return Err(Error::BackendWrite("cluster unavailable".to_string()));
            }
            Ok(batch
                .iter()
                .map(|a| {
                    if self.reject.contains(&a.id) {
                        BulkItemResult::failed(&a.id, "mapper_parsing_exception")
                    } else {
                        BulkItemResult::ok(&a.id)
                    }
                })
                .collect())
        }
    }

    fn action(n: usize) -> IndexAction {
        IndexAction {
            id: format!("id-{}", n),
            partition: "news-2024".to_string(),
            document: Article {
                title: format!("Article {}", n),
                created_at: None,
                image_url: None,
                content: String::new(),
                source: "test".to_string(),
                link: format!("https://example.com/{}", n),
            },
        }
    }

    #[tokio::test]
    async fn test_exactly_threshold_flushes_once() {
        let backend = Arc::new(RecordingBackend::default());
        let mut writer = BatchWriter::new(backend.clone(), 100);

        for n in 0..100 {
            writer.admit(action(n)).await.unwrap();
        }

        assert_eq!(*backend.batches.lock().unwrap(), vec![100]);
        assert_eq!(writer.buffered(), 0);
        assert_eq!(writer.reports().len(), 1);
    }

    #[tokio::test]
    async fn test_remainder_waits_for_drain() {
        let backend = Arc::new(RecordingBackend::default());
        let mut writer = BatchWriter::new(backend.clone(), 100);

        for n in 0..150 {
            writer.admit(action(n)).await.unwrap();
        }
        assert_eq!(*backend.batches.lock().unwrap(), vec![100]);
        assert_eq!(writer.buffered(), 50);

        let report = writer.drain().await.unwrap();
        assert_eq!(report.count, 50);
        assert_eq!(*backend.batches.lock().unwrap(), vec![100, 50]);
        assert_eq!(writer.buffered(), 0);
    }

    #[tokio::test]
    async fn test_drain_on_empty_buffer_skips_backend() {
        let backend = Arc::new(RecordingBackend::default());
        let mut writer = BatchWriter::new(backend.clone(), 10);
        let report = writer.drain().await.unwrap();
        assert_eq!(report.count, 0);
        assert!(backend.batches.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_failed_flush_keeps_buffer() {
        let backend = Arc::new(RecordingBackend { fail: true, ..Default::default() });
        let mut writer = BatchWriter::new(backend.clone(), 3);

        writer.admit(action(0)).await.unwrap();
        writer.admit(action(1)).await.unwrap();
        let err = writer.admit(action(2)).await.unwrap_err();
        assert!(matches!(err, Error::BackendWrite(_)));
        assert_eq!(writer.buffered(), 3);

        assert!(writer.drain().await.is_err());
        assert_eq!(*backend.batches.lock().unwrap(), vec![3, 3]);
        assert_eq!(writer.buffered(), 3);
    }

    #[tokio::test]
    async fn test_partial_rejection_keeps_only_rejected() {
        let backend = Arc::new(RecordingBackend {
            reject: vec!["id-1".to_string()],
            ..Default::default()
        });
        let mut writer = BatchWriter::new(backend.clone(), 10);
        for n in 0..3 {
            writer.admit(action(n)).await.unwrap();
        }

        let err = writer.flush().await.unwrap_err();
        assert!(matches!(err, Error::BackendWrite(_)));
        assert_eq!(writer.buffered(), 1);
        assert_eq!(writer.reports()[0].count, 2);
        assert_eq!(writer.pending_ids().collect::<Vec<_>>(), vec!["id-1"]);
    }
}
