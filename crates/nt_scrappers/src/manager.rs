use chrono::{Local, NaiveDate};
use futures::stream::{self, StreamExt};
use nt_core::{Article, Error, Fetcher, IndexAction, Result, RunConfig, SearchBackend};
use std::fmt;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};
use crate::batch::{BatchReport, BatchWriter};
use crate::dedup::DedupGuard;
use crate::fetch::fetch_text;
use crate::scrapers::{ListingPage, Source, SourceAdapter};
use crate::window::CrawlWindow;

const WRITE_BACKOFF: Duration = Duration::from_secs(1);

/// Where a source crawl currently is. Only used for tracing.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CrawlPhase {
    Idle,
    WindowIterating,
    PageDiscovering,
    LinkFetching,
    Admitting,
    ErrorSkip,
    Draining,
    Done,
}

impl fmt::Display for CrawlPhase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            CrawlPhase::Idle => "idle",
            CrawlPhase::WindowIterating => "window_iterating",
            CrawlPhase::PageDiscovering => "page_discovering",
            CrawlPhase::LinkFetching => "link_fetching",
            CrawlPhase::Admitting => "admitting",
            CrawlPhase::ErrorSkip => "error_skip",
            CrawlPhase::Draining => "draining",
            CrawlPhase::Done => "done",
        };
        f.write_str(name)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CrawlOutcome {
    Completed,
    Cancelled,
    /// A backend write or lookup kept failing past the retry budget
    Aborted(String),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SkippedLink {
    pub url: String,
    pub kind: &'static str,
    pub reason: String,
}

#[derive(Debug, Clone)]
pub struct SourceReport {
    pub source: String,
    pub dates: usize,
    pub failed_pages: usize,
    pub discovered: usize,
    pub admitted: usize,
    pub duplicates: usize,
    pub skipped: Vec<SkippedLink>,
    pub batches: Vec<BatchReport>,
    /// Admitted documents still buffered when the crawl ended (only after a failed drain)
    pub unflushed: usize,
    pub elapsed: Duration,
    pub outcome: CrawlOutcome,
}

impl SourceReport {
    fn new(source: &str) -> Self {
        Self {
            source: source.to_string(),
            dates: 0,
            failed_pages: 0,
            discovered: 0,
            admitted: 0,
            duplicates: 0,
            skipped: Vec::new(),
            batches: Vec::new(),
            unflushed: 0,
            elapsed: Duration::ZERO,
            outcome: CrawlOutcome::Completed,
        }
    }

    pub fn written(&self) -> usize {
        self.batches.iter().map(|b| b.count).sum()
    }

    fn skip(&mut self, url: &str, error: &Error) {
        match error {
            Error::Extraction { reason } => {
                info!(source = %self.source, %url, kind = error.kind(), %reason, "⏭️ skipping link");
            }
            Error::DateParse { input, format } => {
                warn!(source = %self.source, %url, kind = error.kind(), %input, %format, "📅 skipping link, date format drift");
            }
            other => {
                warn!(source = %self.source, %url, kind = other.kind(), error = %other, "⚠️ skipping link");
            }
        }
        self.skipped.push(SkippedLink {
            url: url.to_string(),
            kind: error.kind(),
            reason: error.to_string(),
        });
    }
}

#[derive(Debug, Clone)]
pub struct RunReport {
    pub sources: Vec<SourceReport>,
    pub elapsed: Duration,
}

impl RunReport {
    pub fn is_aborted(&self) -> bool {
        self.sources
            .iter()
            .any(|s| matches!(s.outcome, CrawlOutcome::Aborted(_)))
    }

    pub fn written(&self) -> usize {
        self.sources.iter().map(|s| s.written()).sum()
    }
}

/// Drives the adapters over the crawl window and feeds what they extract
/// through dedup into the batch writer.
///
/// Link fetching and extraction run concurrently up to `concurrency`; dedup
/// and buffering happen in one place, in discovery order.
pub struct CrawlManager {
    fetcher: Arc<dyn Fetcher>,
    backend: Arc<dyn SearchBackend>,
    config: RunConfig,
    cancel: CancellationToken,
}

impl CrawlManager {
    pub fn new(fetcher: Arc<dyn Fetcher>, backend: Arc<dyn SearchBackend>, config: RunConfig) -> Result<Self> {
        config.validate()?;
        Ok(Self {
            fetcher,
            backend,
            config,
            cancel: CancellationToken::new(),
        })
    }

    /// Token that stops the run: no new fetches are issued and whatever was
    /// admitted so far is still written.
    pub fn cancellation_token(&self) -> CancellationToken {
        self.cancel.clone()
    }

    pub fn config(&self) -> &RunConfig {
        &self.config
    }

    pub async fn run(&self, sources: &[Source]) -> RunReport {
        self.run_on(sources, Local::now().date_naive()).await
    }

    /// Crawl every source over the window ending at `today`. Sources run one
    /// after another; a fatal backend failure or cancellation stops the rest.
    pub async fn run_on(&self, sources: &[Source], today: NaiveDate) -> RunReport {
        let started = Instant::now();
        let window = CrawlWindow::new(today, self.config.lookback_days, self.config.oldest_first);
        let mut reports = Vec::new();

        for source in sources {
            let report = self.crawl_source(source.adapter(), &window).await;
            let stop = report.outcome != CrawlOutcome::Completed;
            reports.push(report);
            if stop {
                break;
            }
        }

        let run = RunReport {
            sources: reports,
            elapsed: started.elapsed(),
        };
        info!(
            sources = run.sources.len(),
            written = run.written(),
            aborted = run.is_aborted(),
            elapsed_ms = run.elapsed.as_millis() as u64,
            "🏁 crawl run finished"
        );
        run
    }

    pub async fn crawl_source(&self, adapter: &dyn SourceAdapter, window: &CrawlWindow) -> SourceReport {
        let meta = adapter.source_metadata();
        let started = Instant::now();
        let mut report = SourceReport::new(meta.name);
        let mut guard = DedupGuard::new(self.backend.clone(), self.config.index.clone(), self.config.partition_policy);
        let mut writer = BatchWriter::new(self.backend.clone(), self.config.batch_size);

        self.enter(CrawlPhase::Idle, meta.name);
        info!(source = meta.name, days = window.lookback_days, "{} starting crawl", meta.emoji);

        let outcome = self.walk_window(adapter, window, &mut guard, &mut writer, &mut report).await;

        self.enter(CrawlPhase::Draining, meta.name);
        report.outcome = match outcome {
            CrawlOutcome::Aborted(reason) => {
                // Best effort only: the backend already refused this run.
                if let Err(e) = writer.drain().await {
                    error!(source = meta.name, error = %e, buffered = writer.buffered(), "❌ final drain failed");
                }
                CrawlOutcome::Aborted(reason)
            }
            other => match self.drain_with_retry(&mut writer).await {
                Ok(_) => other,
                Err(e) => {
                    error!(source = meta.name, error = %e, buffered = writer.buffered(), "❌ final drain failed");
                    CrawlOutcome::Aborted(e.to_string())
                }
            },
        };

        report.batches = writer.reports().to_vec();
        report.unflushed = writer.buffered();
        report.elapsed = started.elapsed();
        self.enter(CrawlPhase::Done, meta.name);

        info!(
            source = meta.name,
            dates = report.dates,
            discovered = report.discovered,
            admitted = report.admitted,
            duplicates = report.duplicates,
            skipped = report.skipped.len(),
            batches = report.batches.len(),
            written = report.written(),
            elapsed_ms = report.elapsed.as_millis() as u64,
            outcome = ?report.outcome,
            "✅ source crawl finished"
        );
        report
    }

    async fn walk_window(
        &self,
        adapter: &dyn SourceAdapter,
        window: &CrawlWindow,
        guard: &mut DedupGuard,
        writer: &mut BatchWriter,
        report: &mut SourceReport,
    ) -> CrawlOutcome {
        let source = adapter.source_metadata().name;

        for date in window.dates() {
            if self.cancel.is_cancelled() {
                return CrawlOutcome::Cancelled;
            }
            self.enter(CrawlPhase::WindowIterating, source);
            report.dates += 1;

            let links = self.discover_links(adapter, date, report).await;
            report.discovered += links.len();
            if links.is_empty() {
                continue;
            }
            info!(source, %date, count = links.len(), "🔗 processing links");

            self.enter(CrawlPhase::LinkFetching, source);
            let cancel = self.cancel.clone();
            let mut results = stream::iter(links)
                .take_while(move |_| futures::future::ready(!cancel.is_cancelled()))
                .map(|link| self.fetch_article(adapter, link))
                .buffered(self.config.concurrency);

            while let Some((link, result)) = results.next().await {
                let article = match result {
                    Ok(article) => article,
                    Err(e) => {
                        self.enter(CrawlPhase::ErrorSkip, source);
                        report.skip(&link, &e);
                        continue;
                    }
                };
                match self.dedup_with_retry(guard, article).await {
                    Ok(Some(action)) => {
                        self.enter(CrawlPhase::Admitting, source);
                        report.admitted += 1;
                        if let Err(e) = self.admit_with_retry(writer, action).await {
                            error!(source, error = %e, buffered = writer.buffered(), "❌ giving up on backend writes");
                            return CrawlOutcome::Aborted(e.to_string());
                        }
                        if guard.remembered() > writer.buffered() {
                            guard.retain_pending(writer.pending_ids());
                        }
                    }
                    Ok(None) => report.duplicates += 1,
                    Err(e) => {
                        error!(source, %link, error = %e, "❌ giving up on backend lookups");
                        return CrawlOutcome::Aborted(e.to_string());
                    }
                }
            }
        }

        if self.cancel.is_cancelled() {
            CrawlOutcome::Cancelled
        } else {
            CrawlOutcome::Completed
        }
    }

    /// Article links for one date in discovery order. Listing pages that
    /// cannot be fetched are logged and skipped.
    async fn discover_links(&self, adapter: &dyn SourceAdapter, date: NaiveDate, report: &mut SourceReport) -> Vec<String> {
        let source = adapter.source_metadata().name;
        self.enter(CrawlPhase::PageDiscovering, source);

        let index_url = adapter.page_url(date, ListingPage::Index);
        let index_html = match self.fetch(&index_url).await {
            Ok(html) => html,
            Err(e) => {
                warn!(source, %date, url = %index_url, error = %e, "⚠️ listing page unavailable");
                report.failed_pages += 1;
                return Vec::new();
            }
        };

        let pages = adapter.list_pages(&index_html).unwrap_or_else(|e| {
            warn!(source, %date, error = %e, "⚠️ could not read pagination");
            Vec::new()
        });

        let mut listings = Vec::new();
        if pages.is_empty() {
            listings.push((index_url, index_html));
        } else {
            for page in pages {
                if self.cancel.is_cancelled() {
                    break;
                }
                let url = adapter.page_url(date, page);
                match self.fetch(&url).await {
                    Ok(html) => listings.push((url, html)),
                    Err(e) => {
                        warn!(source, %date, %url, error = %e, "⚠️ listing page unavailable");
                        report.failed_pages += 1;
                    }
                }
            }
        }

        let mut links: Vec<String> = Vec::new();
        for (url, html) in listings {
            match adapter.links_on_page(&html, &url) {
                Ok(found) => {
                    for link in found {
                        if !links.contains(&link) {
                            links.push(link);
                        }
                    }
                }
                Err(e) => warn!(source, %url, error = %e, "⚠️ could not read listing page"),
            }
        }
        debug!(source, %date, count = links.len(), "discovered links");
        links
    }

    async fn fetch(&self, url: &str) -> Result<String> {
        fetch_text(self.fetcher.as_ref(), url, self.config.fetch_timeout, self.config.fetch_retries).await
    }

    async fn fetch_article(&self, adapter: &dyn SourceAdapter, link: String) -> (String, Result<Article>) {
        let result = match self.fetch(&link).await {
            Ok(html) => adapter.extract(&html, &link),
            Err(e) => Err(e),
        };
        (link, result)
    }

    /// Existence check for one article. A backend that keeps failing the
    /// lookup after `write_retries` extra attempts is treated as down.
    async fn dedup_with_retry(&self, guard: &mut DedupGuard, article: Article) -> Result<Option<IndexAction>> {
        let mut attempt = 0;
        loop {
            match guard.admit(article.clone()).await {
                Ok(verdict) => return Ok(verdict),
                Err(e) if attempt < self.config.write_retries => {
                    attempt += 1;
                    warn!(
                        attempt,
                        retries = self.config.write_retries,
                        link = %article.link,
                        error = %e,
                        "🔁 retrying backend lookup"
                    );
                    tokio::time::sleep(WRITE_BACKOFF * attempt).await;
                }
                Err(e) => return Err(e),
            }
        }
    }

    async fn admit_with_retry(&self, writer: &mut BatchWriter, action: IndexAction) -> Result<()> {
        match writer.admit(action).await {
            Ok(_) => Ok(()),
            Err(e) => self.retry_flush(writer, e).await,
        }
    }

    async fn drain_with_retry(&self, writer: &mut BatchWriter) -> Result<()> {
        match writer.drain().await {
            Ok(_) => Ok(()),
            Err(e) => self.retry_flush(writer, e).await,
        }
    }

    /// Re-attempt a failed flush up to `write_retries` times. The buffer is
    /// kept intact between attempts.
    async fn retry_flush(&self, writer: &mut BatchWriter, mut last: Error) -> Result<()> {
        for attempt in 1..=self.config.write_retries {
            warn!(
                attempt,
                retries = self.config.write_retries,
                buffered = writer.buffered(),
                error = %last,
                "🔁 retrying batch write"
            );
            tokio::time::sleep(WRITE_BACKOFF * attempt).await;
            match writer.flush().await {
                Ok(_) => return Ok(()),
                Err(e) => last = e,
            }
        }
        Err(last)
    }

    fn enter(&self, phase: CrawlPhase, source: &str) {
        debug!(source, %phase, "phase");
    }
}

/// Fetch and extract a single article with the adapter that handles `url`,
/// without touching any backend.
pub async fn scrape_url(fetcher: &dyn Fetcher, url: &str, config: &RunConfig) -> Result<Article> {
    let source = Source::for_url(url)?;
    let html = fetch_text(fetcher, url, config.fetch_timeout, config.fetch_retries).await?;
    source.adapter().extract(&html, url)
}
