use std::str::FromStr;
use std::sync::Arc;
use std::time::Duration;
use clap::{Args, Subcommand};
use nt_core::{Error, Result, RunConfig};
use tracing::{info, warn};
use crate::fetch::HttpFetcher;
use crate::manager::{scrape_url, CrawlManager, CrawlOutcome, RunReport};
use crate::scrapers::Source;

/// A duration written as `30s`, `1m30s`, `2h` or a bare number of seconds.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct HumanDuration(pub Duration);

impl HumanDuration {
    fn unit_seconds(unit: char) -> Option<u64> {
        match unit {
            's' => Some(1),
            'm' => Some(60),
            'h' => Some(3600),
            'd' => Some(86400),
            _ => None,
        }
    }
}

impl FromStr for HumanDuration {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        let overflow = || format!("Duration too large: {}", s);
        let mut total: u64 = 0;
        let mut pending: Option<u64> = None;

        for c in s.chars().filter(|c| !c.is_whitespace()) {
            if let Some(digit) = c.to_digit(10) {
                let value = pending
                    .unwrap_or(0)
                    .checked_mul(10)
                    .and_then(|v| v.checked_add(u64::from(digit)))
                    .ok_or_else(overflow)?;
                pending = Some(value);
                continue;
            }
            let value = pending
                .take()
                .ok_or_else(|| format!("Expected a number before {:?}", c))?;
            let unit = Self::unit_seconds(c).ok_or_else(|| format!("Invalid duration unit: {}", c))?;
            let seconds = value.checked_mul(unit).ok_or_else(overflow)?;
            total = total.checked_add(seconds).ok_or_else(overflow)?;
        }

        match pending {
            // bare trailing number is seconds
            Some(value) => total = total.checked_add(value).ok_or_else(overflow)?,
            None if s.trim().is_empty() => return Err("Duration must include a number".to_string()),
            None => {}
        }

        Ok(HumanDuration(Duration::from_secs(total)))
    }
}

#[derive(Args, Debug, Clone, Default)]
pub struct CrawlArgs {
    /// Source to crawl, repeatable (e.g. --source cnbc --source detik). Defaults to all sources.
    #[arg(long = "source", short = 's', env = "NT_SOURCES", value_delimiter = ',')]
    pub sources: Vec<String>,
    /// Number of calendar days to crawl, ending today
    #[arg(long, env = "NT_LOOKBACK_DAYS")]
    pub lookback_days: Option<u32>,
    /// Walk the window from the oldest date to today
    #[arg(long, env = "NT_OLDEST_FIRST")]
    pub oldest_first: bool,
    /// Documents per bulk write
    #[arg(long, env = "NT_BATCH_SIZE")]
    pub batch_size: Option<usize>,
    /// Article pages fetched in parallel
    #[arg(long, env = "NT_CONCURRENCY")]
    pub concurrency: Option<usize>,
    /// Per-request timeout (e.g. 30s, 1m)
    #[arg(long, env = "NT_FETCH_TIMEOUT")]
    pub fetch_timeout: Option<HumanDuration>,
    #[arg(long, env = "NT_FETCH_RETRIES")]
    pub fetch_retries: Option<u32>,
    /// Attempts to re-send a failed batch before the run is aborted
    #[arg(long, env = "NT_WRITE_RETRIES")]
    pub write_retries: Option<u32>,
}

impl CrawlArgs {
    /// Overlay the flags that were given onto `config`.
    pub fn apply(&self, config: &mut RunConfig) {
        if !self.sources.is_empty() {
            config.sources = self.sources.clone();
        }
        if let Some(days) = self.lookback_days {
            config.lookback_days = days;
        }
        if self.oldest_first {
            config.oldest_first = true;
        }
        if let Some(size) = self.batch_size {
            config.batch_size = size;
        }
        if let Some(concurrency) = self.concurrency {
            config.concurrency = concurrency;
        }
        if let Some(timeout) = self.fetch_timeout {
            config.fetch_timeout = timeout.0;
        }
        if let Some(retries) = self.fetch_retries {
            config.fetch_retries = retries;
        }
        if let Some(retries) = self.write_retries {
            config.write_retries = retries;
        }
    }
}

#[derive(Subcommand, Debug, Clone)]
pub enum ScraperCommands {
    /// Crawl the configured sources and write new articles to the backend
    Crawl(CrawlArgs),
    /// List available sources
    List,
    /// Fetch and extract a single article, printing it as JSON
    Url { url: String },
}

pub async fn handle_command(command: ScraperCommands, mut config: RunConfig) -> Result<()> {
    match command {
        ScraperCommands::Crawl(args) => {
            args.apply(&mut config);
            config.validate()?;
            let sources = Source::select(&config.sources)?;

            let backend = nt_storage::create_storage(&config)?;
            let fetcher = Arc::new(HttpFetcher::new()?);
            let manager = CrawlManager::new(fetcher, backend, config)?;

            let cancel = manager.cancellation_token();
            tokio::spawn(async move {
                if tokio::signal::ctrl_c().await.is_ok() {
                    warn!("🛑 interrupt received, draining buffered articles");
                    cancel.cancel();
                }
            });

            let names: Vec<_> = sources.iter().map(|s| s.name()).collect();
            info!("🦗 Crawling {}", names.join(", "));
            let report = manager.run(&sources).await;
            print_report(&report);

            match report.sources.iter().find_map(|s| match &s.outcome {
                CrawlOutcome::Aborted(reason) => Some(reason.clone()),
                _ => None,
            }) {
                Some(reason) => Err(Error::BackendWrite(reason)),
                None => Ok(()),
            }
        }
        ScraperCommands::List => {
            println!("Available sources:");
            for line in source_listing() {
                println!("  {}", line);
            }
            Ok(())
        }
        ScraperCommands::Url { url } => {
            info!("Scraping single URL: {}", url);
            let fetcher = HttpFetcher::new()?;
            let article = scrape_url(&fetcher, &url, &config).await?;
            println!("{}", serde_json::to_string_pretty(&article)?);
            Ok(())
        }
    }
}

fn source_listing() -> Vec<String> {
    Source::all()
        .iter()
        .map(|source| {
            let meta = source.adapter().source_metadata();
            format!(
                "{} {:<8} {} ({} {})",
                meta.emoji,
                source.key(),
                meta.name,
                meta.region.emoji,
                meta.region.name
            )
        })
        .collect()
}

fn print_report(report: &RunReport) {
    for source in &report.sources {
        println!(
            "{}: {} dates, {} links, {} new, {} duplicates, {} skipped, {} written in {} batches ({:?})",
            source.source,
            source.dates,
            source.discovered,
            source.admitted,
            source.duplicates,
            source.skipped.len(),
            source.written(),
            source.batches.len(),
            source.outcome,
        );
        if source.unflushed > 0 {
            println!("  {} admitted articles were not written", source.unflushed);
        }
    }
    println!("Finished in {:.1}s", report.elapsed.as_secs_f64());
}
