pub mod batch;
pub mod cli;
pub mod dedup;
pub mod extract;
pub mod fetch;
pub mod logging;
pub mod manager;
pub mod scrapers;
pub mod window;

pub use batch::{BatchReport, BatchWriter};
pub use cli::{handle_command, CrawlArgs, HumanDuration, ScraperCommands};
pub use dedup::{fingerprint, partition_name, DedupGuard};
pub use fetch::HttpFetcher;
pub use logging::{init_logging, LogFormat};
pub use manager::{CrawlManager, CrawlOutcome, RunReport, SourceReport};
pub use scrapers::{Source, SourceAdapter};
pub use window::CrawlWindow;

pub mod prelude {
    pub use super::manager::CrawlManager;
    pub use super::scrapers::{ListingPage, Source, SourceAdapter};
    pub use nt_core::{Article, Error, Result};
}
