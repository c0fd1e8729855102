use chrono::NaiveDate;
use nt_core::{Article, Error, Result};

pub mod indonesia;
use indonesia::{CnbcScraper, CnnScraper, DetikScraper};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Region {
    pub name: &'static str,
    pub emoji: &'static str,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SourceMetadata {
    /// Value written to `Article::source`
    pub name: &'static str,
    pub emoji: &'static str,
    pub region: Region,
}

/// One listing page of a source for a given date.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ListingPage {
    /// The un-numbered index page; also where pagination is discovered
    Index,
    Numbered(u32),
}

/// Discovery and extraction rules for one news source.
///
/// Implementations never do I/O: the crawler fetches every page and hands the
/// raw HTML in.
pub trait SourceAdapter: Send + Sync {
    fn source_metadata(&self) -> SourceMetadata;

    /// Short names accepted on the command line, first one is canonical
    fn cli_names(&self) -> Vec<&'static str>;

    fn can_handle(&self, url: &str) -> bool;

    /// URL of a listing page for `date`
    fn page_url(&self, date: NaiveDate, page: ListingPage) -> String;

    /// Numbered pages advertised by the pagination controls of the index
    /// page. Empty when the index page is the only page.
    fn list_pages(&self, index_html: &str) -> Result<Vec<ListingPage>>;

    /// Article URLs on a listing page, absolute and in document order.
    fn links_on_page(&self, page_html: &str, page_url: &str) -> Result<Vec<String>>;

    /// Build the canonical record from an article page.
    ///
    /// Missing structural elements yield `Error::Extraction`; an unreadable
    /// publication date yields `Error::DateParse`.
    fn extract(&self, raw_html: &str, link: &str) -> Result<Article>;
}

/// Every supported source, selected by configuration at startup.
#[derive(Debug, Clone)]
pub enum Source {
    Cnbc(CnbcScraper),
    Detik(DetikScraper),
    Cnn(CnnScraper),
}

impl Source {
    pub fn all() -> Vec<Source> {
        vec![
            Source::Cnbc(CnbcScraper::new()),
            Source::Detik(DetikScraper::new()),
            Source::Cnn(CnnScraper::new()),
        ]
    }

    pub fn adapter(&self) -> &dyn SourceAdapter {
        match self {
            Source::Cnbc(s) => s,
            Source::Detik(s) => s,
            Source::Cnn(s) => s,
        }
    }

    /// Canonical key, e.g. `cnbc`
    pub fn key(&self) -> &'static str {
        self.adapter().cli_names().first().copied().unwrap_or_default()
    }

    pub fn name(&self) -> &'static str {
        self.adapter().source_metadata().name
    }

    pub fn from_key(key: &str) -> Result<Source> {
        let wanted = key.trim().to_lowercase();
        Source::all()
            .into_iter()
            .find(|s| s.adapter().cli_names().contains(&wanted.as_str()))
            .ok_or_else(|| Error::Configuration(format!("unknown source: {}", key)))
    }

    /// Resolve configured keys; an empty list selects every source.
    pub fn select(keys: &[String]) -> Result<Vec<Source>> {
        if keys.is_empty() {
            return Ok(Source::all());
        }
        let mut selected: Vec<Source> = Vec::new();
        for key in keys {
            let source = Source::from_key(key)?;
            if !selected.iter().any(|s| s.key() == source.key()) {
                selected.push(source);
            }
        }
        Ok(selected)
    }

    pub fn for_url(url: &str) -> Result<Source> {
        Source::all()
            .into_iter()
            .find(|s| s.adapter().can_handle(url))
            .ok_or_else(|| Error::InvalidUrl(format!("no scraper handles {}", url)))
    }
}
