use chrono::NaiveDate;
use nt_core::{Article, Error, Result};
use scraper::Html;
use crate::extract::{self, Locale};
use crate::scrapers::{ListingPage, SourceAdapter, SourceMetadata};
use super::REGION;

#[derive(Debug, Clone, Default)]
pub struct CnbcScraper;

impl CnbcScraper {
    pub fn new() -> Self {
        Self
    }

    const BASE_URL: &'static str = "https://www.cnbcindonesia.com";
    const INDEX_PATH: &'static str = "/market/indeks/5";
    const DATE_FORMAT: &'static str = "%d %B %Y %H:%M";
}

impl SourceAdapter for CnbcScraper {
    fn source_metadata(&self) -> SourceMetadata {
        SourceMetadata {
            name: "cnbc indonesia",
            emoji: "📈",
            region: REGION,
        }
    }

    fn cli_names(&self) -> Vec<&'static str> {
        vec!["cnbc", "cnbcindonesia"]
    }

    fn can_handle(&self, url: &str) -> bool {
        url.contains("cnbcindonesia.com")
    }

    fn page_url(&self, date: NaiveDate, page: ListingPage) -> String {
        let date = date.format("%Y/%m/%d");
        match page {
            ListingPage::Index => format!("{}{}?date={}", Self::BASE_URL, Self::INDEX_PATH, date),
            ListingPage::Numbered(n) => format!("{}{}/{}?date={}", Self::BASE_URL, Self::INDEX_PATH, n, date),
        }
    }

    fn list_pages(&self, index_html: &str) -> Result<Vec<ListingPage>> {
        let document = Html::parse_document(index_html);
        Ok(extract::select_page_numbers(&document, ".text_center a")?
            .into_iter()
            .map(ListingPage::Numbered)
            .collect())
    }

    fn links_on_page(&self, page_html: &str, page_url: &str) -> Result<Vec<String>> {
        let document = Html::parse_document(page_html);
        extract::select_links(&document, ".media_rows a", page_url)
    }

    fn extract(&self, raw_html: &str, link: &str) -> Result<Article> {
        let document = Html::parse_document(raw_html);

        let title = extract::select_text(&document, "h1")?
            .filter(|t| !t.is_empty())
            .ok_or_else(|| Error::extraction("no content body: missing headline"))?;

        // Video and gallery entries have no text container.
        let selector = extract::parse_selector(".detail_text")?;
        if document.select(&selector).next().is_none() {
            return Err(Error::extraction("no content body: missing .detail_text"));
        }

        let date = extract::select_text(&document, ".detail_box .date")?
            .ok_or_else(|| Error::extraction("no content body: missing publication date"))?;
        let created_at = extract::parse_localized_date(&date, Self::DATE_FORMAT, Locale::English)?;

        let image_url = extract::select_attr(&document, ".media_artikel img", "src")?
            .and_then(|src| extract::resolve_url(link, &src));

        let paragraphs = extract::select_texts(&document, ".detail_text p")?;
        let content = extract::strip_boilerplate(paragraphs).join(" ");

        Ok(Article {
            title,
            created_at: Some(created_at),
            image_url,
            content,
            source: self.source_metadata().name.to_string(),
            link: link.to_string(),
        })
    }
}
