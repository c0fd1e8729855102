use chrono::NaiveDate;
use nt_core::{Article, Error, Result};
use scraper::Html;
use crate::extract::{self, Locale};
use crate::scrapers::{ListingPage, SourceAdapter, SourceMetadata};
use super::{REGION, WIB_DATE_FORMAT};

#[derive(Debug, Clone, Default)]
pub struct DetikScraper;

impl DetikScraper {
    pub fn new() -> Self {
        Self
    }

    const BASE_URL: &'static str = "https://finance.detik.com";
    const INDEX_PATH: &'static str = "/finansial/indeks";
}

impl SourceAdapter for DetikScraper {
    fn source_metadata(&self) -> SourceMetadata {
        SourceMetadata {
            name: "detik finance",
            emoji: "💰",
            region: REGION,
        }
    }

    fn cli_names(&self) -> Vec<&'static str> {
        vec!["detik", "detikfinance"]
    }

    fn can_handle(&self, url: &str) -> bool {
        url.contains("finance.detik.com")
    }

    fn page_url(&self, date: NaiveDate, page: ListingPage) -> String {
        // detik's index expects month/day/year
        let date = date.format("%m/%d/%Y");
        match page {
            ListingPage::Index => format!("{}{}?date={}", Self::BASE_URL, Self::INDEX_PATH, date),
            ListingPage::Numbered(n) => format!("{}{}/{}?date={}", Self::BASE_URL, Self::INDEX_PATH, n, date),
        }
    }

    fn list_pages(&self, index_html: &str) -> Result<Vec<ListingPage>> {
        let document = Html::parse_document(index_html);
        Ok(extract::select_page_numbers(&document, ".pagination a")?
            .into_iter()
            .map(ListingPage::Numbered)
            .collect())
    }

    fn links_on_page(&self, page_html: &str, page_url: &str) -> Result<Vec<String>> {
        let document = Html::parse_document(page_html);
        let rows = extract::parse_selector(".media__text")?;
        let anchor = extract::parse_selector("a[href]")?;

        let mut links: Vec<String> = Vec::new();
        for row in document.select(&rows) {
            let url = row
                .select(&anchor)
                .next()
                .and_then(|a| a.value().attr("href"))
                .and_then(|href| extract::resolve_url(page_url, href));
            if let Some(url) = url {
                if !links.contains(&url) {
                    links.push(url);
                }
            }
        }
        Ok(links)
    }

    fn extract(&self, raw_html: &str, link: &str) -> Result<Article> {
        let document = Html::parse_document(raw_html);

        let title = extract::select_text(&document, ".detail__header h1")?
            .filter(|t| !t.is_empty())
            .ok_or_else(|| Error::extraction("no content body: missing headline"))?;

        let body = extract::parse_selector(".detail__body-text")?;
        if document.select(&body).next().is_none() {
            return Err(Error::extraction("no content body: missing .detail__body-text"));
        }

        let date = extract::select_text(&document, ".detail__date")?
            .ok_or_else(|| Error::extraction("no content body: missing publication date"))?;
        let created_at = extract::parse_localized_date(&date, WIB_DATE_FORMAT, Locale::Indonesian)?;

        let image_url = extract::select_attr(&document, ".detail__media img", "src")?
            .and_then(|src| extract::resolve_url(link, &src));

        let paragraphs = extract::select_texts(&document, ".detail__body-text p")?;
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
