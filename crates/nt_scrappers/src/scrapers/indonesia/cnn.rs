use chrono::NaiveDate;
use nt_core::{Article, Error, Result};
use scraper::Html;
use crate::extract::{self, Locale};
use crate::scrapers::{ListingPage, SourceAdapter, SourceMetadata};
use super::{REGION, WIB_DATE_FORMAT};

#[derive(Debug, Clone, Default)]
pub struct CnnScraper;

impl CnnScraper {
    pub fn new() -> Self {
        Self
    }

    const BASE_URL: &'static str = "https://www.cnnindonesia.com";
    const INDEX_PATH: &'static str = "/keuangan/indeks/38";
}

impl SourceAdapter for CnnScraper {
    fn source_metadata(&self) -> SourceMetadata {
        SourceMetadata {
            name: "cnn indonesia",
            emoji: "📺",
            region: REGION,
        }
    }

    fn cli_names(&self) -> Vec<&'static str> {
        vec!["cnn", "cnnindonesia"]
    }

    fn can_handle(&self, url: &str) -> bool {
        url.contains("cnnindonesia.com")
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
        Ok(extract::select_page_numbers(&document, ".pagination a, a.inline-flex.rounded-md")?
            .into_iter()
            .map(ListingPage::Numbered)
            .collect())
    }

    fn links_on_page(&self, page_html: &str, page_url: &str) -> Result<Vec<String>> {
        let document = Html::parse_document(page_html);
        let links = extract::select_links(&document, ".flex.flex-col.gap-5 article a", page_url)?;
        Ok(links.into_iter().filter(|url| self.can_handle(url)).collect())
    }

    fn extract(&self, raw_html: &str, link: &str) -> Result<Article> {
        let document = Html::parse_document(raw_html);

        let title = extract::select_text(&document, "h1")?
            .filter(|t| !t.is_empty())
            .ok_or_else(|| Error::extraction("no content body: missing headline"))?;

        let body = extract::parse_selector(".detail-text")?;
        if document.select(&body).next().is_none() {
            return Err(Error::extraction("no content body: missing .detail-text"));
        }

        // Not every CNN layout prints a date; a printed one must parse.
        let created_at = extract::select_text(&document, ".text-cnn_grey.text-sm")?
            .filter(|d| !d.is_empty())
            .map(|d| extract::parse_localized_date(&d, WIB_DATE_FORMAT, Locale::Indonesian))
            .transpose()?;

        let image_url = extract::select_attr(&document, ".detail-image img", "src")?
            .and_then(|src| extract::resolve_url(link, &src));

        let paragraphs = extract::select_texts(&document, ".detail-text p")?;
        let content = extract::strip_boilerplate(paragraphs).join(" ");

        Ok(Article {
            title,
            created_at,
            image_url,
            content,
            source: self.source_metadata().name.to_string(),
            link: link.to_string(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const LINK: &str = "https://www.cnnindonesia.com/ekonomi/20240816070500-78-1132000/harga-emas";

    const ARTICLE: &str = r#"
        <div class="flex flex-col">
          <h1 class="mb-2 leading-9 text-cnn_black">Harga Emas Antam Naik Rp 5.000</h1>
          <div class="text-cnn_grey text-sm mb-4">Jumat, 16 Agu 2024 07:05 WIB</div>
          <div class="detail-image my-5"><img src="/img/emas.jpg"></div>
          <div class="detail-text text-cnn_black text-sm grow min-w-0">
            <p>Harga emas batangan naik pagi ini.</p>
            <p>ADVERTISEMENT</p>
            <p>SCROLL TO RESUME CONTENT</p>
            <p>Harga buyback juga naik.</p>
          </div>
        </div>
    "#;

    #[test]
    fn test_discovery() {
        let html = r##"
            <div class="flex flex-col gap-5">
              <article><a href="https://www.cnnindonesia.com/ekonomi/20240816-78-1/a">A</a></article>
              <article><a href="/ekonomi/20240816-78-2/b">B</a></article>
              <article><a href="https://www.cnnindonesia.com/ekonomi/20240816-78-1/a">A again</a></article>
              <article><a href="https://ads.example.com/promo">Ad</a></article>
            </div>
            <div class="flex gap-2">
              <a class="inline-flex items-center justify-center w-[30px] h-[30px] rounded-md" href="#">1</a>
              <a class="inline-flex items-center justify-center w-[30px] h-[30px] rounded-md" href="#">2</a>
            </div>
        "##;
        let scraper = CnnScraper::new();
        assert_eq!(
            scraper.list_pages(html).unwrap(),
            vec![ListingPage::Numbered(1), ListingPage::Numbered(2)]
        );
        assert_eq!(
            scraper.links_on_page(html, "https://www.cnnindonesia.com/keuangan/indeks/38").unwrap(),
            vec![
                "https://www.cnnindonesia.com/ekonomi/20240816-78-1/a",
                "https://www.cnnindonesia.com/ekonomi/20240816-78-2/b",
            ]
        );
    }

    #[test]
    fn test_extract() {
        let article = CnnScraper::new().extract(ARTICLE, LINK).unwrap();
        assert_eq!(article.title, "Harga Emas Antam Naik Rp 5.000");
        assert_eq!(article.created_at_string().as_deref(), Some("2024-08-16 07:05:00"));
        assert_eq!(article.image_url.as_deref(), Some("https://www.cnnindonesia.com/img/emas.jpg"));
        assert_eq!(article.content, "Harga emas batangan naik pagi ini. Harga buyback juga naik.");
        assert_eq!(article.source, "cnn indonesia");
    }

    #[test]
    fn test_extract_without_date() {
        let html = ARTICLE.replace(r#"<div class="text-cnn_grey text-sm mb-4">Jumat, 16 Agu 2024 07:05 WIB</div>"#, "");
        let article = CnnScraper::new().extract(&html, LINK).unwrap();
        assert_eq!(article.created_at, None);
    }

    #[test]
    fn test_malformed_date() {
        let html = ARTICLE.replace("Jumat, 16 Agu 2024 07:05 WIB", "Jumat, 16 Agu 2024");
        let err = CnnScraper::new().extract(&html, LINK).unwrap_err();
        assert!(matches!(err, Error::DateParse { .. }));
    }

    #[test]
    fn test_missing_body() {
        let html = r#"<h1>CNN Indonesia TV</h1><div class="video-player"></div>"#;
        let err = CnnScraper::new().extract(html, LINK).unwrap_err();
        assert!(err.is_benign_skip());
    }
}
