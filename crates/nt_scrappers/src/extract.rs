//! Normalization helpers shared by every source adapter.
//!
//! Everything here is a pure function over already-fetched content.

use chrono::NaiveDateTime;
use nt_core::{Error, Result};
use scraper::{ElementRef, Html, Selector};
use url::Url;

/// Paragraphs containing any of these literal markers are dropped from article bodies.
pub const BOILERPLATE_MARKERS: &[&str] = &["ADVERTISEMENT", "SCROLL TO RESUME CONTENT"];

/// Drop advertisement and "scroll to resume" paragraphs, plus empty ones.
/// The remaining paragraphs keep their relative order.
pub fn strip_boilerplate<I, S>(paragraphs: I) -> Vec<String>
where
    I: IntoIterator<Item = S>,
    S: AsRef<str>,
{
    paragraphs
        .into_iter()
        .filter_map(|p| {
            let text = p.as_ref().trim();
            let boilerplate = BOILERPLATE_MARKERS.iter().any(|m| text.contains(m));
            (!text.is_empty() && !boilerplate).then(|| text.to_string())
        })
        .collect()
}

/// Calendar vocabulary used by a source when printing dates.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Locale {
    English,
    Indonesian,
}

const INDONESIAN_NAMES: &[(&str, &str)] = &[
    ("Januari", "January"),
    ("Februari", "February"),
    ("Maret", "March"),
    ("April", "April"),
    ("Mei", "May"),
    ("Juni", "June"),
    ("Juli", "July"),
    ("Agustus", "August"),
    ("September", "September"),
    ("Oktober", "October"),
    ("November", "November"),
    ("Desember", "December"),
    ("Agu", "Aug"),
    ("Agt", "Aug"),
    ("Okt", "Oct"),
    ("Des", "Dec"),
    ("Senin", "Monday"),
    ("Selasa", "Tuesday"),
    ("Rabu", "Wednesday"),
    ("Kamis", "Thursday"),
    ("Jumat", "Friday"),
    ("Sabtu", "Saturday"),
    ("Minggu", "Sunday"),
];

impl Locale {
    /// Rewrite month and weekday names into the English names chrono parses.
    /// Only whole words are replaced.
    fn to_english(self, text: &str) -> String {
        let table = match self {
            Locale::English => return text.to_string(),
            Locale::Indonesian => INDONESIAN_NAMES,
        };
        let text = text.replace("Jum'at", "Jumat");

        let mut out = String::with_capacity(text.len());
        let mut word = String::new();
        let flush = |word: &mut String, out: &mut String| {
            let translated = table
                .iter()
                .find(|(local, _)| *local == word.as_str())
                .map_or(word.as_str(), |(_, english)| *english);
            out.push_str(translated);
            word.clear();
        };
        for c in text.chars() {
            if c.is_alphabetic() {
                word.push(c);
            } else {
                flush(&mut word, &mut out);
                out.push(c);
            }
        }
        flush(&mut word, &mut out);
        out
    }
}

/// Parse a source-specific date string. Fails with `Error::DateParse` on any
/// mismatch instead of falling back to a guess.
pub fn parse_localized_date(text: &str, format: &str, locale: Locale) -> Result<NaiveDateTime> {
    let normalized = clean_text(text);
    NaiveDateTime::parse_from_str(&locale.to_english(&normalized), format).map_err(|_| Error::DateParse {
        input: text.trim().to_string(),
        format: format.to_string(),
    })
}

/// Collapse whitespace runs and trim.
pub fn clean_text(text: &str) -> String {
    text.split_whitespace().collect::<Vec<_>>().join(" ")
}

pub fn parse_selector(selector: &str) -> Result<Selector> {
    Selector::parse(selector).map_err(|e| Error::extraction(format!("invalid selector {:?}: {}", selector, e)))
}

pub fn element_text(element: &ElementRef<'_>) -> String {
    clean_text(&element.text().collect::<String>())
}

/// Text of the first element matching `selector`, if any
pub fn select_text(document: &Html, selector: &str) -> Result<Option<String>> {
    let selector = parse_selector(selector)?;
    Ok(document.select(&selector).next().map(|el| element_text(&el)))
}

/// Texts of every element matching `selector`, in document order
pub fn select_texts(document: &Html, selector: &str) -> Result<Vec<String>> {
    let selector = parse_selector(selector)?;
    Ok(document.select(&selector).map(|el| element_text(&el)).collect())
}

/// Attribute of the first matching element with a non-blank value. Blank
/// values (lazy-load placeholders) are passed over.
pub fn select_attr(document: &Html, selector: &str, attr: &str) -> Result<Option<String>> {
    let selector = parse_selector(selector)?;
    Ok(document.select(&selector).find_map(|el| {
        el.value()
            .attr(attr)
            .map(str::trim)
            .filter(|v| !v.is_empty())
            .map(str::to_string)
    }))
}

/// Resolve a possibly relative `href` against the page it was found on.
/// Fragment-only, `javascript:` and `mailto:` links resolve to `None`.
pub fn resolve_url(base: &str, href: &str) -> Option<String> {
    let href = href.trim();
    if href.is_empty() || href.starts_with('#') || href.starts_with("javascript:") || href.starts_with("mailto:") {
        return None;
    }
    let base = Url::parse(base).ok()?;
    let mut resolved = base.join(href).ok()?;
    resolved.set_fragment(None);
    matches!(resolved.scheme(), "http" | "https").then(|| resolved.to_string())
}

/// Hrefs of every element matching `selector`, resolved and deduplicated
/// while keeping first-seen order.
pub fn select_links(document: &Html, selector: &str, base: &str) -> Result<Vec<String>> {
    let selector = parse_selector(selector)?;
    let mut links: Vec<String> = Vec::new();
    for el in document.select(&selector) {
        if let Some(url) = el.value().attr("href").and_then(|href| resolve_url(base, href)) {
            if !links.contains(&url) {
                links.push(url);
            }
        }
    }
    Ok(links)
}

/// Numeric labels of pagination controls matching `selector`, ascending and
/// without duplicates.
pub fn select_page_numbers(document: &Html, selector: &str) -> Result<Vec<u32>> {
    let mut pages: Vec<u32> = select_texts(document, selector)?
        .iter()
        .filter_map(|label| label.parse::<u32>().ok())
        .filter(|n| *n > 0)
        .collect();
    pages.sort_unstable();
    pages.dedup();
    Ok(pages)
}
