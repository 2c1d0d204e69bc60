//! Site extractors and the preview pipeline: dispatch by canonical link,
//! fetch, extract, format. Each link is an independent unit of work.

mod client;
mod error;

pub mod ao3;
pub mod fanfiction;
pub mod siye;

pub use client::{acknowledged_url, decode_body, is_interstitial, interstitial_target};
pub use client::{Client, ClientBuilder};
pub use error::ScraperError;

use crate::links::{self, CanonicalUrl, Site};
use crate::model::{format_card, DisplayCard, StoryMetadata};
use scraper::{ElementRef, Html};

/// Trait implemented by site extractors. An extractor turns a parsed
/// document plus the canonical link it came from into a [StoryMetadata]
/// record, or fails hard when a required element is absent.
pub trait Extractor {
    fn extract(&self, doc: &Html, url: &CanonicalUrl) -> Result<StoryMetadata, ScraperError>;
}

/// Document source for the preview pipeline. [Client] is the HTTP
/// implementation; tests substitute scripted fetchers.
pub trait Fetch {
    fn fetch_document(&self, link: &CanonicalUrl) -> Result<Html, ScraperError>;
}

/// Concatenated, trimmed text content of an element.
pub(crate) fn text_of(el: ElementRef<'_>) -> String {
    el.text().collect::<String>().trim().to_string()
}

/// Dispatch by site: run the extractor matching the canonical link.
pub fn extract(doc: &Html, url: &CanonicalUrl) -> Result<StoryMetadata, ScraperError> {
    match url.site() {
        Site::FanFiction => fanfiction::FanFictionExtractor.extract(doc, url),
        Site::ArchiveOfOurOwn => ao3::Ao3Extractor.extract(doc, url),
        Site::Siye => siye::SiyeExtractor.extract(doc, url),
    }
}

/// Fetch and extract one canonical link.
pub fn preview<F: Fetch>(client: &F, url: &CanonicalUrl) -> Result<StoryMetadata, ScraperError> {
    let doc = client.fetch_document(url)?;
    extract(&doc, url)
}

/// Scan free-form text and process every recognized link independently, in
/// first-occurrence order. One link failing never aborts the others; each
/// failure maps to its own user notice.
pub fn scan<F: Fetch>(
    client: &F,
    text: &str,
) -> Vec<(CanonicalUrl, Result<DisplayCard, ScraperError>)> {
    links::extract_links(text)
        .into_iter()
        .map(|link| {
            let result = preview(client, &link).map(|meta| format_card(&meta));
            (link, result)
        })
        .collect()
}
