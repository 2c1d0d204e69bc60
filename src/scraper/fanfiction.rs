//! FanFiction.net extractor: story pages (the `#profile_top` block) and
//! author-profile pages, which carry a different field subset.

use crate::links::{CanonicalUrl, PageKind};
use crate::model::StoryMetadata;
use crate::scraper::error::ScraperError;
use crate::scraper::{text_of, Extractor};
use once_cell::sync::Lazy;
use scraper::{Html, Selector};

const FFN_BASE: &str = "https://fanfiction.net/";
const FFN_ICON: &str = "https://i.imgur.com/0eUBQHu.png";

static PROFILE_TOP_SEL: Lazy<Selector> =
    Lazy::new(|| Selector::parse("#profile_top").expect("valid selector"));
static THUMB_SEL: Lazy<Selector> =
    Lazy::new(|| Selector::parse("#profile_top img.cimage").expect("valid selector"));
static AUTHOR_SEL: Lazy<Selector> =
    Lazy::new(|| Selector::parse("#profile_top a.xcontrast_txt").expect("valid selector"));
static TITLE_SEL: Lazy<Selector> =
    Lazy::new(|| Selector::parse("#profile_top b.xcontrast_txt").expect("valid selector"));
static DESC_SEL: Lazy<Selector> =
    Lazy::new(|| Selector::parse("#profile_top div.xcontrast_txt").expect("valid selector"));
static STATS_SEL: Lazy<Selector> =
    Lazy::new(|| Selector::parse("#profile_top span.xgray.xcontrast_txt").expect("valid selector"));

static WRAPPER_SPAN_SEL: Lazy<Selector> =
    Lazy::new(|| Selector::parse("#content_wrapper_inner span").expect("valid selector"));
static BIO_SEL: Lazy<Selector> =
    Lazy::new(|| Selector::parse("#bio_text").expect("valid selector"));

pub struct FanFictionExtractor;

impl Extractor for FanFictionExtractor {
    fn extract(&self, doc: &Html, url: &CanonicalUrl) -> Result<StoryMetadata, ScraperError> {
        match url.kind() {
            PageKind::Story => extract_story(doc, url),
            PageKind::AuthorProfile => extract_profile(doc, url),
        }
    }
}

fn extract_story(doc: &Html, url: &CanonicalUrl) -> Result<StoryMetadata, ScraperError> {
    if doc.select(&PROFILE_TOP_SEL).next().is_none() {
        return Err(ScraperError::MissingElement {
            what: "profile block",
            url: url.to_string(),
        });
    }

    let author_el = doc
        .select(&AUTHOR_SEL)
        .next()
        .ok_or(ScraperError::MissingElement {
            what: "author link",
            url: url.to_string(),
        })?;
    let author = text_of(author_el);
    let author_href =
        author_el
            .value()
            .attr("href")
            .ok_or_else(|| ScraperError::UnexpectedShape {
                url: url.to_string(),
                reason: "author anchor has no href".to_string(),
            })?;
    let author_link = format!("{}{}", FFN_BASE, author_href.trim_start_matches('/'));

    let title = doc
        .select(&TITLE_SEL)
        .next()
        .map(text_of)
        .ok_or(ScraperError::MissingElement {
            what: "title",
            url: url.to_string(),
        })?;

    let description = doc
        .select(&DESC_SEL)
        .next()
        .map(text_of)
        .ok_or(ScraperError::MissingElement {
            what: "description",
            url: url.to_string(),
        })?;

    let stats = doc
        .select(&STATS_SEL)
        .next()
        .map(text_of)
        .ok_or(ScraperError::MissingElement {
            what: "stats line",
            url: url.to_string(),
        })?;
    let footer = footer_from_stats(&stats).ok_or_else(|| ScraperError::UnexpectedShape {
        url: url.to_string(),
        reason: "stats line has no fields before the story id".to_string(),
    })?;

    let thumbnail = doc
        .select(&THUMB_SEL)
        .next()
        .and_then(|img| img.value().attr("src"))
        .map(|src| {
            if src.starts_with("//") {
                format!("https:{}", src)
            } else {
                src.to_string()
            }
        });

    Ok(StoryMetadata {
        link: Some(url.to_string()),
        icon: FFN_ICON.to_string(),
        thumbnail,
        author,
        author_link,
        title: Some(title),
        description,
        footer,
    })
}

/// The stat line ends with the site-internal story id; drop that segment and
/// join the rest with the separator glyph.
fn footer_from_stats(stats: &str) -> Option<String> {
    let segments: Vec<&str> = stats.split('-').map(str::trim).collect();
    if segments.len() < 2 {
        return None;
    }
    Some(segments[..segments.len() - 1].join(" ∙ "))
}

fn extract_profile(doc: &Html, url: &CanonicalUrl) -> Result<StoryMetadata, ScraperError> {
    let mut spans = doc.select(&WRAPPER_SPAN_SEL);
    let author = spans
        .next()
        .map(text_of)
        .filter(|s| !s.is_empty())
        .ok_or(ScraperError::MissingElement {
            what: "author name",
            url: url.to_string(),
        })?;

    let description = doc
        .select(&BIO_SEL)
        .next()
        .map(text_of)
        .ok_or(ScraperError::MissingElement {
            what: "profile bio",
            url: url.to_string(),
        })?;

    // The membership line ("Joined ..., id: ..., Profile Updated: ...").
    let footer = doc
        .select(&WRAPPER_SPAN_SEL)
        .map(text_of)
        .find(|text| text.contains("id:"))
        .map(|text| {
            text.split(',')
                .map(str::trim)
                .collect::<Vec<_>>()
                .join(" ∙ ")
        })
        .ok_or(ScraperError::MissingElement {
            what: "membership line",
            url: url.to_string(),
        })?;

    Ok(StoryMetadata {
        link: None,
        icon: FFN_ICON.to_string(),
        thumbnail: None,
        author,
        author_link: url.to_string(),
        title: None,
        description,
        footer,
    })
}
