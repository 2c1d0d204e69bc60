//! Archive of Our Own extractor. Works pages carry their stats as dt/dd
//! pairs sharing a class per field; each field renders as "Label: value".

use crate::links::CanonicalUrl;
use crate::model::{regroup_digits, StoryMetadata};
use crate::scraper::error::ScraperError;
use crate::scraper::{text_of, Extractor};
use once_cell::sync::Lazy;
use scraper::{Html, Selector};

const AO3_BASE: &str = "https://archiveofourown.org/";
const AO3_ICON: &str = "https://i.imgur.com/oJtk1Gp.png";

static AUTHOR_SEL: Lazy<Selector> =
    Lazy::new(|| Selector::parse(r#"a[rel="author"]"#).expect("valid selector"));
static TITLE_SEL: Lazy<Selector> =
    Lazy::new(|| Selector::parse("h2.title.heading").expect("valid selector"));
static SUMMARY_SEL: Lazy<Selector> =
    Lazy::new(|| Selector::parse("div.summary.module blockquote p").expect("valid selector"));

/// Current stat-field set, in display order. The first element of each entry
/// is the shared dt/dd class, then whether the field is required, then
/// whether its value gets thousands re-grouping.
static STAT_FIELDS: Lazy<Vec<(&'static str, Selector, bool, bool)>> = Lazy::new(|| {
    [
        ("published", true, false),
        ("status", false, false),
        ("chapters", true, true),
        ("words", true, true),
        ("kudos", false, true),
        ("hits", false, true),
    ]
    .into_iter()
    .map(|(class, required, numeric)| {
        let sel = Selector::parse(&format!("dl.stats .{}", class)).expect("valid selector");
        (class, sel, required, numeric)
    })
    .collect()
});

pub struct Ao3Extractor;

impl Extractor for Ao3Extractor {
    fn extract(&self, doc: &Html, url: &CanonicalUrl) -> Result<StoryMetadata, ScraperError> {
        let author_el = doc
            .select(&AUTHOR_SEL)
            .next()
            .ok_or(ScraperError::MissingElement {
                what: "author byline",
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
        let author_link = format!("{}{}", AO3_BASE, author_href.trim_start_matches('/'));

        let title = doc
            .select(&TITLE_SEL)
            .next()
            .map(text_of)
            .ok_or(ScraperError::MissingElement {
                what: "title",
                url: url.to_string(),
            })?;

        let description = doc
            .select(&SUMMARY_SEL)
            .next()
            .map(text_of)
            .ok_or(ScraperError::MissingElement {
                what: "summary",
                url: url.to_string(),
            })?;

        let footer = footer_from_stats(doc, url)?;

        Ok(StoryMetadata {
            link: Some(url.to_string()),
            icon: AO3_ICON.to_string(),
            thumbnail: None,
            author,
            author_link,
            title: Some(title),
            description,
            footer,
        })
    }
}

/// Assemble the footer from the work's stats. Each field is the joined text
/// of every element carrying its class (the dt gives the label, the dd the
/// value). Optional fields absent from the page are skipped; required ones
/// missing fail extraction.
fn footer_from_stats(doc: &Html, url: &CanonicalUrl) -> Result<String, ScraperError> {
    let mut parts = Vec::new();
    for (class, sel, required, numeric) in STAT_FIELDS.iter() {
        let joined = doc
            .select(sel)
            .map(text_of)
            .filter(|t| !t.is_empty())
            .collect::<Vec<_>>()
            .join(" ");
        if joined.is_empty() {
            if *required {
                return Err(ScraperError::MissingElement {
                    what: *class,
                    url: url.to_string(),
                });
            }
            continue;
        }
        parts.push(if *numeric { regroup_digits(&joined) } else { joined });
    }
    Ok(parts.join(" ∙ "))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::links::extract_links;

    const WORK_HTML: &str = r#"<!DOCTYPE html><html><body>
<h2 class="title heading">What the Room Requires</h2>
<h3 class="byline heading"><a rel="author" href="/users/somewriter/pseuds/somewriter">somewriter</a></h3>
<div class="summary module"><h3 class="heading">Summary:</h3>
<blockquote class="userstuff"><p>Harry needs a place to hide. The Room obliges.</p></blockquote></div>
<dl class="stats">
<dt class="published">Published:</dt><dd class="published">2020-01-02</dd>
<dt class="status">Completed:</dt><dd class="status">2020-06-15</dd>
<dt class="chapters">Chapters:</dt><dd class="chapters">12/12</dd>
<dt class="words">Words:</dt><dd class="words">48215</dd>
<dt class="kudos">Kudos:</dt><dd class="kudos">1532</dd>
<dt class="hits">Hits:</dt><dd class="hits">20411</dd>
</dl>
</body></html>"#;

    fn work_url() -> CanonicalUrl {
        extract_links("https://archiveofourown.org/works/999").remove(0)
    }

    #[test]
    fn work_page_extracts_all_fields() {
        let doc = Html::parse_document(WORK_HTML);
        let meta = Ao3Extractor.extract(&doc, &work_url()).unwrap();
        assert_eq!(meta.title.as_deref(), Some("What the Room Requires"));
        assert_eq!(meta.author, "somewriter");
        assert_eq!(
            meta.author_link,
            "https://archiveofourown.org/users/somewriter/pseuds/somewriter"
        );
        assert_eq!(
            meta.description,
            "Harry needs a place to hide. The Room obliges."
        );
        assert!(meta.thumbnail.is_none());
        assert_eq!(meta.icon, AO3_ICON);
    }

    #[test]
    fn footer_joins_stat_fields_with_separator_glyph() {
        let doc = Html::parse_document(WORK_HTML);
        let meta = Ao3Extractor.extract(&doc, &work_url()).unwrap();
        let parts: Vec<&str> = meta.footer.split(" ∙ ").collect();
        assert_eq!(
            parts,
            vec![
                "Published: 2020-01-02",
                "Completed: 2020-06-15",
                "Chapters: 12/12",
                "Words: 48,215",
                "Kudos: 1,532",
                "Hits: 20,411",
            ]
        );
    }

    #[test]
    fn optional_stats_are_skipped_when_absent() {
        // One-shot with no status, kudos, or hits rows.
        let html = WORK_HTML
            .replace(
                r#"<dt class="status">Completed:</dt><dd class="status">2020-06-15</dd>"#,
                "",
            )
            .replace(r#"<dt class="kudos">Kudos:</dt><dd class="kudos">1532</dd>"#, "")
            .replace(r#"<dt class="hits">Hits:</dt><dd class="hits">20411</dd>"#, "");
        let doc = Html::parse_document(&html);
        let meta = Ao3Extractor.extract(&doc, &work_url()).unwrap();
        assert_eq!(
            meta.footer,
            "Published: 2020-01-02 ∙ Chapters: 12/12 ∙ Words: 48,215"
        );
    }

    #[test]
    fn missing_required_stat_fails_extraction() {
        let html = WORK_HTML.replace(
            r#"<dt class="words">Words:</dt><dd class="words">48215</dd>"#,
            "",
        );
        let doc = Html::parse_document(&html);
        let err = Ao3Extractor.extract(&doc, &work_url()).unwrap_err();
        assert!(matches!(
            err,
            ScraperError::MissingElement { what: "words", .. }
        ));
    }

    #[test]
    fn missing_summary_fails_extraction() {
        let html = WORK_HTML.replace(
            "<blockquote class=\"userstuff\"><p>Harry needs a place to hide. The Room obliges.</p></blockquote>",
            "",
        );
        let doc = Html::parse_document(&html);
        let err = Ao3Extractor.extract(&doc, &work_url()).unwrap_err();
        assert!(matches!(
            err,
            ScraperError::MissingElement { what: "summary", .. }
        ));
    }
}
