//! SIYE (Sink Into Your Eyes) extractor. The story header is a bare table:
//! labeled lines in the second left-aligned cell, the author anchor sitting
//! as a sibling of a `font` element rather than in any named container.

use crate::links::CanonicalUrl;
use crate::model::StoryMetadata;
use crate::scraper::error::ScraperError;
use crate::scraper::{text_of, Extractor};
use once_cell::sync::Lazy;
use scraper::{ElementRef, Html, Selector};

const SIYE_BASE: &str = "http://siye.co.uk/";
const SIYE_ICON: &str = "https://i.imgur.com/27czS4l.jpg";

static INFO_CELL_SEL: Lazy<Selector> =
    Lazy::new(|| Selector::parse(r#"td[align="left"]"#).expect("valid selector"));
static FONT_SEL: Lazy<Selector> =
    Lazy::new(|| Selector::parse("font").expect("valid selector"));
static TITLE_SEL: Lazy<Selector> = Lazy::new(|| Selector::parse("h3").expect("valid selector"));

pub struct SiyeExtractor;

impl Extractor for SiyeExtractor {
    fn extract(&self, doc: &Html, url: &CanonicalUrl) -> Result<StoryMetadata, ScraperError> {
        let cell = doc
            .select(&INFO_CELL_SEL)
            .nth(1)
            .ok_or(ScraperError::MissingElement {
                what: "story info cell",
                url: url.to_string(),
            })?;

        // Keep only labeled lines before positional indexing: a story with
        // no "Completed:" line (or stray banner rows) must not shift fields.
        let cell_text = cell.text().collect::<String>();
        let rows: Vec<String> = cell_text
            .trim()
            .lines()
            .map(|line| line.trim().to_string())
            .filter(|line| line.contains(':'))
            .collect();
        if rows.len() < 7 {
            return Err(ScraperError::UnexpectedShape {
                url: url.to_string(),
                reason: format!("expected at least 7 labeled info rows, found {}", rows.len()),
            });
        }

        let category = rows[0].clone();
        // The site omits the space after the "Characters:" label.
        let characters = match rows[1].strip_prefix("Characters:") {
            Some(rest) => format!("Characters: {}", rest.trim_start()),
            None => rows[1].clone(),
        };
        let genres = rows[2].clone();
        let rating = rows[4].clone();
        let description = rows[6]
            .strip_prefix("Summary:")
            .map(|rest| rest.trim_start().to_string())
            .ok_or_else(|| ScraperError::UnexpectedShape {
                url: url.to_string(),
                reason: format!("expected a summary row, found {:?}", rows[6]),
            })?;

        let (author, author_link) = author_from_byline(doc, url)?;

        let title = doc
            .select(&TITLE_SEL)
            .next()
            .map(text_of)
            .ok_or(ScraperError::MissingElement {
                what: "title",
                url: url.to_string(),
            })?;

        Ok(StoryMetadata {
            link: Some(url.to_string()),
            icon: SIYE_ICON.to_string(),
            thumbnail: None,
            author,
            author_link,
            title: Some(title),
            description,
            footer: format!("{} ∙ {} ∙ {} ∙ {}", category, characters, genres, rating),
        })
    }
}

/// The author anchor is the first element sibling after the first `font`
/// element in the page header.
fn author_from_byline(doc: &Html, url: &CanonicalUrl) -> Result<(String, String), ScraperError> {
    let font = doc
        .select(&FONT_SEL)
        .next()
        .ok_or(ScraperError::MissingElement {
            what: "author byline",
            url: url.to_string(),
        })?;
    let anchor = font
        .next_siblings()
        .find_map(ElementRef::wrap)
        .ok_or(ScraperError::MissingElement {
            what: "author link",
            url: url.to_string(),
        })?;
    if anchor.value().name() != "a" {
        return Err(ScraperError::UnexpectedShape {
            url: url.to_string(),
            reason: format!(
                "expected an anchor after the byline, found <{}>",
                anchor.value().name()
            ),
        });
    }
    let href = anchor
        .value()
        .attr("href")
        .ok_or_else(|| ScraperError::UnexpectedShape {
            url: url.to_string(),
            reason: "author anchor has no href".to_string(),
        })?;
    Ok((
        text_of(anchor),
        format!("{}{}", SIYE_BASE, href.trim_start_matches('/')),
    ))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::links::extract_links;

    /// `completed_row` is the unlabeled status banner some stories carry
    /// between the rating and word count ("Story is Complete"); it has no
    /// colon and must not shift the positional fields.
    fn story_html(completed_row: &str) -> String {
        format!(
            r#"<!DOCTYPE html><html><body>
<table><tr><td align="left">nav</td>
<td align="left">
Category: Post-Hogwarts
Characters:Harry Potter, Ginny Weasley
Genres: Action/Adventure, Romance
Warnings: None
Rating: PG-13
{completed_row}
Words: 85219
Summary: Ten years after the war, an old enemy resurfaces.
</td></tr></table>
<font size="2">A story by</font> <a href="viewuser.php?sid=77">QuillAndInk</a>
<h3>Echoes of the War</h3>
</body></html>"#
        )
    }

    fn story_url() -> CanonicalUrl {
        extract_links("http://siye.co.uk/siye/viewstory.php?sid=130").remove(0)
    }

    fn assert_expected_fields(meta: &StoryMetadata) {
        assert_eq!(meta.title.as_deref(), Some("Echoes of the War"));
        assert_eq!(meta.author, "QuillAndInk");
        assert_eq!(meta.author_link, "http://siye.co.uk/viewuser.php?sid=77");
        assert_eq!(
            meta.description,
            "Ten years after the war, an old enemy resurfaces."
        );
        assert_eq!(
            meta.footer,
            "Category: Post-Hogwarts ∙ Characters: Harry Potter, Ginny Weasley ∙ \
             Genres: Action/Adventure, Romance ∙ Rating: PG-13"
        );
        assert!(meta.thumbnail.is_none());
        assert_eq!(meta.icon, SIYE_ICON);
    }

    #[test]
    fn story_page_extracts_all_fields() {
        let doc = Html::parse_document(&story_html("Story is Complete"));
        let meta = SiyeExtractor.extract(&doc, &story_url()).unwrap();
        assert_expected_fields(&meta);
    }

    #[test]
    fn missing_completed_banner_does_not_shift_fields() {
        // Same document minus the status banner; the colon filter keeps the
        // positional fields stable either way.
        let doc = Html::parse_document(&story_html(""));
        let meta = SiyeExtractor.extract(&doc, &story_url()).unwrap();
        assert_expected_fields(&meta);
    }

    #[test]
    fn characters_label_gains_its_missing_space() {
        let doc = Html::parse_document(&story_html("Story is Complete"));
        let meta = SiyeExtractor.extract(&doc, &story_url()).unwrap();
        assert!(meta.footer.contains("Characters: Harry Potter"));
    }

    #[test]
    fn missing_info_cell_is_hard_failure() {
        let doc = Html::parse_document("<html><body><p>No such story.</p></body></html>");
        let err = SiyeExtractor.extract(&doc, &story_url()).unwrap_err();
        assert!(matches!(
            err,
            ScraperError::MissingElement {
                what: "story info cell",
                ..
            }
        ));
    }

    #[test]
    fn too_few_labeled_rows_is_unexpected_shape() {
        let html = r#"<html><body>
<table><tr><td align="left">nav</td>
<td align="left">
Category: Post-Hogwarts
Rating: PG-13
</td></tr></table>
</body></html>"#;
        let doc = Html::parse_document(html);
        let err = SiyeExtractor.extract(&doc, &story_url()).unwrap_err();
        assert!(matches!(err, ScraperError::UnexpectedShape { .. }));
    }
}
