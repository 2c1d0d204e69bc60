//! Canonical metadata record and display card.
//!
//! All site extractors produce [StoryMetadata]; the formatter maps it 1:1
//! onto a [DisplayCard] for the presentation layer.

use serde::{Deserialize, Serialize};

/// Normalized story (or author-profile) metadata.
///
/// `link` and `title` are absent for author-profile pages; `thumbnail` is
/// absent when the site or story has no cover image. Every other field is
/// always populated: an extractor that cannot fill one fails outright.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StoryMetadata {
    pub link: Option<String>,
    /// Site-identifying icon, constant per site.
    pub icon: String,
    pub thumbnail: Option<String>,
    pub author: String,
    pub author_link: String,
    pub title: Option<String>,
    pub description: String,
    /// Secondary site-specific stats, pre-joined with ` ∙ `.
    pub footer: String,
}

/// Display-ready card: the shape the host presentation layer renders.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DisplayCard {
    pub title: Option<String>,
    pub url: Option<String>,
    pub description: String,
    pub author_name: String,
    pub author_url: String,
    pub icon_url: String,
    pub footer: String,
    pub thumbnail: Option<String>,
}

/// Map a record onto its card. Pure; callers must not invoke it on a failed
/// extraction (there is no partial-record rendering).
pub fn format_card(meta: &StoryMetadata) -> DisplayCard {
    DisplayCard {
        title: meta.title.clone(),
        url: meta.link.clone(),
        description: meta.description.clone(),
        author_name: meta.author.clone(),
        author_url: meta.author_link.clone(),
        icon_url: meta.icon.clone(),
        footer: meta.footer.clone(),
        thumbnail: meta.thumbnail.clone(),
    }
}

/// Plain-text rendering of a card for terminal output.
pub fn render_text(card: &DisplayCard) -> String {
    let mut out = String::new();
    if let Some(title) = &card.title {
        out.push_str(title);
        out.push('\n');
    }
    if let Some(url) = &card.url {
        out.push_str(url);
        out.push('\n');
    }
    out.push_str(&format!("by {} <{}>\n", card.author_name, card.author_url));
    out.push_str(&card.description);
    out.push('\n');
    out.push_str(&card.footer);
    out.push('\n');
    if let Some(thumb) = &card.thumbnail {
        out.push_str(&format!("[thumbnail: {}]\n", thumb));
    }
    out
}

/// Format a count with thousands grouping (`12345` -> `12,345`).
pub fn group_thousands(n: u64) -> String {
    let digits = n.to_string();
    let mut out = String::with_capacity(digits.len() + digits.len() / 3);
    for (i, c) in digits.chars().enumerate() {
        if i > 0 && (digits.len() - i) % 3 == 0 {
            out.push(',');
        }
        out.push(c);
    }
    out
}

/// Re-group every digit run in a stat string with thousands separators,
/// dropping any grouping already present (`"Words: 1234567"` and
/// `"Words: 1,234,567"` both render as `"Words: 1,234,567"`).
pub fn regroup_digits(s: &str) -> String {
    let compact = s.replace(',', "");
    let mut out = String::with_capacity(compact.len());
    let mut run = String::new();
    for c in compact.chars() {
        if c.is_ascii_digit() {
            run.push(c);
        } else {
            flush_run(&mut out, &mut run);
            out.push(c);
        }
    }
    flush_run(&mut out, &mut run);
    out
}

fn flush_run(out: &mut String, run: &mut String) {
    if run.is_empty() {
        return;
    }
    match run.parse::<u64>() {
        Ok(n) => out.push_str(&group_thousands(n)),
        // Longer than u64: keep the raw digits rather than mangling them.
        Err(_) => out.push_str(run),
    }
    run.clear();
}
