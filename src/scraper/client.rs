//! Blocking HTTP client for story pages: bounded timeout, cookie jar,
//! declared-charset decoding, and the AO3 adult-content interstitial bypass.

use crate::links::{CanonicalUrl, Site};
use crate::scraper::error::ScraperError;
use encoding_rs::{Encoding, WINDOWS_1252};
use once_cell::sync::Lazy;
use regex::Regex;
use reqwest::header::CONTENT_TYPE;
use scraper::{Html, Selector};
use std::time::Duration;

const DEFAULT_USER_AGENT: &str =
    "Mozilla/5.0 (compatible; ficpreview/0.1; +https://github.com/ficpreview)";
/// Fetch budget per request. Exceeding it is a timeout failure, not a hang.
const DEFAULT_TIMEOUT_SECS: u64 = 8;
const MAX_REDIRECTS: usize = 10;

const AO3_BASE: &str = "https://archiveofourown.org";

/// Blocking client carrying the fetch quirks the supported sites need.
#[derive(Debug)]
pub struct Client {
    inner: reqwest::blocking::Client,
    fallback_encoding: &'static Encoding,
}

impl Client {
    /// Build a client with default User-Agent, timeout, and charset fallback.
    pub fn new() -> Result<Self, reqwest::Error> {
        Self::builder().build()
    }

    pub fn builder() -> ClientBuilder {
        ClientBuilder::default()
    }

    /// Fetch the document behind a canonical link, applying site quirks:
    /// AO3 requests carry the adult-content acknowledgement up front, and if
    /// the interstitial still appears, its proceed link is followed exactly
    /// once. No automatic retry on failure.
    pub fn fetch_document(&self, link: &CanonicalUrl) -> Result<Html, ScraperError> {
        if link.site() != Site::ArchiveOfOurOwn {
            return self.get_html(link.as_str());
        }

        let url = acknowledged_url(link.as_str());
        let doc = self.get_html(&url)?;
        if !is_interstitial(&doc) {
            return Ok(doc);
        }
        let target = interstitial_target(&doc).ok_or(ScraperError::MissingElement {
            what: "interstitial proceed link",
            url: url.clone(),
        })?;
        let doc = self.get_html(&target)?;
        if is_interstitial(&doc) {
            return Err(ScraperError::AdultGateLoop { url: target });
        }
        Ok(doc)
    }

    fn get_html(&self, url: &str) -> Result<Html, ScraperError> {
        let response = self.inner.get(url).send().map_err(|e| {
            if e.is_timeout() {
                ScraperError::Timeout {
                    url: url.to_string(),
                }
            } else {
                ScraperError::Network {
                    url: url.to_string(),
                    source: e,
                }
            }
        })?;
        let status = response.status();
        if !status.is_success() {
            return Err(ScraperError::HttpStatus {
                status: status.as_u16(),
                url: url.to_string(),
            });
        }
        let header_charset = response
            .headers()
            .get(CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .and_then(charset_from_content_type);
        let bytes = response.bytes().map_err(|e| {
            if e.is_timeout() {
                ScraperError::Timeout {
                    url: url.to_string(),
                }
            } else {
                ScraperError::BodyRead {
                    url: url.to_string(),
                    source: e,
                }
            }
        })?;
        let text = decode_body(&bytes, header_charset.as_deref(), self.fallback_encoding);
        Ok(Html::parse_document(&text))
    }
}

impl crate::scraper::Fetch for Client {
    fn fetch_document(&self, link: &CanonicalUrl) -> Result<Html, ScraperError> {
        Client::fetch_document(self, link)
    }
}

/// Append the AO3 adult-content acknowledgement before the first request.
pub fn acknowledged_url(url: &str) -> String {
    if url.contains('?') {
        format!("{}&view_adult=true", url)
    } else {
        format!("{}?view_adult=true", url)
    }
}

static INTERSTITIAL_SEL: Lazy<Selector> = Lazy::new(|| {
    Selector::parse("p.message.footnote").expect("interstitial selector is valid")
});
static PROCEED_SEL: Lazy<Selector> =
    Lazy::new(|| Selector::parse("ul.actions a[href]").expect("proceed selector is valid"));

/// True if the page is the age/content warning interstitial rather than the
/// chapter itself.
pub fn is_interstitial(doc: &Html) -> bool {
    doc.select(&INTERSTITIAL_SEL).next().is_some()
}

/// The "proceed to chapter" link embedded in the interstitial, resolved to
/// an absolute URL.
pub fn interstitial_target(doc: &Html) -> Option<String> {
    let href = doc
        .select(&PROCEED_SEL)
        .next()
        .and_then(|a| a.value().attr("href"))?;
    if href.starts_with("http://") || href.starts_with("https://") {
        Some(href.to_string())
    } else {
        Some(format!("{}{}", AO3_BASE, href))
    }
}

static META_CHARSET_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r#"(?i)<meta[^>]+charset\s*=\s*["']?([^"'\s>;]+)"#).expect("charset pattern is valid")
});

fn charset_from_content_type(content_type: &str) -> Option<String> {
    let (_, params) = content_type.split_once(';')?;
    params
        .split(';')
        .filter_map(|param| param.split_once('='))
        .find(|(key, _)| key.trim().eq_ignore_ascii_case("charset"))
        .map(|(_, value)| value.trim().trim_matches('"').to_string())
}

/// Charset declared in a meta tag within the first 1024 bytes, if any.
fn charset_from_meta(body: &[u8]) -> Option<String> {
    let head = &body[..body.len().min(1024)];
    let head_str = String::from_utf8_lossy(head);
    META_CHARSET_RE
        .captures(&head_str)
        .and_then(|c| c.get(1))
        .map(|m| m.as_str().to_string())
}

/// Decode a response body using the declared charset (header first, then
/// meta tag) or the configured fallback. Decoding is lossy for stray bytes
/// but never reinterprets a declared legacy encoding as UTF-8.
pub fn decode_body(body: &[u8], header_charset: Option<&str>, fallback: &'static Encoding) -> String {
    let encoding = header_charset
        .and_then(|label| Encoding::for_label(label.as_bytes()))
        .or_else(|| {
            charset_from_meta(body).and_then(|label| Encoding::for_label(label.as_bytes()))
        })
        .unwrap_or(fallback);
    let (text, _, _) = encoding.decode(body);
    text.into_owned()
}

/// Builder for [Client]: User-Agent, timeout, and fallback charset.
#[derive(Debug)]
pub struct ClientBuilder {
    user_agent: Option<String>,
    timeout_secs: u64,
    fallback_encoding: &'static Encoding,
}

impl Default for ClientBuilder {
    fn default() -> Self {
        Self {
            user_agent: None,
            timeout_secs: DEFAULT_TIMEOUT_SECS,
            fallback_encoding: WINDOWS_1252,
        }
    }
}

impl ClientBuilder {
    /// Set a custom User-Agent. If not set, a browser-like default is used.
    pub fn user_agent(mut self, ua: impl Into<String>) -> Self {
        self.user_agent = Some(ua.into());
        self
    }

    /// Set request timeout in seconds. Default 8.
    pub fn timeout_secs(mut self, secs: u64) -> Self {
        self.timeout_secs = secs;
        self
    }

    /// Encoding used when a page declares no charset. Default windows-1252.
    pub fn fallback_encoding(mut self, encoding: &'static Encoding) -> Self {
        self.fallback_encoding = encoding;
        self
    }

    pub fn build(self) -> Result<Client, reqwest::Error> {
        let user_agent = self
            .user_agent
            .unwrap_or_else(|| DEFAULT_USER_AGENT.to_string());
        let inner = reqwest::blocking::Client::builder()
            .cookie_store(true)
            .user_agent(user_agent)
            .timeout(Duration::from_secs(self.timeout_secs))
            .redirect(reqwest::redirect::Policy::limited(MAX_REDIRECTS))
            .build()?;
        Ok(Client {
            inner,
            fallback_encoding: self.fallback_encoding,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use encoding_rs::UTF_8;

    #[test]
    fn acknowledgement_param_appended_correctly() {
        assert_eq!(
            acknowledged_url("https://archiveofourown.org/works/999"),
            "https://archiveofourown.org/works/999?view_adult=true"
        );
        assert_eq!(
            acknowledged_url("http://siye.co.uk/viewstory.php?sid=1"),
            "http://siye.co.uk/viewstory.php?sid=1&view_adult=true"
        );
    }

    #[test]
    fn interstitial_detection_and_proceed_target() {
        let html = r#"<html><body>
<p class="message footnote">This work could have adult content.</p>
<ul class="actions"><li><a href="/works/999/chapters/1?view_adult=true">Proceed</a></li></ul>
</body></html>"#;
        let doc = Html::parse_document(html);
        assert!(is_interstitial(&doc));
        assert_eq!(
            interstitial_target(&doc).as_deref(),
            Some("https://archiveofourown.org/works/999/chapters/1?view_adult=true")
        );
    }

    #[test]
    fn regular_page_is_not_interstitial() {
        let doc = Html::parse_document("<html><body><h2 class=\"title heading\">T</h2></body></html>");
        assert!(!is_interstitial(&doc));
        assert!(interstitial_target(&doc).is_none());
    }

    #[test]
    fn header_charset_wins_over_fallback() {
        // "café" in ISO-8859-1
        let body = b"caf\xe9";
        let text = decode_body(body, Some("ISO-8859-1"), UTF_8);
        assert_eq!(text, "café");
    }

    #[test]
    fn meta_charset_used_when_header_is_silent() {
        let body = b"<html><head><meta charset=\"windows-1252\"></head><body>\x93quoted\x94</body></html>";
        let text = decode_body(body, None, UTF_8);
        assert!(text.contains("\u{201c}quoted\u{201d}"));
    }

    #[test]
    fn fallback_encoding_applies_without_declarations() {
        let body = b"na\xefve";
        let text = decode_body(body, None, WINDOWS_1252);
        assert_eq!(text, "naïve");
    }

    #[test]
    fn content_type_charset_parsing() {
        assert_eq!(
            charset_from_content_type("text/html; charset=ISO-8859-1").as_deref(),
            Some("ISO-8859-1")
        );
        assert_eq!(charset_from_content_type("text/html"), None);
    }

    #[test]
    fn content_type_charset_survives_malformed_parameters() {
        assert_eq!(
            charset_from_content_type("text/html; foo; charset=utf-8").as_deref(),
            Some("utf-8")
        );
        assert_eq!(
            charset_from_content_type("text/html; charset=\"utf-8\"; bar").as_deref(),
            Some("utf-8")
        );
        assert_eq!(charset_from_content_type("text/html; foo"), None);
    }
}
