//! Link recognition and canonicalization for the three supported archives.
//!
//! Scans free-form text for FanFiction.net, Archive of Our Own, and SIYE
//! links and normalizes each match (mobile subdomain stripped, SIYE forced
//! to http, FanFiction story links rewritten to chapter 1).

use crate::scraper::ScraperError;
use once_cell::sync::Lazy;
use regex::Regex;
use std::fmt;

/// Supported archive. Site identity is mutually exclusive by construction
/// of the grammars below, so extractor dispatch is unambiguous.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Site {
    FanFiction,
    ArchiveOfOurOwn,
    Siye,
}

/// Page shape within a site. Only FanFiction serves author-profile pages.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PageKind {
    Story,
    AuthorProfile,
}

/// A recognized, normalized link to one of the supported story or profile
/// pages. Every `CanonicalUrl` can be fetched and handed to the extractor
/// matching its [`Site`] without further inspection.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CanonicalUrl {
    url: String,
    site: Site,
    kind: PageKind,
}

impl CanonicalUrl {
    pub fn as_str(&self) -> &str {
        &self.url
    }

    pub fn site(&self) -> Site {
        self.site
    }

    pub fn kind(&self) -> PageKind {
        self.kind
    }

    pub fn into_string(self) -> String {
        self.url
    }
}

impl fmt::Display for CanonicalUrl {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.url)
    }
}

// One alternation so multi-site messages keep first-occurrence order.
// Hosts are anchored to the literal domain tokens right after the scheme,
// so near-miss hosts (notfanfiction.net, fanfiction.net.evil.com) never match.
static LINK_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(
        r"(?x)
        https?://(?:www\.)?
        (?:
            (?:m\.)?fanfiction\.net/
            (?:
                s/\d+(?:/\d+)?(?:/[A-Za-z0-9$\-_@.&+!*(),]*)?
              | u/\d+(?:/[A-Za-z0-9$\-_@.&+!*(),]*)?
              | ~[A-Za-z0-9\-_]+
            )
          | archiveofourown\.org/works/\d+(?:/chapters/\d+)?
          | siye\.co\.uk/(?:siye/)?viewstory\.php\?sid=\d+(?:&chapter=\d+)?
        )",
    )
    .expect("link pattern is valid")
});

// Story id capture for the chapter-1 rewrite.
static FFN_STORY_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^(https?://(?:www\.)?fanfiction\.net)/s/(\d+)").expect("story pattern is valid")
});

static FFN_PROFILE_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^https?://(?:www\.)?fanfiction\.net/(?:u/\d+|~)").expect("profile pattern is valid")
});

// Mobile host marker, with or without a www. prefix in front of it.
static MOBILE_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^(https?://)(?:www\.)?m\.").expect("mobile pattern is valid"));

/// Scan text for supported links, in first-occurrence order. Unrelated URLs
/// and non-URL text yield an empty sequence; this is not an error.
pub fn extract_links(text: &str) -> Vec<CanonicalUrl> {
    LINK_RE
        .find_iter(text)
        .filter_map(|m| canonicalize(m.as_str()))
        .collect()
}

/// Require exactly one recognized link in the given argument (the explicit
/// single-URL command paths). Anything else is an invalid link.
pub fn single_link(arg: &str) -> Result<CanonicalUrl, ScraperError> {
    let mut links = extract_links(arg);
    if links.len() == 1 {
        Ok(links.remove(0))
    } else {
        Err(ScraperError::InvalidLink {
            input: arg.to_string(),
        })
    }
}

/// Normalize one matched link. Returns None only if the match does not fit
/// any grammar after normalization (cannot happen for LINK_RE matches, but
/// keeps the function total for re-canonicalization of stored links).
fn canonicalize(raw: &str) -> Option<CanonicalUrl> {
    // (a) strip the mobile subdomain marker
    let mut url = MOBILE_RE.replace(raw, "$1").into_owned();

    if url.contains("fanfiction.net") {
        if FFN_PROFILE_RE.is_match(&url) {
            return Some(CanonicalUrl {
                url,
                site: Site::FanFiction,
                kind: PageKind::AuthorProfile,
            });
        }
        // (c) story links always point at chapter 1, slug dropped
        let caps = FFN_STORY_RE.captures(&url)?;
        let canonical = format!("{}/s/{}/1", &caps[1], &caps[2]);
        return Some(CanonicalUrl {
            url: canonical,
            site: Site::FanFiction,
            kind: PageKind::Story,
        });
    }

    if url.contains("archiveofourown.org") {
        return Some(CanonicalUrl {
            url,
            site: Site::ArchiveOfOurOwn,
            kind: PageKind::Story,
        });
    }

    if url.contains("siye.co.uk") {
        // (b) SIYE serves an invalid certificate; downgrade is deliberate
        if let Some(rest) = url.strip_prefix("https://") {
            url = format!("http://{}", rest);
        }
        return Some(CanonicalUrl {
            url,
            site: Site::Siye,
            kind: PageKind::Story,
        });
    }

    None
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn story_link_normalizes_to_chapter_one() {
        let links = extract_links("read https://www.fanfiction.net/s/12345/7/Some-Title-Slug ok");
        assert_eq!(links.len(), 1);
        assert_eq!(links[0].as_str(), "https://www.fanfiction.net/s/12345/1");
        assert_eq!(links[0].site(), Site::FanFiction);
        assert_eq!(links[0].kind(), PageKind::Story);
    }

    #[test]
    fn story_link_without_chapter_gets_chapter_one() {
        let links = extract_links("http://fanfiction.net/s/555");
        assert_eq!(links.len(), 1);
        assert_eq!(links[0].as_str(), "http://fanfiction.net/s/555/1");
    }

    #[test]
    fn mobile_subdomain_is_stripped() {
        let links = extract_links("https://m.fanfiction.net/s/99/3/slug");
        assert_eq!(links.len(), 1);
        assert_eq!(links[0].as_str(), "https://fanfiction.net/s/99/1");
    }

    #[test]
    fn www_mobile_host_is_also_stripped() {
        let links = extract_links("https://www.m.fanfiction.net/s/99/3/slug");
        assert_eq!(links.len(), 1);
        assert_eq!(links[0].as_str(), "https://fanfiction.net/s/99/1");

        let profile = extract_links("https://www.m.fanfiction.net/u/446654/author-name");
        assert_eq!(profile.len(), 1);
        assert_eq!(
            profile[0].as_str(),
            "https://fanfiction.net/u/446654/author-name"
        );
    }

    #[test]
    fn profile_links_are_not_rewritten() {
        let links = extract_links("https://www.fanfiction.net/u/446654/author-name");
        assert_eq!(links.len(), 1);
        assert_eq!(links[0].kind(), PageKind::AuthorProfile);
        assert_eq!(
            links[0].as_str(),
            "https://www.fanfiction.net/u/446654/author-name"
        );

        let tilde = extract_links("https://www.fanfiction.net/~somehandle");
        assert_eq!(tilde.len(), 1);
        assert_eq!(tilde[0].kind(), PageKind::AuthorProfile);
    }

    #[test]
    fn ao3_work_and_chapter_links() {
        let links = extract_links(
            "https://archiveofourown.org/works/999 and \
             https://archiveofourown.org/works/999/chapters/1234",
        );
        assert_eq!(links.len(), 2);
        assert_eq!(links[0].site(), Site::ArchiveOfOurOwn);
        assert_eq!(links[1].as_str(), "https://archiveofourown.org/works/999/chapters/1234");
    }

    #[test]
    fn siye_https_downgrades_to_http() {
        let links = extract_links("https://www.siye.co.uk/siye/viewstory.php?sid=130&chapter=2");
        assert_eq!(links.len(), 1);
        assert_eq!(
            links[0].as_str(),
            "http://www.siye.co.uk/siye/viewstory.php?sid=130&chapter=2"
        );
        assert_eq!(links[0].site(), Site::Siye);
    }

    #[test]
    fn classifier_is_idempotent() {
        let first = extract_links("https://www.fanfiction.net/s/12345/7/Some-Title");
        let again = extract_links(first[0].as_str());
        assert_eq!(again.len(), 1);
        assert_eq!(again[0], first[0]);

        let siye = extract_links("https://siye.co.uk/viewstory.php?sid=1");
        let siye_again = extract_links(siye[0].as_str());
        assert_eq!(siye_again[0], siye[0]);
    }

    #[test]
    fn near_miss_hosts_do_not_match() {
        assert!(extract_links("http://notfanfiction.net/s/1").is_empty());
        assert!(extract_links("http://fanfiction.net.evil.com/s/1").is_empty());
        assert!(extract_links("https://archiveofourown.org.example.com/works/1").is_empty());
        assert!(extract_links("just some text, no links").is_empty());
        assert!(extract_links("https://example.com/works/123").is_empty());
    }

    #[test]
    fn multi_link_message_preserves_order() {
        let links = extract_links(
            "check this out http://fanfiction.net/s/555/3/My-Story \
             and also http://archiveofourown.org/works/999",
        );
        assert_eq!(links.len(), 2);
        assert_eq!(links[0].as_str(), "http://fanfiction.net/s/555/1");
        assert_eq!(links[1].as_str(), "http://archiveofourown.org/works/999");
    }

    #[test]
    fn single_link_accepts_one_and_rejects_none_or_many() {
        assert!(single_link("https://archiveofourown.org/works/42").is_ok());
        assert!(matches!(
            single_link("no link here"),
            Err(ScraperError::InvalidLink { .. })
        ));
        assert!(matches!(
            single_link("http://fanfiction.net/s/1 http://fanfiction.net/s/2"),
            Err(ScraperError::InvalidLink { .. })
        ));
    }
}
