//! ficpreview: recognize fan-fiction links (FanFiction.net, Archive of Our
//! Own, SIYE), fetch and extract story metadata, and render preview cards;
//! plus a community-scoped curated collection of saved stories.

pub mod cli;
pub mod collection;
pub mod config;
pub mod guild;
pub mod links;
pub mod model;
pub mod scraper;

// Re-exports for CLI and consumers.
pub use collection::{
    Collection, CollectionEntry, CollectionError, CollectionStore, FileStore, ListPage, MemoryStore,
};
pub use guild::{Caller, ConfirmPrompt, GuildSettings};
pub use links::{extract_links, single_link, CanonicalUrl, PageKind, Site};
pub use model::{format_card, group_thousands, render_text, DisplayCard, StoryMetadata};
pub use scraper::{extract, preview, scan, Client, ClientBuilder, Extractor, Fetch, ScraperError};
