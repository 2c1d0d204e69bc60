//! Curated, community-scoped story collection.
//!
//! Each community owns one ordered, deduplicated sequence of saved stories,
//! addressed by 1-based index. The store exposes scoped-lock access so
//! check-dedup-then-append and pop-by-index are atomic per community.

use crate::guild::{Caller, GuildId, UserId};
use crate::model::group_thousands;
use rand::Rng;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::PathBuf;
use std::sync::Mutex;
use thiserror::Error;

/// One saved story reference.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CollectionEntry {
    pub title: String,
    pub author: String,
    pub link: String,
    pub submitter_id: UserId,
}

/// Collection-specific failures. Unlike pipeline failures these carry
/// specific, actionable user-facing messages.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum CollectionError {
    #[error("That story already exists in the collection. Duplicate stories will not be added.")]
    DuplicateEntry,

    #[error("No story found with that index number.")]
    IndexOutOfRange { index: usize },

    #[error("You can only remove stories you added.")]
    AuthorizationDenied,

    #[error("There are no stories to show, add some!")]
    Empty,

    #[error("Could not access the collection store: {0}")]
    Store(String),
}

/// Scoped-lock access to a community's ordered sequence. `mutate` holds the
/// community's lock for the whole closure, so compound operations never
/// interleave with each other for the same community.
pub trait CollectionStore {
    fn read<T>(
        &self,
        guild: GuildId,
        f: impl FnOnce(&[CollectionEntry]) -> T,
    ) -> Result<T, CollectionError>;

    fn mutate<T>(
        &self,
        guild: GuildId,
        f: impl FnOnce(&mut Vec<CollectionEntry>) -> T,
    ) -> Result<T, CollectionError>;
}

/// In-memory store, one map of guild id to sequence under a single lock.
#[derive(Debug, Default)]
pub struct MemoryStore {
    guilds: Mutex<HashMap<GuildId, Vec<CollectionEntry>>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

impl CollectionStore for MemoryStore {
    fn read<T>(
        &self,
        guild: GuildId,
        f: impl FnOnce(&[CollectionEntry]) -> T,
    ) -> Result<T, CollectionError> {
        let guilds = self
            .guilds
            .lock()
            .map_err(|_| CollectionError::Store("collection lock poisoned".to_string()))?;
        Ok(f(guilds.get(&guild).map(Vec::as_slice).unwrap_or(&[])))
    }

    fn mutate<T>(
        &self,
        guild: GuildId,
        f: impl FnOnce(&mut Vec<CollectionEntry>) -> T,
    ) -> Result<T, CollectionError> {
        let mut guilds = self
            .guilds
            .lock()
            .map_err(|_| CollectionError::Store("collection lock poisoned".to_string()))?;
        Ok(f(guilds.entry(guild).or_default()))
    }
}

/// JSON-file-backed store for the CLI: the whole guild map is read before
/// and written after each mutation, under a process-wide lock.
#[derive(Debug)]
pub struct FileStore {
    path: PathBuf,
    lock: Mutex<()>,
}

impl FileStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            lock: Mutex::new(()),
        }
    }

    fn load(&self) -> Result<HashMap<GuildId, Vec<CollectionEntry>>, CollectionError> {
        if !self.path.exists() {
            return Ok(HashMap::new());
        }
        let raw = std::fs::read_to_string(&self.path)
            .map_err(|e| CollectionError::Store(format!("read {}: {}", self.path.display(), e)))?;
        serde_json::from_str(&raw)
            .map_err(|e| CollectionError::Store(format!("parse {}: {}", self.path.display(), e)))
    }

    fn save(&self, guilds: &HashMap<GuildId, Vec<CollectionEntry>>) -> Result<(), CollectionError> {
        if let Some(parent) = self.path.parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent).map_err(|e| {
                    CollectionError::Store(format!("create {}: {}", parent.display(), e))
                })?;
            }
        }
        let raw = serde_json::to_string_pretty(guilds)
            .map_err(|e| CollectionError::Store(e.to_string()))?;
        std::fs::write(&self.path, raw)
            .map_err(|e| CollectionError::Store(format!("write {}: {}", self.path.display(), e)))
    }
}

impl CollectionStore for FileStore {
    fn read<T>(
        &self,
        guild: GuildId,
        f: impl FnOnce(&[CollectionEntry]) -> T,
    ) -> Result<T, CollectionError> {
        let _guard = self
            .lock
            .lock()
            .map_err(|_| CollectionError::Store("collection lock poisoned".to_string()))?;
        let guilds = self.load()?;
        Ok(f(guilds.get(&guild).map(Vec::as_slice).unwrap_or(&[])))
    }

    fn mutate<T>(
        &self,
        guild: GuildId,
        f: impl FnOnce(&mut Vec<CollectionEntry>) -> T,
    ) -> Result<T, CollectionError> {
        let _guard = self
            .lock
            .lock()
            .map_err(|_| CollectionError::Store("collection lock poisoned".to_string()))?;
        let mut guilds = self.load()?;
        let result = f(guilds.entry(guild).or_default());
        self.save(&guilds)?;
        Ok(result)
    }
}

/// One page of the numbered collection listing.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ListPage {
    pub heading: String,
    pub body: String,
    pub footer: String,
}

const ENTRIES_PER_PAGE: usize = 10;

/// The collection service: dedup, authorization, and index rules on top of
/// a [CollectionStore].
#[derive(Debug)]
pub struct Collection<S> {
    store: S,
}

impl<S: CollectionStore> Collection<S> {
    pub fn new(store: S) -> Self {
        Self { store }
    }

    /// Append an entry unless an equal title+author pair already exists.
    /// Returns the new entry's 1-based position.
    pub fn add(&self, guild: GuildId, entry: CollectionEntry) -> Result<usize, CollectionError> {
        self.store.mutate(guild, |stories| {
            let duplicate = stories
                .iter()
                .any(|s| s.title == entry.title && s.author == entry.author);
            if duplicate {
                return Err(CollectionError::DuplicateEntry);
            }
            stories.push(entry);
            Ok(stories.len())
        })?
    }

    /// Look up an entry by 1-based index.
    pub fn get(&self, guild: GuildId, index: usize) -> Result<CollectionEntry, CollectionError> {
        self.store.read(guild, |stories| {
            index
                .checked_sub(1)
                .and_then(|i| stories.get(i))
                .cloned()
                .ok_or(CollectionError::IndexOutOfRange { index })
        })?
    }

    /// Remove an entry by 1-based index. Only the original submitter, a
    /// privileged role, or an administrator may remove; on any failure the
    /// sequence is left unmutated.
    pub fn remove(
        &self,
        guild: GuildId,
        index: usize,
        caller: &Caller,
    ) -> Result<CollectionEntry, CollectionError> {
        self.store.mutate(guild, |stories| {
            let i = index
                .checked_sub(1)
                .filter(|i| *i < stories.len())
                .ok_or(CollectionError::IndexOutOfRange { index })?;
            if !caller.can_remove(stories[i].submitter_id) {
                return Err(CollectionError::AuthorizationDenied);
            }
            Ok(stories.remove(i))
        })?
    }

    /// Pick a uniformly random entry; returns its 1-based position too.
    pub fn random(&self, guild: GuildId) -> Result<(usize, CollectionEntry), CollectionError> {
        self.store.read(guild, |stories| {
            if stories.is_empty() {
                return Err(CollectionError::Empty);
            }
            let i = rand::thread_rng().gen_range(0..stories.len());
            Ok((i + 1, stories[i].clone()))
        })?
    }

    pub fn list(&self, guild: GuildId) -> Result<Vec<CollectionEntry>, CollectionError> {
        self.store.read(guild, |stories| stories.to_vec())
    }

    pub fn len(&self, guild: GuildId) -> Result<usize, CollectionError> {
        self.store.read(guild, |stories| stories.len())
    }

    pub fn is_empty(&self, guild: GuildId) -> Result<bool, CollectionError> {
        self.store.read(guild, |stories| stories.is_empty())
    }

    /// Drop the whole sequence. Callers gate this behind a
    /// [ConfirmPrompt](crate::guild::ConfirmPrompt).
    pub fn clear(&self, guild: GuildId) -> Result<(), CollectionError> {
        self.store.mutate(guild, |stories| stories.clear())
    }

    /// Render the numbered listing in pages of ten, with a
    /// `Page x of y • Total stories: z` footer. [CollectionError::Empty]
    /// when there is nothing to show.
    pub fn list_pages(
        &self,
        guild: GuildId,
        community_name: &str,
    ) -> Result<Vec<ListPage>, CollectionError> {
        let stories = self.list(guild)?;
        if stories.is_empty() {
            return Err(CollectionError::Empty);
        }
        let total_pages = stories.len().div_ceil(ENTRIES_PER_PAGE);
        let heading = format!("{}'s Story Collection", community_name);
        let pages = stories
            .chunks(ENTRIES_PER_PAGE)
            .enumerate()
            .map(|(page_idx, chunk)| {
                let body = chunk
                    .iter()
                    .enumerate()
                    .map(|(i, story)| {
                        let n = page_idx * ENTRIES_PER_PAGE + i + 1;
                        format!("**{}** [{}]({}) by {}", n, story.title, story.link, story.author)
                    })
                    .collect::<Vec<_>>()
                    .join("\n");
                ListPage {
                    heading: heading.clone(),
                    body,
                    footer: format!(
                        "Page {} of {} • Total stories: {}",
                        group_thousands(page_idx as u64 + 1),
                        group_thousands(total_pages as u64),
                        group_thousands(stories.len() as u64)
                    ),
                }
            })
            .collect();
        Ok(pages)
    }
}
