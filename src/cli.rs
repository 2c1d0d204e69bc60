//! CLI parsing and orchestration. Parses args, runs the preview pipeline or
//! the local collection commands, and maps errors to exit codes.

use crate::collection::{Collection, CollectionEntry, CollectionError, FileStore};
use crate::config::{self, Config};
use crate::guild::{Caller, ConfirmPrompt, GuildId, UserId, CONFIRM_TIMEOUT};
use crate::links::{self, PageKind};
use crate::model::{format_card, group_thousands, render_text};
use crate::scraper::{preview, scan, Client, ScraperError};
use clap::{Parser, Subcommand};
use encoding_rs::Encoding;
use std::io::BufRead;
use std::path::PathBuf;
use std::sync::mpsc;
use std::time::Instant;
use thiserror::Error;

/// The CLI acts as one local community with a single administrator user.
const LOCAL_GUILD: GuildId = 0;
const LOCAL_USER: UserId = 0;
const LOCAL_COMMUNITY_NAME: &str = "Local";

/// CLI error carrying exit code and message.
#[derive(Debug, Error)]
pub enum CliRunError {
    #[error("{0}")]
    InvalidInput(String),

    #[error("{0}")]
    Scraper(#[from] ScraperError),

    #[error("Could not build HTTP client: {0}")]
    Http(reqwest::Error),

    #[error("{0}")]
    Collection(#[from] CollectionError),
}

impl CliRunError {
    pub fn exit_code(&self) -> i32 {
        match self {
            CliRunError::InvalidInput(_) => 1,
            CliRunError::Scraper(_) | CliRunError::Http(_) => 2,
            CliRunError::Collection(_) => 3,
        }
    }
}

#[derive(Parser, Debug)]
#[command(name = "ficpreview")]
#[command(about = "Preview fan-fiction story metadata and curate a story collection")]
#[command(
    after_help = "Config file keys (user_agent, timeout_secs, fallback_charset, collection_path) are read from ./ficpreview.toml or the XDG config directory. CLI flags override config."
)]
pub struct Args {
    #[command(subcommand)]
    pub command: Command,

    /// HTTP User-Agent (overrides config).
    #[arg(long)]
    pub user_agent: Option<String>,

    /// Request timeout in seconds (overrides config; default 8).
    #[arg(long)]
    pub timeout: Option<u64>,

    /// Charset used when a page declares none (overrides config; default windows-1252).
    #[arg(long)]
    pub fallback_charset: Option<String>,

    /// Path of the JSON collection file (overrides config).
    #[arg(long)]
    pub collection: Option<PathBuf>,

    /// Print verbose error chain.
    #[arg(long)]
    pub verbose: bool,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Print the canonical form of every recognized link in the text.
    Links { text: Vec<String> },

    /// Fetch one story or profile link and print its preview card.
    Preview { url: String },

    /// Scan text for links and print a card (or failure notice) per link.
    Scan { text: Vec<String> },

    /// Manage the local curated collection.
    #[command(subcommand)]
    Collection(CollectionCmd),
}

#[derive(Subcommand, Debug)]
pub enum CollectionCmd {
    /// Fetch a story link and save it to the collection.
    Add { url: String },
    /// Print the numbered collection listing.
    List,
    /// Fetch and show the story at the given 1-based index.
    Show { index: usize },
    /// Remove the story at the given 1-based index.
    Remove { index: usize },
    /// Fetch and show a random story.
    Random,
    /// Remove all stories (asks for confirmation unless --yes).
    Clear {
        #[arg(long)]
        yes: bool,
    },
}

pub fn run(args: &Args) -> Result<(), CliRunError> {
    let config = config::load_config()
        .map_err(CliRunError::InvalidInput)?
        .unwrap_or_default();

    match &args.command {
        Command::Links { text } => {
            for link in links::extract_links(&text.join(" ")) {
                println!("{}", link);
            }
            Ok(())
        }
        Command::Preview { url } => {
            let link = links::single_link(url)?;
            let client = build_client(args, &config)?;
            let meta = preview(&client, &link)?;
            print!("{}", render_text(&format_card(&meta)));
            Ok(())
        }
        Command::Scan { text } => {
            let client = build_client(args, &config)?;
            for (link, result) in scan(&client, &text.join(" ")) {
                match result {
                    Ok(card) => print!("{}", render_text(&card)),
                    Err(e) => println!("{} <{}>", e.user_notice(), link),
                }
                println!();
            }
            Ok(())
        }
        Command::Collection(cmd) => run_collection(cmd, args, &config),
    }
}

fn run_collection(cmd: &CollectionCmd, args: &Args, config: &Config) -> Result<(), CliRunError> {
    let store = FileStore::new(collection_path(args, config));
    let collection = Collection::new(store);

    match cmd {
        CollectionCmd::Add { url } => {
            let link = links::single_link(url)?;
            if link.kind() == PageKind::AuthorProfile {
                return Err(CliRunError::InvalidInput(
                    "Invalid link. No story added.".to_string(),
                ));
            }
            let client = build_client(args, config)?;
            let meta = preview(&client, &link)?;
            let (title, story_link) = match (&meta.title, &meta.link) {
                (Some(t), Some(l)) => (t.clone(), l.clone()),
                _ => {
                    return Err(CliRunError::InvalidInput(
                        "Invalid link. No story added.".to_string(),
                    ))
                }
            };
            let position = collection.add(
                LOCAL_GUILD,
                CollectionEntry {
                    title: title.clone(),
                    author: meta.author.clone(),
                    link: story_link,
                    submitter_id: LOCAL_USER,
                },
            )?;
            println!(
                "**{}** by **{}** has been added to the collection as story #{}.",
                title,
                meta.author,
                group_thousands(position as u64)
            );
            print!("{}", render_text(&format_card(&meta)));
            Ok(())
        }
        CollectionCmd::List => {
            for page in collection.list_pages(LOCAL_GUILD, LOCAL_COMMUNITY_NAME)? {
                println!("{}", page.heading);
                println!("{}", page.body);
                println!("{}", page.footer);
                println!();
            }
            Ok(())
        }
        CollectionCmd::Show { index } => {
            let entry = collection.get(LOCAL_GUILD, *index)?;
            show_entry(args, config, *index, &entry)
        }
        CollectionCmd::Remove { index } => {
            let caller = Caller {
                user_id: LOCAL_USER,
                is_privileged: false,
                is_admin: true,
            };
            let removed = collection.remove(LOCAL_GUILD, *index, &caller)?;
            println!(
                "**{}** by **{}** (story #{}) has been removed.",
                removed.title,
                removed.author,
                group_thousands(*index as u64)
            );
            Ok(())
        }
        CollectionCmd::Random => {
            let (index, entry) = collection.random(LOCAL_GUILD)?;
            show_entry(args, config, index, &entry)
        }
        CollectionCmd::Clear { yes } => {
            if !yes && !confirm_clear() {
                println!("No confirmation received. No changes were made.");
                return Ok(());
            }
            collection.clear(LOCAL_GUILD)?;
            println!("All the stories have been removed.");
            Ok(())
        }
    }
}

fn show_entry(
    args: &Args,
    config: &Config,
    index: usize,
    entry: &CollectionEntry,
) -> Result<(), CliRunError> {
    let link = links::single_link(&entry.link)?;
    let client = build_client(args, config)?;
    let meta = preview(&client, &link)?;
    println!("Showing story #{}.", group_thousands(index as u64));
    print!("{}", render_text(&format_card(&meta)));
    Ok(())
}

/// Ask for an explicit "yes" on stdin. The read happens on a helper thread
/// so the wait itself is bounded by the confirmation timeout, not just the
/// acceptance check.
fn confirm_clear() -> bool {
    println!(
        "Are you sure you want to remove all the stories in the collection? \
         Type 'yes' to proceed."
    );
    let (tx, rx) = mpsc::channel();
    std::thread::spawn(move || {
        let mut reply = String::new();
        if std::io::stdin().lock().read_line(&mut reply).is_ok() {
            let _ = tx.send(reply);
        }
    });
    await_confirmation(&ConfirmPrompt::new(LOCAL_USER, Instant::now()), &rx)
}

/// Wait at most the confirmation timeout for a reply. No reply (or a
/// closed channel) means no.
fn await_confirmation(prompt: &ConfirmPrompt, replies: &mpsc::Receiver<String>) -> bool {
    match replies.recv_timeout(CONFIRM_TIMEOUT) {
        Ok(reply) => prompt.accepts(LOCAL_USER, &reply, Instant::now()),
        Err(_) => false,
    }
}

fn collection_path(args: &Args, config: &Config) -> PathBuf {
    args.collection
        .clone()
        .or_else(|| config.collection_path.clone())
        .or_else(|| dirs::data_dir().map(|d| d.join("ficpreview").join("collection.json")))
        .unwrap_or_else(|| PathBuf::from("ficpreview-collection.json"))
}

fn build_client(args: &Args, config: &Config) -> Result<Client, CliRunError> {
    let mut builder = Client::builder();
    if let Some(ua) = args.user_agent.clone().or_else(|| config.user_agent.clone()) {
        builder = builder.user_agent(ua);
    }
    if let Some(secs) = args.timeout.or(config.timeout_secs) {
        builder = builder.timeout_secs(secs);
    }
    if let Some(label) = args
        .fallback_charset
        .as_deref()
        .or(config.fallback_charset.as_deref())
    {
        let encoding = Encoding::for_label(label.as_bytes()).ok_or_else(|| {
            CliRunError::InvalidInput(format!("Unknown fallback charset: {}", label))
        })?;
        builder = builder.fallback_encoding(encoding);
    }
    builder.build().map_err(CliRunError::Http)
}
