//! Command-line interface definition for Zyph
//!
//! This module defines the CLI structure using clap's derive API,
//! providing commands for authentication, remote folders and content,
//! page capture, the sync queue and local data.

use clap::{Parser, Subcommand};
use std::path::PathBuf;

/// Zyph - capture pages and LLM conversations into your knowledge base
#[derive(Parser, Debug, Clone)]
#[command(name = "zyph")]
#[command(version, about, long_about = None)]
pub struct Cli {
    /// Path to configuration file
    #[arg(short, long, default_value = "config/config.yaml")]
    pub config: Option<String>,

    /// Enable verbose logging
    #[arg(short, long)]
    pub verbose: bool,

    /// Emit logs as JSON
    #[arg(long)]
    pub json_logs: bool,

    /// Override the backend base URL
    #[arg(long)]
    pub api_url: Option<String>,

    /// Override the local database path
    #[arg(long)]
    pub store_path: Option<String>,

    /// Keep local data in memory only
    #[arg(long)]
    pub memory: bool,

    /// Command to execute
    #[command(subcommand)]
    pub command: Commands,
}

/// Available commands for Zyph
#[derive(Subcommand, Debug, Clone)]
pub enum Commands {
    /// Validate and store an API key
    Auth {
        /// API key (prompted for when omitted)
        #[arg(short, long, env = "ZYPH_API_KEY", hide_env_values = true)]
        key: Option<String>,

        /// User id the key belongs to
        #[arg(short, long)]
        user_id: Option<String>,
    },

    /// Forget the stored API key
    Logout,

    /// Manage remote folders
    Folders {
        #[command(subcommand)]
        command: FolderCommand,
    },

    /// Capture a saved HTML page
    Capture {
        /// HTML file to capture
        html: PathBuf,

        /// URL the page was loaded from
        #[arg(long)]
        url: String,

        /// Text to treat as the current selection
        #[arg(long)]
        selection: Option<String>,

        /// Keep the capture in local content storage
        #[arg(long)]
        save: bool,

        /// Send the capture to this remote folder
        #[arg(long)]
        folder: Option<String>,

        /// Print the capture as JSON
        #[arg(long)]
        json: bool,
    },

    /// Extract conversation turns from a saved chat page
    Parse {
        /// HTML file of a ChatGPT, Gemini or Claude conversation
        html: PathBuf,

        /// URL the page was loaded from
        #[arg(long)]
        url: String,

        /// Inject this text into the prompt field and print the result
        #[arg(long)]
        inject: Option<String>,

        /// Store the conversation locally
        #[arg(long)]
        save: bool,

        /// Print the messages as JSON
        #[arg(long)]
        json: bool,
    },

    /// Replay saved snapshots of a chat page through the conversation monitor
    Monitor {
        /// URL the snapshots were taken from
        #[arg(long)]
        url: String,

        /// HTML snapshots, oldest first
        #[arg(required = true)]
        snapshots: Vec<PathBuf>,
    },

    /// Send text content to a remote folder
    Ingest {
        /// Destination folder id
        #[arg(short, long)]
        folder: String,

        /// Item title
        #[arg(short, long)]
        title: String,

        /// Content text (read from --file when omitted)
        #[arg(long, conflicts_with = "file")]
        content: Option<String>,

        /// File to read content from
        #[arg(long)]
        file: Option<PathBuf>,

        /// Page the content came from
        #[arg(long)]
        source_url: Option<String>,

        /// Queue for retry instead of failing on transient errors
        #[arg(long)]
        queue: bool,
    },

    /// Upload a file to a remote folder
    Upload {
        /// File to upload
        path: PathBuf,

        /// Destination folder id
        #[arg(short, long)]
        folder: String,

        /// Item title (the file name when omitted)
        #[arg(short, long)]
        title: Option<String>,

        /// Item description
        #[arg(long)]
        description: Option<String>,

        /// MIME type of the file
        #[arg(long)]
        mime: Option<String>,
    },

    /// Search the knowledge base
    Search {
        /// Search text
        query: String,

        /// Restrict to one folder
        #[arg(short, long)]
        folder: Option<String>,

        /// Maximum results (1-50)
        #[arg(short, long, default_value_t = 5)]
        limit: u32,

        /// Minimum similarity (0.0-1.0)
        #[arg(long, default_value_t = 0.7)]
        threshold: f32,

        /// Print results as JSON
        #[arg(long)]
        json: bool,
    },

    /// Inspect and drive the sync retry queue
    Queue {
        #[command(subcommand)]
        command: QueueCommand,
    },

    /// Inspect local extension data
    Local {
        #[command(subcommand)]
        command: LocalCommand,
    },
}

/// Remote folder subcommands
#[derive(Subcommand, Debug, Clone)]
pub enum FolderCommand {
    /// List the folder tree
    List {
        /// Bypass the folder cache
        #[arg(long)]
        refresh: bool,

        /// Show the last listing stored locally without contacting the server
        #[arg(long, conflicts_with = "refresh")]
        offline: bool,

        /// Print as JSON
        #[arg(long)]
        json: bool,
    },

    /// Create a folder
    Create {
        /// Folder name
        name: String,

        /// Folder description
        #[arg(short, long)]
        description: Option<String>,

        /// Parent folder id
        #[arg(short, long)]
        parent: Option<String>,

        /// Queue for retry instead of failing on transient errors
        #[arg(long)]
        queue: bool,
    },

    /// Rename or move a folder
    Update {
        /// Folder id
        id: String,

        /// New folder name
        name: String,

        /// Folder description
        #[arg(short, long)]
        description: Option<String>,

        /// New parent folder id
        #[arg(short, long)]
        parent: Option<String>,
    },

    /// Delete a folder
    Delete {
        /// Folder id
        id: String,
    },

    /// List the items in a folder
    Content {
        /// Folder id
        id: String,

        /// Print as JSON
        #[arg(long)]
        json: bool,
    },
}

/// Sync queue subcommands
#[derive(Subcommand, Debug, Clone)]
pub enum QueueCommand {
    /// Show queued writes
    List {
        /// Print as JSON
        #[arg(long)]
        json: bool,
    },

    /// Attempt every due item once
    Process,

    /// Keep processing the queue on a timer until interrupted
    Watch {
        /// Seconds between passes (config value when omitted)
        #[arg(short, long)]
        interval: Option<u64>,
    },

    /// Make a parked or waiting item due now
    Retry {
        /// Queue item id
        id: String,
    },

    /// Remove an item without delivering it
    Discard {
        /// Queue item id
        id: String,
    },
}

/// Local data subcommands
#[derive(Subcommand, Debug, Clone)]
pub enum LocalCommand {
    /// List local conversation folders
    Folders,

    /// Create a local conversation folder
    CreateFolder {
        /// Folder name
        name: String,

        /// Parent folder id
        #[arg(short, long)]
        parent: Option<String>,

        /// CSS color
        #[arg(long)]
        color: Option<String>,

        /// Emoji or icon name
        #[arg(long)]
        icon: Option<String>,
    },

    /// Delete a local folder; its conversations are kept
    DeleteFolder {
        /// Folder id
        id: String,
    },

    /// Move a conversation into a folder (or out of all folders)
    Assign {
        /// Conversation id
        conversation: String,

        /// Folder id; omit to unassign
        folder: Option<String>,
    },

    /// List captured conversations
    Conversations {
        /// Print as JSON
        #[arg(long)]
        json: bool,
    },

    /// Allow conversation monitoring on a domain
    Enable {
        /// Domain, e.g. claude.ai
        domain: String,
    },

    /// Stop conversation monitoring on a domain
    Disable {
        /// Domain, e.g. claude.ai
        domain: String,
    },

    /// Delete every locally stored key
    Clear {
        /// Do not ask for confirmation
        #[arg(long)]
        yes: bool,
    },
}

impl Cli {
    /// Parse command line arguments
    pub fn parse_args() -> Self {
        Self::parse()
    }
}
