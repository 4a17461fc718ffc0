//! Zyph - content capture and sync for a personal knowledge base
//!
//! This library provides the capture side of the Zyph browser extension:
//! reading pages and LLM conversations, and delivering them to the
//! knowledge-base backend.
//!
//! # Architecture
//!
//! The library is organized into the following modules:
//!
//! - `page`: The document a content script sees, and HTML helpers
//! - `parsers`: ChatGPT, Gemini and Claude conversation parsers
//! - `capture`: Whole-page capture and restricted-page handling
//! - `monitor`: Conversation monitoring and summaries
//! - `api`: Backend client, session, folder cache and wire types
//! - `sync`: Persisted retry queue for failed remote writes
//! - `storage`: Key-value storage backends and the storage manager
//! - `bus`: Action/response messaging between extension contexts
//! - `config`: Configuration management and validation
//! - `error`: Error types and result aliases
//! - `cli` and `commands`: Command-line interface
//!
//! # Example
//!
//! ```no_run
//! use std::sync::Arc;
//! use zyph::api::{ApiClient, Session};
//! use zyph::storage::{MemoryStore, StorageManager};
//! use zyph::Config;
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     let config = Config::default();
//!     config.validate()?;
//!
//!     let storage = StorageManager::new(Arc::new(MemoryStore::new()));
//!     let client = ApiClient::new(&config.api, Session::new(storage))?;
//!     let folders = client.fetch_folders(false).await?;
//!     println!("{} folders", folders.len());
//!     Ok(())
//! }
//! ```

pub mod api;
pub mod bus;
pub mod capture;
pub mod cli;
pub mod commands;
pub mod config;
pub mod error;
pub mod models;
pub mod monitor;
pub mod page;
pub mod parsers;
pub mod storage;
pub mod sync;

// Re-export commonly used types
pub use api::{ApiClient, Session};
pub use capture::{capture_page, PageContent};
pub use config::Config;
pub use error::{ApiError, ApiErrorCode, ApiResult, Result, ZyphError};
pub use models::{Conversation, Message, Platform, Role};
pub use parsers::{detect_platform, parser_for, PlatformParser};
pub use storage::StorageManager;
pub use sync::{SyncQueue, SyncReport};
