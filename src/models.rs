//! Local domain types persisted by the storage manager
//!
//! These types mirror the records the extension keeps in its local
//! key-value store: captured conversations, their summaries, the local
//! folder tree and captured page content.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use ulid::Ulid;

/// Supported LLM chat platforms
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Platform {
    /// chatgpt.com / chat.openai.com
    Chatgpt,
    /// gemini.google.com
    Gemini,
    /// claude.ai
    Claude,
}

impl Platform {
    /// All supported platforms in detection order
    pub const ALL: [Platform; 3] = [Platform::Chatgpt, Platform::Gemini, Platform::Claude];

    /// Lowercase identifier used in storage and on the command line
    pub fn as_str(&self) -> &'static str {
        match self {
            Platform::Chatgpt => "chatgpt",
            Platform::Gemini => "gemini",
            Platform::Claude => "claude",
        }
    }
}

impl std::fmt::Display for Platform {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for Platform {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "chatgpt" | "openai" => Ok(Platform::Chatgpt),
            "gemini" => Ok(Platform::Gemini),
            "claude" => Ok(Platform::Claude),
            other => Err(format!(
                "unknown platform '{}'; expected chatgpt, gemini or claude",
                other
            )),
        }
    }
}

/// Author of a conversation turn
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    /// Text typed by the user
    User,
    /// Text produced by the model
    Assistant,
}

impl std::fmt::Display for Role {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Role::User => f.write_str("user"),
            Role::Assistant => f.write_str("assistant"),
        }
    }
}

/// A single stored conversation turn
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Message {
    /// Who wrote the turn
    pub role: Role,
    /// Plain text with fenced code blocks appended
    pub content: String,
    /// When the turn was first observed
    pub timestamp: DateTime<Utc>,
}

/// A captured conversation with an LLM platform
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Conversation {
    /// Unique identifier (ULID)
    pub id: String,
    /// Platform the conversation was captured from
    pub platform: Platform,
    /// Page URL at capture time
    pub url: String,
    /// Turns in page order
    pub messages: Vec<Message>,
    /// When the conversation was first detected
    pub start_time: DateTime<Utc>,
    /// When a turn was last appended
    pub updated_at: DateTime<Utc>,
    /// Local folder assignment
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub folder_id: Option<String>,
}

impl Conversation {
    /// Start a new, empty conversation for the given platform and URL
    pub fn new(platform: Platform, url: impl Into<String>) -> Self {
        let now = Utc::now();
        Self {
            id: Ulid::new().to_string(),
            platform,
            url: url.into(),
            messages: Vec::new(),
            start_time: now,
            updated_at: now,
            folder_id: None,
        }
    }

    /// Host part of the conversation URL, used to key summaries
    pub fn domain(&self) -> String {
        url::Url::parse(&self.url)
            .ok()
            .and_then(|u| u.host_str().map(str::to_string))
            .unwrap_or_default()
    }
}

/// A local, user-organized folder
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Folder {
    /// Unique identifier (ULID)
    pub id: String,
    /// Display name
    pub name: String,
    /// CSS color used by the popup
    pub color: String,
    /// Emoji or icon name
    pub icon: String,
    /// Parent folder, `None` for top level
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub parent_id: Option<String>,
    /// Creation time
    pub created_at: DateTime<Utc>,
}

/// Input for creating or updating a local folder
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct FolderSpec {
    /// Display name
    pub name: String,
    /// Color, defaults to `#6366f1`
    pub color: Option<String>,
    /// Icon, defaults to a folder emoji
    pub icon: Option<String>,
    /// Parent folder id
    pub parent_id: Option<String>,
}

/// Default folder color
pub const DEFAULT_FOLDER_COLOR: &str = "#6366f1";
/// Default folder icon
pub const DEFAULT_FOLDER_ICON: &str = "📁";

impl Folder {
    /// Build a folder from a spec, filling defaults
    pub fn from_spec(spec: FolderSpec) -> Self {
        Self {
            id: Ulid::new().to_string(),
            name: spec.name.trim().to_string(),
            color: spec
                .color
                .unwrap_or_else(|| DEFAULT_FOLDER_COLOR.to_string()),
            icon: spec.icon.unwrap_or_else(|| DEFAULT_FOLDER_ICON.to_string()),
            parent_id: spec.parent_id,
            created_at: Utc::now(),
        }
    }
}

/// Derived summary of a finished conversation
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Summary {
    /// Conversation this summary was derived from
    pub conversation_id: String,
    /// Domain the conversation took place on
    pub domain: String,
    /// Summary text
    pub text: String,
    /// Number of turns summarized
    pub message_count: usize,
    /// When the summary was produced
    pub created_at: DateTime<Utc>,
}

impl Summary {
    /// Storage key combining conversation id and domain
    pub fn key(conversation_id: &str, domain: &str) -> String {
        format!("{}@{}", conversation_id, domain)
    }
}

/// Page content or selection captured locally
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LocalContentItem {
    /// Unique identifier (ULID)
    pub id: String,
    /// Title of the captured page
    pub title: String,
    /// Captured text
    pub content: String,
    /// Source page
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub source_url: Option<String>,
    /// Local folder assignment
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub folder_id: Option<String>,
    /// Remote knowledge item id once delivered
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub remote_id: Option<String>,
    /// Capture time
    pub created_at: DateTime<Utc>,
}

impl LocalContentItem {
    /// Create a new, unsynced item
    pub fn new(title: impl Into<String>, content: impl Into<String>) -> Self {
        Self {
            id: Ulid::new().to_string(),
            title: title.into(),
            content: content.into(),
            source_url: None,
            folder_id: None,
            remote_id: None,
            created_at: Utc::now(),
        }
    }

    /// Whether the item has been delivered to the backend
    pub fn is_synced(&self) -> bool {
        self.remote_id.is_some()
    }
}
