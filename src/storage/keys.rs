//! Storage keys shared with the browser extension

/// Validated remote credential (`RemoteAuth`)
pub const REMOTE_AUTH: &str = "zyphRemoteAuth";
/// Last remote folder listing, kept for offline display
pub const REMOTE_FOLDERS: &str = "zyphRemoteFolders";
/// Folders of captured local content
pub const ZYPH_FOLDERS: &str = "zyphFolders";
/// Captured local content items
pub const ZYPH_CONTENT: &str = "zyphContent";
/// Pending remote writes
pub const REMOTE_SYNC_QUEUE: &str = "zyphRemoteSyncQueue";
/// Domains the conversation monitor may run on
pub const ENABLED_DOMAINS: &str = "enabledDomains";
/// Captured conversations keyed by id
pub const CONVERSATIONS: &str = "conversations";
/// Conversation summaries keyed by `<conversation id>@<domain>`
pub const SUMMARIES: &str = "summaries";
/// Conversation folders (legacy extension)
pub const FOLDERS: &str = "folders";
