//! Wire types for the knowledge-base backend
//!
//! Request types carry a `validate` method that the client runs before any
//! request is sent; a failure is reported as `BAD_PAYLOAD` without touching
//! the network.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::error::{ApiError, ApiResult};

/// Maximum folder name length accepted by the backend
pub const MAX_FOLDER_NAME_LEN: usize = 255;

/// Maximum upload size (50 MiB)
pub const MAX_UPLOAD_BYTES: usize = 50 * 1024 * 1024;

/// Maximum number of search results per request
pub const MAX_SEARCH_LIMIT: u32 = 50;

/// The single validated credential
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RemoteAuth {
    pub api_key: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub user_id: Option<String>,
    pub validated_at: DateTime<Utc>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub key_name: Option<String>,
}

impl RemoteAuth {
    /// API key with all but the prefix and last four characters masked
    pub fn masked_key(&self) -> String {
        let chars: Vec<char> = self.api_key.chars().collect();
        if chars.len() <= 9 {
            return "*".repeat(chars.len());
        }
        let head: String = chars[..5].iter().collect();
        let tail: String = chars[chars.len() - 4..].iter().collect();
        format!("{}...{}", head, tail)
    }
}

/// Owner of a validated key
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RemoteUser {
    pub id: String,
    #[serde(default)]
    pub email: Option<String>,
    #[serde(default)]
    pub full_name: Option<String>,
}

/// Body of `POST /auth/validate-api-key`
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ValidateKeyResponse {
    #[serde(default)]
    pub valid: bool,
    #[serde(default)]
    pub user_id: Option<String>,
    #[serde(default)]
    pub user: Option<RemoteUser>,
    #[serde(default)]
    pub key_name: Option<String>,
}

/// A folder in the backend hierarchy
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RemoteFolder {
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub user_id: Option<String>,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub parent_id: Option<String>,
    /// Materialized path, e.g. `/Research/Rust`
    #[serde(default)]
    pub path: Option<String>,
    #[serde(default)]
    pub depth: u32,
    #[serde(default)]
    pub created_at: Option<String>,
    #[serde(default)]
    pub updated_at: Option<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub children: Vec<RemoteFolder>,
}

impl RemoteFolder {
    /// This folder and all descendants, depth first
    pub fn flatten(&self) -> Vec<&RemoteFolder> {
        let mut out = vec![self];
        for child in &self.children {
            out.extend(child.flatten());
        }
        out
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
pub(crate) struct FoldersResponse {
    #[serde(default)]
    pub folders: Vec<RemoteFolder>,
}

/// Body of `POST /folders` and `PUT /folders/:id`
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct FolderRequest {
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub parent_id: Option<String>,
}

impl FolderRequest {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ..Default::default()
        }
    }

    /// Check the payload and trim the name
    pub fn validate(&mut self) -> ApiResult<()> {
        let name = self.name.trim();
        if name.is_empty() {
            return Err(ApiError::bad_payload("Folder name is required"));
        }
        if name.chars().count() > MAX_FOLDER_NAME_LEN {
            return Err(ApiError::bad_payload(format!(
                "Folder name exceeds {} characters",
                MAX_FOLDER_NAME_LEN
            )));
        }
        self.name = name.to_string();
        if matches!(self.parent_id.as_deref(), Some(p) if p.trim().is_empty()) {
            self.parent_id = None;
        }
        Ok(())
    }
}

/// Acknowledgement returned by delete endpoints
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DeleteResponse {
    #[serde(default)]
    pub success: bool,
    #[serde(default)]
    pub message: Option<String>,
    #[serde(default)]
    pub deleted_id: Option<String>,
}

/// Kind of a knowledge item
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ContentType {
    #[default]
    Text,
    Pdf,
    Doc,
    Docx,
    Html,
    Image,
    Document,
    Spreadsheet,
    Presentation,
    Audio,
    Video,
    File,
}

impl ContentType {
    pub fn as_str(&self) -> &'static str {
        match self {
            ContentType::Text => "text",
            ContentType::Pdf => "pdf",
            ContentType::Doc => "doc",
            ContentType::Docx => "docx",
            ContentType::Html => "html",
            ContentType::Image => "image",
            ContentType::Document => "document",
            ContentType::Spreadsheet => "spreadsheet",
            ContentType::Presentation => "presentation",
            ContentType::Audio => "audio",
            ContentType::Video => "video",
            ContentType::File => "file",
        }
    }
}

impl std::fmt::Display for ContentType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for ContentType {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        serde_json::from_value(Value::String(s.trim().to_ascii_lowercase()))
            .map_err(|_| format!("unknown content type '{}'", s))
    }
}

/// A stored knowledge item
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct KnowledgeItem {
    pub id: String,
    #[serde(default)]
    pub folder_id: Option<String>,
    #[serde(default)]
    pub title: String,
    #[serde(default)]
    pub content: Option<String>,
    #[serde(default)]
    pub content_type: ContentType,
    #[serde(default)]
    pub source_url: Option<String>,
    #[serde(default)]
    pub metadata: Option<Value>,
    #[serde(default)]
    pub processing_status: Option<String>,
    /// Short excerpt returned by search
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub preview: Option<String>,
    #[serde(default)]
    pub created_at: Option<String>,
    #[serde(default)]
    pub updated_at: Option<String>,
}

/// Response of `POST /content` and `POST /files/upload`
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ItemResponse {
    #[serde(default)]
    pub success: bool,
    pub item: KnowledgeItem,
    #[serde(default)]
    pub processing_status: Option<String>,
    #[serde(default)]
    pub storage_info: Option<Value>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct FolderRef {
    pub id: String,
    #[serde(default)]
    pub name: String,
}

/// Response of `GET /folders/:id/content`
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct FolderContent {
    pub folder: FolderRef,
    #[serde(default)]
    pub items: Vec<KnowledgeItem>,
}

/// Body of `POST /content`
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct IngestRequest {
    pub title: String,
    pub content: String,
    #[serde(default)]
    pub content_type: ContentType,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub source_url: Option<String>,
    pub folder_id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub metadata: Option<Value>,
}

impl IngestRequest {
    pub fn new(
        title: impl Into<String>,
        content: impl Into<String>,
        folder_id: impl Into<String>,
    ) -> Self {
        Self {
            title: title.into(),
            content: content.into(),
            folder_id: folder_id.into(),
            ..Default::default()
        }
    }

    pub fn with_source_url(mut self, url: impl Into<String>) -> Self {
        self.source_url = Some(url.into());
        self
    }

    pub fn with_metadata(mut self, metadata: Value) -> Self {
        self.metadata = Some(metadata);
        self
    }

    pub fn validate(&self) -> ApiResult<()> {
        if self.title.trim().is_empty() {
            return Err(ApiError::bad_payload("Title is required"));
        }
        if self.content.trim().is_empty() {
            return Err(ApiError::bad_payload("Content is required"));
        }
        if self.folder_id.trim().is_empty() {
            return Err(ApiError::bad_payload("Folder id is required"));
        }
        Ok(())
    }
}

/// A file to send to `POST /files/upload`
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FileUpload {
    pub filename: String,
    pub bytes: Vec<u8>,
    /// MIME type, guessed by the server when absent
    pub mime_type: Option<String>,
    pub folder_id: String,
    /// Item title, the file name when empty
    pub title: String,
    pub description: Option<String>,
}

impl FileUpload {
    pub fn validate(&self) -> ApiResult<()> {
        if self.filename.trim().is_empty() {
            return Err(ApiError::bad_payload("File name is required"));
        }
        if self.bytes.is_empty() {
            return Err(ApiError::bad_payload("File is empty"));
        }
        if self.bytes.len() > MAX_UPLOAD_BYTES {
            return Err(ApiError::bad_payload(format!(
                "File is {} bytes; the limit is {} bytes",
                self.bytes.len(),
                MAX_UPLOAD_BYTES
            )));
        }
        if self.folder_id.trim().is_empty() {
            return Err(ApiError::bad_payload("Folder id is required"));
        }
        Ok(())
    }

    /// Title sent with the upload
    pub fn effective_title(&self) -> &str {
        if self.title.trim().is_empty() {
            &self.filename
        } else {
            &self.title
        }
    }
}

/// Body of `POST /search/text`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SearchRequest {
    pub query: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub folder_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub content_types: Option<Vec<ContentType>>,
    pub limit: u32,
    pub similarity_threshold: f32,
}

impl Default for SearchRequest {
    fn default() -> Self {
        Self {
            query: String::new(),
            folder_id: None,
            content_types: None,
            limit: 5,
            similarity_threshold: 0.7,
        }
    }
}

impl SearchRequest {
    pub fn new(query: impl Into<String>) -> Self {
        Self {
            query: query.into(),
            ..Default::default()
        }
    }

    pub fn validate(&self) -> ApiResult<()> {
        if self.query.trim().is_empty() {
            return Err(ApiError::bad_payload("Search query is required"));
        }
        if self.limit == 0 || self.limit > MAX_SEARCH_LIMIT {
            return Err(ApiError::bad_payload(format!(
                "Limit must be between 1 and {}",
                MAX_SEARCH_LIMIT
            )));
        }
        if !(0.0..=1.0).contains(&self.similarity_threshold) {
            return Err(ApiError::bad_payload(
                "Similarity threshold must be between 0.0 and 1.0",
            ));
        }
        Ok(())
    }
}

/// Response of `POST /search/text`
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SearchResponse {
    #[serde(default)]
    pub query: String,
    #[serde(default)]
    pub results: Vec<KnowledgeItem>,
    #[serde(default)]
    pub total: usize,
    #[serde(default)]
    pub filtered_by: Option<Value>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ApiErrorCode;

    #[test]
    fn test_folder_request_trims_and_limits() {
        let mut req = FolderRequest::new("  Research  ");
        req.validate().unwrap();
        assert_eq!(req.name, "Research");

        let mut blank = FolderRequest::new("   ");
        assert_eq!(blank.validate().unwrap_err().code, ApiErrorCode::BadPayload);

        let mut long = FolderRequest::new("x".repeat(256));
        assert!(long.validate().is_err());
    }

    #[test]
    fn test_ingest_requires_fields() {
        assert!(IngestRequest::new("t", "c", "f").validate().is_ok());
        assert!(IngestRequest::new("", "c", "f").validate().is_err());
        assert!(IngestRequest::new("t", " ", "f").validate().is_err());
        assert!(IngestRequest::new("t", "c", "").validate().is_err());
    }

    #[test]
    fn test_upload_limits() {
        let mut upload = FileUpload {
            filename: "a.txt".into(),
            bytes: b"hi".to_vec(),
            folder_id: "f".into(),
            ..Default::default()
        };
        assert!(upload.validate().is_ok());
        assert_eq!(upload.effective_title(), "a.txt");

        upload.bytes = vec![0; MAX_UPLOAD_BYTES + 1];
        assert!(upload.validate().is_err());
        upload.bytes.clear();
        assert!(upload.validate().is_err());
    }

    #[test]
    fn test_search_bounds() {
        assert!(SearchRequest::new("rust").validate().is_ok());
        let mut req = SearchRequest::new("rust");
        req.limit = 51;
        assert!(req.validate().is_err());
        req.limit = 10;
        req.similarity_threshold = 1.5;
        assert!(req.validate().is_err());
        assert!(SearchRequest::new(" ").validate().is_err());
    }

    #[test]
    fn test_nested_folders_deserialize() {
        let json = serde_json::json!({
            "folders": [{
                "id": "1", "name": "Root", "depth": 0,
                "children": [{"id": "2", "name": "Child", "parent_id": "1", "depth": 1}]
            }]
        });
        let resp: FoldersResponse = serde_json::from_value(json).unwrap();
        let names: Vec<&str> = resp.folders[0]
            .flatten()
            .iter()
            .map(|f| f.name.as_str())
            .collect();
        assert_eq!(names, vec!["Root", "Child"]);
    }

    #[test]
    fn test_content_type_from_str() {
        assert_eq!("PDF".parse::<ContentType>().unwrap(), ContentType::Pdf);
        assert!("mp5".parse::<ContentType>().is_err());
    }

    #[test]
    fn test_masked_key() {
        let auth = RemoteAuth {
            api_key: "zyph_abcdefghijkl".into(),
            user_id: None,
            validated_at: Utc::now(),
            key_name: None,
        };
        assert_eq!(auth.masked_key(), "zyph_...ijkl");
    }
}
