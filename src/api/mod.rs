//! Client for the knowledge-base backend
//!
//! [`ApiClient`] wraps the backend's REST endpoints. It never holds a
//! credential of its own: every authenticated call reads it from the
//! [`Session`] it was built with and fails with `NO_AUTH` when there is
//! none. A 401 or 403 on any authenticated call clears the session before
//! the `AUTH_REJECTED` error is returned, so a dead key is sent at most once.
//!
//! Folder listings are cached for [`ApiConfig::folder_cache_ttl_seconds`]
//! (five minutes by default) and mirrored to storage for offline display.
//!
//! # Examples
//!
//! ```no_run
//! use std::sync::Arc;
//! use zyph::api::{ApiClient, Session};
//! use zyph::config::ApiConfig;
//! use zyph::storage::{MemoryStore, StorageManager};
//!
//! # #[tokio::main]
//! # async fn main() -> anyhow::Result<()> {
//! let storage = StorageManager::new(Arc::new(MemoryStore::new()));
//! let client = ApiClient::new(&ApiConfig::default(), Session::new(storage))?;
//! client.validate_api_key("zyph_example", None).await?;
//! let folders = client.fetch_folders(false).await?;
//! println!("{} folders", folders.len());
//! # Ok(())
//! # }
//! ```

use std::time::Duration;

use chrono::Utc;
use reqwest::multipart::{Form, Part};
use reqwest::{Client, Method, RequestBuilder, Response, StatusCode};
use serde::de::DeserializeOwned;

use crate::config::ApiConfig;
use crate::error::{ApiError, ApiErrorCode, ApiResult, Result, ZyphError};
use crate::storage::keys;

pub mod cache;
pub mod session;
pub mod types;

pub use cache::FolderCache;
pub use session::Session;
pub use types::{
    ContentType, DeleteResponse, FileUpload, FolderContent, FolderRequest, IngestRequest,
    ItemResponse, KnowledgeItem, RemoteAuth, RemoteFolder, SearchRequest, SearchResponse,
};

use types::{FoldersResponse, ValidateKeyResponse};

const API_KEY_HEADER: &str = "x-api-key";
const USER_ID_HEADER: &str = "x-user-id";

/// Longest server error text carried into an [`ApiError`]
const MAX_DETAIL_LEN: usize = 500;

/// Authenticated client for the knowledge-base backend
#[derive(Debug, Clone)]
pub struct ApiClient {
    client: Client,
    base_url: String,
    session: Session,
    folders: FolderCache,
}

impl ApiClient {
    /// Build a client for `config.base_url` using `session` for credentials
    ///
    /// # Errors
    ///
    /// Returns `ZyphError::Config` if the HTTP client cannot be created
    pub fn new(config: &ApiConfig, session: Session) -> Result<Self> {
        let client = Client::builder()
            .timeout(Duration::from_secs(config.timeout_seconds))
            .user_agent(config.user_agent.clone())
            .build()
            .map_err(|e| ZyphError::Config(format!("Failed to create HTTP client: {}", e)))?;

        tracing::info!("Initialized API client: base_url={}", config.base_url);

        Ok(Self {
            client,
            base_url: config.base_url.trim_end_matches('/').to_string(),
            session,
            folders: FolderCache::new(Duration::from_secs(config.folder_cache_ttl_seconds)),
        })
    }

    /// Session the client reads credentials from
    pub fn session(&self) -> &Session {
        &self.session
    }

    /// Backend root URL
    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// Cache holding the last folder listing
    pub fn folder_cache(&self) -> &FolderCache {
        &self.folders
    }

    /// Check `api_key` with the backend and persist it on success
    ///
    /// Nothing is stored unless the backend accepts the key.
    pub async fn validate_api_key(
        &self,
        api_key: &str,
        user_id: Option<&str>,
    ) -> ApiResult<RemoteAuth> {
        let api_key = api_key.trim();
        if api_key.is_empty() {
            return Err(ApiError::new(ApiErrorCode::InvalidKey, "API key is required"));
        }

        let mut request = self
            .client
            .post(self.url("/auth/validate-api-key"))
            .header(API_KEY_HEADER, api_key);
        if let Some(user_id) = user_id.filter(|u| !u.trim().is_empty()) {
            request = request.header(USER_ID_HEADER, user_id.trim());
        }

        let response = request.send().await.map_err(|e| {
            tracing::warn!("API key validation request failed: {}", e);
            ApiError::new(
                ApiErrorCode::ValidationFailed,
                format!("Could not reach server: {}", e),
            )
        })?;

        let status = response.status();
        if status == StatusCode::UNAUTHORIZED || status == StatusCode::FORBIDDEN {
            let detail = error_detail(response).await;
            tracing::warn!("API key rejected ({}): {}", status, detail);
            return Err(
                ApiError::new(ApiErrorCode::InvalidKey, detail).with_status(status.as_u16())
            );
        }
        if !status.is_success() {
            let detail = error_detail(response).await;
            tracing::error!("API key validation returned {}: {}", status, detail);
            return Err(ApiError::new(ApiErrorCode::ValidationFailed, detail)
                .with_status(status.as_u16()));
        }

        let body: ValidateKeyResponse = response.json().await.map_err(|e| {
            tracing::error!("Failed to parse validation response: {}", e);
            ApiError::new(
                ApiErrorCode::ValidationFailed,
                format!("Invalid validation response: {}", e),
            )
        })?;
        if !body.valid {
            return Err(ApiError::new(ApiErrorCode::InvalidKey, "API key is not valid"));
        }

        let auth = RemoteAuth {
            api_key: api_key.to_string(),
            user_id: body
                .user_id
                .or_else(|| body.user.map(|u| u.id))
                .or_else(|| user_id.map(str::to_string)),
            validated_at: Utc::now(),
            key_name: body.key_name,
        };
        if !self.session.store(auth.clone()).await {
            tracing::warn!("Validated credential could not be persisted");
        }
        self.folders.invalidate();
        tracing::info!("API key validated ({})", auth.masked_key());
        Ok(auth)
    }

    /// Forget the stored credential
    pub async fn logout(&self) {
        self.session.clear().await;
        self.folders.invalidate();
    }

    /// Folder tree, served from the cache unless `force_refresh` is set
    pub async fn fetch_folders(&self, force_refresh: bool) -> ApiResult<Vec<RemoteFolder>> {
        let request = self.authed(Method::GET, "/folders").await?;

        if !force_refresh {
            if let Some(folders) = self.folders.get() {
                tracing::debug!("Using cached folder list");
                return Ok(folders);
            }
        }

        let body: FoldersResponse = self.execute(request, "List folders").await?;
        self.folders.put(body.folders.clone());
        if !self
            .session
            .storage()
            .set(keys::REMOTE_FOLDERS, &body.folders)
            .await
        {
            tracing::warn!("Could not mirror folder list to storage");
        }
        Ok(body.folders)
    }

    /// Last folder listing mirrored to storage
    pub async fn cached_folders_offline(&self) -> Vec<RemoteFolder> {
        self.session
            .storage()
            .get(keys::REMOTE_FOLDERS)
            .await
            .unwrap_or_default()
    }

    pub async fn get_folder(&self, id: &str) -> ApiResult<RemoteFolder> {
        let id = require_id(id, "Folder id")?;
        let request = self.authed(Method::GET, &format!("/folders/{}", id)).await?;
        self.execute(request, "Get folder").await
    }

    pub async fn create_folder(&self, mut folder: FolderRequest) -> ApiResult<RemoteFolder> {
        folder.validate()?;
        let request = self.authed(Method::POST, "/folders").await?.json(&folder);
        let created: RemoteFolder = self.execute(request, "Create folder").await?;
        self.folders.invalidate();
        tracing::info!("Created folder {} ({})", created.name, created.id);
        Ok(created)
    }

    pub async fn update_folder(
        &self,
        id: &str,
        mut folder: FolderRequest,
    ) -> ApiResult<RemoteFolder> {
        let id = require_id(id, "Folder id")?;
        folder.validate()?;
        let request = self
            .authed(Method::PUT, &format!("/folders/{}", id))
            .await?
            .json(&folder);
        let updated = self.execute(request, "Update folder").await?;
        self.folders.invalidate();
        Ok(updated)
    }

    pub async fn delete_folder(&self, id: &str) -> ApiResult<DeleteResponse> {
        let id = require_id(id, "Folder id")?;
        let request = self
            .authed(Method::DELETE, &format!("/folders/{}", id))
            .await?;
        let deleted = self.execute(request, "Delete folder").await?;
        self.folders.invalidate();
        tracing::info!("Deleted folder {}", id);
        Ok(deleted)
    }

    pub async fn get_folder_content(&self, id: &str) -> ApiResult<FolderContent> {
        let id = require_id(id, "Folder id")?;
        let request = self
            .authed(Method::GET, &format!("/folders/{}/content", id))
            .await?;
        self.execute(request, "Get folder content").await
    }

    /// Store text content in a folder
    pub async fn ingest_content(&self, content: &IngestRequest) -> ApiResult<ItemResponse> {
        content.validate()?;
        let request = self.authed(Method::POST, "/content").await?.json(content);
        let created: ItemResponse = self.execute(request, "Ingest content").await?;
        tracing::info!("Ingested '{}' as {}", content.title, created.item.id);
        Ok(created)
    }

    pub async fn get_content(&self, id: &str) -> ApiResult<KnowledgeItem> {
        let id = require_id(id, "Content id")?;
        let request = self
            .authed(Method::GET, &format!("/content/{}", id))
            .await?;
        self.execute(request, "Get content").await
    }

    pub async fn delete_content(&self, id: &str) -> ApiResult<DeleteResponse> {
        let id = require_id(id, "Content id")?;
        let request = self
            .authed(Method::DELETE, &format!("/content/{}", id))
            .await?;
        self.execute(request, "Delete content").await
    }

    /// Upload a file as a multipart form
    pub async fn upload_file(&self, upload: FileUpload) -> ApiResult<ItemResponse> {
        upload.validate()?;
        let title = upload.effective_title().to_string();
        let size = upload.bytes.len();

        let mut part = Part::bytes(upload.bytes).file_name(upload.filename.clone());
        if let Some(mime) = &upload.mime_type {
            part = part
                .mime_str(mime)
                .map_err(|e| ApiError::bad_payload(format!("Invalid MIME type {}: {}", mime, e)))?;
        }
        let mut form = Form::new()
            .part("file", part)
            .text("folder_id", upload.folder_id.clone())
            .text("title", title);
        if let Some(description) = upload.description.filter(|d| !d.trim().is_empty()) {
            form = form.text("description", description);
        }

        let request = self
            .authed(Method::POST, "/files/upload")
            .await?
            .multipart(form);
        let created: ItemResponse = self.execute(request, "Upload file").await?;
        tracing::info!(
            "Uploaded {} ({} bytes) as {}",
            upload.filename,
            size,
            created.item.id
        );
        Ok(created)
    }

    pub async fn search_text(&self, search: &SearchRequest) -> ApiResult<SearchResponse> {
        search.validate()?;
        let request = self.authed(Method::POST, "/search/text").await?.json(search);
        self.execute(request, "Search").await
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    /// Request builder carrying the session credential
    async fn authed(&self, method: Method, path: &str) -> ApiResult<RequestBuilder> {
        let auth = self.session.credential().await.ok_or_else(ApiError::no_auth)?;
        let mut request = self
            .client
            .request(method, self.url(path))
            .header(API_KEY_HEADER, &auth.api_key);
        if let Some(user_id) = &auth.user_id {
            request = request.header(USER_ID_HEADER, user_id);
        }
        Ok(request)
    }

    /// Send `request` and decode a JSON body, mapping failures to error codes
    async fn execute<T: DeserializeOwned>(
        &self,
        request: RequestBuilder,
        operation: &str,
    ) -> ApiResult<T> {
        let response = request.send().await.map_err(|e| {
            tracing::warn!("{} request failed: {}", operation, e);
            ApiError::network(format!("{} failed: {}", operation, e))
        })?;

        let status = response.status();
        if status == StatusCode::UNAUTHORIZED || status == StatusCode::FORBIDDEN {
            let detail = error_detail(response).await;
            tracing::warn!(
                "{} rejected credential ({}); clearing session",
                operation,
                status
            );
            self.session.clear().await;
            self.folders.invalidate();
            return Err(ApiError::new(ApiErrorCode::AuthRejected, detail)
                .with_status(status.as_u16()));
        }
        if !status.is_success() {
            let detail = error_detail(response).await;
            tracing::error!("{} returned error {}: {}", operation, status, detail);
            return Err(
                ApiError::new(ApiErrorCode::RequestFailed, format!("{}: {}", operation, detail))
                    .with_status(status.as_u16()),
            );
        }

        response.json::<T>().await.map_err(|e| {
            tracing::error!("Failed to parse {} response: {}", operation, e);
            ApiError::new(
                ApiErrorCode::RequestFailed,
                format!("Invalid {} response: {}", operation, e),
            )
            .with_status(status.as_u16())
        })
    }
}

fn require_id<'a>(id: &'a str, what: &str) -> ApiResult<&'a str> {
    let id = id.trim();
    if id.is_empty() {
        return Err(ApiError::bad_payload(format!("{} is required", what)));
    }
    Ok(id)
}

/// Server error text, preferring the `detail` field of a JSON body
async fn error_detail(response: Response) -> String {
    let status = response.status();
    let text = response.text().await.unwrap_or_default();
    let detail = match serde_json::from_str::<serde_json::Value>(&text) {
        Ok(serde_json::Value::Object(map)) => match map.get("detail") {
            Some(serde_json::Value::String(s)) => s.clone(),
            Some(other) => other.to_string(),
            None => text,
        },
        _ => text,
    };
    let detail = detail.trim();
    if detail.is_empty() {
        return status
            .canonical_reason()
            .unwrap_or("request failed")
            .to_string();
    }
    detail.chars().take(MAX_DETAIL_LEN).collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::{MemoryStore, StorageManager};
    use std::sync::Arc;

    fn client() -> ApiClient {
        let storage = StorageManager::new(Arc::new(MemoryStore::new()));
        ApiClient::new(&ApiConfig::default(), Session::new(storage)).unwrap()
    }

    #[tokio::test]
    async fn test_calls_without_credential_fail_with_no_auth() {
        let client = client();
        let err = client.fetch_folders(false).await.unwrap_err();
        assert_eq!(err.code, ApiErrorCode::NoAuth);
        let err = client.get_content("abc").await.unwrap_err();
        assert_eq!(err.code, ApiErrorCode::NoAuth);
    }

    #[tokio::test]
    async fn test_empty_key_is_invalid_without_request() {
        let err = client().validate_api_key("  ", None).await.unwrap_err();
        assert_eq!(err.code, ApiErrorCode::InvalidKey);
        assert_eq!(err.status, None);
    }

    #[tokio::test]
    async fn test_bad_payload_checked_before_auth() {
        let client = client();
        let err = client
            .create_folder(FolderRequest::new(""))
            .await
            .unwrap_err();
        assert_eq!(err.code, ApiErrorCode::BadPayload);
        let err = client.delete_content(" ").await.unwrap_err();
        assert_eq!(err.code, ApiErrorCode::BadPayload);
    }

    #[test]
    fn test_base_url_is_normalized() {
        let storage = StorageManager::new(Arc::new(MemoryStore::new()));
        let config = ApiConfig {
            base_url: "http://localhost:8000/api/v1/".to_string(),
            ..Default::default()
        };
        let client = ApiClient::new(&config, Session::new(storage)).unwrap();
        assert_eq!(client.url("/folders"), "http://localhost:8000/api/v1/folders");
    }
}
