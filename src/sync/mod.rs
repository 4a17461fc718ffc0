//! Persistent retry queue for remote writes
//!
//! A write that fails with a transient error (network failure, 5xx, 429) is
//! recorded as a [`SyncItem`] under `zyphRemoteSyncQueue` and retried later
//! with exponential backoff. An item leaves the queue only when the backend
//! confirms the write or the user discards it. Items that run out of
//! attempts, or fail in a way retrying cannot fix, are parked: they stay in
//! the queue, are skipped by [`SyncQueue::process`], and come back with
//! [`SyncQueue::retry`].

use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tokio::sync::Mutex;
use tokio_util::sync::CancellationToken;
use ulid::Ulid;

use crate::api::{ApiClient, FolderRequest, IngestRequest};
use crate::config::SyncConfig;
use crate::error::{ApiError, ApiErrorCode, ApiResult};
use crate::storage::{keys, StorageManager};

/// A remote write waiting to be delivered
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "camelCase")]
pub enum SyncOperation {
    /// `POST /content`, optionally linked to a local content item
    #[serde(rename_all = "camelCase")]
    IngestContent {
        request: IngestRequest,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        local_id: Option<String>,
    },
    /// `POST /folders`
    CreateFolder { request: FolderRequest },
    /// `DELETE /content/:id`
    DeleteContent { id: String },
}

impl SyncOperation {
    /// Short human-readable label
    pub fn describe(&self) -> String {
        match self {
            SyncOperation::IngestContent { request, .. } => format!("ingest '{}'", request.title),
            SyncOperation::CreateFolder { request } => format!("create folder '{}'", request.name),
            SyncOperation::DeleteContent { id } => format!("delete content {}", id),
        }
    }

    /// Perform the write, returning the remote id it produced
    pub async fn apply(&self, client: &ApiClient) -> ApiResult<Option<String>> {
        match self {
            SyncOperation::IngestContent { request, .. } => {
                let created = client.ingest_content(request).await?;
                Ok(Some(created.item.id))
            }
            SyncOperation::CreateFolder { request } => {
                let created = client.create_folder(request.clone()).await?;
                Ok(Some(created.id))
            }
            SyncOperation::DeleteContent { id } => {
                client.delete_content(id).await?;
                Ok(None)
            }
        }
    }
}

/// A queued operation and its retry state
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SyncItem {
    pub id: String,
    pub operation: SyncOperation,
    /// Delivery attempts made so far
    pub attempts: u32,
    #[serde(default)]
    pub last_error: Option<String>,
    #[serde(default)]
    pub last_error_code: Option<ApiErrorCode>,
    pub next_retry_at: DateTime<Utc>,
    pub created_at: DateTime<Utc>,
    /// Excluded from processing until retried by hand
    #[serde(default)]
    pub parked: bool,
}

impl SyncItem {
    /// Whether `process` would attempt this item at `now`
    pub fn is_due(&self, now: DateTime<Utc>) -> bool {
        !self.parked && self.next_retry_at <= now
    }
}

/// Exponential backoff schedule
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    pub base_delay: Duration,
    pub max_delay: Duration,
    /// Attempts after which an item is parked
    pub max_attempts: u32,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            base_delay: Duration::from_secs(30),
            max_delay: Duration::from_secs(3600),
            max_attempts: 8,
        }
    }
}

impl From<&SyncConfig> for RetryPolicy {
    fn from(config: &SyncConfig) -> Self {
        Self {
            base_delay: Duration::from_secs(config.base_delay_seconds),
            max_delay: Duration::from_secs(config.max_delay_seconds),
            max_attempts: config.max_attempts,
        }
    }
}

impl RetryPolicy {
    /// Wait before the next attempt once `attempts` have failed
    ///
    /// # Examples
    ///
    /// ```
    /// use std::time::Duration;
    /// use zyph::sync::RetryPolicy;
    ///
    /// let policy = RetryPolicy::default();
    /// assert_eq!(policy.delay(1), Duration::from_secs(30));
    /// assert_eq!(policy.delay(3), Duration::from_secs(120));
    /// assert_eq!(policy.delay(20), Duration::from_secs(3600));
    /// ```
    pub fn delay(&self, attempts: u32) -> Duration {
        2u32.checked_pow(attempts.saturating_sub(1))
            .and_then(|factor| self.base_delay.checked_mul(factor))
            .map_or(self.max_delay, |delay| delay.min(self.max_delay))
    }

    fn next_retry(&self, attempts: u32, now: DateTime<Utc>) -> DateTime<Utc> {
        let delay = self.delay(attempts);
        now + chrono::Duration::milliseconds(delay.as_millis().min(i64::MAX as u128) as i64)
    }
}

/// Outcome of one pass over the queue
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SyncReport {
    /// Items delivered and removed
    pub delivered: usize,
    /// Items that failed and were rescheduled
    pub rescheduled: usize,
    /// Items parked during this pass
    pub parked: usize,
    /// Items not yet due, already parked, or not reached
    pub skipped: usize,
    /// The pass ended early on an authentication failure
    pub auth_failed: bool,
}

/// Result of [`SyncQueue::submit`]
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SubmitOutcome {
    /// Delivered immediately; carries the remote id when one was returned
    Delivered(Option<String>),
    /// Failed transiently and queued under this item id
    Queued(String),
}

/// The persisted retry queue
#[derive(Debug, Clone)]
pub struct SyncQueue {
    storage: StorageManager,
    policy: RetryPolicy,
    // serializes read-modify-write cycles within this process
    lock: Arc<Mutex<()>>,
}

impl SyncQueue {
    pub fn new(storage: StorageManager, policy: RetryPolicy) -> Self {
        Self {
            storage,
            policy,
            lock: Arc::new(Mutex::new(())),
        }
    }

    pub fn policy(&self) -> &RetryPolicy {
        &self.policy
    }

    /// Queued items, oldest first
    pub async fn list(&self) -> Vec<SyncItem> {
        let mut items: Vec<SyncItem> = self
            .storage
            .get(keys::REMOTE_SYNC_QUEUE)
            .await
            .unwrap_or_default();
        items.sort_by(|a, b| a.created_at.cmp(&b.created_at));
        items
    }

    /// Record a write that failed with `error`
    ///
    /// Returns `None` when the item could not be persisted, including when
    /// the stored queue is unreadable; the stored queue is left untouched.
    pub async fn enqueue(&self, operation: SyncOperation, error: &ApiError) -> Option<SyncItem> {
        let _guard = self.lock.lock().await;
        let mut items = self.load().await?;
        let now = Utc::now();
        let item = SyncItem {
            id: Ulid::new().to_string(),
            attempts: 1,
            last_error: Some(error.message.clone()),
            last_error_code: Some(error.code),
            next_retry_at: self.policy.next_retry(1, now),
            created_at: now,
            parked: self.policy.max_attempts <= 1,
            operation,
        };
        items.push(item.clone());
        if !self.save(&items).await {
            tracing::error!("Failed to persist sync item {}", item.id);
            return None;
        }
        tracing::info!(
            "Queued {} for retry at {}",
            item.operation.describe(),
            item.next_retry_at
        );
        Some(item)
    }

    /// Try `operation` now and queue it if it fails transiently
    ///
    /// Non-retryable failures, and transient ones that could not be queued,
    /// are returned to the caller.
    pub async fn submit(
        &self,
        client: &ApiClient,
        operation: SyncOperation,
    ) -> ApiResult<SubmitOutcome> {
        match operation.apply(client).await {
            Ok(remote_id) => {
                self.link_local(&operation, remote_id.as_deref()).await;
                Ok(SubmitOutcome::Delivered(remote_id))
            }
            Err(e) if e.is_retryable() => match self.enqueue(operation, &e).await {
                Some(item) => Ok(SubmitOutcome::Queued(item.id)),
                None => Err(e),
            },
            Err(e) => Err(e),
        }
    }

    /// Attempt every item due at `now`, oldest first
    pub async fn process(&self, client: &ApiClient, now: DateTime<Utc>) -> SyncReport {
        let _guard = self.lock.lock().await;
        let mut report = SyncReport::default();
        let Some(mut items) = self.load().await else {
            return report;
        };
        items.sort_by(|a, b| a.created_at.cmp(&b.created_at));
        let mut remaining = Vec::with_capacity(items.len());
        let mut stopped = false;

        for mut item in items {
            if stopped || !item.is_due(now) {
                report.skipped += 1;
                remaining.push(item);
                continue;
            }

            match item.operation.apply(client).await {
                Ok(remote_id) => {
                    tracing::info!("Delivered {}", item.operation.describe());
                    self.link_local(&item.operation, remote_id.as_deref())
                        .await;
                    report.delivered += 1;
                }
                Err(e) if e.is_auth() => {
                    tracing::warn!("Sync stopped: {}", e);
                    item.last_error = Some(e.message.clone());
                    item.last_error_code = Some(e.code);
                    report.auth_failed = true;
                    report.skipped += 1;
                    stopped = true;
                    remaining.push(item);
                }
                Err(e) => {
                    item.attempts += 1;
                    item.last_error = Some(e.message.clone());
                    item.last_error_code = Some(e.code);
                    if !e.is_retryable() || item.attempts >= self.policy.max_attempts {
                        item.parked = true;
                        report.parked += 1;
                        tracing::warn!(
                            "Parked {} after {} attempts: {}",
                            item.operation.describe(),
                            item.attempts,
                            e
                        );
                    } else {
                        item.next_retry_at = self.policy.next_retry(item.attempts, now);
                        report.rescheduled += 1;
                        tracing::debug!(
                            "Rescheduled {} for {}",
                            item.operation.describe(),
                            item.next_retry_at
                        );
                    }
                    remaining.push(item);
                }
            }
        }

        if report.delivered + report.rescheduled + report.parked > 0 || report.auth_failed {
            if !self.save(&remaining).await {
                tracing::error!("Failed to persist sync queue");
            }
        }
        report
    }

    /// Unpark `id` and make it due immediately
    pub async fn retry(&self, id: &str) -> bool {
        let _guard = self.lock.lock().await;
        let Some(mut items) = self.load().await else {
            return false;
        };
        let Some(item) = items.iter_mut().find(|i| i.id == id) else {
            return false;
        };
        item.parked = false;
        item.next_retry_at = Utc::now();
        self.save(&items).await
    }

    /// Drop `id` from the queue without delivering it
    pub async fn discard(&self, id: &str) -> bool {
        let _guard = self.lock.lock().await;
        let Some(mut items) = self.load().await else {
            return false;
        };
        let before = items.len();
        items.retain(|i| i.id != id);
        if items.len() == before {
            return false;
        }
        tracing::info!("Discarded sync item {}", id);
        self.save(&items).await
    }

    /// Process the queue every `interval` until `shutdown` is cancelled
    pub async fn run_alarm(
        &self,
        client: &ApiClient,
        interval: Duration,
        shutdown: CancellationToken,
    ) {
        let mut ticker = tokio::time::interval(interval);
        ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);
        tracing::info!("Sync alarm running every {:?}", interval);

        loop {
            tokio::select! {
                biased;

                _ = shutdown.cancelled() => {
                    tracing::info!("Sync alarm stopped");
                    break;
                }

                _ = ticker.tick() => {
                    let report = self.process(client, Utc::now()).await;
                    if report.delivered + report.rescheduled + report.parked > 0 {
                        tracing::info!(
                            "Sync pass: {} delivered, {} rescheduled, {} parked",
                            report.delivered,
                            report.rescheduled,
                            report.parked
                        );
                    }
                }
            }
        }
    }

    /// Stored items for a read-modify-write; `None` when unreadable
    async fn load(&self) -> Option<Vec<SyncItem>> {
        self.storage.load_for_update(keys::REMOTE_SYNC_QUEUE).await
    }

    async fn save(&self, items: &[SyncItem]) -> bool {
        self.storage.set(keys::REMOTE_SYNC_QUEUE, &items).await
    }

    async fn link_local(&self, operation: &SyncOperation, remote_id: Option<&str>) {
        if let (
            SyncOperation::IngestContent {
                local_id: Some(local_id),
                ..
            },
            Some(remote_id),
        ) = (operation, remote_id)
        {
            if !self.storage.mark_content_synced(local_id, remote_id).await {
                tracing::warn!("Could not link local item {} to {}", local_id, remote_id);
            }
        }
    }
}
