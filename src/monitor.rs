//! Conversation monitoring on LLM chat pages
//!
//! A content script forwards DOM changes as [`PageEvent`]s. The
//! [`ConversationMonitor`] re-parses the page on every mutation, records new
//! turns through the storage manager, and when the conversation ends (the
//! user navigates to another conversation, the tab closes, or nothing
//! happens for the idle timeout) it stops listening and stores a summary.
//!
//! The newest turn is only committed once a later turn follows it or the
//! conversation ends, so a reply that is still streaming is never stored
//! half-written.

use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use serde::{Deserialize, Serialize};
use tokio::sync::mpsc;

use crate::models::{Conversation, Message, Role, Summary};
use crate::page::StaticPage;
use crate::parsers::{detect_platform, parser_for, PlatformParser};
use crate::storage::StorageManager;

/// Default time without page activity before a conversation is considered over
pub const DEFAULT_IDLE_TIMEOUT: Duration = Duration::from_secs(300);

/// Change observed in the monitored tab
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PageEvent {
    /// The DOM changed; carries the serialized document
    Mutated { html: String },
    /// The tab moved to `url`
    Navigated { url: String, html: String },
    /// The tab was closed
    Closed,
}

/// Why monitoring stopped
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EndReason {
    /// Monitoring is not enabled for the domain
    DomainDisabled,
    IdleTimeout,
    /// Navigated to a different conversation or off the site
    Navigated,
    Closed,
    /// The event source went away
    Disconnected,
}

/// Result of a monitoring session
#[derive(Debug, Clone, PartialEq)]
pub struct MonitorOutcome {
    pub reason: EndReason,
    pub conversation_id: Option<String>,
    pub summary: Option<Summary>,
}

/// Produces summary text for a finished conversation
pub trait Summarizer: Send + Sync {
    fn summarize(&self, conversation: &Conversation) -> String;
}

/// Summary built from the conversation's own sentences
///
/// Uses the first sentence of the opening question and of the final answer.
#[derive(Debug, Clone)]
pub struct ExtractiveSummarizer {
    max_sentence_chars: usize,
}

impl Default for ExtractiveSummarizer {
    fn default() -> Self {
        Self {
            max_sentence_chars: 200,
        }
    }
}

impl ExtractiveSummarizer {
    pub fn new(max_sentence_chars: usize) -> Self {
        Self { max_sentence_chars }
    }

    fn first_sentence(&self, text: &str) -> String {
        let line = text.lines().find(|l| !l.trim().is_empty()).unwrap_or("");
        let sentence = match line.find(|c: char| matches!(c, '.' | '?' | '!')) {
            Some(end) => &line[..=end],
            None => line,
        };
        let sentence = sentence.trim();
        if sentence.chars().count() > self.max_sentence_chars {
            let cut: String = sentence.chars().take(self.max_sentence_chars).collect();
            format!("{}...", cut.trim_end())
        } else {
            sentence.to_string()
        }
    }
}

impl Summarizer for ExtractiveSummarizer {
    fn summarize(&self, conversation: &Conversation) -> String {
        let first_question = conversation
            .messages
            .iter()
            .find(|m| m.role == Role::User)
            .map(|m| self.first_sentence(&m.content));
        let last_answer = conversation
            .messages
            .iter()
            .rev()
            .find(|m| m.role == Role::Assistant)
            .map(|m| self.first_sentence(&m.content));

        let mut text = format!(
            "{} conversation with {} messages.",
            conversation.platform,
            conversation.messages.len()
        );
        if let Some(question) = first_question.filter(|q| !q.is_empty()) {
            text.push_str(&format!(" Asked: {}", question));
        }
        if let Some(answer) = last_answer.filter(|a| !a.is_empty()) {
            text.push_str(&format!(" Last answer: {}", answer));
        }
        text
    }
}

/// Watches one tab of a supported chat site
pub struct ConversationMonitor {
    parser: &'static dyn PlatformParser,
    storage: StorageManager,
    summarizer: Arc<dyn Summarizer>,
    idle_timeout: Duration,
    url: String,
    conversation_id: Option<String>,
    committed: usize,
    latest: Vec<Message>,
}

impl std::fmt::Debug for ConversationMonitor {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ConversationMonitor")
            .field("platform", &self.parser.platform())
            .field("url", &self.url)
            .field("conversation_id", &self.conversation_id)
            .field("committed", &self.committed)
            .finish()
    }
}

impl ConversationMonitor {
    /// Monitor for the tab at `url`, or `None` if the site is unsupported
    pub fn new(url: impl Into<String>, storage: StorageManager) -> Option<Self> {
        let url = url.into();
        let platform = detect_platform(&url)?;
        Some(Self {
            parser: parser_for(platform),
            storage,
            summarizer: Arc::new(ExtractiveSummarizer::default()),
            idle_timeout: DEFAULT_IDLE_TIMEOUT,
            url,
            conversation_id: None,
            committed: 0,
            latest: Vec::new(),
        })
    }

    pub fn with_idle_timeout(mut self, idle_timeout: Duration) -> Self {
        self.idle_timeout = idle_timeout;
        self
    }

    pub fn with_summarizer(mut self, summarizer: Arc<dyn Summarizer>) -> Self {
        self.summarizer = summarizer;
        self
    }

    /// Consume events until the conversation ends
    ///
    /// The receiver is dropped before returning, which disconnects the
    /// event source.
    pub async fn run(mut self, mut events: mpsc::Receiver<PageEvent>) -> MonitorOutcome {
        let domain = host_of(&self.url);
        if !self.storage.is_domain_enabled(&domain).await {
            tracing::info!("Monitoring disabled for {}", domain);
            return MonitorOutcome {
                reason: EndReason::DomainDisabled,
                conversation_id: None,
                summary: None,
            };
        }
        tracing::info!(
            "Monitoring {} conversation at {}",
            self.parser.platform(),
            self.url
        );

        let reason = loop {
            let event = match tokio::time::timeout(self.idle_timeout, events.recv()).await {
                Err(_) => break EndReason::IdleTimeout,
                Ok(None) => break EndReason::Disconnected,
                Ok(Some(event)) => event,
            };
            match event {
                PageEvent::Mutated { html } => self.observe(&html).await,
                PageEvent::Navigated { url, html } => {
                    if !self.same_conversation(&url) {
                        break EndReason::Navigated;
                    }
                    self.url = url;
                    self.observe(&html).await;
                }
                PageEvent::Closed => break EndReason::Closed,
            }
        };
        drop(events);
        tracing::debug!("Conversation ended: {:?}", reason);

        let summary = self.finish().await;
        MonitorOutcome {
            reason,
            conversation_id: self.conversation_id,
            summary,
        }
    }

    /// A freshly started chat gets its permanent URL after the first
    /// message; any other URL change means a different conversation.
    fn same_conversation(&self, next_url: &str) -> bool {
        if detect_platform(next_url) != Some(self.parser.platform()) {
            return false;
        }
        if self.parser.is_new_conversation(&self.url) {
            return !self.parser.is_new_conversation(next_url) || self.conversation_id.is_none();
        }
        path_of(&self.url) == path_of(next_url)
    }

    async fn observe(&mut self, html: &str) {
        let page = StaticPage::new(self.url.clone(), html);
        let messages = self.parser.extract_messages(&page).into_messages();
        if messages.is_empty() {
            return;
        }
        let ready = messages.len() - 1;
        self.latest = messages;

        if self.conversation_id.is_none() {
            let mut conversation = Conversation::new(self.parser.platform(), self.url.clone());
            conversation.messages = self.latest[..ready].to_vec();
            if self.storage.save_conversation(&conversation).await {
                tracing::info!("Started conversation {}", conversation.id);
                self.conversation_id = Some(conversation.id);
                self.committed = ready;
            }
            return;
        }
        self.commit(ready).await;
    }

    /// Store turns `committed..upto` of the latest snapshot
    async fn commit(&mut self, upto: usize) {
        let Some(id) = self.conversation_id.clone() else {
            return;
        };
        if upto <= self.committed {
            return;
        }
        let new_turns = &self.latest[self.committed..upto];
        if self.storage.append_messages(&id, new_turns).await.is_some() {
            tracing::debug!("Stored {} new messages in {}", new_turns.len(), id);
            self.committed = upto;
        }
    }

    async fn finish(&mut self) -> Option<Summary> {
        if self.conversation_id.is_none() && !self.latest.is_empty() {
            let conversation = Conversation::new(self.parser.platform(), self.url.clone());
            if self.storage.save_conversation(&conversation).await {
                self.conversation_id = Some(conversation.id);
            }
        }
        self.commit(self.latest.len()).await;

        let id = self.conversation_id.clone()?;
        let conversation = self.storage.get_conversation(&id).await?;
        if conversation.messages.is_empty() {
            return None;
        }
        let summary = Summary {
            conversation_id: id,
            domain: conversation.domain(),
            text: self.summarizer.summarize(&conversation),
            message_count: conversation.messages.len(),
            created_at: Utc::now(),
        };
        if !self.storage.save_summary(&summary).await {
            tracing::warn!("Summary for {} could not be stored", summary.conversation_id);
        }
        Some(summary)
    }
}

fn host_of(url: &str) -> String {
    url::Url::parse(url)
        .ok()
        .and_then(|u| u.host_str().map(str::to_string))
        .unwrap_or_default()
}

fn path_of(url: &str) -> String {
    url::Url::parse(url)
        .map(|u| u.path().trim_end_matches('/').to_string())
        .unwrap_or_default()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::Platform;
    use crate::storage::MemoryStore;

    fn turn(role: Role, text: &str) -> Message {
        Message {
            role,
            content: text.to_string(),
            timestamp: Utc::now(),
        }
    }

    #[test]
    fn test_extractive_summary() {
        let mut conversation = Conversation::new(Platform::Claude, "https://claude.ai/chat/1");
        conversation.messages = vec![
            turn(Role::User, "How do I open a sled db? I tried twice."),
            turn(Role::Assistant, "Call sled::open. It creates the directory."),
        ];
        assert_eq!(
            ExtractiveSummarizer::default().summarize(&conversation),
            "claude conversation with 2 messages. Asked: How do I open a sled db? \
             Last answer: Call sled::open."
        );
    }

    #[test]
    fn test_long_sentences_are_cut() {
        let summarizer = ExtractiveSummarizer::new(5);
        assert_eq!(summarizer.first_sentence("abcdefghij"), "abcde...");
    }

    #[tokio::test]
    async fn test_unsupported_site_has_no_monitor() {
        let storage = StorageManager::new(Arc::new(MemoryStore::new()));
        assert!(ConversationMonitor::new("https://example.com", storage).is_none());
    }

    #[tokio::test]
    async fn test_disabled_domain_disconnects_immediately() {
        let storage = StorageManager::new(Arc::new(MemoryStore::new()));
        let monitor = ConversationMonitor::new("https://claude.ai/chat/1", storage).unwrap();
        let (tx, rx) = mpsc::channel(4);
        let outcome = monitor.run(rx).await;
        assert_eq!(outcome.reason, EndReason::DomainDisabled);
        assert!(tx.is_closed());
    }
}
