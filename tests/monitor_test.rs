//! Conversation monitor integration tests
//!
//! Page events are fed through a channel the way a content script would
//! forward DOM mutations.

mod common;

use std::sync::Arc;
use std::time::Duration;

use tokio::sync::mpsc;

use zyph::models::{Conversation, Role};
use zyph::monitor::{ConversationMonitor, EndReason, PageEvent, Summarizer};
use zyph::storage::StorageManager;

use common::memory_storage;

fn claude_html(turns: &[(Role, &str)]) -> String {
    turns
        .iter()
        .map(|(role, text)| match role {
            Role::User => format!(r#"<div data-testid="user-message"><p>{}</p></div>"#, text),
            Role::Assistant => format!(
                r#"<div data-is-streaming="false"><div class="font-claude-message"><p>{}</p></div></div>"#,
                text
            ),
        })
        .collect()
}

async fn enabled_storage(domain: &str) -> StorageManager {
    let storage = memory_storage();
    assert!(storage.set_domain_enabled(domain, true).await);
    storage
}

struct CountingSummarizer;

impl Summarizer for CountingSummarizer {
    fn summarize(&self, conversation: &Conversation) -> String {
        format!("{} turns", conversation.messages.len())
    }
}

#[tokio::test]
async fn test_streaming_turn_is_committed_only_when_complete() {
    let storage = enabled_storage("claude.ai").await;
    let monitor = ConversationMonitor::new("https://claude.ai/chat/1", storage.clone())
        .unwrap()
        .with_summarizer(Arc::new(CountingSummarizer));
    let (tx, rx) = mpsc::channel(8);
    let handle = tokio::spawn(monitor.run(rx));

    let q = (Role::User, "What is sled?");
    tx.send(PageEvent::Mutated {
        html: claude_html(&[q, (Role::Assistant, "An embed")]),
    })
    .await
    .unwrap();
    tx.send(PageEvent::Mutated {
        html: claude_html(&[q, (Role::Assistant, "An embedded database.")]),
    })
    .await
    .unwrap();
    tx.send(PageEvent::Closed).await.unwrap();

    let outcome = handle.await.unwrap();
    assert_eq!(outcome.reason, EndReason::Closed);

    let id = outcome.conversation_id.expect("conversation stored");
    let conversation = storage.get_conversation(&id).await.unwrap();
    let contents: Vec<&str> = conversation
        .messages
        .iter()
        .map(|m| m.content.as_str())
        .collect();
    assert_eq!(contents, vec!["What is sled?", "An embedded database."]);

    let summary = outcome.summary.expect("summary stored");
    assert_eq!(summary.text, "2 turns");
    assert_eq!(
        storage.get_summary(&id, "claude.ai").await.map(|s| s.text),
        Some("2 turns".to_string())
    );
}

#[tokio::test]
async fn test_navigation_to_other_conversation_ends_monitoring() {
    let storage = enabled_storage("claude.ai").await;
    let monitor = ConversationMonitor::new("https://claude.ai/chat/1", storage.clone()).unwrap();
    let (tx, rx) = mpsc::channel(8);
    let handle = tokio::spawn(monitor.run(rx));

    tx.send(PageEvent::Mutated {
        html: claude_html(&[(Role::User, "Hi"), (Role::Assistant, "Hello")]),
    })
    .await
    .unwrap();
    tx.send(PageEvent::Navigated {
        url: "https://claude.ai/chat/2".into(),
        html: String::new(),
    })
    .await
    .unwrap();

    let outcome = handle.await.unwrap();
    assert_eq!(outcome.reason, EndReason::Navigated);
    assert!(tx.is_closed());
    let conversation = storage
        .get_conversation(&outcome.conversation_id.unwrap())
        .await
        .unwrap();
    assert_eq!(conversation.messages.len(), 2);
}

#[tokio::test]
async fn test_new_chat_receiving_its_url_is_same_conversation() {
    let storage = enabled_storage("claude.ai").await;
    let monitor = ConversationMonitor::new("https://claude.ai/new", storage.clone()).unwrap();
    let (tx, rx) = mpsc::channel(8);
    let handle = tokio::spawn(monitor.run(rx));

    tx.send(PageEvent::Navigated {
        url: "https://claude.ai/chat/abc".into(),
        html: claude_html(&[(Role::User, "First"), (Role::Assistant, "Reply")]),
    })
    .await
    .unwrap();
    tx.send(PageEvent::Closed).await.unwrap();

    let outcome = handle.await.unwrap();
    assert_eq!(outcome.reason, EndReason::Closed);
    let conversation = storage
        .get_conversation(&outcome.conversation_id.unwrap())
        .await
        .unwrap();
    assert_eq!(conversation.url, "https://claude.ai/chat/abc");
    assert_eq!(conversation.messages.len(), 2);
}

#[tokio::test]
async fn test_idle_timeout_finishes_conversation() {
    let storage = enabled_storage("chatgpt.com").await;
    let monitor = ConversationMonitor::new("https://chatgpt.com/c/9", storage.clone())
        .unwrap()
        .with_idle_timeout(Duration::from_millis(50));
    let (tx, rx) = mpsc::channel(8);
    let handle = tokio::spawn(monitor.run(rx));

    tx.send(PageEvent::Mutated {
        html: r#"<div data-message-author-role="user">Ping</div>"#.into(),
    })
    .await
    .unwrap();

    let outcome = handle.await.unwrap();
    assert_eq!(outcome.reason, EndReason::IdleTimeout);
    assert!(tx.is_closed());
    assert_eq!(outcome.summary.map(|s| s.message_count), Some(1));
}

#[tokio::test]
async fn test_empty_conversation_has_no_summary() {
    let storage = enabled_storage("gemini.google.com").await;
    let monitor =
        ConversationMonitor::new("https://gemini.google.com/app/1", storage.clone()).unwrap();
    let (tx, rx) = mpsc::channel(8);
    let handle = tokio::spawn(monitor.run(rx));
    drop(tx);

    let outcome = handle.await.unwrap();
    assert_eq!(outcome.reason, EndReason::Disconnected);
    assert!(outcome.summary.is_none());
    assert!(storage.get_summaries().await.is_empty());
}
