//! Conversation parsers for LLM chat sites
//!
//! Each supported site gets a [`PlatformParser`] that knows where the site
//! renders conversation turns and where its prompt field lives. Sites change
//! their markup without notice, so every parser carries an ordered list of
//! [`Strategy`] values: the first strategy whose predicate holds and that
//! yields at least one turn wins, and when none does the result is simply
//! empty. Nothing in this module returns an error for a missing element.
//!
//! # Examples
//!
//! ```
//! use zyph::page::StaticPage;
//! use zyph::parsers::{detect_platform, parser_for};
//!
//! let page = StaticPage::new(
//!     "https://claude.ai/chat/abc",
//!     r#"<div data-testid="user-message">hi</div><div class="font-claude-message">hello</div>"#,
//! );
//! let platform = detect_platform("https://claude.ai/chat/abc").unwrap();
//! let snapshot = parser_for(platform).extract_messages(&page);
//! assert_eq!(snapshot.len(), 2);
//! ```

use std::time::Duration;

use chrono::{DateTime, Utc};
use regex::Regex;
use serde::{Deserialize, Serialize};

use crate::models::{Message, Platform, Role};
use crate::page::{Document, DomEvent, Page, Toast};

pub mod chatgpt;
pub mod claude;
pub mod gemini;

pub use chatgpt::ChatGptParser;
pub use claude::ClaudeParser;
pub use gemini::GeminiParser;

/// Default visibility of the "context added" toast
pub const DEFAULT_TOAST_DURATION: Duration = Duration::from_millis(3000);

/// A conversation turn as currently rendered
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ParsedMessage {
    /// Author of the turn
    pub role: Role,
    /// Text with fenced code blocks appended
    pub content: String,
    /// When the snapshot was taken
    pub timestamp: DateTime<Utc>,
    /// Zero-based position in the conversation
    pub index: usize,
}

impl From<ParsedMessage> for Message {
    fn from(parsed: ParsedMessage) -> Self {
        Message {
            role: parsed.role,
            content: parsed.content,
            timestamp: parsed.timestamp,
        }
    }
}

/// All turns rendered at the moment of extraction
///
/// The snapshot owns its messages and can be iterated any number of times.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct MessageSnapshot {
    messages: Vec<ParsedMessage>,
}

impl MessageSnapshot {
    /// Build a snapshot from extracted turns, stamping them with `timestamp`
    pub fn from_turns(turns: Vec<(Role, String)>, timestamp: DateTime<Utc>) -> Self {
        let messages = turns
            .into_iter()
            .enumerate()
            .map(|(index, (role, content))| ParsedMessage {
                role,
                content,
                timestamp,
                index,
            })
            .collect();
        Self { messages }
    }

    /// Iterate over the turns in page order
    pub fn iter(&self) -> std::slice::Iter<'_, ParsedMessage> {
        self.messages.iter()
    }

    /// Number of turns
    pub fn len(&self) -> usize {
        self.messages.len()
    }

    /// Whether no turns were found
    pub fn is_empty(&self) -> bool {
        self.messages.is_empty()
    }

    /// Turn at `index`
    pub fn get(&self, index: usize) -> Option<&ParsedMessage> {
        self.messages.get(index)
    }

    /// Convert into storable messages
    pub fn into_messages(self) -> Vec<Message> {
        self.messages.into_iter().map(Message::from).collect()
    }
}

impl<'a> IntoIterator for &'a MessageSnapshot {
    type Item = &'a ParsedMessage;
    type IntoIter = std::slice::Iter<'a, ParsedMessage>;

    fn into_iter(self) -> Self::IntoIter {
        self.messages.iter()
    }
}

/// One way of finding turns in a page
pub struct Strategy {
    /// Name used in logs
    pub name: &'static str,
    /// Whether the page looks like this strategy's layout
    pub applies: fn(&Document) -> bool,
    /// Pull `(role, text)` pairs out of the page in order
    pub extract: fn(&Document) -> Vec<(Role, String)>,
}

impl std::fmt::Debug for Strategy {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Strategy").field("name", &self.name).finish()
    }
}

/// Run `strategies` in order and return the first non-empty result
pub fn run_strategies(doc: &Document, strategies: &[Strategy]) -> Vec<(Role, String)> {
    for strategy in strategies {
        if !(strategy.applies)(doc) {
            continue;
        }
        let turns: Vec<(Role, String)> = (strategy.extract)(doc)
            .into_iter()
            .filter(|(_, text)| !text.trim().is_empty())
            .collect();
        if !turns.is_empty() {
            tracing::debug!(
                "Strategy '{}' extracted {} messages",
                strategy.name,
                turns.len()
            );
            return turns;
        }
        tracing::debug!("Strategy '{}' matched but found no text", strategy.name);
    }
    tracing::warn!("No messages found on page");
    Vec::new()
}

/// Put `context` above whatever the user has already typed
///
/// # Examples
///
/// ```
/// use zyph::parsers::merge_context;
///
/// assert_eq!(merge_context("ctx", "hello"), "ctx\n\nhello");
/// assert_eq!(merge_context("ctx", "  "), "ctx");
/// ```
pub fn merge_context(context: &str, draft: &str) -> String {
    let context = context.trim_end();
    let draft = draft.trim();
    if draft.is_empty() {
        context.to_string()
    } else {
        format!("{}\n\n{}", context, draft)
    }
}

/// Site-specific conversation parser
pub trait PlatformParser: Send + Sync {
    /// Site this parser handles
    fn platform(&self) -> Platform;

    /// Host names served by the site
    fn hosts(&self) -> &'static [&'static str];

    /// Prompt field selectors, most specific first
    fn input_selectors(&self) -> &'static [&'static str];

    /// Extraction strategies, preferred layout first
    fn strategies(&self) -> &'static [Strategy];

    /// Whether `url` points at a fresh, not yet started conversation
    fn is_new_conversation(&self, url: &str) -> bool;

    /// Snapshot every turn currently rendered in `page`
    fn extract_messages(&self, page: &dyn Page) -> MessageSnapshot {
        let doc = Document::parse(&page.html());
        let turns = run_strategies(&doc, self.strategies());
        MessageSnapshot::from_turns(turns, Utc::now())
    }

    /// First prompt field selector that matches an element in `page`
    fn get_input_field(&self, page: &dyn Page) -> Option<&'static str> {
        let doc = Document::parse(&page.html());
        self.input_selectors()
            .iter()
            .copied()
            .find(|selector| doc.matches(selector))
    }

    /// Insert `context` above the current draft in the prompt field
    ///
    /// Returns `false` when the page has no recognizable prompt field.
    fn inject_context(&self, page: &mut dyn Page, context: &str, toast: Duration) -> bool {
        let Some(selector) = self.get_input_field(&*page) else {
            tracing::warn!("No input field found on {}", self.platform());
            return false;
        };

        let draft = page.input_value(selector).unwrap_or_default();
        let merged = merge_context(context, &draft);

        page.focus(selector);
        if !page.set_input_value(selector, &merged) {
            tracing::warn!("Failed to write input field {}", selector);
            return false;
        }
        page.dispatch(selector, DomEvent::Input);
        page.dispatch(selector, DomEvent::Change);
        page.show_toast(Toast {
            message: "Context added to conversation".to_string(),
            duration: toast,
        });

        tracing::info!("Injected {} chars of context on {}", context.len(), self.platform());
        true
    }
}

static CHATGPT: ChatGptParser = ChatGptParser;
static GEMINI: GeminiParser = GeminiParser;
static CLAUDE: ClaudeParser = ClaudeParser;

/// Parser for `platform`
pub fn parser_for(platform: Platform) -> &'static dyn PlatformParser {
    match platform {
        Platform::Chatgpt => &CHATGPT,
        Platform::Gemini => &GEMINI,
        Platform::Claude => &CLAUDE,
    }
}

/// Platform serving `url`, if supported
pub fn detect_platform(url: &str) -> Option<Platform> {
    let host = url::Url::parse(url).ok()?.host_str()?.to_ascii_lowercase();
    Platform::ALL
        .into_iter()
        .find(|p| parser_for(*p).hosts().iter().any(|h| host_matches(&host, h)))
}

/// Whether `host` is `domain` or one of its subdomains
pub(crate) fn host_matches(host: &str, domain: &str) -> bool {
    host == domain
        || host
            .strip_suffix(domain)
            .map_or(false, |prefix| prefix.ends_with('.'))
}

/// Path of `url` when its host belongs to `hosts`
pub(crate) fn path_on(url: &str, hosts: &[&str]) -> Option<String> {
    let parsed = url::Url::parse(url).ok()?;
    let host = parsed.host_str()?.to_ascii_lowercase();
    if hosts.iter().any(|h| host_matches(&host, h)) {
        Some(parsed.path().to_string())
    } else {
        None
    }
}

/// Match `path` against `pattern`, treating a bad pattern as no match
pub(crate) fn path_matches(pattern: &str, path: &str) -> bool {
    match Regex::new(pattern) {
        Ok(re) => re.is_match(path),
        Err(e) => {
            tracing::warn!("Invalid URL pattern {}: {}", pattern, e);
            false
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::page::StaticPage;

    #[test]
    fn test_detect_platform() {
        assert_eq!(
            detect_platform("https://chatgpt.com/c/123"),
            Some(Platform::Chatgpt)
        );
        assert_eq!(
            detect_platform("https://chat.openai.com/"),
            Some(Platform::Chatgpt)
        );
        assert_eq!(
            detect_platform("https://gemini.google.com/app"),
            Some(Platform::Gemini)
        );
        assert_eq!(
            detect_platform("https://claude.ai/new"),
            Some(Platform::Claude)
        );
        assert_eq!(detect_platform("https://notclaude.ai/"), None);
        assert_eq!(detect_platform("not a url"), None);
    }

    #[test]
    fn test_merge_context() {
        assert_eq!(merge_context("ctx", "hello"), "ctx\n\nhello");
        assert_eq!(merge_context("ctx\n", ""), "ctx");
    }

    #[test]
    fn test_snapshot_is_restartable() {
        let snapshot = MessageSnapshot::from_turns(
            vec![(Role::User, "a".into()), (Role::Assistant, "b".into())],
            Utc::now(),
        );
        let first: Vec<_> = snapshot.iter().map(|m| m.index).collect();
        let second: Vec<_> = (&snapshot).into_iter().map(|m| m.index).collect();
        assert_eq!(first, vec![0, 1]);
        assert_eq!(first, second);
    }

    #[test]
    fn test_run_strategies_falls_through() {
        fn never(_: &Document) -> bool {
            false
        }
        fn always(_: &Document) -> bool {
            true
        }
        fn empty(_: &Document) -> Vec<(Role, String)> {
            vec![(Role::User, "   ".into())]
        }
        fn one(_: &Document) -> Vec<(Role, String)> {
            vec![(Role::User, "hi".into())]
        }
        let strategies = [
            Strategy {
                name: "skipped",
                applies: never,
                extract: one,
            },
            Strategy {
                name: "blank",
                applies: always,
                extract: empty,
            },
            Strategy {
                name: "found",
                applies: always,
                extract: one,
            },
        ];
        let doc = Document::parse("");
        assert_eq!(
            run_strategies(&doc, &strategies),
            vec![(Role::User, "hi".to_string())]
        );
        assert!(run_strategies(&doc, &strategies[..1]).is_empty());
    }

    #[test]
    fn test_inject_without_field_returns_false() {
        let mut page = StaticPage::new("https://claude.ai/new", "<p>no input here</p>");
        assert!(!parser_for(Platform::Claude).inject_context(
            &mut page,
            "ctx",
            DEFAULT_TOAST_DURATION
        ));
        assert!(page.toasts().is_empty());
    }
}
