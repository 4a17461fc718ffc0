//! ChatGPT (chatgpt.com, chat.openai.com)

use scraper::ElementRef;

use crate::models::{Platform, Role};
use crate::page::document::{select_within, text_with_code_blocks};
use crate::page::Document;
use crate::parsers::{path_matches, path_on, PlatformParser, Strategy};

const HOSTS: &[&str] = &["chatgpt.com", "chat.openai.com"];

const INPUT_SELECTORS: &[&str] = &[
    "#prompt-textarea",
    r#"div[contenteditable="true"]#prompt-textarea"#,
    r#"textarea[data-id="root"]"#,
    "form textarea",
    r#"div[contenteditable="true"]"#,
];

const AUTHOR_ROLE: &str = "[data-message-author-role]";
const TURN_ARTICLE: &str = r#"article[data-testid^="conversation-turn"]"#;

static STRATEGIES: [Strategy; 2] = [
    Strategy {
        name: "author-role",
        applies: has_author_roles,
        extract: extract_author_roles,
    },
    Strategy {
        name: "turn-articles",
        applies: has_turn_articles,
        extract: extract_turn_articles,
    },
];

/// Parser for ChatGPT conversations
#[derive(Debug, Clone, Copy, Default)]
pub struct ChatGptParser;

impl PlatformParser for ChatGptParser {
    fn platform(&self) -> Platform {
        Platform::Chatgpt
    }

    fn hosts(&self) -> &'static [&'static str] {
        HOSTS
    }

    fn input_selectors(&self) -> &'static [&'static str] {
        INPUT_SELECTORS
    }

    fn strategies(&self) -> &'static [Strategy] {
        &STRATEGIES
    }

    /// Existing conversations live under `/c/<id>`
    fn is_new_conversation(&self, url: &str) -> bool {
        match path_on(url, HOSTS) {
            Some(path) => !path_matches(r"/c/[^/]+", &path),
            None => false,
        }
    }
}

fn has_author_roles(doc: &Document) -> bool {
    doc.matches(AUTHOR_ROLE)
}

fn extract_author_roles(doc: &Document) -> Vec<(Role, String)> {
    doc.select_all(AUTHOR_ROLE)
        .into_iter()
        .filter_map(|el| {
            let role = match el.value().attr("data-message-author-role") {
                Some("user") => Role::User,
                Some("assistant") => Role::Assistant,
                _ => return None,
            };
            Some((role, message_text(el)))
        })
        .collect()
}

fn has_turn_articles(doc: &Document) -> bool {
    doc.matches(TURN_ARTICLE)
}

/// Older layout: one `<article>` per turn, assistant turns render markdown
fn extract_turn_articles(doc: &Document) -> Vec<(Role, String)> {
    doc.select_all(TURN_ARTICLE)
        .into_iter()
        .map(|el| {
            let role = if select_within(el, ".markdown").is_empty() {
                Role::User
            } else {
                Role::Assistant
            };
            (role, message_text(el))
        })
        .collect()
}

fn message_text(el: ElementRef<'_>) -> String {
    let content = select_within(el, ".markdown")
        .into_iter()
        .chain(select_within(el, ".whitespace-pre-wrap"))
        .next()
        .unwrap_or(el);
    text_with_code_blocks(content)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::page::StaticPage;

    #[test]
    fn test_extracts_author_roles_in_order() {
        let page = StaticPage::new(
            "https://chatgpt.com/c/abc",
            r#"<main>
                <div data-message-author-role="user"><div class="whitespace-pre-wrap">What is Rust?</div></div>
                <div data-message-author-role="assistant"><div class="markdown"><p>A language.</p><pre><code class="language-rust">fn main() {}</code></pre></div></div>
                <div data-message-author-role="system">hidden</div>
            </main>"#,
        );
        let snapshot = ChatGptParser.extract_messages(&page);
        assert_eq!(snapshot.len(), 2);
        let first = snapshot.get(0).unwrap();
        assert_eq!(first.role, Role::User);
        assert_eq!(first.content, "What is Rust?");
        let second = snapshot.get(1).unwrap();
        assert_eq!(second.role, Role::Assistant);
        assert_eq!(second.content, "A language.\n\n```rust\nfn main() {}\n```");
    }

    #[test]
    fn test_falls_back_to_turn_articles() {
        let page = StaticPage::new(
            "https://chatgpt.com/c/abc",
            r#"<article data-testid="conversation-turn-1"><div class="whitespace-pre-wrap">hi</div></article>
               <article data-testid="conversation-turn-2"><div class="markdown">hello</div></article>"#,
        );
        let roles: Vec<Role> = ChatGptParser
            .extract_messages(&page)
            .iter()
            .map(|m| m.role)
            .collect();
        assert_eq!(roles, vec![Role::User, Role::Assistant]);
    }

    #[test]
    fn test_is_new_conversation() {
        assert!(ChatGptParser.is_new_conversation("https://chatgpt.com/"));
        assert!(ChatGptParser.is_new_conversation("https://chat.openai.com/?model=gpt-4"));
        assert!(!ChatGptParser.is_new_conversation("https://chatgpt.com/c/6701-abc"));
        assert!(!ChatGptParser.is_new_conversation("https://example.com/"));
    }

    #[test]
    fn test_input_field_priority() {
        let page = StaticPage::new(
            "https://chatgpt.com/",
            r#"<form><textarea name="q"></textarea></form><div id="prompt-textarea" contenteditable="true"></div>"#,
        );
        assert_eq!(
            ChatGptParser.get_input_field(&page),
            Some("#prompt-textarea")
        );
    }
}
