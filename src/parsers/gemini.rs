//! Gemini (gemini.google.com)

use scraper::ElementRef;

use crate::models::{Platform, Role};
use crate::page::document::{select_within, text_with_code_blocks};
use crate::page::Document;
use crate::parsers::{path_matches, path_on, PlatformParser, Strategy};

const HOSTS: &[&str] = &["gemini.google.com"];

const INPUT_SELECTORS: &[&str] = &[
    "rich-textarea .ql-editor",
    r#"div.ql-editor[contenteditable="true"]"#,
    r#"[contenteditable="true"][role="textbox"]"#,
    "textarea",
];

const TURN_ELEMENTS: &str = "user-query, model-response";
const TURN_CLASSES: &str = ".query-text, .model-response-text";

static STRATEGIES: [Strategy; 2] = [
    Strategy {
        name: "turn-elements",
        applies: has_turn_elements,
        extract: extract_turn_elements,
    },
    Strategy {
        name: "turn-classes",
        applies: has_turn_classes,
        extract: extract_turn_classes,
    },
];

/// Parser for Gemini conversations
#[derive(Debug, Clone, Copy, Default)]
pub struct GeminiParser;

impl PlatformParser for GeminiParser {
    fn platform(&self) -> Platform {
        Platform::Gemini
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

    /// `/app` without a conversation id is a blank chat
    fn is_new_conversation(&self, url: &str) -> bool {
        match path_on(url, HOSTS) {
            Some(path) => path_matches(r"^(/u/\d+)?/app/?$", &path),
            None => false,
        }
    }
}

fn has_turn_elements(doc: &Document) -> bool {
    doc.matches(TURN_ELEMENTS)
}

fn extract_turn_elements(doc: &Document) -> Vec<(Role, String)> {
    doc.select_all(TURN_ELEMENTS)
        .into_iter()
        .map(|el| {
            if el.value().name() == "user-query" {
                (Role::User, first_text(el, ".query-text"))
            } else {
                (Role::Assistant, first_text(el, "message-content, .markdown"))
            }
        })
        .collect()
}

fn has_turn_classes(doc: &Document) -> bool {
    doc.matches(TURN_CLASSES)
}

fn extract_turn_classes(doc: &Document) -> Vec<(Role, String)> {
    doc.select_all(TURN_CLASSES)
        .into_iter()
        .map(|el| {
            let role = if el.value().classes().any(|c| c == "query-text") {
                Role::User
            } else {
                Role::Assistant
            };
            (role, text_with_code_blocks(el))
        })
        .collect()
}

fn first_text(el: ElementRef<'_>, selector: &str) -> String {
    let content = select_within(el, selector).into_iter().next().unwrap_or(el);
    text_with_code_blocks(content)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::page::StaticPage;

    #[test]
    fn test_extracts_query_and_response() {
        let page = StaticPage::new(
            "https://gemini.google.com/app/1a2b",
            r#"<div class="conversation-container">
                <user-query><div class="query-text"><p>Explain sled</p></div></user-query>
                <model-response><message-content><div class="markdown"><p>An embedded database.</p></div></message-content></model-response>
            </div>"#,
        );
        let snapshot = GeminiParser.extract_messages(&page);
        assert_eq!(snapshot.len(), 2);
        assert_eq!(snapshot.get(0).unwrap().content, "Explain sled");
        assert_eq!(snapshot.get(1).unwrap().role, Role::Assistant);
        assert_eq!(snapshot.get(1).unwrap().content, "An embedded database.");
    }

    #[test]
    fn test_falls_back_to_classes() {
        let page = StaticPage::new(
            "https://gemini.google.com/app/1a2b",
            r#"<div class="query-text">q</div><div class="model-response-text">a</div>"#,
        );
        assert_eq!(GeminiParser.extract_messages(&page).len(), 2);
    }

    #[test]
    fn test_is_new_conversation() {
        assert!(GeminiParser.is_new_conversation("https://gemini.google.com/app"));
        assert!(GeminiParser.is_new_conversation("https://gemini.google.com/u/1/app/"));
        assert!(!GeminiParser.is_new_conversation("https://gemini.google.com/app/1a2b3c"));
        assert!(!GeminiParser.is_new_conversation("https://claude.ai/app"));
    }

    #[test]
    fn test_empty_page_has_no_messages() {
        let page = StaticPage::new("https://gemini.google.com/app", "<div></div>");
        assert!(GeminiParser.extract_messages(&page).is_empty());
    }
}
