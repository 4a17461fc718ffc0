//! Claude (claude.ai)

use crate::models::{Platform, Role};
use crate::page::document::text_with_code_blocks;
use crate::page::Document;
use crate::parsers::{path_matches, path_on, PlatformParser, Strategy};

const HOSTS: &[&str] = &["claude.ai"];

const INPUT_SELECTORS: &[&str] = &[
    r#"div.ProseMirror[contenteditable="true"]"#,
    r#"[contenteditable="true"][role="textbox"]"#,
    "textarea",
];

const USER_MESSAGE: &str = r#"[data-testid="user-message"]"#;
// Combined selectors keep user and assistant turns in document order.
const FONT_TURNS: &str = r#"[data-testid="user-message"], .font-claude-message"#;
const STREAMING_TURNS: &str = r#"[data-testid="user-message"], [data-is-streaming]"#;

static STRATEGIES: [Strategy; 2] = [
    Strategy {
        name: "font-claude-message",
        applies: has_font_turns,
        extract: extract_font_turns,
    },
    Strategy {
        name: "streaming-container",
        applies: has_streaming_turns,
        extract: extract_streaming_turns,
    },
];

/// Parser for Claude conversations
#[derive(Debug, Clone, Copy, Default)]
pub struct ClaudeParser;

impl PlatformParser for ClaudeParser {
    fn platform(&self) -> Platform {
        Platform::Claude
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

    fn is_new_conversation(&self, url: &str) -> bool {
        match path_on(url, HOSTS) {
            Some(path) => path_matches(r"^/new/?$", &path),
            None => false,
        }
    }
}

fn has_font_turns(doc: &Document) -> bool {
    doc.matches(".font-claude-message")
}

fn extract_font_turns(doc: &Document) -> Vec<(Role, String)> {
    extract_combined(doc, FONT_TURNS)
}

fn has_streaming_turns(doc: &Document) -> bool {
    doc.matches("[data-is-streaming]") || doc.matches(USER_MESSAGE)
}

fn extract_streaming_turns(doc: &Document) -> Vec<(Role, String)> {
    extract_combined(doc, STREAMING_TURNS)
}

fn extract_combined(doc: &Document, selector: &str) -> Vec<(Role, String)> {
    doc.select_all(selector)
        .into_iter()
        .map(|el| {
            let role = if el.value().attr("data-testid") == Some("user-message") {
                Role::User
            } else {
                Role::Assistant
            };
            (role, text_with_code_blocks(el))
        })
        .collect()
}
