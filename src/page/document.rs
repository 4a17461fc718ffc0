//! Parsed HTML snapshot with forgiving selector helpers
//!
//! Selector lists are maintained by hand and drift as host sites change, so
//! an invalid selector or a missing node is never an error here: lookups
//! log a warning and return nothing.

use scraper::{ElementRef, Html, Node, Selector};

/// Elements whose text never contributes to extracted content
const SKIPPED_TAGS: &[&str] = &["script", "style", "noscript", "svg", "template"];

/// Elements that start a new line in extracted text
const BLOCK_TAGS: &[&str] = &[
    "address",
    "article",
    "aside",
    "blockquote",
    "br",
    "dd",
    "div",
    "dl",
    "dt",
    "figcaption",
    "footer",
    "h1",
    "h2",
    "h3",
    "h4",
    "h5",
    "h6",
    "header",
    "hr",
    "li",
    "main",
    "nav",
    "ol",
    "p",
    "section",
    "table",
    "td",
    "th",
    "tr",
    "ul",
];

/// A parsed, read-only HTML document
pub struct Document {
    html: Html,
}

impl std::fmt::Debug for Document {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Document").finish_non_exhaustive()
    }
}

impl Document {
    /// Parse a full HTML document. Parsing never fails; malformed markup is
    /// repaired the way browsers repair it.
    pub fn parse(html: &str) -> Self {
        Self {
            html: Html::parse_document(html),
        }
    }

    /// All elements matching `selector` in document order
    pub fn select_all(&self, selector: &str) -> Vec<ElementRef<'_>> {
        match parse_selector(selector) {
            Some(sel) => self.html.select(&sel).collect(),
            None => Vec::new(),
        }
    }

    /// First element matching `selector`
    pub fn select_first(&self, selector: &str) -> Option<ElementRef<'_>> {
        let sel = parse_selector(selector)?;
        self.html.select(&sel).next()
    }

    /// Whether any element matches `selector`
    pub fn matches(&self, selector: &str) -> bool {
        self.select_first(selector).is_some()
    }

    /// Trimmed `<title>` text
    pub fn title(&self) -> Option<String> {
        self.select_first("title")
            .map(|t| collapse_whitespace(&t.text().collect::<String>()))
            .filter(|t| !t.is_empty())
    }

    /// Block-aware text of the `<body>`
    pub fn body_text(&self) -> String {
        self.select_first("body").map(element_text).unwrap_or_default()
    }
}

/// Parse a CSS selector, logging and discarding invalid ones
pub fn parse_selector(selector: &str) -> Option<Selector> {
    match Selector::parse(selector) {
        Ok(sel) => Some(sel),
        Err(e) => {
            tracing::warn!("Ignoring invalid selector {:?}: {:?}", selector, e);
            None
        }
    }
}

/// Elements matching `selector` below `element`, in document order
pub fn select_within<'a>(element: ElementRef<'a>, selector: &str) -> Vec<ElementRef<'a>> {
    match parse_selector(selector) {
        Some(sel) => element.select(&sel).collect(),
        None => Vec::new(),
    }
}

/// Collapse runs of whitespace into single spaces and trim
pub fn collapse_whitespace(text: &str) -> String {
    text.split_whitespace().collect::<Vec<_>>().join(" ")
}

/// Block-aware plain text of `element`
///
/// Text nodes are walked in order; block elements introduce line breaks,
/// whitespace inside a line is collapsed and blank lines are dropped.
/// Each line of a `<pre>` block becomes its own text line.
pub fn element_text(element: ElementRef<'_>) -> String {
    let mut raw = String::new();
    walk_text(element, &mut raw, false);
    normalize_lines(&raw)
}

/// Text of `element` with its code blocks appended as fenced blocks
///
/// Text outside code blocks is extracted as in [`element_text`]. Every
/// `<pre>` element, and every `<code class="language-*">` outside a `<pre>`,
/// is then appended as a fenced block tagged with its language.
pub fn text_with_code_blocks(element: ElementRef<'_>) -> String {
    let mut raw = String::new();
    walk_text(element, &mut raw, true);
    let mut out = normalize_lines(&raw);

    for block in code_blocks(element) {
        if !out.is_empty() {
            out.push_str("\n\n");
        }
        out.push_str("```");
        out.push_str(&block.language);
        out.push('\n');
        out.push_str(&block.code);
        out.push_str("\n```");
    }
    out
}

/// A code block found in rendered content
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CodeBlock {
    /// Language from a `language-*`/`lang-*` class, empty when unknown
    pub language: String,
    /// Code text with trailing newlines removed
    pub code: String,
}

/// Code blocks below `element` in document order
pub fn code_blocks(element: ElementRef<'_>) -> Vec<CodeBlock> {
    let mut blocks = Vec::new();
    for candidate in select_within(element, "pre, code") {
        let is_pre = candidate.value().name() == "pre";
        if !is_pre && (inside_tag(candidate, "pre") || language_of(candidate).is_none()) {
            continue;
        }
        let code_el = if is_pre {
            select_within(candidate, "code")
                .into_iter()
                .next()
                .unwrap_or(candidate)
        } else {
            candidate
        };
        let code = code_el
            .text()
            .collect::<String>()
            .trim_end_matches(&['\n', '\r'][..])
            .to_string();
        if code.trim().is_empty() {
            continue;
        }
        let language = language_of(code_el)
            .or_else(|| language_of(candidate))
            .unwrap_or_default();
        blocks.push(CodeBlock { language, code });
    }
    blocks
}

fn language_of(element: ElementRef<'_>) -> Option<String> {
    element.value().classes().find_map(|class| {
        class
            .strip_prefix("language-")
            .or_else(|| class.strip_prefix("lang-"))
            .map(str::to_string)
    })
}

fn inside_tag(element: ElementRef<'_>, tag: &str) -> bool {
    element.ancestors().any(|node| match node.value() {
        Node::Element(e) => e.name() == tag,
        _ => false,
    })
}

fn walk_text(element: ElementRef<'_>, out: &mut String, skip_code: bool) {
    for child in element.children() {
        match child.value() {
            Node::Text(text) => out.push_str(text),
            Node::Element(el) => {
                let name = el.name();
                if SKIPPED_TAGS.contains(&name) {
                    continue;
                }
                let Some(child_el) = ElementRef::wrap(child) else {
                    continue;
                };
                if skip_code
                    && (name == "pre" || (name == "code" && language_of(child_el).is_some()))
                {
                    out.push('\n');
                    continue;
                }
                if name == "pre" {
                    out.push('\n');
                    for line in child_el.text().collect::<String>().lines() {
                        out.push_str(line);
                        out.push('\n');
                    }
                    continue;
                }
                let block = BLOCK_TAGS.contains(&name);
                if block {
                    out.push('\n');
                }
                walk_text(child_el, out, skip_code);
                if block {
                    out.push('\n');
                }
            }
            _ => {}
        }
    }
}

fn normalize_lines(raw: &str) -> String {
    raw.lines()
        .map(collapse_whitespace)
        .filter(|line| !line.is_empty())
        .collect::<Vec<_>>()
        .join("\n")
}
