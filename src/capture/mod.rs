//! Page capture for the knowledge base
//!
//! [`capture_page`] turns whatever page the user is looking at into a
//! [`PageContent`] record: title, URL, favicon, readable main text, raw
//! HTML, `<meta>` metadata and the current selection. Browser-internal pages
//! cannot be read by an extension at all; [`is_restricted_url`] detects them
//! and [`show_restricted_warning`] tells the user instead of failing.

use std::collections::BTreeMap;
use std::time::Duration;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use url::Url;

use crate::page::document::{collapse_whitespace, element_text};
use crate::page::{Banner, Document, Page};

/// Default lifetime of the restricted-page banner
pub const DEFAULT_WARNING_DISMISS: Duration = Duration::from_millis(5000);

/// Number of paragraphs kept by the longest-paragraph fallback
pub const FALLBACK_PARAGRAPHS: usize = 10;

/// Containers that usually hold an article's readable text, in priority order
const MAIN_SELECTORS: &[&str] = &[
    "main",
    "article",
    r#"[role="main"]"#,
    "#content",
    ".content",
    "#main",
    ".main",
    ".post",
    ".entry-content",
];

const FAVICON_SELECTORS: &[&str] = &[
    r#"link[rel="icon"]"#,
    r#"link[rel="shortcut icon"]"#,
    r#"link[rel="apple-touch-icon"]"#,
];

const RESTRICTED_PREFIXES: &[&str] = &[
    "chrome://",
    "chrome-extension://",
    "edge://",
    "about:",
    "view-source:",
    "devtools://",
    "https://chrome.google.com/webstore",
    "https://chromewebstore.google.com",
];

/// `<meta>` derived page metadata
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PageMetadata {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub keywords: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub author: Option<String>,
    /// `<link rel="canonical">` target
    #[serde(skip_serializing_if = "Option::is_none")]
    pub canonical: Option<String>,
    /// `og:*` properties keyed without the prefix
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub open_graph: BTreeMap<String, String>,
    /// `twitter:*` names keyed without the prefix
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub twitter: BTreeMap<String, String>,
}

/// Everything captured from a page
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PageContent {
    pub title: String,
    pub url: String,
    pub favicon: Option<String>,
    /// Readable text of the page
    pub content: String,
    /// Raw serialized document
    pub html: String,
    pub metadata: PageMetadata,
    /// Current selection, empty when nothing is selected
    pub selected_text: String,
    pub captured_at: DateTime<Utc>,
}

/// Capture the page currently shown in `page`
///
/// # Examples
///
/// ```
/// use zyph::capture::capture_page;
/// use zyph::page::StaticPage;
///
/// let page = StaticPage::new(
///     "https://example.com/post",
///     "<html><head><title>Post</title></head><body><article>Body text</article></body></html>",
/// );
/// let content = capture_page(&page);
/// assert_eq!(content.title, "Post");
/// assert_eq!(content.content, "Body text");
/// assert_eq!(content.favicon.as_deref(), Some("https://example.com/favicon.ico"));
/// ```
pub fn capture_page(page: &dyn Page) -> PageContent {
    let url = page.url();
    let html = page.html();
    let doc = Document::parse(&html);

    let content = PageContent {
        title: doc.title().unwrap_or_default(),
        favicon: favicon(&doc, &url),
        content: main_content(&doc),
        metadata: metadata(&doc),
        selected_text: get_selected_text(page),
        captured_at: Utc::now(),
        url,
        html,
    };
    tracing::debug!(
        "Captured {} ({} chars of content)",
        content.url,
        content.content.len()
    );
    content
}

/// The user's current selection, or an empty string
pub fn get_selected_text(page: &dyn Page) -> String {
    page.selection()
        .map(|s| s.trim().to_string())
        .unwrap_or_default()
}

/// Readable text of the document
///
/// The first semantic container with non-empty text wins. Without one, the
/// ten longest paragraphs are joined longest first; failing that the whole
/// body text is used.
pub fn main_content(doc: &Document) -> String {
    for selector in MAIN_SELECTORS {
        if let Some(el) = doc.select_first(selector) {
            let text = element_text(el);
            if !text.is_empty() {
                tracing::debug!("Main content from '{}'", selector);
                return text;
            }
        }
    }

    let mut paragraphs: Vec<String> = doc
        .select_all("p")
        .into_iter()
        .map(|p| collapse_whitespace(&p.text().collect::<String>()))
        .filter(|p| !p.is_empty())
        .collect();
    if !paragraphs.is_empty() {
        // stable sort keeps document order among equal lengths
        paragraphs.sort_by(|a, b| b.chars().count().cmp(&a.chars().count()));
        paragraphs.truncate(FALLBACK_PARAGRAPHS);
        return paragraphs.join("\n\n");
    }

    doc.body_text()
}

/// Whether an extension is barred from reading `url`
///
/// # Examples
///
/// ```
/// use zyph::capture::is_restricted_url;
///
/// assert!(is_restricted_url("chrome://settings"));
/// assert!(!is_restricted_url("file:///home/me/notes.html"));
/// ```
pub fn is_restricted_url(url: &str) -> bool {
    let url = url.trim();
    if url.is_empty() {
        return true;
    }
    let lower = url.to_ascii_lowercase();
    RESTRICTED_PREFIXES
        .iter()
        .any(|prefix| lower.starts_with(prefix))
}

/// Tell the user this page cannot be captured
pub fn show_restricted_warning(page: &mut dyn Page, dismiss_after: Duration) {
    tracing::info!("Restricted page: {}", page.url());
    page.show_banner(Banner {
        title: "Zyph can't capture this page".to_string(),
        message: "Browser pages such as chrome:// URLs and the Chrome Web Store do not allow \
                  extensions to read their content. Open a regular web page and try again."
            .to_string(),
        dismiss_after,
    });
}

fn favicon(doc: &Document, page_url: &str) -> Option<String> {
    let base = Url::parse(page_url).ok();
    for selector in FAVICON_SELECTORS {
        let Some(href) = doc
            .select_first(selector)
            .and_then(|el| el.value().attr("href"))
            .map(str::trim)
            .filter(|h| !h.is_empty())
        else {
            continue;
        };
        let resolved = match &base {
            Some(base) => base.join(href).map(|u| u.to_string()).ok(),
            None => Some(href.to_string()),
        };
        if resolved.is_some() {
            return resolved;
        }
    }
    let base = base?;
    if !matches!(base.scheme(), "http" | "https") {
        return None;
    }
    base.join("/favicon.ico").map(|u| u.to_string()).ok()
}

fn metadata(doc: &Document) -> PageMetadata {
    let mut meta = PageMetadata::default();
    for el in doc.select_all("meta[content]") {
        let attrs = el.value();
        let Some(content) = attrs.attr("content").map(str::trim) else {
            continue;
        };
        if content.is_empty() {
            continue;
        }
        let key = attrs
            .attr("property")
            .or_else(|| attrs.attr("name"))
            .map(|k| k.trim().to_ascii_lowercase())
            .unwrap_or_default();
        match key.as_str() {
            "description" => meta.description = Some(content.to_string()),
            "keywords" => meta.keywords = Some(content.to_string()),
            "author" => meta.author = Some(content.to_string()),
            k => {
                if let Some(name) = k.strip_prefix("og:") {
                    meta.open_graph.insert(name.to_string(), content.to_string());
                } else if let Some(name) = k.strip_prefix("twitter:") {
                    meta.twitter.insert(name.to_string(), content.to_string());
                }
            }
        }
    }
    meta.canonical = doc
        .select_first(r#"link[rel="canonical"]"#)
        .and_then(|el| el.value().attr("href"))
        .map(str::to_string);
    meta
}
