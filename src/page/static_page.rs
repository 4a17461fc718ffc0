//! [`Page`] implementation over a saved HTML document
//!
//! The HTML itself is never rewritten. Edits made through
//! [`Page::set_input_value`] are kept as overlays keyed by selector, and
//! focus changes, dispatched events, toasts and banners are recorded so they
//! can be inspected afterwards.

use std::collections::HashMap;

use crate::page::document::{element_text, Document};
use crate::page::{Banner, DomEvent, Page, Toast};

/// A page loaded from HTML text
#[derive(Debug, Clone, Default)]
pub struct StaticPage {
    url: String,
    html: String,
    selection: Option<String>,
    values: HashMap<String, String>,
    focused: Option<String>,
    events: Vec<(String, DomEvent)>,
    toasts: Vec<Toast>,
    banners: Vec<Banner>,
}

impl StaticPage {
    /// Create a page from its URL and HTML
    ///
    /// # Examples
    ///
    /// ```
    /// use zyph::page::{Page, StaticPage};
    ///
    /// let page = StaticPage::new("https://example.com", "<textarea id='q'>hi</textarea>");
    /// assert_eq!(page.input_value("#q").as_deref(), Some("hi"));
    /// ```
    pub fn new(url: impl Into<String>, html: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            html: html.into(),
            ..Default::default()
        }
    }

    /// Set the user's current text selection
    pub fn with_selection(mut self, selection: impl Into<String>) -> Self {
        self.selection = Some(selection.into());
        self
    }

    /// Replace the document, keeping recorded interactions
    pub fn set_html(&mut self, html: impl Into<String>) {
        self.html = html.into();
    }

    /// Navigate to another URL
    pub fn set_url(&mut self, url: impl Into<String>) {
        self.url = url.into();
    }

    /// Selector that last received focus
    pub fn focused(&self) -> Option<&str> {
        self.focused.as_deref()
    }

    /// Events dispatched so far, in order
    pub fn events(&self) -> &[(String, DomEvent)] {
        &self.events
    }

    /// Toasts shown so far
    pub fn toasts(&self) -> &[Toast] {
        &self.toasts
    }

    /// Banners shown so far
    pub fn banners(&self) -> &[Banner] {
        &self.banners
    }

    fn has_match(&self, selector: &str) -> bool {
        Document::parse(&self.html).matches(selector)
    }
}

impl Page for StaticPage {
    fn url(&self) -> String {
        self.url.clone()
    }

    fn html(&self) -> String {
        self.html.clone()
    }

    fn selection(&self) -> Option<String> {
        self.selection.clone().filter(|s| !s.trim().is_empty())
    }

    fn input_value(&self, selector: &str) -> Option<String> {
        if let Some(value) = self.values.get(selector) {
            return Some(value.clone());
        }
        let doc = Document::parse(&self.html);
        let element = doc.select_first(selector)?;
        let value = match element.value().name() {
            "input" => element.value().attr("value").unwrap_or_default().to_string(),
            "textarea" => element.text().collect::<String>(),
            _ => element_text(element),
        };
        Some(value)
    }

    fn set_input_value(&mut self, selector: &str, value: &str) -> bool {
        if !self.has_match(selector) {
            return false;
        }
        self.values.insert(selector.to_string(), value.to_string());
        true
    }

    fn focus(&mut self, selector: &str) -> bool {
        if !self.has_match(selector) {
            return false;
        }
        self.focused = Some(selector.to_string());
        true
    }

    fn dispatch(&mut self, selector: &str, event: DomEvent) -> bool {
        if !self.has_match(selector) {
            return false;
        }
        self.events.push((selector.to_string(), event));
        true
    }

    fn show_toast(&mut self, toast: Toast) {
        tracing::debug!("Toast: {}", toast.message);
        self.toasts.push(toast);
    }

    fn show_banner(&mut self, banner: Banner) {
        tracing::debug!("Banner: {}", banner.title);
        self.banners.push(banner);
    }
}
