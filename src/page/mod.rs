//! Page port: the live document a content script operates on
//!
//! Parsers and content capture never touch a browser directly. They read
//! the current HTML through [`Page::html`] and perform the few mutations
//! they need (filling the prompt field, dispatching synthetic events,
//! showing a toast or banner) through the remaining methods. A browser host
//! implements [`Page`] over the real DOM; [`StaticPage`] implements it over
//! a saved HTML document for the CLI and tests.

use std::time::Duration;

use serde::{Deserialize, Serialize};

pub mod document;
pub mod static_page;

pub use document::Document;
pub use static_page::StaticPage;

/// Synthetic events dispatched after programmatic edits so the host page's
/// framework observes the change
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DomEvent {
    /// `input` event (bubbling)
    Input,
    /// `change` event (bubbling)
    Change,
}

/// Transient notification shown in the page corner
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Toast {
    /// Text shown to the user
    pub message: String,
    /// How long the toast stays visible
    pub duration: Duration,
}

/// Banner injected at the top of the page, removed after `dismiss_after`
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Banner {
    /// Headline
    pub title: String,
    /// Explanatory text
    pub message: String,
    /// Auto-dismiss delay
    pub dismiss_after: Duration,
}

/// The document a content script runs in.
///
/// Mutating methods return `false` when no element matches `selector`;
/// callers treat that as a silent, non-fatal failure.
pub trait Page {
    /// Current page URL
    fn url(&self) -> String;

    /// Serialized current DOM
    fn html(&self) -> String;

    /// Text currently selected by the user, if any
    fn selection(&self) -> Option<String>;

    /// Current text of the first element matching `selector` (form value
    /// for `input`/`textarea`, text content for editable elements)
    fn input_value(&self, selector: &str) -> Option<String>;

    /// Replace the text of the first element matching `selector`
    fn set_input_value(&mut self, selector: &str, value: &str) -> bool;

    /// Move focus to the first element matching `selector`
    fn focus(&mut self, selector: &str) -> bool;

    /// Dispatch a synthetic event on the first element matching `selector`
    fn dispatch(&mut self, selector: &str, event: DomEvent) -> bool;

    /// Show a transient toast
    fn show_toast(&mut self, toast: Toast);

    /// Inject a banner into the page
    fn show_banner(&mut self, banner: Banner);
}
