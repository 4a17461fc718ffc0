//! Message passing between extension contexts
//!
//! The popup, the background worker and content scripts talk by sending an
//! [`Action`] and awaiting a single [`Response`]. [`MessageBus`] is the
//! sending side of that exchange; [`LocalBus`] implements it over tokio
//! channels, with [`serve`] driving any [`ActionHandler`] on the receiving
//! side.
//!
//! # Examples
//!
//! ```
//! use zyph::bus::{serve, Action, ContentScriptHandler, LocalBus, MessageBus, Response};
//! use zyph::page::StaticPage;
//! use tokio_util::sync::CancellationToken;
//!
//! # #[tokio::main]
//! # async fn main() -> anyhow::Result<()> {
//! let (bus, inbox) = LocalBus::channel(8);
//! let page = StaticPage::new("https://example.com", "").with_selection("picked");
//! let shutdown = CancellationToken::new();
//! let server = tokio::spawn(serve(inbox, ContentScriptHandler::new(page), shutdown.clone()));
//!
//! let response = bus.send(Action::GetSelectedText).await?;
//! assert_eq!(response, Response::SelectedText { text: "picked".into() });
//!
//! shutdown.cancel();
//! server.await?;
//! # Ok(())
//! # }
//! ```

use std::time::Duration;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tokio::sync::{mpsc, oneshot};
use tokio_util::sync::CancellationToken;

use crate::api::ApiClient;
use crate::capture::{
    capture_page, get_selected_text, is_restricted_url, show_restricted_warning, PageContent,
    DEFAULT_WARNING_DISMISS,
};
use crate::error::{Result, ZyphError};
use crate::page::Page;
use crate::sync::{SyncQueue, SyncReport};

/// Requests exchanged between extension contexts
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "action", rename_all = "camelCase")]
pub enum Action {
    /// Capture the active page
    GetPageContent,
    /// Read the current selection
    GetSelectedText,
    /// Tell the user the page cannot be captured
    ShowRestrictedWarning,
    /// Collect what the quick-create dialog is prefilled with
    TriggerQuickCreate,
    /// Run one pass over the sync queue
    ProcessRemoteQueue,
}

/// Reply to an [`Action`]
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "camelCase")]
pub enum Response {
    PageContent(Box<PageContent>),
    #[serde(rename_all = "camelCase")]
    SelectedText {
        text: String,
    },
    #[serde(rename_all = "camelCase")]
    QuickCreate {
        title: String,
        url: String,
        selected_text: String,
    },
    QueueProcessed(SyncReport),
    /// The page is off limits to content scripts
    Restricted {
        url: String,
    },
    /// Action handled, nothing to return
    Ack,
    Error {
        message: String,
    },
}

impl Response {
    fn unsupported(action: &Action, context: &str) -> Self {
        Response::Error {
            message: format!("{:?} is not handled by the {}", action, context),
        }
    }
}

/// Sending side of the bus
#[async_trait]
pub trait MessageBus: Send + Sync {
    /// Send `action` and wait for its response
    async fn send(&self, action: Action) -> Result<Response>;
}

/// Receiving side of the bus
#[async_trait]
pub trait ActionHandler: Send {
    async fn handle(&mut self, action: Action) -> Response;
}

type Envelope = (Action, oneshot::Sender<Response>);

/// In-process bus over a bounded tokio channel
#[derive(Debug, Clone)]
pub struct LocalBus {
    tx: mpsc::Sender<Envelope>,
}

/// Receiving end of a [`LocalBus`]
#[derive(Debug)]
pub struct Inbox {
    rx: mpsc::Receiver<Envelope>,
}

impl LocalBus {
    /// Create a bus and the inbox its messages arrive at
    pub fn channel(capacity: usize) -> (Self, Inbox) {
        let (tx, rx) = mpsc::channel(capacity.max(1));
        (Self { tx }, Inbox { rx })
    }
}

#[async_trait]
impl MessageBus for LocalBus {
    async fn send(&self, action: Action) -> Result<Response> {
        let (reply_tx, reply_rx) = oneshot::channel();
        tracing::debug!("Sending {:?}", action);
        self.tx
            .send((action, reply_tx))
            .await
            .map_err(|_| ZyphError::Bus("Receiving end has shut down".to_string()))?;
        let response = reply_rx
            .await
            .map_err(|_| ZyphError::Bus("Handler dropped the request".to_string()))?;
        Ok(response)
    }
}

/// Answer actions arriving at `inbox` with `handler` until `shutdown` is
/// cancelled or every sender is dropped
pub async fn serve<H: ActionHandler>(
    mut inbox: Inbox,
    mut handler: H,
    shutdown: CancellationToken,
) {
    loop {
        tokio::select! {
            biased;

            _ = shutdown.cancelled() => break,

            envelope = inbox.rx.recv() => {
                let Some((action, reply)) = envelope else {
                    break;
                };
                let response = handler.handle(action).await;
                if reply.send(response).is_err() {
                    tracing::debug!("Sender stopped waiting for a response");
                }
            }
        }
    }
    tracing::debug!("Bus handler stopped");
}

/// Answers page actions from inside a content script
#[derive(Debug)]
pub struct ContentScriptHandler<P> {
    page: P,
    warning_dismiss: Duration,
}

impl<P: Page + Send> ContentScriptHandler<P> {
    pub fn new(page: P) -> Self {
        Self {
            page,
            warning_dismiss: DEFAULT_WARNING_DISMISS,
        }
    }

    /// Override how long the restricted-page banner stays up
    pub fn with_warning_dismiss(mut self, dismiss: Duration) -> Self {
        self.warning_dismiss = dismiss;
        self
    }

    pub fn page(&self) -> &P {
        &self.page
    }

    pub fn into_page(self) -> P {
        self.page
    }
}

#[async_trait]
impl<P: Page + Send> ActionHandler for ContentScriptHandler<P> {
    async fn handle(&mut self, action: Action) -> Response {
        let url = self.page.url();
        match action {
            Action::ShowRestrictedWarning => {
                show_restricted_warning(&mut self.page, self.warning_dismiss);
                Response::Ack
            }
            _ if is_restricted_url(&url) => Response::Restricted { url },
            Action::GetPageContent => Response::PageContent(Box::new(capture_page(&self.page))),
            Action::GetSelectedText => Response::SelectedText {
                text: get_selected_text(&self.page),
            },
            Action::TriggerQuickCreate => {
                let content = capture_page(&self.page);
                Response::QuickCreate {
                    title: content.title,
                    url: content.url,
                    selected_text: content.selected_text,
                }
            }
            other => Response::unsupported(&other, "content script"),
        }
    }
}

/// Answers actions addressed to the background worker
#[derive(Debug, Clone)]
pub struct BackgroundHandler {
    client: ApiClient,
    queue: SyncQueue,
}

impl BackgroundHandler {
    pub fn new(client: ApiClient, queue: SyncQueue) -> Self {
        Self { client, queue }
    }
}

#[async_trait]
impl ActionHandler for BackgroundHandler {
    async fn handle(&mut self, action: Action) -> Response {
        match action {
            Action::ProcessRemoteQueue => {
                let report = self.queue.process(&self.client, chrono::Utc::now()).await;
                Response::QueueProcessed(report)
            }
            other => Response::unsupported(&other, "background worker"),
        }
    }
}
