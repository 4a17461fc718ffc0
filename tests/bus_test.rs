//! Message bus integration tests

mod common;

use tokio_util::sync::CancellationToken;
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

use zyph::api::FolderRequest;
use zyph::bus::{serve, Action, BackgroundHandler, ContentScriptHandler, LocalBus, MessageBus, Response};
use zyph::error::ApiError;
use zyph::page::StaticPage;
use zyph::sync::{RetryPolicy, SyncOperation, SyncQueue};

use common::{authed_client, folder_json, memory_storage};

#[tokio::test]
async fn test_content_script_answers_over_the_bus() {
    let page = StaticPage::new(
        "https://docs.example.com/guide",
        "<title>Guide</title><article><p>Step one.</p></article>",
    )
    .with_selection("Step one");
    let (bus, inbox) = LocalBus::channel(4);
    let shutdown = CancellationToken::new();
    let server = tokio::spawn(serve(inbox, ContentScriptHandler::new(page), shutdown.clone()));

    match bus.send(Action::GetPageContent).await.unwrap() {
        Response::PageContent(content) => {
            assert_eq!(content.title, "Guide");
            assert_eq!(content.content, "Step one.");
            assert_eq!(content.selected_text, "Step one");
        }
        other => panic!("unexpected response: {:?}", other),
    }

    // queue processing belongs to the background worker
    assert!(matches!(
        bus.send(Action::ProcessRemoteQueue).await.unwrap(),
        Response::Error { .. }
    ));

    shutdown.cancel();
    server.await.unwrap();
    assert!(bus.send(Action::GetSelectedText).await.is_err());
}

#[tokio::test]
async fn test_restricted_page_over_the_bus() {
    let (bus, inbox) = LocalBus::channel(4);
    let shutdown = CancellationToken::new();
    let handler = ContentScriptHandler::new(StaticPage::new("about:blank", ""));
    let server = tokio::spawn(serve(inbox, handler, shutdown.clone()));

    assert_eq!(
        bus.send(Action::TriggerQuickCreate).await.unwrap(),
        Response::Restricted {
            url: "about:blank".into()
        }
    );

    drop(bus);
    server.await.unwrap();
}

#[tokio::test]
async fn test_background_processes_remote_queue() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/folders"))
        .respond_with(ResponseTemplate::new(201).set_body_json(folder_json("f9", "Inbox")))
        .expect(1)
        .mount(&server)
        .await;

    let storage = memory_storage();
    let client = authed_client(&server.uri(), storage.clone()).await;
    let queue = SyncQueue::new(storage.clone(), RetryPolicy::default());
    let item = queue
        .enqueue(
            SyncOperation::CreateFolder {
                request: FolderRequest::new("Inbox"),
            },
            &ApiError::network("offline"),
        )
        .await
        .unwrap();
    assert!(queue.retry(&item.id).await);

    let (bus, inbox) = LocalBus::channel(4);
    let shutdown = CancellationToken::new();
    let worker = tokio::spawn(serve(
        inbox,
        BackgroundHandler::new(client, queue.clone()),
        shutdown.clone(),
    ));

    match bus.send(Action::ProcessRemoteQueue).await.unwrap() {
        Response::QueueProcessed(report) => assert_eq!(report.delivered, 1),
        other => panic!("unexpected response: {:?}", other),
    }
    assert!(queue.list().await.is_empty());

    shutdown.cancel();
    worker.await.unwrap();
}
