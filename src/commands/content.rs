//! Page capture, conversation parsing and knowledge-base content commands
//!
//! Saved HTML files stand in for the live tab: `capture` runs the same
//! extraction a content script would, and `parse` runs the platform
//! parser for the chat site the URL belongs to.

use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::api::{FileUpload, IngestRequest, SearchRequest};
use crate::capture::{capture_page, is_restricted_url, PageContent};
use crate::commands::folders::truncate;
use crate::commands::AppContext;
use crate::error::{Result, ZyphError};
use crate::models::{Conversation, LocalContentItem};
use crate::monitor::{ConversationMonitor, EndReason, PageEvent};
use crate::page::{Page, StaticPage};
use crate::parsers::{detect_platform, parser_for};
use crate::sync::{SubmitOutcome, SyncOperation};
use colored::Colorize;
use prettytable::{format, Table};
use tokio::sync::mpsc;

/// Options for [`capture`]
#[derive(Debug, Clone)]
pub struct CaptureArgs {
    pub html: PathBuf,
    pub url: String,
    pub selection: Option<String>,
    pub save: bool,
    pub folder: Option<String>,
    pub json: bool,
}

/// Options for [`ingest`]
#[derive(Debug, Clone)]
pub struct IngestArgs {
    pub folder: String,
    pub title: String,
    pub content: Option<String>,
    pub file: Option<PathBuf>,
    pub source_url: Option<String>,
    pub queue: bool,
}

async fn load_page(html: &Path, url: &str) -> Result<StaticPage> {
    let markup = tokio::fs::read_to_string(html).await.map_err(|e| {
        ZyphError::Capture(format!("Failed to read {}: {}", html.display(), e))
    })?;
    Ok(StaticPage::new(url, markup))
}

/// Capture a saved page, optionally keeping it locally and sending it to a folder
pub async fn capture(ctx: &AppContext, args: CaptureArgs) -> Result<()> {
    if is_restricted_url(&args.url) {
        return Err(ZyphError::Capture(format!(
            "{} is a browser page and cannot be captured",
            args.url
        ))
        .into());
    }

    let mut page = load_page(&args.html, &args.url).await?;
    if let Some(selection) = args.selection {
        page = page.with_selection(selection);
    }
    let content = capture_page(&page);

    let mut local_id = None;
    if args.save {
        let item = local_item(&content);
        if ctx.storage.save_content_item(&item).await {
            tracing::info!("Saved capture locally as {}", item.id);
            local_id = Some(item.id);
        } else {
            tracing::warn!("Could not save capture locally");
        }
    }

    if args.json {
        println!("{}", serde_json::to_string_pretty(&content)?);
    } else {
        print_capture(&content);
    }

    if let Some(folder) = args.folder {
        let request = ingest_request(&content, folder);
        request.validate()?;
        let outcome = ctx
            .queue
            .submit(&ctx.client, SyncOperation::IngestContent { request, local_id })
            .await?;
        report_submit(outcome);
    }
    Ok(())
}

fn local_item(content: &PageContent) -> LocalContentItem {
    let body = if content.selected_text.is_empty() {
        &content.content
    } else {
        &content.selected_text
    };
    let mut item = LocalContentItem::new(display_title(content), body.clone());
    item.source_url = Some(content.url.clone());
    item
}

fn ingest_request(content: &PageContent, folder: String) -> IngestRequest {
    let body = if content.selected_text.is_empty() {
        content.content.clone()
    } else {
        content.selected_text.clone()
    };
    let metadata = serde_json::json!({
        "favicon": content.favicon,
        "description": content.metadata.description,
        "author": content.metadata.author,
        "capturedAt": content.captured_at,
    });
    IngestRequest::new(display_title(content), body, folder)
        .with_source_url(content.url.clone())
        .with_metadata(metadata)
}

fn display_title(content: &PageContent) -> String {
    if content.title.trim().is_empty() {
        content.url.clone()
    } else {
        content.title.clone()
    }
}

fn print_capture(content: &PageContent) {
    println!("{} {}", "Title:".bold(), display_title(content));
    println!("{} {}", "URL:".bold(), content.url);
    if let Some(favicon) = &content.favicon {
        println!("{} {}", "Favicon:".bold(), favicon);
    }
    if let Some(description) = &content.metadata.description {
        println!("{} {}", "Description:".bold(), description);
    }
    if !content.selected_text.is_empty() {
        println!("{} {}", "Selection:".bold(), truncate(&content.selected_text, 80));
    }
    println!(
        "{} {} characters",
        "Content:".bold(),
        content.content.chars().count()
    );
}

fn report_submit(outcome: SubmitOutcome) {
    match outcome {
        SubmitOutcome::Delivered(id) => println!(
            "{} {}",
            "Sent to knowledge base as".green(),
            id.unwrap_or_default().cyan()
        ),
        SubmitOutcome::Queued(item) => println!(
            "{} {}",
            "Backend unavailable; queued as".yellow(),
            item.cyan()
        ),
    }
}

/// Extract the turns of a saved chat page, optionally injecting context
pub async fn parse(
    ctx: &AppContext,
    html: PathBuf,
    url: String,
    inject: Option<String>,
    save: bool,
    json: bool,
) -> Result<()> {
    let platform = detect_platform(&url)
        .ok_or_else(|| ZyphError::Parse(format!("{} is not a supported chat site", url)))?;
    let parser = parser_for(platform);
    let mut page = load_page(&html, &url).await?;

    let snapshot = parser.extract_messages(&page);

    if json {
        let messages: Vec<_> = snapshot.iter().collect();
        println!("{}", serde_json::to_string_pretty(&messages)?);
    } else if snapshot.is_empty() {
        println!("{}", format!("No messages found on {} page.", platform).yellow());
    } else {
        let mut table = Table::new();
        table.set_format(*format::consts::FORMAT_BORDERS_ONLY);
        table.add_row(prettytable::row!["#".bold(), "Role".bold(), "Content".bold()]);
        for message in &snapshot {
            table.add_row(prettytable::row![
                message.index,
                message.role.to_string().cyan(),
                truncate(&message.content.replace('\n', " "), 70)
            ]);
        }
        println!("\n{} conversation:", platform.to_string().bold());
        table.printstd();
        println!();
    }

    if save && !snapshot.is_empty() {
        let mut conversation = Conversation::new(platform, url.clone());
        conversation.messages = snapshot.into_messages();
        if ctx.storage.save_conversation(&conversation).await {
            println!("{} {}", "Saved conversation".green(), conversation.id.cyan());
        } else {
            return Err(ZyphError::Storage("Failed to save conversation".to_string()).into());
        }
    }

    if let Some(context) = inject {
        let toast = Duration::from_millis(ctx.config.capture.toast_ms);
        if !parser.inject_context(&mut page, &context, toast) {
            return Err(
                ZyphError::Parse(format!("No prompt field found on {} page", platform)).into(),
            );
        }
        let value = parser
            .get_input_field(&page)
            .and_then(|selector| page.input_value(selector))
            .unwrap_or_default();
        println!("{}", "Prompt field now contains:".bold());
        println!("{}", value);
    }
    Ok(())
}

/// Feed saved snapshots of a chat tab to a [`ConversationMonitor`]
///
/// The tab is treated as closed after the last snapshot.
pub async fn monitor(ctx: &AppContext, url: String, snapshots: Vec<PathBuf>) -> Result<()> {
    let monitor = ConversationMonitor::new(url.clone(), ctx.storage.clone())
        .ok_or_else(|| ZyphError::Parse(format!("{} is not a supported chat site", url)))?
        .with_idle_timeout(Duration::from_secs(ctx.config.capture.idle_timeout_seconds));

    let (tx, rx) = mpsc::channel(snapshots.len() + 1);
    let run = tokio::spawn(monitor.run(rx));

    for path in snapshots {
        let html = tokio::fs::read_to_string(&path).await?;
        if tx.send(PageEvent::Mutated { html }).await.is_err() {
            break;
        }
    }
    // receiver already gone means the monitor stopped on its own
    let _ = tx.send(PageEvent::Closed).await;

    let outcome = run
        .await
        .map_err(|e| ZyphError::Capture(format!("Monitor task failed: {}", e)))?;
    match outcome.reason {
        EndReason::DomainDisabled => println!(
            "{} Run {} first.",
            "Monitoring is disabled for this site.".yellow(),
            "zyph local enable <domain>".cyan()
        ),
        reason => {
            println!("Monitoring ended: {:?}", reason);
            if let Some(id) = outcome.conversation_id {
                println!("{} {}", "Conversation".green(), id.cyan());
            }
            if let Some(summary) = outcome.summary {
                println!("{} {}", "Summary:".bold(), summary.text);
            }
        }
    }
    Ok(())
}

/// Send text to a remote folder
pub async fn ingest(ctx: &AppContext, args: IngestArgs) -> Result<()> {
    let content = match (args.content, args.file) {
        (Some(content), _) => content,
        (None, Some(path)) => tokio::fs::read_to_string(&path).await?,
        (None, None) => {
            return Err(ZyphError::Config("Pass --content or --file".to_string()).into());
        }
    };

    let mut request = IngestRequest::new(args.title, content, args.folder);
    if let Some(url) = args.source_url {
        request = request.with_source_url(url);
    }
    request.validate()?;

    if args.queue {
        let outcome = ctx
            .queue
            .submit(
                &ctx.client,
                SyncOperation::IngestContent {
                    request,
                    local_id: None,
                },
            )
            .await?;
        report_submit(outcome);
    } else {
        let response = ctx.client.ingest_content(&request).await?;
        println!(
            "{} {} ({})",
            "Created".green(),
            response.item.title.bold(),
            response.item.id.cyan()
        );
    }
    Ok(())
}

/// Upload a file to a remote folder
pub async fn upload(
    ctx: &AppContext,
    path: PathBuf,
    folder: String,
    title: Option<String>,
    description: Option<String>,
    mime: Option<String>,
) -> Result<()> {
    let bytes = tokio::fs::read(&path).await?;
    let filename = path
        .file_name()
        .map(|name| name.to_string_lossy().into_owned())
        .unwrap_or_default();

    let upload = FileUpload {
        filename,
        bytes,
        mime_type: mime,
        folder_id: folder,
        title: title.unwrap_or_default(),
        description,
    };
    let response = ctx.client.upload_file(upload).await?;
    println!(
        "{} {} ({})",
        "Uploaded".green(),
        response.item.title.bold(),
        response.item.id.cyan()
    );
    if let Some(status) = response.processing_status {
        println!("Processing status: {}", status);
    }
    Ok(())
}

/// Search the knowledge base
pub async fn search(
    ctx: &AppContext,
    query: String,
    folder: Option<String>,
    limit: u32,
    threshold: f32,
    json: bool,
) -> Result<()> {
    let request = SearchRequest {
        query,
        folder_id: folder,
        content_types: None,
        limit,
        similarity_threshold: threshold,
    };
    let response = ctx.client.search_text(&request).await?;

    if json {
        println!("{}", serde_json::to_string_pretty(&response)?);
        return Ok(());
    }
    if response.results.is_empty() {
        println!("{}", "No matching content.".yellow());
        return Ok(());
    }

    let mut table = Table::new();
    table.set_format(*format::consts::FORMAT_BORDERS_ONLY);
    table.add_row(prettytable::row![
        "ID".bold(),
        "Title".bold(),
        "Type".bold(),
        "Preview".bold()
    ]);
    for item in response.results {
        let preview = item
            .preview
            .or(item.content)
            .map(|text| truncate(&text.replace('\n', " "), 60))
            .unwrap_or_default();
        table.add_row(prettytable::row![
            item.id.cyan(),
            truncate(&item.title, 40),
            item.content_type,
            preview
        ]);
    }
    println!("\n{} results for '{}':", response.total, request.query);
    table.printstd();
    println!();
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{Config, StorageBackend};
    use std::io::Write;

    fn memory_context() -> AppContext {
        let mut config = Config::default();
        config.storage.backend = StorageBackend::Memory;
        AppContext::build(config).unwrap()
    }

    fn html_file(markup: &str) -> tempfile::NamedTempFile {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        file.write_all(markup.as_bytes()).unwrap();
        file
    }

    #[tokio::test]
    async fn test_capture_save_stores_local_item() {
        let ctx = memory_context();
        let file = html_file("<title>Notes</title><main>Remember this</main>");
        capture(
            &ctx,
            CaptureArgs {
                html: file.path().to_path_buf(),
                url: "https://example.com/notes".into(),
                selection: None,
                save: true,
                folder: None,
                json: true,
            },
        )
        .await
        .unwrap();

        let items = ctx.storage.get_content_items().await;
        assert_eq!(items.len(), 1);
        assert_eq!(items[0].title, "Notes");
        assert_eq!(items[0].content, "Remember this");
        assert_eq!(items[0].source_url.as_deref(), Some("https://example.com/notes"));
    }

    #[tokio::test]
    async fn test_capture_rejects_browser_pages() {
        let ctx = memory_context();
        let file = html_file("<p>x</p>");
        let result = capture(
            &ctx,
            CaptureArgs {
                html: file.path().to_path_buf(),
                url: "chrome://settings".into(),
                selection: None,
                save: true,
                folder: None,
                json: false,
            },
        )
        .await;
        assert!(result.is_err());
        assert!(ctx.storage.get_content_items().await.is_empty());
    }

    #[tokio::test]
    async fn test_parse_saves_conversation() {
        let ctx = memory_context();
        let file = html_file(
            r#"<div data-message-author-role="user">Hi</div>
               <div data-message-author-role="assistant"><div class="markdown">Hello</div></div>"#,
        );
        parse(
            &ctx,
            file.path().to_path_buf(),
            "https://chatgpt.com/c/abc".into(),
            None,
            true,
            true,
        )
        .await
        .unwrap();

        let conversations = ctx.storage.list_conversations().await;
        assert_eq!(conversations.len(), 1);
        assert_eq!(conversations[0].messages.len(), 2);
    }

    #[tokio::test]
    async fn test_parse_unsupported_site_fails() {
        let ctx = memory_context();
        let file = html_file("<p>x</p>");
        let result = parse(
            &ctx,
            file.path().to_path_buf(),
            "https://example.com".into(),
            None,
            false,
            false,
        )
        .await;
        assert!(result.is_err());
    }

    #[tokio::test]
    async fn test_monitor_replay_stores_every_turn() {
        let ctx = memory_context();
        assert!(ctx.storage.set_domain_enabled("claude.ai", true).await);
        let first = html_file(r#"<div data-testid="user-message">Question one?</div>"#);
        let second = html_file(
            r#"<div data-testid="user-message">Question one?</div>
               <div class="font-claude-message">Answer one.</div>"#,
        );
        monitor(
            &ctx,
            "https://claude.ai/chat/42".into(),
            vec![first.path().to_path_buf(), second.path().to_path_buf()],
        )
        .await
        .unwrap();

        let conversations = ctx.storage.list_conversations().await;
        assert_eq!(conversations.len(), 1);
        assert_eq!(conversations[0].messages.len(), 2);
        assert_eq!(ctx.storage.get_summaries().await.len(), 1);
    }

    #[tokio::test]
    async fn test_ingest_without_credential_is_no_auth() {
        let ctx = memory_context();
        let err = ingest(
            &ctx,
            IngestArgs {
                folder: "f1".into(),
                title: "T".into(),
                content: Some("body".into()),
                file: None,
                source_url: None,
                queue: true,
            },
        )
        .await
        .unwrap_err();
        let api = err.downcast_ref::<crate::error::ApiError>().unwrap();
        assert_eq!(api.code, crate::error::ApiErrorCode::NoAuth);
        assert!(ctx.queue.list().await.is_empty());
    }
}
