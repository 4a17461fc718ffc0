use crate::api::{FolderRequest, RemoteFolder};
use crate::cli::FolderCommand;
use crate::commands::AppContext;
use crate::error::Result;
use crate::sync::{SubmitOutcome, SyncOperation};
use colored::Colorize;
use prettytable::{format, Table};

/// Handle remote folder commands
pub async fn handle_folders(ctx: &AppContext, command: FolderCommand) -> Result<()> {
    match command {
        FolderCommand::List {
            refresh,
            offline,
            json,
        } => {
            let folders = if offline {
                ctx.client.cached_folders_offline().await
            } else {
                ctx.client.fetch_folders(refresh).await?
            };

            if json {
                println!("{}", serde_json::to_string_pretty(&folders)?);
                return Ok(());
            }
            if folders.is_empty() {
                println!("{}", "No folders found.".yellow());
                return Ok(());
            }
            print_folder_tree(&folders);
        }
        FolderCommand::Create {
            name,
            description,
            parent,
            queue,
        } => {
            let mut request = FolderRequest {
                name,
                description,
                parent_id: parent,
            };
            request.validate()?;

            if queue {
                let outcome = ctx
                    .queue
                    .submit(&ctx.client, SyncOperation::CreateFolder { request })
                    .await?;
                match outcome {
                    SubmitOutcome::Delivered(id) => println!(
                        "{} {}",
                        "Created folder".green(),
                        id.unwrap_or_default().cyan()
                    ),
                    SubmitOutcome::Queued(item) => println!(
                        "{} {}",
                        "Backend unavailable; queued as".yellow(),
                        item.cyan()
                    ),
                }
            } else {
                let folder = ctx.client.create_folder(request).await?;
                println!(
                    "{} {} ({})",
                    "Created folder".green(),
                    folder.name.bold(),
                    folder.id.cyan()
                );
            }
        }
        FolderCommand::Update {
            id,
            name,
            description,
            parent,
        } => {
            let request = FolderRequest {
                name,
                description,
                parent_id: parent,
            };
            let folder = ctx.client.update_folder(&id, request).await?;
            println!(
                "{} {} ({})",
                "Updated folder".green(),
                folder.name.bold(),
                folder.id.cyan()
            );
        }
        FolderCommand::Delete { id } => {
            let response = ctx.client.delete_folder(&id).await?;
            let message = response
                .message
                .unwrap_or_else(|| format!("Deleted folder {}", id));
            println!("{}", message.green());
        }
        FolderCommand::Content { id, json } => {
            let content = ctx.client.get_folder_content(&id).await?;
            if json {
                println!("{}", serde_json::to_string_pretty(&content)?);
                return Ok(());
            }
            if content.items.is_empty() {
                println!(
                    "{}",
                    format!("Folder {} is empty.", content.folder.name).yellow()
                );
                return Ok(());
            }

            let mut table = Table::new();
            table.set_format(*format::consts::FORMAT_BORDERS_ONLY);
            table.add_row(prettytable::row![
                "ID".bold(),
                "Title".bold(),
                "Type".bold(),
                "Status".bold()
            ]);
            for item in content.items {
                table.add_row(prettytable::row![
                    item.id.cyan(),
                    truncate(&item.title, 40),
                    item.content_type,
                    item.processing_status.unwrap_or_else(|| "-".to_string())
                ]);
            }
            println!("\n{}:", content.folder.name.bold());
            table.printstd();
            println!();
        }
    }

    Ok(())
}

fn print_folder_tree(folders: &[RemoteFolder]) {
    let mut table = Table::new();
    table.set_format(*format::consts::FORMAT_BORDERS_ONLY);
    table.add_row(prettytable::row!["Name".bold(), "ID".bold(), "Description".bold()]);

    for folder in folders.iter().flat_map(RemoteFolder::flatten) {
        let indent = "  ".repeat(folder.depth as usize);
        table.add_row(prettytable::row![
            format!("{}{}", indent, folder.name),
            folder.id.cyan(),
            folder.description.as_deref().unwrap_or("-")
        ]);
    }

    println!("\nFolders:");
    table.printstd();
    println!();
}

/// Shorten `text` to at most `max` characters
pub(crate) fn truncate(text: &str, max: usize) -> String {
    if text.chars().count() > max {
        let cut: String = text.chars().take(max.saturating_sub(3)).collect();
        format!("{}...", cut)
    } else {
        text.to_string()
    }
}
