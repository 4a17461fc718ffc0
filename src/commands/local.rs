use crate::cli::LocalCommand;
use crate::commands::AppContext;
use crate::error::{Result, ZyphError};
use crate::models::FolderSpec;
use colored::Colorize;
use prettytable::{format, Table};
use rustyline::DefaultEditor;

/// Handle local data commands
pub async fn handle_local(ctx: &AppContext, command: LocalCommand) -> Result<()> {
    match command {
        LocalCommand::Folders => {
            let folders = ctx.storage.get_folders().await;
            if folders.is_empty() {
                println!("{}", "No local folders.".yellow());
                return Ok(());
            }
            let mut table = Table::new();
            table.set_format(*format::consts::FORMAT_BORDERS_ONLY);
            table.add_row(prettytable::row![
                "ID".bold(),
                "Name".bold(),
                "Parent".bold(),
                "Color".bold()
            ]);
            for folder in folders {
                table.add_row(prettytable::row![
                    folder.id.cyan(),
                    format!("{} {}", folder.icon, folder.name),
                    folder.parent_id.unwrap_or_else(|| "-".to_string()),
                    folder.color
                ]);
            }
            println!("\nLocal Folders:");
            table.printstd();
            println!();
        }
        LocalCommand::CreateFolder {
            name,
            parent,
            color,
            icon,
        } => {
            let spec = FolderSpec {
                name,
                color,
                icon,
                parent_id: parent,
            };
            let folder = ctx.storage.create_folder(spec).await.ok_or_else(|| {
                ZyphError::Storage("Folder name is blank or the parent does not exist".to_string())
            })?;
            println!("{} {}", "Created local folder".green(), folder.id.cyan());
        }
        LocalCommand::DeleteFolder { id } => {
            if !ctx.storage.delete_folder(&id).await {
                return Err(ZyphError::Storage(format!("No local folder {}", id)).into());
            }
            println!("{}", format!("Deleted local folder {}.", id).green());
        }
        LocalCommand::Assign {
            conversation,
            folder,
        } => {
            if !ctx
                .storage
                .assign_conversation_folder(&conversation, folder.as_deref())
                .await
            {
                return Err(ZyphError::Storage(format!(
                    "Could not assign conversation {}",
                    conversation
                ))
                .into());
            }
            println!("{}", "Conversation updated.".green());
        }
        LocalCommand::Conversations { json } => {
            let conversations = ctx.storage.list_conversations().await;
            if json {
                println!("{}", serde_json::to_string_pretty(&conversations)?);
                return Ok(());
            }
            if conversations.is_empty() {
                println!("{}", "No captured conversations.".yellow());
                return Ok(());
            }

            let summaries = ctx.storage.get_summaries().await;
            let mut table = Table::new();
            table.set_format(*format::consts::FORMAT_BORDERS_ONLY);
            table.add_row(prettytable::row![
                "ID".bold(),
                "Platform".bold(),
                "Messages".bold(),
                "Last Updated".bold(),
                "Summary".bold()
            ]);
            for conversation in conversations {
                let key = crate::models::Summary::key(&conversation.id, &conversation.domain());
                let summary = summaries
                    .get(&key)
                    .map(|s| super::folders::truncate(&s.text, 50))
                    .unwrap_or_else(|| "-".to_string());
                table.add_row(prettytable::row![
                    conversation.id.cyan(),
                    conversation.platform,
                    conversation.messages.len(),
                    conversation.updated_at.format("%Y-%m-%d %H:%M").to_string(),
                    summary
                ]);
            }
            println!("\nConversations:");
            table.printstd();
            println!();
        }
        LocalCommand::Enable { domain } => {
            set_domain(ctx, &domain, true).await?;
            println!("{}", format!("Monitoring enabled on {}.", domain).green());
        }
        LocalCommand::Disable { domain } => {
            set_domain(ctx, &domain, false).await?;
            println!("{}", format!("Monitoring disabled on {}.", domain).green());
        }
        LocalCommand::Clear { yes } => {
            if !yes {
                let mut rl = DefaultEditor::new()?;
                let answer = rl.readline("Delete all local Zyph data? [y/N] ")?;
                if !matches!(answer.trim(), "y" | "Y" | "yes") {
                    println!("{}", "Nothing deleted.".yellow());
                    return Ok(());
                }
            }
            if !ctx.storage.clear_all_data().await {
                return Err(ZyphError::Storage("Failed to clear local data".to_string()).into());
            }
            ctx.client.folder_cache().invalidate();
            println!("{}", "Local data cleared.".green());
        }
    }

    Ok(())
}

async fn set_domain(ctx: &AppContext, domain: &str, enabled: bool) -> Result<()> {
    let domain = domain.trim().to_ascii_lowercase();
    if domain.is_empty() {
        return Err(ZyphError::Config("Domain must not be empty".to_string()).into());
    }
    if !ctx.storage.set_domain_enabled(&domain, enabled).await {
        return Err(ZyphError::Storage(format!("Failed to update {}", domain)).into());
    }
    Ok(())
}
