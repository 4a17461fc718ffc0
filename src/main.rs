//! Zyph - knowledge-base capture CLI
//!
#![doc = "Zyph - knowledge-base capture CLI"]
#![doc = "Main entry point for the Zyph application."]

use anyhow::Result;

use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use zyph::cli::{Cli, Commands};
use zyph::commands::{self, AppContext};
use zyph::config::Config;

#[tokio::main]
async fn main() -> Result<()> {
    // Parse command line arguments
    let cli = Cli::parse_args();

    // Initialize tracing
    init_tracing(cli.verbose, cli.json_logs);

    // Load configuration
    let config_path = cli.config.as_deref().unwrap_or("config/config.yaml");
    let config = Config::load(config_path, &cli)?;

    // Validate configuration
    config.validate()?;

    let ctx = AppContext::build(config)?;

    // Execute command
    match cli.command {
        Commands::Auth { key, user_id } => {
            tracing::info!("Validating API key");
            commands::auth::authenticate(&ctx, key, user_id).await?;
            Ok(())
        }
        Commands::Logout => {
            commands::auth::logout(&ctx).await?;
            Ok(())
        }
        Commands::Folders { command } => {
            commands::folders::handle_folders(&ctx, command).await?;
            Ok(())
        }
        Commands::Capture {
            html,
            url,
            selection,
            save,
            folder,
            json,
        } => {
            tracing::info!("Capturing {}", url);
            let args = commands::content::CaptureArgs {
                html,
                url,
                selection,
                save,
                folder,
                json,
            };
            commands::content::capture(&ctx, args).await?;
            Ok(())
        }
        Commands::Parse {
            html,
            url,
            inject,
            save,
            json,
        } => {
            tracing::debug!("Parsing {} as {}", html.display(), url);
            commands::content::parse(&ctx, html, url, inject, save, json).await?;
            Ok(())
        }
        Commands::Monitor { url, snapshots } => {
            tracing::info!("Replaying {} snapshots of {}", snapshots.len(), url);
            commands::content::monitor(&ctx, url, snapshots).await?;
            Ok(())
        }
        Commands::Ingest {
            folder,
            title,
            content,
            file,
            source_url,
            queue,
        } => {
            let args = commands::content::IngestArgs {
                folder,
                title,
                content,
                file,
                source_url,
                queue,
            };
            commands::content::ingest(&ctx, args).await?;
            Ok(())
        }
        Commands::Upload {
            path,
            folder,
            title,
            description,
            mime,
        } => {
            tracing::info!("Uploading {}", path.display());
            commands::content::upload(&ctx, path, folder, title, description, mime).await?;
            Ok(())
        }
        Commands::Search {
            query,
            folder,
            limit,
            threshold,
            json,
        } => {
            commands::content::search(&ctx, query, folder, limit, threshold, json).await?;
            Ok(())
        }
        Commands::Queue { command } => {
            commands::queue::handle_queue(&ctx, command).await?;
            Ok(())
        }
        Commands::Local { command } => {
            commands::local::handle_local(&ctx, command).await?;
            Ok(())
        }
    }
}

/// Initialize tracing subscriber with environment filter
fn init_tracing(verbose: bool, json: bool) {
    let default_level = if verbose { "zyph=debug" } else { "zyph=info" };
    let env_filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));

    let registry = tracing_subscriber::registry().with(env_filter);
    if json {
        registry
            .with(tracing_subscriber::fmt::layer().json().with_writer(std::io::stderr))
            .init();
    } else {
        registry
            .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
            .init();
    }
}
