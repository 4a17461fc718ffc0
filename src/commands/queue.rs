use std::time::Duration;

use crate::cli::QueueCommand;
use crate::commands::AppContext;
use crate::error::Result;
use crate::sync::SyncReport;
use chrono::Utc;
use colored::Colorize;
use prettytable::{format, Table};
use tokio_util::sync::CancellationToken;

/// Handle sync queue commands
pub async fn handle_queue(ctx: &AppContext, command: QueueCommand) -> Result<()> {
    match command {
        QueueCommand::List { json } => {
            let items = ctx.queue.list().await;
            if json {
                println!("{}", serde_json::to_string_pretty(&items)?);
                return Ok(());
            }
            if items.is_empty() {
                println!("{}", "Sync queue is empty.".green());
                return Ok(());
            }

            let now = Utc::now();
            let mut table = Table::new();
            table.set_format(*format::consts::FORMAT_BORDERS_ONLY);
            table.add_row(prettytable::row![
                "ID".bold(),
                "Operation".bold(),
                "Attempts".bold(),
                "Next Retry".bold(),
                "Last Error".bold()
            ]);
            for item in items {
                let next = if item.parked {
                    "parked".red().to_string()
                } else if item.is_due(now) {
                    "due".green().to_string()
                } else {
                    item.next_retry_at.format("%Y-%m-%d %H:%M:%S").to_string()
                };
                let error = match (&item.last_error_code, &item.last_error) {
                    (Some(code), Some(message)) => format!("{}: {}", code, message),
                    (Some(code), None) => code.to_string(),
                    (None, Some(message)) => message.clone(),
                    (None, None) => "-".to_string(),
                };
                table.add_row(prettytable::row![
                    item.id.cyan(),
                    item.operation.describe(),
                    item.attempts,
                    next,
                    super::folders::truncate(&error, 50)
                ]);
            }
            println!("\nSync Queue:");
            table.printstd();
            println!();
        }
        QueueCommand::Process => {
            let report = ctx.queue.process(&ctx.client, Utc::now()).await;
            print_report(&report);
        }
        QueueCommand::Watch { interval } => {
            let seconds = interval.unwrap_or(ctx.config.sync.alarm_interval_seconds);
            let shutdown = CancellationToken::new();
            let stop = shutdown.clone();
            tokio::spawn(async move {
                if tokio::signal::ctrl_c().await.is_ok() {
                    stop.cancel();
                }
            });
            println!(
                "Processing the sync queue every {}s. Press {} to stop.",
                seconds,
                "Ctrl-C".cyan()
            );
            ctx.queue
                .run_alarm(&ctx.client, Duration::from_secs(seconds.max(1)), shutdown)
                .await;
        }
        QueueCommand::Retry { id } => {
            if ctx.queue.retry(&id).await {
                println!("{}", format!("Item {} will be retried on the next pass.", id).green());
            } else {
                println!("{}", format!("No queued item {}.", id).yellow());
            }
        }
        QueueCommand::Discard { id } => {
            if ctx.queue.discard(&id).await {
                println!("{}", format!("Discarded item {}.", id).green());
            } else {
                println!("{}", format!("No queued item {}.", id).yellow());
            }
        }
    }

    Ok(())
}

fn print_report(report: &SyncReport) {
    println!(
        "{} delivered, {} rescheduled, {} parked, {} skipped",
        report.delivered.to_string().green(),
        report.rescheduled.to_string().yellow(),
        report.parked.to_string().red(),
        report.skipped
    );
    if report.auth_failed {
        println!(
            "{} Run {} to store a new key.",
            "The backend rejected the API key.".red(),
            "zyph auth".cyan()
        );
    }
}
