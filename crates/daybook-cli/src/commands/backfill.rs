use anyhow::Result;
use daybook_core::recurrence::MaterializationManager;
use daybook_core::repository::Repository;
use daybook_core::timezone::{parse_timezone, today_in};
use owo_colors::OwoColorize;

use crate::cli::BackfillCommand;
use crate::config::Config;

pub async fn backfill<R: Repository + Sync>(
    repo: &R,
    command: BackfillCommand,
    config: &Config,
) -> Result<()> {
    let tz = parse_timezone(&config.profile.timezone)?;

    let mut materialization = config.materialization_config();
    if let Some(lookahead) = command.lookahead {
        materialization.lookahead_days = lookahead;
    }
    if let Some(grace) = command.grace {
        materialization.grace_days = grace;
    }
    let manager = MaterializationManager::new(materialization);
    let (start, end) = manager.backfill_window(today_in(&tz));

    let summary = repo.backfill(start, end, &tz).await?;

    println!(
        "{} Backfilled {} to {}: {} routines, {} new activities ({} ms)",
        "✓".green(),
        start,
        end,
        summary.routines_processed,
        summary.activities_created,
        summary.duration_ms
    );
    if summary.routines_with_errors > 0 {
        println!(
            "{} {} routines could not be expanded:",
            "Warning:".yellow().bold(),
            summary.routines_with_errors
        );
        for error in &summary.errors {
            println!("  {}", error);
        }
    }
    Ok(())
}
