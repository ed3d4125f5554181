use anyhow::Result;
use daybook_core::repository::Repository;
use owo_colors::OwoColorize;

use crate::cli::DoCommand;
use crate::util::resolve_activity_id;

pub async fn do_activity<R: Repository + Sync>(repo: &R, command: DoCommand) -> Result<()> {
    let activity_id = resolve_activity_id(repo, &command.id).await?;
    let activity = repo.complete_activity(activity_id).await?;

    println!(
        "{} Completed '{}' for {}",
        "✓".green(),
        activity.name,
        activity.occurrence_date
    );
    Ok(())
}
