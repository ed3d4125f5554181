use anyhow::Result;
use daybook_core::repository::Repository;
use owo_colors::OwoColorize;

use crate::cli::SkipCommand;
use crate::util::resolve_activity_id;

pub async fn skip_activity<R: Repository + Sync>(repo: &R, command: SkipCommand) -> Result<()> {
    let activity_id = resolve_activity_id(repo, &command.id).await?;
    let activity = repo.skip_activity(activity_id).await?;

    println!(
        "{} Skipped '{}' for {}",
        "↷".yellow(),
        activity.name,
        activity.occurrence_date
    );
    Ok(())
}
