use anyhow::{anyhow, Result};
use daybook_core::models::StatusFilter;
use daybook_core::repository::Repository;
use daybook_core::sun::{DisabledSunInfoSource, HttpSunInfoSource, SunInfoSource};
use daybook_core::timeline::TimelineAssembler;
use daybook_core::timezone::parse_timezone;
use std::time::Duration;
use tracing::warn;

use crate::cli::TimelineCommand;
use crate::config::Config;
use crate::parser::parse_date;
use crate::views::table::display_timeline;

/// Picks the sun info source the configuration asks for. A client that
/// cannot be built only costs the sun entries.
fn sun_source(config: &Config) -> Box<dyn SunInfoSource> {
    if !config.sun.enabled {
        return Box::new(DisabledSunInfoSource);
    }
    match HttpSunInfoSource::new(config.sun.api_url.clone(), Duration::from_secs(config.sun.timeout_secs)) {
        Ok(source) => Box::new(source),
        Err(e) => {
            warn!(error = %e, "could not build sun info client");
            Box::new(DisabledSunInfoSource)
        }
    }
}

pub async fn show_timeline<R: Repository + Sync>(
    repo: &R,
    command: TimelineCommand,
    config: &Config,
) -> Result<()> {
    let tz = parse_timezone(&config.profile.timezone)?;
    let date = parse_date(&command.date, &tz)?;
    let filter: StatusFilter = command
        .status
        .parse()
        .map_err(|e| anyhow!("{}. Use all, available, completed or skipped", e))?;

    let sun = sun_source(config);
    let assembler = TimelineAssembler::new(repo, sun.as_ref(), config.user_profile())
        .with_config(config.timeline_config());
    let points = assembler.assemble(date, filter).await?;

    if command.json {
        println!("{}", serde_json::to_string_pretty(&points)?);
    } else {
        display_timeline(date, &points, &tz);
    }
    Ok(())
}
