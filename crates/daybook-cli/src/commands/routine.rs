use anyhow::{anyhow, Result};
use chrono::Duration;
use dialoguer::Confirm;
use daybook_core::models::{NewRoutineData, OccurrenceType, Recurrence, TimeWindow, UpdateRoutineData};
use daybook_core::recurrence::preview_occurrences;
use daybook_core::repository::Repository;
use daybook_core::timezone::{parse_timezone, today_in};
use owo_colors::OwoColorize;

use crate::cli::{
    Frequency, RoutineAddCommand, RoutineCommand, RoutineDeleteCommand, RoutineEditCommand,
    RoutineIdCommand, RoutineListCommand, RoutineShowCommand, RoutineSubcommand,
};
use crate::config::Config;
use crate::parser::{build_recurrence, parse_date, parse_time};
use crate::util::{resolve_routine_id, short_id};
use crate::views::table::{display_activities, display_routines};

pub async fn routine_command<R: Repository + Sync>(
    repo: &R,
    command: RoutineCommand,
    config: &Config,
) -> Result<()> {
    match command.command {
        RoutineSubcommand::Add(cmd) => add_routine(repo, cmd, config).await,
        RoutineSubcommand::List(cmd) => list_routines(repo, cmd).await,
        RoutineSubcommand::Show(cmd) => show_routine(repo, cmd, config).await,
        RoutineSubcommand::Edit(cmd) => edit_routine(repo, cmd, config).await,
        RoutineSubcommand::Pause(cmd) => set_active(repo, cmd, false).await,
        RoutineSubcommand::Resume(cmd) => set_active(repo, cmd, true).await,
        RoutineSubcommand::Delete(cmd) => delete_routine(repo, cmd).await,
    }
}

async fn add_routine<R: Repository + Sync>(
    repo: &R,
    command: RoutineAddCommand,
    config: &Config,
) -> Result<()> {
    let tz = parse_timezone(&config.profile.timezone)?;

    let start_date = parse_date(&command.start, &tz)?;
    let end_date = command.end.as_deref().map(|e| parse_date(e, &tz)).transpose()?;
    let recurrence = build_recurrence(command.every, command.interval, command.on.as_deref(), start_date)?;

    let from = parse_time(&command.from)?;
    let to = match command.to.as_deref() {
        Some(to) => parse_time(to)?,
        None => from + Duration::hours(1),
    };

    let routine = repo
        .create_routine(NewRoutineData {
            name: command.name,
            icon: command.icon,
            color: command.color,
            recurrence,
            start_date,
            end_date,
            window: TimeWindow { from, to },
        })
        .await?;

    println!(
        "{} Added routine '{}' ({}) [{}]",
        "✓".green(),
        routine.name,
        routine.rule.recurrence,
        short_id(&routine.id).yellow()
    );
    Ok(())
}

async fn list_routines<R: Repository + Sync>(repo: &R, command: RoutineListCommand) -> Result<()> {
    let routines = if command.all {
        repo.find_routines().await?
    } else {
        repo.find_active_routines().await?
    };
    display_routines(&routines);
    Ok(())
}

async fn show_routine<R: Repository + Sync>(
    repo: &R,
    command: RoutineShowCommand,
    config: &Config,
) -> Result<()> {
    let tz = parse_timezone(&config.profile.timezone)?;
    let routine_id = resolve_routine_id(repo, &command.id).await?;
    let routine = repo
        .find_routine_by_id(routine_id)
        .await?
        .ok_or_else(|| anyhow!("Routine not found"))?;

    println!("{} {}", "Routine:".bold(), routine.name);
    println!("  ID:       {}", routine.id);
    println!("  Repeats:  {}", routine.rule.recurrence);
    println!(
        "  Window:   {}-{}",
        routine.window.from.format("%H:%M"),
        routine.window.to.format("%H:%M")
    );
    println!("  Starts:   {}", routine.rule.start_date);
    match routine.rule.end_date {
        Some(end) => println!("  Ends:     {}", end),
        None => println!("  Ends:     never"),
    }
    if let Some(icon) = &routine.icon {
        println!("  Icon:     {}", icon);
    }
    if let Some(color) = &routine.color {
        println!("  Color:    {}", color);
    }
    if !routine.active {
        println!("  {}", "Paused".yellow());
    }

    let today = today_in(&tz);
    let upcoming = preview_occurrences(&routine.rule, today, command.count)?;
    println!();
    if upcoming.is_empty() {
        println!("No upcoming occurrences (routine may have ended)");
    } else {
        println!("{}", "Upcoming:".bold());
        for date in upcoming {
            println!("  {}", date.format("%a %Y-%m-%d"));
        }
    }

    let recent = repo
        .find_activities_for_routine(routine.id, today - Duration::days(7), today)
        .await?;
    println!();
    println!("{}", "Last 7 days:".bold());
    display_activities(&recent, &tz);
    Ok(())
}

async fn edit_routine<R: Repository + Sync>(
    repo: &R,
    command: RoutineEditCommand,
    config: &Config,
) -> Result<()> {
    let tz = parse_timezone(&config.profile.timezone)?;
    let routine_id = resolve_routine_id(repo, &command.id).await?;
    let routine = repo
        .find_routine_by_id(routine_id)
        .await?
        .ok_or_else(|| anyhow!("Routine not found"))?;

    let mut update = UpdateRoutineData {
        name: command.name,
        ..Default::default()
    };

    if command.icon_clear {
        update.icon = Some(None);
    } else if let Some(icon) = command.icon {
        update.icon = Some(Some(icon));
    }
    if command.color_clear {
        update.color = Some(None);
    } else if let Some(color) = command.color {
        update.color = Some(Some(color));
    }

    let start_date = command.start.as_deref().map(|s| parse_date(s, &tz)).transpose()?;
    update.start_date = start_date;
    if command.end_clear {
        update.end_date = Some(None);
    } else if let Some(end) = command.end.as_deref() {
        update.end_date = Some(Some(parse_date(end, &tz)?));
    }

    if command.every.is_some() || command.interval.is_some() || command.on.is_some() {
        let frequency = command
            .every
            .unwrap_or_else(|| frequency_of(&routine.rule.recurrence));
        let interval = command.interval.unwrap_or(match routine.rule.recurrence {
            Recurrence::Daily { every } => every,
            _ => 1,
        });
        let anchor = start_date.unwrap_or(routine.rule.start_date);
        update.recurrence = Some(build_recurrence(frequency, interval, command.on.as_deref(), anchor)?);
    }

    if command.from.is_some() || command.to.is_some() {
        let from = match command.from.as_deref() {
            Some(from) => parse_time(from)?,
            None => routine.window.from,
        };
        let to = match command.to.as_deref() {
            Some(to) => parse_time(to)?,
            None => routine.window.to,
        };
        update.window = Some(TimeWindow { from, to });
    }

    let updated = repo.update_routine(routine.id, update).await?;
    println!(
        "{} Updated routine '{}' ({}). Existing activities are unchanged.",
        "✓".green(),
        updated.name,
        updated.rule.recurrence
    );
    Ok(())
}

fn frequency_of(recurrence: &Recurrence) -> Frequency {
    match recurrence.occurrence_type() {
        OccurrenceType::Never => Frequency::Once,
        OccurrenceType::Daily => Frequency::Daily,
        OccurrenceType::Weekly => Frequency::Weekly,
        OccurrenceType::Monthly => Frequency::Monthly,
        OccurrenceType::Yearly => Frequency::Yearly,
    }
}

async fn set_active<R: Repository + Sync>(repo: &R, command: RoutineIdCommand, active: bool) -> Result<()> {
    let routine_id = resolve_routine_id(repo, &command.id).await?;
    let routine = repo
        .find_routine_by_id(routine_id)
        .await?
        .ok_or_else(|| anyhow!("Routine not found"))?;

    if routine.active == active {
        let state = if active { "active" } else { "paused" };
        println!("{} Routine is already {}", "Info:".yellow().bold(), state);
        return Ok(());
    }

    let updated = repo
        .update_routine(
            routine.id,
            UpdateRoutineData {
                active: Some(active),
                ..Default::default()
            },
        )
        .await?;

    if active {
        println!("{} Resumed routine '{}'", "✓".green(), updated.name);
    } else {
        println!("{} Paused routine '{}'", "✓".green(), updated.name);
    }
    Ok(())
}

async fn delete_routine<R: Repository + Sync>(repo: &R, command: RoutineDeleteCommand) -> Result<()> {
    let routine_id = resolve_routine_id(repo, &command.id).await?;
    let routine = repo
        .find_routine_by_id(routine_id)
        .await?
        .ok_or_else(|| anyhow!("Routine not found"))?;

    if !command.force {
        let confirmation = Confirm::new()
            .with_prompt(format!(
                "Delete routine '{}'? Activities already on your timeline are kept.",
                routine.name
            ))
            .default(false)
            .interact()
            .unwrap_or(false);

        if !confirmation {
            println!("Deletion cancelled.");
            return Ok(());
        }
    }

    repo.delete_routine(routine.id).await?;
    println!("{} Deleted routine '{}'", "✓".green(), routine.name);
    Ok(())
}
