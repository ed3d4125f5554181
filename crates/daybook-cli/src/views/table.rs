use chrono::NaiveDate;
use chrono_humanize::Humanize;
use chrono_tz::Tz;
use comfy_table::{Attribute, Cell, Color, Row, Table};
use daybook_core::models::{Activity, ActivityStatus, EntryKind, Routine, TimelineEntry, TimelinePoint};
use daybook_core::timezone::format_with_timezone;

use crate::util::short_id;

fn status_cell(status: ActivityStatus) -> Cell {
    let cell = Cell::new(status.to_string());
    match status {
        ActivityStatus::Completed => cell.fg(Color::Green),
        ActivityStatus::Skipped => cell.fg(Color::DarkGrey),
        ActivityStatus::Available => cell,
    }
}

fn entry_name_cell(entry: &TimelineEntry) -> Cell {
    let mut name = String::new();
    if let Some(icon) = &entry.icon {
        name.push_str(&format!("[{}] ", icon));
    }
    name.push_str(&entry.label);

    let cell = Cell::new(name);
    match (entry.kind, entry.status) {
        (EntryKind::Sunrise, _) => cell.fg(Color::Yellow),
        (EntryKind::Sunset, _) => cell.fg(Color::Blue),
        (_, Some(ActivityStatus::Completed)) => cell
            .add_attribute(Attribute::CrossedOut)
            .fg(Color::DarkGrey),
        (_, Some(ActivityStatus::Skipped)) => cell.fg(Color::DarkGrey),
        _ => cell.add_attribute(Attribute::Bold),
    }
}

pub fn display_timeline(date: NaiveDate, points: &[TimelinePoint], tz: &Tz) {
    println!("Timeline for {} ({})", date.format("%A, %B %-d %Y"), tz.name());

    if points.is_empty() {
        println!("Nothing scheduled.");
        return;
    }

    let mut table = Table::new();
    table.set_header(vec!["Time", "ID", "Name", "Status", "Until"]);

    for point in points {
        let time = format_with_timezone(point.timestamp, tz, "%H:%M");
        for (index, entry) in point.entries.iter().enumerate() {
            let mut row = Row::new();
            // The time is printed once per point
            row.add_cell(Cell::new(if index == 0 { time.as_str() } else { "" }));
            row.add_cell(Cell::new(entry.activity_id.as_ref().map(short_id).unwrap_or_default()));
            row.add_cell(entry_name_cell(entry));
            row.add_cell(match entry.status {
                Some(status) => status_cell(status),
                None => Cell::new(""),
            });
            row.add_cell(Cell::new(
                entry
                    .end_at
                    .map(|end| format_with_timezone(end, tz, "%H:%M"))
                    .unwrap_or_default(),
            ));
            table.add_row(row);
        }
    }

    println!("{table}");
}

pub fn display_routines(routines: &[Routine]) {
    if routines.is_empty() {
        println!("No routines found.");
        return;
    }

    let mut table = Table::new();
    table.set_header(vec!["ID", "Name", "Repeats", "Window", "Starts", "Ends", "Created"]);

    for routine in routines {
        let mut row = Row::new();
        row.add_cell(Cell::new(short_id(&routine.id)));

        let mut name_cell = Cell::new(&routine.name);
        if !routine.active {
            name_cell = Cell::new(format!("{} (paused)", routine.name)).fg(Color::DarkGrey);
        }
        row.add_cell(name_cell);
        row.add_cell(Cell::new(routine.rule.recurrence.to_string()));
        row.add_cell(Cell::new(format!(
            "{}-{}",
            routine.window.from.format("%H:%M"),
            routine.window.to.format("%H:%M")
        )));
        row.add_cell(Cell::new(routine.rule.start_date.to_string()));
        row.add_cell(Cell::new(
            routine
                .rule
                .end_date
                .map_or_else(|| "never".to_string(), |d| d.to_string()),
        ));
        row.add_cell(Cell::new(routine.created_at.humanize()));
        table.add_row(row);
    }

    println!("{table}");
}

pub fn display_activities(activities: &[Activity], tz: &Tz) {
    if activities.is_empty() {
        println!("No activities yet.");
        return;
    }

    let mut table = Table::new();
    table.set_header(vec!["ID", "Date", "Start", "Status", "Completed"]);

    for activity in activities {
        let mut row = Row::new();
        row.add_cell(Cell::new(short_id(&activity.id)));
        row.add_cell(Cell::new(activity.occurrence_date.to_string()));
        row.add_cell(Cell::new(format_with_timezone(activity.start_at, tz, "%H:%M")));
        row.add_cell(status_cell(activity.status));
        row.add_cell(Cell::new(
            activity
                .completed_at
                .map(|at| at.humanize())
                .unwrap_or_default(),
        ));
        table.add_row(row);
    }

    println!("{table}");
}
