use clap::{Parser, Subcommand, ValueEnum};

/// Daybook: recurring routines laid out on a daily timeline
#[derive(Parser, Debug)]
#[command(name = "daybook", author, version, about, long_about = None)]
pub struct Cli {
    /// Print debug logs to stderr
    #[arg(short, long, global = true)]
    pub verbose: bool,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand, Debug, Clone)]
pub enum Commands {
    /// Manage routines
    Routine(RoutineCommand),
    /// Show the timeline for a day
    Timeline(TimelineCommand),
    /// Mark an activity as completed
    Do(DoCommand),
    /// Skip an activity
    Skip(SkipCommand),
    /// Materialize activities for the days around today
    Backfill(BackfillCommand),
}

#[derive(Parser, Debug, Clone)]
pub struct RoutineCommand {
    #[command(subcommand)]
    pub command: RoutineSubcommand,
}

#[derive(Subcommand, Debug, Clone)]
pub enum RoutineSubcommand {
    /// Add a new routine
    Add(RoutineAddCommand),
    /// List routines
    List(RoutineListCommand),
    /// Show a routine and its upcoming occurrences
    Show(RoutineShowCommand),
    /// Edit a routine (existing activities keep their old details)
    Edit(RoutineEditCommand),
    /// Stop a routine from appearing on timelines
    Pause(RoutineIdCommand),
    /// Resume a paused routine
    Resume(RoutineIdCommand),
    /// Delete a routine (its past activities are kept)
    Delete(RoutineDeleteCommand),
}

/// How often a routine repeats
#[derive(ValueEnum, Debug, Clone, Copy, PartialEq, Eq)]
pub enum Frequency {
    /// A single occurrence on the start date
    Once,
    /// Every N days
    Daily,
    /// On selected weekdays
    Weekly,
    /// On selected days of the month
    Monthly,
    /// On one month/day each year
    Yearly,
}

#[derive(Parser, Debug, Clone)]
pub struct RoutineAddCommand {
    /// The name of the routine
    pub name: String,
    /// How often the routine repeats
    #[arg(long, value_enum, default_value = "daily")]
    pub every: Frequency,
    /// Repeat every N days (daily routines)
    #[arg(long, default_value = "1")]
    pub interval: u32,
    /// Weekdays ("mon,wed,fri"), days of month ("1,15,31") or a yearly date ("12-25")
    #[arg(long)]
    pub on: Option<String>,
    /// Start of the time window (e.g. "07:00", "7am")
    #[arg(long, default_value = "09:00")]
    pub from: String,
    /// End of the time window; one hour after --from when omitted
    #[arg(long)]
    pub to: Option<String>,
    /// First day the routine applies (e.g. "today", "2024-01-01")
    #[arg(long, default_value = "today")]
    pub start: String,
    /// Last day the routine applies; runs forever when omitted
    #[arg(long)]
    pub end: Option<String>,
    /// Style key for the routine's icon
    #[arg(long)]
    pub icon: Option<String>,
    /// Style key for the routine's color
    #[arg(long)]
    pub color: Option<String>,
}

#[derive(Parser, Debug, Clone)]
pub struct RoutineListCommand {
    /// Include paused routines
    #[arg(short, long)]
    pub all: bool,
}

#[derive(Parser, Debug, Clone)]
pub struct RoutineShowCommand {
    /// The ID (or ID prefix) of the routine
    pub id: String,
    /// Number of upcoming occurrences to show
    #[arg(short, long, default_value = "5")]
    pub count: usize,
}

#[derive(Parser, Debug, Clone)]
pub struct RoutineEditCommand {
    /// The ID (or ID prefix) of the routine to edit
    pub id: String,

    #[arg(long)]
    pub name: Option<String>,

    #[arg(long)]
    pub icon: Option<String>,
    #[arg(long, conflicts_with = "icon")]
    pub icon_clear: bool,

    #[arg(long)]
    pub color: Option<String>,
    #[arg(long, conflicts_with = "color")]
    pub color_clear: bool,

    #[arg(long, value_enum)]
    pub every: Option<Frequency>,
    #[arg(long)]
    pub interval: Option<u32>,
    #[arg(long)]
    pub on: Option<String>,

    #[arg(long)]
    pub from: Option<String>,
    #[arg(long)]
    pub to: Option<String>,

    #[arg(long)]
    pub start: Option<String>,
    #[arg(long)]
    pub end: Option<String>,
    #[arg(long, conflicts_with = "end")]
    pub end_clear: bool,
}

#[derive(Parser, Debug, Clone)]
pub struct RoutineIdCommand {
    /// The ID (or ID prefix) of the routine
    pub id: String,
}

#[derive(Parser, Debug, Clone)]
pub struct RoutineDeleteCommand {
    /// The ID (or ID prefix) of the routine to delete
    pub id: String,
    /// Force deletion without confirmation
    #[arg(short, long)]
    pub force: bool,
}

#[derive(Parser, Debug, Clone)]
pub struct TimelineCommand {
    /// The day to show (e.g. "today", "yesterday", "2024-01-03")
    #[arg(default_value = "today")]
    pub date: String,
    /// Only show activities with this status (all, available, completed, skipped)
    #[arg(short, long, default_value = "all")]
    pub status: String,
    /// Print the timeline as JSON
    #[arg(long)]
    pub json: bool,
}

#[derive(Parser, Debug, Clone)]
pub struct DoCommand {
    /// The ID (or ID prefix) of the activity to mark as completed
    pub id: String,
}

#[derive(Parser, Debug, Clone)]
pub struct SkipCommand {
    /// The ID (or ID prefix) of the activity to skip
    pub id: String,
}

#[derive(Parser, Debug, Clone)]
pub struct BackfillCommand {
    /// Days ahead of today to cover (overrides configuration)
    #[arg(long)]
    pub lookahead: Option<i64>,
    /// Days before today to cover (overrides configuration)
    #[arg(long)]
    pub grace: Option<i64>,
}
