use clap::Parser;
use daybook_core::db;
use daybook_core::error::CoreError;
use daybook_core::recurrence::MaterializationManager;
use daybook_core::repository::SqliteRepository;
use owo_colors::{OwoColorize, Style};
use tracing_subscriber::EnvFilter;

mod cli;
mod commands;
mod config;
mod parser;
mod util;
mod views;

fn init_tracing(verbose: bool) {
    let default_level = if verbose { "debug" } else { "warn" };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .init();
}

#[tokio::main]
async fn main() {
    let cli = cli::Cli::parse();
    init_tracing(cli.verbose);

    let config = match config::Config::new() {
        Ok(config) => config,
        Err(e) => {
            eprintln!("{} Invalid configuration: {}", "Error:".red().bold(), e);
            std::process::exit(1);
        }
    };
    tracing::debug!(database = %config.database_path, timezone = %config.profile.timezone, "loaded configuration");

    let db_pool = match db::establish_connection(&config.database_path).await {
        Ok(pool) => pool,
        Err(e) => {
            eprintln!("{} {}", "Error:".red().bold(), e);
            std::process::exit(1);
        }
    };

    let materialization_manager = MaterializationManager::new(config.materialization_config());
    let repository = SqliteRepository::new(db_pool, materialization_manager);

    let result = match cli.command {
        cli::Commands::Routine(command) => {
            commands::routine::routine_command(&repository, command, &config).await
        }
        cli::Commands::Timeline(command) => {
            commands::timeline::show_timeline(&repository, command, &config).await
        }
        cli::Commands::Do(command) => commands::r#do::do_activity(&repository, command).await,
        cli::Commands::Skip(command) => commands::skip::skip_activity(&repository, command).await,
        cli::Commands::Backfill(command) => {
            commands::backfill::backfill(&repository, command, &config).await
        }
    };

    if let Err(e) = result {
        handle_error(e);
        std::process::exit(1);
    }
}

fn handle_error(err: anyhow::Error) {
    let error_style = Style::new().red().bold();

    if let Some(core_error) = err.downcast_ref::<CoreError>() {
        match core_error {
            CoreError::NotFound(s) => {
                eprintln!("{} {}", "Error:".style(error_style), s);
            }
            CoreError::AmbiguousId(matches) => {
                eprintln!("{}", "Error: Ambiguous ID.".style(error_style));
                eprintln!("Did you mean one of these?");
                for (id, label) in matches {
                    eprintln!("  {} ({})", id.yellow(), label);
                }
            }
            CoreError::InvalidInput(s) => {
                eprintln!("{} Invalid input: {}", "Error:".style(error_style), s);
            }
            CoreError::InvalidRule(s) => {
                eprintln!("{} Invalid routine: {}", "Error:".style(error_style), s);
            }
            CoreError::InvalidTransition { from, .. } => {
                eprintln!(
                    "{} This activity is already {} and cannot change again.",
                    "Error:".style(error_style),
                    from.yellow()
                );
            }
            CoreError::InvalidTimezone(tz) => {
                eprintln!(
                    "{} Invalid timezone '{}'. Use IANA names like 'America/New_York'.",
                    "Error:".style(error_style),
                    tz
                );
            }
            _ => eprintln!("{} {}", "Error:".style(error_style), err),
        }
    } else {
        eprintln!("{} {:#}", "Error:".style(error_style), err);
    }
}
