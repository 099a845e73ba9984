//! TodoZen command line front end.
//!
//! # Responsibility
//! - Parse commands and wire configuration, storage and scoring together.
//! - Keep all task rules in `todozen_core`; this binary only renders.

use anyhow::{Context, Result};
use chrono::NaiveDate;
use clap::{Parser, Subcommand};
use std::path::PathBuf;

mod commands;

#[derive(Parser)]
#[command(name = "todozen")]
#[command(about = "TodoZen - tasks with AI prioritization", long_about = None)]
struct Cli {
    /// Directory holding the task database and logs
    #[arg(long, global = true)]
    data_dir: Option<PathBuf>,

    /// trace|debug|info|warn|error
    #[arg(long, global = true)]
    log_level: Option<String>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Add a task
    Add {
        description: String,
        /// Due date as YYYY-MM-DD
        #[arg(long, value_parser = parse_date)]
        due: Option<NaiveDate>,
        /// Due time as HH:mm, requires --due
        #[arg(long)]
        time: Option<String>,
    },
    /// List tasks in display order
    List {
        /// Case-insensitive description filter
        #[arg(long, short)]
        search: Option<String>,
    },
    /// Mark a task done, or open again
    Toggle { id: String },
    /// Delete a task
    Delete { id: String },
    /// Show one task in focus mode
    Focus { id: String },
    /// Ask Gemini to score open tasks
    Prioritize,
    /// Show a push payload as a notification
    Push { payload: String },
}

fn parse_date(raw: &str) -> Result<NaiveDate, String> {
    NaiveDate::parse_from_str(raw, "%Y-%m-%d").map_err(|err| format!("expected YYYY-MM-DD: {err}"))
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let mut config = todozen_core::TodoConfig::from_env().context("invalid configuration")?;
    if let Some(dir) = cli.data_dir {
        config.data_dir = dir;
    }
    if let Some(level) = cli.log_level {
        config.log_level = level;
    }
    if config.data_dir.is_relative() {
        config.data_dir = std::env::current_dir()
            .context("cannot resolve working directory")?
            .join(&config.data_dir);
    }

    todozen_core::init_logging(&config.log_level, &config.log_dir())
        .context("cannot start logging")?;

    let conn = todozen_core::db::open_db(config.db_path())
        .with_context(|| format!("cannot open {}", config.db_path().display()))?;
    let mut app = commands::App::open(&conn, &config)?;

    match cli.command {
        Commands::Add {
            description,
            due,
            time,
        } => app.add(description, due, time)?,
        Commands::List { search } => app.list(search.as_deref().unwrap_or("")),
        Commands::Toggle { id } => app.toggle(&id)?,
        Commands::Delete { id } => app.delete(&id)?,
        Commands::Focus { id } => app.focus(&id)?,
        Commands::Prioritize => app.prioritize(&config).await?,
        Commands::Push { payload } => app.push(&payload)?,
    }

    Ok(())
}
