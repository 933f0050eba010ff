//! # Tymepace
//!
//! A terminal task calendar. Tasks live in an inbox until you drop them onto
//! a rolling timetable of 1, 3 or 7 days; two tasks never share an hour.
//!
//! ## Usage
//!
//! Run without arguments to open the interactive timetable:
//!
//! ```bash
//! tymepace
//! ```
//!
//! Or drive it from the command line:
//!
//! ```bash
//! tymepace add "Write report" --priority high --category work
//! tymepace place 3f2a9c1b today 9:30 11:00
//! tymepace resize 3f2a9c1b 12:00
//! tymepace show --days 7
//! ```
//!
//! Tasks are stored as JSON under the local data directory
//! (`~/.local/share/tymepace/tasks.json` on Linux). Set `TYMEPACE_DB` or pass
//! `--db` to use another file. Calendar settings are read from
//! `~/.config/tymepace/config.toml`.

use std::io;
use std::process::ExitCode;

use anyhow::{Context, Result};
use chrono::Local;
use clap::{CommandFactory, Parser, Subcommand};
use clap_complete::{generate, Shell};

use tymepace::commands::*;
use tymepace::config::{Config, GlobalArgs};
use tymepace::days::DayWindow;
use tymepace::logging;
use tymepace::models::{Priority, TaskEdit};
use tymepace::tui::run_tui;

#[derive(Parser)]
#[command(name = "tymepace")]
#[command(about = "Terminal task calendar", long_about = None)]
struct Cli {
    #[command(flatten)]
    global: GlobalArgs,

    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
    /// Add a new task to the inbox
    Add {
        /// Task title (quoted if it has spaces)
        title: String,
        /// Longer description
        #[arg(short, long)]
        details: Option<String>,
        /// Priority (low, medium, high, none)
        #[arg(short, long, default_value = "none")]
        priority: Priority,
        /// Color tag; defaults to the priority's color
        #[arg(long)]
        color: Option<String>,
        /// Category such as home, school or work
        #[arg(short, long)]
        category: Option<String>,
    },
    /// List unscheduled tasks
    List {
        /// Include scheduled tasks
        #[arg(short, long)]
        all: bool,
        /// Only show this category
        #[arg(short, long)]
        category: Option<String>,
    },
    /// Edit a task
    Edit {
        id: String,
        /// New title
        #[arg(short, long)]
        title: Option<String>,
        /// New details
        #[arg(short, long)]
        details: Option<String>,
        /// New priority
        #[arg(short, long)]
        priority: Option<Priority>,
        /// New color tag
        #[arg(long)]
        color: Option<String>,
        /// New category (empty string clears it)
        #[arg(short, long)]
        category: Option<String>,
    },
    /// Remove a task
    Remove {
        id: String,
    },
    /// Schedule a task, or move it if already scheduled
    Place {
        id: String,
        /// today, tomorrow, YYYY-MM-DD or a weekday label
        day: String,
        /// Start time, e.g. 9, 9:30, 9.5 or 2pm
        start: String,
        /// End time; defaults to one granularity unit after start
        end: Option<String>,
    },
    /// Change when a scheduled task ends
    Resize {
        id: String,
        /// New end time
        end: String,
    },
    /// Return a scheduled task to the inbox
    Retract {
        id: String,
    },
    /// Print the timetable
    Show {
        /// First day of the window (default: today)
        #[arg(short, long)]
        from: Option<String>,
        /// Window size: 1, 3 or 7
        #[arg(short, long)]
        days: Option<u32>,
        /// Only name entries of this category; others show as busy
        #[arg(short, long)]
        category: Option<String>,
        /// Print every free hour instead of merged ranges
        #[arg(long)]
        full: bool,
    },
    /// Reset the database (delete all tasks)
    Reset {
        /// Skip confirmation prompt
        #[arg(short, long)]
        force: bool,
    },
    /// Generate shell completions
    Completions {
        /// Shell to generate completions for (bash, zsh, fish, powershell, elvish)
        shell: String,
    },
    /// Open interactive TUI
    Ui,
}

fn main() -> ExitCode {
    let cli = Cli::parse();
    match run(cli) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("Error: {:#}", e);
            ExitCode::FAILURE
        }
    }
}

fn run(cli: Cli) -> Result<()> {
    let config = Config::load(&cli.global).context("failed to load configuration")?;

    let command = cli.command.unwrap_or(Commands::Ui);
    if !matches!(command, Commands::Ui) {
        logging::init_stderr(&config.log_level);
    }

    match command {
        Commands::Add { title, details, priority, color, category } => {
            cmd_add(&config, title, details, priority, color, category).map(drop)
        }
        Commands::List { all, category } => cmd_list(&config, all, category),
        Commands::Edit { id, title, details, priority, color, category } => {
            let edit = TaskEdit { title, details, priority, color, category };
            cmd_edit(&config, &id, edit)
        }
        Commands::Remove { id } => cmd_remove(&config, &id),
        Commands::Place { id, day, start, end } => {
            cmd_place(&config, &id, &day, &start, end.as_deref()).map(drop)
        }
        Commands::Resize { id, end } => cmd_resize(&config, &id, &end).map(drop),
        Commands::Retract { id } => cmd_retract(&config, &id),
        Commands::Show { from, days, category, full } => {
            cmd_show(&config, from.as_deref(), days, category.as_deref(), full)
        }
        Commands::Reset { force } => cmd_reset(&config, force),
        Commands::Completions { shell } => {
            let shell_enum = match shell.as_str() {
                "bash" => Shell::Bash,
                "zsh" => Shell::Zsh,
                "fish" => Shell::Fish,
                "powershell" => Shell::PowerShell,
                "elvish" => Shell::Elvish,
                _ => anyhow::bail!("unsupported shell: {}", shell),
            };
            let mut cmd = Cli::command();
            generate(shell_enum, &mut cmd, "tymepace", &mut io::stdout());
            Ok(())
        }
        Commands::Ui => run_ui(&config),
    }
}

fn run_ui(config: &Config) -> Result<()> {
    // The TUI owns the terminal, so logs go to a file.
    let _guard = logging::init_file(&config.log_level, &logging::default_log_path(&config.db_path));
    let calendar = open_calendar(config)?;
    let window = DayWindow::new(Local::now().date_naive(), config.window);
    run_tui(calendar, window).context("error running TUI")
}
