pub mod report;

use std::{
    fs,
    io::{self, BufRead},
    path::PathBuf,
};

use anyhow::Result;
use chrono::Local;
use clap::{Parser, Subcommand};
use tracing::level_filters::LevelFilter;

use crate::{
    store::task_store::TaskStore,
    utils::{
        dir::create_application_default_path,
        logging::enable_logging,
        time::{date_key, format_hms},
    },
};

use report::{print_breakdown, print_day, print_series, print_summary, write_csv};

/// Name of the backing file inside the application directory.
pub const DATA_FILE_NAME: &str = "tasks_data.json";

#[derive(Parser, Debug)]
#[command(name = "Tasktrack", version, long_about = None)]
#[command(about = "Offline time tracker for daily tasks", long_about = None)]
struct Args {
    #[command(subcommand)]
    commands: Commands,
    #[arg(
        long,
        help = "Application directory. By default tries to save into $XDG_STATE_HOME or $HOME/.local/state"
    )]
    dir: Option<PathBuf>,
    #[arg(long, help = "Enable logging")]
    log: bool,
}

#[derive(Subcommand, Debug)]
#[command(version, about, long_about = None)]
enum Commands {
    #[command(about = "List tasks, totals and the note for a date")]
    Show {
        #[arg(help = "Date to show, today when omitted")]
        date: Option<String>,
    },
    #[command(about = "Add a task for a date")]
    Add {
        name: String,
        #[arg(long, help = "Date of the task, today when omitted")]
        date: Option<String>,
    },
    #[command(about = "Delete a task permanently. There is no undo")]
    Delete {
        name: String,
        #[arg(long, help = "Date of the task, today when omitted")]
        date: Option<String>,
    },
    #[command(about = "Run a work session for a task: starts a timer, stops on Enter")]
    Track {
        name: String,
        #[arg(long, help = "Date of the task, today when omitted")]
        date: Option<String>,
    },
    #[command(about = "Set a task's description")]
    Describe {
        name: String,
        text: String,
        #[arg(long, help = "Date of the task, today when omitted")]
        date: Option<String>,
    },
    #[command(about = "Set the free-text note for a date")]
    Note {
        text: String,
        #[arg(long, help = "Date of the note, today when omitted")]
        date: Option<String>,
    },
    #[command(about = "Show per-task totals and day counts across all dates")]
    Summary,
    #[command(about = "Export the aggregate summary as CSV")]
    Export {
        #[arg(long, help = "Output file, tasks_aggregated.csv when omitted")]
        out: Option<PathBuf>,
    },
    #[command(about = "Print total hours per day, chart feed for hours-per-day lines")]
    Series,
    #[command(about = "Print per-task seconds for one date, chart feed for daily pies")]
    Breakdown {
        #[arg(help = "Date to break down, today when omitted")]
        date: Option<String>,
    },
}

pub fn run_cli() -> Result<()> {
    let args = Args::parse();

    let dir = match args.dir {
        Some(dir) => {
            fs::create_dir_all(&dir)?;
            dir
        }
        None => create_application_default_path()?,
    };

    let logging_level = if args.log {
        Some(LevelFilter::TRACE)
    } else {
        None
    };
    enable_logging(&dir, logging_level, args.log)?;

    let mut store = TaskStore::load(dir.join(DATA_FILE_NAME))?;

    match args.commands {
        Commands::Show { date } => {
            print_day(&store, &resolve_date(date));
            Ok(())
        }
        Commands::Add { name, date } => {
            let date = resolve_date(date);
            if store.add_task(&date, &name)? {
                println!("Added {name:?} on {date}");
            } else {
                println!("Task {name:?} already exists on {date}");
            }
            Ok(())
        }
        Commands::Delete { name, date } => {
            let date = resolve_date(date);
            if store.delete_task(&date, &name)? {
                println!("Deleted {name:?} on {date}");
            } else {
                println!("No task {name:?} on {date}");
            }
            Ok(())
        }
        Commands::Track { name, date } => track_task(&mut store, &resolve_date(date), &name),
        Commands::Describe { name, text, date } => {
            let date = resolve_date(date);
            if store.set_description(&date, &name, &text)? {
                println!("Updated description of {name:?} on {date}");
            } else {
                println!("No task {name:?} on {date}");
            }
            Ok(())
        }
        Commands::Note { text, date } => {
            let date = resolve_date(date);
            store.set_note(&date, &text)?;
            println!("Saved note for {date}");
            Ok(())
        }
        Commands::Summary => {
            print_summary(&store);
            Ok(())
        }
        Commands::Export { out } => write_csv(&store, out),
        Commands::Series => {
            print_series(&store);
            Ok(())
        }
        Commands::Breakdown { date } => {
            print_breakdown(&store, &resolve_date(date));
            Ok(())
        }
    }
}

/// Timers are in-memory only, so a tracked session has to start and stop
/// inside one invocation. Blocks until the user presses Enter.
fn track_task(store: &mut TaskStore, date: &str, name: &str) -> Result<()> {
    store.start_timer(date, name)?;
    println!("Tracking {name:?} on {date}. Press Enter to stop.");

    let mut line = String::new();
    io::stdin().lock().read_line(&mut line)?;

    if let Some(elapsed) = store.stop_timer(date, name)? {
        let total = store
            .day(date)
            .and_then(|day| day.tasks.get(name))
            .map(|entry| entry.seconds)
            .unwrap_or(0);
        println!(
            "Recorded {} for {name:?}, {} total on {date}",
            format_hms(elapsed),
            format_hms(total),
        );
    }
    Ok(())
}

fn resolve_date(date: Option<String>) -> String {
    date.unwrap_or_else(|| date_key(Local::now().date_naive()))
}
