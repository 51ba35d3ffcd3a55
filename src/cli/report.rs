use std::{fs, path::PathBuf};

use anyhow::{Context, Result};

use crate::{
    store::{
        aggregate::{all_task_summary, daily_totals, hours_per_day_series, per_day_distribution},
        export::aggregate_csv,
        task_store::TaskStore,
    },
    utils::time::{format_hms, format_hours},
};

/// Main-screen view of one date: tasks with times and descriptions, running
/// timers, the day total and the note.
pub fn print_day(store: &TaskStore, date: &str) {
    let totals = daily_totals(store.data(), date);
    if totals.count() == 0 {
        println!("No tasks on {date}");
    }
    for task in &totals.tasks {
        let running = match store.running_elapsed(date, &task.name) {
            Some(elapsed) => format!("  [running, +{}]", format_hms(elapsed)),
            None => String::new(),
        };
        println!("{}\t{}{running}", format_hms(task.seconds), task.name);
        if !task.description.is_empty() {
            println!("\t{}", task.description);
        }
    }
    println!(
        "Tasks: {} | Running: {} | Total (H:MM:SS): {} | Hours: {}",
        totals.count(),
        store.running_count(date),
        format_hms(totals.total_seconds),
        format_hours(totals.total_seconds),
    );
    if let Some(note) = store.note(date) {
        println!("Note: {note}");
    }
}

pub fn print_summary(store: &TaskStore) {
    let summaries = all_task_summary(store.data());
    if summaries.is_empty() {
        println!("No tasks recorded yet.");
        return;
    }
    for summary in summaries {
        println!(
            "{}\tTotal: {} | Days: {} | Hours: {}",
            summary.name,
            format_hms(summary.total_seconds),
            summary.days(),
            format_hours(summary.total_seconds),
        );
        for (date, seconds) in &summary.per_day {
            println!("\t{date}\t{}\t{} h", format_hms(*seconds), format_hours(*seconds));
        }
    }
}

pub fn print_series(store: &TaskStore) {
    for (date, hours) in hours_per_day_series(store.data()) {
        println!("{date}\t{hours:.2}");
    }
}

pub fn print_breakdown(store: &TaskStore, date: &str) {
    let slices = per_day_distribution(store.data(), date);
    if slices.is_empty() {
        println!("No recorded time on {date}");
        return;
    }
    for (name, seconds) in slices {
        println!("{}\t{name}", format_hms(seconds));
    }
}

pub fn write_csv(store: &TaskStore, out: Option<PathBuf>) -> Result<()> {
    let out = out.unwrap_or_else(|| PathBuf::from("tasks_aggregated.csv"));
    let summaries = all_task_summary(store.data());
    let csv = aggregate_csv(&summaries);
    fs::write(&out, csv).with_context(|| format!("Failed to write {out:?}"))?;
    println!("Exported {} tasks to {}", summaries.len(), out.display());
    Ok(())
}
