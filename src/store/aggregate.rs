use std::collections::{BTreeMap, HashMap};

use super::entities::StoreData;

/// One task's stored state on a single date, as shown on the main screen.
#[derive(Debug, PartialEq, Eq, Clone)]
pub struct DayTask {
    pub name: String,
    pub seconds: u64,
    pub description: String,
}

/// Per-date rollup for the "active tasks / total time today" display.
#[derive(Debug, Default, PartialEq, Eq, Clone)]
pub struct DailyTotals {
    pub tasks: Vec<DayTask>,
    pub total_seconds: u64,
}

impl DailyTotals {
    pub fn count(&self) -> usize {
        self.tasks.len()
    }
}

/// Cross-date rollup for one distinct task name. A date appears in `per_day`
/// only when the task has seconds recorded there, so `days()` counts days the
/// task was actually worked on; entries that were added but never timed don't
/// count.
#[derive(Debug, Default, PartialEq, Eq, Clone)]
pub struct TaskSummary {
    pub name: String,
    pub total_seconds: u64,
    pub per_day: BTreeMap<String, u64>,
}

impl TaskSummary {
    pub fn days(&self) -> usize {
        self.per_day.len()
    }
}

/// Returns every task recorded on `date` with the summed total.
pub fn daily_totals(data: &StoreData, date: &str) -> DailyTotals {
    let Some(day) = data.get(date) else {
        return DailyTotals::default();
    };
    let tasks: Vec<DayTask> = day
        .tasks
        .iter()
        .map(|(name, entry)| DayTask {
            name: name.clone(),
            seconds: entry.seconds,
            description: entry.description.clone(),
        })
        .collect();
    let total_seconds = tasks.iter().map(|v| v.seconds).sum();
    DailyTotals {
        tasks,
        total_seconds,
    }
}

/// Aggregates every distinct task name across all dates. Output is sorted by
/// name, case-insensitively with the exact name as tie-break, so the summary
/// is stable regardless of which date a task first appeared on.
pub fn all_task_summary(data: &StoreData) -> Vec<TaskSummary> {
    let mut map = HashMap::<String, TaskSummary>::new();

    for (date, day) in data {
        for (name, entry) in &day.tasks {
            let summary = map.entry(name.clone()).or_insert_with(|| TaskSummary {
                name: name.clone(),
                ..TaskSummary::default()
            });
            summary.total_seconds += entry.seconds;
            if entry.seconds > 0 {
                summary.per_day.insert(date.clone(), entry.seconds);
            }
        }
    }

    let mut summaries = map.into_values().collect::<Vec<_>>();
    summaries.sort_by(|a, b| {
        a.name
            .to_lowercase()
            .cmp(&b.name.to_lowercase())
            .then_with(|| a.name.cmp(&b.name))
    });
    summaries
}

/// Ordered series of (date, total hours) over every recorded day, for the
/// hours-per-day line chart. Days that only carry a note contribute 0.0.
pub fn hours_per_day_series(data: &StoreData) -> Vec<(String, f64)> {
    data.iter()
        .map(|(date, day)| (date.clone(), day.total_seconds() as f64 / 3600.0))
        .collect()
}

/// Task/seconds pairs for one date, for the per-day pie chart. Tasks with no
/// recorded time are excluded, a pie slice of zero renders as nothing anyway.
pub fn per_day_distribution(data: &StoreData, date: &str) -> Vec<(String, u64)> {
    let Some(day) = data.get(date) else {
        return vec![];
    };
    day.tasks
        .iter()
        .filter(|(_, entry)| entry.seconds > 0)
        .map(|(name, entry)| (name.clone(), entry.seconds))
        .collect()
}
