use std::collections::BTreeMap;

use serde::Deserialize;
use serde::Serialize;

/// Reserved key inside a day object under which the day's note is stored.
/// Never a valid task name.
pub const NOTE_KEY: &str = "_note";

/// Cumulative work record for one task on one date. Entries written by older
/// versions may miss either field, so both fall back to their defaults.
#[derive(PartialEq, Eq, Debug, Serialize, Deserialize, Clone, Default)]
pub struct TaskEntry {
    #[serde(default)]
    pub seconds: u64,
    #[serde(default)]
    pub description: String,
}

/// All tasks recorded for one calendar date plus an optional free-text note.
/// On disk the note shares the day object with the task entries under the
/// [NOTE_KEY] key, which is why the task map is flattened.
#[derive(PartialEq, Eq, Debug, Serialize, Deserialize, Clone, Default)]
pub struct DayRecord {
    #[serde(rename = "_note", default, skip_serializing_if = "Option::is_none")]
    pub note: Option<String>,
    #[serde(flatten)]
    pub tasks: BTreeMap<String, TaskEntry>,
}

impl DayRecord {
    /// A day with no tasks and no note carries no information and is dropped
    /// from the store instead of being persisted as an empty object.
    pub fn is_empty(&self) -> bool {
        self.tasks.is_empty() && self.note.is_none()
    }

    /// Sum of recorded seconds across all tasks of the day.
    pub fn total_seconds(&self) -> u64 {
        self.tasks.values().map(|v| v.seconds).sum()
    }
}

/// The full durable state: day records keyed by date string. Keys are ISO
/// dates by convention, which makes the map's lexicographic order
/// chronological. The store does not enforce the format.
pub type StoreData = BTreeMap<String, DayRecord>;
