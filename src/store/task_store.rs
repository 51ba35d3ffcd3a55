use std::{
    collections::HashMap,
    fs,
    io::ErrorKind,
    path::{Path, PathBuf},
};

use anyhow::{bail, Context, Result};
use chrono::{DateTime, Utc};
use tracing::{debug, error, warn};

use crate::utils::clock::{Clock, SystemClock};

use super::entities::{DayRecord, StoreData, TaskEntry, NOTE_KEY};

/// Sole owner of the durable task-tracking state. Every read and write of the
/// backing file funnels through this type: mutating operations update the
/// in-memory [StoreData] and immediately persist the whole document.
///
/// Running timers are in-memory only. A session that was never stopped is
/// lost when the process exits; its elapsed time is folded into the entry's
/// seconds only on [TaskStore::stop_timer].
pub struct TaskStore {
    path: PathBuf,
    data: StoreData,
    timers: HashMap<(String, String), DateTime<Utc>>,
    clock: Box<dyn Clock>,
}

impl TaskStore {
    /// Loads the store from `path`. A missing file yields an empty store. An
    /// unparseable file is moved aside to `<path>.backup.<unix-ts>` and an
    /// empty store is substituted, so corrupt content never fails the caller.
    /// Unrecoverable I/O conditions (permissions, failed backup rename) do.
    pub fn load(path: impl Into<PathBuf>) -> Result<Self> {
        Self::load_with_clock(path, Box::new(SystemClock))
    }

    pub fn load_with_clock(path: impl Into<PathBuf>, clock: Box<dyn Clock>) -> Result<Self> {
        let path = path.into();
        let data = load_data(&path, clock.as_ref())?;
        Ok(Self {
            path,
            data,
            timers: HashMap::new(),
            clock,
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn data(&self) -> &StoreData {
        &self.data
    }

    pub fn day(&self, date: &str) -> Option<&DayRecord> {
        self.data.get(date)
    }

    pub fn note(&self, date: &str) -> Option<&str> {
        self.data.get(date).and_then(|day| day.note.as_deref())
    }

    /// Writes the full store to disk, replacing the previous content. The
    /// document goes to a sibling temp file first and is renamed over the
    /// original, so a crash mid-write can't truncate the backing file.
    pub fn save(&self) -> Result<()> {
        let tmp = sibling_path(&self.path, ".tmp");
        let json = serde_json::to_string_pretty(&self.data)?;
        fs::write(&tmp, json).with_context(|| format!("Failed to write {tmp:?}"))?;
        if let Err(e) = fs::rename(&tmp, &self.path) {
            // Don't leave a stale temp file around for a later save to
            // silently overwrite.
            let _ = fs::remove_file(&tmp);
            return Err(e).with_context(|| format!("Failed to replace {:?}", self.path));
        }
        Ok(())
    }

    /// Creates a task with zero seconds and an empty description. Returns
    /// false without touching the store when the task already exists or the
    /// name is blank. The note key is reserved and rejected outright.
    pub fn add_task(&mut self, date: &str, name: &str) -> Result<bool> {
        if name == NOTE_KEY {
            bail!("{NOTE_KEY:?} is reserved for day notes and can't be used as a task name");
        }
        if name.trim().is_empty() {
            debug!("Ignoring empty task name on {date}");
            return Ok(false);
        }
        let day = self.data.entry(date.to_string()).or_default();
        if day.tasks.contains_key(name) {
            debug!("Task {name:?} already exists on {date}");
            return Ok(false);
        }
        day.tasks.insert(name.to_string(), TaskEntry::default());
        self.save()?;
        Ok(true)
    }

    /// Removes the task permanently, along with its running timer if any.
    /// There is no undo. A day left with no tasks and no note is dropped.
    pub fn delete_task(&mut self, date: &str, name: &str) -> Result<bool> {
        let Some(day) = self.data.get_mut(date) else {
            debug!("Nothing to delete, no tasks on {date}");
            return Ok(false);
        };
        if day.tasks.remove(name).is_none() {
            debug!("Nothing to delete, no task {name:?} on {date}");
            return Ok(false);
        }
        self.timers.remove(&(date.to_string(), name.to_string()));
        if day.is_empty() {
            self.data.remove(date);
        }
        self.save()?;
        Ok(true)
    }

    /// Starts a session timer for the task. Returns false when the timer is
    /// already running. Transient state only, nothing is persisted until the
    /// matching [TaskStore::stop_timer].
    pub fn start_timer(&mut self, date: &str, name: &str) -> Result<bool> {
        if !self.contains_task(date, name) {
            bail!("Can't start a timer, no task {name:?} on {date}");
        }
        let key = (date.to_string(), name.to_string());
        if self.timers.contains_key(&key) {
            debug!("Timer for {name:?} on {date} is already running");
            return Ok(false);
        }
        self.timers.insert(key, self.clock.now());
        Ok(true)
    }

    /// Stops the session timer, folds the elapsed seconds into the entry and
    /// persists. Returns `None` when no timer is running, which makes a
    /// repeated stop a no-op. Elapsed time is clamped at zero so a clock that
    /// jumped backwards can't shrink the recorded total.
    pub fn stop_timer(&mut self, date: &str, name: &str) -> Result<Option<u64>> {
        let key = (date.to_string(), name.to_string());
        let Some(started_at) = self.timers.remove(&key) else {
            debug!("No running timer for {name:?} on {date}");
            return Ok(None);
        };
        let now = self.clock.now();
        let elapsed = (now - started_at).num_seconds().max(0) as u64;
        if now < started_at {
            warn!("Clock went backwards during a session of {name:?} on {date}, recording 0s");
        }
        let day = self.data.entry(date.to_string()).or_default();
        let entry = day.tasks.entry(name.to_string()).or_default();
        entry.seconds += elapsed;
        self.save()?;
        Ok(Some(elapsed))
    }

    /// Seconds accumulated by the currently running session, if one exists.
    pub fn running_elapsed(&self, date: &str, name: &str) -> Option<u64> {
        let started_at = self
            .timers
            .get(&(date.to_string(), name.to_string()))?;
        Some((self.clock.now() - *started_at).num_seconds().max(0) as u64)
    }

    /// Number of timers currently running on the given date.
    pub fn running_count(&self, date: &str) -> usize {
        self.timers.keys().filter(|(d, _)| d == date).count()
    }

    /// Overwrites the task's description. Returns false when the task does
    /// not exist.
    pub fn set_description(&mut self, date: &str, name: &str, text: &str) -> Result<bool> {
        let Some(entry) = self
            .data
            .get_mut(date)
            .and_then(|day| day.tasks.get_mut(name))
        else {
            debug!("Can't describe {name:?} on {date}, no such task");
            return Ok(false);
        };
        entry.description = text.to_string();
        self.save()?;
        Ok(true)
    }

    /// Overwrites the day's note, creating the day record if needed.
    pub fn set_note(&mut self, date: &str, text: &str) -> Result<()> {
        let day = self.data.entry(date.to_string()).or_default();
        day.note = Some(text.to_string());
        self.save()?;
        Ok(())
    }

    fn contains_task(&self, date: &str, name: &str) -> bool {
        self.data
            .get(date)
            .is_some_and(|day| day.tasks.contains_key(name))
    }
}

fn load_data(path: &Path, clock: &dyn Clock) -> Result<StoreData> {
    let raw = match fs::read_to_string(path) {
        Ok(v) => v,
        Err(e) if e.kind() == ErrorKind::NotFound => {
            debug!("No backing file at {path:?}, starting empty");
            return Ok(StoreData::new());
        }
        Err(e) => return Err(e).with_context(|| format!("Failed to read {path:?}")),
    };
    match serde_json::from_str::<StoreData>(&raw) {
        Ok(v) => Ok(v),
        Err(e) => {
            let backup = sibling_path(path, &format!(".backup.{}", clock.now().timestamp()));
            error!("Backing file {path:?} is unreadable ({e}), moving it to {backup:?}");
            fs::rename(path, &backup)
                .with_context(|| format!("Failed to back up corrupt file to {backup:?}"))?;
            Ok(StoreData::new())
        }
    }
}

/// Appends a suffix to the full file name, keeping the original extension.
fn sibling_path(path: &Path, suffix: &str) -> PathBuf {
    let mut name = path.as_os_str().to_os_string();
    name.push(suffix);
    PathBuf::from(name)
}

#[cfg(test)]
mod tests {
    use std::{fs, sync::LazyLock};

    use anyhow::Result;
    use chrono::{DateTime, Duration, Utc};
    use mockall::Sequence;
    use tempfile::tempdir;

    use crate::utils::{
        clock::{MockClock, SystemClock},
        logging::TEST_LOGGING,
    };

    use super::TaskStore;

    fn moments(times: &[DateTime<Utc>]) -> Box<MockClock> {
        let mut clock = MockClock::new();
        let mut seq = Sequence::new();
        for time in times {
            clock
                .expect_now()
                .times(1)
                .in_sequence(&mut seq)
                .return_const(*time);
        }
        Box::new(clock)
    }

    fn t0() -> DateTime<Utc> {
        DateTime::parse_from_rfc3339("2025-08-18T09:00:00Z")
            .unwrap()
            .with_timezone(&Utc)
    }

    #[test]
    fn test_load_missing_file_is_empty() -> Result<()> {
        let dir = tempdir()?;
        let store = TaskStore::load(dir.path().join("tasks_data.json"))?;
        assert!(store.data().is_empty());
        Ok(())
    }

    #[test]
    fn test_save_load_is_fixed_point() -> Result<()> {
        let dir = tempdir()?;
        let path = dir.path().join("tasks_data.json");

        let mut store = TaskStore::load(&path)?;
        store.add_task("2025-08-18", "German")?;
        store.add_task("2025-08-19", "Reading")?;
        store.set_note("2025-08-18", "busy day")?;

        let reloaded = TaskStore::load(&path)?;
        assert_eq!(reloaded.data(), store.data());

        // Saving a freshly loaded store must not change the file.
        let before = fs::read_to_string(&path)?;
        reloaded.save()?;
        let after = fs::read_to_string(&path)?;
        assert_eq!(before, after);
        Ok(())
    }

    #[test]
    fn test_corrupt_file_is_backed_up_and_replaced() -> Result<()> {
        LazyLock::force(&TEST_LOGGING);
        let dir = tempdir()?;
        let path = dir.path().join("tasks_data.json");
        fs::write(&path, "{ not valid json")?;

        let store = TaskStore::load_with_clock(&path, moments(&[t0()]))?;
        assert!(store.data().is_empty());

        let backup = dir
            .path()
            .join(format!("tasks_data.json.backup.{}", t0().timestamp()));
        assert_eq!(fs::read_to_string(backup)?, "{ not valid json");
        assert!(!path.exists());
        Ok(())
    }

    #[test]
    fn test_add_task_rules() -> Result<()> {
        let dir = tempdir()?;
        let mut store = TaskStore::load(dir.path().join("tasks_data.json"))?;

        assert!(store.add_task("2025-08-18", "German")?);
        assert!(!store.add_task("2025-08-18", "German")?);
        assert!(!store.add_task("2025-08-18", "  ")?);
        assert!(store.add_task("2025-08-18", "_note").is_err());

        let day = store.day("2025-08-18").unwrap();
        assert_eq!(day.tasks.len(), 1);
        assert_eq!(day.tasks["German"].seconds, 0);
        Ok(())
    }

    #[test]
    fn test_timer_accumulates_elapsed_seconds() -> Result<()> {
        let dir = tempdir()?;
        let path = dir.path().join("tasks_data.json");
        let clock = moments(&[t0(), t0() + Duration::seconds(3600)]);
        let mut store = TaskStore::load_with_clock(&path, clock)?;

        store.add_task("2025-08-18", "German")?;
        assert!(store.start_timer("2025-08-18", "German")?);
        assert_eq!(store.stop_timer("2025-08-18", "German")?, Some(3600));
        assert_eq!(store.day("2025-08-18").unwrap().tasks["German"].seconds, 3600);

        assert!(store.set_description("2025-08-18", "German", "Vocabulary drill")?);

        let reloaded = TaskStore::load(&path)?;
        let entry = &reloaded.day("2025-08-18").unwrap().tasks["German"];
        assert_eq!(entry.seconds, 3600);
        assert_eq!(entry.description, "Vocabulary drill");
        Ok(())
    }

    #[test]
    fn test_stop_without_running_timer_is_noop() -> Result<()> {
        let dir = tempdir()?;
        let clock = moments(&[t0(), t0() + Duration::seconds(60)]);
        let mut store =
            TaskStore::load_with_clock(dir.path().join("tasks_data.json"), clock)?;

        store.add_task("2025-08-18", "German")?;
        store.start_timer("2025-08-18", "German")?;
        store.stop_timer("2025-08-18", "German")?;
        assert_eq!(store.stop_timer("2025-08-18", "German")?, None);
        assert_eq!(store.day("2025-08-18").unwrap().tasks["German"].seconds, 60);
        Ok(())
    }

    #[test]
    fn test_start_twice_is_noop_and_unknown_task_errors() -> Result<()> {
        let dir = tempdir()?;
        let clock = moments(&[t0()]);
        let mut store =
            TaskStore::load_with_clock(dir.path().join("tasks_data.json"), clock)?;

        store.add_task("2025-08-18", "German")?;
        assert!(store.start_timer("2025-08-18", "German")?);
        assert!(!store.start_timer("2025-08-18", "German")?);
        assert!(store.start_timer("2025-08-18", "Missing").is_err());
        assert_eq!(store.running_count("2025-08-18"), 1);
        Ok(())
    }

    #[test]
    fn test_backwards_clock_clamps_to_zero() -> Result<()> {
        let dir = tempdir()?;
        let clock = moments(&[t0(), t0() - Duration::seconds(30)]);
        let mut store =
            TaskStore::load_with_clock(dir.path().join("tasks_data.json"), clock)?;

        store.add_task("2025-08-18", "German")?;
        store.start_timer("2025-08-18", "German")?;
        assert_eq!(store.stop_timer("2025-08-18", "German")?, Some(0));
        assert_eq!(store.day("2025-08-18").unwrap().tasks["German"].seconds, 0);
        Ok(())
    }

    #[test]
    fn test_seconds_grow_monotonically_across_sessions() -> Result<()> {
        let dir = tempdir()?;
        let clock = moments(&[
            t0(),
            t0() + Duration::seconds(10),
            t0() + Duration::seconds(20),
            t0() + Duration::seconds(25),
        ]);
        let mut store =
            TaskStore::load_with_clock(dir.path().join("tasks_data.json"), clock)?;

        store.add_task("2025-08-18", "German")?;
        let mut previous = 0;
        for _ in 0..2 {
            store.start_timer("2025-08-18", "German")?;
            store.stop_timer("2025-08-18", "German")?;
            let seconds = store.day("2025-08-18").unwrap().tasks["German"].seconds;
            assert!(seconds >= previous);
            previous = seconds;
        }
        assert_eq!(previous, 15);
        Ok(())
    }

    #[test]
    fn test_delete_task_is_permanent() -> Result<()> {
        let dir = tempdir()?;
        let path = dir.path().join("tasks_data.json");
        let mut store = TaskStore::load(&path)?;

        store.add_task("2025-08-18", "German")?;
        store.add_task("2025-08-18", "Reading")?;
        assert!(store.delete_task("2025-08-18", "German")?);
        assert!(!store.delete_task("2025-08-18", "German")?);
        assert!(!store.delete_task("2025-08-20", "German")?);

        let reloaded = TaskStore::load(&path)?;
        assert!(!reloaded.day("2025-08-18").unwrap().tasks.contains_key("German"));
        Ok(())
    }

    #[test]
    fn test_deleting_last_task_drops_the_day_unless_noted() -> Result<()> {
        let dir = tempdir()?;
        let mut store = TaskStore::load(dir.path().join("tasks_data.json"))?;

        store.add_task("2025-08-18", "German")?;
        store.delete_task("2025-08-18", "German")?;
        assert!(store.day("2025-08-18").is_none());

        store.add_task("2025-08-19", "German")?;
        store.set_note("2025-08-19", "keep me")?;
        store.delete_task("2025-08-19", "German")?;
        assert_eq!(store.note("2025-08-19"), Some("keep me"));
        Ok(())
    }

    #[test]
    fn test_failed_save_surfaces_error_and_keeps_memory_state() -> Result<()> {
        let dir = tempdir()?;
        // The parent directory doesn't exist, so every write fails while the
        // (absent) backing file still loads as an empty store.
        let path = dir.path().join("missing").join("tasks_data.json");
        let mut store = TaskStore::load(&path)?;

        assert!(store.add_task("2025-08-18", "German").is_err());
        assert!(store.day("2025-08-18").unwrap().tasks.contains_key("German"));

        // Once the disk recovers the caller can retry the save.
        fs::create_dir(dir.path().join("missing"))?;
        store.save()?;
        let reloaded = TaskStore::load(&path)?;
        assert!(reloaded.day("2025-08-18").unwrap().tasks.contains_key("German"));
        Ok(())
    }

    #[test]
    fn test_failed_replace_removes_temp_file() -> Result<()> {
        let dir = tempdir()?;
        let path = dir.path().join("tasks_data.json");
        let mut store = TaskStore::load(&path)?;
        store.add_task("2025-08-18", "German")?;

        // A directory at the backing path makes the rename step fail after
        // the temp file was written.
        fs::remove_file(&path)?;
        fs::create_dir(&path)?;
        assert!(store.save().is_err());
        assert!(!dir.path().join("tasks_data.json.tmp").exists());
        Ok(())
    }

    #[test]
    fn test_note_roundtrip() -> Result<()> {
        let dir = tempdir()?;
        let path = dir.path().join("tasks_data.json");
        let mut store = TaskStore::load(&path)?;

        store.set_note("2025-08-18", "stand-up at 10")?;
        store.set_note("2025-08-18", "stand-up moved to 11")?;

        let reloaded = TaskStore::load(&path)?;
        assert_eq!(reloaded.note("2025-08-18"), Some("stand-up moved to 11"));
        Ok(())
    }

    #[test]
    fn test_system_clock_store_builds() -> Result<()> {
        let dir = tempdir()?;
        let mut store = TaskStore::load_with_clock(
            dir.path().join("tasks_data.json"),
            Box::new(SystemClock),
        )?;
        store.add_task("2025-08-18", "German")?;
        store.start_timer("2025-08-18", "German")?;
        let recorded = store.stop_timer("2025-08-18", "German")?.unwrap();
        assert!(recorded < 60);
        Ok(())
    }
}
