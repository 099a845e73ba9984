//! Task store over keyed local storage.
//!
//! # Responsibility
//! - Own the canonical task collection (newest first).
//! - Load it from, and persist it to, the `todozen-tasks` storage key.
//!
//! # Invariants
//! - Every mutation persists before returning; on a failed write the
//!   in-memory collection keeps its previous value.
//! - A missing key is the only trigger for the seed set; an emptied list is
//!   persisted as `[]`.
//! - A seeded collection is written back on open so its ids survive restarts.
//! - Corrupt persisted state falls back to the seed set and is logged, never
//!   surfaced as an error. The unreadable blob is kept under
//!   `todozen-tasks.corrupt` before the seeds replace it.
//! - Task ids are unique within the collection.

use crate::model::task::{NewTask, Task, TaskId, TaskValidationError};
use crate::prioritize::gateway::merge_scores;
use crate::prioritize::scoring::ScoredTask;
use crate::repo::kv_repo::{KeyValueRepository, RepoError};
use crate::store::seed::seed_tasks;
use chrono::{Local, NaiveDateTime};
use log::{error, info};
use std::collections::HashSet;
use std::error::Error;
use std::fmt::{Display, Formatter};

/// Storage key holding the JSON task array.
pub const TASKS_STORAGE_KEY: &str = "todozen-tasks";

/// Storage key receiving the last blob that failed to load.
pub const CORRUPT_BACKUP_KEY: &str = "todozen-tasks.corrupt";

pub type StoreResult<T> = Result<T, StoreError>;

#[derive(Debug)]
pub enum StoreError {
    Storage(RepoError),
    Validation(TaskValidationError),
    DuplicateId(TaskId),
    Encode(String),
}

impl Display for StoreError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Storage(err) => write!(f, "{err}"),
            Self::Validation(err) => write!(f, "{err}"),
            Self::DuplicateId(id) => write!(f, "duplicate task id {id}"),
            Self::Encode(message) => write!(f, "failed to encode tasks: {message}"),
        }
    }
}

impl Error for StoreError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Storage(err) => Some(err),
            Self::Validation(err) => Some(err),
            Self::DuplicateId(_) | Self::Encode(_) => None,
        }
    }
}

impl From<RepoError> for StoreError {
    fn from(value: RepoError) -> Self {
        Self::Storage(value)
    }
}

impl From<TaskValidationError> for StoreError {
    fn from(value: TaskValidationError) -> Self {
        Self::Validation(value)
    }
}

/// Where the loaded collection came from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LoadSource {
    Stored,
    /// Key was never written.
    SeededMissing,
    /// Stored blob could not be decoded or violated invariants.
    SeededCorrupt(String),
}

/// Reads the task collection from storage.
///
/// # Errors
/// Only storage transport failures are returned. Missing or corrupt data
/// yields the seed set.
pub fn load_tasks<R: KeyValueRepository>(
    repo: &R,
    now: NaiveDateTime,
) -> StoreResult<(Vec<Task>, LoadSource)> {
    let Some(raw) = repo.get_item(TASKS_STORAGE_KEY)? else {
        info!("event=tasks_load module=store status=ok source=seed reason=missing");
        return Ok((seed_tasks(now), LoadSource::SeededMissing));
    };

    match decode_tasks(&raw) {
        Ok(tasks) => {
            info!(
                "event=tasks_load module=store status=ok source=stored task_count={}",
                tasks.len()
            );
            Ok((tasks, LoadSource::Stored))
        }
        Err(reason) => {
            error!(
                "event=tasks_load module=store status=error source=seed error_code=corrupt_state bytes={} error={}",
                raw.len(),
                reason
            );
            Ok((seed_tasks(now), LoadSource::SeededCorrupt(reason)))
        }
    }
}

/// Persists the full collection, including the empty one.
///
/// # Errors
/// Returns validation errors for invalid records and storage errors from the
/// repository. Nothing is written when validation fails.
pub fn save_tasks<R: KeyValueRepository>(repo: &R, tasks: &[Task]) -> StoreResult<()> {
    check_collection(tasks)?;
    let json = serde_json::to_string(tasks).map_err(|err| StoreError::Encode(err.to_string()))?;
    repo.set_item(TASKS_STORAGE_KEY, &json)?;
    Ok(())
}

fn decode_tasks(raw: &str) -> Result<Vec<Task>, String> {
    let tasks: Vec<Task> = serde_json::from_str(raw).map_err(|err| err.to_string())?;
    check_collection(&tasks).map_err(|err| err.to_string())?;
    Ok(tasks)
}

fn check_collection(tasks: &[Task]) -> StoreResult<()> {
    let mut seen = HashSet::with_capacity(tasks.len());
    for task in tasks {
        task.validate()?;
        if !seen.insert(&task.id) {
            return Err(StoreError::DuplicateId(task.id.clone()));
        }
    }
    Ok(())
}

/// Owned task collection with synchronous mutate-then-persist operations.
pub struct TaskStore<R: KeyValueRepository> {
    repo: R,
    tasks: Vec<Task>,
    source: LoadSource,
}

impl<R: KeyValueRepository> TaskStore<R> {
    /// Loads the collection using the current local time for seed dates.
    pub fn open(repo: R) -> StoreResult<Self> {
        Self::open_at(repo, Local::now().naive_local())
    }

    /// Loads the collection with an explicit "now" for seed dates.
    ///
    /// A seeded collection is persisted right away. A failed seed write is
    /// logged and the store keeps the seeds in memory; the next mutation
    /// retries the write.
    pub fn open_at(repo: R, now: NaiveDateTime) -> StoreResult<Self> {
        let (tasks, source) = load_tasks(&repo, now)?;
        if source != LoadSource::Stored {
            persist_seed(&repo, &tasks, &source);
        }
        Ok(Self {
            repo,
            tasks,
            source,
        })
    }

    /// Tasks in store order (newest first).
    pub fn tasks(&self) -> &[Task] {
        &self.tasks
    }

    pub fn get(&self, id: &TaskId) -> Option<&Task> {
        self.tasks.iter().find(|task| &task.id == id)
    }

    pub fn contains(&self, id: &TaskId) -> bool {
        self.get(id).is_some()
    }

    /// How the collection was obtained when the store was opened.
    pub fn load_source(&self) -> &LoadSource {
        &self.source
    }

    /// Creates a task and prepends it.
    pub fn add(&mut self, input: NewTask) -> StoreResult<Task> {
        let task = Task::new(input);
        task.validate()?;

        let mut next = Vec::with_capacity(self.tasks.len() + 1);
        next.push(task.clone());
        next.extend(self.tasks.iter().cloned());
        self.commit(next)?;

        info!(
            "event=task_add module=store status=ok task_id={} has_due_date={}",
            task.id,
            task.due_date.is_some()
        );
        Ok(task)
    }

    /// Flips completion. Returns `false` without writing when `id` is unknown.
    pub fn toggle(&mut self, id: &TaskId) -> StoreResult<bool> {
        let Some(index) = self.position(id) else {
            return Ok(false);
        };

        let mut next = self.tasks.clone();
        next[index].toggle();
        let completed = next[index].completed;
        self.commit(next)?;

        info!(
            "event=task_toggle module=store status=ok task_id={} completed={}",
            id, completed
        );
        Ok(true)
    }

    /// Removes a task. Returns `None` without writing when `id` is unknown.
    pub fn delete(&mut self, id: &TaskId) -> StoreResult<Option<Task>> {
        let Some(index) = self.position(id) else {
            return Ok(None);
        };

        let mut next = self.tasks.clone();
        let removed = next.remove(index);
        self.commit(next)?;

        info!("event=task_delete module=store status=ok task_id={}", id);
        Ok(Some(removed))
    }

    /// Merges scorer output into the current collection and persists it.
    ///
    /// Returns the number of tasks that received a score. Nothing is written
    /// when no task matched.
    pub fn apply_scores(&mut self, scores: &[ScoredTask]) -> StoreResult<usize> {
        let (next, updated) = merge_scores(&self.tasks, scores);
        if updated > 0 {
            self.commit(next)?;
        }
        info!(
            "event=task_scores_apply module=store status=ok updated={}",
            updated
        );
        Ok(updated)
    }

    fn position(&self, id: &TaskId) -> Option<usize> {
        self.tasks.iter().position(|task| &task.id == id)
    }

    fn commit(&mut self, next: Vec<Task>) -> StoreResult<()> {
        if let Err(err) = save_tasks(&self.repo, &next) {
            error!(
                "event=tasks_save module=store status=error task_count={} error={}",
                next.len(),
                err
            );
            return Err(err);
        }
        self.tasks = next;
        self.source = LoadSource::Stored;
        Ok(())
    }
}

fn persist_seed<R: KeyValueRepository>(repo: &R, seeds: &[Task], source: &LoadSource) {
    let result = backup_corrupt(repo, source).and_then(|()| save_tasks(repo, seeds));
    match result {
        Ok(()) => info!(
            "event=tasks_seed_save module=store status=ok task_count={}",
            seeds.len()
        ),
        Err(err) => error!(
            "event=tasks_seed_save module=store status=error task_count={} error={}",
            seeds.len(),
            err
        ),
    }
}

fn backup_corrupt<R: KeyValueRepository>(repo: &R, source: &LoadSource) -> StoreResult<()> {
    if !matches!(source, LoadSource::SeededCorrupt(_)) {
        return Ok(());
    }
    if let Some(raw) = repo.get_item(TASKS_STORAGE_KEY)? {
        repo.set_item(CORRUPT_BACKUP_KEY, &raw)?;
        info!(
            "event=tasks_corrupt_backup module=store status=ok key={} bytes={}",
            CORRUPT_BACKUP_KEY,
            raw.len()
        );
    }
    Ok(())
}
