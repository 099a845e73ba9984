//! Todo use-case service.
//!
//! # Responsibility
//! - Provide the user-facing actions: add, toggle, delete, focus, search,
//!   prioritize.
//! - Keep focus consistent with the store and notify on task creation.
//!
//! # Invariants
//! - Invalid form input never reaches the store.
//! - Deleting the focused task clears focus.
//! - A notification failure never fails the add that triggered it.
//! - Prioritization scores are applied to the collection current when the
//!   scorer answers, not to the snapshot that was sent.

use crate::focus::FocusSession;
use crate::model::draft::{DraftError, TaskDraft};
use crate::model::task::{Task, TaskId};
use crate::notify::{notify_if_permitted, Notification, Notifier};
use crate::ordering::order;
use crate::prioritize::gateway::{PrioritizeError, PrioritizeOutcome, Prioritizer};
use crate::prioritize::scoring::ScoringClient;
use crate::repo::kv_repo::KeyValueRepository;
use crate::search::filter::filter;
use crate::store::task_store::{StoreError, TaskStore};
use log::warn;
use std::error::Error;
use std::fmt::{Display, Formatter};

/// Service error for todo use-cases.
#[derive(Debug)]
pub enum ServiceError {
    /// Form input rejected before reaching the store.
    InvalidInput(DraftError),
    Store(StoreError),
    /// Transient prioritization failure; retry is allowed.
    Prioritize(PrioritizeError),
}

impl Display for ServiceError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::InvalidInput(err) => write!(f, "{err}"),
            Self::Store(err) => write!(f, "{err}"),
            Self::Prioritize(err) => write!(f, "AI Prioritization Failed: {err}"),
        }
    }
}

impl Error for ServiceError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::InvalidInput(err) => Some(err),
            Self::Store(err) => Some(err),
            Self::Prioritize(err) => Some(err),
        }
    }
}

impl From<DraftError> for ServiceError {
    fn from(value: DraftError) -> Self {
        Self::InvalidInput(value)
    }
}

impl From<StoreError> for ServiceError {
    fn from(value: StoreError) -> Self {
        Self::Store(value)
    }
}

impl From<PrioritizeError> for ServiceError {
    fn from(value: PrioritizeError) -> Self {
        Self::Prioritize(value)
    }
}

/// Informational result of a prioritization request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PrioritizeNotice {
    NothingToPrioritize,
    Prioritized { updated: usize },
}

impl PrioritizeNotice {
    pub fn title(&self) -> &'static str {
        match self {
            Self::NothingToPrioritize => "No tasks to prioritize",
            Self::Prioritized { .. } => "Tasks Prioritized!",
        }
    }

    pub fn description(&self) -> &'static str {
        match self {
            Self::NothingToPrioritize => "Add some tasks or uncheck completed ones.",
            Self::Prioritized { .. } => "Your tasks have been intelligently sorted by priority.",
        }
    }
}

/// Use-case wrapper over one task store.
pub struct TodoService<R: KeyValueRepository, N: Notifier> {
    store: TaskStore<R>,
    focus: FocusSession,
    notifier: N,
}

impl<R: KeyValueRepository, N: Notifier> TodoService<R, N> {
    pub fn new(store: TaskStore<R>, notifier: N) -> Self {
        Self {
            store,
            focus: FocusSession::new(),
            notifier,
        }
    }

    pub fn store(&self) -> &TaskStore<R> {
        &self.store
    }

    pub fn notifier(&self) -> &N {
        &self.notifier
    }

    /// Validates `draft`, stores the task and announces it.
    pub fn add(&mut self, draft: &TaskDraft) -> Result<Task, ServiceError> {
        let input = draft.validate()?;
        let task = self.store.add(input)?;

        if let Err(err) = notify_if_permitted(
            &self.notifier,
            &Notification::task_added(&task.description),
        ) {
            warn!(
                "event=notification_show module=service status=error task_id={} error={}",
                task.id, err
            );
        }
        Ok(task)
    }

    /// Returns `false` when `id` is unknown.
    pub fn toggle(&mut self, id: &TaskId) -> Result<bool, ServiceError> {
        Ok(self.store.toggle(id)?)
    }

    /// Deletes a task and drops focus on it.
    pub fn delete(&mut self, id: &TaskId) -> Result<Option<Task>, ServiceError> {
        let removed = self.store.delete(id)?;
        if removed.is_some() {
            self.focus.forget(id);
        }
        Ok(removed)
    }

    /// Focuses `id`, or clears focus with `None`.
    ///
    /// Returns `false` and leaves focus cleared when `id` is not in the store.
    pub fn set_focus(&mut self, id: Option<TaskId>) -> bool {
        match id {
            Some(id) if self.store.contains(&id) => {
                self.focus.set_focus(Some(id));
                true
            }
            Some(_) => {
                self.focus.clear();
                false
            }
            None => {
                self.focus.clear();
                true
            }
        }
    }

    pub fn focused(&self) -> Option<&Task> {
        self.focus.resolve(&self.store)
    }

    /// Tasks matching `query`, in display order.
    pub fn visible_tasks(&self, query: &str) -> Vec<Task> {
        order(&filter(self.store.tasks(), query))
    }

    pub fn has_open_tasks(&self) -> bool {
        self.store.tasks().iter().any(Task::is_open)
    }

    /// Runs prioritization and merges its scores into the store.
    ///
    /// # Errors
    /// [`ServiceError::Prioritize`] leaves the store untouched.
    pub async fn prioritize<C: ScoringClient>(
        &mut self,
        prioritizer: &Prioritizer<C>,
    ) -> Result<PrioritizeNotice, ServiceError> {
        let snapshot = self.store.tasks().to_vec();
        match prioritizer.prioritize(&snapshot).await? {
            PrioritizeOutcome::NothingToPrioritize => Ok(PrioritizeNotice::NothingToPrioritize),
            PrioritizeOutcome::Prioritized { scores, .. } => {
                let updated = self.store.apply_scores(&scores)?;
                Ok(PrioritizeNotice::Prioritized { updated })
            }
        }
    }
}
