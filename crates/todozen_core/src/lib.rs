//! Core domain logic for TodoZen.
//! This crate is the single source of truth for task invariants.

pub mod config;
pub mod db;
pub mod focus;
pub mod logging;
pub mod model;
pub mod notify;
pub mod ordering;
pub mod prioritize;
pub mod repo;
pub mod search;
pub mod service;
pub mod store;

pub use config::{ConfigError, TodoConfig};
pub use focus::FocusSession;
pub use logging::{default_log_level, init_logging, logging_status, LoggingError};
pub use model::draft::{DraftError, TaskDraft};
pub use model::task::{NewTask, Task, TaskId, TaskValidationError};
pub use notify::{
    click_target, push_notification, ClickTarget, ClientWindow, LogNotifier, Notification,
    NotificationPermission, Notifier, NotifyError,
};
pub use ordering::order;
pub use prioritize::gateway::{
    build_payload, merge_scores, PrioritizeError, PrioritizeOutcome, Prioritizer,
};
pub use prioritize::gemini::{GeminiConfig, GeminiScoringClient};
pub use prioritize::scoring::{ScoredTask, ScoringClient, ScoringError, ScoringItem, NO_DEADLINE};
pub use repo::kv_repo::{
    KeyValueRepository, MemoryKeyValueRepository, RepoError, RepoResult, SqliteKeyValueRepository,
};
pub use search::filter::filter;
pub use service::todo_service::{PrioritizeNotice, ServiceError, TodoService};
pub use store::task_store::{
    load_tasks, save_tasks, LoadSource, StoreError, StoreResult, TaskStore, CORRUPT_BACKUP_KEY,
    TASKS_STORAGE_KEY,
};

/// Returns the core crate version.
pub fn core_version() -> &'static str {
    env!("CARGO_PKG_VERSION")
}

#[cfg(test)]
mod tests {
    use super::core_version;

    #[test]
    fn version_is_not_empty() {
        assert!(!core_version().is_empty());
    }
}
