//! Single-task focus session.
//!
//! # Invariants
//! - At most one task is focused.
//! - The session holds an id, not the task; an id missing from the store
//!   resolves to "no focus".
//! - Never persisted.

use crate::model::task::{Task, TaskId};
use crate::repo::kv_repo::KeyValueRepository;
use crate::store::task_store::TaskStore;

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FocusSession {
    focused: Option<TaskId>,
}

impl FocusSession {
    pub fn new() -> Self {
        Self::default()
    }

    /// Replaces the focused task unconditionally; `None` clears focus.
    pub fn set_focus(&mut self, id: Option<TaskId>) {
        self.focused = id;
    }

    pub fn clear(&mut self) {
        self.focused = None;
    }

    pub fn focused_id(&self) -> Option<&TaskId> {
        self.focused.as_ref()
    }

    /// Looks the focused task up in `store`.
    pub fn resolve<'s, R: KeyValueRepository>(&self, store: &'s TaskStore<R>) -> Option<&'s Task> {
        self.focused.as_ref().and_then(|id| store.get(id))
    }

    /// Drops focus when it referenced `removed`.
    pub fn forget(&mut self, removed: &TaskId) {
        if self.focused.as_ref() == Some(removed) {
            self.focused = None;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::FocusSession;
    use crate::model::task::TaskId;

    #[test]
    fn forget_only_clears_matching_id() {
        let focused = TaskId::from("2");
        let mut session = FocusSession::new();
        session.set_focus(Some(focused.clone()));

        session.forget(&TaskId::generate());
        assert_eq!(session.focused_id(), Some(&focused));

        session.forget(&focused);
        assert_eq!(session.focused_id(), None);
    }
}
