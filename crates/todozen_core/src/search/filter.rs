//! Substring search over task descriptions.
//!
//! # Invariants
//! - Matching is case-insensitive (Unicode lowercase on both sides).
//! - Relative order of kept tasks is preserved.
//! - An empty query keeps every task.

use crate::model::task::Task;

/// Keeps tasks whose description contains `query`, ignoring case.
pub fn filter(tasks: &[Task], query: &str) -> Vec<Task> {
    if query.is_empty() {
        return tasks.to_vec();
    }
    let needle = query.to_lowercase();
    tasks
        .iter()
        .filter(|task| matches(task, &needle))
        .cloned()
        .collect()
}

fn matches(task: &Task, lowered_query: &str) -> bool {
    task.description.to_lowercase().contains(lowered_query)
}
