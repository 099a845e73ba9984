//! Display ordering for task lists.
//!
//! # Invariants
//! - Every open task precedes every completed task.
//! - Open tasks: prioritized before unprioritized, ascending priority, then
//!   earlier due first, dated before undated.
//! - Completed tasks keep their input order.
//! - The sort is stable and `order(order(x)) == order(x)`.

use crate::model::task::Task;
use std::cmp::Ordering;

/// Returns `tasks` in display order.
pub fn order(tasks: &[Task]) -> Vec<Task> {
    let mut ordered = tasks.to_vec();
    ordered.sort_by(compare);
    ordered
}

/// Total order used by [`order`].
pub fn compare(a: &Task, b: &Task) -> Ordering {
    a.completed.cmp(&b.completed).then_with(|| {
        if a.completed {
            return Ordering::Equal;
        }
        by_priority(a, b).then_with(|| by_due_date(a, b))
    })
}

fn by_priority(a: &Task, b: &Task) -> Ordering {
    match (a.priority, b.priority) {
        (Some(left), Some(right)) => left.cmp(&right),
        (Some(_), None) => Ordering::Less,
        (None, Some(_)) => Ordering::Greater,
        (None, None) => Ordering::Equal,
    }
}

fn by_due_date(a: &Task, b: &Task) -> Ordering {
    match (a.due_date, b.due_date) {
        (Some(left), Some(right)) => left.cmp(&right),
        (Some(_), None) => Ordering::Less,
        (None, Some(_)) => Ordering::Greater,
        (None, None) => Ordering::Equal,
    }
}
