//! Task domain model.
//!
//! # Responsibility
//! - Define the task record used by store, ordering and prioritization.
//! - Keep form-input validation next to the record it produces.
//!
//! # Invariants
//! - Every task is identified by a stable `TaskId`.
//! - Deletion removes the record; there are no tombstones.

pub mod draft;
pub mod task;
