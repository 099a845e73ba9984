//! Task collection ownership and persistence.
//!
//! # Responsibility
//! - Hold the single task collection of one storage profile.
//! - Keep memory and storage consistent after every mutation.

pub mod seed;
pub mod task_store;
