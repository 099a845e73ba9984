//! Repository layer abstractions and persistence implementations.
//!
//! # Responsibility
//! - Define the keyed local storage contract the task store writes through.
//! - Isolate SQLite query details from store/business orchestration.
//!
//! # Invariants
//! - Repository APIs move opaque strings; they never interpret task JSON.

pub mod kv_repo;
