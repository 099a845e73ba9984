//! Task search entry points.
//!
//! # Responsibility
//! - Narrow a task snapshot by user query before ordering.

pub mod filter;
