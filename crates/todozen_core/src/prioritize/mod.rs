//! Intelligent task prioritization.
//!
//! # Responsibility
//! - Define the scoring collaborator contract and its Gemini implementation.
//! - Run one bounded, non-reentrant scoring call and merge its result.

pub mod gateway;
pub mod gemini;
pub mod scoring;
