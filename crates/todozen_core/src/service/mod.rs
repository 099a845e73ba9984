//! Core use-case services.
//!
//! # Responsibility
//! - Orchestrate store, focus and notification calls into use-case APIs.
//! - Keep CLI/UI layers decoupled from storage details.

pub mod todo_service;
