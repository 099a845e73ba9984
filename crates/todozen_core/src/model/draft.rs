//! Task creation form input.
//!
//! # Responsibility
//! - Validate raw form input before it can reach the task store.
//! - Combine due date and due time into one local due moment.
//!
//! # Invariants
//! - A rejected draft never produces a [`NewTask`].
//! - An empty due time string is treated as "no due time".

use crate::model::task::{normalize_due_time, NewTask};
use chrono::{NaiveDate, NaiveTime};
use std::error::Error;
use std::fmt::{Display, Formatter};

/// Raw, unvalidated form values.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TaskDraft {
    pub description: String,
    pub due_date: Option<NaiveDate>,
    pub due_time: Option<String>,
}

/// Form validation failures. Display strings are user-facing.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DraftError {
    EmptyDescription,
    InvalidTime(String),
    TimeWithoutDate,
}

impl Display for DraftError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::EmptyDescription => write!(f, "Task description is required."),
            Self::InvalidTime(_) => write!(f, "Invalid time format (HH:mm)"),
            Self::TimeWithoutDate => write!(f, "Pick a date before choosing a time."),
        }
    }
}

impl Error for DraftError {}

impl TaskDraft {
    pub fn new(description: impl Into<String>) -> Self {
        Self {
            description: description.into(),
            ..Self::default()
        }
    }

    pub fn due_on(mut self, date: NaiveDate) -> Self {
        self.due_date = Some(date);
        self
    }

    pub fn at(mut self, time: impl Into<String>) -> Self {
        self.due_time = Some(time.into());
        self
    }

    /// Validates the draft and produces creation input.
    ///
    /// # Errors
    /// - [`DraftError::EmptyDescription`] for blank descriptions.
    /// - [`DraftError::InvalidTime`] when the time is not `HH:mm`.
    /// - [`DraftError::TimeWithoutDate`] when a time is given without a date.
    pub fn validate(&self) -> Result<NewTask, DraftError> {
        let description = self.description.trim();
        if description.is_empty() {
            return Err(DraftError::EmptyDescription);
        }

        let due_time = match self.due_time.as_deref().map(str::trim) {
            None | Some("") => None,
            Some(raw) => Some(
                normalize_due_time(raw).ok_or_else(|| DraftError::InvalidTime(raw.to_string()))?,
            ),
        };

        let due_date = match (self.due_date, due_time.as_deref()) {
            (None, Some(_)) => return Err(DraftError::TimeWithoutDate),
            (None, None) => None,
            (Some(date), None) => Some(date.and_time(NaiveTime::MIN)),
            (Some(date), Some(time)) => {
                let clock = NaiveTime::parse_from_str(time, "%H:%M")
                    .map_err(|_| DraftError::InvalidTime(time.to_string()))?;
                Some(date.and_time(clock))
            }
        };

        Ok(NewTask {
            description: description.to_string(),
            due_date,
            due_time,
        })
    }
}
