//! Task domain model.
//!
//! # Responsibility
//! - Define the canonical task record persisted in local storage.
//! - Validate record-level invariants shared by load and write paths.
//!
//! # Invariants
//! - `id` is stable and never reused for another task.
//! - `priority` and `reason` are both set or both unset.
//! - `priority` stays within `1..=10` (1 is most urgent).
//! - `due_time` implies `due_date`.

use chrono::{DateTime, Local, NaiveDateTime};
use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::error::Error;
use std::fmt::{Display, Formatter};
use uuid::Uuid;

/// Opaque, stable identifier of a task.
///
/// New tasks get a v4 uuid string. Stored ids keep whatever text they were
/// written with (the browser build used `"1"` or millisecond timestamps).
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct TaskId(String);

impl TaskId {
    /// Generates a fresh random id.
    pub fn generate() -> Self {
        Self(Uuid::new_v4().to_string())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl Display for TaskId {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<String> for TaskId {
    fn from(value: String) -> Self {
        Self(value)
    }
}

impl From<&str> for TaskId {
    fn from(value: &str) -> Self {
        Self(value.to_string())
    }
}

/// Most urgent priority value.
pub const MIN_PRIORITY: u8 = 1;
/// Least urgent priority value.
pub const MAX_PRIORITY: u8 = 10;

static DUE_TIME_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^([0-1]?[0-9]|2[0-3]):([0-5][0-9])$").expect("valid due time regex")
});

/// Record-level validation failures.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TaskValidationError {
    EmptyId,
    EmptyDescription,
    InvalidDueTime(String),
    DueTimeWithoutDate,
    PriorityOutOfRange(u8),
    PriorityWithoutReason,
    ReasonWithoutPriority,
}

impl Display for TaskValidationError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::EmptyId => write!(f, "task id must not be empty"),
            Self::EmptyDescription => write!(f, "task description must not be empty"),
            Self::InvalidDueTime(value) => {
                write!(f, "due time `{value}` is not in HH:mm format")
            }
            Self::DueTimeWithoutDate => write!(f, "due time requires a due date"),
            Self::PriorityOutOfRange(value) => write!(
                f,
                "priority {value} is outside {MIN_PRIORITY}..={MAX_PRIORITY}"
            ),
            Self::PriorityWithoutReason => write!(f, "priority is set without a reason"),
            Self::ReasonWithoutPriority => write!(f, "reason is set without a priority"),
        }
    }
}

impl Error for TaskValidationError {}

/// Validated creation input for a task.
///
/// Produced by [`crate::model::draft::TaskDraft::validate`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewTask {
    pub description: String,
    pub due_date: Option<NaiveDateTime>,
    pub due_time: Option<String>,
}

/// Canonical task record.
///
/// Serialized with camelCase keys (`dueDate`, `dueTime`) to stay compatible
/// with blobs written by the browser build.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Task {
    pub id: TaskId,
    pub description: String,
    /// Local wall-clock due moment. Midnight when no due time was given.
    #[serde(default, with = "due_date_format")]
    pub due_date: Option<NaiveDateTime>,
    /// `HH:mm`, meaningful only together with `due_date`.
    pub due_time: Option<String>,
    pub completed: bool,
    /// Assigned by prioritization only.
    pub priority: Option<u8>,
    /// Justification for `priority`.
    pub reason: Option<String>,
}

impl Task {
    /// Creates an open, unprioritized task with a fresh id.
    pub fn new(input: NewTask) -> Self {
        Self {
            id: TaskId::generate(),
            description: input.description,
            due_date: input.due_date,
            due_time: input.due_time,
            completed: false,
            priority: None,
            reason: None,
        }
    }

    /// Checks record-level invariants.
    ///
    /// # Errors
    /// Returns the first violated invariant.
    pub fn validate(&self) -> Result<(), TaskValidationError> {
        if self.id.as_str().trim().is_empty() {
            return Err(TaskValidationError::EmptyId);
        }
        if self.description.trim().is_empty() {
            return Err(TaskValidationError::EmptyDescription);
        }
        if let Some(time) = self.due_time.as_deref() {
            if normalize_due_time(time).is_none() {
                return Err(TaskValidationError::InvalidDueTime(time.to_string()));
            }
            if self.due_date.is_none() {
                return Err(TaskValidationError::DueTimeWithoutDate);
            }
        }
        match (self.priority, self.reason.as_ref()) {
            (Some(priority), Some(_)) => {
                if !(MIN_PRIORITY..=MAX_PRIORITY).contains(&priority) {
                    return Err(TaskValidationError::PriorityOutOfRange(priority));
                }
            }
            (Some(_), None) => return Err(TaskValidationError::PriorityWithoutReason),
            (None, Some(_)) => return Err(TaskValidationError::ReasonWithoutPriority),
            (None, None) => {}
        }
        Ok(())
    }

    /// Flips completion state.
    pub fn toggle(&mut self) {
        self.completed = !self.completed;
    }

    /// Records a prioritization result on this task.
    pub fn set_score(&mut self, priority: u8, reason: impl Into<String>) {
        self.priority = Some(priority);
        self.reason = Some(reason.into());
    }

    pub fn is_open(&self) -> bool {
        !self.completed
    }
}

/// Normalizes an `H:mm` / `HH:mm` string to `HH:mm`.
///
/// Returns `None` when the value is not a valid 24h clock time.
pub fn normalize_due_time(raw: &str) -> Option<String> {
    let captures = DUE_TIME_RE.captures(raw.trim())?;
    let hours: u32 = captures.get(1)?.as_str().parse().ok()?;
    let minutes = captures.get(2)?.as_str();
    Some(format!("{hours:02}:{minutes}"))
}

/// `dueDate` wire format.
///
/// Writes `YYYY-MM-DDTHH:MM:SS` with as many fractional digits as needed to
/// keep the value exact. Reads that form and RFC 3339 timestamps (converted
/// to local wall-clock time).
mod due_date_format {
    use super::{DateTime, Local, NaiveDateTime};
    use serde::{Deserialize, Deserializer, Serializer};

    const FORMAT: &str = "%Y-%m-%dT%H:%M:%S%.f";

    pub fn serialize<S>(value: &Option<NaiveDateTime>, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        match value {
            Some(date) => serializer.serialize_str(&date.format(FORMAT).to_string()),
            None => serializer.serialize_none(),
        }
    }

    pub fn deserialize<'de, D>(deserializer: D) -> Result<Option<NaiveDateTime>, D::Error>
    where
        D: Deserializer<'de>,
    {
        let raw: Option<String> = Option::deserialize(deserializer)?;
        match raw {
            None => Ok(None),
            Some(text) => parse(&text).map(Some).ok_or_else(|| {
                serde::de::Error::custom(format!("invalid dueDate `{text}`"))
            }),
        }
    }

    fn parse(text: &str) -> Option<NaiveDateTime> {
        if let Ok(date) = NaiveDateTime::parse_from_str(text, FORMAT) {
            return Some(date);
        }
        DateTime::parse_from_rfc3339(text)
            .ok()
            .map(|date| date.with_timezone(&Local).naive_local())
    }
}

#[cfg(test)]
mod tests {
    use super::normalize_due_time;

    #[test]
    fn normalize_due_time_pads_single_digit_hours() {
        assert_eq!(normalize_due_time("9:30").as_deref(), Some("09:30"));
        assert_eq!(normalize_due_time("23:59").as_deref(), Some("23:59"));
        assert_eq!(normalize_due_time(" 00:00 ").as_deref(), Some("00:00"));
    }

    #[test]
    fn normalize_due_time_rejects_out_of_range_values() {
        assert_eq!(normalize_due_time("24:00"), None);
        assert_eq!(normalize_due_time("12:60"), None);
        assert_eq!(normalize_due_time("noon"), None);
        assert_eq!(normalize_due_time(""), None);
    }
}
