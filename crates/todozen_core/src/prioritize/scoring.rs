//! Scoring collaborator contract.
//!
//! # Responsibility
//! - Define the request/response records exchanged with the scorer.
//! - Decode and validate raw model output into [`ScoredTask`] values.
//!
//! # Invariants
//! - A decoded response is all-or-nothing: one bad item rejects the whole
//!   response.
//! - Response order carries no meaning; callers match by description.

use crate::model::task::{Task, MAX_PRIORITY, MIN_PRIORITY};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::error::Error;
use std::fmt::{Display, Formatter, Write};
use std::sync::Arc;

/// Deadline token sent for tasks without a due date.
pub const NO_DEADLINE: &str = "none";

/// One task as presented to the scorer.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScoringItem {
    pub description: String,
    /// `YYYY-MM-DD` or [`NO_DEADLINE`].
    pub deadline: String,
}

impl ScoringItem {
    pub fn from_task(task: &Task) -> Self {
        let deadline = task
            .due_date
            .map(|date| date.format("%Y-%m-%d").to_string())
            .unwrap_or_else(|| NO_DEADLINE.to_string());
        Self {
            description: task.description.clone(),
            deadline,
        }
    }
}

/// One scored item returned by the scorer.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScoredTask {
    pub description: String,
    pub deadline: String,
    pub priority: u8,
    pub reason: String,
}

impl ScoredTask {
    pub fn new(
        description: impl Into<String>,
        deadline: impl Into<String>,
        priority: u8,
        reason: impl Into<String>,
    ) -> Self {
        Self {
            description: description.into(),
            deadline: deadline.into(),
            priority,
            reason: reason.into(),
        }
    }

    /// Checks the priority range contract.
    pub fn validate(&self) -> Result<(), ScoringError> {
        if !(MIN_PRIORITY..=MAX_PRIORITY).contains(&self.priority) {
            return Err(ScoringError::Malformed(format!(
                "priority {} outside {MIN_PRIORITY}..={MAX_PRIORITY}",
                self.priority
            )));
        }
        Ok(())
    }
}

/// Scorer failures. All of them are recoverable by retrying.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ScoringError {
    /// Transport-level failure (connect, TLS, timeout inside the client).
    Http(String),
    /// Service answered with an error status or error body.
    Response(String),
    /// Output could not be decoded or violates the response schema.
    Malformed(String),
}

impl Display for ScoringError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Http(message) => write!(f, "scoring http error: {message}"),
            Self::Response(message) => write!(f, "scoring response error: {message}"),
            Self::Malformed(message) => write!(f, "malformed scoring output: {message}"),
        }
    }
}

impl Error for ScoringError {}

/// External service assigning priorities to open tasks.
#[async_trait]
pub trait ScoringClient: Send + Sync {
    async fn score(&self, items: &[ScoringItem]) -> Result<Vec<ScoredTask>, ScoringError>;
}

#[async_trait]
impl ScoringClient for Arc<dyn ScoringClient> {
    async fn score(&self, items: &[ScoringItem]) -> Result<Vec<ScoredTask>, ScoringError> {
        (**self).score(items).await
    }
}

/// Renders the fixed prioritization prompt for `items`.
pub fn render_prompt(items: &[ScoringItem]) -> String {
    let mut prompt = String::from(
        "You are an AI assistant that intelligently prioritizes a list of tasks based on their descriptions and deadlines.\n\n\
         Analyze each task and assign a priority from 1 to 10, where 1 is the highest priority and 10 is the lowest.\n\
         Provide a brief reason for each assigned priority.\n\n\
         Tasks:\n",
    );
    for item in items {
        let _ = writeln!(
            prompt,
            "- Description: {}, Deadline: {}",
            item.description, item.deadline
        );
    }
    prompt.push_str(
        "\nOutput the prioritized tasks with their descriptions, deadlines, priorities, and reasons in a JSON array format.\n\
         Each object in the list must contain the keys \"description\", \"deadline\", \"priority\", and \"reason\". \
         The \"priority\" must be a number between 1 and 10.\n",
    );
    prompt
}

/// Decodes raw model text into validated scored tasks.
///
/// Accepts a bare JSON array or one wrapped in a Markdown code fence.
/// `deadline` may be omitted and defaults to [`NO_DEADLINE`]; every other
/// field is required.
///
/// # Errors
/// Returns [`ScoringError::Malformed`] for anything else.
pub fn parse_scored_tasks(text: &str) -> Result<Vec<ScoredTask>, ScoringError> {
    let json = strip_code_fence(text);
    let value: Value = serde_json::from_str(json)
        .map_err(|err| ScoringError::Malformed(format!("invalid JSON: {err}")))?;
    let Value::Array(items) = value else {
        return Err(ScoringError::Malformed("expected a JSON array".to_string()));
    };

    items
        .iter()
        .enumerate()
        .map(|(index, item)| parse_scored_item(index, item))
        .collect()
}

fn parse_scored_item(index: usize, item: &Value) -> Result<ScoredTask, ScoringError> {
    let malformed = |message: &str| ScoringError::Malformed(format!("item {index}: {message}"));

    let object = item.as_object().ok_or_else(|| malformed("not an object"))?;
    let description = object
        .get("description")
        .and_then(Value::as_str)
        .ok_or_else(|| malformed("missing string `description`"))?;
    let deadline = match object.get("deadline") {
        None | Some(Value::Null) => NO_DEADLINE,
        Some(Value::String(deadline)) => deadline.as_str(),
        Some(_) => return Err(malformed("`deadline` is not a string")),
    };
    let priority = object
        .get("priority")
        .and_then(integral_priority)
        .ok_or_else(|| malformed("`priority` must be an integer in 1..=10"))?;
    let reason = object
        .get("reason")
        .and_then(Value::as_str)
        .ok_or_else(|| malformed("missing string `reason`"))?;

    Ok(ScoredTask::new(description, deadline, priority, reason))
}

fn integral_priority(value: &Value) -> Option<u8> {
    let number = value.as_f64()?;
    if number.fract() != 0.0 || number < f64::from(MIN_PRIORITY) || number > f64::from(MAX_PRIORITY)
    {
        return None;
    }
    // Range checked above.
    Some(number as u8)
}

fn strip_code_fence(text: &str) -> &str {
    let trimmed = text.trim();
    let Some(rest) = trimmed.strip_prefix("```") else {
        return trimmed;
    };
    let body = rest.split_once('\n').map_or("", |(_, body)| body);
    body.trim_end().strip_suffix("```").unwrap_or(body).trim()
}

#[cfg(test)]
mod tests {
    use super::{parse_scored_tasks, render_prompt, ScoringError, ScoringItem, NO_DEADLINE};

    #[test]
    fn parses_fenced_array() {
        let text = "```json\n[{\"description\":\"a\",\"deadline\":\"none\",\"priority\":3,\"reason\":\"r\"}]\n```";
        let scored = parse_scored_tasks(text).unwrap();
        assert_eq!(scored.len(), 1);
        assert_eq!(scored[0].priority, 3);
    }

    #[test]
    fn accepts_integral_float_priority_and_missing_deadline() {
        let scored =
            parse_scored_tasks(r#"[{"description":"a","priority":4.0,"reason":"r"}]"#).unwrap();
        assert_eq!(scored[0].priority, 4);
        assert_eq!(scored[0].deadline, NO_DEADLINE);
    }

    #[test]
    fn rejects_whole_response_on_one_bad_item() {
        let text = r#"[
            {"description":"a","deadline":"none","priority":2,"reason":"ok"},
            {"description":"b","deadline":"none","priority":11,"reason":"too high"}
        ]"#;
        let err = parse_scored_tasks(text).unwrap_err();
        assert!(matches!(err, ScoringError::Malformed(message) if message.contains("item 1")));
    }

    #[test]
    fn rejects_fractional_priority_and_non_array() {
        assert!(parse_scored_tasks(r#"[{"description":"a","priority":2.5,"reason":"r"}]"#).is_err());
        assert!(parse_scored_tasks(r#"{"description":"a"}"#).is_err());
        assert!(parse_scored_tasks("not json").is_err());
    }

    #[test]
    fn prompt_lists_every_item() {
        let prompt = render_prompt(&[
            ScoringItem {
                description: "Buy milk".to_string(),
                deadline: "2024-01-05".to_string(),
            },
            ScoringItem {
                description: "Call Bob".to_string(),
                deadline: NO_DEADLINE.to_string(),
            },
        ]);
        assert!(prompt.contains("- Description: Buy milk, Deadline: 2024-01-05"));
        assert!(prompt.contains("- Description: Call Bob, Deadline: none"));
    }
}
