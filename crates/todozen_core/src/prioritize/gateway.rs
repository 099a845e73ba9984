//! Prioritization gateway.
//!
//! # Responsibility
//! - Send open tasks to a [`ScoringClient`] under a bounded wait.
//! - Merge returned priorities back into tasks by description.
//!
//! # Invariants
//! - Failure never produces a partial merge.
//! - At most one scoring call is outstanding per gateway; the busy flag is
//!   released when the call finishes, fails, times out, or is dropped.
//! - Completed tasks are never touched by a merge.

use crate::model::task::Task;
use crate::prioritize::scoring::{ScoredTask, ScoringClient, ScoringError, ScoringItem};
use log::{error, info, warn};
use std::error::Error;
use std::fmt::{Display, Formatter};
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::{Duration, Instant};

/// Default upper bound on one scoring call.
pub const DEFAULT_SCORING_TIMEOUT: Duration = Duration::from_secs(60);

/// Successful gateway results.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PrioritizeOutcome {
    /// No open tasks; informational only.
    NothingToPrioritize,
    Prioritized {
        /// Input collection with scores merged in, same order.
        tasks: Vec<Task>,
        /// Validated scorer output, for re-applying to a newer collection.
        scores: Vec<ScoredTask>,
        /// Number of tasks that received a score.
        updated: usize,
    },
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PrioritizeError {
    /// A previous call on this gateway is still outstanding.
    Busy,
    /// The scorer did not answer within the bound.
    Timeout(Duration),
    Scoring(ScoringError),
}

impl Display for PrioritizeError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Busy => write!(f, "prioritization already in progress"),
            Self::Timeout(limit) => {
                write!(f, "prioritization timed out after {}s", limit.as_secs())
            }
            Self::Scoring(err) => write!(f, "{err}"),
        }
    }
}

impl Error for PrioritizeError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Scoring(err) => Some(err),
            Self::Busy | Self::Timeout(_) => None,
        }
    }
}

impl From<ScoringError> for PrioritizeError {
    fn from(value: ScoringError) -> Self {
        Self::Scoring(value)
    }
}

/// Builds the scorer payload from the open tasks of `tasks`, in store order.
pub fn build_payload(tasks: &[Task]) -> Vec<ScoringItem> {
    tasks
        .iter()
        .filter(|task| task.is_open())
        .map(ScoringItem::from_task)
        .collect()
}

/// Merges scores into `tasks`.
///
/// Each open task takes the first score whose description matches exactly.
/// Returns the merged collection and the number of tasks updated.
pub fn merge_scores(tasks: &[Task], scores: &[ScoredTask]) -> (Vec<Task>, usize) {
    let mut updated = 0;
    let merged = tasks
        .iter()
        .map(|task| {
            let mut task = task.clone();
            if task.is_open() {
                if let Some(score) = scores
                    .iter()
                    .find(|score| score.description == task.description)
                {
                    task.set_score(score.priority, score.reason.clone());
                    updated += 1;
                }
            }
            task
        })
        .collect();
    (merged, updated)
}

/// Gateway wrapping one scoring client.
pub struct Prioritizer<C: ScoringClient> {
    client: C,
    timeout: Duration,
    busy: AtomicBool,
}

impl<C: ScoringClient> Prioritizer<C> {
    pub fn new(client: C) -> Self {
        Self::with_timeout(client, DEFAULT_SCORING_TIMEOUT)
    }

    pub fn with_timeout(client: C, timeout: Duration) -> Self {
        Self {
            client,
            timeout,
            busy: AtomicBool::new(false),
        }
    }

    /// Whether a scoring call is outstanding.
    pub fn is_busy(&self) -> bool {
        self.busy.load(Ordering::Acquire)
    }

    /// Scores the open tasks of `tasks` and merges the result.
    ///
    /// `tasks` is only read; on error the caller's collection stays as is.
    ///
    /// # Errors
    /// - [`PrioritizeError::Busy`] while another call is outstanding.
    /// - [`PrioritizeError::Timeout`] when the scorer exceeds the bound.
    /// - [`PrioritizeError::Scoring`] for transport or schema failures.
    pub async fn prioritize(&self, tasks: &[Task]) -> Result<PrioritizeOutcome, PrioritizeError> {
        let _guard = BusyGuard::acquire(&self.busy).ok_or(PrioritizeError::Busy)?;

        let items = build_payload(tasks);
        if items.is_empty() {
            info!("event=prioritize module=prioritize status=skipped reason=no_open_tasks");
            return Ok(PrioritizeOutcome::NothingToPrioritize);
        }

        let started_at = Instant::now();
        info!(
            "event=prioritize module=prioritize status=start task_count={}",
            items.len()
        );

        let scores = match tokio::time::timeout(self.timeout, self.client.score(&items)).await {
            Ok(Ok(scores)) => scores,
            Ok(Err(err)) => {
                error!(
                    "event=prioritize module=prioritize status=error duration_ms={} error_code=scoring_failed error={}",
                    started_at.elapsed().as_millis(),
                    err
                );
                return Err(err.into());
            }
            Err(_) => {
                warn!(
                    "event=prioritize module=prioritize status=error duration_ms={} error_code=scoring_timeout",
                    started_at.elapsed().as_millis()
                );
                return Err(PrioritizeError::Timeout(self.timeout));
            }
        };

        if let Err(err) = scores.iter().try_for_each(ScoredTask::validate) {
            error!(
                "event=prioritize module=prioritize status=error error_code=invalid_scores error={}",
                err
            );
            return Err(err.into());
        }

        let (merged, updated) = merge_scores(tasks, &scores);
        info!(
            "event=prioritize module=prioritize status=ok duration_ms={} scored={} updated={}",
            started_at.elapsed().as_millis(),
            scores.len(),
            updated
        );

        Ok(PrioritizeOutcome::Prioritized {
            tasks: merged,
            scores,
            updated,
        })
    }
}

/// Holds the busy flag for the lifetime of one call.
struct BusyGuard<'a> {
    flag: &'a AtomicBool,
}

impl<'a> BusyGuard<'a> {
    fn acquire(flag: &'a AtomicBool) -> Option<Self> {
        flag.compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .ok()
            .map(|_| Self { flag })
    }
}

impl Drop for BusyGuard<'_> {
    fn drop(&mut self) {
        self.flag.store(false, Ordering::Release);
    }
}
