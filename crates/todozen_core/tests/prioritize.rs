use async_trait::async_trait;
use chrono::NaiveDate;
use std::sync::{Arc, Mutex};
use std::time::Duration;
use todozen_core::{
    build_payload, merge_scores, MemoryKeyValueRepository, NewTask, PrioritizeError,
    PrioritizeOutcome, Prioritizer, ScoredTask, ScoringClient, ScoringError, ScoringItem, Task,
    TaskDraft, TaskStore, NO_DEADLINE, TASKS_STORAGE_KEY,
};
use tokio::sync::Notify;

#[tokio::test]
async fn merge_matches_by_description_regardless_of_response_order() {
    let tasks = milk_and_bob();
    let scorer = FixedScorer::new(vec![
        ScoredTask::new("Call Bob", "none", 2, "urgent"),
        ScoredTask::new("Buy milk", "2024-01-05", 5, "routine"),
    ]);
    let prioritizer = Prioritizer::new(scorer);

    let outcome = prioritizer.prioritize(&tasks).await.unwrap();
    let PrioritizeOutcome::Prioritized {
        tasks: merged,
        updated,
        ..
    } = outcome
    else {
        panic!("expected a prioritized outcome");
    };

    assert_eq!(updated, 2);
    assert_eq!(merged[0].description, "Buy milk");
    assert_eq!(merged[0].priority, Some(5));
    assert_eq!(merged[0].reason.as_deref(), Some("routine"));
    assert_eq!(merged[1].description, "Call Bob");
    assert_eq!(merged[1].priority, Some(2));
    assert_eq!(merged[1].reason.as_deref(), Some("urgent"));
}

#[tokio::test]
async fn payload_holds_open_tasks_with_iso_or_none_deadlines() {
    let mut tasks = milk_and_bob();
    tasks.push(completed(task("Old chore", None)));
    let scorer = FixedScorer::new(Vec::new());
    let calls = scorer.calls();
    let prioritizer = Prioritizer::new(scorer);

    prioritizer.prioritize(&tasks).await.unwrap();

    let seen = calls.lock().unwrap().clone();
    assert_eq!(
        seen,
        vec![vec![
            ScoringItem {
                description: "Buy milk".to_string(),
                deadline: "2024-01-05".to_string(),
            },
            ScoringItem {
                description: "Call Bob".to_string(),
                deadline: NO_DEADLINE.to_string(),
            },
        ]]
    );
    assert_eq!(build_payload(&tasks), seen[0]);
}

#[tokio::test]
async fn no_open_tasks_skips_the_scorer() {
    let tasks = vec![completed(task("done", None))];
    let scorer = FixedScorer::new(Vec::new());
    let calls = scorer.calls();
    let prioritizer = Prioritizer::new(scorer);

    let outcome = prioritizer.prioritize(&tasks).await.unwrap();

    assert_eq!(outcome, PrioritizeOutcome::NothingToPrioritize);
    assert!(calls.lock().unwrap().is_empty());
    assert!(!prioritizer.is_busy());
}

#[tokio::test]
async fn scorer_failure_is_surfaced_and_leaves_input_untouched() {
    let tasks = milk_and_bob();
    let before = tasks.clone();
    let prioritizer = Prioritizer::new(FailingScorer);

    let err = prioritizer.prioritize(&tasks).await.unwrap_err();

    assert!(matches!(err, PrioritizeError::Scoring(ScoringError::Http(_))));
    assert_eq!(tasks, before);
    assert!(!prioritizer.is_busy());
}

#[tokio::test]
async fn out_of_range_priority_rejects_the_whole_response() {
    let tasks = milk_and_bob();
    let prioritizer = Prioritizer::new(FixedScorer::new(vec![
        ScoredTask::new("Buy milk", "2024-01-05", 5, "routine"),
        ScoredTask::new("Call Bob", "none", 0, "broken"),
    ]));

    let err = prioritizer.prioritize(&tasks).await.unwrap_err();
    assert!(matches!(
        err,
        PrioritizeError::Scoring(ScoringError::Malformed(_))
    ));
}

#[test]
fn merge_leaves_completed_and_unmatched_tasks_alone() {
    let done = completed(task("Buy milk", None));
    let untouched = task("Walk dog", None);
    let scores = vec![ScoredTask::new("Buy milk", "none", 1, "would be urgent")];

    let (merged, updated) = merge_scores(&[done.clone(), untouched.clone()], &scores);

    assert_eq!(updated, 0);
    assert_eq!(merged, vec![done, untouched]);
}

#[test]
fn duplicate_descriptions_take_the_first_matching_score() {
    let first = task("Pay rent", None);
    let second = task("Pay rent", None);
    let scores = vec![
        ScoredTask::new("Pay rent", "none", 1, "first"),
        ScoredTask::new("Pay rent", "none", 7, "second"),
    ];

    let (merged, updated) = merge_scores(&[first, second], &scores);

    assert_eq!(updated, 2);
    assert!(merged
        .iter()
        .all(|task| task.priority == Some(1) && task.reason.as_deref() == Some("first")));
}

#[tokio::test(start_paused = true)]
async fn slow_scorer_times_out_and_releases_busy_flag() {
    let tasks = milk_and_bob();
    let prioritizer = Prioritizer::with_timeout(SlowScorer, Duration::from_secs(5));

    let err = prioritizer.prioritize(&tasks).await.unwrap_err();

    assert_eq!(err, PrioritizeError::Timeout(Duration::from_secs(5)));
    assert!(!prioritizer.is_busy());
}

#[tokio::test]
async fn second_call_while_outstanding_is_rejected_as_busy() {
    let tasks = milk_and_bob();
    let gate = Notify::new();
    let prioritizer = Prioritizer::new(GatedScorer { gate: &gate });

    let (first, second) = tokio::join!(prioritizer.prioritize(&tasks), async {
        let second = prioritizer.prioritize(&tasks).await;
        gate.notify_one();
        second
    });

    assert!(matches!(first, Ok(PrioritizeOutcome::Prioritized { .. })));
    assert_eq!(second.unwrap_err(), PrioritizeError::Busy);
    assert!(!prioritizer.is_busy());
}

#[tokio::test(start_paused = true)]
async fn dropping_an_outstanding_call_clears_busy_flag() {
    let tasks = milk_and_bob();
    let prioritizer = Prioritizer::with_timeout(SlowScorer, Duration::from_secs(3600));

    let abandoned =
        tokio::time::timeout(Duration::from_secs(1), prioritizer.prioritize(&tasks)).await;

    assert!(abandoned.is_err());
    assert!(!prioritizer.is_busy());
}

#[tokio::test]
async fn scores_apply_to_the_collection_current_at_answer_time() {
    let repo = MemoryKeyValueRepository::with_item(TASKS_STORAGE_KEY, "[]");
    let mut store = TaskStore::open(&repo).unwrap();
    store
        .add(TaskDraft::new("Call Bob").validate().unwrap())
        .unwrap();
    let snapshot = store.tasks().to_vec();

    let prioritizer = Prioritizer::new(FixedScorer::new(vec![ScoredTask::new(
        "Call Bob", "none", 2, "urgent",
    )]));
    let outcome = prioritizer.prioritize(&snapshot).await.unwrap();
    let added_meanwhile = store
        .add(TaskDraft::new("Water plants").validate().unwrap())
        .unwrap();

    let PrioritizeOutcome::Prioritized { scores, .. } = outcome else {
        panic!("expected a prioritized outcome");
    };
    assert_eq!(store.apply_scores(&scores).unwrap(), 1);

    assert_eq!(store.tasks().len(), 2);
    assert_eq!(store.get(&added_meanwhile.id).unwrap().priority, None);
    assert_eq!(store.tasks()[1].priority, Some(2));
}

type CallLog = Arc<Mutex<Vec<Vec<ScoringItem>>>>;

struct FixedScorer {
    scores: Vec<ScoredTask>,
    seen: CallLog,
}

impl FixedScorer {
    fn new(scores: Vec<ScoredTask>) -> Self {
        Self {
            scores,
            seen: Arc::default(),
        }
    }

    /// Shared handle to the payloads this scorer receives.
    fn calls(&self) -> CallLog {
        Arc::clone(&self.seen)
    }
}

#[async_trait]
impl ScoringClient for FixedScorer {
    async fn score(&self, items: &[ScoringItem]) -> Result<Vec<ScoredTask>, ScoringError> {
        self.seen.lock().unwrap().push(items.to_vec());
        Ok(self.scores.clone())
    }
}

struct FailingScorer;

#[async_trait]
impl ScoringClient for FailingScorer {
    async fn score(&self, _items: &[ScoringItem]) -> Result<Vec<ScoredTask>, ScoringError> {
        Err(ScoringError::Http("connection refused".to_string()))
    }
}

struct SlowScorer;

#[async_trait]
impl ScoringClient for SlowScorer {
    async fn score(&self, _items: &[ScoringItem]) -> Result<Vec<ScoredTask>, ScoringError> {
        tokio::time::sleep(Duration::from_secs(86_400)).await;
        Ok(Vec::new())
    }
}

struct GatedScorer<'a> {
    gate: &'a Notify,
}

#[async_trait]
impl ScoringClient for GatedScorer<'_> {
    async fn score(&self, items: &[ScoringItem]) -> Result<Vec<ScoredTask>, ScoringError> {
        self.gate.notified().await;
        Ok(items
            .iter()
            .map(|item| ScoredTask::new(&item.description, &item.deadline, 3, "gated"))
            .collect())
    }
}

fn milk_and_bob() -> Vec<Task> {
    let due = NaiveDate::from_ymd_opt(2024, 1, 5)
        .unwrap()
        .and_hms_opt(0, 0, 0);
    vec![task("Buy milk", due), task("Call Bob", None)]
}

fn task(description: &str, due_date: Option<chrono::NaiveDateTime>) -> Task {
    Task::new(NewTask {
        description: description.to_string(),
        due_date,
        due_time: None,
    })
}

fn completed(mut task: Task) -> Task {
    task.completed = true;
    task
}
