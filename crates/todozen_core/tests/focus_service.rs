use async_trait::async_trait;
use chrono::NaiveDate;
use std::cell::RefCell;
use todozen_core::{
    MemoryKeyValueRepository, Notification, NotificationPermission, Notifier, NotifyError,
    PrioritizeError, PrioritizeNotice, Prioritizer, ScoredTask, ScoringClient, ScoringError,
    ScoringItem, ServiceError, TaskDraft, TaskId, TaskStore, TodoService, TASKS_STORAGE_KEY,
};

#[test]
fn add_notifies_only_when_permission_is_granted() {
    let repo = empty_repo();
    let mut service = service_with(&repo, NotificationPermission::Granted);
    service.add(&TaskDraft::new("Call Bob")).unwrap();

    let shown = service.notifier().shown.borrow().clone();
    assert_eq!(shown, vec![Notification::task_added("Call Bob")]);
    assert_eq!(shown[0].title, "Task Added!");

    for permission in [NotificationPermission::Default, NotificationPermission::Denied] {
        let repo = empty_repo();
        let mut service = service_with(&repo, permission);
        service.add(&TaskDraft::new("Quiet task")).unwrap();
        assert!(service.notifier().shown.borrow().is_empty());
    }
}

#[test]
fn notification_failure_does_not_fail_add() {
    let repo = empty_repo();
    let store = TaskStore::open(&repo).unwrap();
    let mut service = TodoService::new(store, BrokenNotifier);

    let task = service.add(&TaskDraft::new("still saved")).unwrap();
    assert!(service.store().contains(&task.id));
}

#[test]
fn invalid_draft_never_reaches_the_store() {
    let repo = empty_repo();
    let mut service = service_with(&repo, NotificationPermission::Granted);

    let empty = service.add(&TaskDraft::new("   ")).unwrap_err();
    assert!(matches!(empty, ServiceError::InvalidInput(_)));
    assert_eq!(empty.to_string(), "Task description is required.");

    let bad_time = service
        .add(
            &TaskDraft::new("x")
                .due_on(NaiveDate::from_ymd_opt(2024, 1, 5).unwrap())
                .at("7pm"),
        )
        .unwrap_err();
    assert_eq!(bad_time.to_string(), "Invalid time format (HH:mm)");

    assert!(service.store().tasks().is_empty());
    assert!(service.notifier().shown.borrow().is_empty());
    assert_eq!(repo_blob(&repo).as_deref(), Some("[]"));
}

#[test]
fn deleting_the_focused_task_clears_focus() {
    let repo = empty_repo();
    let mut service = service_with(&repo, NotificationPermission::Denied);
    let focused = service.add(&TaskDraft::new("focus me")).unwrap();
    let other = service.add(&TaskDraft::new("other")).unwrap();

    assert!(service.set_focus(Some(focused.id.clone())));
    service.delete(&other.id).unwrap();
    assert_eq!(service.focused().map(|task| &task.id), Some(&focused.id));

    service.delete(&focused.id).unwrap();
    assert!(service.focused().is_none());
}

#[test]
fn focus_follows_store_updates_and_rejects_unknown_ids() {
    let repo = empty_repo();
    let mut service = service_with(&repo, NotificationPermission::Denied);
    let task = service.add(&TaskDraft::new("deep work")).unwrap();

    assert!(service.set_focus(Some(task.id.clone())));
    service.toggle(&task.id).unwrap();
    assert!(service.focused().unwrap().completed);

    assert!(!service.set_focus(Some(TaskId::generate())));
    assert!(service.focused().is_none());

    assert!(service.set_focus(Some(task.id.clone())));
    assert!(service.set_focus(None));
    assert!(service.focused().is_none());
}

#[test]
fn visible_tasks_filters_then_orders() {
    let repo = empty_repo();
    let mut service = service_with(&repo, NotificationPermission::Denied);
    let done = service.add(&TaskDraft::new("Report draft")).unwrap();
    service.toggle(&done.id).unwrap();
    service.add(&TaskDraft::new("Groceries")).unwrap();
    let dated = service
        .add(
            &TaskDraft::new("Quarterly REPORT")
                .due_on(NaiveDate::from_ymd_opt(2024, 1, 5).unwrap()),
        )
        .unwrap();
    let undated = service.add(&TaskDraft::new("report review")).unwrap();

    let visible = service
        .visible_tasks("report")
        .into_iter()
        .map(|task| task.id)
        .collect::<Vec<TaskId>>();
    assert_eq!(visible, vec![dated.id, undated.id, done.id]);
    assert_eq!(service.visible_tasks("").len(), 4);
}

#[test]
fn has_open_tasks_tracks_completion() {
    let repo = empty_repo();
    let mut service = service_with(&repo, NotificationPermission::Denied);
    assert!(!service.has_open_tasks());

    let task = service.add(&TaskDraft::new("one")).unwrap();
    assert!(service.has_open_tasks());

    service.toggle(&task.id).unwrap();
    assert!(!service.has_open_tasks());
}

#[tokio::test]
async fn prioritize_applies_scores_and_reports_notice() {
    let repo = empty_repo();
    let mut service = service_with(&repo, NotificationPermission::Denied);
    let task = service.add(&TaskDraft::new("Call Bob")).unwrap();
    let prioritizer = Prioritizer::new(FixedScorer(vec![ScoredTask::new(
        "Call Bob", "none", 2, "urgent",
    )]));

    let notice = service.prioritize(&prioritizer).await.unwrap();

    assert_eq!(notice, PrioritizeNotice::Prioritized { updated: 1 });
    assert_eq!(notice.title(), "Tasks Prioritized!");
    let stored = service.store().get(&task.id).unwrap();
    assert_eq!(stored.priority, Some(2));
    assert_eq!(stored.reason.as_deref(), Some("urgent"));
    assert!(repo_blob(&repo).unwrap().contains("\"priority\":2"));
}

#[tokio::test]
async fn prioritize_with_no_open_tasks_is_informational() {
    let repo = empty_repo();
    let mut service = service_with(&repo, NotificationPermission::Denied);
    let prioritizer = Prioritizer::new(FixedScorer(Vec::new()));

    let notice = service.prioritize(&prioritizer).await.unwrap();

    assert_eq!(notice, PrioritizeNotice::NothingToPrioritize);
    assert_eq!(notice.title(), "No tasks to prioritize");
    assert_eq!(
        notice.description(),
        "Add some tasks or uncheck completed ones."
    );
}

#[tokio::test]
async fn prioritize_failure_leaves_store_untouched() {
    let repo = empty_repo();
    let mut service = service_with(&repo, NotificationPermission::Denied);
    service.add(&TaskDraft::new("Call Bob")).unwrap();
    let before = service.store().tasks().to_vec();
    let blob_before = repo_blob(&repo);
    let prioritizer = Prioritizer::new(FailingScorer);

    let err = service.prioritize(&prioritizer).await.unwrap_err();

    assert!(matches!(
        err,
        ServiceError::Prioritize(PrioritizeError::Scoring(_))
    ));
    assert!(err.to_string().starts_with("AI Prioritization Failed"));
    assert_eq!(service.store().tasks(), before.as_slice());
    assert_eq!(repo_blob(&repo), blob_before);
}

struct RecordingNotifier {
    permission: NotificationPermission,
    shown: RefCell<Vec<Notification>>,
}

impl Notifier for RecordingNotifier {
    fn permission(&self) -> NotificationPermission {
        self.permission
    }

    fn show(&self, notification: &Notification) -> Result<(), NotifyError> {
        self.shown.borrow_mut().push(notification.clone());
        Ok(())
    }
}

struct BrokenNotifier;

impl Notifier for BrokenNotifier {
    fn permission(&self) -> NotificationPermission {
        NotificationPermission::Granted
    }

    fn show(&self, _notification: &Notification) -> Result<(), NotifyError> {
        Err(NotifyError::Backend("display unavailable".to_string()))
    }
}

struct FixedScorer(Vec<ScoredTask>);

#[async_trait]
impl ScoringClient for FixedScorer {
    async fn score(&self, _items: &[ScoringItem]) -> Result<Vec<ScoredTask>, ScoringError> {
        Ok(self.0.clone())
    }
}

struct FailingScorer;

#[async_trait]
impl ScoringClient for FailingScorer {
    async fn score(&self, _items: &[ScoringItem]) -> Result<Vec<ScoredTask>, ScoringError> {
        Err(ScoringError::Response("status 503".to_string()))
    }
}

fn empty_repo() -> MemoryKeyValueRepository {
    MemoryKeyValueRepository::with_item(TASKS_STORAGE_KEY, "[]")
}

fn service_with(
    repo: &MemoryKeyValueRepository,
    permission: NotificationPermission,
) -> TodoService<&MemoryKeyValueRepository, RecordingNotifier> {
    let store = TaskStore::open(repo).unwrap();
    TodoService::new(
        store,
        RecordingNotifier {
            permission,
            shown: RefCell::new(Vec::new()),
        },
    )
}

fn repo_blob(repo: &MemoryKeyValueRepository) -> Option<String> {
    use todozen_core::KeyValueRepository;
    repo.get_item(TASKS_STORAGE_KEY).unwrap()
}
