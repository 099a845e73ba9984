use anyhow::{anyhow, bail, Context, Result};
use chrono::NaiveDate;
use log::info;
use todozen_core::db::Connection;
use todozen_core::notify::notify_if_permitted;
use todozen_core::{
    push_notification, GeminiScoringClient, LoadSource, LogNotifier, Prioritizer,
    SqliteKeyValueRepository, Task, TaskDraft, TaskId, TaskStore, TodoConfig, TodoService,
    CORRUPT_BACKUP_KEY,
};

/// Length of the id prefix shown in listings.
const SHORT_ID_LEN: usize = 8;

pub struct App<'conn> {
    service: TodoService<SqliteKeyValueRepository<'conn>, LogNotifier>,
}

impl<'conn> App<'conn> {
    pub fn open(conn: &'conn Connection, config: &TodoConfig) -> Result<Self> {
        let store = TaskStore::open(SqliteKeyValueRepository::new(conn))
            .context("cannot load tasks")?;
        if let LoadSource::SeededCorrupt(_) = store.load_source() {
            eprintln!(
                "Stored tasks were unreadable; kept a copy under {CORRUPT_BACKUP_KEY} \
                 and restored the sample list."
            );
        }
        let notifier = LogNotifier::new(config.notifications);
        Ok(Self {
            service: TodoService::new(store, notifier),
        })
    }

    pub fn add(
        &mut self,
        description: String,
        due: Option<NaiveDate>,
        time: Option<String>,
    ) -> Result<()> {
        let mut draft = TaskDraft::new(description);
        if let Some(date) = due {
            draft = draft.due_on(date);
        }
        if let Some(time) = time {
            draft = draft.at(time);
        }
        let task = self.service.add(&draft)?;
        println!("Added {}", render(&task));
        Ok(())
    }

    pub fn list(&self, query: &str) {
        let tasks = self.service.visible_tasks(query);
        if tasks.is_empty() {
            if query.is_empty() {
                println!("No tasks yet.");
            } else {
                println!("No tasks match \"{query}\".");
            }
            return;
        }
        for task in &tasks {
            println!("{}", render(task));
            if let Some(reason) = &task.reason {
                println!("{:width$}  {reason}", "", width = SHORT_ID_LEN + 4);
            }
        }
    }

    pub fn toggle(&mut self, raw_id: &str) -> Result<()> {
        let id = self.resolve(raw_id)?;
        self.service.toggle(&id)?;
        if let Some(task) = self.service.store().get(&id) {
            println!("{}", render(task));
        }
        Ok(())
    }

    pub fn delete(&mut self, raw_id: &str) -> Result<()> {
        let id = self.resolve(raw_id)?;
        if let Some(task) = self.service.delete(&id)? {
            println!("Deleted \"{}\"", task.description);
        }
        Ok(())
    }

    pub fn focus(&mut self, raw_id: &str) -> Result<()> {
        let id = self.resolve(raw_id)?;
        self.service.set_focus(Some(id));
        let task = self
            .service
            .focused()
            .ok_or_else(|| anyhow!("task {raw_id} is gone"))?;

        println!("Focus Mode");
        println!();
        println!("  {}", task.description);
        if let Some(due) = due_label(task) {
            println!("  Due {due}");
        }
        if let (Some(priority), Some(reason)) = (task.priority, &task.reason) {
            println!("  Priority {priority}: {reason}");
        }
        Ok(())
    }

    pub async fn prioritize(&mut self, config: &TodoConfig) -> Result<()> {
        if !self.service.has_open_tasks() {
            let notice = todozen_core::PrioritizeNotice::NothingToPrioritize;
            println!("{}: {}", notice.title(), notice.description());
            return Ok(());
        }
        let client = GeminiScoringClient::new(config.gemini()?)?;
        let prioritizer = Prioritizer::with_timeout(client, config.scoring_timeout);

        let notice = self.service.prioritize(&prioritizer).await?;
        println!("{}: {}", notice.title(), notice.description());
        self.list("");
        Ok(())
    }

    pub fn push(&self, payload: &str) -> Result<()> {
        let notification = push_notification(payload.as_bytes());
        let shown = notify_if_permitted(self.service.notifier(), &notification)?;
        info!("event=push_received module=cli status=ok shown={shown}");
        println!("{}", notification.title);
        if let Some(body) = &notification.body {
            println!("{body}");
        }
        Ok(())
    }

    /// Accepts a full id or a unique prefix of one, ignoring ASCII case.
    fn resolve(&self, raw: &str) -> Result<TaskId> {
        resolve_id(self.service.store().tasks(), raw)
    }
}

fn resolve_id(tasks: &[Task], raw: &str) -> Result<TaskId> {
    let needle = raw.trim().to_ascii_lowercase();
    if needle.is_empty() {
        bail!("task id is empty");
    }
    let mut matches = tasks
        .iter()
        .filter(|task| task.id.as_str().to_ascii_lowercase().starts_with(&needle));
    match (matches.next(), matches.next()) {
        (Some(task), None) => Ok(task.id.clone()),
        (None, _) => bail!("no task with id {raw}"),
        (Some(_), Some(_)) => bail!("id prefix {raw} is ambiguous"),
    }
}

fn render(task: &Task) -> String {
    let mark = if task.completed { "x" } else { " " };
    let short_id: String = task.id.as_str().chars().take(SHORT_ID_LEN).collect();
    let priority = task
        .priority
        .map(|p| format!("P{p:<2}"))
        .unwrap_or_else(|| "   ".to_string());
    match due_label(task) {
        Some(due) => format!("[{mark}] {short_id} {priority} {} ({due})", task.description),
        None => format!("[{mark}] {short_id} {priority} {}", task.description),
    }
}

fn due_label(task: &Task) -> Option<String> {
    let date = task.due_date?;
    Some(match &task.due_time {
        Some(time) => format!("{} {time}", date.format("%Y-%m-%d")),
        None => date.format("%Y-%m-%d").to_string(),
    })
}

#[cfg(test)]
mod tests {
    use super::{render, resolve_id};
    use todozen_core::{NewTask, Task, TaskId};

    fn task(description: &str) -> Task {
        Task::new(NewTask {
            description: description.to_string(),
            due_date: None,
            due_time: None,
        })
    }

    #[test]
    fn resolve_id_accepts_full_id_and_unique_prefix() {
        let tasks = vec![task("a"), task("b")];
        let full = tasks[0].id.as_str().to_string();

        assert_eq!(resolve_id(&tasks, &full).unwrap(), tasks[0].id);
        assert_eq!(
            resolve_id(&tasks, &full.to_uppercase()).unwrap(),
            tasks[0].id
        );
        assert!(resolve_id(&tasks, "").is_err());
        assert!(resolve_id(&tasks, "not-an-id").is_err());
    }

    #[test]
    fn resolve_id_rejects_ambiguous_prefix() {
        let mut twins = vec![task("a"), task("b")];
        twins[1].id = twins[0].id.clone();
        let prefix = twins[0].id.as_str()[..4].to_string();
        let err = resolve_id(&twins, &prefix).unwrap_err();
        assert!(err.to_string().contains("ambiguous"));
    }

    #[test]
    fn resolve_id_matches_short_and_mixed_case_ids() {
        let mut tasks = vec![task("seed"), task("imported")];
        tasks[0].id = TaskId::from("1");
        tasks[1].id = TaskId::from("Imported-A");

        assert_eq!(resolve_id(&tasks, "1").unwrap(), TaskId::from("1"));
        assert_eq!(
            resolve_id(&tasks, "imported").unwrap(),
            TaskId::from("Imported-A")
        );
    }

    #[test]
    fn render_marks_completion_and_priority() {
        let mut done = task("Buy milk");
        done.completed = true;
        done.set_score(2, "urgent");
        let line = render(&done);
        assert!(line.starts_with("[x] "));
        assert!(line.contains("P2"));
        assert!(line.ends_with("Buy milk"));
    }
}
