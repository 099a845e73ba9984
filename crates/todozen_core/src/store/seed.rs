//! Example tasks shown when local storage has never been written.

use crate::model::task::{NewTask, Task};
use chrono::{Days, NaiveDateTime, NaiveTime};

/// Returns the three example tasks, due dates relative to `now`.
pub fn seed_tasks(now: NaiveDateTime) -> Vec<Task> {
    let today = now.date();
    let in_days = |days: u64| today.checked_add_days(Days::new(days)).unwrap_or(today);
    let five_pm = NaiveTime::from_hms_opt(17, 0, 0).unwrap_or(NaiveTime::MIN);

    let proposal = Task::new(NewTask {
        description: "Finish the project proposal".to_string(),
        due_date: Some(in_days(2).and_time(five_pm)),
        due_time: Some("17:00".to_string()),
    });
    let groceries = Task::new(NewTask {
        description: "Buy groceries for the week".to_string(),
        due_date: Some(in_days(1).and_time(NaiveTime::MIN)),
        due_time: None,
    });
    let mut dentist = Task::new(NewTask {
        description: "Schedule dentist appointment".to_string(),
        due_date: None,
        due_time: None,
    });
    dentist.completed = true;

    vec![proposal, groceries, dentist]
}

#[cfg(test)]
mod tests {
    use super::seed_tasks;
    use chrono::NaiveDate;

    #[test]
    fn seed_tasks_are_valid_and_relative_to_now() {
        let now = NaiveDate::from_ymd_opt(2024, 3, 10)
            .unwrap()
            .and_hms_opt(9, 15, 0)
            .unwrap();
        let seeds = seed_tasks(now);

        assert_eq!(seeds.len(), 3);
        assert!(seeds.iter().all(|task| task.validate().is_ok()));
        assert_eq!(
            seeds[0].due_date,
            NaiveDate::from_ymd_opt(2024, 3, 12)
                .unwrap()
                .and_hms_opt(17, 0, 0)
        );
        assert_eq!(
            seeds[1].due_date,
            NaiveDate::from_ymd_opt(2024, 3, 11)
                .unwrap()
                .and_hms_opt(0, 0, 0)
        );
        assert!(seeds[2].completed);
        assert_eq!(seeds[2].due_date, None);
    }
}
