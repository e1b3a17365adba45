//! Derives the visible task list from the full collection and the current filters.

use std::cmp::Ordering;

use crate::model::{CategoryFilter, Task};

/// Filter by category, then by search text, then order with [`compare_tasks`].
///
/// Recomputed from scratch on every call; nothing is cached between calls.
pub fn filter_and_sort<'a>(
    tasks: &'a [Task],
    filter: &CategoryFilter,
    search: &str,
) -> Vec<&'a Task> {
    let needle = if search.trim().is_empty() {
        None
    } else {
        Some(search.to_lowercase())
    };

    let mut visible: Vec<&Task> = tasks
        .iter()
        .filter(|task| filter.matches(task))
        .filter(|task| match &needle {
            Some(needle) => task.matches_search(needle),
            None => true,
        })
        .collect();

    visible.sort_by(|a, b| compare_tasks(a, b));
    visible
}

/// Incomplete before completed, then higher priority first, then oldest first.
pub fn compare_tasks(a: &Task, b: &Task) -> Ordering {
    a.completed
        .cmp(&b.completed)
        .then_with(|| b.priority.cmp(&a.priority))
        .then_with(|| a.created_at.cmp(&b.created_at))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::Priority;
    use chrono::{Duration, NaiveDate, TimeZone, Utc};
    use pretty_assertions::assert_eq;
    use rstest::rstest;
    use std::collections::HashSet;

    fn task(id: &str, category: Option<&str>, priority: Priority, completed: bool, age: i64) -> Task {
        Task {
            id: id.into(),
            title: format!("Task {id}"),
            description: String::new(),
            category_id: category.map(str::to_string),
            priority,
            due_date: NaiveDate::from_ymd_opt(2024, 1, 10).unwrap(),
            completed,
            created_at: Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap() + Duration::minutes(age),
            completed_at: None,
        }
    }

    fn ids(tasks: &[&Task]) -> Vec<String> {
        tasks.iter().map(|task| task.id.clone()).collect()
    }

    fn fixture() -> Vec<Task> {
        let mut milk = task("milk", Some("shop"), Priority::Low, false, 3);
        milk.title = "Buy MILK".into();
        let mut report = task("report", Some("work"), Priority::High, false, 1);
        report.description = "quarterly numbers, milk budget".into();
        let mut gym = task("gym", Some("health"), Priority::Medium, true, 0);
        gym.title = "Gym session".into();
        let loose = task("loose", None, Priority::Medium, false, 2);
        vec![milk, report, gym, loose]
    }

    #[rstest]
    #[case(CategoryFilter::All, "", vec!["milk", "report", "gym", "loose"])]
    #[case(CategoryFilter::All, "milk", vec!["milk", "report"])]
    #[case(CategoryFilter::All, "MiLk", vec!["milk", "report"])]
    #[case(CategoryFilter::Category("shop".into()), "milk", vec!["milk"])]
    #[case(CategoryFilter::Category("work".into()), "", vec!["report"])]
    #[case(CategoryFilter::Category("shop".into()), "gym", vec![])]
    #[case(CategoryFilter::Category("missing".into()), "", vec![])]
    #[case(CategoryFilter::All, "   ", vec!["milk", "report", "gym", "loose"])]
    fn filters_by_category_and_search(
        #[case] filter: CategoryFilter,
        #[case] search: &str,
        #[case] expected: Vec<&str>,
    ) {
        let tasks = fixture();
        let got: HashSet<String> = ids(&filter_and_sort(&tasks, &filter, search))
            .into_iter()
            .collect();
        let expected: HashSet<String> = expected.into_iter().map(str::to_string).collect();
        assert_eq!(got, expected);
    }

    #[test]
    fn sorts_incomplete_then_priority_then_age() {
        let tasks = vec![
            task("done-high", None, Priority::High, true, 0),
            task("low-old", None, Priority::Low, false, 0),
            task("med-new", None, Priority::Medium, false, 9),
            task("high", None, Priority::High, false, 5),
            task("med-old", None, Priority::Medium, false, 1),
            task("done-low", None, Priority::Low, true, 0),
        ];
        let sorted = filter_and_sort(&tasks, &CategoryFilter::All, "");
        assert_eq!(
            ids(&sorted),
            vec!["high", "med-old", "med-new", "low-old", "done-high", "done-low"]
        );
    }

    #[test]
    fn equal_keys_keep_collection_order() {
        let tasks = vec![
            task("first", None, Priority::Low, false, 0),
            task("second", None, Priority::Low, false, 0),
            task("third", None, Priority::Low, false, 0),
        ];
        let sorted = filter_and_sort(&tasks, &CategoryFilter::All, "");
        assert_eq!(ids(&sorted), vec!["first", "second", "third"]);
    }

    #[test]
    fn sorted_output_respects_pairwise_ordering() {
        let mut tasks = Vec::new();
        for (index, priority) in [Priority::Low, Priority::Medium, Priority::High]
            .into_iter()
            .cycle()
            .take(12)
            .enumerate()
        {
            let age = ((index * 7) % 5) as i64;
            tasks.push(task(&format!("t{index}"), None, priority, index % 3 == 0, age));
        }
        let sorted = filter_and_sort(&tasks, &CategoryFilter::All, "");
        for pair in sorted.windows(2) {
            let (a, b) = (pair[0], pair[1]);
            if a.completed != b.completed {
                assert!(!a.completed);
            } else if a.priority != b.priority {
                assert!(a.priority > b.priority);
            } else {
                assert!(a.created_at <= b.created_at);
            }
        }
    }
}
