//! Client-side filtering and sorting of a task list.

use crate::task::{Task, TaskStatus};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::cmp::Ordering;

#[derive(Debug, Default, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TaskFilter {
    #[default]
    All,
    Completed,
    Pending,
    Overdue,
}

impl TaskFilter {
    pub fn matches(self, task: &Task, now: DateTime<Utc>) -> bool {
        match self {
            TaskFilter::All => true,
            TaskFilter::Completed => task.status() == TaskStatus::Completed,
            TaskFilter::Pending => task.status() == TaskStatus::Pending,
            TaskFilter::Overdue => task.is_overdue(now),
        }
    }
}

#[derive(Debug, Default, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TaskSort {
    #[default]
    Date,
    Priority,
    Alphabetical,
}

impl TaskSort {
    pub fn compare(self, a: &Task, b: &Task) -> Ordering {
        match self {
            TaskSort::Date => b.updated_at().cmp(&a.updated_at()),
            TaskSort::Priority => b.priority().rank().cmp(&a.priority().rank()),
            TaskSort::Alphabetical => compare_titles(a.title(), b.title()),
        }
    }
}

/// Presentation hint echoed back to clients.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TaskView {
    #[default]
    List,
    Grid,
}

/// Keeps the tasks matching `filter`, in their original relative order.
pub fn filter_tasks(tasks: &[Task], filter: TaskFilter, now: DateTime<Utc>) -> Vec<Task> {
    tasks
        .iter()
        .filter(|task| filter.matches(task, now))
        .cloned()
        .collect()
}

/// Stable sort; ties keep their input order.
pub fn sort_tasks(tasks: &mut [Task], sort: TaskSort) {
    tasks.sort_by(|a, b| sort.compare(a, b));
}

pub fn filter_and_sort(
    tasks: &[Task],
    filter: TaskFilter,
    sort: TaskSort,
    now: DateTime<Utc>,
) -> Vec<Task> {
    let mut selected = filter_tasks(tasks, filter, now);
    sort_tasks(&mut selected, sort);
    selected
}

/// Every tag used by any task, first-seen order.
pub fn available_tags(tasks: &[Task]) -> Vec<String> {
    let mut tags: Vec<String> = Vec::new();
    for tag in tasks.iter().flat_map(|task| task.tags()) {
        if !tags.contains(tag) {
            tags.push(tag.clone());
        }
    }
    tags
}

/// Case-insensitive first; on a tie lowercase sorts ahead of uppercase.
fn compare_titles(a: &str, b: &str) -> Ordering {
    a.to_lowercase()
        .cmp(&b.to_lowercase())
        .then_with(|| a.cmp(b).reverse())
}
