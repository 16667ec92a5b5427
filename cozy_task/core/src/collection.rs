use crate::query::{self, TaskFilter, TaskSort};
use crate::task::{NewTask, Task, TaskError, TaskPatch};
use chrono::{DateTime, NaiveDate, Utc};
use std::collections::HashSet;

/// Immutable snapshot of one user's tasks.
///
/// Every mutation returns a new snapshot and leaves `self` untouched. Insertion
/// order is preserved; new tasks are appended.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TaskCollection {
    tasks: Vec<Task>,
}

impl TaskCollection {
    pub fn new() -> Self {
        Self::default()
    }

    /// Wraps loaded tasks. Later duplicates of an id are dropped.
    pub fn from_tasks(tasks: Vec<Task>) -> Self {
        let mut seen = HashSet::with_capacity(tasks.len());
        let tasks = tasks
            .into_iter()
            .filter(|task| seen.insert(task.id().to_string()))
            .collect();
        Self { tasks }
    }

    pub fn tasks(&self) -> &[Task] {
        &self.tasks
    }

    pub fn into_tasks(self) -> Vec<Task> {
        self.tasks
    }

    pub fn len(&self) -> usize {
        self.tasks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tasks.is_empty()
    }

    pub fn get(&self, id: &str) -> Option<&Task> {
        self.tasks.iter().find(|task| task.id() == id)
    }

    /// Appends a new task with a freshly generated id.
    pub fn add(&self, input: NewTask, now: DateTime<Utc>) -> Result<(Self, Task), TaskError> {
        let id = uuid::Uuid::new_v4().to_string();
        let task = Task::create(id, input, now)?;
        let mut tasks = self.tasks.clone();
        tasks.push(task.clone());
        Ok((Self { tasks }, task))
    }

    pub fn update(
        &self,
        id: &str,
        patch: TaskPatch,
        now: DateTime<Utc>,
    ) -> Result<(Self, Task), TaskError> {
        self.replace(id, |task| task.patched(patch, now))
    }

    pub fn toggle_status(&self, id: &str, now: DateTime<Utc>) -> Result<(Self, Task), TaskError> {
        self.replace(id, |task| Ok(task.toggled(now)))
    }

    /// Moves a task's due date to midnight (UTC) of `date`.
    pub fn reschedule(
        &self,
        id: &str,
        date: NaiveDate,
        now: DateTime<Utc>,
    ) -> Result<(Self, Task), TaskError> {
        let due = date.and_time(chrono::NaiveTime::MIN).and_utc();
        self.update(id, TaskPatch::due_date(Some(due)), now)
    }

    /// Hard delete. Returns the removed task.
    pub fn delete(&self, id: &str) -> Result<(Self, Task), TaskError> {
        let position = self.position(id)?;
        let mut tasks = self.tasks.clone();
        let removed = tasks.remove(position);
        Ok((Self { tasks }, removed))
    }

    /// Union of all tags in first-seen order.
    pub fn available_tags(&self) -> Vec<String> {
        query::available_tags(&self.tasks)
    }

    pub fn filtered_and_sorted(
        &self,
        filter: TaskFilter,
        sort: TaskSort,
        now: DateTime<Utc>,
    ) -> Vec<Task> {
        query::filter_and_sort(&self.tasks, filter, sort, now)
    }

    fn position(&self, id: &str) -> Result<usize, TaskError> {
        self.tasks
            .iter()
            .position(|task| task.id() == id)
            .ok_or_else(|| TaskError::TaskNotFound(id.to_string()))
    }

    fn replace<F>(&self, id: &str, change: F) -> Result<(Self, Task), TaskError>
    where
        F: FnOnce(&Task) -> Result<Task, TaskError>,
    {
        let position = self.position(id)?;
        let changed = change(&self.tasks[position])?;
        let mut tasks = self.tasks.clone();
        tasks[position] = changed.clone();
        Ok((Self { tasks }, changed))
    }
}
