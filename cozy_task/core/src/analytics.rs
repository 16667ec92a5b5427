//! Derived metrics over a user's task history.

use crate::query::available_tags;
use crate::task::{Task, TaskPriority, TaskStatus};
use chrono::{DateTime, Datelike, Days, Duration, NaiveDate, Utc};
use serde::Serialize;

const TREND_DAYS: i64 = 14;

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Overview {
    pub total: usize,
    pub completed: usize,
    pub pending: usize,
    /// Whole percent, 0 for an empty collection.
    pub completion_rate: u32,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PriorityDistribution {
    pub high: usize,
    pub medium: usize,
    pub low: usize,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TagCount {
    pub tag: String,
    pub count: usize,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CompletionDaysByPriority {
    pub high: i64,
    pub medium: i64,
    pub low: i64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TrendPoint {
    pub date: NaiveDate,
    pub label: String,
    pub value: f64,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct WeekdayActivity {
    pub date: NaiveDate,
    pub label: String,
    pub completed: usize,
    pub created: usize,
}

/// Everything the analytics page shows, computed in one pass per section.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AnalyticsReport {
    pub overview: Overview,
    pub priority_distribution: PriorityDistribution,
    pub tag_distribution: Vec<TagCount>,
    pub most_frequent_tag: Option<String>,
    pub lowest_completion_rate_tag: Option<String>,
    pub average_completion_days: Option<i64>,
    pub completion_days_by_priority: CompletionDaysByPriority,
    pub completion_trend: Vec<TrendPoint>,
    pub weekly_activity: Vec<WeekdayActivity>,
}

impl AnalyticsReport {
    pub fn compute(tasks: &[Task], now: DateTime<Utc>) -> Self {
        Self {
            overview: overview(tasks),
            priority_distribution: priority_distribution(tasks),
            tag_distribution: tag_distribution(tasks),
            most_frequent_tag: most_frequent_tag(tasks),
            lowest_completion_rate_tag: lowest_completion_rate_tag(tasks),
            average_completion_days: average_completion_days(tasks),
            completion_days_by_priority: completion_days_by_priority(tasks),
            completion_trend: completion_trend(tasks, now),
            weekly_activity: weekly_activity(tasks, now),
        }
    }
}

pub fn overview(tasks: &[Task]) -> Overview {
    let total = tasks.len();
    let completed = count_status(tasks, TaskStatus::Completed);
    let pending = count_status(tasks, TaskStatus::Pending);
    let completion_rate = if total > 0 {
        (completed as f64 / total as f64 * 100.0).round() as u32
    } else {
        0
    };
    Overview {
        total,
        completed,
        pending,
        completion_rate,
    }
}

pub fn priority_distribution(tasks: &[Task]) -> PriorityDistribution {
    let count = |p: TaskPriority| tasks.iter().filter(|t| t.priority() == p).count();
    PriorityDistribution {
        high: count(TaskPriority::High),
        medium: count(TaskPriority::Medium),
        low: count(TaskPriority::Low),
    }
}

/// Number of tasks carrying each tag, in available-tag order.
pub fn tag_distribution(tasks: &[Task]) -> Vec<TagCount> {
    available_tags(tasks)
        .into_iter()
        .map(|tag| {
            let count = tasks.iter().filter(|t| t.has_tag(&tag)).count();
            TagCount { tag, count }
        })
        .collect()
}

/// Tag on the most tasks; the earliest tag wins a tie.
pub fn most_frequent_tag(tasks: &[Task]) -> Option<String> {
    let mut best: Option<TagCount> = None;
    for entry in tag_distribution(tasks) {
        if best.as_ref().is_none_or(|b| entry.count > b.count) {
            best = Some(entry);
        }
    }
    best.map(|b| b.tag)
}

/// Tag with the lowest non-zero completion rate; the earliest tag wins a tie.
pub fn lowest_completion_rate_tag(tasks: &[Task]) -> Option<String> {
    let mut best: Option<(String, f64)> = None;
    for tag in available_tags(tasks) {
        let tagged: Vec<&Task> = tasks.iter().filter(|t| t.has_tag(&tag)).collect();
        if tagged.is_empty() {
            continue;
        }
        let done = tagged.iter().filter(|t| t.is_completed()).count();
        let rate = done as f64 / tagged.len() as f64 * 100.0;
        if rate == 0.0 {
            continue;
        }
        if best.as_ref().is_none_or(|(_, r)| rate < *r) {
            best = Some((tag, rate));
        }
    }
    best.map(|(tag, _)| tag)
}

/// Mean whole days from creation to completion, rounded.
pub fn average_completion_days(tasks: &[Task]) -> Option<i64> {
    let days: Vec<i64> = completed(tasks).map(days_to_complete).collect();
    mean(&days).map(|m| m.round() as i64)
}

pub fn completion_days_by_priority(tasks: &[Task]) -> CompletionDaysByPriority {
    let avg = |p: TaskPriority| {
        let days: Vec<i64> = completed(tasks)
            .filter(|t| t.priority() == p)
            .map(days_to_complete)
            .collect();
        mean(&days).map(|m| m.round() as i64).unwrap_or(0)
    };
    CompletionDaysByPriority {
        high: avg(TaskPriority::High),
        medium: avg(TaskPriority::Medium),
        low: avg(TaskPriority::Low),
    }
}

/// Average completion days for tasks finished on each of the last 14 days.
pub fn completion_trend(tasks: &[Task], now: DateTime<Utc>) -> Vec<TrendPoint> {
    let today = now.date_naive();
    (0..TREND_DAYS)
        .rev()
        .map(|offset| {
            let date = today - Duration::days(offset);
            let days: Vec<i64> = completed(tasks)
                .filter(|t| t.updated_at().date_naive() == date)
                .map(days_to_complete)
                .collect();
            let value = mean(&days).map(|m| (m * 10.0).round() / 10.0).unwrap_or(0.0);
            TrendPoint {
                date,
                label: date.format("%b %d").to_string(),
                value,
            }
        })
        .collect()
}

/// Created and completed counts for each day of the current Sunday-started week.
pub fn weekly_activity(tasks: &[Task], now: DateTime<Utc>) -> Vec<WeekdayActivity> {
    let Some(start) = start_of_week(now.date_naive()) else {
        return Vec::new();
    };
    (0..7)
        .filter_map(|offset| start.checked_add_days(Days::new(offset)))
        .map(|date| {
            WeekdayActivity {
                date,
                label: date.format("%a").to_string(),
                completed: completed(tasks)
                    .filter(|t| t.updated_at().date_naive() == date)
                    .count(),
                created: tasks
                    .iter()
                    .filter(|t| t.created_at().date_naive() == date)
                    .count(),
            }
        })
        .collect()
}

/// Sunday on or before `date`.
pub fn start_of_week(date: NaiveDate) -> Option<NaiveDate> {
    date.checked_sub_days(Days::new(u64::from(date.weekday().num_days_from_sunday())))
}

fn count_status(tasks: &[Task], status: TaskStatus) -> usize {
    tasks.iter().filter(|t| t.status() == status).count()
}

fn completed(tasks: &[Task]) -> impl Iterator<Item = &Task> {
    tasks.iter().filter(|t| t.is_completed())
}

fn days_to_complete(task: &Task) -> i64 {
    (task.updated_at() - task.created_at()).num_days()
}

fn mean(values: &[i64]) -> Option<f64> {
    if values.is_empty() {
        return None;
    }
    Some(values.iter().sum::<i64>() as f64 / values.len() as f64)
}
