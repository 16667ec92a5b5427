//! Calendar bucketing of tasks by due date.

use crate::analytics::start_of_week;
use crate::task::{Task, TaskError};
use chrono::{Datelike, Days, NaiveDate};
use serde::Serialize;

/// Tasks shown per cell before the rest collapse into "+N more".
pub const VISIBLE_PER_DAY: usize = 3;
const GRID_DAYS: u64 = 42;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct YearMonth {
    pub year: i32,
    pub month: u32,
}

impl YearMonth {
    pub fn new(year: i32, month: u32) -> Result<Self, TaskError> {
        if NaiveDate::from_ymd_opt(year, month, 1).is_none() {
            return Err(TaskError::InvalidMonth { year, month });
        }
        Ok(Self { year, month })
    }

    pub fn of(date: NaiveDate) -> Self {
        Self {
            year: date.year(),
            month: date.month(),
        }
    }

    pub fn first_day(self) -> NaiveDate {
        NaiveDate::from_ymd_opt(self.year, self.month, 1).unwrap_or(NaiveDate::MIN)
    }

    pub fn next(self) -> Self {
        if self.month == 12 {
            Self {
                year: self.year + 1,
                month: 1,
            }
        } else {
            Self {
                year: self.year,
                month: self.month + 1,
            }
        }
    }

    pub fn previous(self) -> Self {
        if self.month == 1 {
            Self {
                year: self.year - 1,
                month: 12,
            }
        } else {
            Self {
                year: self.year,
                month: self.month - 1,
            }
        }
    }

    pub fn label(self) -> String {
        self.first_day().format("%B %Y").to_string()
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DayCell {
    pub date: NaiveDate,
    pub in_current_month: bool,
    pub is_today: bool,
    pub tasks: Vec<Task>,
    pub hidden_count: usize,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct MonthGrid {
    pub year: i32,
    pub month: u32,
    pub label: String,
    pub previous: YearMonth,
    pub next: YearMonth,
    pub days: Vec<DayCell>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DayAgenda {
    pub date: NaiveDate,
    pub count: usize,
    pub tasks: Vec<Task>,
}

/// Tasks whose due date falls on `date` (UTC), in collection order.
pub fn tasks_due_on(tasks: &[Task], date: NaiveDate) -> Vec<Task> {
    tasks
        .iter()
        .filter(|task| task.due_date().is_some_and(|due| due.date_naive() == date))
        .cloned()
        .collect()
}

/// Six Sunday-started weeks covering `month`. Fails for months whose grid
/// runs past the representable date range.
pub fn month_grid(
    tasks: &[Task],
    month: YearMonth,
    today: NaiveDate,
) -> Result<MonthGrid, TaskError> {
    let out_of_range = TaskError::InvalidMonth {
        year: month.year,
        month: month.month,
    };
    let dates = consecutive_days(start_of_week(month.first_day()), GRID_DAYS)
        .ok_or(out_of_range)?;
    let days = dates
        .into_iter()
        .map(|date| {
            let mut due = tasks_due_on(tasks, date);
            let hidden_count = due.len().saturating_sub(VISIBLE_PER_DAY);
            due.truncate(VISIBLE_PER_DAY);
            DayCell {
                date,
                in_current_month: date.month() == month.month && date.year() == month.year,
                is_today: date == today,
                tasks: due,
                hidden_count,
            }
        })
        .collect();

    Ok(MonthGrid {
        year: month.year,
        month: month.month,
        label: month.label(),
        previous: month.previous(),
        next: month.next(),
        days,
    })
}

/// The seven dates of the Sunday-started week containing `date`.
pub fn week_of(date: NaiveDate) -> Result<Vec<NaiveDate>, TaskError> {
    consecutive_days(start_of_week(date), 7).ok_or(TaskError::DateOutOfRange(date))
}

fn consecutive_days(start: Option<NaiveDate>, count: u64) -> Option<Vec<NaiveDate>> {
    let start = start?;
    (0..count)
        .map(|offset| start.checked_add_days(Days::new(offset)))
        .collect()
}

pub fn day_agenda(tasks: &[Task], date: NaiveDate) -> DayAgenda {
    let tasks = tasks_due_on(tasks, date);
    DayAgenda {
        date,
        count: tasks.len(),
        tasks,
    }
}

/// Confirmation shown after a drag-and-drop move, e.g. "Task moved to Monday, June 2".
pub fn reschedule_message(date: NaiveDate) -> String {
    format!("Task moved to {}", date.format("%A, %B %-d"))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::task::NewTask;
    use chrono::{TimeZone, Utc};

    fn due(id: &str, y: i32, m: u32, d: u32, hour: u32) -> Task {
        let input = NewTask {
            title: id.to_string(),
            due_date: Some(Utc.with_ymd_and_hms(y, m, d, hour, 0, 0).unwrap()),
            ..Default::default()
        };
        Task::create(id.to_string(), input, Utc::now()).unwrap()
    }

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    #[test]
    fn can_build_42_day_grid_starting_on_sunday() {
        // June 1st 2025 is a Sunday, March 1st 2025 is a Saturday.
        let june = month_grid(&[], YearMonth::new(2025, 6).unwrap(), date(2025, 6, 10)).unwrap();
        let march = month_grid(&[], YearMonth::new(2025, 3).unwrap(), date(2025, 6, 10)).unwrap();

        assert_eq!(june.days.len(), 42);
        assert_eq!(june.days[0].date, date(2025, 6, 1));
        assert_eq!(march.days[0].date, date(2025, 2, 23));
        assert!(!march.days[0].in_current_month);
        assert!(march.days[6].in_current_month);
        assert_eq!(june.label, "June 2025");
        assert!(june.days[9].is_today);
    }

    #[test]
    fn can_collapse_more_than_three_tasks_per_day() {
        let tasks: Vec<Task> = (0..5)
            .map(|i| due(&format!("t{i}"), 2025, 6, 4, 9 + i))
            .collect();

        let grid = month_grid(&tasks, YearMonth::new(2025, 6).unwrap(), date(2025, 6, 1)).unwrap();
        let cell = grid.days.iter().find(|c| c.date == date(2025, 6, 4)).unwrap();

        assert_eq!(cell.tasks.len(), 3);
        assert_eq!(cell.hidden_count, 2);
        assert_eq!(cell.tasks[0].id(), "t0");
    }

    #[test]
    fn can_navigate_across_year_boundaries() {
        let december = YearMonth::new(2024, 12).unwrap();
        assert_eq!(december.next(), YearMonth::new(2025, 1).unwrap());
        assert_eq!(december.next().previous(), december);
        assert!(YearMonth::new(2025, 13).is_err());
    }

    #[test]
    fn can_reject_grids_past_the_date_range() {
        let last = YearMonth::of(NaiveDate::MAX);

        assert!(matches!(
            month_grid(&[], last, date(2025, 6, 1)),
            Err(TaskError::InvalidMonth { .. })
        ));
        assert!(matches!(
            week_of(NaiveDate::MAX),
            Err(TaskError::DateOutOfRange(_))
        ));
    }

    #[test]
    fn can_list_week_and_day_agenda() {
        let tasks = vec![due("a", 2025, 6, 4, 8), due("b", 2025, 6, 5, 8)];

        let week = week_of(date(2025, 6, 4)).unwrap();
        let agenda = day_agenda(&tasks, date(2025, 6, 4));

        assert_eq!(week.first(), Some(&date(2025, 6, 1)));
        assert_eq!(week.last(), Some(&date(2025, 6, 7)));
        assert_eq!(agenda.count, 1);
        assert_eq!(agenda.tasks[0].id(), "a");
    }

    #[test]
    fn can_format_reschedule_message() {
        assert_eq!(
            reschedule_message(date(2025, 6, 2)),
            "Task moved to Monday, June 2"
        );
    }
}
