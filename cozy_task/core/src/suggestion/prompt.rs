use super::SUGGESTION_COUNT;
use crate::routine::Routine;
use crate::task::{Task, TaskStatus};
use serde::Serialize;

/// Summary of a collection used in the prompt's completion-pattern block.
#[derive(Debug, Clone, PartialEq)]
pub struct TaskStats {
    pub total: usize,
    pub completed: usize,
    pub pending: usize,
    /// Fraction in `0.0..=1.0`.
    pub completion_rate: f64,
    /// Tag counts, most used first; ties keep first-seen order.
    pub tag_frequency: Vec<(String, usize)>,
}

impl TaskStats {
    pub fn from_tasks(tasks: &[Task]) -> Self {
        let total = tasks.len();
        let completed = tasks
            .iter()
            .filter(|t| t.status() == TaskStatus::Completed)
            .count();
        let pending = tasks
            .iter()
            .filter(|t| t.status() == TaskStatus::Pending)
            .count();

        let mut tag_frequency: Vec<(String, usize)> = Vec::new();
        for tag in tasks.iter().flat_map(|t| t.tags()) {
            match tag_frequency.iter_mut().find(|(t, _)| t == tag) {
                Some((_, count)) => *count += 1,
                None => tag_frequency.push((tag.clone(), 1)),
            }
        }
        tag_frequency.sort_by(|a, b| b.1.cmp(&a.1));

        Self {
            total,
            completed,
            pending,
            completion_rate: if total > 0 {
                completed as f64 / total as f64
            } else {
                0.0
            },
            tag_frequency,
        }
    }

    pub fn common_tags(&self) -> Vec<&str> {
        self.tag_frequency.iter().map(|(t, _)| t.as_str()).collect()
    }
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct TaskHistoryEntry<'a> {
    title: &'a str,
    description: &'a str,
    status: TaskStatus,
    due_date: Option<String>,
    priority: &'a str,
    tags: &'a [String],
    created_at: String,
}

impl<'a> From<&'a Task> for TaskHistoryEntry<'a> {
    fn from(task: &'a Task) -> Self {
        Self {
            title: task.title(),
            description: task.description().unwrap_or_default(),
            status: task.status(),
            due_date: task.due_date().map(|d| d.to_rfc3339()),
            priority: task.priority().as_str(),
            tags: task.tags(),
            created_at: task.created_at().to_rfc3339(),
        }
    }
}

const GUIDANCE: &str = "Consider the following when making suggestions:
- Suggest tasks that align with the user's existing task patterns and preferences
- If the user has many incomplete tasks, suggest organizational tasks to help manage them
- If the user has high completion rates, suggest more challenging tasks
- Use the user's existing tags when relevant, but feel free to suggest new ones if appropriate
- Suggest tasks that complement existing tasks, not duplicate them
- Consider the user's daily routines when scheduling tasks:
  - Wake-up time and sleep time to suggest tasks at appropriate hours
  - Meal times (breakfast, lunch, dinner) to avoid scheduling during these times
  - Work start and end times to distinguish between work and personal tasks
  - Exercise time to promote health-related tasks

For each suggestion, provide:
1. A clear, concise title
2. A brief description explaining the value of the task
3. A suggested due date (in ISO format)
4. A priority level (low, medium, or high)
5. Relevant tags based on the user's existing tags";

const RESPONSE_FORMAT: &str = r#"Format your response as a JSON array with objects containing these fields:
[{
  "title": "Task title",
  "description": "Task description",
  "dueDate": "YYYY-MM-DDT00:00:00.000Z",
  "priority": "medium",
  "tags": ["tag1", "tag2"]
}]"#;

/// Renders the generation prompt for a non-empty task history.
pub fn build_prompt(tasks: &[Task], routines: &[Routine]) -> String {
    let stats = TaskStats::from_tasks(tasks);
    let history: Vec<TaskHistoryEntry<'_>> = tasks.iter().map(TaskHistoryEntry::from).collect();
    let history_json = serde_json::to_string_pretty(&history).unwrap_or_else(|_| "[]".to_string());

    let routines_section = if routines.is_empty() {
        String::new()
    } else {
        let json = serde_json::to_string_pretty(routines).unwrap_or_else(|_| "[]".to_string());
        format!("\nUser's daily routines:\n{json}\n")
    };

    format!(
        "You are an AI assistant that helps users manage their tasks and improve productivity.
Based on the following task history, completion patterns, and daily routines, suggest {count} new tasks that would be helpful for the user.

User's task history:
{history_json}

Task completion patterns:
- Completion rate: {rate:.1}%
- Completed tasks: {completed}
- Pending tasks: {pending}
- Common tags: {tags}
{routines_section}
{GUIDANCE}

{RESPONSE_FORMAT}
",
        count = SUGGESTION_COUNT,
        rate = stats.completion_rate * 100.0,
        completed = stats.completed,
        pending = stats.pending,
        tags = stats.common_tags().join(", "),
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::task::NewTask;
    use chrono::{TimeZone, Utc};

    fn tasks() -> Vec<Task> {
        let now = Utc.with_ymd_and_hms(2025, 4, 1, 8, 0, 0).unwrap();
        let make = |id: &str, tags: &[&str]| {
            let input = NewTask {
                title: format!("Task {id}"),
                tags: tags.iter().map(|t| t.to_string()).collect(),
                ..Default::default()
            };
            Task::create(id.to_string(), input, now).unwrap()
        };
        vec![
            make("1", &["home"]).toggled(now),
            make("2", &["work", "home"]),
            make("3", &["work"]),
        ]
    }

    #[test]
    fn can_summarise_completion_and_tag_frequency() {
        let stats = TaskStats::from_tasks(&tasks());

        assert_eq!(stats.total, 3);
        assert_eq!(stats.completed, 1);
        assert_eq!(stats.pending, 2);
        assert_eq!(
            stats.tag_frequency,
            vec![("home".to_string(), 2), ("work".to_string(), 2)]
        );
    }

    #[test]
    fn can_render_prompt_with_patterns_and_format() {
        let prompt = build_prompt(&tasks(), &[]);

        assert!(prompt.contains("suggest 3 new tasks"));
        assert!(prompt.contains("- Completion rate: 33.3%"));
        assert!(prompt.contains("- Common tags: home, work"));
        assert!(prompt.contains("\"title\": \"Task 2\""));
        assert!(prompt.contains("Format your response as a JSON array"));
        assert!(!prompt.contains("daily routines:\n"));
    }

    #[test]
    fn can_include_routines_when_present() {
        let routine = Routine {
            wake_up_time: Some("06:30".to_string()),
            ..Default::default()
        };

        let prompt = build_prompt(&tasks(), &[routine]);

        assert!(prompt.contains("User's daily routines:"));
        assert!(prompt.contains("\"wakeUpTime\": \"06:30\""));
    }
}
