//! Domain logic for Cozy Task.
//!
//! Everything in this crate is pure: no I/O, no clocks. Callers pass the current
//! instant in wherever a computation depends on it.

pub mod analytics;
pub mod calendar;
pub mod collection;
pub mod query;
pub mod routine;
pub mod subscription;
pub mod suggestion;
pub mod task;

pub use collection::TaskCollection;
pub use query::{TaskFilter, TaskSort, TaskView};
pub use routine::Routine;
pub use subscription::{Subscription, SubscriptionStatus};
pub use suggestion::{SuggestionOutcome, TaskSuggestion};
pub use task::{NewTask, Task, TaskError, TaskId, TaskPatch, TaskPriority, TaskStatus};
