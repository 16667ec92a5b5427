use serde::{Deserialize, Serialize};

/// A user's daily routine. Times are free-form `HH:MM` strings.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Routine {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub wake_up_time: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sleep_time: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub breakfast_time: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub lunch_time: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub dinner_time: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub work_start_time: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub work_end_time: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub exercise_time: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub notes: Option<String>,
}

impl Routine {
    /// True when no field carries a value.
    pub fn is_empty(&self) -> bool {
        *self == Routine::default()
    }
}
