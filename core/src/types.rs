//! Wire types for the ReportPortal launch and activity APIs.
//!
//! # Design
//! The constant sets (modes, statuses, actions, log levels) are closed enums
//! so callers get exhaustiveness checking; serde renames keep the wire
//! spelling the server expects, including the historical `RESETED`.
//! The launch start time travels as an RFC 3339 `startTime`; the end time of
//! stop/finish travels as epoch milliseconds under `end_time`. Activity
//! entries decode leniently: absent or `null` strings become empty.

use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Deserializer, Serialize};

/// Launch run mode.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Mode {
    Debug,
    #[default]
    Default,
}

/// Final status reported when a launch is stopped or finished.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum LaunchStatus {
    Passed,
    Failed,
    Stopped,
    Skipped,
    Reseted,
    #[serde(rename = "CANCELLED")]
    Canceled,
}

/// Terminal transition of a launch. Doubles as the request path suffix.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Action {
    /// Forced termination.
    Stop,
    /// Natural completion.
    Finish,
}

impl Action {
    pub fn as_str(self) -> &'static str {
        match self {
            Action::Stop => "stop",
            Action::Finish => "finish",
        }
    }
}

impl fmt::Display for Action {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Severity of a log entry attached to a test item.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogLevel {
    Trace,
    Debug,
    Info,
    Warn,
    Error,
    Fatal,
    Unknown,
}

/// Request payload for starting a launch.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StartLaunch {
    pub name: String,
    pub description: String,
    #[serde(rename = "startTime")]
    pub start_time: DateTime<Utc>,
    pub mode: Mode,
    pub tags: Vec<String>,
}

/// Response to a successful start; only `id` is consumed.
#[derive(Debug, Clone, Deserialize)]
pub struct LaunchCreated {
    pub id: String,
}

/// Request payload for updating launch metadata. Only the fields that are
/// set are sent; omitted fields remain unchanged on the server.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct UpdateLaunch {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub mode: Option<Mode>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub tags: Option<Vec<String>>,
}

/// Request payload shared by stop and finish.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FinishLaunch {
    pub status: LaunchStatus,
    #[serde(with = "chrono::serde::ts_milliseconds")]
    pub end_time: DateTime<Utc>,
}

/// Page selector for paged endpoints. Pages are 1-based.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PageRequest {
    pub page: u32,
    pub size: u32,
}

impl Default for PageRequest {
    fn default() -> Self {
        Self { page: 1, size: 20 }
    }
}

/// One page of the project's activity log.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Activity {
    #[serde(default)]
    pub content: Vec<ActivityEntry>,
    pub page: Page,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ActivityEntry {
    #[serde(default, deserialize_with = "null_as_empty")]
    pub action_type: String,
    #[serde(default, deserialize_with = "null_as_empty")]
    pub activity_id: String,
    #[serde(default, deserialize_with = "null_as_default")]
    pub history: Vec<FieldChange>,
    pub last_modified_date: DateTime<Utc>,
    #[serde(default, deserialize_with = "null_as_empty")]
    pub logged_object_ref: String,
    #[serde(default, deserialize_with = "null_as_empty")]
    pub object_name: String,
    #[serde(default, deserialize_with = "null_as_empty")]
    pub object_type: String,
    #[serde(default, deserialize_with = "null_as_empty")]
    pub project_ref: String,
    #[serde(default, deserialize_with = "null_as_empty")]
    pub user_ref: String,
}

/// Before/after value of a single field touched by an activity.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FieldChange {
    #[serde(default, deserialize_with = "null_as_empty")]
    pub field: String,
    #[serde(default, deserialize_with = "null_as_empty")]
    pub new_value: String,
    #[serde(default, deserialize_with = "null_as_empty")]
    pub old_value: String,
}

fn null_as_empty<'de, D: Deserializer<'de>>(deserializer: D) -> Result<String, D::Error> {
    null_as_default(deserializer)
}

fn null_as_default<'de, D, T>(deserializer: D) -> Result<T, D::Error>
where
    D: Deserializer<'de>,
    T: Deserialize<'de> + Default,
{
    Ok(Option::<T>::deserialize(deserializer)?.unwrap_or_default())
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Page {
    pub number: u32,
    pub size: u32,
    pub total_elements: u64,
    pub total_pages: u32,
}
