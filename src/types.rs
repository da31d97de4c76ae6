//! Core data types for task records.

use serde::{Deserialize, Serialize};

/// Plain data attached to a task. Replaced wholesale on every edit.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct TaskData {
    /// Short description of the work
    pub label: String,

    /// Current state
    pub status: Status,
}

impl TaskData {
    /// Create task data with the given label and status.
    pub fn new(label: impl Into<String>, status: Status) -> Self {
        Self {
            label: label.into(),
            status,
        }
    }

    /// Create open task data with the given label.
    pub fn open(label: impl Into<String>) -> Self {
        Self::new(label, Status::Open)
    }
}

/// Task status states.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Status {
    #[default]
    Open,
    Started,
    Completed,
}

impl Status {
    /// True for every status that still holds up the tasks it blocks.
    pub fn is_blocking(&self) -> bool {
        !matches!(self, Status::Completed)
    }

    /// Move to `Started` unconditionally.
    pub fn start(self) -> Status {
        Status::Started
    }

    /// Move `Started` back to `Open`; any other status is kept.
    pub fn stop(self) -> Status {
        match self {
            Status::Started => Status::Open,
            other => other,
        }
    }

    /// Move to `Completed` unconditionally.
    pub fn complete(self) -> Status {
        Status::Completed
    }

    /// Move `Completed` back to `Open`; any other status is kept.
    pub fn reopen(self) -> Status {
        match self {
            Status::Completed => Status::Open,
            other => other,
        }
    }
}

impl std::fmt::Display for Status {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Status::Open => write!(f, "open"),
            Status::Started => write!(f, "started"),
            Status::Completed => write!(f, "completed"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_status_is_open() {
        assert_eq!(Status::default(), Status::Open);
        assert_eq!(TaskData::open("x").status, Status::Open);
    }

    #[test]
    fn test_is_blocking() {
        assert!(Status::Open.is_blocking());
        assert!(Status::Started.is_blocking());
        assert!(!Status::Completed.is_blocking());
    }

    #[test]
    fn test_status_transforms() {
        use Status::*;

        assert_eq!(Open.start(), Started);
        assert_eq!(Completed.start(), Started);

        assert_eq!(Started.stop(), Open);
        assert_eq!(Open.stop(), Open);
        assert_eq!(Completed.stop(), Completed);

        assert_eq!(Open.complete(), Completed);
        assert_eq!(Started.complete(), Completed);

        assert_eq!(Completed.reopen(), Open);
        assert_eq!(Open.reopen(), Open);
        assert_eq!(Started.reopen(), Started);
    }

    #[test]
    fn test_task_data_serialization_roundtrip() {
        let data = TaskData::new("write design doc", Status::Started);
        let json = serde_json::to_string(&data).unwrap();
        assert!(json.contains("\"started\""));
        let back: TaskData = serde_json::from_str(&json).unwrap();
        assert_eq!(back, data);
    }
}
