//! Work items materialized by the automation engine (or created manually
//! through the surrounding application, outside this core).

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use amparo_types::{Priority, Scope};

/// Kind + id of the record that triggered a task.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TaskRefKind {
    Case,
    Referral,
}

impl TaskRefKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Case => "case",
            Self::Referral => "referral",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct TaskRef {
    pub kind: TaskRefKind,
    pub id: Uuid,
}

impl TaskRef {
    pub fn case(id: Uuid) -> Self {
        Self {
            kind: TaskRefKind::Case,
            id,
        }
    }

    pub fn referral(id: Uuid) -> Self {
        Self {
            kind: TaskRefKind::Referral,
            id,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TaskStatus {
    Open,
    InProgress,
    Done,
}

impl TaskStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Open => "open",
            Self::InProgress => "in_progress",
            Self::Done => "done",
        }
    }

    pub fn is_open(&self) -> bool {
        *self == Self::Open
    }
}

impl std::str::FromStr for TaskStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "open" => Ok(Self::Open),
            "in_progress" => Ok(Self::InProgress),
            "done" => Ok(Self::Done),
            _ => Err(format!("Unknown task status: {}", s)),
        }
    }
}

/// A work item for a human.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Task {
    pub task_id: Uuid,
    pub scope: Scope,
    pub reference: TaskRef,
    /// Rule key that generated this task; `None` for manual tasks.
    pub rule_key: Option<String>,
    pub title: String,
    pub description: String,
    pub priority: Priority,
    pub status: TaskStatus,
    pub due_date: Option<DateTime<Utc>>,
    pub assigned_to: Option<Uuid>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn task_status_roundtrip() {
        for s in [TaskStatus::Open, TaskStatus::InProgress, TaskStatus::Done] {
            assert_eq!(s.as_str().parse::<TaskStatus>(), Ok(s));
        }
        assert!("cancelled".parse::<TaskStatus>().is_err());
        assert!(TaskStatus::Open.is_open());
        assert!(!TaskStatus::Done.is_open());
    }

    #[test]
    fn task_ref_constructors() {
        let id = Uuid::new_v4();
        assert_eq!(TaskRef::case(id).kind, TaskRefKind::Case);
        assert_eq!(TaskRef::referral(id).kind.as_str(), "referral");
    }
}
