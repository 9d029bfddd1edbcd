//! Case history ledger types.
//!
//! Append-only: events are created alongside every case mutation and are
//! never updated or deleted. The store assigns the insertion sequence.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// What a history entry records.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CaseAction {
    Intake,
    Advance,
    Validate,
    Stagnate,
    Close,
    Edit,
}

impl CaseAction {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Intake => "intake",
            Self::Advance => "advance",
            Self::Validate => "validate",
            Self::Stagnate => "stagnate",
            Self::Close => "close",
            Self::Edit => "edit",
        }
    }
}

impl std::str::FromStr for CaseAction {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "intake" => Ok(Self::Intake),
            "advance" => Ok(Self::Advance),
            "validate" => Ok(Self::Validate),
            "stagnate" => Ok(Self::Stagnate),
            "close" => Ok(Self::Close),
            "edit" => Ok(Self::Edit),
            _ => Err(format!("Unknown case action: {}", s)),
        }
    }
}

/// One entry in a case's audit trail.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CaseEvent {
    pub event_id: Uuid,
    pub case_id: Uuid,
    /// Stage the case was in after this action took effect.
    pub stage_code: String,
    pub action: CaseAction,
    pub actor_id: Uuid,
    pub actor_name: String,
    pub note: Option<String>,
    /// Only set for `stagnate` entries.
    pub stagnation_reason: Option<String>,
    pub occurred_at: DateTime<Utc>,
    /// Insertion sequence assigned by the store. Replay order, never
    /// content order.
    pub seq: u64,
}

impl CaseEvent {
    pub fn new(
        case_id: Uuid,
        stage_code: impl Into<String>,
        action: CaseAction,
        actor_id: Uuid,
        actor_name: impl Into<String>,
        note: Option<String>,
        occurred_at: DateTime<Utc>,
    ) -> Self {
        Self {
            event_id: Uuid::new_v4(),
            case_id,
            stage_code: stage_code.into(),
            action,
            actor_id,
            actor_name: actor_name.into(),
            note,
            stagnation_reason: None,
            occurred_at,
            seq: 0,
        }
    }

    pub fn with_stagnation_reason(mut self, reason: impl Into<String>) -> Self {
        self.stagnation_reason = Some(reason.into());
        self
    }
}
