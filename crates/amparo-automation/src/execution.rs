//! Per-rule execution bookkeeping.
//!
//! One row per rule per run. Evaluator failures land here as data — they
//! are never surfaced as faults to the caller of `run_due`.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use amparo_types::Scope;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ExecutionStatus {
    Ok,
    Error,
}

/// Structured outcome counts for one rule run.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RunSummary {
    /// Records matching the rule condition.
    pub matched: u32,
    /// Tasks created (0 on dry runs).
    pub created: u32,
    /// Matches skipped because an open task already exists.
    pub skipped: u32,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RuleExecution {
    pub execution_id: Uuid,
    pub rule_id: Uuid,
    pub scope: Scope,
    pub started_at: DateTime<Utc>,
    pub finished_at: DateTime<Utc>,
    pub status: ExecutionStatus,
    /// Non-empty exactly when status is `Error`.
    pub error: Option<String>,
    pub summary: RunSummary,
}
