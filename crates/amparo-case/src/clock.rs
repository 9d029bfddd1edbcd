//! Stage clock — elapsed-time and risk/overdue classification.
//!
//! Pure functions of (stage start, SLA, now); no side effects, no storage.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Snapshot of where a case sits against its current stage deadline.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct StageTiming {
    /// Whole days elapsed in the current stage, floor, never negative.
    pub days_in_stage: u32,
    pub sla_days: u32,
    /// days_in_stage >= max(1, floor(0.8 * sla_days)).
    pub at_risk: bool,
    /// days_in_stage > sla_days. Landing exactly on the deadline is not
    /// overdue.
    pub overdue: bool,
}

/// Classify a stage against its deadline.
///
/// A missing stage-start timestamp counts as day zero — a case that never
/// recorded entry into its stage cannot be overdue.
pub fn assess_stage(
    stage_started_at: Option<DateTime<Utc>>,
    sla_days: u32,
    now: DateTime<Utc>,
) -> StageTiming {
    let days_in_stage = match stage_started_at {
        Some(start) => (now - start).num_days().max(0) as u32,
        None => 0,
    };
    let risk_threshold = std::cmp::max(1, sla_days * 4 / 5);
    StageTiming {
        days_in_stage,
        sla_days,
        at_risk: days_in_stage >= risk_threshold,
        overdue: days_in_stage > sla_days,
    }
}
