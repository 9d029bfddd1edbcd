//! Rule evaluators.
//!
//! Each evaluator is a read-only scan over case/referral state that
//! proposes task drafts; the engine owns dedup and task creation. Store
//! failures propagate to the engine, which records them on the rule's
//! execution instead of rethrowing.

use std::collections::HashMap;

use chrono::{DateTime, Duration, Utc};

use amparo_case::{assess_stage, CaseKind, CaseStore, StageCatalog};
use amparo_referral::{ReferralStatus, ReferralStore, ReferralTrack};
use amparo_types::{CoreResult, Priority};

use crate::rule::{AutomationRule, RuleKey};
use crate::task::TaskRef;

/// A task the evaluator wants created (pending the dedup check).
#[derive(Debug, Clone)]
pub(crate) struct TaskDraft {
    pub reference: TaskRef,
    pub title: String,
    pub description: String,
    pub priority: Priority,
    pub due_date: Option<DateTime<Utc>>,
}

/// Dispatch one rule key to its evaluator.
pub(crate) async fn evaluate(
    key: RuleKey,
    rule: &AutomationRule,
    cases: &dyn CaseStore,
    referrals: &dyn ReferralStore,
    catalogs: &HashMap<CaseKind, StageCatalog>,
    now: DateTime<Utc>,
) -> CoreResult<Vec<TaskDraft>> {
    match key {
        RuleKey::CaseWithoutMovement => case_without_movement(rule, cases, now).await,
        RuleKey::CaseStageOverdue => case_stage_overdue(rule, cases, catalogs, now).await,
        RuleKey::CaseValidationExpired => case_validation_expired(rule, cases, now).await,
        RuleKey::ReferralFeedbackOverdue => referral_feedback_overdue(rule, referrals, now).await,
    }
}

/// Open cases whose stage clock has not moved in the lookback window.
async fn case_without_movement(
    rule: &AutomationRule,
    cases: &dyn CaseStore,
    now: DateTime<Utc>,
) -> CoreResult<Vec<TaskDraft>> {
    let lookback = rule.params.lookback_days(30) as i64;
    let priority = rule.params.task_priority(Priority::Medium);
    let mut drafts = Vec::new();
    for case in cases.list_open(&rule.scope).await? {
        let Some(started) = case.stage_started_at else {
            continue;
        };
        let idle_days = (now - started).num_days();
        if idle_days >= lookback {
            drafts.push(TaskDraft {
                reference: TaskRef::case(case.case_id),
                title: format!("Case without movement for {} days", idle_days),
                description: format!(
                    "Case has been sitting in stage '{}' since {} with no transition",
                    case.current_stage,
                    started.format("%Y-%m-%d")
                ),
                priority,
                due_date: None,
            });
        }
    }
    Ok(drafts)
}

/// Open cases past their current stage deadline.
async fn case_stage_overdue(
    rule: &AutomationRule,
    cases: &dyn CaseStore,
    catalogs: &HashMap<CaseKind, StageCatalog>,
    now: DateTime<Utc>,
) -> CoreResult<Vec<TaskDraft>> {
    let due_in = rule.params.due_in_days(2) as i64;
    let priority = rule.params.task_priority(Priority::High);
    let mut drafts = Vec::new();
    for case in cases.list_open(&rule.scope).await? {
        let catalog = &catalogs[&case.kind()];
        let timing = assess_stage(case.stage_started_at, case.effective_sla_days(catalog), now);
        if timing.overdue {
            drafts.push(TaskDraft {
                reference: TaskRef::case(case.case_id),
                title: format!(
                    "Stage '{}' exceeded its {}-day deadline",
                    case.current_stage, timing.sla_days
                ),
                description: format!(
                    "Case is {} days into a {}-day stage; advance, validate or close it",
                    timing.days_in_stage, timing.sla_days
                ),
                priority,
                due_date: Some(now + Duration::days(due_in)),
            });
        }
    }
    Ok(drafts)
}

/// Cases whose validation gate expired without acknowledgement.
async fn case_validation_expired(
    rule: &AutomationRule,
    cases: &dyn CaseStore,
    now: DateTime<Utc>,
) -> CoreResult<Vec<TaskDraft>> {
    let priority = rule.params.task_priority(Priority::High);
    let mut drafts = Vec::new();
    for case in cases.list_open(&rule.scope).await? {
        if case.gate.expired(now) {
            drafts.push(TaskDraft {
                reference: TaskRef::case(case.case_id),
                title: format!(
                    "Stage transfer to '{}' unacknowledged past 48h",
                    case.current_stage
                ),
                description: "Receiving team has not validated the stage transfer".to_string(),
                priority,
                due_date: None,
            });
        }
    }
    Ok(drafts)
}

/// Cross-municipality referrals stuck before feedback past the lookback.
async fn referral_feedback_overdue(
    rule: &AutomationRule,
    referrals: &dyn ReferralStore,
    now: DateTime<Utc>,
) -> CoreResult<Vec<TaskDraft>> {
    let lookback = rule.params.lookback_days(15) as i64;
    let priority = rule.params.task_priority(Priority::High);
    let mut drafts = Vec::new();
    for referral in referrals.list_open(&rule.scope).await? {
        if referral.track != ReferralTrack::CrossMunicipality
            || referral.status == ReferralStatus::FeedbackSubmitted
        {
            continue;
        }
        let stuck_days = (now - referral.updated_at).num_days();
        if stuck_days >= lookback {
            drafts.push(TaskDraft {
                reference: TaskRef::referral(referral.referral_id),
                title: format!("Referral awaiting feedback for {} days", stuck_days),
                description: format!(
                    "Referral is still '{}' with no feedback from the destination; chase it",
                    referral.status
                ),
                priority,
                due_date: None,
            });
        }
    }
    Ok(drafts)
}
