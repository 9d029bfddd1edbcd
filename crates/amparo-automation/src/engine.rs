//! Automation engine.
//!
//! Seeds the rule table, runs rules on demand or by schedule, and turns
//! evaluator drafts into tasks. Every rule run is isolated: a failure in
//! one rule is captured on its execution row and the scan moves on.

use std::collections::HashMap;
use std::sync::Arc;

use chrono::Utc;
use tracing::{info, warn};
use uuid::Uuid;

use amparo_case::{CaseKind, CaseStore, StageCatalog};
use amparo_referral::ReferralStore;
use amparo_types::{CoreError, CoreResult, Scope};

use crate::evaluators;
use crate::execution::{ExecutionStatus, RuleExecution, RunSummary};
use crate::rule::{AutomationRule, RuleKey, RuleSeed};
use crate::store::{RuleStore, TaskStore};
use crate::task::{Task, TaskStatus};

/// Result of running a single rule.
#[derive(Debug, Clone)]
pub struct RuleOutcome {
    pub rule_id: Uuid,
    pub key: String,
    pub summary: RunSummary,
    /// Evaluator or store failure, captured instead of propagated.
    pub error: Option<String>,
    /// The stored key does not map to a known evaluator.
    pub not_implemented: bool,
}

impl RuleOutcome {
    fn empty(rule: &AutomationRule) -> Self {
        Self {
            rule_id: rule.rule_id,
            key: rule.key.clone(),
            summary: RunSummary::default(),
            error: None,
            not_implemented: false,
        }
    }

    pub fn is_ok(&self) -> bool {
        self.error.is_none()
    }
}

/// Runs automation rules against case and referral state.
pub struct AutomationEngine {
    rules: Arc<dyn RuleStore>,
    tasks: Arc<dyn TaskStore>,
    cases: Arc<dyn CaseStore>,
    referrals: Arc<dyn ReferralStore>,
    catalogs: HashMap<CaseKind, StageCatalog>,
}

impl AutomationEngine {
    pub fn new(
        rules: Arc<dyn RuleStore>,
        tasks: Arc<dyn TaskStore>,
        cases: Arc<dyn CaseStore>,
        referrals: Arc<dyn ReferralStore>,
    ) -> Self {
        let catalogs = [
            CaseKind::StreetOutreach,
            CaseKind::FamilyCenter,
            CaseKind::ProtectionCenter,
        ]
        .into_iter()
        .map(|k| (k, StageCatalog::for_kind(k)))
        .collect();
        Self {
            rules,
            tasks,
            cases,
            referrals,
            catalogs,
        }
    }

    /// Replace the stage catalog used when timing cases of `kind`.
    pub fn with_catalog(mut self, kind: CaseKind, catalog: StageCatalog) -> Self {
        self.catalogs.insert(kind, catalog);
        self
    }

    /// Install the given seeds for a scope. Re-seeding an existing
    /// (scope, key) pair leaves the stored rule untouched.
    pub async fn seed_defaults(
        &self,
        scope: Scope,
        seeds: &[RuleSeed],
    ) -> CoreResult<Vec<AutomationRule>> {
        let now = Utc::now();
        let mut installed = Vec::with_capacity(seeds.len());
        for seed in seeds {
            seed.params.validate_for(seed.key)?;
            let rule = self.rules.upsert_seed(seed.build(scope, now)).await?;
            installed.push(rule);
        }
        info!(%scope, count = installed.len(), "automation rules seeded");
        Ok(installed)
    }

    /// Run every active rule in a scope, optionally filtered by key.
    /// Rule failures land in the returned outcomes, not in the Result.
    pub async fn run(
        &self,
        scope: Scope,
        dry_run: bool,
        key_filter: Option<&str>,
    ) -> CoreResult<Vec<RuleOutcome>> {
        let rules = self.rules.list(&scope).await?;
        let mut outcomes = Vec::new();
        for rule in rules {
            if !rule.active {
                continue;
            }
            if key_filter.is_some_and(|key| key != rule.key) {
                continue;
            }
            outcomes.push(self.execute(&rule, dry_run).await?);
        }
        Ok(outcomes)
    }

    /// Scheduler entry point: run the rules whose frequency window has
    /// elapsed. Skipped rules produce no outcome.
    pub async fn run_due(&self, scope: Scope, dry_run: bool) -> CoreResult<Vec<RuleOutcome>> {
        let now = Utc::now();
        let rules = self.rules.list(&scope).await?;
        let mut outcomes = Vec::new();
        for rule in rules {
            if !rule.is_due(now) {
                continue;
            }
            outcomes.push(self.execute(&rule, dry_run).await?);
        }
        info!(%scope, ran = outcomes.len(), dry_run, "scheduled automation sweep finished");
        Ok(outcomes)
    }

    /// Run one rule and record its execution. Only the bookkeeping
    /// writes can fail here; the rule body's own errors are captured.
    async fn execute(&self, rule: &AutomationRule, dry_run: bool) -> CoreResult<RuleOutcome> {
        let started_at = Utc::now();
        let outcome = self.run_rule(rule, dry_run).await;
        let finished_at = Utc::now();

        if let Some(error) = &outcome.error {
            warn!(rule_id = %rule.rule_id, key = %rule.key, error = %error, "automation rule failed");
        }

        let status = if outcome.is_ok() {
            ExecutionStatus::Ok
        } else {
            ExecutionStatus::Error
        };
        self.rules
            .record_execution(RuleExecution {
                execution_id: Uuid::new_v4(),
                rule_id: rule.rule_id,
                scope: rule.scope,
                started_at,
                finished_at,
                status,
                error: outcome.error.clone(),
                summary: outcome.summary,
            })
            .await?;
        if outcome.is_ok() && !dry_run {
            self.rules
                .touch_last_execution(rule.rule_id, finished_at)
                .await?;
        }
        Ok(outcome)
    }

    /// Evaluate one rule and create tasks for drafts with no open
    /// duplicate. On a dry run nothing is written; `created` counts what
    /// a real run would have created.
    pub async fn run_rule(&self, rule: &AutomationRule, dry_run: bool) -> RuleOutcome {
        let mut outcome = RuleOutcome::empty(rule);
        let key: RuleKey = match rule.key.parse() {
            Ok(key) => key,
            Err(_) => {
                outcome.not_implemented = true;
                warn!(rule_id = %rule.rule_id, key = %rule.key, "no evaluator for rule key");
                return outcome;
            }
        };

        let drafts = match evaluators::evaluate(
            key,
            rule,
            self.cases.as_ref(),
            self.referrals.as_ref(),
            &self.catalogs,
            Utc::now(),
        )
        .await
        {
            Ok(drafts) => drafts,
            Err(err) => {
                outcome.error = Some(err.to_string());
                return outcome;
            }
        };
        outcome.summary.matched = drafts.len() as u32;

        for draft in drafts {
            match self.open_task(rule, draft, dry_run).await {
                Ok(true) => outcome.summary.created += 1,
                Ok(false) => outcome.summary.skipped += 1,
                Err(err) => {
                    outcome.error = Some(err.to_string());
                    break;
                }
            }
        }
        outcome
    }

    /// Dedup check plus insert. Returns true when the draft counts as
    /// created, false when an open duplicate already exists.
    async fn open_task(
        &self,
        rule: &AutomationRule,
        draft: evaluators::TaskDraft,
        dry_run: bool,
    ) -> Result<bool, CoreError> {
        let existing = self
            .tasks
            .find_open(&rule.key, &draft.reference, &rule.scope)
            .await?;
        if existing.is_some() {
            return Ok(false);
        }
        if !dry_run {
            let now = Utc::now();
            let task = Task {
                task_id: Uuid::new_v4(),
                scope: rule.scope,
                reference: draft.reference,
                rule_key: Some(rule.key.clone()),
                title: draft.title,
                description: draft.description,
                priority: draft.priority,
                status: TaskStatus::Open,
                due_date: draft.due_date,
                assigned_to: None,
                created_at: now,
                updated_at: now,
            };
            info!(rule_id = %rule.rule_id, task_id = %task.task_id, reference = %task.reference.id, "automation task created");
            self.tasks.insert(task).await?;
        }
        Ok(true)
    }
}
