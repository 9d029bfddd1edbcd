//! End-to-end engine runs against in-memory stores: seeding, dedup,
//! dry runs, frequency gating, and per-rule failure isolation.

use std::sync::Arc;

use async_trait::async_trait;
use chrono::{Duration, Utc};
use uuid::Uuid;

use amparo_automation::{
    default_rule_seeds, AutomationEngine, ExecutionStatus, InMemoryRuleStore, InMemoryTaskStore,
    RuleStore, TaskRefKind, TaskStatus, TaskStore,
};
use amparo_case::{
    CaseAction, CaseEvent, CaseRecord, CaseStore, CaseVariant, InMemoryCaseStore, StageCatalog,
};
use amparo_referral::{
    InMemoryReferralStore, NewReferral, Referral, ReferralEvent, ReferralStore, ReferralTrack,
};
use amparo_types::{CoreError, CoreResult, EventOrder, Priority, Scope};

struct Harness {
    rules: Arc<InMemoryRuleStore>,
    tasks: Arc<InMemoryTaskStore>,
    cases: Arc<InMemoryCaseStore>,
    referrals: Arc<InMemoryReferralStore>,
    engine: AutomationEngine,
    scope: Scope,
}

fn harness() -> Harness {
    let rules = Arc::new(InMemoryRuleStore::new());
    let tasks = Arc::new(InMemoryTaskStore::new());
    let cases = Arc::new(InMemoryCaseStore::new());
    let referrals = Arc::new(InMemoryReferralStore::new());
    let engine = AutomationEngine::new(
        rules.clone(),
        tasks.clone(),
        cases.clone(),
        referrals.clone(),
    );
    Harness {
        rules,
        tasks,
        cases,
        referrals,
        engine,
        scope: Scope::municipality(Uuid::new_v4()),
    }
}

/// A street-outreach case opened `days_ago` days ago, still in its first
/// stage (2-day deadline), inserted with its intake event.
async fn insert_stale_case(h: &Harness, days_ago: i64) -> CaseRecord {
    let opened = Utc::now() - Duration::days(days_ago);
    let catalog = StageCatalog::for_kind(amparo_case::CaseKind::StreetOutreach);
    let case = CaseRecord::open(
        h.scope,
        CaseVariant::StreetOutreach {
            person_id: Uuid::new_v4(),
        },
        Priority::Medium,
        catalog.first(),
        opened,
    );
    let event = CaseEvent::new(
        case.case_id,
        case.current_stage.clone(),
        CaseAction::Intake,
        Uuid::new_v4(),
        "Ana Souza",
        None,
        opened,
    );
    h.cases.insert(&case, event).await.unwrap();
    case
}

#[tokio::test]
async fn overdue_case_creates_one_task_then_dedups() {
    let h = harness();
    h.engine
        .seed_defaults(h.scope, &default_rule_seeds())
        .await
        .unwrap();
    let case = insert_stale_case(&h, 10).await;

    let outcomes = h
        .engine
        .run(h.scope, false, Some("case_stage_overdue"))
        .await
        .unwrap();
    assert_eq!(outcomes.len(), 1);
    assert_eq!(outcomes[0].summary.matched, 1);
    assert_eq!(outcomes[0].summary.created, 1);
    assert_eq!(outcomes[0].summary.skipped, 0);

    let tasks = h.tasks.list(&h.scope).await.unwrap();
    assert_eq!(tasks.len(), 1);
    assert_eq!(tasks[0].rule_key.as_deref(), Some("case_stage_overdue"));
    assert_eq!(tasks[0].reference.kind, TaskRefKind::Case);
    assert_eq!(tasks[0].reference.id, case.case_id);
    assert_eq!(tasks[0].priority, Priority::High);

    // Same condition, open task already there: skipped, nothing new.
    let outcomes = h
        .engine
        .run(h.scope, false, Some("case_stage_overdue"))
        .await
        .unwrap();
    assert_eq!(outcomes[0].summary.created, 0);
    assert_eq!(outcomes[0].summary.skipped, 1);
    assert_eq!(h.tasks.list(&h.scope).await.unwrap().len(), 1);

    // Once the task is done the condition fires again.
    h.tasks
        .set_status(tasks[0].task_id, TaskStatus::Done)
        .await
        .unwrap();
    let outcomes = h
        .engine
        .run(h.scope, false, Some("case_stage_overdue"))
        .await
        .unwrap();
    assert_eq!(outcomes[0].summary.created, 1);
    assert_eq!(h.tasks.list(&h.scope).await.unwrap().len(), 2);
}

#[tokio::test]
async fn dry_run_counts_without_writing() {
    let h = harness();
    h.engine
        .seed_defaults(h.scope, &default_rule_seeds())
        .await
        .unwrap();
    insert_stale_case(&h, 10).await;

    let outcomes = h
        .engine
        .run(h.scope, true, Some("case_stage_overdue"))
        .await
        .unwrap();
    assert_eq!(outcomes[0].summary.matched, 1);
    assert_eq!(outcomes[0].summary.created, 1);
    assert!(h.tasks.list(&h.scope).await.unwrap().is_empty());

    // Dry runs never advance the schedule clock.
    let rules = h.rules.list(&h.scope).await.unwrap();
    assert!(rules.iter().all(|rule| rule.last_execution.is_none()));
}

#[tokio::test]
async fn run_due_gates_on_frequency() {
    let h = harness();
    h.engine
        .seed_defaults(h.scope, &default_rule_seeds())
        .await
        .unwrap();

    let first = h.engine.run_due(h.scope, false).await.unwrap();
    assert_eq!(first.len(), 4);

    // Every rule just ran; none is due inside its frequency window.
    let second = h.engine.run_due(h.scope, false).await.unwrap();
    assert!(second.is_empty());

    for rule in h.rules.list(&h.scope).await.unwrap() {
        assert!(rule.last_execution.is_some());
        let executions = h.rules.executions(rule.rule_id).await.unwrap();
        assert_eq!(executions.len(), 1);
        assert_eq!(executions[0].status, ExecutionStatus::Ok);
    }
}

#[tokio::test]
async fn stale_referral_without_feedback_raises_a_task() {
    let h = harness();
    h.engine
        .seed_defaults(h.scope, &default_rule_seeds())
        .await
        .unwrap();

    let opened = Utc::now() - Duration::days(20);
    let destination = Scope::municipality(Uuid::new_v4());
    let referral = Referral::open(
        &NewReferral {
            track: ReferralTrack::CrossMunicipality,
            origin: h.scope,
            destination,
            subject: amparo_types::SubjectRef::Person(Uuid::new_v4()),
            motive: "specialized treatment".to_string(),
            consent: Some(true),
        },
        opened,
    );
    let event = ReferralEvent::new(
        referral.referral_id,
        referral.status.into(),
        None,
        "Ana Souza",
        opened,
    );
    h.referrals.insert(&referral, event, None).await.unwrap();

    let outcomes = h
        .engine
        .run(h.scope, false, Some("referral_feedback_overdue"))
        .await
        .unwrap();
    assert_eq!(outcomes.len(), 1);
    assert_eq!(outcomes[0].summary.created, 1);

    let tasks = h.tasks.list(&h.scope).await.unwrap();
    assert_eq!(tasks.len(), 1);
    assert_eq!(tasks[0].reference.kind, TaskRefKind::Referral);
    assert_eq!(tasks[0].reference.id, referral.referral_id);
}

/// Case store whose reads always fail, standing in for a backend outage.
struct FailingCaseStore;

#[async_trait]
impl CaseStore for FailingCaseStore {
    async fn insert(&self, _case: &CaseRecord, _event: CaseEvent) -> CoreResult<()> {
        Err(CoreError::Internal(anyhow::anyhow!("case table offline")))
    }

    async fn load(&self, _case_id: Uuid) -> CoreResult<CaseRecord> {
        Err(CoreError::Internal(anyhow::anyhow!("case table offline")))
    }

    async fn commit(&self, _case: &CaseRecord, _event: CaseEvent) -> CoreResult<()> {
        Err(CoreError::Internal(anyhow::anyhow!("case table offline")))
    }

    async fn events(&self, _case_id: Uuid, _order: EventOrder) -> CoreResult<Vec<CaseEvent>> {
        Err(CoreError::Internal(anyhow::anyhow!("case table offline")))
    }

    async fn list_open(&self, _scope: &Scope) -> CoreResult<Vec<CaseRecord>> {
        Err(CoreError::Internal(anyhow::anyhow!("case table offline")))
    }
}

#[tokio::test]
async fn one_failing_backend_does_not_stop_the_sweep() {
    let rules = Arc::new(InMemoryRuleStore::new());
    let tasks = Arc::new(InMemoryTaskStore::new());
    let referrals = Arc::new(InMemoryReferralStore::new());
    let engine = AutomationEngine::new(
        rules.clone(),
        tasks.clone(),
        Arc::new(FailingCaseStore),
        referrals.clone(),
    );
    let scope = Scope::municipality(Uuid::new_v4());
    engine
        .seed_defaults(scope, &default_rule_seeds())
        .await
        .unwrap();

    let outcomes = engine.run_due(scope, false).await.unwrap();
    assert_eq!(outcomes.len(), 4);

    let failed: Vec<_> = outcomes.iter().filter(|o| !o.is_ok()).collect();
    assert_eq!(failed.len(), 3);
    assert!(failed.iter().all(|o| o.key.starts_with("case_")));
    assert!(failed
        .iter()
        .all(|o| o.error.as_deref().unwrap().contains("case table offline")));

    let ok: Vec<_> = outcomes.iter().filter(|o| o.is_ok()).collect();
    assert_eq!(ok.len(), 1);
    assert_eq!(ok[0].key, "referral_feedback_overdue");

    // Failures are logged as error executions and keep the rule due.
    for rule in rules.list(&scope).await.unwrap() {
        let executions = rules.executions(rule.rule_id).await.unwrap();
        assert_eq!(executions.len(), 1);
        if rule.key == "referral_feedback_overdue" {
            assert_eq!(executions[0].status, ExecutionStatus::Ok);
            assert!(rule.last_execution.is_some());
        } else {
            assert_eq!(executions[0].status, ExecutionStatus::Error);
            assert!(executions[0].error.is_some());
            assert!(rule.last_execution.is_none());
        }
    }

    let retried = engine.run_due(scope, false).await.unwrap();
    assert_eq!(retried.len(), 3);
    assert!(retried.iter().all(|o| o.key.starts_with("case_")));
}
