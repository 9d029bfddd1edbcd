//! Case operations — the state machine over [`CaseRecord`].
//!
//! Every operation validates first, then commits exactly one case mutation
//! plus one history event through the store. A failed validation leaves the
//! case untouched and appends nothing.

use std::collections::HashMap;
use std::sync::Arc;

use chrono::Utc;
use tracing::{info, warn};
use uuid::Uuid;

use amparo_types::{
    Actor, CoreError, CoreResult, EventOrder, IdentityDirectory, Priority, Scope,
    SubjectDirectory,
};

use crate::catalog::StageCatalog;
use crate::clock::{assess_stage, StageTiming};
use crate::gate::{escalation_color, EscalationColor};
use crate::history::{CaseAction, CaseEvent};
use crate::record::{CaseKind, CaseRecord, CaseStatus, CaseVariant};
use crate::store::CaseStore;

/// Intake request.
#[derive(Debug, Clone)]
pub struct NewCase {
    pub scope: Scope,
    pub variant: CaseVariant,
    pub priority: Priority,
}

/// Limited metadata edit — never stage, never status.
#[derive(Debug, Clone, Default)]
pub struct CaseEdit {
    pub assigned_to: Option<Uuid>,
    pub priority: Option<Priority>,
    pub notes: Option<String>,
}

impl CaseEdit {
    fn is_empty(&self) -> bool {
        self.assigned_to.is_none() && self.priority.is_none() && self.notes.is_none()
    }

    fn describe(&self) -> String {
        let mut fields = Vec::new();
        if self.assigned_to.is_some() {
            fields.push("assignee");
        }
        if self.priority.is_some() {
            fields.push("priority");
        }
        if self.notes.is_some() {
            fields.push("notes");
        }
        format!("updated: {}", fields.join(", "))
    }
}

/// Read model combining the record with its derived timing and color.
#[derive(Debug, Clone)]
pub struct CaseAssessment {
    pub case: CaseRecord,
    pub timing: StageTiming,
    pub validation_expired: bool,
    pub color: EscalationColor,
}

/// The case state machine service.
pub struct CaseService {
    store: Arc<dyn CaseStore>,
    subjects: Arc<dyn SubjectDirectory>,
    identity: Arc<dyn IdentityDirectory>,
    catalogs: HashMap<CaseKind, StageCatalog>,
}

impl CaseService {
    /// Service with the built-in default catalogs.
    pub fn new(
        store: Arc<dyn CaseStore>,
        subjects: Arc<dyn SubjectDirectory>,
        identity: Arc<dyn IdentityDirectory>,
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
            store,
            subjects,
            identity,
            catalogs,
        }
    }

    /// Replace the catalog for one case kind (municipality customization).
    pub fn with_catalog(mut self, kind: CaseKind, catalog: StageCatalog) -> Self {
        self.catalogs.insert(kind, catalog);
        self
    }

    pub fn catalog(&self, kind: CaseKind) -> &StageCatalog {
        // Populated for every kind in `new`.
        &self.catalogs[&kind]
    }

    async fn actor(&self, actor_id: Uuid) -> CoreResult<Actor> {
        self.identity
            .resolve(actor_id)
            .await
            .ok_or_else(|| CoreError::not_found("actor", actor_id))
    }

    /// Open a case at the first catalog stage.
    pub async fn intake(&self, req: NewCase, actor_id: Uuid) -> CoreResult<CaseRecord> {
        let actor = self.actor(actor_id).await?;
        let subject = req.variant.subject();
        if !self.subjects.exists(&subject, &req.scope).await {
            return Err(CoreError::Scope(format!(
                "subject {} is not registered in scope {}",
                subject, req.scope
            )));
        }

        let catalog = self.catalog(req.variant.kind());
        let now = Utc::now();
        let case = CaseRecord::open(req.scope, req.variant, req.priority, catalog.first(), now);
        let event = CaseEvent::new(
            case.case_id,
            case.current_stage.clone(),
            CaseAction::Intake,
            actor.id,
            actor.display_name,
            None,
            now,
        );
        self.store.insert(&case, event).await?;

        info!(
            case_id = %case.case_id,
            kind = %case.kind(),
            stage = %case.current_stage,
            "case opened"
        );
        Ok(case)
    }

    /// Move the case to another catalog stage: resets the stage clock,
    /// clears stagnation, re-opens the validation gate.
    pub async fn advance(
        &self,
        case_id: Uuid,
        target_stage: &str,
        note: Option<String>,
        sla_override: Option<u32>,
        actor_id: Uuid,
    ) -> CoreResult<CaseRecord> {
        let actor = self.actor(actor_id).await?;
        let mut case = self.store.load(case_id).await?;
        self.ensure_open(&case)?;

        let catalog = self.catalog(case.kind());
        let target = catalog.get(target_stage).ok_or_else(|| {
            CoreError::Validation(format!(
                "target stage '{}' not in catalog for {} cases",
                target_stage,
                case.kind()
            ))
        })?;
        if sla_override == Some(0) {
            return Err(CoreError::Validation(
                "stage deadline must be at least 1 day".into(),
            ));
        }

        let now = Utc::now();
        case.current_stage = target.code.clone();
        case.stage_started_at = Some(now);
        case.stage_sla_days = sla_override;
        case.stagnant = false;
        case.stagnation_reason = None;
        case.gate.open(now);
        case.updated_at = now;

        let event = CaseEvent::new(
            case_id,
            case.current_stage.clone(),
            CaseAction::Advance,
            actor.id,
            actor.display_name,
            note,
            now,
        );
        self.store.commit(&case, event).await?;

        info!(case_id = %case_id, stage = %case.current_stage, "case advanced");
        Ok(case)
    }

    /// Receiving party acknowledges the last advance.
    pub async fn validate_receipt(
        &self,
        case_id: Uuid,
        note: Option<String>,
        actor_id: Uuid,
    ) -> CoreResult<CaseRecord> {
        let actor = self.actor(actor_id).await?;
        let mut case = self.store.load(case_id).await?;
        self.ensure_open(&case)?;

        let now = Utc::now();
        case.gate.clear();
        case.updated_at = now;

        let event = CaseEvent::new(
            case_id,
            case.current_stage.clone(),
            CaseAction::Validate,
            actor.id,
            actor.display_name,
            note,
            now,
        );
        self.store.commit(&case, event).await?;
        Ok(case)
    }

    /// Manually flag the case as stalled. Stage and deadline untouched.
    pub async fn mark_stagnant(
        &self,
        case_id: Uuid,
        reason: &str,
        actor_id: Uuid,
    ) -> CoreResult<CaseRecord> {
        let actor = self.actor(actor_id).await?;
        if reason.trim().is_empty() {
            return Err(CoreError::Validation(
                "stagnation reason must not be empty".into(),
            ));
        }
        let mut case = self.store.load(case_id).await?;
        self.ensure_open(&case)?;

        let now = Utc::now();
        case.stagnant = true;
        case.stagnation_reason = Some(reason.to_string());
        case.updated_at = now;

        let event = CaseEvent::new(
            case_id,
            case.current_stage.clone(),
            CaseAction::Stagnate,
            actor.id,
            actor.display_name,
            None,
            now,
        )
        .with_stagnation_reason(reason);
        self.store.commit(&case, event).await?;

        warn!(case_id = %case_id, reason, "case marked stagnant");
        Ok(case)
    }

    /// Close the case. Terminal — no further transitions.
    pub async fn close(
        &self,
        case_id: Uuid,
        reason: &str,
        actor_id: Uuid,
    ) -> CoreResult<CaseRecord> {
        let actor = self.actor(actor_id).await?;
        let mut case = self.store.load(case_id).await?;
        if case.is_closed() {
            return Err(CoreError::State(format!("case {} already closed", case_id)));
        }

        let now = Utc::now();
        case.status = CaseStatus::Closed;
        case.closed_at = Some(now);
        case.close_reason = Some(reason.to_string());
        case.gate.clear();
        case.updated_at = now;

        let event = CaseEvent::new(
            case_id,
            case.current_stage.clone(),
            CaseAction::Close,
            actor.id,
            actor.display_name,
            Some(reason.to_string()),
            now,
        );
        self.store.commit(&case, event).await?;

        info!(case_id = %case_id, reason, "case closed");
        Ok(case)
    }

    /// Edit metadata fields. Never mutates stage or status.
    pub async fn edit(
        &self,
        case_id: Uuid,
        edit: CaseEdit,
        actor_id: Uuid,
    ) -> CoreResult<CaseRecord> {
        let actor = self.actor(actor_id).await?;
        if edit.is_empty() {
            return Err(CoreError::Validation(
                "edit must change at least one field".into(),
            ));
        }
        let mut case = self.store.load(case_id).await?;
        self.ensure_open(&case)?;

        let note = edit.describe();
        if let Some(assignee) = edit.assigned_to {
            case.assigned_to = Some(assignee);
        }
        if let Some(priority) = edit.priority {
            case.priority = priority;
        }
        if let Some(notes) = edit.notes {
            case.notes = Some(notes);
        }
        let now = Utc::now();
        case.updated_at = now;

        let event = CaseEvent::new(
            case_id,
            case.current_stage.clone(),
            CaseAction::Edit,
            actor.id,
            actor.display_name,
            Some(note),
            now,
        );
        self.store.commit(&case, event).await?;
        Ok(case)
    }

    /// Ordered history. `NotFound` when the case does not exist.
    pub async fn history(&self, case_id: Uuid, order: EventOrder) -> CoreResult<Vec<CaseEvent>> {
        self.store.load(case_id).await?;
        self.store.events(case_id, order).await
    }

    /// Derived stage timing, gate expiry and escalation color.
    pub async fn assess(&self, case_id: Uuid) -> CoreResult<CaseAssessment> {
        let case = self.store.load(case_id).await?;
        let now = Utc::now();
        let sla_days = case.effective_sla_days(self.catalog(case.kind()));
        let timing = assess_stage(case.stage_started_at, sla_days, now);
        let validation_expired = case.gate.expired(now);
        let color = escalation_color(case.stagnant, &timing, &case.gate, now);
        Ok(CaseAssessment {
            timing,
            validation_expired,
            color,
            case,
        })
    }

    fn ensure_open(&self, case: &CaseRecord) -> CoreResult<()> {
        if case.is_closed() {
            return Err(CoreError::State(format!(
                "case {} is closed; no further transitions",
                case.case_id
            )));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::InMemoryCaseStore;
    use amparo_types::{StaticDirectory, StaticSubjects, SubjectRef};
    use chrono::Duration;

    struct Fixture {
        service: CaseService,
        store: Arc<InMemoryCaseStore>,
        actor: Uuid,
        scope: Scope,
        person: Uuid,
    }

    fn fixture() -> Fixture {
        let muni = Uuid::new_v4();
        let scope = Scope::municipality(muni);
        let actor = Uuid::new_v4();
        let person = Uuid::new_v4();
        let store = Arc::new(InMemoryCaseStore::new());
        let subjects =
            Arc::new(StaticSubjects::new().with_subject(SubjectRef::Person(person), muni));
        let identity = Arc::new(StaticDirectory::new().with_actor(actor, "Ana Lima"));
        let service = CaseService::new(store.clone(), subjects, identity);
        Fixture {
            service,
            store,
            actor,
            scope,
            person,
        }
    }

    async fn open_case(f: &Fixture) -> CaseRecord {
        f.service
            .intake(
                NewCase {
                    scope: f.scope,
                    variant: CaseVariant::StreetOutreach { person_id: f.person },
                    priority: Priority::Medium,
                },
                f.actor,
            )
            .await
            .unwrap()
    }

    #[tokio::test]
    async fn intake_rejects_unknown_subject() {
        let f = fixture();
        let err = f
            .service
            .intake(
                NewCase {
                    scope: f.scope,
                    variant: CaseVariant::StreetOutreach {
                        person_id: Uuid::new_v4(),
                    },
                    priority: Priority::Low,
                },
                f.actor,
            )
            .await
            .unwrap_err();
        assert!(matches!(err, CoreError::Scope(_)));
    }

    #[tokio::test]
    async fn advance_opens_gate_and_clears_stagnation() {
        let f = fixture();
        let case = open_case(&f).await;
        f.service
            .mark_stagnant(case.case_id, "family not located", f.actor)
            .await
            .unwrap();

        let case = f
            .service
            .advance(case.case_id, "bonding", None, None, f.actor)
            .await
            .unwrap();
        assert_eq!(case.current_stage, "bonding");
        assert!(case.gate.pending);
        assert!(case.gate.pending_since.is_some());
        assert!(!case.stagnant);
        assert_eq!(case.stagnation_reason, None);
    }

    #[tokio::test]
    async fn advance_to_unknown_stage_appends_nothing() {
        let f = fixture();
        let case = open_case(&f).await;
        let err = f
            .service
            .advance(case.case_id, "triage", None, None, f.actor)
            .await
            .unwrap_err();
        assert!(matches!(err, CoreError::Validation(_)));
        assert!(err.to_string().contains("target stage 'triage'"));

        let history = f
            .service
            .history(case.case_id, EventOrder::Chronological)
            .await
            .unwrap();
        assert_eq!(history.len(), 1); // intake only
        let unchanged = f.store.load(case.case_id).await.unwrap();
        assert_eq!(unchanged.current_stage, "approach");
    }

    #[tokio::test]
    async fn advance_rejects_zero_day_override() {
        let f = fixture();
        let case = open_case(&f).await;
        let err = f
            .service
            .advance(case.case_id, "bonding", None, Some(0), f.actor)
            .await
            .unwrap_err();
        assert!(matches!(err, CoreError::Validation(_)));
    }

    #[tokio::test]
    async fn validate_receipt_clears_gate() {
        let f = fixture();
        let case = open_case(&f).await;
        f.service
            .advance(case.case_id, "bonding", None, None, f.actor)
            .await
            .unwrap();
        let case = f
            .service
            .validate_receipt(case.case_id, Some("received by CRAS team".into()), f.actor)
            .await
            .unwrap();
        assert!(!case.gate.pending);
        assert_eq!(case.gate.pending_since, None);

        let history = f
            .service
            .history(case.case_id, EventOrder::LatestFirst)
            .await
            .unwrap();
        assert_eq!(history[0].action, CaseAction::Validate);
    }

    #[tokio::test]
    async fn stagnation_requires_reason() {
        let f = fixture();
        let case = open_case(&f).await;
        let err = f
            .service
            .mark_stagnant(case.case_id, "  ", f.actor)
            .await
            .unwrap_err();
        assert!(matches!(err, CoreError::Validation(_)));
    }

    #[tokio::test]
    async fn close_is_terminal_and_not_idempotent_in_history() {
        let f = fixture();
        let case = open_case(&f).await;
        let closed = f
            .service
            .close(case.case_id, "family relocated", f.actor)
            .await
            .unwrap();
        assert!(closed.is_closed());
        assert!(!closed.gate.pending);
        assert!(closed.closed_at.is_some());

        let err = f
            .service
            .close(case.case_id, "again", f.actor)
            .await
            .unwrap_err();
        assert!(matches!(err, CoreError::State(_)));

        let closes = f
            .service
            .history(case.case_id, EventOrder::Chronological)
            .await
            .unwrap()
            .into_iter()
            .filter(|e| e.action == CaseAction::Close)
            .count();
        assert_eq!(closes, 1);

        let err = f
            .service
            .advance(case.case_id, "bonding", None, None, f.actor)
            .await
            .unwrap_err();
        assert!(matches!(err, CoreError::State(_)));
    }

    #[tokio::test]
    async fn edit_touches_metadata_only() {
        let f = fixture();
        let case = open_case(&f).await;
        let worker = Uuid::new_v4();
        let edited = f
            .service
            .edit(
                case.case_id,
                CaseEdit {
                    assigned_to: Some(worker),
                    priority: Some(Priority::High),
                    notes: None,
                },
                f.actor,
            )
            .await
            .unwrap();
        assert_eq!(edited.assigned_to, Some(worker));
        assert_eq!(edited.priority, Priority::High);
        assert_eq!(edited.current_stage, case.current_stage);
        assert_eq!(edited.status, case.status);

        let history = f
            .service
            .history(case.case_id, EventOrder::LatestFirst)
            .await
            .unwrap();
        assert_eq!(history[0].action, CaseAction::Edit);
        assert_eq!(history[0].note.as_deref(), Some("updated: assignee, priority"));
    }

    #[tokio::test]
    async fn assess_flags_overdue_case_red() {
        let f = fixture();
        let case = open_case(&f).await;
        // Backdate the stage start well past the 2-day approach SLA.
        let mut backdated = f.store.load(case.case_id).await.unwrap();
        backdated.stage_started_at = Some(Utc::now() - Duration::days(10));
        backdated.stage_sla_days = Some(7);
        f.store
            .commit(
                &backdated,
                CaseEvent::new(
                    case.case_id,
                    backdated.current_stage.clone(),
                    CaseAction::Edit,
                    f.actor,
                    "Ana Lima",
                    Some("backdated for assessment".into()),
                    Utc::now(),
                ),
            )
            .await
            .unwrap();

        let assessment = f.service.assess(case.case_id).await.unwrap();
        assert_eq!(assessment.timing.days_in_stage, 10);
        assert!(assessment.timing.overdue);
        assert!(assessment.timing.at_risk);
        assert_eq!(assessment.color, EscalationColor::Red);
    }

    #[tokio::test]
    async fn history_for_unknown_case_is_not_found() {
        let f = fixture();
        let err = f
            .service
            .history(Uuid::new_v4(), EventOrder::Chronological)
            .await
            .unwrap_err();
        assert!(matches!(err, CoreError::NotFound(_)));
    }
}
