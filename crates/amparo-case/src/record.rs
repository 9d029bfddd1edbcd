//! The case record — one shape, three owning modules.
//!
//! Street-population outreach, family-assistance centers and specialized-
//! protection centers share the stage/SLA/validation mechanics; the variant
//! enum carries what differs (subject reference type, protection-center
//! risk level) so the state machine is written once.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use amparo_types::{Priority, Scope, SubjectRef};

use crate::catalog::{StageCatalog, StageDef};
use crate::gate::ValidationGate;

/// Which module owns the case.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CaseKind {
    StreetOutreach,
    FamilyCenter,
    ProtectionCenter,
}

impl CaseKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::StreetOutreach => "street_outreach",
            Self::FamilyCenter => "family_center",
            Self::ProtectionCenter => "protection_center",
        }
    }
}

impl std::fmt::Display for CaseKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CaseStatus {
    InProgress,
    Closed,
}

/// Risk classification, protection-center cases only.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RiskLevel {
    Low,
    Medium,
    High,
    Extreme,
}

/// Variant payload: subject reference plus variant-only fields.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case", tag = "kind")]
pub enum CaseVariant {
    StreetOutreach {
        person_id: Uuid,
    },
    FamilyCenter {
        family_id: Uuid,
    },
    ProtectionCenter {
        person_id: Uuid,
        risk_level: RiskLevel,
    },
}

impl CaseVariant {
    pub fn kind(&self) -> CaseKind {
        match self {
            Self::StreetOutreach { .. } => CaseKind::StreetOutreach,
            Self::FamilyCenter { .. } => CaseKind::FamilyCenter,
            Self::ProtectionCenter { .. } => CaseKind::ProtectionCenter,
        }
    }

    pub fn subject(&self) -> SubjectRef {
        match self {
            Self::StreetOutreach { person_id } => SubjectRef::Person(*person_id),
            Self::FamilyCenter { family_id } => SubjectRef::Family(*family_id),
            Self::ProtectionCenter { person_id, .. } => SubjectRef::Person(*person_id),
        }
    }

    pub fn risk_level(&self) -> Option<RiskLevel> {
        match self {
            Self::ProtectionCenter { risk_level, .. } => Some(*risk_level),
            _ => None,
        }
    }
}

/// A case and its stage/SLA state. Never physically deleted — closure is a
/// status flag.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CaseRecord {
    pub case_id: Uuid,
    pub scope: Scope,
    pub variant: CaseVariant,
    pub status: CaseStatus,
    /// Exactly one active stage at a time.
    pub current_stage: String,
    pub priority: Priority,
    pub assigned_to: Option<Uuid>,
    pub opened_at: DateTime<Utc>,
    pub closed_at: Option<DateTime<Utc>>,
    pub close_reason: Option<String>,
    pub stage_started_at: Option<DateTime<Utc>>,
    /// Per-case override; `None` falls back to the catalog default.
    pub stage_sla_days: Option<u32>,
    pub stagnant: bool,
    pub stagnation_reason: Option<String>,
    pub gate: ValidationGate,
    pub notes: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl CaseRecord {
    /// Create a case at the catalog's intake stage: gate closed, not
    /// stagnant, catalog-default deadline.
    pub fn open(
        scope: Scope,
        variant: CaseVariant,
        priority: Priority,
        first_stage: &StageDef,
        now: DateTime<Utc>,
    ) -> Self {
        Self {
            case_id: Uuid::new_v4(),
            scope,
            variant,
            status: CaseStatus::InProgress,
            current_stage: first_stage.code.clone(),
            priority,
            assigned_to: None,
            opened_at: now,
            closed_at: None,
            close_reason: None,
            stage_started_at: Some(now),
            stage_sla_days: None,
            stagnant: false,
            stagnation_reason: None,
            gate: ValidationGate::closed(),
            notes: None,
            created_at: now,
            updated_at: now,
        }
    }

    pub fn kind(&self) -> CaseKind {
        self.variant.kind()
    }

    pub fn is_closed(&self) -> bool {
        self.status == CaseStatus::Closed
    }

    /// Effective deadline for the current stage: per-case override, else
    /// catalog default. Falls back to 30 days when the stored stage code
    /// is no longer in the catalog (catalog edits after the fact).
    pub fn effective_sla_days(&self, catalog: &StageCatalog) -> u32 {
        self.stage_sla_days
            .or_else(|| catalog.get(&self.current_stage).map(|s| s.sla_days))
            .unwrap_or(30)
    }
}
