//! Referral event ledger types. Append-only.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::status::ReferralStatus;

/// What a ledger entry records: a status change, a follow-up chase
/// ("cobrança"), or a logistics update.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case", tag = "kind", content = "status")]
pub enum ReferralEventKind {
    Status(ReferralStatus),
    FollowUp,
    Logistics,
}

impl ReferralEventKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Status(s) => s.as_str(),
            Self::FollowUp => "follow_up",
            Self::Logistics => "logistics",
        }
    }
}

impl From<ReferralStatus> for ReferralEventKind {
    fn from(status: ReferralStatus) -> Self {
        Self::Status(status)
    }
}

/// One entry in a referral's audit trail.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ReferralEvent {
    pub event_id: Uuid,
    pub referral_id: Uuid,
    pub kind: ReferralEventKind,
    pub detail: Option<String>,
    pub actor_name: String,
    pub occurred_at: DateTime<Utc>,
    /// Insertion sequence assigned by the store.
    pub seq: u64,
}

impl ReferralEvent {
    pub fn new(
        referral_id: Uuid,
        kind: ReferralEventKind,
        detail: Option<String>,
        actor_name: impl Into<String>,
        occurred_at: DateTime<Utc>,
    ) -> Self {
        Self {
            event_id: Uuid::new_v4(),
            referral_id,
            kind,
            detail,
            actor_name: actor_name.into(),
            occurred_at,
            seq: 0,
        }
    }
}
