//! Destination inbox for cross-municipality referrals.
//!
//! One row per (referral, destination scope). Drives "needs attention"
//! views on the receiving side; mutated on every status change and
//! follow-up chase.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use amparo_types::Scope;

use crate::status::ReferralStatus;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ReferralInboxEntry {
    pub referral_id: Uuid,
    pub destination: Scope,
    pub last_status: ReferralStatus,
    /// Cleared when the destination acknowledges its own item.
    pub unread: bool,
    pub last_event_at: DateTime<Utc>,
}

impl ReferralInboxEntry {
    pub fn new(
        referral_id: Uuid,
        destination: Scope,
        status: ReferralStatus,
        now: DateTime<Utc>,
    ) -> Self {
        Self {
            referral_id,
            destination,
            last_status: status,
            unread: true,
            last_event_at: now,
        }
    }
}
