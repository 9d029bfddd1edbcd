//! Referral entity, milestone timestamps and transport logistics.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use amparo_types::{Scope, SubjectRef};

use crate::status::{ReferralStatus, ReferralTrack};

/// Creation request.
#[derive(Debug, Clone)]
pub struct NewReferral {
    pub track: ReferralTrack,
    pub origin: Scope,
    pub destination: Scope,
    pub subject: SubjectRef,
    pub motive: String,
    /// Required for the cross-municipality track, ignored for internal.
    pub consent: Option<bool>,
}

/// Transport logistics for cross-municipality referrals, recordable
/// independently of status.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Logistics {
    pub ticket_number: Option<String>,
    pub carrier: Option<String>,
    pub food_kit: bool,
    pub hygiene_kit: bool,
}

impl Logistics {
    pub fn summary(&self) -> String {
        let mut parts = Vec::new();
        if let Some(ticket) = &self.ticket_number {
            parts.push(format!("ticket {}", ticket));
        }
        if let Some(carrier) = &self.carrier {
            parts.push(format!("carrier {}", carrier));
        }
        if self.food_kit {
            parts.push("food kit".to_string());
        }
        if self.hygiene_kit {
            parts.push("hygiene kit".to_string());
        }
        parts.join(", ")
    }
}

/// Timestamps stamped on entry into the matching status. Statuses jumped
/// over by a privileged override stay unset.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Milestones {
    pub received_at: Option<DateTime<Utc>>,
    pub contacted_at: Option<DateTime<Utc>>,
    pub accepted_at: Option<DateTime<Utc>>,
    pub scheduled_at: Option<DateTime<Utc>>,
    pub attended_at: Option<DateTime<Utc>>,
    pub in_transit_at: Option<DateTime<Utc>>,
    pub feedback_at: Option<DateTime<Utc>>,
    pub concluded_at: Option<DateTime<Utc>>,
    pub cancelled_at: Option<DateTime<Utc>>,
}

impl Milestones {
    /// Record entry into `status`. First entry wins; re-entering a state a
    /// privileged actor rolled back from does not rewrite history.
    pub fn stamp(&mut self, status: ReferralStatus, now: DateTime<Utc>) {
        let slot = match status {
            ReferralStatus::Received => &mut self.received_at,
            ReferralStatus::Contacted => &mut self.contacted_at,
            ReferralStatus::Accepted => &mut self.accepted_at,
            ReferralStatus::Scheduled => &mut self.scheduled_at,
            ReferralStatus::Attended => &mut self.attended_at,
            ReferralStatus::InTransit => &mut self.in_transit_at,
            ReferralStatus::FedBack | ReferralStatus::FeedbackSubmitted => &mut self.feedback_at,
            ReferralStatus::Concluded => &mut self.concluded_at,
            ReferralStatus::Cancelled => &mut self.cancelled_at,
            // Initial statuses are covered by created_at.
            ReferralStatus::Sent | ReferralStatus::Requested => return,
        };
        slot.get_or_insert(now);
    }
}

/// A structured handoff between two service points.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Referral {
    pub referral_id: Uuid,
    pub track: ReferralTrack,
    pub origin: Scope,
    pub destination: Scope,
    pub subject: SubjectRef,
    pub motive: String,
    /// Only meaningful for cross-municipality referrals.
    pub consent: Option<bool>,
    pub status: ReferralStatus,
    pub milestones: Milestones,
    /// Cross-municipality only.
    pub logistics: Option<Logistics>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Referral {
    pub fn open(req: &NewReferral, now: DateTime<Utc>) -> Self {
        Self {
            referral_id: Uuid::new_v4(),
            track: req.track,
            origin: req.origin,
            destination: req.destination,
            subject: req.subject,
            motive: req.motive.clone(),
            consent: match req.track {
                ReferralTrack::CrossMunicipality => req.consent,
                ReferralTrack::Internal => None,
            },
            status: req.track.initial(),
            milestones: Milestones::default(),
            logistics: match req.track {
                ReferralTrack::CrossMunicipality => Some(Logistics::default()),
                ReferralTrack::Internal => None,
            },
            created_at: now,
            updated_at: now,
        }
    }

    pub fn is_terminal(&self) -> bool {
        self.status.is_terminal()
    }
}
