//! Referral status ladders.
//!
//! Each track is a strict order; non-privileged actors may only take the
//! single next step. The terminal fork (`concluded` / `cancelled`) hangs
//! off the last ladder entry of either track.

use serde::{Deserialize, Serialize};

/// Which ladder the referral walks.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ReferralTrack {
    /// Between teams/service points of one municipality.
    Internal,
    /// Between two municipalities.
    CrossMunicipality,
}

impl ReferralTrack {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Internal => "internal",
            Self::CrossMunicipality => "cross_municipality",
        }
    }

    pub fn initial(&self) -> ReferralStatus {
        self.ladder()[0]
    }

    /// The ordered non-terminal statuses of this track.
    pub fn ladder(&self) -> &'static [ReferralStatus] {
        match self {
            Self::Internal => &[
                ReferralStatus::Sent,
                ReferralStatus::Received,
                ReferralStatus::Scheduled,
                ReferralStatus::Attended,
                ReferralStatus::FedBack,
            ],
            Self::CrossMunicipality => &[
                ReferralStatus::Requested,
                ReferralStatus::Contacted,
                ReferralStatus::Accepted,
                ReferralStatus::Scheduled,
                ReferralStatus::InTransit,
                ReferralStatus::FeedbackSubmitted,
            ],
        }
    }

    /// Whether `status` is a member of this track (ladder or terminal).
    pub fn admits(&self, status: ReferralStatus) -> bool {
        status.is_terminal() || self.ladder().contains(&status)
    }

    /// The statuses a non-privileged actor may move to from `current`.
    ///
    /// Empty for terminal statuses. The last ladder entry forks to
    /// `concluded` or `cancelled`.
    pub fn allowed_next(&self, current: ReferralStatus) -> &'static [ReferralStatus] {
        const TERMINAL_FORK: &[ReferralStatus] =
            &[ReferralStatus::Concluded, ReferralStatus::Cancelled];
        if current.is_terminal() {
            return &[];
        }
        let ladder = self.ladder();
        match ladder.iter().position(|s| *s == current) {
            Some(i) if i + 1 < ladder.len() => &ladder[i + 1..i + 2],
            Some(_) => TERMINAL_FORK,
            None => &[],
        }
    }
}

impl std::fmt::Display for ReferralTrack {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Union of both tracks' statuses. `Scheduled` and the terminal pair are
/// shared; the rest belong to one track each.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ReferralStatus {
    // Internal track.
    Sent,
    Received,
    Attended,
    FedBack,
    // Cross-municipality track.
    Requested,
    Contacted,
    Accepted,
    InTransit,
    FeedbackSubmitted,
    // Shared.
    Scheduled,
    Concluded,
    Cancelled,
}

impl ReferralStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Sent => "sent",
            Self::Received => "received",
            Self::Attended => "attended",
            Self::FedBack => "fed_back",
            Self::Requested => "requested",
            Self::Contacted => "contacted",
            Self::Accepted => "accepted",
            Self::InTransit => "in_transit",
            Self::FeedbackSubmitted => "feedback_submitted",
            Self::Scheduled => "scheduled",
            Self::Concluded => "concluded",
            Self::Cancelled => "cancelled",
        }
    }

    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Concluded | Self::Cancelled)
    }
}

impl std::str::FromStr for ReferralStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "sent" => Ok(Self::Sent),
            "received" => Ok(Self::Received),
            "attended" => Ok(Self::Attended),
            "fed_back" => Ok(Self::FedBack),
            "requested" => Ok(Self::Requested),
            "contacted" => Ok(Self::Contacted),
            "accepted" => Ok(Self::Accepted),
            "in_transit" => Ok(Self::InTransit),
            "feedback_submitted" => Ok(Self::FeedbackSubmitted),
            "scheduled" => Ok(Self::Scheduled),
            "concluded" => Ok(Self::Concluded),
            "cancelled" => Ok(Self::Cancelled),
            _ => Err(format!("Unknown referral status: {}", s)),
        }
    }
}

impl std::fmt::Display for ReferralStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}
