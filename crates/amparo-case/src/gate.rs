//! Validation gate and escalation color.
//!
//! Every stage advance requires acknowledgement by the receiving party.
//! The gate re-opens on every advance regardless of prior state and expires
//! 48 hours after opening. The escalation color is the derived union of
//! clock + gate + manual stagnation, consumed by reporting.

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};

use crate::clock::StageTiming;

/// Acknowledgement window after a stage advance.
pub const VALIDATION_WINDOW_HOURS: i64 = 48;

/// Pending-acknowledgement state of a case.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ValidationGate {
    pub pending: bool,
    pub pending_since: Option<DateTime<Utc>>,
}

impl ValidationGate {
    /// Closed gate — intake state, or after a validate/close.
    pub fn closed() -> Self {
        Self::default()
    }

    /// Re-open the gate. Called on every stage advance; prior state is
    /// irrelevant.
    pub fn open(&mut self, now: DateTime<Utc>) {
        self.pending = true;
        self.pending_since = Some(now);
    }

    pub fn clear(&mut self) {
        self.pending = false;
        self.pending_since = None;
    }

    /// Pending and past the acknowledgement window.
    pub fn expired(&self, now: DateTime<Utc>) -> bool {
        match (self.pending, self.pending_since) {
            (true, Some(since)) => now - since > Duration::hours(VALIDATION_WINDOW_HOURS),
            _ => false,
        }
    }
}

/// Derived escalation signal for "who needs attention" views.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EscalationColor {
    Red,
    Orange,
    Green,
}

impl EscalationColor {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Red => "red",
            Self::Orange => "orange",
            Self::Green => "green",
        }
    }
}

/// Red if stagnant, overdue, or validation expired; orange if at-risk or
/// pending acknowledgement; green otherwise.
pub fn escalation_color(
    stagnant: bool,
    timing: &StageTiming,
    gate: &ValidationGate,
    now: DateTime<Utc>,
) -> EscalationColor {
    if stagnant || timing.overdue || gate.expired(now) {
        EscalationColor::Red
    } else if timing.at_risk || gate.pending {
        EscalationColor::Orange
    } else {
        EscalationColor::Green
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::clock::assess_stage;

    fn quiet_timing() -> StageTiming {
        StageTiming {
            days_in_stage: 0,
            sla_days: 7,
            at_risk: false,
            overdue: false,
        }
    }

    #[test]
    fn gate_expires_after_48h() {
        let now = Utc::now();
        let mut gate = ValidationGate::closed();
        gate.open(now - Duration::hours(49));
        assert!(gate.expired(now));

        gate.open(now - Duration::hours(48));
        assert!(!gate.expired(now), "exactly 48h is still inside the window");
    }

    #[test]
    fn cleared_gate_never_expires() {
        let now = Utc::now();
        let mut gate = ValidationGate::closed();
        gate.open(now - Duration::hours(100));
        gate.clear();
        assert!(!gate.expired(now));
        assert_eq!(gate.pending_since, None);
    }

    #[test]
    fn color_green_when_quiet() {
        let now = Utc::now();
        let color = escalation_color(false, &quiet_timing(), &ValidationGate::closed(), now);
        assert_eq!(color, EscalationColor::Green);
    }

    #[test]
    fn color_orange_when_pending_or_at_risk() {
        let now = Utc::now();
        let mut gate = ValidationGate::closed();
        gate.open(now);
        assert_eq!(
            escalation_color(false, &quiet_timing(), &gate, now),
            EscalationColor::Orange
        );

        let at_risk = assess_stage(Some(now - Duration::days(6)), 7, now);
        assert_eq!(
            escalation_color(false, &at_risk, &ValidationGate::closed(), now),
            EscalationColor::Orange
        );
    }

    #[test]
    fn color_red_beats_orange() {
        let now = Utc::now();
        // Overdue and pending: red wins.
        let overdue = assess_stage(Some(now - Duration::days(10)), 7, now);
        let mut gate = ValidationGate::closed();
        gate.open(now);
        assert_eq!(
            escalation_color(false, &overdue, &gate, now),
            EscalationColor::Red
        );
        // Stagnant alone is red, independent of the clock.
        assert_eq!(
            escalation_color(true, &quiet_timing(), &ValidationGate::closed(), now),
            EscalationColor::Red
        );
    }
}
