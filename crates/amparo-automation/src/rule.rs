//! Automation rules, their closed key set, and the typed parameter bag.
//!
//! Rule keys are stored as strings (rules outlive deployments; an unknown
//! key degrades to a soft "not implemented" outcome at dispatch) but are
//! validated against the closed set wherever the core writes them.

use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use amparo_types::{CoreError, CoreResult, Priority, Scope};

/// The closed set of implemented rule evaluators.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RuleKey {
    /// Open case with no stage movement in `lookback_days`.
    CaseWithoutMovement,
    /// Open case past its current stage deadline.
    CaseStageOverdue,
    /// Open case whose validation gate expired unacknowledged.
    CaseValidationExpired,
    /// Cross-municipality referral stuck pre-feedback past `lookback_days`.
    ReferralFeedbackOverdue,
}

impl RuleKey {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::CaseWithoutMovement => "case_without_movement",
            Self::CaseStageOverdue => "case_stage_overdue",
            Self::CaseValidationExpired => "case_validation_expired",
            Self::ReferralFeedbackOverdue => "referral_feedback_overdue",
        }
    }

    /// Parameter keys this rule recognizes.
    pub fn recognized_params(&self) -> &'static [&'static str] {
        match self {
            Self::CaseWithoutMovement => &["lookback_days", "task_priority"],
            Self::CaseStageOverdue => &["due_in_days", "task_priority"],
            Self::CaseValidationExpired => &["task_priority"],
            Self::ReferralFeedbackOverdue => &["lookback_days", "task_priority"],
        }
    }
}

impl std::str::FromStr for RuleKey {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "case_without_movement" => Ok(Self::CaseWithoutMovement),
            "case_stage_overdue" => Ok(Self::CaseStageOverdue),
            "case_validation_expired" => Ok(Self::CaseValidationExpired),
            "referral_feedback_overdue" => Ok(Self::ReferralFeedbackOverdue),
            _ => Err(format!("Unknown rule key: {}", s)),
        }
    }
}

impl std::fmt::Display for RuleKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Free-form per-rule parameters with a documented, closed key set,
/// validated at the seed/update boundary rather than trusted blindly.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct RuleParams(BTreeMap<String, serde_json::Value>);

impl RuleParams {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set(mut self, key: impl Into<String>, value: serde_json::Value) -> Self {
        self.0.insert(key.into(), value);
        self
    }

    /// Reject unrecognized keys and ill-typed values for `key`'s rule.
    pub fn validate_for(&self, key: RuleKey) -> CoreResult<()> {
        let recognized = key.recognized_params();
        for (name, value) in &self.0 {
            if !recognized.contains(&name.as_str()) {
                return Err(CoreError::Validation(format!(
                    "rule '{}' does not recognize parameter '{}'",
                    key, name
                )));
            }
            match name.as_str() {
                "lookback_days" | "due_in_days" => {
                    if !value.as_u64().is_some_and(|d| d >= 1) {
                        return Err(CoreError::Validation(format!(
                            "parameter '{}' must be a positive integer",
                            name
                        )));
                    }
                }
                "task_priority" => {
                    let ok = value
                        .as_str()
                        .is_some_and(|s| s.parse::<Priority>().is_ok());
                    if !ok {
                        return Err(CoreError::Validation(
                            "parameter 'task_priority' must be one of low/medium/high/urgent"
                                .into(),
                        ));
                    }
                }
                _ => {}
            }
        }
        Ok(())
    }

    pub fn lookback_days(&self, default: u32) -> u32 {
        self.int("lookback_days", default)
    }

    pub fn due_in_days(&self, default: u32) -> u32 {
        self.int("due_in_days", default)
    }

    pub fn task_priority(&self, default: Priority) -> Priority {
        self.0
            .get("task_priority")
            .and_then(|v| v.as_str())
            .and_then(|s| s.parse().ok())
            .unwrap_or(default)
    }

    fn int(&self, key: &str, default: u32) -> u32 {
        self.0
            .get(key)
            .and_then(|v| v.as_u64())
            .map(|d| d as u32)
            .unwrap_or(default)
    }
}

/// A registered rule for one scope.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AutomationRule {
    pub rule_id: Uuid,
    pub scope: Scope,
    /// Stored as text; parsed against [`RuleKey`] at dispatch.
    pub key: String,
    pub title: String,
    pub description: String,
    pub active: bool,
    pub frequency_minutes: u32,
    /// Updated only after a successful (non-dry) execution.
    pub last_execution: Option<DateTime<Utc>>,
    pub params: RuleParams,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl AutomationRule {
    /// Active and never run, or last run older than the frequency.
    pub fn is_due(&self, now: DateTime<Utc>) -> bool {
        self.active
            && match self.last_execution {
                None => true,
                Some(last) => now - last >= chrono::Duration::minutes(self.frequency_minutes as i64),
            }
    }
}

/// One row of the immutable seed table.
#[derive(Debug, Clone)]
pub struct RuleSeed {
    pub key: RuleKey,
    pub title: &'static str,
    pub description: &'static str,
    pub frequency_minutes: u32,
    pub params: RuleParams,
}

impl RuleSeed {
    /// Materialize the seed for a scope.
    pub fn build(&self, scope: Scope, now: DateTime<Utc>) -> AutomationRule {
        AutomationRule {
            rule_id: Uuid::new_v4(),
            scope,
            key: self.key.as_str().to_string(),
            title: self.title.to_string(),
            description: self.description.to_string(),
            active: true,
            frequency_minutes: self.frequency_minutes,
            last_execution: None,
            params: self.params.clone(),
            created_at: now,
            updated_at: now,
        }
    }
}

/// The default rule catalog. An explicit immutable table — callers pass it
/// into `seed_defaults`, nothing mutates it at module level.
pub fn default_rule_seeds() -> Vec<RuleSeed> {
    vec![
        RuleSeed {
            key: RuleKey::CaseWithoutMovement,
            title: "Cases without movement",
            description: "Flags open cases with no stage movement in the lookback window",
            frequency_minutes: 24 * 60,
            params: RuleParams::new().set("lookback_days", 30.into()),
        },
        RuleSeed {
            key: RuleKey::CaseStageOverdue,
            title: "Stage deadline exceeded",
            description: "Flags open cases past their current stage deadline",
            frequency_minutes: 12 * 60,
            params: RuleParams::new().set("due_in_days", 2.into()),
        },
        RuleSeed {
            key: RuleKey::CaseValidationExpired,
            title: "Unacknowledged stage transfers",
            description: "Flags cases whose 48h validation window expired without acknowledgement",
            frequency_minutes: 6 * 60,
            params: RuleParams::new(),
        },
        RuleSeed {
            key: RuleKey::ReferralFeedbackOverdue,
            title: "Referrals awaiting feedback",
            description: "Flags cross-municipality referrals stuck before feedback past the lookback window",
            frequency_minutes: 24 * 60,
            params: RuleParams::new().set("lookback_days", 15.into()),
        },
    ]
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn key_roundtrip() {
        for key in [
            RuleKey::CaseWithoutMovement,
            RuleKey::CaseStageOverdue,
            RuleKey::CaseValidationExpired,
            RuleKey::ReferralFeedbackOverdue,
        ] {
            assert_eq!(key.as_str().parse::<RuleKey>(), Ok(key));
        }
        assert!("case_reopened".parse::<RuleKey>().is_err());
    }

    #[test]
    fn params_reject_unknown_keys() {
        let params = RuleParams::new().set("grace_days", json!(5));
        let err = params.validate_for(RuleKey::CaseWithoutMovement).unwrap_err();
        assert!(err.to_string().contains("does not recognize parameter"));
    }

    #[test]
    fn params_reject_bad_types() {
        let params = RuleParams::new().set("lookback_days", json!("soon"));
        assert!(params.validate_for(RuleKey::CaseWithoutMovement).is_err());

        let params = RuleParams::new().set("lookback_days", json!(0));
        assert!(params.validate_for(RuleKey::CaseWithoutMovement).is_err());

        let params = RuleParams::new().set("task_priority", json!("critical"));
        assert!(params.validate_for(RuleKey::CaseValidationExpired).is_err());
    }

    #[test]
    fn params_accessors_fall_back_to_defaults() {
        let params = RuleParams::new()
            .set("lookback_days", json!(7))
            .set("task_priority", json!("urgent"));
        assert_eq!(params.lookback_days(30), 7);
        assert_eq!(params.due_in_days(2), 2);
        assert_eq!(params.task_priority(Priority::Medium), Priority::Urgent);
    }

    #[test]
    fn seed_table_is_valid_and_covers_every_key() {
        let seeds = default_rule_seeds();
        assert_eq!(seeds.len(), 4);
        for seed in &seeds {
            seed.params.validate_for(seed.key).unwrap();
            assert!(seed.frequency_minutes > 0);
        }
    }

    #[test]
    fn due_when_never_run_or_stale() {
        let now = Utc::now();
        let mut rule = default_rule_seeds()[0].build(Scope::municipality(Uuid::new_v4()), now);
        assert!(rule.is_due(now));

        rule.last_execution = Some(now - chrono::Duration::minutes(10));
        assert!(!rule.is_due(now));

        rule.last_execution = Some(now - chrono::Duration::minutes(24 * 60));
        assert!(rule.is_due(now));

        rule.active = false;
        assert!(!rule.is_due(now));
    }
}
