//! Stage/SLA engine for social-assistance cases.
//!
//! A case progresses through named stages, each with a deadline in days.
//! Advancing a stage opens a validation gate the receiving party must
//! acknowledge within 48 hours; every transition is appended to an
//! append-only history ledger and can be replayed from it. The clock
//! classifies each case as at-risk/overdue and the escalation color folds
//! clock + gate + manual stagnation marking into one red/orange/green
//! signal for downstream reporting.
//!
//! Persistence is behind [`store::CaseStore`]; [`store::InMemoryCaseStore`]
//! backs tests and embedded deployments.

pub mod catalog;
pub mod clock;
pub mod gate;
pub mod history;
pub mod record;
pub mod service;
pub mod store;

pub use catalog::{StageCatalog, StageDef};
pub use clock::{assess_stage, StageTiming};
pub use gate::{escalation_color, EscalationColor, ValidationGate, VALIDATION_WINDOW_HOURS};
pub use history::{CaseAction, CaseEvent};
pub use record::{CaseKind, CaseRecord, CaseStatus, CaseVariant, RiskLevel};
pub use service::{CaseAssessment, CaseEdit, CaseService, NewCase};
pub use store::{CaseStore, InMemoryCaseStore};
