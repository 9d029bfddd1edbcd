//! Automation rule engine.
//!
//! A registry of named rules, each with a frequency and an evaluator that
//! scans case/referral state for deadline violations and materializes
//! tasks for humans, deduplicated against existing open tasks. Rules run
//! sequentially under an external trigger (`run_due`); a single rule's
//! failure is recorded in its execution row and never aborts its siblings.

pub mod engine;
mod evaluators;
pub mod execution;
pub mod rule;
pub mod store;
pub mod task;

pub use engine::{AutomationEngine, RuleOutcome};
pub use execution::{ExecutionStatus, RuleExecution, RunSummary};
pub use rule::{default_rule_seeds, AutomationRule, RuleKey, RuleParams, RuleSeed};
pub use store::{InMemoryRuleStore, InMemoryTaskStore, RuleStore, TaskStore};
pub use task::{Task, TaskRef, TaskRefKind, TaskStatus};
