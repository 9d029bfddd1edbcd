//! Shared domain types for the amparo case-management core.
//!
//! This crate is the single source of truth for the types that cross crate
//! boundaries: the scope (municipality + optional unit) used for data
//! isolation, subject references, actor identity, the collaborator traits
//! the core consumes (identity and subject lookups), and the error taxonomy
//! every operation reports through.

pub mod directory;
pub mod error;
pub mod scope;
pub mod subject;

pub use directory::{Actor, IdentityDirectory, StaticDirectory, StaticSubjects, SubjectDirectory};
pub use error::{CoreError, CoreResult};
pub use scope::Scope;
pub use subject::SubjectRef;

use serde::{Deserialize, Serialize};

/// Read order for append-only event ledgers.
///
/// Chronological replay or "latest first" UI listings — both are valid,
/// neither ever re-orders by content.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EventOrder {
    Chronological,
    LatestFirst,
}

/// Priority shared by cases and generated tasks.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Priority {
    Low,
    Medium,
    High,
    Urgent,
}

impl Priority {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Low => "low",
            Self::Medium => "medium",
            Self::High => "high",
            Self::Urgent => "urgent",
        }
    }
}

impl std::str::FromStr for Priority {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "low" => Ok(Self::Low),
            "medium" => Ok(Self::Medium),
            "high" => Ok(Self::High),
            "urgent" => Ok(Self::Urgent),
            _ => Err(format!("Unknown priority: {}", s)),
        }
    }
}

impl std::fmt::Display for Priority {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}
