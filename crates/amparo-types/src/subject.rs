//! Subject references — the person or family a case or referral is about.
//!
//! Record CRUD for people and families lives outside the core; the core
//! only carries a typed reference and checks existence through
//! [`crate::SubjectDirectory`].

use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Reference to the subject of a case or referral.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case", tag = "kind", content = "id")]
pub enum SubjectRef {
    Person(Uuid),
    Family(Uuid),
}

impl SubjectRef {
    pub fn id(&self) -> Uuid {
        match self {
            Self::Person(id) | Self::Family(id) => *id,
        }
    }

    pub fn kind(&self) -> &'static str {
        match self {
            Self::Person(_) => "person",
            Self::Family(_) => "family",
        }
    }
}

impl std::fmt::Display for SubjectRef {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}:{}", self.kind(), self.id())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn subject_ref_serde_tagging() {
        let subject = SubjectRef::Family(Uuid::nil());
        let json = serde_json::to_value(&subject).unwrap();
        assert_eq!(json["kind"], "family");
        let back: SubjectRef = serde_json::from_value(json).unwrap();
        assert_eq!(back, subject);
    }

    #[test]
    fn subject_ref_display() {
        let id = Uuid::new_v4();
        assert_eq!(
            SubjectRef::Person(id).to_string(),
            format!("person:{}", id)
        );
    }
}
