//! Scope — the municipality (and optional sub-unit) boundary used for data
//! isolation and access control.

use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Data-isolation boundary for every entity in the core.
///
/// `unit` narrows the scope to one service point (a family-assistance
/// center, a specialized-protection center, an outreach team) inside the
/// municipality. A scope without a unit covers the whole municipality.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Scope {
    pub municipality: Uuid,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub unit: Option<Uuid>,
}

impl Scope {
    /// Municipality-wide scope.
    pub fn municipality(municipality: Uuid) -> Self {
        Self {
            municipality,
            unit: None,
        }
    }

    /// Scope narrowed to one service point.
    pub fn unit(municipality: Uuid, unit: Uuid) -> Self {
        Self {
            municipality,
            unit: Some(unit),
        }
    }

    /// Whether `other` falls inside this scope.
    ///
    /// A municipality-wide scope contains every unit scope of the same
    /// municipality; a unit scope contains only itself.
    pub fn contains(&self, other: &Scope) -> bool {
        self.municipality == other.municipality
            && match self.unit {
                None => true,
                Some(unit) => other.unit == Some(unit),
            }
    }
}

impl std::fmt::Display for Scope {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self.unit {
            Some(unit) => write!(f, "{}/{}", self.municipality, unit),
            None => write!(f, "{}", self.municipality),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn municipality_scope_contains_its_units() {
        let muni = Uuid::new_v4();
        let wide = Scope::municipality(muni);
        let narrow = Scope::unit(muni, Uuid::new_v4());

        assert!(wide.contains(&narrow));
        assert!(wide.contains(&wide));
        assert!(!narrow.contains(&wide));
        assert!(narrow.contains(&narrow));
    }

    #[test]
    fn different_municipalities_never_overlap() {
        let a = Scope::municipality(Uuid::new_v4());
        let b = Scope::municipality(Uuid::new_v4());
        assert!(!a.contains(&b));
    }

    #[test]
    fn unit_scopes_are_disjoint() {
        let muni = Uuid::new_v4();
        let a = Scope::unit(muni, Uuid::new_v4());
        let b = Scope::unit(muni, Uuid::new_v4());
        assert!(!a.contains(&b));
    }
}
