//! Stage catalog — the ordered registry of stages for one case kind.
//!
//! Catalogs are data, not code paths: built-in defaults per case kind plus
//! YAML loading for municipality-customized catalogs.

use serde::{Deserialize, Serialize};

use amparo_types::{CoreError, CoreResult};

use crate::record::CaseKind;

/// One named stage with its human label and default deadline.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StageDef {
    pub code: String,
    pub label: String,
    /// Default SLA in days for this stage. Always >= 1.
    pub sla_days: u32,
}

/// Ordered list of stages for one case kind.
///
/// The first entry is the intake stage. Order matters for display and for
/// picking the initial stage; advancement itself is free-form across
/// catalog members (workers may send a case back).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StageCatalog {
    stages: Vec<StageDef>,
}

impl StageCatalog {
    /// Build a catalog from explicit stages, validating the invariants the
    /// rest of the engine relies on: non-empty, unique codes, SLA >= 1.
    pub fn new(stages: Vec<StageDef>) -> CoreResult<Self> {
        if stages.is_empty() {
            return Err(CoreError::Validation(
                "stage catalog must contain at least one stage".into(),
            ));
        }
        for (i, stage) in stages.iter().enumerate() {
            if stage.code.trim().is_empty() {
                return Err(CoreError::Validation(format!(
                    "stage at position {} has an empty code",
                    i
                )));
            }
            if stage.sla_days == 0 {
                return Err(CoreError::Validation(format!(
                    "stage '{}' has a zero-day deadline; minimum is 1",
                    stage.code
                )));
            }
            if stages[..i].iter().any(|s| s.code == stage.code) {
                return Err(CoreError::Validation(format!(
                    "duplicate stage code '{}' in catalog",
                    stage.code
                )));
            }
        }
        Ok(Self { stages })
    }

    /// Parse a catalog from its YAML definition.
    pub fn from_yaml_str(yaml: &str) -> CoreResult<Self> {
        #[derive(Deserialize)]
        struct CatalogDef {
            stages: Vec<StageDef>,
        }
        let def: CatalogDef = serde_yaml::from_str(yaml)
            .map_err(|e| CoreError::Validation(format!("invalid catalog definition: {}", e)))?;
        Self::new(def.stages)
    }

    /// Load a catalog definition from a YAML file.
    pub fn from_yaml_file(path: impl AsRef<std::path::Path>) -> CoreResult<Self> {
        let yaml = std::fs::read_to_string(path.as_ref()).map_err(|e| {
            CoreError::Validation(format!(
                "cannot read catalog file {}: {}",
                path.as_ref().display(),
                e
            ))
        })?;
        Self::from_yaml_str(&yaml)
    }

    /// Built-in default catalog for a case kind.
    pub fn for_kind(kind: CaseKind) -> Self {
        let stages = match kind {
            CaseKind::StreetOutreach => vec![
                stage("approach", "Approach and first contact", 2),
                stage("bonding", "Bond building", 15),
                stage("referral", "Referral to services", 10),
                stage("monitoring", "Ongoing monitoring", 30),
                stage("exit_plan", "Exit plan", 15),
            ],
            CaseKind::FamilyCenter => vec![
                stage("reception", "Reception and registration", 2),
                stage("diagnosis", "Social diagnosis", 10),
                stage("family_plan", "Family assistance plan", 15),
                stage("follow_up", "Plan follow-up", 60),
                stage("review", "Periodic review", 15),
            ],
            CaseKind::ProtectionCenter => vec![
                stage("reception", "Reception", 1),
                stage("risk_assessment", "Risk assessment", 7),
                stage("protection_plan", "Protection plan", 15),
                stage("intervention", "Intervention and follow-up", 45),
                stage("case_review", "Case review", 15),
            ],
        };
        // Built-in tables satisfy the invariants by construction.
        Self { stages }
    }

    /// The intake stage.
    pub fn first(&self) -> &StageDef {
        &self.stages[0]
    }

    pub fn get(&self, code: &str) -> Option<&StageDef> {
        self.stages.iter().find(|s| s.code == code)
    }

    pub fn contains(&self, code: &str) -> bool {
        self.get(code).is_some()
    }

    pub fn stages(&self) -> &[StageDef] {
        &self.stages
    }
}

fn stage(code: &str, label: &str, sla_days: u32) -> StageDef {
    StageDef {
        code: code.to_string(),
        label: label.to_string(),
        sla_days,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn builtin_catalogs_are_well_formed() {
        for kind in [
            CaseKind::StreetOutreach,
            CaseKind::FamilyCenter,
            CaseKind::ProtectionCenter,
        ] {
            let catalog = StageCatalog::for_kind(kind);
            assert!(StageCatalog::new(catalog.stages().to_vec()).is_ok());
            assert!(catalog.first().sla_days >= 1);
        }
    }

    #[test]
    fn lookup_by_code() {
        let catalog = StageCatalog::for_kind(CaseKind::ProtectionCenter);
        assert_eq!(catalog.get("risk_assessment").unwrap().sla_days, 7);
        assert!(!catalog.contains("triage"));
    }

    #[test]
    fn yaml_catalog_parses() {
        let catalog = StageCatalog::from_yaml_str(
            r#"
stages:
  - code: approach
    label: Approach
    sla_days: 2
  - code: monitoring
    label: Monitoring
    sla_days: 30
"#,
        )
        .unwrap();
        assert_eq!(catalog.first().code, "approach");
        assert_eq!(catalog.get("monitoring").unwrap().sla_days, 30);
    }

    #[test]
    fn yaml_catalog_from_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("catalog.yaml");
        std::fs::write(
            &path,
            "stages:\n  - code: reception\n    label: Reception\n    sla_days: 1\n",
        )
        .unwrap();
        let catalog = StageCatalog::from_yaml_file(&path).unwrap();
        assert_eq!(catalog.first().code, "reception");

        let err = StageCatalog::from_yaml_file(dir.path().join("missing.yaml")).unwrap_err();
        assert!(err.to_string().contains("cannot read catalog file"));
    }

    #[test]
    fn rejects_duplicate_codes() {
        let err = StageCatalog::new(vec![
            stage("approach", "A", 2),
            stage("approach", "B", 3),
        ])
        .unwrap_err();
        assert!(err.to_string().contains("duplicate stage code"));
    }

    #[test]
    fn rejects_zero_sla() {
        let err = StageCatalog::new(vec![stage("approach", "A", 0)]).unwrap_err();
        assert!(err.to_string().contains("zero-day deadline"));
    }

    #[test]
    fn rejects_empty_catalog() {
        assert!(StageCatalog::new(vec![]).is_err());
    }
}
