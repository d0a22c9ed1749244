use crate::error::Result;
use crate::library::{Library, Mitigation, Risk};
use crate::project::Project;
use crate::store::CanvasStore;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::path::Path;
use tracing::info;

/// Self-contained snapshot of one project: the project plus every library
/// record it references, so it can be analysed without the live store.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[cfg_attr(feature = "openapi", derive(utoipa::ToSchema))]
pub struct ExportDocument {
    pub exported_at: DateTime<Utc>,
    pub project: Project,
    #[serde(default)]
    pub risks: Vec<Risk>,
    #[serde(default)]
    pub mitigations: Vec<Mitigation>,
}

impl ExportDocument {
    pub fn new(project: &Project, library: &Library) -> Self {
        let mut risk_ids: Vec<&str> = project.assigned_risks().map(|(_, id)| id).collect();
        risk_ids.extend(project.connections.iter().filter_map(|c| c.risk_id.as_deref()));
        let mut mitigation_ids: Vec<&str> =
            project.assigned_mitigations().map(|(_, id)| id).collect();
        mitigation_ids.extend(
            project
                .connections
                .iter()
                .filter_map(|c| c.mitigation_id.as_deref()),
        );

        let mitigations: Vec<Mitigation> = unique(mitigation_ids)
            .filter_map(|id| library.mitigation(id).cloned())
            .collect();
        // Risks a referenced mitigation maps to travel along so coverage
        // stays explainable after import.
        risk_ids.extend(
            mitigations
                .iter()
                .flat_map(|m| m.mapped_risks.iter().map(String::as_str)),
        );
        let risks = unique(risk_ids)
            .filter_map(|id| library.risk(id).cloned())
            .collect();

        Self {
            exported_at: Utc::now(),
            project: project.clone(),
            risks,
            mitigations,
        }
    }

    pub fn to_json(&self) -> Result<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    pub fn from_json(json: &str) -> Result<Self> {
        Ok(serde_json::from_str(json)?)
    }

    pub fn read_from(path: &Path) -> Result<Self> {
        let raw = std::fs::read_to_string(path)?;
        let doc = Self::from_json(&raw)?;
        info!(path = %path.display(), project = %doc.project.name, "export loaded");
        Ok(doc)
    }

    pub fn write_to(&self, path: &Path) -> Result<()> {
        std::fs::write(path, self.to_json()?)?;
        info!(path = %path.display(), project = %self.project.name, "export written");
        Ok(())
    }

    pub fn library(&self) -> Library {
        let mut library = Library::new();
        for risk in &self.risks {
            library.insert_risk_record(risk.clone());
        }
        for mitigation in &self.mitigations {
            library.insert_mitigation_record(mitigation.clone());
        }
        library
    }

    /// Rebuilds a standalone store holding only this project, selected.
    pub fn into_store(self) -> Result<CanvasStore> {
        let store = CanvasStore::new(self.library());
        let name = self.project.name.clone();
        store.insert_project(self.project);
        store.select_project(&name)?;
        Ok(store)
    }
}

fn unique<'a>(ids: Vec<&'a str>) -> impl Iterator<Item = &'a str> {
    let mut seen = HashSet::new();
    ids.into_iter().filter(move |id| seen.insert(*id))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::analysis::completion_score;
    use crate::project::{ConnectionDraft, ProjectDraft};
    use crate::types::{Domain, InteractionType};

    fn sample() -> (Project, Library) {
        let lib = Library::seeded();
        let mut p = Project::new(ProjectDraft {
            name: "Payments Platform".into(),
            ..Default::default()
        })
        .unwrap();
        p.assign_risks(Domain::Data, vec!["ADV002".into()], &lib).unwrap();
        p.assign_mitigations(Domain::Network, vec!["MIT003".into()], &lib)
            .unwrap();
        p.add_connection(
            ConnectionDraft {
                source: Domain::Network,
                target: Domain::Data,
                interaction: InteractionType::Connects,
                risk_id: Some("ADV004".into()),
                mitigation_id: None,
            },
            &lib,
        )
        .unwrap();
        (p, lib)
    }

    #[test]
    fn export_carries_only_referenced_records() {
        let (p, lib) = sample();
        let doc = ExportDocument::new(&p, &lib);
        let mut risk_ids: Vec<_> = doc.risks.iter().map(|r| r.id.as_str()).collect();
        risk_ids.sort_unstable();
        assert_eq!(risk_ids, ["ADV002", "ADV003", "ADV004"]);
        assert_eq!(doc.mitigations.len(), 1);
    }

    #[test]
    fn import_restores_a_selected_project() {
        let (p, lib) = sample();
        let json = ExportDocument::new(&p, &lib).to_json().unwrap();
        let store = ExportDocument::from_json(&json).unwrap().into_store().unwrap();
        let current = store.current_project().unwrap();
        assert_eq!(current, p);
        assert_eq!(completion_score(&current), completion_score(&p));
        assert!(store.read_library(|l| l.contains_mitigation("MIT003")));
    }

    #[test]
    fn file_round_trip() {
        let (p, lib) = sample();
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join(p.export_file_name());
        ExportDocument::new(&p, &lib).write_to(&path).unwrap();
        let doc = ExportDocument::read_from(&path).unwrap();
        assert_eq!(doc.project.name, "Payments Platform");
        assert!(ExportDocument::from_json("{not json").is_err());
    }
}
