use crate::error::{CanvasError, Result};
use crate::types::{
    truncate_description, Cost, Domain, Effectiveness, Impact, Likelihood, MitigationType,
    RiskCategory,
};
use chrono::{DateTime, Utc};
use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use tracing::{debug, info, warn};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[cfg_attr(feature = "openapi", derive(utoipa::ToSchema))]
pub struct Risk {
    pub id: String,
    pub description: String,
    pub impact: Impact,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub likelihood: Option<Likelihood>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub domain: Option<Domain>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub category: Option<RiskCategory>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub created_at: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[cfg_attr(feature = "openapi", derive(utoipa::ToSchema))]
pub struct Mitigation {
    pub id: String,
    pub description: String,
    pub effectiveness: Effectiveness,
    pub cost: Cost,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub domain: Option<Domain>,
    #[serde(default, rename = "type", skip_serializing_if = "Option::is_none")]
    pub mitigation_type: Option<MitigationType>,
    #[serde(default)]
    pub mapped_risks: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub created_at: Option<DateTime<Utc>>,
}

impl Mitigation {
    pub fn addresses(&self, risk_id: &str) -> bool {
        self.mapped_risks.iter().any(|r| r == risk_id)
    }
}

/// Input for adding a risk to the library.
#[derive(Debug, Clone, Deserialize)]
#[cfg_attr(feature = "openapi", derive(utoipa::ToSchema))]
pub struct RiskDraft {
    pub id: String,
    pub description: String,
    pub impact: Impact,
    #[serde(default)]
    pub likelihood: Option<Likelihood>,
    #[serde(default)]
    pub domain: Option<Domain>,
    #[serde(default)]
    pub category: Option<RiskCategory>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[cfg_attr(feature = "openapi", derive(utoipa::ToSchema))]
pub struct RiskPatch {
    pub description: Option<String>,
    pub impact: Option<Impact>,
    pub likelihood: Option<Likelihood>,
    pub domain: Option<Domain>,
    pub category: Option<RiskCategory>,
}

#[derive(Debug, Clone, Deserialize)]
#[cfg_attr(feature = "openapi", derive(utoipa::ToSchema))]
pub struct MitigationDraft {
    pub id: String,
    pub description: String,
    pub effectiveness: Effectiveness,
    pub cost: Cost,
    #[serde(default)]
    pub domain: Option<Domain>,
    #[serde(default, rename = "type")]
    pub mitigation_type: Option<MitigationType>,
    #[serde(default)]
    pub mapped_risks: Vec<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[cfg_attr(feature = "openapi", derive(utoipa::ToSchema))]
pub struct MitigationPatch {
    pub description: Option<String>,
    pub effectiveness: Option<Effectiveness>,
    pub cost: Option<Cost>,
    pub domain: Option<Domain>,
    #[serde(rename = "type")]
    pub mitigation_type: Option<MitigationType>,
    pub mapped_risks: Option<Vec<String>>,
}

/// Library filters. A `None` field matches everything.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct RiskFilter {
    pub impact: Option<Impact>,
    pub domain: Option<Domain>,
    pub category: Option<RiskCategory>,
}

impl RiskFilter {
    pub fn matches(&self, risk: &Risk) -> bool {
        self.impact.map_or(true, |i| risk.impact == i)
            && self.domain.map_or(true, |d| risk.domain == Some(d))
            && self.category.map_or(true, |c| risk.category == Some(c))
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct MitigationFilter {
    pub effectiveness: Option<Effectiveness>,
    pub cost: Option<Cost>,
    #[serde(rename = "type")]
    pub mitigation_type: Option<MitigationType>,
}

impl MitigationFilter {
    pub fn matches(&self, mitigation: &Mitigation) -> bool {
        self.effectiveness
            .map_or(true, |e| mitigation.effectiveness == e)
            && self.cost.map_or(true, |c| mitigation.cost == c)
            && self
                .mitigation_type
                .map_or(true, |t| mitigation.mitigation_type == Some(t))
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[cfg_attr(feature = "openapi", derive(utoipa::ToSchema))]
pub struct MappingRow {
    pub risk_id: String,
    pub risk_description: String,
    pub risk_impact: Impact,
    pub mitigation_id: String,
    pub mitigation_description: String,
    pub mitigation_effectiveness: Effectiveness,
    pub implementation_cost: Cost,
}

#[derive(Debug, Clone, Serialize)]
#[cfg_attr(feature = "openapi", derive(utoipa::ToSchema))]
pub struct MappingOverview {
    pub rows: Vec<MappingRow>,
    pub total_mappings: usize,
    pub covered_risks: usize,
    pub total_risks: usize,
    pub coverage_percentage: f64,
    pub unmapped_risks: Vec<Risk>,
}

/// The global risk and mitigation dictionaries shared by every project.
///
/// Both maps keep insertion order so listings come back in the order
/// entries were added.
#[derive(Debug, Clone, Default)]
pub struct Library {
    risks: IndexMap<String, Risk>,
    mitigations: IndexMap<String, Mitigation>,
}

fn required(field: &str, value: &str) -> Result<String> {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        return Err(CanvasError::validation(format!("{field} must not be empty")));
    }
    Ok(trimmed.to_string())
}

impl Library {
    pub fn new() -> Self {
        Self::default()
    }

    /// Library pre-populated with the five reference adversary risks and
    /// their mitigations.
    pub fn seeded() -> Self {
        let mut lib = Self::new();
        let risks = [
            ("ADV001", "Adversary compromises customer credentials", Impact::High, Domain::Services, Likelihood::Medium),
            ("ADV002", "Data breach through application vulnerability", Impact::Critical, Domain::Applications, Likelihood::High),
            ("ADV003", "Network intrusion attempt", Impact::Medium, Domain::Network, Likelihood::Medium),
            ("ADV004", "Unauthorized access to sensitive data", Impact::High, Domain::Information, Likelihood::Medium),
            ("ADV005", "Social engineering attacks on personnel", Impact::High, Domain::People, Likelihood::High),
        ];
        for (id, description, impact, domain, likelihood) in risks {
            lib.risks.insert(
                id.to_string(),
                Risk {
                    id: id.to_string(),
                    description: description.to_string(),
                    impact,
                    likelihood: Some(likelihood),
                    domain: Some(domain),
                    category: None,
                    created_at: None,
                },
            );
        }

        let mitigations = [
            ("MIT001", "Multi-factor authentication implementation", Domain::Services, "ADV001", Effectiveness::High, Cost::Medium),
            ("MIT002", "Security code review and testing", Domain::Applications, "ADV002", Effectiveness::High, Cost::Medium),
            ("MIT003", "Network segmentation and monitoring", Domain::Network, "ADV003", Effectiveness::Medium, Cost::High),
            ("MIT004", "Data encryption and access controls", Domain::Information, "ADV004", Effectiveness::High, Cost::Medium),
            ("MIT005", "Security awareness training", Domain::People, "ADV005", Effectiveness::Medium, Cost::Low),
        ];
        for (id, description, domain, risk, effectiveness, cost) in mitigations {
            lib.mitigations.insert(
                id.to_string(),
                Mitigation {
                    id: id.to_string(),
                    description: description.to_string(),
                    effectiveness,
                    cost,
                    domain: Some(domain),
                    mitigation_type: None,
                    mapped_risks: vec![risk.to_string()],
                    created_at: None,
                },
            );
        }
        lib
    }

    pub fn risk(&self, id: &str) -> Option<&Risk> {
        self.risks.get(id)
    }

    pub fn mitigation(&self, id: &str) -> Option<&Mitigation> {
        self.mitigations.get(id)
    }

    pub fn contains_risk(&self, id: &str) -> bool {
        self.risks.contains_key(id)
    }

    pub fn contains_mitigation(&self, id: &str) -> bool {
        self.mitigations.contains_key(id)
    }

    pub fn risks(&self) -> impl Iterator<Item = &Risk> {
        self.risks.values()
    }

    pub fn mitigations(&self) -> impl Iterator<Item = &Mitigation> {
        self.mitigations.values()
    }

    pub fn risk_count(&self) -> usize {
        self.risks.len()
    }

    pub fn mitigation_count(&self) -> usize {
        self.mitigations.len()
    }

    /// Adds a risk, replacing any existing entry with the same id.
    /// Returns the stored record and whether an entry was replaced.
    pub fn upsert_risk(&mut self, draft: RiskDraft) -> Result<(Risk, bool)> {
        let id = required("risk id", &draft.id)?;
        let description = required("risk description", &draft.description)?;
        let risk = Risk {
            id: id.clone(),
            description,
            impact: draft.impact,
            likelihood: draft.likelihood,
            domain: draft.domain,
            category: draft.category,
            created_at: Some(Utc::now()),
        };
        let replaced = self.risks.insert(id.clone(), risk.clone()).is_some();
        info!(risk_id = %id, replaced, "risk stored");
        Ok((risk, replaced))
    }

    pub fn update_risk(&mut self, id: &str, patch: RiskPatch) -> Result<Risk> {
        let risk = self
            .risks
            .get_mut(id)
            .ok_or_else(|| CanvasError::not_found("Risk", id))?;
        if let Some(description) = patch.description {
            risk.description = required("risk description", &description)?;
        }
        if let Some(impact) = patch.impact {
            risk.impact = impact;
        }
        if patch.likelihood.is_some() {
            risk.likelihood = patch.likelihood;
        }
        if patch.domain.is_some() {
            risk.domain = patch.domain;
        }
        if patch.category.is_some() {
            risk.category = patch.category;
        }
        info!(risk_id = %id, "risk updated");
        Ok(risk.clone())
    }

    /// Removes a risk unless a mitigation still maps to it.
    pub fn delete_risk(&mut self, id: &str) -> Result<Risk> {
        if !self.risks.contains_key(id) {
            return Err(CanvasError::not_found("Risk", id));
        }
        let used_by: Vec<String> = self
            .mitigations
            .values()
            .filter(|m| m.addresses(id))
            .map(|m| m.id.clone())
            .collect();
        if !used_by.is_empty() {
            warn!(risk_id = %id, mitigations = ?used_by, "refusing to delete mapped risk");
            return Err(CanvasError::RiskInUse {
                risk_id: id.to_string(),
                mitigations: used_by,
            });
        }
        let removed = self
            .risks
            .shift_remove(id)
            .ok_or_else(|| CanvasError::not_found("Risk", id))?;
        info!(risk_id = %id, "risk deleted");
        Ok(removed)
    }

    fn check_mapped_risks(&self, mapped: &[String]) -> Result<Vec<String>> {
        let mut seen = HashSet::new();
        let mut out = Vec::with_capacity(mapped.len());
        for risk_id in mapped {
            if !self.risks.contains_key(risk_id) {
                return Err(CanvasError::validation(format!(
                    "mapped risk {risk_id} is not in the risk library"
                )));
            }
            if seen.insert(risk_id.as_str()) {
                out.push(risk_id.clone());
            }
        }
        Ok(out)
    }

    pub fn upsert_mitigation(&mut self, draft: MitigationDraft) -> Result<(Mitigation, bool)> {
        let id = required("mitigation id", &draft.id)?;
        let description = required("mitigation description", &draft.description)?;
        let mapped_risks = self.check_mapped_risks(&draft.mapped_risks)?;
        let mitigation = Mitigation {
            id: id.clone(),
            description,
            effectiveness: draft.effectiveness,
            cost: draft.cost,
            domain: draft.domain,
            mitigation_type: draft.mitigation_type,
            mapped_risks,
            created_at: Some(Utc::now()),
        };
        let replaced = self
            .mitigations
            .insert(id.clone(), mitigation.clone())
            .is_some();
        info!(mitigation_id = %id, replaced, "mitigation stored");
        Ok((mitigation, replaced))
    }

    pub fn update_mitigation(&mut self, id: &str, patch: MitigationPatch) -> Result<Mitigation> {
        let mapped = match patch.mapped_risks {
            Some(ref ids) => Some(self.check_mapped_risks(ids)?),
            None => None,
        };
        let mitigation = self
            .mitigations
            .get_mut(id)
            .ok_or_else(|| CanvasError::not_found("Mitigation", id))?;
        if let Some(description) = patch.description {
            mitigation.description = required("mitigation description", &description)?;
        }
        if let Some(effectiveness) = patch.effectiveness {
            mitigation.effectiveness = effectiveness;
        }
        if let Some(cost) = patch.cost {
            mitigation.cost = cost;
        }
        if patch.domain.is_some() {
            mitigation.domain = patch.domain;
        }
        if patch.mitigation_type.is_some() {
            mitigation.mitigation_type = patch.mitigation_type;
        }
        if let Some(mapped) = mapped {
            mitigation.mapped_risks = mapped;
        }
        info!(mitigation_id = %id, "mitigation updated");
        Ok(mitigation.clone())
    }

    pub fn delete_mitigation(&mut self, id: &str) -> Result<Mitigation> {
        let removed = self
            .mitigations
            .shift_remove(id)
            .ok_or_else(|| CanvasError::not_found("Mitigation", id))?;
        info!(mitigation_id = %id, "mitigation deleted");
        Ok(removed)
    }

    pub fn filter_risks(&self, filter: &RiskFilter) -> Vec<Risk> {
        let out: Vec<Risk> = self
            .risks
            .values()
            .filter(|r| filter.matches(r))
            .cloned()
            .collect();
        debug!(matched = out.len(), total = self.risks.len(), "filtered risks");
        out
    }

    pub fn filter_mitigations(&self, filter: &MitigationFilter) -> Vec<Mitigation> {
        self.mitigations
            .values()
            .filter(|m| filter.matches(m))
            .cloned()
            .collect()
    }

    /// Risk/mitigation pairs across the whole library with coverage totals.
    pub fn mapping_overview(&self) -> MappingOverview {
        let mut rows = Vec::new();
        for mitigation in self.mitigations.values() {
            for risk_id in &mitigation.mapped_risks {
                let Some(risk) = self.risks.get(risk_id) else {
                    continue;
                };
                rows.push(MappingRow {
                    risk_id: risk.id.clone(),
                    risk_description: truncate_description(&risk.description, 50),
                    risk_impact: risk.impact,
                    mitigation_id: mitigation.id.clone(),
                    mitigation_description: truncate_description(&mitigation.description, 50),
                    mitigation_effectiveness: mitigation.effectiveness,
                    implementation_cost: mitigation.cost,
                });
            }
        }

        let mapped: HashSet<&str> = rows.iter().map(|r| r.risk_id.as_str()).collect();
        let total_risks = self.risks.len();
        let covered_risks = mapped.len();
        let coverage_percentage = if total_risks > 0 {
            covered_risks as f64 / total_risks as f64 * 100.0
        } else {
            0.0
        };
        let unmapped_risks = self
            .risks
            .values()
            .filter(|r| !mapped.contains(r.id.as_str()))
            .cloned()
            .collect();

        MappingOverview {
            total_mappings: rows.len(),
            rows,
            covered_risks,
            total_risks,
            coverage_percentage,
            unmapped_risks,
        }
    }

    pub(crate) fn insert_risk_record(&mut self, risk: Risk) {
        self.risks.insert(risk.id.clone(), risk);
    }

    pub(crate) fn insert_mitigation_record(&mut self, mitigation: Mitigation) {
        self.mitigations.insert(mitigation.id.clone(), mitigation);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn risk_draft(id: &str) -> RiskDraft {
        RiskDraft {
            id: id.into(),
            description: format!("{id} description"),
            impact: Impact::Low,
            likelihood: None,
            domain: Some(Domain::Data),
            category: Some(RiskCategory::Technical),
        }
    }

    fn mitigation_draft(id: &str, mapped: &[&str]) -> MitigationDraft {
        MitigationDraft {
            id: id.into(),
            description: format!("{id} description"),
            effectiveness: Effectiveness::Low,
            cost: Cost::Low,
            domain: None,
            mitigation_type: Some(MitigationType::Detective),
            mapped_risks: mapped.iter().map(|s| s.to_string()).collect(),
        }
    }

    #[test]
    fn seeded_library_matches_reference_set() {
        let lib = Library::seeded();
        assert_eq!(lib.risk_count(), 5);
        assert_eq!(lib.mitigation_count(), 5);
        assert_eq!(lib.risk("ADV002").unwrap().impact, Impact::Critical);
        assert_eq!(lib.mitigation("MIT005").unwrap().mapped_risks, vec!["ADV005"]);
        let ids: Vec<_> = lib.risks().map(|r| r.id.as_str()).collect();
        assert_eq!(ids, ["ADV001", "ADV002", "ADV003", "ADV004", "ADV005"]);
    }

    #[test]
    fn upsert_requires_id_and_description() {
        let mut lib = Library::new();
        let mut draft = risk_draft("R1");
        draft.description = "   ".into();
        assert!(matches!(lib.upsert_risk(draft), Err(CanvasError::Validation(_))));
        let mut draft = risk_draft("R1");
        draft.id = String::new();
        assert!(lib.upsert_risk(draft).is_err());
    }

    #[test]
    fn upsert_replaces_existing_risk() {
        let mut lib = Library::new();
        let (_, replaced) = lib.upsert_risk(risk_draft("R1")).unwrap();
        assert!(!replaced);
        let mut again = risk_draft("R1");
        again.impact = Impact::Critical;
        let (risk, replaced) = lib.upsert_risk(again).unwrap();
        assert!(replaced);
        assert_eq!(risk.impact, Impact::Critical);
        assert_eq!(lib.risk_count(), 1);
    }

    #[test]
    fn mapped_risk_blocks_delete() {
        let mut lib = Library::seeded();
        match lib.delete_risk("ADV001") {
            Err(CanvasError::RiskInUse { mitigations, .. }) => assert_eq!(mitigations, vec!["MIT001"]),
            other => panic!("expected RiskInUse, got {other:?}"),
        }
        lib.delete_mitigation("MIT001").unwrap();
        lib.delete_risk("ADV001").unwrap();
        assert!(!lib.contains_risk("ADV001"));
    }

    #[test]
    fn mitigation_mapping_must_reference_known_risks() {
        let mut lib = Library::seeded();
        assert!(lib.upsert_mitigation(mitigation_draft("M9", &["NOPE"])).is_err());
        let (m, _) = lib
            .upsert_mitigation(mitigation_draft("M9", &["ADV001", "ADV002", "ADV001"]))
            .unwrap();
        assert_eq!(m.mapped_risks, vec!["ADV001", "ADV002"]);
    }

    #[test]
    fn update_patches_only_given_fields() {
        let mut lib = Library::seeded();
        let risk = lib
            .update_risk(
                "ADV003",
                RiskPatch {
                    impact: Some(Impact::Critical),
                    ..Default::default()
                },
            )
            .unwrap();
        assert_eq!(risk.impact, Impact::Critical);
        assert_eq!(risk.description, "Network intrusion attempt");
        assert!(lib.update_risk("missing", RiskPatch::default()).is_err());

        let m = lib
            .update_mitigation(
                "MIT003",
                MitigationPatch {
                    mapped_risks: Some(vec!["ADV003".into(), "ADV004".into()]),
                    ..Default::default()
                },
            )
            .unwrap();
        assert_eq!(m.mapped_risks.len(), 2);
    }

    #[test]
    fn update_mitigation_rejects_unknown_mapped_risk() {
        let mut lib = Library::seeded();
        let err = lib
            .update_mitigation(
                "MIT001",
                MitigationPatch {
                    effectiveness: Some(Effectiveness::Low),
                    mapped_risks: Some(vec!["ADV001".into(), "ADV999".into()]),
                    ..Default::default()
                },
            )
            .unwrap_err();
        assert!(matches!(err, CanvasError::Validation(_)));
        let unchanged = lib.mitigation("MIT001").unwrap();
        assert_eq!(unchanged.mapped_risks, vec!["ADV001"]);
        assert_eq!(unchanged.effectiveness, Effectiveness::High);
    }

    #[test]
    fn filters_compose() {
        let lib = Library::seeded();
        let high = lib.filter_risks(&RiskFilter {
            impact: Some(Impact::High),
            ..Default::default()
        });
        assert_eq!(high.len(), 3);
        let high_people = lib.filter_risks(&RiskFilter {
            impact: Some(Impact::High),
            domain: Some(Domain::People),
            category: None,
        });
        assert_eq!(high_people.len(), 1);
        assert_eq!(high_people[0].id, "ADV005");

        let cheap = lib.filter_mitigations(&MitigationFilter {
            cost: Some(Cost::Low),
            ..Default::default()
        });
        assert_eq!(cheap.len(), 1);
        let typed = lib.filter_mitigations(&MitigationFilter {
            mitigation_type: Some(MitigationType::Preventive),
            ..Default::default()
        });
        assert!(typed.is_empty());
    }

    #[test]
    fn mapping_overview_reports_unmapped_risks() {
        let mut lib = Library::seeded();
        lib.upsert_risk(risk_draft("ADV006")).unwrap();
        let overview = lib.mapping_overview();
        assert_eq!(overview.total_mappings, 5);
        assert_eq!(overview.covered_risks, 5);
        assert_eq!(overview.total_risks, 6);
        assert!((overview.coverage_percentage - 83.333).abs() < 0.01);
        assert_eq!(overview.unmapped_risks.len(), 1);
        assert_eq!(overview.unmapped_risks[0].id, "ADV006");
        assert!(overview.rows[0].risk_description.ends_with("..."));
    }

    #[test]
    fn empty_library_has_zero_coverage() {
        let overview = Library::new().mapping_overview();
        assert_eq!(overview.total_risks, 0);
        assert_eq!(overview.coverage_percentage, 0.0);
    }
}
