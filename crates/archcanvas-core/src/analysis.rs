//! Counting-based metrics over a project: risk coverage, the completion
//! score and the summary dashboard.

use crate::library::{Library, Mitigation, Risk};
use crate::project::{Connection, Project};
use crate::types::{truncate_description, Domain, Effectiveness, Impact, ProjectStatus};
use serde::Serialize;
use std::collections::HashSet;

const COMPLETION_DOMAIN_POINTS: f64 = 30.0;
const COMPLETION_CONNECTION_CAP: usize = 25;
const COMPLETION_RISK_CAP: usize = 25;
const COMPLETION_MITIGATION_CAP: usize = 20;
const PROGRESS_BLOCKS: usize = 20;

/// A library risk as assigned to one domain of a project.
#[derive(Debug, Clone, Serialize)]
#[cfg_attr(feature = "openapi", derive(utoipa::ToSchema))]
pub struct AssignedRisk {
    #[serde(flatten)]
    pub risk: Risk,
    pub domain_assigned: Domain,
}

#[derive(Debug, Clone, Serialize)]
#[cfg_attr(feature = "openapi", derive(utoipa::ToSchema))]
pub struct AssignedMitigation {
    #[serde(flatten)]
    pub mitigation: Mitigation,
    pub domain_assigned: Domain,
}

#[derive(Debug, Clone, Serialize)]
#[cfg_attr(feature = "openapi", derive(utoipa::ToSchema))]
pub struct RiskCoverage {
    pub total_risks: usize,
    pub total_mitigations: usize,
    pub covered_risks: usize,
    pub uncovered_risks: usize,
    pub coverage_percentage: f64,
    pub uncovered_risk_details: Vec<Risk>,
}

/// Resolves a project's risk tags against the library, skipping ids that
/// are no longer in it.
pub fn project_risks(project: &Project, library: &Library) -> Vec<AssignedRisk> {
    project
        .assigned_risks()
        .filter_map(|(domain, id)| {
            library.risk(id).map(|risk| AssignedRisk {
                risk: risk.clone(),
                domain_assigned: domain,
            })
        })
        .collect()
}

pub fn project_mitigations(project: &Project, library: &Library) -> Vec<AssignedMitigation> {
    project
        .assigned_mitigations()
        .filter_map(|(domain, id)| {
            library.mitigation(id).map(|mitigation| AssignedMitigation {
                mitigation: mitigation.clone(),
                domain_assigned: domain,
            })
        })
        .collect()
}

/// A risk tag as shown on a domain: the id with its impact, or `Unknown`
/// once the library no longer holds the record.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[cfg_attr(feature = "openapi", derive(utoipa::ToSchema))]
pub struct RiskTag {
    pub id: String,
    pub impact: Option<Impact>,
    pub label: String,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[cfg_attr(feature = "openapi", derive(utoipa::ToSchema))]
pub struct MitigationTag {
    pub id: String,
    pub effectiveness: Option<Effectiveness>,
    pub label: String,
}

fn tag_label(id: &str, rating: Option<&str>) -> String {
    format!("{id} ({})", rating.unwrap_or("Unknown"))
}

pub fn resolve_risk_tags(ids: &[String], library: &Library) -> Vec<RiskTag> {
    ids.iter()
        .map(|id| {
            let impact = library.risk(id).map(|r| r.impact);
            RiskTag {
                id: id.clone(),
                impact,
                label: tag_label(id, impact.map(|i| i.as_str())),
            }
        })
        .collect()
}

pub fn resolve_mitigation_tags(ids: &[String], library: &Library) -> Vec<MitigationTag> {
    ids.iter()
        .map(|id| {
            let effectiveness = library.mitigation(id).map(|m| m.effectiveness);
            MitigationTag {
                id: id.clone(),
                effectiveness,
                label: tag_label(id, effectiveness.map(|e| e.as_str())),
            }
        })
        .collect()
}

const CONNECTION_RISK_PREVIEW: usize = 50;

/// A connection listed with a preview of its tagged risk.
#[derive(Debug, Clone, Serialize)]
#[cfg_attr(feature = "openapi", derive(utoipa::ToSchema))]
pub struct ConnectionDetail {
    #[serde(flatten)]
    pub connection: Connection,
    pub risk_description: Option<String>,
}

pub fn connection_details(project: &Project, library: &Library) -> Vec<ConnectionDetail> {
    project
        .connections
        .iter()
        .map(|connection| ConnectionDetail {
            risk_description: connection
                .risk_id
                .as_deref()
                .and_then(|id| library.risk(id))
                .map(|risk| truncate_description(&risk.description, CONNECTION_RISK_PREVIEW)),
            connection: connection.clone(),
        })
        .collect()
}

/// Fraction of distinct assigned risks that some assigned mitigation maps.
pub fn analyze_risk_coverage(
    risks: &[AssignedRisk],
    mitigations: &[AssignedMitigation],
) -> RiskCoverage {
    let covered_ids: HashSet<&str> = mitigations
        .iter()
        .flat_map(|m| m.mitigation.mapped_risks.iter().map(String::as_str))
        .collect();

    let mut seen = HashSet::new();
    let unique_risks: Vec<&Risk> = risks
        .iter()
        .map(|r| &r.risk)
        .filter(|r| seen.insert(r.id.as_str()))
        .collect();
    let unique_mitigations: HashSet<&str> =
        mitigations.iter().map(|m| m.mitigation.id.as_str()).collect();

    let total_risks = unique_risks.len();
    let (covered, uncovered): (Vec<&Risk>, Vec<&Risk>) = unique_risks
        .into_iter()
        .partition(|r| covered_ids.contains(r.id.as_str()));

    let coverage_percentage = if total_risks > 0 {
        covered.len() as f64 / total_risks as f64 * 100.0
    } else {
        0.0
    };

    RiskCoverage {
        total_risks,
        total_mitigations: unique_mitigations.len(),
        covered_risks: covered.len(),
        uncovered_risks: uncovered.len(),
        coverage_percentage,
        uncovered_risk_details: uncovered.into_iter().cloned().collect(),
    }
}

/// Weighted 0..=100 score: populated domains (30), connections (25),
/// assigned risks (25) and assigned mitigations (20).
pub fn completion_score(project: &Project) -> u32 {
    let populated = Domain::BUCKETS
        .iter()
        .filter(|d| {
            project
                .domains
                .get(d)
                .map_or(false, |b| !b.elements.is_empty())
        })
        .count();
    let mut score =
        populated as f64 / Domain::BUCKETS.len() as f64 * COMPLETION_DOMAIN_POINTS;

    let connections = project.connections.len();
    score += (connections * 5).min(COMPLETION_CONNECTION_CAP) as f64;

    let risks = project.assigned_risks().count();
    score += (risks * 3).min(COMPLETION_RISK_CAP) as f64;

    let mitigations = project.assigned_mitigations().count();
    score += (mitigations * 3).min(COMPLETION_MITIGATION_CAP) as f64;

    (score as u32).min(100)
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[cfg_attr(feature = "openapi", derive(utoipa::ToSchema))]
pub struct DistributionEntry {
    pub label: String,
    pub count: usize,
}

fn distribution<I, T>(values: I) -> Vec<DistributionEntry>
where
    I: IntoIterator<Item = T>,
    T: ToString,
{
    let mut out: Vec<DistributionEntry> = Vec::new();
    for value in values {
        let label = value.to_string();
        match out.iter_mut().find(|e| e.label == label) {
            Some(entry) => entry.count += 1,
            None => out.push(DistributionEntry { label, count: 1 }),
        }
    }
    out
}

#[derive(Debug, Clone, Serialize)]
#[cfg_attr(feature = "openapi", derive(utoipa::ToSchema))]
pub struct RiskRow {
    pub risk_id: String,
    pub description: String,
    pub impact: Impact,
    pub domain: Domain,
}

#[derive(Debug, Clone, Serialize)]
#[cfg_attr(feature = "openapi", derive(utoipa::ToSchema))]
pub struct MitigationRow {
    pub mitigation_id: String,
    pub description: String,
    pub effectiveness: Effectiveness,
    pub domain: Domain,
}

#[derive(Debug, Clone, Serialize)]
#[cfg_attr(feature = "openapi", derive(utoipa::ToSchema))]
pub struct ProjectSummary {
    pub project_id: String,
    pub name: String,
    pub status: ProjectStatus,
    pub total_elements: usize,
    pub total_items: usize,
    pub connections: usize,
    pub completion: u32,
    pub risks: Vec<RiskRow>,
    pub mitigations: Vec<MitigationRow>,
    pub impact_distribution: Vec<DistributionEntry>,
    pub effectiveness_distribution: Vec<DistributionEntry>,
    pub coverage: RiskCoverage,
    pub progress_bar: String,
    pub covered_percentage: f64,
    pub uncovered_percentage: f64,
}

/// Twenty-block text bar; each filled block stands for five percent.
pub fn progress_bar(percentage: f64) -> String {
    let filled = ((percentage / 5.0) as usize).min(PROGRESS_BLOCKS);
    let mut bar = "█".repeat(filled);
    bar.push_str(&"░".repeat(PROGRESS_BLOCKS - filled));
    bar
}

pub fn project_summary(project: &Project, library: &Library) -> ProjectSummary {
    let risks = project_risks(project, library);
    let mitigations = project_mitigations(project, library);
    let coverage = analyze_risk_coverage(&risks, &mitigations);

    let (covered_percentage, uncovered_percentage) = if coverage.total_risks > 0 {
        let total = coverage.total_risks as f64;
        (
            coverage.covered_risks as f64 / total * 100.0,
            coverage.uncovered_risks as f64 / total * 100.0,
        )
    } else {
        (0.0, 0.0)
    };

    ProjectSummary {
        project_id: project.id.clone(),
        name: project.name.clone(),
        status: project.status,
        total_elements: project.total_elements(),
        total_items: project.total_items(),
        connections: project.connections.len(),
        completion: completion_score(project),
        impact_distribution: distribution(risks.iter().map(|r| r.risk.impact)),
        effectiveness_distribution: distribution(
            mitigations.iter().map(|m| m.mitigation.effectiveness),
        ),
        risks: risks
            .iter()
            .map(|r| RiskRow {
                risk_id: r.risk.id.clone(),
                description: truncate_description(&r.risk.description, 50),
                impact: r.risk.impact,
                domain: r.domain_assigned,
            })
            .collect(),
        mitigations: mitigations
            .iter()
            .map(|m| MitigationRow {
                mitigation_id: m.mitigation.id.clone(),
                description: truncate_description(&m.mitigation.description, 50),
                effectiveness: m.mitigation.effectiveness,
                domain: m.domain_assigned,
            })
            .collect(),
        progress_bar: progress_bar(coverage.coverage_percentage),
        coverage,
        covered_percentage,
        uncovered_percentage,
    }
}
