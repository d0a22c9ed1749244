use crate::error::{CanvasError, Result};
use crate::library::Library;
use crate::types::{Domain, InteractionType, ProjectStatus};
use chrono::{DateTime, Local, Utc};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashSet};
use tracing::{debug, info};
use uuid::Uuid;

const TIMESTAMP_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

/// Elements and library tags held by one domain of a project.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[cfg_attr(feature = "openapi", derive(utoipa::ToSchema))]
pub struct DomainBucket {
    #[serde(default)]
    pub elements: Vec<String>,
    #[serde(default)]
    pub risk_ids: Vec<String>,
    #[serde(default)]
    pub mitigation_ids: Vec<String>,
}

impl DomainBucket {
    pub fn item_count(&self) -> usize {
        self.elements.len() + self.risk_ids.len() + self.mitigation_ids.len()
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[cfg_attr(feature = "openapi", derive(utoipa::ToSchema))]
pub struct Connection {
    pub id: String,
    pub source: Domain,
    pub target: Domain,
    #[serde(rename = "type")]
    pub interaction: InteractionType,
    #[serde(default)]
    pub risk_id: Option<String>,
    #[serde(default)]
    pub mitigation_id: Option<String>,
    pub created_at: DateTime<Utc>,
}

impl Connection {
    pub fn touches(&self, domain: Domain) -> bool {
        self.source == domain || self.target == domain
    }
}

#[derive(Debug, Clone, Deserialize)]
#[cfg_attr(feature = "openapi", derive(utoipa::ToSchema))]
pub struct ConnectionDraft {
    pub source: Domain,
    pub target: Domain,
    #[serde(rename = "type")]
    pub interaction: InteractionType,
    #[serde(default)]
    pub risk_id: Option<String>,
    #[serde(default)]
    pub mitigation_id: Option<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[cfg_attr(feature = "openapi", derive(utoipa::ToSchema))]
pub enum Direction {
    #[serde(rename = "outgoing")]
    Outgoing,
    #[serde(rename = "incoming")]
    Incoming,
}

impl Direction {
    pub fn arrow(&self) -> &'static str {
        match self {
            Direction::Outgoing => "→",
            Direction::Incoming => "←",
        }
    }
}

/// A connection seen from one of its endpoints.
#[derive(Debug, Clone, Serialize)]
#[cfg_attr(feature = "openapi", derive(utoipa::ToSchema))]
pub struct DomainLink {
    pub connection_id: String,
    pub direction: Direction,
    pub other: Domain,
    #[serde(rename = "type")]
    pub interaction: InteractionType,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[cfg_attr(feature = "openapi", derive(utoipa::ToSchema))]
pub struct ProjectDraft {
    pub name: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub owner: String,
    #[serde(default)]
    pub status: ProjectStatus,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[cfg_attr(feature = "openapi", derive(utoipa::ToSchema))]
pub struct Project {
    pub id: String,
    pub name: String,
    pub description: String,
    pub owner: String,
    pub status: ProjectStatus,
    pub created_at: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last_updated: Option<String>,
    pub domains: BTreeMap<Domain, DomainBucket>,
    #[serde(default)]
    pub connections: Vec<Connection>,
    #[serde(default)]
    next_connection_seq: u64,
}

fn now_stamp() -> String {
    Local::now().format(TIMESTAMP_FORMAT).to_string()
}

fn dedup_preserving_order(ids: Vec<String>) -> Vec<String> {
    let mut seen = HashSet::new();
    ids.into_iter().filter(|id| seen.insert(id.clone())).collect()
}

impl Project {
    pub fn new(draft: ProjectDraft) -> Result<Self> {
        let name = draft.name.trim();
        if name.is_empty() {
            return Err(CanvasError::validation("project name must not be empty"));
        }
        let mut domains: BTreeMap<Domain, DomainBucket> = Domain::BUCKETS
            .iter()
            .map(|d| (*d, DomainBucket::default()))
            .collect();
        if let Some(people) = domains.get_mut(&Domain::People) {
            people.elements = vec!["Customer".into(), "User".into(), "Admin".into()];
        }
        let mut id = Uuid::new_v4().simple().to_string();
        id.truncate(8);

        Ok(Self {
            id,
            name: name.to_string(),
            description: draft.description,
            owner: draft.owner,
            status: draft.status,
            created_at: now_stamp(),
            last_updated: None,
            domains,
            connections: Vec::new(),
            next_connection_seq: 0,
        })
    }

    pub fn bucket(&self, domain: Domain) -> Result<&DomainBucket> {
        self.domains
            .get(&domain)
            .ok_or_else(|| CanvasError::validation(format!("{domain} has no element bucket")))
    }

    fn bucket_mut(&mut self, domain: Domain) -> Result<&mut DomainBucket> {
        if !domain.is_bucket() {
            return Err(CanvasError::validation(format!(
                "{domain} has no element bucket"
            )));
        }
        Ok(self.domains.entry(domain).or_default())
    }

    fn touch(&mut self) {
        self.last_updated = Some(now_stamp());
    }

    /// Returns `false` when the element is already present.
    pub fn add_element(&mut self, domain: Domain, element: &str) -> Result<bool> {
        let element = element.trim();
        if element.is_empty() {
            return Err(CanvasError::validation("element must not be empty"));
        }
        let bucket = self.bucket_mut(domain)?;
        if bucket.elements.iter().any(|e| e == element) {
            debug!(%domain, element, "element already present");
            return Ok(false);
        }
        bucket.elements.push(element.to_string());
        self.touch();
        info!(project = %self.name, %domain, element, "element added");
        Ok(true)
    }

    pub fn remove_element(&mut self, domain: Domain, element: &str) -> Result<()> {
        let element = element.trim();
        let bucket = self.bucket_mut(domain)?;
        let pos = bucket
            .elements
            .iter()
            .position(|e| e == element)
            .ok_or_else(|| CanvasError::not_found("Element", element))?;
        bucket.elements.remove(pos);
        self.touch();
        info!(project = %self.name, %domain, element, "element removed");
        Ok(())
    }

    /// Replaces the risk tags of a domain with `risk_ids`.
    pub fn assign_risks(
        &mut self,
        domain: Domain,
        risk_ids: Vec<String>,
        library: &Library,
    ) -> Result<&DomainBucket> {
        if let Some(unknown) = risk_ids.iter().find(|id| !library.contains_risk(id)) {
            return Err(CanvasError::validation(format!(
                "risk {unknown} is not in the risk library"
            )));
        }
        let ids = dedup_preserving_order(risk_ids);
        self.bucket_mut(domain)?.risk_ids = ids;
        self.touch();
        info!(project = %self.name, %domain, "risks assigned");
        self.bucket(domain)
    }

    /// Replaces the mitigation tags of a domain with `mitigation_ids`.
    pub fn assign_mitigations(
        &mut self,
        domain: Domain,
        mitigation_ids: Vec<String>,
        library: &Library,
    ) -> Result<&DomainBucket> {
        if let Some(unknown) = mitigation_ids
            .iter()
            .find(|id| !library.contains_mitigation(id))
        {
            return Err(CanvasError::validation(format!(
                "mitigation {unknown} is not in the mitigation library"
            )));
        }
        let ids = dedup_preserving_order(mitigation_ids);
        self.bucket_mut(domain)?.mitigation_ids = ids;
        self.touch();
        info!(project = %self.name, %domain, "mitigations assigned");
        self.bucket(domain)
    }

    /// Returns `true` when the status actually changed.
    pub fn set_status(&mut self, status: ProjectStatus) -> bool {
        if self.status == status {
            return false;
        }
        self.status = status;
        self.touch();
        info!(project = %self.name, %status, "project status changed");
        true
    }

    pub fn add_connection(
        &mut self,
        draft: ConnectionDraft,
        library: &Library,
    ) -> Result<Connection> {
        if draft.source == draft.target {
            return Err(CanvasError::validation(
                "connection source and target must differ",
            ));
        }
        if let Some(risk_id) = draft.risk_id.as_deref() {
            if !library.contains_risk(risk_id) {
                return Err(CanvasError::validation(format!(
                    "risk {risk_id} is not in the risk library"
                )));
            }
        }
        if let Some(mitigation_id) = draft.mitigation_id.as_deref() {
            if !library.contains_mitigation(mitigation_id) {
                return Err(CanvasError::validation(format!(
                    "mitigation {mitigation_id} is not in the mitigation library"
                )));
            }
        }

        let connection = Connection {
            id: format!("{}-{}-{}", draft.source, draft.target, self.next_connection_seq),
            source: draft.source,
            target: draft.target,
            interaction: draft.interaction,
            risk_id: draft.risk_id,
            mitigation_id: draft.mitigation_id,
            created_at: Utc::now(),
        };
        self.next_connection_seq += 1;
        self.connections.push(connection.clone());
        self.touch();
        info!(
            project = %self.name,
            connection = %connection.id,
            "connection created: {} {} {}",
            connection.source,
            connection.interaction.stereotype(),
            connection.target
        );
        Ok(connection)
    }

    pub fn remove_connection(&mut self, id: &str) -> Result<Connection> {
        let pos = self
            .connections
            .iter()
            .position(|c| c.id == id)
            .ok_or_else(|| CanvasError::not_found("Connection", id))?;
        let removed = self.connections.remove(pos);
        self.touch();
        info!(project = %self.name, connection = %id, "connection removed");
        Ok(removed)
    }

    /// Drops every connection and returns how many there were.
    pub fn clear_connections(&mut self) -> usize {
        let count = self.connections.len();
        self.connections.clear();
        if count > 0 {
            self.touch();
        }
        info!(project = %self.name, count, "connections cleared");
        count
    }

    pub fn domain_connections(&self, domain: Domain) -> Vec<DomainLink> {
        self.connections
            .iter()
            .filter(|c| c.touches(domain))
            .map(|c| {
                let (direction, other) = if c.source == domain {
                    (Direction::Outgoing, c.target)
                } else {
                    (Direction::Incoming, c.source)
                };
                DomainLink {
                    connection_id: c.id.clone(),
                    direction,
                    other,
                    interaction: c.interaction,
                }
            })
            .collect()
    }

    pub fn connection_count(&self, domain: Domain) -> usize {
        self.connections.iter().filter(|c| c.touches(domain)).count()
    }

    pub fn total_elements(&self) -> usize {
        self.domains.values().map(|b| b.elements.len()).sum()
    }

    pub fn total_items(&self) -> usize {
        self.domains.values().map(DomainBucket::item_count).sum()
    }

    /// Every assigned risk id in bucket order, with the domain it sits in.
    pub fn assigned_risks(&self) -> impl Iterator<Item = (Domain, &str)> {
        self.domains
            .iter()
            .flat_map(|(d, b)| b.risk_ids.iter().map(move |id| (*d, id.as_str())))
    }

    pub fn assigned_mitigations(&self) -> impl Iterator<Item = (Domain, &str)> {
        self.domains
            .iter()
            .flat_map(|(d, b)| b.mitigation_ids.iter().map(move |id| (*d, id.as_str())))
    }

    /// File name used when the project is exported.
    pub fn export_file_name(&self) -> String {
        format!("{}_export.json", self.name.replace(' ', "_"))
    }
}
