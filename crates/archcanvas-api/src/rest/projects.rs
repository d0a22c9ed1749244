use super::parse_domain;
use crate::{ApiError, ApiJson, ApiResult, AppState};
use archcanvas_core::{
    connection_details, resolve_mitigation_tags, resolve_risk_tags, Connection, ConnectionDetail,
    ConnectionDraft, Domain, DomainBucket, DomainLayer, DomainLink, MitigationTag, Project,
    ProjectDraft, ProjectStatus, RiskTag,
};
use axum::{
    extract::{Path, State},
    http::StatusCode,
    Json,
};
use serde::{Deserialize, Serialize};
use tracing::debug;
use utoipa::ToSchema;

#[derive(Debug, Deserialize, ToSchema)]
pub struct StatusUpdate {
    pub status: ProjectStatus,
}

#[derive(Debug, Deserialize, ToSchema)]
pub struct SelectProject {
    pub name: String,
}

#[derive(Debug, Deserialize, ToSchema)]
pub struct ElementRequest {
    pub element: String,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct ElementAdded {
    /// False when the element was already in the bucket.
    pub added: bool,
    pub bucket: DomainBucket,
}

#[derive(Debug, Deserialize, ToSchema)]
pub struct IdList {
    pub ids: Vec<String>,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct DomainView {
    pub domain: Domain,
    pub layer: DomainLayer,
    #[serde(flatten)]
    pub bucket: DomainBucket,
    /// `risk_ids` resolved against the library, in the same order
    pub risks: Vec<RiskTag>,
    pub mitigations: Vec<MitigationTag>,
    pub connections: Vec<DomainLink>,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct ClearedConnections {
    pub removed: usize,
}

#[utoipa::path(
    get,
    path = "/v1/projects",
    tag = "projects",
    responses((status = 200, description = "All projects in creation order", body = [Project]))
)]
pub async fn list_projects(State(state): State<AppState>) -> Json<Vec<Project>> {
    Json(state.store.list_projects())
}

/// Create a project; it becomes the current selection
#[utoipa::path(
    post,
    path = "/v1/projects",
    tag = "projects",
    request_body = ProjectDraft,
    responses(
        (status = 201, description = "Project created", body = Project),
        (status = 400, description = "Empty name"),
        (status = 409, description = "Name already taken")
    )
)]
pub async fn create_project(
    State(state): State<AppState>,
    ApiJson(draft): ApiJson<ProjectDraft>,
) -> ApiResult<(StatusCode, Json<Project>)> {
    let project = state.store.create_project(draft)?;
    Ok((StatusCode::CREATED, Json(project)))
}

#[utoipa::path(
    get,
    path = "/v1/projects/{name}",
    tag = "projects",
    params(("name" = String, Path, description = "Project name")),
    responses(
        (status = 200, description = "Project", body = Project),
        (status = 404, description = "Unknown project")
    )
)]
pub async fn get_project(
    State(state): State<AppState>,
    Path(name): Path<String>,
) -> ApiResult<Json<Project>> {
    Ok(Json(state.store.project(&name)?))
}

#[utoipa::path(
    delete,
    path = "/v1/projects/{name}",
    tag = "projects",
    params(("name" = String, Path, description = "Project name")),
    responses(
        (status = 200, description = "Deleted project", body = Project),
        (status = 404, description = "Unknown project")
    )
)]
pub async fn delete_project(
    State(state): State<AppState>,
    Path(name): Path<String>,
) -> ApiResult<Json<Project>> {
    Ok(Json(state.store.delete_project(&name)?))
}

#[utoipa::path(
    put,
    path = "/v1/projects/{name}/status",
    tag = "projects",
    params(("name" = String, Path, description = "Project name")),
    request_body = StatusUpdate,
    responses(
        (status = 200, description = "Project with its new status", body = Project),
        (status = 404, description = "Unknown project")
    )
)]
pub async fn set_status(
    State(state): State<AppState>,
    Path(name): Path<String>,
    ApiJson(update): ApiJson<StatusUpdate>,
) -> ApiResult<Json<Project>> {
    let project = state.store.with_project_mut(&name, |project, _| {
        project.set_status(update.status);
        Ok(project.clone())
    })?;
    Ok(Json(project))
}

#[utoipa::path(
    get,
    path = "/v1/session/current",
    tag = "projects",
    responses(
        (status = 200, description = "Currently selected project", body = Project),
        (status = 404, description = "No project selected")
    )
)]
pub async fn get_current(State(state): State<AppState>) -> ApiResult<Json<Project>> {
    state
        .store
        .current_project()
        .map(Json)
        .ok_or_else(|| ApiError::NotFound("no project selected".into()))
}

#[utoipa::path(
    put,
    path = "/v1/session/current",
    tag = "projects",
    request_body = SelectProject,
    responses(
        (status = 200, description = "Selected project", body = Project),
        (status = 404, description = "Unknown project")
    )
)]
pub async fn select_current(
    State(state): State<AppState>,
    ApiJson(select): ApiJson<SelectProject>,
) -> ApiResult<Json<Project>> {
    Ok(Json(state.store.select_project(&select.name)?))
}

// -------- Domain buckets --------

/// Elements, tags and connections of one domain
#[utoipa::path(
    get,
    path = "/v1/projects/{name}/domains/{domain}",
    tag = "projects",
    params(
        ("name" = String, Path, description = "Project name"),
        ("domain" = String, Path, description = "Domain name, case-insensitive")
    ),
    responses(
        (status = 200, description = "Domain detail", body = DomainView),
        (status = 400, description = "Unknown domain"),
        (status = 404, description = "Unknown project")
    )
)]
pub async fn get_domain(
    State(state): State<AppState>,
    Path((name, domain)): Path<(String, String)>,
) -> ApiResult<Json<DomainView>> {
    let domain = parse_domain(&domain)?;
    debug!(project = %name, %domain, "domain view");
    let view = state.store.with_project(&name, |project, library| {
        // Enterprise is a canvas node only and never holds items.
        let bucket = project.bucket(domain).cloned().unwrap_or_default();
        DomainView {
            domain,
            layer: domain.layer(),
            risks: resolve_risk_tags(&bucket.risk_ids, library),
            mitigations: resolve_mitigation_tags(&bucket.mitigation_ids, library),
            bucket,
            connections: project.domain_connections(domain),
        }
    })?;
    Ok(Json(view))
}

#[utoipa::path(
    post,
    path = "/v1/projects/{name}/domains/{domain}/elements",
    tag = "projects",
    params(
        ("name" = String, Path, description = "Project name"),
        ("domain" = String, Path, description = "Domain name")
    ),
    request_body = ElementRequest,
    responses(
        (status = 201, description = "Element added", body = ElementAdded),
        (status = 200, description = "Element was already present", body = ElementAdded),
        (status = 400, description = "Empty element or non-bucket domain")
    )
)]
pub async fn add_element(
    State(state): State<AppState>,
    Path((name, domain)): Path<(String, String)>,
    ApiJson(req): ApiJson<ElementRequest>,
) -> ApiResult<(StatusCode, Json<ElementAdded>)> {
    let domain = parse_domain(&domain)?;
    let result = state.store.with_project_mut(&name, |project, _| {
        let added = project.add_element(domain, &req.element)?;
        Ok(ElementAdded {
            added,
            bucket: project.bucket(domain)?.clone(),
        })
    })?;
    let status = if result.added {
        StatusCode::CREATED
    } else {
        StatusCode::OK
    };
    Ok((status, Json(result)))
}

#[utoipa::path(
    delete,
    path = "/v1/projects/{name}/domains/{domain}/elements/{element}",
    tag = "projects",
    params(
        ("name" = String, Path, description = "Project name"),
        ("domain" = String, Path, description = "Domain name"),
        ("element" = String, Path, description = "Element text")
    ),
    responses(
        (status = 200, description = "Bucket after removal", body = DomainBucket),
        (status = 404, description = "Unknown project or element")
    )
)]
pub async fn remove_element(
    State(state): State<AppState>,
    Path((name, domain, element)): Path<(String, String, String)>,
) -> ApiResult<Json<DomainBucket>> {
    let domain = parse_domain(&domain)?;
    let bucket = state.store.with_project_mut(&name, |project, _| {
        project.remove_element(domain, &element)?;
        Ok(project.bucket(domain)?.clone())
    })?;
    Ok(Json(bucket))
}

/// Replace the risk tags of a domain
#[utoipa::path(
    put,
    path = "/v1/projects/{name}/domains/{domain}/risks",
    tag = "projects",
    params(
        ("name" = String, Path, description = "Project name"),
        ("domain" = String, Path, description = "Domain name")
    ),
    request_body = IdList,
    responses(
        (status = 200, description = "Bucket with new tags", body = DomainBucket),
        (status = 400, description = "Unknown risk id")
    )
)]
pub async fn assign_risks(
    State(state): State<AppState>,
    Path((name, domain)): Path<(String, String)>,
    ApiJson(list): ApiJson<IdList>,
) -> ApiResult<Json<DomainBucket>> {
    let domain = parse_domain(&domain)?;
    let bucket = state.store.with_project_mut(&name, |project, library| {
        project
            .assign_risks(domain, list.ids, library)
            .map(DomainBucket::clone)
    })?;
    Ok(Json(bucket))
}

/// Replace the mitigation tags of a domain
#[utoipa::path(
    put,
    path = "/v1/projects/{name}/domains/{domain}/mitigations",
    tag = "projects",
    params(
        ("name" = String, Path, description = "Project name"),
        ("domain" = String, Path, description = "Domain name")
    ),
    request_body = IdList,
    responses(
        (status = 200, description = "Bucket with new tags", body = DomainBucket),
        (status = 400, description = "Unknown mitigation id")
    )
)]
pub async fn assign_mitigations(
    State(state): State<AppState>,
    Path((name, domain)): Path<(String, String)>,
    ApiJson(list): ApiJson<IdList>,
) -> ApiResult<Json<DomainBucket>> {
    let domain = parse_domain(&domain)?;
    let bucket = state.store.with_project_mut(&name, |project, library| {
        project
            .assign_mitigations(domain, list.ids, library)
            .map(DomainBucket::clone)
    })?;
    Ok(Json(bucket))
}

// -------- Connections --------

#[utoipa::path(
    get,
    path = "/v1/projects/{name}/connections",
    tag = "projects",
    params(("name" = String, Path, description = "Project name")),
    responses((status = 200, description = "Connections in creation order", body = [ConnectionDetail]))
)]
pub async fn list_connections(
    State(state): State<AppState>,
    Path(name): Path<String>,
) -> ApiResult<Json<Vec<ConnectionDetail>>> {
    let connections = state.store.with_project(&name, connection_details)?;
    Ok(Json(connections))
}

#[utoipa::path(
    post,
    path = "/v1/projects/{name}/connections",
    tag = "projects",
    params(("name" = String, Path, description = "Project name")),
    request_body = ConnectionDraft,
    responses(
        (status = 201, description = "Connection added", body = Connection),
        (status = 400, description = "Self-loop or unknown risk/mitigation id")
    )
)]
pub async fn create_connection(
    State(state): State<AppState>,
    Path(name): Path<String>,
    ApiJson(draft): ApiJson<ConnectionDraft>,
) -> ApiResult<(StatusCode, Json<Connection>)> {
    let connection = state
        .store
        .with_project_mut(&name, |project, library| project.add_connection(draft, library))?;
    Ok((StatusCode::CREATED, Json(connection)))
}

#[utoipa::path(
    delete,
    path = "/v1/projects/{name}/connections",
    tag = "projects",
    params(("name" = String, Path, description = "Project name")),
    responses((status = 200, description = "Number of connections dropped", body = ClearedConnections))
)]
pub async fn clear_connections(
    State(state): State<AppState>,
    Path(name): Path<String>,
) -> ApiResult<Json<ClearedConnections>> {
    let removed = state
        .store
        .with_project_mut(&name, |project, _| Ok(project.clear_connections()))?;
    Ok(Json(ClearedConnections { removed }))
}

#[utoipa::path(
    delete,
    path = "/v1/projects/{name}/connections/{id}",
    tag = "projects",
    params(
        ("name" = String, Path, description = "Project name"),
        ("id" = String, Path, description = "Connection id")
    ),
    responses(
        (status = 200, description = "Removed connection", body = Connection),
        (status = 404, description = "Unknown connection")
    )
)]
pub async fn delete_connection(
    State(state): State<AppState>,
    Path((name, id)): Path<(String, String)>,
) -> ApiResult<Json<Connection>> {
    let connection = state
        .store
        .with_project_mut(&name, |project, _| project.remove_connection(&id))?;
    Ok(Json(connection))
}
