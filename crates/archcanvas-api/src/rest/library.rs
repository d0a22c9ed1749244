use super::cache_headers;
use crate::{ApiJson, ApiQuery, ApiResult, AppState};
use archcanvas_core::{
    CanvasError, Cost, Domain, Effectiveness, Impact, MappingOverview, Mitigation,
    MitigationDraft, MitigationFilter, MitigationPatch, MitigationType, Risk, RiskCategory,
    RiskDraft, RiskFilter, RiskPatch,
};
use axum::{
    extract::{Path, State},
    http::{HeaderMap, StatusCode},
    Json,
};
use serde::{Deserialize, Serialize};
use utoipa::{IntoParams, ToSchema};

// -------- Risks --------

#[derive(Debug, Default, Deserialize, IntoParams)]
#[into_params(parameter_in = Query)]
pub struct RiskQuery {
    /// Only risks with this impact
    pub impact: Option<Impact>,
    /// Only risks whose primary domain is this
    pub domain: Option<Domain>,
    pub category: Option<RiskCategory>,
}

impl From<RiskQuery> for RiskFilter {
    fn from(q: RiskQuery) -> Self {
        RiskFilter {
            impact: q.impact,
            domain: q.domain,
            category: q.category,
        }
    }
}

#[derive(Serialize, ToSchema)]
pub struct StoredRisk {
    pub risk: Risk,
    pub replaced: bool,
}

/// List the risk library
#[utoipa::path(
    get,
    path = "/v1/risks",
    tag = "library",
    params(RiskQuery),
    responses((status = 200, description = "Matching risks", body = [Risk]))
)]
pub async fn list_risks(
    State(state): State<AppState>,
    ApiQuery(query): ApiQuery<RiskQuery>,
) -> Json<Vec<Risk>> {
    let filter = RiskFilter::from(query);
    Json(state.store.read_library(|lib| lib.filter_risks(&filter)))
}

/// Add a risk, replacing any risk with the same id
#[utoipa::path(
    post,
    path = "/v1/risks",
    tag = "library",
    request_body = RiskDraft,
    responses(
        (status = 201, description = "Risk stored", body = StoredRisk),
        (status = 400, description = "Missing id or description")
    )
)]
pub async fn create_risk(
    State(state): State<AppState>,
    ApiJson(draft): ApiJson<RiskDraft>,
) -> ApiResult<(StatusCode, Json<StoredRisk>)> {
    let (risk, replaced) = state.store.write_library(|lib| lib.upsert_risk(draft))?;
    Ok((StatusCode::CREATED, Json(StoredRisk { risk, replaced })))
}

#[utoipa::path(
    get,
    path = "/v1/risks/{id}",
    tag = "library",
    params(("id" = String, Path, description = "Risk id")),
    responses(
        (status = 200, description = "Risk", body = Risk),
        (status = 404, description = "Unknown risk")
    )
)]
pub async fn get_risk(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> ApiResult<Json<Risk>> {
    let risk = state
        .store
        .read_library(|lib| lib.risk(&id).cloned())
        .ok_or_else(|| CanvasError::not_found("Risk", &id))?;
    Ok(Json(risk))
}

#[utoipa::path(
    put,
    path = "/v1/risks/{id}",
    tag = "library",
    params(("id" = String, Path, description = "Risk id")),
    request_body = RiskPatch,
    responses(
        (status = 200, description = "Updated risk", body = Risk),
        (status = 404, description = "Unknown risk")
    )
)]
pub async fn update_risk(
    State(state): State<AppState>,
    Path(id): Path<String>,
    ApiJson(patch): ApiJson<RiskPatch>,
) -> ApiResult<Json<Risk>> {
    let risk = state.store.write_library(|lib| lib.update_risk(&id, patch))?;
    Ok(Json(risk))
}

/// Delete a risk that no mitigation maps to
#[utoipa::path(
    delete,
    path = "/v1/risks/{id}",
    tag = "library",
    params(("id" = String, Path, description = "Risk id")),
    responses(
        (status = 200, description = "Deleted risk", body = Risk),
        (status = 404, description = "Unknown risk"),
        (status = 409, description = "Risk is mapped by mitigations")
    )
)]
pub async fn delete_risk(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> ApiResult<Json<Risk>> {
    let risk = state.store.write_library(|lib| lib.delete_risk(&id))?;
    Ok(Json(risk))
}

// -------- Mitigations --------

#[derive(Debug, Default, Deserialize, IntoParams)]
#[into_params(parameter_in = Query)]
pub struct MitigationQuery {
    pub effectiveness: Option<Effectiveness>,
    pub cost: Option<Cost>,
    #[serde(rename = "type")]
    pub mitigation_type: Option<MitigationType>,
}

impl From<MitigationQuery> for MitigationFilter {
    fn from(q: MitigationQuery) -> Self {
        MitigationFilter {
            effectiveness: q.effectiveness,
            cost: q.cost,
            mitigation_type: q.mitigation_type,
        }
    }
}

#[derive(Serialize, ToSchema)]
pub struct StoredMitigation {
    pub mitigation: Mitigation,
    pub replaced: bool,
}

#[utoipa::path(
    get,
    path = "/v1/mitigations",
    tag = "library",
    params(MitigationQuery),
    responses((status = 200, description = "Matching mitigations", body = [Mitigation]))
)]
pub async fn list_mitigations(
    State(state): State<AppState>,
    ApiQuery(query): ApiQuery<MitigationQuery>,
) -> Json<Vec<Mitigation>> {
    let filter = MitigationFilter::from(query);
    Json(state.store.read_library(|lib| lib.filter_mitigations(&filter)))
}

/// Add a mitigation; every mapped risk must already exist
#[utoipa::path(
    post,
    path = "/v1/mitigations",
    tag = "library",
    request_body = MitigationDraft,
    responses(
        (status = 201, description = "Mitigation stored", body = StoredMitigation),
        (status = 400, description = "Missing fields or unknown mapped risk")
    )
)]
pub async fn create_mitigation(
    State(state): State<AppState>,
    ApiJson(draft): ApiJson<MitigationDraft>,
) -> ApiResult<(StatusCode, Json<StoredMitigation>)> {
    let (mitigation, replaced) = state
        .store
        .write_library(|lib| lib.upsert_mitigation(draft))?;
    Ok((
        StatusCode::CREATED,
        Json(StoredMitigation {
            mitigation,
            replaced,
        }),
    ))
}

#[utoipa::path(
    get,
    path = "/v1/mitigations/{id}",
    tag = "library",
    params(("id" = String, Path, description = "Mitigation id")),
    responses(
        (status = 200, description = "Mitigation", body = Mitigation),
        (status = 404, description = "Unknown mitigation")
    )
)]
pub async fn get_mitigation(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> ApiResult<Json<Mitigation>> {
    let mitigation = state
        .store
        .read_library(|lib| lib.mitigation(&id).cloned())
        .ok_or_else(|| CanvasError::not_found("Mitigation", &id))?;
    Ok(Json(mitigation))
}

#[utoipa::path(
    put,
    path = "/v1/mitigations/{id}",
    tag = "library",
    params(("id" = String, Path, description = "Mitigation id")),
    request_body = MitigationPatch,
    responses(
        (status = 200, description = "Updated mitigation", body = Mitigation),
        (status = 400, description = "Unknown mapped risk"),
        (status = 404, description = "Unknown mitigation")
    )
)]
pub async fn update_mitigation(
    State(state): State<AppState>,
    Path(id): Path<String>,
    ApiJson(patch): ApiJson<MitigationPatch>,
) -> ApiResult<Json<Mitigation>> {
    let mitigation = state
        .store
        .write_library(|lib| lib.update_mitigation(&id, patch))?;
    Ok(Json(mitigation))
}

#[utoipa::path(
    delete,
    path = "/v1/mitigations/{id}",
    tag = "library",
    params(("id" = String, Path, description = "Mitigation id")),
    responses(
        (status = 200, description = "Deleted mitigation", body = Mitigation),
        (status = 404, description = "Unknown mitigation")
    )
)]
pub async fn delete_mitigation(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> ApiResult<Json<Mitigation>> {
    let mitigation = state
        .store
        .write_library(|lib| lib.delete_mitigation(&id))?;
    Ok(Json(mitigation))
}

// -------- Mapping overview --------

/// Risk/mitigation pairs across the whole library
#[utoipa::path(
    get,
    path = "/v1/mappings",
    tag = "library",
    responses((status = 200, description = "Mapping overview", body = MappingOverview))
)]
pub async fn get_mappings(State(state): State<AppState>) -> (HeaderMap, Json<MappingOverview>) {
    let overview = state.store.read_library(|lib| lib.mapping_overview());
    (cache_headers(&overview), Json(overview))
}
