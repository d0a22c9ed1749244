pub mod library;
pub mod projects;
pub mod views;

use crate::{ApiError, ApiResult};
use archcanvas_core::Domain;
use http::{
    header::{CACHE_CONTROL, ETAG},
    HeaderMap, HeaderValue,
};
use sha2::{Digest, Sha256};
use utoipa::OpenApi;

#[derive(OpenApi)]
#[openapi(
    paths(
        crate::health::health_check,
        library::list_risks,
        library::create_risk,
        library::get_risk,
        library::update_risk,
        library::delete_risk,
        library::list_mitigations,
        library::create_mitigation,
        library::get_mitigation,
        library::update_mitigation,
        library::delete_mitigation,
        library::get_mappings,
        projects::list_projects,
        projects::create_project,
        projects::get_project,
        projects::delete_project,
        projects::set_status,
        projects::get_current,
        projects::select_current,
        projects::get_domain,
        projects::add_element,
        projects::remove_element,
        projects::assign_risks,
        projects::assign_mitigations,
        projects::list_connections,
        projects::create_connection,
        projects::clear_connections,
        projects::delete_connection,
        views::get_canvas,
        views::get_canvas_svg,
        views::get_summary,
        views::get_completion,
        views::get_export,
    ),
    components(
        schemas(
            crate::health::HealthResponse,
            library::StoredRisk,
            library::StoredMitigation,
            projects::StatusUpdate,
            projects::SelectProject,
            projects::ElementRequest,
            projects::ElementAdded,
            projects::IdList,
            projects::DomainView,
            projects::ClearedConnections,
            archcanvas_core::RiskTag,
            archcanvas_core::MitigationTag,
            archcanvas_core::ConnectionDetail,
            views::Completion,
        )
    ),
    tags(
        (name = "health", description = "Liveness"),
        (name = "library", description = "Risk and mitigation libraries"),
        (name = "projects", description = "Projects, domain buckets and connections"),
        (name = "views", description = "Canvas, summary and export views")
    )
)]
pub struct ApiDoc;

/// ETag over the serialized payload. Views are derived from mutable state
/// so clients must revalidate.
pub(crate) fn cache_headers<T: serde::Serialize>(value: &T) -> HeaderMap {
    let bytes = serde_json::to_vec(value).unwrap_or_default();
    let hash = Sha256::digest(&bytes);
    let etag = format!("\"{:x}\"", hash);
    let mut headers = HeaderMap::new();
    headers.insert(CACHE_CONTROL, HeaderValue::from_static("no-cache"));
    if let Ok(val) = HeaderValue::from_str(&etag) {
        headers.insert(ETAG, val);
    }
    headers
}

/// Domain names in paths are matched case-insensitively.
pub(crate) fn parse_domain(raw: &str) -> ApiResult<Domain> {
    raw.parse::<Domain>()
        .map_err(|_| ApiError::BadRequest(format!("unknown domain: {raw}")))
}
