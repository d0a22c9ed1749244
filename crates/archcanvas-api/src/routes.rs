use crate::{
    health,
    rest::{library, projects, views, ApiDoc},
    AppState,
};
use axum::{
    routing::{delete, get, post, put},
    Json, Router,
};
use tower::ServiceBuilder;
use tower_http::{cors::CorsLayer, trace::TraceLayer};
use utoipa::OpenApi;

pub fn create_router(state: AppState) -> Router {
    health::mark_started();

    Router::new()
        .route("/health", get(health::health_check))
        .route(
            "/api-docs/openapi.json",
            get(|| async { Json(ApiDoc::openapi()) }),
        )
        // Libraries
        .route("/v1/risks", get(library::list_risks).post(library::create_risk))
        .route(
            "/v1/risks/{id}",
            get(library::get_risk)
                .put(library::update_risk)
                .delete(library::delete_risk),
        )
        .route(
            "/v1/mitigations",
            get(library::list_mitigations).post(library::create_mitigation),
        )
        .route(
            "/v1/mitigations/{id}",
            get(library::get_mitigation)
                .put(library::update_mitigation)
                .delete(library::delete_mitigation),
        )
        .route("/v1/mappings", get(library::get_mappings))
        // Projects and session
        .route(
            "/v1/projects",
            get(projects::list_projects).post(projects::create_project),
        )
        .route(
            "/v1/projects/{name}",
            get(projects::get_project).delete(projects::delete_project),
        )
        .route("/v1/projects/{name}/status", put(projects::set_status))
        .route(
            "/v1/session/current",
            get(projects::get_current).put(projects::select_current),
        )
        // Domain buckets
        .route(
            "/v1/projects/{name}/domains/{domain}",
            get(projects::get_domain),
        )
        .route(
            "/v1/projects/{name}/domains/{domain}/elements",
            post(projects::add_element),
        )
        .route(
            "/v1/projects/{name}/domains/{domain}/elements/{element}",
            delete(projects::remove_element),
        )
        .route(
            "/v1/projects/{name}/domains/{domain}/risks",
            put(projects::assign_risks),
        )
        .route(
            "/v1/projects/{name}/domains/{domain}/mitigations",
            put(projects::assign_mitigations),
        )
        // Connections
        .route(
            "/v1/projects/{name}/connections",
            get(projects::list_connections)
                .post(projects::create_connection)
                .delete(projects::clear_connections),
        )
        .route(
            "/v1/projects/{name}/connections/{id}",
            delete(projects::delete_connection),
        )
        // Views
        .route("/v1/projects/{name}/canvas", get(views::get_canvas))
        .route("/v1/projects/{name}/canvas/svg", get(views::get_canvas_svg))
        .route("/v1/projects/{name}/summary", get(views::get_summary))
        .route("/v1/projects/{name}/completion", get(views::get_completion))
        .route("/v1/projects/{name}/export", get(views::get_export))
        .with_state(state)
        .layer(
            ServiceBuilder::new().layer(TraceLayer::new_for_http()).layer(
                CorsLayer::new()
                    .allow_origin(tower_http::cors::Any)
                    .allow_methods(tower_http::cors::Any)
                    .allow_headers(tower_http::cors::Any),
            ),
        )
}
