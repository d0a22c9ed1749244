use crate::AppState;
use axum::{extract::State, Json};
use serde::Serialize;
use std::time::SystemTime;
use utoipa::ToSchema;

#[derive(Serialize, Debug, ToSchema)]
pub struct HealthResponse {
    pub status: String,
    pub version: String,
    pub uptime_seconds: u64,
    pub projects: usize,
    pub risks: usize,
    pub mitigations: usize,
}

lazy_static::lazy_static! {
    static ref START_TIME: SystemTime = SystemTime::now();
}

/// Pins the uptime origin; called once when the router is built.
pub(crate) fn mark_started() {
    lazy_static::initialize(&START_TIME);
}

#[utoipa::path(
    get,
    path = "/health",
    tag = "health",
    responses((status = 200, description = "Service is up", body = HealthResponse))
)]
pub async fn health_check(State(state): State<AppState>) -> Json<HealthResponse> {
    let uptime = START_TIME.elapsed().unwrap_or_default().as_secs();
    let (risks, mitigations) = state
        .store
        .read_library(|lib| (lib.risk_count(), lib.mitigation_count()));

    Json(HealthResponse {
        status: "healthy".to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
        uptime_seconds: uptime,
        projects: state.store.list_projects().len(),
        risks,
        mitigations,
    })
}
