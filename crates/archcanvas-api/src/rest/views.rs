use super::cache_headers;
use crate::{ApiQuery, ApiResult, AppState};
use archcanvas_core::{
    completion_score, layout, project_summary, render_svg, CanvasLayout, ExportDocument,
    ProjectSummary,
};
use axum::{
    extract::{Path, State},
    http::{
        header::{CONTENT_DISPOSITION, CONTENT_TYPE},
        HeaderMap, HeaderValue,
    },
    Json,
};
use serde::{Deserialize, Serialize};
use tracing::debug;
use utoipa::{IntoParams, ToSchema};

#[derive(Debug, Default, Deserialize, IntoParams)]
#[into_params(parameter_in = Query)]
pub struct CanvasQuery {
    /// Overrides the configured `canvas.show_details`
    pub show_details: Option<bool>,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct Completion {
    pub project: String,
    /// 0-100
    pub score: u32,
}

/// Quoted-string filename; characters that would end or corrupt the
/// header value become `_`.
fn attachment_disposition(file_name: &str) -> String {
    let safe: String = file_name
        .chars()
        .map(|c| match c {
            '"' | '\\' => '_',
            c if c.is_ascii_control() || !c.is_ascii() => '_',
            c => c,
        })
        .collect();
    format!("attachment; filename=\"{safe}\"")
}

fn build_layout(state: &AppState, name: &str, query: CanvasQuery) -> ApiResult<CanvasLayout> {
    let mut options = state.canvas_options();
    if let Some(show) = query.show_details {
        options.show_details = show;
    }
    Ok(state
        .store
        .with_project(name, |project, _| layout(project, &options))?)
}

/// Node positions, sizes and edge styling for drawing the canvas
#[utoipa::path(
    get,
    path = "/v1/projects/{name}/canvas",
    tag = "views",
    params(("name" = String, Path, description = "Project name"), CanvasQuery),
    responses(
        (status = 200, description = "Canvas layout", body = CanvasLayout),
        (status = 404, description = "Unknown project")
    )
)]
pub async fn get_canvas(
    State(state): State<AppState>,
    Path(name): Path<String>,
    ApiQuery(query): ApiQuery<CanvasQuery>,
) -> ApiResult<(HeaderMap, Json<CanvasLayout>)> {
    let canvas = build_layout(&state, &name, query)?;
    debug!(project = %name, edges = canvas.edges.len(), "canvas layout");
    Ok((cache_headers(&canvas), Json(canvas)))
}

#[utoipa::path(
    get,
    path = "/v1/projects/{name}/canvas/svg",
    tag = "views",
    params(("name" = String, Path, description = "Project name"), CanvasQuery),
    responses(
        (status = 200, description = "Canvas as SVG", content_type = "image/svg+xml", body = String),
        (status = 404, description = "Unknown project")
    )
)]
pub async fn get_canvas_svg(
    State(state): State<AppState>,
    Path(name): Path<String>,
    ApiQuery(query): ApiQuery<CanvasQuery>,
) -> ApiResult<(HeaderMap, String)> {
    let canvas = build_layout(&state, &name, query)?;
    let mut headers = cache_headers(&canvas);
    headers.insert(CONTENT_TYPE, HeaderValue::from_static("image/svg+xml"));
    Ok((headers, render_svg(&canvas)))
}

#[utoipa::path(
    get,
    path = "/v1/projects/{name}/summary",
    tag = "views",
    params(("name" = String, Path, description = "Project name")),
    responses(
        (status = 200, description = "Counts, tables, distributions and coverage", body = ProjectSummary),
        (status = 404, description = "Unknown project")
    )
)]
pub async fn get_summary(
    State(state): State<AppState>,
    Path(name): Path<String>,
) -> ApiResult<(HeaderMap, Json<ProjectSummary>)> {
    let summary = state.store.with_project(&name, project_summary)?;
    Ok((cache_headers(&summary), Json(summary)))
}

#[utoipa::path(
    get,
    path = "/v1/projects/{name}/completion",
    tag = "views",
    params(("name" = String, Path, description = "Project name")),
    responses(
        (status = 200, description = "Completion score", body = Completion),
        (status = 404, description = "Unknown project")
    )
)]
pub async fn get_completion(
    State(state): State<AppState>,
    Path(name): Path<String>,
) -> ApiResult<Json<Completion>> {
    let score = state
        .store
        .with_project(&name, |project, _| completion_score(project))?;
    Ok(Json(Completion {
        project: name,
        score,
    }))
}

/// Download the project with its referenced library records
#[utoipa::path(
    get,
    path = "/v1/projects/{name}/export",
    tag = "views",
    params(("name" = String, Path, description = "Project name")),
    responses(
        (status = 200, description = "Export document as an attachment", body = ExportDocument),
        (status = 404, description = "Unknown project")
    )
)]
pub async fn get_export(
    State(state): State<AppState>,
    Path(name): Path<String>,
) -> ApiResult<(HeaderMap, Json<ExportDocument>)> {
    let (doc, file_name) = state.store.with_project(&name, |project, library| {
        (
            ExportDocument::new(project, library),
            project.export_file_name(),
        )
    })?;
    let mut headers = HeaderMap::new();
    if let Ok(val) = HeaderValue::from_str(&attachment_disposition(&file_name)) {
        headers.insert(CONTENT_DISPOSITION, val);
    }
    debug!(project = %name, file = %file_name, "export prepared");
    Ok((headers, Json(doc)))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn disposition_filename_is_sanitized() {
        assert_eq!(
            attachment_disposition("Q\"1_export.json"),
            "attachment; filename=\"Q_1_export.json\""
        );
        assert_eq!(
            attachment_disposition("a\\b\r\nc_é.json"),
            "attachment; filename=\"a_b__c__.json\""
        );
        assert!(HeaderValue::from_str(&attachment_disposition("x\ny")).is_ok());
    }
}
