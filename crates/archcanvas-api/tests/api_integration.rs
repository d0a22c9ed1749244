use archcanvas_api::{create_router, AppState};
use archcanvas_core::{ConfigManager, Settings};
use axum::http::StatusCode;
use axum_test::TestServer;
use serde_json::{json, Value};
use std::sync::Arc;

fn test_server() -> TestServer {
    let config = Arc::new(ConfigManager::from_settings(Settings::default()).expect("config"));
    let app = create_router(AppState::new(config));
    TestServer::new(app).unwrap()
}

async fn create_payments(server: &TestServer) {
    let resp = server
        .post("/v1/projects")
        .json(&json!({"name": "Payments", "owner": "platform-team"}))
        .await;
    assert_eq!(resp.status_code(), StatusCode::CREATED);
}

#[tokio::test]
async fn health_reports_seeded_library() {
    let server = test_server();
    let resp = server.get("/health").await;
    assert_eq!(resp.status_code(), 200);
    let body: Value = resp.json();
    assert_eq!(body["status"], "healthy");
    assert_eq!(body["risks"], 5);
    assert_eq!(body["mitigations"], 5);
    assert_eq!(body["projects"], 0);
}

#[tokio::test]
async fn openapi_document_is_served() {
    let server = test_server();
    let resp = server.get("/api-docs/openapi.json").await;
    assert_eq!(resp.status_code(), 200);
    let body: Value = resp.json();
    assert!(body["paths"]["/v1/projects/{name}/summary"].is_object());
}

#[tokio::test]
async fn risk_library_crud_and_filters() {
    let server = test_server();

    let resp = server.get("/v1/risks").add_query_param("impact", "High").await;
    let risks: Vec<Value> = resp.json();
    assert_eq!(risks.len(), 3);

    let resp = server
        .post("/v1/risks")
        .json(&json!({"id": "ADV006", "description": "Insider data theft", "impact": "Critical", "category": "Technical"}))
        .await;
    assert_eq!(resp.status_code(), StatusCode::CREATED);
    let body: Value = resp.json();
    assert_eq!(body["replaced"], false);

    let resp = server
        .put("/v1/risks/ADV006")
        .json(&json!({"impact": "Low"}))
        .await;
    assert_eq!(resp.status_code(), 200);
    let body: Value = resp.json();
    assert_eq!(body["impact"], "Low");
    assert_eq!(body["description"], "Insider data theft");

    let resp = server.delete("/v1/risks/ADV006").await;
    assert_eq!(resp.status_code(), 200);

    let resp = server.get("/v1/risks/ADV006").await;
    assert_eq!(resp.status_code(), StatusCode::NOT_FOUND);
    let body: Value = resp.json();
    assert_eq!(body["status"], 404);
    assert!(body["error"].as_str().unwrap().contains("ADV006"));
}

#[tokio::test]
async fn mapped_risk_cannot_be_deleted() {
    let server = test_server();
    let resp = server.delete("/v1/risks/ADV001").await;
    assert_eq!(resp.status_code(), StatusCode::CONFLICT);

    let resp = server.delete("/v1/mitigations/MIT001").await;
    assert_eq!(resp.status_code(), 200);
    let resp = server.delete("/v1/risks/ADV001").await;
    assert_eq!(resp.status_code(), 200);
}

#[tokio::test]
async fn mitigation_with_unknown_risk_is_rejected() {
    let server = test_server();
    let resp = server
        .post("/v1/mitigations")
        .json(&json!({
            "id": "MIT006",
            "description": "Vendor review",
            "effectiveness": "Medium",
            "cost": "Low",
            "mapped_risks": ["ADV999"]
        }))
        .await;
    assert_eq!(resp.status_code(), StatusCode::BAD_REQUEST);

    let resp = server.get("/v1/mitigations").add_query_param("cost", "Low").await;
    let list: Vec<Value> = resp.json();
    assert_eq!(list.len(), 1);
    assert_eq!(list[0]["id"], "MIT005");
}

#[tokio::test]
async fn mappings_overview_has_etag() {
    let server = test_server();
    let resp = server.get("/v1/mappings").await;
    assert_eq!(resp.status_code(), 200);
    assert!(resp.headers().get("etag").is_some());
    let body: Value = resp.json();
    assert_eq!(body["total_mappings"], 5);
    assert_eq!(body["coverage_percentage"], 100.0);
}

#[tokio::test]
async fn project_lifecycle_and_session() {
    let server = test_server();
    let resp = server.get("/v1/session/current").await;
    assert_eq!(resp.status_code(), StatusCode::NOT_FOUND);

    create_payments(&server).await;
    let resp = server
        .post("/v1/projects")
        .json(&json!({"name": "Payments"}))
        .await;
    assert_eq!(resp.status_code(), StatusCode::CONFLICT);

    let resp = server.get("/v1/session/current").await;
    let body: Value = resp.json();
    assert_eq!(body["name"], "Payments");
    assert_eq!(body["status"], "Open");

    let resp = server
        .put("/v1/projects/Payments/status")
        .json(&json!({"status": "In Progress"}))
        .await;
    let body: Value = resp.json();
    assert_eq!(body["status"], "In Progress");

    let resp = server.delete("/v1/projects/Payments").await;
    assert_eq!(resp.status_code(), 200);
    let resp = server.get("/v1/session/current").await;
    assert_eq!(resp.status_code(), StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn building_a_canvas_end_to_end() {
    let server = test_server();
    create_payments(&server).await;

    let resp = server
        .post("/v1/projects/Payments/domains/network/elements")
        .json(&json!({"element": "Edge firewall"}))
        .await;
    assert_eq!(resp.status_code(), StatusCode::CREATED);
    let resp = server
        .post("/v1/projects/Payments/domains/Network/elements")
        .json(&json!({"element": "Edge firewall"}))
        .await;
    assert_eq!(resp.status_code(), StatusCode::OK);
    let body: Value = resp.json();
    assert_eq!(body["added"], false);

    let resp = server
        .put("/v1/projects/Payments/domains/Data/risks")
        .json(&json!({"ids": ["ADV002", "ADV003"]}))
        .await;
    assert_eq!(resp.status_code(), 200);
    let resp = server
        .put("/v1/projects/Payments/domains/Network/mitigations")
        .json(&json!({"ids": ["MIT003"]}))
        .await;
    assert_eq!(resp.status_code(), 200);

    let resp = server
        .post("/v1/projects/Payments/connections")
        .json(&json!({"source": "Network", "target": "Data", "type": "connects"}))
        .await;
    assert_eq!(resp.status_code(), StatusCode::CREATED);
    let connection: Value = resp.json();
    assert_eq!(connection["id"], "Network-Data-0");

    let resp = server.get("/v1/projects/Payments/domains/data").await;
    let view: Value = resp.json();
    assert_eq!(view["risk_ids"], json!(["ADV002", "ADV003"]));
    assert_eq!(view["connections"][0]["direction"], "incoming");

    let resp = server.get("/v1/projects/Payments/completion").await;
    let body: Value = resp.json();
    assert_eq!(body["score"], 20);

    let resp = server.get("/v1/projects/Payments/summary").await;
    assert!(resp.headers().get("etag").is_some());
    let summary: Value = resp.json();
    assert_eq!(summary["coverage"]["coverage_percentage"], 50.0);
    assert_eq!(summary["coverage"]["uncovered_risk_details"][0]["id"], "ADV002");

    let resp = server.get("/v1/projects/Payments/canvas").await;
    let canvas: Value = resp.json();
    assert_eq!(canvas["edges"].as_array().unwrap().len(), 1);

    let resp = server.get("/v1/projects/Payments/canvas/svg").await;
    let ct = resp
        .headers()
        .get("content-type")
        .and_then(|v| v.to_str().ok())
        .unwrap_or("")
        .to_string();
    assert_eq!(ct, "image/svg+xml");
    assert!(resp.text().starts_with("<svg"));

    let resp = server.get("/v1/projects/Payments/export").await;
    let disposition = resp
        .headers()
        .get("content-disposition")
        .and_then(|v| v.to_str().ok())
        .unwrap_or("")
        .to_string();
    assert!(disposition.starts_with("attachment"));
    let export: Value = resp.json();
    assert_eq!(export["project"]["name"], "Payments");

    let resp = server
        .delete("/v1/projects/Payments/connections/Network-Data-0")
        .await;
    assert_eq!(resp.status_code(), 200);
    let resp = server.delete("/v1/projects/Payments/connections").await;
    let body: Value = resp.json();
    assert_eq!(body["removed"], 0);
}

#[tokio::test]
async fn invalid_inputs_map_to_client_errors() {
    let server = test_server();
    create_payments(&server).await;

    let resp = server.get("/v1/projects/Payments/domains/Moon").await;
    assert_eq!(resp.status_code(), StatusCode::BAD_REQUEST);

    let resp = server
        .post("/v1/projects/Payments/connections")
        .json(&json!({"source": "Data", "target": "Data", "type": "uses"}))
        .await;
    assert_eq!(resp.status_code(), StatusCode::BAD_REQUEST);

    let resp = server
        .put("/v1/projects/Payments/domains/Data/risks")
        .json(&json!({"ids": ["ADV404"]}))
        .await;
    assert_eq!(resp.status_code(), StatusCode::BAD_REQUEST);

    let resp = server.get("/v1/projects/Nope/summary").await;
    assert_eq!(resp.status_code(), StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn malformed_bodies_and_queries_get_json_errors() {
    let server = test_server();

    let resp = server
        .post("/v1/risks")
        .json(&json!({"id": "ADV007", "description": "Solar flare", "impact": "Galactic"}))
        .await;
    assert_eq!(resp.status_code(), StatusCode::BAD_REQUEST);
    let body: Value = resp.json();
    assert_eq!(body["status"], 400);
    assert!(body["error"].as_str().unwrap().contains("Galactic"));

    let resp = server.get("/v1/risks").add_query_param("impact", "Galactic").await;
    assert_eq!(resp.status_code(), StatusCode::BAD_REQUEST);
    let body: Value = resp.json();
    assert_eq!(body["status"], 400);

    let resp = server
        .post("/v1/projects")
        .text("{not json")
        .await;
    assert_eq!(resp.status_code(), StatusCode::BAD_REQUEST);
    let body: Value = resp.json();
    assert_eq!(body["status"], 400);
}

#[tokio::test]
async fn labels_are_case_insensitive_in_bodies_and_filters() {
    let server = test_server();
    create_payments(&server).await;

    let resp = server.get("/v1/risks").add_query_param("domain", "people").await;
    assert_eq!(resp.status_code(), 200);
    let risks: Vec<Value> = resp.json();
    assert_eq!(risks.len(), 1);
    assert_eq!(risks[0]["id"], "ADV005");

    let resp = server
        .post("/v1/projects/Payments/connections")
        .json(&json!({"source": "people", "target": "DATA", "type": "<<Uses>>"}))
        .await;
    assert_eq!(resp.status_code(), StatusCode::CREATED);
    let connection: Value = resp.json();
    assert_eq!(connection["source"], "People");
    assert_eq!(connection["type"], "uses");

    let resp = server
        .put("/v1/projects/Payments/status")
        .json(&json!({"status": "in progress"}))
        .await;
    let body: Value = resp.json();
    assert_eq!(body["status"], "In Progress");
}

#[tokio::test]
async fn domain_view_resolves_tags_and_connections_preview_risks() {
    let server = test_server();
    create_payments(&server).await;

    server
        .post("/v1/risks")
        .json(&json!({"id": "TMP1", "description": "Short lived", "impact": "Low"}))
        .await;
    let resp = server
        .put("/v1/projects/Payments/domains/Services/risks")
        .json(&json!({"ids": ["ADV001", "TMP1"]}))
        .await;
    assert_eq!(resp.status_code(), 200);
    server
        .put("/v1/projects/Payments/domains/Services/mitigations")
        .json(&json!({"ids": ["MIT003"]}))
        .await;
    server.delete("/v1/risks/TMP1").await;

    let resp = server.get("/v1/projects/Payments/domains/services").await;
    let view: Value = resp.json();
    assert_eq!(view["risk_ids"], json!(["ADV001", "TMP1"]));
    assert_eq!(view["risks"][0]["label"], "ADV001 (High)");
    assert_eq!(view["risks"][1]["impact"], Value::Null);
    assert_eq!(view["risks"][1]["label"], "TMP1 (Unknown)");
    assert_eq!(view["mitigations"][0]["label"], "MIT003 (Medium)");

    let resp = server
        .post("/v1/projects/Payments/connections")
        .json(&json!({"source": "Services", "target": "Data", "type": "connects", "risk_id": "ADV001"}))
        .await;
    assert_eq!(resp.status_code(), StatusCode::CREATED);
    let resp = server.get("/v1/projects/Payments/connections").await;
    let list: Vec<Value> = resp.json();
    assert_eq!(list[0]["id"], "Services-Data-0");
    assert!(list[0]["risk_description"].as_str().unwrap().ends_with("..."));
}

#[tokio::test]
async fn padded_element_names_round_trip() {
    let server = test_server();
    create_payments(&server).await;

    let resp = server
        .post("/v1/projects/Payments/domains/Data/elements")
        .json(&json!({"element": " DB "}))
        .await;
    assert_eq!(resp.status_code(), StatusCode::CREATED);
    let resp = server
        .delete("/v1/projects/Payments/domains/Data/elements/%20DB%20")
        .await;
    assert_eq!(resp.status_code(), 200);
}

#[tokio::test]
async fn export_filename_with_quote_stays_well_formed() {
    let server = test_server();
    let resp = server
        .post("/v1/projects")
        .json(&json!({"name": "Q\"1"}))
        .await;
    assert_eq!(resp.status_code(), StatusCode::CREATED);

    let resp = server.get("/v1/projects/Q%221/export").await;
    assert_eq!(resp.status_code(), 200);
    let disposition = resp
        .headers()
        .get("content-disposition")
        .and_then(|v| v.to_str().ok())
        .unwrap_or("")
        .to_string();
    assert_eq!(disposition, "attachment; filename=\"Q_1_export.json\"");
}
