use axum::body::Body;
use axum::http::{Request, StatusCode};
use axum::Router;
use http_body_util::BodyExt;
use metahub_core::Analyzer;
use metahub_server::{build_app, AppConfig};
use serde_json::Value;
use std::fs;
use std::path::Path;
use tempfile::tempdir;
use tower::ServiceExt;

fn write_tiny_catalog(dir: &Path) {
    fs::write(
        dir.join("sales.json"),
        r#"[
            {"name": "orders", "comments": "customer purchase records",
             "columns": [{"name": "total", "comments": "order total amount", "type": "decimal"}]},
            {"name": "refunds", "comments": "returned purchases",
             "columns": [{"name": "amount", "comments": "refunded amount", "type": "decimal"}]}
        ]"#,
    )
    .unwrap();
    fs::write(dir.join("hr.jsonl"), "{\"name\": \"employees\", \"comments\": \"staff directory\"}\n").unwrap();
}

fn config(dir: &Path, admin_token: Option<&str>) -> AppConfig {
    AppConfig {
        config_directory: dir.to_path_buf(),
        analyzer: Analyzer::default(),
        max_page_size: 100,
        admin_token: admin_token.map(str::to_string),
        cors_allow_origin: None,
    }
}

async fn send(app: Router, req: Request<Body>) -> (StatusCode, Value) {
    let resp = app.oneshot(req).await.unwrap();
    let status = resp.status();
    let body = resp.into_body().collect().await.unwrap().to_bytes();
    let json = serde_json::from_slice(&body).unwrap_or(Value::Null);
    (status, json)
}

async fn get(app: Router, uri: &str) -> (StatusCode, Value) {
    send(app, Request::get(uri).body(Body::empty()).unwrap()).await
}

#[tokio::test]
async fn search_tables_returns_hydrated_hits() {
    let dir = tempdir().unwrap();
    write_tiny_catalog(dir.path());
    let app = build_app(config(dir.path(), None));

    let (status, json) = get(app, "/api/search-tables?q=purchase").await;
    assert_eq!(status, StatusCode::OK);
    let data = &json["data"];
    assert_eq!(data["total"], 2);
    let hits = data["hits"].as_array().unwrap();
    let ids: Vec<&str> = hits.iter().map(|h| h["id"].as_str().unwrap()).collect();
    assert!(ids.contains(&"sales/orders"));
    assert!(ids.contains(&"sales/refunds"));
    assert_eq!(hits[0]["fields"]["datasetName"], "sales");
}

#[tokio::test]
async fn search_columns_paginates() {
    let dir = tempdir().unwrap();
    write_tiny_catalog(dir.path());
    let app = build_app(config(dir.path(), None));

    let (status, json) = get(app.clone(), "/api/search-columns?q=amount&from=0&size=1").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(json["data"]["total"], 2);
    let first = json["data"]["hits"].as_array().unwrap();
    assert_eq!(first.len(), 1);

    let (_, json) = get(app, "/api/search-columns?q=amount&from=1&size=1").await;
    let second = json["data"]["hits"].as_array().unwrap();
    assert_eq!(second.len(), 1);
    assert_ne!(first[0]["id"], second[0]["id"]);
    assert!(second[0]["fields"]["tableName"].is_string());
}

#[tokio::test]
async fn empty_query_and_bad_pagination() {
    let dir = tempdir().unwrap();
    write_tiny_catalog(dir.path());
    let app = build_app(config(dir.path(), None));

    let (status, json) = get(app.clone(), "/api/search-tables?q=").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(json["data"]["total"], 0);

    let (status, _) = get(app.clone(), "/api/search-tables?q=orders&from=-1").await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    let (status, _) = get(app.clone(), "/api/search-tables?q=orders&size=0").await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    let (status, _) = get(app.clone(), "/api/search-tables?q=orders&fields=body").await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    for uri in ["/api/search-tables?q=orders&from=abc", "/api/search-columns?q=orders&size=ten"] {
        let (status, json) = get(app.clone(), uri).await;
        assert_eq!(status, StatusCode::BAD_REQUEST, "{uri}");
        assert!(json["message"].is_string(), "{uri}: {json}");
    }
}

#[tokio::test]
async fn field_scoping_and_operator_params() {
    let dir = tempdir().unwrap();
    write_tiny_catalog(dir.path());
    let mut cfg = config(dir.path(), None);
    cfg.analyzer = Analyzer::word();
    let app = build_app(cfg);

    let (_, json) = get(app.clone(), "/api/search-tables?q=staff&fields=name").await;
    assert_eq!(json["data"]["total"], 0);
    let (_, json) = get(app.clone(), "/api/search-tables?q=staff&fields=name,comments").await;
    assert_eq!(json["data"]["hits"][0]["id"], "hr/employees");
    let (_, json) = get(app, "/api/search-tables?q=staff%20orders&operator=or").await;
    assert_eq!(json["data"]["total"], 2);
}

#[tokio::test]
async fn listing_endpoints() {
    let dir = tempdir().unwrap();
    write_tiny_catalog(dir.path());
    let app = build_app(config(dir.path(), None));

    let (status, json) = get(app.clone(), "/api/datasets").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(json["data"], serde_json::json!(["hr", "sales"]));

    let (_, json) = get(app.clone(), "/api/datasets/sales").await;
    assert_eq!(json["data"]["tables"], serde_json::json!(["orders", "refunds"]));

    let (status, json) = get(app.clone(), "/api/datasets/sales/tables/orders").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(json["data"]["id"], "sales/orders");
    assert_eq!(json["data"]["columns"][0]["id"], "sales/orders/total");
    assert_eq!(json["data"]["columns"][0]["type"], "decimal");

    let (status, _) = get(app.clone(), "/api/datasets/nope").await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    let (status, _) = get(app.clone(), "/api/datasets/sales/tables/nope").await;
    assert_eq!(status, StatusCode::NOT_FOUND);

    let (status, json) = get(app, "/api/ping").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(json["message"], "pong");
}

#[tokio::test]
async fn missing_catalog_serves_not_ready_until_reload() {
    let dir = tempdir().unwrap();
    let catalog_dir = dir.path().join("catalog");
    let app = build_app(config(&catalog_dir, Some("secret")));

    let (status, _) = get(app.clone(), "/api/search-tables?q=orders").await;
    assert_eq!(status, StatusCode::SERVICE_UNAVAILABLE);
    let (status, _) = get(app.clone(), "/api/datasets").await;
    assert_eq!(status, StatusCode::SERVICE_UNAVAILABLE);

    fs::create_dir_all(&catalog_dir).unwrap();
    write_tiny_catalog(&catalog_dir);
    let reload = Request::post("/api/admin/reload").header("X-ADMIN-TOKEN", "secret").body(Body::empty()).unwrap();
    let (status, json) = send(app.clone(), reload).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(json["data"]["version"], 1);
    assert_eq!(json["data"]["tables"], 3);

    let (status, json) = get(app, "/api/search-tables?q=orders").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(json["data"]["hits"][0]["id"], "sales/orders");
}

#[tokio::test]
async fn reload_requires_the_admin_token() {
    let dir = tempdir().unwrap();
    write_tiny_catalog(dir.path());

    let app = build_app(config(dir.path(), Some("secret")));
    let wrong = Request::post("/api/admin/reload").header("X-ADMIN-TOKEN", "guess").body(Body::empty()).unwrap();
    let (status, _) = send(app.clone(), wrong).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);

    let unconfigured = build_app(config(dir.path(), None));
    let req = Request::post("/api/admin/reload").body(Body::empty()).unwrap();
    let (status, _) = send(unconfigured, req).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn failed_reload_keeps_serving_the_previous_snapshot() {
    let dir = tempdir().unwrap();
    write_tiny_catalog(dir.path());
    let app = build_app(config(dir.path(), Some("secret")));

    fs::write(dir.path().join("broken.json"), "{not json").unwrap();
    let reload = Request::post("/api/admin/reload").header("X-ADMIN-TOKEN", "secret").body(Body::empty()).unwrap();
    let (status, json) = send(app.clone(), reload).await;
    assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
    assert!(json["message"].as_str().unwrap().contains("broken.json"));

    let (status, json) = get(app, "/api/search-tables?q=purchase").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(json["data"]["total"], 2);
}
