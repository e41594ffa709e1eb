use axum::{
    extract::{rejection::QueryRejection, Path, Query, State},
    http::{HeaderMap, StatusCode},
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use metahub_core::query::DEFAULT_PAGE_SIZE;
use metahub_core::{
    load_catalog_dir, Analyzer, Field, Operator, Page, ScoredHit, SearchEngine, SearchError, SearchRequest, SearchResult,
    SnapshotStats, Table,
};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::sync::Arc;
use tower_http::cors::{AllowOrigin, Any, CorsLayer};
use tower_http::trace::TraceLayer;

#[derive(Debug, Clone)]
pub struct AppConfig {
    pub config_directory: PathBuf,
    pub analyzer: Analyzer,
    /// Upper bound applied to the `size` query parameter.
    pub max_page_size: usize,
    pub admin_token: Option<String>,
    /// Comma-separated allowed origins; any origin when unset.
    pub cors_allow_origin: Option<String>,
}

impl AppConfig {
    /// Defaults plus `ADMIN_TOKEN` and `CORS_ALLOW_ORIGIN` from the environment.
    pub fn from_env(config_directory: impl Into<PathBuf>, analyzer: Analyzer) -> Self {
        Self {
            config_directory: config_directory.into(),
            analyzer,
            max_page_size: DEFAULT_PAGE_SIZE,
            admin_token: std::env::var("ADMIN_TOKEN").ok().filter(|t| !t.is_empty()),
            cors_allow_origin: std::env::var("CORS_ALLOW_ORIGIN").ok(),
        }
    }
}

#[derive(Clone)]
pub struct AppState {
    pub engine: Arc<SearchEngine>,
    pub config_directory: PathBuf,
    pub max_page_size: usize,
    pub admin_token: Option<String>,
}

#[derive(Deserialize)]
pub struct SearchParams {
    #[serde(default)]
    pub q: String,
    #[serde(default)]
    pub from: i64,
    pub size: Option<i64>,
    /// Comma-separated subset of name, comments, document.
    pub fields: Option<String>,
    /// `and` (default) or `or`.
    pub operator: Option<String>,
}

#[derive(Serialize)]
pub struct SearchResponse {
    pub query: String,
    pub total: usize,
    pub hits: Vec<ScoredHit>,
    pub took_s: f64,
}

#[derive(Serialize)]
pub struct TablesResponse {
    pub tables: Vec<String>,
}

#[derive(Serialize)]
pub struct Data<T> {
    pub data: T,
}

#[derive(Debug)]
pub enum ApiError {
    Search(SearchError),
    BadRequest(String),
    NotFound(String),
    Unauthorized(String),
    Internal(String),
}

impl From<SearchError> for ApiError {
    fn from(err: SearchError) -> Self {
        ApiError::Search(err)
    }
}

impl From<QueryRejection> for ApiError {
    fn from(rejection: QueryRejection) -> Self {
        ApiError::BadRequest(rejection.body_text())
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, message) = match self {
            ApiError::Search(err) => {
                let status = match err {
                    SearchError::IndexNotReady => StatusCode::SERVICE_UNAVAILABLE,
                    SearchError::InvalidPagination { .. } | SearchError::InvalidAnalyzer { .. } => StatusCode::BAD_REQUEST,
                    SearchError::IndexBuild { .. } => StatusCode::INTERNAL_SERVER_ERROR,
                };
                (status, err.to_string())
            }
            ApiError::BadRequest(m) => (StatusCode::BAD_REQUEST, m),
            ApiError::NotFound(m) => (StatusCode::NOT_FOUND, m),
            ApiError::Unauthorized(m) => (StatusCode::UNAUTHORIZED, m),
            ApiError::Internal(m) => (StatusCode::INTERNAL_SERVER_ERROR, m),
        };
        (status, Json(serde_json::json!({ "message": message }))).into_response()
    }
}

/// Load the catalog, build the first snapshot and assemble the router.
///
/// A catalog that fails to load is logged and the server starts without a
/// snapshot; searches answer 503 until `/api/admin/reload` succeeds.
pub fn build_app(config: AppConfig) -> Router {
    let engine = Arc::new(SearchEngine::new(config.analyzer));
    match load_catalog_dir(&config.config_directory) {
        Ok(datasets) => {
            if let Err(e) = engine.rebuild(datasets) {
                tracing::error!(error = %e, "initial index build failed");
            }
        }
        Err(e) => tracing::error!(error = %format!("{e:#}"), "failed to load catalog"),
    }
    let state = AppState {
        engine,
        config_directory: config.config_directory.clone(),
        max_page_size: config.max_page_size.max(1),
        admin_token: config.admin_token.clone(),
    };
    router(state).layer(cors_layer(config.cors_allow_origin.as_deref()))
}

pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(|| async { "ok" }))
        .route("/api/ping", get(|| async { Json(serde_json::json!({ "message": "pong" })) }))
        .route("/api/datasets", get(datasets_handler))
        .route("/api/datasets/:dataset_name", get(dataset_handler))
        .route("/api/datasets/:dataset_name/tables/:table_name", get(table_handler))
        .route("/api/search-tables", get(search_tables_handler))
        .route("/api/search-columns", get(search_columns_handler))
        .route("/api/admin/reload", post(reload_handler))
        .with_state(state)
        .layer(TraceLayer::new_for_http())
}

fn cors_layer(allow_origin: Option<&str>) -> CorsLayer {
    let origins: Vec<_> = allow_origin
        .unwrap_or_default()
        .split(',')
        .filter_map(|s| s.trim().parse().ok())
        .collect();
    if origins.is_empty() {
        CorsLayer::new().allow_origin(Any).allow_methods(Any).allow_headers(Any)
    } else {
        CorsLayer::new().allow_origin(AllowOrigin::list(origins)).allow_methods(Any).allow_headers(Any)
    }
}

pub async fn datasets_handler(State(state): State<AppState>) -> Result<Json<Data<Vec<String>>>, ApiError> {
    Ok(Json(Data { data: state.engine.dataset_names()? }))
}

pub async fn dataset_handler(
    State(state): State<AppState>,
    Path(dataset_name): Path<String>,
) -> Result<Json<Data<TablesResponse>>, ApiError> {
    let tables = state
        .engine
        .table_names(&dataset_name)?
        .ok_or_else(|| ApiError::NotFound(format!("dataset not found: {dataset_name}")))?;
    Ok(Json(Data { data: TablesResponse { tables } }))
}

pub async fn table_handler(
    State(state): State<AppState>,
    Path((dataset_name, table_name)): Path<(String, String)>,
) -> Result<Json<Data<Table>>, ApiError> {
    let table = state
        .engine
        .table(&dataset_name, &table_name)?
        .ok_or_else(|| ApiError::NotFound(format!("table not found: {dataset_name}/{table_name}")))?;
    Ok(Json(Data { data: table }))
}

#[derive(Clone, Copy)]
enum Target {
    Tables,
    Columns,
}

pub async fn search_tables_handler(
    State(state): State<AppState>,
    params: Result<Query<SearchParams>, QueryRejection>,
) -> Result<Json<Data<SearchResponse>>, ApiError> {
    let Query(params) = params?;
    run_search(&state, params, Target::Tables)
}

pub async fn search_columns_handler(
    State(state): State<AppState>,
    params: Result<Query<SearchParams>, QueryRejection>,
) -> Result<Json<Data<SearchResponse>>, ApiError> {
    let Query(params) = params?;
    run_search(&state, params, Target::Columns)
}

fn run_search(state: &AppState, params: SearchParams, target: Target) -> Result<Json<Data<SearchResponse>>, ApiError> {
    let start = std::time::Instant::now();
    let size = params.size.unwrap_or(DEFAULT_PAGE_SIZE as i64).min(state.max_page_size as i64);
    let page = Page::new(params.from, size)?;
    let mut request = SearchRequest::new(params.q.as_str()).page(page);
    if let Some(raw) = params.fields.as_deref() {
        request = request.fields(parse_fields(raw)?);
    }
    if let Some(raw) = params.operator.as_deref() {
        let operator = Operator::parse(raw).ok_or_else(|| ApiError::BadRequest(format!("unknown operator: {raw}")))?;
        request = request.operator(operator);
    }

    let SearchResult { hits, total } = match target {
        Target::Tables => state.engine.search_tables_with(&request)?,
        Target::Columns => state.engine.search_columns_with(&request)?,
    };
    let elapsed = start.elapsed();
    tracing::debug!(query = %params.q, total, took_s = elapsed.as_secs_f64(), "search");
    Ok(Json(Data { data: SearchResponse { query: params.q, total, hits, took_s: elapsed.as_secs_f64() } }))
}

fn parse_fields(raw: &str) -> Result<Vec<Field>, ApiError> {
    let fields = raw
        .split(',')
        .filter(|s| !s.trim().is_empty())
        .map(|s| Field::parse(s).ok_or_else(|| ApiError::BadRequest(format!("unknown field: {}", s.trim()))))
        .collect::<Result<Vec<_>, _>>()?;
    if fields.is_empty() {
        return Err(ApiError::BadRequest("fields must name at least one field".into()));
    }
    Ok(fields)
}

pub async fn reload_handler(State(state): State<AppState>, headers: HeaderMap) -> Result<Json<Data<SnapshotStats>>, ApiError> {
    authorize(&state, &headers)?;
    let engine = state.engine.clone();
    let dir = state.config_directory.clone();
    let rebuilt = tokio::task::spawn_blocking(move || -> anyhow::Result<SnapshotStats> {
        let datasets = load_catalog_dir(&dir)?;
        Ok(engine.rebuild(datasets)?.stats())
    })
    .await
    .map_err(|e| ApiError::Internal(format!("reload task failed: {e}")))?;
    match rebuilt {
        Ok(stats) => Ok(Json(Data { data: stats })),
        Err(e) => {
            tracing::warn!(error = %format!("{e:#}"), "catalog reload failed");
            Err(ApiError::Internal(format!("{e:#}")))
        }
    }
}

fn authorize(state: &AppState, headers: &HeaderMap) -> Result<(), ApiError> {
    let required = match &state.admin_token {
        Some(t) => t,
        None => return Err(ApiError::Unauthorized("ADMIN_TOKEN not set".into())),
    };
    let provided = headers.get("X-ADMIN-TOKEN").and_then(|v| v.to_str().ok()).unwrap_or("");
    if provided == required {
        Ok(())
    } else {
        Err(ApiError::Unauthorized("invalid admin token".into()))
    }
}
