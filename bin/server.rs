// Statement Analyzer - Web Server
// Upload statements and read back tables and chart data over REST

use anyhow::{Context, Result};
use axum::{
    body::Bytes,
    extract::{DefaultBodyLimit, Path, State},
    http::StatusCode,
    response::{IntoResponse, Json, Response},
    routing::get,
    Router,
};
use serde::Serialize;
use statement_analyzer::{
    init_logging, process_upload, ChartData, Config, StatementError, StatementStore,
};
use std::sync::Arc;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;
use tracing::{error, info};

/// Shared application state
#[derive(Clone)]
struct AppState {
    store: Arc<StatementStore>,
}

/// API Response wrapper
#[derive(Serialize)]
struct ApiResponse<T> {
    success: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    data: Option<T>,
    #[serde(skip_serializing_if = "Option::is_none")]
    error: Option<String>,
}

impl<T> ApiResponse<T> {
    fn ok(data: T) -> Self {
        Self {
            success: true,
            data: Some(data),
            error: None,
        }
    }

    fn err(message: String) -> Self {
        Self {
            success: false,
            data: None,
            error: Some(message),
        }
    }
}

/// Handler error: carries the HTTP status alongside the message
struct ApiError {
    status: StatusCode,
    message: String,
}

impl ApiError {
    fn not_found(filename: &str) -> Self {
        Self {
            status: StatusCode::NOT_FOUND,
            message: format!("no stored statement named {}", filename),
        }
    }
}

impl From<StatementError> for ApiError {
    fn from(e: StatementError) -> Self {
        Self {
            status: status_for(&e),
            message: e.to_string(),
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        if self.status.is_server_error() {
            error!(status = %self.status, error = %self.message, "request failed");
        }
        (self.status, Json(ApiResponse::<()>::err(self.message))).into_response()
    }
}

/// Problems with the uploaded file are the caller's; everything else is ours
fn status_for(e: &StatementError) -> StatusCode {
    if e.is_user_facing() {
        StatusCode::UNPROCESSABLE_ENTITY
    } else {
        StatusCode::INTERNAL_SERVER_ERROR
    }
}

type ApiResult<T> = std::result::Result<Json<ApiResponse<T>>, ApiError>;

/// Run a blocking store/parse call off the async executor
async fn blocking<T, F>(f: F) -> std::result::Result<T, ApiError>
where
    F: FnOnce() -> std::result::Result<T, ApiError> + Send + 'static,
    T: Send + 'static,
{
    tokio::task::spawn_blocking(f).await.map_err(|e| ApiError {
        status: StatusCode::INTERNAL_SERVER_ERROR,
        message: format!("worker task failed: {}", e),
    })?
}

// ============================================================================
// API Handlers
// ============================================================================

/// GET /api/health - Health check
async fn health_check() -> impl IntoResponse {
    Json(ApiResponse::ok("OK"))
}

/// POST /api/statements/:filename - Upload raw file bytes
async fn upload_statement(
    State(state): State<AppState>,
    Path(filename): Path<String>,
    body: Bytes,
) -> ApiResult<statement_analyzer::ProcessedUpload> {
    let upload = blocking(move || {
        process_upload(&state.store, &filename, &body).map_err(ApiError::from)
    })
    .await?;

    Ok(Json(ApiResponse::ok(upload)))
}

/// GET /api/statements - Stored files
async fn list_statements(
    State(state): State<AppState>,
) -> ApiResult<Vec<statement_analyzer::FileSummary>> {
    let files = blocking(move || state.store.list_files().map_err(ApiError::from)).await?;
    Ok(Json(ApiResponse::ok(files)))
}

/// GET /api/statements/:filename - Latest version with metadata
async fn get_statement(
    State(state): State<AppState>,
    Path(filename): Path<String>,
) -> ApiResult<statement_analyzer::StoredStatement> {
    let entry = blocking(move || {
        state
            .store
            .latest_entry(&filename)?
            .ok_or_else(|| ApiError::not_found(&filename))
    })
    .await?;

    Ok(Json(ApiResponse::ok(entry)))
}

/// GET /api/statements/:filename/charts - Chart data of the latest version
async fn get_charts(
    State(state): State<AppState>,
    Path(filename): Path<String>,
) -> ApiResult<ChartData> {
    let charts = blocking(move || {
        state
            .store
            .get_latest(&filename)?
            .map(|statement| ChartData::from_statement(&statement))
            .ok_or_else(|| ApiError::not_found(&filename))
    })
    .await?;

    Ok(Json(ApiResponse::ok(charts)))
}

/// GET /api/statements/:filename/history - All versions, newest first
async fn get_history(
    State(state): State<AppState>,
    Path(filename): Path<String>,
) -> ApiResult<Vec<statement_analyzer::StatementVersion>> {
    let versions = blocking(move || state.store.history(&filename).map_err(ApiError::from)).await?;
    Ok(Json(ApiResponse::ok(versions)))
}

fn router(state: AppState, max_upload_bytes: usize) -> Router {
    let api_routes = Router::new()
        .route("/health", get(health_check))
        .route("/statements", get(list_statements))
        .route(
            "/statements/:filename",
            get(get_statement).post(upload_statement),
        )
        .route("/statements/:filename/charts", get(get_charts))
        .route("/statements/:filename/history", get(get_history))
        .layer(DefaultBodyLimit::max(max_upload_bytes))
        .with_state(state);

    Router::new()
        .nest("/api", api_routes)
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
}

// ============================================================================
// Main Server
// ============================================================================

#[tokio::main]
async fn main() -> Result<()> {
    let config = Config::load(None).context("failed to load config")?;
    init_logging(config.logging.format, &config.logging.level);

    let db_path = &config.database.path;
    let store = StatementStore::open(db_path)
        .with_context(|| format!("failed to open database {}", db_path.display()))?;
    info!(path = %db_path.display(), versions = store.count()?, "database opened");

    let state = AppState {
        store: Arc::new(store),
    };
    let app = router(state, config.server.max_upload_bytes);

    let listener = tokio::net::TcpListener::bind(&config.server.bind)
        .await
        .with_context(|| format!("failed to bind {}", config.server.bind))?;

    info!(addr = %config.server.bind, "server listening");
    axum::serve(listener, app).await.context("server failed")?;

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_file_problems_are_unprocessable() {
        let schema = StatementError::missing_columns(&["Date", "Amount"], &["Date".to_string()]);
        assert_eq!(status_for(&schema), StatusCode::UNPROCESSABLE_ENTITY);
        assert_eq!(
            status_for(&StatementError::EmptyResult),
            StatusCode::UNPROCESSABLE_ENTITY
        );
        assert_eq!(
            status_for(&StatementError::Storage("lock".to_string())),
            StatusCode::INTERNAL_SERVER_ERROR
        );
    }

    #[test]
    fn test_error_body_shape() {
        let body = serde_json::to_value(ApiResponse::<()>::err("bad".to_string())).unwrap();
        assert_eq!(body, serde_json::json!({ "success": false, "error": "bad" }));

        let body = serde_json::to_value(ApiResponse::ok(3)).unwrap();
        assert_eq!(body, serde_json::json!({ "success": true, "data": 3 }));
    }

    #[tokio::test]
    async fn test_missing_file_is_404() {
        let state = AppState {
            store: Arc::new(StatementStore::open_in_memory().unwrap()),
        };

        let result = get_charts(State(state), Path("nope.csv".to_string())).await;
        match result {
            Err(e) => assert_eq!(e.status, StatusCode::NOT_FOUND),
            Ok(_) => panic!("expected 404"),
        }
    }

    #[tokio::test]
    async fn test_upload_then_read_back() {
        let state = AppState {
            store: Arc::new(StatementStore::open_in_memory().unwrap()),
        };
        let csv = Bytes::from_static(b"Date,Amount,Category\n2024-01-05,100,Stock\n");

        let upload = upload_statement(State(state.clone()), Path("a.csv".to_string()), csv)
            .await
            .ok()
            .and_then(|Json(r)| r.data)
            .unwrap();
        assert_eq!(upload.statement.len(), 1);

        let Json(charts) = get_charts(State(state), Path("a.csv".to_string()))
            .await
            .ok()
            .unwrap();
        assert_eq!(charts.data.unwrap().equity_exposure[0].cumulative, 100.0);
    }
}
