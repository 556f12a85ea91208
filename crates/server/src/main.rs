use std::{convert::Infallible, net::SocketAddr, sync::Arc};

use axum::{
    body::Body,
    extract::{Path, State},
    http::{header, HeaderValue, StatusCode},
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use shared::{
    domain::RecordId,
    error::{ApiError, ErrorCode},
    protocol::{
        DeleteRecordResponse, FetchRecordResponse, QueryEvent, RecordQuery, SaveRecordRequest,
        SaveRecordResponse,
    },
};
use storage::Storage;
use tracing::{error, info, warn};
use tracing_subscriber::EnvFilter;

mod api;
mod app_state;
mod config;

use api::ApiContext;
use app_state::AppState;
use config::{load_settings, prepare_database_url};

type ApiResult<T> = Result<T, (StatusCode, Json<ApiError>)>;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let settings = load_settings();
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new(&settings.log_filter)),
        )
        .init();

    let database_url = prepare_database_url(&settings.database_url)?;
    let storage = Storage::new(&database_url).await.map_err(|error| {
        error!(
            %database_url,
            %error,
            "failed to open SQLite database; verify parent directory exists and permissions are correct"
        );
        error
    })?;

    let state = AppState {
        api: ApiContext { storage },
    };
    let app = build_router(Arc::new(state));

    let addr: SocketAddr = settings.server_bind.parse()?;
    info!(%addr, %database_url, "record store listening");
    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app).await?;
    Ok(())
}

fn build_router(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/healthz", get(healthz))
        .route("/records", post(http_save_record))
        .route("/records/query", post(http_query_records))
        .route(
            "/records/:record_id",
            get(http_fetch_record).delete(http_delete_record),
        )
        .with_state(state)
}

async fn healthz(State(state): State<Arc<AppState>>) -> ApiResult<&'static str> {
    state.api.storage.health_check().await.map_err(|e| {
        (
            StatusCode::SERVICE_UNAVAILABLE,
            Json(ApiError::new(ErrorCode::Internal, e.to_string())),
        )
    })?;
    Ok("ok")
}

async fn http_save_record(
    State(state): State<Arc<AppState>>,
    Json(req): Json<SaveRecordRequest>,
) -> ApiResult<Json<SaveRecordResponse>> {
    let record = api::save_record(&state.api, req.record)
        .await
        .map_err(error_response)?;
    Ok(Json(SaveRecordResponse { record }))
}

async fn http_fetch_record(
    State(state): State<Arc<AppState>>,
    Path(record_id): Path<String>,
) -> ApiResult<Json<FetchRecordResponse>> {
    let record = api::fetch_record(&state.api, &RecordId(record_id))
        .await
        .map_err(error_response)?;
    Ok(Json(FetchRecordResponse {
        record: Some(record),
    }))
}

async fn http_delete_record(
    State(state): State<Arc<AppState>>,
    Path(record_id): Path<String>,
) -> ApiResult<Json<DeleteRecordResponse>> {
    let record_id = api::delete_record(&state.api, RecordId(record_id))
        .await
        .map_err(error_response)?;
    Ok(Json(DeleteRecordResponse {
        record_id: Some(record_id),
    }))
}

/// Streams matching records as JSON lines, closed by a `done` (or `error`) line.
async fn http_query_records(
    State(state): State<Arc<AppState>>,
    Json(query): Json<RecordQuery>,
) -> ApiResult<Response> {
    let records = api::query_records(&state.api, &query)
        .await
        .map_err(error_response)?;

    let mut lines = Vec::with_capacity(records.len() + 1);
    let mut terminal = QueryEvent::Done;
    for record in records {
        match encode_line(&QueryEvent::Record { record }) {
            Ok(line) => lines.push(line),
            Err(err) => {
                warn!(%err, "failed to encode query record");
                terminal = QueryEvent::Error(ApiError::new(ErrorCode::Internal, err.to_string()));
                break;
            }
        }
    }
    lines.push(encode_line(&terminal).map_err(|err| {
        (
            StatusCode::INTERNAL_SERVER_ERROR,
            Json(ApiError::new(ErrorCode::Internal, err.to_string())),
        )
    })?);

    let body = Body::from_stream(futures::stream::iter(
        lines.into_iter().map(Ok::<_, Infallible>),
    ));
    let mut response = body.into_response();
    response.headers_mut().insert(
        header::CONTENT_TYPE,
        HeaderValue::from_static("application/x-ndjson"),
    );
    Ok(response)
}

fn encode_line(event: &QueryEvent) -> serde_json::Result<String> {
    let mut line = serde_json::to_string(event)?;
    line.push('\n');
    Ok(line)
}

fn error_response(err: ApiError) -> (StatusCode, Json<ApiError>) {
    let status = match err.code {
        ErrorCode::NotFound => StatusCode::NOT_FOUND,
        ErrorCode::Validation => StatusCode::BAD_REQUEST,
        ErrorCode::Internal => StatusCode::INTERNAL_SERVER_ERROR,
    };
    (status, Json(err))
}

#[cfg(test)]
#[path = "tests/main_tests.rs"]
mod tests;
