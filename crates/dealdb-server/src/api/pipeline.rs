//! On-demand stage triggers.

use axum::{
    extract::{Query, State},
    Extension, Json,
};
use dealdb_db::TriggerSource;
use dealdb_pipeline::{
    EmbeddingSummary, ExtractionSummary, IngestionSummary, PipelineError, RetentionSummary,
};
use serde::Deserialize;

use crate::dispatch::DispatchError;
use crate::middleware::RequestId;

use super::{ApiError, ApiResponse, AppState, ErrorCode, ResponseMeta};

/// Upper bound for an on-demand batch; larger sweeps belong to the scheduler.
const MAX_ON_DEMAND_BATCH: i64 = 25;

#[derive(Debug, Deserialize)]
pub(super) struct BatchQuery {
    pub batch_size: Option<i64>,
}

pub(super) fn resolve_batch_size(
    request_id: &str,
    requested: Option<i64>,
    default: i64,
) -> Result<i64, ApiError> {
    match requested {
        None => Ok(default),
        Some(n) if (1..=MAX_ON_DEMAND_BATCH).contains(&n) => Ok(n),
        Some(n) => Err(ApiError::new(
            request_id,
            ErrorCode::ValidationError,
            format!("batch_size must be between 1 and {MAX_ON_DEMAND_BATCH}, got {n}"),
        )),
    }
}

pub(super) fn map_dispatch_error(request_id: String, error: &DispatchError) -> ApiError {
    match error {
        DispatchError::Busy(stage) => {
            tracing::info!(%stage, "trigger rejected: stage already running");
            ApiError::new(request_id, ErrorCode::Conflict, error.to_string())
        }
        DispatchError::Stage(PipelineError::Config(e)) => {
            tracing::warn!(error = %e, "trigger rejected: stage not configured");
            ApiError::new(request_id, ErrorCode::ServiceUnavailable, e.to_string())
        }
        DispatchError::Stage(e) => {
            tracing::error!(error = %e, "pipeline stage failed");
            ApiError::new(request_id, ErrorCode::InternalError, "pipeline stage failed")
        }
    }
}

pub(super) async fn trigger_ingest(
    State(state): State<AppState>,
    Extension(req_id): Extension<RequestId>,
) -> Result<Json<ApiResponse<IngestionSummary>>, ApiError> {
    let data = state
        .dispatcher
        .ingest(TriggerSource::Api)
        .await
        .map_err(|e| map_dispatch_error(req_id.0.clone(), &e))?;

    Ok(Json(ApiResponse {
        data,
        meta: ResponseMeta::new(req_id.0),
    }))
}

pub(super) async fn trigger_extract(
    State(state): State<AppState>,
    Extension(req_id): Extension<RequestId>,
    Query(query): Query<BatchQuery>,
) -> Result<Json<ApiResponse<ExtractionSummary>>, ApiError> {
    let batch_size = resolve_batch_size(
        &req_id.0,
        query.batch_size,
        state.dispatcher.extract_batch_on_demand(),
    )?;
    let data = state
        .dispatcher
        .extract(TriggerSource::Api, batch_size)
        .await
        .map_err(|e| map_dispatch_error(req_id.0.clone(), &e))?;

    Ok(Json(ApiResponse {
        data,
        meta: ResponseMeta::new(req_id.0),
    }))
}

pub(super) async fn trigger_embed(
    State(state): State<AppState>,
    Extension(req_id): Extension<RequestId>,
    Query(query): Query<BatchQuery>,
) -> Result<Json<ApiResponse<EmbeddingSummary>>, ApiError> {
    let batch_size =
        resolve_batch_size(&req_id.0, query.batch_size, state.dispatcher.embed_batch())?;
    let data = state
        .dispatcher
        .embed(TriggerSource::Api, batch_size)
        .await
        .map_err(|e| map_dispatch_error(req_id.0.clone(), &e))?;

    Ok(Json(ApiResponse {
        data,
        meta: ResponseMeta::new(req_id.0),
    }))
}

pub(super) async fn trigger_retain(
    State(state): State<AppState>,
    Extension(req_id): Extension<RequestId>,
) -> Result<Json<ApiResponse<RetentionSummary>>, ApiError> {
    let data = state
        .dispatcher
        .retain(TriggerSource::Api)
        .await
        .map_err(|e| map_dispatch_error(req_id.0.clone(), &e))?;

    Ok(Json(ApiResponse {
        data,
        meta: ResponseMeta::new(req_id.0),
    }))
}
