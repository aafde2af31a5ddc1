//! Ingestion and ingest history handlers

use std::sync::Arc;

use axum::{
    extract::{Multipart, Path, Query, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::Deserialize;
use tracing::{info, warn};

use crate::{AppError, AppState, MAX_PAGE_LIMIT, MAX_UPLOAD_SIZE};
use tally_core::{models::Ingest, Error};

/// POST /api/ingest - Ingest a ledger CSV (multipart field `file`)
///
/// A rejected file is still recorded as a failed ingest; the 400 body
/// carries its id.
pub async fn ingest_csv(
    State(state): State<Arc<AppState>>,
    mut multipart: Multipart,
) -> Result<Response, AppError> {
    let mut upload: Option<(String, Vec<u8>)> = None;

    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| AppError::bad_request(&format!("Failed to read form field: {}", e)))?
    {
        if field.name() != Some("file") {
            continue;
        }

        let filename = field.file_name().unwrap_or("unknown.csv").to_string();
        let bytes = field
            .bytes()
            .await
            .map_err(|_| AppError::bad_request("Failed to read file data"))?;

        if bytes.len() > MAX_UPLOAD_SIZE {
            return Err(AppError::bad_request(&format!(
                "File too large. Maximum size is {} MB",
                MAX_UPLOAD_SIZE / 1024 / 1024
            )));
        }

        upload = Some((filename, bytes.to_vec()));
    }

    let (filename, bytes) = upload.ok_or_else(|| AppError::bad_request("Missing file field"))?;

    match state.db.ingest_csv(&filename, &bytes) {
        Ok(summary) => {
            info!(
                ingest_id = %summary.ingest_id,
                rows = summary.row_count,
                filename = %filename,
                "Ingest succeeded"
            );
            Ok(Json(summary).into_response())
        }
        Err(Error::IngestFailed {
            ingest_id,
            row_count,
            message,
        }) => {
            warn!(ingest_id = %ingest_id, filename = %filename, error = %message, "Ingest failed");
            Ok((
                StatusCode::BAD_REQUEST,
                Json(serde_json::json!({
                    "ingest_id": ingest_id,
                    "error": message,
                    "row_count": row_count,
                })),
            )
                .into_response())
        }
        Err(e) => Err(e.into()),
    }
}

/// Query parameters for ingest history
#[derive(Debug, Deserialize)]
pub struct IngestsQuery {
    #[serde(default = "default_ingests_limit")]
    pub limit: usize,
}

fn default_ingests_limit() -> usize {
    50
}

/// GET /api/ingests - Ingest history, newest first
pub async fn list_ingests(
    State(state): State<Arc<AppState>>,
    Query(params): Query<IngestsQuery>,
) -> Result<Json<Vec<Ingest>>, AppError> {
    let limit = params.limit.clamp(1, MAX_PAGE_LIMIT);
    Ok(Json(state.db.list_ingests(limit)?))
}

/// GET /api/ingests/:id - One ingest record
pub async fn get_ingest(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> Result<Json<Ingest>, AppError> {
    match state.db.get_ingest(&id) {
        Ok(ingest) => Ok(Json(ingest)),
        Err(Error::NotFound(_)) => Err(AppError::not_found("Ingest not found")),
        Err(e) => Err(e.into()),
    }
}
