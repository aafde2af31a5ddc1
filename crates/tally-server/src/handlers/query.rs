//! Question answering handler

use std::sync::Arc;

use axum::{extract::State, Json};
use tracing::info;

use crate::{AppError, AppState};
use tally_core::{QueryEngine, QueryRequest, QueryResponse};

/// POST /api/query - Answer a question about one month of the ledger
///
/// Unanswerable questions still return 200 with a clarifying question; only
/// an out-of-range `limit_evidence` is rejected up front. Without one the
/// configured default applies.
pub async fn query(
    State(state): State<Arc<AppState>>,
    Json(request): Json<QueryRequest>,
) -> Result<Json<QueryResponse>, AppError> {
    let max = state.config.max_evidence_limit as i64;
    if let Some(limit) = request.limit_evidence {
        if !(1..=max).contains(&limit) {
            return Err(AppError::bad_request(&format!(
                "limit_evidence must be between 1 and {}",
                max
            )));
        }
    }

    let response = QueryEngine::new(&state.db, &state.config).answer(&request)?;

    info!(
        intent = %response.trace.intent,
        month = ?response.trace.resolved_month,
        evidence = response.trace.evidence_count_returned,
        clarifying = response.clarifying_question.is_some(),
        "Answered question"
    );

    Ok(Json(response))
}
