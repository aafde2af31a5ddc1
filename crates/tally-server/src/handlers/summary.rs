//! Monthly report handler

use std::sync::Arc;

use axum::{
    extract::{Query, State},
    Json,
};
use serde::Deserialize;

use crate::{AppError, AppState};
use tally_core::{models::MonthlySummary, Error};

#[derive(Debug, Deserialize)]
pub struct MonthlySummaryQuery {
    /// `YYYY-MM`
    pub month: String,
    /// Number of top merchants (defaults to the configured `default_top_k`)
    pub top_k: Option<i64>,
}

/// GET /api/summary/monthly - Totals, category/source breakdowns and top merchants
pub async fn monthly_summary(
    State(state): State<Arc<AppState>>,
    Query(params): Query<MonthlySummaryQuery>,
) -> Result<Json<MonthlySummary>, AppError> {
    let max = state.config.max_top_k;
    let top_k = match params.top_k {
        None => state.config.default_top_k,
        Some(k) if k >= 1 && k as usize <= max => k as usize,
        Some(_) => {
            return Err(AppError::bad_request(&format!(
                "top_k must be between 1 and {}",
                max
            )))
        }
    };

    match state.db.monthly_summary(&params.month, top_k) {
        Ok(summary) => Ok(Json(summary)),
        Err(Error::InvalidMonth(e)) => Err(AppError::bad_request(&e.to_string())),
        Err(e) => Err(e.into()),
    }
}
