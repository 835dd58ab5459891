//! Analytics handlers

use std::sync::Arc;

use axum::{
    extract::{Query, State},
    http::HeaderMap,
    Json,
};
use serde::Deserialize;

use crate::{user_id, AppError, AppState};
use tally_core::models::AnalyticsSummary;
use tally_core::{analytics_summary, DbExpenseRepo};

/// Longest trend window the summary endpoint will compute
const MAX_MONTHS: u32 = 120;

#[derive(Debug, Deserialize)]
pub struct SummaryQuery {
    #[serde(default = "default_months")]
    pub months: u32,
}

fn default_months() -> u32 {
    12
}

/// GET /api/v1/analytics/summary - Spending totals for the requesting user
pub async fn get_summary(
    State(state): State<Arc<AppState>>,
    Query(params): Query<SummaryQuery>,
    headers: HeaderMap,
) -> Result<Json<AnalyticsSummary>, AppError> {
    let user = user_id(&headers, &state.config);
    let months = params.months.clamp(1, MAX_MONTHS);

    let repo = DbExpenseRepo::new(state.db.clone());
    let summary = analytics_summary(&repo, user, months)?;
    Ok(Json(summary))
}
