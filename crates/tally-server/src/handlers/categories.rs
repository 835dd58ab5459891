//! Category handlers

use std::sync::Arc;

use axum::{extract::State, Json};

use crate::{AppError, AppState};
use tally_core::models::ExpenseCategory;
use tally_core::{CategoryRepository, DbCategoryRepo};

/// GET /api/v1/categories - List all categories by name
pub async fn list_categories(
    State(state): State<Arc<AppState>>,
) -> Result<Json<Vec<ExpenseCategory>>, AppError> {
    let categories = DbCategoryRepo::new(state.db.clone()).list()?;
    Ok(Json(categories))
}
