//! Expense handlers

use std::sync::Arc;

use axum::{
    extract::{Path, Query, State},
    http::{HeaderMap, StatusCode},
    Json,
};
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use tracing::{error, info};

use crate::{user_id, AppError, AppState, MAX_PAGE_SIZE};
use tally_core::models::{Currency, Expense};
use tally_core::{
    preprocess, ClassificationService, DbCategoryRepo, DbExpenseRepo, Error as CoreError,
    ExpenseRepository, Session,
};

/// Query parameters for listing expenses
#[derive(Debug, Deserialize)]
pub struct ExpenseListQuery {
    #[serde(default = "default_page")]
    pub page: usize,
    #[serde(default = "default_page_size")]
    pub page_size: usize,
}

fn default_page() -> usize {
    1
}

fn default_page_size() -> usize {
    20
}

/// A stored expense as returned by the API
#[derive(Debug, Serialize)]
pub struct ExpenseResponse {
    pub id: i64,
    pub amount: Decimal,
    pub currency: Currency,
    pub description: Option<String>,
    pub category: Option<String>,
    pub date: DateTime<Utc>,
    pub created_at: DateTime<Utc>,
    pub telegram_user_id: Option<i64>,
}

impl From<Expense> for ExpenseResponse {
    fn from(expense: Expense) -> Self {
        Self {
            category: expense.category.map(|c| c.name),
            id: expense.id,
            amount: expense.amount,
            currency: expense.currency,
            description: expense.description,
            date: expense.date,
            created_at: expense.created_at,
            telegram_user_id: expense.telegram_user_id,
        }
    }
}

#[derive(Debug, Serialize)]
pub struct ExpenseListResponse {
    pub items: Vec<ExpenseResponse>,
    pub total: usize,
    pub page: usize,
    pub page_size: usize,
    pub pages: usize,
}

#[derive(Debug, Deserialize)]
pub struct ClassifyRequest {
    pub description: String,
}

#[derive(Debug, Serialize)]
pub struct ClassifyResponse {
    pub id: i64,
    pub amount: Decimal,
    pub currency: Currency,
    pub description: String,
    pub category: String,
    pub confidence: f64,
    pub date: DateTime<Utc>,
    pub comments: Option<String>,
}

/// Number of pages for `total` items, never less than one
fn page_count(total: usize, page_size: usize) -> usize {
    total.div_ceil(page_size).max(1)
}

/// GET /api/v1/expenses/ - List the requesting user's expenses, newest first
pub async fn list_expenses(
    State(state): State<Arc<AppState>>,
    Query(params): Query<ExpenseListQuery>,
    headers: HeaderMap,
) -> Result<Json<ExpenseListResponse>, AppError> {
    let user = user_id(&headers, &state.config);

    // Input validation: clamp pagination parameters
    let page = params.page.max(1);
    let page_size = params.page_size.clamp(1, MAX_PAGE_SIZE);

    let expenses = DbExpenseRepo::new(state.db.clone()).list_by_user(user)?;
    let total = expenses.len();

    let items = expenses
        .into_iter()
        .skip((page - 1).saturating_mul(page_size))
        .take(page_size)
        .map(ExpenseResponse::from)
        .collect();

    Ok(Json(ExpenseListResponse {
        items,
        total,
        page,
        page_size,
        pages: page_count(total, page_size),
    }))
}

/// POST /api/v1/expenses/classify - Classify and record an expense
pub async fn classify_expense(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    Json(request): Json<ClassifyRequest>,
) -> Result<(StatusCode, Json<ClassifyResponse>), AppError> {
    let user = user_id(&headers, &state.config);

    let cleaned = preprocess(&request.description);
    if !cleaned.is_valid {
        return Err(AppError::validation(cleaned.errors));
    }

    let llm = state.llm.clone().ok_or_else(|| {
        AppError::internal("Classification failed: no LLM backend configured")
    })?;

    // Suggest first, then persist inside a short transaction
    let preview = ClassificationService::new(llm.clone())
        .classify(&cleaned.cleaned_text, false, Some(user))
        .await
        .map_err(classification_error)?;

    let session = Session::begin(&state.db)?;
    let service = ClassificationService::with_repos(
        llm,
        Arc::new(DbCategoryRepo::with_session(session.clone())),
        Arc::new(DbExpenseRepo::with_session(session.clone())),
    );
    let result = service
        .persist_with_category(
            &cleaned.cleaned_text,
            &preview.response,
            &preview.response.category,
            Some(user),
        )
        .map_err(classification_error)?;
    session.commit()?;

    let expense = result
        .expense
        .ok_or_else(|| AppError::internal("Classification failed: expense was not stored"))?;
    let response = result.response;

    info!(
        expense_id = expense.id,
        user_id = user,
        category = %response.category,
        "Expense classified via API"
    );

    Ok((
        StatusCode::CREATED,
        Json(ClassifyResponse {
            id: expense.id,
            amount: response.total_amount,
            currency: response.currency,
            description: cleaned.cleaned_text,
            category: response.category,
            confidence: response.confidence,
            date: expense.date,
            comments: response.comments,
        }),
    ))
}

fn classification_error(err: CoreError) -> AppError {
    match err {
        CoreError::Validation(msg) => AppError::validation(vec![msg]),
        other => {
            error!(error = %other, "Classification failed");
            AppError::internal(&format!("Classification failed: {}", other))
        }
    }
}

/// Load an expense owned by `user`; other users' expenses are reported missing
fn owned_expense(state: &AppState, id: i64, user: i64) -> Result<Expense, AppError> {
    let not_found = || AppError::not_found(&format!("Expense {} not found", id));

    match DbExpenseRepo::new(state.db.clone()).get(id) {
        Ok(expense) if expense.telegram_user_id == Some(user) => Ok(expense),
        Ok(_) => Err(not_found()),
        Err(e) if e.is_not_found() => Err(not_found()),
        Err(e) => Err(e.into()),
    }
}

/// GET /api/v1/expenses/:id - Get a single expense
pub async fn get_expense(
    State(state): State<Arc<AppState>>,
    Path(id): Path<i64>,
    headers: HeaderMap,
) -> Result<Json<ExpenseResponse>, AppError> {
    let user = user_id(&headers, &state.config);
    let expense = owned_expense(&state, id, user)?;
    Ok(Json(expense.into()))
}

/// DELETE /api/v1/expenses/:id - Delete an expense
pub async fn delete_expense(
    State(state): State<Arc<AppState>>,
    Path(id): Path<i64>,
    headers: HeaderMap,
) -> Result<StatusCode, AppError> {
    let user = user_id(&headers, &state.config);
    owned_expense(&state, id, user)?;

    match DbExpenseRepo::new(state.db.clone()).delete(id) {
        Ok(()) => {}
        // Deleted concurrently
        Err(e) if e.is_not_found() => {
            return Err(AppError::not_found(&format!("Expense {} not found", id)))
        }
        Err(e) => return Err(e.into()),
    }

    info!(expense_id = id, user_id = user, "Expense deleted via API");
    Ok(StatusCode::NO_CONTENT)
}
