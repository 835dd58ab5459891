//! Integration tests for tally-core
//!
//! These tests exercise the full preprocess → classify → persist →
//! dashboard workflow against a SQLite database.

use std::sync::Arc;

use rust_decimal::Decimal;
use tally_core::{
    analytics_summary, preprocess, ClassificationService, Dashboard, Database, DbCategoryRepo,
    DbExpenseRepo, ExpenseRepository, LlmClient, Session,
};
use tally_core::models::Currency;
use tally_core::CategoryRepository;

fn db_service(db: &Database) -> ClassificationService {
    ClassificationService::with_repos(
        LlmClient::mock(),
        Arc::new(DbCategoryRepo::new(db.clone())),
        Arc::new(DbExpenseRepo::new(db.clone())),
    )
}

#[tokio::test]
async fn test_full_classification_workflow() {
    let db = Database::in_memory().expect("Failed to create in-memory database");
    db.seed_categories().expect("Failed to seed categories");
    let service = db_service(&db);

    let inputs = [
        "  Coffee at   Starbucks $5.50 ",
        "Uber to the airport 23.40 USD",
        "Hotel in Lisbon €120",
    ];

    for input in inputs {
        let cleaned = preprocess(input);
        assert!(cleaned.is_valid, "{:?}", cleaned.errors);
        let result = service
            .classify(&cleaned.cleaned_text, true, Some(777))
            .await
            .expect("Classification failed");
        assert!(result.is_persisted);
    }

    let expenses = DbExpenseRepo::new(db.clone());
    let stored = expenses.list_by_user(777).unwrap();
    assert_eq!(stored.len(), 3);

    let hotel = &stored[0];
    assert_eq!(hotel.description.as_deref(), Some("Hotel in Lisbon EUR 120"));
    assert_eq!(hotel.currency, Currency::Eur);
    assert_eq!(hotel.amount, Decimal::new(120, 0));
    assert_eq!(hotel.category_name(), Some("Travel"));

    // Seeded categories were reused, none created
    assert_eq!(DbCategoryRepo::new(db.clone()).list().unwrap().len(), 12);

    let summary = analytics_summary(&expenses, 777, 12).unwrap();
    assert_eq!(summary.expense_count, 3);
    assert_eq!(summary.total_expenses, Decimal::new(14890, 2));

    let dashboard = Dashboard::load(&expenses, Some(777), 12).unwrap();
    assert_eq!(dashboard.recent.len(), 3);
    assert!(dashboard.render().contains("Travel"));
}

#[tokio::test]
async fn test_rejected_input_never_reaches_llm() {
    let cleaned = preprocess("<script>alert('x')</script> 5");
    assert!(!cleaned.is_valid);
    assert_eq!(cleaned.errors, vec!["Suspicious input detected"]);
}

#[tokio::test]
async fn test_override_inside_session() {
    let db = Database::in_memory().unwrap();
    let preview = ClassificationService::new(LlmClient::mock())
        .classify("Netflix monthly 15.99", false, Some(1))
        .await
        .unwrap();
    assert_eq!(preview.response.category, "Subscriptions");

    let session = Session::begin(&db).unwrap();
    let service = ClassificationService::with_repos(
        LlmClient::mock(),
        Arc::new(DbCategoryRepo::with_session(session.clone())),
        Arc::new(DbExpenseRepo::with_session(session.clone())),
    );
    let saved = service
        .persist_with_category("Netflix monthly 15.99", &preview.response, "Entertainment", Some(1))
        .unwrap();
    session.commit().unwrap();

    let expense = DbExpenseRepo::new(db).get(saved.expense.unwrap().id).unwrap();
    assert_eq!(expense.category_name(), Some("Entertainment"));
    assert_eq!(saved.response.confidence, 1.0);
}
