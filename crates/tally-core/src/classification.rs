//! Expense classification pipeline
//!
//! Shared by the CLI, REST API and bot: prompt the LLM, then optionally
//! get-or-create the suggested category and record the expense.

use std::sync::Arc;

use chrono::Utc;
use tracing::{debug, info};

use crate::ai::{ExpenseCategorizationResponse, LlmBackend, LlmClient};
use crate::error::{Error, Result};
use crate::models::{normalize_category_name, Expense, ExpenseCategory, NewExpense};
use crate::prompts::classification_messages;
use crate::repo::{CategoryRepository, ExpenseRepository};

/// Outcome of a classification, persisted or not
#[derive(Debug, Clone)]
pub struct ClassificationResult {
    pub response: ExpenseCategorizationResponse,
    pub expense: Option<Expense>,
    pub category: Option<ExpenseCategory>,
    pub is_persisted: bool,
}

#[derive(Clone)]
pub struct ClassificationService {
    llm: LlmClient,
    category_repo: Option<Arc<dyn CategoryRepository>>,
    expense_repo: Option<Arc<dyn ExpenseRepository>>,
}

impl ClassificationService {
    /// Classification only; persisting fails with a configuration error
    pub fn new(llm: LlmClient) -> Self {
        Self {
            llm,
            category_repo: None,
            expense_repo: None,
        }
    }

    pub fn with_repos(
        llm: LlmClient,
        category_repo: Arc<dyn CategoryRepository>,
        expense_repo: Arc<dyn ExpenseRepository>,
    ) -> Self {
        Self {
            llm,
            category_repo: Some(category_repo),
            expense_repo: Some(expense_repo),
        }
    }

    pub fn llm(&self) -> &LlmClient {
        &self.llm
    }

    /// Classify a description, persisting the expense when `persist` is set
    pub async fn classify(
        &self,
        description: &str,
        persist: bool,
        user_id: Option<i64>,
    ) -> Result<ClassificationResult> {
        if description.trim().is_empty() {
            return Err(Error::Validation(
                "Expense description cannot be empty".to_string(),
            ));
        }
        let preview: String = description.chars().take(80).collect();
        info!(description = %preview, provider = self.llm.provider(), "Classifying expense");

        let messages = classification_messages(description);
        let response = self.llm.completion(&messages).await?.into_categorization()?;
        info!(
            category = %response.category,
            confidence = response.confidence,
            "Classified as"
        );

        if !persist {
            return Ok(ClassificationResult {
                response,
                expense: None,
                category: None,
                is_persisted: false,
            });
        }

        let (category, expense) = self.persist_expense(&response, description, user_id)?;
        Ok(ClassificationResult {
            response,
            expense: Some(expense),
            category: Some(category),
            is_persisted: true,
        })
    }

    /// Persist with a user-chosen category
    ///
    /// When the choice matches the suggestion the response is stored as
    /// is; otherwise confidence becomes 1.0 and the comment records the
    /// override.
    pub fn persist_with_category(
        &self,
        description: &str,
        llm_response: &ExpenseCategorizationResponse,
        selected_category: &str,
        user_id: Option<i64>,
    ) -> Result<ClassificationResult> {
        self.repos()?;

        // Compared after normalization, the same form categories are stored under,
        // so "  food & dining " still counts as accepting "Food & Dining"
        let response = if normalize_category_name(selected_category)
            == normalize_category_name(&llm_response.category)
        {
            llm_response.clone()
        } else {
            info!(
                from = %llm_response.category,
                to = %selected_category,
                "Category override"
            );
            ExpenseCategorizationResponse {
                category: selected_category.to_string(),
                confidence: 1.0,
                comments: Some(format!("User override from '{}'", llm_response.category)),
                timestamp: Utc::now(),
                ..llm_response.clone()
            }
        };

        let (category, expense) = self.persist_expense(&response, description, user_id)?;
        Ok(ClassificationResult {
            response,
            expense: Some(expense),
            category: Some(category),
            is_persisted: true,
        })
    }

    fn repos(&self) -> Result<(&dyn CategoryRepository, &dyn ExpenseRepository)> {
        match (&self.category_repo, &self.expense_repo) {
            (Some(categories), Some(expenses)) => Ok((categories.as_ref(), expenses.as_ref())),
            _ => Err(Error::Configuration(
                "Cannot persist without both category_repo and expense_repo".to_string(),
            )),
        }
    }

    fn persist_expense(
        &self,
        response: &ExpenseCategorizationResponse,
        description: &str,
        user_id: Option<i64>,
    ) -> Result<(ExpenseCategory, Expense)> {
        let (categories, expenses) = self.repos()?;

        let name = normalize_category_name(&response.category);
        let category = categories.get_or_create(&name)?;
        debug!(category = %category.name, id = category.id, "Resolved category");

        let expense = expenses.add(NewExpense {
            amount: response.total_amount,
            currency: response.currency,
            description: Some(description.to_string()),
            date: None,
            category: Some(category.clone()),
            telegram_user_id: user_id,
        })?;
        info!(id = expense.id, "Persisted expense");

        Ok((category, expense))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ai::MockBackend;
    use crate::models::Currency;
    use crate::repo::{InMemoryCategoryRepo, InMemoryExpenseRepo};
    use rust_decimal::Decimal;

    fn coffee_response() -> ExpenseCategorizationResponse {
        ExpenseCategorizationResponse {
            category: "Food & Dining".to_string(),
            total_amount: Decimal::new(550, 2),
            currency: Currency::Usd,
            confidence: 0.95,
            cost: Decimal::new(3, 4),
            comments: None,
            timestamp: Utc::now(),
        }
    }

    fn stubbed(response: ExpenseCategorizationResponse) -> LlmClient {
        LlmClient::Mock(MockBackend::with_response(response))
    }

    fn service_with_repos(
        llm: LlmClient,
    ) -> (ClassificationService, Arc<InMemoryCategoryRepo>, Arc<InMemoryExpenseRepo>) {
        let categories = Arc::new(InMemoryCategoryRepo::new());
        let expenses = Arc::new(InMemoryExpenseRepo::new());
        let service = ClassificationService::with_repos(llm, categories.clone(), expenses.clone());
        (service, categories, expenses)
    }

    #[tokio::test]
    async fn test_classify_without_persist() {
        let service = ClassificationService::new(stubbed(coffee_response()));
        let result = service
            .classify("Coffee at Starbucks $5.50", false, None)
            .await
            .unwrap();

        assert!(!result.is_persisted);
        assert!(result.expense.is_none());
        assert!(result.category.is_none());
        assert_eq!(result.response.category, "Food & Dining");
    }

    #[tokio::test]
    async fn test_classify_blank_description() {
        let service = ClassificationService::new(LlmClient::mock());
        let err = service.classify("   ", false, None).await.unwrap_err();
        assert!(matches!(err, Error::Validation(_)));
    }

    #[tokio::test]
    async fn test_classify_persist_requires_repos() {
        let service = ClassificationService::new(LlmClient::mock());
        let err = service.classify("Taxi 20", true, None).await.unwrap_err();
        assert!(matches!(err, Error::Configuration(_)));
    }

    #[tokio::test]
    async fn test_classify_and_persist() {
        let (service, categories, expenses) = service_with_repos(stubbed(coffee_response()));

        let result = service
            .classify("Coffee at Starbucks $5.50", true, Some(42))
            .await
            .unwrap();
        assert!(result.is_persisted);

        let expense = result.expense.unwrap();
        let stored = expenses.get(expense.id).unwrap();
        assert_eq!(stored.amount, Decimal::new(550, 2));
        assert_eq!(stored.currency, Currency::Usd);
        assert_eq!(stored.telegram_user_id, Some(42));
        assert_eq!(stored.description.as_deref(), Some("Coffee at Starbucks $5.50"));
        assert_eq!(stored.category_name(), Some("Food & Dining"));

        // Second classification reuses the category
        service.classify("Another coffee 3", true, Some(42)).await.unwrap();
        assert_eq!(categories.list().unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_category_name_normalized_before_lookup() {
        let mut response = coffee_response();
        response.category = "  food &  DINING ".to_string();
        let (service, categories, _) = service_with_repos(stubbed(response));
        categories.add("Food & Dining").unwrap();

        let result = service.classify("Lunch 10", true, None).await.unwrap();
        assert_eq!(result.category.unwrap().name, "Food & Dining");
        assert_eq!(categories.list().unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_llm_failure_propagates() {
        let (service, _, expenses) =
            service_with_repos(LlmClient::Mock(MockBackend::failing("provider down")));
        let err = service.classify("Taxi 20", true, None).await.unwrap_err();
        assert!(matches!(err, Error::Upstream(_)));
        assert!(expenses.list().unwrap().is_empty());
    }

    #[test]
    fn test_persist_with_override() {
        let (service, _, expenses) = service_with_repos(LlmClient::mock());
        let mut original = coffee_response();
        original.category = "Food".to_string();

        let result = service
            .persist_with_category("Bus ticket 2", &original, "Transport", Some(7))
            .unwrap();

        assert!(result.is_persisted);
        assert_eq!(result.response.category, "Transport");
        assert_eq!(result.response.confidence, 1.0);
        assert!(result.response.comments.as_deref().unwrap().contains("override"));
        assert_eq!(result.response.total_amount, original.total_amount);
        assert_eq!(result.category.unwrap().name, "Transport");

        let stored = expenses.get(result.expense.unwrap().id).unwrap();
        assert_eq!(stored.category_name(), Some("Transport"));
    }

    #[test]
    fn test_persist_with_same_category_keeps_response() {
        let (service, _, _) = service_with_repos(LlmClient::mock());
        let original = coffee_response();

        let result = service
            .persist_with_category("Coffee 5.50", &original, "Food & Dining", None)
            .unwrap();
        assert_eq!(result.response, original);
    }

    #[test]
    fn test_persist_with_same_category_in_other_casing_keeps_response() {
        let (service, _, expenses) = service_with_repos(LlmClient::mock());
        let original = coffee_response();

        let result = service
            .persist_with_category("Coffee 5.50", &original, "  food & dining ", None)
            .unwrap();
        assert_eq!(result.response, original);
        assert_eq!(result.category.unwrap().name, "Food & Dining");

        let stored = expenses.get(result.expense.unwrap().id).unwrap();
        assert_eq!(stored.category_name(), Some("Food & Dining"));
    }

    #[test]
    fn test_persist_with_category_requires_repos() {
        let service = ClassificationService::new(LlmClient::mock());
        let err = service
            .persist_with_category("x", &coffee_response(), "Other", None)
            .unwrap_err();
        assert!(matches!(err, Error::Configuration(_)));
    }
}
