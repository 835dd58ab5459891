//! One-shot expense classification

use std::path::Path;
use std::sync::Arc;

use anyhow::{bail, Context, Result};
use tally_core::{
    preprocess, ClassificationResult, ClassificationService, DbCategoryRepo, DbExpenseRepo,
    LlmBackend, LlmClient, Session,
};

use super::{open_db, truncate};

/// Classify `description`, saving it to the database at `db_path` when given
///
/// The LLM client is only built once the description passes preprocessing.
pub async fn cmd_classify<F>(
    db_path: Option<&Path>,
    make_llm: F,
    description: &str,
    user_id: Option<i64>,
) -> Result<ClassificationResult>
where
    F: FnOnce() -> Result<LlmClient>,
{
    let input = preprocess(description);
    if !input.is_valid {
        bail!("Invalid expense description: {}", input.errors.join("; "));
    }
    for warning in &input.warnings {
        println!("⚠️  {}", warning);
    }

    let llm = make_llm()?;

    println!("🤖 Classifying with {} ({})...", llm.provider(), llm.model());

    let preview = ClassificationService::new(llm.clone())
        .classify(&input.cleaned_text, false, user_id)
        .await
        .context("Classification failed")?;

    let result = match db_path {
        Some(path) => {
            let db = open_db(path)?;
            let session = Session::begin(&db)?;
            let service = ClassificationService::with_repos(
                llm,
                Arc::new(DbCategoryRepo::with_session(session.clone())),
                Arc::new(DbExpenseRepo::with_session(session.clone())),
            );
            let saved = service
                .persist_with_category(
                    &input.cleaned_text,
                    &preview.response,
                    &preview.response.category,
                    user_id,
                )
                .context("Failed to save expense")?;
            session.commit().context("Failed to save expense")?;
            saved
        }
        None => preview,
    };

    print_result(&input.cleaned_text, &result);
    Ok(result)
}

fn print_result(description: &str, result: &ClassificationResult) {
    let response = &result.response;

    println!();
    println!("🧾 Expense Classification Result");
    println!("   ─────────────────────────────────────────────────────────────");
    println!("   {:25} │ {}", "Description", truncate(description, 40));
    println!("   {:25} │ {}", "Category", response.category);
    println!("   {:25} │ {:>10}", "Amount", response.total_amount.to_string());
    println!("   {:25} │ {:>10}", "Currency", response.currency.as_str());
    println!("   {:25} │ {:>10.2}", "Confidence", response.confidence);
    println!(
        "   {:25} │ {:>10}",
        "Classification Cost (USD)",
        format!("${:.6}", response.cost)
    );
    if let Some(comments) = &response.comments {
        println!("   {:25} │ {}", "Comments", truncate(comments, 40));
    }
    println!();

    match &result.expense {
        Some(expense) => println!("✅ Expense #{} saved to the database", expense.id),
        None => println!("💡 Not saved. Re-run with --db to store it."),
    }
}
