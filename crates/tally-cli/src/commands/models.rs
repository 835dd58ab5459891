//! Provider model listing

use anyhow::{Context, Result};
use tally_core::{LlmBackend, LlmClient};

pub async fn cmd_models(llm: &LlmClient) -> Result<()> {
    let models = llm
        .get_available_models()
        .await
        .with_context(|| format!("Failed to list {} models", llm.provider()))?;

    println!();
    println!("🧠 {} models", llm.provider());
    println!("   ─────────────────────────────────────────────────────────────");
    for model in &models {
        let marker = if model == llm.model() { " (configured)" } else { "" };
        println!("   {}{}", model, marker);
    }

    Ok(())
}
