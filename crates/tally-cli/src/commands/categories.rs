//! Category listing

use anyhow::Result;
use tally_core::{CategoryRepository, Database, DbCategoryRepo};

pub fn cmd_categories(db: &Database) -> Result<()> {
    let categories = DbCategoryRepo::new(db.clone()).list()?;

    if categories.is_empty() {
        println!("No categories found. Seed the defaults with:");
        println!("  tally init");
        return Ok(());
    }

    println!();
    println!("🏷️  Categories ({})", categories.len());
    println!("   ─────────────────────────────────────────────────────────────");
    for category in categories {
        println!("   [{:>3}] {}", category.id, category.name);
    }

    Ok(())
}
