//! Terminal dashboard command

use anyhow::Result;
use tally_core::{Dashboard, Database, DbExpenseRepo};

pub fn cmd_dashboard(db: &Database, user_id: Option<i64>, months: u32) -> Result<()> {
    let repo = DbExpenseRepo::new(db.clone());
    let dashboard = Dashboard::load(&repo, user_id, months)?;
    print!("{}", dashboard.render());
    Ok(())
}
