//! Server command implementation

use std::path::Path;

use anyhow::Result;

use super::open_db;

pub async fn cmd_serve(db_path: &Path, host: &str, port: u16) -> Result<()> {
    println!("🚀 Starting Tally API server...");
    println!("   Database: {}", db_path.display());
    println!("   Listening: http://{}:{}", host, port);
    println!("   API: http://{}:{}/api/v1", host, port);
    println!();

    let db = open_db(db_path)?;
    tally_server::serve(db, host, port).await
}
