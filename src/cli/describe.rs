//! CLI `describe` command: what is in the database.

use anyhow::Result;

use jotter::config::JotterConfig;
use jotter::store::{Backend, HybridStore};

pub fn run(config: &JotterConfig, samples: usize) -> Result<()> {
    let backend = super::open_backend(config)?;
    let collections = backend.collections()?;

    println!("Database: {}", config.resolved_db_path().display());
    if collections.is_empty() {
        println!("No collections yet.");
        return Ok(());
    }

    for collection in collections {
        let report = HybridStore::new(backend.clone(), collection).describe(samples)?;
        println!("\n{report}");
    }
    Ok(())
}
