//! CLI `migrate` command: bring stored documents up to the current encoding
//! and, optionally, the current embedding model.

use anyhow::{Context, Result};
use indicatif::ProgressBar;

use jotter::config::JotterConfig;
use jotter::store::{Backend, HybridStore};

pub async fn run(config: &JotterConfig, re_embed: bool) -> Result<()> {
    let backend = super::open_backend(config)?;

    let mut total = 0;
    for collection in [&config.storage.items_collection, &config.storage.context_collection] {
        println!("Migrating {collection}...");
        let report = HybridStore::new(backend.clone(), collection).reencode_legacy()?;
        println!(
            "  {} migrated, {} already had encoded properties",
            report.migrated, report.skipped
        );
        total += report.migrated;
    }
    println!("Total migrated: {total}");

    if !re_embed {
        return Ok(());
    }

    let records: usize = backend
        .collections()?
        .iter()
        .map(|c| backend.count(c))
        .sum::<Result<usize, _>>()?;
    if records == 0 {
        println!("No records to re-embed.");
        return Ok(());
    }

    println!("Re-embedding {records} records with '{}'...", config.embedding.provider);
    let pb = ProgressBar::new(records as u64);
    pb.set_style(super::progress_style("  {bar:40.cyan/blue} {pos}/{len} ({eta})")?);

    let done = {
        let pb = pb.clone();
        tokio::task::spawn_blocking(move || backend.reembed_all(|n| pb.inc(n as u64)))
            .await
            .context("re-embed task failed")??
    };

    pb.finish_and_clear();
    println!("Re-embedded {done} records.");
    Ok(())
}
