pub mod chat;
pub mod describe;
pub mod migrate;

use anyhow::{Context, Result};
use futures::StreamExt;
use indicatif::{ProgressBar, ProgressStyle};
use std::path::Path;
use std::sync::Arc;
use tokio::io::AsyncWriteExt;

use jotter::config::{EmbeddingConfig, JotterConfig};
use jotter::embedding::{self, local};
use jotter::store::SqliteBackend;

const MODEL_URL: &str =
    "https://huggingface.co/sentence-transformers/all-MiniLM-L6-v2/resolve/main/onnx/model.onnx";
const TOKENIZER_URL: &str =
    "https://huggingface.co/sentence-transformers/all-MiniLM-L6-v2/resolve/main/tokenizer.json";

/// Open the configured database with the configured embedder.
/// `db_path = ":memory:"` gives a throwaway database.
pub fn open_backend(config: &JotterConfig) -> Result<Arc<SqliteBackend>> {
    let embedder: Arc<dyn embedding::EmbeddingProvider> = Arc::from(
        embedding::create_provider(&config.embedding)
            .context("failed to create embedding provider")?,
    );

    let backend = if config.storage.db_path == ":memory:" {
        SqliteBackend::open_in_memory(embedder)?
    } else {
        SqliteBackend::open(config.resolved_db_path(), embedder)
            .context("failed to open database")?
    };
    Ok(Arc::new(backend))
}

pub(crate) fn progress_style(template: &str) -> Result<ProgressStyle> {
    Ok(ProgressStyle::default_bar()
        .template(template)
        .context("invalid progress template")?
        .progress_chars("##-"))
}

/// Download the ONNX embedding model and tokenizer to the cache directory.
pub async fn model_download(config: &EmbeddingConfig) -> Result<()> {
    let cache_dir = config.resolved_cache_dir();
    std::fs::create_dir_all(&cache_dir)
        .with_context(|| format!("failed to create cache dir: {}", cache_dir.display()))?;

    for (url, file, label) in [
        (MODEL_URL, local::MODEL_FILE, "model (~90MB)"),
        (TOKENIZER_URL, local::TOKENIZER_FILE, "tokenizer"),
    ] {
        let dest = cache_dir.join(file);
        if dest.exists() {
            println!("{file} already exists at {}", dest.display());
            continue;
        }
        println!("Downloading {label}...");
        download_file(url, &dest).await?;
        println!("Saved to {}", dest.display());
    }

    println!("Model download complete. Set embedding.provider = \"local\" to use it.");
    Ok(())
}

/// Stream `url` into `dest` behind a progress bar. The body lands in a
/// sibling `.tmp` file first and is renamed into place once complete.
async fn download_file(url: &str, dest: &Path) -> Result<u64> {
    let response = reqwest::get(url)
        .await
        .with_context(|| format!("HTTP request failed for {url}"))?;
    let status = response.status();
    anyhow::ensure!(status.is_success(), "download of {url} failed with HTTP {status}");

    let pb = if let Some(total) = response.content_length() {
        ProgressBar::new(total)
            .with_style(progress_style("  {bar:40.cyan/blue} {bytes}/{total_bytes} ({eta})")?)
    } else {
        ProgressBar::new_spinner()
    };

    let partial = dest.with_extension("tmp");
    let mut out = tokio::fs::File::create(&partial)
        .await
        .with_context(|| format!("failed to create {}", partial.display()))?;

    let mut written = 0u64;
    let mut body = response.bytes_stream();
    while let Some(chunk) = body.next().await {
        let chunk = chunk.with_context(|| format!("error reading body of {url}"))?;
        out.write_all(&chunk)
            .await
            .with_context(|| format!("error writing {}", partial.display()))?;
        written += chunk.len() as u64;
        pb.inc(chunk.len() as u64);
    }
    out.flush().await?;
    drop(out);

    tokio::fs::rename(&partial, dest)
        .await
        .with_context(|| format!("failed to move download into {}", dest.display()))?;
    pb.finish_and_clear();
    Ok(written)
}
