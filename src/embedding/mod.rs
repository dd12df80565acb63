//! Text-to-vector embedding for semantic search.
//!
//! Provides the [`EmbeddingProvider`] trait plus two implementations selected by
//! [`create_provider`]: the local all-MiniLM-L6-v2 ONNX model and a
//! model-free feature-hashing provider. Both yield L2-normalized vectors of
//! [`EMBEDDING_DIM`] dimensions.

pub mod hashing;
pub mod local;

use anyhow::Result;

/// Number of dimensions in the embedding vectors (all-MiniLM-L6-v2).
pub const EMBEDDING_DIM: usize = 384;

/// Trait for embedding text into vectors.
///
/// All methods are synchronous. Callers in async contexts should use
/// `tokio::task::spawn_blocking`.
pub trait EmbeddingProvider: Send + Sync {
    /// Identifier recorded next to stored vectors, so a model switch can be detected.
    fn model_id(&self) -> &str;

    /// Embed a single text string into a vector.
    fn embed(&self, text: &str) -> Result<Vec<f32>>;

    /// Embed a batch of text strings. Implementations may override for batched inference.
    fn embed_batch(&self, texts: &[&str]) -> Result<Vec<Vec<f32>>> {
        texts.iter().map(|t| self.embed(t)).collect()
    }
}

/// Create an embedding provider from config.
///
/// `"local"` needs the model files from `jotter model download`; `"hashing"`
/// works offline with no files at all.
pub fn create_provider(
    config: &crate::config::EmbeddingConfig,
) -> Result<Box<dyn EmbeddingProvider>> {
    match config.provider.as_str() {
        "local" => Ok(Box::new(local::LocalEmbeddingProvider::new(config)?)),
        "hashing" => Ok(Box::new(hashing::HashingEmbeddingProvider::new())),
        other => anyhow::bail!("unknown embedding provider: {other}. Supported: local, hashing"),
    }
}

/// Little-endian f32 bytes, the vector format sqlite-vec reads from a BLOB.
pub fn to_blob(embedding: &[f32]) -> Vec<u8> {
    embedding.iter().flat_map(|x| x.to_le_bytes()).collect()
}

/// L2-normalize in place. A zero vector is left as is.
pub(crate) fn l2_normalize(v: &mut [f32]) {
    let norm: f32 = v.iter().map(|x| x * x).sum::<f32>().sqrt();
    if norm > 0.0 {
        v.iter_mut().for_each(|x| *x /= norm);
    }
}
