//! Model-free embedding via feature hashing.
//!
//! Each lowercase word and each adjacent word pair is hashed (FNV-1a) into one
//! of [`EMBEDDING_DIM`] buckets with a hash-derived sign, then the vector is
//! L2-normalized. Cosine similarity therefore tracks shared vocabulary. No
//! synonyms, but deterministic and instant, which suits tests and machines
//! without the ONNX runtime.

use anyhow::Result;

use super::{l2_normalize, EmbeddingProvider, EMBEDDING_DIM};

const FNV_OFFSET: u64 = 0xcbf2_9ce4_8422_2325;
const FNV_PRIME: u64 = 0x0000_0100_0000_01b3;

/// Bigram features count for half as much as single words.
const BIGRAM_WEIGHT: f32 = 0.5;

pub const MODEL_ID: &str = "feature-hashing-384";

#[derive(Debug, Default, Clone)]
pub struct HashingEmbeddingProvider;

impl HashingEmbeddingProvider {
    pub fn new() -> Self {
        Self
    }
}

fn fnv1a(bytes: &[u8]) -> u64 {
    bytes.iter().fold(FNV_OFFSET, |hash, b| {
        (hash ^ u64::from(*b)).wrapping_mul(FNV_PRIME)
    })
}

fn add_feature(v: &mut [f32], feature: &str, weight: f32) {
    let hash = fnv1a(feature.as_bytes());
    let bucket = (hash % EMBEDDING_DIM as u64) as usize;
    let sign = if hash >> 63 == 0 { 1.0 } else { -1.0 };
    v[bucket] += sign * weight;
}

impl EmbeddingProvider for HashingEmbeddingProvider {
    fn model_id(&self) -> &str {
        MODEL_ID
    }

    fn embed(&self, text: &str) -> Result<Vec<f32>> {
        let tokens: Vec<String> = text
            .split(|c: char| !c.is_alphanumeric())
            .filter(|w| !w.is_empty())
            .map(str::to_lowercase)
            .collect();

        let mut v = vec![0.0f32; EMBEDDING_DIM];
        if tokens.is_empty() {
            // sqlite-vec refuses cosine distance against a zero vector.
            add_feature(&mut v, "\u{2205}", 1.0);
        }
        for token in &tokens {
            add_feature(&mut v, token, 1.0);
        }
        for pair in tokens.windows(2) {
            add_feature(&mut v, &format!("{} {}", pair[0], pair[1]), BIGRAM_WEIGHT);
        }

        l2_normalize(&mut v);
        Ok(v)
    }
}
