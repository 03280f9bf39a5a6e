//! Similarity computation and ranking for embeddings.

use std::str::FromStr;

use ordered_float::OrderedFloat;
use serde::{Deserialize, Serialize};

use crate::error::{EmbeddingError, Result};

/// How two embeddings are compared.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SimilarityMethod {
    /// Dot product divided by the product of the norms.
    Cosine,
    /// Raw dot product.
    Dot,
}

impl FromStr for SimilarityMethod {
    type Err = EmbeddingError;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "cosine" => Ok(Self::Cosine),
            "dot" => Ok(Self::Dot),
            other => Err(EmbeddingError::UnsupportedSimilarity(other.to_string())),
        }
    }
}

impl std::fmt::Display for SimilarityMethod {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Cosine => f.write_str("cosine"),
            Self::Dot => f.write_str("dot"),
        }
    }
}

/// Compute the cosine similarity between two embeddings.
///
/// Returns a value between -1.0 and 1.0, where:
/// - 1.0 means identical direction
/// - 0.0 means orthogonal vectors (or a zero vector on either side)
/// - -1.0 means opposite vectors
pub fn cosine_similarity(a: &[f32], b: &[f32]) -> Result<f32> {
    let dot = dot_product(a, b)?;
    let magnitude_a = magnitude(a);
    let magnitude_b = magnitude(b);

    if magnitude_a == 0.0 || magnitude_b == 0.0 {
        return Ok(0.0);
    }

    Ok(dot / (magnitude_a * magnitude_b))
}

/// Compute the dot product between two embeddings.
pub fn dot_product(a: &[f32], b: &[f32]) -> Result<f32> {
    if a.len() != b.len() {
        return Err(EmbeddingError::DimensionMismatch {
            expected: a.len(),
            actual: b.len(),
        });
    }

    Ok(a.iter().zip(b.iter()).map(|(x, y)| x * y).sum())
}

/// Score two embeddings with the given method.
pub fn similarity(a: &[f32], b: &[f32], method: SimilarityMethod) -> Result<f32> {
    match method {
        SimilarityMethod::Cosine => cosine_similarity(a, b),
        SimilarityMethod::Dot => dot_product(a, b),
    }
}

fn magnitude(v: &[f32]) -> f32 {
    v.iter().map(|x| x * x).sum::<f32>().sqrt()
}

/// Normalize an embedding to unit length. Zero vectors are left untouched.
pub fn normalize(embedding: &mut [f32]) {
    let magnitude = magnitude(embedding);
    if magnitude > 0.0 {
        for x in embedding.iter_mut() {
            *x /= magnitude;
        }
    }
}

/// A candidate ranked against a query.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SimilarMatch {
    /// Position of the candidate in the input list.
    pub index: usize,

    /// The candidate text.
    pub text: String,

    /// Similarity to the query.
    pub similarity: f32,
}

/// Rank candidates against a query by dot product and keep the best `k`.
///
/// Both sides are expected to be unit-normalized, so the dot product is the
/// cosine similarity. Ties keep their original candidate order.
pub fn rank_by_dot(
    query: &[f32],
    candidates: &[String],
    embeddings: &[Vec<f32>],
    k: usize,
) -> Result<Vec<SimilarMatch>> {
    let mut scored = Vec::with_capacity(candidates.len());
    for (index, (text, embedding)) in candidates.iter().zip(embeddings).enumerate() {
        scored.push(SimilarMatch {
            index,
            text: text.clone(),
            similarity: dot_product(query, embedding)?,
        });
    }

    // Stable sort, descending by score.
    scored.sort_by(|a, b| OrderedFloat(b.similarity).cmp(&OrderedFloat(a.similarity)));
    scored.truncate(k);

    Ok(scored)
}
