//! Embedding provider boundary.
//!
//! The index core treats embedding as an external collaborator; this
//! module defines the seam and a deterministic default that works
//! offline and in tests.

use blake3::Hasher;

use crate::Result;

/// Turns chunk text into fixed-dimension embedding vectors.
pub trait EmbeddingProvider: Send + Sync {
    /// Dimension of produced vectors.
    fn dimension(&self) -> usize;

    /// Embed a batch of texts, one vector per input.
    ///
    /// # Errors
    ///
    /// Returns an error if embedding fails.
    fn embed(&self, texts: &[String]) -> Result<Vec<Vec<f32>>>;
}

/// Default dimension for the hash embedder.
const DEFAULT_DIMENSION: usize = 256;

/// Deterministic feature-hashing embedder.
///
/// Tokenizes on non-alphanumeric boundaries, hashes each lowercased
/// token into a signed bucket, and L2-normalizes the result. Not a
/// learned model; similarity reflects token overlap, which is enough
/// for offline use and deterministic tests.
#[derive(Debug, Clone)]
pub struct HashEmbedder {
    dimension: usize,
}

impl HashEmbedder {
    /// Create an embedder with the default dimension.
    #[must_use]
    pub fn new() -> Self {
        Self {
            dimension: DEFAULT_DIMENSION,
        }
    }

    /// Create an embedder with a custom dimension.
    #[must_use]
    pub fn with_dimension(dimension: usize) -> Self {
        Self { dimension }
    }

    fn embed_one(&self, text: &str) -> Vec<f32> {
        let mut vector = vec![0.0f32; self.dimension];

        for token in text
            .split(|c: char| !c.is_alphanumeric())
            .filter(|t| !t.is_empty())
        {
            let token = token.to_lowercase();
            let mut hasher = Hasher::new();
            hasher.update(token.as_bytes());
            let digest = hasher.finalize();
            let bytes = digest.as_bytes();

            let hash = u64::from_le_bytes([
                bytes[0], bytes[1], bytes[2], bytes[3], bytes[4], bytes[5], bytes[6], bytes[7],
            ]);
            #[allow(clippy::cast_possible_truncation)]
            let bucket = (hash % self.dimension as u64) as usize;
            let sign = if bytes[8] & 1 == 0 { 1.0 } else { -1.0 };
            vector[bucket] += sign;
        }

        let norm: f32 = vector.iter().map(|v| v * v).sum::<f32>().sqrt();
        if norm > 0.0 {
            for v in &mut vector {
                *v /= norm;
            }
        }

        vector
    }
}

impl Default for HashEmbedder {
    fn default() -> Self {
        Self::new()
    }
}

impl EmbeddingProvider for HashEmbedder {
    fn dimension(&self) -> usize {
        self.dimension
    }

    fn embed(&self, texts: &[String]) -> Result<Vec<Vec<f32>>> {
        Ok(texts.iter().map(|t| self.embed_one(t)).collect())
    }
}
