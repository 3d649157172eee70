//! Deterministic bag-of-words embeddings.
//!
//! Each lowercase alphanumeric token is hashed with SHA-256 into a bucket and a
//! sign; the accumulated vector is L2-normalized. Texts sharing tokens score a
//! higher cosine similarity, which is all example search needs offline.

use super::vectors::{normalize_vector, Vector};
use sha2::{Digest, Sha256};

pub const SIMULATED_DIMENSIONS: usize = 256;

pub fn simulated_embedding(text: &str, dims: usize) -> Vector {
    let mut v = vec![0.0f32; dims.max(1)];
    let len = v.len();
    for token in text
        .split(|c: char| !c.is_alphanumeric())
        .filter(|t| !t.is_empty())
    {
        let digest = Sha256::digest(token.to_lowercase().as_bytes());
        let bucket = u32::from_le_bytes([digest[0], digest[1], digest[2], digest[3]]) as usize % len;
        let sign = if digest[4] & 1 == 0 { 1.0 } else { -1.0 };
        v[bucket] += sign;
    }
    normalize_vector(&v)
}
