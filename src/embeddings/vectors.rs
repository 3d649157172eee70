//! Vector operations over `f32` embeddings.

use crate::{Error, Result};
use std::cmp::Ordering;

pub type Vector = Vec<f32>;

fn check_dims(a: &[f32], b: &[f32]) -> Result<()> {
    if a.len() != b.len() {
        return Err(Error::validation(format!(
            "embedding dimensions differ: {} != {}",
            a.len(),
            b.len()
        )));
    }
    Ok(())
}

pub fn dot_product(a: &[f32], b: &[f32]) -> Result<f32> {
    check_dims(a, b)?;
    Ok(a.iter().zip(b).map(|(x, y)| x * y).sum())
}

pub fn magnitude(v: &[f32]) -> f32 {
    v.iter().map(|x| x * x).sum::<f32>().sqrt()
}

/// Unit-length copy of `v`; the zero vector is returned unchanged.
pub fn normalize_vector(v: &[f32]) -> Vector {
    let mag = magnitude(v);
    if mag == 0.0 {
        return v.to_vec();
    }
    v.iter().map(|x| x / mag).collect()
}

/// Cosine of the angle between `a` and `b`; 0.0 when either is the zero vector.
pub fn cosine_similarity(a: &[f32], b: &[f32]) -> Result<f32> {
    let dot = dot_product(a, b)?;
    let (mag_a, mag_b) = (magnitude(a), magnitude(b));
    if mag_a == 0.0 || mag_b == 0.0 {
        return Ok(0.0);
    }
    Ok(dot / (mag_a * mag_b))
}

#[derive(Debug, Clone, PartialEq)]
pub struct SimilarityResult {
    pub index: usize,
    pub score: f32,
}

/// Rank `candidates` by cosine similarity to `query`, best first, keeping `top_k`.
///
/// Ties keep candidate order. Candidates whose dimensions differ from the
/// query are skipped.
pub fn find_most_similar(
    query: &[f32],
    candidates: &[Vec<f32>],
    top_k: usize,
) -> Result<Vec<SimilarityResult>> {
    if top_k == 0 {
        return Err(Error::validation("top_k must be at least 1"));
    }
    let mut scored: Vec<SimilarityResult> = candidates
        .iter()
        .enumerate()
        .filter_map(|(index, c)| {
            cosine_similarity(query, c)
                .ok()
                .map(|score| SimilarityResult { index, score })
        })
        .collect();
    scored.sort_by(|a, b| b.score.partial_cmp(&a.score).unwrap_or(Ordering::Equal));
    scored.truncate(top_k);
    Ok(scored)
}

#[cfg(test)]
mod tests {
    use super::*;

    const EPSILON: f32 = 1e-6;

    fn approx_eq(a: f32, b: f32) -> bool {
        (a - b).abs() < EPSILON
    }

    #[test]
    fn dot_product_and_mismatch() {
        assert!(approx_eq(dot_product(&[1.0, 2.0, 3.0], &[4.0, 5.0, 6.0]).unwrap(), 32.0));
        assert!(dot_product(&[1.0, 2.0], &[1.0]).is_err());
    }

    #[test]
    fn normalize_yields_unit_length() {
        let n = normalize_vector(&[3.0, 4.0]);
        assert!(approx_eq(n[0], 0.6));
        assert!(approx_eq(magnitude(&n), 1.0));
        assert_eq!(normalize_vector(&[0.0, 0.0]), vec![0.0, 0.0]);
    }

    #[test]
    fn cosine_edges() {
        assert!(approx_eq(cosine_similarity(&[1.0, 2.0], &[1.0, 2.0]).unwrap(), 1.0));
        assert!(approx_eq(cosine_similarity(&[1.0, 2.0], &[-1.0, -2.0]).unwrap(), -1.0));
        assert!(approx_eq(cosine_similarity(&[0.0, 0.0], &[1.0, 1.0]).unwrap(), 0.0));
    }

    #[test]
    fn ranking_is_descending_and_truncated() {
        let query = [1.0, 0.0];
        let candidates = vec![vec![0.0, 1.0], vec![1.0, 0.0], vec![0.7, 0.7], vec![1.0]];
        let hits = find_most_similar(&query, &candidates, 2).unwrap();
        assert_eq!(hits.len(), 2);
        assert_eq!(hits[0].index, 1);
        assert_eq!(hits[1].index, 2);
        assert!(find_most_similar(&query, &candidates, 0).is_err());
    }
}
