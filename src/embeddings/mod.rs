//! Embedding vectors used for example-store retrieval.
//!
//! - Vector math (similarity, normalization, top-k ranking)
//! - Deterministic simulated embeddings for the local backend

mod simulated;
mod vectors;

pub use simulated::{simulated_embedding, SIMULATED_DIMENSIONS};
pub use vectors::{
    cosine_similarity, dot_product, find_most_similar, magnitude, normalize_vector,
    SimilarityResult, Vector,
};
