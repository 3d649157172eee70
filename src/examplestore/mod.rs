//! Example stores: few-shot examples retrievable by semantic similarity.

mod service;
mod types;

pub use service::{ExampleStoreService, MAX_EXAMPLES_PER_UPSERT, MAX_SEARCH_TOP_K};
pub use types::{
    ContentsExample, Example, ExampleStore, ExampleStoreConfig, ExpectedContent, SearchQuery,
    SearchResult, StoredContentsExample, UpsertResult,
};

pub(crate) const COLLECTION: &str = "exampleStores";

/// Embedding models an example store can be created with.
pub const SUPPORTED_EMBEDDING_MODELS: &[&str] =
    &["text-embedding-005", "text-multilingual-embedding-002"];
