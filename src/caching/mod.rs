//! Context caching (`cachedContents`).
//!
//! A cached content holds a prefix of a conversation (contents, system
//! instruction, tools) that later generation calls can reference by name
//! instead of resending it. Entries expire after a TTL or at a fixed time,
//! modelled by [`Expiration`].

mod service;
mod types;

pub use service::CachingService;
pub use types::{CacheUsageMetadata, CachedContent, CreateCachedContentRequest, Expiration};

pub(crate) const COLLECTION: &str = "cachedContents";
