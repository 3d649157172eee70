//! Resource backends.
//!
//! Every service talks to Vertex through the [`VertexBackend`] trait, which
//! models the generic REST resource surface: standard `create/get/list/patch/delete`
//! methods plus custom `name:verb` methods.
//!
//! | Backend | Description |
//! |---------|-------------|
//! | [`RestBackend`] | HTTPS calls to the Vertex AI REST API, with LRO polling |
//! | [`LocalBackend`] | In-process emulator of the same surface, for tests and offline use |

mod local;
mod operation;
mod rest;

pub use local::LocalBackend;
pub use operation::Operation;
pub use rest::RestBackend;

use crate::{BoxStream, Error, Result};
use async_trait::async_trait;
use serde_json::Value;
use std::collections::VecDeque;

#[async_trait]
pub trait VertexBackend: Send + Sync {
    /// `POST {parent}/{collection}`; returns the created resource (LROs already resolved).
    async fn create(&self, parent: &str, collection: &str, body: Value) -> Result<Value>;
    async fn get(&self, name: &str) -> Result<Value>;
    async fn list(&self, parent: &str, collection: &str, options: &ListOptions) -> Result<ListPage>;
    /// Update the fields named in `update_mask` (all fields present in `body` when empty).
    async fn patch(&self, name: &str, body: Value, update_mask: &[&str]) -> Result<Value>;
    async fn delete(&self, name: &str) -> Result<()>;
    /// Custom method `POST {name}:{verb}`.
    async fn invoke(&self, name: &str, verb: &str, body: Value) -> Result<Value>;
    fn name(&self) -> &'static str;
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ListOptions {
    pub page_size: Option<u32>,
    pub page_token: Option<String>,
    /// AIP-160 style filter, e.g. `display_name="docs"`.
    pub filter: Option<String>,
    pub order_by: Option<String>,
}

impl ListOptions {
    pub fn new() -> Self {
        Self::default()
    }
    pub fn with_page_size(mut self, size: u32) -> Self {
        self.page_size = Some(size);
        self
    }
    pub fn with_page_token(mut self, token: impl Into<String>) -> Self {
        self.page_token = Some(token.into());
        self
    }
    pub fn with_filter(mut self, filter: impl Into<String>) -> Self {
        self.filter = Some(filter.into());
        self
    }
    pub fn with_order_by(mut self, order_by: impl Into<String>) -> Self {
        self.order_by = Some(order_by.into());
        self
    }
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct ListPage {
    pub items: Vec<Value>,
    pub next_page_token: Option<String>,
}

impl ListPage {
    pub fn has_more(&self) -> bool {
        self.next_page_token.as_deref().map(|t| !t.is_empty()).unwrap_or(false)
    }
}

/// Follow page tokens until the listing is exhausted.
pub async fn collect_all(
    backend: &dyn VertexBackend,
    parent: &str,
    collection: &str,
    mut options: ListOptions,
) -> Result<Vec<Value>> {
    let mut out = Vec::new();
    loop {
        let page = backend.list(parent, collection, &options).await?;
        let more = page.has_more();
        out.extend(page.items);
        match page.next_page_token {
            Some(token) if more => options.page_token = Some(token),
            _ => return Ok(out),
        }
    }
}

/// Lazily yield every item of a listing, fetching pages on demand.
pub fn list_stream<'a>(
    backend: &'a dyn VertexBackend,
    parent: &'a str,
    collection: &'a str,
    options: ListOptions,
) -> BoxStream<'a, Value> {
    let state = (options, VecDeque::<Value>::new(), false);
    Box::pin(futures::stream::try_unfold(
        state,
        move |(mut options, mut buffer, mut exhausted)| async move {
            loop {
                if let Some(item) = buffer.pop_front() {
                    return Ok::<_, Error>(Some((item, (options, buffer, exhausted))));
                }
                if exhausted {
                    return Ok(None);
                }
                let page = backend.list(parent, collection, &options).await?;
                exhausted = !page.has_more();
                buffer.extend(page.items);
                options.page_token = page.next_page_token;
            }
        },
    ))
}

/// Decode a backend JSON value into a typed resource.
pub(crate) fn decode<T: serde::de::DeserializeOwned>(value: Value) -> Result<T> {
    Ok(serde_json::from_value(value)?)
}

#[cfg(test)]
mod tests {
    use super::*;
    use futures::TryStreamExt;
    use serde_json::json;

    const PARENT: &str = "projects/p/locations/us-central1";

    async fn seeded(n: usize) -> LocalBackend {
        let backend = LocalBackend::new();
        for i in 0..n {
            backend
                .create(PARENT, "datasets", json!({"displayName": format!("ds-{i}")}))
                .await
                .unwrap();
        }
        backend
    }

    #[tokio::test]
    async fn collect_all_follows_tokens() {
        let backend = seeded(7).await;
        let all = collect_all(&backend, PARENT, "datasets", ListOptions::new().with_page_size(3))
            .await
            .unwrap();
        assert_eq!(all.len(), 7);
        assert_eq!(all[0]["displayName"], "ds-0");
        assert_eq!(all[6]["displayName"], "ds-6");
    }

    #[tokio::test]
    async fn stream_yields_every_item_in_order() {
        let backend = seeded(5).await;
        let names: Vec<String> = list_stream(&backend, PARENT, "datasets", ListOptions::new().with_page_size(2))
            .map_ok(|v| v["displayName"].as_str().unwrap_or_default().to_string())
            .try_collect()
            .await
            .unwrap();
        assert_eq!(names, vec!["ds-0", "ds-1", "ds-2", "ds-3", "ds-4"]);
    }

    #[test]
    fn empty_listing_has_no_next_page() {
        let backend = LocalBackend::new();
        let page = tokio_test::block_on(backend.list(PARENT, "datasets", &ListOptions::new())).unwrap();
        assert!(page.items.is_empty());
        assert!(!page.has_more());
    }
}
