use super::types::{CachedContent, CreateCachedContentRequest, Expiration};
use super::COLLECTION;
use crate::backend::{collect_all, decode, ListOptions, VertexBackend};
use crate::config::VertexConfig;
use crate::resource::{full_model_name, full_resource_name};
use crate::Result;
use serde_json::{Map, Value};
use std::sync::Arc;
use tracing::debug;

/// Create, inspect and expire cached contents.
#[derive(Clone)]
pub struct CachingService {
    backend: Arc<dyn VertexBackend>,
    config: Arc<VertexConfig>,
}

impl CachingService {
    pub fn new(backend: Arc<dyn VertexBackend>, config: Arc<VertexConfig>) -> Self {
        Self { backend, config }
    }

    pub async fn create(&self, request: CreateCachedContentRequest) -> Result<CachedContent> {
        request.validate()?;
        let model = full_model_name(&self.config, &request.model)?;
        let body = request.to_body(model)?;
        debug!(model = body["model"].as_str().unwrap_or_default(), "creating cached content");
        let created = self
            .backend
            .create(&self.config.parent(), COLLECTION, body)
            .await?;
        decode(created)
    }

    pub async fn get(&self, name_or_id: &str) -> Result<CachedContent> {
        let name = full_resource_name(&self.config, COLLECTION, name_or_id)?;
        decode(self.backend.get(&name).await?)
    }

    /// Every cached content under the configured location.
    pub async fn list(&self) -> Result<Vec<CachedContent>> {
        collect_all(self.backend.as_ref(), &self.config.parent(), COLLECTION, ListOptions::new())
            .await?
            .into_iter()
            .map(decode)
            .collect()
    }

    /// One page of cached contents plus the token for the next page.
    pub async fn list_page(&self, options: ListOptions) -> Result<(Vec<CachedContent>, Option<String>)> {
        let page = self
            .backend
            .list(&self.config.parent(), COLLECTION, &options)
            .await?;
        let items = page.items.into_iter().map(decode).collect::<Result<Vec<_>>>()?;
        Ok((items, page.next_page_token))
    }

    /// Change only the expiration; every other field of a cached content is immutable.
    pub async fn update(&self, name_or_id: &str, expiration: Expiration) -> Result<CachedContent> {
        expiration.validate()?;
        let name = full_resource_name(&self.config, COLLECTION, name_or_id)?;
        let (field, value) = expiration.to_field();
        let mut body = Map::new();
        body.insert(field.to_string(), value);
        let mask = if field == "ttl" { "ttl" } else { "expire_time" };
        debug!(resource = name.as_str(), field, "updating cached content expiration");
        let updated = self
            .backend
            .patch(&name, Value::Object(body), &[mask])
            .await?;
        decode(updated)
    }

    pub async fn delete(&self, name_or_id: &str) -> Result<()> {
        let name = full_resource_name(&self.config, COLLECTION, name_or_id)?;
        debug!(resource = name.as_str(), "deleting cached content");
        self.backend.delete(&name).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backend::LocalBackend;
    use crate::Error;
    use crate::types::Content;
    use chrono::Utc;
    use std::time::Duration;

    fn service() -> CachingService {
        CachingService::new(
            Arc::new(LocalBackend::new()),
            Arc::new(VertexConfig::new("proj", "us-central1")),
        )
    }

    #[tokio::test]
    async fn huge_ttl_is_a_validation_error() {
        let svc = service();
        let err = svc
            .create(
                CreateCachedContentRequest::new("gemini-1.5-pro-002")
                    .with_contents(vec![Content::user("doc")])
                    .with_ttl(Duration::from_secs(10_000_000_000_000)),
            )
            .await
            .unwrap_err();
        assert!(matches!(err, Error::Validation { .. }));

        let cc = svc
            .create(
                CreateCachedContentRequest::new("gemini-1.5-pro-002")
                    .with_contents(vec![Content::user("doc")]),
            )
            .await
            .unwrap();
        let err = svc
            .update(&cc.name, Expiration::Ttl(Duration::from_secs(10_000_000_000_000)))
            .await
            .unwrap_err();
        assert!(matches!(err, Error::Validation { .. }));
    }

    #[tokio::test]
    async fn create_resolves_model_and_ttl() {
        let svc = service();
        let cc = svc
            .create(
                CreateCachedContentRequest::new("gemini-1.5-pro-002")
                    .with_contents(vec![Content::user("a long document")])
                    .with_ttl(Duration::from_secs(300)),
            )
            .await
            .unwrap();
        assert_eq!(
            cc.model,
            "projects/proj/locations/us-central1/publishers/google/models/gemini-1.5-pro-002"
        );
        assert!(cc.expire_time.unwrap() > Utc::now());
        assert!(cc.usage_metadata.as_ref().unwrap().total_token_count.unwrap() > 0);
        assert_eq!(svc.get(cc.resource_id()).await.unwrap().name, cc.name);
    }

    #[tokio::test]
    async fn update_to_past_time_expires_entry() {
        let svc = service();
        let cc = svc
            .create(CreateCachedContentRequest::new("gemini-1.5-pro-002").with_contents(vec![Content::user("x")]))
            .await
            .unwrap();
        svc.update(&cc.name, Expiration::ExpireTime(Utc::now() - chrono::Duration::seconds(5)))
            .await
            .unwrap();
        assert!(svc.get(&cc.name).await.unwrap_err().is_not_found());
        assert!(svc.list().await.unwrap().is_empty());
    }
}
