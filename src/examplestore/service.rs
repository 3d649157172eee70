use super::types::{Example, ExampleStore, ExampleStoreConfig, SearchQuery, SearchResult, UpsertResult};
use super::{COLLECTION, SUPPORTED_EMBEDDING_MODELS};
use crate::backend::{collect_all, decode, ListOptions, VertexBackend};
use crate::config::VertexConfig;
use crate::resource::full_resource_name;
use crate::{Error, ErrorContext, Result};
use serde_json::{json, Value};
use std::cmp::Ordering;
use std::sync::Arc;
use tracing::{debug, info};

pub const MAX_EXAMPLES_PER_UPSERT: usize = 5;
pub const MAX_SEARCH_TOP_K: usize = 100;

#[derive(Clone)]
pub struct ExampleStoreService {
    backend: Arc<dyn VertexBackend>,
    config: Arc<VertexConfig>,
}

impl ExampleStoreService {
    pub fn new(backend: Arc<dyn VertexBackend>, config: Arc<VertexConfig>) -> Self {
        Self { backend, config }
    }

    fn store_name(&self, store: &str) -> Result<String> {
        full_resource_name(&self.config, COLLECTION, store)
    }

    pub async fn create_store(
        &self,
        display_name: &str,
        description: Option<&str>,
        config: ExampleStoreConfig,
    ) -> Result<ExampleStore> {
        if display_name.trim().is_empty() {
            return Err(Error::validation_with_context(
                "example store display name must not be empty",
                ErrorContext::new().with_field_path("display_name"),
            ));
        }
        validate_embedding_model(&config.vertex_embedding_model)?;
        let mut body = json!({
            "displayName": display_name,
            "exampleStoreConfig": config,
        });
        if let Some(description) = description {
            body["description"] = json!(description);
        }
        debug!(display_name, "creating example store");
        let created = self
            .backend
            .create(&self.config.parent(), COLLECTION, body)
            .await?;
        decode(created)
    }

    pub async fn get_store(&self, store: &str) -> Result<ExampleStore> {
        decode(self.backend.get(&self.store_name(store)?).await?)
    }

    pub async fn list_stores(&self) -> Result<Vec<ExampleStore>> {
        collect_all(self.backend.as_ref(), &self.config.parent(), COLLECTION, ListOptions::new())
            .await?
            .into_iter()
            .map(decode)
            .collect()
    }

    /// Delete a store together with all of its examples.
    pub async fn delete_store(&self, store: &str) -> Result<()> {
        let name = self.store_name(store)?;
        debug!(resource = name.as_str(), "deleting example store");
        self.backend.delete(&name).await
    }

    /// Insert or replace up to five examples; results come back in input order.
    ///
    /// Without `overwrite`, an example whose id already exists yields a result
    /// carrying an error status instead of failing the whole call.
    pub async fn upsert_examples(
        &self,
        store: &str,
        examples: Vec<Example>,
        overwrite: bool,
    ) -> Result<Vec<UpsertResult>> {
        if examples.is_empty() || examples.len() > MAX_EXAMPLES_PER_UPSERT {
            return Err(Error::validation_with_context(
                format!(
                    "upsert takes between 1 and {} examples, got {}",
                    MAX_EXAMPLES_PER_UPSERT,
                    examples.len()
                ),
                ErrorContext::new().with_field_path("examples"),
            ));
        }
        let name = self.store_name(store)?;
        let examples: Vec<Example> = examples.into_iter().map(with_default_search_key).collect();
        if let Some(pos) = examples.iter().position(|e| e.search_key().is_none()) {
            return Err(Error::validation_with_context(
                "example has neither a search key nor a user turn to derive one from",
                ErrorContext::new().with_field_path(format!("examples[{}]", pos)),
            ));
        }
        let body = json!({ "examples": examples, "overwrite": overwrite });
        let reply = self.backend.invoke(&name, "upsertExamples", body).await?;
        let results: Vec<UpsertResult> = decode(field_or_empty(reply, "results"))?;
        let failed = results.iter().filter(|r| !r.is_ok()).count();
        info!(
            resource = name.as_str(),
            upserted = results.len() - failed,
            failed,
            "vertexai-preview upserted examples"
        );
        Ok(results)
    }

    /// Returns the ids that were actually removed.
    pub async fn remove_examples(&self, store: &str, example_ids: &[String]) -> Result<Vec<String>> {
        if example_ids.is_empty() {
            return Err(Error::validation_with_context(
                "at least one example id is required",
                ErrorContext::new().with_field_path("example_ids"),
            ));
        }
        let name = self.store_name(store)?;
        let reply = self
            .backend
            .invoke(&name, "removeExamples", json!({ "exampleIds": example_ids }))
            .await?;
        match reply.get("exampleIds") {
            Some(ids) => decode(ids.clone()),
            None => Ok(example_ids.to_vec()),
        }
    }

    /// Fetch the given examples, or every example when `example_ids` is empty.
    pub async fn fetch_examples(&self, store: &str, example_ids: &[String]) -> Result<Vec<Example>> {
        let name = self.store_name(store)?;
        let mut out = Vec::new();
        let mut token: Option<String> = None;
        loop {
            let mut body = json!({ "exampleIds": example_ids });
            if let Some(t) = &token {
                body["pageToken"] = json!(t);
            }
            let mut reply = self.backend.invoke(&name, "fetchExamples", body).await?;
            let page: Vec<Example> = decode(field_or_empty(reply.take(), "examples"))?;
            out.extend(page);
            token = reply
                .get("nextPageToken")
                .and_then(Value::as_str)
                .filter(|t| !t.is_empty())
                .map(String::from);
            if token.is_none() {
                return Ok(out);
            }
        }
    }

    /// Nearest examples to `query`, most similar first.
    pub async fn search_examples(
        &self,
        store: &str,
        query: impl Into<SearchQuery>,
        top_k: usize,
    ) -> Result<Vec<SearchResult>> {
        if top_k == 0 || top_k > MAX_SEARCH_TOP_K {
            return Err(Error::validation_with_context(
                format!("top_k must be in 1..={}, got {}", MAX_SEARCH_TOP_K, top_k),
                ErrorContext::new().with_field_path("top_k"),
            ));
        }
        let name = self.store_name(store)?;
        let params = match query.into() {
            SearchQuery::SearchKey(key) => json!({ "searchKey": key }),
            SearchQuery::Contents(contents) => {
                if contents.is_empty() {
                    return Err(Error::validation_with_context(
                        "content search key needs at least one content",
                        ErrorContext::new().with_field_path("query"),
                    ));
                }
                json!({
                    "contentSearchKey": {
                        "contents": contents,
                        "searchKeyGenerationMethod": { "lastEntry": {} },
                    }
                })
            }
        };
        let body = json!({ "storedContentsExampleParameters": params, "topK": top_k });
        debug!(resource = name.as_str(), top_k, "searching examples");
        let reply = self.backend.invoke(&name, "searchExamples", body).await?;
        let mut results: Vec<SearchResult> = decode(field_or_empty(reply, "results"))?;
        results.sort_by(|a, b| {
            b.similarity_score
                .partial_cmp(&a.similarity_score)
                .unwrap_or(Ordering::Equal)
        });
        results.truncate(top_k);
        Ok(results)
    }
}

fn validate_embedding_model(model: &str) -> Result<()> {
    let short = model.rsplit("models/").next().unwrap_or(model);
    let publisher_ok = !model.contains("publishers/") || model.contains("publishers/google/");
    if publisher_ok && SUPPORTED_EMBEDDING_MODELS.contains(&short) {
        return Ok(());
    }
    Err(Error::validation_with_context(
        format!("unsupported embedding model '{}'", model),
        ErrorContext::new()
            .with_field_path("example_store_config.vertex_embedding_model")
            .with_details(format!("supported: {}", SUPPORTED_EMBEDDING_MODELS.join(", "))),
    ))
}

fn with_default_search_key(mut example: Example) -> Example {
    let stored = &mut example.stored_contents_example;
    if stored.search_key.as_deref().map(str::is_empty).unwrap_or(true) {
        stored.search_key = stored.default_search_key();
    }
    example
}

fn field_or_empty(mut reply: Value, field: &str) -> Value {
    match reply.get_mut(field).map(Value::take) {
        Some(v @ Value::Array(_)) => v,
        _ => Value::Array(Vec::new()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backend::LocalBackend;
    use crate::types::Content;

    fn service() -> ExampleStoreService {
        ExampleStoreService::new(
            Arc::new(LocalBackend::new()),
            Arc::new(VertexConfig::new("proj", "us-central1")),
        )
    }

    #[test]
    fn embedding_model_forms() {
        assert!(validate_embedding_model("text-embedding-005").is_ok());
        assert!(validate_embedding_model("publishers/google/models/text-multilingual-embedding-002").is_ok());
        assert!(validate_embedding_model("text-embedding-004").is_err());
        assert!(validate_embedding_model("publishers/acme/models/text-embedding-005").is_err());
    }

    #[tokio::test]
    async fn upsert_bounds() {
        let svc = service();
        let store = svc
            .create_store("faq", None, ExampleStoreConfig::new("text-embedding-005"))
            .await
            .unwrap();
        assert!(svc.upsert_examples(&store.name, vec![], false).await.is_err());
        let six = vec![Example::new(vec![Content::user("q")], vec![]); 6];
        assert!(svc.upsert_examples(&store.name, six, false).await.is_err());
    }

    #[tokio::test]
    async fn search_top_k_bounds() {
        let svc = service();
        assert!(svc.search_examples("s1", "q", 0).await.is_err());
        assert!(svc.search_examples("s1", "q", 101).await.is_err());
    }

    #[test]
    fn search_key_defaults_to_last_user_turn() {
        let ex = with_default_search_key(Example::new(
            vec![Content::user("first"), Content::model("reply"), Content::user("second")],
            vec![Content::model("answer")],
        ));
        assert_eq!(ex.search_key(), Some("second"));
    }
}
