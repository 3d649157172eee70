use super::hub::HubExtension;
use super::types::{Extension, ExtensionManifest, QueryResponse, RuntimeConfig};
use super::COLLECTION;
use crate::backend::{collect_all, decode, ListOptions, VertexBackend};
use crate::config::VertexConfig;
use crate::resource::full_resource_name;
use crate::types::Content;
use crate::{Error, ErrorContext, Result};
use serde_json::{json, Value};
use std::sync::Arc;
use tracing::{debug, info};

#[derive(Clone)]
pub struct ExtensionService {
    backend: Arc<dyn VertexBackend>,
    config: Arc<VertexConfig>,
}

impl ExtensionService {
    pub fn new(backend: Arc<dyn VertexBackend>, config: Arc<VertexConfig>) -> Self {
        Self { backend, config }
    }

    fn extension_name(&self, name_or_id: &str) -> Result<String> {
        full_resource_name(&self.config, COLLECTION, name_or_id)
    }

    /// Import an extension from its manifest.
    pub async fn create(
        &self,
        manifest: ExtensionManifest,
        display_name: Option<&str>,
        description: Option<&str>,
        runtime_config: Option<RuntimeConfig>,
    ) -> Result<Extension> {
        manifest.validate()?;
        let display_name = display_name.unwrap_or(manifest.name.as_str()).to_string();
        let mut body = json!({
            "displayName": display_name,
            "description": description.unwrap_or(manifest.description.as_str()),
            "manifest": manifest,
        });
        if let Some(runtime) = runtime_config {
            body["runtimeConfig"] = serde_json::to_value(runtime)?;
        }
        let target = format!("{}/{}", self.config.parent(), COLLECTION);
        debug!(display_name = display_name.as_str(), "importing extension");
        let created: Extension = decode(self.backend.invoke(&target, "import", body).await?)?;
        info!(
            extension = created.name.as_str(),
            operations = created.extension_operations.len(),
            "vertexai-preview extension imported"
        );
        Ok(created)
    }

    /// Import one of the prebuilt extensions by name.
    ///
    /// `vertex_ai_search` needs a runtime config naming its serving config.
    pub async fn from_hub(&self, name: &str, runtime_config: Option<RuntimeConfig>) -> Result<Extension> {
        let hub: HubExtension = name.parse()?;
        if hub == HubExtension::VertexAiSearch {
            let serving = runtime_config
                .as_ref()
                .and_then(|r| r.vertex_ai_search_runtime_config.as_ref())
                .map(|c| c.serving_config_name.trim())
                .unwrap_or_default();
            if serving.is_empty() {
                return Err(Error::validation_with_context(
                    "vertex_ai_search requires a serving config name",
                    ErrorContext::new()
                        .with_field_path("runtime_config.vertex_ai_search_runtime_config.serving_config_name"),
                ));
            }
        }
        self.create(hub.manifest(), Some(hub.display_name()), None, runtime_config)
            .await
    }

    pub async fn get(&self, name_or_id: &str) -> Result<Extension> {
        decode(self.backend.get(&self.extension_name(name_or_id)?).await?)
    }

    pub async fn list(&self) -> Result<Vec<Extension>> {
        collect_all(self.backend.as_ref(), &self.config.parent(), COLLECTION, ListOptions::new())
            .await?
            .into_iter()
            .map(decode)
            .collect()
    }

    pub async fn delete(&self, name_or_id: &str) -> Result<()> {
        let name = self.extension_name(name_or_id)?;
        debug!(resource = name.as_str(), "deleting extension");
        self.backend.delete(&name).await
    }

    /// Run one operation; the output is parsed as JSON when possible.
    pub async fn execute(&self, name_or_id: &str, operation_id: &str, params: Value) -> Result<Value> {
        if operation_id.trim().is_empty() {
            return Err(Error::validation_with_context(
                "operation id must not be empty",
                ErrorContext::new().with_field_path("operation_id"),
            ));
        }
        let name = self.extension_name(name_or_id)?;
        let body = json!({ "operationId": operation_id, "operationParams": params });
        debug!(resource = name.as_str(), operation_id, "executing extension operation");
        let reply = self.backend.invoke(&name, "execute", body).await?;
        Ok(match reply.get("content") {
            Some(Value::String(raw)) => {
                serde_json::from_str(raw).unwrap_or_else(|_| Value::String(raw.clone()))
            }
            Some(other) => other.clone(),
            None => Value::Null,
        })
    }

    /// Let the extension answer a conversation on its own.
    pub async fn query(&self, name_or_id: &str, contents: Vec<Content>) -> Result<QueryResponse> {
        if contents.is_empty() {
            return Err(Error::validation_with_context(
                "query needs at least one content",
                ErrorContext::new().with_field_path("contents"),
            ));
        }
        let name = self.extension_name(name_or_id)?;
        let reply = self
            .backend
            .invoke(&name, "query", json!({ "contents": contents }))
            .await?;
        decode(reply)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backend::LocalBackend;
    use crate::extensions::ApiSpec;

    fn service() -> ExtensionService {
        ExtensionService::new(
            Arc::new(LocalBackend::new()),
            Arc::new(VertexConfig::new("proj", "us-central1")),
        )
    }

    #[tokio::test]
    async fn hub_search_requires_serving_config() {
        let svc = service();
        assert!(svc.from_hub("vertex_ai_search", None).await.is_err());
        let ext = svc
            .from_hub("vertex_ai_search", Some(RuntimeConfig::vertex_ai_search("projects/p/servingConfigs/default")))
            .await
            .unwrap();
        assert!(ext.has_operation("search"));
    }

    #[tokio::test]
    async fn execute_checks_operation_ids() {
        let svc = service();
        let ext = svc.from_hub("code_interpreter", None).await.unwrap();
        let out = svc
            .execute(&ext.name, "generate_and_execute", json!({"query": "1+1"}))
            .await
            .unwrap();
        assert_eq!(out["operationId"], "generate_and_execute");
        assert!(svc.execute(&ext.name, "nope", json!({})).await.is_err());
    }

    #[tokio::test]
    async fn manifest_needs_exactly_one_spec_source() {
        let svc = service();
        let manifest = ExtensionManifest {
            name: "x".into(),
            description: "y".into(),
            api_spec: ApiSpec::default(),
            ..Default::default()
        };
        assert!(svc.create(manifest, None, None, None).await.is_err());
    }
}
