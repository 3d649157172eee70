use super::prompt::Prompt;
use crate::backend::{collect_all, ListOptions, VertexBackend};
use crate::config::VertexConfig;
use crate::resource::{full_resource_name, resource_id};
use crate::{Error, ErrorContext, Result};
use serde_json::{json, Value};
use std::sync::Arc;
use tracing::{debug, info};

/// Datasets carrying this schema are prompts.
pub const PROMPT_METADATA_SCHEMA_URI: &str =
    "gs://google-cloud-aiplatform/schema/dataset/metadata/text_prompt_1.0.0.yaml";

const DATASETS: &str = "datasets";
const VERSIONS: &str = "datasetVersions";
const DEFAULT_PROMPT_NAME: &str = "Untitled Prompt";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PromptMetadata {
    pub prompt_id: String,
    pub display_name: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PromptVersionMetadata {
    pub prompt_id: String,
    pub version_id: String,
    pub display_name: String,
}

/// Save, version and restore prompts as Vertex datasets.
#[derive(Clone)]
pub struct PromptService {
    backend: Arc<dyn VertexBackend>,
    config: Arc<VertexConfig>,
}

impl PromptService {
    pub fn new(backend: Arc<dyn VertexBackend>, config: Arc<VertexConfig>) -> Self {
        Self { backend, config }
    }

    fn dataset_name(&self, prompt_id: &str) -> Result<String> {
        full_resource_name(&self.config, DATASETS, prompt_id)
    }

    fn version_name(&self, prompt_id: &str, version_id: &str) -> Result<String> {
        if !crate::resource::is_valid_id(version_id) {
            return Err(Error::validation_with_context(
                format!("'{}' is not a valid version id", version_id),
                ErrorContext::new().with_field_path("version_id"),
            ));
        }
        Ok(format!("{}/{}/{}", self.dataset_name(prompt_id)?, VERSIONS, version_id))
    }

    /// Persist `prompt` and snapshot it as a new version.
    ///
    /// The backing dataset is created on first save and updated afterwards.
    /// Returns the prompt with its ids filled in.
    pub async fn create_version(&self, prompt: &Prompt, version_name: Option<&str>) -> Result<Prompt> {
        prompt.validate()?;
        let metadata = prompt.to_dataset_metadata()?;
        let display_name = prompt
            .prompt_name
            .clone()
            .unwrap_or_else(|| DEFAULT_PROMPT_NAME.to_string());

        let dataset = match &prompt.prompt_id {
            None => {
                let body = json!({
                    "displayName": display_name,
                    "metadataSchemaUri": PROMPT_METADATA_SCHEMA_URI,
                    "metadata": metadata,
                });
                debug!(display_name = display_name.as_str(), "creating prompt dataset");
                self.backend
                    .create(&self.config.parent(), DATASETS, body)
                    .await?
            }
            Some(id) => {
                let name = self.dataset_name(id)?;
                let body = json!({ "displayName": display_name, "metadata": metadata });
                debug!(resource = name.as_str(), "updating prompt dataset");
                self.backend
                    .patch(&name, body, &["display_name", "metadata"])
                    .await?
            }
        };
        let dataset_name = required_str(&dataset, "name")?.to_string();

        let mut version_body = json!({ "metadata": metadata });
        if let Some(v) = version_name {
            version_body["displayName"] = json!(v);
        }
        let version = self
            .backend
            .create(&dataset_name, VERSIONS, version_body)
            .await?;
        let version_resource = required_str(&version, "name")?;

        let mut saved = prompt.clone();
        saved.prompt_name = Some(display_name);
        saved.prompt_id = Some(resource_id(&dataset_name).to_string());
        saved.version_id = Some(resource_id(version_resource).to_string());
        saved.version_name = version_name.map(String::from);
        info!(
            prompt = dataset_name.as_str(),
            version = version_resource,
            "vertexai-preview prompt version saved"
        );
        Ok(saved)
    }

    /// Load the latest state of a prompt, or a specific version of it.
    pub async fn get(&self, prompt_id: &str, version_id: Option<&str>) -> Result<Prompt> {
        let dataset = self.backend.get(&self.dataset_name(prompt_id)?).await?;
        ensure_prompt_dataset(&dataset)?;
        let mut prompt = match version_id {
            None => Prompt::from_dataset_metadata(dataset["metadata"].clone())?,
            Some(vid) => {
                let version = self.backend.get(&self.version_name(prompt_id, vid)?).await?;
                let mut p = Prompt::from_dataset_metadata(version["metadata"].clone())?;
                p.version_id = Some(vid.to_string());
                p.version_name = version["displayName"].as_str().map(String::from);
                p
            }
        };
        prompt.prompt_id = Some(resource_id(required_str(&dataset, "name")?).to_string());
        prompt.prompt_name = dataset["displayName"].as_str().map(String::from);
        Ok(prompt)
    }

    pub async fn list(&self) -> Result<Vec<PromptMetadata>> {
        let options =
            ListOptions::new().with_filter(format!("metadata_schema_uri=\"{}\"", PROMPT_METADATA_SCHEMA_URI));
        let datasets = collect_all(self.backend.as_ref(), &self.config.parent(), DATASETS, options).await?;
        Ok(datasets
            .iter()
            .filter_map(|d| {
                let name = d["name"].as_str()?;
                Some(PromptMetadata {
                    prompt_id: resource_id(name).to_string(),
                    display_name: d["displayName"].as_str().unwrap_or_default().to_string(),
                })
            })
            .collect())
    }

    pub async fn list_versions(&self, prompt_id: &str) -> Result<Vec<PromptVersionMetadata>> {
        let dataset = self.dataset_name(prompt_id)?;
        let versions = collect_all(self.backend.as_ref(), &dataset, VERSIONS, ListOptions::new()).await?;
        let prompt_id = resource_id(&dataset).to_string();
        Ok(versions
            .iter()
            .filter_map(|v| {
                let name = v["name"].as_str()?;
                Some(PromptVersionMetadata {
                    prompt_id: prompt_id.clone(),
                    version_id: resource_id(name).to_string(),
                    display_name: v["displayName"].as_str().unwrap_or_default().to_string(),
                })
            })
            .collect())
    }

    /// Delete a prompt and all of its versions.
    pub async fn delete(&self, prompt_id: &str) -> Result<()> {
        let name = self.dataset_name(prompt_id)?;
        debug!(resource = name.as_str(), "deleting prompt");
        self.backend.delete(&name).await
    }

    /// Make `version_id` the current state of the prompt.
    pub async fn restore_version(&self, prompt_id: &str, version_id: &str) -> Result<Prompt> {
        let version = self.version_name(prompt_id, version_id)?;
        debug!(resource = version.as_str(), "restoring prompt version");
        self.backend.invoke(&version, "restore", json!({})).await?;
        let mut prompt = self.get(prompt_id, None).await?;
        prompt.version_id = Some(version_id.to_string());
        Ok(prompt)
    }
}

fn required_str<'a>(value: &'a Value, field: &str) -> Result<&'a str> {
    value[field].as_str().ok_or_else(|| {
        Error::runtime_with_context(
            format!("backend reply is missing '{}'", field),
            ErrorContext::new().with_source("prompts"),
        )
    })
}

fn ensure_prompt_dataset(dataset: &Value) -> Result<()> {
    match dataset["metadataSchemaUri"].as_str() {
        Some(PROMPT_METADATA_SCHEMA_URI) | None => Ok(()),
        Some(other) => Err(Error::validation_with_context(
            "dataset is not a prompt",
            ErrorContext::new()
                .with_field_path("metadata_schema_uri")
                .with_details(other.to_string()),
        )),
    }
}
