use crate::types::{Content, FunctionDeclaration};
use crate::{Error, ErrorContext, Result};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum AuthType {
    #[default]
    AuthTypeUnspecified,
    NoAuth,
    ApiKeyAuth,
    HttpBasicAuth,
    GoogleServiceAccountAuth,
    Oauth,
    OidcAuth,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct AuthConfig {
    pub auth_type: AuthType,
    /// Type-specific settings (`apiKeyConfig`, `oauthConfig`, ...), passed through untouched.
    #[serde(flatten)]
    pub settings: serde_json::Map<String, Value>,
}

impl AuthConfig {
    pub fn new(auth_type: AuthType) -> Self {
        Self {
            auth_type,
            settings: Default::default(),
        }
    }

    pub fn google_service_account() -> Self {
        Self::new(AuthType::GoogleServiceAccountAuth)
    }
}

/// Where the OpenAPI document lives; exactly one source must be set.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ApiSpec {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub open_api_yaml: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub open_api_gcs_uri: Option<String>,
}

impl ApiSpec {
    pub fn inline(yaml: impl Into<String>) -> Self {
        Self {
            open_api_yaml: Some(yaml.into()),
            open_api_gcs_uri: None,
        }
    }

    pub fn gcs(uri: impl Into<String>) -> Self {
        Self {
            open_api_yaml: None,
            open_api_gcs_uri: Some(uri.into()),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ExtensionManifest {
    pub name: String,
    pub description: String,
    pub api_spec: ApiSpec,
    pub auth_config: AuthConfig,
}

impl ExtensionManifest {
    pub fn validate(&self) -> Result<()> {
        if self.name.trim().is_empty() {
            return Err(Error::validation_with_context(
                "extension manifest needs a name",
                ErrorContext::new().with_field_path("manifest.name"),
            ));
        }
        if self.description.trim().is_empty() {
            return Err(Error::validation_with_context(
                "extension manifest needs a description",
                ErrorContext::new().with_field_path("manifest.description"),
            ));
        }
        match (&self.api_spec.open_api_yaml, &self.api_spec.open_api_gcs_uri) {
            (Some(yaml), None) => super::openapi::operations_from_openapi(yaml).map(|_| ()),
            (None, Some(uri)) if uri.starts_with("gs://") => Ok(()),
            (None, Some(uri)) => Err(Error::validation_with_context(
                format!("'{}' is not a Cloud Storage URI", uri),
                ErrorContext::new().with_field_path("manifest.api_spec.open_api_gcs_uri"),
            )),
            _ => Err(Error::validation_with_context(
                "exactly one of open_api_yaml and open_api_gcs_uri must be set",
                ErrorContext::new().with_field_path("manifest.api_spec"),
            )),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CodeInterpreterRuntimeConfig {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub file_input_gcs_bucket: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub file_output_gcs_bucket: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VertexAiSearchRuntimeConfig {
    pub serving_config_name: String,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RuntimeConfig {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub code_interpreter_runtime_config: Option<CodeInterpreterRuntimeConfig>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub vertex_ai_search_runtime_config: Option<VertexAiSearchRuntimeConfig>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub default_params: Option<Value>,
}

impl RuntimeConfig {
    pub fn vertex_ai_search(serving_config_name: impl Into<String>) -> Self {
        Self {
            vertex_ai_search_runtime_config: Some(VertexAiSearchRuntimeConfig {
                serving_config_name: serving_config_name.into(),
            }),
            ..Default::default()
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ExtensionOperation {
    pub operation_id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub function_declaration: Option<FunctionDeclaration>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Extension {
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub display_name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub create_time: Option<DateTime<Utc>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub update_time: Option<DateTime<Utc>>,
    #[serde(default)]
    pub manifest: ExtensionManifest,
    #[serde(default)]
    pub extension_operations: Vec<ExtensionOperation>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub runtime_config: Option<RuntimeConfig>,
}

impl Extension {
    pub fn resource_id(&self) -> &str {
        crate::resource::resource_id(&self.name)
    }

    /// The inline OpenAPI document as JSON, if the manifest carries one.
    pub fn api_spec(&self) -> Result<Option<Value>> {
        match &self.manifest.api_spec.open_api_yaml {
            Some(yaml) => Ok(Some(serde_yaml::from_str(yaml)?)),
            None => Ok(None),
        }
    }

    /// Function declarations of every operation, ready to hand to a model as tools.
    pub fn operation_schemas(&self) -> Vec<FunctionDeclaration> {
        self.extension_operations
            .iter()
            .filter_map(|op| op.function_declaration.clone())
            .collect()
    }

    pub fn has_operation(&self, operation_id: &str) -> bool {
        self.extension_operations
            .iter()
            .any(|op| op.operation_id == operation_id)
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct QueryResponse {
    #[serde(default)]
    pub steps: Vec<Content>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub failure_message: Option<String>,
}
