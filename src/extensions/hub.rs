//! Prebuilt Google extensions.

use super::types::{ApiSpec, AuthConfig, ExtensionManifest, ExtensionOperation};
use crate::types::FunctionDeclaration;
use crate::{Error, ErrorContext, Result};
use serde_json::json;
use std::fmt;
use std::str::FromStr;

const CODE_INTERPRETER_URI: &str = "gs://vertex-extension-public/code_interpreter.yaml";
const VERTEX_AI_SEARCH_URI: &str = "gs://vertex-extension-public/vertex_ai_search.yaml";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HubExtension {
    CodeInterpreter,
    VertexAiSearch,
}

impl HubExtension {
    pub fn as_str(self) -> &'static str {
        match self {
            HubExtension::CodeInterpreter => "code_interpreter",
            HubExtension::VertexAiSearch => "vertex_ai_search",
        }
    }

    pub fn display_name(self) -> &'static str {
        match self {
            HubExtension::CodeInterpreter => "Code Interpreter",
            HubExtension::VertexAiSearch => "Vertex AI Search",
        }
    }

    pub fn description(self) -> &'static str {
        match self {
            HubExtension::CodeInterpreter => {
                "This extension generates and executes code in the specified language"
            }
            HubExtension::VertexAiSearch => "This extension queries a Vertex AI Search data store",
        }
    }

    fn spec_uri(self) -> &'static str {
        match self {
            HubExtension::CodeInterpreter => CODE_INTERPRETER_URI,
            HubExtension::VertexAiSearch => VERTEX_AI_SEARCH_URI,
        }
    }

    pub fn manifest(self) -> ExtensionManifest {
        ExtensionManifest {
            name: self.as_str().to_string(),
            description: self.description().to_string(),
            api_spec: ApiSpec::gcs(self.spec_uri()),
            auth_config: AuthConfig::google_service_account(),
        }
    }

    pub fn operations(self) -> Vec<ExtensionOperation> {
        let (id, description, parameters) = match self {
            HubExtension::CodeInterpreter => (
                "generate_and_execute",
                "Generate and run code for a natural language request",
                json!({
                    "type": "object",
                    "properties": {
                        "query": {"type": "string"},
                        "files": {"type": "array", "items": {"type": "object"}},
                    },
                    "required": ["query"],
                }),
            ),
            HubExtension::VertexAiSearch => (
                "search",
                "Search the configured data store",
                json!({
                    "type": "object",
                    "properties": {"query": {"type": "string"}},
                    "required": ["query"],
                }),
            ),
        };
        vec![ExtensionOperation {
            operation_id: id.to_string(),
            function_declaration: Some(FunctionDeclaration {
                name: id.to_string(),
                description: Some(description.to_string()),
                parameters: Some(parameters),
            }),
        }]
    }
}

impl fmt::Display for HubExtension {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for HubExtension {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "code_interpreter" => Ok(HubExtension::CodeInterpreter),
            "vertex_ai_search" => Ok(HubExtension::VertexAiSearch),
            other => Err(Error::validation_with_context(
                format!("unknown hub extension '{}'", other),
                ErrorContext::new()
                    .with_field_path("name")
                    .with_details("expected code_interpreter or vertex_ai_search"),
            )),
        }
    }
}

/// Operations of the hub extension published at `uri`, if it is one.
pub fn hub_operations(uri: &str) -> Option<Vec<ExtensionOperation>> {
    [HubExtension::CodeInterpreter, HubExtension::VertexAiSearch]
        .into_iter()
        .find(|h| h.spec_uri() == uri)
        .map(HubExtension::operations)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn names_roundtrip() {
        for hub in [HubExtension::CodeInterpreter, HubExtension::VertexAiSearch] {
            assert_eq!(hub.to_string().parse::<HubExtension>().unwrap(), hub);
            assert!(hub.manifest().validate().is_ok());
        }
        assert!("calculator".parse::<HubExtension>().is_err());
    }

    #[test]
    fn operations_by_uri() {
        let ops = hub_operations(CODE_INTERPRETER_URI).unwrap();
        assert_eq!(ops[0].operation_id, "generate_and_execute");
        assert!(hub_operations("gs://bucket/custom.yaml").is_none());
    }
}
