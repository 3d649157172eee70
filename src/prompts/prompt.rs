//! Prompts: a template plus the model settings it is meant to run with.

use super::template::{PromptTemplate, ValidationMode, Variables};
use crate::types::{Content, GenerationConfig, Part, SafetySetting, Tool, ToolConfig};
use crate::{Error, ErrorContext, Result};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::BTreeMap;
use std::sync::Arc;

#[derive(Debug, Clone, Default, PartialEq)]
pub struct Prompt {
    pub prompt_data: String,
    /// Declared variable sets, one per intended execution.
    pub variables: Vec<Variables>,
    pub model_name: Option<String>,
    pub system_instruction: Option<String>,
    pub generation_config: Option<GenerationConfig>,
    pub safety_settings: Vec<SafetySetting>,
    pub tools: Vec<Tool>,
    pub tool_config: Option<ToolConfig>,
    pub prompt_name: Option<String>,
    pub prompt_id: Option<String>,
    pub version_id: Option<String>,
    pub version_name: Option<String>,
}

impl Prompt {
    pub fn new(prompt_data: impl Into<String>) -> Self {
        Self {
            prompt_data: prompt_data.into(),
            ..Default::default()
        }
    }

    pub fn with_variables(mut self, variables: Vec<Variables>) -> Self {
        self.variables = variables;
        self
    }

    pub fn with_model_name(mut self, model: impl Into<String>) -> Self {
        self.model_name = Some(model.into());
        self
    }

    pub fn with_system_instruction(mut self, instruction: impl Into<String>) -> Self {
        self.system_instruction = Some(instruction.into());
        self
    }

    pub fn with_generation_config(mut self, config: GenerationConfig) -> Self {
        self.generation_config = Some(config);
        self
    }

    pub fn with_safety_settings(mut self, settings: Vec<SafetySetting>) -> Self {
        self.safety_settings = settings;
        self
    }

    pub fn with_tools(mut self, tools: Vec<Tool>) -> Self {
        self.tools = tools;
        self
    }

    pub fn with_tool_config(mut self, config: ToolConfig) -> Self {
        self.tool_config = Some(config);
        self
    }

    pub fn with_prompt_name(mut self, name: impl Into<String>) -> Self {
        self.prompt_name = Some(name.into());
        self
    }

    /// Compiled form of `prompt_data`, shared through the global template cache.
    pub fn template(&self) -> Result<Arc<PromptTemplate>> {
        Ok(super::cache::global().get_or_compile(&self.prompt_data)?)
    }

    pub fn template_variables(&self) -> Result<Vec<String>> {
        Ok(self.template()?.variables().to_vec())
    }

    /// Every declared variable set may only name variables the template uses.
    pub fn validate(&self) -> Result<()> {
        let template = self.template()?;
        for (i, set) in self.variables.iter().enumerate() {
            let report = template.validate(set, ValidationMode::Loose)?;
            if !report.unknown.is_empty() {
                return Err(Error::validation_with_context(
                    format!("variables not used by the prompt: {}", report.unknown.join(", ")),
                    ErrorContext::new().with_field_path(format!("variables[{}]", i)),
                ));
            }
        }
        Ok(())
    }

    /// The rendered prompt as a single user turn.
    pub fn assemble_contents(&self, vars: &Variables, mode: ValidationMode) -> Result<Vec<Content>> {
        let text = self.template()?.render(vars, mode)?;
        Ok(vec![Content::user(text)])
    }

    /// Render once per declared variable set (once with no values when none are declared).
    pub fn assemble_all(&self, mode: ValidationMode) -> Result<Vec<Vec<Content>>> {
        if self.variables.is_empty() {
            return Ok(vec![self.assemble_contents(&Variables::new(), mode)?]);
        }
        self.variables
            .iter()
            .map(|vars| self.assemble_contents(vars, mode))
            .collect()
    }

    pub fn system_instruction_content(&self) -> Option<Content> {
        self.system_instruction.as_deref().map(Content::system)
    }

    pub(crate) fn to_dataset_metadata(&self) -> Result<Value> {
        let executions = self
            .variables
            .iter()
            .map(|set| Execution {
                arguments: set
                    .iter()
                    .map(|(k, v)| {
                        let arg = Argument {
                            part_list: PartList {
                                parts: vec![Part::text(v.clone())],
                            },
                        };
                        (k.clone(), arg)
                    })
                    .collect(),
            })
            .collect();
        let metadata = DatasetMetadata {
            prompt_type: PROMPT_TYPE_FREEFORM.to_string(),
            prompt_api_schema: PromptApiSchema {
                api_schema_version: API_SCHEMA_VERSION.to_string(),
                multimodal_prompt: MultimodalPrompt {
                    prompt_message: PromptMessage {
                        model: self.model_name.clone(),
                        contents: vec![Content::user(self.prompt_data.clone())],
                        system_instruction: self.system_instruction_content(),
                        generation_config: self.generation_config.clone(),
                        safety_settings: self.safety_settings.clone(),
                        tools: self.tools.clone(),
                        tool_config: self.tool_config.clone(),
                    },
                },
                executions,
            },
        };
        Ok(serde_json::to_value(metadata)?)
    }

    pub(crate) fn from_dataset_metadata(metadata: Value) -> Result<Self> {
        let metadata: DatasetMetadata = serde_json::from_value(metadata)?;
        let schema = metadata.prompt_api_schema;
        let message = schema.multimodal_prompt.prompt_message;
        let prompt_data = message
            .contents
            .first()
            .map(Content::text)
            .ok_or_else(|| Error::validation("stored prompt has no contents"))?;
        let variables = schema
            .executions
            .into_iter()
            .map(|e| {
                e.arguments
                    .into_iter()
                    .map(|(k, arg)| {
                        let text = Content::new("user", arg.part_list.parts).text();
                        (k, text)
                    })
                    .collect()
            })
            .collect();
        Ok(Self {
            prompt_data,
            variables,
            model_name: message.model,
            system_instruction: message.system_instruction.map(|c| c.text()),
            generation_config: message.generation_config,
            safety_settings: message.safety_settings,
            tools: message.tools,
            tool_config: message.tool_config,
            ..Default::default()
        })
    }
}

const PROMPT_TYPE_FREEFORM: &str = "freeform";
const API_SCHEMA_VERSION: &str = "1.0.0";

#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
struct DatasetMetadata {
    #[serde(default)]
    prompt_type: String,
    prompt_api_schema: PromptApiSchema,
}

#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
struct PromptApiSchema {
    #[serde(default)]
    api_schema_version: String,
    multimodal_prompt: MultimodalPrompt,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    executions: Vec<Execution>,
}

#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
struct MultimodalPrompt {
    prompt_message: PromptMessage,
}

#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
struct PromptMessage {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    model: Option<String>,
    #[serde(default)]
    contents: Vec<Content>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    system_instruction: Option<Content>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    generation_config: Option<GenerationConfig>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    safety_settings: Vec<SafetySetting>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    tools: Vec<Tool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    tool_config: Option<ToolConfig>,
}

#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
struct Execution {
    #[serde(default)]
    arguments: BTreeMap<String, Argument>,
}

#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
struct Argument {
    part_list: PartList,
}

#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
struct PartList {
    #[serde(default)]
    parts: Vec<Part>,
}
