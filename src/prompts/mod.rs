//! Prompt templates and prompt management.
//!
//! The template engine is usable on its own:
//!
//! ```rust
//! use std::collections::HashMap;
//! use vertexai_preview::prompts::{render, ValidationMode};
//!
//! let vars = HashMap::from([("city".to_string(), "Paris".to_string())]);
//! let text = render("Weather in {city}?", &vars, ValidationMode::Strict).unwrap();
//! assert_eq!(text, "Weather in Paris?");
//! ```
//!
//! [`PromptService`] persists [`Prompt`]s as versioned Vertex datasets.

pub mod cache;
mod prompt;
mod service;
mod template;

pub use cache::{TemplateCache, TemplateCacheStats, DEFAULT_TEMPLATE_CACHE_CAPACITY};
pub use prompt::Prompt;
pub use service::{PromptMetadata, PromptService, PromptVersionMetadata, PROMPT_METADATA_SCHEMA_URI};
pub use template::{
    extract_variables, render, validate_variables, PromptTemplate, Segment, TemplateError,
    ValidationMode, ValidationReport, Variables,
};
