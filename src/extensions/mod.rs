//! Vertex extensions: OpenAPI-described tools the model can call.
//!
//! Extensions are imported from a manifest (inline OpenAPI YAML or a Cloud
//! Storage URI), or from the prebuilt hub entries `code_interpreter` and
//! `vertex_ai_search`.

mod hub;
mod openapi;
mod service;
mod types;

pub use hub::{hub_operations, HubExtension};
pub use openapi::{operation_ids_from_openapi, operations_from_openapi};
pub use service::ExtensionService;
pub use types::{
    ApiSpec, AuthConfig, AuthType, CodeInterpreterRuntimeConfig, Extension, ExtensionManifest,
    ExtensionOperation, QueryResponse, RuntimeConfig, VertexAiSearchRuntimeConfig,
};

pub(crate) const COLLECTION: &str = "extensions";
