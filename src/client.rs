//! Entry point bundling every service over one backend.
//!
//! ```rust,no_run
//! use vertexai_preview::{VertexClient, VertexConfig};
//!
//! # async fn demo() -> vertexai_preview::Result<()> {
//! let client = VertexClient::builder()
//!     .with_config(VertexConfig::new("my-project", "us-central1"))
//!     .build()?;
//! let caches = client.caching().list().await?;
//! # Ok(())
//! # }
//! ```

mod builder;

pub use builder::VertexClientBuilder;

use crate::backend::VertexBackend;
use crate::caching::CachingService;
use crate::config::VertexConfig;
use crate::examplestore::ExampleStoreService;
use crate::extensions::ExtensionService;
use crate::prompts::PromptService;
use crate::tuning::TuningService;
use std::sync::Arc;

/// Cheap to clone; all services share the same backend and configuration.
#[derive(Clone)]
pub struct VertexClient {
    config: Arc<VertexConfig>,
    backend: Arc<dyn VertexBackend>,
}

impl VertexClient {
    pub fn builder() -> VertexClientBuilder {
        VertexClientBuilder::new()
    }

    pub(crate) fn from_parts(config: Arc<VertexConfig>, backend: Arc<dyn VertexBackend>) -> Self {
        Self { config, backend }
    }

    pub fn config(&self) -> &VertexConfig {
        &self.config
    }

    pub fn backend(&self) -> Arc<dyn VertexBackend> {
        Arc::clone(&self.backend)
    }

    pub fn backend_name(&self) -> &'static str {
        self.backend.name()
    }

    pub fn caching(&self) -> CachingService {
        CachingService::new(self.backend(), Arc::clone(&self.config))
    }

    pub fn example_stores(&self) -> ExampleStoreService {
        ExampleStoreService::new(self.backend(), Arc::clone(&self.config))
    }

    pub fn tuning(&self) -> TuningService {
        TuningService::new(self.backend(), Arc::clone(&self.config))
    }

    pub fn prompts(&self) -> PromptService {
        PromptService::new(self.backend(), Arc::clone(&self.config))
    }

    pub fn extensions(&self) -> ExtensionService {
        ExtensionService::new(self.backend(), Arc::clone(&self.config))
    }
}

impl std::fmt::Debug for VertexClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("VertexClient")
            .field("config", &self.config)
            .field("backend", &self.backend.name())
            .finish()
    }
}
