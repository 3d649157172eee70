use super::VertexClient;
use crate::backend::{LocalBackend, RestBackend, VertexBackend};
use crate::config::VertexConfig;
use crate::{Error, ErrorContext, Result};
use std::sync::Arc;
use tracing::info;

enum BackendChoice {
    Rest,
    Local,
    Custom(Arc<dyn VertexBackend>),
}

/// Builder for [`VertexClient`].
///
/// Without an explicit configuration, [`VertexConfig::from_env`] is used.
/// The REST backend is the default.
pub struct VertexClientBuilder {
    config: Option<VertexConfig>,
    backend: BackendChoice,
}

impl VertexClientBuilder {
    pub fn new() -> Self {
        Self {
            config: None,
            backend: BackendChoice::Rest,
        }
    }

    pub fn with_config(mut self, config: VertexConfig) -> Self {
        self.config = Some(config);
        self
    }

    /// Use the in-process emulator instead of the Vertex REST API.
    pub fn local(mut self) -> Self {
        self.backend = BackendChoice::Local;
        self
    }

    pub fn with_backend(mut self, backend: Arc<dyn VertexBackend>) -> Self {
        self.backend = BackendChoice::Custom(backend);
        self
    }

    pub fn build(self) -> Result<VertexClient> {
        let config = match self.config {
            Some(config) => config,
            None => VertexConfig::from_env().map_err(|e| {
                Error::configuration_with_context(
                    "no configuration given and the environment does not provide one",
                    ErrorContext::new()
                        .with_source("client_builder")
                        .with_details(e.to_string()),
                )
            })?,
        };
        config.validate()?;
        let backend: Arc<dyn VertexBackend> = match self.backend {
            BackendChoice::Rest => Arc::new(RestBackend::new(&config)?),
            BackendChoice::Local => Arc::new(LocalBackend::new()),
            BackendChoice::Custom(backend) => backend,
        };
        info!(
            project = config.project.as_str(),
            location = config.location.as_str(),
            backend = backend.name(),
            "vertexai-preview client ready"
        );
        Ok(VertexClient::from_parts(Arc::new(config), backend))
    }
}

impl Default for VertexClientBuilder {
    fn default() -> Self {
        Self::new()
    }
}
