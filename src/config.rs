//! Client configuration.
//!
//! Every knob can be set explicitly through the `with_*` builders or picked up
//! from the environment by [`VertexConfig::from_env`]:
//!
//! | Variable | Field |
//! |----------|-------|
//! | `GOOGLE_CLOUD_PROJECT` | project |
//! | `GOOGLE_CLOUD_LOCATION` / `GOOGLE_CLOUD_REGION` | location |
//! | `VERTEX_AI_ENDPOINT` | api_endpoint |
//! | `VERTEX_AI_API_VERSION` | api_version |
//! | `VERTEX_AI_TIMEOUT_SECS` | timeout |
//! | `VERTEX_AI_LRO_POLL_MS` | lro_poll_interval |
//! | `VERTEX_AI_LRO_TIMEOUT_SECS` | lro_timeout |
//! | `GOOGLE_CLOUD_ACCESS_TOKEN` | access_token |

use crate::resource;
use crate::{Error, ErrorContext, Result};
use std::env;
use std::fmt;
use std::time::Duration;

pub const DEFAULT_LOCATION: &str = "us-central1";
pub const DEFAULT_API_VERSION: &str = "v1beta1";

#[derive(Clone)]
pub struct VertexConfig {
    pub project: String,
    pub location: String,
    pub api_endpoint: Option<String>,
    pub api_version: String,
    pub timeout: Duration,
    pub lro_poll_interval: Duration,
    pub lro_timeout: Duration,
    access_token: Option<String>,
}

// Keep the token out of logs.
impl fmt::Debug for VertexConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("VertexConfig")
            .field("project", &self.project)
            .field("location", &self.location)
            .field("api_endpoint", &self.api_endpoint)
            .field("api_version", &self.api_version)
            .field("timeout", &self.timeout)
            .field("lro_poll_interval", &self.lro_poll_interval)
            .field("lro_timeout", &self.lro_timeout)
            .field("access_token", &self.access_token.as_ref().map(|_| "<redacted>"))
            .finish()
    }
}

impl VertexConfig {
    pub fn new(project: impl Into<String>, location: impl Into<String>) -> Self {
        Self {
            project: project.into(),
            location: location.into(),
            api_endpoint: None,
            api_version: DEFAULT_API_VERSION.to_string(),
            timeout: Duration::from_secs(60),
            lro_poll_interval: Duration::from_millis(1000),
            lro_timeout: Duration::from_secs(600),
            access_token: None,
        }
    }

    /// Build a configuration from the process environment.
    pub fn from_env() -> Result<Self> {
        let project = env::var("GOOGLE_CLOUD_PROJECT").map_err(|_| {
            Error::configuration_with_context(
                "Google Cloud project is required",
                ErrorContext::new()
                    .with_field_path("GOOGLE_CLOUD_PROJECT")
                    .with_details("set GOOGLE_CLOUD_PROJECT or use VertexConfig::new"),
            )
        })?;
        let location = env::var("GOOGLE_CLOUD_LOCATION")
            .or_else(|_| env::var("GOOGLE_CLOUD_REGION"))
            .unwrap_or_else(|_| DEFAULT_LOCATION.to_string());

        let mut config = Self::new(project, location);
        if let Ok(endpoint) = env::var("VERTEX_AI_ENDPOINT") {
            config.api_endpoint = Some(endpoint);
        }
        if let Ok(version) = env::var("VERTEX_AI_API_VERSION") {
            config.api_version = version;
        }
        if let Some(secs) = env_parse::<u64>("VERTEX_AI_TIMEOUT_SECS") {
            config.timeout = Duration::from_secs(secs.max(1));
        }
        if let Some(ms) = env_parse::<u64>("VERTEX_AI_LRO_POLL_MS") {
            config.lro_poll_interval = Duration::from_millis(ms.max(1));
        }
        if let Some(secs) = env_parse::<u64>("VERTEX_AI_LRO_TIMEOUT_SECS") {
            config.lro_timeout = Duration::from_secs(secs.max(1));
        }
        config.access_token = env::var("GOOGLE_CLOUD_ACCESS_TOKEN").ok();
        config.validate()?;
        Ok(config)
    }

    pub fn with_api_endpoint(mut self, endpoint: impl Into<String>) -> Self {
        self.api_endpoint = Some(endpoint.into());
        self
    }

    pub fn with_api_version(mut self, version: impl Into<String>) -> Self {
        self.api_version = version.into();
        self
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    pub fn with_lro_poll_interval(mut self, interval: Duration) -> Self {
        self.lro_poll_interval = interval;
        self
    }

    pub fn with_lro_timeout(mut self, timeout: Duration) -> Self {
        self.lro_timeout = timeout;
        self
    }

    pub fn with_access_token(mut self, token: impl Into<String>) -> Self {
        self.access_token = Some(token.into());
        self
    }

    pub fn validate(&self) -> Result<()> {
        for (field, value) in [("project", &self.project), ("location", &self.location)] {
            if value.trim().is_empty() {
                return Err(Error::configuration_with_context(
                    format!("{} must not be empty", field),
                    ErrorContext::new().with_field_path(field),
                ));
            }
            if !resource::is_valid_id(value) {
                return Err(Error::configuration_with_context(
                    format!("{} '{}' is not a valid identifier", field, value),
                    ErrorContext::new().with_field_path(field),
                ));
            }
        }
        if self.api_version.trim().is_empty() {
            return Err(Error::configuration_with_context(
                "api_version must not be empty",
                ErrorContext::new().with_field_path("api_version"),
            ));
        }
        Ok(())
    }

    /// `projects/{project}/locations/{location}`
    pub fn parent(&self) -> String {
        resource::parent(&self.project, &self.location)
    }

    /// REST root including the API version, without a trailing slash.
    pub fn base_url(&self) -> String {
        let root = match &self.api_endpoint {
            Some(endpoint) => {
                let endpoint = endpoint.trim_end_matches('/');
                if endpoint.starts_with("http://") || endpoint.starts_with("https://") {
                    endpoint.to_string()
                } else {
                    format!("https://{}", endpoint)
                }
            }
            None if self.location == "global" => "https://aiplatform.googleapis.com".to_string(),
            None => format!("https://{}-aiplatform.googleapis.com", self.location),
        };
        format!("{}/{}", root, self.api_version)
    }

    /// Resolve the bearer token: explicit value, keyring (feature `keyring`), environment.
    pub fn resolve_access_token(&self) -> Option<String> {
        if let Some(token) = &self.access_token {
            return Some(token.clone());
        }

        #[cfg(feature = "keyring")]
        {
            if let Ok(entry) = keyring::Entry::new("vertexai-preview", &self.project) {
                if let Ok(token) = entry.get_password() {
                    return Some(token);
                }
            }
        }

        env::var("GOOGLE_CLOUD_ACCESS_TOKEN").ok()
    }
}

fn env_parse<T: std::str::FromStr>(key: &str) -> Option<T> {
    env::var(key).ok().and_then(|s| s.parse::<T>().ok())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn regional_and_global_base_urls() {
        let regional = VertexConfig::new("my-project", "europe-west4");
        assert_eq!(
            regional.base_url(),
            "https://europe-west4-aiplatform.googleapis.com/v1beta1"
        );

        let global = VertexConfig::new("my-project", "global").with_api_version("v1");
        assert_eq!(global.base_url(), "https://aiplatform.googleapis.com/v1");
    }

    #[test]
    fn endpoint_override_keeps_scheme() {
        let cfg = VertexConfig::new("p", "us-central1").with_api_endpoint("http://127.0.0.1:9000/");
        assert_eq!(cfg.base_url(), "http://127.0.0.1:9000/v1beta1");

        let cfg = VertexConfig::new("p", "us-central1").with_api_endpoint("private.example.com");
        assert_eq!(cfg.base_url(), "https://private.example.com/v1beta1");
    }

    #[test]
    fn validate_rejects_bad_identifiers() {
        assert!(VertexConfig::new("", "us-central1").validate().is_err());
        assert!(VertexConfig::new("proj/evil", "us-central1").validate().is_err());
        assert!(VertexConfig::new("proj", "us-central1").validate().is_ok());
    }

    #[test]
    fn debug_redacts_token() {
        let cfg = VertexConfig::new("p", "us-central1").with_access_token("secret-token");
        let rendered = format!("{:?}", cfg);
        assert!(!rendered.contains("secret-token"));
        assert!(rendered.contains("<redacted>"));
        assert_eq!(cfg.resolve_access_token().as_deref(), Some("secret-token"));
    }
}
