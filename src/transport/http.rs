use crate::config::VertexConfig;
use crate::{Error, Result};
use reqwest::{Method, Proxy};
use serde_json::Value;
use std::env;
use std::time::{Duration, Instant};
use tracing::{debug, info};

const USER_AGENT: &str = concat!("vertexai-preview-rust/", env!("CARGO_PKG_VERSION"));

pub struct HttpTransport {
    client: reqwest::Client,
    base_url: String,
    access_token: Option<String>,
    quota_project: String,
}

impl HttpTransport {
    pub fn new(config: &VertexConfig) -> Result<Self> {
        let mut builder = reqwest::Client::builder()
            .timeout(config.timeout)
            .user_agent(USER_AGENT)
            .pool_max_idle_per_host(
                env::var("VERTEX_AI_HTTP_POOL_MAX_IDLE_PER_HOST")
                    .ok()
                    .and_then(|s| s.parse::<usize>().ok())
                    .unwrap_or(32),
            )
            .pool_idle_timeout(Some(Duration::from_secs(90)));

        if let Ok(proxy_url) = env::var("VERTEX_AI_PROXY_URL") {
            if let Ok(proxy) = Proxy::all(&proxy_url) {
                builder = builder.proxy(proxy);
            }
        }

        let client = builder
            .build()
            .map_err(|e| Error::Transport(TransportError::Other(e.to_string())))?;

        Ok(Self {
            client,
            base_url: config.base_url(),
            access_token: config.resolve_access_token(),
            quota_project: config.project.clone(),
        })
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    fn url(&self, path: &str, query: &[(&str, String)]) -> Result<url::Url> {
        let raw = format!("{}/{}", self.base_url, path.trim_start_matches('/'));
        let mut url = url::Url::parse(&raw)
            .map_err(|e| Error::Transport(TransportError::InvalidUrl(format!("{}: {}", raw, e))))?;
        if !query.is_empty() {
            let mut pairs = url.query_pairs_mut();
            for (k, v) in query {
                pairs.append_pair(k, v);
            }
        }
        Ok(url)
    }

    /// Send one JSON request and decode the JSON reply.
    ///
    /// An empty success body decodes to an empty object.
    pub async fn send(
        &self,
        method: Method,
        path: &str,
        query: &[(&str, String)],
        body: Option<&Value>,
    ) -> Result<Value> {
        let url = self.url(path, query)?;
        let start = Instant::now();

        let mut req = self
            .client
            .request(method.clone(), url)
            .header("x-goog-user-project", &self.quota_project);
        if let Some(token) = &self.access_token {
            req = req.bearer_auth(token);
        }
        if let Some(body) = body {
            req = req.json(body);
        }

        let response = req
            .send()
            .await
            .map_err(|e| Error::Transport(TransportError::Http(e)))?;
        let status = response.status().as_u16();
        let text = response
            .text()
            .await
            .map_err(|e| Error::Transport(TransportError::Http(e)))?;

        info!(
            method = method.as_str(),
            resource = path,
            http_status = status,
            duration_ms = start.elapsed().as_millis() as u64,
            "vertexai-preview request"
        );

        if !(200..300).contains(&status) {
            debug!(body = text.as_str(), "vertexai-preview error body");
            return Err(error_from_response(status, path, &text));
        }
        if text.trim().is_empty() {
            return Ok(Value::Object(Default::default()));
        }
        Ok(serde_json::from_str(&text)?)
    }
}

/// Map a non-2xx reply onto the crate error, preferring the Google error envelope message.
fn error_from_response(status: u16, path: &str, body: &str) -> Error {
    if status == 404 {
        return Error::not_found(path);
    }
    let message = serde_json::from_str::<Value>(body)
        .ok()
        .and_then(|v| v["error"]["message"].as_str().map(String::from))
        .unwrap_or_else(|| body.to_string());
    Error::remote(status, message)
}

#[derive(Debug, thiserror::Error)]
pub enum TransportError {
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("Invalid URL: {0}")]
    InvalidUrl(String),

    #[error("Transport error: {0}")]
    Other(String),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn google_error_envelope_is_unwrapped() {
        let body = r#"{"error":{"code":400,"message":"ttl must be positive","status":"INVALID_ARGUMENT"}}"#;
        match error_from_response(400, "projects/p/locations/l/cachedContents", body) {
            Error::Remote {
                status, message, retryable,
            } => {
                assert_eq!(status, 400);
                assert_eq!(message, "ttl must be positive");
                assert!(!retryable);
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[test]
    fn not_found_keeps_path() {
        let err = error_from_response(404, "projects/p/locations/l/extensions/9", "");
        assert!(err.is_not_found());
        assert!(err.to_string().contains("extensions/9"));
    }

    #[test]
    fn url_joins_path_and_query() {
        let cfg = VertexConfig::new("p", "us-central1").with_api_endpoint("http://localhost:1234");
        let transport = HttpTransport::new(&cfg).unwrap();
        let url = transport
            .url("/projects/p/locations/us-central1/tuningJobs", &[("pageSize", "5".into())])
            .unwrap();
        assert_eq!(
            url.as_str(),
            "http://localhost:1234/v1beta1/projects/p/locations/us-central1/tuningJobs?pageSize=5"
        );
    }
}
