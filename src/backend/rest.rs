//! Vertex AI REST backend.

use super::{ListOptions, ListPage, Operation, VertexBackend};
use crate::config::VertexConfig;
use crate::transport::HttpTransport;
use crate::{Error, Result};
use async_trait::async_trait;
use reqwest::Method;
use serde_json::Value;
use std::time::{Duration, Instant};
use tracing::debug;

pub struct RestBackend {
    transport: HttpTransport,
    poll_interval: Duration,
    lro_timeout: Duration,
}

impl RestBackend {
    pub fn new(config: &VertexConfig) -> Result<Self> {
        config.validate()?;
        Ok(Self {
            transport: HttpTransport::new(config)?,
            poll_interval: config.lro_poll_interval,
            lro_timeout: config.lro_timeout,
        })
    }

    pub fn base_url(&self) -> &str {
        self.transport.base_url()
    }

    /// Resolve a reply that may be a long-running operation into its final payload.
    async fn resolve(&self, reply: Value) -> Result<Value> {
        if !Operation::looks_like(&reply) {
            return Ok(reply);
        }
        let op: Operation = serde_json::from_value(reply)?;
        self.wait_operation(op).await
    }

    async fn wait_operation(&self, mut op: Operation) -> Result<Value> {
        let start = Instant::now();
        loop {
            if op.done {
                debug!(
                    operation = op.name.as_str(),
                    elapsed_ms = start.elapsed().as_millis() as u64,
                    "operation finished"
                );
                return op.into_result();
            }
            if start.elapsed() >= self.lro_timeout {
                return Err(Error::Timeout {
                    message: format!(
                        "operation {} not done after {}s",
                        op.name,
                        self.lro_timeout.as_secs()
                    ),
                });
            }
            tokio::time::sleep(self.poll_interval).await;
            let reply = self.transport.send(Method::GET, &op.name, &[], None).await?;
            op = serde_json::from_value(reply)?;
        }
    }
}

#[async_trait]
impl VertexBackend for RestBackend {
    async fn create(&self, parent: &str, collection: &str, body: Value) -> Result<Value> {
        let path = format!("{}/{}", parent, collection);
        let reply = self.transport.send(Method::POST, &path, &[], Some(&body)).await?;
        self.resolve(reply).await
    }

    async fn get(&self, name: &str) -> Result<Value> {
        self.transport.send(Method::GET, name, &[], None).await
    }

    async fn list(&self, parent: &str, collection: &str, options: &ListOptions) -> Result<ListPage> {
        let path = format!("{}/{}", parent, collection);
        let mut query: Vec<(&str, String)> = Vec::new();
        if let Some(size) = options.page_size {
            query.push(("pageSize", size.to_string()));
        }
        if let Some(token) = &options.page_token {
            query.push(("pageToken", token.clone()));
        }
        if let Some(filter) = &options.filter {
            query.push(("filter", filter.clone()));
        }
        if let Some(order_by) = &options.order_by {
            query.push(("orderBy", order_by.clone()));
        }
        let mut reply = self.transport.send(Method::GET, &path, &query, None).await?;
        let items = match reply.get_mut(collection).map(Value::take) {
            Some(Value::Array(items)) => items,
            _ => Vec::new(),
        };
        let next_page_token = reply
            .get("nextPageToken")
            .and_then(Value::as_str)
            .filter(|t| !t.is_empty())
            .map(String::from);
        Ok(ListPage {
            items,
            next_page_token,
        })
    }

    async fn patch(&self, name: &str, body: Value, update_mask: &[&str]) -> Result<Value> {
        let query: Vec<(&str, String)> = if update_mask.is_empty() {
            Vec::new()
        } else {
            vec![("updateMask", update_mask.join(","))]
        };
        let reply = self.transport.send(Method::PATCH, name, &query, Some(&body)).await?;
        self.resolve(reply).await
    }

    async fn delete(&self, name: &str) -> Result<()> {
        let reply = self.transport.send(Method::DELETE, name, &[], None).await?;
        self.resolve(reply).await.map(|_| ())
    }

    async fn invoke(&self, name: &str, verb: &str, body: Value) -> Result<Value> {
        let path = format!("{}:{}", name, verb);
        let reply = self.transport.send(Method::POST, &path, &[], Some(&body)).await?;
        self.resolve(reply).await
    }

    fn name(&self) -> &'static str {
        "rest"
    }
}
