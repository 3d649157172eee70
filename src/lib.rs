//! # vertexai-preview
//!
//! Typed client for the preview resources of Google Cloud Vertex AI: context
//! caching, example stores, supervised tuning, prompt management and
//! extensions, plus the prompt template engine and agent planners built on
//! top of them.
//!
//! ## Overview
//!
//! Every service builds a typed request, validates it and hands it to a
//! [`VertexBackend`]. Two backends implement the same resource surface:
//!
//! - [`RestBackend`] calls the Vertex AI REST API and resolves long-running
//!   operations by polling.
//! - [`LocalBackend`] emulates the surface in memory, so the same code paths
//!   run offline and in tests.
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use std::collections::HashMap;
//! use vertexai_preview::prompts::{Prompt, ValidationMode};
//! use vertexai_preview::{VertexClient, VertexConfig};
//!
//! #[tokio::main]
//! async fn main() -> vertexai_preview::Result<()> {
//!     vertexai_preview::init_logging();
//!     let client = VertexClient::builder()
//!         .with_config(VertexConfig::from_env()?)
//!         .build()?;
//!
//!     let prompt = Prompt::new("Summarize {topic} in one line")
//!         .with_model_name("gemini-1.5-pro-002");
//!     let saved = client.prompts().create_version(&prompt, Some("v1")).await?;
//!
//!     let vars = HashMap::from([("topic".to_string(), "Rust".to_string())]);
//!     let contents = saved.assemble_contents(&vars, ValidationMode::Strict)?;
//!     println!("{:?}", contents);
//!     Ok(())
//! }
//! ```
//!
//! ## Module Organization
//!
//! | Module | Description |
//! |--------|-------------|
//! | [`backend`] | Backend trait, REST and local backends, paging helpers |
//! | [`caching`] | Cached contents |
//! | [`examplestore`] | Example stores and similarity search |
//! | [`tuning`] | Supervised fine-tuning jobs |
//! | [`prompts`] | Template engine and prompt versioning |
//! | [`extensions`] | Extension import, execution and query |
//! | [`planners`] | ReAct and built-in planners |
//! | [`embeddings`] | Vector math and simulated embeddings |
//! | [`types`] | Content, generation and tool types |

pub mod backend;
pub mod caching;
pub mod client;
pub mod config;
pub mod embeddings;
pub mod examplestore;
pub mod extensions;
pub mod planners;
pub mod prompts;
pub mod resource;
pub mod transport;
pub mod tuning;
pub mod types;

pub use backend::{ListOptions, ListPage, LocalBackend, RestBackend, VertexBackend};
pub use client::{VertexClient, VertexClientBuilder};
pub use config::VertexConfig;
pub use types::{Content, GenerationConfig, Part};

use futures::Stream;
use std::pin::Pin;

/// Result type alias for the library
pub type Result<T> = std::result::Result<T, Error>;

/// A unified pinned, boxed stream that emits `Result<T>`
pub type BoxStream<'a, T> = Pin<Box<dyn Stream<Item = Result<T>> + Send + 'a>>;

/// Error type for the library
pub mod error;
pub use error::{Error, ErrorContext};

/// Install a `tracing` subscriber driven by `RUST_LOG` (default `info`).
///
/// Safe to call more than once; later calls are no-ops.
pub fn init_logging() {
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info"));
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .try_init();
}
