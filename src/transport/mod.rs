//! HTTP transport to the Vertex AI REST surface.

mod http;

pub use http::{HttpTransport, TransportError};
