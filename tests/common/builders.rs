//! Test builders: ergonomic constructors for clients and catalogs.
//!
//! These builders are designed for readability in test assertions, not for
//! production use. They panic on invalid input rather than returning `Result`.

use std::sync::Arc;
use std::time::Duration;

use iqe::{InferenceClient, Target};
use iqe_core::types::{inference_type, runtime};
use iqe_core::{Catalog, Protocol, Scheme};
use iqe_transport::Transport;

use super::fake_transport::FakeTransport;

// ---------------------------------------------------------------------------
// ClientBuilder
// ---------------------------------------------------------------------------

/// Fluent builder for an [`InferenceClient`] backed by the built-in catalog.
///
/// # Example
///
/// ```rust
/// let fake = FakeTransport::ok(CAIKIT_JSON);
/// let client = ClientBuilder::caikit_http().transport(fake.clone()).build();
/// ```
pub struct ClientBuilder {
    catalog: Arc<Catalog>,
    runtime: String,
    inference_type: String,
    protocol: Protocol,
    target: Target,
    transport: Arc<dyn Transport>,
    timeout: Option<Duration>,
}

impl ClientBuilder {
    pub fn new(runtime: &str, inference_type: &str, protocol: Protocol) -> Self {
        Self {
            catalog: Catalog::builtin(),
            runtime: runtime.to_string(),
            inference_type: inference_type.to_string(),
            protocol,
            target: Target::new("caikit-predictor.apps.example.com"),
            transport: FakeTransport::default().into_arc(),
            timeout: None,
        }
    }

    pub fn caikit_http() -> Self {
        Self::new(runtime::CAIKIT_TGIS, inference_type::ALL_TOKENS, Protocol::Http)
    }

    pub fn caikit_streaming_http() -> Self {
        Self::new(runtime::CAIKIT_TGIS, inference_type::STREAMING, Protocol::Http)
    }

    pub fn tgis_grpc() -> Self {
        Self::new(runtime::TGIS, inference_type::ALL_TOKENS, Protocol::Grpc)
    }

    pub fn catalog(mut self, catalog: Catalog) -> Self {
        self.catalog = Arc::new(catalog);
        self
    }

    pub fn host(mut self, host: &str) -> Self {
        self.target.host = host.to_string();
        self
    }

    pub fn port(mut self, port: u16) -> Self {
        self.target.port = Some(port);
        self
    }

    pub fn plain_http(mut self) -> Self {
        self.target.scheme = Scheme::Http;
        self
    }

    pub fn transport(mut self, transport: impl Transport + 'static) -> Self {
        self.transport = Arc::new(transport);
        self
    }

    pub fn shared_transport(mut self, transport: Arc<dyn Transport>) -> Self {
        self.transport = transport;
        self
    }

    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }

    pub fn build(self) -> InferenceClient {
        let client = InferenceClient::new(
            &self.catalog,
            &self.runtime,
            &self.inference_type,
            self.protocol,
            self.target,
            self.transport,
        )
        .expect("ClientBuilder: catalog lookup failed");
        match self.timeout {
            Some(timeout) => client.with_timeout(timeout),
            None => client,
        }
    }
}

// ---------------------------------------------------------------------------
// Catalog snippets
// ---------------------------------------------------------------------------

/// A one-entry catalog in the on-disk TOML shape.
pub fn catalog_toml(runtime: &str, inference_type: &str, protocol: &str, endpoint: &str) -> String {
    format!(
        r#"
[{runtime}.{inference_type}.{protocol}]
endpoint = "{endpoint}"
header = "Content-Type:application/json"
body = '{{"model": "$model_name", "input": "$query_text"}}'
response_fields_map = {{ response = "", response_text = "output" }}
"#
    )
}
