//! iqe-transport: executes rendered inference requests.
//!
//! Every transport honours the same observable contract: given a
//! [`RenderedRequest`] it returns a [`TransportOutput`] with a success flag,
//! stdout and stderr. For HTTP, stdout carries the response status line and
//! headers ahead of the body, the way `curl -i` prints them, so the client
//! parses every transport's output the same way.
//!
//! | Transport | HTTP | gRPC |
//! |-----------|------|------|
//! | [`CommandTransport`] | `curl -i -s` | `grpcurl` |
//! | [`HttpTransport`] | native (`reqwest`) | unsupported |
//! | [`NativeTransport`] | native (`reqwest`) | `grpcurl` |

pub mod command;
pub mod http;

use std::sync::Arc;

use async_trait::async_trait;
use iqe_core::config::{TransportConfig, TransportKind};
use iqe_core::{Protocol, RenderedRequest};
use thiserror::Error;

pub use command::CommandTransport;
pub use http::{HttpTransport, NativeTransport};

/// What a transport observed while executing one request.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TransportOutput {
    pub success: bool,
    pub stdout: String,
    pub stderr: String,
}

/// The request could not be attempted at all.
#[derive(Error, Debug)]
pub enum TransportError {
    #[error("failed to spawn {program}: {source}")]
    Spawn {
        program: String,
        #[source]
        source: std::io::Error,
    },

    #[error("{transport} transport does not support {protocol}")]
    Unsupported {
        transport: &'static str,
        protocol: Protocol,
    },

    #[error("failed to build HTTP client: {0}")]
    Client(#[from] reqwest::Error),
}

/// Executes a [`RenderedRequest`].
///
/// Implementations must be safe to share between concurrent callers; each
/// call owns its request and output.
#[async_trait]
pub trait Transport: Send + Sync {
    /// Short name for logs.
    fn name(&self) -> &'static str;

    /// Human-readable rendition of the invocation with the bearer token
    /// redacted. Used in logs and error messages.
    fn describe(&self, request: &RenderedRequest) -> String;

    async fn execute(&self, request: &RenderedRequest) -> Result<TransportOutput, TransportError>;
}

/// Build the transport selected by `[transport] kind`.
pub fn from_config(config: &TransportConfig) -> Result<Arc<dyn Transport>, TransportError> {
    let commands = CommandTransport::new(&config.curl_bin, &config.grpcurl_bin);
    Ok(match config.kind {
        TransportKind::Command => Arc::new(commands),
        TransportKind::Native => Arc::new(NativeTransport::new(HttpTransport::new()?, commands)),
    })
}
