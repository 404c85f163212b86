//! Native HTTP transport.
//!
//! Sends the rendered request with `reqwest` and renders the response the
//! way `curl -i` prints it (status line, headers, blank line, body), so the
//! client's response parsing does not care which transport ran. Any HTTP
//! status counts as success, as with `curl -s` without `--fail`; only a
//! request that never got a response is reported as a failure.
//!
//! A body of `@path` is read from that file with line breaks removed, as
//! `curl -d @path` does.

use async_trait::async_trait;
use iqe_core::{Protocol, RenderedRequest};
use reqwest::Client;
use tracing::debug;

use crate::{CommandTransport, Transport, TransportError, TransportOutput};

/// HTTP-only transport backed by `reqwest`.
#[derive(Debug, Clone)]
pub struct HttpTransport {
    verified: Client,
    insecure: Client,
}

impl HttpTransport {
    pub fn new() -> Result<Self, TransportError> {
        Ok(Self {
            verified: Client::builder().build()?,
            insecure: Client::builder().danger_accept_invalid_certs(true).build()?,
        })
    }

    fn client(&self, request: &RenderedRequest) -> &Client {
        if request.insecure {
            &self.insecure
        } else {
            &self.verified
        }
    }
}

#[async_trait]
impl Transport for HttpTransport {
    fn name(&self) -> &'static str {
        "http"
    }

    fn describe(&self, request: &RenderedRequest) -> String {
        let mut line = format!("POST {}", request.target);
        for header in request.header_lines() {
            line.push_str(&format!(" [{header}]"));
        }
        if request.insecure {
            line.push_str(" (insecure)");
        }
        request.redact(&line)
    }

    async fn execute(&self, request: &RenderedRequest) -> Result<TransportOutput, TransportError> {
        if request.protocol != Protocol::Http {
            return Err(TransportError::Unsupported {
                transport: self.name(),
                protocol: request.protocol,
            });
        }

        debug!(request = %self.describe(request), "sending HTTP request");

        let body = match read_body(&request.body).await {
            Ok(body) => body,
            Err(err) => return Ok(failed(err)),
        };

        let mut builder = self.client(request).post(&request.target).body(body);
        for (name, value) in request.headers() {
            builder = builder.header(name, value);
        }

        let response = match builder.send().await {
            Ok(response) => response,
            Err(err) => return Ok(failed(err)),
        };

        let mut stdout = format!("{:?} {}\r\n", response.version(), response.status());
        for (name, value) in response.headers() {
            stdout.push_str(&format!(
                "{name}: {}\r\n",
                String::from_utf8_lossy(value.as_bytes())
            ));
        }
        stdout.push_str("\r\n");

        match response.text().await {
            Ok(body) => {
                stdout.push_str(&body);
                Ok(TransportOutput {
                    success: true,
                    stdout,
                    stderr: String::new(),
                })
            }
            Err(err) => Ok(TransportOutput {
                stdout,
                ..failed(err)
            }),
        }
    }
}

async fn read_body(body: &str) -> std::io::Result<String> {
    match body.strip_prefix('@') {
        Some(path) => {
            let data = tokio::fs::read_to_string(path).await.map_err(|e| {
                std::io::Error::new(e.kind(), format!("failed to read request body from {path}: {e}"))
            })?;
            Ok(data.replace(['\r', '\n'], ""))
        }
        None => Ok(body.to_string()),
    }
}

fn failed(err: impl std::fmt::Display) -> TransportOutput {
    TransportOutput {
        success: false,
        stdout: String::new(),
        stderr: format!("{err:#}"),
    }
}

/// Native HTTP plus `grpcurl` for gRPC. gRPC bodies are JSON, which needs
/// server reflection to encode, so gRPC stays on the command-line tool.
#[derive(Debug, Clone)]
pub struct NativeTransport {
    http: HttpTransport,
    grpc: CommandTransport,
}

impl NativeTransport {
    pub fn new(http: HttpTransport, grpc: CommandTransport) -> Self {
        Self { http, grpc }
    }
}

#[async_trait]
impl Transport for NativeTransport {
    fn name(&self) -> &'static str {
        "native"
    }

    fn describe(&self, request: &RenderedRequest) -> String {
        match request.protocol {
            Protocol::Http => self.http.describe(request),
            Protocol::Grpc => self.grpc.describe(request),
        }
    }

    async fn execute(&self, request: &RenderedRequest) -> Result<TransportOutput, TransportError> {
        match request.protocol {
            Protocol::Http => self.http.execute(request).await,
            Protocol::Grpc => self.grpc.execute(request).await,
        }
    }
}
