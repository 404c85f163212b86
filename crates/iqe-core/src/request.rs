//! A fully rendered, transport-ready inference request.

use crate::types::Protocol;

/// Placeholder shown instead of bearer tokens in logs and error messages.
pub const REDACTED: &str = "***";

/// Output of rendering a catalog entry for one call. Transports execute it
/// as-is; nothing in it is templated any more.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RenderedRequest {
    pub protocol: Protocol,
    /// Rendered header from the catalog: a `Name: value` line, a bare
    /// content type, or empty.
    pub header: String,
    pub body: String,
    /// URL path (HTTP) or gRPC method.
    pub endpoint: String,
    /// `scheme://host/endpoint` for HTTP, `host:port` for gRPC.
    pub target: String,
    pub token: Option<String>,
    /// Skip TLS certificate verification.
    pub insecure: bool,
    /// Extra `(key, value)` transport arguments from the catalog entry.
    pub args: Vec<(String, String)>,
}

impl RenderedRequest {
    /// Target as a single string: the URL for HTTP, `host:port method` for gRPC.
    pub fn full_target(&self) -> String {
        match self.protocol {
            Protocol::Http => self.target.clone(),
            Protocol::Grpc => format!("{} {}", self.target, self.endpoint),
        }
    }

    /// Header lines to send, bearer token last. A header without a colon
    /// is a bare media type and goes out as `Content-Type`.
    pub fn header_lines(&self) -> Vec<String> {
        let mut lines = Vec::with_capacity(2);
        let header = self.header.trim();
        if header.contains(':') {
            lines.push(header.to_string());
        } else if !header.is_empty() {
            lines.push(format!("Content-Type: {header}"));
        }
        if let Some(token) = &self.token {
            lines.push(format!("Authorization: Bearer {token}"));
        }
        lines
    }

    /// Header lines split into `(name, value)` pairs.
    pub fn headers(&self) -> Vec<(String, String)> {
        self.header_lines()
            .iter()
            .filter_map(|line| line.split_once(':'))
            .map(|(name, value)| (name.trim().to_string(), value.trim().to_string()))
            .collect()
    }

    /// Replace the bearer token in `text` with [`REDACTED`].
    pub fn redact(&self, text: &str) -> String {
        match self.token.as_deref() {
            Some(token) if !token.is_empty() => text.replace(token, REDACTED),
            _ => text.to_string(),
        }
    }
}
